//! Layout engine – uses Taffy to compute flexbox layout for a template
//! fragment, then converts the result into a tree of positioned boxes.
//!
//! Fragments are laid out against a definite content width and unbounded
//! height. Block elements become flex columns, which never collapse margins,
//! so the outer height of a fragment is the plain sum of its children's
//! margin boxes. The paginator relies on that additivity.

use std::collections::HashMap;

use taffy::prelude::*;

use crate::dom::{body_children, parse_html, Tag};
use crate::error::{Error, Result};
use crate::fonts::{wrap_text, FontManager};
use crate::style::{self, build_styled_tree, ComputedStyle, StyledNode};

/// A box in fragment coordinates (origin at the fragment's top-left).
#[derive(Debug, Clone)]
pub struct PositionedBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub style: ComputedStyle,
    pub content: BoxContent,
    pub children: Vec<PositionedBox>,
}

#[derive(Debug, Clone)]
pub enum BoxContent {
    None,
    Text {
        lines: Vec<String>,
        /// Measured advance of each line, parallel to `lines`.
        line_widths: Vec<f32>,
        /// Bullet for list items.
        marker: Option<String>,
    },
    Image {
        src: String,
    },
}

/// A laid-out fragment and its outer height.
#[derive(Debug, Clone)]
pub struct Fragment {
    pub boxes: Vec<PositionedBox>,
    pub width: f32,
    pub height: f32,
}

fn layout_error(e: taffy::TaffyError) -> Error {
    Error::Layout(e.to_string())
}

struct LayoutBuilder<'a> {
    taffy: TaffyTree<()>,
    fonts: &'a FontManager,
    node_styles: HashMap<NodeId, ComputedStyle>,
    node_content: HashMap<NodeId, BoxContent>,
}

impl<'a> LayoutBuilder<'a> {
    fn new(fonts: &'a FontManager) -> Self {
        Self {
            taffy: TaffyTree::new(),
            fonts,
            node_styles: HashMap::new(),
            node_content: HashMap::new(),
        }
    }

    fn collect_inline_text(node: &StyledNode) -> String {
        match node {
            StyledNode::Text { text, .. } => text.clone(),
            StyledNode::Element { children, .. } => {
                children.iter().map(Self::collect_inline_text).collect()
            }
        }
    }

    /// True when every child is text or an inline element with inline children.
    fn all_inline(children: &[StyledNode]) -> bool {
        children.iter().all(|c| match c {
            StyledNode::Text { .. } => true,
            StyledNode::Element {
                tag,
                style,
                children: gc,
                ..
            } => *tag != Tag::Img && style.display == style::Display::Inline && Self::all_inline(gc),
        })
    }

    /// `parent_width` is the width available to this node's margin box.
    /// `shrink` is set below flex rows, where boxes take their content width
    /// instead of stretching.
    fn build_node(&mut self, styled: &StyledNode, parent_width: f32, shrink: bool) -> Result<NodeId> {
        match styled {
            StyledNode::Text { text, style } => {
                let combined = normalise_whitespace(text);
                self.build_text_node(&combined, style, parent_width, shrink, None)
            }
            StyledNode::Element {
                tag,
                style,
                children,
                attrs,
            } => self.build_element_node(tag, style, children, attrs, parent_width, shrink),
        }
    }

    fn build_text_node(
        &mut self,
        text: &str,
        style: &ComputedStyle,
        parent_width: f32,
        shrink: bool,
        marker: Option<String>,
    ) -> Result<NodeId> {
        let bold = style.is_bold();
        let italic = style.is_italic();
        let family = style.font_family;
        let font_size = style.font_size;
        let line_height = self.fonts.line_height_px(font_size, style.line_height);

        let max_w = parent_width - style.margin.left - style.margin.right - style.inset_x();
        let text = style.text_transform.apply(text);
        let lines = wrap_text(&text, font_size, bold, italic, family, max_w, self.fonts);
        let line_widths: Vec<f32> = lines
            .iter()
            .map(|l| self.fonts.measure_text_width(l, font_size, bold, italic, family))
            .collect();
        let text_width = line_widths.iter().copied().fold(0.0f32, f32::max);
        let text_height = lines.len() as f32 * line_height;

        let mut ts = box_style(style);
        ts.size = Size {
            width: if shrink {
                taffy::Dimension::Length(text_width + style.inset_x())
            } else {
                dim_to_taffy(style.width)
            },
            height: taffy::Dimension::Length(text_height + style.inset_y()),
        };
        if shrink {
            ts.flex_shrink = 0.0;
        }

        let node = self.taffy.new_leaf(ts).map_err(layout_error)?;
        self.node_styles.insert(node, style.clone());
        self.node_content.insert(
            node,
            BoxContent::Text {
                lines,
                line_widths,
                marker,
            },
        );
        Ok(node)
    }

    fn build_element_node(
        &mut self,
        tag: &Tag,
        style: &ComputedStyle,
        children: &[StyledNode],
        attrs: &HashMap<String, String>,
        parent_width: f32,
        shrink: bool,
    ) -> Result<NodeId> {
        let marker = (*tag == Tag::Li).then(|| "\u{2022}".to_string());

        if *tag == Tag::Img {
            return self.build_image_node(style, attrs, parent_width);
        }

        // Runs of inline content merge into one wrapped text leaf that keeps
        // the element's own box. Flex containers keep their spans as items.
        if style.display != style::Display::Flex && !children.is_empty() && Self::all_inline(children) {
            let raw: String = children.iter().map(Self::collect_inline_text).collect();
            let combined = normalise_whitespace(&raw);
            if !combined.is_empty() {
                return self.build_text_node(&combined, style, parent_width, shrink, marker);
            }
        }

        let my_width = match style.width {
            style::Dimension::Pt(w) => w,
            style::Dimension::Percent(p) => parent_width * p / 100.0,
            style::Dimension::Auto => parent_width - style.margin.left - style.margin.right,
        };
        let inner_width = (my_width - style.inset_x()).max(0.0);

        let is_row = style.is_flex_row() || style.display == style::Display::Inline;
        let child_widths = if is_row && style.flex_wrap == style::FlexWrap::NoWrap {
            row_child_widths(children, inner_width, style.gap)
        } else {
            vec![inner_width; children.len()]
        };
        let child_shrink = shrink || is_row;

        let mut child_nodes = Vec::with_capacity(children.len());
        for (child, width) in children.iter().zip(child_widths) {
            child_nodes.push(self.build_node(child, width, child_shrink)?);
        }

        let ts = self.element_style(style);
        let node = self
            .taffy
            .new_with_children(ts, &child_nodes)
            .map_err(layout_error)?;
        self.node_styles.insert(node, style.clone());
        Ok(node)
    }

    fn build_image_node(
        &mut self,
        style: &ComputedStyle,
        attrs: &HashMap<String, String>,
        parent_width: f32,
    ) -> Result<NodeId> {
        let src = attrs.get("src").cloned().unwrap_or_default();
        let resolved = if matches!(style.width, style::Dimension::Auto)
            || matches!(style.height, style::Dimension::Auto)
        {
            resolve_img_auto_dimensions(&src, style, parent_width)
        } else {
            None
        };
        let effective = resolved.as_ref().unwrap_or(style);

        let mut ts = box_style(effective);
        ts.size = Size {
            width: dim_to_taffy(effective.width),
            height: dim_to_taffy(effective.height),
        };
        ts.flex_shrink = 0.0;
        // Inside centred text the image sits centred like an inline box.
        if effective.text_align == style::TextAlign::Center {
            ts.margin.left = LengthPercentageAuto::Auto;
            ts.margin.right = LengthPercentageAuto::Auto;
        }
        let node = self.taffy.new_leaf(ts).map_err(layout_error)?;
        self.node_styles.insert(node, effective.clone());
        self.node_content.insert(node, BoxContent::Image { src });
        Ok(node)
    }

    fn element_style(&self, s: &ComputedStyle) -> Style {
        let mut ts = box_style(s);
        match s.display {
            style::Display::Flex => {
                ts.flex_direction = match s.flex_direction {
                    style::FlexDirection::Row => taffy::FlexDirection::Row,
                    style::FlexDirection::Column => taffy::FlexDirection::Column,
                };
                ts.flex_wrap = match s.flex_wrap {
                    style::FlexWrap::NoWrap => taffy::FlexWrap::NoWrap,
                    style::FlexWrap::Wrap => taffy::FlexWrap::Wrap,
                };
                ts.justify_content = Some(match s.justify_content {
                    style::JustifyContent::Start => taffy::JustifyContent::Start,
                    style::JustifyContent::End => taffy::JustifyContent::End,
                    style::JustifyContent::Center => taffy::JustifyContent::Center,
                    style::JustifyContent::SpaceBetween => taffy::JustifyContent::SpaceBetween,
                });
                ts.align_items = Some(match s.align_items {
                    style::AlignItems::Start => taffy::AlignItems::Start,
                    style::AlignItems::End => taffy::AlignItems::End,
                    style::AlignItems::Center => taffy::AlignItems::Center,
                    style::AlignItems::Stretch => taffy::AlignItems::Stretch,
                });
            }
            style::Display::Inline => {
                ts.flex_direction = taffy::FlexDirection::Row;
                ts.flex_wrap = taffy::FlexWrap::Wrap;
            }
            style::Display::Block => ts.flex_direction = taffy::FlexDirection::Column,
            style::Display::None => ts.display = taffy::Display::None,
        }
        ts.size = Size {
            width: dim_to_taffy(s.width),
            height: dim_to_taffy(s.height),
        };
        ts.gap = Size {
            width: LengthPercentage::Length(s.gap),
            height: LengthPercentage::Length(s.gap),
        };
        ts
    }

    fn extract(&self, node: NodeId, offset_x: f32, offset_y: f32) -> Result<PositionedBox> {
        let layout = self.taffy.layout(node).map_err(layout_error)?;
        let x = offset_x + layout.location.x;
        let y = offset_y + layout.location.y;

        let mut children = Vec::new();
        for child in self.taffy.children(node).map_err(layout_error)? {
            children.push(self.extract(child, x, y)?);
        }

        Ok(PositionedBox {
            x,
            y,
            width: layout.size.width,
            height: layout.size.height,
            style: self.node_styles.get(&node).cloned().unwrap_or_default(),
            content: self
                .node_content
                .get(&node)
                .cloned()
                .unwrap_or(BoxContent::None),
            children,
        })
    }
}

/// Flex item spacing shared by leaves and containers.
fn box_style(s: &ComputedStyle) -> Style {
    Style {
        display: taffy::Display::Flex,
        flex_direction: taffy::FlexDirection::Column,
        flex_grow: s.flex_grow,
        flex_shrink: s.flex_shrink,
        margin: Rect {
            top: LengthPercentageAuto::Length(s.margin.top),
            right: LengthPercentageAuto::Length(s.margin.right),
            bottom: LengthPercentageAuto::Length(s.margin.bottom),
            left: LengthPercentageAuto::Length(s.margin.left),
        },
        padding: Rect {
            top: LengthPercentage::Length(s.padding.top),
            right: LengthPercentage::Length(s.padding.right),
            bottom: LengthPercentage::Length(s.padding.bottom),
            left: LengthPercentage::Length(s.padding.left),
        },
        border: Rect {
            top: LengthPercentage::Length(s.border.top),
            right: LengthPercentage::Length(s.border.right),
            bottom: LengthPercentage::Length(s.border.bottom),
            left: LengthPercentage::Length(s.border.left),
        },
        ..Default::default()
    }
}

fn dim_to_taffy(d: style::Dimension) -> taffy::Dimension {
    match d {
        style::Dimension::Auto => taffy::Dimension::Auto,
        style::Dimension::Pt(v) => taffy::Dimension::Length(v),
        style::Dimension::Percent(v) => taffy::Dimension::Percent(v / 100.0),
    }
}

fn normalise_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Wrap widths for the children of a non-wrapping row: fixed-width children
/// keep their width, the rest split what remains evenly.
fn row_child_widths(children: &[StyledNode], inner_width: f32, gap: f32) -> Vec<f32> {
    let fixed = |c: &StyledNode| match c {
        StyledNode::Element { style, .. } => match style.width {
            style::Dimension::Pt(w) => Some(w + style.margin.left + style.margin.right),
            style::Dimension::Percent(p) => Some(inner_width * p / 100.0),
            style::Dimension::Auto => None,
        },
        StyledNode::Text { .. } => None,
    };
    let gaps = gap * children.len().saturating_sub(1) as f32;
    let fixed_total: f32 = children.iter().filter_map(fixed).sum();
    let flexible = children.iter().filter(|c| fixed(c).is_none()).count().max(1);
    let share = ((inner_width - gaps - fixed_total) / flexible as f32).max(1.0);
    children.iter().map(|c| fixed(c).unwrap_or(share)).collect()
}

/// Decode a base64 data-URI image and fill any `Auto` width/height from its
/// intrinsic size. `None` when the src is not decodable or nothing is missing.
fn resolve_img_auto_dimensions(src: &str, style: &ComputedStyle, parent_width: f32) -> Option<ComputedStyle> {
    use base64::{engine::general_purpose::STANDARD as BASE64_STD, Engine as _};

    let (header, b64) = src.strip_prefix("data:")?.split_once(',')?;
    if !header.contains(";base64") {
        return None;
    }
    let bytes = BASE64_STD.decode(b64.trim()).ok()?;
    let img = ::image::load_from_memory(&bytes).ok()?;
    let (px_w, px_h) = (img.width() as f32, img.height() as f32);
    if px_w == 0.0 || px_h == 0.0 {
        return None;
    }
    let aspect = px_w / px_h;

    let known_w = match style.width {
        style::Dimension::Pt(v) => Some(v),
        style::Dimension::Percent(p) => Some(parent_width * p / 100.0),
        style::Dimension::Auto => None,
    };
    let known_h = match style.height {
        style::Dimension::Pt(v) => Some(v),
        _ => None,
    };

    let mut s = style.clone();
    match (known_w, known_h) {
        (Some(w), None) => s.height = style::Dimension::Pt((w / aspect).max(1.0)),
        (None, Some(h)) => s.width = style::Dimension::Pt((h * aspect).max(1.0)),
        (None, None) => {
            s.width = style::Dimension::Pt(px_w * style::PX_TO_PT);
            s.height = style::Dimension::Pt(px_h * style::PX_TO_PT);
        }
        (Some(_), Some(_)) => return None,
    }
    Some(s)
}

/// Lay out an HTML fragment at `content_width`.
pub fn layout_fragment(html: &str, content_width: f32, fonts: &FontManager) -> Result<Fragment> {
    let dom = parse_html(html);
    let styled = build_styled_tree(&body_children(&dom), None);
    let mut builder = LayoutBuilder::new(fonts);

    let mut child_ids = Vec::with_capacity(styled.len());
    for node in &styled {
        child_ids.push(builder.build_node(node, content_width, false)?);
    }

    let root_style = Style {
        display: taffy::Display::Flex,
        flex_direction: taffy::FlexDirection::Column,
        size: Size {
            width: taffy::Dimension::Length(content_width),
            height: taffy::Dimension::Auto,
        },
        ..Default::default()
    };
    let root = builder
        .taffy
        .new_with_children(root_style, &child_ids)
        .map_err(layout_error)?;
    builder
        .taffy
        .compute_layout(
            root,
            Size {
                width: AvailableSpace::Definite(content_width),
                height: AvailableSpace::MaxContent,
            },
        )
        .map_err(layout_error)?;

    let root_box = builder.extract(root, 0.0, 0.0)?;
    Ok(Fragment {
        width: root_box.width,
        height: root_box.height,
        boxes: root_box.children,
    })
}

/// Outer height of a fragment at `content_width`, margins included.
pub fn measure_fragment(html: &str, content_width: f32, fonts: &FontManager) -> Result<f32> {
    layout_fragment(html, content_width, fonts).map(|f| f.height)
}

#[cfg(test)]
mod tests {
    use super::*;

    const WIDTH: f32 = 515.28;

    fn fonts() -> FontManager {
        FontManager::default()
    }

    #[test]
    fn paragraph_height_is_lines_times_leading() {
        let h = measure_fragment(r#"<p class="text-base">Hello world</p>"#, WIDTH, &fonts()).unwrap();
        // 12pt text, 1.4 leading, one line.
        assert!((h - 16.8).abs() < 0.01, "{h}");
    }

    #[test]
    fn margins_and_padding_add_up() {
        let html = r#"<div class="mb-6"><p class="text-base pb-2 border-b">Experience</p></div>"#;
        let h = measure_fragment(html, WIDTH, &fonts()).unwrap();
        assert!((h - (16.8 + 6.0 + 0.75 + 18.0)).abs() < 0.01, "{h}");
    }

    #[test]
    fn heights_are_additive_across_fragments() {
        let f = fonts();
        let a = r#"<div class="mb-4"><h3 class="text-lg mt-0 mb-3">Profile</h3><p>Short bio</p></div>"#;
        let b = r#"<div class="p-4 mb-6 bg-gray-100"><p>Skills</p></div>"#;
        let ha = measure_fragment(a, WIDTH, &f).unwrap();
        let hb = measure_fragment(b, WIDTH, &f).unwrap();
        let both = measure_fragment(&format!("{a}{b}"), WIDTH, &f).unwrap();
        assert!((ha + hb - both).abs() < 0.01, "{ha} + {hb} != {both}");
    }

    #[test]
    fn narrower_width_wraps_to_more_lines() {
        let f = fonts();
        let text = "<p>".to_string() + &"resume ".repeat(40) + "</p>";
        let wide = measure_fragment(&text, WIDTH, &f).unwrap();
        let narrow = measure_fragment(&text, WIDTH / 2.0, &f).unwrap();
        assert!(narrow > wide);
    }

    #[test]
    fn row_children_sit_side_by_side() {
        let html = r#"<div class="flex justify-between"><span>Creative Director</span><span>Sep 2018 - Jan 2020</span></div>"#;
        let frag = layout_fragment(html, WIDTH, &fonts()).unwrap();
        let row = &frag.boxes[0];
        assert_eq!(row.children.len(), 2);
        let (left, right) = (&row.children[0], &row.children[1]);
        assert_eq!(left.y, right.y);
        assert!(right.x > left.x + left.width - 0.01);
        assert!((right.x + right.width - WIDTH).abs() < 0.01);
    }

    #[test]
    fn list_items_carry_markers() {
        let html = "<ul><li>UX Design</li><li>Prototyping</li></ul>";
        let frag = layout_fragment(html, WIDTH, &fonts()).unwrap();
        let ul = &frag.boxes[0];
        assert_eq!(ul.children.len(), 2);
        assert!(matches!(
            &ul.children[0].content,
            BoxContent::Text { marker: Some(m), .. } if m == "\u{2022}"
        ));
    }

    #[test]
    fn fixed_size_image_keeps_its_box() {
        let html = r#"<img class="w-24 h-24" src="data:image/png;base64,broken">"#;
        let frag = layout_fragment(html, WIDTH, &fonts()).unwrap();
        assert_eq!(frag.boxes[0].width, 72.0);
        assert_eq!(frag.height, 72.0);
    }

    #[test]
    fn empty_fragment_has_zero_height() {
        assert_eq!(measure_fragment("", WIDTH, &fonts()).unwrap(), 0.0);
    }
}
