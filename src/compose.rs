//! Page composition – turns a laid-out page fragment into the page-absolute
//! [`PageLayout`] an encoder consumes.

use crate::fonts::FontManager;
use crate::layout::{BoxContent, Fragment, PositionedBox};
use crate::layout_config::{BorderStyle, ImageContent, LayoutBox, PageLayout, TextContent, TextLine};
use crate::style::TextAlign;

/// Thinnest border side that still gets stroked.
const MIN_BORDER_PT: f32 = 0.5;

/// Place `fragment` with its top-left corner at (`origin_x`, `origin_y`) on
/// page `page_index`. Backgrounds are only emitted when `keep_backgrounds`.
pub fn compose_page(
    fragment: &Fragment,
    origin_x: f32,
    origin_y: f32,
    page_index: usize,
    keep_backgrounds: bool,
    fonts: &FontManager,
) -> PageLayout {
    let ctx = Compose {
        origin_x,
        origin_y,
        keep_backgrounds,
        fonts,
    };
    PageLayout {
        page_index,
        boxes: fragment.boxes.iter().map(|b| ctx.build(b)).collect(),
    }
}

struct Compose<'a> {
    origin_x: f32,
    origin_y: f32,
    keep_backgrounds: bool,
    fonts: &'a FontManager,
}

impl Compose<'_> {
    /// Fragment coordinates are already accumulated, so every box only needs
    /// the page origin added.
    fn build(&self, pbox: &PositionedBox) -> LayoutBox {
        let style = &pbox.style;
        let mut lb = LayoutBox::new(
            self.origin_x + pbox.x,
            self.origin_y + pbox.y,
            pbox.width,
            pbox.height,
        );

        if self.keep_backgrounds && !style.background_color.is_transparent() {
            lb.background_color = Some(style.background_color.to_array());
        }

        let b = style.border;
        if [b.top, b.right, b.bottom, b.left].iter().any(|w| *w >= MIN_BORDER_PT) {
            lb.border = Some(BorderStyle {
                top: b.top,
                right: b.right,
                bottom: b.bottom,
                left: b.left,
                color: style.border_color.to_array(),
            });
        }

        match &pbox.content {
            BoxContent::Text {
                lines,
                line_widths,
                marker,
            } => {
                let line_height = self.fonts.line_height_px(style.font_size, style.line_height);
                let inner_width = (pbox.width - style.inset_x()).max(0.0);
                let left = style.padding.left + style.border.left;
                let top = style.padding.top + style.border.top;
                let text_lines = lines
                    .iter()
                    .zip(line_widths)
                    .enumerate()
                    .map(|(i, (text, &width))| TextLine {
                        text: text.clone(),
                        x_offset: left + align_offset(style.text_align, inner_width, width),
                        y_offset: top + i as f32 * line_height,
                    })
                    .collect();
                lb.text = Some(TextContent {
                    lines: text_lines,
                    font_family: style.font_family.name().to_string(),
                    font_size: style.font_size,
                    bold: style.is_bold(),
                    italic: style.is_italic(),
                    color: style.color.to_array(),
                    line_height,
                    text_align: style.text_align.name().to_string(),
                    list_marker: marker.clone(),
                });
            }
            BoxContent::Image { src } => {
                lb.image = Some(ImageContent {
                    src: src.clone(),
                    width: pbox.width,
                    height: pbox.height,
                });
            }
            BoxContent::None => {}
        }

        lb.children = pbox.children.iter().map(|c| self.build(c)).collect();
        lb
    }
}

fn align_offset(align: TextAlign, inner_width: f32, line_width: f32) -> f32 {
    let slack = (inner_width - line_width).max(0.0);
    match align {
        TextAlign::Left => 0.0,
        TextAlign::Center => slack / 2.0,
        TextAlign::Right => slack,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::layout_fragment;

    fn compose(html: &str, keep_backgrounds: bool) -> PageLayout {
        let fonts = FontManager::default();
        let frag = layout_fragment(html, 500.0, &fonts).unwrap();
        compose_page(&frag, 40.0, 40.0, 0, keep_backgrounds, &fonts)
    }

    #[test]
    fn boxes_are_offset_by_the_page_origin() {
        let page = compose(r#"<div class="mb-6"><p class="pt-2">Hello</p></div>"#, false);
        let outer = &page.boxes[0];
        assert_eq!((outer.x, outer.y), (40.0, 40.0));
        let p = &outer.children[0];
        let text = p.text.as_ref().unwrap();
        assert_eq!(text.lines[0].y_offset, 6.0);
        assert_eq!(page.text_lines(), vec!["Hello"]);
    }

    #[test]
    fn backgrounds_only_under_print_colours() {
        let html = r#"<div class="bg-gray-800 p-4"><p class="text-white">Name</p></div>"#;
        assert!(compose(html, false).boxes[0].background_color.is_none());
        assert!(compose(html, true).boxes[0].background_color.is_some());
    }

    #[test]
    fn single_side_border_is_kept() {
        let page = compose(r#"<div class="border-b border-gray-300 pb-2"><p>Title</p></div>"#, true);
        let border = page.boxes[0].border.as_ref().unwrap();
        assert_eq!(border.bottom, 0.75);
        assert_eq!(border.top, 0.0);
    }

    #[test]
    fn centred_lines_are_offset() {
        let page = compose(r#"<p class="text-center">Hi</p>"#, false);
        let line = &page.boxes[0].text.as_ref().unwrap().lines[0];
        assert!(line.x_offset > 200.0);
    }
}
