//! Style resolver – maps the utility-class vocabulary used by the resume
//! themes onto a flat [`ComputedStyle`] consumed by the layout engine.
//!
//! Class names follow Tailwind's spelling and scale (one spacing unit is
//! 4 CSS px). Lengths are converted to PDF points on the way in, so the rest
//! of the pipeline works in a single unit.

use std::collections::HashMap;

use crate::dom::{DomNode, ElementNode, Tag};

/// CSS px to PDF points at the 96 dpi reference resolution.
pub const PX_TO_PT: f32 = 0.75;

/// One Tailwind spacing step (4 px) in points.
const SPACING_UNIT: f32 = 4.0 * PX_TO_PT;

#[derive(Debug, Clone)]
pub struct ComputedStyle {
    pub display: Display,
    pub flex_direction: FlexDirection,
    pub flex_wrap: FlexWrap,
    pub flex_grow: f32,
    pub flex_shrink: f32,
    pub justify_content: JustifyContent,
    pub align_items: AlignItems,
    pub gap: f32,

    pub width: Dimension,
    pub height: Dimension,

    pub margin: Sides,
    pub padding: Sides,
    pub border: Sides,
    pub border_color: Color,
    pub background_color: Color,

    // Inherited
    pub font_size: f32,
    pub font_weight: FontWeight,
    pub font_family: FontFamily,
    pub font_style: FontStyle,
    pub text_transform: TextTransform,
    pub color: Color,
    pub text_align: TextAlign,
    pub line_height: f32,
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Self {
            display: Display::Block,
            flex_direction: FlexDirection::Row,
            flex_wrap: FlexWrap::NoWrap,
            flex_grow: 0.0,
            flex_shrink: 1.0,
            justify_content: JustifyContent::Start,
            align_items: AlignItems::Stretch,
            gap: 0.0,
            width: Dimension::Auto,
            height: Dimension::Auto,
            margin: Sides::ZERO,
            padding: Sides::ZERO,
            border: Sides::ZERO,
            border_color: Color::DEFAULT_BORDER,
            background_color: Color::TRANSPARENT,
            font_size: 16.0 * PX_TO_PT,
            font_weight: FontWeight::Normal,
            font_family: FontFamily::Sans,
            font_style: FontStyle::Normal,
            text_transform: TextTransform::None,
            color: Color::BLACK,
            text_align: TextAlign::Left,
            line_height: 1.4,
        }
    }
}

impl ComputedStyle {
    /// A fresh box that only carries the inheritable text properties of `parent`.
    pub fn inherit_from(parent: &ComputedStyle) -> Self {
        Self {
            font_size: parent.font_size,
            font_weight: parent.font_weight,
            font_family: parent.font_family,
            font_style: parent.font_style,
            text_transform: parent.text_transform,
            color: parent.color,
            text_align: parent.text_align,
            line_height: parent.line_height,
            ..Self::default()
        }
    }

    pub fn is_bold(&self) -> bool {
        self.font_weight.is_bold()
    }

    pub fn is_italic(&self) -> bool {
        self.font_style == FontStyle::Italic
    }

    pub fn is_flex_row(&self) -> bool {
        self.display == Display::Flex && self.flex_direction == FlexDirection::Row
    }

    /// Horizontal padding plus border.
    pub fn inset_x(&self) -> f32 {
        self.padding.left + self.padding.right + self.border.left + self.border.right
    }

    /// Vertical padding plus border.
    pub fn inset_y(&self) -> f32 {
        self.padding.top + self.padding.bottom + self.border.top + self.border.bottom
    }
}

// ---------------------------------------------------------------------------
// Supporting types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Display {
    Block,
    Flex,
    Inline,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlexDirection {
    Row,
    Column,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlexWrap {
    NoWrap,
    Wrap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JustifyContent {
    Start,
    End,
    Center,
    SpaceBetween,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignItems {
    Start,
    End,
    Center,
    Stretch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FontWeight {
    Normal,
    Medium,
    Semibold,
    Bold,
}

impl FontWeight {
    /// Builtin PDF fonts only come in regular and bold; semibold and up
    /// render bold.
    pub fn is_bold(self) -> bool {
        self >= FontWeight::Semibold
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FontFamily {
    Sans,
    Serif,
}

impl FontFamily {
    pub fn name(self) -> &'static str {
        match self {
            FontFamily::Sans => "Helvetica",
            FontFamily::Serif => "Times",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontStyle {
    Normal,
    Italic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextTransform {
    None,
    Uppercase,
    Lowercase,
}

impl TextTransform {
    pub fn apply(self, text: &str) -> String {
        match self {
            TextTransform::None => text.to_string(),
            TextTransform::Uppercase => text.to_uppercase(),
            TextTransform::Lowercase => text.to_lowercase(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

impl TextAlign {
    pub fn name(self) -> &'static str {
        match self {
            TextAlign::Left => "left",
            TextAlign::Center => "center",
            TextAlign::Right => "right",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Dimension {
    Auto,
    Pt(f32),
    Percent(f32),
}

/// Per-side lengths in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sides {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Sides {
    pub const ZERO: Self = Self {
        top: 0.0,
        right: 0.0,
        bottom: 0.0,
        left: 0.0,
    };

    pub fn uniform(v: f32) -> Self {
        Self {
            top: v,
            right: v,
            bottom: v,
            left: v,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.top == 0.0 && self.right == 0.0 && self.bottom == 0.0 && self.left == 0.0
    }

    /// Set the sides named by a Tailwind side suffix (`t`, `x`, ...); an empty
    /// suffix means all four.
    fn set(&mut self, which: &str, v: f32) -> bool {
        match which {
            "" => *self = Self::uniform(v),
            "t" => self.top = v,
            "r" => self.right = v,
            "b" => self.bottom = v,
            "l" => self.left = v,
            "x" => {
                self.left = v;
                self.right = v;
            }
            "y" => {
                self.top = v;
                self.bottom = v;
            }
            _ => return false,
        }
        true
    }
}

/// RGBA colour (0.0 – 1.0).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Self = Self::rgb(0.0, 0.0, 0.0);
    pub const WHITE: Self = Self::rgb(1.0, 1.0, 1.0);
    pub const TRANSPARENT: Self = Self {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 0.0,
    };
    /// Tailwind's preflight border colour (gray-200).
    pub const DEFAULT_BORDER: Self = Self::rgb(0.898, 0.906, 0.922);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub fn is_transparent(&self) -> bool {
        self.a < 0.001
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim_start_matches('#');
        let channel = |s: &str| u8::from_str_radix(s, 16).ok().map(|v| v as f32 / 255.0);
        match hex.len() {
            6 => Some(Self::rgb(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            3 => Some(Self::rgb(
                channel(&hex[0..1].repeat(2))?,
                channel(&hex[1..2].repeat(2))?,
                channel(&hex[2..3].repeat(2))?,
            )),
            _ => None,
        }
    }

    /// Look up a palette name such as `gray-600` or `white`.
    pub fn named(name: &str) -> Option<Self> {
        match name {
            "white" => return Some(Self::WHITE),
            "black" => return Some(Self::BLACK),
            "transparent" => return Some(Self::TRANSPARENT),
            _ => {}
        }
        PALETTE
            .iter()
            .find(|(n, _)| *n == name)
            .and_then(|(_, hex)| Self::from_hex(hex))
    }
}

const PALETTE: &[(&str, &str)] = &[
    ("gray-50", "#f9fafb"),
    ("gray-100", "#f3f4f6"),
    ("gray-200", "#e5e7eb"),
    ("gray-300", "#d1d5db"),
    ("gray-400", "#9ca3af"),
    ("gray-500", "#6b7280"),
    ("gray-600", "#4b5563"),
    ("gray-700", "#374151"),
    ("gray-800", "#1f2937"),
    ("gray-900", "#111827"),
    ("green-50", "#f0fdf4"),
    ("green-100", "#dcfce7"),
    ("green-200", "#bbf7d0"),
    ("green-500", "#22c55e"),
    ("green-600", "#16a34a"),
    ("green-700", "#15803d"),
    ("green-800", "#166534"),
    ("emerald-50", "#ecfdf5"),
    ("emerald-100", "#d1fae5"),
    ("emerald-500", "#10b981"),
    ("emerald-600", "#059669"),
    ("emerald-700", "#047857"),
    ("blue-600", "#2563eb"),
    ("blue-700", "#1d4ed8"),
];

// ---------------------------------------------------------------------------
// Style resolution
// ---------------------------------------------------------------------------

/// Resolve the style for an element, inheriting text properties from its parent.
pub fn resolve_style(element: &ElementNode, parent: Option<&ComputedStyle>) -> ComputedStyle {
    let mut style = match parent {
        Some(p) => ComputedStyle::inherit_from(p),
        None => ComputedStyle::default(),
    };
    apply_tag_defaults(&mut style, &element.tag);
    for class in element.classes() {
        if !apply_class(&mut style, class) {
            log::trace!("ignoring unknown utility class {class:?}");
        }
    }
    style
}

fn apply_tag_defaults(s: &mut ComputedStyle, tag: &Tag) {
    match tag {
        Tag::H1 => {
            s.font_size = 24.0;
            s.font_weight = FontWeight::Bold;
        }
        Tag::H2 => {
            s.font_size = 18.0;
            s.font_weight = FontWeight::Bold;
        }
        Tag::H3 => {
            s.font_size = 15.0;
            s.font_weight = FontWeight::Semibold;
        }
        Tag::Ul => s.padding.left = 18.0,
        Tag::Span => s.display = Display::Inline,
        Tag::Head => s.display = Display::None,
        Tag::Div | Tag::P | Tag::Li | Tag::Img | Tag::Body | Tag::Html | Tag::Unknown(_) => {}
    }
}

/// Apply one utility class. Returns false when the class is not understood.
pub(crate) fn apply_class(s: &mut ComputedStyle, class: &str) -> bool {
    match class {
        "flex" => s.display = Display::Flex,
        "block" => s.display = Display::Block,
        "inline" | "inline-block" => s.display = Display::Inline,
        "hidden" => s.display = Display::None,

        "flex-row" => s.flex_direction = FlexDirection::Row,
        "flex-col" => s.flex_direction = FlexDirection::Column,
        "flex-wrap" => s.flex_wrap = FlexWrap::Wrap,
        "flex-nowrap" => s.flex_wrap = FlexWrap::NoWrap,
        "flex-1" => {
            s.flex_grow = 1.0;
            s.flex_shrink = 1.0;
        }
        "grow" | "flex-grow" => s.flex_grow = 1.0,
        "shrink-0" | "flex-shrink-0" => s.flex_shrink = 0.0,

        "justify-start" => s.justify_content = JustifyContent::Start,
        "justify-end" => s.justify_content = JustifyContent::End,
        "justify-center" => s.justify_content = JustifyContent::Center,
        "justify-between" => s.justify_content = JustifyContent::SpaceBetween,

        "items-start" => s.align_items = AlignItems::Start,
        "items-end" => s.align_items = AlignItems::End,
        "items-center" => s.align_items = AlignItems::Center,
        "items-stretch" => s.align_items = AlignItems::Stretch,

        "font-normal" => s.font_weight = FontWeight::Normal,
        "font-medium" => s.font_weight = FontWeight::Medium,
        "font-semibold" => s.font_weight = FontWeight::Semibold,
        "font-bold" => s.font_weight = FontWeight::Bold,
        "font-sans" => s.font_family = FontFamily::Sans,
        "font-serif" => s.font_family = FontFamily::Serif,
        "italic" => s.font_style = FontStyle::Italic,
        "not-italic" => s.font_style = FontStyle::Normal,
        "uppercase" => s.text_transform = TextTransform::Uppercase,
        "lowercase" => s.text_transform = TextTransform::Lowercase,
        "normal-case" => s.text_transform = TextTransform::None,

        "text-left" => s.text_align = TextAlign::Left,
        "text-center" => s.text_align = TextAlign::Center,
        "text-right" => s.text_align = TextAlign::Right,

        "text-xs" => s.font_size = 12.0 * PX_TO_PT,
        "text-sm" => s.font_size = 14.0 * PX_TO_PT,
        "text-base" => s.font_size = 16.0 * PX_TO_PT,
        "text-lg" => s.font_size = 18.0 * PX_TO_PT,
        "text-xl" => s.font_size = 20.0 * PX_TO_PT,
        "text-2xl" => s.font_size = 24.0 * PX_TO_PT,
        "text-3xl" => s.font_size = 30.0 * PX_TO_PT,

        "leading-tight" => s.line_height = 1.25,
        "leading-snug" => s.line_height = 1.375,
        "leading-normal" => s.line_height = 1.5,
        "leading-relaxed" => s.line_height = 1.625,

        "w-full" => s.width = Dimension::Percent(100.0),
        "w-auto" => s.width = Dimension::Auto,
        "w-1/2" => s.width = Dimension::Percent(50.0),
        "w-1/3" => s.width = Dimension::Percent(100.0 / 3.0),
        "w-2/3" => s.width = Dimension::Percent(200.0 / 3.0),

        _ => {
            return try_border_class(s, class)
                || try_spacing_class(s, class)
                || try_color_class(s, class)
                || try_size_class(s, class);
        }
    }
    true
}

/// `border`, `border-2`, `border-b`, `border-l-2`, `border-{color}`.
fn try_border_class(s: &mut ComputedStyle, class: &str) -> bool {
    let rest = match class {
        "border" => return s.border.set("", PX_TO_PT),
        _ => match class.strip_prefix("border-") {
            Some(r) => r,
            None => return false,
        },
    };
    if let Ok(px) = rest.parse::<f32>() {
        return s.border.set("", px * PX_TO_PT);
    }
    let (side, width) = match rest.split_once('-') {
        Some((side, px)) => match px.parse::<f32>() {
            Ok(px) => (side, px * PX_TO_PT),
            Err(_) => ("?", 0.0),
        },
        None => (rest, PX_TO_PT),
    };
    if s.border.set(side, width) {
        return true;
    }
    match Color::named(rest) {
        Some(c) => {
            s.border_color = c;
            true
        }
        None => false,
    }
}

/// `p-4`, `px-3`, `mb-6`, `gap-2`, ... in Tailwind spacing units.
fn try_spacing_class(s: &mut ComputedStyle, class: &str) -> bool {
    let Some((prefix, value)) = class.rsplit_once('-') else {
        return false;
    };
    let Ok(units) = value.parse::<f32>() else {
        return false;
    };
    let v = units * SPACING_UNIT;
    if prefix == "gap" {
        s.gap = v;
        return true;
    }
    if let Some(side) = prefix.strip_prefix('p') {
        s.padding.set(side, v)
    } else if let Some(side) = prefix.strip_prefix('m') {
        s.margin.set(side, v)
    } else {
        false
    }
}

fn try_color_class(s: &mut ComputedStyle, class: &str) -> bool {
    if let Some(name) = class.strip_prefix("text-") {
        if let Some(c) = Color::named(name) {
            s.color = c;
            return true;
        }
    }
    if let Some(name) = class.strip_prefix("bg-") {
        if let Some(c) = Color::named(name) {
            s.background_color = c;
            return true;
        }
    }
    false
}

fn try_size_class(s: &mut ComputedStyle, class: &str) -> bool {
    let (target, rest) = if let Some(r) = class.strip_prefix("w-") {
        (&mut s.width, r)
    } else if let Some(r) = class.strip_prefix("h-") {
        (&mut s.height, r)
    } else {
        return false;
    };
    match rest.parse::<f32>() {
        Ok(units) => {
            *target = Dimension::Pt(units * SPACING_UNIT);
            true
        }
        Err(_) => false,
    }
}

// ---------------------------------------------------------------------------
// Styled DOM tree
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum StyledNode {
    Element {
        tag: Tag,
        style: ComputedStyle,
        children: Vec<StyledNode>,
        attrs: HashMap<String, String>,
    },
    Text {
        text: String,
        style: ComputedStyle,
    },
}

/// Build a styled tree from a DOM tree, resolving styles top-down.
/// Whitespace-only text nodes are dropped.
pub fn build_styled_tree(nodes: &[DomNode], parent_style: Option<&ComputedStyle>) -> Vec<StyledNode> {
    let mut result = Vec::new();
    for node in nodes {
        match node {
            DomNode::Element(e) => {
                let style = resolve_style(e, parent_style);
                if style.display == Display::None {
                    continue;
                }
                let children = build_styled_tree(&e.children, Some(&style));
                result.push(StyledNode::Element {
                    tag: e.tag.clone(),
                    style,
                    children,
                    attrs: e.attributes.clone(),
                });
            }
            DomNode::Text(text) if !text.trim().is_empty() => {
                let style = parent_style
                    .map(ComputedStyle::inherit_from)
                    .unwrap_or_default();
                result.push(StyledNode::Text {
                    text: text.clone(),
                    style,
                });
            }
            DomNode::Text(_) => {}
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_html;

    fn style_of(classes: &str) -> ComputedStyle {
        let mut s = ComputedStyle::default();
        for c in classes.split_whitespace() {
            assert!(apply_class(&mut s, c), "class {c} not understood");
        }
        s
    }

    #[test]
    fn spacing_is_in_points() {
        let s = style_of("p-4 mb-6 px-3");
        assert_eq!(s.padding.top, 12.0);
        assert_eq!(s.padding.left, 9.0);
        assert_eq!(s.margin.bottom, 18.0);
        assert_eq!(s.margin.top, 0.0);
    }

    #[test]
    fn per_side_borders() {
        let s = style_of("border-b border-gray-300");
        assert_eq!(s.border.bottom, 0.75);
        assert_eq!(s.border.top, 0.0);
        assert_eq!(s.border_color, Color::named("gray-300").unwrap());

        let s = style_of("border-l-2 border-green-200");
        assert_eq!(s.border.left, 1.5);
        assert_eq!(s.border.right, 0.0);

        let s = style_of("border-4 border-white");
        assert_eq!(s.border, Sides::uniform(3.0));
        assert_eq!(s.border_color, Color::WHITE);
    }

    #[test]
    fn weights_and_families() {
        let s = style_of("font-semibold font-serif uppercase");
        assert!(s.is_bold());
        assert_eq!(s.font_family, FontFamily::Serif);
        assert_eq!(s.text_transform.apply("Skills"), "SKILLS");
        assert!(!style_of("font-medium").is_bold());
    }

    #[test]
    fn unknown_classes_are_reported() {
        let mut s = ComputedStyle::default();
        assert!(!apply_class(&mut s, "rotate-45"));
        assert!(!apply_class(&mut s, "border-purple-900"));
        assert!(!apply_class(&mut s, "text-magenta"));
    }

    #[test]
    fn text_inherits_but_boxes_do_not() {
        let dom = parse_html(r#"<div class="bg-gray-800 text-white p-6 font-serif"><p>Name</p></div>"#);
        let tree = build_styled_tree(&dom, None);
        let StyledNode::Element { children, .. } = &tree[0] else {
            panic!("expected element");
        };
        let StyledNode::Element { style, children, .. } = &children[0] else {
            panic!("expected p");
        };
        assert_eq!(style.color, Color::WHITE);
        assert_eq!(style.font_family, FontFamily::Serif);
        assert!(style.background_color.is_transparent());
        assert!(style.padding.is_zero());
        assert!(matches!(children[0], StyledNode::Text { .. }));
    }
}
