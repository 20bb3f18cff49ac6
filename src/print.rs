//! Print path – a standalone HTML document for the platform print dialog.
//!
//! The document holds one `.page` section per window of the assignment the
//! preview is showing, each filled with exactly the fragment the preview and
//! the PDF export render. A stylesheet generated from the utility classes in
//! use reproduces the layout engine's box model in CSS.

use std::collections::BTreeSet;
use std::fmt::Write as _;

use crate::dom::{escape_html, parse_html, DomNode};
use crate::pipeline::{PageGeometry, A4_HEIGHT_PT, A4_WIDTH_PT};
use crate::record::ResumeRecord;
use crate::section::PageAssignment;
use crate::style::{
    apply_class, AlignItems, Color, ComputedStyle, Dimension, Display, FlexDirection, FlexWrap,
    FontFamily, FontStyle, FontWeight, JustifyContent, Sides, TextAlign, TextTransform,
};
use crate::templates::render_page;
use crate::variant::StyleVariant;

/// Element defaults matching the layout engine: blocks stack as flex columns
/// with no collapsing margins.
const BASE_CSS: &str = "\
*{box-sizing:border-box;margin:0;padding:0;border:0 solid #e5e7eb}
html{-webkit-print-color-adjust:exact;print-color-adjust:exact}
body{font-family:Helvetica,Arial,sans-serif;font-size:12pt;line-height:1.4;color:#000}
div,p,h1,h2,h3,ul,li{display:flex;flex-direction:column}
h1{font-size:24pt;font-weight:700}
h2{font-size:18pt;font-weight:700}
h3{font-size:15pt;font-weight:600}
ul{padding-left:18pt;list-style:none}
li{position:relative}
li::before{content:\"\\2022\";position:absolute;left:-12pt}
img{display:block;flex-shrink:0}
";

/// Build the print document for the current assignment.
pub fn print_document(
    assignment: &PageAssignment,
    record: &ResumeRecord,
    variant: StyleVariant,
    geometry: PageGeometry,
) -> String {
    let pages: Vec<String> = assignment
        .pages
        .iter()
        .enumerate()
        .map(|(i, window)| render_page(record, window, i, i == 0, variant))
        .collect();

    let mut classes = BTreeSet::new();
    for html in &pages {
        collect_classes(&parse_html(html), &mut classes);
    }

    let title = match record.full_name() {
        name if name.is_empty() => "Resume".to_string(),
        name => format!("{name} - Resume"),
    };

    let mut out = String::new();
    out.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    let _ = writeln!(out, "<title>{}</title>", escape_html(&title));
    out.push_str("<style>\n");
    out.push_str(&page_css(geometry));
    out.push_str(BASE_CSS);
    for class in &classes {
        let decls = declarations(class);
        if !decls.is_empty() {
            let _ = writeln!(out, ".{}{{{}}}", escape_selector(class), decls.join(";"));
        }
    }
    out.push_str("</style>\n</head>\n<body>\n");
    for (i, html) in pages.iter().enumerate() {
        let _ = writeln!(out, "<section class=\"page\" data-page=\"{}\">{html}</section>", i + 1);
    }
    out.push_str("</body>\n</html>\n");

    log::debug!(
        "print document: {} pages, {} utility classes",
        pages.len(),
        classes.len()
    );
    out
}

fn page_css(g: PageGeometry) -> String {
    let is_a4 = (g.page_width - A4_WIDTH_PT).abs() < 0.5 && (g.page_height - A4_HEIGHT_PT).abs() < 0.5;
    let size = if is_a4 {
        "A4".to_string()
    } else {
        format!("{}pt {}pt", g.page_width, g.page_height)
    };
    format!(
        "@page{{size:{size};margin:0}}\n\
         .page{{width:{}pt;height:{}pt;padding:{}pt;overflow:hidden;break-after:page}}\n\
         .page:last-child{{break-after:auto}}\n",
        g.page_width, g.page_height, g.page_margin
    )
}

fn collect_classes(nodes: &[DomNode], out: &mut BTreeSet<String>) {
    for node in nodes {
        if let DomNode::Element(e) = node {
            out.extend(e.classes().into_iter().map(str::to_string));
            collect_classes(&e.children, out);
        }
    }
}

fn escape_selector(class: &str) -> String {
    class
        .chars()
        .fold(String::with_capacity(class.len()), |mut s, c| {
            if matches!(c, '/' | '.' | ':') {
                s.push('\\');
            }
            s.push(c);
            s
        })
}

fn css_color(c: Color) -> String {
    let ch = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    if c.is_transparent() {
        "transparent".to_string()
    } else {
        format!("rgb({},{},{})", ch(c.r), ch(c.g), ch(c.b))
    }
}

fn css_dimension(d: Dimension) -> String {
    match d {
        Dimension::Auto => "auto".to_string(),
        Dimension::Pt(v) => format!("{v}pt"),
        Dimension::Percent(v) => format!("{v}%"),
    }
}

fn push_sides(out: &mut Vec<String>, property: &str, suffix: &str, base: Sides, s: Sides) {
    for (side, b, v) in [
        ("top", base.top, s.top),
        ("right", base.right, s.right),
        ("bottom", base.bottom, s.bottom),
        ("left", base.left, s.left),
    ] {
        if b != v {
            out.push(format!("{property}-{side}{suffix}:{v}pt"));
        }
    }
}

/// CSS declarations for one utility class, derived from what the class
/// changes on a default style. Empty for classes the resolver ignores.
fn declarations(class: &str) -> Vec<String> {
    let base = ComputedStyle::default();
    let mut s = base.clone();
    if !apply_class(&mut s, class) {
        return Vec::new();
    }

    let mut out = Vec::new();
    if s.display != base.display {
        out.push(
            match s.display {
                Display::Block => "display:flex;flex-direction:column",
                Display::Flex => "display:flex;flex-direction:row",
                Display::Inline => "display:inline-flex",
                Display::None => "display:none",
            }
            .to_string(),
        );
    }
    if s.flex_direction == FlexDirection::Column {
        out.push("flex-direction:column".to_string());
    }
    if s.flex_wrap == FlexWrap::Wrap {
        out.push("flex-wrap:wrap".to_string());
    }
    if s.flex_grow != base.flex_grow {
        out.push(format!("flex-grow:{}", s.flex_grow));
    }
    if s.flex_shrink != base.flex_shrink {
        out.push(format!("flex-shrink:{}", s.flex_shrink));
    }
    if s.justify_content != base.justify_content {
        out.push(format!(
            "justify-content:{}",
            match s.justify_content {
                JustifyContent::Start => "flex-start",
                JustifyContent::End => "flex-end",
                JustifyContent::Center => "center",
                JustifyContent::SpaceBetween => "space-between",
            }
        ));
    }
    if s.align_items != base.align_items {
        out.push(format!(
            "align-items:{}",
            match s.align_items {
                AlignItems::Start => "flex-start",
                AlignItems::End => "flex-end",
                AlignItems::Center => "center",
                AlignItems::Stretch => "stretch",
            }
        ));
    }
    if s.gap != base.gap {
        out.push(format!("gap:{}pt", s.gap));
    }
    if s.width != base.width {
        out.push(format!("width:{}", css_dimension(s.width)));
    }
    if s.height != base.height {
        out.push(format!("height:{}", css_dimension(s.height)));
    }
    push_sides(&mut out, "margin", "", base.margin, s.margin);
    push_sides(&mut out, "padding", "", base.padding, s.padding);
    push_sides(&mut out, "border", "-width", base.border, s.border);
    if s.border_color != base.border_color {
        out.push(format!("border-color:{}", css_color(s.border_color)));
    }
    if s.background_color != base.background_color {
        out.push(format!("background-color:{}", css_color(s.background_color)));
    }
    if s.font_size != base.font_size {
        out.push(format!("font-size:{}pt", s.font_size));
    }
    if s.font_weight != base.font_weight {
        let weight = match s.font_weight {
            FontWeight::Normal => 400,
            FontWeight::Medium => 500,
            FontWeight::Semibold => 600,
            FontWeight::Bold => 700,
        };
        out.push(format!("font-weight:{weight}"));
    }
    if s.font_family != base.font_family {
        out.push(
            match s.font_family {
                FontFamily::Sans => "font-family:Helvetica,Arial,sans-serif",
                FontFamily::Serif => "font-family:'Times New Roman',Times,serif",
            }
            .to_string(),
        );
    }
    if s.font_style != base.font_style {
        out.push(
            match s.font_style {
                FontStyle::Normal => "font-style:normal",
                FontStyle::Italic => "font-style:italic",
            }
            .to_string(),
        );
    }
    if s.text_transform != base.text_transform {
        out.push(
            match s.text_transform {
                TextTransform::None => "text-transform:none",
                TextTransform::Uppercase => "text-transform:uppercase",
                TextTransform::Lowercase => "text-transform:lowercase",
            }
            .to_string(),
        );
    }
    if s.color != base.color {
        out.push(format!("color:{}", css_color(s.color)));
    }
    if s.text_align != base.text_align {
        out.push(format!("text-align:{}", s.text_align.name()));
        if s.text_align == TextAlign::Center {
            out.push("align-items:center".to_string());
        }
    }
    if s.line_height != base.line_height {
        out.push(format!("line-height:{}", s.line_height));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::section::{LayoutConditions, PageWindow, PlacedSection, SectionKind};

    fn two_pages() -> PageAssignment {
        let placed = |kind| PlacedSection {
            kind,
            items: vec![0],
            is_continuation: false,
        };
        PageAssignment {
            pages: vec![
                PageWindow {
                    page_number: 1,
                    sections: vec![placed(SectionKind::Contact), placed(SectionKind::Profile)],
                },
                PageWindow {
                    page_number: 2,
                    sections: vec![placed(SectionKind::Skills)],
                },
            ],
            conditions: LayoutConditions {
                geometry: PageGeometry::default(),
                variant: StyleVariant::Creative,
                font_fingerprint: 0,
            },
            fallback: false,
        }
    }

    #[test]
    fn one_section_per_assignment_page() {
        let doc = print_document(
            &two_pages(),
            &ResumeRecord::sample(),
            StyleVariant::Creative,
            PageGeometry::default(),
        );
        assert_eq!(doc.matches("<section class=\"page\"").count(), 2);
        assert!(doc.contains("data-page=\"2\""));
        assert!(doc.contains("@page{size:A4;margin:0}"));
        assert!(doc.contains("break-after:page"));
        assert!(doc.contains("Matthew Smith - Page 2"));
    }

    #[test]
    fn generates_rules_for_used_classes() {
        let doc = print_document(
            &two_pages(),
            &ResumeRecord::sample(),
            StyleVariant::Creative,
            PageGeometry::default(),
        );
        assert!(doc.contains(".mb-6{margin-bottom:18pt}"));
        assert!(doc.contains(".bg-emerald-600{background-color:rgb(5,150,105)}"));
        assert!(doc.contains(".flex{display:flex;flex-direction:row}"));
    }

    #[test]
    fn custom_page_size_is_explicit() {
        let css = page_css(PageGeometry {
            page_width: 612.0,
            page_height: 792.0,
            page_margin: 36.0,
        });
        assert!(css.contains("size:612pt 792pt"));
        assert!(css.contains("padding:36pt"));
    }

    #[test]
    fn selectors_are_escaped() {
        assert_eq!(escape_selector("w-1/2"), "w-1\\/2");
        assert!(declarations("rotate-45").is_empty());
        assert_eq!(declarations("border-b"), vec!["border-bottom-width:0.75pt"]);
    }
}
