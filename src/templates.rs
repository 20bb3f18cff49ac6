//! Template renderer – builds the HTML fragments for each style variant.
//!
//! Every function here is pure: the same record, variant and window always
//! produce the same markup. Measurement lays out the per-key fragments
//! ([`fragment_for`]) and page rendering concatenates exactly the same
//! fragments ([`render_page`]), so a page is as tall as the sum of the
//! heights the paginator packed onto it.
//!
//! Which sections and items appear is decided by the [`PageWindow`]; nothing
//! in this module chooses or reorders content.

use crate::dom::escape_html;
use crate::record::{join_nonempty, ResumeRecord};
use crate::section::{HeightKey, PageWindow, SectionKind};
use crate::variant::{StyleVariant, Theme};

/// Page number the continuation header is measured with. Its height does not
/// depend on the number.
pub const MEASURE_PAGE_NUMBER: usize = 2;

const CONTINUED_MARKER: &str = " (continued)";

/// Wrap fragment markup in the variant's root element.
pub fn wrap_root(variant: StyleVariant, inner: &str) -> String {
    format!(r#"<div class="{}">{}</div>"#, variant.theme().font, inner)
}

/// Render one page: header, then each placed section in window order.
///
/// `page_index` is zero-based; the continuation header shows `page_index + 1`.
pub fn render_page(
    record: &ResumeRecord,
    window: &PageWindow,
    page_index: usize,
    is_first_page: bool,
    variant: StyleVariant,
) -> String {
    let mut html = if is_first_page {
        page_header(record, variant)
    } else {
        continuation_header(record, variant, page_index + 1)
    };

    for placed in &window.sections {
        if placed.kind.is_multi_item() {
            html.push_str(&section_header(variant, placed.kind, placed.is_continuation));
            for &idx in &placed.items {
                match item(record, variant, placed.kind, idx) {
                    Some(fragment) => html.push_str(&fragment),
                    None => log::warn!(
                        "page {}: {} item {idx} is not in the record, skipping",
                        page_index + 1,
                        placed.kind.name()
                    ),
                }
            }
        } else {
            html.push_str(&block(record, variant, placed.kind));
        }
    }

    wrap_root(variant, &html)
}

/// The fragment measured for `key`, already wrapped in the variant root.
/// `None` for an item index the record does not have.
pub fn fragment_for(record: &ResumeRecord, variant: StyleVariant, key: HeightKey) -> Option<String> {
    let inner = match key {
        HeightKey::PageHeader => page_header(record, variant),
        HeightKey::ContinuationHeader => continuation_header(record, variant, MEASURE_PAGE_NUMBER),
        HeightKey::SectionHeader(kind) => section_header(variant, kind, false),
        HeightKey::Block(kind) => block(record, variant, kind),
        HeightKey::Item(kind, idx) => item(record, variant, kind, idx)?,
    };
    Some(wrap_root(variant, &inner))
}

/// Full name, job title, and portrait opening page 1.
pub fn page_header(record: &ResumeRecord, variant: StyleVariant) -> String {
    let theme = variant.theme();
    let p = &record.personal;

    let mut html = format!(r#"<div class="{}">"#, theme.header);
    if theme.show_photo {
        if let Some(src) = p.photo.as_deref().filter(|s| s.starts_with("data:image/")) {
            html.push_str(&format!(r#"<img class="{}" src="{}">"#, theme.photo, escape_html(src)));
        }
    }
    html.push_str(r#"<div class="flex-1">"#);
    let name = record.full_name();
    if !name.is_empty() {
        html.push_str(&format!(r#"<h1 class="{}">{}</h1>"#, theme.header_name, escape_html(&name)));
    }
    push_paragraph(&mut html, theme.header_title, &p.job_title);
    html.push_str("</div></div>");
    html
}

/// "{Name} - Page {n}" bar opening every later page.
pub fn continuation_header(record: &ResumeRecord, variant: StyleVariant, page_number: usize) -> String {
    let theme = variant.theme();
    let label = join_nonempty(&[&record.full_name(), &format!("Page {page_number}")], " - ");
    format!(
        r#"<div class="{}"><p class="{}">{}</p></div>"#,
        theme.continuation,
        theme.continuation_name,
        escape_html(&label)
    )
}

/// Title row of a multi-item section.
pub fn section_header(variant: StyleVariant, kind: SectionKind, is_continuation: bool) -> String {
    let theme = variant.theme();
    let marker = if is_continuation { CONTINUED_MARKER } else { "" };
    format!(
        r#"<h2 class="{}">{}{}</h2>"#,
        theme.section_title,
        escape_html(theme.labels.label(kind)),
        marker
    )
}

/// A whole single-block section, title included.
pub fn block(record: &ResumeRecord, variant: StyleVariant, kind: SectionKind) -> String {
    let theme = variant.theme();
    let p = &record.personal;
    let mut body = String::new();

    match kind {
        SectionKind::Contact => {
            for line in [&p.address, &p.email, &p.phone, &p.website] {
                push_paragraph(&mut body, "text-sm text-gray-700", line);
            }
        }
        SectionKind::Profile => {
            for para in p.bio.lines() {
                push_paragraph(&mut body, "text-sm mb-1", para);
            }
        }
        SectionKind::Skills => {
            let skills = record.skills.iter().filter(|s| !s.trim().is_empty());
            match theme.skill_chip {
                Some(chip) => {
                    body.push_str(r#"<div class="flex flex-wrap gap-2">"#);
                    for skill in skills {
                        body.push_str(&format!(r#"<span class="{chip}">{}</span>"#, escape_html(skill.trim())));
                    }
                    body.push_str("</div>");
                }
                None => push_list(&mut body, skills.map(|s| s.trim().to_string())),
            }
        }
        SectionKind::Languages => {
            let labels = record
                .languages
                .iter()
                .map(|l| l.label())
                .filter(|l| !l.is_empty());
            push_list(&mut body, labels);
        }
        SectionKind::Experience | SectionKind::Education => {
            log::warn!("{} is a multi-item section, rendering as a header only", kind.name());
        }
    }

    format!(
        r#"<div class="{}"><h2 class="{}">{}</h2>{}</div>"#,
        theme.block_body,
        theme.section_title,
        escape_html(theme.labels.label(kind)),
        body
    )
}

/// One experience or education entry. `None` when `idx` is out of range.
pub fn item(record: &ResumeRecord, variant: StyleVariant, kind: SectionKind, idx: usize) -> Option<String> {
    let theme = variant.theme();
    let (title, dates, organisation, description) = match kind {
        SectionKind::Experience => {
            let e = record.experience.get(idx)?;
            (e.title.as_str(), e.date_range(), e.organisation_line(), e.description.as_str())
        }
        SectionKind::Education => {
            let e = record.education.get(idx)?;
            (e.degree.as_str(), e.date_range(), e.organisation_line(), e.description.as_str())
        }
        _ => return None,
    };

    let mut html = format!(r#"<div class="{}">"#, theme.item);
    push_title_row(&mut html, theme, title, &dates);
    push_paragraph(&mut html, "text-sm text-gray-600 mb-1", &organisation);
    for para in description.lines() {
        push_paragraph(&mut html, "text-sm", para);
    }
    html.push_str("</div>");
    Some(html)
}

fn push_title_row(html: &mut String, theme: &Theme, title: &str, dates: &str) {
    let (title, dates) = (title.trim(), dates.trim());
    if title.is_empty() && dates.is_empty() {
        return;
    }
    html.push_str(r#"<div class="flex justify-between">"#);
    if !title.is_empty() {
        let weight = if theme.font == "font-serif" { "font-bold" } else { "font-semibold" };
        html.push_str(&format!(
            r#"<span class="text-base {weight}">{}</span>"#,
            escape_html(title)
        ));
    }
    if !dates.is_empty() {
        html.push_str(&format!(
            r#"<span class="text-sm text-gray-600">{}</span>"#,
            escape_html(dates)
        ));
    }
    html.push_str("</div>");
}

fn push_paragraph(html: &mut String, class: &str, text: &str) {
    let text = text.trim();
    if !text.is_empty() {
        html.push_str(&format!(r#"<p class="{class}">{}</p>"#, escape_html(text)));
    }
}

fn push_list(html: &mut String, items: impl Iterator<Item = String>) {
    html.push_str(r#"<ul class="text-sm">"#);
    for it in items {
        html.push_str(&format!("<li>{}</li>", escape_html(&it)));
    }
    html.push_str("</ul>");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::section::PlacedSection;

    fn window(sections: Vec<PlacedSection>) -> PageWindow {
        PageWindow {
            page_number: 1,
            sections,
        }
    }

    #[test]
    fn first_page_has_full_header() {
        let r = ResumeRecord::sample();
        let html = render_page(&r, &window(vec![]), 0, true, StyleVariant::Professional);
        assert!(html.contains("Matthew Smith"));
        assert!(html.contains("Service Designer"));
        assert!(!html.contains("Page 1"));
    }

    #[test]
    fn later_pages_use_continuation_header() {
        let r = ResumeRecord::sample();
        let html = render_page(&r, &window(vec![]), 2, false, StyleVariant::Modern);
        assert!(html.contains("Matthew Smith - Page 3"));
        assert!(!html.contains("Service Designer"));
    }

    #[test]
    fn renders_only_listed_items() {
        let mut r = ResumeRecord::sample();
        let mut second = r.experience[0].clone();
        second.company = "Spotify".into();
        r.experience.push(second);

        let w = window(vec![PlacedSection {
            kind: SectionKind::Experience,
            items: vec![1],
            is_continuation: true,
        }]);
        let html = render_page(&r, &w, 1, false, StyleVariant::Professional);
        assert!(html.contains("Spotify"));
        assert!(!html.contains("Uber"));
        assert!(html.contains("Experience (continued)"));
    }

    #[test]
    fn out_of_range_items_are_skipped() {
        let r = ResumeRecord::sample();
        let w = window(vec![PlacedSection {
            kind: SectionKind::Education,
            items: vec![0, 7],
            is_continuation: false,
        }]);
        let html = render_page(&r, &w, 0, true, StyleVariant::Academic);
        assert_eq!(html.matches("University").count(), 1);
        assert!(fragment_for(&r, StyleVariant::Academic, HeightKey::Item(SectionKind::Education, 7)).is_none());
    }

    #[test]
    fn user_text_is_escaped() {
        let mut r = ResumeRecord::sample();
        r.personal.first_name = "<script>".into();
        r.skills = vec!["C & C++".into()];
        let header = page_header(&r, StyleVariant::Minimal);
        assert!(header.contains("&lt;script&gt;"));
        let skills = block(&r, StyleVariant::Minimal, SectionKind::Skills);
        assert!(skills.contains("C &amp; C++"));
    }

    #[test]
    fn chips_only_for_chip_variants() {
        let r = ResumeRecord::sample();
        assert!(block(&r, StyleVariant::Creative, SectionKind::Skills).contains("flex-wrap"));
        assert!(block(&r, StyleVariant::Executive, SectionKind::Skills).contains("<li>"));
    }

    #[test]
    fn photo_only_where_the_variant_shows_one() {
        let mut r = ResumeRecord::sample();
        r.personal.photo = Some("data:image/png;base64,AAAA".into());
        assert!(page_header(&r, StyleVariant::Modern).contains("<img"));
        assert!(!page_header(&r, StyleVariant::Minimal).contains("<img"));
        r.personal.photo = Some("https://example.com/me.png".into());
        assert!(!page_header(&r, StyleVariant::Modern).contains("<img"));
    }

    #[test]
    fn rendering_is_deterministic() {
        let r = ResumeRecord::sample();
        let w = window(vec![PlacedSection {
            kind: SectionKind::Profile,
            items: vec![0],
            is_continuation: false,
        }]);
        for v in StyleVariant::ALL {
            assert_eq!(render_page(&r, &w, 0, true, v), render_page(&r, &w, 0, true, v));
        }
    }
}
