//! Sections, measured heights and page assignments – the plain data that
//! flows between the measurer, the paginator and the renderers.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::pipeline::PageGeometry;
use crate::record::ResumeRecord;
use crate::variant::StyleVariant;

/// One of the fixed content groups of a resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionKind {
    Contact,
    Profile,
    Experience,
    Education,
    Skills,
    Languages,
}

impl SectionKind {
    /// Document flow order used by every variant.
    pub const CANONICAL: [SectionKind; 6] = [
        SectionKind::Contact,
        SectionKind::Profile,
        SectionKind::Experience,
        SectionKind::Education,
        SectionKind::Skills,
        SectionKind::Languages,
    ];

    /// Experience and education place entries individually; every other
    /// section is a single atomic block.
    pub fn is_multi_item(self) -> bool {
        matches!(self, SectionKind::Experience | SectionKind::Education)
    }

    pub fn name(self) -> &'static str {
        match self {
            SectionKind::Contact => "contact",
            SectionKind::Profile => "profile",
            SectionKind::Experience => "experience",
            SectionKind::Education => "education",
            SectionKind::Skills => "skills",
            SectionKind::Languages => "languages",
        }
    }

    pub(crate) fn rank(self) -> usize {
        Self::CANONICAL
            .iter()
            .position(|k| *k == self)
            .unwrap_or(Self::CANONICAL.len())
    }
}

/// A section and how many atomic items it owns (always 1 for block sections).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Section {
    pub kind: SectionKind,
    pub item_count: usize,
}

/// Build the canonical section list for a record, omitting empty sections.
pub fn sections_for(record: &ResumeRecord) -> Vec<Section> {
    let p = &record.personal;
    let filled = |s: &str| !s.trim().is_empty();

    let mut sections = Vec::new();
    if [&p.address, &p.email, &p.phone, &p.website]
        .iter()
        .any(|s| filled(s))
    {
        sections.push(Section {
            kind: SectionKind::Contact,
            item_count: 1,
        });
    }
    if filled(&p.bio) {
        sections.push(Section {
            kind: SectionKind::Profile,
            item_count: 1,
        });
    }
    if !record.experience.is_empty() {
        sections.push(Section {
            kind: SectionKind::Experience,
            item_count: record.experience.len(),
        });
    }
    if !record.education.is_empty() {
        sections.push(Section {
            kind: SectionKind::Education,
            item_count: record.education.len(),
        });
    }
    if record.skills.iter().any(|s| filled(s)) {
        sections.push(Section {
            kind: SectionKind::Skills,
            item_count: 1,
        });
    }
    if record
        .languages
        .iter()
        .any(|l| filled(&l.language) || filled(&l.proficiency))
    {
        sections.push(Section {
            kind: SectionKind::Languages,
            item_count: 1,
        });
    }
    sections
}

// ---------------------------------------------------------------------------
// Measured heights
// ---------------------------------------------------------------------------

/// Addressable unit of measured content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeightKey {
    /// Full name/title block opening page 1.
    PageHeader,
    /// Short "Name - Page n" block opening every later page.
    ContinuationHeader,
    /// Title row of a multi-item section.
    SectionHeader(SectionKind),
    /// A whole single-block section.
    Block(SectionKind),
    /// One entry of a multi-item section.
    Item(SectionKind, usize),
}

/// Everything a measurement depends on. Two passes with equal conditions
/// over the same record produce identical heights.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutConditions {
    pub geometry: PageGeometry,
    pub variant: StyleVariant,
    pub font_fingerprint: u64,
}

impl fmt::Display for LayoutConditions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{} on {}x{}pt, margin {}pt, fonts {:016x}]",
            self.variant,
            self.geometry.page_width,
            self.geometry.page_height,
            self.geometry.page_margin,
            self.font_fingerprint
        )
    }
}

/// Heights in points keyed by [`HeightKey`], valid for one record snapshot
/// under one set of [`LayoutConditions`]. Never persisted.
#[derive(Debug, Clone)]
pub struct MeasuredHeights {
    pub conditions: LayoutConditions,
    heights: HashMap<HeightKey, f32>,
}

impl MeasuredHeights {
    pub fn new(conditions: LayoutConditions) -> Self {
        Self {
            conditions,
            heights: HashMap::new(),
        }
    }

    pub fn insert(&mut self, key: HeightKey, height: f32) {
        self.heights.insert(key, height);
    }

    pub fn get(&self, key: HeightKey) -> Option<f32> {
        self.heights.get(&key).copied()
    }

    pub fn len(&self) -> usize {
        self.heights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heights.is_empty()
    }

    /// Every key the paginator will ask for when laying out `sections`.
    pub fn required_keys(sections: &[Section]) -> Vec<HeightKey> {
        let mut keys = vec![HeightKey::PageHeader, HeightKey::ContinuationHeader];
        for s in sections.iter().filter(|s| s.item_count > 0) {
            if s.kind.is_multi_item() {
                keys.push(HeightKey::SectionHeader(s.kind));
                keys.extend((0..s.item_count).map(|i| HeightKey::Item(s.kind, i)));
            } else {
                keys.push(HeightKey::Block(s.kind));
            }
        }
        keys
    }

    /// True when every required height is present, finite and non-negative.
    pub fn covers(&self, sections: &[Section]) -> bool {
        Self::required_keys(sections).into_iter().all(|k| {
            self.get(k)
                .map(|h| h.is_finite() && h >= 0.0)
                .unwrap_or(false)
        })
    }
}

// ---------------------------------------------------------------------------
// Page assignment
// ---------------------------------------------------------------------------

/// The paginator's output and the sole input to page rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageAssignment {
    pub pages: Vec<PageWindow>,
    /// Conditions the heights were measured under; export must match them.
    pub conditions: LayoutConditions,
    /// Set when measurement was incomplete and everything was put on one page.
    #[serde(default)]
    pub fallback: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageWindow {
    /// 1-indexed.
    pub page_number: usize,
    pub sections: Vec<PlacedSection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedSection {
    pub kind: SectionKind,
    /// Item indices in original order; `[0]` for block sections.
    pub items: Vec<usize>,
    /// The section already started on an earlier page.
    pub is_continuation: bool,
}

impl PageAssignment {
    pub fn total_pages(&self) -> usize {
        self.pages.len()
    }

    /// 1-indexed page lookup.
    pub fn page(&self, page_number: usize) -> Option<&PageWindow> {
        page_number
            .checked_sub(1)
            .and_then(|i| self.pages.get(i))
    }

    /// All placed items in page order, then in-page order.
    pub fn flattened(&self) -> Vec<(SectionKind, usize)> {
        self.pages
            .iter()
            .flat_map(|p| p.sections.iter())
            .flat_map(|s| s.items.iter().map(move |i| (s.kind, *i)))
            .collect()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::ResumeRecord;

    #[test]
    fn sample_has_every_section() {
        let kinds: Vec<SectionKind> = sections_for(&ResumeRecord::sample())
            .iter()
            .map(|s| s.kind)
            .collect();
        assert_eq!(kinds, SectionKind::CANONICAL.to_vec());
    }

    #[test]
    fn empty_sections_are_omitted() {
        let mut r = ResumeRecord::sample();
        r.experience.clear();
        r.personal.bio = "   ".into();
        r.skills = vec!["".into()];
        let kinds: Vec<SectionKind> = sections_for(&r).iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                SectionKind::Contact,
                SectionKind::Education,
                SectionKind::Languages
            ]
        );
    }

    #[test]
    fn coverage_requires_every_item() {
        let r = ResumeRecord::sample();
        let sections = sections_for(&r);
        let cond = LayoutConditions {
            geometry: PageGeometry::default(),
            variant: StyleVariant::Professional,
            font_fingerprint: 0,
        };
        let mut h = MeasuredHeights::new(cond);
        for key in MeasuredHeights::required_keys(&sections) {
            h.insert(key, 10.0);
        }
        assert!(h.covers(&sections));
        h.insert(HeightKey::Item(SectionKind::Experience, 0), f32::NAN);
        assert!(!h.covers(&sections));
    }

    #[test]
    fn assignment_json_errors_are_typed() {
        let a = PageAssignment {
            pages: vec![PageWindow {
                page_number: 1,
                sections: vec![PlacedSection {
                    kind: SectionKind::Skills,
                    items: vec![0],
                    is_continuation: false,
                }],
            }],
            conditions: LayoutConditions {
                geometry: PageGeometry::default(),
                variant: StyleVariant::Modern,
                font_fingerprint: 3,
            },
            fallback: false,
        };
        let json = a.to_json().unwrap();
        assert_eq!(PageAssignment::from_json(&json).unwrap(), a);
        assert!(matches!(
            PageAssignment::from_json("{\"pages\": 7}"),
            Err(crate::error::Error::Json(_))
        ));
    }
}
