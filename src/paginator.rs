//! Paginator – greedy first-fit packing of measured sections into pages.
//!
//! Works on numbers only. Sections are walked in canonical order and items in
//! original order, so concatenating every page reproduces the record. An
//! atomic unit goes on the current page when its height is at most what is
//! left; otherwise the page closes first. A unit taller than a whole page
//! still gets placed, alone, and the page after it starts fresh.

use crate::record::ResumeRecord;
use crate::section::{
    sections_for, HeightKey, LayoutConditions, MeasuredHeights, PageAssignment, PageWindow,
    PlacedSection, Section,
};

/// Slack for float noise in the fits-or-under rule.
const EPS: f32 = 1e-3;

struct PageBuilder {
    pages: Vec<PageWindow>,
    current: Vec<PlacedSection>,
    remaining: f32,
    capacity: f32,
    reserve_continuation: f32,
}

impl PageBuilder {
    fn new(capacity: f32, reserve_top: f32, reserve_continuation: f32) -> Self {
        Self {
            pages: Vec::new(),
            current: Vec::new(),
            remaining: capacity - reserve_top,
            capacity,
            reserve_continuation,
        }
    }

    fn fits(&self, need: f32) -> bool {
        need <= self.remaining + EPS
    }

    fn page_is_empty(&self) -> bool {
        self.current.is_empty()
    }

    fn break_page(&mut self) {
        let sections = std::mem::take(&mut self.current);
        self.pages.push(PageWindow {
            page_number: self.pages.len() + 1,
            sections,
        });
        self.remaining = self.capacity - self.reserve_continuation;
    }

    fn place_block(&mut self, section: &Section, height: f32) {
        if !self.fits(height) && !self.page_is_empty() {
            self.break_page();
        }
        self.current.push(PlacedSection {
            kind: section.kind,
            items: vec![0],
            is_continuation: false,
        });
        self.remaining -= height;
    }

    fn place_items(&mut self, section: &Section, header: f32, items: &[f32]) {
        let mut started = false;
        let mut open_here = false;

        for (idx, &height) in items.iter().enumerate() {
            let mut need = if open_here { height } else { header + height };
            if !self.fits(need) && !self.page_is_empty() {
                self.break_page();
                open_here = false;
                need = header + height;
            }
            if !open_here {
                self.current.push(PlacedSection {
                    kind: section.kind,
                    items: Vec::new(),
                    is_continuation: started,
                });
                open_here = true;
            }
            if let Some(placed) = self.current.last_mut() {
                placed.items.push(idx);
            }
            self.remaining -= need;
            started = true;
        }
    }

    fn finish(mut self) -> Vec<PageWindow> {
        if !self.current.is_empty() || self.pages.is_empty() {
            self.break_page();
        }
        self.pages
    }
}

/// Partition `sections` into pages.
///
/// `capacity` is the usable height of one page; `reserve_top` is taken off
/// page 1 for the full header and `reserve_continuation` off every later page
/// for the continuation header. Incomplete heights or unusable capacities
/// yield the single-page fallback instead of an error.
pub fn paginate(
    sections: &[Section],
    heights: &MeasuredHeights,
    capacity: f32,
    reserve_top: f32,
    reserve_continuation: f32,
) -> PageAssignment {
    let conditions = heights.conditions;
    let usable = |v: f32| v.is_finite() && v >= 0.0;

    if !(capacity.is_finite() && capacity > 0.0) || !usable(reserve_top) || !usable(reserve_continuation) {
        log::warn!(
            "pagination fallback: capacity {capacity}, reserves {reserve_top}/{reserve_continuation}"
        );
        return fallback_assignment(sections, conditions);
    }
    if !heights.covers(sections) {
        log::warn!(
            "pagination fallback: {} of {} heights measured",
            heights.len(),
            MeasuredHeights::required_keys(sections).len()
        );
        return fallback_assignment(sections, conditions);
    }

    let mut ordered: Vec<&Section> = sections.iter().filter(|s| s.item_count > 0).collect();
    ordered.sort_by_key(|s| s.kind.rank());

    let height = |key: HeightKey| heights.get(key).unwrap_or(0.0);
    let mut builder = PageBuilder::new(capacity, reserve_top, reserve_continuation);
    for section in ordered {
        if section.kind.is_multi_item() {
            let items: Vec<f32> = (0..section.item_count)
                .map(|i| height(HeightKey::Item(section.kind, i)))
                .collect();
            builder.place_items(section, height(HeightKey::SectionHeader(section.kind)), &items);
        } else {
            builder.place_block(section, height(HeightKey::Block(section.kind)));
        }
    }

    let pages = builder.finish();
    log::debug!("paginated {} sections onto {} pages", sections.len(), pages.len());
    PageAssignment {
        pages,
        conditions,
        fallback: false,
    }
}

/// Everything on one page, in canonical order, flagged as a fallback.
pub fn fallback_assignment(sections: &[Section], conditions: LayoutConditions) -> PageAssignment {
    let mut ordered: Vec<&Section> = sections.iter().filter(|s| s.item_count > 0).collect();
    ordered.sort_by_key(|s| s.kind.rank());
    let placed = ordered
        .into_iter()
        .map(|s| PlacedSection {
            kind: s.kind,
            items: (0..s.item_count).collect(),
            is_continuation: false,
        })
        .collect();
    PageAssignment {
        pages: vec![PageWindow {
            page_number: 1,
            sections: placed,
        }],
        conditions,
        fallback: true,
    }
}

/// Paginate `record` with the capacity and header reserves taken from the
/// measurement itself.
pub fn paginate_with_heights(record: &ResumeRecord, heights: &MeasuredHeights) -> PageAssignment {
    let sections = sections_for(record);
    let capacity = heights.conditions.geometry.capacity();
    let reserve_top = heights.get(HeightKey::PageHeader).unwrap_or(f32::NAN);
    let reserve_continuation = heights.get(HeightKey::ContinuationHeader).unwrap_or(f32::NAN);
    paginate(&sections, heights, capacity, reserve_top, reserve_continuation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::PageGeometry;
    use crate::section::SectionKind;
    use crate::variant::StyleVariant;

    fn conditions() -> LayoutConditions {
        LayoutConditions {
            geometry: PageGeometry::default(),
            variant: StyleVariant::Professional,
            font_fingerprint: 7,
        }
    }

    fn blocks(kinds: &[(SectionKind, f32)]) -> (Vec<Section>, MeasuredHeights) {
        let mut h = MeasuredHeights::new(conditions());
        h.insert(HeightKey::PageHeader, 0.0);
        h.insert(HeightKey::ContinuationHeader, 0.0);
        let sections = kinds
            .iter()
            .map(|&(kind, height)| {
                h.insert(HeightKey::Block(kind), height);
                Section { kind, item_count: 1 }
            })
            .collect();
        (sections, h)
    }

    fn with_items(h: &mut MeasuredHeights, kind: SectionKind, header: f32, items: &[f32]) -> Section {
        h.insert(HeightKey::SectionHeader(kind), header);
        for (i, &ih) in items.iter().enumerate() {
            h.insert(HeightKey::Item(kind, i), ih);
        }
        Section {
            kind,
            item_count: items.len(),
        }
    }

    #[test]
    fn exact_fit_stays_on_the_page() {
        let (sections, h) = blocks(&[(SectionKind::Contact, 60.0), (SectionKind::Profile, 40.0)]);
        let a = paginate(&sections, &h, 100.0, 0.0, 0.0);
        assert_eq!(a.total_pages(), 1);
        let a = paginate(&sections, &h, 99.0, 0.0, 0.0);
        assert_eq!(a.total_pages(), 2);
    }

    #[test]
    fn header_is_never_orphaned() {
        let (mut sections, mut h) = blocks(&[(SectionKind::Profile, 80.0)]);
        sections.push(with_items(&mut h, SectionKind::Experience, 15.0, &[30.0]));
        // 20 left after the profile: enough for the header, not header + item.
        let a = paginate(&sections, &h, 100.0, 0.0, 0.0);
        assert_eq!(a.total_pages(), 2);
        assert_eq!(a.pages[0].sections.len(), 1);
        let exp = &a.pages[1].sections[0];
        assert_eq!(exp.kind, SectionKind::Experience);
        assert!(!exp.is_continuation);
    }

    #[test]
    fn split_section_gets_continuation_header() {
        let mut h = MeasuredHeights::new(conditions());
        h.insert(HeightKey::PageHeader, 20.0);
        h.insert(HeightKey::ContinuationHeader, 10.0);
        let s = with_items(&mut h, SectionKind::Education, 10.0, &[40.0, 40.0, 40.0]);
        let a = paginate(&[s], &h, 110.0, 20.0, 10.0);
        assert_eq!(a.total_pages(), 2);
        assert_eq!(a.pages[0].sections[0].items, vec![0, 1]);
        assert_eq!(a.pages[1].sections[0].items, vec![2]);
        assert!(a.pages[1].sections[0].is_continuation);
    }

    #[test]
    fn oversized_block_sits_alone() {
        let (sections, h) = blocks(&[
            (SectionKind::Contact, 10.0),
            (SectionKind::Profile, 500.0),
            (SectionKind::Skills, 10.0),
        ]);
        let a = paginate(&sections, &h, 100.0, 0.0, 0.0);
        assert_eq!(a.total_pages(), 3);
        assert_eq!(a.pages[1].sections.len(), 1);
        assert_eq!(a.pages[1].sections[0].kind, SectionKind::Profile);
        assert_eq!(a.pages[2].sections[0].kind, SectionKind::Skills);
    }

    #[test]
    fn input_order_does_not_matter() {
        let (mut sections, h) = blocks(&[(SectionKind::Skills, 10.0), (SectionKind::Contact, 10.0)]);
        let a = paginate(&sections, &h, 100.0, 0.0, 0.0);
        sections.reverse();
        let b = paginate(&sections, &h, 100.0, 0.0, 0.0);
        assert_eq!(a, b);
        assert_eq!(a.pages[0].sections[0].kind, SectionKind::Contact);
    }

    #[test]
    fn missing_height_falls_back_to_one_page() {
        let (mut sections, mut h) = blocks(&[(SectionKind::Contact, 400.0)]);
        sections.push(Section {
            kind: SectionKind::Experience,
            item_count: 3,
        });
        h.insert(HeightKey::SectionHeader(SectionKind::Experience), 10.0);
        let a = paginate(&sections, &h, 100.0, 0.0, 0.0);
        assert!(a.fallback);
        assert_eq!(a.total_pages(), 1);
        assert_eq!(a.flattened().len(), 4);
    }

    #[test]
    fn unusable_capacity_falls_back() {
        let (sections, h) = blocks(&[(SectionKind::Contact, 10.0)]);
        assert!(paginate(&sections, &h, 0.0, 0.0, 0.0).fallback);
        assert!(paginate(&sections, &h, f32::INFINITY, 0.0, 0.0).fallback);
        assert!(paginate(&sections, &h, 100.0, -1.0, 0.0).fallback);
    }

    #[test]
    fn empty_sections_contribute_nothing() {
        let (mut sections, h) = blocks(&[(SectionKind::Contact, 10.0)]);
        sections.push(Section {
            kind: SectionKind::Experience,
            item_count: 0,
        });
        let a = paginate(&sections, &h, 100.0, 0.0, 0.0);
        assert_eq!(a.flattened(), vec![(SectionKind::Contact, 0)]);

        let empty = paginate(&[], &h, 100.0, 0.0, 0.0);
        assert_eq!(empty.total_pages(), 1);
        assert!(empty.pages[0].sections.is_empty());
    }
}
