//! Preview controller – keeps the latest page assignment in step with the
//! editor and lets the user page through it.
//!
//! Record edits are coalesced: each `on_change` restarts the window and one
//! measurement runs once the window has passed without further edits.
//! Variant and width changes take effect on the next `poll` regardless of
//! the window. Export and print always use the assignment currently on
//! screen, which always covers the current record: while measurement is
//! deferred, an edited record is shown as the single-page fallback.

use std::time::{Duration, Instant};

use crate::error::{Error, Result};
use crate::export::{export_document, ExportArtifact, ExportCancel, ExportContext};
use crate::fonts::FontManager;
use crate::measure::{measure, RenderSurface, SurfaceOp};
use crate::paginator::{fallback_assignment, paginate_with_heights};
use crate::pipeline::PipelineConfig;
use crate::print::print_document;
use crate::record::ResumeRecord;
use crate::render::PdfEncoder;
use crate::section::{sections_for, LayoutConditions, MeasuredHeights, PageAssignment};
use crate::templates::render_page;
use crate::variant::StyleVariant;

pub struct PreviewController {
    record: ResumeRecord,
    variant: StyleVariant,
    config: PipelineConfig,
    fonts: FontManager,
    surface: RenderSurface,
    heights: Option<MeasuredHeights>,
    assignment: PageAssignment,
    /// 1-indexed.
    current_page: usize,
    revision: u64,
    /// Bumped on every record edit.
    record_rev: u64,
    /// `record_rev` the installed assignment was built for.
    assignment_rev: u64,
    dirty: bool,
    immediate: bool,
    last_change: Option<Instant>,
}

impl PreviewController {
    /// Starts unmounted, showing a single-page fallback until the first
    /// measurement succeeds.
    pub fn new(record: ResumeRecord, variant: StyleVariant, config: PipelineConfig, fonts: FontManager) -> Self {
        let conditions = LayoutConditions {
            geometry: config.geometry(),
            variant,
            font_fingerprint: fonts.fingerprint(),
        };
        let assignment = fallback_assignment(&sections_for(&record), conditions);
        Self {
            record,
            variant,
            config,
            fonts,
            surface: RenderSurface::unmounted(),
            heights: None,
            assignment,
            current_page: 1,
            revision: 0,
            record_rev: 0,
            assignment_rev: 0,
            dirty: true,
            immediate: true,
            last_change: None,
        }
    }

    /// Attach the surface at the configured page geometry.
    pub fn mount(&mut self) {
        self.surface.mount(self.config.geometry());
        self.mark_dirty(true);
    }

    pub fn unmount(&mut self) {
        self.surface.unmount();
    }

    pub fn surface(&self) -> &RenderSurface {
        &self.surface
    }

    /// Replace the record. Measurement waits for the coalescing window.
    pub fn on_change(&mut self, record: ResumeRecord, now: Instant) {
        self.record = record;
        self.record_rev += 1;
        self.last_change = Some(now);
        self.mark_dirty(false);
    }

    pub fn set_variant(&mut self, variant: StyleVariant) {
        if variant != self.variant {
            self.variant = variant;
            self.mark_dirty(true);
        }
    }

    /// Resize the page, keeping the A-series ratio and the margin.
    pub fn set_page_width(&mut self, page_width: f32) {
        let geometry = self.config.geometry().with_width(page_width);
        self.config.page_width = geometry.page_width;
        self.config.page_height = geometry.page_height;
        if self.surface.is_attached() {
            self.surface.mount(geometry);
        }
        self.mark_dirty(true);
    }

    fn mark_dirty(&mut self, immediate: bool) {
        self.dirty = true;
        self.immediate |= immediate;
    }

    fn window(&self) -> Duration {
        self.config.coalesce_window()
    }

    /// Run a measurement pass if one is due. Returns true when a new
    /// assignment was installed.
    pub fn poll(&mut self, now: Instant) -> bool {
        if !self.dirty {
            return false;
        }
        let settled = match self.last_change {
            Some(at) => now.saturating_duration_since(at) >= self.window(),
            None => true,
        };
        if !(self.immediate || settled) {
            return false;
        }
        self.recompute()
    }

    /// Measure now, ignoring the coalescing window.
    pub fn flush(&mut self) -> bool {
        if !self.dirty {
            return false;
        }
        self.recompute()
    }

    fn recompute(&mut self) -> bool {
        match measure(&self.surface, &self.record, self.variant, &self.fonts) {
            Ok(heights) => {
                self.assignment = paginate_with_heights(&self.record, &heights);
                self.heights = Some(heights);
            }
            Err(e @ (Error::MeasurementNotReady | Error::SurfaceBusy(_))) => {
                log::debug!("measurement deferred: {e}");
                self.cover_current_record();
                return false;
            }
            Err(e) => {
                log::warn!("measurement failed, showing single-page fallback: {e}");
                self.heights = None;
                self.assignment = fallback_assignment(&sections_for(&self.record), self.conditions());
            }
        }
        self.assignment_rev = self.record_rev;
        self.dirty = false;
        self.immediate = false;
        self.revision += 1;
        self.clamp_page();
        true
    }

    /// Swap a stale assignment for the fallback of the current record, so
    /// nothing the record holds is missing from the screen.
    fn cover_current_record(&mut self) {
        let conditions = self.conditions();
        if self.assignment_rev == self.record_rev && self.assignment.conditions == conditions {
            return;
        }
        log::debug!("assignment predates the current record, showing single-page fallback");
        self.assignment = fallback_assignment(&sections_for(&self.record), conditions);
        self.assignment_rev = self.record_rev;
        self.heights = None;
        self.clamp_page();
    }

    fn conditions(&self) -> LayoutConditions {
        LayoutConditions {
            geometry: self.config.geometry(),
            variant: self.variant,
            font_fingerprint: self.fonts.fingerprint(),
        }
    }

    fn clamp_page(&mut self) {
        self.current_page = self.current_page.clamp(1, self.total_pages().max(1));
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn total_pages(&self) -> usize {
        self.assignment.total_pages()
    }

    pub fn next_page(&mut self) -> usize {
        self.go_to_page(self.current_page + 1)
    }

    pub fn prev_page(&mut self) -> usize {
        self.go_to_page(self.current_page.saturating_sub(1))
    }

    pub fn go_to_page(&mut self, page: usize) -> usize {
        self.current_page = page;
        self.clamp_page();
        self.current_page
    }

    pub fn assignment(&self) -> &PageAssignment {
        &self.assignment
    }

    pub fn heights(&self) -> Option<&MeasuredHeights> {
        self.heights.as_ref()
    }

    pub fn record(&self) -> &ResumeRecord {
        &self.record
    }

    pub fn variant(&self) -> StyleVariant {
        self.variant
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Number of measurement passes that installed an assignment.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// HTML of the page the user is looking at.
    pub fn render_current(&self) -> Result<String> {
        let lease = self.surface.acquire(SurfaceOp::Preview)?;
        lease.set_active_page(self.current_page);
        let index = self.current_page - 1;
        let window = self
            .assignment
            .page(self.current_page)
            .ok_or_else(|| Error::Layout(format!("page {} is not in the assignment", self.current_page)))?;
        Ok(render_page(&self.record, window, index, index == 0, self.variant))
    }

    /// Export the assignment on screen. Pending edits are measured first so
    /// the file matches what the preview is about to show; if they cannot be
    /// measured yet the export fails with [`Error::MeasurementNotReady`].
    pub fn export_pdf(&mut self, cancel: &ExportCancel) -> Result<ExportArtifact> {
        self.flush();
        if self.dirty {
            log::warn!("export refused: the current record has not been measured");
            return Err(Error::MeasurementNotReady);
        }
        let ctx = ExportContext {
            record: &self.record,
            variant: self.variant,
            fonts: &self.fonts,
            geometry: self.config.geometry(),
            title: &self.config.title,
        };
        export_document(&self.assignment, &ctx, &self.surface, cancel, PdfEncoder::new())
    }

    /// Print document for the assignment on screen.
    pub fn print_document(&mut self) -> String {
        self.flush();
        print_document(&self.assignment, &self.record, self.variant, self.config.geometry())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::section::SectionKind;

    fn controller() -> PreviewController {
        let mut c = PreviewController::new(
            ResumeRecord::sample(),
            StyleVariant::Professional,
            PipelineConfig::default(),
            FontManager::default(),
        );
        c.mount();
        c
    }

    fn long_record() -> ResumeRecord {
        let mut r = ResumeRecord::sample();
        let entry = r.experience[0].clone();
        r.experience = vec![entry; 14];
        r
    }

    #[test]
    fn unmounted_controller_keeps_fallback() {
        let mut c = PreviewController::new(
            ResumeRecord::sample(),
            StyleVariant::Modern,
            PipelineConfig::default(),
            FontManager::default(),
        );
        assert!(!c.flush());
        assert!(c.assignment().fallback);
        assert!(c.is_dirty());
        c.mount();
        assert!(c.flush());
        assert!(!c.assignment().fallback);
    }

    #[test]
    fn rapid_edits_are_coalesced() {
        let mut c = controller();
        let t0 = Instant::now();
        assert!(c.poll(t0));
        let base = c.revision();

        for i in 0..5 {
            let mut r = ResumeRecord::sample();
            r.personal.first_name = format!("Matt{i}");
            c.on_change(r, t0 + Duration::from_millis(i * 50));
            assert!(!c.poll(t0 + Duration::from_millis(i * 50 + 10)));
        }
        assert_eq!(c.revision(), base);
        assert!(c.poll(t0 + Duration::from_millis(200 + 250)));
        assert_eq!(c.revision(), base + 1);
        assert!(!c.poll(t0 + Duration::from_secs(5)));
    }

    #[test]
    fn current_page_is_clamped_when_content_shrinks() {
        let mut c = controller();
        let t0 = Instant::now();
        c.on_change(long_record(), t0);
        c.flush();
        assert!(c.total_pages() >= 2);
        c.go_to_page(99);
        assert_eq!(c.current_page(), c.total_pages());

        c.on_change(ResumeRecord::sample(), t0);
        c.flush();
        assert_eq!(c.total_pages(), 1);
        assert_eq!(c.current_page(), 1);
    }

    #[test]
    fn navigation_stays_in_range() {
        let mut c = controller();
        c.on_change(long_record(), Instant::now());
        c.flush();
        assert_eq!(c.prev_page(), 1);
        assert_eq!(c.next_page(), 2);
        assert!(c.render_current().unwrap().contains("Matthew Smith - Page 2"));
        assert_eq!(c.surface().active_page(), None);
    }

    #[test]
    fn variant_change_skips_the_window() {
        let mut c = controller();
        let t0 = Instant::now();
        c.poll(t0);
        c.on_change(ResumeRecord::sample(), t0);
        c.set_variant(StyleVariant::Executive);
        assert!(c.poll(t0));
        assert_eq!(c.assignment().conditions.variant, StyleVariant::Executive);
    }

    #[test]
    fn page_width_change_remeasures_at_the_new_width() {
        let mut c = controller();
        c.flush();
        c.set_page_width(420.0);
        assert!(c.flush());
        let g = c.assignment().conditions.geometry;
        assert_eq!(g.page_width, 420.0);
        assert!((g.page_height - 420.0 * 297.0 / 210.0).abs() < 0.5);
    }

    #[test]
    fn edits_while_unmounted_never_drop_items() {
        let mut c = PreviewController::new(
            ResumeRecord::sample(),
            StyleVariant::Professional,
            PipelineConfig::default(),
            FontManager::default(),
        );
        let mut r = ResumeRecord::sample();
        let mut extra = r.experience[0].clone();
        extra.company = "Spotify".into();
        r.experience.push(extra);
        c.on_change(r, Instant::now());
        assert!(!c.flush());

        let flat = c.assignment().flattened();
        assert!(c.assignment().fallback);
        assert!(flat.contains(&(SectionKind::Experience, 1)));
        assert!(c.print_document().contains("Spotify"));
        assert!(matches!(
            c.export_pdf(&ExportCancel::new()),
            Err(Error::MeasurementNotReady)
        ));

        c.mount();
        let art = c.export_pdf(&ExportCancel::new()).unwrap();
        assert!(!c.assignment().fallback);
        assert!(c.assignment().flattened().contains(&(SectionKind::Experience, 1)));
        assert_eq!(art.page_count, c.total_pages());
    }

    #[test]
    fn variant_change_while_unmounted_refreshes_fallback() {
        let mut c = PreviewController::new(
            ResumeRecord::sample(),
            StyleVariant::Professional,
            PipelineConfig::default(),
            FontManager::default(),
        );
        c.set_variant(StyleVariant::Creative);
        c.flush();
        assert_eq!(c.assignment().conditions.variant, StyleVariant::Creative);
        assert!(c.is_dirty());
    }

    #[test]
    fn export_uses_the_assignment_on_screen() {
        let mut c = controller();
        c.on_change(long_record(), Instant::now());
        let art = c.export_pdf(&ExportCancel::new()).unwrap();
        assert_eq!(art.page_count, c.total_pages());
        assert_eq!(&art.bytes[0..5], b"%PDF-");
        let html = c.print_document();
        assert_eq!(html.matches("<section class=\"page\"").count(), c.total_pages());
    }
}
