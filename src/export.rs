//! Export pipeline – encodes an existing page assignment, page by page, into
//! one output document.
//!
//! Export never paginates. It checks that the assignment was computed under
//! the same [`LayoutConditions`] it is about to render with and refuses to
//! run otherwise, so the file always breaks where the preview does.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::compose::compose_page;
use crate::error::{Error, Result};
use crate::fonts::FontManager;
use crate::layout::layout_fragment;
use crate::layout_config::{LayoutConfig, PageLayout};
use crate::measure::{ColorOverride, RenderSurface, SurfaceOp};
use crate::pipeline::PageGeometry;
use crate::record::ResumeRecord;
use crate::section::{LayoutConditions, PageAssignment};
use crate::templates::render_page;
use crate::variant::StyleVariant;

/// Sink for composed pages. Pages arrive strictly in order, between one
/// `begin` and one `finish`.
pub trait PageEncoder {
    fn begin(&mut self, title: &str, page_width: f32, page_height: f32) -> Result<()>;

    fn add_page(&mut self, page: PageLayout) -> Result<()>;

    fn finish(self) -> Result<Vec<u8>>
    where
        Self: Sized;
}

/// Shared cancellation flag, checked between pages.
#[derive(Debug, Clone, Default)]
pub struct ExportCancel(Arc<AtomicBool>);

impl ExportCancel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A finished export.
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub page_count: usize,
}

/// Encoder that keeps the composed pages instead of writing a file. `finish`
/// yields the [`LayoutConfig`] as JSON.
#[derive(Debug, Default)]
pub struct LayoutRecorder {
    config: Option<LayoutConfig>,
}

impl LayoutRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// The recorded document, without serialising it.
    pub fn finish_config(self) -> Result<LayoutConfig> {
        self.config
            .ok_or_else(|| Error::ExportEncoding("no document started".into()))
    }
}

impl PageEncoder for LayoutRecorder {
    fn begin(&mut self, title: &str, page_width: f32, page_height: f32) -> Result<()> {
        self.config = Some(LayoutConfig::new(title, page_width, page_height));
        Ok(())
    }

    fn add_page(&mut self, page: PageLayout) -> Result<()> {
        let config = self
            .config
            .as_mut()
            .ok_or_else(|| Error::ExportEncoding("no document started".into()))?;
        config.pages.push(page);
        Ok(())
    }

    fn finish(self) -> Result<Vec<u8>> {
        self.finish_config()?.to_json().map(String::into_bytes)
    }
}

/// Everything an export run renders with.
pub struct ExportContext<'a> {
    pub record: &'a ResumeRecord,
    pub variant: StyleVariant,
    pub fonts: &'a FontManager,
    pub geometry: PageGeometry,
    pub title: &'a str,
}

impl ExportContext<'_> {
    pub fn conditions(&self) -> LayoutConditions {
        LayoutConditions {
            geometry: self.geometry,
            variant: self.variant,
            font_fingerprint: self.fonts.fingerprint(),
        }
    }
}

/// Encode `assignment` one page at a time into `encoder`.
///
/// The surface is held for [`SurfaceOp::Export`] with print-exact colours for
/// the whole run and restored on every exit. On cancellation or failure the
/// encoder is dropped with whatever it had buffered.
pub fn export_document<E: PageEncoder>(
    assignment: &PageAssignment,
    ctx: &ExportContext<'_>,
    surface: &RenderSurface,
    cancel: &ExportCancel,
    mut encoder: E,
) -> Result<ExportArtifact> {
    let actual = ctx.conditions();
    if assignment.conditions != actual {
        log::warn!(
            "refusing export: paginated under {}, exporting under {actual}",
            assignment.conditions
        );
        return Err(Error::ExportDivergence {
            expected: assignment.conditions.to_string(),
            actual: actual.to_string(),
        });
    }

    let lease = surface.acquire(SurfaceOp::Export)?;
    lease.force_colors(ColorOverride::PrintExact);

    let g = ctx.geometry;
    encoder.begin(ctx.title, g.page_width, g.page_height)?;

    for (index, window) in assignment.pages.iter().enumerate() {
        if cancel.is_cancelled() {
            log::info!("export cancelled before page {}", index + 1);
            return Err(Error::ExportCancelled);
        }
        lease.set_active_page(window.page_number);

        let html = render_page(ctx.record, window, index, index == 0, ctx.variant);
        let fragment = layout_fragment(&html, g.content_width(), ctx.fonts).map_err(|e| match e {
            Error::Layout(msg) => Error::ExportEncoding(format!("page {}: {msg}", index + 1)),
            other => other,
        })?;
        let page = compose_page(
            &fragment,
            g.page_margin,
            g.page_margin,
            index,
            lease.keep_backgrounds(),
            ctx.fonts,
        );
        encoder.add_page(page)?;
    }

    if cancel.is_cancelled() {
        return Err(Error::ExportCancelled);
    }
    let bytes = encoder.finish()?;
    log::info!(
        "exported {} pages ({} bytes) as {}",
        assignment.total_pages(),
        bytes.len(),
        ctx.variant
    );
    Ok(ExportArtifact {
        bytes,
        file_name: ctx.record.export_file_name(),
        page_count: assignment.total_pages(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measure::measure;
    use crate::paginator::paginate_with_heights;

    struct FailingEncoder {
        accepted: usize,
        fail_at: usize,
    }

    impl PageEncoder for FailingEncoder {
        fn begin(&mut self, _: &str, _: f32, _: f32) -> Result<()> {
            Ok(())
        }

        fn add_page(&mut self, _: PageLayout) -> Result<()> {
            if self.accepted == self.fail_at {
                return Err(Error::ExportEncoding("unsupported content".into()));
            }
            self.accepted += 1;
            Ok(())
        }

        fn finish(self) -> Result<Vec<u8>> {
            Ok(vec![1])
        }
    }

    fn setup() -> (ResumeRecord, FontManager, RenderSurface, PageAssignment) {
        let record = ResumeRecord::sample();
        let fonts = FontManager::default();
        let surface = RenderSurface::mounted(PageGeometry::default());
        let heights = measure(&surface, &record, StyleVariant::Modern, &fonts).unwrap();
        let assignment = paginate_with_heights(&record, &heights);
        (record, fonts, surface, assignment)
    }

    fn ctx<'a>(record: &'a ResumeRecord, fonts: &'a FontManager, variant: StyleVariant) -> ExportContext<'a> {
        ExportContext {
            record,
            variant,
            fonts,
            geometry: PageGeometry::default(),
            title: "Resume",
        }
    }

    #[test]
    fn records_one_layout_per_page() {
        let (record, fonts, surface, assignment) = setup();
        let art = export_document(
            &assignment,
            &ctx(&record, &fonts, StyleVariant::Modern),
            &surface,
            &ExportCancel::new(),
            LayoutRecorder::new(),
        )
        .unwrap();
        let config = LayoutConfig::from_json(std::str::from_utf8(&art.bytes).unwrap()).unwrap();
        assert_eq!(config.pages.len(), assignment.total_pages());
        assert_eq!(art.file_name, "Matthew_Smith_Resume.pdf");
        assert!(config.pages[0].text_lines().contains(&"Matthew Smith"));
    }

    #[test]
    fn divergent_conditions_are_refused() {
        let (record, fonts, surface, assignment) = setup();
        let err = export_document(
            &assignment,
            &ctx(&record, &fonts, StyleVariant::Academic),
            &surface,
            &ExportCancel::new(),
            LayoutRecorder::new(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::ExportDivergence { .. }));
        assert_eq!(surface.owner(), None);
    }

    #[test]
    fn cancellation_discards_output_and_restores_surface() {
        let (record, fonts, surface, assignment) = setup();
        let cancel = ExportCancel::new();
        cancel.cancel();
        let err = export_document(
            &assignment,
            &ctx(&record, &fonts, StyleVariant::Modern),
            &surface,
            &cancel,
            LayoutRecorder::new(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::ExportCancelled));
        assert_eq!(surface.owner(), None);
        assert_eq!(surface.color_override(), ColorOverride::None);
    }

    #[test]
    fn encoder_failure_restores_surface() {
        let (record, fonts, surface, assignment) = setup();
        surface.set_active_page(Some(1));
        let err = export_document(
            &assignment,
            &ctx(&record, &fonts, StyleVariant::Modern),
            &surface,
            &ExportCancel::new(),
            FailingEncoder {
                accepted: 0,
                fail_at: 0,
            },
        )
        .unwrap_err();
        assert!(err.is_user_visible());
        assert_eq!(surface.active_page(), Some(1));
        assert_eq!(surface.color_override(), ColorOverride::None);
    }

    #[test]
    fn busy_surface_blocks_export() {
        let (record, fonts, surface, assignment) = setup();
        let _preview = surface.acquire(SurfaceOp::Preview).unwrap();
        let err = export_document(
            &assignment,
            &ctx(&record, &fonts, StyleVariant::Modern),
            &surface,
            &ExportCancel::new(),
            LayoutRecorder::new(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::SurfaceBusy(SurfaceOp::Preview)));
    }
}
