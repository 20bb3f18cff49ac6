//! Pipeline – page geometry, configuration, and one-call entry points that
//! run measurement, pagination and export back to back.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::export::{export_document, ExportArtifact, ExportCancel, ExportContext, LayoutRecorder};
use crate::fonts::FontManager;
use crate::layout_config::LayoutConfig;
use crate::measure::{measure, RenderSurface};
use crate::paginator::paginate_with_heights;
use crate::print::print_document;
use crate::record::ResumeRecord;
use crate::render::PdfEncoder;
use crate::section::{MeasuredHeights, PageAssignment};
use crate::style::FontFamily;
use crate::variant::StyleVariant;

/// A4 in points.
pub const A4_WIDTH_PT: f32 = 595.28;
pub const A4_HEIGHT_PT: f32 = 841.89;
pub const PAGE_MARGIN_PT: f32 = 40.0;

/// Physical page size and uniform margin, in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    pub page_width: f32,
    pub page_height: f32,
    pub page_margin: f32,
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self {
            page_width: A4_WIDTH_PT,
            page_height: A4_HEIGHT_PT,
            page_margin: PAGE_MARGIN_PT,
        }
    }
}

impl PageGeometry {
    /// Width fragments are laid out at.
    pub fn content_width(&self) -> f32 {
        self.page_width - 2.0 * self.page_margin
    }

    /// Usable height of one page.
    pub fn capacity(&self) -> f32 {
        self.page_height - 2.0 * self.page_margin
    }

    /// Same margin, width `page_width`, height kept at the 210:297 ratio.
    pub fn with_width(self, page_width: f32) -> Self {
        Self {
            page_width,
            page_height: page_width * A4_HEIGHT_PT / A4_WIDTH_PT,
            ..self
        }
    }
}

/// Configuration for the resume pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Document title embedded in the PDF metadata.
    pub title: String,
    pub page_width: f32,
    pub page_height: f32,
    pub page_margin: f32,
    /// Edits arriving within this many milliseconds of each other are
    /// measured once.
    pub coalesce_ms: u64,
    /// TTF/OTF file used for the sans family instead of builtin metrics.
    pub font_path: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            title: "Resume".to_string(),
            page_width: A4_WIDTH_PT,
            page_height: A4_HEIGHT_PT,
            page_margin: PAGE_MARGIN_PT,
            coalesce_ms: 250,
            font_path: None,
        }
    }
}

impl PipelineConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&text)
    }

    pub fn geometry(&self) -> PageGeometry {
        PageGeometry {
            page_width: self.page_width,
            page_height: self.page_height,
            page_margin: self.page_margin,
        }
    }

    pub fn coalesce_window(&self) -> Duration {
        Duration::from_millis(self.coalesce_ms)
    }

    /// Builtin metrics plus the configured font file, if any.
    pub fn load_fonts(&self) -> Result<FontManager> {
        let mut fonts = FontManager::default();
        if let Some(path) = &self.font_path {
            fonts.load_font_file(FontFamily::Sans, path)?;
        }
        Ok(fonts)
    }
}

/// Measure and paginate `record` on a freshly mounted surface.
pub fn paginate_record(
    record: &ResumeRecord,
    variant: StyleVariant,
    config: &PipelineConfig,
    fonts: &FontManager,
) -> Result<(MeasuredHeights, PageAssignment)> {
    let surface = RenderSurface::mounted(config.geometry());
    let heights = measure(&surface, record, variant, fonts)?;
    let assignment = paginate_with_heights(record, &heights);
    Ok((heights, assignment))
}

/// Full pipeline: record → PDF.
pub fn generate_resume_pdf(
    record: &ResumeRecord,
    variant: StyleVariant,
    config: &PipelineConfig,
) -> Result<ExportArtifact> {
    let fonts = config.load_fonts()?;
    let surface = RenderSurface::mounted(config.geometry());
    let heights = measure(&surface, record, variant, &fonts)?;
    let assignment = paginate_with_heights(record, &heights);
    let ctx = ExportContext {
        record,
        variant,
        fonts: &fonts,
        geometry: config.geometry(),
        title: &config.title,
    };
    export_document(&assignment, &ctx, &surface, &ExportCancel::new(), PdfEncoder::new())
}

/// Frozen page layouts without PDF encoding – useful for testing.
pub fn compute_page_layouts(
    record: &ResumeRecord,
    variant: StyleVariant,
    config: &PipelineConfig,
) -> Result<LayoutConfig> {
    let fonts = config.load_fonts()?;
    let surface = RenderSurface::mounted(config.geometry());
    let heights = measure(&surface, record, variant, &fonts)?;
    let assignment = paginate_with_heights(record, &heights);
    let ctx = ExportContext {
        record,
        variant,
        fonts: &fonts,
        geometry: config.geometry(),
        title: &config.title,
    };
    let artifact = export_document(&assignment, &ctx, &surface, &ExportCancel::new(), LayoutRecorder::new())?;
    let json = String::from_utf8(artifact.bytes).map_err(|e| Error::ExportEncoding(e.to_string()))?;
    LayoutConfig::from_json(&json).map_err(|e| Error::ExportEncoding(e.to_string()))
}

/// Print document for `record`, paginated the same way the PDF would be.
pub fn print_resume_html(
    record: &ResumeRecord,
    variant: StyleVariant,
    config: &PipelineConfig,
) -> Result<String> {
    let fonts = config.load_fonts()?;
    let (_, assignment) = paginate_record(record, variant, config, &fonts)?;
    Ok(print_document(&assignment, record, variant, config.geometry()))
}
