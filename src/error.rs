//! Error types for the resume pipeline.
//!
//! Only the export path surfaces errors to the user. Measurement and
//! pagination problems are absorbed by the controller (retry on the next poll,
//! or a single-page fallback assignment), so most variants here never reach
//! the editor UI.

use std::io;
use thiserror::Error;

use crate::measure::SurfaceOp;

/// Result type alias for resume-forge operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// The render surface has no content width attached yet.
    #[error("render surface is not mounted; measurement deferred")]
    MeasurementNotReady,

    /// Another operation currently owns the render surface.
    #[error("render surface is busy with {0}")]
    SurfaceBusy(SurfaceOp),

    /// The export environment differs from the one the preview paginated under.
    #[error("export conditions {actual} differ from preview conditions {expected}")]
    ExportDivergence { expected: String, actual: String },

    /// The export was abandoned before the last page was encoded.
    #[error("export cancelled; partial output discarded")]
    ExportCancelled,

    /// Encoding one of the pages into the output document failed.
    #[error("download failed, try again ({0})")]
    ExportEncoding(String),

    /// Taffy rejected a node while laying out a fragment.
    #[error("layout error: {0}")]
    Layout(String),

    /// The resume record JSON could not be decoded.
    #[error("invalid resume record: {0}")]
    InvalidRecord(String),

    /// A configuration file could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A font file could not be parsed.
    #[error("font error: {0}")]
    Font(String),

    /// A page assignment or layout document could not be (de)serialised.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Whether the editor should show this error to the user.
    pub fn is_user_visible(&self) -> bool {
        matches!(
            self,
            Error::ExportEncoding(_) | Error::ExportDivergence { .. } | Error::Io(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoding_failure_reads_as_actionable() {
        let e = Error::ExportEncoding("image stream".into());
        assert!(e.to_string().starts_with("download failed, try again"));
        assert!(e.is_user_visible());
    }

    #[test]
    fn measurement_errors_stay_silent() {
        assert!(!Error::MeasurementNotReady.is_user_visible());
        assert!(!Error::SurfaceBusy(SurfaceOp::Export).is_user_visible());
    }

    #[test]
    fn json_errors_convert() {
        let e: Error = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(e, Error::Json(_)));
        assert!(e.to_string().starts_with("JSON error"));
    }
}
