//! # resume-forge – Paginated resume preview and PDF export
//!
//! This crate lays a structured resume record out on fixed-size pages and
//! keeps the on-screen preview, the downloaded PDF and the printed document
//! page-for-page identical. The pipeline stages are:
//!
//! 1. **Template** – record + variant → HTML fragments per unit ([`templates`])
//! 2. **Measure** – lay every fragment out with Taffy and record its height
//!    ([`measure`], [`layout`], [`style`], [`dom`])
//! 3. **Paginate** – greedy first-fit of sections and items onto pages
//!    ([`paginator`], [`section`])
//! 4. **Export** – render each page and encode it via printpdf
//!    ([`export`], [`compose`], [`render`])
//! 5. **Print** – one standalone HTML document with a page per window
//!    ([`print`])
//!
//! [`controller::PreviewController`] ties the stages to an editing session.
//! A C-compatible FFI surface is exposed via the [`ffi`] module.

pub mod compose;
pub mod controller;
pub mod dom;
pub mod error;
pub mod export;
pub mod ffi;
pub mod fonts;
pub mod layout;
pub mod layout_config;
pub mod measure;
pub mod paginator;
pub mod pipeline;
pub mod print;
pub mod record;
pub mod render;
pub mod section;
pub mod style;
pub mod templates;
pub mod variant;

// Re-exports for convenience
pub use controller::PreviewController;
pub use error::{Error, Result};
pub use export::{ExportArtifact, ExportCancel};
pub use paginator::paginate;
pub use pipeline::{
    compute_page_layouts, generate_resume_pdf, paginate_record, print_resume_html, PageGeometry,
    PipelineConfig,
};
pub use record::ResumeRecord;
pub use section::{PageAssignment, SectionKind};
pub use variant::StyleVariant;
