//! Export pipeline
//!
//! Resolves a note (embedding or linking its targets), serializes the
//! result and writes it through the [`ExportFs`] capability. Interactive
//! choices go through [`ExportHost`]; Word and PDF output is produced by an
//! [`ExternalRenderer`].
//!
//! Single-document exports are all or nothing. Batch exports report one
//! [`UnitOutcome`] per note and never abort on a failed sibling.

mod error;
mod exporter;
mod fs;
mod host;
mod naming;
mod options;
mod render;
mod report;
mod temp;

pub use error::{ErrorKind, ExportError};
pub use exporter::Exporter;
pub use fs::{ExportFs, LocalFs};
pub use host::{ExportHost, FileFilter};
pub use naming::{export_filename, sanitize_filename, suggested_name, FILENAME_TEMPLATE_ARGS};
pub use options::ExportOptions;
pub use render::{
    await_render, DocumentKind, ExternalRenderer, RenderCompletion, RenderOutput, RenderRequest,
};
pub use report::{ExportReport, UnitOutcome};
pub use temp::TempNote;
