//! CSV export of selected variable mapping rows.

pub mod error;
pub mod export;

pub use error::{ReportError, Result};
pub use export::{
    DEFAULT_PROJECT_SLUG, EXPORT_FILE_PREFIX, ExportView, export_columns, export_file_name,
    project_slug, write_export,
};
