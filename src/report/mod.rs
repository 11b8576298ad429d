//! Dataset reports
//!
//! The service hands a [`Dataset`] to a [`ReportRenderer`] and streams the
//! returned bytes back to the client. [`PdfReportRenderer`] is the default.

pub mod pdf;

pub use pdf::PdfReportRenderer;

use crate::models::Dataset;
use crate::types::AppResult;

/// Renders a dataset into a downloadable document.
///
/// Implementations must be deterministic: the same dataset always yields the
/// same bytes.
pub trait ReportRenderer: Send + Sync {
    fn render(&self, dataset: &Dataset) -> AppResult<Vec<u8>>;

    fn content_type(&self) -> mime::Mime;

    fn file_name(&self, dataset: &Dataset) -> String;
}
