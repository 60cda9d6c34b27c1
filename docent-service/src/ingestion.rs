//! Document extraction adapter.
//!
//! Turns raw document bytes into an ordered list of [`PageRecord`]s. Page
//! text, tables and embedded images are kept apart so the pipeline can price
//! and report work per page and per image.

pub mod pdf;
pub mod tables;

use std::path::Path;

use bytes::Bytes;
use serde::Serialize;

use crate::error::ExtractionError;

pub use pdf::PdfExtractor;

/// A parsed document
#[derive(Debug, Clone, Default)]
pub struct ExtractedDocument {
    pub page_count: usize,
    pub pages: Vec<PageRecord>,
}

/// Content of one page, in reading order
#[derive(Debug, Clone, Default)]
pub struct PageRecord {
    /// 1-indexed page number
    pub page_number: usize,
    pub text: String,
    pub tables: Vec<Table>,
    pub images: Vec<PageImage>,
}

/// A grid of cell strings. Cells may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Table {
    pub rows: Vec<Vec<String>>,
}

/// An embedded raster image, normalized to PNG
#[derive(Debug, Clone)]
pub struct PageImage {
    pub png: Bytes,
    pub position: ImagePosition,
}

/// Image placement on the page in PDF points (bottom-left origin)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ImagePosition {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Parser for a document format
pub trait DocumentExtractor: Send + Sync {
    /// Parse the whole document. Blocking; callers run it off the async runtime.
    fn extract(&self, content: &[u8]) -> Result<ExtractedDocument, ExtractionError>;
}

/// Check whether an upload's filename names a supported document type
pub fn is_supported_filename(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}
