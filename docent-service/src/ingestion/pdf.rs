//! PDF document processing backed by PDFium.
//!
//! Page text comes from the PDFium text layer, tables are reconstructed from
//! positioned characters, and embedded image objects are decoded and
//! re-encoded as PNG.
//!
//! PDFium initializes process-wide state when bound and tears it down when
//! the binding is dropped, so one extractor owns a single binding for its
//! whole lifetime and documents are parsed through it one at a time.

mod images;

use std::sync::{Mutex, MutexGuard};

use pdfium_render::prelude::*;
use tracing::{debug, info, warn};

use crate::error::ExtractionError;

use super::tables::{PositionedChar, detect_tables};
use super::{DocumentExtractor, ExtractedDocument, PageRecord};

/// Create a new Pdfium instance (dynamically linked).
///
/// Searches for libpdfium in:
/// 1. Current directory (./libpdfium.so)
/// 2. vendor/pdfium/lib/
/// 3. System library paths
pub fn create_pdfium() -> Result<Pdfium, ExtractionError> {
    let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| {
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(
                "./vendor/pdfium/lib/",
            ))
        })
        .or_else(|_| Pdfium::bind_to_system_library())
        .map_err(|e| ExtractionError::LibraryUnavailable {
            message: format!("{:?}", e),
        })?;

    Ok(Pdfium::new(bindings))
}

/// Extraction adapter for PDF documents
///
/// The library is bound on the first extraction and kept until the extractor
/// is dropped. A failed bind is retried on the next call.
#[derive(Default)]
pub struct PdfExtractor {
    pdfium: Mutex<Option<Pdfium>>,
}

impl PdfExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the shared binding, creating it if needed
    fn pdfium(&self) -> Result<MutexGuard<'_, Option<Pdfium>>, ExtractionError> {
        // A panic mid-extraction leaves the binding itself intact
        let mut guard = self
            .pdfium
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if guard.is_none() {
            *guard = Some(create_pdfium()?);
            info!("PDFium library bound");
        }

        Ok(guard)
    }
}

impl DocumentExtractor for PdfExtractor {
    fn extract(&self, content: &[u8]) -> Result<ExtractedDocument, ExtractionError> {
        let guard = self.pdfium()?;
        let Some(pdfium) = guard.as_ref() else {
            return Err(ExtractionError::LibraryUnavailable {
                message: "PDFium binding missing".to_string(),
            });
        };

        let document = pdfium
            .load_pdf_from_byte_slice(content, None)
            .map_err(|e| ExtractionError::InvalidDocument {
                message: format!("{:?}", e),
            })?;

        let page_count = document.pages().len() as usize;
        info!(pages = page_count, "Extracting PDF pages");

        let mut pages = Vec::with_capacity(page_count);
        for (page_index, page) in document.pages().iter().enumerate() {
            let page_number = page_index + 1;

            let text = page.text().map_err(|e| ExtractionError::PageText {
                page: page_number,
                message: format!("{:?}", e),
            })?;

            let chars = positioned_chars(&text, page_number);
            let tables = detect_tables(&chars);
            let images = images::extract_page_images(&page, page_number);

            debug!(
                page = page_number,
                tables = tables.len(),
                images = images.len(),
                "Extracted page"
            );

            pages.push(PageRecord {
                page_number,
                text: text.all().trim().to_string(),
                tables,
                images,
            });
        }

        Ok(ExtractedDocument { page_count, pages })
    }
}

/// Collect characters with their positions for table reconstruction
fn positioned_chars(text: &PdfPageText, page_number: usize) -> Vec<PositionedChar> {
    let mut chars = Vec::new();

    for pdf_char in text.chars().iter() {
        let Some(ch) = pdf_char.unicode_char() else {
            continue;
        };

        match pdf_char.loose_bounds() {
            Ok(bounds) => chars.push(PositionedChar {
                ch,
                left: bounds.left().value,
                bottom: bounds.bottom().value,
                width: bounds.width().value,
                height: bounds.height().value,
            }),
            Err(e) => {
                warn!(page = page_number, error = ?e, "Failed to get character bounds");
            }
        }
    }

    chars
}
