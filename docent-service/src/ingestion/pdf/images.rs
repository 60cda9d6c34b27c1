//! Embedded image extraction from PDF pages.

use std::io::Cursor;

use bytes::Bytes;
use image::{DynamicImage, ImageFormat};
use pdfium_render::prelude::*;
use tracing::debug;

use crate::ingestion::{ImagePosition, PageImage};

/// Decode every image object on a page and re-encode it as PNG.
///
/// Objects that cannot be decoded are skipped.
pub(super) fn extract_page_images(page: &PdfPage, page_number: usize) -> Vec<PageImage> {
    let mut images = Vec::new();

    for (object_index, object) in page.objects().iter().enumerate() {
        let PdfPageObject::Image(image_obj) = &object else {
            continue;
        };

        let raw = match image_obj.get_raw_image() {
            Ok(raw) => raw,
            Err(e) => {
                debug!(
                    page = page_number,
                    object = object_index,
                    error = ?e,
                    "Could not decode image object"
                );
                continue;
            }
        };

        let position = image_obj
            .bounds()
            .map(|quad_points| {
                let bounds = quad_points.to_rect();
                ImagePosition {
                    x: bounds.left().value as f64,
                    y: bounds.bottom().value as f64,
                    width: bounds.width().value as f64,
                    height: bounds.height().value as f64,
                }
            })
            .unwrap_or_default();

        match encode_png(&raw) {
            Ok(png) => images.push(PageImage { png, position }),
            Err(e) => {
                debug!(
                    page = page_number,
                    object = object_index,
                    error = %e,
                    "Could not encode image as PNG"
                );
            }
        }
    }

    images
}

/// Normalize to 8-bit RGBA so every source color model encodes cleanly
pub(crate) fn encode_png(image: &DynamicImage) -> image::ImageResult<Bytes> {
    let rgba = DynamicImage::ImageRgba8(image.to_rgba8());
    let mut png = Vec::new();
    rgba.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    Ok(Bytes::from(png))
}
