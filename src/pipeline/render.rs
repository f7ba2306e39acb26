//! Turning downloaded document bytes into one model-ready image.
//!
//! The service renders to PDF when it can and falls back to raster formats
//! for documents it cannot print. Both arrive here as raw bytes: PDFs are
//! rasterised at their first page via Pdfium, anything else is decoded with
//! `image` and passed through. Only the first page is used — invoice header
//! fields live there, and one image keeps the model request small.
//!
//! Pdfium work runs on a blocking thread: page rendering is CPU-bound and
//! the `PdfDocument` handle is not `Send`-safe across await points.

use crate::error::CrossCheckError;
use crate::pipeline::service::RenderedDocument;
use image::DynamicImage;
use pdfium_render::prelude::*;

/// Produce the first-page image of a rendered document.
///
/// PDF detection is by declared media type first, `%PDF` magic second, so an
/// unhinted download still takes the right path. When Pdfium is not
/// installed on the host the PDF path degrades to a plain image decode,
/// which fails with [`CrossCheckError::Raster`] naming the real problem.
pub async fn first_page_image(
    document: &RenderedDocument,
    scale: f32,
) -> Result<DynamicImage, CrossCheckError> {
    if document.is_pdf() {
        rasterize_pdf(document.bytes.clone(), scale).await
    } else {
        decode_image(&document.bytes)
    }
}

async fn rasterize_pdf(bytes: Vec<u8>, scale: f32) -> Result<DynamicImage, CrossCheckError> {
    tokio::task::spawn_blocking(move || {
        let bindings = match Pdfium::bind_to_system_library() {
            Ok(bindings) => bindings,
            // No Pdfium on this host. A PDF will not decode as an image,
            // but the error from the attempt says exactly that.
            Err(_) => return decode_image(&bytes),
        };
        let pdfium = Pdfium::new(bindings);

        let pdf = pdfium
            .load_pdf_from_byte_vec(bytes, None)
            .map_err(|e| CrossCheckError::Raster {
                detail: format!("failed to open PDF: {e:?}"),
            })?;

        let pages = pdf.pages();
        let page = pages.get(0).map_err(|e| CrossCheckError::Raster {
            detail: format!("PDF has no renderable pages: {e:?}"),
        })?;

        let config = PdfRenderConfig::new().scale_page_by_factor(scale);
        let image = page
            .render_with_config(&config)
            .map_err(|e| CrossCheckError::Raster {
                detail: format!("failed to render PDF page: {e:?}"),
            })?
            .as_image();

        Ok(image)
    })
    .await
    .map_err(|e| CrossCheckError::Internal(format!("render task panicked: {e}")))?
}

fn decode_image(bytes: &[u8]) -> Result<DynamicImage, CrossCheckError> {
    image::load_from_memory(bytes).map_err(|e| CrossCheckError::Raster {
        detail: format!("failed to decode document image: {e}"),
    })
}
