//! Image encoding: `DynamicImage` → PNG bytes, and PNG bytes → data URI.
//!
//! pdfium hands back decoded bitmaps in whatever pixel format the PDF used.
//! Re-encoding as PNG gives downstream collaborators one lossless format to
//! deal with, and a base64 data URI is what HTML slides and multimodal
//! requests embed directly.

use crate::document::EmbeddedImage;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode an extracted bitmap as PNG.
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    debug!(
        "Encoded {}x{} image → {} bytes PNG",
        img.width(),
        img.height(),
        buf.len()
    );
    Ok(buf)
}

/// MIME type for a file extension, defaulting to octet-stream.
fn mime_for(extension: &str) -> &'static str {
    match extension.to_ascii_lowercase().as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        _ => "application/octet-stream",
    }
}

impl EmbeddedImage {
    /// `data:` URI with the base64 payload, ready to embed in HTML.
    pub fn to_data_uri(&self) -> String {
        format!(
            "data:{};base64,{}",
            mime_for(&self.extension),
            STANDARD.encode(&self.byte_data)
        )
    }

    /// Suggested file name, `page{N}_img{M}.{ext}` with 1-based numbers.
    pub fn file_name(&self) -> String {
        format!(
            "page{}_img{}.{}",
            self.page_index + 1,
            self.image_index + 1,
            self.extension
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn encode_small_image() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255])));
        let bytes = encode_png(&img).expect("encode should succeed");
        assert_eq!(&bytes[1..4], b"PNG");
    }

    #[test]
    fn data_uri_round_trips_payload() {
        let image = EmbeddedImage {
            page_index: 2,
            image_index: 0,
            byte_data: vec![1, 2, 3, 4],
            extension: "png".into(),
            width: 1,
            height: 1,
            bounding_box: None,
        };
        let uri = image.to_data_uri();
        let payload = uri.strip_prefix("data:image/png;base64,").expect("png prefix");
        assert_eq!(STANDARD.decode(payload).unwrap(), vec![1, 2, 3, 4]);
        assert_eq!(image.file_name(), "page3_img1.png");
    }
}
