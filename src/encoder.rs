//! JPEG encoding of captured frames and sniffing of uploaded files.

use crate::error::{CamXucError, Result};
use crate::models::{Frame, ImagePayload};
use base64::{engine::general_purpose::STANDARD as B64, Engine};
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageReader};
use std::io::Cursor;
use tracing::debug;

const JPEG_MIME: &str = "image/jpeg";

/// Encodes an RGB frame as JPEG at the given quality (1-100)
pub fn encode_jpeg(frame: &Frame, quality: u8) -> Result<Vec<u8>> {
    let expected = frame.width as usize * frame.height as usize * 3;
    if frame.data.len() != expected {
        return Err(CamXucError::ImageEncode(format!(
            "frame buffer is {} bytes, expected {expected} for {}x{}",
            frame.data.len(),
            frame.width,
            frame.height
        )));
    }

    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100))
        .encode(
            &frame.data,
            frame.width,
            frame.height,
            ExtendedColorType::Rgb8,
        )
        .map_err(|e| CamXucError::ImageEncode(e.to_string()))?;

    debug!(
        "JPEG encoded: {}x{} -> {} bytes (quality {})",
        frame.width,
        frame.height,
        buf.len(),
        quality
    );
    Ok(buf)
}

/// Encodes a frame as a `data:image/jpeg;base64,...` URL
pub fn encode_data_url(frame: &Frame, quality: u8) -> Result<String> {
    let bytes = encode_jpeg(frame, quality)?;
    Ok(format!("data:{JPEG_MIME};base64,{}", B64.encode(bytes)))
}

/// Encodes a frame as a JPEG blob payload
pub fn jpeg_blob(frame: &Frame, quality: u8, file_name: &str) -> Result<ImagePayload> {
    Ok(ImagePayload::Blob {
        bytes: encode_jpeg(frame, quality)?,
        file_name: file_name.to_string(),
        mime: JPEG_MIME.to_string(),
    })
}

/// What an uploaded file turned out to be
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageInfo {
    pub mime: &'static str,
    pub width: u32,
    pub height: u32,
}

/// Reads the header of an encoded image; fails for non-image bytes
pub fn inspect_image(bytes: &[u8]) -> Result<ImageInfo> {
    let reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
    let format = reader
        .format()
        .ok_or_else(|| CamXucError::ImageLoad("Tệp không phải là ảnh".to_string()))?;
    let (width, height) = reader.into_dimensions()?;
    Ok(ImageInfo {
        mime: format.to_mime_type(),
        width,
        height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbImage};

    fn gray_frame(width: u32, height: u32) -> Frame {
        Frame::new(vec![128; (width * height * 3) as usize], width, height)
    }

    #[test]
    fn jpeg_starts_with_soi_marker() {
        let bytes = encode_jpeg(&gray_frame(8, 8), 92).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn mismatched_buffer_is_rejected() {
        let frame = Frame::new(vec![0; 10], 8, 8);
        assert!(matches!(
            encode_jpeg(&frame, 92),
            Err(CamXucError::ImageEncode(_))
        ));
    }

    #[test]
    fn data_url_has_jpeg_prefix() {
        let url = encode_data_url(&gray_frame(4, 4), 92).unwrap();
        assert!(url.starts_with("data:image/jpeg;base64,"));
    }

    #[test]
    fn inspects_encoded_jpeg() {
        let bytes = encode_jpeg(&gray_frame(6, 4), 95).unwrap();
        let info = inspect_image(&bytes).unwrap();
        assert_eq!(info.mime, "image/jpeg");
        assert_eq!((info.width, info.height), (6, 4));
    }

    #[test]
    fn inspects_png() {
        let mut buf = Cursor::new(Vec::new());
        RgbImage::new(3, 5)
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        let info = inspect_image(buf.get_ref()).unwrap();
        assert_eq!(info.mime, "image/png");
        assert_eq!((info.width, info.height), (3, 5));
    }

    #[test]
    fn text_is_not_an_image() {
        assert!(inspect_image(b"definitely not an image").is_err());
    }
}
