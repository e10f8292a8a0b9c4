//! Still-image re-encoding.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, DynamicImage};

use crate::error::MediaResult;

/// Clamp a 0-100 quality factor into the range the JPEG encoder accepts.
pub fn clamp_quality(quality: u8) -> u8 {
    quality.clamp(1, 100)
}

/// Encode a decoded frame as JPEG at the given quality.
///
/// Alpha is dropped; the frame is converted to 8-bit RGB first.
pub fn encode_jpeg(frame: &DynamicImage, quality: u8) -> MediaResult<Vec<u8>> {
    let rgb = frame.to_rgb8();
    let mut buf = Cursor::new(Vec::new());

    {
        let mut encoder = JpegEncoder::new_with_quality(&mut buf, clamp_quality(quality));
        encoder.encode(rgb.as_raw(), rgb.width(), rgb.height(), ColorType::Rgb8)?;
    }

    Ok(buf.into_inner())
}

/// Decode an image produced by ffmpeg's image2pipe output.
pub fn decode_image(bytes: &[u8]) -> MediaResult<DynamicImage> {
    Ok(image::load_from_memory(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};

    fn gradient(width: u32, height: u32) -> DynamicImage {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 7 % 256) as u8, (y * 13 % 256) as u8, ((x + y) % 256) as u8])
        });
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn test_encodes_valid_jpeg() {
        let bytes = encode_jpeg(&gradient(64, 48), 50).unwrap();

        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Jpeg);

        let decoded = decode_image(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 48));
    }

    #[test]
    fn test_lower_quality_is_smaller() {
        let frame = gradient(128, 128);
        let low = encode_jpeg(&frame, 50).unwrap();
        let high = encode_jpeg(&frame, 100).unwrap();
        assert!(low.len() < high.len());
    }

    #[test]
    fn test_quality_is_clamped() {
        assert_eq!(clamp_quality(0), 1);
        assert_eq!(clamp_quality(50), 50);
        assert_eq!(clamp_quality(255), 100);
        assert!(encode_jpeg(&gradient(8, 8), 0).is_ok());
    }

    #[test]
    fn test_rgba_frames_are_flattened() {
        let rgba = DynamicImage::ImageRgba8(image::RgbaImage::new(16, 16));
        assert!(encode_jpeg(&rgba, 50).is_ok());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_image(b"not an image").is_err());
    }
}
