//! PNG encoding of raw framebuffer snapshots

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};

use crate::geometry::SAMPLE_BITS;
use crate::{Result, StreamError};

const BYTES_PER_SAMPLE: usize = SAMPLE_BITS as usize / 8;

/// Encode raw 16-bit grayscale samples as a PNG image.
///
/// `raw` holds native-endian samples, one per pixel, row-major. Only the
/// first `width * height` samples are used, so a buffer carrying extra
/// samples per pixel encodes its leading plane. The encoder keeps no state
/// between calls.
///
/// # Errors
///
/// Returns [`StreamError::Encode`] if a dimension is zero, the buffer is
/// shorter than `width * height` samples, or the codec fails.
pub fn encode_png(raw: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    if width == 0 || height == 0 {
        return Err(StreamError::encode_error(format!(
            "cannot encode a {}x{} image",
            width, height
        )));
    }

    let needed = (width as usize)
        .checked_mul(height as usize)
        .and_then(|pixels| pixels.checked_mul(BYTES_PER_SAMPLE))
        .ok_or_else(|| StreamError::encode_error(format!("{}x{} overflows", width, height)))?;

    if raw.len() < needed {
        return Err(StreamError::encode_error(format!(
            "{}x{} needs {} bytes, frame has {}",
            width,
            height,
            needed,
            raw.len()
        )));
    }

    // Compressed grayscale framebuffers usually shrink well below the raw size
    let mut png = Vec::with_capacity(needed / 4);
    PngEncoder::new(&mut png)
        .write_image(&raw[..needed], width, height, ExtendedColorType::L16)
        .map_err(StreamError::encode_failed)?;

    Ok(png)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ColorType, GenericImageView};
    use proptest::prelude::*;

    fn gradient(width: u32, height: u32) -> Vec<u8> {
        (0..width * height)
            .flat_map(|i| ((i * 97) as u16).to_ne_bytes())
            .collect()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn encoded_png_reports_declared_dimensions(width in 1u32..96, height in 1u32..96) {
            let raw = gradient(width, height);
            let png = encode_png(&raw, width, height).unwrap();

            let decoded = image::load_from_memory(&png).unwrap();
            prop_assert_eq!(decoded.dimensions(), (width, height));
            prop_assert_eq!(decoded.color(), ColorType::L16);
        }
    }

    #[test]
    fn samples_survive_the_round_trip() {
        let (width, height) = (5, 3);
        let raw = gradient(width, height);

        let png = encode_png(&raw, width, height).unwrap();
        let decoded = image::load_from_memory(&png).unwrap().into_luma16();

        let expected: Vec<u16> =
            raw.chunks_exact(2).map(|pair| u16::from_ne_bytes([pair[0], pair[1]])).collect();
        assert_eq!(decoded.into_raw(), expected);
    }

    #[test]
    fn extra_samples_are_ignored() {
        let mut raw = gradient(4, 4);
        raw.extend_from_slice(&[0xFF; 64]);

        let png = encode_png(&raw, 4, 4).unwrap();
        assert_eq!(image::load_from_memory(&png).unwrap().dimensions(), (4, 4));
    }

    #[test]
    fn short_buffer_is_an_error_not_a_panic() {
        let raw = vec![0u8; 10];

        let err = encode_png(&raw, 4, 4).unwrap_err();
        assert!(matches!(err, StreamError::Encode { .. }));
        assert!(!err.is_fatal());
    }

    #[test]
    fn zero_dimensions_are_rejected() {
        assert!(encode_png(&[], 0, 4).is_err());
        assert!(encode_png(&[], 4, 0).is_err());
    }

    #[test]
    fn output_starts_with_png_signature() {
        let png = encode_png(&gradient(2, 2), 2, 2).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }
}
