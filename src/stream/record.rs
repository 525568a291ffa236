//! Multipart record framing
//!
//! A record is self-delimiting and carries no length prefix:
//!
//! ```text
//! --frame\r\n
//! Content-Type: image/png\r\n
//! \r\n
//! <png bytes>\r\n
//! ```

use actix_web::web::Bytes;

/// Multipart boundary shared by the response header and every record
pub const BOUNDARY: &str = "frame";

/// Content type of each embedded image
pub const FRAME_CONTENT_TYPE: &str = "image/png";

const RECORD_HEAD: &[u8] = b"--frame\r\nContent-Type: image/png\r\n\r\n";
const RECORD_TAIL: &[u8] = b"\r\n";

/// Wrap an encoded image in multipart framing
pub fn frame_record(png: &[u8]) -> Bytes {
    let mut record = Vec::with_capacity(RECORD_HEAD.len() + png.len() + RECORD_TAIL.len());
    record.extend_from_slice(RECORD_HEAD);
    record.extend_from_slice(png);
    record.extend_from_slice(RECORD_TAIL);
    Bytes::from(record)
}

/// Payload of a single record produced by [`frame_record`]
///
/// Returns `None` if `record` is not exactly one well-formed record.
pub fn split_record(record: &[u8]) -> Option<&[u8]> {
    record.strip_prefix(RECORD_HEAD)?.strip_suffix(RECORD_TAIL)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn occurrences(haystack: &[u8], needle: &[u8]) -> usize {
        haystack.windows(needle.len()).filter(|w| *w == needle).count()
    }

    #[test]
    fn record_layout() {
        let record = frame_record(b"PNGDATA");
        assert_eq!(&record[..], b"--frame\r\nContent-Type: image/png\r\n\r\nPNGDATA\r\n");
    }

    #[test]
    fn record_has_one_boundary_one_header_and_the_whole_payload() {
        let payload: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
        let record = frame_record(&payload);

        assert_eq!(occurrences(&record, format!("--{}", BOUNDARY).as_bytes()), 1);
        assert_eq!(occurrences(&record, b"Content-Type: image/png"), 1);
        assert_eq!(split_record(&record), Some(payload.as_slice()));
    }

    #[test]
    fn head_constant_matches_public_names() {
        let expected = format!("--{}\r\nContent-Type: {}\r\n\r\n", BOUNDARY, FRAME_CONTENT_TYPE);
        assert_eq!(RECORD_HEAD, expected.as_bytes());
    }

    #[test]
    fn malformed_records_do_not_split() {
        assert_eq!(split_record(b"--frame\r\nPNG\r\n"), None);
        assert_eq!(split_record(b"--frame\r\nContent-Type: image/png\r\n\r\nPNG"), None);
    }
}
