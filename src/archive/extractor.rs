//! LZH archive extraction
//!
//! The source site ships one LHA/LZH archive per day holding a single
//! Shift_JIS text file. Extraction validates the leading header, decompresses
//! the text entry with `delharc`, verifies its CRC and decodes it.

use crate::archive::decode::decode_shift_jis;
use delharc::LhaDecodeReader;
use std::io::Read;
use thiserror::Error;

/// Smallest possible LHA header (level 0/1 fixed part)
const MIN_HEADER_LEN: usize = 22;

/// Errors raised while unpacking an archive
///
/// All of these are permanent for the item: re-downloading the same bytes
/// would fail the same way.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("corrupt archive: {0}")]
    Corrupt(String),

    #[error("archive holds no text payload")]
    MissingPayload,
}

/// Decoded payload of an archive
#[derive(Debug, Clone)]
pub struct ExtractedText {
    /// Name of the entry inside the archive
    pub entry_name: String,
    /// Canonical UTF-8 text
    pub text: String,
    /// Whether undecodable bytes were replaced during decoding
    pub had_replacements: bool,
    /// Size of the decompressed payload in bytes
    pub payload_len: usize,
}

/// Unpacks daily archives into canonical text
#[derive(Debug, Clone, Copy, Default)]
pub struct ArchiveExtractor;

impl ArchiveExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extracts the single text payload of an LZH archive
    ///
    /// The first entry whose name ends in `.txt` (any case) is used; when no
    /// entry has that extension the first entry is taken.
    ///
    /// # Returns
    ///
    /// * `Ok(ExtractedText)` - The decoded text of the payload
    /// * `Err(ExtractError::Corrupt)` - Header, decompression or CRC check failed
    /// * `Err(ExtractError::MissingPayload)` - The archive holds no file entry
    pub fn extract(&self, bytes: &[u8]) -> Result<ExtractedText, ExtractError> {
        validate_header(bytes)?;

        let mut reader = LhaDecodeReader::new(bytes).map_err(corrupt)?;
        let mut fallback: Option<(String, Vec<u8>)> = None;

        loop {
            let name = reader.header().parse_pathname().to_string_lossy().into_owned();
            let is_text = name.to_ascii_lowercase().ends_with(".txt");

            if is_text || fallback.is_none() {
                if !reader.is_decoder_supported() {
                    return Err(ExtractError::Corrupt(format!(
                        "unsupported compression method for entry '{}'",
                        name
                    )));
                }

                let mut payload = Vec::new();
                reader.read_to_end(&mut payload).map_err(corrupt)?;
                reader.crc_check().map_err(corrupt)?;

                if is_text {
                    return Ok(build_text(name, payload));
                }
                fallback = Some((name, payload));
            }

            if !reader.next_file().map_err(corrupt)? {
                break;
            }
        }

        fallback
            .map(|(name, payload)| build_text(name, payload))
            .ok_or(ExtractError::MissingPayload)
    }
}

fn build_text(entry_name: String, payload: Vec<u8>) -> ExtractedText {
    let decoded = decode_shift_jis(&payload);
    ExtractedText {
        entry_name,
        text: decoded.text,
        had_replacements: decoded.had_replacements,
        payload_len: payload.len(),
    }
}

fn corrupt<E: std::fmt::Display>(error: E) -> ExtractError {
    ExtractError::Corrupt(error.to_string())
}

/// Checks the first entry header before handing the bytes to the decoder
///
/// Level 0 and 1 headers carry an 8-bit checksum over the header body which
/// is verified here. Level 2 headers are length-checked only; their CRC is
/// verified by the decoder.
fn validate_header(bytes: &[u8]) -> Result<(), ExtractError> {
    if bytes.len() < MIN_HEADER_LEN {
        return Err(ExtractError::Corrupt(format!(
            "archive too short ({} bytes)",
            bytes.len()
        )));
    }

    let method = &bytes[2..7];
    let known_family = &method[1..3] == b"lh" || &method[1..3] == b"lz";
    if method[0] != b'-' || method[4] != b'-' || !known_family {
        return Err(ExtractError::Corrupt(format!(
            "not an LZH archive (method field {:?})",
            String::from_utf8_lossy(method)
        )));
    }

    match bytes[20] {
        0 | 1 => {
            let header_len = bytes[0] as usize;
            if header_len == 0 || bytes.len() < header_len + 2 {
                return Err(ExtractError::Corrupt("truncated entry header".to_string()));
            }

            let checksum = bytes[2..header_len + 2]
                .iter()
                .fold(0u8, |sum, b| sum.wrapping_add(*b));
            if checksum != bytes[1] {
                return Err(ExtractError::Corrupt(format!(
                    "header checksum mismatch (expected {:#04x}, got {:#04x})",
                    bytes[1], checksum
                )));
            }
        }
        2 => {
            let header_len = u16::from_le_bytes([bytes[0], bytes[1]]) as usize;
            if header_len < MIN_HEADER_LEN || bytes.len() < header_len {
                return Err(ExtractError::Corrupt("truncated entry header".to_string()));
            }
        }
        level => {
            return Err(ExtractError::Corrupt(format!(
                "unsupported header level {}",
                level
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::SHIFT_JIS;

    fn crc16(data: &[u8]) -> u16 {
        let mut crc = 0u16;
        for byte in data {
            crc ^= *byte as u16;
            for _ in 0..8 {
                crc = if crc & 1 != 0 {
                    (crc >> 1) ^ 0xA001
                } else {
                    crc >> 1
                };
            }
        }
        crc
    }

    /// Builds a level-0 archive with one stored (`-lh0-`) entry
    fn stored_archive(name: &str, payload: &[u8]) -> Vec<u8> {
        let mut header = Vec::new();
        header.extend_from_slice(b"-lh0-");
        header.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        header.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        header.extend_from_slice(&0x5781_0000u32.to_le_bytes());
        header.push(0x20);
        header.push(0x00);
        header.push(name.len() as u8);
        header.extend_from_slice(name.as_bytes());
        header.extend_from_slice(&crc16(payload).to_le_bytes());

        let checksum = header.iter().fold(0u8, |sum, b| sum.wrapping_add(*b));
        let mut archive = vec![header.len() as u8, checksum];
        archive.extend_from_slice(&header);
        archive.extend_from_slice(payload);
        archive.push(0);
        archive
    }

    #[test]
    fn test_extracts_and_decodes_text_entry() {
        let (payload, _, _) = SHIFT_JIS.encode("STARTK\r\n01KBGN\r\nボートレース桐　生\r\n");
        let archive = stored_archive("K231201.TXT", &payload);

        let extracted = ArchiveExtractor::new().extract(&archive).unwrap();
        assert_eq!(extracted.entry_name, "K231201.TXT");
        assert_eq!(extracted.text, "STARTK\n01KBGN\nボートレース桐　生\n");
        assert_eq!(extracted.payload_len, payload.len());
        assert!(!extracted.had_replacements);
    }

    #[test]
    fn test_rejects_short_input() {
        let result = ArchiveExtractor::new().extract(b"PK\x03\x04");
        assert!(matches!(result, Err(ExtractError::Corrupt(_))));
    }

    #[test]
    fn test_rejects_non_lzh_bytes() {
        let html = b"<html><body>Service temporarily unavailable</body></html>";
        let result = ArchiveExtractor::new().extract(html);
        assert!(matches!(result, Err(ExtractError::Corrupt(_))));
    }

    #[test]
    fn test_rejects_header_checksum_mismatch() {
        let mut archive = stored_archive("K231201.TXT", b"FINALK\r\n");
        archive[1] = archive[1].wrapping_add(1);
        let err = ArchiveExtractor::new().extract(&archive).unwrap_err();
        assert!(err.to_string().contains("checksum"));
    }

    #[test]
    fn test_rejects_payload_crc_mismatch() {
        let mut archive = stored_archive("K231201.TXT", b"STARTK\r\nFINALK\r\n");
        let payload_start = archive.len() - 1 - 16;
        archive[payload_start] ^= 0xFF;
        let result = ArchiveExtractor::new().extract(&archive);
        assert!(matches!(result, Err(ExtractError::Corrupt(_))));
    }

    #[test]
    fn test_rejects_truncated_payload() {
        let archive = stored_archive("K231201.TXT", &[b'x'; 256]);
        let truncated = &archive[..archive.len() - 200];
        let result = ArchiveExtractor::new().extract(truncated);
        assert!(matches!(result, Err(ExtractError::Corrupt(_))));
    }
}
