use encoding_rs::{Decoder, DecoderResult, SHIFT_JIS};

/// Stands in for exactly one undecodable source byte
pub const REPLACEMENT: char = '\u{FFFD}';

/// Text decoded from the source encoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedText {
    /// Canonical text: UTF-8, `\n` line endings, no trailing EOF marker
    pub text: String,
    /// Whether any byte sequence had to be replaced with U+FFFD
    pub had_replacements: bool,
}

/// Decodes Shift_JIS bytes into canonical text
///
/// Decoding never fails. Every byte of a malformed sequence becomes one
/// U+FFFD, so a replacement always occupies the single column its byte did
/// and the fixed-width layout of the rest of the line is preserved. A stray
/// 0x80 (mapped to the C1 control U+0080) is treated the same way. CRLF line
/// endings are folded to `\n` and a DOS end-of-file marker (0x1A) is dropped.
pub fn decode_shift_jis(bytes: &[u8]) -> DecodedText {
    let mut decoder = SHIFT_JIS.new_decoder_without_bom_handling();
    let mut decoded = String::with_capacity(output_capacity(&decoder, bytes.len()));
    let mut had_replacements = false;
    let mut remaining = bytes;

    loop {
        let (result, read) =
            decoder.decode_to_string_without_replacement(remaining, &mut decoded, true);
        remaining = &remaining[read..];
        match result {
            DecoderResult::InputEmpty => break,
            DecoderResult::OutputFull => {
                decoded.reserve(output_capacity(&decoder, remaining.len()));
            }
            DecoderResult::Malformed(len, _) => {
                had_replacements = true;
                decoded.extend(std::iter::repeat(REPLACEMENT).take(usize::from(len)));
            }
        }
    }

    if decoded.contains('\u{80}') {
        had_replacements = true;
        decoded = decoded.replace('\u{80}', "\u{FFFD}");
    }

    let mut text = decoded.replace("\r\n", "\n");
    while text.ends_with('\u{1a}') {
        text.pop();
    }

    DecodedText {
        text,
        had_replacements,
    }
}

fn output_capacity(decoder: &Decoder, byte_length: usize) -> usize {
    decoder
        .max_utf8_buffer_length_without_replacement(byte_length)
        .unwrap_or_else(|| byte_length.saturating_mul(3))
        .max(4)
}
