//! Fixed-width strings and encoded message bodies.

use turnkit_core::{Charset, TurnResult};

/// Byte that stands for a line break in encoded message bodies.
const ENCODED_NEWLINE: u8 = 26;

/// Offset added to every character of a message body.
const MESSAGE_SHIFT: u8 = 13;

/// Decode a fixed-width, space-padded string field.
///
/// Anything from the first NUL onwards is ignored.
pub fn decode_fixed(bytes: &[u8], charset: &dyn Charset) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    let trimmed = bytes[..end]
        .iter()
        .rposition(|&b| b != b' ')
        .map_or(0, |last| last + 1);
    charset.decode(&bytes[..trimmed])
}

/// Encode a string into a fixed-width, space-padded field.
///
/// Text after an embedded NUL is dropped; overlong text is truncated.
pub fn encode_fixed<const N: usize>(text: &str, charset: &dyn Charset) -> TurnResult<[u8; N]> {
    let prefix = text.split('\0').next().unwrap_or_default();
    let encoded = charset.encode(prefix)?;
    let mut out = [b' '; N];
    let len = encoded.len().min(N);
    out[..len].copy_from_slice(&encoded[..len]);
    Ok(out)
}

/// Decode an encoded message body into text with `\n` line breaks.
pub fn decode_message(bytes: &[u8], charset: &dyn Charset) -> String {
    let plain: Vec<u8> = bytes
        .iter()
        .map(|&b| {
            if b == ENCODED_NEWLINE {
                b'\n'
            } else {
                b.wrapping_sub(MESSAGE_SHIFT)
            }
        })
        .collect();
    charset.decode(&plain)
}

/// Encode message text for storage in inbox/outbox files.
pub fn encode_message(text: &str, charset: &dyn Charset) -> TurnResult<Vec<u8>> {
    let mut out = Vec::with_capacity(text.len());
    for (index, line) in text.split('\n').enumerate() {
        if index > 0 {
            out.push(ENCODED_NEWLINE);
        }
        out.extend(
            charset
                .encode(line)?
                .into_iter()
                .map(|b| b.wrapping_add(MESSAGE_SHIFT)),
        );
    }
    Ok(out)
}
