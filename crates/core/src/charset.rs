//! 8-bit game character sets.
//!
//! The codec never decides which character set a game uses; callers inject one.

use crate::{TurnError, TurnResult};

/// Conversion between game bytes and Unicode text.
pub trait Charset {
    /// Decode raw game bytes into text.
    fn decode(&self, bytes: &[u8]) -> String;

    /// Encode text into game bytes.
    ///
    /// Characters without a representation are rejected, never substituted.
    fn encode(&self, text: &str) -> TurnResult<Vec<u8>>;
}

/// ISO 8859-1: every byte maps to the code point of the same value.
#[derive(Debug, Clone, Copy, Default)]
pub struct Latin1;

impl Charset for Latin1 {
    fn decode(&self, bytes: &[u8]) -> String {
        bytes.iter().map(|&b| char::from(b)).collect()
    }

    fn encode(&self, text: &str) -> TurnResult<Vec<u8>> {
        text.chars()
            .map(|ch| u8::try_from(u32::from(ch)).map_err(|_| TurnError::Charset(ch)))
            .collect()
    }
}

/// 7-bit ASCII. Bytes above 0x7F decode to U+FFFD.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ascii;

impl Charset for Ascii {
    fn decode(&self, bytes: &[u8]) -> String {
        bytes
            .iter()
            .map(|&b| {
                if b.is_ascii() {
                    char::from(b)
                } else {
                    char::REPLACEMENT_CHARACTER
                }
            })
            .collect()
    }

    fn encode(&self, text: &str) -> TurnResult<Vec<u8>> {
        text.chars()
            .map(|ch| {
                if ch.is_ascii() {
                    Ok(ch as u8)
                } else {
                    Err(TurnError::Charset(ch))
                }
            })
            .collect()
    }
}
