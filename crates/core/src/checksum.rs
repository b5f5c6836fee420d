//! Additive byte checksum used by result files, working files, and the control file.
//!
//! The sum is deliberately weak: it detects changes against a cooperative host,
//! not tampering.

/// Sum all bytes of `data` modulo 2^32.
pub fn checksum(data: &[u8]) -> u32 {
    checksum_from(0, data)
}

/// Continue a running checksum with more bytes.
pub fn checksum_from(initial: u32, data: &[u8]) -> u32 {
    data.iter()
        .fold(initial, |acc, &byte| acc.wrapping_add(u32::from(byte)))
}

/// Running checksum accumulator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Checksum(u32);

impl Checksum {
    /// Start a fresh sum.
    pub const fn new() -> Self {
        Self(0)
    }

    /// Fold raw bytes into the sum.
    pub fn add_bytes(&mut self, data: &[u8]) -> &mut Self {
        self.0 = checksum_from(self.0, data);
        self
    }

    /// Fold an already computed sum into this one.
    pub fn add_sum(&mut self, sum: u32) -> &mut Self {
        self.0 = self.0.wrapping_add(sum);
        self
    }

    /// Current value.
    pub const fn value(self) -> u32 {
        self.0
    }
}
