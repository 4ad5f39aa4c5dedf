//! Incremental CRC-16/CCITT-FALSE accumulator.
//!
//! `transport/can/legacy.rs`'s `process_tx_crc` computes this one-shot over
//! a flat buffer, built on `crc_any::CRCu16`. A multi-frame transfer here
//! needs to feed the same checksum a few bytes at a time across frame
//! boundaries, so this wraps `crc_any`'s stateful digest behind a small
//! incremental type instead.

use crc_any::CRCu16;

/// Running CRC-16/CCITT-FALSE state: init `0xFFFF`, polynomial `0x1021`,
/// no input reflection, no output XOR.
#[derive(Clone)]
pub struct TransferCrc(CRCu16);

impl TransferCrc {
    /// Starts a fresh accumulator at the initial register value.
    pub fn new() -> Self {
        Self(CRCu16::crc16ccitt_false())
    }

    /// Digests `bytes` into the running checksum.
    pub fn update(&mut self, bytes: &[u8]) {
        if !bytes.is_empty() {
            self.0.digest(bytes);
        }
    }

    /// Reads the checksum's current value.
    ///
    /// CRC-16/CCITT-FALSE has no reflection or output XOR, so the register
    /// value is meaningful to read before the full message has been
    /// digested — this is what lets the wire format split the 16-bit CRC
    /// across two frames.
    pub fn value(&mut self) -> u16 {
        self.0.get_crc()
    }
}

impl Default for TransferCrc {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_digest_is_ccitt_false_init() {
        let mut crc = TransferCrc::new();
        assert_eq!(crc.value(), 0xFFFF);
    }

    #[test]
    fn known_vector_123456789() {
        let mut crc = TransferCrc::new();
        crc.update(b"123456789");
        // Standard CRC-16/CCITT-FALSE check value for the ASCII string "123456789".
        assert_eq!(crc.value(), 0x29B1);
    }

    #[test]
    fn incremental_update_matches_single_shot() {
        let mut incremental = TransferCrc::new();
        incremental.update(b"123");
        incremental.update(b"456789");

        let mut one_shot = TransferCrc::new();
        one_shot.update(b"123456789");

        assert_eq!(incremental.value(), one_shot.value());
    }
}
