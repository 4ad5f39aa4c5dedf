//! Compile-time CAN classic / CAN-FD configuration.
//!
//! MTU and the DLC↔byte-count mapping are fixed per bus variant, so they are
//! carried as an associated const on a zero-sized marker type rather than a
//! runtime field — the same shape `Transport`'s `MTU_SIZE`/`CRC_SIZE`
//! associated constants use elsewhere in this crate's lineage.

use arrayvec::Array;

/// A CAN bus variant: classic (8-byte frames) or FD (up to 64-byte frames).
pub trait Profile: Copy + Clone {
    /// Backing array for a frame's data buffer, sized to `MTU`.
    type Storage: Array<Item = u8> + Copy;

    /// Maximum frame payload size in bytes, tail byte included.
    const MTU: usize;

    /// Whether frames of this profile set the FD and BRS flags.
    const IS_FD: bool;

    /// Smallest DLC whose byte count is `>= len`.
    fn bytes_to_dlc(len: usize) -> u8;

    /// Byte count covered by `dlc`.
    fn dlc_to_bytes(dlc: u8) -> usize;
}

/// CAN classic: 8-byte frames, linear DLC.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Classic;

impl Profile for Classic {
    type Storage = [u8; 8];

    const MTU: usize = 8;
    const IS_FD: bool = false;

    fn bytes_to_dlc(len: usize) -> u8 {
        debug_assert!(len <= Self::MTU, "length exceeds classic MTU");
        len as u8
    }

    fn dlc_to_bytes(dlc: u8) -> usize {
        (dlc as usize).min(Self::MTU)
    }
}

/// CAN-FD: 64-byte frames, DLC nonlinear above 8 bytes.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Fd;

/// Byte count covered by DLC values 0..=15, per the CAN-FD standard table.
const FD_DLC_BYTES: [usize; 16] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 12, 16, 20, 24, 32, 48, 64];

impl Profile for Fd {
    type Storage = [u8; 64];

    const MTU: usize = 64;
    const IS_FD: bool = true;

    fn bytes_to_dlc(len: usize) -> u8 {
        FD_DLC_BYTES
            .iter()
            .position(|&bytes| bytes >= len)
            .expect("length exceeds FD MTU") as u8
    }

    fn dlc_to_bytes(dlc: u8) -> usize {
        FD_DLC_BYTES[dlc as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classic_dlc_is_identity() {
        for len in 0..=8 {
            assert_eq!(Classic::dlc_to_bytes(Classic::bytes_to_dlc(len)), len.max(len));
        }
        assert_eq!(Classic::bytes_to_dlc(5), 5);
        assert_eq!(Classic::dlc_to_bytes(5), 5);
    }

    #[test]
    fn fd_dlc_table_rounds_up_to_next_bucket() {
        // 63-byte payload + 1 tail byte = 64 bytes -> dlc 15.
        assert_eq!(Fd::bytes_to_dlc(64), 15);
        assert_eq!(Fd::dlc_to_bytes(15), 64);
        // 32-byte payload + 1 tail byte = 33 bytes -> next covering dlc is 14 (48 bytes).
        assert_eq!(Fd::bytes_to_dlc(33), 14);
        assert_eq!(Fd::dlc_to_bytes(14), 48);
        // Empty payload + 1 tail byte = 1 byte -> dlc 1.
        assert_eq!(Fd::bytes_to_dlc(1), 1);
        assert_eq!(Fd::dlc_to_bytes(1), 1);
    }
}
