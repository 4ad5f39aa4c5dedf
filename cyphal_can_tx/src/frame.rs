//! The wire-level CAN frame produced for each transmission.
//!
//! Generalizes the `CanFrame<C>` shape from `transport/can/legacy.rs`, which
//! hardcodes an `ArrayVec<[u8; 8]>` payload, to a profile-sized buffer so the
//! same type serves both classic and FD frames.

use arrayvec::ArrayVec;

use crate::profile::Profile;

/// CAN controller flags accompanying a frame.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Flags {
    /// Extended (29-bit) identifier. Always set: Cyphal/CAN only uses
    /// extended identifiers.
    pub extended: bool,
    /// CAN-FD frame format.
    pub fd: bool,
    /// Bit-rate switching, set alongside `fd`.
    pub brs: bool,
}

impl Flags {
    /// Builds the flag set appropriate for `P`.
    pub fn for_profile<P: Profile>() -> Self {
        Flags {
            extended: true,
            fd: P::IS_FD,
            brs: P::IS_FD,
        }
    }
}

/// A single CAN frame ready to be handed to a [`CanController`](crate::controller::CanController).
#[derive(Clone)]
pub struct Frame<P: Profile> {
    /// The 29-bit extended identifier.
    pub id: u32,
    /// Frame-format flags for the controller.
    pub flags: Flags,
    /// Data-length code, covering `data.len()` bytes.
    pub dlc: u8,
    data: ArrayVec<P::Storage>,
}

impl<P: Profile> Frame<P> {
    pub(crate) fn new(id: u32, dlc: u8) -> Self {
        Frame {
            id,
            flags: Flags::for_profile::<P>(),
            dlc,
            data: ArrayVec::new(),
        }
    }

    pub(crate) fn push(&mut self, byte: u8) {
        self.data.push(byte);
    }

    pub(crate) fn extend_from_payload(&mut self, bytes: &[u8]) {
        self.data
            .try_extend_from_slice(bytes)
            .expect("frame payload exceeds profile MTU");
    }

    /// The frame's data bytes, in wire order: `[payload][padding][crc][tail]`.
    pub fn data(&self) -> &[u8] {
        self.data.as_slice()
    }
}

impl<P: Profile> core::fmt::Debug for Frame<P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Frame")
            .field("id", &format_args!("{:#x}", self.id))
            .field("flags", &self.flags)
            .field("dlc", &self.dlc)
            .field("data", &self.data())
            .finish()
    }
}

#[cfg(feature = "defmt")]
impl<P: Profile> defmt::Format for Frame<P> {
    fn format(&self, f: defmt::Formatter) {
        // `ArrayVec<P::Storage>` has no generic `defmt::Format` impl, so
        // this formats the frame field-by-field instead of deriving.
        defmt::write!(
            f,
            "Frame {{ id: {=u32:#x}, flags: {}, dlc: {=u8}, data: {=[u8]} }}",
            self.id,
            self.flags,
            self.dlc,
            self.data(),
        );
    }
}
