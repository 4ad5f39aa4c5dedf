//! Per-frame payload/CRC/padding/tail-byte layout.
//!
//! A line-for-line semantic port of `original_source/src/transmit.c`'s
//! `build_next_frame`, cross-checked against the slightly different
//! (non-lookahead) variant in `original_source/src/core.c`'s
//! `zcy_tx_work_handler` to confirm the single-frame-gets-no-CRC,
//! padding-extends-past-payload behavior. Byte layout conventions (tail
//! byte last, CRC big-endian, payload before padding before CRC) also match
//! `transmit_frame`/`TailByte` in `transport/can/legacy.rs`.
//!
//! Unlike the C original, this does not mutate the transfer's persistent CRC
//! state in place: it returns the *candidate* next CRC state alongside the
//! built frame, and the scheduler only commits it when the controller
//! accepts the frame. The C reference mutates `tx->crc` unconditionally
//! before `can_send` is even attempted, which would double-digest the same
//! payload bytes into the CRC register on an `-EAGAIN` retry — a `Busy`
//! result must not advance any transfer state, so this module makes
//! `build_next_frame` pure instead.

use crate::crc::TransferCrc;
use crate::frame::Frame;
use crate::profile::Profile;

const TAIL_START_BIT: u8 = 0x80;
const TAIL_END_BIT: u8 = 0x40;
const TAIL_TOGGLE_BIT: u8 = 0x20;
const TAIL_TRANSFER_ID_MASK: u8 = 0x1F;
const TAIL_BYTE_SIZE: usize = 1;
const MULTI_FRAME_CRC_SIZE: u8 = 2;

fn tail_byte(start: bool, end: bool, toggle: bool, transfer_id: u8) -> u8 {
    (transfer_id & TAIL_TRANSFER_ID_MASK)
        | if start { TAIL_START_BIT } else { 0 }
        | if end { TAIL_END_BIT } else { 0 }
        | if toggle { TAIL_TOGGLE_BIT } else { 0 }
}

/// Number of frames a transfer of `len` payload bytes requires.
pub(crate) fn frame_count<P: Profile>(len: usize) -> u32 {
    if len < P::MTU {
        1
    } else {
        ((len + MULTI_FRAME_CRC_SIZE as usize + (P::MTU - TAIL_BYTE_SIZE) - 1)
            / (P::MTU - TAIL_BYTE_SIZE)) as u32
    }
}

/// The frame produced by one `build_next_frame` call, plus the counters the
/// caller must commit if (and only if) the controller accepts the frame.
pub(crate) struct BuiltFrame<P: Profile> {
    pub frame: Frame<P>,
    /// Payload bytes consumed by this frame; add to `payload_written`.
    pub payload_len: usize,
    /// CRC bytes emitted by this frame; add to `crc_written`.
    pub crc_len: u8,
    /// CRC accumulator state after digesting this frame's payload and
    /// padding; replaces the transfer's stored CRC on success.
    pub next_crc: TransferCrc,
}

/// Builds the next frame for a transfer currently at `payload_written` of
/// `payload.len()` bytes, with `pending` frames left to submit (including
/// this one).
#[allow(clippy::too_many_arguments)]
pub(crate) fn build_next_frame<P: Profile>(
    id: u32,
    payload: &[u8],
    payload_written: usize,
    crc: &TransferCrc,
    crc_written: u8,
    toggle: bool,
    transfer_id: u8,
    pending: u32,
) -> BuiltFrame<P> {
    let start = payload_written == 0;
    let end = pending == 1;
    let single = start && end;

    let payload_remaining = payload.len() - payload_written;
    let payload_len = payload_remaining.min(P::MTU - TAIL_BYTE_SIZE);

    let mut next_crc = crc.clone();
    if !single && payload_len > 0 {
        next_crc.update(&payload[payload_written..payload_written + payload_len]);
    }

    let crc_remaining: u8 = if single {
        0
    } else {
        MULTI_FRAME_CRC_SIZE - crc_written
    };
    let crc_space = ((P::MTU - TAIL_BYTE_SIZE) - payload_len) as u8;
    let crc_len = crc_remaining.min(crc_space);

    let used_before_padding = payload_len + crc_len as usize + TAIL_BYTE_SIZE;
    let dlc = P::bytes_to_dlc(used_before_padding);
    let frame_bytes = P::dlc_to_bytes(dlc);
    let padding_len = frame_bytes - used_before_padding;

    let mut frame = Frame::<P>::new(id, dlc);
    frame.extend_from_payload(&payload[payload_written..payload_written + payload_len]);

    if padding_len > 0 {
        for _ in 0..padding_len {
            frame.push(0);
        }
        if !single {
            let zeros = [0u8; 64];
            next_crc.update(&zeros[..padding_len]);
        }
    }

    if crc_len > 0 {
        let value = next_crc.value();
        for i in 0..crc_len {
            let byte = if crc_written + i == 0 {
                (value >> 8) as u8
            } else {
                value as u8
            };
            frame.push(byte);
        }
    }

    frame.push(tail_byte(start, end, toggle, transfer_id));

    BuiltFrame {
        frame,
        payload_len,
        crc_len,
        next_crc,
    }
}
