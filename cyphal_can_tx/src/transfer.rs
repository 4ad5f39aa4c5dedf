//! Per-handle transfer state machine and public publish API.
//!
//! A near-line-for-line port of `original_source/src/transmit.c`'s
//! `zyphal_tx_init`/`zyphal_publish`/`zyphal_publish_wait`/
//! `zyphal_publish_pending` (CAS-style busy check via `pending`,
//! transfer-id seeded at 31, toggle forced to 1 on arm). The payload is
//! copied into a const-generic-sized buffer owned by the slot, rather than
//! the C version's raw `payload` pointer into caller memory: a borrowed
//! pointer held across an async completion boundary would be shared mutable
//! aliasing that outlives the transfer, which safe Rust has no way to
//! express.

use core::cell::Cell;
use core::sync::atomic::Ordering;

use embedded_time::Instant;

use crate::crc::TransferCrc;
use crate::error::CyphalError;
use crate::frame_builder;
use crate::id::{self, NodeId, Priority, SubjectId};
use crate::instance::Instance;
use crate::sync::CompletionSignal;
use crate::system::System;

/// Timeout/deadline unit used throughout the public API.
pub type Timeout = embedded_time::duration::Milliseconds<u32>;

/// A caller-supplied completion callback: invoked with the `user` pointer
/// passed to [`TransferHandle::publish`] and the transfer's terminal
/// status.
pub type DoneCallback = fn(*mut (), Result<(), CyphalError>);

#[derive(Copy, Clone)]
pub(crate) struct RawUserData(pub(crate) *mut ());

// SAFETY: the pointer is opaque to this crate. The caller of `publish` is
// responsible for its target being safe to touch from whatever context
// `on_done` runs in (driver thread or ISR).
unsafe impl Send for RawUserData {}

/// Mutex-protected state for one transfer slot. Lives
/// inside [`Instance`]'s shared, mutex-guarded arena; `pending` and
/// whether a frame is currently outstanding with the controller are both
/// tracked separately as plain atomics on [`Instance`] so the controller
/// callback never has to take the instance mutex on the hot path.
pub(crate) struct Slot<Sys: System, const CAP: usize> {
    pub id: u32,
    pub deadline: Option<Instant<Sys::Clock>>,
    pub payload: heapless::Vec<u8, CAP>,
    pub payload_written: usize,
    pub crc: TransferCrc,
    pub crc_written: u8,
    pub toggle: bool,
    pub transfer_id: u8,
    pub num_frames: u32,
    pub status: Option<Result<(), CyphalError>>,
    pub done: Option<(DoneCallback, RawUserData)>,
}

impl<Sys: System, const CAP: usize> Slot<Sys, CAP> {
    pub(crate) fn new() -> Self {
        Slot {
            id: 0,
            deadline: None,
            payload: heapless::Vec::new(),
            payload_written: 0,
            crc: TransferCrc::new(),
            crc_written: 0,
            toggle: true,
            // Seeded so `(transfer_id + 1) & 0x1F` yields 0 on the first
            // publish.
            transfer_id: 0x1F,
            num_frames: 0,
            status: None,
            done: None,
        }
    }
}

/// A handle to one in-progress-or-idle transfer, reused across publishes.
///
/// A second `publish` while a previous one is still pending fails with
/// [`CyphalError::Busy`] and leaves no side effects, rather than starting a
/// second concurrent transfer on the same handle.
pub struct TransferHandle<'a, Sys: System, const N: usize, const CAP: usize> {
    pub(crate) instance: &'a Instance<Sys, N, CAP>,
    pub(crate) slot: usize,
}

impl<'a, Sys: System, const N: usize, const CAP: usize> TransferHandle<'a, Sys, N, CAP> {
    /// Starts transmitting `payload` as a message transfer on `subject`, at
    /// `priority`, with a deadline `timeout` in the future.
    pub fn publish(
        &self,
        priority: Priority,
        subject: SubjectId,
        payload: &[u8],
        timeout: Timeout,
        on_done: Option<DoneCallback>,
        user: *mut (),
    ) -> Result<(), CyphalError> {
        if payload.len() > CAP {
            return Err(CyphalError::InvalidArgument);
        }

        let num_frames = frame_builder::frame_count::<Sys::Profile>(payload.len());
        let pending = &self.instance.pending[self.slot];
        if pending
            .compare_exchange(0, num_frames, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(CyphalError::Busy);
        }

        let result = self.arm(priority, subject, payload, timeout, on_done, user, num_frames);
        if result.is_err() {
            pending.store(0, Ordering::Release);
        }
        result
    }

    #[allow(clippy::too_many_arguments)]
    fn arm(
        &self,
        priority: Priority,
        subject: SubjectId,
        payload: &[u8],
        timeout: Timeout,
        on_done: Option<DoneCallback>,
        user: *mut (),
        num_frames: u32,
    ) -> Result<(), CyphalError> {
        let now = self
            .instance
            .clock
            .try_now()
            .map_err(|_| CyphalError::NoDevice)?;
        let deadline = now
            .checked_add(timeout)
            .ok_or(CyphalError::InvalidArgument)?;
        let id = id::make_message_id(priority, subject, self.instance.node_id);

        let mut guard = self.instance.lock_with_timeout(timeout)?;
        let slot = &mut guard.slots[self.slot];
        slot.id = id;
        slot.deadline = Some(deadline);
        slot.payload.clear();
        slot.payload
            .extend_from_slice(payload)
            .map_err(|_| CyphalError::InvalidArgument)?;
        slot.payload_written = 0;
        slot.crc = TransferCrc::new();
        slot.crc_written = 0;
        slot.toggle = true;
        slot.transfer_id = (slot.transfer_id + 1) & 0x1F;
        slot.num_frames = num_frames;
        slot.status = None;
        slot.done = on_done.map(|cb| (cb, RawUserData(user)));

        guard.queue.push(id, self.slot)?;
        drop(guard);
        self.instance.tick();
        Ok(())
    }

    /// Like [`publish`](Self::publish), but blocks until the transfer
    /// reaches a terminal state and returns its status.
    pub fn publish_wait(
        &self,
        priority: Priority,
        subject: SubjectId,
        payload: &[u8],
        timeout: Timeout,
    ) -> Result<(), CyphalError> {
        let cell: CompletionCell<Sys::Done> = CompletionCell::new();
        let user = &cell as *const CompletionCell<Sys::Done> as *mut ();

        self.publish(
            priority,
            subject,
            payload,
            timeout,
            Some(publish_wait_callback::<Sys::Done>),
            user,
        )?;

        cell.signal.wait();
        cell.status.get().unwrap_or(Err(CyphalError::Timeout))
    }

    /// True if a previous publish on this handle has not yet completed.
    pub fn publish_pending(&self) -> bool {
        self.instance.pending[self.slot].load(Ordering::Acquire) > 0
    }

    /// Best-effort cancellation: removes the transfer from the queue and
    /// signals `Canceled` if it has not yet been handed to the controller;
    /// otherwise returns `NotPending` and lets the transfer complete
    /// naturally.
    pub fn cancel(&self) -> Result<(), CyphalError> {
        if self.instance.pending[self.slot].load(Ordering::Acquire) == 0 {
            return Err(CyphalError::NotPending);
        }
        if self.instance.in_flight[self.slot].load(Ordering::Acquire) {
            // A frame is already outstanding with the controller; unlinking
            // now would leave its `SendToken` completing against a slot the
            // queue no longer tracks. Let it finish naturally instead.
            return Err(CyphalError::NotPending);
        }
        let mut guard = self
            .instance
            .shared
            .try_lock()
            .ok_or(CyphalError::NotPending)?;
        if !guard.queue.remove(self.slot) {
            return Err(CyphalError::NotPending);
        }
        self.instance.pending[self.slot].store(0, Ordering::Release);
        let slot = &mut guard.slots[self.slot];
        slot.status = Some(Err(CyphalError::Canceled));
        let done = slot.done.take();
        drop(guard);
        if let Some((cb, user)) = done {
            cb(user.0, Err(CyphalError::Canceled));
        }
        Ok(())
    }
}

struct CompletionCell<D: CompletionSignal> {
    signal: D,
    status: Cell<Option<Result<(), CyphalError>>>,
}

impl<D: CompletionSignal> CompletionCell<D> {
    fn new() -> Self {
        CompletionCell {
            signal: D::new(),
            status: Cell::new(None),
        }
    }
}

fn publish_wait_callback<D: CompletionSignal>(user: *mut (), status: Result<(), CyphalError>) {
    // SAFETY: `user` points at the `CompletionCell` built on `publish_wait`'s
    // stack, which does not return until `signal.wait()` observes this
    // callback's `signal()` call, so the cell is still live here.
    let cell = unsafe { &*(user as *const CompletionCell<D>) };
    cell.status.set(Some(status));
    cell.signal.signal();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_id_seed_wraps_to_zero() {
        let mut transfer_id: u8 = 0x1F;
        transfer_id = (transfer_id + 1) & 0x1F;
        assert_eq!(transfer_id, 0);
    }
}
