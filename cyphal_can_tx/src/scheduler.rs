//! Cooperative scheduler body.
//!
//! Ported from `original_source/src/core.c`'s `zyphal_tx_work_handler` and
//! `can_send_callback`: pop-or-expire the head of the queue, build its next
//! frame, hand it to the controller, and commit the built frame's counters
//! only on success. `tick` takes the place of the C work-queue item;
//! `on_sent` takes the place of `can_send_callback`. Neither owns a timer —
//! timed re-invocation is the embedding runtime's job, driven by this
//! module's [`Rearm`] return values.

use core::sync::atomic::Ordering;

use crate::controller::Rearm;
use crate::error::CyphalError;
use crate::frame_builder;
use crate::instance::{Instance, SharedGuard};
use crate::system::System;

impl<Sys: System, const N: usize, const CAP: usize> Instance<Sys, N, CAP> {
    /// Runs one pass of the scheduler: expires or completes the queue head
    /// if it is no longer live, then submits its next frame to the
    /// controller.
    ///
    /// Call this whenever a publish enqueues work, whenever the controller
    /// reports a completed send (via [`on_sent`](Self::on_sent)), and again
    /// after a [`Rearm::Backoff`] hint's interval has elapsed.
    pub fn tick(&self) -> Rearm {
        let Some(mut guard) = self.shared.try_lock() else {
            #[cfg(feature = "defmt")]
            defmt::debug!("tick: shared state contended, backing off");
            return Rearm::Backoff;
        };

        loop {
            let Some(slot_idx) = guard.queue.peek_head() else {
                return Rearm::Idle;
            };
            let now = match self.clock.try_now() {
                Ok(now) => now,
                Err(_) => return Rearm::Idle,
            };
            let pending_now = self.pending[slot_idx].load(Ordering::Acquire);
            let expired = guard.slots[slot_idx].deadline.is_some_and(|d| now >= d);

            if pending_now == 0 {
                self.complete_head(&mut guard, slot_idx, Ok(()));
                continue;
            }
            if expired {
                #[cfg(feature = "defmt")]
                defmt::warn!("transfer on slot {} missed its deadline", slot_idx);
                self.complete_head(&mut guard, slot_idx, Err(CyphalError::Timeout));
                continue;
            }

            if self.in_flight[slot_idx].load(Ordering::Acquire) {
                // A frame for this transfer is still outstanding with the
                // controller; `on_sent` will re-trigger `tick` once it
                // lands.
                return Rearm::Idle;
            }

            let slot = &guard.slots[slot_idx];
            let built = frame_builder::build_next_frame::<Sys::Profile>(
                slot.id,
                &slot.payload,
                slot.payload_written,
                &slot.crc,
                slot.crc_written,
                slot.toggle,
                slot.transfer_id,
                pending_now,
            );

            let token = self.make_token(slot_idx);
            match guard.controller.send(&built.frame, token) {
                Ok(()) => {
                    let slot = &mut guard.slots[slot_idx];
                    slot.payload_written += built.payload_len;
                    slot.crc_written += built.crc_len;
                    slot.crc = built.next_crc;
                    slot.toggle = !slot.toggle;
                    self.in_flight[slot_idx].store(true, Ordering::Release);
                    return Rearm::Idle;
                }
                Err(CyphalError::Busy) => {
                    #[cfg(feature = "defmt")]
                    defmt::debug!("controller mailbox full, backing off");
                    return Rearm::Backoff;
                }
                Err(e) => {
                    #[cfg(feature = "defmt")]
                    defmt::error!("driver error on slot {}: {}", slot_idx, e);
                    self.complete_head(&mut guard, slot_idx, Err(e));
                    // The queue may still hold other transfers behind the
                    // one that just failed; give the new head a chance in
                    // this same turn rather than stranding it until some
                    // other event re-invokes `tick`.
                    continue;
                }
            }
        }
    }

    fn complete_head(
        &self,
        guard: &mut SharedGuard<'_, Sys, N, CAP>,
        slot_idx: usize,
        status: Result<(), CyphalError>,
    ) {
        guard.queue.pop_head();
        self.pending[slot_idx].store(0, Ordering::Release);
        // The transfer may still have a frame outstanding with the
        // controller (a deadline can expire, or a driver error can land,
        // while one is in flight). Clearing `in_flight` here lets a
        // re-publish on this slot submit its own first frame right away;
        // `generation` is bumped so that frame's eventual, late callback is
        // recognized as stale in `on_sent` instead of being mistaken for
        // the new transfer's.
        self.in_flight[slot_idx].store(false, Ordering::Release);
        self.generation[slot_idx].fetch_add(1, Ordering::Release);
        let slot = &mut guard.slots[slot_idx];
        slot.status = Some(status);
        let done = slot.done.take();
        if let Some((cb, user)) = done {
            cb(user.0, status);
        }
    }

    /// Invoked by a [`SendToken`](crate::controller::SendToken) once a
    /// submitted frame has left the controller's mailbox, successfully or
    /// not.
    ///
    /// On success, decrements `pending` and completes the transfer only
    /// once every frame has been acknowledged. On failure, completes the
    /// transfer immediately (no retry) if it is still the queue head.
    /// `generation` is the slot's occupancy generation the token was
    /// created under; a mismatch against the slot's current generation
    /// means the transfer this frame belonged to was already completed
    /// early (deadline expiry, driver error) and the slot may by now be
    /// serving a different transfer, so the callback is ignored outright.
    pub(crate) fn on_sent(
        &self,
        slot_idx: usize,
        generation: u32,
        result: Result<(), CyphalError>,
    ) -> Rearm {
        if self.generation[slot_idx].load(Ordering::Acquire) != generation {
            return self.tick();
        }

        // Cleared unconditionally, with no lock involved, so a momentarily
        // contended mutex here can never leave the slot stuck thinking a
        // frame is still outstanding — the `tick` below (or a later
        // re-arm) is always free to build the slot's next frame.
        self.in_flight[slot_idx].store(false, Ordering::Release);
        match result {
            Err(e) => {
                if let Some(mut guard) = self.shared.try_lock() {
                    if guard.queue.peek_head() == Some(slot_idx) {
                        self.complete_head(&mut guard, slot_idx, Err(e));
                    }
                }
            }
            Ok(()) => {
                // A compare-exchange loop rather than `fetch_sub`, flooring
                // at 0: `complete_head` can run concurrently on this same
                // slot (e.g. its deadline expiring right as this callback
                // arrives) and already zeroed `pending`, in which case this
                // is a second, narrower-than-the-generation-check race and
                // must be a no-op rather than wrapping to `u32::MAX`.
                let mut current = self.pending[slot_idx].load(Ordering::Acquire);
                let mut drained = false;
                while current > 0 {
                    match self.pending[slot_idx].compare_exchange_weak(
                        current,
                        current - 1,
                        Ordering::AcqRel,
                        Ordering::Acquire,
                    ) {
                        Ok(previous) => {
                            drained = previous == 1;
                            break;
                        }
                        Err(actual) => current = actual,
                    }
                }
                if drained {
                    if let Some(mut guard) = self.shared.try_lock() {
                        if guard.queue.peek_head() == Some(slot_idx) {
                            self.complete_head(&mut guard, slot_idx, Ok(()));
                        }
                    }
                }
            }
        }
        self.tick()
    }
}
