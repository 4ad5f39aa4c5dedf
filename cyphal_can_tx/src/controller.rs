//! The CAN controller contract this crate leaves to the integrator: an
//! asynchronous `send(frame, token)` mailbox, completed later via a
//! callback rather than a blocking call.
//!
//! No retrieved reference repo implements an async controller trait: this
//! crate's own transport is otherwise synchronous/polled, and
//! `projectgus-fakon` talks to a concrete `fdcan` HAL type directly rather
//! than through a trait. This
//! module is original engineering, encoding the controller callback's
//! back-pointer to the owning instance as an index into an arena rather
//! than via shared mutable aliasing that outlives the transfer — the same
//! type-erasure technique `core::task::RawWaker` uses to erase a closure's
//! type without an allocator.

use crate::error::CyphalError;
use crate::frame::Frame;
use crate::profile::Profile;

/// A hint for how soon the scheduler's [`tick`](crate::instance::Instance::tick)
/// should be invoked again.
///
/// Timed-work scheduling is left to the integrator: this crate only reports
/// when it has more to do, the integrator's runtime decides how to act on
/// it.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Rearm {
    /// Nothing pending; no need to re-invoke `tick` until the next publish
    /// or controller callback.
    Idle,
    /// Re-invoke `tick` after [`BACKOFF_MICROS`](crate::instance::BACKOFF_MICROS):
    /// the instance mutex was contended, or the controller reported
    /// backpressure.
    Backoff,
}

/// An asynchronous CAN controller mailbox.
///
/// `send` must not block: it either accepts the frame and arranges for
/// `token.complete(..)` to be called once the frame has left the mailbox
/// (successfully or not), or it rejects the frame synchronously with
/// [`CyphalError::Busy`] (transient backpressure) or
/// [`CyphalError::DriverError`] (hard failure).
pub trait CanController<P: Profile> {
    /// Submits `frame` for transmission, taking ownership of `token`'s
    /// completion obligation.
    fn send(&mut self, frame: &Frame<P>, token: SendToken) -> Result<(), CyphalError>;

    /// Whether the controller is ready to accept frames.
    ///
    /// Checked once, at [`Instance::new`](crate::instance::Instance::new):
    /// a controller that is not yet brought up fails instance construction
    /// with [`CyphalError::NoDevice`] rather than surfacing as a confusing
    /// `Busy`/`DriverError` on the first `publish`. Bus bring-up itself is
    /// the integrator's responsibility; this is only a readiness gate.
    fn is_ready(&self) -> bool {
        true
    }
}

type Trampoline = unsafe fn(*const (), usize, u32, Result<(), CyphalError>) -> Rearm;

/// A type-erased completion handle for one in-flight frame submission.
///
/// Carries a raw pointer to the owning instance, the frame's slot index, the
/// slot's occupancy generation at submission time, and a monomorphized
/// trampoline function pointer — the same erase-without-allocating
/// technique `RawWaker` uses. The instance that created a `SendToken` must
/// outlive the call to [`complete`](SendToken::complete).
pub struct SendToken {
    instance: *const (),
    slot: usize,
    generation: u32,
    trampoline: Trampoline,
}

// SAFETY: a SendToken only carries a pointer and a slot index; the driver
// that hands it back to `complete` is expected to do so from whatever
// context (thread or ISR) it normally completes sends from.
unsafe impl Send for SendToken {}

impl SendToken {
    /// Constructs a token bound to `instance`'s trampoline for `slot`, tagged
    /// with `generation` so a stale completion for a slot that has since
    /// been reused by another transfer can be told apart from a live one.
    ///
    /// # Safety
    /// `instance` must remain valid until `complete` is called.
    pub(crate) unsafe fn new(
        instance: *const (),
        slot: usize,
        generation: u32,
        trampoline: Trampoline,
    ) -> Self {
        SendToken {
            instance,
            slot,
            generation,
            trampoline,
        }
    }

    /// Reports the outcome of submitting this frame to the controller
    /// mailbox, driving the owning instance's scheduler.
    pub fn complete(self, result: Result<(), CyphalError>) -> Rearm {
        // SAFETY: `instance` was validated live by the caller of `new`, and
        // `trampoline` is the monomorphized function matching `instance`'s
        // concrete type.
        unsafe { (self.trampoline)(self.instance, self.slot, self.generation, result) }
    }
}
