//! Top-level owner of the controller, queue, and scheduler state.
//!
//! Grounded on `original_source/src/core.c`'s `zyphal_init`/`zyphal_tx_init`:
//! a fixed-size array of transfer slots plus one shared queue, sized at
//! compile time rather than `core.c`'s `CONFIG_ZYPHAL_MAX_TRANSFERS` Kconfig
//! symbol — sizing goes through const generics here, not a feature flag.

use core::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};

use crate::controller::{CanController, Rearm, SendToken};
use crate::error::CyphalError;
use crate::id::NodeId;
use crate::queue::TxQueue;
use crate::sync::RawMutex;
use crate::system::System;
use crate::transfer::{Slot, Timeout, TransferHandle};

/// Interval the embedding runtime should wait before re-invoking
/// [`Instance::tick`] after a [`Rearm::Backoff`] hint.
///
/// Both `original_source` variants (`core.c` and `transmit.c`) use the same
/// literal `K_USEC(100)` for this.
pub const BACKOFF_MICROS: u32 = 100;

pub(crate) type SharedGuard<'a, Sys, const N: usize, const CAP: usize> =
    <<Sys as System>::Mutex<Shared<Sys, N, CAP>> as RawMutex<Shared<Sys, N, CAP>>>::Guard<'a>;

/// Everything the scheduler needs behind one mutex: the controller mailbox,
/// the priority-ordered send queue, and every transfer slot's payload/CRC
/// state.
pub(crate) struct Shared<Sys: System, const N: usize, const CAP: usize> {
    pub(crate) controller: Sys::Controller,
    pub(crate) queue: TxQueue<N>,
    pub(crate) slots: [Slot<Sys, CAP>; N],
}

/// Owns the controller handle, node-id, queue, and scheduler state for up to
/// `N` concurrently-held [`TransferHandle`]s, each with payloads up to `CAP`
/// bytes.
pub struct Instance<Sys: System, const N: usize, const CAP: usize> {
    pub(crate) node_id: NodeId,
    pub(crate) clock: Sys::Clock,
    pub(crate) pending: [AtomicU32; N],
    /// Per-slot "a frame is currently outstanding with the controller"
    /// flag. Lives beside `pending` rather than inside the mutex-guarded
    /// [`Shared`] state so [`Instance::on_sent`] can clear it without ever
    /// taking the lock: the scheduler must not build a second frame for a
    /// slot while this is set, and the only context that clears it is the
    /// controller callback itself.
    pub(crate) in_flight: [AtomicBool; N],
    /// Per-slot occupancy counter, bumped every time a transfer on that
    /// slot is completed ([`Instance::complete_head`]). A [`SendToken`]
    /// captures the generation current at submission time; `on_sent`
    /// discards any callback whose generation no longer matches, so a late
    /// callback for a frame abandoned by an early completion (deadline
    /// expiry, driver error) can never be mistaken for a callback belonging
    /// to whatever transfer has since reused the slot.
    pub(crate) generation: [AtomicU32; N],
    pub(crate) shared: Sys::Mutex<Shared<Sys, N, CAP>>,
    next_handle: AtomicUsize,
}

impl<Sys: System, const N: usize, const CAP: usize> Instance<Sys, N, CAP> {
    /// Builds an instance around a controller, clock, and local node-id.
    ///
    /// Fails with [`CyphalError::NoDevice`] if `controller` reports itself
    /// not ready (see [`CanController::is_ready`]). `node_id` is already
    /// range-checked by [`NodeId`]'s constructor, so there is no separate
    /// `InvalidArgument` path here.
    pub fn new(
        controller: Sys::Controller,
        clock: Sys::Clock,
        node_id: NodeId,
    ) -> Result<Self, CyphalError> {
        if !controller.is_ready() {
            return Err(CyphalError::NoDevice);
        }
        let slots = core::array::from_fn(|_| Slot::new());
        let pending = core::array::from_fn(|_| AtomicU32::new(0));
        let in_flight = core::array::from_fn(|_| AtomicBool::new(false));
        let generation = core::array::from_fn(|_| AtomicU32::new(0));
        Ok(Instance {
            node_id,
            clock,
            pending,
            in_flight,
            generation,
            shared: Sys::Mutex::new(Shared {
                controller,
                queue: TxQueue::new(),
                slots,
            }),
            next_handle: AtomicUsize::new(0),
        })
    }

    /// Reserves a fresh transfer handle.
    ///
    /// Handles are reserved permanently for the life of the instance: there
    /// is no dynamic allocation on the hot path, so a handle is never
    /// returned to a free pool. An instance sized for `N` handles can call
    /// this at most `N` times.
    pub fn new_transfer(&self) -> Result<TransferHandle<'_, Sys, N, CAP>, CyphalError> {
        let slot = self.next_handle.fetch_add(1, Ordering::Relaxed);
        if slot >= N {
            self.next_handle.fetch_sub(1, Ordering::Relaxed);
            return Err(CyphalError::InvalidArgument);
        }
        Ok(TransferHandle {
            instance: self,
            slot,
        })
    }

    /// Acquires the shared lock, spinning on [`RawMutex::try_lock`] until it
    /// succeeds or `timeout` elapses.
    ///
    /// `RawMutex` only offers a non-blocking `try_lock` (it's an
    /// integrator-supplied collaborator); a bounded wait is assembled here
    /// from the instance's own clock rather than provided by the mutex.
    pub(crate) fn lock_with_timeout(
        &self,
        timeout: Timeout,
    ) -> Result<SharedGuard<'_, Sys, N, CAP>, CyphalError> {
        let deadline = self
            .clock
            .try_now()
            .map_err(|_| CyphalError::NoDevice)?
            .checked_add(timeout)
            .ok_or(CyphalError::InvalidArgument)?;
        loop {
            if let Some(guard) = self.shared.try_lock() {
                return Ok(guard);
            }
            let now = self.clock.try_now().map_err(|_| CyphalError::NoDevice)?;
            if now >= deadline {
                return Err(CyphalError::Timeout);
            }
        }
    }

    pub(crate) fn make_token(&self, slot: usize) -> SendToken {
        let generation = self.generation[slot].load(Ordering::Acquire);
        // SAFETY: `self` outlives every SendToken it creates: the token is
        // completed either synchronously within the `send` call that
        // accepted it, or later from the driver/ISR context that owns
        // `self`'s controller, both of which run while `self` is alive.
        unsafe {
            SendToken::new(
                self as *const Self as *const (),
                slot,
                generation,
                Self::trampoline,
            )
        }
    }

    unsafe fn trampoline(
        instance: *const (),
        slot: usize,
        generation: u32,
        result: Result<(), CyphalError>,
    ) -> Rearm {
        // SAFETY: `instance` was produced by `make_token` from a live `&Self`.
        let this = unsafe { &*(instance as *const Self) };
        this.on_sent(slot, generation, result)
    }
}
