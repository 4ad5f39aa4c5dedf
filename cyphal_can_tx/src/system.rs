//! Bundles the external collaborators this crate leaves to the integrator
//! (controller, clock, mutex) plus the compile-time bus profile into one
//! trait, so [`Instance`](crate::instance::Instance) takes a single type
//! parameter instead of four.
//!
//! Follows the same habit of bundling transport concerns behind one generic
//! bound seen in `node.rs`'s `M: TransferManager<C>, C: embedded_time::Clock`
//! — this crate takes that one step further via a GAT-based associated-type
//! bundle, which the 2024-edition toolchain comfortably supports.

use crate::controller::CanController;
use crate::profile::Profile;
use crate::sync::{CompletionSignal, RawMutex};

/// The set of collaborators one [`Instance`](crate::instance::Instance) is
/// built from.
pub trait System: Sized {
    /// Deadline clock, supplied by the integrator.
    type Clock: embedded_time::Clock;

    /// The underlying CAN controller, supplied by the integrator.
    type Controller: CanController<Self::Profile>;

    /// Guards the instance's shared queue and slot state, supplied by the
    /// integrator.
    type Mutex<T>: RawMutex<T>;

    /// Classic or FD framing, fixed at compile time.
    type Profile: Profile;

    /// Backs `publish_wait`'s blocking completion.
    type Done: CompletionSignal;
}
