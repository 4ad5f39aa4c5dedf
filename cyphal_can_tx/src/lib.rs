//! Transmit path of a Cyphal/CAN node.
//!
//! Frames outgoing transfers, assigns priority-encoded 29-bit CAN
//! identifiers, and drives a CAN controller mailbox under a cooperative,
//! non-blocking scheduler. The controller itself, the deadline clock, the
//! mutex guarding shared state, and the timed re-invocation of the
//! scheduler are all external collaborators the embedding system supplies
//! through the [`system::System`] trait.
//!
//! ```ignore
//! let instance = Instance::<MySystem, 4, 256>::new(controller, clock, node_id)?;
//! let handle = instance.new_transfer()?;
//! handle.publish(Priority::Nominal, subject, payload, timeout, None, core::ptr::null_mut())?;
//! ```

#![no_std]

#[macro_use]
extern crate num_derive;

#[cfg(feature = "std")]
extern crate std;

mod controller;
mod crc;
mod error;
mod frame;
mod frame_builder;
mod id;
mod instance;
mod profile;
mod queue;
mod scheduler;
mod sync;
mod system;
mod transfer;

pub use controller::{CanController, Rearm, SendToken};
pub use error::CyphalError;
pub use frame::{Flags, Frame};
pub use id::{make_message_id, make_service_id, NodeId, Priority, ServiceId, SubjectId};
pub use instance::{Instance, BACKOFF_MICROS};
pub use profile::{Classic, Fd, Profile};
pub use sync::{CompletionSignal, RawMutex};
#[cfg(feature = "std")]
pub use sync::{StdMutex, StdSignal};
pub use system::System;
pub use transfer::{DoneCallback, Timeout, TransferHandle};
