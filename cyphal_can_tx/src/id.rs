//! Cyphal/CAN identifier construction.
//!
//! Builds the 29-bit extended CAN identifier whose numeric value encodes
//! transfer priority: smaller values win bus arbitration, so priority 0
//! ("Exceptional") produces the smallest possible identifier.

use crate::error::CyphalError;

/// Protocol-level transfer priority, 0 (highest) to 7 (lowest).
///
/// Transports are supposed to be able to support more priorities, but
/// there is currently no API for that.
#[derive(FromPrimitive, ToPrimitive, Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Debug, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Priority {
    Exceptional = 0,
    Immediate = 1,
    Fast = 2,
    High = 3,
    Nominal = 4,
    Low = 5,
    Slow = 6,
    Optional = 7,
}

impl Priority {
    pub(crate) const fn bits(self) -> u32 {
        self as u32
    }
}

macro_rules! bounded_id {
    ($name:ident, $repr:ty, $max:expr, $doc:expr) => {
        #[doc = $doc]
        #[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
        #[cfg_attr(feature = "defmt", derive(defmt::Format))]
        pub struct $name($repr);

        impl $name {
            /// The largest value this identifier can hold.
            pub const MAX: $repr = $max;

            /// Creates a new identifier, returning `InvalidArgument` if `value` is out of range.
            pub const fn new(value: $repr) -> Result<Self, CyphalError> {
                if value > $max {
                    Err(CyphalError::InvalidArgument)
                } else {
                    Ok(Self(value))
                }
            }
        }

        impl core::convert::TryFrom<$repr> for $name {
            type Error = CyphalError;

            fn try_from(value: $repr) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for $repr {
            fn from(id: $name) -> $repr {
                id.0
            }
        }
    };
}

bounded_id!(NodeId, u8, 127, "A 7-bit Cyphal node identifier (0..=127).");
bounded_id!(
    SubjectId,
    u16,
    8191,
    "A 13-bit Cyphal subject identifier (0..=8191)."
);
bounded_id!(
    ServiceId,
    u16,
    511,
    "A 9-bit Cyphal service identifier (0..=511)."
);

const PRIORITY_SHIFT: u32 = 26;
const SERVICE_BIT: u32 = 1 << 25;
const REQUEST_BIT: u32 = 1 << 24;
const MESSAGE_RESERVED_BITS: u32 = (1 << 22) | (1 << 21);
const SERVICE_ID_SHIFT: u32 = 14;
const SUBJECT_ID_SHIFT: u32 = 8;
const DESTINATION_ID_SHIFT: u32 = 7;

/// Builds the 29-bit identifier for a message transfer.
///
/// Bits 22 and 21 (the message-kind reserved field) are always set for
/// messages.
pub fn make_message_id(priority: Priority, subject: SubjectId, source: NodeId) -> u32 {
    let mut bits = priority.bits() << PRIORITY_SHIFT;
    bits |= MESSAGE_RESERVED_BITS;
    bits |= u32::from(u16::from(subject)) << SUBJECT_ID_SHIFT;
    bits |= u32::from(u8::from(source));
    bits
}

/// Builds the 29-bit identifier for a service (request/response) transfer.
pub fn make_service_id(
    priority: Priority,
    is_request: bool,
    service: ServiceId,
    destination: NodeId,
    source: NodeId,
) -> u32 {
    let mut bits = priority.bits() << PRIORITY_SHIFT;
    bits |= SERVICE_BIT;
    if is_request {
        bits |= REQUEST_BIT;
    }
    bits |= u32::from(u16::from(service)) << SERVICE_ID_SHIFT;
    bits |= u32::from(u8::from(destination)) << DESTINATION_ID_SHIFT;
    bits |= u32::from(u8::from(source));
    bits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_node_id() {
        assert!(NodeId::new(127).is_ok());
        assert_eq!(NodeId::new(128), Err(CyphalError::InvalidArgument));
    }

    #[test]
    fn rejects_out_of_range_subject_id() {
        assert!(SubjectId::new(8191).is_ok());
        assert_eq!(SubjectId::new(8192), Err(CyphalError::InvalidArgument));
    }

    #[test]
    fn message_id_matches_known_vector() {
        // node-id = 0x55, subject-id = 0x1234, priority NOMINAL -> 0x10723455
        let id = make_message_id(
            Priority::Nominal,
            SubjectId::new(0x1234).unwrap(),
            NodeId::new(0x55).unwrap(),
        );
        assert_eq!(id, 0x10723455);
    }

    #[test]
    fn priority_interleave_ordering() {
        // Lower numeric priority produces a smaller CAN-ID and wins arbitration.
        let subject = SubjectId::new(1).unwrap();
        let node = NodeId::new(0x55).unwrap();
        let fast = make_message_id(Priority::Fast, subject, node);
        let slow = make_message_id(Priority::Slow, subject, node);
        assert!(fast < slow);
    }

    #[test]
    fn priority_bits_occupy_top_three_bits() {
        let id = make_message_id(
            Priority::Exceptional,
            SubjectId::new(0).unwrap(),
            NodeId::new(0).unwrap(),
        );
        assert_eq!(id >> PRIORITY_SHIFT, 0);
        let id = make_message_id(
            Priority::Optional,
            SubjectId::new(0).unwrap(),
            NodeId::new(0).unwrap(),
        );
        assert_eq!(id >> PRIORITY_SHIFT, 7);
    }

    #[test]
    fn service_id_sets_service_bit() {
        let id = make_service_id(
            Priority::Nominal,
            true,
            ServiceId::new(1).unwrap(),
            NodeId::new(2).unwrap(),
            NodeId::new(3).unwrap(),
        );
        assert_ne!(id & SERVICE_BIT, 0);
        assert_ne!(id & REQUEST_BIT, 0);
    }
}
