//! Error types returned by the transmit path.

/// Errors returned by the public transmit API.
///
/// Argument, state, and resource errors are returned synchronously and
/// leave no side effects. Runtime errors are only ever delivered through
/// a transfer's completion signal.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CyphalError {
    /// A parameter was out of range, or a required buffer was missing.
    InvalidArgument,
    /// The controller was not ready at `Instance` initialization.
    NoDevice,
    /// A `publish` was attempted on a handle with a transfer already in flight.
    Busy,
    /// A transfer's deadline elapsed before all of its frames were acknowledged.
    Timeout,
    /// A transfer was removed from the queue by an explicit `cancel`.
    Canceled,
    /// The CAN controller reported an error while submitting a frame.
    ///
    /// The wrapped value is the controller-specific error code, opaque to
    /// this crate.
    DriverError(i32),
    /// `cancel` was called on a handle with no transfer in flight.
    NotPending,
}

#[cfg(feature = "std")]
impl core::fmt::Display for CyphalError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            CyphalError::InvalidArgument => write!(f, "invalid argument"),
            CyphalError::NoDevice => write!(f, "controller not ready"),
            CyphalError::Busy => write!(f, "transfer already in flight"),
            CyphalError::Timeout => write!(f, "transfer deadline expired"),
            CyphalError::Canceled => write!(f, "transfer canceled"),
            CyphalError::DriverError(code) => write!(f, "driver error ({code})"),
            CyphalError::NotPending => write!(f, "no transfer in flight"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for CyphalError {}
