//! This file defines the error and status types shared by the IEC protocol
//! driver.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

use core::fmt;

/// Defines errors for the IEC bus driver.
///
/// Every fallible operation returns one of these alongside recording it in
/// the driver's [`Status`], which remains queryable until the next top-level
/// operation overwrites it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DriverError {
    /// A bounded wait expired - no response within the expected time
    Timeout,
    /// No device acknowledged the attention signal
    NoDevice,
    /// A byte was transmitted but the listener never acknowledged the frame
    FramingError,
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverError::Timeout => write!(f, "timeout"),
            DriverError::NoDevice => write!(f, "no device on bus"),
            DriverError::FramingError => write!(f, "frame not acknowledged"),
        }
    }
}

impl core::error::Error for DriverError {}

/// The outcome of the most recent top-level driver operation.
///
/// Overwritten at the start of every top-level call, so callers that care
/// must read it before issuing the next one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Status {
    /// The last operation completed normally
    #[default]
    Ok,
    /// A bounded wait expired
    Timeout,
    /// The attention-acknowledge window expired with no device response
    NoDevice,
    /// The post-transmission frame-handshake window expired
    FramingError,
}

impl Status {
    /// Returns true if the last operation completed normally.
    pub fn is_ok(self) -> bool {
        self == Status::Ok
    }

    /// The error corresponding to this status, if any.
    pub fn err(self) -> Option<DriverError> {
        match self {
            Status::Ok => None,
            Status::Timeout => Some(DriverError::Timeout),
            Status::NoDevice => Some(DriverError::NoDevice),
            Status::FramingError => Some(DriverError::FramingError),
        }
    }
}

impl From<DriverError> for Status {
    fn from(e: DriverError) -> Self {
        match e {
            DriverError::Timeout => Status::Timeout,
            DriverError::NoDevice => Status::NoDevice,
            DriverError::FramingError => Status::FramingError,
        }
    }
}
