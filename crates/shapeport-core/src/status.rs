//! Status codes returned by the engine's C entry points.
//!
//! Raw codes are translated into [`ShapeError`] here and nowhere else.

use tracing::warn;

use crate::{Result, ShapeError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Status {
    Ok,
    GeneralError,
    NotImplemented,
    NetworkNotLoaded,
    ParameterMismatch,
    NotFound,
    OutOfBounds,
    Unexpected,
    RequestBusy,
    ResultNotReady,
    NotAllocated,
    InferNotStarted,
    NetworkNotRead,
    InferCancelled,
    InvalidCParam,
    UnknownCError,
    NotImplementCMethod,
    UnknownException,
    /// A code outside the engine's published range.
    Unrecognized(i32),
}

impl Status {
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Self::Ok,
            -1 => Self::GeneralError,
            -2 => Self::NotImplemented,
            -3 => Self::NetworkNotLoaded,
            -4 => Self::ParameterMismatch,
            -5 => Self::NotFound,
            -6 => Self::OutOfBounds,
            -7 => Self::Unexpected,
            -8 => Self::RequestBusy,
            -9 => Self::ResultNotReady,
            -10 => Self::NotAllocated,
            -11 => Self::InferNotStarted,
            -12 => Self::NetworkNotRead,
            -13 => Self::InferCancelled,
            -14 => Self::InvalidCParam,
            -15 => Self::UnknownCError,
            -16 => Self::NotImplementCMethod,
            -17 => Self::UnknownException,
            other => Self::Unrecognized(other),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::Ok => 0,
            Self::GeneralError => -1,
            Self::NotImplemented => -2,
            Self::NetworkNotLoaded => -3,
            Self::ParameterMismatch => -4,
            Self::NotFound => -5,
            Self::OutOfBounds => -6,
            Self::Unexpected => -7,
            Self::RequestBusy => -8,
            Self::ResultNotReady => -9,
            Self::NotAllocated => -10,
            Self::InferNotStarted => -11,
            Self::NetworkNotRead => -12,
            Self::InferCancelled => -13,
            Self::InvalidCParam => -14,
            Self::UnknownCError => -15,
            Self::NotImplementCMethod => -16,
            Self::UnknownException => -17,
            Self::Unrecognized(code) => code,
        }
    }

    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }
}

/// Turns a raw status code from a foreign call into a `Result`.
///
/// Entry point for wrappers around engine calls that report a raw status.
pub fn check(code: i32) -> Result<()> {
    let status = Status::from_code(code);
    if status.is_ok() {
        return Ok(());
    }
    warn!(code, ?status, "engine call failed");
    Err(status.into())
}

impl From<Status> for ShapeError {
    fn from(status: Status) -> Self {
        match status {
            Status::NotAllocated => ShapeError::AllocationFailure,
            Status::ParameterMismatch | Status::OutOfBounds | Status::InvalidCParam => {
                ShapeError::malformed(None, format!("engine rejected record ({status:?})"))
            }
            status => ShapeError::Engine { status },
        }
    }
}
