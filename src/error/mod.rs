//! Error types.

mod types;

pub use types::{
    ClientErrorKind, ControlError, ControlResult, ProtocolErrorKind, ValidationErrorKind,
};
