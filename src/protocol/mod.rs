//! Wire protocol: command/response records and the line codec.
//!
//! One UTF-8 JSON record per newline-terminated line, in both directions.

mod command;
mod response;
mod wire;

pub use command::Command;
pub use response::Response;
pub use wire::{
    read_line_bounded, read_line_with_timeout, write_line, write_line_with_timeout,
    DEFAULT_MAX_LINE_BYTES,
};
