//! TCP server: listener, roster, and per-connection handlers.

mod connection;
mod listener;

pub use connection::handle_connection;
pub use listener::{ConnectionMetrics, ControlListener, Roster};
