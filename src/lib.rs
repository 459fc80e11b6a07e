//! Minerlink
//!
//! Remote mining control: a TCP server that lets operator devices drive the
//! mining engine running on this host, and the client library those devices
//! use to issue commands and read results.
//!
//! The wire format is one newline-terminated UTF-8 JSON record per command
//! or response. The channel is plaintext and unauthenticated: that is a
//! property of the documented wire format, so the daemon should only be
//! exposed on trusted networks.

pub mod client;
pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod protocol;
pub mod socket;
