//! Client library for driving a remote mining worker.

mod remote;

pub use remote::RemoteClient;
