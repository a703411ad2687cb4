//! Network Module
//!
//! The TCP listener, worker pool, and per-connection session handler.

mod server;
mod session;

pub use server::{Server, ShutdownHandle};
pub use session::Session;
