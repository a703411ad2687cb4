//! # Qooil
//!
//! An FTP-like file-transfer service built on a custom binary protocol over
//! TCP, with:
//! - A tagged-union wire codec with fixed-size per-tag headers and
//!   little-endian framing
//! - A per-connection server session owning a sandboxed virtual working
//!   directory
//! - A symmetric client with streaming upload/download
//! - A bounded worker thread pool, one session per worker
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Listener                            │
//! │               (accept → worker thread pool)                  │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ one stream per session
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                       Session                                │
//! │     decode request → dispatch → encode response(s)           │
//! └──────────┬──────────────────────────────────┬───────────────┘
//!            │                                  │
//!            ▼                                  ▼
//!     ┌─────────────┐                   ┌─────────────┐
//!     │    Codec    │                   │   Sandbox   │
//!     │  (framing)  │                   │ (root, cwd) │
//!     └─────────────┘                   └─────────────┘
//! ```
//!
//! The client drives the same codec in reverse, issuing requests and
//! consuming zero or more framed responses per request.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;

pub mod client;
pub mod network;
pub mod protocol;
pub mod sandbox;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use client::Client;
pub use config::Config;
pub use error::{QooilError, Result};
pub use network::Server;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of Qooil
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
