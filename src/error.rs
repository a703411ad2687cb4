//! Error types for Qooil
//!
//! Provides a unified error type for all operations.
//!
//! Three failure families meet here: protocol errors (carried in Error
//! frames, recoverable, the session continues), transport faults (any
//! read/write failure on the stream, fatal for the session), and protocol
//! violations (the peer sent something out of spec; the connection is no
//! longer trusted).

use thiserror::Error;

use crate::protocol::ErrorKind;

/// Result type alias using QooilError
pub type Result<T> = std::result::Result<T, QooilError>;

/// Unified error type for Qooil operations
#[derive(Debug, Error)]
pub enum QooilError {
    // -------------------------------------------------------------------------
    // Transport Faults
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Protocol Errors (wire taxonomy)
    // -------------------------------------------------------------------------
    /// A taxonomy failure. On the server this becomes a single Error frame;
    /// on the client it is a decoded Error frame from the server.
    #[error("{kind}")]
    Protocol { kind: ErrorKind, arg1: u32, arg2: u32 },

    // -------------------------------------------------------------------------
    // Protocol Violations
    // -------------------------------------------------------------------------
    /// The peer sent something out of spec; the connection is untrusted and
    /// has been closed.
    #[error("protocol violation: {0}")]
    Fault(String),

    // -------------------------------------------------------------------------
    // Client State
    // -------------------------------------------------------------------------
    #[error("not connected")]
    NotConnected,

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl QooilError {
    /// Shorthand for a taxonomy error without arguments
    pub fn protocol(kind: ErrorKind) -> Self {
        QooilError::Protocol {
            kind,
            arg1: 0,
            arg2: 0,
        }
    }

    /// Shorthand for a taxonomy error with arguments
    pub fn protocol_args(kind: ErrorKind, arg1: u32, arg2: u32) -> Self {
        QooilError::Protocol { kind, arg1, arg2 }
    }

    /// The taxonomy kind, if this is a protocol error
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            QooilError::Protocol { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}
