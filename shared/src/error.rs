//! Error types reported by the session layer.
//!
//! Stream failures on an established connection never show up here: the
//! framer absorbs them and the owner notices the connection is gone.

use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to bind listener on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("session is already running")]
    AlreadyRunning,

    #[error("session is not running")]
    NotRunning,
}

/// A payload that could not be turned into a message.
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("expected at least {expected} fields, found {found}")]
    MissingFields { expected: usize, found: usize },

    #[error("invalid snapshot json: {0}")]
    Json(#[from] serde_json::Error),
}
