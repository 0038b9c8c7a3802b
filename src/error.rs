//! Error types for Pulse Run

use std::net::SocketAddr;

use thiserror::Error;

/// Errors surfaced to callers.
///
/// Malformed datagrams and recording lines are not errors; they are skipped.
#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to bind UDP socket on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("settings error: {0}")]
    Settings(#[from] serde_json::Error),

    #[error("invalid settings: {0}")]
    InvalidSettings(String),
}

pub type Result<T> = std::result::Result<T, Error>;
