//! Error types for stockfish-broker-core

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to start engine {path:?}: {source}")]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Engine handshake failed: {0}")]
    Handshake(String),

    #[error("Engine process has exited")]
    EngineExited,

    #[error("Engine search timed out after {0:?}")]
    SearchTimeout(Duration),

    #[error("Either depth or move time must be supplied")]
    MissingSearchLimit,

    #[error("Invalid FEN: {0}")]
    InvalidFen(String),

    #[error("Invalid move: {0}")]
    InvalidMove(String),

    #[error("Pool size must be at least 1")]
    InvalidPoolSize,

    #[error("Engine pool is shut down")]
    PoolClosed,

    #[error("No idle engine available despite a free pool slot")]
    PoolInvariant,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
