//! Stockfish Broker Core Library
//!
//! Drives UCI chess engines as subprocesses and shares a small pool of them
//! between concurrent callers.

pub mod config;
pub mod engine;
pub mod error;
pub mod position;

pub use config::EngineConfig;
pub use engine::{EngineClient, EnginePool, Evaluation, PooledEngine, SearchLimit};
pub use error::{Error, Result};
