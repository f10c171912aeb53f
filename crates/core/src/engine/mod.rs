//! Chess engine integration
//!
//! Provides a client for UCI-compatible engines like Stockfish and a pool
//! that shares a few engine processes between many callers.

pub mod analysis;
pub mod pool;
pub mod stockfish;

#[cfg(test)]
pub(crate) mod testing;

// Re-export main types for convenience
pub use analysis::{Evaluation, SearchLimit};
pub use pool::{EnginePool, PooledEngine};
pub use stockfish::{EngineClient, START_POSITION};
