//! Error types for UCI engine management
//!
//! Distinguishes an engine that was never started (or is known to be down)
//! from one that died in the middle of a search, so callers can surface
//! the two conditions differently.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while driving the external engine process
#[derive(Error, Debug)]
pub enum EngineError {
    /// Engine is not running: never initialized, launch failed earlier,
    /// or a previous call detected termination
    #[error("engine is not available")]
    Unavailable,

    /// Engine process died mid-call (EOF or broken pipe on its stdio)
    #[error("engine terminated unexpectedly")]
    Terminated,

    /// Engine executable could not be launched
    #[error("failed to launch engine at {}: {source}", .path.display())]
    Launch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Engine sent a reply the UCI driver cannot act on
    #[error("engine protocol error: {message}")]
    Protocol { message: String },
}

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
