//! Shared handle around the engine process
//!
//! The engine is a single-session subprocess: one request/response stream,
//! not shareable across simultaneous callers. `EngineHandle` wraps the
//! process in a mutex so concurrent searches are serialized, and tracks
//! whether the engine is usable at all.
//!
//! State machine: `Uninitialized` → (initialize ok) → `Ready` →
//! (launch failure | termination detected) → `Unavailable`. A detected
//! termination is sticky: the handle stays `Unavailable` until it is
//! explicitly re-initialized, it never respawns the engine on its own.

use std::path::Path;

use async_trait::async_trait;
use log::{info, warn};
use tokio::sync::Mutex;

use crate::error::{EngineError, EngineResult};
use crate::process::UciProcess;

/// Anything that can produce a best move for a FEN at a given depth.
///
/// `EngineHandle` is the real implementation; tests substitute scripted
/// ones.
#[async_trait]
pub trait MoveEngine: Send + Sync {
    async fn best_move(&self, fen: &str, depth: u8) -> EngineResult<String>;
}

enum EngineState {
    Uninitialized,
    Ready(UciProcess),
    Unavailable,
}

/// Lock-guarded owner of the one engine process.
pub struct EngineHandle {
    state: Mutex<EngineState>,
}

impl EngineHandle {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(EngineState::Uninitialized),
        }
    }

    /// Launch the engine at `path`. On failure the handle is left
    /// `Unavailable` and the error is returned for the caller to log; the
    /// service keeps running without an engine.
    pub async fn initialize(&self, path: &Path) -> EngineResult<()> {
        let mut state = self.state.lock().await;
        if let EngineState::Ready(_) = *state {
            return Ok(());
        }
        match UciProcess::spawn(path).await {
            Ok(process) => {
                info!("engine ready: {}", path.display());
                *state = EngineState::Ready(process);
                Ok(())
            }
            Err(e) => {
                *state = EngineState::Unavailable;
                Err(e)
            }
        }
    }

    /// Whether a live engine process is currently held.
    pub async fn is_ready(&self) -> bool {
        matches!(*self.state.lock().await, EngineState::Ready(_))
    }

    /// Gracefully stop the engine if one is running. Idempotent; errors
    /// from an already-dead process are logged inside `quit`, not raised.
    pub async fn shutdown(&self) {
        let mut state = self.state.lock().await;
        match std::mem::replace(&mut *state, EngineState::Uninitialized) {
            EngineState::Ready(process) => process.quit().await,
            other => *state = other,
        }
    }
}

impl Default for EngineHandle {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MoveEngine for EngineHandle {
    /// Run a search on the held process. Holding the state lock across the
    /// search is what serializes engine access.
    async fn best_move(&self, fen: &str, depth: u8) -> EngineResult<String> {
        let mut state = self.state.lock().await;
        let process = match &mut *state {
            EngineState::Ready(process) => process,
            _ => return Err(EngineError::Unavailable),
        };
        match process.best_move(fen, depth).await {
            Err(EngineError::Terminated) => {
                warn!("engine terminated mid-search, marking it unavailable");
                *state = EngineState::Unavailable;
                Err(EngineError::Terminated)
            }
            other => other,
        }
    }
}
