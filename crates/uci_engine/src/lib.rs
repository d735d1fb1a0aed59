//! Lifecycle management for an external UCI chess engine
//!
//! Spawns the engine binary once, keeps it alive across searches, and
//! exposes it behind [`EngineHandle`], a mutex-guarded resource the HTTP
//! layer shares between requests. The [`MoveEngine`] trait is the seam
//! callers depend on.

mod error;
mod handle;
mod process;

pub use error::{EngineError, EngineResult};
pub use handle::{EngineHandle, MoveEngine};
pub use process::UciProcess;
