//! Chess AI backend
//!
//! HTTP service that plays the Black side of a game: the caller posts a
//! position, the service answers with the move of a configurable opponent
//! persona, mixing engine best moves with deliberate blunders at the lower
//! levels. Rules questions go to `shakmaty`, searches go to the external
//! engine owned by the `uci_engine` crate.

pub mod api;
pub mod opponents;
pub mod play;
