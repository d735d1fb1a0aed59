//! Move selection for the engine-controlled side
//!
//! One cycle: roll for a blunder, either pick a random legal move or ask
//! the engine for its best move, apply it, and read the game flags off the
//! resulting position. The engine is reached through the `MoveEngine`
//! trait, and the RNG is passed in, so both can be scripted in tests.

use rand::Rng;
use shakmaty::fen::Fen;
use shakmaty::uci::UciMove;
use shakmaty::{CastlingMode, Chess, Color, EnPassantMode, Move, Position};
use thiserror::Error;
use tracing::info;
use uci_engine::{EngineError, MoveEngine};

use crate::opponents::OpponentProfile;

/// The side this service plays. Requests where it is not this color's
/// turn are rejected before move selection.
pub const AI_COLOR: Color = Color::Black;

/// Failures while choosing the engine side's move
#[derive(Error, Debug)]
pub enum PlayError {
    /// The engine call itself failed
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The engine replied with something that is not a move in this position
    #[error("engine returned an unusable move {uci:?}: {reason}")]
    BadEngineMove { uci: String, reason: String },
}

/// Outcome of one move-selection cycle
#[derive(Debug, Clone)]
pub struct MoveResult {
    /// The move that was played, in UCI notation
    pub uci: String,
    /// FEN of the position after the move
    pub fen: String,
    pub is_checkmate: bool,
    pub is_stalemate: bool,
    pub is_check: bool,
}

/// Parse a caller-supplied FEN into a playable position.
pub fn parse_fen(fen: &str) -> Result<Chess, String> {
    let setup = fen.parse::<Fen>().map_err(|e| e.to_string())?;
    setup
        .into_position::<Chess>(CastlingMode::Standard)
        .map_err(|e| e.to_string())
}

/// Serialize a position back to FEN.
pub fn fen_string(pos: &Chess) -> String {
    Fen::from_position(pos.clone(), EnPassantMode::Legal).to_string()
}

/// Choose and apply one move for `profile`'s side.
///
/// Draws once from `rng`; a roll below the profile's blunder chance plays
/// a uniformly random legal move instead of consulting the engine. A
/// position with a single legal move always goes to the engine, a random
/// pick among one option would be the same move anyway.
///
/// Engine failures propagate unchanged; there is no retry here.
pub async fn select_move<R: Rng>(
    pos: Chess,
    profile: &OpponentProfile,
    engine: &dyn MoveEngine,
    rng: &mut R,
) -> Result<MoveResult, PlayError> {
    let legal = pos.legal_moves();

    let roll: f64 = rng.random();
    let chosen = if roll < profile.blunder_chance && legal.len() > 1 {
        let pick = legal[rng.random_range(0..legal.len())].clone();
        info!(
            "{} blunders: {}",
            profile.name,
            pick.to_uci(CastlingMode::Standard)
        );
        pick
    } else {
        let fen = fen_string(&pos);
        let reply = engine.best_move(&fen, profile.depth).await?;
        let pick = resolve_engine_move(&pos, &reply)?;
        info!("{} plays the engine move: {reply}", profile.name);
        pick
    };

    Ok(apply(pos, chosen))
}

/// Apply a caller-proposed move if it is legal for `pos`.
pub fn apply_uci_move(pos: Chess, uci: &UciMove) -> Option<MoveResult> {
    let m = uci.to_move(&pos).ok()?;
    Some(apply(pos, m))
}

fn apply(mut pos: Chess, m: Move) -> MoveResult {
    let uci = m.to_uci(CastlingMode::Standard).to_string();
    pos.play_unchecked(&m);
    MoveResult {
        uci,
        fen: fen_string(&pos),
        is_checkmate: pos.is_checkmate(),
        is_stalemate: pos.is_stalemate(),
        is_check: pos.is_check(),
    }
}

fn resolve_engine_move(pos: &Chess, reply: &str) -> Result<Move, PlayError> {
    let parsed = reply
        .parse::<UciMove>()
        .map_err(|e| PlayError::BadEngineMove {
            uci: reply.to_string(),
            reason: e.to_string(),
        })?;
    parsed.to_move(pos).map_err(|e| PlayError::BadEngineMove {
        uci: reply.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use uci_engine::EngineResult;

    use super::*;
    use crate::opponents::Level;

    /// Black to move, Qd8h4 is mate (the fool's mate pattern).
    const MATE_IN_ONE: &str = "rnbqkbnr/pppp1ppp/8/4p3/6P1/5P2/PPPPP2P/RNBQKBNR b KQkq - 0 2";

    /// Black king in check with exactly one escape square.
    const ONLY_MOVE: &str = "7k/6p1/8/8/8/8/8/K6R b - - 0 1";

    /// Engine stand-in that always answers with a fixed move.
    struct ScriptedEngine {
        reply: &'static str,
        calls: AtomicUsize,
    }

    impl ScriptedEngine {
        fn new(reply: &'static str) -> Self {
            Self {
                reply,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl MoveEngine for ScriptedEngine {
        async fn best_move(&self, _fen: &str, _depth: u8) -> EngineResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.reply.to_string())
        }
    }

    /// Engine stand-in that is permanently down.
    struct DownEngine;

    #[async_trait]
    impl MoveEngine for DownEngine {
        async fn best_move(&self, _fen: &str, _depth: u8) -> EngineResult<String> {
            Err(EngineError::Unavailable)
        }
    }

    fn test_profile(blunder_chance: f64) -> OpponentProfile {
        OpponentProfile {
            name: "Tester",
            title: "Test Dummy",
            depth: 1,
            blunder_chance,
        }
    }

    #[tokio::test]
    async fn test_engine_move_is_applied_with_flags() {
        //! Grandmaster level plays the engine's mate and reports checkmate
        let pos = parse_fen(MATE_IN_ONE).expect("test position should parse");
        let engine = ScriptedEngine::new("d8h4");
        let mut rng = StdRng::seed_from_u64(1);

        let result = select_move(pos, Level::Grandmaster.profile(), &engine, &mut rng)
            .await
            .expect("selection should succeed");

        assert_eq!(result.uci, "d8h4");
        assert!(result.is_checkmate);
        assert!(result.is_check);
        assert!(!result.is_stalemate);
        assert_eq!(
            result.fen,
            "rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3"
        );
        assert_eq!(engine.calls(), 1);
    }

    #[tokio::test]
    async fn test_returned_fen_matches_reapplied_move() {
        //! Applying the returned move to the original position gives the
        //! returned FEN
        let pos = parse_fen(MATE_IN_ONE).expect("test position should parse");
        let engine = ScriptedEngine::new("g8f6");
        let mut rng = StdRng::seed_from_u64(1);

        let result = select_move(pos, Level::Grandmaster.profile(), &engine, &mut rng)
            .await
            .expect("selection should succeed");

        let original = parse_fen(MATE_IN_ONE).expect("test position should parse");
        let uci = result.uci.parse::<UciMove>().expect("uci should parse");
        let replayed = apply_uci_move(original, &uci).expect("move should be legal");
        assert_eq!(replayed.fen, result.fen);
    }

    #[tokio::test]
    async fn test_blunder_skips_the_engine() {
        //! A roll under the blunder chance plays a random legal move
        let pos = parse_fen(MATE_IN_ONE).expect("test position should parse");
        let engine = ScriptedEngine::new("d8h4");
        let mut rng = StdRng::seed_from_u64(7);

        // Chance 1.0 puts every roll under the threshold.
        let result = select_move(pos, &test_profile(1.0), &engine, &mut rng)
            .await
            .expect("selection should succeed");

        assert_eq!(engine.calls(), 0, "blunders must not consult the engine");

        // Whatever was rolled, it must be a real legal move.
        let uci = result.uci.parse::<UciMove>().expect("uci should parse");
        let original = parse_fen(MATE_IN_ONE).expect("test position should parse");
        let replayed = apply_uci_move(original, &uci).expect("blunder should be legal");
        assert_eq!(replayed.fen, result.fen);
    }

    #[tokio::test]
    async fn test_single_legal_move_never_blunders() {
        //! With one legal move the blunder branch is skipped even on a
        //! sub-threshold roll
        let pos = parse_fen(ONLY_MOVE).expect("test position should parse");
        assert_eq!(pos.legal_moves().len(), 1);

        let engine = ScriptedEngine::new("h8g8");
        let mut rng = StdRng::seed_from_u64(0);

        // Chance 1.0 means only the single-move check can skip the blunder.
        let result = select_move(pos, &test_profile(1.0), &engine, &mut rng)
            .await
            .expect("selection should succeed");

        assert_eq!(engine.calls(), 1, "the engine decides when there is no choice");
        assert_eq!(result.uci, "h8g8");
    }

    #[tokio::test]
    async fn test_blunder_rate_tracks_profile() {
        //! Beginner blunders in roughly 30% of 1000 trials
        let profile = Level::Beginner.profile();
        let engine = ScriptedEngine::new("d8h4");
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..1000 {
            let pos = parse_fen(MATE_IN_ONE).expect("test position should parse");
            select_move(pos, profile, &engine, &mut rng)
                .await
                .expect("selection should succeed");
        }

        let blunders = 1000 - engine.calls();
        assert!(
            (240..=360).contains(&blunders),
            "expected ~300 blunders out of 1000, got {blunders}"
        );
    }

    #[tokio::test]
    async fn test_engine_errors_propagate_unchanged() {
        //! No retries, no remapping, the caller sees the engine error
        let pos = parse_fen(MATE_IN_ONE).expect("test position should parse");
        let mut rng = StdRng::seed_from_u64(1);

        let result = select_move(pos, Level::Grandmaster.profile(), &DownEngine, &mut rng).await;
        assert!(matches!(
            result,
            Err(PlayError::Engine(EngineError::Unavailable))
        ));
    }

    #[tokio::test]
    async fn test_unusable_engine_reply_is_an_error() {
        //! Garbage and illegal engine replies are reported, not played
        let mut rng = StdRng::seed_from_u64(1);

        let pos = parse_fen(MATE_IN_ONE).expect("test position should parse");
        let garbage = ScriptedEngine::new("zz99");
        let result = select_move(pos, Level::Grandmaster.profile(), &garbage, &mut rng).await;
        assert!(matches!(result, Err(PlayError::BadEngineMove { .. })));

        let pos = parse_fen(MATE_IN_ONE).expect("test position should parse");
        let illegal = ScriptedEngine::new("e1e2");
        let result = select_move(pos, Level::Grandmaster.profile(), &illegal, &mut rng).await;
        assert!(matches!(result, Err(PlayError::BadEngineMove { .. })));
    }

    #[test]
    fn test_parse_fen_rejects_garbage() {
        assert!(parse_fen("definitely not a fen").is_err());
        assert!(parse_fen("").is_err());

        let start = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
        let pos = parse_fen(start).expect("the start position should parse");
        assert_eq!(pos.turn(), Color::White);
        assert_eq!(fen_string(&pos), start);
    }

    #[test]
    fn test_apply_uci_move_rejects_illegal_moves() {
        let start = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
        let pos = parse_fen(start).expect("the start position should parse");

        let illegal = "e2e5".parse::<UciMove>().expect("uci should parse");
        assert!(apply_uci_move(pos.clone(), &illegal).is_none());

        let legal = "e2e4".parse::<UciMove>().expect("uci should parse");
        let result = apply_uci_move(pos, &legal).expect("e2e4 should be legal");
        assert_eq!(
            result.fen,
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1"
        );
        assert!(!result.is_check);
    }
}
