//! Opponent roster and difficulty settings
//!
//! Each difficulty level is a named persona with a fixed engine search
//! depth and a blunder probability. Low levels play shallow searches and
//! throw in random legal moves; the top levels never deviate from the
//! engine.
//!
//! | Level | Name   | Title         | Depth | Blunder chance |
//! |-------|--------|---------------|-------|----------------|
//! | 1     | Joe    | Beginner      | 1     | 30%            |
//! | 2     | Sarah  | Casual Player | 5     | 15%            |
//! | 3     | Marcus | Club Player   | 8     | 5%             |
//! | 4     | Elena  | Master        | 12    | 0%             |
//! | 5     | Magnus | Grandmaster   | 15    | 0%             |
//!
//! The table is static: levels are a closed enum, so every lookup is
//! checked at compile time, and the wire integer is validated once at the
//! edge with [`Level::from_int`].

use serde::Serialize;

/// Difficulty levels, one per opponent persona
///
/// Requests carry the numeric level; anything outside 1..=5 is rejected
/// before any board or engine work happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    /// Level 1 - shallow search, blunders almost a third of the time
    Beginner = 1,
    /// Level 2 - casual club strength with occasional blunders
    Casual = 2,
    /// Level 3 - solid play, rare blunders
    Club = 3,
    /// Level 4 - full engine strength at moderate depth
    Master = 4,
    /// Level 5 - full engine strength at the deepest configured search
    Grandmaster = 5,
}

/// A named opponent persona, as served by `GET /opponents`
#[derive(Debug, Clone, Serialize)]
pub struct OpponentProfile {
    pub name: &'static str,
    pub title: &'static str,
    /// Search depth in plies passed to the engine
    pub depth: u8,
    /// Probability in [0, 1) of playing a random legal move instead of
    /// asking the engine
    pub blunder_chance: f64,
}

static OPPONENTS: [OpponentProfile; 5] = [
    OpponentProfile {
        name: "Joe",
        title: "Beginner",
        depth: 1,
        blunder_chance: 0.3,
    },
    OpponentProfile {
        name: "Sarah",
        title: "Casual Player",
        depth: 5,
        blunder_chance: 0.15,
    },
    OpponentProfile {
        name: "Marcus",
        title: "Club Player",
        depth: 8,
        blunder_chance: 0.05,
    },
    OpponentProfile {
        name: "Elena",
        title: "Master",
        depth: 12,
        blunder_chance: 0.0,
    },
    OpponentProfile {
        name: "Magnus",
        title: "Grandmaster",
        depth: 15,
        blunder_chance: 0.0,
    },
];

impl Level {
    /// All levels in ascending strength order.
    pub const ALL: [Level; 5] = [
        Level::Beginner,
        Level::Casual,
        Level::Club,
        Level::Master,
        Level::Grandmaster,
    ];

    /// Resolve the wire integer to a level. Unknown levels get `None`.
    pub fn from_int(level: i64) -> Option<Level> {
        match level {
            1 => Some(Level::Beginner),
            2 => Some(Level::Casual),
            3 => Some(Level::Club),
            4 => Some(Level::Master),
            5 => Some(Level::Grandmaster),
            _ => None,
        }
    }

    /// The numeric form used on the wire.
    pub fn as_int(self) -> u8 {
        self as u8
    }

    /// The persona settings for this level.
    pub fn profile(self) -> &'static OpponentProfile {
        match self {
            Level::Beginner => &OPPONENTS[0],
            Level::Casual => &OPPONENTS[1],
            Level::Club => &OPPONENTS[2],
            Level::Master => &OPPONENTS[3],
            Level::Grandmaster => &OPPONENTS[4],
        }
    }
}
