use crate::logic::board::{Board, Color, ParseSquareError, Square};
use crate::logic::game::GameState;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod config;
pub mod eval;
pub mod search;


/// Score returned at the root when the side to move has no legal move.
pub const NO_MOVE_SCORE: i32 = i32::MIN;
/// Magnitude of a mate score; mates found deeper score closer to zero.
pub const MATE_SCORE: i32 = 100_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Move {
    pub from: Square,
    pub to: Square,
}

impl Move {
    pub const fn new(from: Square, to: Square) -> Self {
        Self { from, to }
    }

    #[must_use]
    pub const fn reversed(self) -> Self {
        Self {
            from: self.to,
            to: self.from,
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)
    }
}

/// Parses coordinate notation: `e2e4`, `e2-e4` or `e2 e4`.
impl FromStr for Move {
    type Err = ParseSquareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let compact: String = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-')
            .collect();
        match (compact.get(..2), compact.get(2..)) {
            (Some(from), Some(to)) => Ok(Self::new(from.parse()?, to.parse()?)),
            _ => Err(ParseSquareError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchOutcome {
    /// A move was chosen.
    Found,
    /// Depth 0: the score is a static evaluation.
    Static,
    Checkmate,
    Stalemate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchReport {
    pub score: i32,
    /// Root move first, one move per ply.
    pub principal_variation: Vec<Move>,
    pub nodes: u64,
    pub elapsed_ms: u64,
    pub depth: u8,
    pub outcome: SearchOutcome,
}

impl SearchReport {
    pub fn best_move(&self) -> Option<Move> {
        self.principal_variation.first().copied()
    }

    /// Space-separated principal variation.
    pub fn pv_string(&self) -> String {
        self.principal_variation
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Formats a milli-pawn score as pawns with three decimals.
pub fn format_score(score: i32) -> String {
    if score == NO_MOVE_SCORE {
        return "none".to_string();
    }
    let sign = if score < 0 { "-" } else { "" };
    let abs = score.unsigned_abs();
    format!("{sign}{}.{:03}", abs / 1000, abs % 1000)
}

pub trait Evaluator {
    /// Score of `board` from White's point of view. `ply` decides which
    /// en-passant captures are live.
    fn evaluate(&mut self, board: &Board, ply: u32) -> i32;
}

pub trait Searcher {
    fn best_move(&mut self, game: &GameState, side: Color, depth: u8) -> SearchReport;
}
