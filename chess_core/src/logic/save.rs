//! Line-oriented text encoding of a game.
//!
//! ```text
//! Board\t<64 hex piece codes, each followed by ','>
//! PlayerWhite\t<1 when the human plays White, 0 for Black>   (optional)
//! Graveyard\t<captured White pieces>\t<captured Black pieces>
//! Logs\t<log entries separated by ','>
//! Moves\t<ply counter>
//! ```
//!
//! Squares are listed rank-major (a1, b1, .. h1, a2, ..). Piece codes are
//! described on `Piece::to_code`.

use crate::logic::board::{Board, Color, Piece, MAX_STAMP};
use crate::logic::game::{GameState, Graveyard};
use crate::logic::notation::MoveLog;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SaveError {
    #[error("save data has no Board line")]
    MissingBoard,
    #[error("expected 64 squares, found {0}")]
    SquareCount(usize),
    #[error("invalid hex value {0:?}")]
    BadHex(String),
    #[error("invalid piece code {0:#x}")]
    BadPiece(u32),
    #[error("{color} has {count} kings")]
    KingCount { color: Color, count: usize },
    #[error("invalid move counter {0:?}")]
    BadMoveCounter(String),
    #[error("pawn advanced at ply {stamp}, after the saved ply {ply}")]
    StampAfterPly { stamp: u32, ply: u32 },
    #[error("invalid PlayerWhite value {0:?}")]
    BadPlayer(String),
}

/// A decoded save: the game plus the side the human played, when recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedGame {
    pub game: GameState,
    pub player: Option<Color>,
}

fn write_codes<'a>(out: &mut String, pieces: impl IntoIterator<Item = &'a Piece>) {
    for piece in pieces {
        out.push_str(&format!("{:x},", piece.to_code()));
    }
}

fn parse_codes(field: &str) -> Result<Vec<Piece>, SaveError> {
    field
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|hex| {
            let code =
                u32::from_str_radix(hex, 16).map_err(|_| SaveError::BadHex(hex.to_string()))?;
            Piece::from_code(code).ok_or(SaveError::BadPiece(code))
        })
        .collect()
}

/// Encodes the board, the human's side if given, graveyard, log and ply counter.
pub fn encode(game: &GameState, player: Option<Color>) -> String {
    let mut out = String::from("Board\t");
    write_codes(&mut out, game.board.squares());

    if let Some(player) = player {
        let white = u8::from(player == Color::White);
        out.push_str(&format!("\nPlayerWhite\t{white}"));
    }

    out.push_str("\nGraveyard\t");
    write_codes(&mut out, game.graveyard.captured(Color::White));
    out.push('\t');
    write_codes(&mut out, game.graveyard.captured(Color::Black));

    out.push_str("\nLogs\t");
    out.push_str(&game.log.entries().join(","));

    out.push_str(&format!("\nMoves\t{}\n", game.ply));
    out
}

/// Decodes save text into a fresh game with empty undo history.
///
/// The ply counter is capped at `MAX_STAMP` so every later pawn stamp still
/// fits a piece code, and no pawn may carry a stamp past the saved ply.
pub fn decode(text: &str) -> Result<SavedGame, SaveError> {
    let mut board = None;
    let mut player = None;
    let mut graveyard = Graveyard::default();
    let mut log = MoveLog::new();
    let mut ply = 0;

    for line in text.lines() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }
        let (tag, rest) = line.split_once('\t').unwrap_or((line, ""));
        match tag {
            "Board" => board = Some(parse_board(rest)?),
            "Graveyard" => {
                let (white, black) = rest.split_once('\t').unwrap_or((rest, ""));
                graveyard = Graveyard::from_lists(parse_codes(white)?, parse_codes(black)?);
            }
            "Logs" => {
                log = MoveLog::from_entries(
                    rest.split(',')
                        .filter(|e| !e.trim().is_empty())
                        .map(str::to_string)
                        .collect(),
                );
            }
            "Moves" => {
                let value = rest.trim();
                ply = value
                    .parse()
                    .ok()
                    .filter(|&n| n <= MAX_STAMP)
                    .ok_or_else(|| SaveError::BadMoveCounter(value.to_string()))?;
            }
            "PlayerWhite" => {
                player = Some(match rest.trim() {
                    "1" => Color::White,
                    "0" => Color::Black,
                    other => return Err(SaveError::BadPlayer(other.to_string())),
                });
            }
            other => log::warn!("skipping unknown save line {other:?}"),
        }
    }

    let board: Board = board.ok_or(SaveError::MissingBoard)?;
    let stamps = board
        .squares()
        .iter()
        .chain(graveyard.captured(Color::White))
        .chain(graveyard.captured(Color::Black))
        .filter_map(|piece| piece.advanced_at);
    if let Some(stamp) = stamps.max().filter(|&stamp| stamp > ply) {
        return Err(SaveError::StampAfterPly { stamp, ply });
    }
    Ok(SavedGame {
        game: GameState::from_parts(board, ply, graveyard, log),
        player,
    })
}

fn parse_board(field: &str) -> Result<Board, SaveError> {
    let pieces = parse_codes(field)?;
    let squares: [Piece; 64] = pieces
        .try_into()
        .map_err(|v: Vec<Piece>| SaveError::SquareCount(v.len()))?;
    let board = Board::from_squares(squares);
    match board.king_count_fault() {
        Some((color, count)) => Err(SaveError::KingCount { color, count }),
        None => Ok(board),
    }
}
