use crate::engine::Move;
use crate::logic::board::{Board, Color, Piece, PieceFlags, PieceKind, Square};
use crate::logic::generator::MoveGenerator;
use crate::logic::notation::{log_entry, MoveLog};
use crate::logic::repetition;
use crate::logic::rules::{is_in_check, is_valid_move, MoveError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SpecialMove {
    #[default]
    None,
    EnPassant,
    Castle,
    Promotion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameStatus {
    Playing,
    Check(Color),
    Checkmate(Color), // Winner
    Stalemate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("no piece on {0}")]
    EmptySource(Square),
    #[error("{color} would have {count} kings")]
    KingCount { color: Color, count: usize },
    #[error("{0} is in check but it is not their move")]
    WaitingSideInCheck(Color),
}

/// Everything needed to take one ply back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndoRecord {
    pub from: Square,
    pub to: Square,
    pub moved: Piece,
    pub captured: Piece,
    pub special: SpecialMove,
}

impl UndoRecord {
    pub const fn as_move(&self) -> Move {
        Move::new(self.from, self.to)
    }

    /// The piece that left the board, including an en-passant victim.
    pub fn removed_piece(&self) -> Option<Piece> {
        if !self.captured.is_empty() {
            Some(self.captured)
        } else if self.special == SpecialMove::EnPassant {
            Some(Piece::new(PieceKind::Pawn, self.moved.color.opposite()))
        } else {
            None
        }
    }
}

/// Captured pieces, indexed by the colour of the captured piece.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Graveyard {
    lists: [Vec<Piece>; 2],
}

impl Graveyard {
    pub fn push(&mut self, piece: Piece) {
        self.lists[piece.color.index()].push(piece);
    }

    pub fn pop(&mut self, color: Color) -> Option<Piece> {
        self.lists[color.index()].pop()
    }

    pub fn captured(&self, color: Color) -> &[Piece] {
        &self.lists[color.index()]
    }

    pub fn clear(&mut self) {
        self.lists = [Vec::new(), Vec::new()];
    }

    pub fn from_lists(white: Vec<Piece>, black: Vec<Piece>) -> Self {
        Self {
            lists: [white, black],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    pub board: Board,
    /// Plies played; White moves on even plies.
    pub ply: u32,
    pub history: Vec<UndoRecord>,
    pub graveyard: Graveyard,
    pub log: MoveLog,
    forbidden: Option<Move>,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

impl GameState {
    #[must_use]
    pub fn new() -> Self {
        Self::from_board(Board::new(), Color::White)
    }

    /// Starts a fresh game from an arbitrary position.
    #[must_use]
    pub fn from_board(board: Board, turn: Color) -> Self {
        Self::from_parts(board, turn.index() as u32, Graveyard::default(), MoveLog::new())
    }

    /// Used by the save loader. History and the repetition guard start empty.
    pub(crate) fn from_parts(board: Board, ply: u32, graveyard: Graveyard, log: MoveLog) -> Self {
        Self {
            board,
            ply,
            history: Vec::new(),
            graveyard,
            log,
            forbidden: None,
        }
    }

    pub fn restart(&mut self) {
        *self = Self::new();
    }

    pub const fn turn(&self) -> Color {
        if self.ply % 2 == 0 {
            Color::White
        } else {
            Color::Black
        }
    }

    /// Move the next root search must avoid, if the last four plies oscillate.
    pub const fn forbidden_move(&self) -> Option<Move> {
        self.forbidden
    }

    pub fn last_move(&self) -> Option<Move> {
        self.history.last().map(UndoRecord::as_move)
    }

    /// Legal destinations for the piece on `from`, whichever side owns it.
    pub fn legal_moves(&self, from: Square) -> Vec<Square> {
        MoveGenerator::new().legal_destinations(&self.board, from, self.ply)
    }

    pub fn all_legal_moves(&self) -> Vec<Move> {
        MoveGenerator::new().generate_moves(&self.board, self.turn(), self.ply)
    }

    pub fn is_legal(&self, mv: Move) -> bool {
        is_valid_move(&self.board, mv, self.turn(), self.ply).is_ok()
    }

    /// Plays a legal move for the side to move. On error nothing changes.
    pub fn execute(&mut self, mv: Move) -> Result<SpecialMove, MoveError> {
        if let Err(e) = is_valid_move(&self.board, mv, self.turn(), self.ply) {
            log::debug!("rejected {mv}: {e}");
            return Err(e);
        }

        let record = self.board.apply_move(mv, self.ply);
        if let Some(dead) = record.removed_piece() {
            self.graveyard.push(dead);
        }
        self.log.push(log_entry(&record));
        self.history.push(record);
        self.ply += 1;
        self.forbidden = repetition::forbidden_move(&self.history);

        Ok(record.special)
    }

    /// Takes back the last ply. Returns false when there is nothing to undo.
    pub fn undo_move(&mut self) -> bool {
        let Some(record) = self.history.pop() else {
            return false;
        };
        self.ply -= 1;
        self.board.undo_move(&record, self.ply);
        if let Some(dead) = record.removed_piece() {
            self.graveyard.pop(dead.color);
        }
        self.log.pop();
        self.forbidden = repetition::forbidden_move(&self.history);
        true
    }

    /// Puts `piece` on `sq` as an unmoved piece, or clears the square for `None`.
    pub fn place(&mut self, sq: Square, piece: Option<Piece>) -> Result<(), EditError> {
        let mut board = self.board.clone();
        let placed = piece.map_or(Piece::EMPTY, |p| Piece::new(p.kind, p.color));
        board.set(sq, placed);
        self.install_edit(board)
    }

    /// Moves whatever stands on `from` to `to` without any rule checks,
    /// replacing the piece there.
    pub fn relocate(&mut self, from: Square, to: Square) -> Result<(), EditError> {
        let mut board = self.board.clone();
        let mut piece = board.take(from);
        if piece.is_empty() {
            return Err(EditError::EmptySource(from));
        }
        piece.flags.remove(PieceFlags::IN_CHECK);
        board.set(to, piece);
        self.install_edit(board)
    }

    /// Accepts an edited board when each side keeps one king and the side
    /// that just moved is not left in check. The undo history and the
    /// repetition guard start over; the ply, log and graveyard stay.
    fn install_edit(&mut self, board: Board) -> Result<(), EditError> {
        if let Some((color, count)) = board.king_count_fault() {
            return Err(EditError::KingCount { color, count });
        }
        let waiting = self.turn().opposite();
        if is_in_check(&board, waiting) {
            return Err(EditError::WaitingSideInCheck(waiting));
        }
        self.board = board;
        self.history.clear();
        self.forbidden = None;
        Ok(())
    }

    pub fn in_check(&self, color: Color) -> bool {
        is_in_check(&self.board, color)
    }

    /// Refreshes the display check marker for `color`'s king. Returns whether
    /// that side is in check.
    pub fn mark_check(&mut self, color: Color) -> bool {
        let checked = self.in_check(color);
        for sq in Square::all() {
            let mut piece = self.board.get(sq);
            if !piece.is_friend_of(color) {
                continue;
            }
            let flag = checked && piece.kind == PieceKind::King;
            if flag != piece.flags.contains(PieceFlags::IN_CHECK) {
                if flag {
                    piece.flags.insert(PieceFlags::IN_CHECK);
                } else {
                    piece.flags.remove(PieceFlags::IN_CHECK);
                }
                self.board.set(sq, piece);
            }
        }
        checked
    }

    pub fn status(&self) -> GameStatus {
        let turn = self.turn();
        let checked = self.in_check(turn);
        let has_moves = MoveGenerator::new().has_legal_moves(&self.board, turn, self.ply);
        match (has_moves, checked) {
            (true, false) => GameStatus::Playing,
            (true, true) => GameStatus::Check(turn),
            (false, true) => GameStatus::Checkmate(turn.opposite()),
            (false, false) => GameStatus::Stalemate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mv(s: &str) -> Move {
        s.parse().unwrap()
    }

    fn sq(s: &str) -> Square {
        s.parse().unwrap()
    }

    #[test]
    fn test_turn_follows_ply() {
        let mut game = GameState::new();
        assert_eq!(game.turn(), Color::White);
        game.execute(mv("e2e4")).unwrap();
        assert_eq!(game.turn(), Color::Black);
        assert_eq!(game.ply, 1);
        assert_eq!(game.last_move(), Some(mv("e2e4")));
    }

    #[test]
    fn test_illegal_move_leaves_state_unchanged() {
        let mut game = GameState::new();
        let before = game.clone();
        assert!(game.execute(mv("e2e5")).is_err());
        assert!(game.execute(mv("e7e5")).is_err());
        assert_eq!(game, before);
    }

    #[test]
    fn test_undo_empty_history() {
        let mut game = GameState::new();
        assert!(!game.undo_move());
    }

    #[test]
    fn test_capture_fills_graveyard_and_undo_empties_it() {
        let mut game = GameState::new();
        for m in ["e2e4", "d7d5", "e4d5"] {
            game.execute(mv(m)).unwrap();
        }
        assert_eq!(game.graveyard.captured(Color::Black).len(), 1);
        assert_eq!(game.log.entries().last().map(String::as_str), Some("e4xd5"));

        assert!(game.undo_move());
        assert!(game.graveyard.captured(Color::Black).is_empty());
        assert_eq!(game.log.len(), 2);
    }

    #[test]
    fn test_edit_clears_history_and_guard() {
        let mut game = GameState::new();
        for m in ["g1f3", "g8f6", "f3g1", "f6g8"] {
            game.execute(mv(m)).unwrap();
        }
        assert!(game.forbidden_move().is_some());

        game.relocate(sq("d1"), sq("d4")).unwrap();
        assert_eq!(game.board.get(sq("d4")).kind, PieceKind::Queen);
        assert!(game.board.get(sq("d1")).is_empty());
        assert!(game.history.is_empty());
        assert_eq!(game.forbidden_move(), None);
        assert_eq!(game.ply, 4);
        assert_eq!(game.log.len(), 4);
        assert!(!game.undo_move());

        game.place(sq("e4"), Some(Piece::new(PieceKind::Knight, Color::Black)))
            .unwrap();
        assert!(game.board.get(sq("e4")).is(PieceKind::Knight, Color::Black));
        game.place(sq("e4"), None).unwrap();
        assert!(game.board.get(sq("e4")).is_empty());
    }

    #[test]
    fn test_edit_refuses_broken_positions() {
        let mut game = GameState::new();
        let before = game.clone();

        assert_eq!(
            game.place(sq("e1"), None),
            Err(EditError::KingCount {
                color: Color::White,
                count: 0
            })
        );
        assert_eq!(
            game.place(sq("e4"), Some(Piece::new(PieceKind::King, Color::Black))),
            Err(EditError::KingCount {
                color: Color::Black,
                count: 2
            })
        );
        assert_eq!(game.relocate(sq("e4"), sq("e5")), Err(EditError::EmptySource(sq("e4"))));
        // White to move: Black's king must not be left attacked
        assert_eq!(
            game.place(sq("e7"), Some(Piece::new(PieceKind::Queen, Color::White))),
            Err(EditError::WaitingSideInCheck(Color::Black))
        );
        assert_eq!(game, before);
    }

    #[test]
    fn test_fools_mate_status() {
        let mut game = GameState::new();
        for m in ["f2f3", "e7e5", "g2g4"] {
            game.execute(mv(m)).unwrap();
        }
        assert_eq!(game.status(), GameStatus::Playing);
        game.execute(mv("d8h4")).unwrap();
        assert_eq!(game.status(), GameStatus::Checkmate(Color::Black));
        assert!(game.mark_check(Color::White));
        let king = game.board.get("e1".parse().unwrap());
        assert!(king.flags.contains(PieceFlags::IN_CHECK));
    }

    #[test]
    fn test_check_status_and_marker_cleared_by_move() {
        let mut game = GameState::new();
        for m in ["e2e4", "f7f6", "d1h5"] {
            game.execute(mv(m)).unwrap();
        }
        assert_eq!(game.status(), GameStatus::Check(Color::Black));
        assert!(game.mark_check(Color::Black));
        game.execute(mv("g7g6")).unwrap();
        assert!(!game.mark_check(Color::Black));
        let king = game.board.get("e8".parse().unwrap());
        assert!(!king.flags.contains(PieceFlags::IN_CHECK));
    }
}
