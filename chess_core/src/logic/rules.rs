use crate::engine::Move;
use crate::logic::board::{Board, Color, PieceKind, Square};
use crate::logic::generator::MoveGenerator;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MoveError {
    #[error("no piece on {0}")]
    NoPieceAtSource(Square),
    #[error("it is {0}'s turn")]
    NotYourTurn(Color),
    #[error("source and destination are both {0}")]
    SameSquare(Square),
    #[error("{0} is not a legal move")]
    IllegalMove(Move),
}

pub const KNIGHT_OFFSETS: [(i8, i8); 8] = [
    (1, 2),
    (2, 1),
    (2, -1),
    (1, -2),
    (-1, -2),
    (-2, -1),
    (-2, 1),
    (-1, 2),
];

pub const KING_OFFSETS: [(i8, i8); 8] = [
    (0, 1),
    (1, 1),
    (1, 0),
    (1, -1),
    (0, -1),
    (-1, -1),
    (-1, 0),
    (-1, 1),
];

pub const ORTHOGONAL: [(i8, i8); 4] = [(0, 1), (1, 0), (0, -1), (-1, 0)];
pub const DIAGONAL: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, -1), (-1, 1)];

/// First occupied square along a ray, if any.
fn first_blocker(board: &Board, from: Square, (df, dr): (i8, i8)) -> Option<Square> {
    let mut cur = from.offset(df, dr);
    while let Some(sq) = cur {
        if !board.get(sq).is_empty() {
            return Some(sq);
        }
        cur = sq.offset(df, dr);
    }
    None
}

/// True if any piece of `by` attacks `target`. Whatever stands on `target`
/// does not matter, so this also answers "is this piece defended".
pub fn is_square_attacked(board: &Board, target: Square, by: Color) -> bool {
    // A pawn of `by` attacks diagonally forward, so look one rank back.
    let back = -by.forward();
    for df in [-1, 1] {
        if let Some(sq) = target.offset(df, back) {
            if board.get(sq).is(PieceKind::Pawn, by) {
                return true;
            }
        }
    }

    let hits = |offsets: &[(i8, i8)], kind: PieceKind| {
        offsets.iter().any(|&(df, dr)| {
            target
                .offset(df, dr)
                .is_some_and(|sq| board.get(sq).is(kind, by))
        })
    };
    if hits(&KNIGHT_OFFSETS, PieceKind::Knight) || hits(&KING_OFFSETS, PieceKind::King) {
        return true;
    }

    let sliders = |dirs: &[(i8, i8)], kind: PieceKind| {
        dirs.iter().any(|&dir| {
            first_blocker(board, target, dir).is_some_and(|sq| {
                let p = board.get(sq);
                p.color == by && (p.kind == kind || p.kind == PieceKind::Queen)
            })
        })
    };
    sliders(&ORTHOGONAL, PieceKind::Rook) || sliders(&DIAGONAL, PieceKind::Bishop)
}

/// Checks if `color` is currently in check. A side without a king is never in check.
pub fn is_in_check(board: &Board, color: Color) -> bool {
    board
        .king_square(color)
        .is_some_and(|king| is_square_attacked(board, king, color.opposite()))
}

/// Validates a move for the side to move, including self-check prevention.
pub fn is_valid_move(board: &Board, mv: Move, turn: Color, ply: u32) -> Result<(), MoveError> {
    let piece = board.get(mv.from);
    if piece.is_empty() {
        return Err(MoveError::NoPieceAtSource(mv.from));
    }
    if piece.color != turn {
        return Err(MoveError::NotYourTurn(turn));
    }
    if mv.from == mv.to {
        return Err(MoveError::SameSquare(mv.from));
    }
    if MoveGenerator::new()
        .legal_destinations(board, mv.from, ply)
        .contains(&mv.to)
    {
        Ok(())
    } else {
        Err(MoveError::IllegalMove(mv))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(s: &str) -> Square {
        s.parse().unwrap()
    }

    #[test]
    fn test_initial_position_no_check() {
        let board = Board::new();
        assert!(!is_in_check(&board, Color::White));
        assert!(!is_in_check(&board, Color::Black));
    }

    #[test]
    fn test_rook_check_blocked_and_open() {
        let mut board = Board::empty();
        board.add_piece(sq("e1"), PieceKind::King, Color::White);
        board.add_piece(sq("e8"), PieceKind::Rook, Color::Black);
        assert!(is_in_check(&board, Color::White));

        board.add_piece(sq("e4"), PieceKind::Knight, Color::White);
        assert!(!is_in_check(&board, Color::White));
    }

    #[test]
    fn test_pawn_attacks_forward_only() {
        let mut board = Board::empty();
        board.add_piece(sq("d5"), PieceKind::Pawn, Color::Black);
        assert!(is_square_attacked(&board, sq("e4"), Color::Black));
        assert!(is_square_attacked(&board, sq("c4"), Color::Black));
        assert!(!is_square_attacked(&board, sq("e6"), Color::Black));
        assert!(!is_square_attacked(&board, sq("d4"), Color::Black));
    }

    #[test]
    fn test_kingless_board_is_not_check() {
        let mut board = Board::empty();
        board.add_piece(sq("a1"), PieceKind::Queen, Color::Black);
        assert!(!is_in_check(&board, Color::White));
    }

    #[test]
    fn test_valid_move_errors() {
        let board = Board::new();
        let e = is_valid_move(&board, Move::new(sq("e4"), sq("e5")), Color::White, 0);
        assert_eq!(e, Err(MoveError::NoPieceAtSource(sq("e4"))));

        let e = is_valid_move(&board, Move::new(sq("e7"), sq("e5")), Color::White, 0);
        assert_eq!(e, Err(MoveError::NotYourTurn(Color::White)));

        let e = is_valid_move(&board, Move::new(sq("e2"), sq("e2")), Color::White, 0);
        assert_eq!(e, Err(MoveError::SameSquare(sq("e2"))));

        let bad = Move::new(sq("e2"), sq("e5"));
        assert_eq!(
            is_valid_move(&board, bad, Color::White, 0),
            Err(MoveError::IllegalMove(bad))
        );
        assert!(is_valid_move(&board, Move::new(sq("g1"), sq("f3")), Color::White, 0).is_ok());
    }
}
