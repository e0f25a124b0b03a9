use crate::engine::Move;
use crate::logic::board::{Board, Color, Piece, PieceKind, Square};
use crate::logic::rules::{
    is_in_check, is_square_attacked, DIAGONAL, KING_OFFSETS, KNIGHT_OFFSETS, ORTHOGONAL,
};

/// Chess move generation. Every public entry point returns fully legal moves:
/// moves that would leave the mover's own king attacked are filtered out.
pub struct MoveGenerator;

impl MoveGenerator {
    pub const fn new() -> Self {
        Self
    }

    /// All legal moves for `turn`, pieces visited file-major then rank.
    pub fn generate_moves(&self, board: &Board, turn: Color, ply: u32) -> Vec<Move> {
        let mut moves = Vec::with_capacity(48);
        for (from, _) in board.pieces(turn) {
            moves.extend(
                self.legal_destinations(board, from, ply)
                    .into_iter()
                    .map(|to| Move::new(from, to)),
            );
        }
        moves
    }

    /// Checks if `turn` has at least one legal move, stopping at the first one found.
    pub fn has_legal_moves(&self, board: &Board, turn: Color, ply: u32) -> bool {
        board
            .pieces(turn)
            .any(|(from, _)| !self.legal_destinations(board, from, ply).is_empty())
    }

    pub fn count_legal_moves(&self, board: &Board, turn: Color, ply: u32) -> usize {
        board
            .pieces(turn)
            .map(|(from, _)| self.legal_destinations(board, from, ply).len())
            .sum()
    }

    /// Legal destinations of the piece on `from`; empty for an empty square.
    pub fn legal_destinations(&self, board: &Board, from: Square, ply: u32) -> Vec<Square> {
        let piece = board.get(from);
        if piece.is_empty() {
            return Vec::new();
        }
        let mut scratch = board.clone();
        let mut out = self.pseudo_destinations(board, from, ply);
        out.retain(|&to| {
            let record = scratch.apply_move(Move::new(from, to), ply);
            let safe = !is_in_check(&scratch, piece.color);
            scratch.undo_move(&record, ply);
            safe
        });
        out
    }

    /// Destinations that obey piece movement but may expose the own king.
    pub fn pseudo_destinations(&self, board: &Board, from: Square, ply: u32) -> Vec<Square> {
        let piece = board.get(from);
        let mut out = Vec::with_capacity(16);
        match piece.kind {
            PieceKind::Empty => {}
            PieceKind::King => {
                self.generate_step_moves(board, from, piece, &KING_OFFSETS, &mut out);
                self.generate_castling(board, from, piece, &mut out);
            }
            PieceKind::Queen => {
                self.generate_slider_moves(board, from, piece, &ORTHOGONAL, &mut out);
                self.generate_slider_moves(board, from, piece, &DIAGONAL, &mut out);
            }
            PieceKind::Rook => self.generate_slider_moves(board, from, piece, &ORTHOGONAL, &mut out),
            PieceKind::Bishop => self.generate_slider_moves(board, from, piece, &DIAGONAL, &mut out),
            PieceKind::Knight => {
                self.generate_step_moves(board, from, piece, &KNIGHT_OFFSETS, &mut out);
            }
            PieceKind::Pawn => self.generate_pawn_moves(board, from, piece, ply, &mut out),
        }
        out
    }

    fn generate_step_moves(
        &self,
        board: &Board,
        from: Square,
        piece: Piece,
        offsets: &[(i8, i8)],
        out: &mut Vec<Square>,
    ) {
        for &(df, dr) in offsets {
            if let Some(to) = from.offset(df, dr) {
                if !board.get(to).is_friend_of(piece.color) {
                    out.push(to);
                }
            }
        }
    }

    fn generate_slider_moves(
        &self,
        board: &Board,
        from: Square,
        piece: Piece,
        dirs: &[(i8, i8)],
        out: &mut Vec<Square>,
    ) {
        for &(df, dr) in dirs {
            let mut cur = from.offset(df, dr);
            while let Some(to) = cur {
                let target = board.get(to);
                if target.is_empty() {
                    out.push(to);
                } else {
                    if target.is_enemy_of(piece.color) {
                        out.push(to);
                    }
                    break;
                }
                cur = to.offset(df, dr);
            }
        }
    }

    fn generate_pawn_moves(
        &self,
        board: &Board,
        from: Square,
        piece: Piece,
        ply: u32,
        out: &mut Vec<Square>,
    ) {
        let fwd = piece.color.forward();

        if let Some(one) = from.offset(0, fwd) {
            if board.get(one).is_empty() {
                out.push(one);
                if from.rank() == piece.color.pawn_rank() {
                    if let Some(two) = one.offset(0, fwd) {
                        if board.get(two).is_empty() {
                            out.push(two);
                        }
                    }
                }
            }
        }

        for df in [-1, 1] {
            let Some(to) = from.offset(df, fwd) else {
                continue;
            };
            let target = board.get(to);
            if target.is_enemy_of(piece.color) {
                out.push(to);
            } else if target.is_empty() {
                let beside = from.offset(df, 0).map(|sq| board.get(sq));
                if beside.is_some_and(|p| {
                    p.is_enemy_of(piece.color) && p.can_be_taken_en_passant(ply)
                }) {
                    out.push(to);
                }
            }
        }
    }

    /// Castling needs an unmoved king on its home e-file square, an unmoved
    /// rook of the same colour in the corner, empty squares between them and
    /// a king that neither starts on, passes through nor lands on an
    /// attacked square.
    fn generate_castling(&self, board: &Board, from: Square, king: Piece, out: &mut Vec<Square>) {
        let color = king.color;
        if king.has_moved() || from.rank() != color.home_rank() || from.file() != 4 {
            return;
        }
        let enemy = color.opposite();
        if is_square_attacked(board, from, enemy) {
            return;
        }

        // (rook file, files that must be empty, king step direction)
        let sides: [(u8, &[u8], i8); 2] = [(7, &[5, 6], 1), (0, &[1, 2, 3], -1)];
        for (rook_file, between, dir) in sides {
            let rook_ok = Square::new(rook_file, from.rank()).is_some_and(|sq| {
                let rook = board.get(sq);
                rook.is(PieceKind::Rook, color) && !rook.has_moved()
            });
            if !rook_ok {
                continue;
            }
            let clear = between.iter().all(|&file| {
                Square::new(file, from.rank()).is_some_and(|sq| board.get(sq).is_empty())
            });
            if !clear {
                continue;
            }
            let (Some(transit), Some(dest)) = (from.offset(dir, 0), from.offset(2 * dir, 0))
            else {
                continue;
            };
            if !is_square_attacked(board, transit, enemy) && !is_square_attacked(board, dest, enemy)
            {
                out.push(dest);
            }
        }
    }
}

impl Default for MoveGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::board::PieceFlags;

    fn sq(s: &str) -> Square {
        s.parse().unwrap()
    }

    fn castling_board() -> Board {
        let mut board = Board::empty();
        board.add_piece(sq("e1"), PieceKind::King, Color::White);
        board.add_piece(sq("h1"), PieceKind::Rook, Color::White);
        board.add_piece(sq("a1"), PieceKind::Rook, Color::White);
        board.add_piece(sq("e8"), PieceKind::King, Color::Black);
        board
    }

    #[test]
    fn test_initial_moves() {
        let board = Board::new();
        let generator = MoveGenerator::new();
        let moves = generator.generate_moves(&board, Color::White, 0);
        assert_eq!(moves.len(), 20);
        assert_eq!(generator.generate_moves(&board, Color::Black, 1).len(), 20);
    }

    #[test]
    fn test_has_legal_moves() {
        let board = Board::new();
        let generator = MoveGenerator::new();
        assert!(generator.has_legal_moves(&board, Color::White, 0));
    }

    #[test]
    fn test_stalemate_check() {
        let mut board = Board::empty();
        board.add_piece(sq("a8"), PieceKind::King, Color::Black);
        board.add_piece(sq("b6"), PieceKind::Queen, Color::White);
        board.add_piece(sq("h1"), PieceKind::King, Color::White);
        let generator = MoveGenerator::new();
        assert!(!generator.has_legal_moves(&board, Color::Black, 1));
        assert!(!is_in_check(&board, Color::Black));
    }

    #[test]
    fn test_castling_both_sides() {
        let board = castling_board();
        let dests = MoveGenerator::new().legal_destinations(&board, sq("e1"), 0);
        assert!(dests.contains(&sq("g1")));
        assert!(dests.contains(&sq("c1")));
    }

    #[test]
    fn test_no_castling_through_attacked_square() {
        let mut board = castling_board();
        board.add_piece(sq("f8"), PieceKind::Rook, Color::Black);
        let dests = MoveGenerator::new().legal_destinations(&board, sq("e1"), 0);
        assert!(!dests.contains(&sq("g1")));
        assert!(dests.contains(&sq("c1")));
    }

    #[test]
    fn test_no_castling_after_rook_moved() {
        let mut board = castling_board();
        let mut rook = board.get(sq("h1"));
        rook.flags.insert(PieceFlags::MOVED);
        board.set(sq("h1"), rook);
        let dests = MoveGenerator::new().legal_destinations(&board, sq("e1"), 0);
        assert!(!dests.contains(&sq("g1")));
    }

    #[test]
    fn test_no_castling_out_of_check() {
        let mut board = castling_board();
        board.add_piece(sq("e5"), PieceKind::Rook, Color::Black);
        let dests = MoveGenerator::new().legal_destinations(&board, sq("e1"), 0);
        assert!(!dests.contains(&sq("g1")));
        assert!(!dests.contains(&sq("c1")));
    }

    #[test]
    fn test_pinned_piece_cannot_move() {
        let mut board = Board::empty();
        board.add_piece(sq("e1"), PieceKind::King, Color::White);
        board.add_piece(sq("e2"), PieceKind::Knight, Color::White);
        board.add_piece(sq("e8"), PieceKind::Rook, Color::Black);
        board.add_piece(sq("a8"), PieceKind::King, Color::Black);
        let generator = MoveGenerator::new();
        assert!(generator.legal_destinations(&board, sq("e2"), 0).is_empty());
        assert!(!generator.pseudo_destinations(&board, sq("e2"), 0).is_empty());
    }

    #[test]
    fn test_en_passant_window() {
        let mut board = Board::empty();
        board.add_piece(sq("e1"), PieceKind::King, Color::White);
        board.add_piece(sq("e8"), PieceKind::King, Color::Black);
        board.add_piece(sq("e5"), PieceKind::Pawn, Color::White);
        board.add_piece(sq("d7"), PieceKind::Pawn, Color::Black);

        board.apply_move(Move::new(sq("d7"), sq("d5")), 5);
        let generator = MoveGenerator::new();
        assert!(generator.legal_destinations(&board, sq("e5"), 6).contains(&sq("d6")));
        // one ply later the window has closed
        assert!(!generator.legal_destinations(&board, sq("e5"), 8).contains(&sq("d6")));
    }
}
