use crate::engine::Move;
use crate::logic::game::{SpecialMove, UndoRecord};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use serde_big_array::BigArray;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Color {
    #[default]
    White,
    Black,
}

impl Color {
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::White => Self::Black,
            Self::Black => Self::White,
        }
    }

    pub const fn index(self) -> usize {
        match self {
            Self::White => 0,
            Self::Black => 1,
        }
    }

    /// Rank delta of a pawn step.
    pub const fn forward(self) -> i8 {
        match self {
            Self::White => 1,
            Self::Black => -1,
        }
    }

    pub const fn home_rank(self) -> u8 {
        match self {
            Self::White => 0,
            Self::Black => 7,
        }
    }

    pub const fn pawn_rank(self) -> u8 {
        match self {
            Self::White => 1,
            Self::Black => 6,
        }
    }

    pub const fn promotion_rank(self) -> u8 {
        match self {
            Self::White => 7,
            Self::Black => 0,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::White => f.write_str("White"),
            Self::Black => f.write_str("Black"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PieceKind {
    #[default]
    Empty = 0,
    King = 1,
    Queen = 2,
    Rook = 3,
    Bishop = 4,
    Knight = 5,
    Pawn = 6,
}

impl PieceKind {
    pub const fn code(self) -> u32 {
        self as u32
    }

    pub const fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Self::Empty),
            1 => Some(Self::King),
            2 => Some(Self::Queen),
            3 => Some(Self::Rook),
            4 => Some(Self::Bishop),
            5 => Some(Self::Knight),
            6 => Some(Self::Pawn),
            _ => None,
        }
    }

    /// Material value in pawns. The king is never captured so it carries none.
    pub const fn value(self) -> i32 {
        match self {
            Self::Empty | Self::King => 0,
            Self::Queen => 9,
            Self::Rook => 5,
            Self::Bishop | Self::Knight => 3,
            Self::Pawn => 1,
        }
    }

    pub const fn symbol(self) -> char {
        match self {
            Self::Empty => '.',
            Self::King => 'k',
            Self::Queen => 'q',
            Self::Rook => 'r',
            Self::Bishop => 'b',
            Self::Knight => 'n',
            Self::Pawn => 'p',
        }
    }
}

bitflags! {
    /// Transient per-piece state.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct PieceFlags: u8 {
        /// The piece has left its starting square at least once.
        const MOVED = 1;
        /// Display marker on a king whose side is in check.
        const IN_CHECK = 1 << 1;
        /// Pawn advanced two squares; see `Piece::advanced_at`.
        const ADVANCED_TWO = 1 << 2;
    }
}

// Save-format bit layout.
const CODE_KIND_MASK: u32 = 0x07;
const CODE_WHITE: u32 = 0x08;
const CODE_FLAGS_SHIFT: u32 = 4;
const CODE_FLAGS_MASK: u32 = 0xF0;
const CODE_STAMP_SHIFT: u32 = 8;

/// Largest ply stamp a piece code can carry.
pub const MAX_STAMP: u32 = u32::MAX >> CODE_STAMP_SHIFT;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Piece {
    pub kind: PieceKind,
    pub color: Color,
    pub flags: PieceFlags,
    /// Ply at which `ADVANCED_TWO` was set.
    pub advanced_at: Option<u32>,
}

impl Piece {
    pub const EMPTY: Self = Self {
        kind: PieceKind::Empty,
        color: Color::White,
        flags: PieceFlags::empty(),
        advanced_at: None,
    };

    #[must_use]
    pub const fn new(kind: PieceKind, color: Color) -> Self {
        Self {
            kind,
            color,
            flags: PieceFlags::empty(),
            advanced_at: None,
        }
    }

    pub const fn is_empty(self) -> bool {
        matches!(self.kind, PieceKind::Empty)
    }

    pub fn is(self, kind: PieceKind, color: Color) -> bool {
        self.kind == kind && self.color == color
    }

    /// True for a non-empty piece of the other colour.
    pub fn is_enemy_of(self, color: Color) -> bool {
        !self.is_empty() && self.color != color
    }

    pub fn is_friend_of(self, color: Color) -> bool {
        !self.is_empty() && self.color == color
    }

    pub const fn has_moved(self) -> bool {
        self.flags.contains(PieceFlags::MOVED)
    }

    /// True when this pawn made its two-square advance on the ply just before `ply`.
    pub fn can_be_taken_en_passant(self, ply: u32) -> bool {
        self.kind == PieceKind::Pawn
            && self.flags.contains(PieceFlags::ADVANCED_TWO)
            && self.advanced_at.is_some_and(|at| at + 1 == ply)
    }

    pub fn symbol(self) -> char {
        let c = self.kind.symbol();
        if self.color == Color::White && !self.is_empty() {
            c.to_ascii_uppercase()
        } else {
            c
        }
    }

    /// Parses a board letter: upper case is White (`K`, `q`, ...).
    pub fn from_symbol(symbol: char) -> Option<Self> {
        let kind = match symbol.to_ascii_lowercase() {
            'k' => PieceKind::King,
            'q' => PieceKind::Queen,
            'r' => PieceKind::Rook,
            'b' => PieceKind::Bishop,
            'n' => PieceKind::Knight,
            'p' => PieceKind::Pawn,
            _ => return None,
        };
        let color = if symbol.is_ascii_uppercase() {
            Color::White
        } else {
            Color::Black
        };
        Some(Self::new(kind, color))
    }

    /// Packs the piece into its save-file code. Empty squares are always 0.
    pub fn to_code(self) -> u32 {
        if self.is_empty() {
            return 0;
        }
        let mut code = self.kind.code();
        if self.color == Color::White {
            code |= CODE_WHITE;
        }
        code |= u32::from(self.flags.bits()) << CODE_FLAGS_SHIFT;
        if let Some(at) = self.advanced_at {
            code |= at << CODE_STAMP_SHIFT;
        }
        code
    }

    /// Unpacks a save-file code, rejecting unknown kinds, stray bits and
    /// stamps without the matching flag.
    pub fn from_code(code: u32) -> Option<Self> {
        let kind = PieceKind::from_code(code & CODE_KIND_MASK)?;
        if kind == PieceKind::Empty {
            return (code == 0).then_some(Self::EMPTY);
        }
        let color = if code & CODE_WHITE == 0 {
            Color::Black
        } else {
            Color::White
        };
        let flag_bits = u8::try_from((code & CODE_FLAGS_MASK) >> CODE_FLAGS_SHIFT).ok()?;
        let flags = PieceFlags::from_bits(flag_bits)?;
        let stamp = code >> CODE_STAMP_SHIFT;
        let advanced_at = if flags.contains(PieceFlags::ADVANCED_TWO) {
            if kind != PieceKind::Pawn {
                return None;
            }
            Some(stamp)
        } else if stamp != 0 {
            return None;
        } else {
            None
        };
        Some(Self {
            kind,
            color,
            flags,
            advanced_at,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid square: {0:?}")]
pub struct ParseSquareError(pub String);

/// A board coordinate. File 0 / rank 0 is a1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Square {
    file: u8,
    rank: u8,
}

impl Square {
    pub const fn new(file: u8, rank: u8) -> Option<Self> {
        if file < 8 && rank < 8 {
            Some(Self { file, rank })
        } else {
            None
        }
    }

    pub const fn from_index(index: usize) -> Option<Self> {
        if index < 64 {
            Some(Self {
                file: (index % 8) as u8,
                rank: (index / 8) as u8,
            })
        } else {
            None
        }
    }

    pub const fn file(self) -> u8 {
        self.file
    }

    pub const fn rank(self) -> u8 {
        self.rank
    }

    /// Rank-major index: a1 = 0, h1 = 7, a2 = 8.
    pub const fn index(self) -> usize {
        self.rank as usize * 8 + self.file as usize
    }

    pub fn offset(self, d_file: i8, d_rank: i8) -> Option<Self> {
        let file = self.file.checked_add_signed(d_file)?;
        let rank = self.rank.checked_add_signed(d_rank)?;
        Self::new(file, rank)
    }

    /// Every square, file-major then rank (a1, a2, ... a8, b1, ...).
    pub fn all() -> impl Iterator<Item = Self> {
        (0..8u8).flat_map(|file| (0..8u8).map(move |rank| Self { file, rank }))
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", char::from(b'a' + self.file), self.rank + 1)
    }
}

impl FromStr for Square {
    type Err = ParseSquareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.trim().as_bytes();
        match bytes {
            [f @ b'a'..=b'h', r @ b'1'..=b'8'] => Ok(Self {
                file: f - b'a',
                rank: r - b'1',
            }),
            _ => Err(ParseSquareError(s.to_string())),
        }
    }
}

impl TryFrom<String> for Square {
    type Error = ParseSquareError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Square> for String {
    fn from(sq: Square) -> Self {
        sq.to_string()
    }
}

const BACK_RANK: [PieceKind; 8] = [
    PieceKind::Rook,
    PieceKind::Knight,
    PieceKind::Bishop,
    PieceKind::Queen,
    PieceKind::King,
    PieceKind::Bishop,
    PieceKind::Knight,
    PieceKind::Rook,
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    // Indexed by `Square::index`.
    #[serde(with = "BigArray")]
    squares: [Piece; 64],
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    #[must_use]
    pub fn new() -> Self {
        let mut board = Self::empty();
        board.setup_initial_position();
        board
    }

    #[must_use]
    pub const fn empty() -> Self {
        Self {
            squares: [Piece::EMPTY; 64],
        }
    }

    pub fn reset(&mut self) {
        self.clear();
        self.setup_initial_position();
    }

    pub fn clear(&mut self) {
        self.squares = [Piece::EMPTY; 64];
    }

    fn setup_initial_position(&mut self) {
        for color in [Color::White, Color::Black] {
            for (file, &kind) in (0u8..).zip(BACK_RANK.iter()) {
                if let Some(sq) = Square::new(file, color.home_rank()) {
                    self.add_piece(sq, kind, color);
                }
                if let Some(sq) = Square::new(file, color.pawn_rank()) {
                    self.add_piece(sq, PieceKind::Pawn, color);
                }
            }
        }
    }

    pub fn get(&self, sq: Square) -> Piece {
        self.squares[sq.index()]
    }

    pub fn set(&mut self, sq: Square, piece: Piece) {
        self.squares[sq.index()] = piece;
    }

    /// Removes and returns whatever stands on `sq`.
    pub fn take(&mut self, sq: Square) -> Piece {
        std::mem::replace(&mut self.squares[sq.index()], Piece::EMPTY)
    }

    pub fn add_piece(&mut self, sq: Square, kind: PieceKind, color: Color) {
        self.set(sq, Piece::new(kind, color));
    }

    pub fn king_square(&self, color: Color) -> Option<Square> {
        self.pieces(color)
            .find(|(_, p)| p.kind == PieceKind::King)
            .map(|(sq, _)| sq)
    }

    /// Occupied squares of `color`, file-major then rank.
    pub fn pieces(&self, color: Color) -> impl Iterator<Item = (Square, Piece)> + '_ {
        Square::all()
            .map(|sq| (sq, self.get(sq)))
            .filter(move |(_, p)| p.is_friend_of(color))
    }

    pub fn count(&self, kind: PieceKind, color: Color) -> usize {
        self.squares.iter().filter(|p| p.is(kind, color)).count()
    }

    /// First colour that does not have exactly one king, with its king count.
    pub fn king_count_fault(&self) -> Option<(Color, usize)> {
        [Color::White, Color::Black]
            .into_iter()
            .map(|color| (color, self.count(PieceKind::King, color)))
            .find(|&(_, count)| count != 1)
    }

    /// Squares in save-file order (rank-major).
    pub fn squares(&self) -> &[Piece; 64] {
        &self.squares
    }

    pub const fn from_squares(squares: [Piece; 64]) -> Self {
        Self { squares }
    }

    /// Plays `mv` with all of its side effects and returns the record that
    /// reverses it. `ply` is the ply number this move is made on.
    ///
    /// No legality checking happens here.
    pub fn apply_move(&mut self, mv: Move, ply: u32) -> UndoRecord {
        let moved = self.take(mv.from);
        let captured = self.take(mv.to);
        let mut special = SpecialMove::None;

        let mut placed = moved;
        placed.flags.insert(PieceFlags::MOVED);
        placed.flags.remove(PieceFlags::IN_CHECK);
        placed.flags.remove(PieceFlags::ADVANCED_TWO);
        placed.advanced_at = None;

        let d_file = i16::from(mv.to.file()) - i16::from(mv.from.file());
        let d_rank = i16::from(mv.to.rank()) - i16::from(mv.from.rank());

        match moved.kind {
            PieceKind::King if d_file.abs() == 2 => {
                special = SpecialMove::Castle;
                if let Some((rook_from, rook_to)) = castling_rook_squares(mv) {
                    let mut rook = self.take(rook_from);
                    rook.flags.insert(PieceFlags::MOVED);
                    self.set(rook_to, rook);
                }
            }
            PieceKind::Pawn => {
                if d_rank.abs() == 2 {
                    placed.flags.insert(PieceFlags::ADVANCED_TWO);
                    placed.advanced_at = Some(ply);
                } else if d_file != 0 && captured.is_empty() {
                    special = SpecialMove::EnPassant;
                    if let Some(victim) = Square::new(mv.to.file(), mv.from.rank()) {
                        self.take(victim);
                    }
                }
                if mv.to.rank() == moved.color.promotion_rank() {
                    special = SpecialMove::Promotion;
                    placed.kind = PieceKind::Queen;
                }
            }
            _ => {}
        }

        self.set(mv.to, placed);

        UndoRecord {
            from: mv.from,
            to: mv.to,
            moved,
            captured,
            special,
        }
    }

    /// Reverses `apply_move`. `ply` must be the ply the move was made on.
    pub fn undo_move(&mut self, record: &UndoRecord, ply: u32) {
        self.set(record.from, record.moved);
        self.set(record.to, record.captured);

        match record.special {
            SpecialMove::Castle => {
                if let Some((rook_from, rook_to)) = castling_rook_squares(record.as_move()) {
                    let mut rook = self.take(rook_to);
                    rook.flags.remove(PieceFlags::MOVED);
                    self.set(rook_from, rook);
                }
            }
            SpecialMove::EnPassant => {
                if let Some(victim) = Square::new(record.to.file(), record.from.rank()) {
                    self.set(
                        victim,
                        Piece {
                            kind: PieceKind::Pawn,
                            color: record.moved.color.opposite(),
                            flags: PieceFlags::MOVED | PieceFlags::ADVANCED_TWO,
                            advanced_at: ply.checked_sub(1),
                        },
                    );
                }
            }
            SpecialMove::None | SpecialMove::Promotion => {}
        }
    }
}

/// Rook hop for a castling king move: (rook start, rook destination).
pub fn castling_rook_squares(king_move: Move) -> Option<(Square, Square)> {
    let rank = king_move.from.rank();
    if king_move.to.file() > king_move.from.file() {
        Some((Square::new(7, rank)?, Square::new(5, rank)?))
    } else {
        Some((Square::new(0, rank)?, Square::new(3, rank)?))
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rank in (0..8u8).rev() {
            write!(f, "{} ", rank + 1)?;
            for file in 0..8u8 {
                let piece = Square::new(file, rank).map_or(Piece::EMPTY, |sq| self.get(sq));
                write!(f, " {}", piece.symbol())?;
            }
            writeln!(f)?;
        }
        write!(f, "   a b c d e f g h")
    }
}
