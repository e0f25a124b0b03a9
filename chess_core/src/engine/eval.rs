use crate::engine::config::{AnalysisMode, EngineConfig};
use crate::engine::Evaluator;
use crate::logic::board::{Board, Color, PieceKind};
use crate::logic::generator::MoveGenerator;
use crate::logic::rules::is_square_attacked;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

/// Per-colour raw term counts before weighting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Terms {
    pub material: i32,
    pub mobility: i32,
    pub attacks: i32,
    pub defended: i32,
}

/// Weighted material / mobility / attack evaluator with optional noise.
pub struct WeightedEvaluator {
    config: Arc<EngineConfig>,
    generator: MoveGenerator,
    rng: StdRng,
}

impl WeightedEvaluator {
    pub fn new(config: Arc<EngineConfig>) -> Self {
        let rng = config
            .seed
            .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
        Self {
            config,
            generator: MoveGenerator::new(),
            rng,
        }
    }

    /// Counts the terms `mode` needs for `color`; the others stay zero.
    pub fn terms(&self, board: &Board, color: Color, ply: u32) -> Terms {
        let mode = self.config.analysis;
        let mut terms = Terms::default();
        for (sq, piece) in board.pieces(color) {
            terms.material += piece.kind.value();
            if mode == AnalysisMode::AddMovesDefend
                && piece.kind != PieceKind::King
                && is_square_attacked(board, sq, color)
            {
                terms.defended += 1;
            }
        }
        if mode.uses_mobility() {
            let count = self.generator.count_legal_moves(board, color, ply);
            terms.mobility = i32::try_from(count).unwrap_or(i32::MAX);
        }
        if mode == AnalysisMode::AddMovesExtended {
            let attacked = board
                .pieces(color.opposite())
                .filter(|&(sq, _)| is_square_attacked(board, sq, color))
                .count();
            terms.attacks = i32::try_from(attacked).unwrap_or(i32::MAX);
        }
        terms
    }

    fn weigh(&self, terms: Terms) -> i32 {
        let c = &self.config;
        terms.material * c.score_piece
            + terms.mobility * c.score_move
            + terms.attacks * c.score_attack
            + terms.defended * c.score_attack_indirect
    }

    /// White-perspective score without the random term.
    pub fn static_score(&self, board: &Board, ply: u32) -> i32 {
        let white = self.weigh(self.terms(board, Color::White, ply));
        let black = self.weigh(self.terms(board, Color::Black, ply));
        white - black
    }

    /// Noisy evaluation, negated when `from_white` is false.
    pub fn evaluate_from(&mut self, board: &Board, ply: u32, from_white: bool) -> i32 {
        let score = self.evaluate(board, ply);
        if from_white {
            score
        } else {
            -score
        }
    }

    fn noise(&mut self) -> i32 {
        let max = self.config.randomize;
        if max > 0 {
            self.rng.gen_range(0..=max)
        } else {
            0
        }
    }
}

impl Evaluator for WeightedEvaluator {
    fn evaluate(&mut self, board: &Board, ply: u32) -> i32 {
        self.static_score(board, ply) + self.noise()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Move;
    use crate::logic::board::Square;

    fn sq(s: &str) -> Square {
        s.parse().unwrap()
    }

    fn evaluator(analysis: AnalysisMode, randomize: i32) -> WeightedEvaluator {
        WeightedEvaluator::new(Arc::new(EngineConfig {
            analysis,
            randomize,
            seed: Some(1),
            ..EngineConfig::default()
        }))
    }

    #[test]
    fn test_initial_position_is_balanced() {
        let board = Board::new();
        for mode in AnalysisMode::ALL {
            assert_eq!(evaluator(mode, 0).static_score(&board, 0), 0, "{mode:?}");
        }
    }

    #[test]
    fn test_material_difference() {
        let mut board = Board::new();
        board.take(sq("d8"));
        let score = evaluator(AnalysisMode::Simple, 0).static_score(&board, 0);
        assert_eq!(score, 9 * 1000);
    }

    #[test]
    fn test_mobility_favours_developed_side() {
        let mut board = Board::new();
        board.apply_move(Move::new(sq("e2"), sq("e4")), 0);
        let eval = evaluator(AnalysisMode::AddMoves, 0);
        let white = eval.terms(&board, Color::White, 1);
        let black = eval.terms(&board, Color::Black, 1);
        assert_eq!(black.mobility, 20);
        assert!(white.mobility > black.mobility);
        assert!(eval.static_score(&board, 1) > 0);
    }

    #[test]
    fn test_attack_and_defend_terms() {
        let mut board = Board::empty();
        board.add_piece(sq("a1"), PieceKind::King, Color::White);
        board.add_piece(sq("h8"), PieceKind::King, Color::Black);
        board.add_piece(sq("d4"), PieceKind::Rook, Color::White);
        board.add_piece(sq("d7"), PieceKind::Knight, Color::Black);
        board.add_piece(sq("d1"), PieceKind::Rook, Color::White);

        let extended = evaluator(AnalysisMode::AddMovesExtended, 0);
        assert_eq!(extended.terms(&board, Color::White, 0).attacks, 1);
        assert_eq!(extended.terms(&board, Color::White, 0).defended, 0);

        let defend = evaluator(AnalysisMode::AddMovesDefend, 0);
        let white = defend.terms(&board, Color::White, 0);
        // each rook covers the other
        assert_eq!(white.defended, 2);
        assert_eq!(white.attacks, 0);
    }

    #[test]
    fn test_noise_bounded_and_seeded() {
        let board = Board::new();
        let mut a = evaluator(AnalysisMode::Simple, 25);
        let mut b = evaluator(AnalysisMode::Simple, 25);
        for _ in 0..50 {
            let score = a.evaluate(&board, 0);
            assert!((0..=25).contains(&score));
            assert_eq!(score, b.evaluate(&board, 0));
        }
        assert_eq!(evaluator(AnalysisMode::Simple, 0).evaluate(&board, 0), 0);
    }

    #[test]
    fn test_black_view_is_negated() {
        let mut board = Board::new();
        board.take(sq("a8"));
        let mut eval = evaluator(AnalysisMode::Simple, 0);
        assert_eq!(eval.evaluate_from(&board, 0, true), 5000);
        assert_eq!(eval.evaluate_from(&board, 0, false), -5000);
    }
}
