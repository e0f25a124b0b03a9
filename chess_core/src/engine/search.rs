use crate::engine::config::{EngineConfig, MAX_DEPTH};
use crate::engine::eval::WeightedEvaluator;
use crate::engine::{Move, SearchOutcome, SearchReport, Searcher, MATE_SCORE, NO_MOVE_SCORE};
use crate::logic::board::{Board, Color};
use crate::logic::game::GameState;
use crate::logic::generator::MoveGenerator;
use crate::logic::rules::is_in_check;
use std::sync::Arc;
use std::time::Instant;

const INFINITY: i32 = 1_000_000_000;

/// Fixed-depth negamax with alpha-beta pruning.
pub struct AlphaBetaEngine {
    config: Arc<EngineConfig>,
    evaluator: WeightedEvaluator,
    generator: MoveGenerator,
    nodes_searched: u64,
}

impl AlphaBetaEngine {
    pub fn new(config: Arc<EngineConfig>) -> Self {
        Self {
            evaluator: WeightedEvaluator::new(config.clone()),
            generator: MoveGenerator::new(),
            config,
            nodes_searched: 0,
        }
    }

    pub fn update_config(&mut self, config: Arc<EngineConfig>) {
        self.evaluator = WeightedEvaluator::new(config.clone());
        self.config = config;
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Static evaluation from `side`'s point of view, noise included.
    fn evaluate_for(&mut self, board: &Board, ply: u32, side: Color) -> i32 {
        self.evaluator
            .evaluate_from(board, ply, side == Color::White)
    }

    /// Captures first, biggest victim first. The sort is stable so equal
    /// moves keep generator order.
    fn order_moves(board: &Board, moves: &mut [Move]) {
        moves.sort_by_key(|mv| -board.get(mv.to).kind.value());
    }

    #[allow(clippy::too_many_arguments)]
    fn alpha_beta(
        &mut self,
        board: &mut Board,
        ply: u32,
        turn: Color,
        depth: u8,
        height: i32,
        mut alpha: i32,
        beta: i32,
        pv: &mut Vec<Move>,
    ) -> i32 {
        self.nodes_searched += 1;
        pv.clear();

        if depth == 0 {
            return self.evaluate_for(board, ply, turn);
        }

        let mut moves = self.generator.generate_moves(board, turn, ply);
        if moves.is_empty() {
            return if is_in_check(board, turn) {
                -MATE_SCORE + height
            } else {
                0
            };
        }
        Self::order_moves(board, &mut moves);

        let mut best = -INFINITY;
        let mut line = Vec::with_capacity(usize::from(depth));
        for mv in moves {
            let record = board.apply_move(mv, ply);
            let score = -self.alpha_beta(
                board,
                ply + 1,
                turn.opposite(),
                depth - 1,
                height + 1,
                -beta,
                -alpha,
                &mut line,
            );
            board.undo_move(&record, ply);

            if score > best {
                best = score;
                if score > alpha {
                    alpha = score;
                    pv.clear();
                    pv.push(mv);
                    pv.extend_from_slice(&line);
                }
            }
            if alpha >= beta {
                break;
            }
        }
        best
    }

    fn report(
        &self,
        start: Instant,
        depth: u8,
        score: i32,
        pv: Vec<Move>,
        outcome: SearchOutcome,
    ) -> SearchReport {
        SearchReport {
            score,
            principal_variation: pv,
            nodes: self.nodes_searched,
            elapsed_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            depth,
            outcome,
        }
    }
}

impl Searcher for AlphaBetaEngine {
    /// Searches `game` for `side` to `depth` plies (clamped to 0-9). The
    /// caller's state is never touched; the search runs on a board copy.
    fn best_move(&mut self, game: &GameState, side: Color, depth: u8) -> SearchReport {
        let start = Instant::now();
        let depth = depth.min(MAX_DEPTH);
        self.nodes_searched = 0;

        let mut board = game.board.clone();
        let ply = game.ply;

        if depth == 0 {
            self.nodes_searched = 1;
            let score = self.evaluate_for(&board, ply, side);
            return self.report(start, depth, score, Vec::new(), SearchOutcome::Static);
        }

        self.nodes_searched = 1;
        let mut moves = self.generator.generate_moves(&board, side, ply);
        if moves.is_empty() {
            let outcome = if is_in_check(&board, side) {
                SearchOutcome::Checkmate
            } else {
                SearchOutcome::Stalemate
            };
            log::info!("{side} has no legal move: {outcome:?}");
            return self.report(start, depth, NO_MOVE_SCORE, Vec::new(), outcome);
        }

        if self.config.no_draws {
            if let Some(forbidden) = game.forbidden_move() {
                if moves.len() > 1 && moves.contains(&forbidden) {
                    log::debug!("skipping {forbidden} to avoid repetition");
                    moves.retain(|&mv| mv != forbidden);
                }
            }
        }
        Self::order_moves(&board, &mut moves);

        let mut alpha = -INFINITY;
        let mut best_pv = Vec::new();
        let mut line = Vec::with_capacity(usize::from(depth));
        for mv in moves {
            let record = board.apply_move(mv, ply);
            let score = -self.alpha_beta(
                &mut board,
                ply + 1,
                side.opposite(),
                depth - 1,
                1,
                -INFINITY,
                -alpha,
                &mut line,
            );
            board.undo_move(&record, ply);

            if score > alpha || best_pv.is_empty() {
                alpha = score;
                best_pv.clear();
                best_pv.push(mv);
                best_pv.extend_from_slice(&line);
            }
        }

        log::info!(
            "{side} depth {depth}: score {alpha} nodes {} pv {:?}",
            self.nodes_searched,
            best_pv.iter().map(ToString::to_string).collect::<Vec<_>>()
        );
        self.report(start, depth, alpha, best_pv, SearchOutcome::Found)
    }
}
