use crate::engine::config::EngineConfig;
use crate::engine::eval::WeightedEvaluator;
use crate::engine::{Move, SearchReport};
use crate::logic::board::{Board, Color, Piece, Square};
use crate::logic::game::{EditError, GameState, GameStatus, SpecialMove};
use crate::logic::rules::MoveError;
use crate::logic::save::{self, SaveError};
use crate::worker::{SearchWorker, WorkerError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("the engine is thinking")]
    SearchInProgress,
    #[error(transparent)]
    Move(#[from] MoveError),
    #[error(transparent)]
    Edit(#[from] EditError),
    #[error(transparent)]
    Save(#[from] SaveError),
    #[error(transparent)]
    Worker(#[from] WorkerError),
}

/// What a finished engine turn did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineReply {
    pub side: Color,
    pub report: SearchReport,
    /// Wall time from `start_search` to the reply being applied.
    pub elapsed: Duration,
    pub played: Option<Move>,
    pub special: SpecialMove,
    pub status: GameStatus,
}

/// Owns the game, the engine settings and the background search.
///
/// While a search runs every mutating call fails with
/// `SessionError::SearchInProgress`.
pub struct GameSession {
    game: GameState,
    config: EngineConfig,
    worker: SearchWorker,
    search: Option<(Color, Instant)>,
}

impl GameSession {
    pub fn new(config: EngineConfig) -> Result<Self, SessionError> {
        Self::with_game(GameState::new(), config)
    }

    pub fn with_game(game: GameState, config: EngineConfig) -> Result<Self, SessionError> {
        Ok(Self {
            game,
            config: config.sanitized(),
            worker: SearchWorker::spawn()?,
            search: None,
        })
    }

    pub const fn game(&self) -> &GameState {
        &self.game
    }

    pub const fn board(&self) -> &Board {
        &self.game.board
    }

    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub const fn is_searching(&self) -> bool {
        self.search.is_some()
    }

    fn ensure_idle(&self) -> Result<(), SessionError> {
        if self.search.is_some() {
            Err(SessionError::SearchInProgress)
        } else {
            Ok(())
        }
    }

    /// Sets the king check markers of both sides from the current position.
    fn refresh_check_marks(&mut self) {
        for color in [Color::White, Color::Black] {
            self.game.mark_check(color);
        }
    }

    pub fn legal_moves(&self, from: Square) -> Vec<Square> {
        self.game.legal_moves(from)
    }

    pub fn is_legal(&self, from: Square, to: Square) -> bool {
        self.game.is_legal(Move::new(from, to))
    }

    pub fn execute(&mut self, from: Square, to: Square) -> Result<SpecialMove, SessionError> {
        self.ensure_idle()?;
        let special = self.game.execute(Move::new(from, to))?;
        self.refresh_check_marks();
        Ok(special)
    }

    pub fn undo(&mut self) -> Result<bool, SessionError> {
        self.ensure_idle()?;
        let undone = self.game.undo_move();
        if undone {
            self.refresh_check_marks();
        }
        Ok(undone)
    }

    pub fn restart(&mut self) -> Result<(), SessionError> {
        self.ensure_idle()?;
        self.game.restart();
        self.refresh_check_marks();
        log::info!("new game");
        Ok(())
    }

    /// Replaces the game with decoded save text and returns the human's side
    /// if the save recorded one. On error the current game is kept.
    pub fn load(&mut self, text: &str) -> Result<Option<Color>, SessionError> {
        self.ensure_idle()?;
        let saved = save::decode(text).map_err(|e| {
            log::warn!("load failed: {e}");
            e
        })?;
        self.game = saved.game;
        self.refresh_check_marks();
        log::info!("game loaded at ply {}", self.game.ply);
        Ok(saved.player)
    }

    /// Encodes the game, recording `player` as the human's side when given.
    pub fn save(&self, player: Option<Color>) -> String {
        save::encode(&self.game, player)
    }

    /// Board editing: puts an unmoved piece on `sq`, or empties it.
    pub fn place(&mut self, sq: Square, piece: Option<Piece>) -> Result<(), SessionError> {
        self.ensure_idle()?;
        self.game.place(sq, piece)?;
        self.refresh_check_marks();
        Ok(())
    }

    /// Board editing: moves a piece anywhere, ignoring the move rules.
    pub fn relocate(&mut self, from: Square, to: Square) -> Result<(), SessionError> {
        self.ensure_idle()?;
        self.game.relocate(from, to)?;
        self.refresh_check_marks();
        Ok(())
    }

    pub fn set_config(&mut self, config: EngineConfig) -> Result<(), SessionError> {
        self.ensure_idle()?;
        self.config = config.sanitized();
        Ok(())
    }

    /// Depth is clamped to 0-9.
    pub fn set_depth(&mut self, depth: u8) -> Result<(), SessionError> {
        self.ensure_idle()?;
        self.config.set_depth(depth);
        Ok(())
    }

    pub fn in_check(&self, color: Color) -> bool {
        self.game.in_check(color)
    }

    pub fn status(&self) -> GameStatus {
        self.game.status()
    }

    /// Static evaluation from White's side, without the random term.
    pub fn analyse(&self) -> i32 {
        WeightedEvaluator::new(Arc::new(self.config.clone()))
            .static_score(&self.game.board, self.game.ply)
    }

    /// Starts the engine on the side to move. Returns that side.
    pub fn start_search(&mut self) -> Result<Color, SessionError> {
        self.ensure_idle()?;
        let side = self.game.turn();
        if self.config.no_draws {
            if let Some(mv) = self.game.forbidden_move() {
                log::info!("{mv} would repeat the position; avoiding it");
            }
        }
        self.worker.start(self.game.clone(), side, self.config.clone())?;
        self.search = Some((side, Instant::now()));
        Ok(side)
    }

    /// Applies a finished search, if there is one.
    pub fn poll_search(&mut self) -> Result<Option<EngineReply>, SessionError> {
        let report = match self.worker.poll() {
            Ok(Some(report)) => report,
            Ok(None) => return Ok(None),
            Err(e) => {
                self.search = None;
                return Err(e.into());
            }
        };
        self.finish(report).map(Some)
    }

    /// Blocks until the running search finishes and applies it. Returns
    /// `None` when no search was running.
    pub fn wait_search(&mut self) -> Result<Option<EngineReply>, SessionError> {
        let report = match self.worker.wait() {
            Ok(Some(report)) => report,
            Ok(None) => return Ok(None),
            Err(e) => {
                self.search = None;
                return Err(e.into());
            }
        };
        self.finish(report).map(Some)
    }

    fn finish(&mut self, report: SearchReport) -> Result<EngineReply, SessionError> {
        let Some((side, started)) = self.search.take() else {
            return Err(SessionError::Worker(WorkerError::Disconnected));
        };

        let played = report.best_move();
        let special = match played {
            Some(mv) => self.game.execute(mv)?,
            None => SpecialMove::None,
        };
        self.refresh_check_marks();

        Ok(EngineReply {
            side,
            report,
            elapsed: started.elapsed(),
            played,
            special,
            status: self.game.status(),
        })
    }
}
