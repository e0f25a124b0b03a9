use crate::engine::config::EngineConfig;
use crate::engine::search::AlphaBetaEngine;
use crate::engine::{SearchReport, Searcher};
use crate::logic::board::Color;
use crate::logic::game::GameState;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use thiserror::Error;

/// How long `wait` sleeps between checks of the result channel.
pub const POLL_INTERVAL: Duration = Duration::from_millis(5);

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("a search is already running")]
    Busy,
    #[error("could not start the search thread: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("the search thread stopped unexpectedly")]
    Disconnected,
}

#[derive(Debug, Serialize, Deserialize)]
pub enum Input {
    ComputeMove {
        game: GameState,
        side: Color,
        config: EngineConfig,
    },
}

#[derive(Debug, Serialize, Deserialize)]
pub enum Output {
    MoveFound(SearchReport),
}

/// Runs searches on a dedicated thread, one at a time.
///
/// The thread keeps its engine between requests and exits once the worker
/// is dropped.
pub struct SearchWorker {
    input: Sender<Input>,
    output: Receiver<Output>,
    busy: bool,
}

impl SearchWorker {
    pub fn spawn() -> Result<Self, WorkerError> {
        let (input, jobs) = unbounded::<Input>();
        let (results, output) = unbounded::<Output>();

        thread::Builder::new()
            .name("search".to_string())
            .spawn(move || run(&jobs, &results))?;

        Ok(Self {
            input,
            output,
            busy: false,
        })
    }

    pub const fn is_busy(&self) -> bool {
        self.busy
    }

    /// Queues a search over a snapshot of `game`.
    pub fn start(
        &mut self,
        game: GameState,
        side: Color,
        config: EngineConfig,
    ) -> Result<(), WorkerError> {
        if self.busy {
            return Err(WorkerError::Busy);
        }
        self.input
            .send(Input::ComputeMove { game, side, config })
            .map_err(|_| WorkerError::Disconnected)?;
        self.busy = true;
        Ok(())
    }

    /// Non-blocking check for a finished search.
    pub fn poll(&mut self) -> Result<Option<SearchReport>, WorkerError> {
        if !self.busy {
            return Ok(None);
        }
        match self.output.try_recv() {
            Ok(Output::MoveFound(report)) => {
                self.busy = false;
                Ok(Some(report))
            }
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => self.lost(),
        }
    }

    /// Blocks until the running search finishes. Returns `None` when idle.
    pub fn wait(&mut self) -> Result<Option<SearchReport>, WorkerError> {
        while self.busy {
            match self.output.recv_timeout(POLL_INTERVAL) {
                Ok(Output::MoveFound(report)) => {
                    self.busy = false;
                    return Ok(Some(report));
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return self.lost(),
            }
        }
        Ok(None)
    }

    fn lost(&mut self) -> Result<Option<SearchReport>, WorkerError> {
        self.busy = false;
        log::error!("search thread disconnected");
        Err(WorkerError::Disconnected)
    }
}

fn run(jobs: &Receiver<Input>, results: &Sender<Output>) {
    let mut cached: Option<AlphaBetaEngine> = None;

    for job in jobs {
        match job {
            Input::ComputeMove { game, side, config } => {
                let depth = config.depth;
                let config = Arc::new(config);
                let engine =
                    cached.get_or_insert_with(|| AlphaBetaEngine::new(Arc::clone(&config)));
                engine.update_config(config);

                log::info!("search started: {side} to depth {depth}");
                let report = engine.best_move(&game, side, depth);
                if results.send(Output::MoveFound(report)).is_err() {
                    break;
                }
            }
        }
    }
    log::debug!("search thread exiting");
}
