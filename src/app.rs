use crate::command::{Command, Humans, HELP};
use anyhow::Context;
use chess_core::engine::config::EngineConfig;
use chess_core::engine::{format_score, SearchOutcome};
use chess_core::logic::board::Color;
use chess_core::logic::game::{GameStatus, SpecialMove};
use chess_core::session::{EngineReply, GameSession, SessionError};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameMode {
    HumanVsComputer(Color),
    HumanVsHuman,
}

impl GameMode {
    fn engine_plays(self, side: Color) -> bool {
        match self {
            Self::HumanVsComputer(human) => human != side,
            Self::HumanVsHuman => false,
        }
    }

    /// The side recorded in save files.
    const fn human_side(self) -> Option<Color> {
        match self {
            Self::HumanVsComputer(human) => Some(human),
            Self::HumanVsHuman => None,
        }
    }
}

impl From<Humans> for GameMode {
    fn from(humans: Humans) -> Self {
        match humans {
            Humans::White => Self::HumanVsComputer(Color::White),
            Humans::Black => Self::HumanVsComputer(Color::Black),
            Humans::Both => Self::HumanVsHuman,
        }
    }
}

/// Line-oriented front-end over a `GameSession`.
pub struct ConsoleApp<W: Write> {
    session: GameSession,
    mode: GameMode,
    config_path: PathBuf,
    max_auto_plies: u32,
    out: W,
}

/// Reads engine settings, falling back to defaults when the file is missing
/// or unreadable.
pub fn load_config(path: &Path) -> EngineConfig {
    match fs::read_to_string(path) {
        Ok(text) => EngineConfig::load_from_json(&text).unwrap_or_else(|e| {
            log::warn!("ignoring settings in {}: {e}", path.display());
            EngineConfig::default()
        }),
        Err(_) => {
            log::debug!("no settings at {}, using defaults", path.display());
            EngineConfig::default()
        }
    }
}

impl<W: Write> ConsoleApp<W> {
    pub fn new(
        session: GameSession,
        mode: GameMode,
        config_path: PathBuf,
        max_auto_plies: u32,
        out: W,
    ) -> Self {
        Self {
            session,
            mode,
            config_path,
            max_auto_plies,
            out,
        }
    }

    #[cfg(test)]
    pub const fn session(&self) -> &GameSession {
        &self.session
    }

    #[cfg(test)]
    pub fn into_output(self) -> W {
        self.out
    }

    /// Shows the opening board and lets the engine move first if it owns White.
    pub fn start(&mut self) -> anyhow::Result<()> {
        self.show_board()?;
        self.engine_turns(1)
    }

    pub fn prompt(&mut self) -> anyhow::Result<()> {
        write!(self.out, "> ")?;
        self.out.flush()?;
        Ok(())
    }

    /// Runs one input line. Returns false once the user asked to quit.
    pub fn handle_line(&mut self, line: &str) -> anyhow::Result<bool> {
        if line.trim().is_empty() {
            return Ok(true);
        }
        match line.parse::<Command>() {
            Ok(cmd) => self.handle(cmd),
            Err(e) => {
                writeln!(self.out, "{e:#}")?;
                Ok(true)
            }
        }
    }

    pub fn handle(&mut self, cmd: Command) -> anyhow::Result<bool> {
        match cmd {
            Command::Help => writeln!(self.out, "{HELP}")?,
            Command::Board => self.show_board()?,
            Command::Moves(sq) => {
                let dests = self.session.legal_moves(sq);
                if dests.is_empty() {
                    writeln!(self.out, "{sq}: no legal moves")?;
                } else {
                    let list: Vec<String> = dests.iter().map(ToString::to_string).collect();
                    writeln!(self.out, "{sq}: {}", list.join(" "))?;
                }
            }
            Command::Move(mv) => match self.session.execute(mv.from, mv.to) {
                Ok(special) => {
                    if special != SpecialMove::None {
                        writeln!(self.out, "{special:?}")?;
                    }
                    self.show_board()?;
                    if self.report_status()? {
                        self.engine_turns(1)?;
                    }
                }
                Err(e) => writeln!(self.out, "{e}")?,
            },
            Command::Place(sq, piece) => self.edit(|session| session.place(sq, piece))?,
            Command::Relocate(from, to) => {
                self.edit(|session| session.relocate(from, to))?;
            }
            Command::Undo => {
                if !self.session.undo()? {
                    writeln!(self.out, "nothing to undo")?;
                }
                self.show_board()?;
            }
            Command::Play => self.play_once()?,
            Command::Auto => {
                let limit = self.max_auto_plies;
                self.run_engine(limit)?;
            }
            Command::Restart(humans) => {
                if let Some(humans) = humans {
                    self.mode = humans.into();
                }
                self.session.restart()?;
                self.show_board()?;
                self.engine_turns(1)?;
            }
            Command::Eval => {
                let score = self.session.analyse();
                writeln!(self.out, "eval {} (White's view)", format_score(score))?;
            }
            Command::Depth(depth) => {
                self.session.set_depth(depth)?;
                writeln!(self.out, "depth {}", self.session.config().depth)?;
                self.store_config()?;
            }
            Command::Analysis(mode) => {
                self.update_config(|c| c.analysis = mode)?;
                writeln!(self.out, "analysis {}", mode.label())?;
            }
            Command::Randomize(level) => {
                let mut config = self.session.config().clone();
                if config.set_randomize_level(level) {
                    self.session.set_config(config)?;
                    self.store_config()?;
                    writeln!(self.out, "randomize {}", self.session.config().randomize)?;
                } else {
                    writeln!(self.out, "randomize level must be 0-10")?;
                }
            }
            Command::NoDraws(on) => {
                self.update_config(|c| c.no_draws = on)?;
                writeln!(self.out, "nodraws {}", if on { "on" } else { "off" })?;
            }
            Command::Save(path) => {
                let text = self.session.save(self.mode.human_side());
                match fs::write(&path, text) {
                    Ok(()) => writeln!(self.out, "saved to {}", path.display())?,
                    Err(e) => writeln!(self.out, "cannot save {}: {e}", path.display())?,
                }
            }
            Command::Load(path) => self.load_file(&path)?,
            Command::Log => writeln!(self.out, "{}", self.session.game().log)?,
            Command::LogSave(path) => {
                match fs::write(&path, format!("{}\n", self.session.game().log)) {
                    Ok(()) => writeln!(self.out, "log saved to {}", path.display())?,
                    Err(e) => writeln!(self.out, "cannot save log {}: {e}", path.display())?,
                }
            }
            Command::Quit => return Ok(false),
        }
        Ok(true)
    }

    /// Reads a save file. Failures are reported and leave the game as it was.
    pub fn load_file(&mut self, path: &Path) -> anyhow::Result<()> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                writeln!(self.out, "cannot load {}: {e}", path.display())?;
                return Ok(());
            }
        };
        match self.session.load(&text) {
            Ok(player) => {
                if let Some(human) = player {
                    self.mode = GameMode::HumanVsComputer(human);
                }
                self.show_board()?;
                self.report_status()?;
            }
            Err(e) => writeln!(self.out, "cannot load {}: {e}", path.display())?,
        }
        Ok(())
    }

    /// Applies one board edit, then shows the board and the fresh evaluation.
    fn edit(
        &mut self,
        change: impl FnOnce(&mut GameSession) -> Result<(), SessionError>,
    ) -> anyhow::Result<()> {
        match change(&mut self.session) {
            Ok(()) => {
                self.show_board()?;
                let score = self.session.analyse();
                writeln!(self.out, "eval {} (White's view)", format_score(score))?;
                self.report_status()?;
            }
            Err(e) => writeln!(self.out, "{e}")?,
        }
        Ok(())
    }

    fn update_config(&mut self, change: impl FnOnce(&mut EngineConfig)) -> anyhow::Result<()> {
        let mut config = self.session.config().clone();
        change(&mut config);
        self.session.set_config(config)?;
        self.store_config()
    }

    fn store_config(&self) -> anyhow::Result<()> {
        let json = self.session.config().to_json()?;
        fs::write(&self.config_path, json)
            .with_context(|| format!("writing {}", self.config_path.display()))?;
        Ok(())
    }

    pub fn show_board(&mut self) -> anyhow::Result<()> {
        let game = self.session.game();
        writeln!(self.out, "{}", game.board)?;
        writeln!(self.out, "{} to move, ply {}", game.turn(), game.ply)?;
        Ok(())
    }

    /// Prints check / game-over messages. Returns whether play continues.
    fn report_status(&mut self) -> anyhow::Result<bool> {
        match self.session.status() {
            GameStatus::Playing => Ok(true),
            GameStatus::Check(side) => {
                writeln!(self.out, "{side} is IN CHECK")?;
                Ok(true)
            }
            GameStatus::Checkmate(winner) => {
                writeln!(self.out, "Checkmate, {winner} wins")?;
                Ok(false)
            }
            GameStatus::Stalemate => {
                writeln!(self.out, "Stalemate")?;
                Ok(false)
            }
        }
    }

    /// Lets the engine move while the mode says it owns the side to move.
    fn engine_turns(&mut self, limit: u32) -> anyhow::Result<()> {
        let mut played = 0;
        while played < limit && self.mode.engine_plays(self.session.game().turn()) {
            if !self.play_once_checked()? {
                break;
            }
            played += 1;
        }
        Ok(())
    }

    /// Engine plays both sides regardless of mode.
    fn run_engine(&mut self, limit: u32) -> anyhow::Result<()> {
        for _ in 0..limit {
            if !self.play_once_checked()? {
                return Ok(());
            }
        }
        writeln!(self.out, "stopped after {limit} plies")?;
        Ok(())
    }

    fn play_once(&mut self) -> anyhow::Result<()> {
        self.play_once_checked().map(|_| ())
    }

    /// One engine move. Returns whether the game can go on.
    fn play_once_checked(&mut self) -> anyhow::Result<bool> {
        let side = self.session.start_search()?;
        writeln!(
            self.out,
            "{side} thinking (depth {})...",
            self.session.config().depth
        )?;
        self.out.flush()?;
        let Some(reply) = self.session.wait_search()? else {
            return Ok(false);
        };
        self.print_reply(&reply)?;
        if reply.played.is_none() {
            return Ok(false);
        }
        self.show_board()?;
        self.report_status()
    }

    fn print_reply(&mut self, reply: &EngineReply) -> anyhow::Result<()> {
        let report = &reply.report;
        match (reply.played, report.outcome) {
            (Some(mv), _) => writeln!(
                self.out,
                "{} plays {mv}  score {}  nodes {}  {} ms  pv {}",
                reply.side,
                format_score(report.score),
                report.nodes,
                reply.elapsed.as_millis(),
                report.pv_string()
            )?,
            (None, SearchOutcome::Checkmate) => {
                writeln!(self.out, "No moves, it's over: {} is checkmated", reply.side)?;
            }
            (None, SearchOutcome::Stalemate) => {
                writeln!(self.out, "No moves, it's over: stalemate")?;
            }
            (None, _) => writeln!(
                self.out,
                "depth 0: eval {} for {}",
                format_score(report.score),
                reply.side
            )?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_core::logic::board::PieceKind;

    /// Scratch directory removed on drop.
    struct Scratch(PathBuf);

    impl Scratch {
        fn new(name: &str) -> Self {
            let dir = std::env::temp_dir()
                .join(format!("chess_console_{}_{name}", std::process::id()));
            fs::create_dir_all(&dir).unwrap();
            Self(dir)
        }

        fn path(&self) -> &Path {
            &self.0
        }
    }

    impl Drop for Scratch {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.0);
        }
    }

    fn app(mode: GameMode, name: &str) -> (ConsoleApp<Vec<u8>>, Scratch) {
        let dir = Scratch::new(name);
        let config = EngineConfig {
            depth: 1,
            randomize: 0,
            ..EngineConfig::default()
        };
        let session = GameSession::new(config).unwrap();
        let app = ConsoleApp::new(
            session,
            mode,
            dir.path().join("settings.json"),
            4,
            Vec::new(),
        );
        (app, dir)
    }

    fn output(app: ConsoleApp<Vec<u8>>) -> String {
        String::from_utf8(app.into_output()).unwrap()
    }

    #[test]
    fn test_human_move_triggers_engine_reply() {
        let (mut app, _dir) = app(GameMode::HumanVsComputer(Color::White), "reply");
        assert!(app.handle_line("e2e4").unwrap());
        assert_eq!(app.session().game().ply, 2);
        assert!(output(app).contains("Black plays"));
    }

    #[test]
    fn test_human_vs_human_waits() {
        let (mut app, _dir) = app(GameMode::HumanVsHuman, "waits");
        app.handle_line("e2e4").unwrap();
        assert_eq!(app.session().game().ply, 1);
        app.handle_line("e2e5").unwrap();
        assert_eq!(app.session().game().ply, 1);
        assert!(!app.handle_line("quit").unwrap());
    }

    #[test]
    fn test_auto_stops_at_limit() {
        let (mut app, _dir) = app(GameMode::HumanVsHuman, "auto");
        app.handle_line("auto").unwrap();
        assert_eq!(app.session().game().ply, 4);
        assert!(output(app).contains("stopped after 4 plies"));
    }

    #[test]
    fn test_missing_file_keeps_console_running() {
        let (mut app, dir) = app(GameMode::HumanVsHuman, "missing");
        app.handle_line("e2e4").unwrap();
        let missing = dir.path().join("nope").join("game.sav");
        assert!(app.handle_line(&format!("load {}", missing.display())).unwrap());
        assert!(app.handle_line(&format!("save {}", missing.display())).unwrap());
        assert!(app
            .handle_line(&format!("log save {}", missing.display()))
            .unwrap());
        assert_eq!(app.session().game().ply, 1);
        let text = output(app);
        assert!(text.contains("cannot load"));
        assert!(text.contains("cannot save"));
    }

    #[test]
    fn test_edit_commands_change_board() {
        let (mut app, _dir) = app(GameMode::HumanVsHuman, "edit");
        app.handle_line("e2e4").unwrap();
        app.handle_line("edit move d8 h4").unwrap();
        app.handle_line("edit put a3 N").unwrap();
        app.handle_line("edit clear e1").unwrap();
        let game = app.session().game();
        assert!(game.history.is_empty());
        assert!(game.board.get("h4".parse().unwrap()).kind == PieceKind::Queen);
        assert!(game.board.get("a3".parse().unwrap()).is(PieceKind::Knight, Color::White));
        // removing the only white king is refused
        assert!(!game.board.get("e1".parse().unwrap()).is_empty());
        let text = output(app);
        assert!(text.contains("White would have 0 kings"));
        assert!(text.contains("eval "));
    }

    #[test]
    fn test_load_restores_player_side() {
        let (mut app, dir) = app(GameMode::HumanVsComputer(Color::Black), "side");
        let file = dir.path().join("side.sav");
        assert_eq!(app.session().game().ply, 0);
        app.handle_line(&format!("save {}", file.display())).unwrap();
        app.handle_line("restart both").unwrap();
        assert_eq!(app.mode, GameMode::HumanVsHuman);
        app.handle_line(&format!("load {}", file.display())).unwrap();
        assert_eq!(app.mode, GameMode::HumanVsComputer(Color::Black));
    }

    #[test]
    fn test_settings_are_persisted() {
        let (mut app, dir) = app(GameMode::HumanVsHuman, "settings");
        app.handle_line("depth 12").unwrap();
        app.handle_line("randomize 3").unwrap();
        let stored = load_config(&dir.path().join("settings.json"));
        assert_eq!(stored.depth, 9);
        assert_eq!(stored.randomize, 10);
    }

    #[test]
    fn test_save_and_load_files() {
        let (mut app, dir) = app(GameMode::HumanVsHuman, "files");
        let file = dir.path().join("game.sav");
        app.handle_line("e2e4").unwrap();
        app.handle_line(&format!("save {}", file.display())).unwrap();
        app.handle_line("restart both").unwrap();
        assert_eq!(app.session().game().ply, 0);
        app.handle_line(&format!("load {}", file.display())).unwrap();
        assert_eq!(app.session().game().ply, 1);
    }
}
