use anyhow::Context;
use chess_core::logic::board::Color;
use chess_core::session::GameSession;
use clap::Parser;
use std::io::{self, BufRead};
use std::path::PathBuf;

mod app;
mod command;

use app::{load_config, ConsoleApp, GameMode};
use command::Humans;

#[derive(Debug, Parser)]
#[command(name = "chess_console", about = "Play chess against a fixed-depth search engine")]
struct Args {
    /// Engine settings file (JSON). Created on the first settings change.
    #[arg(long, default_value = ".chess.json")]
    config: PathBuf,

    /// Side(s) you play: white, black or both.
    #[arg(long, default_value = "white")]
    play: String,

    /// Saved game to open at startup.
    #[arg(long)]
    load: Option<PathBuf>,

    /// Ply limit for the `auto` command.
    #[arg(long, default_value_t = 400)]
    max_auto_plies: u32,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut humans = match args.play.as_str() {
        "white" => Humans::White,
        "black" => Humans::Black,
        "both" => Humans::Both,
        other => anyhow::bail!("--play takes white, black or both, not {other:?}"),
    };

    let config = load_config(&args.config);
    log::info!(
        "engine depth {} analysis {}",
        config.depth,
        config.analysis.label()
    );
    let mut session = GameSession::new(config)?;
    if let Some(path) = &args.load {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        match session.load(&text)? {
            Some(Color::White) => humans = Humans::White,
            Some(Color::Black) => humans = Humans::Black,
            None => {}
        }
    }

    let stdout = io::stdout();
    let mut app = ConsoleApp::new(
        session,
        GameMode::from(humans),
        args.config,
        args.max_auto_plies,
        stdout.lock(),
    );
    app.start()?;

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        app.prompt()?;
        let Some(line) = lines.next() else {
            break;
        };
        if !app.handle_line(&line?)? {
            break;
        }
    }
    Ok(())
}
