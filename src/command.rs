use anyhow::{anyhow, bail, Context};
use chess_core::engine::config::AnalysisMode;
use chess_core::engine::Move;
use chess_core::logic::board::{Piece, Square};
use std::path::PathBuf;
use std::str::FromStr;

/// Which sides a person plays after `restart`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Humans {
    White,
    Black,
    Both,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Board,
    Moves(Square),
    Move(Move),
    Undo,
    /// Board edit: drop a piece on a square, or empty it.
    Place(Square, Option<Piece>),
    /// Board edit: move a piece ignoring the rules.
    Relocate(Square, Square),
    Play,
    Auto,
    Restart(Option<Humans>),
    Eval,
    Depth(u8),
    Analysis(AnalysisMode),
    Randomize(usize),
    NoDraws(bool),
    Save(PathBuf),
    Load(PathBuf),
    Log,
    LogSave(PathBuf),
    Quit,
}

pub const HELP: &str = "\
commands:
  board                 show the board
  moves <sq>            legal destinations of the piece on <sq>
  e2e4 | move e2 e4     play a move
  undo                  take back one ply
  edit put <sq> <piece> place a piece (KQRBNP White, kqrbnp Black)
  edit clear <sq>       empty a square
  edit move <from> <to> move a piece anywhere; edits clear the undo history
  play                  let the engine move for the side to move
  auto                  engine plays both sides until the game ends
  restart [white|black|both]
                        new game; the sides you play (default: keep)
  eval                  static evaluation, White's view
  depth <0-9>           search depth
  analysis <0-3>        0 Simple, 1 Add Moves, 2 Add Moves Extended, 3 Add Moves Defend
  randomize <0-10>      randomization level
  nodraws <on|off>      avoid two-move repetitions
  save <file> | load <file>
  log | log save <file>
  quit";

fn path_arg(arg: Option<&str>, what: &str) -> anyhow::Result<PathBuf> {
    arg.map(PathBuf::from)
        .ok_or_else(|| anyhow!("{what} needs a file name"))
}

fn square(arg: Option<&str>, what: &str) -> anyhow::Result<Square> {
    let text = arg.ok_or_else(|| anyhow!("{what} needs a square"))?;
    Ok(text.parse()?)
}

fn edit(mut words: std::str::SplitWhitespace<'_>) -> anyhow::Result<Command> {
    let cmd = match words.next() {
        Some("put") => {
            let sq = square(words.next(), "edit put")?;
            let symbol = words
                .next()
                .ok_or_else(|| anyhow!("edit put needs a piece letter"))?;
            let piece = match symbol.chars().collect::<Vec<_>>().as_slice() {
                [c] => Piece::from_symbol(*c),
                _ => None,
            }
            .ok_or_else(|| anyhow!("unknown piece {symbol:?}"))?;
            Command::Place(sq, Some(piece))
        }
        Some("clear") => Command::Place(square(words.next(), "edit clear")?, None),
        Some("move") => Command::Relocate(
            square(words.next(), "edit move")?,
            square(words.next(), "edit move")?,
        ),
        Some(other) => bail!("edit: unknown action {other:?}"),
        None => bail!("edit needs put, clear or move"),
    };
    Ok(cmd)
}

fn number<T: FromStr>(arg: Option<&str>, what: &str) -> anyhow::Result<T> {
    let text = arg.ok_or_else(|| anyhow!("{what} needs a value"))?;
    text.parse()
        .map_err(|_| anyhow!("{what}: {text:?} is not a valid value"))
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            bail!("empty command");
        };
        if head.eq_ignore_ascii_case("edit") {
            return edit(words);
        }
        let arg = words.next();

        let cmd = match head.to_ascii_lowercase().as_str() {
            "help" | "?" => Self::Help,
            "board" | "b" => Self::Board,
            "moves" => {
                let sq = arg.ok_or_else(|| anyhow!("moves needs a square"))?;
                Self::Moves(sq.parse()?)
            }
            "move" | "m" => {
                let from = arg.ok_or_else(|| anyhow!("move needs two squares"))?;
                let text = match words.next() {
                    Some(to) => format!("{from}{to}"),
                    None => from.to_string(),
                };
                Self::Move(text.parse()?)
            }
            "undo" | "u" => Self::Undo,
            "play" | "go" => Self::Play,
            "auto" => Self::Auto,
            "restart" | "new" => Self::Restart(match arg {
                None => None,
                Some("white") => Some(Humans::White),
                Some("black") => Some(Humans::Black),
                Some("both") => Some(Humans::Both),
                Some(other) => bail!("restart: unknown side {other:?}"),
            }),
            "eval" => Self::Eval,
            "depth" => Self::Depth(number(arg, "depth")?),
            "analysis" => {
                let index: usize = number(arg, "analysis")?;
                Self::Analysis(
                    AnalysisMode::from_index(index)
                        .ok_or_else(|| anyhow!("analysis must be 0-3"))?,
                )
            }
            "randomize" => Self::Randomize(number(arg, "randomize")?),
            "nodraws" => Self::NoDraws(match arg {
                Some("on" | "true" | "1") => true,
                Some("off" | "false" | "0") => false,
                _ => bail!("nodraws takes on or off"),
            }),
            "save" => Self::Save(path_arg(arg, "save")?),
            "load" => Self::Load(path_arg(arg, "load")?),
            "log" => match arg {
                None => Self::Log,
                Some("save") => Self::LogSave(path_arg(words.next(), "log save")?),
                Some(other) => bail!("log: unknown option {other:?}"),
            },
            "quit" | "exit" | "q" => Self::Quit,
            _ => Self::Move(
                line.parse()
                    .with_context(|| format!("unknown command {head:?}"))?,
            ),
        };
        Ok(cmd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_move_and_move_command() {
        let expected = Command::Move("e2e4".parse().unwrap());
        assert_eq!("e2e4".parse::<Command>().unwrap(), expected);
        assert_eq!("move e2 e4".parse::<Command>().unwrap(), expected);
        assert_eq!("move e2e4".parse::<Command>().unwrap(), expected);
    }

    #[test]
    fn test_settings_commands() {
        assert_eq!("depth 4".parse::<Command>().unwrap(), Command::Depth(4));
        assert_eq!(
            "analysis 3".parse::<Command>().unwrap(),
            Command::Analysis(AnalysisMode::AddMovesDefend)
        );
        assert!("analysis 9".parse::<Command>().is_err());
        assert_eq!("nodraws off".parse::<Command>().unwrap(), Command::NoDraws(false));
        assert!("depth".parse::<Command>().is_err());
    }

    #[test]
    fn test_restart_and_log() {
        assert_eq!(
            "restart black".parse::<Command>().unwrap(),
            Command::Restart(Some(Humans::Black))
        );
        assert_eq!("restart".parse::<Command>().unwrap(), Command::Restart(None));
        assert_eq!(
            "log save game.txt".parse::<Command>().unwrap(),
            Command::LogSave(PathBuf::from("game.txt"))
        );
        assert!("log save".parse::<Command>().is_err());
    }

    #[test]
    fn test_edit_commands() {
        let e4: Square = "e4".parse().unwrap();
        assert_eq!(
            "edit put e4 q".parse::<Command>().unwrap(),
            Command::Place(e4, Piece::from_symbol('q'))
        );
        assert_eq!(
            "edit clear e4".parse::<Command>().unwrap(),
            Command::Place(e4, None)
        );
        assert_eq!(
            "edit move d1 e4".parse::<Command>().unwrap(),
            Command::Relocate("d1".parse().unwrap(), e4)
        );
        assert!("edit put e4 x".parse::<Command>().is_err());
        assert!("edit put e4 qq".parse::<Command>().is_err());
        assert!("edit move d1".parse::<Command>().is_err());
        assert!("edit".parse::<Command>().is_err());
    }

    #[test]
    fn test_unknown_command() {
        assert!("dance".parse::<Command>().is_err());
        assert!("".parse::<Command>().is_err());
    }
}
