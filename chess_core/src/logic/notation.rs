use crate::logic::game::{SpecialMove, UndoRecord};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Log text for one ply: `e2 e4`, `d4xe5`, `e1 g1*`. The `x` marks a piece
/// standing on the destination, so en passant reads `e5 d6*`.
pub fn log_entry(record: &UndoRecord) -> String {
    let sep = if record.captured.is_empty() { ' ' } else { 'x' };
    let mark = if record.special == SpecialMove::None {
        ""
    } else {
        "*"
    };
    format!("{}{sep}{}{mark}", record.from, record.to)
}

/// One entry per ply, in play order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveLog {
    entries: Vec<String>,
}

impl MoveLog {
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, entry: String) {
        self.entries.push(entry);
    }

    pub fn pop(&mut self) -> Option<String> {
        self.entries.pop()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn from_entries(entries: Vec<String>) -> Self {
        Self { entries }
    }
}

/// Numbered rendering, one full move per line: `1. e2 e4  e7 e5`.
impl fmt::Display for MoveLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (n, pair) in self.entries.chunks(2).enumerate() {
            if n > 0 {
                writeln!(f)?;
            }
            write!(f, "{}. {}", n + 1, pair.join("  "))?;
        }
        Ok(())
    }
}
