use serde::{Deserialize, Serialize};

pub const MAX_DEPTH: u8 = 9;
pub const MAX_WEIGHT: i32 = 1000;

/// The randomization amplitudes offered to the user, weakest first.
pub const RANDOMIZE_LEVELS: [i32; 11] = [0, 1, 5, 10, 25, 100, 200, 1000, 2000, 10000, 100000];

/// Which evaluation terms are summed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AnalysisMode {
    /// Material only.
    Simple,
    /// Material and mobility.
    #[default]
    AddMoves,
    /// Material, mobility and attacked enemy pieces.
    AddMovesExtended,
    /// Material, mobility and defended own pieces.
    AddMovesDefend,
}

impl AnalysisMode {
    pub const ALL: [Self; 4] = [
        Self::Simple,
        Self::AddMoves,
        Self::AddMovesExtended,
        Self::AddMovesDefend,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Simple => "Simple",
            Self::AddMoves => "Add Moves",
            Self::AddMovesExtended => "Add Moves Extended",
            Self::AddMovesDefend => "Add Moves Defend",
        }
    }

    pub const fn uses_mobility(self) -> bool {
        !matches!(self, Self::Simple)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // Search
    pub depth: u8,
    pub no_draws: bool,

    // Evaluation weights, milli-pawns per unit
    pub analysis: AnalysisMode,
    pub score_piece: i32,
    pub score_move: i32,
    pub score_attack: i32,
    pub score_attack_indirect: i32,

    // Noise added to every evaluation
    pub randomize: i32,
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            depth: 3,
            no_draws: true,

            analysis: AnalysisMode::AddMoves,
            score_piece: 1000,
            score_move: 10,
            score_attack: 30,
            score_attack_indirect: 20,

            randomize: 10,
            seed: None,
        }
    }
}

impl EngineConfig {
    /// Parses JSON, filling absent fields with defaults and clamping the rest.
    pub fn load_from_json(json_str: &str) -> Result<Self, serde_json::Error> {
        let config: Self = serde_json::from_str(json_str)?;
        Ok(config.sanitized())
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Brings every field into range: depth 0-9, weights 0-1000 and
    /// `randomize` snapped down to the nearest offered level.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        if self.depth > MAX_DEPTH {
            log::warn!("depth {} clamped to {MAX_DEPTH}", self.depth);
            self.depth = MAX_DEPTH;
        }
        for weight in [
            &mut self.score_piece,
            &mut self.score_move,
            &mut self.score_attack,
            &mut self.score_attack_indirect,
        ] {
            *weight = (*weight).clamp(0, MAX_WEIGHT);
        }
        self.randomize = RANDOMIZE_LEVELS
            .get(self.randomize_level())
            .copied()
            .unwrap_or(0);
        self
    }

    /// Index into `RANDOMIZE_LEVELS` of the largest level not above `randomize`.
    pub fn randomize_level(&self) -> usize {
        RANDOMIZE_LEVELS
            .iter()
            .rposition(|&level| level <= self.randomize)
            .unwrap_or(0)
    }

    /// Returns false and leaves the config alone for an out-of-range level.
    pub fn set_randomize_level(&mut self, level: usize) -> bool {
        match RANDOMIZE_LEVELS.get(level) {
            Some(&value) => {
                self.randomize = value;
                true
            }
            None => false,
        }
    }

    pub fn set_depth(&mut self, depth: u8) {
        self.depth = depth.min(MAX_DEPTH);
    }
}
