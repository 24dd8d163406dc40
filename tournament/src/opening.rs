//! Opening selection: configured opening sources and the replay history
//! that gives a color-reversed rematch the same opening.

use std::collections::HashMap;
use std::path::Path;

use chess::Game;
use serde::{Deserialize, Serialize};

/// Starting position plus the forced opening moves (UCI notation).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Opening {
    /// `None` means the variant's standard start position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fen: Option<String>,
    #[serde(default)]
    pub moves: Vec<String>,
}

impl Opening {
    pub fn is_empty(&self) -> bool {
        self.fen.is_none() && self.moves.is_empty()
    }

    /// Play the opening on a fresh board. Fails if the position or any move
    /// is invalid.
    pub fn apply(&self, board: Game) -> Result<Game, chess::GameError> {
        let mut game = match &self.fen {
            Some(fen) => Game::from_fen(fen)?,
            None => board,
        };
        for mv in &self.moves {
            game.play_uci(mv)?;
        }
        Ok(game)
    }
}

/// Supplies openings for new matches.
pub trait OpeningSource: Send {
    /// The next opening, truncated to at most `max_plies` moves.
    fn next_game(&mut self, max_plies: usize) -> Opening;
}

#[derive(Debug, thiserror::Error)]
pub enum OpeningError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Opening file has no openings")]
    Empty,
}

/// Openings served in file order, wrapping around at the end.
///
/// Each non-empty line is either `<fen> ; <uci moves>` or just
/// `<uci moves>`. Lines starting with `#` are comments.
#[derive(Debug, Clone)]
pub struct OpeningSuite {
    openings: Vec<Opening>,
    next: usize,
}

impl OpeningSuite {
    pub fn new(openings: Vec<Opening>) -> Result<Self, OpeningError> {
        if openings.is_empty() {
            return Err(OpeningError::Empty);
        }
        Ok(Self { openings, next: 0 })
    }

    pub fn from_file(path: &Path) -> Result<Self, OpeningError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, OpeningError> {
        let openings = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(parse_line)
            .collect();
        Self::new(openings)
    }

    pub fn len(&self) -> usize {
        self.openings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.openings.is_empty()
    }
}

fn parse_line(line: &str) -> Opening {
    let (fen, moves) = match line.split_once(';') {
        Some((fen, moves)) => (Some(fen.trim().to_string()), moves),
        None => (None, line),
    };
    Opening {
        fen: fen.filter(|f| !f.is_empty()),
        moves: moves.split_whitespace().map(str::to_string).collect(),
    }
}

impl OpeningSource for OpeningSuite {
    fn next_game(&mut self, max_plies: usize) -> Opening {
        let mut opening = self.openings[self.next].clone();
        self.next = (self.next + 1) % self.openings.len();
        opening.moves.truncate(max_plies);
        opening
    }
}

/// Openings already played, waiting for their color-reversed rematch.
///
/// Keyed by `(first white, first black)`. A rematch looks up the reversed
/// pair and consumes the entry, so an opening is replayed at most once.
#[derive(Debug, Clone, Default)]
pub struct OpeningHistory {
    entries: HashMap<(String, String), Opening>,
}

impl OpeningHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember the opening `white` and `black` just started with.
    pub fn record(&mut self, white: &str, black: &str, opening: Opening) {
        self.entries
            .insert((white.to_string(), black.to_string()), opening);
    }

    /// Opening to replay when `white` meets `black` after having had the
    /// other colors. Removes the entry.
    pub fn take_rematch(&mut self, white: &str, black: &str) -> Option<Opening> {
        self.entries
            .remove(&(black.to_string(), white.to_string()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
