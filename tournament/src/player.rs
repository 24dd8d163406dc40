//! Roster entries and per-player standings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::engine_config::EngineConfiguration;

/// Creates a player for a match. The runner uses it to spawn or reuse a
/// competitor; the tournament only reads and updates its display name.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerBuilder {
    config: EngineConfiguration,
}

impl PlayerBuilder {
    pub fn new(config: EngineConfiguration) -> Self {
        Self { config }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Engines may report a different name once connected.
    pub fn set_name(&mut self, name: &str) {
        self.config.name = name.to_string();
    }

    pub fn config(&self) -> &EngineConfiguration {
        &self.config
    }
}

/// Time control in `moves/seconds+increment` form, or `inf`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeControl {
    /// Moves per period; 0 means the whole game.
    #[serde(default)]
    pub moves: u32,
    #[serde(default)]
    pub base_ms: u64,
    #[serde(default)]
    pub increment_ms: u64,
    #[serde(default)]
    pub infinite: bool,
}

impl TimeControl {
    pub fn infinite() -> Self {
        Self {
            infinite: true,
            ..Default::default()
        }
    }

    pub fn is_valid(&self) -> bool {
        self.infinite || self.base_ms > 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid time control: {0}")]
pub struct TimeControlParseError(String);

impl FromStr for TimeControl {
    type Err = TimeControlParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == "inf" || s == "infinite" {
            return Ok(Self::infinite());
        }
        let err = || TimeControlParseError(s.to_string());

        let (moves, rest) = match s.split_once('/') {
            Some((moves, rest)) => (moves.parse::<u32>().map_err(|_| err())?, rest),
            None => (0, s),
        };
        let (base, inc) = match rest.split_once('+') {
            Some((base, inc)) => (base, Some(inc)),
            None => (rest, None),
        };

        let seconds_to_ms = |text: &str| -> Result<u64, TimeControlParseError> {
            let secs: f64 = text.parse().map_err(|_| err())?;
            if !secs.is_finite() || secs < 0.0 {
                return Err(err());
            }
            Ok((secs * 1000.0).round() as u64)
        };

        let tc = Self {
            moves,
            base_ms: seconds_to_ms(base)?,
            increment_ms: inc.map(seconds_to_ms).transpose()?.unwrap_or(0),
            infinite: false,
        };
        if tc.is_valid() {
            Ok(tc)
        } else {
            Err(err())
        }
    }
}

impl fmt::Display for TimeControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.infinite {
            return write!(f, "inf");
        }
        if self.moves > 0 {
            write!(f, "{}/", self.moves)?;
        }
        write!(f, "{}", self.base_ms as f64 / 1000.0)?;
        if self.increment_ms > 0 {
            write!(f, "+{}", self.increment_ms as f64 / 1000.0)?;
        }
        Ok(())
    }
}

/// Opening book binding for one player. The book format itself belongs to
/// the match runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookBinding {
    pub path: String,
    /// Maximum book depth in plies.
    pub depth: u32,
}

/// A roster entry. Its index in the roster never changes.
#[derive(Debug, Clone)]
pub struct Player {
    pub builder: PlayerBuilder,
    pub time_control: TimeControl,
    pub book: Option<BookBinding>,
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
}

impl Player {
    pub fn new(builder: PlayerBuilder, time_control: TimeControl) -> Self {
        Self {
            builder,
            time_control,
            book: None,
            wins: 0,
            losses: 0,
            draws: 0,
        }
    }

    pub fn with_book(mut self, book: BookBinding) -> Self {
        self.book = Some(book);
        self
    }

    pub fn name(&self) -> &str {
        self.builder.name()
    }

    pub fn standing(&self, index: usize) -> PlayerStanding {
        PlayerStanding {
            index,
            name: self.name().to_string(),
            wins: self.wins,
            losses: self.losses,
            draws: self.draws,
        }
    }
}

/// Cumulative results of one player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStanding {
    pub index: usize,
    pub name: String,
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
}

impl PlayerStanding {
    pub fn games(&self) -> u32 {
        self.wins + self.losses + self.draws
    }

    /// Win = 1, draw = 1/2.
    pub fn points(&self) -> f64 {
        self.wins as f64 + self.draws as f64 / 2.0
    }

    /// Points as a percentage of games played.
    pub fn score_percent(&self) -> f64 {
        match self.games() {
            0 => 0.0,
            games => self.points() * 100.0 / games as f64,
        }
    }
}
