//! Game outcomes.

use serde::{Deserialize, Serialize};

use crate::types::Side;

/// How a game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultKind {
    /// Checkmate or other over-the-board win.
    Win,
    /// Stalemate, fifty-move rule, insufficient material, agreement.
    Draw,
    Resignation,
    Timeout,
    /// Terminated by a rule engine (draw/resign rules, tablebases, move limit).
    Adjudication,
    IllegalMove,
    /// A player's connection went away.
    Disconnection,
    /// A player stopped responding.
    StalledConnection,
    /// Game stopped without a result (interrupted).
    NoResult,
    /// The result could not be determined.
    Error,
}

/// Final (or provisional) result of a game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameResult {
    pub kind: ResultKind,
    pub winner: Option<Side>,
    #[serde(default)]
    pub reason: String,
}

impl GameResult {
    pub fn new(kind: ResultKind, winner: Option<Side>, reason: impl Into<String>) -> Self {
        Self {
            kind,
            winner,
            reason: reason.into(),
        }
    }

    pub fn win(winner: Side, reason: impl Into<String>) -> Self {
        Self::new(ResultKind::Win, Some(winner), reason)
    }

    pub fn draw(reason: impl Into<String>) -> Self {
        Self::new(ResultKind::Draw, None, reason)
    }

    pub fn adjudication(winner: Option<Side>, reason: impl Into<String>) -> Self {
        Self::new(ResultKind::Adjudication, winner, reason)
    }

    pub fn none() -> Self {
        Self::new(ResultKind::NoResult, None, "")
    }

    pub fn is_none(&self) -> bool {
        self.kind == ResultKind::NoResult
    }

    /// A finished game with no winner that is not an error or interruption.
    pub fn is_draw(&self) -> bool {
        self.winner.is_none() && !matches!(self.kind, ResultKind::NoResult | ResultKind::Error)
    }

    pub fn is_decisive(&self) -> bool {
        self.winner.is_some()
    }

    /// Result connected to the player's transport rather than the board.
    pub fn is_connection_failure(&self) -> bool {
        matches!(
            self.kind,
            ResultKind::Disconnection | ResultKind::StalledConnection
        )
    }

    /// Short score notation: `1-0`, `0-1`, `1/2-1/2` or `*`.
    pub fn score_text(&self) -> &'static str {
        match self.winner {
            Some(Side::White) => "1-0",
            Some(Side::Black) => "0-1",
            None if self.is_draw() => "1/2-1/2",
            None => "*",
        }
    }
}

impl Default for GameResult {
    fn default() -> Self {
        Self::none()
    }
}

impl std::fmt::Display for GameResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.reason.is_empty() {
            write!(f, "{}", self.score_text())
        } else {
            write!(f, "{} {{{}}}", self.score_text(), self.reason)
        }
    }
}
