//! Contract between the tournament controller and whatever actually plays
//! the matches.
//!
//! A runner accepts matches through [`MatchRunner::submit`] and reports
//! their lifecycle back as [`RunnerEvent`]s on a channel the controller
//! owns. Events for one match always arrive in the order
//! `Started → Moved* → Finished → Destroyed` (or `StartFailed → Destroyed`).

pub mod local;
#[cfg(test)]
pub(crate) mod mock;

use std::fmt;
use std::time::Duration;

use chess::{Game, GameResult};
use serde::{Deserialize, Serialize};

use crate::adjudicator::Adjudicator;
use crate::evaluation::MoveEvaluation;
use crate::opening::Opening;
use crate::output::GameRecord;
use crate::player::{BookBinding, PlayerBuilder, TimeControl};

pub use local::{LocalRunner, LocalRunnerConfig};

/// Opaque handle identifying a submitted match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MatchId(u64);

impl MatchId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Whether a submitted match waits for free capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueuePolicy {
    StartImmediately,
    Enqueue,
}

/// What happens to the players once their match is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReusePolicy {
    ReusePlayers,
    DeletePlayers,
}

/// Per-side settings of a match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SideSetup {
    pub time_control: TimeControl,
    pub book: Option<BookBinding>,
}

/// Tags stamped onto every record of a tournament.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchMetadata {
    pub event: String,
    pub site: String,
    pub event_date: Option<String>,
    pub round: u32,
}

/// A fully configured match, ready to be played.
#[derive(Debug, Clone)]
pub struct Match {
    pub id: MatchId,
    pub number: u64,
    /// Fresh board of the tournament's variant; the opening is played on it
    /// when the match starts.
    pub game: Game,
    pub opening: Opening,
    pub white: SideSetup,
    pub black: SideSetup,
    pub adjudicator: Adjudicator,
    pub metadata: MatchMetadata,
    pub start_delay: Duration,
    pub max_plies: Option<u32>,
    /// Emit a [`RunnerEvent::Moved`] after every move.
    pub report_moves: bool,
}

impl Match {
    /// Build the persisted record of this match in its current state.
    pub fn record(
        &self,
        white_name: &str,
        black_name: &str,
        game: &Game,
        evals: &[MoveEvaluation],
        result: GameResult,
    ) -> GameRecord {
        let mut record = GameRecord {
            number: self.number,
            event: self.metadata.event.clone(),
            site: self.metadata.site.clone(),
            event_date: self.metadata.event_date.clone(),
            round: self.metadata.round,
            white: white_name.to_string(),
            black: black_name.to_string(),
            start_fen: String::new(),
            moves: Vec::new(),
            result,
        };
        record.set_moves(game, evals);
        record
    }
}

/// Lifecycle notifications from a runner.
#[derive(Debug, Clone)]
#[allow(clippy::large_enum_variant)]
pub enum RunnerEvent {
    /// Capacity is available for another match.
    Ready,
    Started {
        id: MatchId,
        white_name: String,
        black_name: String,
    },
    Moved {
        id: MatchId,
        record: GameRecord,
    },
    Finished {
        id: MatchId,
        result: GameResult,
        record: GameRecord,
    },
    StartFailed {
        id: MatchId,
        error: String,
    },
    /// All resources of the match have been released.
    Destroyed {
        id: MatchId,
    },
}

/// Plays matches on behalf of the controller.
pub trait MatchRunner: Send {
    fn submit(
        &mut self,
        game: Match,
        white: PlayerBuilder,
        black: PlayerBuilder,
        enqueue: EnqueuePolicy,
        reuse: ReusePolicy,
    );

    /// Ask a running match to stop. Termination is reported asynchronously
    /// through the usual `Finished`/`Destroyed` events.
    fn stop_match(&mut self, id: MatchId);

    /// Free resources kept around for players that are no longer playing.
    fn release_idle_resources(&mut self);
}
