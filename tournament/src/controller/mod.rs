//! The tournament controller: an actor task that owns the roster, the
//! pairing schedule and all counters, and drives a [`MatchRunner`].
//!
//! Commands arrive through a [`TournamentHandle`]; runner events arrive on
//! the runner's channel. Both are handled one at a time by the actor, so the
//! state needs no locking.

pub mod actor;
pub mod commands;
pub mod events;
pub mod handle;
pub mod snapshot;
pub(crate) mod state;

use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, watch};

use crate::adjudicator::Adjudicator;
use crate::opening::OpeningSource;
use crate::oracle::DecisionOracle;
use crate::output::{LiveOutput, OrderedOutput, OutputMode, RecordSink};
use crate::player::Player;
use crate::runner::{LocalRunner, LocalRunnerConfig, MatchRunner, RunnerEvent};
use actor::run_tournament_actor;
pub use events::TournamentEvent;
pub use handle::TournamentHandle;
pub use snapshot::{TournamentPhase, TournamentSnapshot};
use state::TournamentState;

/// Tournament-wide settings that shape every match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TournamentConfig {
    pub name: String,
    pub site: String,
    pub event_date: Option<String>,
    pub variant: String,
    pub games_per_encounter: u32,
    pub round_multiplier: u32,
    /// Keep going after a disconnection or stalled connection.
    pub recover: bool,
    /// Replay an encounter's opening in its color-reversed rematch.
    pub repeat_openings: bool,
    /// Maximum opening length in plies.
    pub opening_depth: usize,
    pub start_delay: Duration,
    pub max_plies: Option<u32>,
}

impl Default for TournamentConfig {
    fn default() -> Self {
        Self {
            name: "Tournament".to_string(),
            site: "?".to_string(),
            event_date: None,
            variant: chess::STANDARD_VARIANT.to_string(),
            games_per_encounter: 1,
            round_multiplier: 1,
            recover: false,
            repeat_openings: false,
            opening_depth: 1024,
            start_delay: Duration::ZERO,
            max_plies: None,
        }
    }
}

/// Collects the roster and collaborators of a tournament, then spawns its
/// actor.
pub struct TournamentBuilder {
    config: TournamentConfig,
    players: Vec<Player>,
    adjudicator: Adjudicator,
    openings: Option<Box<dyn OpeningSource>>,
    oracle: Option<Box<dyn DecisionOracle>>,
    output: Option<OrderedOutput>,
    resume_path: Option<PathBuf>,
    live_output: Option<LiveOutput>,
}

impl TournamentBuilder {
    pub fn new(config: TournamentConfig) -> Self {
        Self {
            config,
            players: Vec::new(),
            adjudicator: Adjudicator::default(),
            openings: None,
            oracle: None,
            output: None,
            resume_path: None,
            live_output: None,
        }
    }

    pub fn config(&self) -> &TournamentConfig {
        &self.config
    }

    /// Players keep the index of the order they were added in.
    pub fn add_player(mut self, player: Player) -> Self {
        self.players.push(player);
        self
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Template cloned into every match.
    pub fn adjudicator(mut self, adjudicator: Adjudicator) -> Self {
        self.adjudicator = adjudicator;
        self
    }

    pub fn openings(mut self, source: Box<dyn OpeningSource>) -> Self {
        self.openings = Some(source);
        self
    }

    pub fn oracle(mut self, oracle: Box<dyn DecisionOracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    /// Persist finished matches, in sequence-number order.
    pub fn output(mut self, sink: Box<dyn RecordSink>, mode: OutputMode) -> Self {
        self.output = Some(OrderedOutput::new(sink, mode));
        self
    }

    /// File holding the records of a previous run, read when resuming.
    pub fn resume_from(mut self, path: PathBuf) -> Self {
        self.resume_path = Some(path);
        self
    }

    pub fn live_output(mut self, live: LiveOutput) -> Self {
        self.live_output = Some(live);
        self
    }

    pub(crate) fn into_state(self, runner: Box<dyn MatchRunner>) -> TournamentState {
        let mut state = TournamentState::new(self.config, runner);
        state.players = self.players;
        state.adjudicator = self.adjudicator;
        state.openings = self.openings;
        state.oracle = self.oracle;
        state.output = self.output;
        state.resume_path = self.resume_path;
        state.live_output = self.live_output;
        state
    }

    /// Spawn the tournament actor on the current tokio runtime. The
    /// tournament stays idle until [`TournamentHandle::start`].
    pub fn spawn<R: MatchRunner + 'static>(
        self,
        runner: R,
        runner_events: mpsc::UnboundedReceiver<RunnerEvent>,
    ) -> TournamentHandle {
        let state = self.into_state(Box::new(runner));
        let id = state.run_id.to_string();

        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let (event_tx, _) = broadcast::channel(100);
        let (done_tx, done_rx) = watch::channel(None);

        tokio::spawn(run_tournament_actor(
            state,
            cmd_rx,
            runner_events,
            event_tx,
            done_tx,
        ));

        TournamentHandle::new(id, cmd_tx, done_rx)
    }

    /// Spawn the tournament on an in-process [`LocalRunner`].
    pub fn spawn_local(self, config: LocalRunnerConfig) -> TournamentHandle {
        let (runner, events) = LocalRunner::new(config);
        self.spawn(runner, events)
    }
}
