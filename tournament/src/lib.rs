//! Round-robin tournament orchestration.
//!
//! [`PairingScheduler`] decides who plays whom, an [`Adjudicator`] watches
//! every match, and the controller actor launches matches through a
//! [`MatchRunner`], accounts for their results, and keeps the persisted
//! output in order.

pub mod adjudicator;
pub mod controller;
pub mod engine_config;
pub mod error;
pub mod evaluation;
pub mod opening;
pub mod oracle;
pub mod output;
pub mod pairing;
pub mod player;
pub mod runner;
pub mod settings;

pub use adjudicator::{Adjudicator, BoardSnapshot};
pub use controller::{
    TournamentBuilder, TournamentConfig, TournamentEvent, TournamentHandle, TournamentPhase,
    TournamentSnapshot,
};
pub use engine_config::{EngineConfiguration, EngineOption, RestartMode};
pub use error::{TournamentError, TournamentResult};
pub use evaluation::MoveEvaluation;
pub use opening::{Opening, OpeningError, OpeningHistory, OpeningSource, OpeningSuite};
pub use oracle::{DecisionOracle, OracleResult, OracleStatus};
pub use output::{
    read_records, GameRecord, JsonLinesSink, LiveOutput, OrderedOutput, OutputError, OutputMode,
    RecordSink,
};
pub use pairing::{Pairing, PairingScheduler};
pub use player::{BookBinding, Player, PlayerBuilder, PlayerStanding, TimeControl};
pub use runner::{
    EnqueuePolicy, LocalRunner, LocalRunnerConfig, Match, MatchId, MatchRunner, ReusePolicy,
    RunnerEvent,
};
pub use settings::{SettingsError, TournamentSettings};
