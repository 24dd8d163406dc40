//! Error types for the tournament core.

use crate::runner::MatchId;

pub type TournamentResult<T> = Result<T, TournamentError>;

#[derive(Debug, Clone, thiserror::Error)]
pub enum TournamentError {
    #[error("A tournament needs at least two players, got {0}")]
    NotEnoughPlayers(usize),
    #[error("Invalid adjudication threshold: {0}")]
    InvalidThreshold(String),
    #[error("Invalid tournament setting: {0}")]
    InvalidSetting(String),
    #[error("Tournament already started")]
    AlreadyStarted,
    #[error("Cannot resume: {0}")]
    Resume(String),
    #[error("Match {0} is not tracked by the tournament")]
    UntrackedMatch(MatchId),
    #[error("Match failed to start: {0}")]
    StartFailed(String),
    #[error("Tournament actor closed")]
    ActorClosed,
}
