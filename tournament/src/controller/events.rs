use chess::GameResult;

use super::snapshot::TournamentSnapshot;

/// Events broadcast from the tournament actor to all subscribers.
#[derive(Debug, Clone)]
pub enum TournamentEvent {
    MatchStarted {
        number: u64,
        white: String,
        black: String,
    },
    MatchFinished {
        number: u64,
        white_index: usize,
        black_index: usize,
        result: GameResult,
    },
    /// The last match is torn down, or the tournament was stopped.
    Finished(TournamentSnapshot),
    /// An internal invariant was violated; the actor has exited.
    Aborted(String),
}
