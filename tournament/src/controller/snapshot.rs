use serde::Serialize;

use crate::player::PlayerStanding;

/// Lifecycle phase of a tournament.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TournamentPhase {
    Idle,
    Running,
    Stopping,
    Finished,
}

/// Complete, immutable snapshot of tournament state.
#[derive(Debug, Clone, Serialize)]
pub struct TournamentSnapshot {
    pub run_id: String,
    pub name: String,
    pub phase: TournamentPhase,
    pub round: u32,
    /// Matches launched so far, including resumed ones.
    pub started_count: u64,
    pub finished_count: u64,
    pub final_count: u64,
    pub saved_count: u64,
    pub in_flight: usize,
    pub error: Option<String>,
    /// Roster order.
    pub standings: Vec<PlayerStanding>,
}

impl TournamentSnapshot {
    pub fn is_finished(&self) -> bool {
        self.phase == TournamentPhase::Finished
    }

    /// Standings sorted by points, best first. Ties keep roster order.
    pub fn ranking(&self) -> Vec<PlayerStanding> {
        let mut ranking = self.standings.clone();
        ranking.sort_by(|a, b| b.points().total_cmp(&a.points()));
        ranking
    }
}
