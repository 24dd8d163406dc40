use std::collections::HashMap;
use std::path::PathBuf;

use chess::{Game, GameResult, Side};
use uuid::Uuid;

use super::events::TournamentEvent;
use super::snapshot::{TournamentPhase, TournamentSnapshot};
use super::TournamentConfig;
use crate::adjudicator::Adjudicator;
use crate::error::{TournamentError, TournamentResult};
use crate::opening::{Opening, OpeningHistory, OpeningSource};
use crate::oracle::{DecisionOracle, OracleResult, OracleStatus};
use crate::output::{read_records, GameRecord, LiveOutput, OrderedOutput};
use crate::pairing::PairingScheduler;
use crate::player::Player;
use crate::runner::{
    EnqueuePolicy, Match, MatchId, MatchMetadata, MatchRunner, ReusePolicy, SideSetup,
};

/// A launched match that has not finished yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct MatchRecord {
    pub number: u64,
    pub white: usize,
    pub black: usize,
}

/// Follow-up work a handler wants run on a later turn of the event loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub(crate) enum Deferred {
    Stop,
}

/// Internal mutable state, owned entirely by the tournament actor. No locks.
pub(crate) struct TournamentState {
    pub run_id: Uuid,
    pub config: TournamentConfig,
    pub players: Vec<Player>,
    pub adjudicator: Adjudicator,
    pub openings: Option<Box<dyn OpeningSource>>,
    pub oracle: Option<Box<dyn DecisionOracle>>,
    pub output: Option<OrderedOutput>,
    /// Where previously persisted records are re-read from on resume.
    pub resume_path: Option<PathBuf>,
    pub live_output: Option<LiveOutput>,
    runner: Box<dyn MatchRunner>,
    scheduler: Option<PairingScheduler>,
    opening_history: OpeningHistory,
    in_flight: HashMap<MatchId, MatchRecord>,
    phase: TournamentPhase,
    next_number: u64,
    finished_count: u64,
    final_count: u64,
    last_match: Option<MatchId>,
    stop_pending: bool,
    error: Option<String>,
    events: Vec<TournamentEvent>,
}

impl TournamentState {
    pub fn new(config: TournamentConfig, runner: Box<dyn MatchRunner>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            config,
            players: Vec::new(),
            adjudicator: Adjudicator::default(),
            openings: None,
            oracle: None,
            output: None,
            resume_path: None,
            live_output: None,
            runner,
            scheduler: None,
            opening_history: OpeningHistory::new(),
            in_flight: HashMap::new(),
            phase: TournamentPhase::Idle,
            next_number: 0,
            finished_count: 0,
            final_count: 0,
            last_match: None,
            stop_pending: false,
            error: None,
            events: Vec::new(),
        }
    }

    pub fn phase(&self) -> TournamentPhase {
        self.phase
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Events produced since the last call, in order.
    pub fn take_events(&mut self) -> Vec<TournamentEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn snapshot(&self) -> TournamentSnapshot {
        TournamentSnapshot {
            run_id: self.run_id.to_string(),
            name: self.config.name.clone(),
            phase: self.phase,
            round: self
                .scheduler
                .as_ref()
                .map_or(0, PairingScheduler::current_round),
            started_count: self.next_number,
            finished_count: self.finished_count,
            final_count: self.final_count,
            saved_count: self.output.as_ref().map_or(0, OrderedOutput::saved_count),
            in_flight: self.in_flight.len(),
            error: self.error.clone(),
            standings: self
                .players
                .iter()
                .enumerate()
                .map(|(i, p)| p.standing(i))
                .collect(),
        }
    }

    /// Reset all counters and begin launching matches. With `resume > 0`
    /// the first `resume` pairings are replayed without being played.
    pub fn start(&mut self, resume: u64) -> TournamentResult<()> {
        if self.phase != TournamentPhase::Idle {
            return Err(TournamentError::AlreadyStarted);
        }
        let scheduler = PairingScheduler::new(self.players.len())?;
        if self.config.games_per_encounter == 0 || self.config.round_multiplier == 0 {
            return Err(TournamentError::InvalidSetting(
                "games per encounter and round multiplier must be positive".to_string(),
            ));
        }
        if !Game::supports_variant(&self.config.variant) {
            return Err(TournamentError::InvalidSetting(format!(
                "unsupported variant {}",
                self.config.variant
            )));
        }

        self.final_count = scheduler.games_per_cycle()
            * u64::from(self.config.games_per_encounter)
            * u64::from(self.config.round_multiplier);
        if resume > self.final_count {
            return Err(TournamentError::Resume(format!(
                "match {} is past the last match {}",
                resume, self.final_count
            )));
        }

        self.scheduler = Some(scheduler);
        self.next_number = 0;
        self.finished_count = 0;
        self.last_match = None;
        self.stop_pending = false;
        self.error = None;
        self.in_flight.clear();
        self.opening_history.clear();
        if let Some(output) = self.output.as_mut() {
            output.reset();
        }
        for player in &mut self.players {
            player.wins = 0;
            player.losses = 0;
            player.draws = 0;
        }

        tracing::info!(
            players = self.players.len(),
            matches = self.final_count,
            resume,
            "Starting tournament"
        );

        let oracle_decided = if resume > 0 {
            self.fast_forward(resume)?
        } else {
            false
        };

        self.phase = TournamentPhase::Running;

        if oracle_decided {
            tracing::info!("Decision oracle already decided on resumed results");
            self.stop();
        } else if self.finished_count == self.final_count {
            self.finish();
        } else {
            self.start_next_match();
        }
        Ok(())
    }

    /// Replay `count` pairings as if their matches had already finished.
    /// Returns whether the decision oracle reached a decision on the
    /// restored results.
    fn fast_forward(&mut self, count: u64) -> TournamentResult<bool> {
        let records = match &self.resume_path {
            Some(path) => read_records(path, count as usize)
                .map_err(|e| TournamentError::Resume(e.to_string()))?,
            None => Vec::new(),
        };
        if self.resume_path.is_some() && (records.len() as u64) < count {
            return Err(TournamentError::Resume(format!(
                "output has {} records, expected {}",
                records.len(),
                count
            )));
        }

        let mut decided = false;
        for (i, record) in (0..count as usize).map(|i| (i, records.get(i))) {
            let Some(pairing) = self.scheduler.as_mut().map(PairingScheduler::next_pair) else {
                break;
            };
            let (white, black) = (pairing.white, pairing.black);
            if self.openings.is_some() {
                // Only the opening history side effect is needed here.
                let _ = self.select_opening(white, black);
            }
            self.next_number += 1;
            self.finished_count += 1;

            if let Some(record) = record {
                check_resumed_record(i as u64 + 1, record, &self.players, white, black)?;
                decided |= self.apply_result(white, black, &record.result);
            }
        }

        if let Some(output) = self.output.as_mut() {
            output.skip_saved(count);
        }
        tracing::info!(skipped = count, restored = records.len(), "Resumed tournament");
        Ok(decided)
    }

    /// Launch the next scheduled match if the tournament still wants one.
    pub fn start_next_match(&mut self) {
        if self.phase != TournamentPhase::Running
            || self.stop_pending
            || self.next_number >= self.final_count
        {
            return;
        }
        let Some(pairing) = self.scheduler.as_mut().map(PairingScheduler::next_pair) else {
            return;
        };
        let (white, black) = (pairing.white, pairing.black);

        let game = match Game::for_variant(&self.config.variant) {
            Ok(game) => game,
            Err(e) => {
                tracing::error!("Can't create board: {}", e);
                self.error = Some(e.to_string());
                self.stop();
                return;
            }
        };
        let opening = self.select_opening(white, black);

        self.next_number += 1;
        let number = self.next_number;
        let id = MatchId::new(number);

        let game = Match {
            id,
            number,
            game,
            opening,
            white: side_setup(&self.players[white]),
            black: side_setup(&self.players[black]),
            adjudicator: self.adjudicator.clone(),
            metadata: MatchMetadata {
                event: self.config.name.clone(),
                site: self.config.site.clone(),
                event_date: self.config.event_date.clone(),
                round: pairing.round,
            },
            start_delay: self.config.start_delay,
            max_plies: self.config.max_plies,
            report_moves: self.live_output.is_some(),
        };
        self.in_flight.insert(id, MatchRecord { number, white, black });

        tracing::info!(
            number,
            round = pairing.round,
            white = self.players[white].name(),
            black = self.players[black].name(),
            "Launching match"
        );
        self.runner.submit(
            game,
            self.players[white].builder.clone(),
            self.players[black].builder.clone(),
            EnqueuePolicy::Enqueue,
            ReusePolicy::ReusePlayers,
        );
    }

    /// Choose the opening for `white` vs `black`: the replayed opening of
    /// their previous encounter with reversed colors, or the next one from
    /// the opening source.
    fn select_opening(&mut self, white: usize, black: usize) -> Opening {
        let white_name = self.players[white].name().to_string();
        let black_name = self.players[black].name().to_string();

        if let Some(opening) = self.opening_history.take_rematch(&white_name, &black_name) {
            return opening;
        }
        let opening = self
            .openings
            .as_mut()
            .map(|source| source.next_game(self.config.opening_depth))
            .unwrap_or_default();
        if self.config.repeat_openings {
            self.opening_history
                .record(&white_name, &black_name, opening.clone());
        }
        opening
    }

    pub fn on_started(&mut self, id: MatchId, white_name: String, black_name: String) {
        let Some(entry) = self.in_flight.get(&id).copied() else {
            tracing::warn!(%id, "Start reported for an untracked match");
            return;
        };
        self.players[entry.white].builder.set_name(&white_name);
        self.players[entry.black].builder.set_name(&black_name);

        tracing::info!(number = entry.number, white = %white_name, black = %black_name, "Match started");
        self.events.push(TournamentEvent::MatchStarted {
            number: entry.number,
            white: white_name,
            black: black_name,
        });
    }

    pub fn on_moved(&mut self, id: MatchId, record: &GameRecord) {
        if !self.in_flight.contains_key(&id) {
            return;
        }
        if let Some(live) = &self.live_output {
            if let Err(e) = live.write(record) {
                tracing::warn!(%id, "Can't write live output: {}", e);
            }
        }
    }

    /// Account for a finished match exactly once. A finish for a match this
    /// tournament never launched is an invariant violation.
    pub fn on_finished(
        &mut self,
        id: MatchId,
        result: GameResult,
        mut record: GameRecord,
    ) -> TournamentResult<Option<Deferred>> {
        self.finished_count += 1;

        let entry = self
            .in_flight
            .remove(&id)
            .ok_or(TournamentError::UntrackedMatch(id))?;
        let mut deferred = None;

        tracing::info!(
            number = entry.number,
            white = self.players[entry.white].name(),
            black = self.players[entry.black].name(),
            "Match finished: {}",
            result
        );
        let oracle_decided = self.apply_result(entry.white, entry.black, &result);

        record.number = entry.number;
        if let Some(live) = &self.live_output {
            if let Err(e) = live.write(&record) {
                tracing::warn!(%id, "Can't write live output: {}", e);
            }
        }
        if let Some(output) = self.output.as_mut() {
            output.push(record);
        }

        if result.is_connection_failure() && !self.config.recover {
            tracing::warn!(number = entry.number, "Connection failure, stopping tournament");
            deferred = Some(Deferred::Stop);
        }
        if oracle_decided {
            tracing::info!("Decision oracle reached a decision, stopping tournament");
            deferred = Some(Deferred::Stop);
        }
        if deferred.is_some() {
            self.stop_pending = true;
        }

        self.events.push(TournamentEvent::MatchFinished {
            number: entry.number,
            white_index: entry.white,
            black_index: entry.black,
            result,
        });

        if self.finished_count == self.final_count
            || (self.phase == TournamentPhase::Stopping && self.in_flight.is_empty())
        {
            tracing::debug!(%id, "Waiting for the last match to be torn down");
            self.last_match = Some(id);
        }
        Ok(deferred)
    }

    pub fn on_start_failed(&mut self, id: MatchId, error: String) {
        tracing::error!(%id, "Match failed to start: {}", error);
        self.in_flight.remove(&id);
        self.error = Some(error);
        if self.phase == TournamentPhase::Stopping && self.in_flight.is_empty() {
            tracing::debug!(%id, "Waiting for the failed match to be torn down");
            self.last_match = Some(id);
        } else {
            self.stop();
        }
    }

    pub fn on_destroyed(&mut self, id: MatchId) {
        if self.last_match == Some(id) {
            self.last_match = None;
            self.finish();
        }
    }

    /// Stop launching matches and ask every running match to stop. Safe to
    /// call repeatedly.
    pub fn stop(&mut self) {
        self.stop_pending = false;
        if matches!(
            self.phase,
            TournamentPhase::Stopping | TournamentPhase::Finished
        ) || self.last_match.is_some()
        {
            return;
        }

        if self.in_flight.is_empty() {
            self.finish();
            return;
        }

        tracing::info!(in_flight = self.in_flight.len(), "Stopping tournament");
        self.phase = TournamentPhase::Stopping;
        let mut ids: Vec<MatchId> = self.in_flight.keys().copied().collect();
        ids.sort();
        for id in ids {
            self.runner.stop_match(id);
        }
    }

    fn finish(&mut self) {
        self.runner.release_idle_resources();
        self.phase = TournamentPhase::Finished;
        tracing::info!(
            finished = self.finished_count,
            scheduled = self.final_count,
            "Tournament finished"
        );
        self.events.push(TournamentEvent::Finished(self.snapshot()));
    }

    /// Update standings and the decision oracle. Returns whether the oracle
    /// has reached a decision.
    fn apply_result(&mut self, white: usize, black: usize, result: &GameResult) -> bool {
        match result.winner {
            Some(Side::White) => {
                self.players[white].wins += 1;
                self.players[black].losses += 1;
            }
            Some(Side::Black) => {
                self.players[black].wins += 1;
                self.players[white].losses += 1;
            }
            None if result.is_draw() => {
                self.players[white].draws += 1;
                self.players[black].draws += 1;
            }
            None => {}
        }

        let translated = oracle_result(result, white, black);
        match self.oracle.as_mut() {
            Some(oracle) if oracle.is_active() && translated != OracleResult::NoResult => {
                oracle.add_result(translated);
                oracle.status() == OracleStatus::Decided
            }
            _ => false,
        }
    }
}

fn side_setup(player: &Player) -> SideSetup {
    SideSetup {
        time_control: player.time_control,
        book: player.book.clone(),
    }
}

/// Outcome in the frame of the first roster entry.
pub(crate) fn oracle_result(result: &GameResult, white: usize, black: usize) -> OracleResult {
    if white != 0 && black != 0 {
        return OracleResult::NoResult;
    }
    match result.winner {
        Some(Side::White) if white == 0 => OracleResult::Win,
        Some(Side::Black) if black == 0 => OracleResult::Win,
        Some(_) => OracleResult::Loss,
        None if result.is_draw() => OracleResult::Draw,
        None => OracleResult::NoResult,
    }
}

fn check_resumed_record(
    number: u64,
    record: &GameRecord,
    players: &[Player],
    white: usize,
    black: usize,
) -> TournamentResult<()> {
    let (white_name, black_name) = (players[white].name(), players[black].name());
    if record.white != white_name || record.black != black_name {
        return Err(TournamentError::Resume(format!(
            "record {} is {} vs {}, schedule says {} vs {}",
            number, record.white, record.black, white_name, black_name
        )));
    }
    Ok(())
}
