//! Scripted runner for controller tests.

use std::sync::{Arc, Mutex};

use chess::{Game, GameResult};
use tokio::sync::mpsc;

use super::{EnqueuePolicy, Match, MatchId, MatchRunner, ReusePolicy, RunnerEvent};
use crate::engine_config::EngineConfiguration;
use crate::opening::Opening;
use crate::player::{Player, PlayerBuilder, TimeControl};

pub(crate) fn player(name: &str) -> Player {
    Player::new(
        PlayerBuilder::new(EngineConfiguration::new(name, "mock", "uci")),
        TimeControl::infinite(),
    )
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum RunnerCall {
    Submit {
        number: u64,
        white: String,
        black: String,
        opening: Opening,
        report_moves: bool,
    },
    Stop(MatchId),
    Release,
}

/// Records every call. When built with [`MockRunner::auto_finishing`] it
/// also plays each submitted match to completion at once, taking results
/// from the script in launch order.
#[derive(Clone, Default)]
pub(crate) struct MockRunner {
    calls: Arc<Mutex<Vec<RunnerCall>>>,
    events: Option<mpsc::UnboundedSender<RunnerEvent>>,
    script: Vec<GameResult>,
}

impl MockRunner {
    pub(crate) fn auto_finishing(
        script: Vec<GameResult>,
    ) -> (Self, mpsc::UnboundedReceiver<RunnerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let runner = Self {
            calls: Arc::default(),
            events: Some(tx),
            script,
        };
        (runner, rx)
    }

    pub(crate) fn calls(&self) -> Vec<RunnerCall> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn submitted(&self) -> Vec<(u64, String, String)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                RunnerCall::Submit {
                    number,
                    white,
                    black,
                    ..
                } => Some((number, white, black)),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn openings(&self) -> Vec<Opening> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                RunnerCall::Submit { opening, .. } => Some(opening),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn report_moves(&self) -> bool {
        self.calls().iter().rev().any(|c| {
            matches!(
                c,
                RunnerCall::Submit {
                    report_moves: true,
                    ..
                }
            )
        })
    }

    pub(crate) fn stopped(&self) -> Vec<MatchId> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                RunnerCall::Stop(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn released(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, RunnerCall::Release))
            .count()
    }
}

impl MatchRunner for MockRunner {
    fn submit(
        &mut self,
        game: Match,
        white: PlayerBuilder,
        black: PlayerBuilder,
        _enqueue: EnqueuePolicy,
        _reuse: ReusePolicy,
    ) {
        self.calls.lock().unwrap().push(RunnerCall::Submit {
            number: game.number,
            white: white.name().to_string(),
            black: black.name().to_string(),
            opening: game.opening.clone(),
            report_moves: game.report_moves,
        });

        let Some(events) = &self.events else {
            return;
        };
        let result = if self.script.is_empty() {
            GameResult::draw("Draw by agreement")
        } else {
            self.script[(game.number as usize - 1) % self.script.len()].clone()
        };
        let record = game.record(
            white.name(),
            black.name(),
            &Game::new(),
            &[],
            result.clone(),
        );
        let id = game.id;
        let _ = events.send(RunnerEvent::Started {
            id,
            white_name: white.name().to_string(),
            black_name: black.name().to_string(),
        });
        let _ = events.send(RunnerEvent::Finished { id, result, record });
        let _ = events.send(RunnerEvent::Destroyed { id });
        let _ = events.send(RunnerEvent::Ready);
    }

    fn stop_match(&mut self, id: MatchId) {
        self.calls.lock().unwrap().push(RunnerCall::Stop(id));
    }

    fn release_idle_resources(&mut self) {
        self.calls.lock().unwrap().push(RunnerCall::Release);
    }
}
