//! In-process match runner.
//!
//! Every match is played on its own tokio task by two deterministic greedy
//! players. A semaphore bounds how many enqueued matches play at once.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chess::{Game, GameResult, ResultKind};
use cozy_chess::{Color, GameStatus, Move, Piece};
use tokio::sync::{mpsc, watch, OwnedSemaphorePermit, Semaphore};

use super::{EnqueuePolicy, Match, MatchId, MatchRunner, ReusePolicy, RunnerEvent};
use crate::evaluation::MoveEvaluation;
use crate::player::PlayerBuilder;

const MATE_SCORE: i32 = 30_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalRunnerConfig {
    pub concurrency: usize,
    /// Ply limit for matches that don't carry their own.
    pub max_plies: u32,
}

impl Default for LocalRunnerConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            max_plies: 400,
        }
    }
}

pub struct LocalRunner {
    config: LocalRunnerConfig,
    events: mpsc::UnboundedSender<RunnerEvent>,
    permits: Arc<Semaphore>,
    active: Arc<AtomicUsize>,
    stops: HashMap<MatchId, watch::Sender<bool>>,
}

impl LocalRunner {
    /// Create a runner and the receiving end of its event channel.
    pub fn new(config: LocalRunnerConfig) -> (Self, mpsc::UnboundedReceiver<RunnerEvent>) {
        let concurrency = config.concurrency.max(1);
        let (events, events_rx) = mpsc::unbounded_channel();
        let runner = Self {
            config: LocalRunnerConfig {
                concurrency,
                ..config
            },
            events,
            permits: Arc::new(Semaphore::new(concurrency)),
            active: Arc::new(AtomicUsize::new(0)),
            stops: HashMap::new(),
        };
        (runner, events_rx)
    }

    /// Matches submitted and not yet destroyed.
    pub fn active_matches(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    fn prune_finished(&mut self) {
        self.stops.retain(|_, stop| !stop.is_closed());
    }
}

impl MatchRunner for LocalRunner {
    fn submit(
        &mut self,
        game: Match,
        white: PlayerBuilder,
        black: PlayerBuilder,
        enqueue: EnqueuePolicy,
        reuse: ReusePolicy,
    ) {
        self.prune_finished();

        let (stop_tx, stop_rx) = watch::channel(false);
        self.stops.insert(game.id, stop_tx);

        let task = MatchTask {
            white_name: white.name().to_string(),
            black_name: black.name().to_string(),
            max_plies: game.max_plies.unwrap_or(self.config.max_plies),
            job: game,
            stop: stop_rx,
            events: self.events.clone(),
            active: Arc::clone(&self.active),
            reuse,
        };
        let permits = match enqueue {
            EnqueuePolicy::Enqueue => Some(Arc::clone(&self.permits)),
            EnqueuePolicy::StartImmediately => None,
        };

        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::spawn(async move {
            let permit = match permits {
                Some(permits) => match permits.acquire_owned().await {
                    Ok(permit) => Some(permit),
                    Err(_) => {
                        task.fail("Match runner is shut down");
                        return;
                    }
                },
                None => None,
            };
            task.run(permit).await;
        });

        if active < self.config.concurrency {
            let _ = self.events.send(RunnerEvent::Ready);
        }
    }

    fn stop_match(&mut self, id: MatchId) {
        match self.stops.get(&id) {
            Some(stop) => {
                tracing::debug!(%id, "Stopping match");
                let _ = stop.send(true);
            }
            None => tracing::debug!(%id, "Stop requested for unknown match"),
        }
    }

    fn release_idle_resources(&mut self) {
        self.prune_finished();
        tracing::debug!(remaining = self.stops.len(), "Released idle match resources");
    }
}

struct MatchTask {
    job: Match,
    white_name: String,
    black_name: String,
    max_plies: u32,
    stop: watch::Receiver<bool>,
    events: mpsc::UnboundedSender<RunnerEvent>,
    active: Arc<AtomicUsize>,
    reuse: ReusePolicy,
}

impl MatchTask {
    async fn run(self, permit: Option<OwnedSemaphorePermit>) {
        let id = self.job.id;

        if !self.job.start_delay.is_zero() {
            tokio::time::sleep(self.job.start_delay).await;
        }

        if *self.stop.borrow() {
            let result = GameResult::new(ResultKind::NoResult, None, "Game stopped before start");
            let record = self.job.record(
                &self.white_name,
                &self.black_name,
                &self.job.game,
                &[],
                result.clone(),
            );
            let _ = self.events.send(RunnerEvent::Finished { id, result, record });
            drop(permit);
            self.destroy();
            return;
        }

        let mut game = match self.job.opening.apply(self.job.game.clone()) {
            Ok(game) => game,
            Err(e) => {
                drop(permit);
                self.fail(&format!("Invalid opening: {}", e));
                return;
            }
        };

        let _ = self.events.send(RunnerEvent::Started {
            id,
            white_name: self.white_name.clone(),
            black_name: self.black_name.clone(),
        });

        let (result, evals) = self.play(&mut game).await;
        tracing::debug!(%id, plies = game.plies_played(), "Match over: {}", result);

        let record = self.job.record(
            &self.white_name,
            &self.black_name,
            &game,
            &evals,
            result.clone(),
        );
        let _ = self.events.send(RunnerEvent::Finished { id, result, record });

        drop(permit);
        self.destroy();
    }

    async fn play(&self, game: &mut Game) -> (GameResult, Vec<MoveEvaluation>) {
        let players = [
            GreedyPlayer::new(&self.white_name),
            GreedyPlayer::new(&self.black_name),
        ];
        let mut adjudicator = self.job.adjudicator.clone();
        let mut evals = Vec::new();

        loop {
            if *self.stop.borrow() {
                return (GameResult::new(ResultKind::NoResult, None, "Interrupted"), evals);
            }
            if let Some(outcome) = game.outcome() {
                return (outcome, evals);
            }
            if game.plies_played() >= self.max_plies {
                return (
                    GameResult::adjudication(None, "Maximum game length reached"),
                    evals,
                );
            }

            let player = &players[game.side_to_move().index()];
            let Some((mv, eval)) = player.choose(game) else {
                return (GameResult::none(), evals);
            };
            if let Err(e) = game.make_move(mv) {
                let winner = game.side_to_move().opposite();
                return (
                    GameResult::new(ResultKind::IllegalMove, Some(winner), e.to_string()),
                    evals,
                );
            }

            adjudicator.add_eval(&*game, &eval, false);
            evals.push(eval);

            if self.job.report_moves {
                let record = self.job.record(
                    &self.white_name,
                    &self.black_name,
                    game,
                    &evals,
                    GameResult::none(),
                );
                let _ = self.events.send(RunnerEvent::Moved {
                    id: self.job.id,
                    record,
                });
            }

            if let Some(result) = adjudicator.result() {
                return (result.clone(), evals);
            }

            tokio::task::yield_now().await;
        }
    }

    fn fail(&self, error: &str) {
        let _ = self.events.send(RunnerEvent::StartFailed {
            id: self.job.id,
            error: error.to_string(),
        });
        self.destroy();
    }

    fn destroy(&self) {
        if self.reuse == ReusePolicy::DeletePlayers {
            tracing::trace!(id = %self.job.id, "Deleting players");
        }
        self.active.fetch_sub(1, Ordering::SeqCst);
        let _ = self.events.send(RunnerEvent::Destroyed { id: self.job.id });
        let _ = self.events.send(RunnerEvent::Ready);
    }
}

/// One-ply material maximizer with a deterministic tie-break seeded by the
/// player's name.
#[derive(Debug, Clone, Copy)]
pub(crate) struct GreedyPlayer {
    seed: u64,
}

impl GreedyPlayer {
    pub(crate) fn new(name: &str) -> Self {
        // FNV-1a
        let seed = name.bytes().fold(0xcbf2_9ce4_8422_2325_u64, |hash, byte| {
            (hash ^ u64::from(byte)).wrapping_mul(0x0000_0100_0000_01b3)
        });
        Self { seed }
    }

    pub(crate) fn choose(&self, game: &Game) -> Option<(Move, MoveEvaluation)> {
        let board = game.position();
        let mover = board.side_to_move();
        let moves = game.legal_moves();

        let mut best_score = i32::MIN;
        let mut best = Vec::new();
        for &mv in &moves {
            let mut next = board.clone();
            next.play_unchecked(mv);
            let score = if next.status() == GameStatus::Won {
                MATE_SCORE
            } else {
                material(&next, mover)
            };
            if score > best_score {
                best_score = score;
                best.clear();
            }
            if score == best_score {
                best.push(mv);
            }
        }

        if best.is_empty() {
            return None;
        }
        let pick = self.seed.wrapping_add(u64::from(game.plies_played())) % best.len() as u64;
        let mv = *best.get(pick as usize)?;
        let eval = MoveEvaluation {
            nodes: moves.len() as u64,
            ..MoveEvaluation::searched(1, best_score)
        };
        Some((mv, eval))
    }
}

/// Material balance in centipawns from `side`'s point of view.
fn material(board: &cozy_chess::Board, side: Color) -> i32 {
    const VALUES: [(Piece, i32); 5] = [
        (Piece::Pawn, 100),
        (Piece::Knight, 300),
        (Piece::Bishop, 300),
        (Piece::Rook, 500),
        (Piece::Queen, 900),
    ];
    VALUES
        .iter()
        .map(|&(piece, value)| {
            let ours = board.colored_pieces(side, piece).len() as i32;
            let theirs = board.colored_pieces(!side, piece).len() as i32;
            (ours - theirs) * value
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adjudicator::Adjudicator;
    use crate::opening::Opening;
    use crate::runner::{MatchMetadata, SideSetup};
    use crate::engine_config::EngineConfiguration;
    use std::time::Duration;

    fn builder(name: &str) -> PlayerBuilder {
        PlayerBuilder::new(EngineConfiguration::new(name, "local", "uci"))
    }

    fn job(id: u64, opening: Opening, max_plies: Option<u32>) -> Match {
        Match {
            id: MatchId::new(id),
            number: id,
            game: Game::new(),
            opening,
            white: SideSetup::default(),
            black: SideSetup::default(),
            adjudicator: Adjudicator::new(),
            metadata: MatchMetadata {
                event: "Local".to_string(),
                round: 1,
                ..Default::default()
            },
            start_delay: Duration::ZERO,
            max_plies,
            report_moves: true,
        }
    }

    async fn collect_until_destroyed(
        rx: &mut mpsc::UnboundedReceiver<RunnerEvent>,
        id: MatchId,
    ) -> Vec<RunnerEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            let done = matches!(event, RunnerEvent::Destroyed { id: d } if d == id);
            events.push(event);
            if done {
                break;
            }
        }
        events
    }

    #[test]
    fn test_greedy_player_takes_hanging_queen() {
        // White to move, black queen on d5 en prise to the e4 pawn.
        let game = Game::from_fen("4k3/8/8/3q4/4P3/8/8/4K3 w - - 0 1").unwrap();
        let (mv, eval) = GreedyPlayer::new("greedy").choose(&game).unwrap();
        assert_eq!(chess::format_uci_move(mv), "e4d5");
        assert_eq!(eval.score, 100);
        assert_eq!(eval.depth, 1);
    }

    #[test]
    fn test_greedy_player_finds_mate_in_one() {
        let game = Game::from_fen("6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1").unwrap();
        let (mv, eval) = GreedyPlayer::new("greedy").choose(&game).unwrap();
        assert_eq!(chess::format_uci_move(mv), "a1a8");
        assert_eq!(eval.score, MATE_SCORE);
    }

    #[test]
    fn test_greedy_player_is_deterministic() {
        let game = Game::new();
        let a = GreedyPlayer::new("alpha").choose(&game).unwrap().0;
        let b = GreedyPlayer::new("alpha").choose(&game).unwrap().0;
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_match_event_order() {
        let (mut runner, mut rx) = LocalRunner::new(LocalRunnerConfig {
            concurrency: 2,
            max_plies: 6,
        });
        runner.submit(
            job(1, Opening::default(), None),
            builder("white"),
            builder("black"),
            EnqueuePolicy::Enqueue,
            ReusePolicy::ReusePlayers,
        );

        let events = collect_until_destroyed(&mut rx, MatchId::new(1)).await;
        let kinds: Vec<&str> = events
            .iter()
            .map(|e| match e {
                RunnerEvent::Ready => "ready",
                RunnerEvent::Started { .. } => "started",
                RunnerEvent::Moved { .. } => "moved",
                RunnerEvent::Finished { .. } => "finished",
                RunnerEvent::StartFailed { .. } => "start_failed",
                RunnerEvent::Destroyed { .. } => "destroyed",
            })
            .filter(|k| *k != "ready")
            .collect();

        let moved = kinds.iter().filter(|k| **k == "moved").count();
        assert_eq!(kinds.first(), Some(&"started"));
        assert_eq!(&kinds[kinds.len() - 2..], &["finished", "destroyed"]);

        let finished = events.iter().find_map(|e| match e {
            RunnerEvent::Finished { result, record, .. } => Some((result, record)),
            _ => None,
        });
        let (result, record) = finished.unwrap();
        assert_eq!(record.moves.len(), moved);
        assert!(moved <= 6);
        if moved == 6 {
            assert_eq!(result.reason, "Maximum game length reached");
        }
        assert_eq!(record.white, "white");
        assert_eq!(record.event, "Local");

        // Ready follows destruction.
        assert!(matches!(rx.recv().await, Some(RunnerEvent::Ready)));
        assert_eq!(runner.active_matches(), 0);
    }

    #[tokio::test]
    async fn test_illegal_opening_fails_to_start() {
        let (mut runner, mut rx) = LocalRunner::new(LocalRunnerConfig::default());
        let opening = Opening {
            fen: None,
            moves: vec!["e2e5".to_string()],
        };
        runner.submit(
            job(7, opening, None),
            builder("a"),
            builder("b"),
            EnqueuePolicy::Enqueue,
            ReusePolicy::ReusePlayers,
        );

        let events = collect_until_destroyed(&mut rx, MatchId::new(7)).await;
        assert!(events
            .iter()
            .any(|e| matches!(e, RunnerEvent::StartFailed { error, .. } if error.contains("e2e5"))));
        assert!(!events
            .iter()
            .any(|e| matches!(e, RunnerEvent::Started { .. })));
    }

    #[tokio::test]
    async fn test_stop_match_interrupts() {
        let (mut runner, mut rx) = LocalRunner::new(LocalRunnerConfig {
            concurrency: 1,
            max_plies: 10_000,
        });
        runner.submit(
            job(3, Opening::default(), None),
            builder("a"),
            builder("b"),
            EnqueuePolicy::Enqueue,
            ReusePolicy::DeletePlayers,
        );
        runner.stop_match(MatchId::new(3));

        let events = collect_until_destroyed(&mut rx, MatchId::new(3)).await;
        let result = events
            .iter()
            .find_map(|e| match e {
                RunnerEvent::Finished { result, .. } => Some(result.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(result.kind, ResultKind::NoResult);
        assert!(result.winner.is_none());
    }
}
