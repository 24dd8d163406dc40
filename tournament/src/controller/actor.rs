use tokio::sync::{broadcast, mpsc, watch};
use tracing::Instrument;

use super::commands::TournamentCommand;
use super::events::TournamentEvent;
use super::handle::Completion;
use super::state::{Deferred, TournamentState};
use crate::error::TournamentResult;
use crate::runner::RunnerEvent;

/// The main tournament actor loop.
/// Owns all mutable state. Processes commands and runner events sequentially.
pub(crate) async fn run_tournament_actor(
    state: TournamentState,
    cmd_rx: mpsc::Receiver<TournamentCommand>,
    runner_rx: mpsc::UnboundedReceiver<RunnerEvent>,
    event_tx: broadcast::Sender<TournamentEvent>,
    done_tx: watch::Sender<Completion>,
) {
    let run_id = state.run_id;
    run_tournament_actor_inner(state, cmd_rx, runner_rx, event_tx, done_tx)
        .instrument(tracing::info_span!("tournament", id = %run_id))
        .await;
}

async fn run_tournament_actor_inner(
    mut state: TournamentState,
    mut cmd_rx: mpsc::Receiver<TournamentCommand>,
    mut runner_rx: mpsc::UnboundedReceiver<RunnerEvent>,
    event_tx: broadcast::Sender<TournamentEvent>,
    done_tx: watch::Sender<Completion>,
) {
    tracing::info!(name = %state.config.name, "Tournament actor started");

    // Stops requested from inside a handler run on a later turn.
    let (deferred_tx, mut deferred_rx) = mpsc::unbounded_channel::<Deferred>();

    loop {
        tokio::select! {
            biased;

            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(TournamentCommand::Shutdown) | None => {
                        tracing::info!("Tournament actor shutting down");
                        state.stop();
                        publish(&mut state, &event_tx, &done_tx);
                        break;
                    }
                    Some(cmd) => handle_command(&mut state, cmd, &event_tx),
                }
            }

            Some(deferred) = deferred_rx.recv() => {
                match deferred {
                    Deferred::Stop => state.stop(),
                }
            }

            Some(event) = runner_rx.recv() => {
                if let Err(e) = handle_runner_event(&mut state, event, &deferred_tx) {
                    tracing::error!("Tournament aborted: {}", e);
                    publish(&mut state, &event_tx, &done_tx);
                    let _ = event_tx.send(TournamentEvent::Aborted(e.to_string()));
                    done_tx.send_replace(Some(Err(e)));
                    break;
                }
            }
        }

        publish(&mut state, &event_tx, &done_tx);
    }

    tracing::info!("Tournament actor exited");
}

fn handle_command(
    state: &mut TournamentState,
    cmd: TournamentCommand,
    event_tx: &broadcast::Sender<TournamentEvent>,
) {
    match cmd {
        TournamentCommand::Start { resume, reply } => {
            let result = state.start(resume).map(|_| state.snapshot());
            if let Err(ref e) = result {
                tracing::warn!("Can't start tournament: {}", e);
            }
            let _ = reply.send(result);
        }
        TournamentCommand::Stop { reply } => {
            state.stop();
            let _ = reply.send(state.snapshot());
        }
        TournamentCommand::GetSnapshot { reply } => {
            let _ = reply.send(state.snapshot());
        }
        TournamentCommand::Subscribe { reply } => {
            let _ = reply.send((state.snapshot(), event_tx.subscribe()));
        }
        TournamentCommand::Shutdown => {}
    }
}

fn handle_runner_event(
    state: &mut TournamentState,
    event: RunnerEvent,
    deferred_tx: &mpsc::UnboundedSender<Deferred>,
) -> TournamentResult<()> {
    match event {
        RunnerEvent::Ready => state.start_next_match(),
        RunnerEvent::Started {
            id,
            white_name,
            black_name,
        } => state.on_started(id, white_name, black_name),
        RunnerEvent::Moved { id, record } => state.on_moved(id, &record),
        RunnerEvent::Finished { id, result, record } => {
            if let Some(deferred) = state.on_finished(id, result, record)? {
                let _ = deferred_tx.send(deferred);
            }
        }
        RunnerEvent::StartFailed { id, error } => state.on_start_failed(id, error),
        RunnerEvent::Destroyed { id } => state.on_destroyed(id),
    }
    Ok(())
}

/// Broadcast queued events. The final snapshot also completes `wait()`.
fn publish(
    state: &mut TournamentState,
    event_tx: &broadcast::Sender<TournamentEvent>,
    done_tx: &watch::Sender<Completion>,
) {
    for event in state.take_events() {
        if let TournamentEvent::Finished(snapshot) = &event {
            done_tx.send_replace(Some(Ok(snapshot.clone())));
        }
        let _ = event_tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use chess::{GameResult, Side};

    use crate::controller::{TournamentBuilder, TournamentConfig, TournamentPhase};
    use super::*;
    use crate::error::TournamentError;
    use crate::oracle::tests::ScriptedOracle;
    use crate::output::tests::sample_record;
    use crate::runner::mock::{player, MockRunner};
    use crate::runner::MatchId;

    fn builder(count: usize) -> TournamentBuilder {
        (0..count).fold(
            TournamentBuilder::new(TournamentConfig::default()),
            |builder, i| builder.add_player(player(&format!("p{}", i))),
        )
    }

    #[tokio::test]
    async fn test_round_robin_runs_to_completion() {
        let script = vec![
            GameResult::win(Side::White, "mate"),
            GameResult::draw("repetition"),
            GameResult::win(Side::Black, "mate"),
        ];
        let (runner, events) = MockRunner::auto_finishing(script);
        let handle = builder(4).spawn(runner.clone(), events);

        let started = handle.start(0).await.unwrap();
        assert_eq!(started.final_count, 6);

        let done = handle.wait().await.unwrap();
        assert_eq!(done.phase, TournamentPhase::Finished);
        assert_eq!(done.finished_count, 6);
        assert_eq!(runner.submitted().len(), 6);

        // (0,3) 1-0, (1,2) draw, (3,2) 0-1, (0,1) 1-0, (1,3) draw, (2,0) 0-1
        let wld: Vec<(u32, u32, u32)> = done
            .standings
            .iter()
            .map(|s| (s.wins, s.losses, s.draws))
            .collect();
        assert_eq!(wld, vec![(3, 0, 0), (0, 1, 2), (1, 1, 1), (0, 2, 1)]);
        assert_eq!(done.ranking()[0].name, "p0");

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_start_with_one_player_fails() {
        let handle = builder(1).spawn(MockRunner::default(), mpsc::unbounded_channel().1);
        assert!(matches!(
            handle.start(0).await,
            Err(TournamentError::NotEnoughPlayers(1))
        ));
        assert_eq!(
            handle.snapshot().await.unwrap().phase,
            TournamentPhase::Idle
        );
    }

    #[tokio::test]
    async fn test_stop_twice_then_finish() {
        let runner = MockRunner::default();
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = builder(4).spawn(runner.clone(), rx);
        handle.start(0).await.unwrap();

        let first = handle.stop().await.unwrap();
        let second = handle.stop().await.unwrap();
        assert_eq!(first.phase, TournamentPhase::Stopping);
        assert_eq!(second.phase, TournamentPhase::Stopping);
        assert_eq!(runner.stopped(), vec![MatchId::new(1)]);

        let id = MatchId::new(1);
        tx.send(RunnerEvent::Finished {
            id,
            result: GameResult::none(),
            record: sample_record(1, "p0", "p3"),
        })
        .unwrap();
        tx.send(RunnerEvent::Destroyed { id }).unwrap();

        let done = handle.wait().await.unwrap();
        assert_eq!(done.finished_count, 1);
        assert_eq!(runner.released(), 1);
    }

    #[tokio::test]
    async fn test_untracked_finish_aborts() {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = builder(2).spawn(MockRunner::default(), rx);
        let (_, mut events) = handle.subscribe().await.unwrap();
        handle.start(0).await.unwrap();

        tx.send(RunnerEvent::Finished {
            id: MatchId::new(42),
            result: GameResult::draw("agreed"),
            record: sample_record(42, "x", "y"),
        })
        .unwrap();

        assert!(matches!(
            handle.wait().await,
            Err(TournamentError::UntrackedMatch(_))
        ));
        let mut aborted = false;
        while let Ok(event) = events.recv().await {
            if matches!(event, TournamentEvent::Aborted(_)) {
                aborted = true;
                break;
            }
        }
        assert!(aborted);
        assert!(matches!(
            handle.snapshot().await,
            Err(TournamentError::ActorClosed)
        ));
    }

    #[tokio::test]
    async fn test_oracle_decision_stops_on_later_turn() {
        let (runner, events) = MockRunner::auto_finishing(vec![GameResult::win(
            Side::White,
            "mate",
        )]);
        let oracle = ScriptedOracle::deciding_after(1);
        let handle = builder(4)
            .oracle(Box::new(oracle.clone()))
            .spawn(runner.clone(), events);

        handle.start(0).await.unwrap();
        let done = handle.wait().await.unwrap();

        assert_eq!(done.finished_count, 1);
        assert_eq!(runner.submitted().len(), 1);
        assert_eq!(oracle.results().len(), 1);
    }

    #[tokio::test]
    async fn test_subscriber_sees_match_events() {
        let (runner, events) = MockRunner::auto_finishing(vec![]);
        let handle = builder(2).spawn(runner, events);
        let (snapshot, mut rx) = handle.subscribe().await.unwrap();
        assert_eq!(snapshot.phase, TournamentPhase::Idle);

        handle.start(0).await.unwrap();
        let mut seen = Vec::new();
        while let Ok(event) = rx.recv().await {
            let last = matches!(event, TournamentEvent::Finished(_));
            seen.push(event);
            if last {
                break;
            }
        }
        assert!(matches!(
            seen.as_slice(),
            [
                TournamentEvent::MatchStarted { number: 1, .. },
                TournamentEvent::MatchFinished { number: 1, .. },
                TournamentEvent::Finished(_),
            ]
        ));
    }
}
