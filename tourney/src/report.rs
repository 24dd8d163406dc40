//! Human-readable rendering of tournament progress.

use std::fmt::Write;

use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::{Stream, StreamExt};
use tournament::{Pairing, TournamentEvent, TournamentSnapshot};

/// Log every tournament event until the stream closes.
pub async fn log_events<S>(events: S, names: Vec<String>)
where
    S: Stream<Item = Result<TournamentEvent, BroadcastStreamRecvError>>,
{
    tokio::pin!(events);
    while let Some(item) = events.next().await {
        match item {
            Ok(TournamentEvent::Aborted(reason)) => {
                tracing::error!("Tournament aborted: {}", reason);
            }
            Ok(event) => {
                if let Some(line) = describe(&event, &names) {
                    tracing::info!("{}", line);
                }
            }
            Err(BroadcastStreamRecvError::Lagged(n)) => {
                tracing::warn!("Event log lagged, skipped {} events", n);
            }
        }
    }
}

/// One-line description of an event, if it is worth logging.
pub fn describe(event: &TournamentEvent, names: &[String]) -> Option<String> {
    let name = |index: usize| names.get(index).map(String::as_str).unwrap_or("?");
    match event {
        TournamentEvent::MatchStarted {
            number,
            white,
            black,
        } => Some(format!("Started game {} of {} vs {}", number, white, black)),
        TournamentEvent::MatchFinished {
            number,
            white_index,
            black_index,
            result,
        } => Some(format!(
            "Finished game {} of {} vs {}: {}",
            number,
            name(*white_index),
            name(*black_index),
            result
        )),
        TournamentEvent::Finished(snapshot) => Some(format!(
            "Tournament finished: {} of {} games played",
            snapshot.finished_count, snapshot.final_count
        )),
        TournamentEvent::Aborted(_) => None,
    }
}

/// Final standings, best first.
pub fn standings_table(snapshot: &TournamentSnapshot) -> String {
    let ranking = snapshot.ranking();
    let width = ranking
        .iter()
        .map(|s| s.name.len())
        .max()
        .unwrap_or(0)
        .max("Name".len());

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>4}  {:<width$}  {:>5}  {:>3}  {:>3}  {:>3}  {:>6}  {:>6}",
        "Rank", "Name", "Games", "W", "L", "D", "Points", "Score",
    );
    for (rank, s) in ranking.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:>4}  {:<width$}  {:>5}  {:>3}  {:>3}  {:>3}  {:>6.1}  {:>5.1}%",
            rank + 1,
            s.name,
            s.games(),
            s.wins,
            s.losses,
            s.draws,
            s.points(),
            s.score_percent(),
        );
    }
    out
}

/// The pairings of one cycle, one line per game.
pub fn schedule_table(pairings: &[Pairing], names: &[String]) -> String {
    let name = |index: usize| names.get(index).map(String::as_str).unwrap_or("?");
    let mut out = String::new();
    for (i, pairing) in pairings.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:>3}. round {:>2}: {} - {}",
            i + 1,
            pairing.round,
            name(pairing.white),
            name(pairing.black)
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use tournament::{PlayerStanding, TournamentPhase};

    use super::*;

    fn standing(index: usize, name: &str, wins: u32, losses: u32, draws: u32) -> PlayerStanding {
        PlayerStanding {
            index,
            name: name.to_string(),
            wins,
            losses,
            draws,
        }
    }

    fn snapshot(standings: Vec<PlayerStanding>) -> TournamentSnapshot {
        TournamentSnapshot {
            run_id: "run".to_string(),
            name: "Test".to_string(),
            phase: TournamentPhase::Finished,
            round: 3,
            started_count: 3,
            finished_count: 3,
            final_count: 3,
            saved_count: 3,
            in_flight: 0,
            error: None,
            standings,
        }
    }

    #[test]
    fn test_standings_table_ranks_by_points() {
        let table = standings_table(&snapshot(vec![
            standing(0, "alpha", 0, 2, 0),
            standing(1, "beta", 1, 0, 1),
            standing(2, "gamma", 1, 1, 0),
        ]));
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].contains("Points"));
        assert!(lines[1].contains("beta"));
        assert!(lines[1].contains("1.5"));
        assert!(lines[2].contains("gamma"));
        assert!(lines[3].contains("alpha"));
    }

    #[test]
    fn test_describe_uses_roster_names() {
        let names = vec!["alpha".to_string(), "beta".to_string()];
        let event = TournamentEvent::MatchFinished {
            number: 2,
            white_index: 1,
            black_index: 0,
            result: chess::GameResult::draw("repetition"),
        };
        assert_eq!(
            describe(&event, &names).as_deref(),
            Some("Finished game 2 of beta vs alpha: 1/2-1/2 {repetition}")
        );
        assert!(describe(&TournamentEvent::Aborted("x".into()), &names).is_none());
    }

    #[test]
    fn test_schedule_table() {
        let names = vec!["a".to_string(), "b".to_string()];
        let table = schedule_table(
            &[Pairing {
                white: 0,
                black: 1,
                round: 1,
            }],
            &names,
        );
        assert_eq!(table, "  1. round  1: a - b\n");
    }
}
