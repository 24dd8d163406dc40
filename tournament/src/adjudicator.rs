//! Online adjudication rules applied after every move of a match.

use chess::{Game, GameResult, Side};

use crate::error::{TournamentError, TournamentResult};
use crate::evaluation::MoveEvaluation;

/// The parts of a board the adjudicator needs to see.
pub trait BoardSnapshot {
    fn side_to_move(&self) -> Side;
    fn tablebase_result(&self) -> Option<GameResult>;
    fn plies_played(&self) -> u32;
}

impl BoardSnapshot for Game {
    fn side_to_move(&self) -> Side {
        Game::side_to_move(self)
    }

    fn tablebase_result(&self) -> Option<GameResult> {
        Game::tablebase_result(self)
    }

    fn plies_played(&self) -> u32 {
        Game::plies_played(self)
    }
}

/// Draw/resign/tablebase rule engine owned by a single match.
///
/// A tournament keeps one configured template and every match receives a
/// fresh clone, so streak counters are never shared between matches.
#[derive(Debug, Clone, Default)]
pub struct Adjudicator {
    draw_move_number: u32,
    draw_move_count: u32,
    draw_score: i32,
    draw_score_count: u32,
    resign_move_count: u32,
    resign_score: i32,
    resign_loser_count: [u32; 2],
    resign_winner_count: [u32; 2],
    tablebase_enabled: bool,
    result: Option<GameResult>,
}

impl Adjudicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adjudicate a draw once `move_number` full moves have been played and
    /// both sides reported `|score| <= score` for `move_count` consecutive
    /// moves each. A `move_number` of zero disables the rule.
    pub fn set_draw_threshold(
        &mut self,
        move_number: u32,
        move_count: u32,
        score: i32,
    ) -> TournamentResult<()> {
        if score < 0 {
            return Err(TournamentError::InvalidThreshold(format!(
                "draw score must not be negative, got {}",
                score
            )));
        }
        self.draw_move_number = move_number;
        self.draw_move_count = move_count;
        self.draw_score = score;
        self.draw_score_count = 0;
        Ok(())
    }

    /// Adjudicate a win once one side reported `score <= score` and the other
    /// `score >= -score` for `move_count` consecutive moves each. `score` is
    /// the losing side's view and must not be positive. A `move_count` of
    /// zero disables the rule.
    pub fn set_resign_threshold(&mut self, move_count: u32, score: i32) -> TournamentResult<()> {
        if score > 0 {
            return Err(TournamentError::InvalidThreshold(format!(
                "resign score must not be positive, got {}",
                score
            )));
        }
        self.resign_move_count = move_count;
        self.resign_score = score;
        self.resign_loser_count = [0; 2];
        self.resign_winner_count = [0; 2];
        Ok(())
    }

    pub fn set_tablebase_adjudication(&mut self, enable: bool) {
        self.tablebase_enabled = enable;
    }

    /// Clear the draw streak, e.g. after the position changed discontinuously.
    pub fn reset_draw_count(&mut self) {
        self.draw_score_count = 0;
    }

    /// Feed the evaluation of the move that produced `board`.
    ///
    /// `reset_draw` restarts the draw streak instead of extending it.
    pub fn add_eval<B: BoardSnapshot + ?Sized>(
        &mut self,
        board: &B,
        eval: &MoveEvaluation,
        reset_draw: bool,
    ) {
        if self.result.is_some() {
            return;
        }

        let side = board.side_to_move().opposite();

        if self.tablebase_enabled {
            if let Some(result) = board.tablebase_result() {
                self.result = Some(result);
                return;
            }
        }

        // Book moves, human moves and other unsearched moves carry no evidence
        if eval.depth <= 0 {
            self.draw_score_count = 0;
            self.resign_loser_count[side.index()] = 0;
            self.resign_winner_count[side.index()] = 0;
            return;
        }

        if self.draw_move_number > 0 {
            if reset_draw {
                self.draw_score_count = 0;
            } else {
                if eval.score.abs() <= self.draw_score {
                    self.draw_score_count += 1;
                } else {
                    self.draw_score_count = 0;
                }

                if board.plies_played() / 2 >= self.draw_move_number
                    && self.draw_score_count >= self.draw_move_count * 2
                {
                    self.result = Some(GameResult::adjudication(None, "TCEC draw rule"));
                    return;
                }
            }
        }

        if self.resign_move_count > 0 {
            let me = side.index();
            let them = side.opposite().index();

            if eval.score <= self.resign_score {
                self.resign_loser_count[me] += 1;
                self.resign_winner_count[me] = 0;
            } else if eval.score >= -self.resign_score {
                self.resign_winner_count[me] += 1;
                self.resign_loser_count[me] = 0;
            } else {
                self.resign_loser_count[me] = 0;
                self.resign_winner_count[me] = 0;
            }

            let threshold = self.resign_move_count;
            let winner = if self.resign_loser_count[me] >= threshold
                && self.resign_winner_count[them] >= threshold
            {
                side.opposite()
            } else if self.resign_winner_count[me] >= threshold
                && self.resign_loser_count[them] >= threshold
            {
                side
            } else {
                return;
            };

            self.result = Some(GameResult::adjudication(Some(winner), "TCEC win rule"));
        }
    }

    /// The adjudicated result, once a rule has fired.
    pub fn result(&self) -> Option<&GameResult> {
        self.result.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess::ResultKind;

    /// Board stand-in with a controllable ply count.
    struct FakeBoard {
        plies: u32,
        tablebase: Option<GameResult>,
    }

    impl FakeBoard {
        fn at_ply(plies: u32) -> Self {
            Self {
                plies,
                tablebase: None,
            }
        }
    }

    impl BoardSnapshot for FakeBoard {
        fn side_to_move(&self) -> Side {
            if self.plies % 2 == 0 {
                Side::White
            } else {
                Side::Black
            }
        }

        fn tablebase_result(&self) -> Option<GameResult> {
            self.tablebase.clone()
        }

        fn plies_played(&self) -> u32 {
            self.plies
        }
    }

    fn draw_adjudicator() -> Adjudicator {
        let mut adj = Adjudicator::new();
        adj.set_draw_threshold(40, 5, 10).unwrap();
        adj
    }

    #[test]
    fn test_draw_rule_fires_on_completing_move() {
        let mut adj = draw_adjudicator();
        for i in 1..=9 {
            adj.add_eval(&FakeBoard::at_ply(80 + i), &MoveEvaluation::searched(20, 3), false);
            assert!(adj.result().is_none(), "fired early at sample {}", i);
        }
        adj.add_eval(&FakeBoard::at_ply(90), &MoveEvaluation::searched(20, -5), false);
        let result = adj.result().unwrap();
        assert_eq!(result.kind, ResultKind::Adjudication);
        assert_eq!(result.winner, None);
        assert!(result.is_draw());
    }

    #[test]
    fn test_draw_rule_waits_for_move_number() {
        let mut adj = draw_adjudicator();
        for i in 1..=20 {
            adj.add_eval(&FakeBoard::at_ply(40 + i), &MoveEvaluation::searched(20, 0), false);
        }
        assert!(adj.result().is_none());
        // Streak is long enough already; the first sample past move 40 fires.
        adj.add_eval(&FakeBoard::at_ply(80), &MoveEvaluation::searched(20, 0), false);
        assert!(adj.result().is_some());
    }

    #[test]
    fn test_draw_streak_broken_by_large_score() {
        let mut adj = draw_adjudicator();
        for i in 1..=9 {
            adj.add_eval(&FakeBoard::at_ply(80 + i), &MoveEvaluation::searched(20, 0), false);
        }
        adj.add_eval(&FakeBoard::at_ply(90), &MoveEvaluation::searched(20, 50), false);
        assert!(adj.result().is_none());
    }

    #[test]
    fn test_forced_move_resets_draw_streak() {
        let mut adj = draw_adjudicator();
        for i in 1..=9 {
            adj.add_eval(&FakeBoard::at_ply(80 + i), &MoveEvaluation::searched(20, 0), false);
        }
        adj.add_eval(&FakeBoard::at_ply(90), &MoveEvaluation::book_move(), false);
        adj.add_eval(&FakeBoard::at_ply(91), &MoveEvaluation::searched(20, 0), false);
        assert!(adj.result().is_none());
    }

    #[test]
    fn test_caller_reset_draw() {
        let mut adj = draw_adjudicator();
        for i in 1..=9 {
            adj.add_eval(&FakeBoard::at_ply(80 + i), &MoveEvaluation::searched(20, 0), false);
        }
        adj.add_eval(&FakeBoard::at_ply(90), &MoveEvaluation::searched(20, 0), true);
        assert!(adj.result().is_none());

        adj.reset_draw_count();
        for i in 1..=9 {
            adj.add_eval(&FakeBoard::at_ply(90 + i), &MoveEvaluation::searched(20, 0), false);
        }
        assert!(adj.result().is_none());
        adj.add_eval(&FakeBoard::at_ply(100), &MoveEvaluation::searched(20, 0), false);
        assert!(adj.result().is_some());
    }

    #[test]
    fn test_draw_rule_disabled_by_default() {
        let mut adj = Adjudicator::new();
        for i in 1..=200 {
            adj.add_eval(&FakeBoard::at_ply(i), &MoveEvaluation::searched(20, 0), false);
        }
        assert!(adj.result().is_none());
    }

    #[test]
    fn test_resign_rule_awards_win_to_winning_side() {
        let mut adj = Adjudicator::new();
        adj.set_resign_threshold(3, -600).unwrap();

        // Odd plies are white moves: white is losing, black is winning.
        for ply in 1..=5 {
            let score = if ply % 2 == 1 { -700 } else { 650 };
            adj.add_eval(&FakeBoard::at_ply(ply), &MoveEvaluation::searched(18, score), false);
            assert!(adj.result().is_none(), "fired early at ply {}", ply);
        }
        adj.add_eval(&FakeBoard::at_ply(6), &MoveEvaluation::searched(18, 800), false);

        let result = adj.result().unwrap();
        assert_eq!(result.kind, ResultKind::Adjudication);
        assert_eq!(result.winner, Some(Side::Black));
        assert_eq!(result.reason, "TCEC win rule");
    }

    #[test]
    fn test_resign_rule_fires_on_losing_side_move() {
        let mut adj = Adjudicator::new();
        adj.set_resign_threshold(2, -500).unwrap();

        // White winning first, black's second losing eval completes the pattern.
        adj.add_eval(&FakeBoard::at_ply(1), &MoveEvaluation::searched(10, 600), false);
        adj.add_eval(&FakeBoard::at_ply(2), &MoveEvaluation::searched(10, -600), false);
        adj.add_eval(&FakeBoard::at_ply(3), &MoveEvaluation::searched(10, 600), false);
        assert!(adj.result().is_none());
        adj.add_eval(&FakeBoard::at_ply(4), &MoveEvaluation::searched(10, -600), false);
        assert_eq!(adj.result().unwrap().winner, Some(Side::White));
    }

    #[test]
    fn test_resign_streak_reset_by_middle_score() {
        let mut adj = Adjudicator::new();
        adj.set_resign_threshold(2, -500).unwrap();

        adj.add_eval(&FakeBoard::at_ply(1), &MoveEvaluation::searched(10, -600), false);
        adj.add_eval(&FakeBoard::at_ply(2), &MoveEvaluation::searched(10, 600), false);
        adj.add_eval(&FakeBoard::at_ply(3), &MoveEvaluation::searched(10, -100), false);
        adj.add_eval(&FakeBoard::at_ply(4), &MoveEvaluation::searched(10, 600), false);
        assert!(adj.result().is_none());
    }

    #[test]
    fn test_unsearched_move_resets_only_movers_resign_streaks() {
        let mut adj = Adjudicator::new();
        adj.set_resign_threshold(2, -500).unwrap();

        adj.add_eval(&FakeBoard::at_ply(1), &MoveEvaluation::searched(10, -600), false);
        adj.add_eval(&FakeBoard::at_ply(2), &MoveEvaluation::searched(10, 600), false);
        // White plays a book move: white's losing streak restarts.
        adj.add_eval(&FakeBoard::at_ply(3), &MoveEvaluation::searched(0, -600), false);
        adj.add_eval(&FakeBoard::at_ply(4), &MoveEvaluation::searched(10, 600), false);
        assert!(adj.result().is_none());
        adj.add_eval(&FakeBoard::at_ply(5), &MoveEvaluation::searched(10, -600), false);
        assert!(adj.result().is_none());
        adj.add_eval(&FakeBoard::at_ply(7), &MoveEvaluation::searched(10, -600), false);
        assert_eq!(adj.result().unwrap().winner, Some(Side::Black));
    }

    #[test]
    fn test_tablebase_takes_precedence() {
        let mut adj = Adjudicator::new();
        adj.set_tablebase_adjudication(true);
        adj.set_resign_threshold(1, -100).unwrap();

        let board = FakeBoard {
            plies: 61,
            tablebase: Some(GameResult::draw("Draw by insufficient mating material")),
        };
        adj.add_eval(&board, &MoveEvaluation::searched(30, -900), false);
        assert!(adj.result().unwrap().is_draw());
    }

    #[test]
    fn test_tablebase_ignored_when_disabled() {
        let mut adj = Adjudicator::new();
        let board = FakeBoard {
            plies: 61,
            tablebase: Some(GameResult::draw("known")),
        };
        adj.add_eval(&board, &MoveEvaluation::searched(30, 0), false);
        assert!(adj.result().is_none());
    }

    #[test]
    fn test_result_is_terminal() {
        let mut adj = Adjudicator::new();
        adj.set_resign_threshold(1, -100).unwrap();
        adj.add_eval(&FakeBoard::at_ply(1), &MoveEvaluation::searched(10, -200), false);
        adj.add_eval(&FakeBoard::at_ply(2), &MoveEvaluation::searched(10, 200), false);
        assert_eq!(adj.result().unwrap().winner, Some(Side::Black));

        adj.add_eval(&FakeBoard::at_ply(3), &MoveEvaluation::searched(10, 500), false);
        adj.add_eval(&FakeBoard::at_ply(4), &MoveEvaluation::searched(10, -500), false);
        assert_eq!(adj.result().unwrap().winner, Some(Side::Black));
    }

    #[test]
    fn test_real_board_snapshot() {
        let mut adj = Adjudicator::new();
        adj.set_tablebase_adjudication(true);
        let game = Game::from_fen("8/8/4k3/8/8/4KB2/8/8 b - - 0 1").unwrap();
        adj.add_eval(&game, &MoveEvaluation::searched(5, 0), false);
        assert!(adj.result().unwrap().is_draw());
    }

    #[test]
    fn test_invalid_thresholds_rejected() {
        let mut adj = Adjudicator::new();
        assert!(adj.set_draw_threshold(40, 5, -1).is_err());
        assert!(adj.set_resign_threshold(3, 100).is_err());
    }
}
