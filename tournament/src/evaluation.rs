//! Per-move evaluation reports.

use serde::{Deserialize, Serialize};

/// What a player reported about the move it just played.
///
/// Scores are in centipawns from the mover's point of view. Human players
/// and book moves report a depth of zero, which the adjudicator treats as
/// "not searched".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveEvaluation {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub book: bool,
    pub depth: i32,
    pub score: i32,
    #[serde(default)]
    pub time_ms: u64,
    #[serde(default)]
    pub nodes: u64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub nps: u64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub tb_hits: u64,
    /// Principal variation as space separated UCI moves.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pv: String,
}

fn is_zero(v: &u64) -> bool {
    *v == 0
}

impl MoveEvaluation {
    pub fn searched(depth: i32, score: i32) -> Self {
        Self {
            depth,
            score,
            ..Default::default()
        }
    }

    /// Evaluation attached to an opening-book move.
    pub fn book_move() -> Self {
        Self {
            book: true,
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.book
            && self.depth == 0
            && self.score == 0
            && self.time_ms == 0
            && self.nodes == 0
            && self.pv.is_empty()
    }

    pub fn is_book_eval(&self) -> bool {
        self.book
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
