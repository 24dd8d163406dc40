//! Early-stopping decision oracle (e.g. a sequential probability ratio test).
//!
//! Results are reported from the point of view of the first roster entry.

/// Outcome of one game for the first player of the roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OracleResult {
    Win,
    Loss,
    Draw,
    NoResult,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OracleStatus {
    Continue,
    /// Enough evidence was collected; the tournament should stop.
    Decided,
}

pub trait DecisionOracle: Send {
    /// Oracles can be configured but left inactive.
    fn is_active(&self) -> bool;
    fn add_result(&mut self, result: OracleResult);
    fn status(&self) -> OracleStatus;
}
