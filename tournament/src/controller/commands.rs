use tokio::sync::{broadcast, oneshot};

use super::events::TournamentEvent;
use super::snapshot::TournamentSnapshot;
use crate::error::TournamentError;

/// Commands sent to the tournament actor. Each embeds a oneshot for the reply.
pub enum TournamentCommand {
    Start {
        /// Number of already played matches to fast-forward over.
        resume: u64,
        reply: oneshot::Sender<Result<TournamentSnapshot, TournamentError>>,
    },
    Stop {
        reply: oneshot::Sender<TournamentSnapshot>,
    },
    GetSnapshot {
        reply: oneshot::Sender<TournamentSnapshot>,
    },
    Subscribe {
        reply: oneshot::Sender<(TournamentSnapshot, broadcast::Receiver<TournamentEvent>)>,
    },
    Shutdown,
}
