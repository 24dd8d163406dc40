use tokio::sync::{broadcast, mpsc, oneshot, watch};

use super::commands::TournamentCommand;
use super::events::TournamentEvent;
use super::snapshot::TournamentSnapshot;
use crate::error::TournamentError;

pub(crate) type Completion = Option<Result<TournamentSnapshot, TournamentError>>;

/// Cheap, cloneable handle to a tournament actor.
#[derive(Clone)]
pub struct TournamentHandle {
    id: String,
    cmd_tx: mpsc::Sender<TournamentCommand>,
    done_rx: watch::Receiver<Completion>,
}

impl TournamentHandle {
    pub(crate) fn new(
        id: String,
        cmd_tx: mpsc::Sender<TournamentCommand>,
        done_rx: watch::Receiver<Completion>,
    ) -> Self {
        Self {
            id,
            cmd_tx,
            done_rx,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Start the tournament, skipping the first `resume` matches.
    pub async fn start(&self, resume: u64) -> Result<TournamentSnapshot, TournamentError> {
        let (tx, rx) = oneshot::channel();
        self.send(TournamentCommand::Start { resume, reply: tx })
            .await?;
        rx.await.map_err(|_| TournamentError::ActorClosed)?
    }

    pub async fn stop(&self) -> Result<TournamentSnapshot, TournamentError> {
        let (tx, rx) = oneshot::channel();
        self.send(TournamentCommand::Stop { reply: tx }).await?;
        rx.await.map_err(|_| TournamentError::ActorClosed)
    }

    pub async fn snapshot(&self) -> Result<TournamentSnapshot, TournamentError> {
        let (tx, rx) = oneshot::channel();
        self.send(TournamentCommand::GetSnapshot { reply: tx })
            .await?;
        rx.await.map_err(|_| TournamentError::ActorClosed)
    }

    pub async fn subscribe(
        &self,
    ) -> Result<(TournamentSnapshot, broadcast::Receiver<TournamentEvent>), TournamentError> {
        let (tx, rx) = oneshot::channel();
        self.send(TournamentCommand::Subscribe { reply: tx })
            .await?;
        rx.await.map_err(|_| TournamentError::ActorClosed)
    }

    /// Wait until the tournament is finished. Returns the final snapshot, or
    /// the error that aborted the actor.
    pub async fn wait(&self) -> Result<TournamentSnapshot, TournamentError> {
        let mut done_rx = self.done_rx.clone();
        let outcome = done_rx
            .wait_for(Option::is_some)
            .await
            .map_err(|_| TournamentError::ActorClosed)?
            .clone();
        outcome.unwrap_or(Err(TournamentError::ActorClosed))
    }

    pub async fn shutdown(&self) {
        let _ = self.cmd_tx.send(TournamentCommand::Shutdown).await;
    }

    async fn send(&self, cmd: TournamentCommand) -> Result<(), TournamentError> {
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|_| TournamentError::ActorClosed)
    }
}
