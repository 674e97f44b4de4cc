//! The ledger actor: one blocking thread owns the [`Chain`] and applies
//! commands in arrival order. Submissions, mining cycles and reads therefore
//! never interleave, and a mining request that arrives while another is being
//! committed simply waits its turn in the channel.
//!
//! The actor stops on an explicit [`LedgerHandle::shutdown`] or once every
//! handle is gone. Either way it flips a `watch` flag that long-lived
//! listeners such as the `/events` stream select on.

use ledger_core::{Block, Chain, ChainFault, ChainStore, CheckRequest, LedgerError, Transaction};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::constants::{COMMAND_BUFFER, EVENT_BUFFER};

#[derive(Debug, Error)]
pub enum NodeError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("ledger actor has stopped")]
    ActorStopped,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Head {
    pub length: u64,
    pub hash: String,
    pub pending_transactions: usize,
    pub pending_check_requests: usize,
}

/// Notifications fanned out to every subscriber.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LedgerEvent {
    /// A block was committed.
    Block(Block),
    /// A check request was accepted into the pending queue.
    CheckRequest(CheckRequest),
}

type Reply<T> = oneshot::Sender<Result<T, LedgerError>>;

enum Command {
    Submit(Transaction, Reply<()>),
    SubmitCheckRequest(CheckRequest, Reply<()>),
    Mine(String, Reply<Block>),
    Balance(String, Reply<i128>),
    Validate(oneshot::Sender<Option<ChainFault>>),
    Head(Reply<Head>),
    Block(u64, Reply<Block>),
    Shutdown,
}

/// Cloneable front door to the actor.
#[derive(Clone)]
pub struct LedgerHandle {
    commands: mpsc::Sender<Command>,
    events: broadcast::Sender<LedgerEvent>,
    stopped: watch::Receiver<bool>,
}

/// Moves `chain` onto a blocking thread and returns a handle to it. The thread
/// exits on [`LedgerHandle::shutdown`] or once every handle has been dropped.
pub fn spawn<S: ChainStore + 'static>(chain: Chain<S>) -> (LedgerHandle, JoinHandle<()>) {
    let (commands, rx) = mpsc::channel(COMMAND_BUFFER);
    let (events, _) = broadcast::channel(EVENT_BUFFER);
    let (stop_tx, stopped) = watch::channel(false);
    let task = tokio::task::spawn_blocking(move || {
        run(chain, rx);
        stop_tx.send_replace(true);
    });
    let handle = LedgerHandle {
        commands,
        events,
        stopped,
    };
    (handle, task)
}

fn run<S: ChainStore>(mut chain: Chain<S>, mut rx: mpsc::Receiver<Command>) {
    info!(length = chain.length(), "ledger actor started");
    while let Some(command) = rx.blocking_recv() {
        // a dropped receiver means the caller gave up; nothing to do
        match command {
            Command::Submit(tx, reply) => {
                let _ = reply.send(chain.submit(tx));
            }
            Command::SubmitCheckRequest(request, reply) => {
                let _ = reply.send(chain.submit_check_request(request));
            }
            Command::Mine(reward_address, reply) => {
                let _ = reply.send(chain.mine_once(&reward_address));
            }
            Command::Balance(address, reply) => {
                let _ = reply.send(chain.balance_of(&address));
            }
            Command::Validate(reply) => {
                let _ = reply.send(chain.find_fault());
            }
            Command::Head(reply) => {
                let head = chain.last_block().map(|tip| Head {
                    length: chain.length(),
                    hash: tip.hash,
                    pending_transactions: chain.pending_transactions().len(),
                    pending_check_requests: chain.pending_check_requests().len(),
                });
                let _ = reply.send(head);
            }
            Command::Block(index, reply) => {
                let _ = reply.send(chain.block(index));
            }
            Command::Shutdown => {
                info!(length = chain.length(), "ledger actor shutting down");
                break;
            }
        }
    }
    debug!("ledger actor stopped");
}

impl LedgerHandle {
    async fn call<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, NodeError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(make(reply))
            .await
            .map_err(|_| NodeError::ActorStopped)?;
        rx.await.map_err(|_| NodeError::ActorStopped)
    }

    pub async fn submit(&self, tx: Transaction) -> Result<(), NodeError> {
        Ok(self.call(|r| Command::Submit(tx, r)).await??)
    }

    pub async fn submit_check_request(&self, request: CheckRequest) -> Result<(), NodeError> {
        Ok(self.call(|r| Command::SubmitCheckRequest(request, r)).await??)
    }

    pub async fn mine(&self, reward_address: &str) -> Result<Block, NodeError> {
        let reward_address = reward_address.to_string();
        Ok(self.call(|r| Command::Mine(reward_address, r)).await??)
    }

    pub async fn balance_of(&self, address: &str) -> Result<i128, NodeError> {
        let address = address.to_string();
        Ok(self.call(|r| Command::Balance(address, r)).await??)
    }

    pub async fn validate(&self) -> Result<Option<ChainFault>, NodeError> {
        self.call(Command::Validate).await
    }

    pub async fn head(&self) -> Result<Head, NodeError> {
        Ok(self.call(Command::Head).await??)
    }

    pub async fn block(&self, index: u64) -> Result<Block, NodeError> {
        Ok(self.call(|r| Command::Block(index, r)).await??)
    }

    /// Asks the actor to stop after the commands already queued. Later calls
    /// on any handle fail with [`NodeError::ActorStopped`].
    pub async fn shutdown(&self) {
        // an error means the actor is already gone
        let _ = self.commands.send(Command::Shutdown).await;
    }

    /// Resolves once the actor has stopped.
    pub async fn stopped(&self) {
        let mut stopped = self.stopped.clone();
        let _ = stopped.wait_for(|stopped| *stopped).await;
    }

    /// Sends `event` to every subscriber; returns how many received it.
    pub fn publish(&self, event: LedgerEvent) -> usize {
        self.events.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.events.subscribe()
    }
}
