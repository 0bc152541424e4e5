//! Per-chat dispatcher.
//!
//! Every chat gets its own worker task fed through an unbounded queue, so a
//! chat's messages are routed strictly in arrival order while different
//! chats run in parallel, and the shared dispatch loop never waits on a
//! busy chat. A worker exits after sitting idle and removes itself from the
//! worker table; the next message for that chat starts a fresh one, which
//! first waits for its predecessor to finish.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use shopwright_core::channel::{Channel, ChannelMessage};
use shopwright_core::error::ChannelError;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::router::AdminRouter;

const DEFAULT_WORKER_IDLE: Duration = Duration::from_secs(300);

struct Worker {
    generation: u64,
    tx: mpsc::UnboundedSender<ChannelMessage>,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct WorkerTable {
    next_generation: u64,
    workers: HashMap<String, Worker>,
}

type SharedTable = Arc<Mutex<WorkerTable>>;

pub struct Dispatcher {
    router: Arc<AdminRouter>,
    channel: Arc<dyn Channel>,
    worker_idle: Duration,
    table: SharedTable,
}

impl Dispatcher {
    pub fn new(router: Arc<AdminRouter>, channel: Arc<dyn Channel>) -> Self {
        Self {
            router,
            channel,
            worker_idle: DEFAULT_WORKER_IDLE,
            table: Arc::new(Mutex::new(WorkerTable::default())),
        }
    }

    /// How long a chat worker waits for its next message before exiting.
    pub fn with_worker_idle(mut self, idle: Duration) -> Self {
        self.worker_idle = idle;
        self
    }

    pub fn router(&self) -> &Arc<AdminRouter> {
        &self.router
    }

    /// Number of chats tracked in the worker table.
    pub async fn worker_count(&self) -> usize {
        self.table.lock().await.workers.len()
    }

    /// Queue `msg` on its chat's worker, starting one if needed.
    /// Never waits for the chat's earlier messages to be handled.
    pub async fn dispatch(&self, msg: ChannelMessage) {
        let chat_id = msg.chat_id.clone();
        let mut msg = msg;
        loop {
            let tx = self.sender_for(&chat_id).await;
            match tx.send(msg) {
                Ok(()) => return,
                // The worker went idle between lookup and send
                Err(mpsc::error::SendError(returned)) => msg = returned,
            }
        }
    }

    async fn sender_for(&self, chat_id: &str) -> mpsc::UnboundedSender<ChannelMessage> {
        let mut table = self.table.lock().await;
        if let Some(worker) = table.workers.get(chat_id) {
            if !worker.tx.is_closed() {
                return worker.tx.clone();
            }
        }

        let previous = table.workers.remove(chat_id).map(|w| w.handle);
        let generation = table.next_generation;
        table.next_generation += 1;
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_worker(
            WorkerSlot {
                chat_id: chat_id.to_string(),
                generation,
                table: self.table.clone(),
            },
            rx,
            previous,
            self.router.clone(),
            self.channel.clone(),
            self.worker_idle,
        ));
        debug!(chat_id, generation, "Started chat worker");
        table.workers.insert(
            chat_id.to_string(),
            Worker {
                generation,
                tx: tx.clone(),
                handle,
            },
        );
        tx
    }

/// Start the channel and dispatch until its stream ends.
    pub async fn run(&self) -> Result<(), ChannelError> {
        let mut rx = self.channel.start().await?;
        info!(channel = self.channel.name(), "Dispatcher running");

        while let Some(item) = rx.recv().await {
            match item {
                Ok(msg) => self.dispatch(msg).await,
                Err(e) => warn!(channel = self.channel.name(), error = %e, "Channel error"),
            }
        }

        info!(channel = self.channel.name(), "Channel closed, draining workers");
        self.shutdown().await;
        Ok(())
    }

    /// Let every worker finish its queue, then stop it.
    pub async fn shutdown(&self) {
        let workers: Vec<Worker> = self
            .table
            .lock()
            .await
            .workers
            .drain()
            .map(|(_, w)| w)
            .collect();
        for worker in workers {
            drop(worker.tx);
            if let Err(e) = worker.handle.await {
                warn!(error = %e, "Chat worker failed");
            }
        }
    }
}

/// Where a worker sits in the worker table.
struct WorkerSlot {
    chat_id: String,
    generation: u64,
    table: SharedTable,
}

impl WorkerSlot {
    /// Drop this worker's table entry unless a successor already replaced it.
    async fn release(&self) {
        let mut table = self.table.lock().await;
        if table
            .workers
            .get(&self.chat_id)
            .is_some_and(|w| w.generation == self.generation)
        {
            table.workers.remove(&self.chat_id);
        }
    }
}

async fn run_worker(
    slot: WorkerSlot,
    mut rx: mpsc::UnboundedReceiver<ChannelMessage>,
    previous: Option<JoinHandle<()>>,
    router: Arc<AdminRouter>,
    channel: Arc<dyn Channel>,
    idle: Duration,
) {
    if let Some(previous) = previous {
        if let Err(e) = previous.await {
            warn!(chat_id = %slot.chat_id, error = %e, "Previous chat worker failed");
        }
    }

    loop {
        match tokio::time::timeout(idle, rx.recv()).await {
            Ok(Some(msg)) => deliver(&router, channel.as_ref(), &msg).await,
            Ok(None) => break,
            Err(_) => {
                // Refuse new messages, then finish what is already queued
                rx.close();
                while let Ok(msg) = rx.try_recv() {
                    deliver(&router, channel.as_ref(), &msg).await;
                }
                debug!(chat_id = %slot.chat_id, "Chat worker idle, exiting");
                break;
            }
        }
    }
    slot.release().await;
}

async fn deliver(router: &AdminRouter, channel: &dyn Channel, msg: &ChannelMessage) {
    for reply in router.route(msg).await {
        if let Err(e) = channel.send(&msg.chat_id, &reply).await {
            warn!(chat_id = %msg.chat_id, error = %e, "Reply delivery failed");
        }
    }
}
