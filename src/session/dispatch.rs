use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::manager::SessionManager;
use crate::sync::lock;
use crate::voice::{ChannelId, MembershipEvent};

const WORKER_QUEUE: usize = 100;

type Workers = Arc<Mutex<HashMap<ChannelId, Worker>>>;

struct Worker {
    id: u64,
    tx: mpsc::Sender<Arc<MembershipEvent>>,
    handle: JoinHandle<()>,
}

/// Routes membership events to one worker task per voice channel
///
/// Events for a channel are handled in arrival order; a stop/upload in one
/// channel never holds up another channel's queue. A worker exits once its
/// queue is empty and its channel is not recording.
pub struct EventDispatcher {
    manager: Arc<SessionManager>,
    workers: Workers,
    next_worker_id: AtomicU64,
}

impl EventDispatcher {
    pub fn new(manager: Arc<SessionManager>) -> Self {
        Self {
            manager,
            workers: Arc::new(Mutex::new(HashMap::new())),
            next_worker_id: AtomicU64::new(1),
        }
    }

    pub async fn dispatch(&self, event: MembershipEvent) {
        let event = Arc::new(event);

        for channel_id in event.channel_ids() {
            self.enqueue(channel_id, Arc::clone(&event)).await;
        }
    }

    /// Stop accepting events and wait for queued ones to finish
    pub async fn close(&self) {
        let workers: Vec<(ChannelId, Worker)> = lock(&self.workers).drain().collect();
        info!("Draining {} channel worker(s)", workers.len());

        for (channel_id, worker) in workers {
            drop(worker.tx);
            if let Err(e) = worker.handle.await {
                error!("Worker for channel {} panicked: {}", channel_id, e);
            }
        }
    }

    /// Channels with a live worker
    pub fn active_workers(&self) -> usize {
        lock(&self.workers).len()
    }

    async fn enqueue(&self, channel_id: ChannelId, mut event: Arc<MembershipEvent>) {
        for _ in 0..2 {
            // Queue under the map lock so a worker cannot retire in between
            let tx = {
                let mut workers = lock(&self.workers);
                let worker = workers
                    .entry(channel_id)
                    .or_insert_with(|| self.spawn_worker(channel_id));

                match worker.tx.try_send(event) {
                    Ok(()) => return,
                    Err(TrySendError::Full(rejected)) => {
                        event = rejected;
                        worker.tx.clone()
                    }
                    Err(TrySendError::Closed(rejected)) => {
                        error!("Worker for channel {} is gone, restarting it", channel_id);
                        workers.remove(&channel_id);
                        event = rejected;
                        continue;
                    }
                }
            };

            debug!("Queue for channel {} is full, waiting", channel_id);
            match tx.send(event).await {
                Ok(()) => return,
                Err(mpsc::error::SendError(rejected)) => event = rejected,
            }
        }

        error!("Dropping event for channel {}", channel_id);
    }

    fn spawn_worker(&self, channel_id: ChannelId) -> Worker {
        let id = self.next_worker_id.fetch_add(1, Ordering::SeqCst);
        let (tx, mut rx) = mpsc::channel::<Arc<MembershipEvent>>(WORKER_QUEUE);
        let manager = Arc::clone(&self.manager);
        let workers = Arc::clone(&self.workers);

        let handle = tokio::spawn(async move {
            debug!("Worker for channel {} started", channel_id);
            while let Some(event) = rx.recv().await {
                manager.handle_event_on(channel_id, &event).await;

                let idle = rx.is_empty() && !manager.is_recording(channel_id);
                if idle && retire(&workers, channel_id, id, &rx) {
                    rx.close();
                    // Sends that were already in flight
                    while let Some(event) = rx.recv().await {
                        manager.handle_event_on(channel_id, &event).await;
                    }
                    break;
                }
            }
            debug!("Worker for channel {} stopped", channel_id);
        });

        Worker { id, tx, handle }
    }
}

/// Remove worker `id` from the map if its queue is still empty
fn retire(
    workers: &Workers,
    channel_id: ChannelId,
    id: u64,
    rx: &mpsc::Receiver<Arc<MembershipEvent>>,
) -> bool {
    let mut workers = lock(workers);
    let current = workers.get(&channel_id).is_some_and(|w| w.id == id);
    if current && rx.is_empty() {
        workers.remove(&channel_id);
        true
    } else {
        false
    }
}
