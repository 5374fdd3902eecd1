//! A running synchronization session
//!
//! A single worker task owns every trigger and runs passes one at a time:
//!
//! - the VFS version counter (re)arms the debounce deadline
//! - an elapsed deadline runs a VFS → local pass
//! - the poll interval runs a local → VFS pass
//! - [`SyncSession::request_sync`] queues a request that runs both
//!
//! An elapsed deadline is served before queued requests and poll ticks, so a
//! slow local pass cannot starve the VFS side. Missed poll ticks collapse into
//! one and version bumps collapse in the watch channel, so neither backlog
//! can grow. The snapshot mutex additionally guards against passes requested
//! directly through [`SyncSession::sync_vfs_to_local`] and friends.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use uuid::Uuid;

use super::engine::SyncEngine;
use super::report::PassOutcome;
use super::snapshot::SyncSnapshot;
use super::state::{SyncState, SyncStateKind, SyncStateMachine};
use crate::{Error, Result};

const REQUEST_CAPACITY: usize = 16;

/// Reply channel of a queued manual sync
type SyncRequest = oneshot::Sender<Result<()>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    VfsToLocal,
    LocalToVfs,
}

impl Direction {
    fn as_str(self) -> &'static str {
        match self {
            Self::VfsToLocal => "vfs-to-local",
            Self::LocalToVfs => "local-to-vfs",
        }
    }
}

/// Completed pass counts for a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub vfs_to_local_passes: usize,
    pub local_to_vfs_passes: usize,
}

struct Shared {
    id: Uuid,
    engine: SyncEngine,
    snapshot: Mutex<SyncSnapshot>,
    state: Arc<SyncStateMachine>,
    vfs_to_local_passes: AtomicUsize,
    local_to_vfs_passes: AtomicUsize,
    stop: watch::Sender<bool>,
}

impl Shared {
    fn stopped(&self) -> bool {
        *self.stop.borrow()
    }

    async fn run_pass(&self, direction: Direction) -> Result<PassOutcome> {
        if self.stopped() || self.state.kind() != SyncStateKind::Connected {
            return Ok(PassOutcome::Inactive);
        }

        let Ok(mut snapshot) = self.snapshot.try_lock() else {
            tracing::debug!(pass = direction.as_str(), "Pass already in flight");
            return Ok(PassOutcome::Busy);
        };

        let result = match direction {
            Direction::VfsToLocal => self.engine.sync_vfs_to_local(&mut snapshot).await,
            Direction::LocalToVfs => self.engine.sync_local_to_vfs(&mut snapshot).await,
        };
        drop(snapshot);

        match result {
            Ok(report) => {
                self.record_pass(direction);
                Ok(PassOutcome::Completed(report))
            }
            Err(e) if e.is_fatal() => {
                self.fail(&e);
                Err(e)
            }
            Err(e) => {
                tracing::warn!(pass = direction.as_str(), "Pass aborted: {}", e);
                Err(e)
            }
        }
    }

    fn record_pass(&self, direction: Direction) {
        let counter = match direction {
            Direction::VfsToLocal => &self.vfs_to_local_passes,
            Direction::LocalToVfs => &self.local_to_vfs_passes,
        };
        counter.fetch_add(1, Ordering::SeqCst);
        self.state.mark_pass();
    }

    /// Stop both loops and surface `err` through the state machine.
    fn fail(&self, err: &Error) {
        tracing::error!(session = %self.id, "Session halted: {}", err);
        if let Err(e) = self.state.transition(SyncState::Error {
            message: err.to_string(),
        }) {
            tracing::debug!("State already left connected: {}", e);
        }
        self.stop.send_replace(true);
    }

    async fn sync_both(&self) -> Result<()> {
        self.run_pass(Direction::VfsToLocal).await?;
        self.run_pass(Direction::LocalToVfs).await?;
        Ok(())
    }
}

/// A connected session: the engine plus its two steady-state loops.
///
/// Dropping a session without calling [`SyncSession::shutdown`] aborts its
/// tasks.
pub struct SyncSession {
    shared: Arc<Shared>,
    requests: mpsc::Sender<SyncRequest>,
    worker: Option<JoinHandle<()>>,
}

impl SyncSession {
    /// Spawn the worker for an engine that has finished its initial
    /// reconciliation.
    ///
    /// `versions` must have been subscribed before that reconciliation began,
    /// so VFS writes landing during the merge still arm the debounce.
    pub(crate) fn start(
        id: Uuid,
        engine: SyncEngine,
        snapshot: SyncSnapshot,
        state: Arc<SyncStateMachine>,
        versions: watch::Receiver<u64>,
        debounce: Duration,
        poll_interval: Duration,
    ) -> Self {
        let (stop, _) = watch::channel(false);

        let shared = Arc::new(Shared {
            id,
            engine,
            snapshot: Mutex::new(snapshot),
            state,
            vfs_to_local_passes: AtomicUsize::new(0),
            local_to_vfs_passes: AtomicUsize::new(0),
            stop,
        });

        let (requests, receiver) = mpsc::channel(REQUEST_CAPACITY);
        let worker = tokio::spawn(run_worker(
            shared.clone(),
            receiver,
            versions,
            debounce,
            poll_interval,
        ));

        tracing::info!(
            session = %id,
            root = %shared.engine.local().root().display(),
            debounce_ms = debounce.as_millis() as u64,
            poll_interval_ms = poll_interval.as_millis() as u64,
            "Sync session started"
        );

        Self {
            shared,
            requests,
            worker: Some(worker),
        }
    }

    pub fn id(&self) -> Uuid {
        self.shared.id
    }

    pub fn root(&self) -> &Path {
        self.shared.engine.local().root()
    }

    /// Whether the worker is still serving triggers.
    pub fn is_running(&self) -> bool {
        !self.shared.stopped() && self.worker.as_ref().is_some_and(|w| !w.is_finished())
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            vfs_to_local_passes: self.shared.vfs_to_local_passes.load(Ordering::SeqCst),
            local_to_vfs_passes: self.shared.local_to_vfs_passes.load(Ordering::SeqCst),
        }
    }

    /// Copy of the snapshot, taken once any in-flight pass finishes.
    pub async fn snapshot(&self) -> SyncSnapshot {
        self.shared.snapshot.lock().await.clone()
    }

    /// Run a VFS → local pass immediately.
    ///
    /// Returns [`PassOutcome::Busy`] instead of waiting when another pass
    /// holds the snapshot.
    pub async fn sync_vfs_to_local(&self) -> Result<PassOutcome> {
        self.shared.run_pass(Direction::VfsToLocal).await
    }

    /// Run a local → VFS pass immediately.
    pub async fn sync_local_to_vfs(&self) -> Result<PassOutcome> {
        self.shared.run_pass(Direction::LocalToVfs).await
    }

    /// Queue both passes behind any pending work and wait for them.
    pub async fn request_sync(&self) -> Result<()> {
        let (reply, done) = oneshot::channel();
        self.requests
            .send(reply)
            .await
            .map_err(|_| Error::NotConnected)?;
        done.await.map_err(|_| Error::NotConnected)?
    }

    /// Stop the worker and wait for it to exit.
    ///
    /// A pass already in progress is allowed to finish.
    pub async fn shutdown(mut self) {
        self.shared.stop.send_replace(true);
        if let Some(worker) = self.worker.take() {
            if let Err(e) = worker.await {
                tracing::warn!(session = %self.shared.id, "Session worker ended abnormally: {}", e);
            }
        }
        tracing::info!(session = %self.shared.id, "Sync session stopped");
    }
}

impl Drop for SyncSession {
    fn drop(&mut self) {
        if let Some(worker) = &self.worker {
            worker.abort();
        }
    }
}

impl std::fmt::Debug for SyncSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncSession")
            .field("id", &self.shared.id)
            .field("root", &self.root())
            .field("running", &self.is_running())
            .finish()
    }
}

async fn wait_for_stop(stop: &mut watch::Receiver<bool>) {
    loop {
        if *stop.borrow_and_update() {
            return;
        }
        if stop.changed().await.is_err() {
            return;
        }
    }
}

async fn run_worker(
    shared: Arc<Shared>,
    mut requests: mpsc::Receiver<SyncRequest>,
    mut versions: watch::Receiver<u64>,
    debounce: Duration,
    poll_interval: Duration,
) {
    let mut stop = shared.stop.subscribe();
    let mut ticker = tokio::time::interval_at(Instant::now() + poll_interval, poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut deadline: Option<Instant> = None;
    let mut watching = true;

    loop {
        let debounce_elapsed = async move {
            match deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending().await,
            }
        };

        let fatal = tokio::select! {
            biased;

            _ = wait_for_stop(&mut stop) => break,

            _ = debounce_elapsed => {
                deadline = None;
                match shared.run_pass(Direction::VfsToLocal).await {
                    Ok(PassOutcome::Busy) => {
                        deadline = Some(Instant::now() + debounce);
                        false
                    }
                    Ok(_) => false,
                    Err(e) => e.is_fatal(),
                }
            }

            changed = versions.changed(), if watching => {
                match changed {
                    Ok(()) => {
                        tracing::trace!(version = *versions.borrow_and_update(), "VFS changed");
                        deadline = Some(Instant::now() + debounce);
                    }
                    Err(_) => {
                        tracing::debug!(session = %shared.id, "VFS version channel closed");
                        watching = false;
                    }
                }
                false
            }

            request = requests.recv() => match request {
                Some(reply) => {
                    deadline = None;
                    let result = shared.sync_both().await;
                    let fatal = matches!(&result, Err(e) if e.is_fatal());
                    if let Err(unclaimed) = reply.send(result) {
                        tracing::debug!(
                            session = %shared.id,
                            "Manual sync caller went away, outcome: {:?}",
                            unclaimed
                        );
                    }
                    fatal
                }
                None => break,
            },

            _ = ticker.tick() => {
                // A busy snapshot skips this tick; the next one covers it
                match shared.run_pass(Direction::LocalToVfs).await {
                    Err(e) => e.is_fatal(),
                    Ok(_) => false,
                }
            }
        };

        if fatal {
            break;
        }
    }

    tracing::debug!(session = %shared.id, "Session worker exited");
}
