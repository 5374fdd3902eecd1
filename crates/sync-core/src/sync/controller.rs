//! Composition root for synchronization

use std::sync::Arc;

use tokio::sync::watch;
use uuid::Uuid;

use super::engine::SyncEngine;
use super::report::PassReport;
use super::session::SyncSession;
use super::snapshot::SyncSnapshot;
use super::state::{SyncState, SyncStateKind, SyncStateMachine, SyncStatus};
use crate::config::SyncConfig;
use crate::local::{DirectoryPicker, LocalStore};
use crate::vfs::{VfsRuntime, VfsStore};
use crate::{Error, Result};

/// Owns at most one [`SyncSession`] and the lifecycle around it.
///
/// The application constructs one controller and hands out status receivers
/// from [`SyncController::subscribe`] to whatever needs to render sync state.
pub struct SyncController {
    runtime: Arc<dyn VfsRuntime>,
    config: SyncConfig,
    state: Arc<SyncStateMachine>,
    session: Option<SyncSession>,
    grant: Option<Arc<dyn LocalStore>>,
}

impl SyncController {
    pub fn new(runtime: Arc<dyn VfsRuntime>, config: SyncConfig) -> Self {
        Self {
            runtime,
            config,
            state: Arc::new(SyncStateMachine::new()),
            session: None,
            grant: None,
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.state.subscribe()
    }

    pub fn status(&self) -> SyncStatus {
        self.state.status()
    }

    /// The live session, if one has been started.
    ///
    /// After a fatal error the stopped session stays here until the next
    /// `connect`, `retry` or `disconnect`.
    pub fn session(&self) -> Option<&SyncSession> {
        self.session.as_ref()
    }

    /// Obtain a directory grant and run the initial reconciliation.
    ///
    /// Fails with [`Error::UnsupportedPlatform`] before touching any state
    /// when the picker has no capability, and with
    /// [`Error::InvalidTransition`] while a session is already connected.
    pub async fn connect(&mut self, picker: &dyn DirectoryPicker) -> Result<PassReport> {
        if !picker.is_supported() {
            tracing::warn!("Directory picker unavailable on this platform");
            return Err(Error::UnsupportedPlatform);
        }
        self.ensure_can_start()?;

        let store = picker.pick().await?;
        self.start(store).await
    }

    /// Reconnect to the most recently granted directory without asking the
    /// picker again.
    pub async fn retry(&mut self) -> Result<PassReport> {
        let store = self.grant.clone().ok_or(Error::NotConnected)?;
        self.ensure_can_start()?;
        self.start(store).await
    }

    /// Stop the session and release the directory grant. Idempotent.
    pub async fn disconnect(&mut self) -> Result<()> {
        self.reap().await;
        self.grant = None;

        match self.state.kind() {
            SyncStateKind::Disconnected => Ok(()),
            SyncStateKind::SyncingInitial => {
                // A connect future was dropped mid-reconciliation
                self.state.transition(SyncState::Error {
                    message: "initial synchronization was interrupted".to_string(),
                })?;
                self.state.transition(SyncState::Disconnected)
            }
            SyncStateKind::Connected | SyncStateKind::Error => {
                self.state.transition(SyncState::Disconnected)
            }
        }
    }

    /// Run both propagation passes now. A no-op unless connected.
    pub async fn sync_now(&self) -> Result<()> {
        match &self.session {
            Some(session) if self.state.kind() == SyncStateKind::Connected => {
                session.request_sync().await
            }
            _ => {
                tracing::debug!("Manual sync requested while not connected");
                Ok(())
            }
        }
    }

    fn ensure_can_start(&self) -> Result<()> {
        self.config.validate()?;
        let from = self.state.kind();
        let to = SyncStateKind::SyncingInitial;
        if from.can_transition_to(to) {
            Ok(())
        } else {
            Err(Error::InvalidTransition { from, to })
        }
    }

    async fn reap(&mut self) {
        if let Some(session) = self.session.take() {
            session.shutdown().await;
        }
    }

    async fn start(&mut self, store: Arc<dyn LocalStore>) -> Result<PassReport> {
        self.reap().await;
        self.grant = Some(store.clone());

        self.state
            .transition(SyncState::SyncingInitial { progress: 0.0 })?;
        let id = Uuid::new_v4();
        self.state.attach(id, store.root().to_path_buf());

        let engine = SyncEngine::new(
            store,
            VfsStore::new(self.runtime.clone(), self.config.vfs_root.as_str()),
            self.config.policy(),
        );
        let mut snapshot = SyncSnapshot::new();
        let state = self.state.clone();
        // Writes landing mid-merge must still reach the disk afterwards
        let versions = engine.vfs().subscribe();

        let report = match engine
            .initial_reconcile(&mut snapshot, |fraction| state.report_progress(fraction))
            .await
        {
            Ok(report) => report,
            Err(e) => {
                tracing::error!(session = %id, "Initial synchronization failed: {}", e);
                self.state.transition(SyncState::Error {
                    message: e.to_string(),
                })?;
                return Err(e);
            }
        };

        self.state.transition(SyncState::Connected)?;
        self.state.mark_pass();
        self.session = Some(SyncSession::start(
            id,
            engine,
            snapshot,
            self.state.clone(),
            versions,
            self.config.debounce(),
            self.config.poll_interval(),
        ));
        Ok(report)
    }
}

impl std::fmt::Debug for SyncController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncController")
            .field("config", &self.config)
            .field("state", &self.state.kind())
            .field("session", &self.session)
            .finish()
    }
}
