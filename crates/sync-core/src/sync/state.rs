//! Public sync lifecycle
//!
//! ```text
//! disconnected -> syncing-initial -> connected
//!                      |   ^             |
//!                      v   |             v
//!                      error  <----------+
//! connected | error -> disconnected
//! ```

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use uuid::Uuid;

use crate::{Error, Result};

/// Lifecycle state, without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncStateKind {
    Disconnected,
    SyncingInitial,
    Connected,
    Error,
}

impl SyncStateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::SyncingInitial => "syncing-initial",
            Self::Connected => "connected",
            Self::Error => "error",
        }
    }

    /// Whether the lifecycle allows moving from `self` to `to`.
    pub fn can_transition_to(self, to: SyncStateKind) -> bool {
        use SyncStateKind::*;
        matches!(
            (self, to),
            (Disconnected, SyncingInitial)
                | (SyncingInitial, Connected)
                | (SyncingInitial, Error)
                | (Connected, Error)
                | (Error, SyncingInitial)
                | (Connected, Disconnected)
                | (Error, Disconnected)
        )
    }
}

impl fmt::Display for SyncStateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state with the data a UI needs to render it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum SyncState {
    Disconnected,
    /// Initial reconciliation, with completed fraction in `[0, 1]`.
    SyncingInitial { progress: f32 },
    Connected,
    /// A session-fatal failure, with a user-actionable message.
    Error { message: String },
}

impl SyncState {
    pub fn kind(&self) -> SyncStateKind {
        match self {
            Self::Disconnected => SyncStateKind::Disconnected,
            Self::SyncingInitial { .. } => SyncStateKind::SyncingInitial,
            Self::Connected => SyncStateKind::Connected,
            Self::Error { .. } => SyncStateKind::Error,
        }
    }
}

/// Everything observers see about the current session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncStatus {
    #[serde(flatten)]
    pub state: SyncState,
    pub session: Option<Uuid>,
    pub root: Option<PathBuf>,
    pub last_pass_at: Option<DateTime<Utc>>,
}

impl Default for SyncStatus {
    fn default() -> Self {
        Self {
            state: SyncState::Disconnected,
            session: None,
            root: None,
            last_pass_at: None,
        }
    }
}

/// Guards lifecycle transitions and broadcasts status to observers.
#[derive(Debug)]
pub struct SyncStateMachine {
    status: watch::Sender<SyncStatus>,
}

impl Default for SyncStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncStateMachine {
    pub fn new() -> Self {
        let (status, _) = watch::channel(SyncStatus::default());
        Self { status }
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.status.subscribe()
    }

    pub fn status(&self) -> SyncStatus {
        self.status.borrow().clone()
    }

    pub fn kind(&self) -> SyncStateKind {
        self.status.borrow().state.kind()
    }

    /// Move to `next`, rejecting transitions the lifecycle does not allow.
    pub fn transition(&self, next: SyncState) -> Result<()> {
        let mut outcome = Ok(());
        self.status.send_if_modified(|status| {
            let from = status.state.kind();
            let to = next.kind();
            if !from.can_transition_to(to) {
                outcome = Err(Error::InvalidTransition { from, to });
                return false;
            }
            tracing::info!(from = %from, to = %to, "Sync state changed");
            status.state = next;
            if to == SyncStateKind::Disconnected {
                status.session = None;
                status.root = None;
            }
            true
        });
        outcome
    }

    /// Advance initial-reconciliation progress. Never moves backwards.
    pub fn report_progress(&self, fraction: f32) {
        let fraction = fraction.clamp(0.0, 1.0);
        self.status.send_if_modified(|status| match &mut status.state {
            SyncState::SyncingInitial { progress } if fraction > *progress => {
                *progress = fraction;
                true
            }
            _ => false,
        });
    }

    pub(crate) fn attach(&self, session: Uuid, root: PathBuf) {
        self.status.send_modify(|status| {
            status.session = Some(session);
            status.root = Some(root);
            status.last_pass_at = None;
        });
    }

    pub(crate) fn mark_pass(&self) {
        self.status
            .send_modify(|status| status.last_pass_at = Some(Utc::now()));
    }
}
