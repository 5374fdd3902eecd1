//! Reconciliation engine, session loops and lifecycle

mod controller;
mod engine;
mod report;
mod session;
mod snapshot;
mod state;

pub use controller::SyncController;
pub use engine::SyncEngine;
pub use report::{PassOutcome, PassReport};
pub use session::{SessionStats, SyncSession};
pub use snapshot::SyncSnapshot;
pub use state::{SyncState, SyncStateKind, SyncStateMachine, SyncStatus};
