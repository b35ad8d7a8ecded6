//! Sync engine domain types.

use serde::{Deserialize, Serialize};

/// Sync data types relevant to collaboration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// Tab groups saved to the user's account.
    SavedTabGroup,
    /// Per-tab shared state inside a shared group.
    SharedTabGroupData,
    /// Membership records of the people groups themselves.
    CollaborationGroup,
}

/// Notifications from the sync engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncEngineEvent {
    /// The engine's configuration or set of active data types changed.
    StateChanged,
    /// The engine is shutting down; subscribers must stop observing.
    Shutdown,
}
