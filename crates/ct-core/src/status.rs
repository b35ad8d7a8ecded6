//! Service status model.
//!
//! The collaboration service tracks three independent status axes and
//! notifies observers only when the combined value actually changes.

use serde::{Deserialize, Serialize};

/// Sign-in axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SigninStatus {
    #[default]
    NotSignedIn,
    SignedIn,
    /// The account is present but its credentials need to be refreshed.
    SignedInPaused,
}

/// Sync axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncStatus {
    #[default]
    NotSyncing,
    /// Sync is on, but the tab-group data types are not enabled.
    SyncWithoutTabGroups,
    SyncEnabled,
}

/// Collaboration feature axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollaborationStatus {
    #[default]
    Disabled,
    AllowedToJoin,
    EnabledCreateAndJoin,
}

/// Combined service status, recomputed on every underlying signal and
/// compared by value against the previous snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub signin_status: SigninStatus,
    pub sync_status: SyncStatus,
    pub collaboration_status: CollaborationStatus,
}

impl ServiceStatus {
    /// Whether the user can proceed past authentication: signed in with a
    /// usable token and the tab-group data types syncing.
    pub fn is_authentication_valid(&self) -> bool {
        self.signin_status == SigninStatus::SignedIn && self.sync_status == SyncStatus::SyncEnabled
    }
}

/// Payload delivered to status observers on every actual change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStatusUpdate {
    pub old_status: ServiceStatus,
    pub new_status: ServiceStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authentication_requires_signin_and_full_sync() {
        let mut status = ServiceStatus::default();
        assert!(!status.is_authentication_valid());

        status.signin_status = SigninStatus::SignedIn;
        assert!(!status.is_authentication_valid());

        status.sync_status = SyncStatus::SyncEnabled;
        assert!(status.is_authentication_valid());
    }

    #[test]
    fn paused_signin_is_not_valid() {
        let status = ServiceStatus {
            signin_status: SigninStatus::SignedInPaused,
            sync_status: SyncStatus::SyncEnabled,
            collaboration_status: CollaborationStatus::EnabledCreateAndJoin,
        };
        assert!(!status.is_authentication_valid());
    }

    #[test]
    fn partial_sync_is_not_valid() {
        let status = ServiceStatus {
            signin_status: SigninStatus::SignedIn,
            sync_status: SyncStatus::SyncWithoutTabGroups,
            collaboration_status: CollaborationStatus::EnabledCreateAndJoin,
        };
        assert!(!status.is_authentication_valid());
    }
}
