//! Collaboration flow state space.
//!
//! A flow is a single user-initiated request to join a shared tab group or
//! to share/manage an existing one. This module defines the flow descriptor,
//! the state space of the flow controller, and the static table of legal
//! state transitions. Runtime behavior (UI requests, timers, observer
//! subscriptions) lives in the application layer (ct-app).
//!
//! State transitions:
//! ```text
//! Pending
//!  ├── auth invalid ──────────────► Authenticating ──► CheckingFlowRequirements
//!  └── auth valid ────────────────► CheckingFlowRequirements
//!
//! CheckingFlowRequirements (Join)
//!  ├── already member + group in sync ──► OpeningLocalTabGroup
//!  ├── already member, no sync group ───► WaitingForSyncAndDataSharingGroup
//!  └── not a member, read-group ok ─────► AddingUserToGroup
//!
//! CheckingFlowRequirements (ShareOrManage)
//!  ├── group already shared ──► ShowingManageScreen
//!  └── group not shared ──────► ShowingShareScreen
//!
//! AddingUserToGroup ──► WaitingForSyncAndDataSharingGroup ──► OpeningLocalTabGroup
//!
//! Any state may fail into Error; user cancellation exits the flow directly.
//! ```

use serde::{Deserialize, Serialize};

use crate::group::GroupToken;
use crate::tab_groups::EitherGroupId;

/// Immutable descriptor of what a flow coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Flow {
    /// Join an existing shared group via an invitation token.
    Join { token: GroupToken },
    /// Share a local group, or manage one that is already shared.
    ShareOrManage { either_id: EitherGroupId },
}

impl Flow {
    pub fn is_join(&self) -> bool {
        matches!(self, Self::Join { .. })
    }

    /// The invitation token of a join flow.
    ///
    /// Panics when called on a share/manage flow; that is a programming
    /// error, not a runtime condition.
    pub fn join_token(&self) -> &GroupToken {
        match self {
            Self::Join { token } => token,
            Self::ShareOrManage { .. } => panic!("join_token() on a share/manage flow"),
        }
    }

    /// The target group of a share/manage flow.
    ///
    /// Panics when called on a join flow.
    pub fn either_id(&self) -> &EitherGroupId {
        match self {
            Self::ShareOrManage { either_id } => either_id,
            Self::Join { .. } => panic!("either_id() on a join flow"),
        }
    }
}

/// Result of a UI request, reported back by the delegate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Success,
    Failure,
    Cancel,
}

/// User-facing error categories.
///
/// The taxonomy is intentionally flat: all internal failure causes collapse
/// to `GenericError` before reaching the UI, with the specific cause only
/// logged at transition time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    GenericError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub kind: ErrorKind,
}

impl ErrorInfo {
    pub fn general() -> Self {
        Self {
            kind: ErrorKind::GenericError,
        }
    }
}

/// States of a collaboration flow. All new flows start in `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StateId {
    /// Request received; delegate is preparing its UI and authentication
    /// status has not been verified yet.
    Pending,

    /// Delegate is showing sign-in/sync screens; waiting for a result.
    Authenticating,

    /// Authentication is done; checking the requirements specific to the
    /// flow kind.
    CheckingFlowRequirements,

    /// Delegate is showing the join invitation screen.
    AddingUserToGroup,

    /// Waiting for the tab group to appear in sync and for the user to be a
    /// member of the people group.
    WaitingForSyncAndDataSharingGroup,

    /// Delegate is promoting the local tab group.
    OpeningLocalTabGroup,

    /// Delegate is showing the share sheet.
    ShowingShareScreen,

    /// Delegate is showing the manage-people screen.
    ShowingManageScreen,

    /// The flow was cancelled.
    Cancel,

    /// An error occurred and is being shown to the user.
    Error,
}

impl StateId {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Cancel | Self::Error)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Authenticating => "Authenticating",
            Self::CheckingFlowRequirements => "CheckingFlowRequirements",
            Self::AddingUserToGroup => "AddingUserToGroup",
            Self::WaitingForSyncAndDataSharingGroup => "WaitingForSyncAndDataSharingGroup",
            Self::OpeningLocalTabGroup => "OpeningLocalTabGroup",
            Self::ShowingShareScreen => "ShowingShareScreen",
            Self::ShowingManageScreen => "ShowingManageScreen",
            Self::Cancel => "Cancel",
            Self::Error => "Error",
        }
    }
}

impl std::fmt::Display for StateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The complete allow-list of legal `(from, to)` transitions.
///
/// Any transition outside this table is a programming defect; the controller
/// asserts membership before applying a transition.
pub const VALID_TRANSITIONS: [(StateId, StateId); 22] = {
    use StateId::*;
    [
        // Pending: initialization finished; route on authentication status,
        // or fail during initialization.
        (Pending, Authenticating),
        (Pending, CheckingFlowRequirements),
        (Pending, Error),
        // Authenticating: verified, cancelled by the user, or failed/timed
        // out.
        (Authenticating, CheckingFlowRequirements),
        (Authenticating, Cancel),
        (Authenticating, Error),
        // CheckingFlowRequirements: join path routes on current membership
        // and sync presence; share path routes on whether the group is
        // already shared.
        (CheckingFlowRequirements, AddingUserToGroup),
        (CheckingFlowRequirements, WaitingForSyncAndDataSharingGroup),
        (CheckingFlowRequirements, OpeningLocalTabGroup),
        (CheckingFlowRequirements, ShowingShareScreen),
        (CheckingFlowRequirements, ShowingManageScreen),
        (CheckingFlowRequirements, Error),
        // AddingUserToGroup: user accepted (with or without the sync group
        // already present), declined, or the invitation screen failed.
        (AddingUserToGroup, WaitingForSyncAndDataSharingGroup),
        (AddingUserToGroup, OpeningLocalTabGroup),
        (AddingUserToGroup, Cancel),
        (AddingUserToGroup, Error),
        // WaitingForSyncAndDataSharingGroup: both services confirmed the
        // group, or waiting failed.
        (WaitingForSyncAndDataSharingGroup, OpeningLocalTabGroup),
        (WaitingForSyncAndDataSharingGroup, Error),
        // Terminal UI states can still fail; promote may be cancelled to
        // clean up.
        (OpeningLocalTabGroup, Error),
        (OpeningLocalTabGroup, Cancel),
        (ShowingShareScreen, Error),
        (ShowingManageScreen, Error),
    ]
};

/// Whether `(from, to)` is a legal transition.
pub fn is_valid_transition(from: StateId, to: StateId) -> bool {
    VALID_TRANSITIONS.contains(&(from, to))
}
