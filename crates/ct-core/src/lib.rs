//! # ct-core
//!
//! Core domain models and business logic for CoTab shared tab-group
//! collaboration.
//!
//! This crate contains pure domain types without any infrastructure
//! dependencies: the collaboration flow state space, group/account value
//! types, service status model, and the hexagonal ports implemented by the
//! infrastructure layer.

pub mod account;
pub mod flow;
pub mod group;
pub mod ports;
pub mod settings;
pub mod status;
pub mod sync;
pub mod tab_groups;

// Re-export commonly used types at the crate root
pub use account::{AccountInfo, GaiaId};
pub use flow::{ErrorInfo, ErrorKind, Flow, Outcome, StateId};
pub use group::{GroupData, GroupId, GroupMember, GroupToken, MemberRole, SharedDataPreview};
pub use settings::{CollaborationFeature, CollaborationSettings};
pub use status::{CollaborationStatus, ServiceStatus, ServiceStatusUpdate, SigninStatus, SyncStatus};
pub use tab_groups::{EitherGroupId, LocalGroupId, SavedGroup, SyncGroupId};
