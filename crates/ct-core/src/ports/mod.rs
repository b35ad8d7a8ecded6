//! Port interfaces for the application layer.
//!
//! Ports define the contract between the collaboration orchestration logic
//! and the browser subsystems it coordinates (identity, data sharing,
//! tab-group sync, the sync engine, and the per-flow UI delegate). The
//! application layer only ever sees these traits; concrete implementations
//! live with the embedding platform (or in test mocks).

pub mod data_sharing;
pub mod errors;
pub mod flow_delegate;
pub mod identity;
pub mod sync_engine;
pub mod tab_group_sync;

pub use data_sharing::DataSharingPort;
pub use errors::DataSharingError;
pub use flow_delegate::{FlowDelegatePort, OutcomeReply};
pub use identity::{AccountEvent, IdentityPort};
pub use sync_engine::SyncEnginePort;
pub use tab_group_sync::TabGroupSyncPort;
