use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::sync::{DataType, SyncEngineEvent};

/// Access to the sync engine's configuration state.
#[async_trait]
pub trait SyncEnginePort: Send + Sync {
    /// Ask the engine to refresh the given data types soon.
    async fn trigger_refresh(&self, data_types: &[DataType]);

    /// Data types currently being synced for this profile.
    async fn active_data_types(&self) -> Vec<DataType>;

    fn is_sync_feature_enabled(&self) -> bool;

    fn subscribe(&self) -> mpsc::Receiver<SyncEngineEvent>;
}
