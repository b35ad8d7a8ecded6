use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::tab_groups::{EitherGroupId, SavedGroup};

/// Access to the tab-group sync service.
#[async_trait]
pub trait TabGroupSyncPort: Send + Sync {
    async fn get_all_groups(&self) -> Vec<SavedGroup>;

    async fn get_group(&self, id: &EitherGroupId) -> Option<SavedGroup>;

    /// Subscribe to tab groups arriving from sync.
    fn subscribe_group_added(&self) -> mpsc::Receiver<SavedGroup>;
}
