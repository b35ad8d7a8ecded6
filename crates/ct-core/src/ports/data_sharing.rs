use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::group::{GroupData, GroupId, GroupToken};

use super::errors::DataSharingError;

/// Access to the data-sharing (people group) backend.
#[async_trait]
pub trait DataSharingPort: Send + Sync {
    /// Extract the invitation token from a data-sharing URL.
    ///
    /// Pure string parsing; no network involved.
    fn parse_data_sharing_url(&self, url: &str) -> Result<GroupToken, DataSharingError>;

    /// Fetch a group the user is not yet a member of, using the invitation
    /// token. Hits the network.
    async fn read_new_group(&self, token: GroupToken) -> Result<GroupData, DataSharingError>;

    /// Look up a group from the local cache of groups the user belongs to.
    async fn read_group(&self, group_id: &GroupId) -> Option<GroupData>;

    /// Subscribe to groups becoming visible to the user (membership
    /// propagated from the backend).
    fn subscribe_group_added(&self) -> mpsc::Receiver<GroupData>;
}
