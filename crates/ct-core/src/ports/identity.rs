use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::account::AccountInfo;

/// Notifications from the identity backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountEvent {
    PrimaryAccountChanged,
    RefreshTokenUpdated,
    RefreshTokenRemoved,
    /// The identity backend is shutting down; subscribers must stop
    /// observing.
    Shutdown,
}

/// Access to the signed-in account state.
#[async_trait]
pub trait IdentityPort: Send + Sync {
    async fn primary_account(&self) -> Option<AccountInfo>;

    async fn has_primary_account(&self) -> bool;

    /// Whether the primary account also holds a usable refresh token. An
    /// account without one is signed in but paused.
    async fn has_primary_account_with_refresh_token(&self) -> bool;

    fn subscribe(&self) -> mpsc::Receiver<AccountEvent>;
}
