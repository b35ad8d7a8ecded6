//! Hand-written mock ports shared by the collaboration integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use ct_app::ServiceStatusSource;
use ct_core::account::AccountInfo;
use ct_core::flow::ErrorInfo;
use ct_core::group::{GroupData, GroupId, GroupMember, GroupToken, SharedDataPreview};
use ct_core::ports::errors::DataSharingError;
use ct_core::ports::{
    AccountEvent, DataSharingPort, FlowDelegatePort, IdentityPort, OutcomeReply, SyncEnginePort,
    TabGroupSyncPort,
};
use ct_core::status::{ServiceStatus, ServiceStatusUpdate, SigninStatus, SyncStatus};
use ct_core::sync::{DataType, SyncEngineEvent};
use ct_core::tab_groups::{EitherGroupId, SavedGroup};
use ct_core::MemberRole;

pub const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Install the fmt subscriber once per test binary; `RUST_LOG` overrides the
/// default filter.
pub fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_test_writer()
            .init();
    });
}

/// One UI request as seen by the test, reply included.
#[derive(Debug)]
pub enum DelegateRequest {
    PrepareFlowUi(OutcomeReply),
    ShowError(ErrorInfo, OutcomeReply),
    Cancel(OutcomeReply),
    ShowAuthenticationUi(OutcomeReply),
    NotifySigninAndSyncStatusChange,
    ShowJoinDialog(GroupToken, SharedDataPreview, OutcomeReply),
    ShowShareDialog(EitherGroupId, OutcomeReply),
    ShowManageDialog(EitherGroupId, OutcomeReply),
    PromoteTabGroup(GroupId, OutcomeReply),
    PromoteCurrentScreen,
}

/// Delegate that forwards every request to the test over a channel.
pub struct ChannelDelegate {
    tx: mpsc::Sender<DelegateRequest>,
}

impl ChannelDelegate {
    pub fn new() -> (Arc<Self>, mpsc::Receiver<DelegateRequest>) {
        let (tx, rx) = mpsc::channel(32);
        (Arc::new(Self { tx }), rx)
    }
}

#[async_trait]
impl FlowDelegatePort for ChannelDelegate {
    async fn prepare_flow_ui(&self, reply: OutcomeReply) {
        let _ = self.tx.send(DelegateRequest::PrepareFlowUi(reply)).await;
    }

    async fn show_error(&self, error: ErrorInfo, reply: OutcomeReply) {
        let _ = self.tx.send(DelegateRequest::ShowError(error, reply)).await;
    }

    async fn cancel(&self, reply: OutcomeReply) {
        let _ = self.tx.send(DelegateRequest::Cancel(reply)).await;
    }

    async fn show_authentication_ui(&self, reply: OutcomeReply) {
        let _ = self
            .tx
            .send(DelegateRequest::ShowAuthenticationUi(reply))
            .await;
    }

    async fn notify_signin_and_sync_status_change(&self) {
        let _ = self
            .tx
            .send(DelegateRequest::NotifySigninAndSyncStatusChange)
            .await;
    }

    async fn show_join_dialog(
        &self,
        token: GroupToken,
        preview: SharedDataPreview,
        reply: OutcomeReply,
    ) {
        let _ = self
            .tx
            .send(DelegateRequest::ShowJoinDialog(token, preview, reply))
            .await;
    }

    async fn show_share_dialog(&self, either_id: EitherGroupId, reply: OutcomeReply) {
        let _ = self
            .tx
            .send(DelegateRequest::ShowShareDialog(either_id, reply))
            .await;
    }

    async fn show_manage_dialog(&self, either_id: EitherGroupId, reply: OutcomeReply) {
        let _ = self
            .tx
            .send(DelegateRequest::ShowManageDialog(either_id, reply))
            .await;
    }

    async fn promote_tab_group(&self, group_id: GroupId, reply: OutcomeReply) {
        let _ = self
            .tx
            .send(DelegateRequest::PromoteTabGroup(group_id, reply))
            .await;
    }

    async fn promote_current_screen(&self) {
        let _ = self.tx.send(DelegateRequest::PromoteCurrentScreen).await;
    }
}

/// Receive the next delegate request or fail the test.
pub async fn next_request(rx: &mut mpsc::Receiver<DelegateRequest>) -> DelegateRequest {
    tokio::time::timeout(RECV_TIMEOUT, rx.recv())
        .await
        .expect("timed out waiting for a delegate request")
        .expect("delegate channel closed")
}

/// Data-sharing backend: invitation URLs of the form
/// `cotab://join/<group>/<secret>`, an in-memory membership cache, and a
/// fetchable set of invitation groups.
#[derive(Default)]
pub struct MockDataSharing {
    groups: Mutex<HashMap<GroupId, GroupData>>,
    new_groups: Mutex<HashMap<GroupToken, GroupData>>,
    group_added: Mutex<Vec<mpsc::Sender<GroupData>>>,
}

impl MockDataSharing {
    pub fn add_member_group(&self, group: GroupData) {
        self.groups
            .lock()
            .unwrap()
            .insert(group.group_id().clone(), group);
    }

    pub fn add_invitation_group(&self, group: GroupData) {
        self.new_groups
            .lock()
            .unwrap()
            .insert(group.group_token.clone(), group);
    }

    /// Membership propagated from the backend: cache the group and notify
    /// subscribers.
    pub async fn notify_group_added(&self, group: GroupData) {
        self.add_member_group(group.clone());
        let senders: Vec<_> = self.group_added.lock().unwrap().clone();
        for tx in senders {
            let _ = tx.send(group.clone()).await;
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.group_added.lock().unwrap().len()
    }
}

#[async_trait]
impl DataSharingPort for MockDataSharing {
    fn parse_data_sharing_url(&self, url: &str) -> Result<GroupToken, DataSharingError> {
        let rest = url
            .strip_prefix("cotab://join/")
            .ok_or_else(|| DataSharingError::InvalidUrl(url.to_string()))?;
        match rest.split_once('/') {
            Some((group, secret)) if !group.is_empty() && !secret.is_empty() => {
                Ok(GroupToken::new(GroupId::from(group), secret))
            }
            _ => Err(DataSharingError::InvalidUrl(url.to_string())),
        }
    }

    async fn read_new_group(&self, token: GroupToken) -> Result<GroupData, DataSharingError> {
        self.new_groups
            .lock()
            .unwrap()
            .get(&token)
            .cloned()
            .ok_or_else(|| DataSharingError::ReadGroupFailed(token.group_id.to_string()))
    }

    async fn read_group(&self, group_id: &GroupId) -> Option<GroupData> {
        self.groups.lock().unwrap().get(group_id).cloned()
    }

    fn subscribe_group_added(&self) -> mpsc::Receiver<GroupData> {
        let (tx, rx) = mpsc::channel(8);
        self.group_added.lock().unwrap().push(tx);
        rx
    }
}

/// Tab-group sync service over an in-memory list.
#[derive(Default)]
pub struct MockTabGroupSync {
    groups: Mutex<Vec<SavedGroup>>,
    group_added: Mutex<Vec<mpsc::Sender<SavedGroup>>>,
}

impl MockTabGroupSync {
    pub fn add_group(&self, group: SavedGroup) {
        self.groups.lock().unwrap().push(group);
    }

    pub async fn notify_group_added(&self, group: SavedGroup) {
        self.add_group(group.clone());
        let senders: Vec<_> = self.group_added.lock().unwrap().clone();
        for tx in senders {
            let _ = tx.send(group.clone()).await;
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.group_added.lock().unwrap().len()
    }
}

#[async_trait]
impl TabGroupSyncPort for MockTabGroupSync {
    async fn get_all_groups(&self) -> Vec<SavedGroup> {
        self.groups.lock().unwrap().clone()
    }

    async fn get_group(&self, id: &EitherGroupId) -> Option<SavedGroup> {
        self.groups
            .lock()
            .unwrap()
            .iter()
            .find(|group| group.matches(id))
            .cloned()
    }

    fn subscribe_group_added(&self) -> mpsc::Receiver<SavedGroup> {
        let (tx, rx) = mpsc::channel(8);
        self.group_added.lock().unwrap().push(tx);
        rx
    }
}

#[derive(Default)]
pub struct MockSyncEngine {
    active: Mutex<Vec<DataType>>,
    feature_enabled: AtomicBool,
    refresh_count: AtomicU64,
    subscribers: Mutex<Vec<mpsc::Sender<SyncEngineEvent>>>,
}

impl MockSyncEngine {
    pub fn set_active_data_types(&self, types: Vec<DataType>) {
        *self.active.lock().unwrap() = types;
    }

    pub fn set_feature_enabled(&self, enabled: bool) {
        self.feature_enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn refresh_count(&self) -> u64 {
        self.refresh_count.load(Ordering::SeqCst)
    }

    pub async fn notify(&self, event: SyncEngineEvent) {
        let senders: Vec<_> = self.subscribers.lock().unwrap().clone();
        for tx in senders {
            let _ = tx.send(event).await;
        }
    }
}

#[async_trait]
impl SyncEnginePort for MockSyncEngine {
    async fn trigger_refresh(&self, _data_types: &[DataType]) {
        self.refresh_count.fetch_add(1, Ordering::SeqCst);
    }

    async fn active_data_types(&self) -> Vec<DataType> {
        self.active.lock().unwrap().clone()
    }

    fn is_sync_feature_enabled(&self) -> bool {
        self.feature_enabled.load(Ordering::SeqCst)
    }

    fn subscribe(&self) -> mpsc::Receiver<SyncEngineEvent> {
        let (tx, rx) = mpsc::channel(8);
        self.subscribers.lock().unwrap().push(tx);
        rx
    }
}

#[derive(Default)]
pub struct MockIdentity {
    account: Mutex<Option<AccountInfo>>,
    has_refresh_token: AtomicBool,
    subscribers: Mutex<Vec<mpsc::Sender<AccountEvent>>>,
}

impl MockIdentity {
    pub fn set_account(&self, account: Option<AccountInfo>) {
        *self.account.lock().unwrap() = account;
    }

    pub fn set_refresh_token(&self, present: bool) {
        self.has_refresh_token.store(present, Ordering::SeqCst);
    }

    pub fn sign_in(&self, gaia: &str) {
        self.set_account(Some(AccountInfo {
            gaia: gaia.into(),
            email: format!("{gaia}@example.com"),
        }));
        self.set_refresh_token(true);
    }

    pub async fn notify(&self, event: AccountEvent) {
        let senders: Vec<_> = self.subscribers.lock().unwrap().clone();
        for tx in senders {
            let _ = tx.send(event).await;
        }
    }
}

#[async_trait]
impl IdentityPort for MockIdentity {
    async fn primary_account(&self) -> Option<AccountInfo> {
        self.account.lock().unwrap().clone()
    }

    async fn has_primary_account(&self) -> bool {
        self.account.lock().unwrap().is_some()
    }

    async fn has_primary_account_with_refresh_token(&self) -> bool {
        self.account.lock().unwrap().is_some() && self.has_refresh_token.load(Ordering::SeqCst)
    }

    fn subscribe(&self) -> mpsc::Receiver<AccountEvent> {
        let (tx, rx) = mpsc::channel(8);
        self.subscribers.lock().unwrap().push(tx);
        rx
    }
}

/// Status source for driving a controller without the full service.
pub struct FakeStatusSource {
    status: Mutex<ServiceStatus>,
    role: Mutex<MemberRole>,
    subscribers: Mutex<Vec<mpsc::Sender<ServiceStatusUpdate>>>,
}

impl FakeStatusSource {
    pub fn new(status: ServiceStatus, role: MemberRole) -> Arc<Self> {
        Arc::new(Self {
            status: Mutex::new(status),
            role: Mutex::new(role),
            subscribers: Mutex::new(Vec::new()),
        })
    }

    pub fn set_role(&self, role: MemberRole) {
        *self.role.lock().unwrap() = role;
    }

    /// Change the status and deliver the update to subscribers.
    pub async fn set_status(&self, new_status: ServiceStatus) {
        let old_status = {
            let mut guard = self.status.lock().unwrap();
            std::mem::replace(&mut *guard, new_status)
        };
        let update = ServiceStatusUpdate {
            old_status,
            new_status,
        };
        let senders: Vec<_> = self.subscribers.lock().unwrap().clone();
        for tx in senders {
            let _ = tx.send(update).await;
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().unwrap().len()
    }
}

#[async_trait]
impl ServiceStatusSource for FakeStatusSource {
    fn service_status(&self) -> ServiceStatus {
        *self.status.lock().unwrap()
    }

    async fn subscribe_status_changes(&self) -> mpsc::Receiver<ServiceStatusUpdate> {
        let (tx, rx) = mpsc::channel(8);
        self.subscribers.lock().unwrap().push(tx);
        rx
    }

    async fn current_user_role_for_group(&self, _group_id: &GroupId) -> MemberRole {
        *self.role.lock().unwrap()
    }
}

pub fn valid_status() -> ServiceStatus {
    ServiceStatus {
        signin_status: SigninStatus::SignedIn,
        sync_status: SyncStatus::SyncEnabled,
        ..ServiceStatus::default()
    }
}

pub fn member(gaia: &str, role: MemberRole) -> GroupMember {
    GroupMember {
        gaia_id: gaia.into(),
        display_name: gaia.to_string(),
        role,
    }
}

pub fn group_data(token: &GroupToken, name: &str, members: Vec<GroupMember>) -> GroupData {
    GroupData {
        group_token: token.clone(),
        display_name: name.to_string(),
        members,
    }
}

/// Wait until `count()` reaches `expected`; used to synchronize with watcher
/// registration before pushing notifications at the mocks.
pub async fn wait_for_count(count: impl Fn() -> usize, expected: usize) {
    tokio::time::timeout(RECV_TIMEOUT, async {
        loop {
            if count() >= expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .expect("timed out waiting for subscribers")
}
