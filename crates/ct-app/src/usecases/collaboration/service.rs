//! Process-wide collaboration service.
//!
//! The service is the single entry point for starting flows. It deduplicates
//! them (one join flow per invitation token, one share/manage flow per tab
//! group), keeps a cached combined [`ServiceStatus`] up to date from the
//! identity and sync-engine signals, and answers membership queries.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tracing::{debug, info, info_span, warn, Instrument};

use async_trait::async_trait;

use ct_core::flow::Flow;
use ct_core::group::{GroupData, GroupId, GroupToken};
use ct_core::ports::{
    AccountEvent, DataSharingPort, FlowDelegatePort, IdentityPort, SyncEnginePort, TabGroupSyncPort,
};
use ct_core::settings::{CollaborationFeature, CollaborationSettings};
use ct_core::status::{CollaborationStatus, ServiceStatus, ServiceStatusUpdate, SigninStatus, SyncStatus};
use ct_core::sync::{DataType, SyncEngineEvent};
use ct_core::tab_groups::EitherGroupId;
use ct_core::MemberRole;

use super::{
    CollaborationConfig, CollaborationController, CollaborationMetrics, ServiceStatusSource,
};

const STATUS_CHANNEL_CAPACITY: usize = 16;

#[derive(Clone)]
pub struct CollaborationService {
    inner: Arc<ServiceInner>,
}

struct ServiceInner {
    config: CollaborationConfig,
    data_sharing: Arc<dyn DataSharingPort>,
    tab_group_sync: Arc<dyn TabGroupSyncPort>,
    sync_engine: Arc<dyn SyncEnginePort>,
    identity: Arc<dyn IdentityPort>,
    /// In-flight join flows, keyed by invitation token.
    join_flows: Mutex<HashMap<GroupToken, CollaborationController>>,
    /// In-flight share/manage flows, keyed by tab group.
    share_flows: Mutex<HashMap<EitherGroupId, CollaborationController>>,
    /// Cached combined status; reads never touch the backends.
    status_tx: watch::Sender<ServiceStatus>,
    status_subscribers: Mutex<Vec<mpsc::Sender<ServiceStatusUpdate>>>,
    metrics: CollaborationMetrics,
}

/// Registry key a finished flow is erased under.
enum FlowKey {
    Join(GroupToken),
    Share(EitherGroupId),
}

impl CollaborationService {
    pub async fn new(
        data_sharing: Arc<dyn DataSharingPort>,
        tab_group_sync: Arc<dyn TabGroupSyncPort>,
        sync_engine: Arc<dyn SyncEnginePort>,
        identity: Arc<dyn IdentityPort>,
        settings: CollaborationSettings,
    ) -> Self {
        let inner = Arc::new(ServiceInner {
            config: CollaborationConfig::from_settings(&settings),
            data_sharing,
            tab_group_sync,
            sync_engine,
            identity,
            join_flows: Mutex::new(HashMap::new()),
            share_flows: Mutex::new(HashMap::new()),
            status_tx: watch::channel(ServiceStatus::default()).0,
            status_subscribers: Mutex::new(Vec::new()),
            metrics: CollaborationMetrics::default(),
        });

        // Seed the cache before anyone can subscribe; no notification for
        // the initial value.
        let initial = inner.compute_status().await;
        inner.status_tx.send_replace(initial);
        spawn_status_watchers(&inner);

        Self { inner }
    }

    /// Start a join flow from an invitation URL.
    ///
    /// An unparsable URL or incomplete token still starts the flow, carrying
    /// the empty token; the flow surfaces the problem as an error dialog. A
    /// second request for the same token promotes the running flow's screen
    /// instead of starting another one.
    pub async fn start_join_flow(&self, delegate: Arc<dyn FlowDelegatePort>, url: &str) {
        let span = info_span!("start_join_flow");
        async {
            let token = match self.inner.data_sharing.parse_data_sharing_url(url) {
                Ok(token) if token.is_valid() => token,
                Ok(_) => {
                    warn!("invitation url carried an incomplete token");
                    GroupToken::default()
                }
                Err(err) => {
                    warn!(%err, "unparsable invitation url");
                    GroupToken::default()
                }
            };

            let mut flows = self.inner.join_flows.lock().await;
            if let Some(existing) = flows.get(&token) {
                info!(group_id = %token.group_id, "join flow already running; promoting");
                existing.promote_current_session().await;
                return;
            }

            self.inner.metrics.record_join_flow_started();
            let controller = self.spawn_flow(
                Flow::Join {
                    token: token.clone(),
                },
                delegate,
                FlowKey::Join(token.clone()),
            );
            flows.insert(token, controller);
        }
        .instrument(span)
        .await
    }

    /// Start a share flow for `either_id`, or a manage flow if the group is
    /// already shared. Deduplicated per tab group, like join flows.
    pub async fn start_share_or_manage_flow(
        &self,
        delegate: Arc<dyn FlowDelegatePort>,
        either_id: EitherGroupId,
    ) {
        let span = info_span!("start_share_or_manage_flow", group = %either_id);
        async {
            let mut flows = self.inner.share_flows.lock().await;
            if let Some(existing) = flows.get(&either_id) {
                info!("share/manage flow already running; promoting");
                existing.promote_current_session().await;
                return;
            }

            let controller = self.spawn_flow(
                Flow::ShareOrManage {
                    either_id: either_id.clone(),
                },
                delegate,
                FlowKey::Share(either_id.clone()),
            );
            flows.insert(either_id, controller);
        }
        .instrument(span)
        .await
    }

    fn spawn_flow(
        &self,
        flow: Flow,
        delegate: Arc<dyn FlowDelegatePort>,
        key: FlowKey,
    ) -> CollaborationController {
        let (finished_tx, finished_rx) = oneshot::channel();
        let controller = CollaborationController::start(
            flow,
            self.inner.clone(),
            self.inner.data_sharing.clone(),
            self.inner.tab_group_sync.clone(),
            self.inner.sync_engine.clone(),
            delegate,
            self.inner.config.clone(),
            finished_tx,
        );

        // Erase from the registry only after the driver task has fully wound
        // down, from a task of our own rather than anywhere inside the
        // flow's own call path.
        let weak = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            let _ = finished_rx.await;
            let Some(inner) = weak.upgrade() else { return };
            match key {
                FlowKey::Join(token) => {
                    inner.join_flows.lock().await.remove(&token);
                }
                FlowKey::Share(either_id) => {
                    inner.share_flows.lock().await.remove(&either_id);
                }
            }
            inner.metrics.record_flow_finished();
        });

        controller
    }

    /// Cancel every in-flight flow. Called when the embedder shuts down.
    pub async fn shutdown(&self) {
        let controllers: Vec<CollaborationController> = {
            let join = self.inner.join_flows.lock().await;
            let share = self.inner.share_flows.lock().await;
            join.values().chain(share.values()).cloned().collect()
        };
        if !controllers.is_empty() {
            info!(count = controllers.len(), "cancelling in-flight flows");
        }
        for controller in controllers {
            controller.cancel().await;
        }
    }

    pub fn service_status(&self) -> ServiceStatus {
        *self.inner.status_tx.borrow()
    }

    pub async fn subscribe_status_changes(&self) -> mpsc::Receiver<ServiceStatusUpdate> {
        self.inner.add_status_subscriber().await
    }

    /// The current user's role within `group_id`. Never fails: an absent
    /// group, a signed-out user, or a non-member all report
    /// `MemberRole::Unknown`.
    pub async fn current_user_role_for_group(&self, group_id: &GroupId) -> MemberRole {
        self.inner.user_role_for_group(group_id).await
    }

    pub async fn group_data(&self, group_id: &GroupId) -> Option<GroupData> {
        self.inner.data_sharing.read_group(group_id).await
    }

    pub fn metrics(&self) -> &CollaborationMetrics {
        &self.inner.metrics
    }

    pub async fn join_flow_count(&self) -> usize {
        self.inner.join_flows.lock().await.len()
    }

    pub async fn share_flow_count(&self) -> usize {
        self.inner.share_flows.lock().await.len()
    }
}

#[async_trait]
impl ServiceStatusSource for ServiceInner {
    fn service_status(&self) -> ServiceStatus {
        *self.status_tx.borrow()
    }

    async fn subscribe_status_changes(&self) -> mpsc::Receiver<ServiceStatusUpdate> {
        self.add_status_subscriber().await
    }

    async fn current_user_role_for_group(&self, group_id: &GroupId) -> MemberRole {
        self.user_role_for_group(group_id).await
    }
}

impl ServiceInner {
    async fn add_status_subscriber(&self) -> mpsc::Receiver<ServiceStatusUpdate> {
        let (tx, rx) = mpsc::channel(STATUS_CHANNEL_CAPACITY);
        self.status_subscribers.lock().await.push(tx);
        rx
    }

    async fn user_role_for_group(&self, group_id: &GroupId) -> MemberRole {
        let Some(group) = self.data_sharing.read_group(group_id).await else {
            return MemberRole::Unknown;
        };
        let Some(account) = self.identity.primary_account().await else {
            return MemberRole::Unknown;
        };
        group
            .members
            .iter()
            .find(|member| member.gaia_id == account.gaia)
            .map(|member| member.role)
            .unwrap_or(MemberRole::Unknown)
    }

    /// Recompute the combined status and notify subscribers if it actually
    /// changed.
    async fn refresh_service_status(&self) {
        let new_status = self.compute_status().await;
        let old_status = self.status_tx.send_replace(new_status);
        if old_status == new_status {
            return;
        }
        debug!(?old_status, ?new_status, "service status changed");

        let update = ServiceStatusUpdate {
            old_status,
            new_status,
        };
        let mut subscribers = self.status_subscribers.lock().await;
        subscribers.retain(|tx| !tx.is_closed());
        for tx in subscribers.iter() {
            let _ = tx.send(update).await;
        }
    }

    async fn compute_status(&self) -> ServiceStatus {
        let signin_status = if self.identity.has_primary_account_with_refresh_token().await {
            SigninStatus::SignedIn
        } else if self.identity.has_primary_account().await {
            SigninStatus::SignedInPaused
        } else {
            SigninStatus::NotSignedIn
        };

        let active = self.sync_engine.active_data_types().await;
        let sync_status = if active.contains(&DataType::SavedTabGroup)
            && active.contains(&DataType::CollaborationGroup)
        {
            SyncStatus::SyncEnabled
        } else if self.sync_engine.is_sync_feature_enabled() {
            SyncStatus::SyncWithoutTabGroups
        } else {
            SyncStatus::NotSyncing
        };

        let collaboration_status = match self.config.feature {
            CollaborationFeature::Disabled => CollaborationStatus::Disabled,
            CollaborationFeature::JoinOnly => CollaborationStatus::AllowedToJoin,
            CollaborationFeature::CreateAndJoin => CollaborationStatus::EnabledCreateAndJoin,
        };

        ServiceStatus {
            signin_status,
            sync_status,
            collaboration_status,
        }
    }
}

/// Keep the cached status fresh. The watchers hold only a weak reference so
/// a dropped service tears them down; a `Shutdown` event from a backend
/// stops its watcher explicitly.
fn spawn_status_watchers(inner: &Arc<ServiceInner>) {
    let weak = Arc::downgrade(inner);
    let mut sync_rx = inner.sync_engine.subscribe();
    tokio::spawn(async move {
        while let Some(event) = sync_rx.recv().await {
            if event == SyncEngineEvent::Shutdown {
                break;
            }
            let Some(inner) = Weak::upgrade(&weak) else {
                break;
            };
            inner.refresh_service_status().await;
        }
    });

    let weak = Arc::downgrade(inner);
    let mut account_rx = inner.identity.subscribe();
    tokio::spawn(async move {
        while let Some(event) = account_rx.recv().await {
            if event == AccountEvent::Shutdown {
                break;
            }
            let Some(inner) = Weak::upgrade(&weak) else {
                break;
            };
            inner.refresh_service_status().await;
        }
    });
}
