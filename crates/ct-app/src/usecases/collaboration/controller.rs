//! Collaboration flow controller.
//!
//! One controller drives one flow from `Pending` to completion. All mutable
//! state lives in [`ControllerCore`], owned by a single driver task that
//! consumes [`ControllerEvent`]s from an mpsc channel, so transitions are
//! strictly serialized and the state machine itself needs no locks.
//!
//! ```text
//! Delegate replies / port notifications / timers
//!   ↓ (ControllerEvent, epoch-tagged)
//! driver task: ControllerCore
//!   ↓ (Step::Transition pumped in a loop)
//! transition table check → exit hooks → entry hook
//!   ↓
//! delegate requests / port calls / watcher tasks
//! ```
//!
//! Every UI request hands the delegate a single-use [`OutcomeReply`]; a
//! forwarder task turns the reply into an event tagged with the state epoch
//! at issue time. Exiting a state aborts its watcher and timer tasks and
//! bumps the epoch, so replies that race the exit are recognizably stale and
//! dropped.

use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::AbortHandle;
use tracing::{debug, info, info_span, warn, Instrument};

use ct_core::flow::{is_valid_transition, ErrorInfo, Flow, Outcome, StateId};
use ct_core::group::{GroupData, GroupId, SharedDataPreview};
use ct_core::ports::{
    DataSharingError, DataSharingPort, FlowDelegatePort, OutcomeReply, SyncEnginePort,
    TabGroupSyncPort,
};
use ct_core::status::ServiceStatusUpdate;
use ct_core::sync::DataType;
use ct_core::tab_groups::SavedGroup;
use ct_core::MemberRole;

use super::{CollaborationConfig, ServiceStatusSource};

const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Handle to a running flow. Cheap to clone; dropping every handle does not
/// stop the flow (the driver task runs until the flow finishes or is
/// cancelled).
#[derive(Clone)]
pub struct CollaborationController {
    event_tx: mpsc::Sender<ControllerEvent>,
    state_rx: watch::Receiver<StateId>,
}

impl CollaborationController {
    /// Start a flow. The driver task enters `Pending` immediately;
    /// `finished` fires after the flow has fully wound down.
    #[allow(clippy::too_many_arguments)]
    pub fn start(
        flow: Flow,
        status: Arc<dyn ServiceStatusSource>,
        data_sharing: Arc<dyn DataSharingPort>,
        tab_group_sync: Arc<dyn TabGroupSyncPort>,
        sync_engine: Arc<dyn SyncEnginePort>,
        delegate: Arc<dyn FlowDelegatePort>,
        config: CollaborationConfig,
        finished: oneshot::Sender<()>,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (state_tx, state_rx) = watch::channel(StateId::Pending);

        let kind = if flow.is_join() { "join" } else { "share_or_manage" };
        let span = info_span!("collaboration_flow", kind);

        let core = ControllerCore {
            flow,
            state: StateId::Pending,
            epoch: 0,
            status,
            data_sharing,
            tab_group_sync,
            sync_engine,
            delegate,
            config,
            event_tx: event_tx.clone(),
            state_tx,
            tasks: Vec::new(),
            error: None,
            pending_preview: None,
            waiting: WaitingProgress::default(),
        };
        tokio::spawn(core.run(event_rx, finished).instrument(span));

        Self { event_tx, state_rx }
    }

    /// Bring the flow's current screen back to the foreground. Called when
    /// the user retriggers a flow that is already in progress.
    pub async fn promote_current_session(&self) {
        let _ = self
            .event_tx
            .send(ControllerEvent::PromoteCurrentScreen)
            .await;
    }

    /// Tear down the flow's UI and end the flow.
    pub async fn cancel(&self) {
        let _ = self.event_tx.send(ControllerEvent::CancelFlow).await;
    }

    pub fn current_state(&self) -> StateId {
        *self.state_rx.borrow()
    }

    /// Watch channel carrying every state the flow passes through.
    pub fn state_watch(&self) -> watch::Receiver<StateId> {
        self.state_rx.clone()
    }
}

/// Events consumed by the driver task.
#[derive(Debug)]
enum ControllerEvent {
    /// A delegate answered a UI request issued at `epoch`.
    Outcome { epoch: u64, outcome: Outcome },
    /// The invitation-group fetch issued at `epoch` finished.
    ReadNewGroupResult {
        epoch: u64,
        result: Result<GroupData, DataSharingError>,
    },
    ServiceStatusChanged(ServiceStatusUpdate),
    TabGroupAdded(SavedGroup),
    SharingGroupAdded(GroupData),
    AuthTimeout { epoch: u64 },
    /// A watcher's source channel closed while the state still needed it.
    ObserverClosed { epoch: u64 },
    PromoteCurrentScreen,
    CancelFlow,
}

/// What the driver does next after an entry hook or event handler.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Step {
    Stay,
    Transition(StateId, Option<ErrorInfo>),
    Exit,
}

/// Progress through `WaitingForSyncAndDataSharingGroup`: both services must
/// confirm the group before the flow moves on.
#[derive(Debug, Default, Clone, Copy)]
struct WaitingProgress {
    tab_group_ready: bool,
    people_group_ready: bool,
}

impl WaitingProgress {
    fn is_complete(self) -> bool {
        self.tab_group_ready && self.people_group_ready
    }
}

struct ControllerCore {
    flow: Flow,
    state: StateId,
    /// Bumped on every state exit; events carrying an older epoch are stale.
    epoch: u64,
    status: Arc<dyn ServiceStatusSource>,
    data_sharing: Arc<dyn DataSharingPort>,
    tab_group_sync: Arc<dyn TabGroupSyncPort>,
    sync_engine: Arc<dyn SyncEnginePort>,
    delegate: Arc<dyn FlowDelegatePort>,
    config: CollaborationConfig,
    event_tx: mpsc::Sender<ControllerEvent>,
    state_tx: watch::Sender<StateId>,
    /// Watcher and timer tasks owned by the current state.
    tasks: Vec<AbortHandle>,
    /// Error carried into the `Error` state by the transition that chose it.
    error: Option<ErrorInfo>,
    /// Preview fetched for the join dialog, consumed on entering
    /// `AddingUserToGroup`.
    pending_preview: Option<SharedDataPreview>,
    waiting: WaitingProgress,
}

impl ControllerCore {
    async fn run(
        mut self,
        mut event_rx: mpsc::Receiver<ControllerEvent>,
        finished: oneshot::Sender<()>,
    ) {
        info!(state = %self.state, "flow started");
        let mut step = self.enter_state().await;
        loop {
            while let Step::Transition(next, error) = step {
                step = self.transition_to(next, error).await;
            }
            if step == Step::Exit {
                break;
            }
            match event_rx.recv().await {
                Some(event) => step = self.handle_event(event).await,
                // Every handle dropped and no requests outstanding.
                None => break,
            }
        }
        self.abort_tasks();
        info!(state = %self.state, "flow finished");
        let _ = finished.send(());
    }

    /// Apply a transition: check it against the allow-list, run exit hooks,
    /// publish the new state, run the entry hook.
    ///
    /// Panics on a pair outside the transition table; that is a defect in
    /// the flow logic, never a runtime condition.
    async fn transition_to(&mut self, next: StateId, error: Option<ErrorInfo>) -> Step {
        let from = self.state;
        assert!(
            is_valid_transition(from, next),
            "illegal transition {from} -> {next}"
        );
        debug!(%from, to = %next, "flow transition");

        self.exit_state();
        self.state = next;
        self.error = error;
        let _ = self.state_tx.send(next);
        self.enter_state().await
    }

    /// Exit hooks shared by all states: stop everything the state spawned
    /// and invalidate its outstanding requests.
    fn exit_state(&mut self) {
        self.abort_tasks();
        self.epoch += 1;
        self.waiting = WaitingProgress::default();
    }

    fn abort_tasks(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }

    async fn enter_state(&mut self) -> Step {
        match self.state {
            StateId::Pending => self.enter_pending().await,
            StateId::Authenticating => self.enter_authenticating().await,
            StateId::CheckingFlowRequirements => self.enter_checking_flow_requirements().await,
            StateId::AddingUserToGroup => self.enter_adding_user_to_group().await,
            StateId::WaitingForSyncAndDataSharingGroup => self.enter_waiting().await,
            StateId::OpeningLocalTabGroup => self.enter_opening_local_tab_group().await,
            StateId::ShowingShareScreen => self.enter_showing_share_screen().await,
            StateId::ShowingManageScreen => self.enter_showing_manage_screen().await,
            StateId::Cancel => self.enter_cancel().await,
            StateId::Error => self.enter_error().await,
        }
    }

    async fn handle_event(&mut self, event: ControllerEvent) -> Step {
        match event {
            ControllerEvent::Outcome { epoch, outcome } if epoch == self.epoch => {
                self.process_outcome(outcome).await
            }
            ControllerEvent::ReadNewGroupResult { epoch, result }
                if epoch == self.epoch && self.state == StateId::CheckingFlowRequirements =>
            {
                self.process_read_new_group(result)
            }
            ControllerEvent::ServiceStatusChanged(update)
                if self.state == StateId::Authenticating =>
            {
                self.process_status_change(update).await
            }
            ControllerEvent::TabGroupAdded(group)
                if self.state == StateId::WaitingForSyncAndDataSharingGroup =>
            {
                self.waiting_tab_group_added(group).await
            }
            ControllerEvent::SharingGroupAdded(group)
                if self.state == StateId::WaitingForSyncAndDataSharingGroup =>
            {
                self.waiting_sharing_group_added(group).await
            }
            ControllerEvent::AuthTimeout { epoch }
                if epoch == self.epoch && self.state == StateId::Authenticating =>
            {
                warn!("authentication timed out");
                Step::Transition(StateId::Error, Some(ErrorInfo::general()))
            }
            ControllerEvent::ObserverClosed { epoch } if epoch == self.epoch => {
                warn!(state = %self.state, "collaborator went away mid-flow");
                Step::Transition(StateId::Error, Some(ErrorInfo::general()))
            }
            ControllerEvent::PromoteCurrentScreen => {
                self.delegate.promote_current_screen().await;
                Step::Stay
            }
            ControllerEvent::CancelFlow => {
                let (reply, _rx) = OutcomeReply::new();
                self.delegate.cancel(reply).await;
                Step::Exit
            }
            // Stale: issued before the last state exit.
            other => {
                debug!(state = %self.state, ?other, "dropping stale event");
                Step::Stay
            }
        }
    }

    /// Issue a UI request: returns the reply for the delegate and spawns a
    /// forwarder that feeds the answer back as an epoch-tagged event.
    fn request(&mut self) -> OutcomeReply {
        let (reply, rx) = OutcomeReply::new();
        let tx = self.event_tx.clone();
        let epoch = self.epoch;
        let handle = tokio::spawn(async move {
            if let Ok(outcome) = rx.await {
                let _ = tx.send(ControllerEvent::Outcome { epoch, outcome }).await;
            }
        });
        self.tasks.push(handle.abort_handle());
        reply
    }

    // ---- Pending ----

    async fn enter_pending(&mut self) -> Step {
        let reply = self.request();
        self.delegate.prepare_flow_ui(reply).await;
        Step::Stay
    }

    // ---- Authenticating ----

    async fn enter_authenticating(&mut self) -> Step {
        let reply = self.request();
        self.delegate.show_authentication_ui(reply).await;
        Step::Stay
    }

    /// Armed only once the UI reported success while the backend status was
    /// still invalid: wait for the status to catch up, bounded by the
    /// authentication timeout.
    async fn arm_authentication_watch(&mut self) {
        let timeout = self.config.authentication_timeout;
        let tx = self.event_tx.clone();
        let epoch = self.epoch;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            let _ = tx.send(ControllerEvent::AuthTimeout { epoch }).await;
        });
        self.tasks.push(timer.abort_handle());

        let mut rx = self.status.subscribe_status_changes().await;
        let tx = self.event_tx.clone();
        let watcher = tokio::spawn(async move {
            while let Some(update) = rx.recv().await {
                if tx
                    .send(ControllerEvent::ServiceStatusChanged(update))
                    .await
                    .is_err()
                {
                    return;
                }
            }
        });
        self.tasks.push(watcher.abort_handle());
    }

    async fn process_status_change(&mut self, update: ServiceStatusUpdate) -> Step {
        if update.new_status.is_authentication_valid() {
            self.delegate.notify_signin_and_sync_status_change().await;
            Step::Transition(StateId::CheckingFlowRequirements, None)
        } else {
            Step::Stay
        }
    }

    // ---- CheckingFlowRequirements ----

    async fn enter_checking_flow_requirements(&mut self) -> Step {
        match &self.flow {
            Flow::Join { .. } => self.check_join_requirements().await,
            Flow::ShareOrManage { .. } => self.check_share_requirements().await,
        }
    }

    async fn check_join_requirements(&mut self) -> Step {
        let token = self.flow.join_token().clone();
        let role = self.status.current_user_role_for_group(&token.group_id).await;
        if role != MemberRole::Unknown {
            // Already a member: skip the invitation screen entirely.
            debug!(?role, "user already in group");
            return if self.group_present_in_sync(&token.group_id).await {
                Step::Transition(StateId::OpeningLocalTabGroup, None)
            } else {
                Step::Transition(StateId::WaitingForSyncAndDataSharingGroup, None)
            };
        }

        // Fetch the group off-task so the driver keeps processing events.
        let data_sharing = self.data_sharing.clone();
        let tx = self.event_tx.clone();
        let epoch = self.epoch;
        let handle = tokio::spawn(async move {
            let result = data_sharing.read_new_group(token).await;
            let _ = tx
                .send(ControllerEvent::ReadNewGroupResult { epoch, result })
                .await;
        });
        self.tasks.push(handle.abort_handle());
        Step::Stay
    }

    fn process_read_new_group(&mut self, result: Result<GroupData, DataSharingError>) -> Step {
        match result {
            Ok(group) => {
                self.pending_preview = Some(SharedDataPreview {
                    group_title: Some(group.display_name.clone()),
                    member_count: Some(group.members.len()),
                });
                Step::Transition(StateId::AddingUserToGroup, None)
            }
            Err(err) => {
                warn!(%err, "failed to read invitation group");
                Step::Transition(StateId::Error, Some(ErrorInfo::general()))
            }
        }
    }

    async fn check_share_requirements(&mut self) -> Step {
        let either_id = self.flow.either_id().clone();
        match self.tab_group_sync.get_group(&either_id).await {
            None => {
                warn!(%either_id, "tab group not found");
                Step::Transition(StateId::Error, Some(ErrorInfo::general()))
            }
            Some(group) if group.is_shared() => {
                Step::Transition(StateId::ShowingManageScreen, None)
            }
            Some(_) => Step::Transition(StateId::ShowingShareScreen, None),
        }
    }

    async fn group_present_in_sync(&self, group_id: &GroupId) -> bool {
        self.tab_group_sync
            .get_all_groups()
            .await
            .iter()
            .any(|g| g.collaboration_id.as_ref() == Some(group_id))
    }

    // ---- AddingUserToGroup ----

    async fn enter_adding_user_to_group(&mut self) -> Step {
        let token = self.flow.join_token().clone();
        let preview = self.pending_preview.take().unwrap_or_default();
        let reply = self.request();
        self.delegate.show_join_dialog(token, preview, reply).await;
        Step::Stay
    }

    // ---- WaitingForSyncAndDataSharingGroup ----

    async fn enter_waiting(&mut self) -> Step {
        let group_id = self.flow.join_token().group_id.clone();
        self.sync_engine
            .trigger_refresh(&[
                DataType::SavedTabGroup,
                DataType::SharedTabGroupData,
                DataType::CollaborationGroup,
            ])
            .await;

        // Watchers first: a notification landing between the initial check
        // and the subscription would otherwise be lost.
        self.spawn_tab_group_watcher();
        self.spawn_sharing_group_watcher();

        self.waiting.tab_group_ready = self.group_present_in_sync(&group_id).await;
        self.waiting.people_group_ready =
            self.status.current_user_role_for_group(&group_id).await != MemberRole::Unknown;
        self.waiting_step()
    }

    /// A tab group arrived in sync. Membership may have become queryable
    /// without its own notification, so re-check it here as well.
    async fn waiting_tab_group_added(&mut self, group: SavedGroup) -> Step {
        let group_id = self.flow.join_token().group_id.clone();
        if group.collaboration_id.as_ref() == Some(&group_id) {
            self.waiting.tab_group_ready = true;
        }
        if !self.waiting.people_group_ready {
            self.waiting.people_group_ready =
                self.status.current_user_role_for_group(&group_id).await != MemberRole::Unknown;
        }
        self.waiting_step()
    }

    /// The people group reported the user's membership. The tab group may
    /// already sit in sync without a notification, so re-check that side too.
    async fn waiting_sharing_group_added(&mut self, group: GroupData) -> Step {
        let group_id = self.flow.join_token().group_id.clone();
        if group.group_id() == &group_id {
            self.waiting.people_group_ready = true;
        }
        if !self.waiting.tab_group_ready {
            self.waiting.tab_group_ready = self.group_present_in_sync(&group_id).await;
        }
        self.waiting_step()
    }

    fn waiting_step(&self) -> Step {
        if self.waiting.is_complete() {
            Step::Transition(StateId::OpeningLocalTabGroup, None)
        } else {
            Step::Stay
        }
    }

    fn spawn_tab_group_watcher(&mut self) {
        let mut rx = self.tab_group_sync.subscribe_group_added();
        let tx = self.event_tx.clone();
        let epoch = self.epoch;
        let handle = tokio::spawn(async move {
            while let Some(group) = rx.recv().await {
                if tx.send(ControllerEvent::TabGroupAdded(group)).await.is_err() {
                    return;
                }
            }
            let _ = tx.send(ControllerEvent::ObserverClosed { epoch }).await;
        });
        self.tasks.push(handle.abort_handle());
    }

    fn spawn_sharing_group_watcher(&mut self) {
        let mut rx = self.data_sharing.subscribe_group_added();
        let tx = self.event_tx.clone();
        let epoch = self.epoch;
        let handle = tokio::spawn(async move {
            while let Some(group) = rx.recv().await {
                if tx
                    .send(ControllerEvent::SharingGroupAdded(group))
                    .await
                    .is_err()
                {
                    return;
                }
            }
            let _ = tx.send(ControllerEvent::ObserverClosed { epoch }).await;
        });
        self.tasks.push(handle.abort_handle());
    }

    // ---- OpeningLocalTabGroup ----

    async fn enter_opening_local_tab_group(&mut self) -> Step {
        let group_id = self.flow.join_token().group_id.clone();
        let reply = self.request();
        self.delegate.promote_tab_group(group_id, reply).await;
        Step::Stay
    }

    // ---- ShowingShareScreen / ShowingManageScreen ----

    async fn enter_showing_share_screen(&mut self) -> Step {
        let either_id = self.flow.either_id().clone();
        let reply = self.request();
        self.delegate.show_share_dialog(either_id, reply).await;
        Step::Stay
    }

    async fn enter_showing_manage_screen(&mut self) -> Step {
        let either_id = self.flow.either_id().clone();
        let reply = self.request();
        self.delegate.show_manage_dialog(either_id, reply).await;
        Step::Stay
    }

    // ---- Cancel / Error ----

    // Terminal, no UI of its own.
    async fn enter_cancel(&mut self) -> Step {
        Step::Exit
    }

    async fn enter_error(&mut self) -> Step {
        let error = self.error.take().unwrap_or_else(ErrorInfo::general);
        let reply = self.request();
        self.delegate.show_error(error, reply).await;
        Step::Stay
    }

    // ---- Outcome routing ----

    async fn process_outcome(&mut self, outcome: Outcome) -> Step {
        debug!(state = %self.state, ?outcome, "request answered");
        match self.state {
            StateId::Pending => self.pending_outcome(outcome),
            StateId::Authenticating => self.authenticating_outcome(outcome).await,
            StateId::AddingUserToGroup => self.adding_outcome(outcome).await,
            StateId::OpeningLocalTabGroup => match outcome {
                Outcome::Success | Outcome::Cancel => Step::Exit,
                Outcome::Failure => Step::Transition(StateId::Error, Some(ErrorInfo::general())),
            },
            StateId::ShowingShareScreen | StateId::ShowingManageScreen => match outcome {
                Outcome::Success | Outcome::Cancel => Step::Exit,
                Outcome::Failure => Step::Transition(StateId::Error, Some(ErrorInfo::general())),
            },
            // One answer to the cancel/error dialog ends the flow, whatever
            // it is.
            StateId::Cancel | StateId::Error => Step::Exit,
            StateId::CheckingFlowRequirements | StateId::WaitingForSyncAndDataSharingGroup => {
                debug!(state = %self.state, "ignoring outcome in stateless wait");
                Step::Stay
            }
        }
    }

    fn pending_outcome(&mut self, outcome: Outcome) -> Step {
        match outcome {
            Outcome::Success => {
                if self.flow.is_join() && !self.flow.join_token().is_valid() {
                    warn!("join flow started with an unusable invitation");
                    return Step::Transition(StateId::Error, Some(ErrorInfo::general()));
                }
                if self.status.service_status().is_authentication_valid() {
                    Step::Transition(StateId::CheckingFlowRequirements, None)
                } else {
                    Step::Transition(StateId::Authenticating, None)
                }
            }
            Outcome::Cancel => Step::Exit,
            Outcome::Failure => Step::Transition(StateId::Error, Some(ErrorInfo::general())),
        }
    }

    async fn authenticating_outcome(&mut self, outcome: Outcome) -> Step {
        match outcome {
            Outcome::Success => {
                if self.status.service_status().is_authentication_valid() {
                    Step::Transition(StateId::CheckingFlowRequirements, None)
                } else {
                    // The UI finished but the backend has not caught up yet;
                    // wait for a status change, bounded by the timeout.
                    self.arm_authentication_watch().await;
                    Step::Stay
                }
            }
            // User-initiated cancellation ends the flow, no extra UI.
            Outcome::Cancel => Step::Exit,
            Outcome::Failure => Step::Transition(StateId::Error, Some(ErrorInfo::general())),
        }
    }

    async fn adding_outcome(&mut self, outcome: Outcome) -> Step {
        match outcome {
            Outcome::Success => {
                let group_id = self.flow.join_token().group_id.clone();
                if self.group_present_in_sync(&group_id).await {
                    Step::Transition(StateId::OpeningLocalTabGroup, None)
                } else {
                    Step::Transition(StateId::WaitingForSyncAndDataSharingGroup, None)
                }
            }
            Outcome::Cancel => Step::Exit,
            Outcome::Failure => Step::Transition(StateId::Error, Some(ErrorInfo::general())),
        }
    }
}
