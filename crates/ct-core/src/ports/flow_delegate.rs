use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::flow::{ErrorInfo, Outcome};
use crate::group::{GroupId, GroupToken, SharedDataPreview};
use crate::tab_groups::EitherGroupId;

/// Single-use continuation for a delegate request.
///
/// Wraps the sending half of a oneshot channel; `send` consumes the reply,
/// so a delegate can answer each request at most once and the type system
/// enforces it. Dropping the reply unanswered closes the channel, which the
/// controller observes as a cancelled request.
#[derive(Debug)]
pub struct OutcomeReply(oneshot::Sender<Outcome>);

impl OutcomeReply {
    /// Create a reply together with the receiver the requester awaits.
    pub fn new() -> (Self, oneshot::Receiver<Outcome>) {
        let (tx, rx) = oneshot::channel();
        (Self(tx), rx)
    }

    pub fn send(self, outcome: Outcome) {
        // The requester may have torn down already; nothing to do then.
        let _ = self.0.send(outcome);
    }
}

/// Per-flow UI delegate.
///
/// One delegate instance accompanies each flow and renders its screens.
/// Requests return immediately; the result of the user interaction arrives
/// later through the [`OutcomeReply`].
#[async_trait]
pub trait FlowDelegatePort: Send + Sync {
    /// Prepare any UI the flow needs before the first screen.
    async fn prepare_flow_ui(&self, reply: OutcomeReply);

    /// Show a terminal error dialog.
    async fn show_error(&self, error: ErrorInfo, reply: OutcomeReply);

    /// Tear down whatever the delegate is currently showing.
    async fn cancel(&self, reply: OutcomeReply);

    /// Walk the user through sign-in and enabling sync.
    async fn show_authentication_ui(&self, reply: OutcomeReply);

    /// Authentication screens were shown and the backend status has since
    /// become valid; the delegate may dismiss them.
    async fn notify_signin_and_sync_status_change(&self);

    /// Show the join invitation dialog for `token`, previewing the shared
    /// content.
    async fn show_join_dialog(
        &self,
        token: GroupToken,
        preview: SharedDataPreview,
        reply: OutcomeReply,
    );

    async fn show_share_dialog(&self, either_id: EitherGroupId, reply: OutcomeReply);

    async fn show_manage_dialog(&self, either_id: EitherGroupId, reply: OutcomeReply);

    /// Focus the local tab group belonging to the shared group.
    async fn promote_tab_group(&self, group_id: GroupId, reply: OutcomeReply);

    /// Bring the flow's current screen back to the foreground.
    async fn promote_current_screen(&self);
}
