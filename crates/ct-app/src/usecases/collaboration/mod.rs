//! Shared tab-group collaboration use cases.
//!
//! Two pieces work together here:
//!
//! - [`CollaborationController`] — one per in-flight flow; a small actor
//!   that walks the flow state machine, issuing UI requests to the flow's
//!   delegate and reacting to their outcomes.
//! - [`CollaborationService`] — process-wide façade; deduplicates flows,
//!   tracks the combined service status, and answers membership queries.

mod controller;
mod metrics;
mod service;

pub use controller::CollaborationController;
pub use metrics::CollaborationMetrics;
pub use service::CollaborationService;

use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::mpsc;

use ct_core::group::GroupId;
use ct_core::settings::{CollaborationFeature, CollaborationSettings};
use ct_core::status::{ServiceStatus, ServiceStatusUpdate};
use ct_core::MemberRole;

/// Status and membership queries the controller needs from the service.
///
/// Split out as a trait so controllers can be driven against a fake status
/// source in tests without standing up the whole service.
#[async_trait]
pub trait ServiceStatusSource: Send + Sync {
    /// Current combined status. Cached; never blocks on the backends.
    fn service_status(&self) -> ServiceStatus;

    /// Subscribe to status changes. Only actual changes are delivered.
    async fn subscribe_status_changes(&self) -> mpsc::Receiver<ServiceStatusUpdate>;

    /// The current user's role within `group_id`; `MemberRole::Unknown` when
    /// the group is absent or the user is not a member.
    async fn current_user_role_for_group(&self, group_id: &GroupId) -> MemberRole;
}

/// Runtime configuration shared by the service and its controllers.
#[derive(Debug, Clone)]
pub struct CollaborationConfig {
    pub authentication_timeout: Duration,
    pub feature: CollaborationFeature,
}

impl Default for CollaborationConfig {
    fn default() -> Self {
        Self::from_settings(&CollaborationSettings::default())
    }
}

impl CollaborationConfig {
    pub fn from_settings(settings: &CollaborationSettings) -> Self {
        Self {
            authentication_timeout: settings.authentication_timeout,
            feature: settings.feature,
        }
    }
}
