//! Collaboration settings.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How much of the collaboration feature is available to this profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollaborationFeature {
    Disabled,
    JoinOnly,
    #[default]
    CreateAndJoin,
}

/// User/profile-level settings consumed by the application layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollaborationSettings {
    /// How long an authentication flow may sit on the sign-in screens before
    /// it is abandoned with an error.
    pub authentication_timeout: Duration,
    pub feature: CollaborationFeature,
}

impl Default for CollaborationSettings {
    fn default() -> Self {
        Self {
            authentication_timeout: Duration::from_secs(30 * 60),
            feature: CollaborationFeature::default(),
        }
    }
}
