//! People-group (data sharing) value types.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Identifier of a shared people group in the data-sharing backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupId(String);

impl GroupId {
    pub fn new(id: String) -> Self {
        Self(id)
    }

    /// Generate a fresh random group id.
    pub fn random() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Display for GroupId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for GroupId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for GroupId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Invitation credential: a group id paired with an access secret.
///
/// The default token is empty and invalid. Join flows started from an
/// unparsable invitation URL carry the empty token so the error can still be
/// surfaced to the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupToken {
    pub group_id: GroupId,
    pub access_token: String,
}

impl GroupToken {
    pub fn new(group_id: GroupId, access_token: impl Into<String>) -> Self {
        Self {
            group_id,
            access_token: access_token.into(),
        }
    }

    /// A token is usable only when both parts are present.
    pub fn is_valid(&self) -> bool {
        !self.group_id.is_empty() && !self.access_token.is_empty()
    }
}

/// The current user's permission level within a shared group.
///
/// `Unknown` doubles as "not a member / group absent" and is a normal,
/// representable outcome rather than an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemberRole {
    Unknown,
    Owner,
    Member,
    Invitee,
}

/// A single member of a people group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMember {
    pub gaia_id: crate::account::GaiaId,
    pub display_name: String,
    pub role: MemberRole,
}

/// Data-sharing backend record of a people group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupData {
    pub group_token: GroupToken,
    pub display_name: String,
    pub members: Vec<GroupMember>,
}

impl GroupData {
    pub fn group_id(&self) -> &GroupId {
        &self.group_token.group_id
    }
}

/// Preview of shared content shown in the join dialog before the user
/// accepts an invitation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedDataPreview {
    pub group_title: Option<String>,
    pub member_count: Option<usize>,
}
