//! Synced tab-group value types.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::group::GroupId;

/// Identifier of a tab group as known to the local browser session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocalGroupId(String);

/// Identifier of a tab group as known to the sync backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SyncGroupId(String);

macro_rules! impl_group_id {
    ($($name:ident),* $(,)?) => {
        $(
            impl $name {
                pub fn random() -> Self {
                    Self(uuid::Uuid::new_v4().to_string())
                }

                pub fn as_str(&self) -> &str {
                    &self.0
                }

                pub fn into_inner(self) -> String {
                    self.0
                }
            }

            impl Display for $name {
                fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                    write!(f, "{}", self.0)
                }
            }

            impl From<String> for $name {
                fn from(s: String) -> Self {
                    Self(s)
                }
            }

            impl From<&str> for $name {
                fn from(s: &str) -> Self {
                    Self(s.to_string())
                }
            }
        )*
    };
}

impl_group_id!(LocalGroupId, SyncGroupId);

/// A tab-group identifier that may refer to either a local-only group or an
/// already-synced group. Used as the registry key for share/manage flows.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EitherGroupId {
    Local(LocalGroupId),
    Sync(SyncGroupId),
}

impl From<LocalGroupId> for EitherGroupId {
    fn from(id: LocalGroupId) -> Self {
        Self::Local(id)
    }
}

impl From<SyncGroupId> for EitherGroupId {
    fn from(id: SyncGroupId) -> Self {
        Self::Sync(id)
    }
}

impl Display for EitherGroupId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local(id) => write!(f, "local:{id}"),
            Self::Sync(id) => write!(f, "sync:{id}"),
        }
    }
}

/// A tab group record held by the tab-group sync service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedGroup {
    pub sync_id: SyncGroupId,
    pub local_id: Option<LocalGroupId>,
    pub title: String,
    /// Set once the tab group has been shared with a people group.
    pub collaboration_id: Option<GroupId>,
}

impl SavedGroup {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            sync_id: SyncGroupId::random(),
            local_id: None,
            title: title.into(),
            collaboration_id: None,
        }
    }

    /// A group is shared once it is bound to a people group.
    pub fn is_shared(&self) -> bool {
        self.collaboration_id.is_some()
    }

    /// Whether this record matches `id`, on either the local or sync axis.
    pub fn matches(&self, id: &EitherGroupId) -> bool {
        match id {
            EitherGroupId::Local(local) => self.local_id.as_ref() == Some(local),
            EitherGroupId::Sync(sync) => &self.sync_id == sync,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_is_shared_only_with_collaboration_id() {
        let mut group = SavedGroup::new("trip planning");
        assert!(!group.is_shared());

        group.collaboration_id = Some(GroupId::from("people-group"));
        assert!(group.is_shared());
    }

    #[test]
    fn matches_on_local_and_sync_axes() {
        let local = LocalGroupId::random();
        let mut group = SavedGroup::new("reading list");
        group.local_id = Some(local.clone());

        assert!(group.matches(&EitherGroupId::Local(local)));
        assert!(group.matches(&EitherGroupId::Sync(group.sync_id.clone())));
        assert!(!group.matches(&EitherGroupId::Local(LocalGroupId::random())));
    }
}
