//! Signed-in account value types.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Stable identifier of a user account in the identity backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GaiaId(String);

impl GaiaId {
    pub fn new(id: String) -> Self {
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for GaiaId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for GaiaId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for GaiaId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// The primary signed-in account, as reported by the identity port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub gaia: GaiaId,
    pub email: String,
}
