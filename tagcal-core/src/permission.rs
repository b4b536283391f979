//! Notification permission state.
//!
//! Permission starts at `Default` and moves once to `Granted` or `Denied`
//! through a request. Both outcomes are final for the life of a scheduler;
//! revoking is up to the user and the host, not to us.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TagcalError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Granted,
    Denied,
    /// Not decided yet; a request may prompt the user.
    #[default]
    Default,
}

impl Permission {
    pub fn as_str(self) -> &'static str {
        match self {
            Permission::Granted => "granted",
            Permission::Denied => "denied",
            Permission::Default => "default",
        }
    }

    pub fn is_decided(self) -> bool {
        self != Permission::Default
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = TagcalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "granted" => Ok(Permission::Granted),
            "denied" => Ok(Permission::Denied),
            "default" => Ok(Permission::Default),
            _ => Err(TagcalError::InvalidPermission(s.to_owned())),
        }
    }
}

/// What the scheduler knows about its ability to notify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionState {
    pub permission: Permission,
    pub is_supported: bool,
}

impl PermissionState {
    /// State for a host without any notification capability.
    pub fn unsupported() -> Self {
        PermissionState {
            permission: Permission::Denied,
            is_supported: false,
        }
    }

    pub fn allows_delivery(&self) -> bool {
        self.is_supported && self.permission == Permission::Granted
    }
}
