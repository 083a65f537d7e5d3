//! Notifier capabilities model

use serde::{Deserialize, Serialize};

/// Answer to a notification permission request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    Granted,
    Denied,
    /// The user has not decided; treated as not granted
    Default,
}

impl Permission {
    pub fn is_granted(&self) -> bool {
        matches!(self, Permission::Granted)
    }
}

/// Describes what a system notifier can do
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotifierCapabilities {
    /// Whether system notifications can be shown at all
    pub available: bool,
    /// The detected backend (e.g. "notify-send")
    pub backend: Option<String>,
}

impl NotifierCapabilities {
    /// No system notifications
    pub fn none() -> Self {
        Self::default()
    }

    /// Notifications through the named backend
    pub fn backend(name: impl Into<String>) -> Self {
        Self {
            available: true,
            backend: Some(name.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_granted_is_granted() {
        assert!(Permission::Granted.is_granted());
        assert!(!Permission::Denied.is_granted());
        assert!(!Permission::Default.is_granted());
    }

    #[test]
    fn backend_capabilities() {
        let caps = NotifierCapabilities::backend("notify-send");
        assert!(caps.available);
        assert_eq!(caps.backend.as_deref(), Some("notify-send"));
        assert!(!NotifierCapabilities::none().available);
    }
}
