//! Desktop notifications through `notify-send`

use async_trait::async_trait;
use std::process::Command;
use tracing::{debug, info};

use crate::{NotifierCapabilities, NotifyError, NotifyResult, Permission, SystemNotifier};

const BACKEND: &str = "notify-send";

/// Session bus address; without it there is no notification daemon to talk to
const DBUS_SESSION_ENV: &str = "DBUS_SESSION_BUS_ADDRESS";

/// Shows notifications by running `notify-send`
pub struct NotifySendNotifier {
    capabilities: NotifierCapabilities,
    app_name: String,
}

impl NotifySendNotifier {
    /// Detect a usable `notify-send` on this machine
    pub fn detect(app_name: impl Into<String>) -> Option<Self> {
        if std::env::var_os(DBUS_SESSION_ENV).is_none() {
            debug!("No session bus, system notifications unavailable");
            return None;
        }

        if !Self::is_available() {
            debug!("notify-send not found, system notifications unavailable");
            return None;
        }

        info!(backend = BACKEND, "Detected system notifications");
        Some(Self {
            capabilities: NotifierCapabilities::backend(BACKEND),
            app_name: app_name.into(),
        })
    }

    fn is_available() -> bool {
        Command::new(BACKEND)
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
}

#[async_trait]
impl SystemNotifier for NotifySendNotifier {
    fn capabilities(&self) -> &NotifierCapabilities {
        &self.capabilities
    }

    async fn request_permission(&self) -> Permission {
        // The desktop has no per-application prompt
        Permission::Granted
    }

    async fn show(&self, title: &str, body: &str) -> NotifyResult<()> {
        let output = tokio::process::Command::new(BACKEND)
            .arg(format!("--app-name={}", self.app_name))
            .arg(title)
            .arg(body)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(NotifyError::Backend(stderr.trim().to_string()));
        }

        debug!(title, "Notification shown");
        Ok(())
    }
}
