//! System notifier trait

use async_trait::async_trait;
use thiserror::Error;

use crate::{NotifierCapabilities, Permission};

/// Errors from notification delivery
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Notifications not available: {0}")]
    NotAvailable(String),

    #[error("Notification permission not granted")]
    PermissionDenied,

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type NotifyResult<T> = Result<T, NotifyError>;

/// The desktop's notification service
#[async_trait]
pub trait SystemNotifier: Send + Sync {
    /// Get the capabilities of this notifier
    fn capabilities(&self) -> &NotifierCapabilities;

    /// Ask for permission to show notifications
    async fn request_permission(&self) -> Permission;

    /// Show one notification
    async fn show(&self, title: &str, body: &str) -> NotifyResult<()>;
}
