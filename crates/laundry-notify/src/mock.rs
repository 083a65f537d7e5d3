//! Mock notifier for testing

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::{NotifierCapabilities, NotifyError, NotifyResult, Permission, SystemNotifier};

/// Records notifications instead of showing them
pub struct MockNotifier {
    capabilities: NotifierCapabilities,
    permission: Permission,
    shown: Arc<Mutex<Vec<(String, String)>>>,

    /// Configure show to fail
    pub fail_show: Arc<Mutex<bool>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self {
            capabilities: NotifierCapabilities::backend("mock"),
            permission: Permission::Granted,
            shown: Arc::new(Mutex::new(Vec::new())),
            fail_show: Arc::new(Mutex::new(false)),
        }
    }

    pub fn with_permission(mut self, permission: Permission) -> Self {
        self.permission = permission;
        self
    }

    pub fn with_capabilities(mut self, caps: NotifierCapabilities) -> Self {
        self.capabilities = caps;
        self
    }

    pub fn set_fail_show(&self, fail: bool) {
        *self.fail_show.lock().unwrap() = fail;
    }

    /// `(title, body)` of every notification shown so far
    pub fn shown(&self) -> Vec<(String, String)> {
        self.shown.lock().unwrap().clone()
    }
}

impl Default for MockNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SystemNotifier for MockNotifier {
    fn capabilities(&self) -> &NotifierCapabilities {
        &self.capabilities
    }

    async fn request_permission(&self) -> Permission {
        self.permission
    }

    async fn show(&self, title: &str, body: &str) -> NotifyResult<()> {
        if *self.fail_show.lock().unwrap() {
            return Err(NotifyError::Backend("Mock show failure".into()));
        }

        self.shown
            .lock()
            .unwrap()
            .push((title.to_string(), body.to_string()));
        Ok(())
    }
}
