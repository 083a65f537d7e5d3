//! Delivery strategies and the alert center that routes between them

use async_trait::async_trait;
use laundry_api::{Alert, AlertAudience};
use laundry_util::AlertId;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::{AlertQueue, SystemNotifier};

/// Where an alert ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Shown by the desktop notification service
    System,
    /// Held in the in-process queue
    Queued,
}

/// How owner alerts reach the user
#[async_trait]
pub trait AlertStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn deliver(&self, alert: Alert, queue: &mut AlertQueue, now: Instant) -> Delivery;
}

/// System notifications, falling back to the queue when showing fails
pub struct SystemStrategy {
    notifier: Arc<dyn SystemNotifier>,
}

impl SystemStrategy {
    pub fn new(notifier: Arc<dyn SystemNotifier>) -> Self {
        Self { notifier }
    }
}

#[async_trait]
impl AlertStrategy for SystemStrategy {
    fn name(&self) -> &'static str {
        "system"
    }

    async fn deliver(&self, alert: Alert, queue: &mut AlertQueue, now: Instant) -> Delivery {
        match self.notifier.show(&alert.title, &alert.body).await {
            Ok(()) => {
                debug!(alert_id = %alert.id, "System notification shown");
                Delivery::System
            }
            Err(e) => {
                warn!(error = %e, alert_id = %alert.id, "System notification failed, queueing alert");
                queue.push(alert, now);
                Delivery::Queued
            }
        }
    }
}

/// In-process queue only
#[derive(Debug, Default)]
pub struct InProcessStrategy;

#[async_trait]
impl AlertStrategy for InProcessStrategy {
    fn name(&self) -> &'static str {
        "in-process"
    }

    async fn deliver(&self, alert: Alert, queue: &mut AlertQueue, now: Instant) -> Delivery {
        queue.push(alert, now);
        Delivery::Queued
    }
}

/// Routes alerts: owner alerts through the chosen strategy, informational
/// alerts straight into the queue.
pub struct AlertCenter {
    strategy: Box<dyn AlertStrategy>,
    queue: AlertQueue,
}

impl AlertCenter {
    pub fn new(strategy: Box<dyn AlertStrategy>, queue: AlertQueue) -> Self {
        Self { strategy, queue }
    }

    /// Pick a strategy once at startup.
    ///
    /// System notifications are used only when a notifier is present, reports
    /// itself available and grants permission.
    pub async fn select(notifier: Option<Arc<dyn SystemNotifier>>, queue: AlertQueue) -> Self {
        let strategy: Box<dyn AlertStrategy> = match notifier {
            Some(notifier) if notifier.capabilities().available => {
                let permission = notifier.request_permission().await;
                if permission.is_granted() {
                    Box::new(SystemStrategy::new(notifier))
                } else {
                    info!(?permission, "Notification permission not granted");
                    Box::new(InProcessStrategy)
                }
            }
            _ => Box::new(InProcessStrategy),
        };

        info!(strategy = strategy.name(), "Alert delivery selected");
        Self::new(strategy, queue)
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    pub async fn raise(&mut self, alert: Alert, now: Instant) -> Delivery {
        match alert.audience {
            AlertAudience::Owner => self.strategy.deliver(alert, &mut self.queue, now).await,
            AlertAudience::Everyone => {
                self.queue.push(alert, now);
                Delivery::Queued
            }
        }
    }

    pub fn dismiss(&mut self, id: AlertId) -> bool {
        self.queue.dismiss(id)
    }

    pub fn prune(&mut self, now: Instant) -> Vec<Alert> {
        self.queue.prune(now)
    }

    pub fn queue(&self) -> &AlertQueue {
        &self.queue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MockNotifier, Permission};
    use laundry_api::{AlertKind, AlertSeverity, MachineType};
    use std::time::Duration;

    fn alert(audience: AlertAudience) -> Alert {
        Alert::new(
            MachineType::Dryer,
            AlertKind::CycleComplete,
            AlertSeverity::Warn,
            audience,
            "Dryer done",
            "Your laundry is ready",
            chrono::Utc::now(),
        )
    }

    fn queue() -> AlertQueue {
        AlertQueue::new(3, Duration::from_secs(10))
    }

    #[tokio::test]
    async fn test_granted_permission_selects_system() {
        let mock = Arc::new(MockNotifier::new());
        let mut center = AlertCenter::select(Some(mock.clone()), queue()).await;

        assert_eq!(center.strategy_name(), "system");
        let delivery = center.raise(alert(AlertAudience::Owner), Instant::now()).await;

        assert_eq!(delivery, Delivery::System);
        assert_eq!(mock.shown(), vec![("Dryer done".to_string(), "Your laundry is ready".to_string())]);
        assert!(center.queue().is_empty());
    }

    #[tokio::test]
    async fn test_denied_permission_falls_back_to_queue() {
        let mock = Arc::new(MockNotifier::new().with_permission(Permission::Denied));
        let mut center = AlertCenter::select(Some(mock.clone()), queue()).await;

        assert_eq!(center.strategy_name(), "in-process");
        let delivery = center.raise(alert(AlertAudience::Owner), Instant::now()).await;

        assert_eq!(delivery, Delivery::Queued);
        assert!(mock.shown().is_empty());
        assert_eq!(center.queue().len(), 1);
    }

    #[tokio::test]
    async fn test_undecided_permission_is_not_granted() {
        let mock = Arc::new(MockNotifier::new().with_permission(Permission::Default));
        let center = AlertCenter::select(Some(mock), queue()).await;
        assert_eq!(center.strategy_name(), "in-process");
    }

    #[tokio::test]
    async fn test_no_notifier_selects_in_process() {
        let center = AlertCenter::select(None, queue()).await;
        assert_eq!(center.strategy_name(), "in-process");
    }

    #[tokio::test]
    async fn test_show_failure_queues_alert() {
        let mock = Arc::new(MockNotifier::new());
        let mut center = AlertCenter::select(Some(mock.clone()), queue()).await;
        mock.set_fail_show(true);

        let delivery = center.raise(alert(AlertAudience::Owner), Instant::now()).await;

        assert_eq!(delivery, Delivery::Queued);
        assert_eq!(center.queue().len(), 1);
    }

    #[tokio::test]
    async fn test_everyone_alerts_skip_system_notifications() {
        let mock = Arc::new(MockNotifier::new());
        let mut center = AlertCenter::select(Some(mock.clone()), queue()).await;

        let delivery = center.raise(alert(AlertAudience::Everyone), Instant::now()).await;

        assert_eq!(delivery, Delivery::Queued);
        assert!(mock.shown().is_empty());
    }

    #[tokio::test]
    async fn test_dismiss_and_prune_through_center() {
        let mut center = AlertCenter::select(None, queue()).await;
        let now = Instant::now();

        let first = alert(AlertAudience::Everyone);
        let first_id = first.id;
        center.raise(first, now).await;
        center.raise(alert(AlertAudience::Everyone), now).await;

        assert!(center.dismiss(first_id));
        assert_eq!(center.prune(now + Duration::from_secs(10)).len(), 1);
        assert!(center.queue().is_empty());
    }
}
