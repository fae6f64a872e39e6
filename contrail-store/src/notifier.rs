use async_trait::async_trait;
use contrail_core::notify::NotificationDispatcher;
use contrail_shared::BookingNotification;
use tracing::info;

/// Dispatcher that only writes notifications to the log. Used when no broker
/// is configured.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl NotificationDispatcher for LogNotifier {
    async fn dispatch(
        &self,
        notification: &BookingNotification,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let payload = serde_json::to_string(notification)?;
        info!(topic = notification.topic(), key = %notification.key(), "notification: {}", payload);
        Ok(())
    }
}
