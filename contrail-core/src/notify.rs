use async_trait::async_trait;
use contrail_shared::BookingNotification;

/// Fire-and-forget delivery of post-commit events (mail queue, Kafka, ...).
///
/// A failed dispatch is logged by the caller and never undoes the booking.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn dispatch(
        &self,
        notification: &BookingNotification,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}
