use contrail_core::error::{BookingError, BookingResult};
use contrail_core::payment::{PaymentAdapter, PaymentIntent, PaymentStatus};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

pub struct PaymentOrchestrator {
    adapter: Arc<dyn PaymentAdapter>,
    currency: String,
}

impl PaymentOrchestrator {
    pub fn new(adapter: Arc<dyn PaymentAdapter>, currency: impl Into<String>) -> Self {
        Self {
            adapter,
            currency: currency.into(),
        }
    }

    /// Initialize a payment intent for a committed booking
    pub async fn initialize_payment(&self, booking_id: Uuid, amount: i64) -> BookingResult<PaymentIntent> {
        let mut metadata = HashMap::new();
        metadata.insert("booking_id".to_string(), booking_id.to_string());

        self.adapter
            .create_intent(amount, &self.currency, metadata)
            .await
            .map_err(|e| BookingError::PaymentGateway(e.to_string()))
    }

    /// Look up an intent, e.g. when a gateway webhook arrives
    pub async fn payment_status(&self, intent_id: &str) -> BookingResult<PaymentIntent> {
        self.adapter
            .get_intent(intent_id)
            .await
            .map_err(|e| BookingError::PaymentGateway(e.to_string()))
    }
}

/// Gateway stand-in for local runs and tests.
pub struct MockPaymentAdapter;

#[async_trait::async_trait]
impl PaymentAdapter for MockPaymentAdapter {
    async fn create_intent(
        &self,
        amount: i64,
        currency: &str,
        metadata: HashMap<String, String>,
    ) -> Result<PaymentIntent, Box<dyn std::error::Error + Send + Sync>> {
        let booking_id = metadata
            .get("booking_id")
            .and_then(|raw| Uuid::parse_str(raw).ok())
            .ok_or("metadata must carry a booking_id")?;

        Ok(PaymentIntent {
            // Encode booking_id in intent_id for the mock to "remember" it
            id: format!("mock_pi_{}", booking_id.simple()),
            booking_id,
            amount,
            currency: currency.to_string(),
            status: PaymentStatus::RequiresPaymentMethod,
            client_secret: Some(format!("mock_secret_{}", booking_id.simple())),
            metadata,
            created_at: chrono::Utc::now(),
        })
    }

    async fn get_intent(
        &self,
        intent_id: &str,
    ) -> Result<PaymentIntent, Box<dyn std::error::Error + Send + Sync>> {
        let booking_id = intent_id
            .strip_prefix("mock_pi_")
            .and_then(|raw| Uuid::parse_str(raw).ok())
            .ok_or_else(|| format!("unknown intent {}", intent_id))?;

        Ok(PaymentIntent {
            id: intent_id.to_string(),
            booking_id,
            amount: 0,
            currency: String::new(),
            status: PaymentStatus::Succeeded,
            client_secret: None,
            metadata: HashMap::new(),
            created_at: chrono::Utc::now(),
        })
    }
}
