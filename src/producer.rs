//! NATS publisher for stored prediction events

use crate::types::prediction::StoredPrediction;
use anyhow::{Context, Result};
use async_nats::Client;
use tracing::{debug, info};

/// Publishes every stored prediction to a NATS subject
#[derive(Clone)]
pub struct PredictionPublisher {
    client: Client,
    subject: String,
}

impl PredictionPublisher {
    /// Create a publisher on an existing connection
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }

    /// Connect to NATS and create a publisher
    pub async fn connect(url: &str, subject: &str) -> Result<Self> {
        let client = async_nats::connect(url)
            .await
            .with_context(|| format!("Failed to connect to NATS at {}", url))?;
        info!(url = %url, subject = %subject, "Connected to NATS");
        Ok(Self::new(client, subject))
    }

    /// Publish a stored prediction
    pub async fn publish(&self, prediction: &StoredPrediction) -> Result<()> {
        let payload = event_payload(prediction)?;

        self.client
            .publish(self.subject.clone(), payload.into())
            .await?;

        debug!(
            id = %prediction.id,
            prediction = %prediction.result.prediction,
            confidence = prediction.result.confidence,
            "Published prediction event"
        );

        Ok(())
    }

    /// Get the subject name
    pub fn subject(&self) -> &str {
        &self.subject
    }
}

/// JSON body of a prediction event
pub fn event_payload(prediction: &StoredPrediction) -> Result<Vec<u8>> {
    serde_json::to_vec(prediction).context("Failed to serialize prediction event")
}
