//! The delivery channel capability trait.

use async_trait::async_trait;

use crate::error::DeliveryResult;

/// Receipt returned by a channel after a successful send.
#[derive(Debug, Clone)]
pub struct ChannelReceipt {
    /// Provider-assigned message id.
    pub message_id: String,
    /// Provider-reported delivery status, when the API exposes one.
    pub status: Option<String>,
}

impl ChannelReceipt {
    /// Creates a receipt with no provider status.
    pub fn new(message_id: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            status: None,
        }
    }

    /// Attaches the provider-reported status.
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }
}

/// Trait for outbound delivery channels.
///
/// Every channel exposes the same uniform send surface so the gateway can
/// try them in order without knowing which provider backs each one.
#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    /// Stable channel identifier, reported in receipts for operational
    /// metrics (e.g. "meta-whatsapp", "twilio-sms").
    fn id(&self) -> &'static str;

    /// Delivers `body` to the E.164 number `to`.
    async fn send(&self, to: &str, body: &str) -> DeliveryResult<ChannelReceipt>;
}
