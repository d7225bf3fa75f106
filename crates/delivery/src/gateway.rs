//! The delivery gateway: an ordered list of channels with automatic
//! fallback.

use std::sync::Arc;

use chrono::Duration;

use crate::channel::DeliveryChannel;
use crate::error::{DeliveryError, DeliveryResult};
use crate::meta::{MetaWhatsAppChannel, MetaWhatsAppConfig};
use crate::twilio::{TwilioChannel, TwilioConfig};

/// Receipt for a message the gateway delivered, reporting which channel
/// ultimately served it.
#[derive(Debug, Clone)]
pub struct DeliveryReceipt {
    /// Id of the channel that succeeded.
    pub channel: &'static str,
    /// Provider-assigned message id.
    pub message_id: String,
    /// Provider-reported status, when available.
    pub status: Option<String>,
}

/// Delivers messages through a primary channel, falling back to the next
/// configured channel on failure.
pub struct DeliveryGateway {
    channels: Vec<Arc<dyn DeliveryChannel>>,
    brand: Option<String>,
}

impl DeliveryGateway {
    /// Creates a gateway with a single primary channel.
    pub fn new(primary: Arc<dyn DeliveryChannel>) -> Self {
        Self {
            channels: vec![primary],
            brand: None,
        }
    }

    /// Appends a fallback channel, tried after everything before it.
    pub fn with_fallback(mut self, channel: Arc<dyn DeliveryChannel>) -> Self {
        self.channels.push(channel);
        self
    }

    /// Sets a brand line prepended to formatted OTP messages.
    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = Some(brand.into());
        self
    }

    /// Returns the configured channel ids, in try order.
    pub fn channel_ids(&self) -> Vec<&'static str> {
        self.channels.iter().map(|c| c.id()).collect()
    }

    /// Builds a gateway from environment configuration.
    ///
    /// `WHATSAPP_PROVIDER` selects the primary channel (`meta` or
    /// `twilio`, default `twilio`). With the Twilio provider, a
    /// configured `TWILIO_PHONE_NUMBER` adds SMS as the fallback
    /// channel; without it, a WhatsApp failure is final.
    pub fn from_env() -> DeliveryResult<Self> {
        let provider =
            std::env::var("WHATSAPP_PROVIDER").unwrap_or_else(|_| "twilio".to_string());

        match provider.to_lowercase().as_str() {
            "meta" => {
                let config = MetaWhatsAppConfig::from_env()?;
                Ok(Self::new(Arc::new(MetaWhatsAppChannel::new(config))))
            }
            "twilio" => {
                let config = TwilioConfig::from_env()?;
                let mut gateway =
                    Self::new(Arc::new(TwilioChannel::whatsapp(config.clone())));
                if config.sms_number.is_some() {
                    gateway = gateway.with_fallback(Arc::new(TwilioChannel::sms(config)?));
                }
                Ok(gateway)
            }
            _ => Err(DeliveryError::UnknownProvider { provider }),
        }
    }

    /// Delivers `body` to `to`, trying channels in order.
    ///
    /// The first success wins and its receipt names the serving channel.
    /// When every channel fails, the last failure is reported.
    pub async fn send(&self, to: &str, body: &str) -> DeliveryResult<DeliveryReceipt> {
        let mut last_error: Option<DeliveryError> = None;

        for channel in &self.channels {
            match channel.send(to, body).await {
                Ok(receipt) => {
                    if last_error.is_some() {
                        tracing::info!(channel = channel.id(), "delivered via fallback channel");
                    }
                    return Ok(DeliveryReceipt {
                        channel: channel.id(),
                        message_id: receipt.message_id,
                        status: receipt.status,
                    });
                }
                Err(err) => {
                    tracing::warn!(
                        channel = channel.id(),
                        error = %err,
                        "delivery channel failed, trying next"
                    );
                    last_error = Some(err);
                }
            }
        }

        Err(DeliveryError::Exhausted {
            attempted: self.channels.len(),
            last: last_error
                .map(|err| err.to_string())
                .unwrap_or_else(|| "no channels configured".to_string()),
        })
    }

    /// Formats the fixed OTP message template and delivers it.
    pub async fn send_otp(
        &self,
        to: &str,
        code: &str,
        valid_for: Duration,
    ) -> DeliveryResult<DeliveryReceipt> {
        let minutes = valid_for.num_minutes().max(1);
        let mut body = String::new();
        if let Some(brand) = &self.brand {
            body.push_str(brand);
            body.push('\n');
        }
        body.push_str(&format!(
            "Your verification code is: {code}\nValid for {minutes} minutes."
        ));

        self.send(to, &body).await
    }
}
