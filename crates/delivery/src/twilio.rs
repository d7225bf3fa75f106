//! Twilio Messages API channel, in WhatsApp or SMS flavor.

use async_trait::async_trait;
use serde::Deserialize;

use crate::channel::{ChannelReceipt, DeliveryChannel};
use crate::error::{DeliveryError, DeliveryResult};

const DEFAULT_BASE_URL: &str = "https://api.twilio.com";
const DEFAULT_WHATSAPP_NUMBER: &str = "whatsapp:+14155238886";

/// Which Twilio transport a channel instance uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TwilioTransport {
    /// WhatsApp messages; addresses carry the `whatsapp:` prefix.
    WhatsApp,
    /// Plain SMS.
    Sms,
}

/// Configuration shared by both Twilio transports.
#[derive(Debug, Clone)]
pub struct TwilioConfig {
    /// Account SID.
    pub account_sid: String,
    /// Auth token.
    pub auth_token: String,
    /// WhatsApp sender address (already `whatsapp:`-prefixed).
    pub whatsapp_number: String,
    /// SMS sender number; required only for the SMS transport.
    pub sms_number: Option<String>,
    /// API base URL, overridable for testing.
    pub base_url: String,
}

impl TwilioConfig {
    /// Creates a config with the sandbox WhatsApp sender and no SMS number.
    pub fn new(account_sid: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            account_sid: account_sid.into(),
            auth_token: auth_token.into(),
            whatsapp_number: DEFAULT_WHATSAPP_NUMBER.to_string(),
            sms_number: None,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Sets the WhatsApp sender address.
    pub fn whatsapp_number(mut self, number: impl Into<String>) -> Self {
        self.whatsapp_number = number.into();
        self
    }

    /// Sets the SMS sender number, enabling the SMS transport.
    pub fn sms_number(mut self, number: impl Into<String>) -> Self {
        self.sms_number = Some(number.into());
        self
    }

    /// Sets the API base URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Builds the config from `TWILIO_ACCOUNT_SID`, `TWILIO_AUTH_TOKEN`,
    /// and the optional `TWILIO_WHATSAPP_NUMBER` / `TWILIO_PHONE_NUMBER`.
    pub fn from_env() -> DeliveryResult<Self> {
        let account_sid = std::env::var("TWILIO_ACCOUNT_SID")
            .map_err(|_| DeliveryError::not_configured("twilio", "TWILIO_ACCOUNT_SID"))?;
        let auth_token = std::env::var("TWILIO_AUTH_TOKEN")
            .map_err(|_| DeliveryError::not_configured("twilio", "TWILIO_AUTH_TOKEN"))?;

        let mut config = Self::new(account_sid, auth_token);
        if let Ok(number) = std::env::var("TWILIO_WHATSAPP_NUMBER") {
            config = config.whatsapp_number(number);
        }
        if let Ok(number) = std::env::var("TWILIO_PHONE_NUMBER") {
            config = config.sms_number(number);
        }
        Ok(config)
    }
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    sid: String,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    message: String,
    #[serde(default)]
    code: Option<i64>,
}

/// Message delivery via the Twilio Messages API.
#[derive(Debug, Clone)]
pub struct TwilioChannel {
    config: TwilioConfig,
    transport: TwilioTransport,
    client: reqwest::Client,
}

impl TwilioChannel {
    /// Creates a WhatsApp-transport channel.
    pub fn whatsapp(config: TwilioConfig) -> Self {
        Self {
            config,
            transport: TwilioTransport::WhatsApp,
            client: reqwest::Client::new(),
        }
    }

    /// Creates an SMS-transport channel.
    ///
    /// Fails when the config carries no SMS sender number.
    pub fn sms(config: TwilioConfig) -> DeliveryResult<Self> {
        if config.sms_number.is_none() {
            return Err(DeliveryError::not_configured(
                "twilio-sms",
                "TWILIO_PHONE_NUMBER",
            ));
        }
        Ok(Self {
            config,
            transport: TwilioTransport::Sms,
            client: reqwest::Client::new(),
        })
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.config.base_url, self.config.account_sid
        )
    }

    fn addresses(&self, to: &str) -> (String, String) {
        match self.transport {
            TwilioTransport::WhatsApp => (
                self.config.whatsapp_number.clone(),
                format!("whatsapp:{to}"),
            ),
            // sms() guarantees the sender number is present.
            TwilioTransport::Sms => (
                self.config.sms_number.clone().unwrap_or_default(),
                to.to_string(),
            ),
        }
    }
}

#[async_trait]
impl DeliveryChannel for TwilioChannel {
    fn id(&self) -> &'static str {
        match self.transport {
            TwilioTransport::WhatsApp => "twilio-whatsapp",
            TwilioTransport::Sms => "twilio-sms",
        }
    }

    async fn send(&self, to: &str, body: &str) -> DeliveryResult<ChannelReceipt> {
        let (from, to) = self.addresses(to);

        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&[("From", from.as_str()), ("To", to.as_str()), ("Body", body)])
            .send()
            .await?;

        if !response.status().is_success() {
            let message = match response.json::<ApiErrorResponse>().await {
                Ok(api) => match api.code {
                    Some(code) => format!("{} (code {})", api.message, code),
                    None => api.message,
                },
                Err(_) => "unreadable error response".to_string(),
            };
            return Err(DeliveryError::provider(self.id(), message));
        }

        let sent: MessageResponse = response
            .json()
            .await
            .map_err(|err| DeliveryError::provider(self.id(), format!("malformed response: {err}")))?;

        let mut receipt = ChannelReceipt::new(sent.sid);
        if let Some(status) = sent.status {
            receipt = receipt.with_status(status);
        }
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whatsapp_addressing() {
        let channel = TwilioChannel::whatsapp(TwilioConfig::new("AC123", "token"));
        let (from, to) = channel.addresses("+5215555555555");

        assert_eq!(from, "whatsapp:+14155238886");
        assert_eq!(to, "whatsapp:+5215555555555");
        assert_eq!(channel.id(), "twilio-whatsapp");
    }

    #[test]
    fn test_sms_addressing() {
        let config = TwilioConfig::new("AC123", "token").sms_number("+15005550006");
        let channel = TwilioChannel::sms(config).unwrap();
        let (from, to) = channel.addresses("+5215555555555");

        assert_eq!(from, "+15005550006");
        assert_eq!(to, "+5215555555555");
        assert_eq!(channel.id(), "twilio-sms");
    }

    #[test]
    fn test_sms_requires_sender_number() {
        let err = TwilioChannel::sms(TwilioConfig::new("AC123", "token")).unwrap_err();
        assert!(matches!(err, DeliveryError::NotConfigured { .. }));
    }

    #[test]
    fn test_messages_url() {
        let channel = TwilioChannel::whatsapp(
            TwilioConfig::new("AC123", "token").base_url("http://localhost:9010"),
        );
        assert_eq!(
            channel.messages_url(),
            "http://localhost:9010/2010-04-01/Accounts/AC123/Messages.json"
        );
    }
}
