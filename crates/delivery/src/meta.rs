//! Meta WhatsApp Cloud API channel.

use async_trait::async_trait;
use serde::Deserialize;

use crate::channel::{ChannelReceipt, DeliveryChannel};
use crate::error::{DeliveryError, DeliveryResult};

const CHANNEL_ID: &str = "meta-whatsapp";
const DEFAULT_BASE_URL: &str = "https://graph.facebook.com";
const DEFAULT_API_VERSION: &str = "v18.0";

/// Configuration for the Meta WhatsApp Cloud API.
#[derive(Debug, Clone)]
pub struct MetaWhatsAppConfig {
    /// Graph API access token.
    pub access_token: String,
    /// Business phone number id the messages are sent from.
    pub phone_number_id: String,
    /// Graph API version. Default: `v18.0`.
    pub api_version: String,
    /// Graph API base URL, overridable for testing.
    pub base_url: String,
}

impl MetaWhatsAppConfig {
    /// Creates a config with the default API version and base URL.
    pub fn new(access_token: impl Into<String>, phone_number_id: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            phone_number_id: phone_number_id.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Sets the Graph API version.
    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// Sets the Graph API base URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Builds the config from `WHATSAPP_ACCESS_TOKEN` and
    /// `WHATSAPP_PHONE_NUMBER_ID`.
    pub fn from_env() -> DeliveryResult<Self> {
        let access_token = std::env::var("WHATSAPP_ACCESS_TOKEN")
            .map_err(|_| DeliveryError::not_configured(CHANNEL_ID, "WHATSAPP_ACCESS_TOKEN"))?;
        let phone_number_id = std::env::var("WHATSAPP_PHONE_NUMBER_ID")
            .map_err(|_| DeliveryError::not_configured(CHANNEL_ID, "WHATSAPP_PHONE_NUMBER_ID"))?;
        Ok(Self::new(access_token, phone_number_id))
    }
}

#[derive(Debug, Deserialize)]
struct SendMessageResponse {
    messages: Vec<SentMessage>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
    #[serde(default)]
    code: Option<i64>,
}

/// WhatsApp delivery via the Meta Cloud API.
#[derive(Debug, Clone)]
pub struct MetaWhatsAppChannel {
    config: MetaWhatsAppConfig,
    client: reqwest::Client,
}

impl MetaWhatsAppChannel {
    /// Creates a new channel with the given config.
    pub fn new(config: MetaWhatsAppConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/{}/{}/messages",
            self.config.base_url, self.config.api_version, self.config.phone_number_id
        )
    }
}

#[async_trait]
impl DeliveryChannel for MetaWhatsAppChannel {
    fn id(&self) -> &'static str {
        CHANNEL_ID
    }

    async fn send(&self, to: &str, body: &str) -> DeliveryResult<ChannelReceipt> {
        // The Graph API rejects the leading `+`.
        let to = to.trim_start_matches('+');

        let response = self
            .client
            .post(self.messages_url())
            .bearer_auth(&self.config.access_token)
            .json(&serde_json::json!({
                "messaging_product": "whatsapp",
                "to": to,
                "type": "text",
                "text": { "body": body },
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let message = match response.json::<ApiErrorResponse>().await {
                Ok(api) => match api.error.code {
                    Some(code) => format!("{} (code {})", api.error.message, code),
                    None => api.error.message,
                },
                Err(_) => "unreadable error response".to_string(),
            };
            return Err(DeliveryError::provider(CHANNEL_ID, message));
        }

        let sent: SendMessageResponse = response
            .json()
            .await
            .map_err(|err| DeliveryError::provider(CHANNEL_ID, format!("malformed response: {err}")))?;
        let Some(message) = sent.messages.into_iter().next() else {
            return Err(DeliveryError::provider(
                CHANNEL_ID,
                "response contained no message id",
            ));
        };
        Ok(ChannelReceipt::new(message.id))
    }
}
