//! # Phone Verify Delivery
//!
//! Outbound delivery for verification codes. A small capability trait
//! (`DeliveryChannel`) covers each concrete provider channel, and the
//! `DeliveryGateway` tries an ordered list of channels — primary first,
//! fallbacks on failure — reporting which channel ultimately served each
//! message.

mod channel;
mod error;
mod gateway;
mod meta;
mod twilio;

pub use channel::{ChannelReceipt, DeliveryChannel};
pub use error::{DeliveryError, DeliveryResult};
pub use gateway::{DeliveryGateway, DeliveryReceipt};
pub use meta::{MetaWhatsAppChannel, MetaWhatsAppConfig};
pub use twilio::{TwilioChannel, TwilioConfig, TwilioTransport};
