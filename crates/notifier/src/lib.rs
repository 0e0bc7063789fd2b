//! Notification delivery.
//!
//! Senders turn a channel-neutral [`NotificationPayload`] into a channel-specific
//! request (Teams `MessageCard`, Resend email) and the [`NotificationRouter`]
//! decides which sender(s) get it based on the configured [`DeliveryMode`].
//!
//! [`NotificationPayload`]: enrollwatch_common::types::NotificationPayload
//! [`DeliveryMode`]: enrollwatch_common::types::DeliveryMode

pub mod email;
pub mod router;
pub mod sender;
pub mod teams;

pub use router::{DispatchReport, NotificationRouter};
pub use sender::{ChannelHealth, DeliveryError, NotificationSender};
