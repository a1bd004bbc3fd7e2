mod client;
mod event;
mod handler;
mod signature;

#[cfg(test)]
pub use client::MockMessagingApi;
pub use client::{LineClient, MessagingApi, Profile, SendMessage};
pub use event::{CallbackBody, Event, FollowEvent, MessageContent, MessageEvent, Source, TextMessage};
pub use handler::WebhookHandler;
pub use signature::verify_signature;

#[cfg(test)]
pub(crate) use signature::sign;
