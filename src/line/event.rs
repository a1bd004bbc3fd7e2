//! Webhook payload types for the LINE Messaging API.
//!
//! Only the fields the bot reads are modelled. Unknown fields are ignored and
//! unknown event or message kinds deserialize to an `Unsupported` variant so a
//! new event type on the platform side never fails the whole delivery.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackBody {
    #[serde(default)]
    pub destination: String,
    #[serde(default)]
    pub events: Vec<Event>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Event {
    Message(MessageEvent),
    Follow(FollowEvent),
    #[serde(other)]
    Unsupported,
}

impl Event {
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Message(_) => "message",
            Event::Follow(_) => "follow",
            Event::Unsupported => "unsupported",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEvent {
    /// Absent for events delivered while the channel is in standby mode.
    pub reply_token: Option<String>,
    pub source: Source,
    #[serde(default)]
    pub timestamp: i64,
    pub message: MessageContent,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowEvent {
    pub reply_token: Option<String>,
    pub source: Source,
    #[serde(default)]
    pub timestamp: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MessageContent {
    Text(TextMessage),
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextMessage {
    pub id: String,
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Source {
    User {
        #[serde(rename = "userId")]
        user_id: String,
    },
    Group {
        #[serde(rename = "groupId")]
        group_id: String,
        #[serde(rename = "userId")]
        user_id: Option<String>,
    },
    Room {
        #[serde(rename = "roomId")]
        room_id: String,
        #[serde(rename = "userId")]
        user_id: Option<String>,
    },
}

impl Source {
    /// The sending user, when LINE discloses it.
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Source::User { user_id } => Some(user_id.as_str()),
            Source::Group { user_id, .. } | Source::Room { user_id, .. } => user_id.as_deref(),
        }
    }
}
