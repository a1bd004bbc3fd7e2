//! Keyword-triggered replies to text messages and follow events.
//!
//! Each handler is a single-shot reaction to one event: it sends at most one
//! reply (a reply token is only valid once) and keeps no conversation state.

use crate::error::{BotError, Result};
use crate::line::{FollowEvent, MessageContent, MessageEvent, MessagingApi, Profile, SendMessage, Source};
use crate::store::{NewUser, RegisteredUser, UserStore};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

pub const ADD_PROMPT: &str = "What do you want to add?";
pub const DELETE_PROMPT: &str = "What do you want to delete?";
pub const WELCOME_MESSAGE: &str = "Thanks for adding me as a friend!";
pub const REGISTRATION_FAILED: &str = "Sorry, registration failed. Please try again later.";

/// Characters of the user id echoed back in the registration confirmation.
pub const ECHOED_ID_CHARS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Add,
    Delete,
    Register,
}

/// Ordered trigger table. The first entry with a keyword contained in the
/// message text wins.
pub const TRIGGERS: &[(Intent, &[&str])] = &[
    (Intent::Add, &["追加", "add"]),
    (Intent::Delete, &["削除", "delete"]),
    (Intent::Register, &["登録", "register"]),
];

pub fn match_intent(text: &str) -> Option<Intent> {
    TRIGGERS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|keyword| text.contains(keyword)))
        .map(|(intent, _)| *intent)
}

pub fn registration_confirmation(user_id: &str) -> String {
    let prefix: String = user_id.chars().take(ECHOED_ID_CHARS).collect();
    format!("Thanks for registering!\nuser_id = {}", prefix)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ResponderConfig {
    /// Insert a `RegisteredUser` row when someone follows the bot, without
    /// waiting for the register keyword.
    pub register_on_follow: bool,
}

pub struct Responder {
    api: Arc<dyn MessagingApi>,
    store: Arc<dyn UserStore>,
    config: ResponderConfig,
}

impl Responder {
    pub fn new(
        api: Arc<dyn MessagingApi>,
        store: Arc<dyn UserStore>,
        config: ResponderConfig,
    ) -> Self {
        Self { api, store, config }
    }

    #[instrument(skip_all)]
    pub async fn on_text_message(&self, event: &MessageEvent) -> Result<()> {
        let MessageContent::Text(message) = &event.message else {
            debug!("Ignoring non-text message");
            return Ok(());
        };

        let Some(intent) = match_intent(&message.text) else {
            debug!("No trigger matched");
            return Ok(());
        };

        let reply = match intent {
            Intent::Add => ADD_PROMPT.to_string(),
            Intent::Delete => DELETE_PROMPT.to_string(),
            Intent::Register => match self.register(&event.source).await {
                Ok(user) => registration_confirmation(&user.user_name),
                Err(e) => {
                    error!("Registration failed: {}", e);
                    REGISTRATION_FAILED.to_string()
                }
            },
        };

        self.reply(event.reply_token.as_deref(), reply).await
    }

    #[instrument(skip_all)]
    pub async fn on_follow(&self, event: &FollowEvent) -> Result<()> {
        if self.config.register_on_follow {
            if let Err(e) = self.register(&event.source).await {
                error!("Registration on follow failed: {}", e);
            }
        }

        self.reply(event.reply_token.as_deref(), WELCOME_MESSAGE.to_string())
            .await
    }

    async fn register(&self, source: &Source) -> Result<RegisteredUser> {
        let profile = self.fetch_profile(source).await?;
        let user = self
            .store
            .insert_user(&NewUser::registered(profile.user_id))
            .await?;

        info!("User {} registered with id {}", user.user_name, user.id);
        Ok(user)
    }

    /// Friends resolve through the user profile; senders in a group or room
    /// who have not added the bot only resolve through the member profile.
    async fn fetch_profile(&self, source: &Source) -> Result<Profile> {
        match source {
            Source::User { user_id } => self.api.get_profile(user_id).await,
            Source::Group {
                group_id,
                user_id: Some(user_id),
            } => self.api.get_group_member_profile(group_id, user_id).await,
            Source::Room {
                room_id,
                user_id: Some(user_id),
            } => self.api.get_room_member_profile(room_id, user_id).await,
            Source::Group { user_id: None, .. } | Source::Room { user_id: None, .. } => Err(
                BotError::Internal("Event source carries no user id".to_string()),
            ),
        }
    }

    async fn reply(&self, reply_token: Option<&str>, text: String) -> Result<()> {
        let Some(reply_token) = reply_token else {
            warn!("Event has no reply token, dropping reply");
            return Ok(());
        };

        self.api
            .reply_message(reply_token, &[SendMessage::text(text)])
            .await
    }
}
