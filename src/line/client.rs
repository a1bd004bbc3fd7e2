use crate::config::Config;
use crate::error::{BotError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Outbound message. Only text replies are sent by this bot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SendMessage {
    Text { text: String },
}

impl SendMessage {
    pub fn text(text: impl Into<String>) -> Self {
        SendMessage::Text { text: text.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub user_id: String,
    pub display_name: String,
    pub picture_url: Option<String>,
    pub status_message: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplyRequest<'a> {
    reply_token: &'a str,
    messages: &'a [SendMessage],
}

/// The Messaging API calls the responder needs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessagingApi: Send + Sync {
    async fn reply_message(&self, reply_token: &str, messages: &[SendMessage]) -> Result<()>;
    async fn get_profile(&self, user_id: &str) -> Result<Profile>;
    async fn get_group_member_profile(&self, group_id: &str, user_id: &str) -> Result<Profile>;
    async fn get_room_member_profile(&self, room_id: &str, user_id: &str) -> Result<Profile>;
}

/// `reqwest`-backed Messaging API client. Cheap to clone.
#[derive(Clone)]
pub struct LineClient {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl LineClient {
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.line_api_timeout)
            .build()
            .map_err(|e| BotError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.line_api_base_url.clone(),
            access_token: config.channel_access_token.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn fetch_profile(&self, path: &str) -> Result<Profile> {
        let response = self
            .http
            .get(self.url(path))
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| BotError::messaging("get_profile", e))?;

        let profile = ensure_success("get_profile", response)
            .await?
            .json::<Profile>()
            .await
            .map_err(|e| BotError::messaging("get_profile", e))?;

        debug!("Fetched profile for {}", profile.user_id);
        Ok(profile)
    }
}

async fn ensure_success(operation: &str, response: reqwest::Response) -> Result<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(BotError::messaging(operation, format!("{} {}", status, body)))
}

#[async_trait]
impl MessagingApi for LineClient {
    #[instrument(skip_all)]
    async fn reply_message(&self, reply_token: &str, messages: &[SendMessage]) -> Result<()> {
        let response = self
            .http
            .post(self.url("/v2/bot/message/reply"))
            .bearer_auth(&self.access_token)
            .json(&ReplyRequest {
                reply_token,
                messages,
            })
            .send()
            .await
            .map_err(|e| BotError::messaging("reply", e))?;

        ensure_success("reply", response).await?;
        debug!("Sent {} reply message(s)", messages.len());
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_profile(&self, user_id: &str) -> Result<Profile> {
        self.fetch_profile(&format!("/v2/bot/profile/{}", user_id)).await
    }

    #[instrument(skip(self))]
    async fn get_group_member_profile(&self, group_id: &str, user_id: &str) -> Result<Profile> {
        self.fetch_profile(&format!("/v2/bot/group/{}/member/{}", group_id, user_id))
            .await
    }

    #[instrument(skip(self))]
    async fn get_room_member_profile(&self, room_id: &str, user_id: &str) -> Result<Profile> {
        self.fetch_profile(&format!("/v2/bot/room/{}/member/{}", room_id, user_id))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_request_shape() {
        let messages = [SendMessage::text("hello")];
        let body = serde_json::to_value(ReplyRequest {
            reply_token: "tok",
            messages: &messages,
        })
        .unwrap();

        assert_eq!(
            body,
            serde_json::json!({
                "replyToken": "tok",
                "messages": [{"type": "text", "text": "hello"}]
            })
        );
    }

    #[test]
    fn test_profile_parse() {
        let profile: Profile = serde_json::from_str(
            r#"{"displayName":"LINE taro","userId":"U4af4980629","language":"en",
                "pictureUrl":"https://profile.line-scdn.net/ch/v2/p/uf9da5ee2b/1234",
                "statusMessage":"Hello, LINE!"}"#,
        )
        .unwrap();

        assert_eq!(profile.user_id, "U4af4980629");
        assert_eq!(profile.display_name, "LINE taro");
        assert_eq!(profile.status_message.as_deref(), Some("Hello, LINE!"));
    }

    #[test]
    fn test_member_profile_parse() {
        // Member profiles carry no status message.
        let profile: Profile = serde_json::from_str(
            r#"{"displayName":"LINE taro","userId":"U4af4980629","pictureUrl":"https://profile.line-scdn.net/abcdefghijklmn"}"#,
        )
        .unwrap();

        assert_eq!(profile.user_id, "U4af4980629");
        assert_eq!(profile.status_message, None);
    }

    #[test]
    fn test_url_join() {
        let config = Config::from_lookup(|key| match key {
            "YOUR_CHANNEL_ACCESS_TOKEN" => Some("token".to_string()),
            "YOUR_CHANNEL_SECRET" => Some("secret".to_string()),
            "DATABASE_URL" => Some("postgres://localhost/bot".to_string()),
            "LINE_API_BASE_URL" => Some("http://127.0.0.1:8080/".to_string()),
            _ => None,
        })
        .unwrap();

        let client = LineClient::new(&config).unwrap();
        assert_eq!(
            client.url("/v2/bot/message/reply"),
            "http://127.0.0.1:8080/v2/bot/message/reply"
        );
    }
}
