use crate::error::{BotError, Result};
use crate::line::event::{CallbackBody, Event};
use crate::line::signature::verify_signature;
use crate::responder::Responder;
use tracing::{debug, info, instrument};

/// Verifies webhook deliveries and routes their events to the responder.
pub struct WebhookHandler {
    channel_secret: String,
    responder: Responder,
}

impl WebhookHandler {
    pub fn new(channel_secret: impl Into<String>, responder: Responder) -> Self {
        Self {
            channel_secret: channel_secret.into(),
            responder,
        }
    }

    /// Verify `signature` over `body`, then run every event in payload order.
    ///
    /// Nothing is parsed or dispatched when the signature does not match.
    #[instrument(skip_all)]
    pub async fn handle(&self, body: &[u8], signature: &str) -> Result<()> {
        if !verify_signature(&self.channel_secret, body, signature) {
            return Err(BotError::InvalidSignature);
        }

        let payload: CallbackBody =
            serde_json::from_slice(body).map_err(|e| BotError::MalformedPayload {
                cause: e.to_string(),
            })?;

        if payload.events.is_empty() {
            info!("Webhook verification request for {}", payload.destination);
            return Ok(());
        }

        for event in &payload.events {
            self.dispatch(event).await?;
        }

        Ok(())
    }

    async fn dispatch(&self, event: &Event) -> Result<()> {
        match event {
            Event::Message(message) => self.responder.on_text_message(message).await,
            Event::Follow(follow) => self.responder.on_follow(follow).await,
            Event::Unsupported => {
                debug!("No handler for {} event", event.kind());
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line::client::MockMessagingApi;
    use crate::line::signature::sign;
    use crate::responder::{ResponderConfig, ADD_PROMPT, DELETE_PROMPT};
    use crate::store::MockUserStore;
    use std::sync::Arc;
    use tokio_test::{assert_err, assert_ok};

    const SECRET: &str = "channelsecret";

    fn handler(api: MockMessagingApi) -> WebhookHandler {
        let mut store = MockUserStore::new();
        store.expect_insert_user().never();
        let responder = Responder::new(Arc::new(api), Arc::new(store), ResponderConfig::default());
        WebhookHandler::new(SECRET, responder)
    }

    fn text_event(token: &str, text: &str) -> serde_json::Value {
        serde_json::json!({
            "type": "message",
            "replyToken": token,
            "source": {"type": "user", "userId": "U1234567890"},
            "timestamp": 1,
            "message": {"id": "1", "type": "text", "text": text}
        })
    }

    #[tokio::test]
    async fn test_invalid_signature_dispatches_nothing() {
        let mut api = MockMessagingApi::new();
        api.expect_reply_message().never();
        api.expect_get_profile().never();

        let body = serde_json::to_vec(&serde_json::json!({"events": [text_event("t1", "add milk")]})).unwrap();
        let err = handler(api).handle(&body, &sign("wrong", &body)).await.unwrap_err();
        assert!(matches!(err, BotError::InvalidSignature));
    }

    #[tokio::test]
    async fn test_events_dispatched_in_order() {
        let mut api = MockMessagingApi::new();
        let mut seq = mockall::Sequence::new();
        api.expect_reply_message()
            .withf(|token, messages| token == "t1" && messages[0] == crate::line::SendMessage::text(ADD_PROMPT))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        api.expect_reply_message()
            .withf(|token, messages| token == "t2" && messages[0] == crate::line::SendMessage::text(DELETE_PROMPT))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));

        let body = serde_json::to_vec(&serde_json::json!({
            "destination": "Ubot",
            "events": [
                text_event("t1", "add eggs"),
                {"type": "unfollow", "source": {"type": "user", "userId": "U1"}},
                text_event("t2", "delete eggs")
            ]
        }))
        .unwrap();

        assert_ok!(handler(api).handle(&body, &sign(SECRET, &body)).await);
    }

    #[tokio::test]
    async fn test_verified_garbage_is_malformed() {
        let api = MockMessagingApi::new();
        let body = b"not json";
        let result = handler(api).handle(body, &sign(SECRET, body)).await;
        assert!(matches!(assert_err!(result), BotError::MalformedPayload { .. }));
    }

    #[tokio::test]
    async fn test_verification_request() {
        let mut api = MockMessagingApi::new();
        api.expect_reply_message().never();
        let body = br#"{"destination":"Ubot","events":[]}"#;
        assert_ok!(handler(api).handle(body, &sign(SECRET, body)).await);
    }
}
