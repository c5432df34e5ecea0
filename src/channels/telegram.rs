//! Telegram surface: inline keyboards for choices, force-reply for remarks.
//!
//! Native Rust Telegram Bot API implementation over `reqwest`. Each prompt is
//! a new message; its `message_id` is the prompt id. Button presses arrive as
//! `callback_query` updates, remark text as a reply to the remark prompt.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::channels::{ChatSurface, Interaction, InteractionStream, PromptId};
use crate::error::ChannelError;
use crate::triage::prompt::{Controls, Prompt, PromptOption};

/// Callback data carried by buttons of a resolved prompt.
const INERT_CALLBACK: &str = "noop";

/// Long-poll timeout passed to getUpdates, in seconds.
const POLL_TIMEOUT_SECS: u64 = 30;

/// Telegram surface bound to a single chat.
pub struct TelegramSurface {
    bot_token: SecretString,
    chat_id: String,
    allowed_users: Vec<String>,
    client: reqwest::Client,
}

impl TelegramSurface {
    pub fn new(
        bot_token: SecretString,
        chat_id: String,
        allowed_users: Vec<String>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            bot_token,
            chat_id,
            allowed_users,
            client,
        }
    }

    fn api_url(&self, method: &str) -> String {
        api_url(&self.bot_token, method)
    }

    /// Check if a username or numeric id is in the allowed list.
    pub fn is_user_allowed(&self, identity: &str) -> bool {
        check_user_allowed(&self.allowed_users, [identity])
    }

    /// Call a Bot API method and return its `result` payload.
    async fn call(&self, method: &str, body: &Value) -> Result<Value, String> {
        call_api(&self.client, &self.api_url(method), body).await
    }
}

#[async_trait]
impl ChatSurface for TelegramSurface {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn start(&self) -> Result<InteractionStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let client = self.client.clone();
        let updates_url = self.api_url("getUpdates");
        let answer_url = self.api_url("answerCallbackQuery");
        let chat_id = self.chat_id.clone();
        let allowed_users = self.allowed_users.clone();

        tokio::spawn(async move {
            let mut offset: i64 = 0;

            tracing::info!(chat_id = %chat_id, "Telegram surface listening for interactions...");

            loop {
                let body = serde_json::json!({
                    "offset": offset,
                    "timeout": POLL_TIMEOUT_SECS,
                    "allowed_updates": ["message", "callback_query"]
                });

                let results = match call_api(&client, &updates_url, &body).await {
                    Ok(Value::Array(results)) => results,
                    Ok(other) => {
                        tracing::warn!("Telegram getUpdates returned unexpected payload: {other}");
                        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                        continue;
                    }
                    Err(e) => {
                        tracing::warn!("Telegram poll error: {e}");
                        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                        continue;
                    }
                };

                for update in &results {
                    let parsed = parse_update(update, &chat_id, &allowed_users);

                    if let Some(uid) = parsed.update_id {
                        offset = uid + 1;
                    }

                    // Button presses must be acknowledged or the client spins.
                    if let Some(callback_id) = parsed.callback_query_id {
                        let ack = serde_json::json!({ "callback_query_id": callback_id });
                        if let Err(e) = call_api(&client, &answer_url, &ack).await {
                            tracing::debug!("answerCallbackQuery failed: {e}");
                        }
                    }

                    let Some(interaction) = parsed.interaction else {
                        continue;
                    };

                    if tx.send(interaction).is_err() {
                        tracing::info!("Telegram listener channel closed");
                        return;
                    }
                }
            }
        });

        Ok(Box::pin(UnboundedReceiverStream::new(rx)))
    }

    async fn send_prompt(&self, prompt: &Prompt) -> Result<PromptId, ChannelError> {
        let mut body = serde_json::json!({
            "chat_id": self.chat_id,
            "text": message_text(prompt),
        });
        if let Some(markup) = reply_markup(&prompt.controls) {
            body["reply_markup"] = markup;
        }

        let result = self
            .call("sendMessage", &body)
            .await
            .map_err(|reason| ChannelError::SendFailed {
                name: "telegram".into(),
                reason,
            })?;

        let message_id = result
            .get("message_id")
            .and_then(Value::as_i64)
            .ok_or_else(|| ChannelError::SendFailed {
                name: "telegram".into(),
                reason: "sendMessage result has no message_id".into(),
            })?;

        tracing::debug!(message_id, "Telegram prompt sent");
        Ok(PromptId::new(message_id.to_string()))
    }

    async fn disable_prompt(
        &self,
        id: &PromptId,
        prompt: &Prompt,
        chosen: Option<&str>,
    ) -> Result<(), ChannelError> {
        // Force-reply prompts have no keyboard to disable.
        let Controls::Buttons(options) = &prompt.controls else {
            return Ok(());
        };

        let edit_failed = |reason: String| ChannelError::EditFailed {
            name: "telegram".into(),
            prompt_id: id.to_string(),
            reason,
        };

        let message_id: i64 = id
            .as_str()
            .parse()
            .map_err(|_| edit_failed("prompt id is not a Telegram message id".into()))?;

        let body = serde_json::json!({
            "chat_id": self.chat_id,
            "message_id": message_id,
            "reply_markup": inert_keyboard(options, chosen),
        });

        self.call("editMessageReplyMarkup", &body)
            .await
            .map(|_| ())
            .map_err(edit_failed)
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        self.call("getMe", &serde_json::json!({}))
            .await
            .map(|_| ())
            .map_err(|reason| ChannelError::StartupFailed {
                name: "telegram".into(),
                reason,
            })
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn api_url(bot_token: &SecretString, method: &str) -> String {
    format!(
        "https://api.telegram.org/bot{}/{method}",
        bot_token.expose_secret()
    )
}

/// POST a Bot API call; unwrap `{"ok": true, "result": ...}`.
async fn call_api(client: &reqwest::Client, url: &str, body: &Value) -> Result<Value, String> {
    let resp = client
        .post(url)
        .json(body)
        .send()
        .await
        // reqwest errors embed the URL, which embeds the token.
        .map_err(|e| e.without_url().to_string())?;

    let status = resp.status();
    let data: Value = resp.json().await.map_err(|e| e.without_url().to_string())?;

    if !status.is_success() || data.get("ok").and_then(Value::as_bool) != Some(true) {
        let description = data
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or("no description");
        return Err(format!("{status}: {description}"));
    }

    Ok(data.get("result").cloned().unwrap_or(Value::Null))
}

/// Check if any identity in the iterator matches the allowed users list.
fn check_user_allowed<'a>(
    allowed_users: &[String],
    identities: impl IntoIterator<Item = &'a str>,
) -> bool {
    let ids: Vec<&str> = identities.into_iter().collect();
    allowed_users
        .iter()
        .any(|u| u == "*" || ids.contains(&u.as_str()))
}

fn message_text(prompt: &Prompt) -> String {
    match &prompt.controls {
        Controls::TextInput { label, .. } => format!(
            "{}\nReply to this message with your {}.",
            prompt.text,
            label.to_lowercase()
        ),
        _ => prompt.text.clone(),
    }
}

fn reply_markup(controls: &Controls) -> Option<Value> {
    match controls {
        Controls::Buttons(options) => {
            let row: Vec<Value> = options
                .iter()
                .map(|o| serde_json::json!({ "text": o.label, "callback_data": o.value }))
                .collect();
            Some(serde_json::json!({ "inline_keyboard": [row] }))
        }
        Controls::TextInput { placeholder, .. } => Some(serde_json::json!({
            "force_reply": true,
            "input_field_placeholder": placeholder,
        })),
        Controls::None => None,
    }
}

/// Same buttons, no longer actionable; the chosen one is ticked.
fn inert_keyboard(options: &[PromptOption], chosen: Option<&str>) -> Value {
    let row: Vec<Value> = options
        .iter()
        .map(|o| {
            let text = if chosen == Some(o.value.as_str()) {
                format!("✓ {}", o.label)
            } else {
                o.label.clone()
            };
            serde_json::json!({ "text": text, "callback_data": INERT_CALLBACK })
        })
        .collect();
    serde_json::json!({ "inline_keyboard": [row] })
}

/// What a single getUpdates entry carries.
#[derive(Debug, Default)]
struct ParsedUpdate {
    update_id: Option<i64>,
    callback_query_id: Option<String>,
    interaction: Option<Interaction>,
}

fn parse_update(update: &Value, chat_id: &str, allowed_users: &[String]) -> ParsedUpdate {
    let mut parsed = ParsedUpdate {
        update_id: update.get("update_id").and_then(Value::as_i64),
        ..Default::default()
    };

    if let Some(query) = update.get("callback_query") {
        parsed.callback_query_id = query.get("id").and_then(Value::as_str).map(String::from);

        let Some(message) = query.get("message") else {
            return parsed;
        };
        if !in_chat(message, chat_id) {
            return parsed;
        }
        let Some(user) = allowed_sender(query.get("from"), allowed_users) else {
            return parsed;
        };
        let Some(data) = query.get("data").and_then(Value::as_str) else {
            return parsed;
        };
        if data == INERT_CALLBACK {
            return parsed;
        }
        let Some(message_id) = message.get("message_id").and_then(Value::as_i64) else {
            return parsed;
        };

        parsed.interaction =
            Some(Interaction::select(PromptId::new(message_id.to_string()), data).with_user(user));
        return parsed;
    }

    if let Some(message) = update.get("message") {
        if !in_chat(message, chat_id) {
            return parsed;
        }
        // Only replies to a prompt count; chatter in the chat is ignored.
        let Some(reply_to) = message
            .get("reply_to_message")
            .and_then(|r| r.get("message_id"))
            .and_then(Value::as_i64)
        else {
            return parsed;
        };
        let Some(text) = message.get("text").and_then(Value::as_str) else {
            return parsed;
        };
        if text.trim().is_empty() {
            return parsed;
        }
        let Some(user) = allowed_sender(message.get("from"), allowed_users) else {
            return parsed;
        };

        parsed.interaction = Some(
            Interaction::submit_text(PromptId::new(reply_to.to_string()), text).with_user(user),
        );
    }

    parsed
}

fn in_chat(message: &Value, chat_id: &str) -> bool {
    let actual = match message.get("chat").and_then(|c| c.get("id")) {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) => s.clone(),
        _ => return false,
    };
    actual == chat_id
}

/// Display name of the sender if they are allowed to act.
fn allowed_sender(from: Option<&Value>, allowed_users: &[String]) -> Option<String> {
    let from = from?;
    let username = from.get("username").and_then(Value::as_str);
    let user_id = from.get("id").and_then(Value::as_i64).map(|id| id.to_string());

    let mut identities = Vec::new();
    identities.extend(username);
    identities.extend(user_id.as_deref());

    if !check_user_allowed(allowed_users, identities.iter().copied()) {
        tracing::warn!(
            "Telegram: ignoring interaction from unauthorized user: username={}, user_id={}",
            username.unwrap_or("unknown"),
            user_id.as_deref().unwrap_or("unknown")
        );
        return None;
    }

    username.map(String::from).or(user_id)
}

// ── Tests ───────────────────────────────────────────────────────────
