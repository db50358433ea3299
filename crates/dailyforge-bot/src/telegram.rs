//! Telegram Bot API client over plain HTTPS long polling.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dailyforge_core::{Attachment, Menu, Outbound, ParseMode, Placement};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::error::TransportError;
use crate::transport::{Inbound, InboundKind, Transport};

pub const API_BASE: &str = "https://api.telegram.org";
pub const POLL_TIMEOUT_SECS: u64 = 30;
pub const MESSAGE_LIMIT: usize = 4096;
pub const CAPTION_LIMIT: usize = 1024;

#[derive(Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Deserialize)]
struct Update {
    update_id: i64,
    message: Option<Message>,
    callback_query: Option<CallbackQuery>,
}

#[derive(Deserialize)]
struct Message {
    message_id: i64,
    chat: Chat,
    text: Option<String>,
}

#[derive(Deserialize)]
struct Chat {
    id: i64,
}

#[derive(Deserialize)]
struct User {
    id: i64,
}

#[derive(Deserialize)]
struct CallbackQuery {
    id: String,
    from: User,
    message: Option<Message>,
    data: Option<String>,
}

impl Update {
    fn into_inbound(self) -> Option<Inbound> {
        if let Some(query) = self.callback_query {
            let (chat_id, message_id) = match &query.message {
                Some(m) => (m.chat.id, Some(m.message_id)),
                None => (query.from.id, None),
            };
            return Some(Inbound {
                chat_id,
                kind: InboundKind::Callback {
                    id: query.id,
                    data: query.data.unwrap_or_default(),
                    message_id,
                },
            });
        }
        let message = self.message?;
        Some(Inbound {
            chat_id: message.chat.id,
            kind: InboundKind::Text(message.text?),
        })
    }
}

/// `{"inline_keyboard": [[{"text", "callback_data"}]]}`
fn keyboard(menu: &Menu) -> Value {
    let rows: Vec<Vec<Value>> = menu
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|b| json!({ "text": b.label, "callback_data": b.token.to_string() }))
                .collect()
        })
        .collect();
    json!({ "inline_keyboard": rows })
}

fn parse_mode_name(mode: ParseMode) -> &'static str {
    match mode {
        ParseMode::Markdown => "Markdown",
    }
}

/// Length as Telegram counts it: UTF-16 code units.
pub fn text_len(text: &str) -> usize {
    text.encode_utf16().count()
}

/// Split on char boundaries into pieces of at most `limit` UTF-16 units,
/// preferring the last newline inside each window.
pub fn split_text(text: &str, limit: usize) -> Vec<String> {
    if text_len(text) <= limit {
        return vec![text.to_string()];
    }
    let chars: Vec<char> = text.chars().collect();
    let mut parts = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let mut end = start;
        let mut units = 0;
        while end < chars.len() {
            let width = chars[end].len_utf16();
            if units + width > limit && end > start {
                break;
            }
            units += width;
            end += 1;
        }
        if end < chars.len() {
            if let Some(nl) = chars[start..end].iter().rposition(|c| *c == '\n') {
                if nl > 0 {
                    end = start + nl + 1;
                }
            }
        }
        parts.push(chars[start..end].iter().collect());
        start = end;
    }
    parts
}

pub struct TelegramClient {
    http_client: Client,
    base_url: String,
    token: String,
    poll_timeout: u64,
    offset: AtomicI64,
}

impl TelegramClient {
    pub fn new(token: impl Into<String>) -> Result<Self, TransportError> {
        Self::with_base_url(API_BASE, token, POLL_TIMEOUT_SECS)
    }

    pub fn with_base_url(
        base_url: &str,
        token: impl Into<String>,
        poll_timeout: u64,
    ) -> Result<Self, TransportError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(poll_timeout + 15))
            .build()?;
        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
            poll_timeout,
            offset: AtomicI64::new(0),
        })
    }

    fn url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.base_url, self.token)
    }

    async fn decode<T: DeserializeOwned>(
        method: &'static str,
        resp: Response,
    ) -> Result<T, TransportError> {
        let status = resp.status();
        let body = resp.text().await?;
        let parsed: ApiResponse<T> = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(e) if status.is_success() => {
                return Err(TransportError::Decode {
                    method,
                    message: e.to_string(),
                })
            }
            Err(_) => {
                return Err(TransportError::Api {
                    method,
                    status: status.as_u16(),
                    description: body,
                })
            }
        };
        if !parsed.ok || !status.is_success() {
            return Err(TransportError::Api {
                method,
                status: status.as_u16(),
                description: parsed.description.unwrap_or_default(),
            });
        }
        parsed.result.ok_or(TransportError::Decode {
            method,
            message: "missing result".into(),
        })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &'static str,
        body: &Value,
    ) -> Result<T, TransportError> {
        let resp = self
            .http_client
            .post(self.url(method))
            .json(body)
            .send()
            .await?;
        Self::decode(method, resp).await
    }

    /// JSON call that drops `parse_mode` and retries once when Telegram
    /// cannot parse the markup.
    async fn call_with_markup<T: DeserializeOwned>(
        &self,
        method: &'static str,
        mut body: Map<String, Value>,
    ) -> Result<T, TransportError> {
        match self.call(method, &Value::Object(body.clone())).await {
            Err(e) if e.is_markup_rejection() && body.contains_key("parse_mode") => {
                warn!(method, error = %e, "markup rejected, resending as plain text");
                body.remove("parse_mode");
                self.call(method, &Value::Object(body)).await
            }
            other => other,
        }
    }

    fn text_body(
        chat_id: i64,
        text: &str,
        menu: Option<&Menu>,
        parse_mode: Option<ParseMode>,
    ) -> Map<String, Value> {
        let mut body = Map::new();
        body.insert("chat_id".into(), json!(chat_id));
        body.insert("text".into(), json!(text));
        if let Some(menu) = menu {
            body.insert("reply_markup".into(), keyboard(menu));
        }
        if let Some(mode) = parse_mode {
            body.insert("parse_mode".into(), json!(parse_mode_name(mode)));
        }
        body
    }

    /// Send `text` as one or more messages; the menu rides on the last one.
    pub async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        menu: Option<&Menu>,
        parse_mode: Option<ParseMode>,
    ) -> Result<i64, TransportError> {
        let parts = split_text(text, MESSAGE_LIMIT);
        let last = parts.len() - 1;
        let mut message_id = 0;
        for (idx, part) in parts.iter().enumerate() {
            let menu = if idx == last { menu } else { None };
            let sent: Message = self
                .call_with_markup("sendMessage", Self::text_body(chat_id, part, menu, parse_mode))
                .await?;
            message_id = sent.message_id;
        }
        Ok(message_id)
    }

    pub async fn edit_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        menu: Option<&Menu>,
        parse_mode: Option<ParseMode>,
    ) -> Result<(), TransportError> {
        let mut body = Self::text_body(chat_id, text, menu, parse_mode);
        body.insert("message_id".into(), json!(message_id));
        // Result is the edited Message, or `true` for inline messages.
        let _: Value = self.call_with_markup("editMessageText", body).await?;
        Ok(())
    }

    async fn send_media_once(
        &self,
        chat_id: i64,
        attachment: &Attachment,
        caption: Option<&str>,
        menu: Option<&Menu>,
        parse_mode: Option<ParseMode>,
    ) -> Result<Message, TransportError> {
        let (method, field, bytes, filename) = match attachment {
            Attachment::Photo { bytes, filename } => ("sendPhoto", "photo", bytes, filename),
            Attachment::Audio { bytes, filename } => ("sendAudio", "audio", bytes, filename),
        };
        let mut form = Form::new()
            .text("chat_id", chat_id.to_string())
            .part(field, Part::bytes(bytes.clone()).file_name(filename.clone()));
        if let Some(caption) = caption.filter(|c| !c.is_empty()) {
            form = form.text("caption", caption.to_string());
            if let Some(mode) = parse_mode {
                form = form.text("parse_mode", parse_mode_name(mode));
            }
        }
        if let Some(menu) = menu {
            form = form.text("reply_markup", keyboard(menu).to_string());
        }

        let resp = self
            .http_client
            .post(self.url(method))
            .multipart(form)
            .send()
            .await?;
        Self::decode(method, resp).await
    }

    /// Upload an attachment. Captions over the Telegram limit go out as a
    /// follow-up text message carrying the menu.
    pub async fn send_media(
        &self,
        chat_id: i64,
        attachment: &Attachment,
        caption: &str,
        menu: Option<&Menu>,
        parse_mode: Option<ParseMode>,
    ) -> Result<(), TransportError> {
        if text_len(caption) > CAPTION_LIMIT {
            self.send_media_once(chat_id, attachment, None, None, None)
                .await?;
            self.send_text(chat_id, caption, menu, parse_mode).await?;
            return Ok(());
        }
        match self
            .send_media_once(chat_id, attachment, Some(caption), menu, parse_mode)
            .await
        {
            Err(e) if e.is_markup_rejection() && parse_mode.is_some() => {
                warn!(error = %e, "caption markup rejected, resending as plain text");
                self.send_media_once(chat_id, attachment, Some(caption), menu, None)
                    .await?;
            }
            other => {
                other?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Transport for TelegramClient {
    async fn poll(&self) -> Result<Vec<Inbound>, TransportError> {
        let body = json!({
            "offset": self.offset.load(Ordering::SeqCst),
            "timeout": self.poll_timeout,
            "allowed_updates": ["message", "callback_query"],
        });
        let updates: Vec<Update> = self.call("getUpdates", &body).await?;
        if let Some(last) = updates.iter().map(|u| u.update_id).max() {
            self.offset.store(last + 1, Ordering::SeqCst);
        }
        debug!(count = updates.len(), "updates received");
        Ok(updates.into_iter().filter_map(Update::into_inbound).collect())
    }

    async fn acknowledge(
        &self,
        callback_id: &str,
        notice: Option<&str>,
    ) -> Result<(), TransportError> {
        let mut body = json!({ "callback_query_id": callback_id });
        if let Some(text) = notice {
            body["text"] = json!(text);
        }
        let _: bool = self.call("answerCallbackQuery", &body).await?;
        Ok(())
    }

    async fn deliver(
        &self,
        chat_id: i64,
        origin: Option<i64>,
        message: &Outbound,
    ) -> Result<(), TransportError> {
        let menu = message.menu.as_ref();
        if let Some(attachment) = &message.attachment {
            return self
                .send_media(chat_id, attachment, &message.text, menu, message.parse_mode)
                .await;
        }

        let fits = text_len(&message.text) <= MESSAGE_LIMIT;
        if let (Placement::InPlace, Some(message_id), true) = (message.placement, origin, fits) {
            match self
                .edit_text(chat_id, message_id, &message.text, menu, message.parse_mode)
                .await
            {
                Ok(()) => return Ok(()),
                Err(e) if e.is_not_modified() => return Ok(()),
                Err(e) => warn!(error = %e, message_id, "edit failed, sending a new message"),
            }
        }
        self.send_text(chat_id, &message.text, menu, message.parse_mode)
            .await
            .map(|_| ())
    }
}
