//! Turns [`Reply`] descriptors into concrete outbound messages.
//!
//! Rendering is where the AI calls happen; it runs in a task of its own so
//! the event loop never waits on a collaborator.

use tracing::debug;

use crate::ai::Assistant;
use crate::menu::{MediaRequest, Menu, ParseMode, Placement, Reply, ReplyText};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attachment {
    Photo { bytes: Vec<u8>, filename: String },
    Audio { bytes: Vec<u8>, filename: String },
}

/// A message ready for the transport.
///
/// With an attachment, `text` is the caption and the message is always sent
/// as a new message regardless of `placement`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    pub placement: Placement,
    pub text: String,
    pub menu: Option<Menu>,
    pub attachment: Option<Attachment>,
    pub parse_mode: Option<ParseMode>,
}

#[derive(Clone)]
pub struct Renderer {
    assistant: Assistant,
}

impl Renderer {
    pub fn new(assistant: Assistant) -> Self {
        Self { assistant }
    }

    async fn render_text(&self, text: ReplyText) -> String {
        match text {
            ReplyText::Static(text) => text,
            ReplyText::Ai(ai) => {
                let body = self.assistant.text(ai.persona.as_deref(), &ai.prompt).await;
                format!("{}{body}{}", ai.prefix, ai.suffix)
            }
        }
    }

    /// `None` when nothing is left to send: empty text and no media.
    pub async fn render(&self, reply: Reply) -> Option<Outbound> {
        let Reply {
            placement,
            text,
            menu,
            media,
            parse_mode,
        } = reply;

        let (mut text, attachment) = match media {
            None => (self.render_text(text).await, None),
            Some(MediaRequest::Image {
                prompt,
                filename,
                fallback_text,
            }) => {
                let (text, image) =
                    tokio::join!(self.render_text(text), self.assistant.image(&prompt));
                match image {
                    Some(bytes) => (text, Some(Attachment::Photo { bytes, filename })),
                    None => (fallback_text.unwrap_or(text), None),
                }
            }
            Some(MediaRequest::Voice {
                text: spoken,
                filename,
            }) => {
                let (text, audio) =
                    tokio::join!(self.render_text(text), self.assistant.speech(&spoken));
                (
                    text,
                    audio.map(|bytes| Attachment::Audio { bytes, filename }),
                )
            }
        };

        if text.trim().is_empty() && attachment.is_none() {
            debug!("reply rendered to nothing, skipped");
            return None;
        }
        if attachment.is_some() {
            text = text.trim_end().to_string();
        }

        Some(Outbound {
            placement,
            text,
            menu,
            attachment,
            parse_mode,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{ImageGenerator, SpeechSynthesizer, TextGenerator, Timeouts};
    use crate::error::AiError;
    use crate::menu::AiText;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct Fake {
        image_ok: bool,
        speech_ok: bool,
    }

    #[async_trait]
    impl TextGenerator for Fake {
        async fn generate(&self, _persona: &str, prompt: &str) -> Result<String, AiError> {
            Ok(format!("<{prompt}>"))
        }
    }

    #[async_trait]
    impl ImageGenerator for Fake {
        async fn generate_image(&self, _prompt: &str) -> Result<Vec<u8>, AiError> {
            if self.image_ok {
                Ok(vec![7])
            } else {
                Err(AiError::Timeout { secs: 1 })
            }
        }
    }

    #[async_trait]
    impl SpeechSynthesizer for Fake {
        async fn synthesize(&self, _text: &str) -> Result<Vec<u8>, AiError> {
            if self.speech_ok {
                Ok(vec![9])
            } else {
                Err(AiError::Timeout { secs: 1 })
            }
        }
    }

    fn renderer(image_ok: bool, speech_ok: bool) -> Renderer {
        let fake = Arc::new(Fake {
            image_ok,
            speech_ok,
        });
        Renderer::new(Assistant::new(
            fake.clone(),
            fake.clone(),
            fake,
            Timeouts::default(),
            "persona",
            "fallback",
        ))
    }

    fn ai_reply() -> Reply {
        Reply::ai(
            Placement::Append,
            AiText {
                persona: None,
                prompt: "p".into(),
                prefix: "A: ".into(),
                suffix: "!".into(),
            },
        )
    }

    #[tokio::test]
    async fn ai_text_is_framed() {
        let out = renderer(true, true).render(ai_reply()).await.unwrap();
        assert_eq!(out.text, "A: <p>!");
        assert!(out.attachment.is_none());
    }

    #[tokio::test]
    async fn missing_image_uses_fallback_text() {
        let reply = Reply::new(Placement::Append, "caption").with_media(MediaRequest::Image {
            prompt: "x".into(),
            filename: "a.png".into(),
            fallback_text: Some("sorry".into()),
        });
        let out = renderer(false, true).render(reply.clone()).await.unwrap();
        assert_eq!(out.text, "sorry");
        assert!(out.attachment.is_none());

        let out = renderer(true, true).render(reply).await.unwrap();
        assert_eq!(out.text, "caption");
        assert!(matches!(out.attachment, Some(Attachment::Photo { .. })));
    }

    #[tokio::test]
    async fn failed_voice_only_reply_is_skipped() {
        let reply = Reply::media(MediaRequest::Voice {
            text: "привет".into(),
            filename: "v.wav".into(),
        });
        assert!(renderer(true, false).render(reply.clone()).await.is_none());

        let out = renderer(true, true).render(reply).await.unwrap();
        assert!(matches!(out.attachment, Some(Attachment::Audio { .. })));
    }
}
