//! Secrets read from the environment (after `.env` is loaded).

use std::fmt;

use crate::error::StartupError;

pub const BOT_TOKEN: &str = "BOT_TOKEN";
pub const CHAT_ID: &str = "CHAT_ID";
pub const OPENROUTER_API_KEY: &str = "OPENROUTER_API_KEY";
pub const GOOGLE_AI_API_KEY: &str = "GOOGLE_AI_API_KEY";

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub bot_token: String,
    /// The only chat the bot talks to.
    pub chat_id: i64,
    pub openrouter_api_key: String,
    pub google_api_key: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("chat_id", &self.chat_id)
            .finish_non_exhaustive()
    }
}

impl Credentials {
    pub fn from_env() -> Result<Self, StartupError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; empty values count as missing.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, StartupError> {
        let require = |key: &'static str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(StartupError::MissingEnv(key))
        };

        let raw_chat_id = require(CHAT_ID)?;
        let chat_id = raw_chat_id
            .parse::<i64>()
            .map_err(|e| StartupError::InvalidEnv {
                key: CHAT_ID,
                message: format!("{raw_chat_id:?}: {e}"),
            })?;

        Ok(Self {
            bot_token: require(BOT_TOKEN)?,
            chat_id,
            openrouter_api_key: require(OPENROUTER_API_KEY)?,
            google_api_key: require(GOOGLE_AI_API_KEY)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn all_keys_present() {
        let vars = env(&[
            (BOT_TOKEN, "123:abc"),
            (CHAT_ID, "-100500"),
            (OPENROUTER_API_KEY, "or"),
            (GOOGLE_AI_API_KEY, "g"),
        ]);
        let creds = Credentials::from_lookup(|k| vars.get(k).cloned()).unwrap();
        assert_eq!(creds.chat_id, -100500);
        assert!(!format!("{creds:?}").contains("123:abc"));
    }

    #[test]
    fn missing_or_blank_key_is_reported() {
        let vars = env(&[(BOT_TOKEN, "t"), (CHAT_ID, "1"), (OPENROUTER_API_KEY, "  ")]);
        let err = Credentials::from_lookup(|k| vars.get(k).cloned()).unwrap_err();
        assert!(matches!(err, StartupError::MissingEnv(OPENROUTER_API_KEY)));
    }

    #[test]
    fn chat_id_must_be_numeric() {
        let vars = env(&[
            (BOT_TOKEN, "t"),
            (CHAT_ID, "me"),
            (OPENROUTER_API_KEY, "o"),
            (GOOGLE_AI_API_KEY, "g"),
        ]);
        let err = Credentials::from_lookup(|k| vars.get(k).cloned()).unwrap_err();
        assert!(matches!(err, StartupError::InvalidEnv { key: CHAT_ID, .. }));
    }
}
