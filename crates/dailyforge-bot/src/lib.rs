//! Telegram front end for Dailyforge.
//!
//! - [`credentials`]: secrets from the environment
//! - [`telegram`]: Bot API client implementing [`transport::Transport`]
//! - [`gateway`]: the job loop tying transport, router and renderer together

pub mod credentials;
pub mod error;
pub mod gateway;
pub mod telegram;
pub mod transport;

pub use credentials::Credentials;
pub use error::{StartupError, TransportError};
pub use gateway::{Gateway, Job};
pub use telegram::TelegramClient;
pub use transport::{Inbound, InboundKind, Transport};
