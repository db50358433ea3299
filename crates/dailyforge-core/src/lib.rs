//! # Dailyforge Core Library
//!
//! Business logic for the Dailyforge bot, a single-user gamified daily
//! tracker. The chat transport lives in the bot crate; everything here is
//! transport-agnostic and testable without network access.
//!
//! ## Architecture
//!
//! - **Storage**: SQLite score ledger, challenge and plan stores, TOML config
//! - **Router**: resolves one inbound event into replies, synchronously
//! - **Renderer**: executes the AI work a resolution describes, with fallbacks
//! - **Scheduler**: wall-clock calculation of the next daily trigger
//!
//! ## Key Components
//!
//! - [`ScoreLedger`]: daily totals and the action journal
//! - [`Router`]: event resolution
//! - [`Renderer`]: reply rendering through the [`Assistant`]
//! - [`DailySchedule`]: daily trigger times

pub mod ai;
pub mod catalog;
pub mod clock;
pub mod error;
pub mod grammar;
pub mod menu;
pub mod messages;
pub mod prompts;
pub mod render;
pub mod router;
pub mod scheduler;
pub mod storage;
pub mod token;

pub use ai::{Assistant, GeminiImage, GeminiSpeech, OpenRouter, Timeouts};
pub use catalog::{Catalog, EntryKind, TimeOfDay};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{AiError, ConfigError, CoreError, DatabaseError, GrammarError};
pub use menu::{Button, Menu, ParseMode, Placement, Reply, Resolution};
pub use render::{Attachment, Outbound, Renderer};
pub use router::{Event, Router};
pub use scheduler::{DailySchedule, DailyTrigger, Trigger};
pub use storage::{Challenge, ChallengeStore, Config, PlanItem, PlanStore, ScoreLedger, Store};
pub use token::CallbackToken;
