//! Callback tokens carried by menu buttons.
//!
//! A token is a verb optionally followed by arguments, joined with `_`.
//! Only the verb prefix is split off: catalog names such as `deep_work`
//! keep their own underscores.

use std::fmt;

use crate::catalog::{EntryKind, TimeOfDay};

/// Telegram rejects `callback_data` longer than this many bytes.
pub const MAX_TOKEN_BYTES: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackToken {
    MainMenu,
    ShowAddMenu,
    ShowMenu(TimeOfDay),
    ShowFailMenu,
    ShowPlan,
    Progress,
    AnalyzeDay,
    ShowStats,
    CreateChallenge,
    CreatePlan,
    Noop,
    Add(String),
    Fail(String),
    /// Remediation after a relapse: `anti_<relapse>_<option>`.
    Anti { relapse: String, option: String },
    /// `kind` is `None` for tokens from menus rendered before undo carried it.
    Undo { kind: Option<EntryKind>, name: String },
    CompletePlan(i64),
    Unknown(String),
}

impl CallbackToken {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "main_menu" => return Self::MainMenu,
            "show_add_menu" => return Self::ShowAddMenu,
            "show_morning_menu" => return Self::ShowMenu(TimeOfDay::Morning),
            "show_day_menu" => return Self::ShowMenu(TimeOfDay::Day),
            "show_evening_menu" => return Self::ShowMenu(TimeOfDay::Evening),
            "show_fail_menu" => return Self::ShowFailMenu,
            "show_plan" => return Self::ShowPlan,
            "progress" => return Self::Progress,
            "analyze_day" => return Self::AnalyzeDay,
            "show_stats" => return Self::ShowStats,
            "create_challenge" => return Self::CreateChallenge,
            "create_plan" => return Self::CreatePlan,
            "noop" => return Self::Noop,
            _ => {}
        }

        if let Some(id) = raw.strip_prefix("complete_plan_") {
            return id
                .parse()
                .map(Self::CompletePlan)
                .unwrap_or_else(|_| Self::Unknown(raw.to_string()));
        }
        if let Some(name) = raw.strip_prefix("add_") {
            return Self::Add(name.to_string());
        }
        if let Some(name) = raw.strip_prefix("fail_") {
            return Self::Fail(name.to_string());
        }
        if let Some(rest) = raw.strip_prefix("anti_") {
            return match rest.split_once('_') {
                Some((relapse, option)) if !relapse.is_empty() => Self::Anti {
                    relapse: relapse.to_string(),
                    option: option.to_string(),
                },
                _ => Self::Unknown(raw.to_string()),
            };
        }
        if let Some(rest) = raw.strip_prefix("undo_") {
            if let Some((kind, name)) = rest.split_once('_') {
                if let Some(kind) = EntryKind::parse(kind) {
                    return Self::Undo {
                        kind: Some(kind),
                        name: name.to_string(),
                    };
                }
            }
            return Self::Undo {
                kind: None,
                name: rest.to_string(),
            };
        }

        Self::Unknown(raw.to_string())
    }

    /// Whether the encoded form fits into a Telegram button.
    pub fn fits(&self) -> bool {
        self.to_string().len() <= MAX_TOKEN_BYTES
    }
}

impl fmt::Display for CallbackToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MainMenu => f.write_str("main_menu"),
            Self::ShowAddMenu => f.write_str("show_add_menu"),
            Self::ShowMenu(TimeOfDay::Morning) => f.write_str("show_morning_menu"),
            Self::ShowMenu(TimeOfDay::Day) => f.write_str("show_day_menu"),
            Self::ShowMenu(TimeOfDay::Evening) => f.write_str("show_evening_menu"),
            Self::ShowFailMenu => f.write_str("show_fail_menu"),
            Self::ShowPlan => f.write_str("show_plan"),
            Self::Progress => f.write_str("progress"),
            Self::AnalyzeDay => f.write_str("analyze_day"),
            Self::ShowStats => f.write_str("show_stats"),
            Self::CreateChallenge => f.write_str("create_challenge"),
            Self::CreatePlan => f.write_str("create_plan"),
            Self::Noop => f.write_str("noop"),
            Self::Add(name) => write!(f, "add_{name}"),
            Self::Fail(name) => write!(f, "fail_{name}"),
            Self::Anti { relapse, option } => write!(f, "anti_{relapse}_{option}"),
            Self::Undo {
                kind: Some(kind),
                name,
            } => write!(f, "undo_{}_{name}", kind.as_str()),
            Self::Undo { kind: None, name } => write!(f, "undo_{name}"),
            Self::CompletePlan(id) => write!(f, "complete_plan_{id}"),
            Self::Unknown(raw) => f.write_str(raw),
        }
    }
}
