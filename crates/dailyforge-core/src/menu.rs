//! Response descriptors produced by the router and the inline menus they
//! carry.
//!
//! A [`Reply`] describes what to send, not how: AI-backed text and media are
//! requests that the renderer fulfils later, off the event loop.

use tracing::warn;

use crate::catalog::{Catalog, EntryKind, TimeOfDay};
use crate::messages::fmt_points;
use crate::storage::PlanItem;
use crate::token::CallbackToken;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub token: CallbackToken,
}

/// Inline keyboard: rows of buttons, top to bottom.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Menu {
    pub rows: Vec<Vec<Button>>,
}

impl Menu {
    pub fn push_row(&mut self, row: Vec<Button>) {
        let row: Vec<Button> = row
            .into_iter()
            .filter(|b| {
                let fits = b.token.fits();
                if !fits {
                    warn!(token = %b.token, "callback token too long, button dropped");
                }
                fits
            })
            .collect();
        if !row.is_empty() {
            self.rows.push(row);
        }
    }

    pub fn with_row(mut self, row: Vec<Button>) -> Self {
        self.push_row(row);
        self
    }

    /// Every token on the menu, in reading order.
    pub fn tokens(&self) -> impl Iterator<Item = &CallbackToken> {
        self.rows.iter().flatten().map(|b| &b.token)
    }
}

fn button(label: impl Into<String>, token: CallbackToken) -> Button {
    Button {
        label: label.into(),
        token,
    }
}

/// Where a reply lands relative to the message that triggered it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Replace the menu message the callback came from.
    InPlace,
    /// Send a new message.
    Append,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    Markdown,
}

/// Text produced by the AI text collaborator and framed by fixed copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiText {
    /// System persona; `None` selects the default mentor persona.
    pub persona: Option<String>,
    pub prompt: String,
    pub prefix: String,
    pub suffix: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyText {
    Static(String),
    Ai(AiText),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaRequest {
    /// Photo sent with the reply text as caption. When generation fails the
    /// text is sent alone, replaced by `fallback_text` if given.
    Image {
        prompt: String,
        filename: String,
        fallback_text: Option<String>,
    },
    /// Synthesized voice message.
    Voice { text: String, filename: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub placement: Placement,
    pub text: ReplyText,
    pub menu: Option<Menu>,
    pub media: Option<MediaRequest>,
    pub parse_mode: Option<ParseMode>,
}

impl Reply {
    pub fn new(placement: Placement, text: impl Into<String>) -> Self {
        Self {
            placement,
            text: ReplyText::Static(text.into()),
            menu: None,
            media: None,
            parse_mode: None,
        }
    }

    pub fn ai(placement: Placement, ai: AiText) -> Self {
        Self {
            placement,
            text: ReplyText::Ai(ai),
            menu: None,
            media: None,
            parse_mode: None,
        }
    }

    /// Media-only reply.
    pub fn media(media: MediaRequest) -> Self {
        Self {
            placement: Placement::Append,
            text: ReplyText::Static(String::new()),
            menu: None,
            media: Some(media),
            parse_mode: None,
        }
    }

    pub fn with_menu(mut self, menu: Menu) -> Self {
        self.menu = Some(menu);
        self
    }

    pub fn with_media(mut self, media: MediaRequest) -> Self {
        self.media = Some(media);
        self
    }

    pub fn markdown(mut self) -> Self {
        self.parse_mode = Some(ParseMode::Markdown);
        self
    }

    /// Whether rendering needs any AI call.
    pub fn needs_ai(&self) -> bool {
        matches!(self.text, ReplyText::Ai(_)) || self.media.is_some()
    }
}

/// Everything the router decided for one event.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Resolution {
    /// Delivered in order.
    pub replies: Vec<Reply>,
    /// Short acknowledgement for the callback (toast).
    pub notice: Option<String>,
}

impl Resolution {
    pub fn reply(reply: Reply) -> Self {
        Self {
            replies: vec![reply],
            notice: None,
        }
    }

    pub fn then(mut self, reply: Reply) -> Self {
        self.replies.push(reply);
        self
    }

    pub fn with_notice(mut self, notice: impl Into<String>) -> Self {
        self.notice = Some(notice.into());
        self
    }

    /// Acknowledge without sending anything.
    pub fn notice_only(notice: impl Into<String>) -> Self {
        Self {
            replies: Vec::new(),
            notice: Some(notice.into()),
        }
    }
}

pub fn main_menu(score: f64, target: f64) -> Menu {
    Menu::default()
        .with_row(vec![
            button("+ Баллы", CallbackToken::ShowAddMenu),
            button("- Баллы", CallbackToken::ShowFailMenu),
        ])
        .with_row(vec![
            button(
                format!("Прогресс: {}/{}", fmt_points(score), fmt_points(target)),
                CallbackToken::Progress,
            ),
            button("Анализ дня", CallbackToken::AnalyzeDay),
        ])
        .with_row(vec![
            button("Мой план", CallbackToken::ShowPlan),
            button("Статистика", CallbackToken::ShowStats),
        ])
        .with_row(vec![button("Создать челлендж", CallbackToken::CreateChallenge)])
}

pub fn add_menu() -> Menu {
    Menu::default()
        .with_row(vec![button("Утро", CallbackToken::ShowMenu(TimeOfDay::Morning))])
        .with_row(vec![button("День", CallbackToken::ShowMenu(TimeOfDay::Day))])
        .with_row(vec![button("Вечер", CallbackToken::ShowMenu(TimeOfDay::Evening))])
        .with_row(vec![button("Назад", CallbackToken::MainMenu)])
}

pub fn time_of_day_menu(catalog: &Catalog, section: TimeOfDay) -> Menu {
    let mut menu = Menu::default();
    for row in catalog.menu(section) {
        let points = catalog.points_for(&row.action, EntryKind::Action);
        menu.push_row(vec![button(
            format!("{} (+{})", row.label, fmt_points(points)),
            CallbackToken::Add(row.action.clone()),
        )]);
    }
    menu.with_row(vec![button("Назад", CallbackToken::ShowAddMenu)])
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Failures two per row, in catalog order.
pub fn failures_menu(catalog: &Catalog) -> Menu {
    let buttons: Vec<Button> = catalog
        .failures
        .iter()
        .map(|(name, points)| {
            button(
                format!("{} ({})", capitalize(name), fmt_points(*points)),
                CallbackToken::Fail(name.clone()),
            )
        })
        .collect();

    let mut menu = Menu::default();
    for pair in buttons.chunks(2) {
        menu.push_row(pair.to_vec());
    }
    menu.with_row(vec![button("Назад", CallbackToken::MainMenu)])
}

pub fn remediation_menu(catalog: &Catalog) -> Menu {
    let mut menu = Menu::default();
    for option in &catalog.remediations {
        menu.push_row(vec![button(
            format!("{} (+{})", option.label, fmt_points(option.points)),
            CallbackToken::Anti {
                relapse: catalog.relapse.clone(),
                option: option.key.clone(),
            },
        )]);
    }
    menu.with_row(vec![button("Продолжить", CallbackToken::MainMenu)])
}

/// Confirmation after a scored entry: undo it or go back.
pub fn confirmation_menu(undo: CallbackToken) -> Menu {
    Menu::default()
        .with_row(vec![button("Отменить действие", undo)])
        .with_row(vec![button("Назад в меню", CallbackToken::MainMenu)])
}

pub fn plan_menu(items: &[PlanItem]) -> Menu {
    let mut menu = Menu::default();
    for item in items {
        let row = if item.completed {
            button(format!("✅ {}", item.text), CallbackToken::Noop)
        } else {
            button(format!("⬜️ {}", item.text), CallbackToken::CompletePlan(item.id))
        };
        menu.push_row(vec![row]);
    }
    menu.with_row(vec![button("Создать новый план", CallbackToken::CreatePlan)])
        .with_row(vec![button("Назад", CallbackToken::MainMenu)])
}
