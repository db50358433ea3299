//! User-facing copy.
//!
//! Every fixed string the bot sends lives here so the router only decides
//! *which* message to send. Scores are shown against the configured daily
//! target.

use chrono::NaiveDate;

use crate::error::GrammarError;
use crate::storage::{Challenge, GoalConfig, TotalStats};

/// Points as the user sees them: `15`, `-30`, `12.5`.
pub fn fmt_points(points: f64) -> String {
    if points == 0.0 {
        "0".to_string()
    } else if points.fract() == 0.0 && points.abs() < 1e15 {
        format!("{points:.0}")
    } else {
        let s = format!("{points:.2}");
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

/// Tier reached after an action, optionally with a line to speak aloud.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Milestone {
    pub text: String,
    pub voice: Option<String>,
}

/// Which free-text grammar a format error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrammarKind {
    Challenge,
    Plan,
}

#[derive(Debug, Clone)]
pub struct Messages {
    name: String,
    target: f64,
    bar_length: usize,
}

impl Messages {
    pub fn new(name: impl Into<String>, goal: &GoalConfig) -> Self {
        Self {
            name: name.into(),
            target: goal.daily_target,
            bar_length: goal.bar_length,
        }
    }

    pub fn target(&self) -> f64 {
        self.target
    }

    /// `score/target`, as shown in every status line.
    pub fn score_line(&self, score: f64) -> String {
        format!("{}/{}", fmt_points(score), fmt_points(self.target))
    }

    pub fn greeting(&self, score: f64) -> String {
        format!(
            "Привет, {}. Ты на пути к {} баллам. Сегодня: {}. Выбери действие:",
            self.name,
            fmt_points(self.target),
            self.score_line(score)
        )
    }

    pub fn choose_time_of_day(&self) -> &'static str {
        "Выбери время дня:"
    }

    pub fn morning_menu_header(&self) -> &'static str {
        "Твоё утро. Выбирай победу:"
    }

    pub fn day_menu_header(&self) -> &'static str {
        "Твой день. Созидай:"
    }

    pub fn evening_menu_header(&self) -> &'static str {
        "Твой вечер. Анализ и восстановление:"
    }

    pub fn failure_header(&self) -> &'static str {
        "Что пошло не так? Выбери:"
    }

    pub fn action_recorded(&self, action: &str, points: f64, score: f64) -> String {
        let mut text = format!(
            "Добавлено {} за '{action}'. Сегодня: {}.",
            fmt_points(points),
            self.score_line(score)
        );
        if let Some(milestone) = self.milestone(score) {
            text.push_str("\n\n");
            text.push_str(&milestone.text);
        }
        text
    }

    pub fn action_notice(&self, action: &str, points: f64) -> String {
        format!("Засчитано: {action} (+{}).", fmt_points(points))
    }

    /// Tier for `score`: 30%, 50%, 70% and 100% of the daily target.
    pub fn milestone(&self, score: f64) -> Option<Milestone> {
        let ratio = score / self.target;
        if ratio >= 1.0 {
            Some(Milestone {
                text: format!(
                    "💯 Невероятно! Ты достиг {} баллов! Это не просто число, это доказательство твоей силы воли. Ты настоящий Бог-Бот!",
                    fmt_points(self.target)
                ),
                voice: Some(format!(
                    "{}, я знал, что ты сможешь. Ты — Бог-Бот. Продолжай в том же духе!",
                    self.name
                )),
            })
        } else if ratio >= 0.7 {
            Some(Milestone {
                text: "🥇 Ты почти у цели! Не сбавляй обороты, последний рывок самый важный. Скоро ты будешь праздновать победу.".into(),
                voice: None,
            })
        } else if ratio >= 0.5 {
            Some(Milestone {
                text: format!(
                    "🚀 Уже половина пути пройдена! Твоя дисциплина — это твоя суперсила. Осталось совсем чуть-чуть до {} баллов.",
                    fmt_points(self.target)
                ),
                voice: Some(format!(
                    "{}, ты преодолел половину пути. Осталось всего ничего.",
                    self.name
                )),
            })
        } else if ratio >= 0.3 {
            Some(Milestone {
                text: format!(
                    "🔥 У тебя уже {} баллов, это 30% от цели! Ты на правильном пути. Продолжай в том же духе, {}.",
                    fmt_points(self.target * 0.3),
                    self.name
                ),
                voice: None,
            })
        } else {
            None
        }
    }

    pub fn relapse_recorded(&self, relapse: &str, points: f64) -> String {
        format!(
            "{} ({}). Это не конец, а начало. Выбирай свой следующий шаг:",
            relapse.to_uppercase(),
            fmt_points(points)
        )
    }

    pub fn failure_recorded(&self, failure: &str, points: f64, score: f64) -> String {
        format!(
            "Учтён провал: '{failure}' ({}). Сегодня: {}. Вставай и продолжай.",
            fmt_points(points),
            self.score_line(score)
        )
    }

    pub fn failure_notice(&self, failure: &str, points: f64) -> String {
        format!("Провал: {failure} ({}).", fmt_points(points))
    }

    pub fn remediation_recorded(&self, option: &str, points: f64, score: f64) -> String {
        format!(
            "Засчитано! Добавлено {} баллов за '{option}'. Сегодня: {}. Возвращайся в строй.",
            fmt_points(points),
            self.score_line(score)
        )
    }

    pub fn undo_done(&self, name: &str, score: f64) -> String {
        format!(
            "Действие '{name}' отменено. Текущий счёт сегодня: {}.",
            self.score_line(score)
        )
    }

    pub fn undo_notice(&self, name: &str) -> String {
        format!("Отменено: {name}.")
    }

    /// Percent of the target reached, clamped to `0..=100`.
    pub fn progress_percent(&self, score: f64) -> f64 {
        (score / self.target * 100.0).clamp(0.0, 100.0)
    }

    pub fn progress_bar(&self, score: f64) -> String {
        let percent = self.progress_percent(score);
        let filled = ((self.bar_length as f64) * percent / 100.0).floor() as usize;
        let filled = filled.min(self.bar_length);
        let cell = if score >= self.target {
            "🔥"
        } else if score >= self.target / 2.0 {
            "💪"
        } else {
            "⚪️"
        };
        let mut bar = cell.repeat(filled);
        bar.push_str(&"⚪️".repeat(self.bar_length - filled));
        bar
    }

    pub fn progress_header(&self, score: f64) -> String {
        format!(
            "**Твой прогресс сегодня:**\n**{}** **{}** / **{}** баллов\n\n",
            self.progress_bar(score),
            fmt_points(score),
            fmt_points(self.target)
        )
    }

    pub fn analysis_header(&self) -> &'static str {
        "**Твой анализ дня:**\n\n"
    }

    pub fn stats(&self, stats: &TotalStats) -> String {
        let best_date = stats
            .best_day_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "N/A".to_string());
        format!(
            "**🏆 Твоя статистика, {}:**\n\n\
             Общий счёт: **{}** баллов\n\
             Лучший день: **{}** баллов ({best_date})\n\n\
             Это не просто цифры. Это доказательство твоей силы. Дерзай.",
            self.name,
            fmt_points(stats.total_score),
            fmt_points(stats.best_day_score)
        )
    }

    /// Playful tiered score line for `/silly_score`.
    pub fn silly_score(&self, score: f64) -> String {
        let ratio = score / self.target;
        let s = fmt_points(score);
        if ratio < 0.3 {
            format!("🐢 Сегодня ты как черепаха, но даже черепаха добирается до финиша! Твой счёт: {s}.")
        } else if ratio < 0.7 {
            format!("🚀 Ракета запущена! Ты на полпути к цели! Твой счёт: {s}.")
        } else if ratio < 1.0 {
            format!("🦁 Лев в деле! Остался последний рывок до победы! Твой счёт: {s}.")
        } else {
            format!("👑 Король дисциплины! Ты достиг цели! Твой счёт: {s}.")
        }
    }

    pub fn plan_empty(&self) -> &'static str {
        "Твой план на сегодня пуст. Отправь мне 'План: <пункт 1>, <пункт 2>'."
    }

    pub fn plan_header(&self) -> &'static str {
        "Твой план на сегодня:"
    }

    pub fn plan_item_completed(&self, score: f64) -> String {
        format!("Отмечен пункт плана! Сегодня: {}.", self.score_line(score))
    }

    pub fn plan_item_already_done(&self) -> &'static str {
        "Этот пункт плана уже выполнен. Молодцом!"
    }

    pub fn challenge_saved(&self, name: &str) -> String {
        format!(
            "Отлично, {}. Твой челлендж '{name}' зафиксирован! \n\n",
            self.name
        )
    }

    pub fn plan_saved(&self) -> &'static str {
        "Твой план на сегодня зафиксирован! \n\n"
    }

    /// Default description of a challenge defined with goal `goal`.
    pub fn challenge_description(&self, goal: f64) -> String {
        format!("Цель - {}", fmt_points(goal))
    }

    pub fn grammar_error(&self, kind: GrammarKind, err: &GrammarError) -> String {
        let detail = match err {
            GrammarError::MissingName => "не указано название".to_string(),
            GrammarError::MissingGoal { label } => format!("не найдено поле '{label}:'"),
            GrammarError::InvalidGoal(raw) => format!("цель '{raw}' не является числом"),
            GrammarError::InvalidDate(raw) => {
                format!("дата '{raw}' должна быть в формате ГГГГ-ММ-ДД")
            }
            GrammarError::UnexpectedSegment(raw) => format!("непонятный фрагмент '{raw}'"),
            GrammarError::EmptyPlan => "в плане нет ни одного пункта".to_string(),
            GrammarError::EmptyItem { position } => format!("пункт {position} пустой"),
        };
        let format = match kind {
            GrammarKind::Challenge => {
                "'Челлендж: <название>, Цель: <количество>[, До: ГГГГ-ММ-ДД]'"
            }
            GrammarKind::Plan => "'План: <пункт 1>, <пункт 2>, ...'",
        };
        format!(
            "{}, кажется, формат неправильный: {detail}. Попробуй ещё раз: {format}.",
            self.name
        )
    }

    pub fn image_usage(&self) -> String {
        format!(
            "{}, напиши, какую картинку ты хочешь создать. Например: /картинка воин, идущий к своей цели",
            self.name
        )
    }

    pub fn image_working(&self) -> &'static str {
        "Мой разум-творец уже работает над твоим образом. Подожди немного..."
    }

    pub fn image_caption(&self, prompt: &str) -> String {
        format!("**🔥 Твой образ создан!**\n\n_{prompt}_")
    }

    pub fn image_failed(&self) -> String {
        format!(
            "Извини, {}, не могу создать этот образ сейчас. Попробуй другой промпт.",
            self.name
        )
    }

    pub fn morning_brief_header(&self, score: f64) -> String {
        format!(
            "**☀️ Начало нового дня, {}!**\n\nТвой счет на сегодня: {}.\n\n**Твой персонализированный план:**\n\n",
            self.name,
            self.score_line(score)
        )
    }

    fn challenge_lines(challenges: &[Challenge]) -> String {
        challenges
            .iter()
            .map(|c| format!("**- {}**\n_{}_", c.name, c.description))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn challenges_reminder(&self, challenges: &[Challenge]) -> String {
        format!(
            "**⚔️ Не забывай о своих челленджах, {}:**\n\n{}",
            self.name,
            Self::challenge_lines(challenges)
        )
    }

    /// Answer to `/challenges`.
    pub fn challenges_list(&self, challenges: &[Challenge], as_of: NaiveDate) -> String {
        if challenges.is_empty() {
            return format!(
                "Активных челленджей на {as_of} нет. Создай новый: 'Челлендж: <название>, Цель: <количество>'."
            );
        }
        let lines = challenges
            .iter()
            .map(|c| {
                format!(
                    "**- {}**\n_{}_ (до {})",
                    c.name, c.description, c.end_date
                )
            })
            .collect::<Vec<_>>()
            .join("\n");
        format!("**⚔️ Твои активные челленджи:**\n\n{lines}")
    }

    pub fn evening_brief_header(&self) -> String {
        format!("**🌙 Анализ дня, {}:**\n\n", self.name)
    }

    pub fn retry(&self) -> String {
        format!("Что-то пошло не так. Попробуй снова, {}.", self.name)
    }

    pub fn retry_notice(&self) -> &'static str {
        "Ошибка. Попробуй ещё раз."
    }

    /// Substituted when the AI text collaborator fails or times out.
    pub fn ai_fallback(&self) -> String {
        format!("Извини, {}, мой разум сейчас занят. Попробуй позже.", self.name)
    }
}
