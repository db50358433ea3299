//! Interaction router: one inbound event in, one [`Resolution`] out.
//!
//! The router keeps no session state. Every event re-reads what it needs from
//! the stores, performs its mutation, and reads the day's score back after the
//! mutation. AI work is only *described* here; the renderer executes it.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::catalog::{Catalog, EntryKind, TimeOfDay};
use crate::clock::Clock;
use crate::error::Result;
use crate::grammar::{parse_definition, Definition};
use crate::menu::{self, AiText, MediaRequest, Placement, Reply, Resolution};
use crate::messages::{fmt_points, GrammarKind, Messages};
use crate::prompts::{is_breakdown, Prompts, ANALYSIS_IMAGE_PROMPT};
use crate::scheduler::Trigger;
use crate::storage::{Category, Challenge, ChallengeStore, Config, PlanStore, ScoreLedger, Store};
use crate::token::CallbackToken;

/// A normalized inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Plain text message or slash command.
    Text(String),
    /// Raw callback token from a menu button.
    Callback(String),
    /// Scheduled daily trigger.
    Trigger(Trigger),
}

impl Event {
    /// Placement for replies to this event when no menu message is replaced.
    fn reply_placement(&self) -> Placement {
        match self {
            Event::Callback(_) => Placement::InPlace,
            Event::Text(_) | Event::Trigger(_) => Placement::Append,
        }
    }
}

pub struct Router {
    catalog: Arc<Catalog>,
    ledger: ScoreLedger,
    challenges: ChallengeStore,
    plan: PlanStore,
    messages: Messages,
    prompts: Prompts,
    clock: Arc<dyn Clock>,
    challenge_default_end: NaiveDate,
}

fn ai(prompt: String) -> AiText {
    AiText {
        persona: None,
        prompt,
        prefix: String::new(),
        suffix: String::new(),
    }
}

fn framed(prefix: impl Into<String>, prompt: String) -> AiText {
    AiText {
        prefix: prefix.into(),
        ..ai(prompt)
    }
}

impl Router {
    /// `owner` identifies the single user plan items belong to.
    pub fn new(
        store: Arc<Store>,
        catalog: Arc<Catalog>,
        config: &Config,
        owner: &str,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let challenge_default_end = config.plan.challenge_end()?;
        Ok(Self {
            ledger: ScoreLedger::new(store.clone(), catalog.clone()),
            challenges: ChallengeStore::new(store.clone()),
            plan: PlanStore::new(store, owner),
            catalog,
            messages: Messages::new(config.ai.user_name.clone(), &config.goal),
            prompts: Prompts::new(config.ai.user_name.clone(), config.ai.persona.as_deref()),
            clock,
            challenge_default_end,
        })
    }

    pub fn messages(&self) -> &Messages {
        &self.messages
    }

    pub fn prompts(&self) -> &Prompts {
        &self.prompts
    }

    pub fn ledger(&self) -> &ScoreLedger {
        &self.ledger
    }

    pub fn challenges(&self) -> &ChallengeStore {
        &self.challenges
    }

    pub fn plan(&self) -> &PlanStore {
        &self.plan
    }

    fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    fn main_menu(&self, score: f64) -> menu::Menu {
        menu::main_menu(score, self.messages.target())
    }

    fn record(&self, action: &str, points: f64, category: Category) -> Result<f64> {
        Ok(self
            .ledger
            .record_event_at(self.clock.now(), action, points, category)?)
    }

    fn greeting(&self, placement: Placement) -> Result<Resolution> {
        let score = self.ledger.get_score(self.today())?;
        Ok(Resolution::reply(
            Reply::new(placement, self.messages.greeting(score)).with_menu(self.main_menu(score)),
        ))
    }

    /// Resolve one event. Store failures propagate; the caller answers them
    /// with [`Router::recovery`].
    pub fn resolve(&self, event: &Event) -> Result<Resolution> {
        match event {
            Event::Text(text) => self.on_text(text),
            Event::Callback(raw) => self.on_callback(&CallbackToken::parse(raw)),
            Event::Trigger(trigger) => self.on_trigger(*trigger),
        }
    }

    /// Generic retry message plus the main menu, built from whatever state
    /// is still readable.
    pub fn recovery(&self, event: &Event) -> Resolution {
        let score = self.ledger.get_score(self.today()).unwrap_or_else(|e| {
            warn!(error = %e, "score unavailable while recovering");
            0.0
        });
        Resolution::reply(
            Reply::new(event.reply_placement(), self.messages.retry())
                .with_menu(self.main_menu(score)),
        )
        .with_notice(self.messages.retry_notice())
    }

    // ── callbacks ────────────────────────────────────────────────────────

    fn on_callback(&self, token: &CallbackToken) -> Result<Resolution> {
        debug!(%token, "callback");
        let here = Placement::InPlace;
        match token {
            CallbackToken::MainMenu => self.greeting(here),
            CallbackToken::ShowAddMenu => Ok(Resolution::reply(
                Reply::new(here, self.messages.choose_time_of_day()).with_menu(menu::add_menu()),
            )),
            CallbackToken::ShowMenu(section) => {
                let header = match section {
                    TimeOfDay::Morning => self.messages.morning_menu_header(),
                    TimeOfDay::Day => self.messages.day_menu_header(),
                    TimeOfDay::Evening => self.messages.evening_menu_header(),
                };
                Ok(Resolution::reply(
                    Reply::new(here, header)
                        .with_menu(menu::time_of_day_menu(&self.catalog, *section)),
                ))
            }
            CallbackToken::ShowFailMenu => Ok(Resolution::reply(
                Reply::new(here, self.messages.failure_header())
                    .with_menu(menu::failures_menu(&self.catalog)),
            )),
            CallbackToken::Add(name) => self.add_action(name),
            CallbackToken::Fail(name) => self.add_failure(name),
            CallbackToken::Anti { relapse, option } => self.remediate(relapse, option),
            CallbackToken::Undo { kind, name } => self.undo(*kind, name),
            CallbackToken::ShowPlan => self.show_plan(),
            CallbackToken::CompletePlan(id) => self.complete_plan_item(*id),
            CallbackToken::Noop => Ok(Resolution::notice_only(
                self.messages.plan_item_already_done(),
            )),
            CallbackToken::Progress => self.progress(),
            CallbackToken::AnalyzeDay => self.analyze_day(),
            CallbackToken::ShowStats => self.stats(here),
            CallbackToken::CreateChallenge => Ok(Resolution::reply(Reply::ai(
                here,
                ai(self.prompts.create_challenge()),
            ))),
            CallbackToken::CreatePlan => Ok(Resolution::reply(Reply::ai(
                here,
                ai(self.prompts.create_plan()),
            ))),
            CallbackToken::Unknown(raw) => {
                warn!(token = %raw, "unknown callback token");
                self.greeting(here)
            }
        }
    }

    fn add_action(&self, name: &str) -> Result<Resolution> {
        let Some(&points) = self.catalog.actions.get(name) else {
            warn!(action = %name, "unknown action");
            return self.greeting(Placement::InPlace);
        };
        let score = self.record(name, points, Category::Action)?;

        let undo = CallbackToken::Undo {
            kind: Some(EntryKind::Action),
            name: name.to_string(),
        };
        let mut resolution = Resolution::reply(
            Reply::new(
                Placement::InPlace,
                self.messages.action_recorded(name, points, score),
            )
            .with_menu(menu::confirmation_menu(undo)),
        )
        .with_notice(self.messages.action_notice(name, points));

        if let Some(voice) = self.messages.milestone(score).and_then(|m| m.voice) {
            resolution = resolution.then(Reply::media(MediaRequest::Voice {
                text: voice,
                filename: "motivational_message.wav".into(),
            }));
        }
        Ok(resolution)
    }

    fn add_failure(&self, name: &str) -> Result<Resolution> {
        let Some(&points) = self.catalog.failures.get(name) else {
            warn!(failure = %name, "unknown failure");
            return self.greeting(Placement::InPlace);
        };
        let score = self.record(name, points, Category::Failure)?;
        let notice = self.messages.failure_notice(name, points);

        if self.catalog.is_relapse(name) {
            info!(failure = %name, "relapse recorded, offering remediation");
            return Ok(Resolution::reply(
                Reply::new(
                    Placement::InPlace,
                    self.messages.relapse_recorded(name, points),
                )
                .with_menu(menu::remediation_menu(&self.catalog)),
            )
            .then(Reply::ai(Placement::Append, ai(self.prompts.relapse(name))))
            .with_notice(notice));
        }

        let undo = CallbackToken::Undo {
            kind: Some(EntryKind::Failure),
            name: name.to_string(),
        };
        Ok(Resolution::reply(
            Reply::new(
                Placement::InPlace,
                self.messages.failure_recorded(name, points, score),
            )
            .with_menu(menu::confirmation_menu(undo)),
        )
        .with_notice(notice))
    }

    fn remediate(&self, relapse: &str, option: &str) -> Result<Resolution> {
        let known = self.catalog.remediations.iter().any(|r| r.key == option);
        if !self.catalog.is_relapse(relapse) || !known {
            warn!(%relapse, %option, "unknown remediation");
            return self.greeting(Placement::InPlace);
        }
        let points = self.catalog.bonus_for(option);
        let log_name = format!("{}{option}", self.catalog.remediation_prefix);
        let score = self.record(&log_name, points, Category::Action)?;

        Ok(Resolution::reply(
            Reply::new(
                Placement::InPlace,
                self.messages.remediation_recorded(option, points, score),
            )
            .with_menu(self.main_menu(score)),
        )
        .with_notice(self.messages.action_notice(option, points)))
    }

    fn undo(&self, kind: Option<EntryKind>, name: &str) -> Result<Resolution> {
        let points = match kind {
            Some(kind) => self.catalog.points_for(name, kind),
            None => self.catalog.resolve_undo(name).1,
        };
        if points == 0.0 {
            warn!(%name, ?kind, "nothing to undo");
            return self.greeting(Placement::InPlace);
        }

        let now = self.clock.now();
        let score = match kind {
            Some(kind) => self.ledger.undo_as_at(now, name, kind)?,
            None => self.ledger.undo_at(now, name)?,
        };
        Ok(Resolution::reply(
            Reply::new(Placement::InPlace, self.messages.undo_done(name, score))
                .with_menu(self.main_menu(score)),
        )
        .with_notice(self.messages.undo_notice(name)))
    }

    fn show_plan(&self) -> Result<Resolution> {
        let today = self.today();
        let items = self.plan.items_for(today)?;
        if items.is_empty() {
            let score = self.ledger.get_score(today)?;
            return Ok(Resolution::reply(
                Reply::new(Placement::InPlace, self.messages.plan_empty())
                    .with_menu(self.main_menu(score)),
            ));
        }
        Ok(Resolution::reply(
            Reply::new(Placement::InPlace, self.messages.plan_header())
                .with_menu(menu::plan_menu(&items)),
        ))
    }

    fn complete_plan_item(&self, id: i64) -> Result<Resolution> {
        if !self.plan.complete(id)? {
            debug!(id, "plan item already completed or unknown");
            return Ok(self
                .greeting(Placement::InPlace)?
                .with_notice(self.messages.plan_item_already_done()));
        }
        let bonus = &self.catalog.plan_item;
        let score = self.record(&bonus.log_name, bonus.points, Category::Action)?;
        Ok(Resolution::reply(
            Reply::new(Placement::InPlace, self.messages.plan_item_completed(score))
                .with_menu(self.main_menu(score)),
        )
        .with_notice(self.messages.action_notice(&bonus.log_name, bonus.points)))
    }

    fn progress(&self) -> Result<Resolution> {
        let score = self.ledger.get_score(self.today())?;
        let percent = self.messages.progress_percent(score);
        let percent = fmt_points((percent * 10.0).round() / 10.0);
        Ok(Resolution::reply(
            Reply::ai(
                Placement::InPlace,
                framed(
                    self.messages.progress_header(score),
                    self.prompts.progress(&percent),
                ),
            )
            .with_menu(self.main_menu(score))
            .markdown(),
        ))
    }

    fn analyze_day(&self) -> Result<Resolution> {
        let today = self.today();
        let score = self.ledger.get_score(today)?;
        let actions = self.ledger.daily_actions(today)?;
        let prompt = self
            .prompts
            .analysis(&self.messages.score_line(score), &actions, false);

        Ok(Resolution::reply(
            Reply::ai(
                Placement::Append,
                framed(self.messages.analysis_header(), prompt),
            )
            .with_media(MediaRequest::Image {
                prompt: ANALYSIS_IMAGE_PROMPT.into(),
                filename: "god_mode.png".into(),
                fallback_text: None,
            })
            .with_menu(self.main_menu(score))
            .markdown(),
        ))
    }

    fn stats(&self, placement: Placement) -> Result<Resolution> {
        let stats = self.ledger.total_stats()?;
        let score = self.ledger.get_score(self.today())?;
        Ok(Resolution::reply(
            Reply::new(placement, self.messages.stats(&stats))
                .with_menu(self.main_menu(score))
                .markdown(),
        ))
    }

    // ── free text ────────────────────────────────────────────────────────

    fn on_text(&self, text: &str) -> Result<Resolution> {
        let text = text.trim();
        let (head, rest) = text
            .split_once(char::is_whitespace)
            .unwrap_or((text, ""));
        let command = head.to_lowercase();
        let command = command.split('@').next().unwrap_or_default();
        let here = Placement::Append;

        match command {
            "/start" => return self.greeting(here),
            "/stats" => return self.stats(here),
            "/silly_score" => {
                let score = self.ledger.get_score(self.today())?;
                return Ok(Resolution::reply(
                    Reply::new(here, self.messages.silly_score(score))
                        .with_menu(self.main_menu(score)),
                ));
            }
            "/challenges" => return self.list_challenges(),
            "/картинка" => return Ok(self.image_request(rest.trim())),
            _ => {}
        }

        match parse_definition(text) {
            Some(Ok(Definition::Challenge(def))) => {
                let today = self.today();
                let challenge = Challenge {
                    start_date: today,
                    end_date: def.end.unwrap_or(self.challenge_default_end),
                    goal_value: def.goal,
                    description: self.messages.challenge_description(def.goal),
                    name: def.name,
                };
                self.challenges.save(&challenge)?;
                let score = self.ledger.get_score(today)?;
                return Ok(Resolution::reply(
                    Reply::ai(
                        here,
                        framed(
                            self.messages.challenge_saved(&challenge.name),
                            self.prompts
                                .challenge_created(&challenge.name, &fmt_points(challenge.goal_value)),
                        ),
                    )
                    .with_menu(self.main_menu(score)),
                ));
            }
            Some(Ok(Definition::Plan(items))) => {
                let today = self.today();
                self.plan.add_items(today, &items)?;
                let score = self.ledger.get_score(today)?;
                return Ok(Resolution::reply(
                    Reply::ai(
                        here,
                        framed(self.messages.plan_saved(), self.prompts.plan_created()),
                    )
                    .with_menu(self.main_menu(score)),
                ));
            }
            Some(Err(err)) => {
                let kind = if text.to_lowercase().starts_with(crate::grammar::PLAN_LABEL) {
                    GrammarKind::Plan
                } else {
                    GrammarKind::Challenge
                };
                info!(error = %err, "malformed definition");
                return Ok(Resolution::reply(Reply::new(
                    here,
                    self.messages.grammar_error(kind, &err),
                )));
            }
            None => {}
        }

        let prompt = if is_breakdown(text) {
            self.prompts.breakdown(text)
        } else {
            text.to_string()
        };
        Ok(Resolution::reply(Reply::ai(here, ai(prompt))))
    }

    fn list_challenges(&self) -> Result<Resolution> {
        let today = self.today();
        let active = self.challenges.active(today)?;
        let score = self.ledger.get_score(today)?;
        Ok(Resolution::reply(
            Reply::new(
                Placement::Append,
                self.messages.challenges_list(&active, today),
            )
            .with_menu(self.main_menu(score))
            .markdown(),
        ))
    }

    fn image_request(&self, prompt: &str) -> Resolution {
        if prompt.is_empty() {
            return Resolution::reply(Reply::new(Placement::Append, self.messages.image_usage()));
        }
        Resolution::reply(Reply::new(Placement::Append, self.messages.image_working())).then(
            Reply::new(Placement::Append, self.messages.image_caption(prompt))
                .with_media(MediaRequest::Image {
                    prompt: prompt.to_string(),
                    filename: "generated_image.png".into(),
                    fallback_text: Some(self.messages.image_failed()),
                })
                .markdown(),
        )
    }

    // ── scheduled triggers ───────────────────────────────────────────────

    fn on_trigger(&self, trigger: Trigger) -> Result<Resolution> {
        let today = self.today();
        let score = self.ledger.get_score(today)?;
        let here = Placement::Append;

        let reply = match trigger {
            Trigger::MorningPlan => {
                let yesterday = today.pred_opt().unwrap_or(today);
                let actions = self.ledger.daily_actions(yesterday)?;
                let yesterday_score = self.ledger.get_score(yesterday)?;
                Reply::ai(
                    here,
                    framed(
                        self.messages.morning_brief_header(score),
                        self.prompts.morning_plan(
                            &today.to_string(),
                            &fmt_points(yesterday_score),
                            &actions,
                        ),
                    ),
                )
            }
            Trigger::ChallengeReminder => {
                let active = self.challenges.active(today)?;
                if active.is_empty() {
                    debug!("no active challenges, reminder skipped");
                    return Ok(Resolution::default());
                }
                Reply::new(here, self.messages.challenges_reminder(&active))
            }
            Trigger::EveningAnalysis => {
                let actions = self.ledger.daily_actions(today)?;
                Reply::ai(
                    here,
                    framed(
                        self.messages.evening_brief_header(),
                        self.prompts
                            .analysis(&self.messages.score_line(score), &actions, true),
                    ),
                )
            }
        };

        info!(?trigger, "scheduled trigger resolved");
        Ok(Resolution::reply(
            reply.with_menu(self.main_menu(score)).markdown(),
        ))
    }
}
