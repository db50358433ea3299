//! Integration tests for the interaction router.
//!
//! Every test runs against an in-memory store and a fixed clock, so the
//! day boundary is under the test's control.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use dailyforge_core::menu::{MediaRequest, ReplyText};
use dailyforge_core::{
    CallbackToken, Catalog, Clock, Config, Event, FixedClock, Placement, Resolution, Router,
    Store, Trigger,
};

const OWNER: &str = "42";

fn noon(y: i32, m: u32, d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

struct Harness {
    router: Router,
    clock: Arc<FixedClock>,
}

fn harness() -> Harness {
    let config = Config::default();
    let store = Arc::new(Store::open_memory().unwrap());
    let catalog = Arc::new(Catalog::default());
    let clock = Arc::new(FixedClock::new(noon(2025, 3, 10)));
    let router = Router::new(store, catalog, &config, OWNER, clock.clone()).unwrap();
    Harness { router, clock }
}

impl Harness {
    fn callback(&self, token: &str) -> Resolution {
        self.router
            .resolve(&Event::Callback(token.to_string()))
            .unwrap()
    }

    fn text(&self, text: &str) -> Resolution {
        self.router.resolve(&Event::Text(text.to_string())).unwrap()
    }

    fn score(&self) -> f64 {
        self.router.ledger().get_score(self.today()).unwrap()
    }

    fn today(&self) -> NaiveDate {
        self.clock.today()
    }
}

fn static_text(resolution: &Resolution, index: usize) -> &str {
    match &resolution.replies[index].text {
        ReplyText::Static(text) => text,
        ReplyText::Ai(_) => panic!("reply {index} is AI text"),
    }
}

fn tokens(resolution: &Resolution, index: usize) -> Vec<String> {
    resolution.replies[index]
        .menu
        .as_ref()
        .map(|m| m.tokens().map(ToString::to_string).collect())
        .unwrap_or_default()
}

#[test]
fn test_add_action_updates_score_and_offers_undo() {
    let h = harness();
    let res = h.callback("add_deep_work");

    assert_eq!(h.score(), 20.0);
    assert_eq!(res.replies[0].placement, Placement::InPlace);
    assert!(static_text(&res, 0).contains("deep_work"));
    assert!(tokens(&res, 0).contains(&"undo_action_deep_work".to_string()));
    assert!(res.notice.is_some());
}

#[test]
fn test_undo_reverses_action() {
    let h = harness();
    h.callback("add_ранний подъем");
    h.callback("add_пробежка");
    let res = h.callback("undo_action_пробежка");

    assert_eq!(h.score(), 15.0);
    assert!(tokens(&res, 0).contains(&"show_add_menu".to_string()));

    let today = h.today();
    let journal = h.router.ledger().journal(today).unwrap();
    assert_eq!(journal.len(), 3);
    let sum: f64 = journal.iter().map(|e| e.points).sum();
    assert_eq!(sum, 15.0);
}

#[test]
fn test_undo_entries_use_router_clock() {
    let h = harness();
    let morning = NaiveDate::from_ymd_opt(2025, 3, 10)
        .unwrap()
        .and_hms_opt(7, 15, 0)
        .unwrap();
    h.clock.set(morning);
    h.callback("add_чтение");
    h.clock.advance(TimeDelta::minutes(5));
    h.callback("undo_action_чтение");
    h.callback("undo_чтение");

    let journal = h.router.ledger().journal(h.today()).unwrap();
    let stamps: Vec<NaiveDateTime> = journal.iter().map(|e| e.timestamp).collect();
    let later = morning + TimeDelta::minutes(5);
    assert_eq!(stamps, vec![morning, later, later]);
}

#[test]
fn test_legacy_undo_token_resolves_failure() {
    let h = harness();
    h.callback("fail_скролл");
    assert_eq!(h.score(), -10.0);
    h.callback("undo_скролл");
    assert_eq!(h.score(), 0.0);
}

#[test]
fn test_unknown_names_do_not_mutate() {
    let h = harness();
    for token in ["add_левитация", "fail_nothing", "anti_pmo_полёт", "undo_action_нет", "bogus"] {
        let res = h.callback(token);
        assert_eq!(res.replies.len(), 1, "token {token}");
        assert!(!tokens(&res, 0).is_empty());
    }
    assert_eq!(h.score(), 0.0);
    let today = h.today();
    assert!(h.router.ledger().journal(today).unwrap().is_empty());
}

#[test]
fn test_relapse_then_remediation() {
    let h = harness();
    let res = h.callback("fail_pmo");
    assert_eq!(h.score(), -30.0);
    assert_eq!(res.replies.len(), 2);
    assert!(tokens(&res, 0)
        .iter()
        .any(|t| t.starts_with("anti_pmo_")));
    assert!(matches!(res.replies[1].text, ReplyText::Ai(_)));
    assert_eq!(res.replies[1].placement, Placement::Append);

    h.callback("anti_pmo_холодный душ");
    assert_eq!(h.score(), -25.0);

    let actions = h.router.ledger().daily_actions(h.today()).unwrap();
    assert_eq!(actions.last().unwrap().0, "Анти-ломка: холодный душ");
}

#[test]
fn test_voice_attached_at_half_target() {
    let h = harness();
    h.callback("add_deep_work");
    h.callback("add_работа над проектом");
    let res = h.callback("add_шок-терапия");
    assert_eq!(h.score(), 50.0);
    assert_eq!(res.replies.len(), 2);
    assert!(matches!(
        res.replies[1].media,
        Some(MediaRequest::Voice { .. })
    ));
}

#[test]
fn test_scores_are_per_day() {
    let h = harness();
    h.callback("add_чтение");
    h.clock.advance(TimeDelta::days(1));
    assert_eq!(h.score(), 0.0);
    h.callback("add_чтение");
    assert_eq!(h.score(), 10.0);

    let stats = h.router.ledger().total_stats().unwrap();
    assert_eq!(stats.total_score, 20.0);
    assert_eq!(stats.best_day_date, NaiveDate::from_ymd_opt(2025, 3, 10));
}

#[test]
fn test_plan_definition_and_completion() {
    let h = harness();
    let res = h.text("План: пробежка, чтение, звонок маме");
    assert!(matches!(res.replies[0].text, ReplyText::Ai(_)));

    let items = h.router.plan().items_for(h.today()).unwrap();
    assert_eq!(items.len(), 3);

    let shown = h.callback("show_plan");
    let first = CallbackToken::CompletePlan(items[0].id).to_string();
    assert!(tokens(&shown, 0).contains(&first));

    h.callback(&first);
    assert_eq!(h.score(), 25.0);

    let again = h.callback(&first);
    assert_eq!(h.score(), 25.0);
    assert!(again.notice.is_some());
}

#[test]
fn test_empty_plan_shows_main_menu() {
    let h = harness();
    let res = h.callback("show_plan");
    assert!(tokens(&res, 0).contains(&"show_add_menu".to_string()));
}

#[test]
fn test_challenge_definition_saved() {
    let h = harness();
    h.text("Челлендж: Без сахара, Цель: 30, До: 2025-04-01");
    let saved = h.router.challenges().get("Без сахара").unwrap().unwrap();
    assert_eq!(saved.goal_value, 30.0);
    assert_eq!(saved.start_date, h.today());
    assert_eq!(saved.end_date, NaiveDate::from_ymd_opt(2025, 4, 1).unwrap());

    h.text("Челлендж: Без сахара, Цель: 10");
    let replaced = h.router.challenges().get("Без сахара").unwrap().unwrap();
    assert_eq!(replaced.goal_value, 10.0);
    assert_eq!(replaced.end_date, NaiveDate::from_ymd_opt(2050, 1, 1).unwrap());
}

#[test]
fn test_malformed_challenge_reports_format() {
    let h = harness();
    let res = h.text("Челлендж: Без цели");
    assert_eq!(res.replies.len(), 1);
    assert!(res.replies[0].menu.is_none());
    assert!(h.router.challenges().get("Без цели").unwrap().is_none());
}

#[test]
fn test_commands() {
    let h = harness();
    let start = h.text("/start");
    assert_eq!(start.replies[0].placement, Placement::Append);
    assert!(!tokens(&start, 0).is_empty());

    let stats = h.text("/stats@dailyforge_bot");
    assert!(static_text(&stats, 0).contains("N/A"));

    let usage = h.text("/картинка");
    assert_eq!(usage.replies.len(), 1);
    assert!(usage.replies[0].media.is_none());

    let image = h.text("/картинка закат над морем");
    assert_eq!(image.replies.len(), 2);
    assert!(matches!(
        &image.replies[1].media,
        Some(MediaRequest::Image { prompt, .. }) if prompt == "закат над морем"
    ));
}

#[test]
fn test_free_text_goes_to_ai() {
    let h = harness();
    let res = h.text("как дела?");
    match &res.replies[0].text {
        ReplyText::Ai(ai) => assert_eq!(ai.prompt, "как дела?"),
        ReplyText::Static(_) => panic!("expected AI reply"),
    }
    assert!(res.replies[0].menu.is_none());
}

#[test]
fn test_challenge_reminder_skipped_without_challenges() {
    let h = harness();
    let res = h
        .router
        .resolve(&Event::Trigger(Trigger::ChallengeReminder))
        .unwrap();
    assert!(res.replies.is_empty());

    h.text("Челлендж: Бег, Цель: 100");
    let res = h
        .router
        .resolve(&Event::Trigger(Trigger::ChallengeReminder))
        .unwrap();
    assert_eq!(res.replies.len(), 1);
    assert!(static_text(&res, 0).contains("Бег"));
}

#[test]
fn test_morning_and_evening_triggers_are_ai_replies() {
    let h = harness();
    for trigger in [Trigger::MorningPlan, Trigger::EveningAnalysis] {
        let res = h.router.resolve(&Event::Trigger(trigger)).unwrap();
        assert_eq!(res.replies.len(), 1);
        assert!(matches!(res.replies[0].text, ReplyText::Ai(_)));
        assert_eq!(res.replies[0].placement, Placement::Append);
    }
}

#[test]
fn test_analyze_day_requests_image() {
    let h = harness();
    let res = h.callback("analyze_day");
    assert_eq!(res.replies[0].placement, Placement::Append);
    assert!(matches!(
        &res.replies[0].media,
        Some(MediaRequest::Image { filename, .. }) if filename == "god_mode.png"
    ));
}

#[test]
fn test_recovery_matches_event_kind() {
    let h = harness();
    let cb = h.router.recovery(&Event::Callback("add_x".into()));
    assert_eq!(cb.replies[0].placement, Placement::InPlace);
    assert!(cb.notice.is_some());
    let txt = h.router.recovery(&Event::Text("x".into()));
    assert_eq!(txt.replies[0].placement, Placement::Append);
}
