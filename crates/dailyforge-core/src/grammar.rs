//! Free-text definition grammars.
//!
//! ```text
//! challenge := "Челлендж:" name "," "Цель:" number [ "," "До:" YYYY-MM-DD ]
//! plan      := "План:" item { "," item }
//! ```
//!
//! Labels match case-insensitively. Names and items keep the user's casing.

use chrono::NaiveDate;

use crate::error::GrammarError;
use crate::storage::DATE_FORMAT;

pub const CHALLENGE_LABEL: &str = "челлендж:";
pub const GOAL_LABEL: &str = "цель:";
pub const END_LABEL: &str = "до:";
pub const PLAN_LABEL: &str = "план:";

#[derive(Debug, Clone, PartialEq)]
pub struct ChallengeDefinition {
    pub name: String,
    pub goal: f64,
    /// `None` when the `До:` segment is omitted.
    pub end: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Definition {
    Challenge(ChallengeDefinition),
    Plan(Vec<String>),
}

/// Byte length of `label` at the start of `text` if it matches ignoring case.
fn prefix_len_ci(text: &str, label: &str) -> Option<usize> {
    let mut end = 0;
    let mut chars = text.char_indices();
    for expected in label.chars() {
        let (idx, c) = chars.next()?;
        if !c.to_lowercase().eq(expected.to_lowercase()) {
            return None;
        }
        end = idx + c.len_utf8();
    }
    Some(end)
}

fn strip_prefix_ci<'a>(text: &'a str, label: &str) -> Option<&'a str> {
    prefix_len_ci(text, label).map(|len| &text[len..])
}

/// First occurrence of `label` in `text`, ignoring case: `(start, end)` bytes.
fn find_ci(text: &str, label: &str) -> Option<(usize, usize)> {
    text.char_indices()
        .find_map(|(idx, _)| prefix_len_ci(&text[idx..], label).map(|len| (idx, idx + len)))
}

fn trim_segment(s: &str) -> &str {
    s.trim().trim_end_matches(',').trim()
}

/// Classify `text` as a definition. `None` means it is neither grammar and
/// should be handled as ordinary free text.
pub fn parse_definition(text: &str) -> Option<Result<Definition, GrammarError>> {
    let text = text.trim_start();
    if let Some(body) = strip_prefix_ci(text, CHALLENGE_LABEL) {
        return Some(parse_challenge_body(body).map(Definition::Challenge));
    }
    if let Some(body) = strip_prefix_ci(text, PLAN_LABEL) {
        return Some(parse_plan_body(body).map(Definition::Plan));
    }
    None
}

fn parse_challenge_body(body: &str) -> Result<ChallengeDefinition, GrammarError> {
    let Some((goal_start, goal_end)) = find_ci(body, GOAL_LABEL) else {
        if trim_segment(body).is_empty() {
            return Err(GrammarError::MissingName);
        }
        return Err(GrammarError::MissingGoal {
            label: "Цель".into(),
        });
    };

    let name = trim_segment(&body[..goal_start]);
    if name.is_empty() {
        return Err(GrammarError::MissingName);
    }

    let rest = &body[goal_end..];
    let (goal_part, end_part) = match find_ci(rest, END_LABEL) {
        Some((start, end)) => (&rest[..start], Some(&rest[end..])),
        None => (rest, None),
    };

    let goal_part = trim_segment(goal_part);
    let goal_text = match goal_part.split_once(',') {
        Some((_, extra)) if !extra.trim().is_empty() => {
            return Err(GrammarError::UnexpectedSegment(extra.trim().to_string()));
        }
        Some((goal, _)) => goal.trim(),
        None => goal_part,
    };
    let goal = goal_text
        .parse::<f64>()
        .ok()
        .filter(|g| g.is_finite())
        .ok_or_else(|| GrammarError::InvalidGoal(goal_text.to_string()))?;

    let end = end_part
        .map(|raw| {
            let raw = trim_segment(raw);
            NaiveDate::parse_from_str(raw, DATE_FORMAT)
                .map_err(|_| GrammarError::InvalidDate(raw.to_string()))
        })
        .transpose()?;

    Ok(ChallengeDefinition {
        name: name.to_string(),
        goal,
        end,
    })
}

fn parse_plan_body(body: &str) -> Result<Vec<String>, GrammarError> {
    if body.trim().is_empty() {
        return Err(GrammarError::EmptyPlan);
    }
    body.split(',')
        .enumerate()
        .map(|(idx, item)| {
            let item = item.trim();
            if item.is_empty() {
                Err(GrammarError::EmptyItem { position: idx + 1 })
            } else {
                Ok(item.to_string())
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn challenge(text: &str) -> Result<ChallengeDefinition, GrammarError> {
        match parse_definition(text) {
            Some(Ok(Definition::Challenge(c))) => Ok(c),
            Some(Err(e)) => Err(e),
            other => panic!("not a challenge: {other:?}"),
        }
    }

    #[test]
    fn plain_text_is_not_a_definition() {
        assert!(parse_definition("как дела?").is_none());
        assert!(parse_definition("планета").is_none());
    }

    #[test]
    fn challenge_with_goal_only() {
        let c = challenge("Челлендж: 30 дней без сахара, Цель: 30").unwrap();
        assert_eq!(c.name, "30 дней без сахара");
        assert_eq!(c.goal, 30.0);
        assert_eq!(c.end, None);
    }

    #[test]
    fn challenge_labels_ignore_case() {
        let c = challenge("ЧЕЛЛЕНДЖ: Бег, цель: 12.5, ДО: 2024-12-31").unwrap();
        assert_eq!(c.name, "Бег");
        assert_eq!(c.goal, 12.5);
        assert_eq!(
            c.end,
            Some(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap())
        );
    }

    #[test]
    fn challenge_errors_are_precise() {
        assert_eq!(challenge("Челлендж:"), Err(GrammarError::MissingName));
        assert_eq!(
            challenge("Челлендж: , Цель: 5"),
            Err(GrammarError::MissingName)
        );
        assert_eq!(
            challenge("Челлендж: Бег"),
            Err(GrammarError::MissingGoal {
                label: "Цель".into()
            })
        );
        assert_eq!(
            challenge("Челлендж: Бег, Цель: много"),
            Err(GrammarError::InvalidGoal("много".into()))
        );
        assert_eq!(
            challenge("Челлендж: Бег, Цель: 5, До: завтра"),
            Err(GrammarError::InvalidDate("завтра".into()))
        );
        assert_eq!(
            challenge("Челлендж: Бег, Цель: 5, каждый день"),
            Err(GrammarError::UnexpectedSegment("каждый день".into()))
        );
    }

    #[test]
    fn plan_items_keep_casing() {
        let parsed = parse_definition("План: Написать отчёт, run 5K ,  Deep Work").unwrap();
        assert_eq!(
            parsed,
            Ok(Definition::Plan(vec![
                "Написать отчёт".into(),
                "run 5K".into(),
                "Deep Work".into()
            ]))
        );
    }

    #[test]
    fn plan_errors() {
        assert_eq!(parse_definition("план:   "), Some(Err(GrammarError::EmptyPlan)));
        assert_eq!(
            parse_definition("План: a,, b"),
            Some(Err(GrammarError::EmptyItem { position: 2 }))
        );
    }
}
