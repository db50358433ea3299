//! Daily trigger schedule.
//!
//! The schedule is a pure calculation over local wall-clock time; it owns no
//! thread or timer. The caller asks for the next fire, sleeps until then, and
//! asks again. Fires missed while the process was down are not replayed.

use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::storage::ScheduleConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    /// Morning briefing with yesterday's results and a plan for today.
    MorningPlan,
    /// Midday reminder about active challenges.
    ChallengeReminder,
    /// Evening analysis of the day.
    EveningAnalysis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyTrigger {
    pub at: NaiveTime,
    pub trigger: Trigger,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailySchedule {
    triggers: Vec<DailyTrigger>,
}

impl DailySchedule {
    pub fn new(mut triggers: Vec<DailyTrigger>) -> Self {
        triggers.sort_by_key(|t| t.at);
        Self { triggers }
    }

    pub fn from_config(config: &ScheduleConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(vec![
            DailyTrigger {
                at: config.morning_time()?,
                trigger: Trigger::MorningPlan,
            },
            DailyTrigger {
                at: config.midday_time()?,
                trigger: Trigger::ChallengeReminder,
            },
            DailyTrigger {
                at: config.evening_time()?,
                trigger: Trigger::EveningAnalysis,
            },
        ]))
    }

    pub fn triggers(&self) -> &[DailyTrigger] {
        &self.triggers
    }

    /// First fire strictly after `now`, rolling over to tomorrow once
    /// today's slots are spent. `None` only for an empty schedule.
    pub fn next_fire(&self, now: NaiveDateTime) -> Option<(NaiveDateTime, Trigger)> {
        let today = now.date();
        if let Some(t) = self.triggers.iter().find(|t| today.and_time(t.at) > now) {
            return Some((today.and_time(t.at), t.trigger));
        }
        let first = self.triggers.first()?;
        let tomorrow = today.succ_opt()?;
        Some((tomorrow.and_time(first.at), first.trigger))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, day)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn schedule() -> DailySchedule {
        DailySchedule::from_config(&ScheduleConfig::default()).unwrap()
    }

    #[test]
    fn fires_in_daily_order() {
        let s = schedule();
        let (t1, first) = s.next_fire(at(10, 0, 0)).unwrap();
        assert_eq!(first, Trigger::MorningPlan);
        let (t2, second) = s.next_fire(t1).unwrap();
        assert_eq!(second, Trigger::ChallengeReminder);
        let (t3, third) = s.next_fire(t2).unwrap();
        assert_eq!(third, Trigger::EveningAnalysis);
        assert!(t1 < t2 && t2 < t3);
    }

    #[test]
    fn rolls_over_after_last_slot() {
        let s = schedule();
        let (when, trigger) = s.next_fire(at(10, 23, 59)).unwrap();
        assert_eq!(trigger, Trigger::MorningPlan);
        assert_eq!(when.date(), at(11, 0, 0).date());
    }

    #[test]
    fn exact_fire_time_moves_to_next_slot() {
        let s = schedule();
        let morning = s.triggers()[0].at;
        let now = at(10, 0, 0).date().and_time(morning);
        let (_, trigger) = s.next_fire(now).unwrap();
        assert_eq!(trigger, Trigger::ChallengeReminder);
    }

    #[test]
    fn unsorted_triggers_are_ordered() {
        let s = DailySchedule::new(vec![
            DailyTrigger {
                at: NaiveTime::from_hms_opt(20, 0, 0).unwrap(),
                trigger: Trigger::EveningAnalysis,
            },
            DailyTrigger {
                at: NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
                trigger: Trigger::MorningPlan,
            },
        ]);
        let (when, trigger) = s.next_fire(at(10, 5, 0)).unwrap();
        assert_eq!(trigger, Trigger::MorningPlan);
        assert_eq!(when, at(10, 6, 0));
        assert!(DailySchedule::new(Vec::new()).next_fire(at(10, 0, 0)).is_none());
    }
}
