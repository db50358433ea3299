//! Point catalog: action and failure names mapped to point deltas, plus the
//! menu layout that exposes them.
//!
//! The catalog is loaded once (built-in default, optionally overridden by the
//! `[catalog]` section of `config.toml`) and shared behind an `Arc`. Nothing
//! mutates it after startup.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Which catalog table a name is looked up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Action,
    Failure,
}

impl EntryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntryKind::Action => "action",
            EntryKind::Failure => "failure",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "action" => Some(EntryKind::Action),
            "failure" => Some(EntryKind::Failure),
            _ => None,
        }
    }
}

/// Section of the add-points menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeOfDay {
    Morning,
    Day,
    Evening,
}

/// One button of a time-of-day menu.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuRow {
    pub label: String,
    pub action: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeOfDayMenus {
    pub morning: Vec<MenuRow>,
    pub day: Vec<MenuRow>,
    pub evening: Vec<MenuRow>,
}

/// Alternative action offered right after a relapse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Remediation {
    pub key: String,
    pub label: String,
    pub points: f64,
}

/// Bonus recorded when a plan item gets completed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanBonus {
    pub log_name: String,
    pub points: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Catalog {
    /// Failure that opens the remediation menu instead of a plain confirmation.
    pub relapse: String,
    pub remediation_prefix: String,
    pub actions: IndexMap<String, f64>,
    pub failures: IndexMap<String, f64>,
    pub menus: TimeOfDayMenus,
    pub remediations: Vec<Remediation>,
    pub plan_item: PlanBonus,
}

impl Catalog {
    /// Configured delta for `name`, or 0 when the name is unknown.
    pub fn points_for(&self, name: &str, kind: EntryKind) -> f64 {
        let table = match kind {
            EntryKind::Action => &self.actions,
            EntryKind::Failure => &self.failures,
        };
        table.get(name).copied().unwrap_or(0.0)
    }

    /// Resolve a bare name for undo: action table first, then failures.
    ///
    /// A name present in the action table with a zero value falls through to
    /// the failure table.
    pub fn resolve_undo(&self, name: &str) -> (EntryKind, f64) {
        match self.actions.get(name) {
            Some(points) if *points != 0.0 => (EntryKind::Action, *points),
            _ => (EntryKind::Failure, self.points_for(name, EntryKind::Failure)),
        }
    }

    pub fn menu(&self, section: TimeOfDay) -> &[MenuRow] {
        match section {
            TimeOfDay::Morning => &self.menus.morning,
            TimeOfDay::Day => &self.menus.day,
            TimeOfDay::Evening => &self.menus.evening,
        }
    }

    pub fn is_relapse(&self, failure: &str) -> bool {
        failure == self.relapse
    }

    /// Bonus for a remediation option, 0 for unknown keys.
    pub fn bonus_for(&self, key: &str) -> f64 {
        self.remediations
            .iter()
            .find(|r| r.key == key)
            .map(|r| r.points)
            .unwrap_or(0.0)
    }

    /// Every menu row must point at a known action.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let sections = [
            ("morning", &self.menus.morning),
            ("day", &self.menus.day),
            ("evening", &self.menus.evening),
        ];
        for (section, rows) in sections {
            for row in rows {
                if !self.actions.contains_key(&row.action) {
                    return Err(ConfigError::InvalidValue {
                        key: format!("catalog.menus.{section}"),
                        message: format!("unknown action '{}'", row.action),
                    });
                }
            }
        }
        if !self.failures.contains_key(&self.relapse) {
            return Err(ConfigError::InvalidValue {
                key: "catalog.relapse".into(),
                message: format!("'{}' is not a failure", self.relapse),
            });
        }
        Ok(())
    }
}

fn row(label: &str, action: &str) -> MenuRow {
    MenuRow {
        label: label.into(),
        action: action.into(),
    }
}

fn table(entries: &[(&str, f64)]) -> IndexMap<String, f64> {
    entries
        .iter()
        .map(|(name, points)| ((*name).to_string(), *points))
        .collect()
}

impl Default for Catalog {
    fn default() -> Self {
        let actions = table(&[
            ("режим бога", 15.0),
            ("мозговой штурм", 15.0),
            ("бизнес-инкубатор", 20.0),
            ("контент-машина", 15.0),
            ("учебный рывок", 15.0),
            ("рефлексия дня", 15.0),
            ("воздержание", 20.0),
            ("deep_work", 20.0),
            ("шок-терапия", 10.0),
            ("интеллектуальный старт", 10.0),
            ("боевая готовность", 10.0),
            ("физический интеллект", 10.0),
            ("заправка машины", 5.0),
            ("ночной покой", 10.0),
            ("подготовка к бою", 5.0),
            ("ранний подъем", 15.0),
            ("холодный душ", 10.0),
            ("пробежка", 10.0),
            ("медитация", 15.0),
            ("чтение", 10.0),
            ("выполнил план", 25.0),
            ("работа над проектом", 20.0),
            ("изучение английского", 10.0),
            ("силовая тренировка", 15.0),
            ("без телефона перед сном", 10.0),
            ("первая победа", 2.0),
            ("очистка системы", 2.0),
            ("освобождение от дня", 2.0),
            ("50 отжиманий", 3.0),
            ("20 подтягиваний", 4.0),
            ("сделал кровать", 2.0),
            ("вода с лимоном", 3.0),
            ("без телефона утром", 5.0),
            ("план на день", 5.0),
            ("зарядка", 5.0),
            ("растяжка", 5.0),
            ("контрастный душ", 8.0),
            ("сделал дз", 5.0),
            ("100 отжиманий", 5.0),
            ("спортивная ходьба", 5.0),
            ("йога", 5.0),
            ("мытье посуды", 2.0),
            ("уборка в комнате", 3.0),
            ("умывание", 3.0),
        ]);

        let failures = table(&[
            ("pmo", -30.0),
            ("скролл", -10.0),
            ("сладкое", -5.0),
            ("поздний отбой", -10.0),
            ("поздний подъём", -10.0),
            ("пропуск тренировки", -15.0),
        ]);

        let menus = TimeOfDayMenus {
            morning: vec![
                row("Ранний подъем", "ранний подъем"),
                row("Холодный/Контрастный душ", "холодный душ"),
                row("Сделал кровать", "сделал кровать"),
                row("Вода с лимоном/витаминами", "вода с лимоном"),
                row("Пробежка", "пробежка"),
                row("Зарядка", "зарядка"),
                row("Без телефона", "без телефона утром"),
                row("Медитация", "медитация"),
                row("Чтение", "чтение"),
                row("План на день", "план на день"),
                row("Утренний Deep Work", "deep_work"),
            ],
            day: vec![
                row("Выполнил 100% плана", "выполнил план"),
                row("Работа над проектом", "работа над проектом"),
                row("Контент", "контент-машина"),
                row("Изучение английского", "изучение английского"),
                row("Сделал домашнее задание", "сделал дз"),
                row("Силовая тренировка", "силовая тренировка"),
                row("100 отжиманий/приседаний", "100 отжиманий"),
                row("Спортивная ходьба", "спортивная ходьба"),
            ],
            evening: vec![
                row("Растяжка/йога", "йога"),
                row("Чтение книги", "чтение"),
                row("Медитация", "медитация"),
                row("Анализ дня", "рефлексия дня"),
                row("Подготовился к следующему дню", "подготовка к бою"),
                row("Без телефона перед сном", "без телефона перед сном"),
                row("Воздержание", "воздержание"),
                row("Мытье посуды", "мытье посуды"),
                row("Уборка в комнате", "уборка в комнате"),
                row("Умывание", "умывание"),
            ],
        };

        let remediations = vec![
            Remediation {
                key: "холодный душ".into(),
                label: "Холодный душ".into(),
                points: 5.0,
            },
            Remediation {
                key: "20 отжиманий".into(),
                label: "Сделать 20 отжиманий".into(),
                points: 3.0,
            },
            Remediation {
                key: "5 идей".into(),
                label: "Написать 5 идей для контента".into(),
                points: 5.0,
            },
        ];

        Self {
            relapse: "pmo".into(),
            remediation_prefix: "Анти-ломка: ".into(),
            actions,
            failures,
            menus,
            remediations,
            plan_item: PlanBonus {
                log_name: "выполнил пункт плана".into(),
                points: 25.0,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_names_score_zero() {
        let catalog = Catalog::default();
        assert_eq!(catalog.points_for("телепортация", EntryKind::Action), 0.0);
        assert_eq!(catalog.points_for("ранний подъем", EntryKind::Failure), 0.0);
        assert_eq!(catalog.points_for("pmo", EntryKind::Failure), -30.0);
    }

    #[test]
    fn undo_resolution_prefers_actions() {
        let mut catalog = Catalog::default();
        catalog.failures.insert("чтение".into(), -7.0);
        assert_eq!(catalog.resolve_undo("чтение"), (EntryKind::Action, 10.0));
        assert_eq!(catalog.resolve_undo("скролл"), (EntryKind::Failure, -10.0));
        assert_eq!(catalog.resolve_undo("нечто"), (EntryKind::Failure, 0.0));
    }

    #[test]
    fn default_catalog_is_consistent() {
        let catalog = Catalog::default();
        catalog.validate().unwrap();
        assert!(catalog.is_relapse("pmo"));
        assert_eq!(catalog.bonus_for("20 отжиманий"), 3.0);
        assert_eq!(catalog.bonus_for("прыжки"), 0.0);
    }

    #[test]
    fn validate_rejects_dangling_menu_rows() {
        let mut catalog = Catalog::default();
        catalog.menus.day.push(row("Призрак", "несуществующее"));
        let err = catalog.validate().unwrap_err();
        assert!(err.to_string().contains("несуществующее"));
    }

    #[test]
    fn toml_override_keeps_declaration_order() {
        let src = r#"
            relapse = "скролл"
            [actions]
            "b" = 2
            "a" = 1
            [failures]
            "скролл" = -10
        "#;
        let catalog: Catalog = toml::from_str(src).unwrap();
        let names: Vec<_> = catalog.actions.keys().cloned().collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(catalog.relapse, "скролл");
        // Sections not mentioned keep their defaults.
        assert_eq!(catalog.remediations.len(), 3);
    }
}
