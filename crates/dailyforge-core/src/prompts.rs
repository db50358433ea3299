//! Prompt templates for the AI text and image collaborators.

use crate::messages::fmt_points;

/// Fixed prompt for the illustration attached to the day analysis.
pub const ANALYSIS_IMAGE_PROMPT: &str = "abstract and powerful digital art illustrating a person's journey to becoming a god, with glowing lines of code and determination, ultra high resolution";

/// Substrings that mark focus work in action names.
const FOCUS_MARKERS: [&str; 2] = ["deep_work", "кодинг"];

/// Below this many focus points the analysis calls out the missing focus.
pub const FOCUS_THRESHOLD: f64 = 10.0;

/// Free-text keywords that route to the supportive consultation.
const BREAKDOWN_KEYWORDS: [&str; 2] = ["срыв", "ломка"];

/// Points earned today from focus work.
pub fn focus_points(actions: &[(String, f64)]) -> f64 {
    actions
        .iter()
        .filter(|(name, _)| {
            let name = name.to_lowercase();
            FOCUS_MARKERS.iter().any(|m| name.contains(m))
        })
        .map(|(_, points)| points)
        .sum()
}

pub fn is_breakdown(text: &str) -> bool {
    let text = text.to_lowercase();
    BREAKDOWN_KEYWORDS.iter().any(|k| text.contains(k))
}

#[derive(Debug, Clone)]
pub struct Prompts {
    name: String,
    persona: String,
}

impl Prompts {
    /// `persona` overrides the built-in mentor; `{name}` in it is replaced
    /// with the user's name.
    pub fn new(name: impl Into<String>, persona: Option<&str>) -> Self {
        let name = name.into();
        let persona = match persona {
            Some(custom) => custom.replace("{name}", &name),
            None => default_persona(&name),
        };
        Self { name, persona }
    }

    pub fn persona(&self) -> &str {
        &self.persona
    }

    pub fn challenge_created(&self, challenge: &str, goal: &str) -> String {
        format!(
            "{} только что поставил себе новую цель: '{challenge}' с целью {goal}. Дай ему мощный мотивирующий толчок, объясни, как дисциплина в этом челлендже поможет ему стать сильнее. Упомяни про дофаминовые зависимости, которые могут мешать и предложи ему написать о них.",
            self.name
        )
    }

    pub fn plan_created(&self) -> String {
        format!(
            "{}, ты только что составил свой план на сегодня. Отправь ему вдохновляющее сообщение о важности следования плану и напомни, что каждый пункт - это шаг к его великой цели.",
            self.name
        )
    }

    pub fn relapse(&self, relapse: &str) -> String {
        format!(
            "{} только что совершил срыв {}. Дай ему конструктивную, жесткую консультацию, объясни, что это не конец, а просто данные для анализа. Расскажи, как правильно использовать это поражение, чтобы стать сильнее.",
            self.name,
            relapse.to_uppercase()
        )
    }

    pub fn breakdown(&self, message: &str) -> String {
        format!(
            "{} пишет, что чувствует срыв или ломку. Его сообщение: '{message}'. Дай ему максимально конструктивную и жесткую, но поддерживающую консультацию, объясни, как бороться с этим, и напомни о его целях. Не жалей слов, но будь прямолинеен.",
            self.name
        )
    }

    pub fn progress(&self, percent: &str) -> String {
        format!(
            "{}, сегодня его прогресс {percent}%. Дай ему мотивирующий комментарий, упомяни о его дофаминовых зависимостях (соцсети, PMO) и о том, как их преодоление приблизит его к цели.",
            self.name
        )
    }

    /// Day analysis. `evening` selects the third-person framing the scheduled
    /// report uses.
    pub fn analysis(&self, today: &str, actions: &[(String, f64)], evening: bool) -> String {
        let log = actions
            .iter()
            .map(|(name, points)| format!("- {name}: {} баллов", fmt_points(*points)))
            .collect::<Vec<_>>()
            .join("\n");

        let mut prompt = if evening {
            format!(
                "Проанализируй день {}. Его счет сегодня: {today}. Список действий:\n{log}\n\n",
                self.name
            )
        } else {
            format!("Мой сегодняшний счет: {today}. Список моих действий и баллов:\n{log}\n\n")
        };

        if focus_points(actions) < FOCUS_THRESHOLD {
            prompt.push_str("Ты заработал мало баллов за Deep Work и кодинг. Твоё тело — машина, но без мозгов она никуда не едет. Сегодня фокус был на рутинах, а не на бизнесе. Завтра — Deep Work. ");
        }
        prompt.push_str("Дай жесткий, но справедливый анализ. Хвали за успехи, но без лишней сентиментальности. Укажи, на что нужно сделать фокус завтра, если он упустил что-то важное. Напомни о '500k'.");
        prompt
    }

    pub fn create_challenge(&self) -> String {
        format!(
            "{} нажал кнопку 'Создать челлендж'. Дай ему мотивирующее сообщение о постановке целей и попроси написать цель. В конце добавь инструкцию 'Напиши название челленджа и цель в формате: 'Челлендж: <название>, Цель: <количество>'.'",
            self.name
        )
    }

    pub fn create_plan(&self) -> String {
        format!(
            "Пользователь {} хочет создать план на день. Спроси его, что он хочет включить в свой план. Мотивируй его на продуктивность. В конце ответа добавь инструкцию 'Напиши свои планы в формате: 'План: <пункт 1>, <пункт 2>, ...''.",
            self.name
        )
    }

    pub fn morning_plan(&self, today: &str, yesterday_score: &str, yesterday: &[(String, f64)]) -> String {
        let summary = yesterday
            .iter()
            .map(|(name, points)| format!("{name}: {} баллов", fmt_points(*points)))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "{}, сегодня {today}. Вчера ты набрал {yesterday_score} баллов. Вот список твоих вчерашних действий: {summary}. Твои главные цели: Deep Work, бизнес, кодинг. Составь краткий и жесткий, но мотивирующий план на сегодня. Включи в него конкретные действия, направленные на главные цели (Deep Work, кодинг, бизнес). Начни с 'Твой план на сегодня:' и добавь в конце 'Помни о цели 500k. Ты проиграл лето, не проиграешь год.'.",
            self.name
        )
    }
}

fn default_persona(name: &str) -> String {
    format!(
        "Ты — личный гуру, бизнесмен, монах и наставник {name}. Твоя миссия — помочь ему стать лучшей версией себя и достичь величия, используя мудрость, мотивацию, бизнес-стратегии и жесткую дисциплину. Ты всегда обращаешься к нему по имени и говоришь, как будто знаешь его лично. Не давай легких путей, говори прямо, но с уважением. Всегда напоминай ему о его великой цели — 500k и о том, что он 'проиграл лето, не проиграет год'. Используй 'болевые точки' в своей мотивации. Анализируй его прогресс по баллам. Твои главные цели для {name}: Deep Work, бизнес, кодинг, дисциплина. Физические рутины — это лишь фундамент, а не основная цель."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn focus_points_match_markers_case_insensitively() {
        let actions = vec![
            ("deep_work".to_string(), 20.0),
            ("Кодинг вечером".to_string(), 5.0),
            ("чтение".to_string(), 10.0),
        ];
        assert_eq!(focus_points(&actions), 25.0);
    }

    #[test]
    fn analysis_flags_missing_focus() {
        let prompts = Prompts::new("Артем", None);
        let low = prompts.analysis("15/100", &[("чтение".into(), 10.0)], false);
        assert!(low.contains("мало баллов за Deep Work"));
        assert!(low.contains("- чтение: 10 баллов"));

        let high = prompts.analysis("20/100", &[("deep_work".into(), 20.0)], true);
        assert!(!high.contains("мало баллов"));
        assert!(high.starts_with("Проанализируй день Артем"));
    }

    #[test]
    fn custom_persona_gets_name() {
        let prompts = Prompts::new("Оля", Some("Ты тренер {name}."));
        assert_eq!(prompts.persona(), "Ты тренер Оля.");
    }

    #[test]
    fn breakdown_keywords() {
        assert!(is_breakdown("У меня СРЫВ"));
        assert!(is_breakdown("ломка жуткая"));
        assert!(!is_breakdown("всё отлично"));
    }
}
