//! Gateway loop: one queue of jobs, resolved in order, rendered off-loop.
//!
//! Inbound updates and scheduled triggers both become [`Job`]s on the same
//! bounded channel. Resolution (all store access) happens sequentially in the
//! loop; rendering and delivery run in a spawned task per job so AI latency
//! never holds up the next event.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use dailyforge_core::{Clock, DailySchedule, Event, Renderer, Router, Trigger};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::transport::{Inbound, InboundKind, Transport};

const QUEUE_DEPTH: usize = 64;
const POLL_BACKOFF: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub event: Event,
    /// Menu message an in-place reply replaces.
    pub origin: Option<i64>,
    pub callback_id: Option<String>,
}

impl Job {
    pub fn trigger(trigger: Trigger) -> Self {
        Self {
            event: Event::Trigger(trigger),
            origin: None,
            callback_id: None,
        }
    }
}

pub struct Gateway {
    router: Arc<Router>,
    renderer: Renderer,
    transport: Arc<dyn Transport>,
    chat_id: i64,
}

impl Gateway {
    pub fn new(
        router: Arc<Router>,
        renderer: Renderer,
        transport: Arc<dyn Transport>,
        chat_id: i64,
    ) -> Self {
        Self {
            router,
            renderer,
            transport,
            chat_id,
        }
    }

    /// Turn an inbound update into a job, dropping anything from another chat.
    pub fn admit(&self, inbound: Inbound) -> Option<Job> {
        admit(self.chat_id, inbound)
    }

    /// Resolve `job`, acknowledge its callback, and spawn rendering.
    ///
    /// Returns the delivery task, or `None` when there is nothing to send.
    pub async fn handle(&self, job: Job) -> Option<JoinHandle<()>> {
        let resolution = match self.router.resolve(&job.event) {
            Ok(resolution) => resolution,
            Err(e) => {
                error!(error = %e, event = ?job.event, "event failed, sending recovery menu");
                self.router.recovery(&job.event)
            }
        };

        if let Some(callback_id) = &job.callback_id {
            if let Err(e) = self
                .transport
                .acknowledge(callback_id, resolution.notice.as_deref())
                .await
            {
                warn!(error = %e, "callback acknowledgement failed");
            }
        }

        if resolution.replies.is_empty() {
            debug!(event = ?job.event, "nothing to deliver");
            return None;
        }

        let renderer = self.renderer.clone();
        let transport = self.transport.clone();
        let chat_id = self.chat_id;
        let origin = job.origin;
        Some(tokio::spawn(async move {
            for reply in resolution.replies {
                let Some(message) = renderer.render(reply).await else {
                    continue;
                };
                if let Err(e) = transport.deliver(chat_id, origin, &message).await {
                    error!(error = %e, "delivery failed");
                }
            }
        }))
    }

    /// Run until Ctrl-C or until every job source is gone.
    pub async fn run(self, schedule: DailySchedule, clock: Arc<dyn Clock>) {
        let (tx, mut rx) = mpsc::channel::<Job>(QUEUE_DEPTH);
        let poller = tokio::spawn(poll_loop(self.transport.clone(), self.chat_id, tx.clone()));
        let timer = tokio::spawn(schedule_loop(schedule, clock, tx));
        info!(chat_id = self.chat_id, "gateway running");

        loop {
            tokio::select! {
                job = rx.recv() => match job {
                    Some(job) => {
                        self.handle(job).await;
                    }
                    None => {
                        warn!("all job sources closed");
                        break;
                    }
                },
                _ = tokio::signal::ctrl_c() => {
                    info!("shutdown requested");
                    break;
                }
            }
        }

        poller.abort();
        timer.abort();
    }
}

fn admit(chat_id: i64, inbound: Inbound) -> Option<Job> {
    if inbound.chat_id != chat_id {
        debug!(from = inbound.chat_id, "update from another chat dropped");
        return None;
    }
    Some(match inbound.kind {
        InboundKind::Text(text) => Job {
            event: Event::Text(text),
            origin: None,
            callback_id: None,
        },
        InboundKind::Callback {
            id,
            data,
            message_id,
        } => Job {
            event: Event::Callback(data),
            origin: message_id,
            callback_id: Some(id),
        },
    })
}

async fn poll_loop(transport: Arc<dyn Transport>, chat_id: i64, tx: mpsc::Sender<Job>) {
    loop {
        match transport.poll().await {
            Ok(batch) => {
                for inbound in batch {
                    if let Some(job) = admit(chat_id, inbound) {
                        if tx.send(job).await.is_err() {
                            return;
                        }
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "polling failed, backing off");
                tokio::time::sleep(POLL_BACKOFF).await;
            }
        }
    }
}

/// Never fires the same slot twice, even if the clock reads slightly early
/// after waking.
async fn schedule_loop(schedule: DailySchedule, clock: Arc<dyn Clock>, tx: mpsc::Sender<Job>) {
    let mut last_fire: Option<NaiveDateTime> = None;
    loop {
        let now = clock.now();
        let from = last_fire.map_or(now, |fired| fired.max(now));
        let Some((at, trigger)) = schedule.next_fire(from) else {
            warn!("empty schedule, no triggers will fire");
            return;
        };
        let wait = (at - now).to_std().unwrap_or_default();
        debug!(%at, ?trigger, "next trigger scheduled");
        tokio::time::sleep(wait).await;

        last_fire = Some(at);
        info!(?trigger, "trigger fired");
        if tx.send(Job::trigger(trigger)).await.is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use dailyforge_core::ai::{ImageGenerator, SpeechSynthesizer, TextGenerator, Timeouts};
    use dailyforge_core::{
        AiError, Assistant, Catalog, Config, FixedClock, Outbound, Placement, Store,
    };
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        acks: Mutex<Vec<(String, Option<String>)>>,
        sent: Mutex<Vec<(Option<i64>, Outbound)>>,
    }

    #[async_trait]
    impl Transport for Recorder {
        async fn poll(&self) -> Result<Vec<Inbound>, TransportError> {
            Ok(Vec::new())
        }

        async fn acknowledge(
            &self,
            callback_id: &str,
            notice: Option<&str>,
        ) -> Result<(), TransportError> {
            self.acks
                .lock()
                .unwrap()
                .push((callback_id.to_string(), notice.map(str::to_string)));
            Ok(())
        }

        async fn deliver(
            &self,
            _chat_id: i64,
            origin: Option<i64>,
            message: &Outbound,
        ) -> Result<(), TransportError> {
            self.sent.lock().unwrap().push((origin, message.clone()));
            Ok(())
        }
    }

    struct Echo;

    #[async_trait]
    impl TextGenerator for Echo {
        async fn generate(&self, _persona: &str, prompt: &str) -> Result<String, AiError> {
            Ok(format!("echo: {prompt}"))
        }
    }

    #[async_trait]
    impl ImageGenerator for Echo {
        async fn generate_image(&self, _prompt: &str) -> Result<Vec<u8>, AiError> {
            Err(AiError::Timeout { secs: 0 })
        }
    }

    #[async_trait]
    impl SpeechSynthesizer for Echo {
        async fn synthesize(&self, _text: &str) -> Result<Vec<u8>, AiError> {
            Err(AiError::Timeout { secs: 0 })
        }
    }

    const CHAT: i64 = 5;

    fn gateway() -> (Gateway, Arc<Recorder>) {
        let clock = Arc::new(FixedClock::new(
            NaiveDate::from_ymd_opt(2025, 3, 10)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
        ));
        let router = Router::new(
            Arc::new(Store::open_memory().unwrap()),
            Arc::new(Catalog::default()),
            &Config::default(),
            &CHAT.to_string(),
            clock,
        )
        .unwrap();
        let echo = Arc::new(Echo);
        let renderer = Renderer::new(Assistant::new(
            echo.clone(),
            echo.clone(),
            echo,
            Timeouts::default(),
            "persona",
            "fallback",
        ));
        let recorder = Arc::new(Recorder::default());
        let gateway = Gateway::new(Arc::new(router), renderer, recorder.clone(), CHAT);
        (gateway, recorder)
    }

    fn callback(data: &str) -> Inbound {
        Inbound {
            chat_id: CHAT,
            kind: InboundKind::Callback {
                id: "cb".into(),
                data: data.into(),
                message_id: Some(3),
            },
        }
    }

    #[test]
    fn foreign_chat_is_dropped() {
        let (gateway, _) = gateway();
        let stranger = Inbound {
            chat_id: 999,
            kind: InboundKind::Text("/start".into()),
        };
        assert!(gateway.admit(stranger).is_none());
        assert!(gateway.admit(callback("main_menu")).is_some());
    }

    #[tokio::test]
    async fn callback_is_acknowledged_and_replaced_in_place() {
        let (gateway, recorder) = gateway();
        let job = gateway.admit(callback("add_чтение")).unwrap();
        gateway.handle(job).await.unwrap().await.unwrap();

        let acks = recorder.acks.lock().unwrap();
        assert_eq!(acks.len(), 1);
        assert!(acks[0].1.is_some());

        let sent = recorder.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, Some(3));
        assert_eq!(sent[0].1.placement, Placement::InPlace);
    }

    #[tokio::test]
    async fn free_text_is_rendered_through_ai() {
        let (gateway, recorder) = gateway();
        let job = gateway
            .admit(Inbound {
                chat_id: CHAT,
                kind: InboundKind::Text("привет".into()),
            })
            .unwrap();
        gateway.handle(job).await.unwrap().await.unwrap();

        let sent = recorder.sent.lock().unwrap();
        assert_eq!(sent[0].1.text, "echo: привет");
        assert!(recorder.acks.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_voice_is_omitted_but_text_delivered() {
        let (gateway, recorder) = gateway();
        for data in ["add_deep_work", "add_работа над проектом"] {
            let job = gateway.admit(callback(data)).unwrap();
            gateway.handle(job).await.unwrap().await.unwrap();
        }
        let job = gateway.admit(callback("add_шок-терапия")).unwrap();
        gateway.handle(job).await.unwrap().await.unwrap();

        // Three confirmations; the 50% voice line failed and was skipped.
        assert_eq!(recorder.sent.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn empty_reminder_sends_nothing() {
        let (gateway, recorder) = gateway();
        assert!(gateway
            .handle(Job::trigger(Trigger::ChallengeReminder))
            .await
            .is_none());
        assert!(recorder.sent.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn schedule_loop_fires_each_slot_once() {
        // The clock never moves, so after every wake it reads earlier than
        // the slot that just fired.
        let clock = Arc::new(FixedClock::new(
            NaiveDate::from_ymd_opt(2025, 3, 10)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap(),
        ));
        let schedule = DailySchedule::from_config(&Config::default().schedule).unwrap();
        let (tx, mut rx) = mpsc::channel(8);
        let timer = tokio::spawn(schedule_loop(schedule, clock, tx));

        let mut fired = Vec::new();
        for _ in 0..4 {
            match rx.recv().await.unwrap().event {
                Event::Trigger(trigger) => fired.push(trigger),
                other => panic!("unexpected event {other:?}"),
            }
        }
        timer.abort();

        assert_eq!(
            fired,
            vec![
                Trigger::MorningPlan,
                Trigger::ChallengeReminder,
                Trigger::EveningAnalysis,
                Trigger::MorningPlan,
            ]
        );
    }
}
