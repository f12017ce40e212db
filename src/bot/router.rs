use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::collaborators::{
    BotError, Collaborator, CollaboratorResult, Collaborators, NluClient, QnaClient,
    SchedulerClient,
};

use super::policy::{self, Route, FALLBACK_TEXT};
use super::traits::{IncomingMessage, OutgoingReply};

/// Routes each user message to exactly one reply.
///
/// Stateless apart from its collaborator handles, so one instance can serve
/// any number of concurrent conversations.
pub struct MessageRouter {
    nlu: Arc<dyn NluClient>,
    qna: Arc<dyn QnaClient>,
    scheduler: Arc<dyn SchedulerClient>,
    call_timeout: Duration,
}

impl MessageRouter {
    pub fn new(collaborators: Collaborators, call_timeout: Duration) -> Self {
        Self {
            nlu: collaborators.nlu,
            qna: collaborators.qna,
            scheduler: collaborators.scheduler,
            call_timeout,
        }
    }

    /// Produce the single reply for `message`. Collaborator failures are
    /// logged and treated as "no result"; this never fails.
    pub async fn handle(&self, message: &IncomingMessage) -> OutgoingReply {
        let (route, text) = self.resolve(&message.text).await;
        tracing::info!(
            conversation = %message.conversation_id,
            from = %message.from,
            route = route.kind(),
            "Routed message"
        );
        OutgoingReply::text(text)
    }

    async fn resolve(&self, text: &str) -> (Route, String) {
        // QnA is issued alongside NLU and its result is simply unused when an
        // intent branch answers.
        let (answers, nlu) = tokio::join!(
            self.call(Collaborator::Qna, self.qna.query(text)),
            self.call(Collaborator::Nlu, self.nlu.query(text)),
        );

        if let Some(route) = nlu.as_ref().and_then(policy::intent_route) {
            let reply = match &route {
                Route::Booking { time } => {
                    self.call(
                        Collaborator::Scheduler,
                        self.scheduler.schedule_appointment(time),
                    )
                    .await
                }
                _ => {
                    self.call(Collaborator::Scheduler, self.scheduler.get_availability())
                        .await
                }
            };
            if let Some(reply) = reply {
                return (route, reply);
            }
            tracing::debug!(route = route.kind(), "Scheduler gave no result, falling through");
        }

        let route = policy::answer_route(answers.as_deref());
        let text = match &route {
            Route::Knowledge { answer } => answer.clone(),
            _ => FALLBACK_TEXT.to_string(),
        };
        (route, text)
    }

    /// Await one collaborator call under the configured timeout.
    async fn call<T>(
        &self,
        collaborator: Collaborator,
        fut: impl Future<Output = CollaboratorResult<T>>,
    ) -> Option<T> {
        let err = match tokio::time::timeout(self.call_timeout, fut).await {
            Ok(Ok(value)) => return Some(value),
            Ok(Err(err)) => err,
            Err(_) => BotError::unavailable(
                collaborator,
                format!("timed out after {}ms", self.call_timeout.as_millis()),
            ),
        };
        tracing::warn!(collaborator = %collaborator, error = %err, "Collaborator call failed");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{Entity, NluResult, QnaAnswer};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeNlu {
        result: Option<NluResult>,
        delay: Duration,
    }

    #[async_trait]
    impl NluClient for FakeNlu {
        async fn query(&self, _text: &str) -> CollaboratorResult<NluResult> {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.result
                .clone()
                .ok_or_else(|| BotError::unavailable(Collaborator::Nlu, "connection refused"))
        }

        fn name(&self) -> &str {
            "fake-nlu"
        }
    }

    struct FakeQna {
        answers: Option<Vec<QnaAnswer>>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl QnaClient for FakeQna {
        async fn query(&self, _text: &str) -> CollaboratorResult<Vec<QnaAnswer>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answers
                .clone()
                .ok_or_else(|| BotError::malformed(Collaborator::Qna, "no answers field"))
        }

        fn name(&self) -> &str {
            "fake-qna"
        }
    }

    #[derive(Default)]
    struct FakeScheduler {
        availability: Option<String>,
        fail: bool,
        booked: Mutex<Vec<String>>,
        availability_calls: AtomicUsize,
    }

    #[async_trait]
    impl SchedulerClient for FakeScheduler {
        async fn get_availability(&self) -> CollaboratorResult<String> {
            self.availability_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(BotError::unavailable(Collaborator::Scheduler, "503"));
            }
            Ok(self
                .availability
                .clone()
                .unwrap_or_else(|| "Mon 9am, Tue 2pm".to_string()))
        }

        async fn schedule_appointment(&self, time: &str) -> CollaboratorResult<String> {
            if self.fail {
                return Err(BotError::unavailable(Collaborator::Scheduler, "503"));
            }
            self.booked.lock().push(time.to_string());
            Ok(format!("Booked for {time}"))
        }

        fn name(&self) -> &str {
            "fake-scheduler"
        }
    }

    fn nlu(intent: &str, score: f64, times: &[&str]) -> NluResult {
        NluResult {
            top_intent: intent.to_string(),
            intents: HashMap::from([(intent.to_string(), score)]),
            entities: times.iter().map(|t| Entity::new("time", t)).collect(),
        }
    }

    fn answer(text: &str) -> QnaAnswer {
        QnaAnswer {
            answer: text.to_string(),
            score: 0.8,
        }
    }

    struct Harness {
        router: MessageRouter,
        qna: Arc<FakeQna>,
        scheduler: Arc<FakeScheduler>,
    }

    fn harness(
        nlu_result: Option<NluResult>,
        answers: Option<Vec<QnaAnswer>>,
        scheduler: FakeScheduler,
    ) -> Harness {
        harness_with_delay(nlu_result, answers, scheduler, Duration::ZERO, Duration::from_secs(5))
    }

    fn harness_with_delay(
        nlu_result: Option<NluResult>,
        answers: Option<Vec<QnaAnswer>>,
        scheduler: FakeScheduler,
        nlu_delay: Duration,
        call_timeout: Duration,
    ) -> Harness {
        let qna = Arc::new(FakeQna {
            answers,
            calls: AtomicUsize::new(0),
        });
        let scheduler = Arc::new(scheduler);
        let collaborators = Collaborators {
            nlu: Arc::new(FakeNlu {
                result: nlu_result,
                delay: nlu_delay,
            }),
            qna: qna.clone(),
            scheduler: scheduler.clone(),
        };
        Harness {
            router: MessageRouter::new(collaborators, call_timeout),
            qna,
            scheduler,
        }
    }

    fn message(text: &str) -> IncomingMessage {
        IncomingMessage::new(text, "conv-1", "user-1")
    }

    #[tokio::test]
    async fn availability_intent_uses_scheduler_regardless_of_qna() {
        let h = harness(
            Some(nlu("GetAvailability", 0.9, &[])),
            Some(vec![answer("We are open 8-5.")]),
            FakeScheduler::default(),
        );
        let reply = h.router.handle(&message("any openings?")).await;
        assert_eq!(reply.text, "Mon 9am, Tue 2pm");
        assert_eq!(h.qna.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn booking_intent_books_first_time_entity() {
        let h = harness(
            Some(nlu("ScheduleAppointment", 0.7, &["3pm", "4pm"])),
            Some(vec![]),
            FakeScheduler::default(),
        );
        let reply = h.router.handle(&message("book me at 3pm")).await;
        assert_eq!(reply.text, "Booked for 3pm");
        assert_eq!(*h.scheduler.booked.lock(), vec!["3pm".to_string()]);
    }

    #[tokio::test]
    async fn booking_skips_blank_time_spans_from_luis() {
        let prediction = crate::collaborators::luis::parse_prediction(
            r#"{"prediction": {
                "topIntent": "ScheduleAppointment",
                "intents": {"ScheduleAppointment": {"score": 0.8}},
                "entities": {"$instance": {"time": [{"text": " "}, {"text": "3pm"}]}}
            }}"#,
        )
        .unwrap();
        let h = harness(Some(prediction), Some(vec![]), FakeScheduler::default());
        let reply = h.router.handle(&message("book me  at 3pm")).await;
        assert_eq!(reply.text, "Booked for 3pm");
        assert_eq!(*h.scheduler.booked.lock(), vec!["3pm".to_string()]);
    }

    #[tokio::test]
    async fn availability_at_exact_threshold_falls_through() {
        let h = harness(
            Some(nlu("GetAvailability", 0.85, &[])),
            Some(vec![answer("Call us at 555-0100.")]),
            FakeScheduler::default(),
        );
        let reply = h.router.handle(&message("openings?")).await;
        assert_eq!(reply.text, "Call us at 555-0100.");
        assert_eq!(h.scheduler.availability_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn booking_at_exact_threshold_falls_through() {
        let h = harness(
            Some(nlu("ScheduleAppointment", 0.6, &["3pm"])),
            Some(vec![]),
            FakeScheduler::default(),
        );
        let reply = h.router.handle(&message("book 3pm")).await;
        assert_eq!(reply.text, FALLBACK_TEXT);
        assert!(h.scheduler.booked.lock().is_empty());
    }

    #[tokio::test]
    async fn booking_without_time_entity_never_books() {
        let h = harness(
            Some(nlu("ScheduleAppointment", 0.95, &[])),
            Some(vec![answer("Tell me a time and I will book it.")]),
            FakeScheduler::default(),
        );
        let reply = h.router.handle(&message("book me in")).await;
        assert_eq!(reply.text, "Tell me a time and I will book it.");
        assert!(h.scheduler.booked.lock().is_empty());
    }

    #[tokio::test]
    async fn knowledge_answer_is_returned_verbatim() {
        let text = "Yes!  We accept *most* plans.\nAsk at the desk.";
        let h = harness(
            Some(nlu("None", 0.99, &[])),
            Some(vec![answer(text), answer("second best")]),
            FakeScheduler::default(),
        );
        let reply = h.router.handle(&message("insurance?")).await;
        assert_eq!(reply.text, text);
    }

    #[tokio::test]
    async fn empty_knowledge_base_gives_fallback() {
        let h = harness(
            Some(nlu("None", 0.99, &[])),
            Some(vec![]),
            FakeScheduler::default(),
        );
        let reply = h.router.handle(&message("asdf")).await;
        assert_eq!(
            reply.text,
            "Could you say that differently? I had trouble understanding it."
        );
    }

    #[tokio::test]
    async fn nlu_failure_falls_through_to_knowledge_base() {
        let h = harness(None, Some(vec![answer("We open at 8.")]), FakeScheduler::default());
        let reply = h.router.handle(&message("when do you open?")).await;
        assert_eq!(reply.text, "We open at 8.");
    }

    #[tokio::test]
    async fn all_collaborators_failing_still_replies() {
        let h = harness(
            None,
            None,
            FakeScheduler {
                fail: true,
                ..FakeScheduler::default()
            },
        );
        let reply = h.router.handle(&message("hello")).await;
        assert_eq!(reply.text, FALLBACK_TEXT);
    }

    #[tokio::test]
    async fn scheduler_failure_falls_through() {
        let h = harness(
            Some(nlu("GetAvailability", 0.99, &[])),
            Some(vec![]),
            FakeScheduler {
                fail: true,
                ..FakeScheduler::default()
            },
        );
        let reply = h.router.handle(&message("openings?")).await;
        assert_eq!(reply.text, FALLBACK_TEXT);
        assert_eq!(h.scheduler.availability_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn slow_nlu_times_out_as_failure() {
        let h = harness_with_delay(
            Some(nlu("GetAvailability", 0.99, &[])),
            Some(vec![answer("We open at 8.")]),
            FakeScheduler::default(),
            Duration::from_secs(5),
            Duration::from_millis(50),
        );
        let reply = h.router.handle(&message("openings?")).await;
        assert_eq!(reply.text, "We open at 8.");
        assert_eq!(h.scheduler.availability_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn concurrent_messages_are_independent() {
        let h = harness(
            Some(nlu("ScheduleAppointment", 0.8, &["10am"])),
            Some(vec![]),
            FakeScheduler::default(),
        );
        let router = Arc::new(h.router);

        let mut handles = Vec::new();
        for i in 0..8 {
            let router = router.clone();
            handles.push(tokio::spawn(async move {
                router
                    .handle(&IncomingMessage::new("book 10am", &format!("conv-{i}"), "user"))
                    .await
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap().text, "Booked for 10am");
        }
        assert_eq!(h.scheduler.booked.lock().len(), 8);
    }
}
