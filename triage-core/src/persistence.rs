//! Hand-off of finished call records to the call-results backend.
//!
//! Provides a `RecordSink` trait with implementations for:
//! - **HTTP**: JSON POST to the backend's call-results and emergency routes
//! - **Simulated**: logs the record only (persistence disabled)
//!
//! and a `Dispatcher` that runs every hand-off as a tracked task, so shutdown
//! can drain the ones still in flight.
//!
//! Nothing here can fail the conversation: a hand-off always marks the call saved
//! and only the final acknowledgement wording reflects what the backend said.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;
use tokio_util::task::TaskTracker;
use uuid::Uuid;

use crate::config::PersistenceConfig;
use crate::emergency::EmergencyOutcome;
use crate::models::record::CallRecord;
use crate::models::slot::{self, SlotUpdate};

/// Lets the backend drop repeated deliveries of the same call.
pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

// ============================================================================
// RecordSink trait
// ============================================================================

#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Persist one finished record.
    async fn save(&self, record: &CallRecord) -> Result<SaveOutcome, PersistenceError>;

    /// Notify the care team of an escalated call.
    async fn report_emergency(&self, alert: &EmergencyAlert) -> Result<(), PersistenceError>;

    /// Sink name for logging.
    fn name(&self) -> &str;
}

// ============================================================================
// Error + outcome types
// ============================================================================

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend returned {code}: {body}")]
    Status { code: u16, body: String },

    #[error("Gave up after {attempts} attempts: {last}")]
    RetryExhausted {
        attempts: usize,
        last: Box<PersistenceError>,
    },
}

impl PersistenceError {
    /// Only failures where the backend cannot have stored anything are retried:
    /// refused connections, throttling and "service unavailable". A timeout may
    /// mean the record arrived, so it is never resent.
    fn is_retryable(&self) -> bool {
        match self {
            PersistenceError::Http(e) => e.is_connect(),
            PersistenceError::Status { code, .. } => matches!(*code, 429 | 503),
            PersistenceError::RetryExhausted { .. } => false,
        }
    }

    /// What the patient is told for this failure.
    fn outcome(&self) -> SaveOutcome {
        match self {
            PersistenceError::Status { code, .. } => SaveOutcome::Rejected { status: *code },
            PersistenceError::Http(e) if e.is_timeout() => SaveOutcome::Unconfirmed,
            PersistenceError::Http(_) => SaveOutcome::Unreachable,
            PersistenceError::RetryExhausted { last, .. } => last.outcome(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SaveOutcome {
    Saved,
    Rejected { status: u16 },
    Unreachable,
    /// The backend did not answer in time; the record may still have been stored.
    Unconfirmed,
    Simulated,
    /// Still being sent in the background; the result is only logged.
    Pending,
}

impl SaveOutcome {
    pub fn acknowledgement(self) -> &'static str {
        match self {
            SaveOutcome::Saved => "Vos réponses ont été sauvegardées avec succès.",
            SaveOutcome::Rejected { .. } => "Erreur lors de la sauvegarde.",
            SaveOutcome::Unreachable => "Problème de connexion avec le serveur.",
            SaveOutcome::Unconfirmed | SaveOutcome::Simulated | SaveOutcome::Pending => {
                "Vos réponses ont été transmises à votre équipe médicale."
            }
        }
    }
}

/// Payload of the backend's emergency route.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyAlert {
    pub call_id: Option<Uuid>,
    pub emergency_type: String,
    pub patient_data: serde_json::Value,
}

impl EmergencyAlert {
    pub fn new(record: &CallRecord, emergency: &EmergencyOutcome) -> Self {
        Self {
            call_id: record.call_id,
            emergency_type: emergency.summary(),
            patient_data: serde_json::to_value(record).unwrap_or(serde_json::Value::Null),
        }
    }
}

// ============================================================================
// HttpRecordSink
// ============================================================================

#[derive(Debug, Clone)]
pub struct HttpRecordSink {
    client: Client,
    config: PersistenceConfig,
}

impl HttpRecordSink {
    pub fn new(config: PersistenceConfig) -> Result<Self, PersistenceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn post_with_retry<T: Serialize + Sync>(
        &self,
        path: &str,
        body: &T,
        idempotency_key: Option<String>,
    ) -> Result<(), PersistenceError> {
        let retry_strategy = ExponentialBackoff::from_millis(self.config.retry_delay_ms)
            .max_delay(Duration::from_secs(5))
            .map(jitter)
            .take(self.config.max_retries);

        let url = self.url(path);
        let key = idempotency_key.as_deref();
        let mut attempts = 0usize;
        let result = RetryIf::start(
            retry_strategy,
            || {
                attempts += 1;
                self.post_once(&url, body, key)
            },
            PersistenceError::is_retryable,
        )
        .await;

        match result {
            Err(last) if attempts > 1 => Err(PersistenceError::RetryExhausted {
                attempts,
                last: Box::new(last),
            }),
            other => other,
        }
    }

    async fn post_once<T: Serialize + Sync>(
        &self,
        url: &str,
        body: &T,
        idempotency_key: Option<&str>,
    ) -> Result<(), PersistenceError> {
        let mut request = self.client.post(url).json(body);
        if let Some(key) = idempotency_key {
            request = request.header(IDEMPOTENCY_HEADER, key);
        }
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(code = status.as_u16(), url, "Call-results backend rejected request");
            return Err(PersistenceError::Status {
                code: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}

#[async_trait]
impl RecordSink for HttpRecordSink {
    async fn save(&self, record: &CallRecord) -> Result<SaveOutcome, PersistenceError> {
        let key = record.call_id.map(|id| id.to_string());
        self.post_with_retry(&self.config.results_path, record, key).await?;
        Ok(SaveOutcome::Saved)
    }

    async fn report_emergency(&self, alert: &EmergencyAlert) -> Result<(), PersistenceError> {
        let key = alert.call_id.map(|id| format!("{}-emergency", id));
        self.post_with_retry(&self.config.emergency_path, alert, key).await
    }

    fn name(&self) -> &str {
        "http"
    }
}

// ============================================================================
// SimulatedRecordSink
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct SimulatedRecordSink;

#[async_trait]
impl RecordSink for SimulatedRecordSink {
    async fn save(&self, record: &CallRecord) -> Result<SaveOutcome, PersistenceError> {
        tracing::info!(
            call_id = ?record.call_id,
            score = record.medical_score,
            category = %record.score_category,
            emergency = record.emergency_detected,
            "Persistence disabled, call record not sent"
        );
        Ok(SaveOutcome::Simulated)
    }

    async fn report_emergency(&self, alert: &EmergencyAlert) -> Result<(), PersistenceError> {
        tracing::warn!(
            call_id = ?alert.call_id,
            emergency_type = %alert.emergency_type,
            "Persistence disabled, emergency alert not sent"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "simulated"
    }
}

/// Create the sink selected by `[persistence] enabled`.
pub fn create_sink(config: &PersistenceConfig) -> Result<Arc<dyn RecordSink>, PersistenceError> {
    if config.enabled {
        Ok(Arc::new(HttpRecordSink::new(config.clone())?))
    } else {
        Ok(Arc::new(SimulatedRecordSink))
    }
}

// ============================================================================
// Hand-off
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandOff {
    pub record: CallRecord,
    pub call_saved: bool,
    pub outcome: SaveOutcome,
    pub utterance: String,
}

impl HandOff {
    fn new(record: CallRecord, outcome: SaveOutcome) -> Self {
        Self {
            record,
            call_saved: true,
            outcome,
            utterance: outcome.acknowledgement().to_string(),
        }
    }

    pub fn slot_updates(&self) -> Vec<SlotUpdate> {
        vec![SlotUpdate::new(slot::CALL_SAVED, self.call_saved)]
    }
}

/// Runs hand-offs as tracked tasks.
///
/// With `await_confirmation` the caller waits for the backend, but never longer
/// than `confirmation_timeout`; past that the delivery keeps running in the
/// background and the call is acknowledged as `Pending`.
#[derive(Clone)]
pub struct Dispatcher {
    sink: Arc<dyn RecordSink>,
    tasks: TaskTracker,
    await_confirmation: bool,
    confirmation_timeout: Duration,
}

impl Dispatcher {
    pub fn new(sink: Arc<dyn RecordSink>, config: &PersistenceConfig) -> Self {
        Self {
            sink,
            tasks: TaskTracker::new(),
            await_confirmation: config.await_confirmation,
            confirmation_timeout: Duration::from_millis(config.confirmation_timeout_ms),
        }
    }

    pub fn sink(&self) -> &Arc<dyn RecordSink> {
        &self.sink
    }

    /// Hand-offs not finished yet.
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Send the record (and the alert, if escalated).
    pub async fn dispatch(&self, record: CallRecord, emergency: EmergencyOutcome) -> HandOff {
        let delivery = self.spawn_delivery(record.clone(), emergency);

        if !self.await_confirmation {
            return HandOff::new(record, SaveOutcome::Pending);
        }

        let outcome = match tokio::time::timeout(self.confirmation_timeout, delivery).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                tracing::error!(call_id = ?record.call_id, error = %e, "Hand-off task failed");
                SaveOutcome::Unreachable
            }
            Err(_) => {
                tracing::warn!(
                    call_id = ?record.call_id,
                    timeout_ms = self.confirmation_timeout.as_millis() as u64,
                    "Backend slow to confirm, hand-off continues in background"
                );
                SaveOutcome::Pending
            }
        };
        HandOff::new(record, outcome)
    }

    /// Wait for in-flight hand-offs, at most `limit`. Returns false if some were
    /// still running when the limit passed.
    pub async fn drain(&self, limit: Duration) -> bool {
        self.tasks.close();
        let pending = self.tasks.len();
        if pending > 0 {
            tracing::info!(pending, "Waiting for in-flight hand-offs");
        }

        match tokio::time::timeout(limit, self.tasks.wait()).await {
            Ok(()) => true,
            Err(_) => {
                tracing::error!(
                    remaining = self.tasks.len(),
                    "Shut down with hand-offs still in flight"
                );
                false
            }
        }
    }

    fn spawn_delivery(&self, record: CallRecord, emergency: EmergencyOutcome) -> JoinHandle<SaveOutcome> {
        let sink = Arc::clone(&self.sink);
        self.tasks.spawn(async move {
            let outcome = deliver(sink.as_ref(), &record, &emergency).await;
            tracing::debug!(call_id = ?record.call_id, outcome = ?outcome, "Hand-off finished");
            outcome
        })
    }
}

async fn deliver(sink: &dyn RecordSink, record: &CallRecord, emergency: &EmergencyOutcome) -> SaveOutcome {
    if emergency.detected {
        let alert = EmergencyAlert::new(record, emergency);
        if let Err(e) = sink.report_emergency(&alert).await {
            tracing::error!(
                sink = sink.name(),
                call_id = ?record.call_id,
                error = %e,
                "Failed to report emergency"
            );
        }
    }

    match sink.save(record).await {
        Ok(outcome) => {
            tracing::info!(sink = sink.name(), call_id = ?record.call_id, outcome = ?outcome, "Call record handed off");
            outcome
        }
        Err(e) => {
            let outcome = e.outcome();
            tracing::error!(sink = sink.name(), call_id = ?record.call_id, error = %e, outcome = ?outcome, "Call record not confirmed");
            outcome
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emergency::EmergencyReason;
    use crate::scoring::ScoreCategory;
    use chrono::Utc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Instant;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base_url: &str) -> PersistenceConfig {
        PersistenceConfig {
            enabled: true,
            base_url: base_url.to_string(),
            max_retries: 2,
            retry_delay_ms: 10,
            await_confirmation: true,
            confirmation_timeout_ms: 10_000,
            ..PersistenceConfig::default()
        }
    }

    fn awaiting(sink: impl RecordSink + 'static) -> Dispatcher {
        Dispatcher::new(Arc::new(sink), &test_config("http://unused"))
    }

    fn http_dispatcher(config: PersistenceConfig) -> Dispatcher {
        let sink = HttpRecordSink::new(config.clone()).unwrap();
        Dispatcher::new(Arc::new(sink), &config)
    }

    fn test_record() -> CallRecord {
        CallRecord {
            call_id: Some(Uuid::nil()),
            timestamp: Utc::now(),
            patient_confirmed: Some(true.into()),
            birth_date: Some("12/03/1956".into()),
            pain_level: Some(9.0.into()),
            pain_location: Some("ventre".into()),
            medication_compliance: Some(true.into()),
            transit_normal: Some(true.into()),
            transit_problem: None,
            mood_level: Some(8.0.into()),
            mood_details: None,
            fever_present: Some(false.into()),
            temperature: None,
            other_complaints: None,
            medical_score: 80,
            score_category: ScoreCategory::Excellent,
            emergency_detected: true,
        }
    }

    fn calm() -> EmergencyOutcome {
        EmergencyOutcome {
            detected: false,
            reasons: vec![],
            utterance: None,
        }
    }

    fn escalated() -> EmergencyOutcome {
        EmergencyOutcome {
            detected: true,
            reasons: vec![EmergencyReason::SeverePain { level: 9.0 }],
            utterance: Some(crate::emergency::ESCALATION_UTTERANCE.to_string()),
        }
    }

    /// Saves after a delay and records that it did.
    struct SlowSink {
        delay: Duration,
        saved: Arc<AtomicBool>,
    }

    #[async_trait]
    impl RecordSink for SlowSink {
        async fn save(&self, _record: &CallRecord) -> Result<SaveOutcome, PersistenceError> {
            tokio::time::sleep(self.delay).await;
            self.saved.store(true, Ordering::SeqCst);
            Ok(SaveOutcome::Saved)
        }

        async fn report_emergency(&self, _alert: &EmergencyAlert) -> Result<(), PersistenceError> {
            Ok(())
        }

        fn name(&self) -> &str {
            "slow"
        }
    }

    fn slow_dispatcher(delay: Duration, await_confirmation: bool) -> (Dispatcher, Arc<AtomicBool>) {
        let saved = Arc::new(AtomicBool::new(false));
        let sink = SlowSink {
            delay,
            saved: Arc::clone(&saved),
        };
        let config = PersistenceConfig {
            await_confirmation,
            confirmation_timeout_ms: 100,
            ..PersistenceConfig::default()
        };
        (Dispatcher::new(Arc::new(sink), &config), saved)
    }

    #[tokio::test]
    async fn test_save_posts_record_json() {
        let mock_server = MockServer::start().await;
        let dispatcher = http_dispatcher(test_config(&mock_server.uri()));

        Mock::given(method("POST"))
            .and(path("/api/calls/results"))
            .and(header("content-type", "application/json"))
            .and(header(IDEMPOTENCY_HEADER, Uuid::nil().to_string().as_str()))
            .and(body_partial_json(serde_json::json!({
                "medical_score": 80,
                "score_category": "excellent",
                "emergency_detected": true,
                "pain_level": 9.0
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;

        let handoff = dispatcher.dispatch(test_record(), calm()).await;
        assert_eq!(handoff.outcome, SaveOutcome::Saved);
        assert!(handoff.call_saved);
        assert_eq!(handoff.utterance, "Vos réponses ont été sauvegardées avec succès.");
    }

    #[tokio::test]
    async fn test_rejected_record_still_marks_call_saved() {
        let mock_server = MockServer::start().await;
        let dispatcher = http_dispatcher(test_config(&mock_server.uri()));

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad record"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let handoff = dispatcher.dispatch(test_record(), calm()).await;
        assert_eq!(handoff.outcome, SaveOutcome::Rejected { status: 400 });
        assert!(handoff.call_saved);
        assert_eq!(handoff.utterance, "Erreur lors de la sauvegarde.");
    }

    #[tokio::test]
    async fn test_internal_server_error_is_not_resent() {
        let mock_server = MockServer::start().await;
        let dispatcher = http_dispatcher(test_config(&mock_server.uri()));

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&mock_server)
            .await;

        let handoff = dispatcher.dispatch(test_record(), calm()).await;
        assert_eq!(handoff.outcome, SaveOutcome::Rejected { status: 500 });
    }

    #[tokio::test]
    async fn test_service_unavailable_is_retried_then_succeeds() {
        let mock_server = MockServer::start().await;
        let sink = HttpRecordSink::new(test_config(&mock_server.uri())).unwrap();

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&mock_server)
            .await;

        let outcome = sink.save(&test_record()).await.unwrap();
        assert_eq!(outcome, SaveOutcome::Saved);
    }

    #[tokio::test]
    async fn test_persistent_throttling_exhausts_retries() {
        let mock_server = MockServer::start().await;
        let sink = HttpRecordSink::new(test_config(&mock_server.uri())).unwrap();

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .expect(3)
            .mount(&mock_server)
            .await;

        let err = sink.save(&test_record()).await.unwrap_err();
        match &err {
            PersistenceError::RetryExhausted { attempts, last } => {
                assert_eq!(*attempts, 3);
                assert!(matches!(**last, PersistenceError::Status { code: 429, .. }));
            }
            other => panic!("expected exhausted retries, got {other:?}"),
        }
        assert_eq!(err.outcome(), SaveOutcome::Rejected { status: 429 });
    }

    #[tokio::test]
    async fn test_slow_backend_gets_exactly_one_request() {
        let mock_server = MockServer::start().await;
        let dispatcher = http_dispatcher(PersistenceConfig {
            timeout_seconds: 1,
            ..test_config(&mock_server.uri())
        });

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .expect(1)
            .mount(&mock_server)
            .await;

        let started = Instant::now();
        let handoff = dispatcher.dispatch(test_record(), calm()).await;

        assert_eq!(handoff.outcome, SaveOutcome::Unconfirmed);
        assert_eq!(
            handoff.utterance,
            "Vos réponses ont été transmises à votre équipe médicale."
        );
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_not_an_error() {
        // Nothing listens on port 9 (discard) in the test environment.
        let dispatcher = http_dispatcher(PersistenceConfig {
            timeout_seconds: 1,
            ..test_config("http://127.0.0.1:9")
        });

        let handoff = dispatcher.dispatch(test_record(), calm()).await;
        assert_eq!(handoff.outcome, SaveOutcome::Unreachable);
        assert!(handoff.call_saved);
        assert_eq!(handoff.utterance, "Problème de connexion avec le serveur.");
    }

    #[tokio::test]
    async fn test_emergency_alert_posted_only_when_escalated() {
        let mock_server = MockServer::start().await;
        let dispatcher = http_dispatcher(test_config(&mock_server.uri()));

        Mock::given(method("POST"))
            .and(path("/api/calls/emergency"))
            .and(header(
                IDEMPOTENCY_HEADER,
                format!("{}-emergency", Uuid::nil()).as_str(),
            ))
            .and(body_partial_json(serde_json::json!({
                "callId": Uuid::nil(),
                "emergencyType": "severe_pain"
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .and(path("/api/calls/results"))
            .respond_with(ResponseTemplate::new(200))
            .expect(2)
            .mount(&mock_server)
            .await;

        dispatcher.dispatch(test_record(), escalated()).await;
        dispatcher.dispatch(test_record(), calm()).await;
    }

    #[tokio::test]
    async fn test_failed_alert_does_not_block_save() {
        let mock_server = MockServer::start().await;
        let dispatcher = http_dispatcher(test_config(&mock_server.uri()));

        Mock::given(method("POST"))
            .and(path("/api/calls/emergency"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .and(path("/api/calls/results"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&mock_server)
            .await;

        let handoff = dispatcher.dispatch(test_record(), escalated()).await;
        assert_eq!(handoff.outcome, SaveOutcome::Saved);
    }

    #[tokio::test]
    async fn test_simulated_sink_acknowledges_transmission() {
        let handoff = awaiting(SimulatedRecordSink)
            .dispatch(test_record(), escalated())
            .await;
        assert_eq!(handoff.outcome, SaveOutcome::Simulated);
        assert_eq!(
            handoff.utterance,
            "Vos réponses ont été transmises à votre équipe médicale."
        );
        assert_eq!(handoff.slot_updates(), vec![SlotUpdate::new(slot::CALL_SAVED, true)]);
    }

    #[tokio::test]
    async fn test_background_hand_off_returns_pending() {
        let (dispatcher, _saved) = slow_dispatcher(Duration::from_millis(10), false);
        let handoff = dispatcher.dispatch(test_record(), calm()).await;
        assert_eq!(handoff.outcome, SaveOutcome::Pending);
        assert!(handoff.call_saved);
    }

    #[tokio::test]
    async fn test_slow_confirmation_is_bounded() {
        let (dispatcher, saved) = slow_dispatcher(Duration::from_millis(400), true);

        let started = Instant::now();
        let handoff = dispatcher.dispatch(test_record(), calm()).await;

        assert!(started.elapsed() < Duration::from_millis(300));
        assert_eq!(handoff.outcome, SaveOutcome::Pending);
        assert_eq!(dispatcher.in_flight(), 1);

        // The delivery is not cancelled by the timeout.
        assert!(dispatcher.drain(Duration::from_secs(2)).await);
        assert!(saved.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_drain_waits_for_background_hand_offs() {
        let (dispatcher, saved) = slow_dispatcher(Duration::from_millis(200), false);

        let handoff = dispatcher.dispatch(test_record(), calm()).await;
        assert_eq!(handoff.outcome, SaveOutcome::Pending);
        assert!(!saved.load(Ordering::SeqCst));

        assert!(dispatcher.drain(Duration::from_secs(2)).await);
        assert!(saved.load(Ordering::SeqCst));
        assert_eq!(dispatcher.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_drain_gives_up_after_limit() {
        let (dispatcher, saved) = slow_dispatcher(Duration::from_secs(10), false);
        dispatcher.dispatch(test_record(), calm()).await;

        assert!(!dispatcher.drain(Duration::from_millis(50)).await);
        assert!(!saved.load(Ordering::SeqCst));
        assert_eq!(dispatcher.in_flight(), 1);
    }

    #[test]
    fn test_create_sink_follows_enabled_flag() {
        let disabled = create_sink(&PersistenceConfig::default()).unwrap();
        assert_eq!(disabled.name(), "simulated");

        let enabled = create_sink(&test_config("http://localhost:3000")).unwrap();
        assert_eq!(enabled.name(), "http");
    }
}
