use std::sync::Arc;

use triage_core::persistence::{self, Dispatcher, RecordSink};
use triage_core::protocol::{SaveCallResult, TriageRequest, TriageResponse};
use triage_core::{Question, SlotSet, TriageConfig, TriageEngine, TriageError};
use uuid::Uuid;

/// Shared, read-only state: every call gets its own slots, nothing else is mutable.
#[derive(Clone)]
pub struct TriageState {
    pub engine: Arc<TriageEngine>,
    pub dispatcher: Dispatcher,
}

impl TriageState {
    pub fn from_config(config: TriageConfig) -> Result<Self, TriageError> {
        let sink = persistence::create_sink(&config.persistence)?;
        tracing::info!(
            sink = sink.name(),
            await_confirmation = config.persistence.await_confirmation,
            "Call-record sink ready"
        );
        Ok(Self::with_sink(config, sink))
    }

    pub fn with_sink(config: TriageConfig, sink: Arc<dyn RecordSink>) -> Self {
        let dispatcher = Dispatcher::new(sink, &config.persistence);
        Self {
            engine: Arc::new(TriageEngine::new(config)),
            dispatcher,
        }
    }

    pub fn sink_name(&self) -> &str {
        self.dispatcher.sink().name()
    }
}

pub async fn handle_request(request: TriageRequest, state: &TriageState) -> TriageResponse {
    match request {
        TriageRequest::Ping => TriageResponse::pong(),
        TriageRequest::Validate { question, slots } => {
            let question: Question = match question.parse() {
                Ok(q) => q,
                Err(e) => return TriageResponse::err(e.to_string()),
            };
            to_response(&state.engine.validate(question, &slots))
        }
        TriageRequest::Score { slots } => {
            let outcome = state.engine.score(&slots);
            to_response(&serde_json::json!({
                "medical_score": outcome.final_score,
                "score_category": outcome.category,
                "message": outcome.message,
                "breakdown": outcome.breakdown,
                "updates": outcome.slot_updates(),
            }))
        }
        TriageRequest::DetectEmergency { slots } => {
            let outcome = state.engine.detect_emergency(&slots);
            to_response(&serde_json::json!({
                "emergency_detected": outcome.detected,
                "reasons": outcome.reasons,
                "utterance": outcome.utterance,
                "updates": outcome.slot_updates(),
            }))
        }
        TriageRequest::SaveCall { call_id, slots } => {
            to_response(&save_call(call_id, slots, state).await)
        }
    }
}

/// Score, escalate, assemble and hand the record to the persistence collaborator.
async fn save_call(call_id: Option<Uuid>, slots: SlotSet, state: &TriageState) -> SaveCallResult {
    let call_id = call_id.unwrap_or_else(|| {
        let id = Uuid::new_v4();
        tracing::debug!(call_id = %id, "No call id supplied, generated one");
        id
    });

    let evaluation = state.engine.evaluate(&slots, Some(call_id));
    let handoff = state
        .dispatcher
        .dispatch(evaluation.record.clone(), evaluation.emergency.clone())
        .await;

    SaveCallResult::new(&evaluation, handoff)
}

fn to_response<T: serde::Serialize>(data: &T) -> TriageResponse {
    match serde_json::to_value(data) {
        Ok(v) => TriageResponse::ok(v),
        Err(e) => TriageResponse::err(format!("Serialization error: {}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use triage_core::SimulatedRecordSink;

    fn state() -> TriageState {
        TriageState::with_sink(TriageConfig::default(), Arc::new(SimulatedRecordSink))
    }

    fn slots(value: serde_json::Value) -> SlotSet {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn test_ping() {
        let resp = handle_request(TriageRequest::Ping, &state()).await;
        assert_eq!(resp.data.unwrap()["pong"], true);
    }

    #[tokio::test]
    async fn test_validate_unknown_question_is_error() {
        let resp = handle_request(
            TriageRequest::Validate {
                question: "weather".to_string(),
                slots: SlotSet::new(),
            },
            &state(),
        )
        .await;
        assert_eq!(resp.status, "error");
        assert!(resp.error.unwrap().contains("weather"));
    }

    #[tokio::test]
    async fn test_validate_returns_updates() {
        let resp = handle_request(
            TriageRequest::Validate {
                question: "action_validate_pain_level".to_string(),
                slots: slots(serde_json::json!({"pain_level": "9"})),
            },
            &state(),
        )
        .await;
        let data = resp.data.unwrap();
        assert_eq!(data["verified"], true);
        assert_eq!(data["question"], "pain_level");
        assert!(data["utterance"].as_str().unwrap().contains("élevé"));
    }

    #[tokio::test]
    async fn test_score_reports_breakdown() {
        let resp = handle_request(
            TriageRequest::Score {
                slots: slots(serde_json::json!({
                    "pain_level": 6,
                    "medication_compliance": false,
                    "transit_normal": true,
                    "mood_level": 8,
                    "fever_present": false,
                    "other_complaints": ""
                })),
            },
            &state(),
        )
        .await;
        let data = resp.data.unwrap();
        assert_eq!(data["medical_score"], 65);
        assert_eq!(data["score_category"], "good");
        assert_eq!(data["breakdown"]["pain"], 20);
        assert_eq!(data["breakdown"]["medication"], 15);
    }

    #[tokio::test]
    async fn test_detect_emergency_silent_when_calm() {
        let resp = handle_request(
            TriageRequest::DetectEmergency {
                slots: slots(serde_json::json!({"pain_level": 2})),
            },
            &state(),
        )
        .await;
        let data = resp.data.unwrap();
        assert_eq!(data["emergency_detected"], false);
        assert!(data["utterance"].is_null());
    }

    #[tokio::test]
    async fn test_save_call_assigns_id_and_marks_saved() {
        let resp = handle_request(
            TriageRequest::SaveCall {
                call_id: None,
                slots: slots(serde_json::json!({"fever_present": true})),
            },
            &state(),
        )
        .await;
        let data = resp.data.unwrap();
        assert_eq!(data["call_saved"], true);
        assert!(data["record"]["call_id"].is_string());
        assert_eq!(data["record"]["emergency_detected"], true);
        assert_eq!(data["save_outcome"]["state"], "pending");
        // score message, escalation, acknowledgement
        assert_eq!(data["utterances"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_save_call_awaits_sink_when_configured() {
        let mut config = TriageConfig::default();
        config.persistence.await_confirmation = true;
        let state = TriageState::with_sink(config, Arc::new(SimulatedRecordSink));

        let resp = handle_request(
            TriageRequest::SaveCall {
                call_id: Some(Uuid::nil()),
                slots: SlotSet::new(),
            },
            &state,
        )
        .await;
        let data = resp.data.unwrap();
        assert_eq!(data["save_outcome"]["state"], "simulated");
    }
}
