use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::Evaluation;
use crate::models::record::CallRecord;
use crate::models::slot::{SlotSet, SlotUpdate};
use crate::persistence::{HandOff, SaveOutcome};

/// Action requests sent by the dialogue manager.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TriageRequest {
    Ping,
    Validate {
        question: String,
        #[serde(default)]
        slots: SlotSet,
    },
    Score {
        #[serde(default)]
        slots: SlotSet,
    },
    DetectEmergency {
        #[serde(default)]
        slots: SlotSet,
    },
    SaveCall {
        call_id: Option<Uuid>,
        #[serde(default)]
        slots: SlotSet,
    },
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TriageResponse {
    pub status: String,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub version: String,
}

impl TriageResponse {
    pub fn ok(data: serde_json::Value) -> Self {
        Self {
            status: "ok".to_string(),
            data: Some(data),
            error: None,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            data: None,
            error: Some(msg.into()),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn pong() -> Self {
        Self::ok(serde_json::json!({"pong": true}))
    }

    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

/// Everything the dialogue manager needs once a call is closed.
#[derive(Debug, Clone, Serialize)]
pub struct SaveCallResult {
    pub record: CallRecord,
    pub call_saved: bool,
    pub save_outcome: SaveOutcome,
    /// In speaking order: score message, escalation (if any), acknowledgement.
    pub utterances: Vec<String>,
    pub updates: Vec<SlotUpdate>,
}

impl SaveCallResult {
    pub fn new(evaluation: &Evaluation, handoff: HandOff) -> Self {
        let mut utterances = evaluation.utterances();
        utterances.push(handoff.utterance.clone());

        let mut updates = evaluation.slot_updates();
        updates.extend(handoff.slot_updates());

        Self {
            record: handoff.record,
            call_saved: handoff.call_saved,
            save_outcome: handoff.outcome,
            utterances,
            updates,
        }
    }
}
