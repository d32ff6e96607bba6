use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::emergency::EmergencyOutcome;
use crate::models::slot::{self, SlotSet, SlotValue};
use crate::scoring::{ScoreCategory, ScoreOutcome};

/// Final snapshot of one call, handed by value to the persistence collaborator.
///
/// Raw answers are kept as captured; the derived fields are always present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_id: Option<Uuid>,
    pub timestamp: DateTime<Utc>,
    pub patient_confirmed: Option<SlotValue>,
    pub birth_date: Option<SlotValue>,
    pub pain_level: Option<SlotValue>,
    pub pain_location: Option<SlotValue>,
    pub medication_compliance: Option<SlotValue>,
    pub transit_normal: Option<SlotValue>,
    pub transit_problem: Option<SlotValue>,
    pub mood_level: Option<SlotValue>,
    pub mood_details: Option<SlotValue>,
    pub fever_present: Option<SlotValue>,
    pub temperature: Option<SlotValue>,
    pub other_complaints: Option<SlotValue>,
    pub medical_score: u32,
    pub score_category: ScoreCategory,
    pub emergency_detected: bool,
}

impl CallRecord {
    pub fn assemble(
        slots: &SlotSet,
        score: &ScoreOutcome,
        emergency: &EmergencyOutcome,
        call_id: Option<Uuid>,
    ) -> Self {
        Self::assemble_at(slots, score, emergency, call_id, Utc::now())
    }

    pub fn assemble_at(
        slots: &SlotSet,
        score: &ScoreOutcome,
        emergency: &EmergencyOutcome,
        call_id: Option<Uuid>,
        collected_at: DateTime<Utc>,
    ) -> Self {
        let raw = |name: &str| slots.get(name).cloned();

        Self {
            call_id,
            timestamp: collected_at,
            patient_confirmed: raw(slot::PATIENT_CONFIRMED),
            birth_date: raw(slot::BIRTH_DATE),
            pain_level: raw(slot::PAIN_LEVEL),
            pain_location: raw(slot::PAIN_LOCATION),
            medication_compliance: raw(slot::MEDICATION_COMPLIANCE),
            transit_normal: raw(slot::TRANSIT_NORMAL),
            transit_problem: raw(slot::TRANSIT_PROBLEM),
            mood_level: raw(slot::MOOD_LEVEL),
            mood_details: raw(slot::MOOD_DETAILS),
            fever_present: raw(slot::FEVER_PRESENT),
            temperature: raw(slot::TEMPERATURE),
            other_complaints: raw(slot::OTHER_COMPLAINTS),
            medical_score: score.final_score,
            score_category: score.category,
            emergency_detected: emergency.detected,
        }
    }
}
