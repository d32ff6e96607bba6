//! Triage pipeline: validate answers → score → detect emergency → assemble record.
//!
//! `TriageEngine` is immutable and shared (behind an `Arc`) by every call; each
//! `CallSession` exclusively owns its slots and derived outcomes.

use std::sync::Arc;

use uuid::Uuid;

use crate::config::TriageConfig;
use crate::emergency::{self, EmergencyOutcome};
use crate::keywords::Vocabulary;
use crate::models::record::CallRecord;
use crate::models::slot::{SlotSet, SlotUpdate, SlotValue};
use crate::scoring::{self, ScoreOutcome};
use crate::validators::{self, Question, SlotValidation};

#[derive(Debug, Clone)]
pub struct TriageEngine {
    config: TriageConfig,
    vocabulary: Vocabulary,
}

impl TriageEngine {
    pub fn new(config: TriageConfig) -> Self {
        let vocabulary = Vocabulary::from(&config.vocabulary);
        tracing::debug!(
            version = %vocabulary.version,
            scoring_terms = vocabulary.scoring.terms().len(),
            escalation_terms = vocabulary.escalation.terms().len(),
            "Emergency vocabulary loaded"
        );
        Self { config, vocabulary }
    }

    pub fn config(&self) -> &TriageConfig {
        &self.config
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn validate(&self, question: Question, slots: &SlotSet) -> SlotValidation {
        validators::validate(question, slots, &self.config.validators)
    }

    pub fn score(&self, slots: &SlotSet) -> ScoreOutcome {
        scoring::score(
            slots,
            &self.config.scoring,
            &self.config.defaults,
            &self.vocabulary.scoring,
        )
    }

    pub fn detect_emergency(&self, slots: &SlotSet) -> EmergencyOutcome {
        emergency::assess(
            slots,
            &self.config.emergency,
            &self.vocabulary.escalation,
            &self.config.defaults,
        )
    }

    /// Score, escalate and snapshot in one go, for sessions that were never driven
    /// step by step.
    pub fn evaluate(&self, slots: &SlotSet, call_id: Option<Uuid>) -> Evaluation {
        let score = self.score(slots);
        let emergency = self.detect_emergency(slots);
        let record = CallRecord::assemble(slots, &score, &emergency, call_id);
        Evaluation {
            score,
            emergency,
            record,
        }
    }
}

impl Default for TriageEngine {
    fn default() -> Self {
        Self::new(TriageConfig::default())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub score: ScoreOutcome,
    pub emergency: EmergencyOutcome,
    pub record: CallRecord,
}

impl Evaluation {
    /// Utterances in the order the patient hears them.
    pub fn utterances(&self) -> Vec<String> {
        let mut out = vec![self.score.message.clone()];
        out.extend(self.emergency.utterance.clone());
        out
    }

    pub fn slot_updates(&self) -> Vec<SlotUpdate> {
        let mut updates = self.score.slot_updates();
        updates.extend(self.emergency.slot_updates());
        updates
    }
}

/// One phone call. Validators run strictly one at a time on `&mut self`.
#[derive(Debug)]
pub struct CallSession {
    engine: Arc<TriageEngine>,
    call_id: Option<Uuid>,
    slots: SlotSet,
    score: Option<ScoreOutcome>,
    emergency: Option<EmergencyOutcome>,
}

impl CallSession {
    pub fn new(engine: Arc<TriageEngine>) -> Self {
        Self::with_slots(engine, SlotSet::new())
    }

    pub fn with_slots(engine: Arc<TriageEngine>, slots: SlotSet) -> Self {
        Self {
            engine,
            call_id: None,
            slots,
            score: None,
            emergency: None,
        }
    }

    pub fn with_call_id(mut self, call_id: Uuid) -> Self {
        self.call_id = Some(call_id);
        self
    }

    pub fn call_id(&self) -> Option<Uuid> {
        self.call_id
    }

    pub fn slots(&self) -> &SlotSet {
        &self.slots
    }

    /// Record an extracted answer. Invalidates any outcome computed from older answers.
    pub fn answer(&mut self, name: impl Into<String>, value: impl Into<SlotValue>) {
        self.slots.set(name, value);
        self.score = None;
        self.emergency = None;
    }

    pub fn validate(&mut self, question: Question) -> SlotValidation {
        let validation = self.engine.validate(question, &self.slots);
        self.slots.apply(&validation.updates);
        validation
    }

    pub fn score(&mut self) -> &ScoreOutcome {
        let outcome = self.engine.score(&self.slots);
        self.slots.apply(&outcome.slot_updates());
        self.score.insert(outcome)
    }

    pub fn detect_emergency(&mut self) -> &EmergencyOutcome {
        let outcome = self.engine.detect_emergency(&self.slots);
        self.slots.apply(&outcome.slot_updates());
        self.emergency.insert(outcome)
    }

    /// Snapshot the call. Steps not yet run are computed now from whatever was
    /// captured, so an interrupted call still yields a complete record.
    pub fn assemble(&mut self) -> CallRecord {
        let (score, emergency) = self.outcomes();
        CallRecord::assemble(&self.slots, &score, &emergency, self.call_id)
    }

    pub fn emergency(&self) -> Option<&EmergencyOutcome> {
        self.emergency.as_ref()
    }

    /// Consume the session, returning the record and the emergency outcome it was built from.
    pub fn finish(mut self) -> (CallRecord, EmergencyOutcome) {
        let (score, emergency) = self.outcomes();
        let record = CallRecord::assemble(&self.slots, &score, &emergency, self.call_id);
        (record, emergency)
    }

    fn outcomes(&mut self) -> (ScoreOutcome, EmergencyOutcome) {
        let score = match self.score.clone() {
            Some(score) => score,
            None => self.score().clone(),
        };
        let emergency = match self.emergency.clone() {
            Some(emergency) => emergency,
            None => self.detect_emergency().clone(),
        };
        (score, emergency)
    }
}
