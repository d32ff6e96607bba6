//! Emergency escalation.
//!
//! Evaluated on raw symptoms, never on the composite score, so a single critical
//! answer cannot be diluted by otherwise mild ones.

use serde::Serialize;

use crate::config::{AbsenceDefaults, EmergencyConfig};
use crate::keywords::KeywordSet;
use crate::models::slot::{self, SlotSet, SlotUpdate};
use crate::scoring::{bool_or, number_or};

pub const ESCALATION_UTTERANCE: &str =
    "URGENCE DÉTECTÉE ! Vous allez être transféré vers les services d'urgence immédiatement.";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EmergencyReason {
    SeverePain { level: f64 },
    Fever,
    Keyword { term: String },
}

impl EmergencyReason {
    pub fn label(&self) -> &'static str {
        match self {
            EmergencyReason::SeverePain { .. } => "severe_pain",
            EmergencyReason::Fever => "fever",
            EmergencyReason::Keyword { .. } => "keyword",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmergencyOutcome {
    pub detected: bool,
    pub reasons: Vec<EmergencyReason>,
    /// Only present when an emergency was detected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utterance: Option<String>,
}

impl EmergencyOutcome {
    pub fn slot_updates(&self) -> Vec<SlotUpdate> {
        vec![SlotUpdate::new(slot::EMERGENCY_DETECTED, self.detected)]
    }

    /// Comma-separated rule labels, e.g. `severe_pain,fever`.
    pub fn summary(&self) -> String {
        self.reasons
            .iter()
            .map(EmergencyReason::label)
            .collect::<Vec<_>>()
            .join(",")
    }
}

pub fn assess(
    slots: &SlotSet,
    config: &EmergencyConfig,
    keywords: &KeywordSet,
    defaults: &AbsenceDefaults,
) -> EmergencyOutcome {
    let mut reasons = Vec::new();

    let pain = number_or(slots, slot::PAIN_LEVEL, defaults.pain_level);
    if pain > config.pain_above {
        reasons.push(EmergencyReason::SeverePain { level: pain });
    }

    if bool_or(slots, slot::FEVER_PRESENT, defaults.fever_present) {
        reasons.push(EmergencyReason::Fever);
    }

    let complaints = slots
        .text(slot::OTHER_COMPLAINTS)
        .unwrap_or(defaults.other_complaints.as_str());
    if let Some(term) = keywords.first_match(complaints) {
        reasons.push(EmergencyReason::Keyword {
            term: term.to_string(),
        });
    }

    let detected = !reasons.is_empty();
    let outcome = EmergencyOutcome {
        detected,
        utterance: detected.then(|| ESCALATION_UTTERANCE.to_string()),
        reasons,
    };

    if outcome.detected {
        tracing::warn!(reasons = %outcome.summary(), "Emergency detected, escalating call");
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keywords::Vocabulary;

    fn run(slots: &SlotSet) -> EmergencyOutcome {
        assess(
            slots,
            &EmergencyConfig::default(),
            &Vocabulary::default().escalation,
            &AbsenceDefaults::default(),
        )
    }

    #[test]
    fn test_calm_call_is_silent() {
        let outcome = run(&SlotSet::new().with(slot::PAIN_LEVEL, 3.0));
        assert!(!outcome.detected);
        assert!(outcome.utterance.is_none());
        assert!(outcome.reasons.is_empty());
        assert_eq!(outcome.slot_updates()[0], SlotUpdate::new(slot::EMERGENCY_DETECTED, false));
    }

    #[test]
    fn test_pain_above_seven_escalates() {
        let outcome = run(&SlotSet::new().with(slot::PAIN_LEVEL, 8.0));
        assert!(outcome.detected);
        assert_eq!(outcome.utterance.as_deref(), Some(ESCALATION_UTTERANCE));
        assert_eq!(outcome.reasons, vec![EmergencyReason::SeverePain { level: 8.0 }]);

        assert!(!run(&SlotSet::new().with(slot::PAIN_LEVEL, 7.0)).detected);
    }

    #[test]
    fn test_fever_escalates() {
        let outcome = run(&SlotSet::new().with(slot::FEVER_PRESENT, true));
        assert!(outcome.detected);
        assert_eq!(outcome.summary(), "fever");
    }

    #[test]
    fn test_keyword_escalates_case_insensitively() {
        let outcome = run(&SlotSet::new().with(slot::OTHER_COMPLAINTS, "du SANG partout"));
        assert_eq!(
            outcome.reasons,
            vec![EmergencyReason::Keyword {
                term: "sang".to_string()
            }]
        );
    }

    #[test]
    fn test_severe_pain_phrase_does_not_escalate() {
        let outcome = run(&SlotSet::new().with(slot::OTHER_COMPLAINTS, "une douleur forte"));
        assert!(!outcome.detected);
    }

    #[test]
    fn test_all_reasons_are_reported() {
        let slots = SlotSet::new()
            .with(slot::PAIN_LEVEL, "9")
            .with(slot::FEVER_PRESENT, true)
            .with(slot::OTHER_COMPLAINTS, "crise");
        assert_eq!(run(&slots).summary(), "severe_pain,fever,keyword");
    }

    #[test]
    fn test_empty_session_uses_defaults() {
        assert!(!run(&SlotSet::new()).detected);
    }
}
