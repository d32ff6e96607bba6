//! Per-question answer validation.
//!
//! Each question checks the slot it captured, produces exactly one utterance for the
//! patient and exactly one `*_verified` update. A missing or unreadable answer is a
//! normal conversational outcome (re-prompt), never an error.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::ValidatorConfig;
use crate::error::TriageError;
use crate::models::slot::{self, NumericAnswer, SlotSet, SlotUpdate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Question {
    Identity,
    BirthDate,
    PainLevel,
    Medication,
    Transit,
    Mood,
    Fever,
    OtherComplaints,
}

impl Question {
    pub const ALL: [Question; 8] = [
        Question::Identity,
        Question::BirthDate,
        Question::PainLevel,
        Question::Medication,
        Question::Transit,
        Question::Mood,
        Question::Fever,
        Question::OtherComplaints,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Question::Identity => "identity",
            Question::BirthDate => "birth_date",
            Question::PainLevel => "pain_level",
            Question::Medication => "medication",
            Question::Transit => "transit",
            Question::Mood => "mood",
            Question::Fever => "fever",
            Question::OtherComplaints => "other_complaints",
        }
    }

    /// The slot holding the patient's answer.
    pub fn answer_slot(self) -> &'static str {
        match self {
            Question::Identity => slot::PATIENT_CONFIRMED,
            Question::BirthDate => slot::BIRTH_DATE,
            Question::PainLevel => slot::PAIN_LEVEL,
            Question::Medication => slot::MEDICATION_COMPLIANCE,
            Question::Transit => slot::TRANSIT_NORMAL,
            Question::Mood => slot::MOOD_LEVEL,
            Question::Fever => slot::FEVER_PRESENT,
            Question::OtherComplaints => slot::OTHER_COMPLAINTS,
        }
    }

    pub fn verified_slot(self) -> &'static str {
        match self {
            Question::Identity => "identity_verified",
            Question::BirthDate => "birth_date_verified",
            Question::PainLevel => "pain_level_verified",
            Question::Medication => "medication_verified",
            Question::Transit => "transit_verified",
            Question::Mood => "mood_verified",
            Question::Fever => "fever_verified",
            Question::OtherComplaints => "other_complaints_verified",
        }
    }

    pub fn action_name(self) -> String {
        format!("validate_{}", self.as_str())
    }

    /// Prompt replayed when the answer could not be used.
    pub fn reprompt(self) -> &'static str {
        match self {
            Question::Identity => {
                "Je n'ai pas bien compris. Pouvez-vous confirmer votre identité ?"
            }
            Question::BirthDate => {
                "Je n'ai pas bien compris votre date de naissance. Pouvez-vous répéter ?"
            }
            Question::PainLevel => {
                "Je n'ai pas bien compris le niveau de douleur. Pouvez-vous répéter de 0 à 10 ?"
            }
            Question::Medication => {
                "Je n'ai pas bien compris. Prenez-vous vos médicaments comme prescrit ?"
            }
            Question::Transit => {
                "Je n'ai pas bien compris. Allez-vous aux toilettes normalement ?"
            }
            Question::Mood => "Je n'ai pas bien compris. Votre moral aujourd'hui, de 0 à 10 ?",
            Question::Fever => "Je n'ai pas bien compris. Avez-vous de la fièvre ?",
            // Free text is always accepted; kept for completeness.
            Question::OtherComplaints => "Avez-vous d'autres plaintes ?",
        }
    }
}

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Question {
    type Err = TriageError;

    /// Accepts `pain_level`, `validate_pain_level` and `action_validate_pain_level`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        let key = key.strip_prefix("action_").unwrap_or(&key);
        let key = key.strip_prefix("validate_").unwrap_or(key);
        Question::ALL
            .into_iter()
            .find(|q| q.as_str() == key)
            .ok_or_else(|| TriageError::UnknownQuestion(s.to_string()))
    }
}

/// Why an answer was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerIssue {
    MissingAnswer,
    MalformedNumeric,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotValidation {
    pub question: Question,
    pub utterance: String,
    pub verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue: Option<AnswerIssue>,
    pub updates: Vec<SlotUpdate>,
}

impl SlotValidation {
    fn accepted(question: Question, utterance: &str) -> Self {
        Self {
            question,
            utterance: utterance.to_string(),
            verified: true,
            issue: None,
            updates: vec![SlotUpdate::new(question.verified_slot(), true)],
        }
    }

    fn rejected(question: Question, issue: AnswerIssue) -> Self {
        Self {
            question,
            utterance: question.reprompt().to_string(),
            verified: false,
            issue: Some(issue),
            updates: vec![SlotUpdate::new(question.verified_slot(), false)],
        }
    }

    /// Coerced numeric answer written back so later steps see a number.
    fn with_number(mut self, question: Question, value: f64) -> Self {
        self.updates.push(SlotUpdate::new(question.answer_slot(), value));
        self
    }
}

pub fn validate(question: Question, slots: &SlotSet, config: &ValidatorConfig) -> SlotValidation {
    let outcome = match question {
        Question::Identity => truthy_answer(
            question,
            slots,
            "Identité confirmée. Passons à la vérification de votre date de naissance.",
        ),
        Question::BirthDate => truthy_answer(
            question,
            slots,
            "Date de naissance confirmée. Passons aux questions médicales.",
        ),
        Question::Medication => yes_no_answer(
            question,
            slots,
            "Parfait. Passons à la question suivante.",
            "Je note que vous avez des difficultés avec vos médicaments. Passons à la question suivante.",
        ),
        Question::Transit => yes_no_answer(
            question,
            slots,
            "Parfait. Passons à la question suivante.",
            "Je note un problème de transit. Quel est le problème exactement ?",
        ),
        Question::Fever => yes_no_answer(
            question,
            slots,
            "Je note de la fièvre. Quelle est votre température ?",
            "Parfait. Passons à la dernière question.",
        ),
        Question::PainLevel => numeric_answer(question, slots, |pain| {
            if pain > config.high_pain_above {
                "Je note un niveau de douleur élevé. Où avez-vous mal exactement ?"
            } else {
                "Merci. Où avez-vous mal ?"
            }
        }),
        Question::Mood => numeric_answer(question, slots, |mood| {
            if mood < config.low_mood_below {
                "Je note un moral un peu bas. Que ressentez-vous exactement ?"
            } else {
                "Merci. Passons à la question suivante."
            }
        }),
        Question::OtherComplaints => {
            if slots.truthy(slot::OTHER_COMPLAINTS) {
                SlotValidation::accepted(
                    question,
                    "Merci pour ces informations. Je vais maintenant calculer votre score médical.",
                )
            } else {
                SlotValidation::accepted(
                    question,
                    "Parfait. Je vais maintenant calculer votre score médical.",
                )
            }
        }
    };

    tracing::debug!(
        question = %question,
        verified = outcome.verified,
        issue = ?outcome.issue,
        "Answer validated"
    );

    outcome
}

fn truthy_answer(question: Question, slots: &SlotSet, ack: &str) -> SlotValidation {
    if slots.truthy(question.answer_slot()) {
        SlotValidation::accepted(question, ack)
    } else {
        SlotValidation::rejected(question, AnswerIssue::MissingAnswer)
    }
}

/// Presence is enough; `false` is a valid answer that changes only the wording.
fn yes_no_answer(
    question: Question,
    slots: &SlotSet,
    when_true: &str,
    when_false: &str,
) -> SlotValidation {
    match slots.get(question.answer_slot()) {
        Some(value) if value.is_truthy() => SlotValidation::accepted(question, when_true),
        Some(_) => SlotValidation::accepted(question, when_false),
        None => SlotValidation::rejected(question, AnswerIssue::MissingAnswer),
    }
}

fn numeric_answer<'a>(
    question: Question,
    slots: &SlotSet,
    ack: impl FnOnce(f64) -> &'a str,
) -> SlotValidation {
    match slots.number(question.answer_slot()) {
        NumericAnswer::Value(v) => SlotValidation::accepted(question, ack(v)).with_number(question, v),
        NumericAnswer::Malformed => SlotValidation::rejected(question, AnswerIssue::MalformedNumeric),
        NumericAnswer::Absent => SlotValidation::rejected(question, AnswerIssue::MissingAnswer),
    }
}
