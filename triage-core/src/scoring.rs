//! Health score computation.
//!
//! Score = starting score minus itemized penalties, floor-clamped at 0:
//!   pain > 5            → pain_penalty
//!   medication not taken → medication_penalty
//!   transit not normal   → transit_penalty
//!   mood < 5            → mood_penalty
//!   fever               → fever_penalty
//!   scoring keyword hit  → keyword_penalty
//!
//! Categories (first match wins): ≥80 excellent, ≥60 good, ≥40 moderate, else poor.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::{AbsenceDefaults, CategoryBands, ScoringConfig};
use crate::keywords::KeywordSet;
use crate::models::slot::{self, NumericAnswer, SlotSet, SlotUpdate};

// ============================================================================
// Inputs
// ============================================================================

/// Clinical answers with the absence policy already applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringInputs {
    pub pain_level: f64,
    pub medication_compliance: bool,
    pub transit_normal: bool,
    pub mood_level: f64,
    pub fever_present: bool,
    pub other_complaints: String,
}

impl ScoringInputs {
    pub fn from_slots(slots: &SlotSet, defaults: &AbsenceDefaults) -> Self {
        Self {
            pain_level: number_or(slots, slot::PAIN_LEVEL, defaults.pain_level),
            medication_compliance: bool_or(
                slots,
                slot::MEDICATION_COMPLIANCE,
                defaults.medication_compliance,
            ),
            transit_normal: bool_or(slots, slot::TRANSIT_NORMAL, defaults.transit_normal),
            mood_level: number_or(slots, slot::MOOD_LEVEL, defaults.mood_level),
            fever_present: bool_or(slots, slot::FEVER_PRESENT, defaults.fever_present),
            other_complaints: slots
                .text(slot::OTHER_COMPLAINTS)
                .map(str::to_string)
                .unwrap_or_else(|| defaults.other_complaints.clone()),
        }
    }
}

/// Numeric slot with its default when absent. Unreadable answers also fall back.
pub(crate) fn number_or(slots: &SlotSet, name: &str, default: f64) -> f64 {
    match slots.number(name) {
        NumericAnswer::Value(v) => v,
        NumericAnswer::Absent => default,
        NumericAnswer::Malformed => {
            tracing::warn!(slot = name, default, "Unreadable numeric answer, using default");
            default
        }
    }
}

pub(crate) fn bool_or(slots: &SlotSet, name: &str, default: bool) -> bool {
    match slots.get(name) {
        Some(value) => value.is_truthy(),
        None => default,
    }
}

// ============================================================================
// Category
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreCategory {
    Excellent,
    Good,
    Moderate,
    Poor,
}

impl ScoreCategory {
    pub fn from_score(score: u32, bands: &CategoryBands) -> Self {
        if score >= bands.excellent {
            ScoreCategory::Excellent
        } else if score >= bands.good {
            ScoreCategory::Good
        } else if score >= bands.moderate {
            ScoreCategory::Moderate
        } else {
            ScoreCategory::Poor
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ScoreCategory::Excellent => "excellent",
            ScoreCategory::Good => "good",
            ScoreCategory::Moderate => "moderate",
            ScoreCategory::Poor => "poor",
        }
    }

    /// Message read to the patient once the score is known.
    pub fn message(self, score: u32) -> String {
        match self {
            ScoreCategory::Excellent => format!(
                "Excellent ! Votre score médical est de {}/100. Votre état de santé est très bon.",
                score
            ),
            ScoreCategory::Good => format!(
                "Bien ! Votre score médical est de {}/100. Votre état de santé est correct.",
                score
            ),
            ScoreCategory::Moderate => format!(
                "Votre score médical est de {}/100. Une surveillance est recommandée.",
                score
            ),
            ScoreCategory::Poor => format!(
                "Votre score médical est de {}/100. Une attention médicale est requise.",
                score
            ),
        }
    }
}

impl fmt::Display for ScoreCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Breakdown + outcome
// ============================================================================

/// Itemized penalties. Zero means the condition did not apply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScoreBreakdown {
    pub starting_score: u32,
    pub pain: u32,
    pub medication: u32,
    pub transit: u32,
    pub mood: u32,
    pub fever: u32,
    pub keyword: u32,
}

impl ScoreBreakdown {
    pub fn total(&self) -> u32 {
        [self.pain, self.medication, self.transit, self.mood, self.fever, self.keyword]
            .into_iter()
            .fold(0u32, u32::saturating_add)
    }

    pub fn final_score(&self) -> u32 {
        self.starting_score.min(100).saturating_sub(self.total())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreOutcome {
    pub breakdown: ScoreBreakdown,
    pub final_score: u32,
    pub category: ScoreCategory,
    pub message: String,
}

impl ScoreOutcome {
    pub fn slot_updates(&self) -> Vec<SlotUpdate> {
        vec![
            SlotUpdate::new(slot::MEDICAL_SCORE, self.final_score),
            SlotUpdate::new(slot::SCORE_CATEGORY, self.category.as_str()),
        ]
    }
}

pub fn breakdown(inputs: &ScoringInputs, config: &ScoringConfig, keywords: &KeywordSet) -> ScoreBreakdown {
    let penalty = |applies: bool, points: u32| if applies { points } else { 0 };

    ScoreBreakdown {
        starting_score: config.starting_score,
        pain: penalty(inputs.pain_level > config.pain_above, config.pain_penalty),
        medication: penalty(!inputs.medication_compliance, config.medication_penalty),
        transit: penalty(!inputs.transit_normal, config.transit_penalty),
        mood: penalty(inputs.mood_level < config.mood_below, config.mood_penalty),
        fever: penalty(inputs.fever_present, config.fever_penalty),
        keyword: penalty(keywords.matches(&inputs.other_complaints), config.keyword_penalty),
    }
}

/// Pure and deterministic: identical slots always give the identical outcome.
pub fn score(
    slots: &SlotSet,
    config: &ScoringConfig,
    defaults: &AbsenceDefaults,
    keywords: &KeywordSet,
) -> ScoreOutcome {
    let inputs = ScoringInputs::from_slots(slots, defaults);
    let breakdown = breakdown(&inputs, config, keywords);
    let final_score = breakdown.final_score();
    let category = ScoreCategory::from_score(final_score, &config.bands);

    tracing::info!(
        score = final_score,
        category = %category,
        penalties = breakdown.total(),
        "Medical score computed"
    );

    ScoreOutcome {
        breakdown,
        final_score,
        category,
        message: category.message(final_score),
    }
}
