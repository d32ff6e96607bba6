//! Slot model: the named answers captured from the patient during one call.
//!
//! The dialogue manager hands us a JSON object of slot name → value. JSON `null`
//! and a missing key are both treated as "absent".

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const PATIENT_CONFIRMED: &str = "patient_confirmed";
pub const BIRTH_DATE: &str = "birth_date";
pub const PAIN_LEVEL: &str = "pain_level";
pub const PAIN_LOCATION: &str = "pain_location";
pub const MEDICATION_COMPLIANCE: &str = "medication_compliance";
pub const TRANSIT_NORMAL: &str = "transit_normal";
pub const TRANSIT_PROBLEM: &str = "transit_problem";
pub const MOOD_LEVEL: &str = "mood_level";
pub const MOOD_DETAILS: &str = "mood_details";
pub const FEVER_PRESENT: &str = "fever_present";
pub const TEMPERATURE: &str = "temperature";
pub const OTHER_COMPLAINTS: &str = "other_complaints";

pub const MEDICAL_SCORE: &str = "medical_score";
pub const SCORE_CATEGORY: &str = "score_category";
pub const EMERGENCY_DETECTED: &str = "emergency_detected";
pub const CALL_SAVED: &str = "call_saved";

/// A single captured answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SlotValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl SlotValue {
    /// Truthiness of a captured answer: `false`, `0` and blank text are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            SlotValue::Bool(b) => *b,
            SlotValue::Number(n) => *n != 0.0,
            SlotValue::Text(s) => !s.trim().is_empty(),
        }
    }

    /// Numeric interpretation. Text accepts a decimal comma ("7,5").
    pub fn as_number(&self) -> NumericAnswer {
        match self {
            SlotValue::Number(n) if n.is_finite() => NumericAnswer::Value(*n),
            SlotValue::Number(_) | SlotValue::Bool(_) => NumericAnswer::Malformed,
            SlotValue::Text(s) => match s.trim().replace(',', ".").parse::<f64>() {
                Ok(n) if n.is_finite() => NumericAnswer::Value(n),
                _ => NumericAnswer::Malformed,
            },
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            SlotValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for SlotValue {
    fn from(v: bool) -> Self {
        SlotValue::Bool(v)
    }
}

impl From<f64> for SlotValue {
    fn from(v: f64) -> Self {
        SlotValue::Number(v)
    }
}

impl From<u32> for SlotValue {
    fn from(v: u32) -> Self {
        SlotValue::Number(f64::from(v))
    }
}

impl From<&str> for SlotValue {
    fn from(v: &str) -> Self {
        SlotValue::Text(v.to_string())
    }
}

impl From<String> for SlotValue {
    fn from(v: String) -> Self {
        SlotValue::Text(v)
    }
}

/// Result of reading a slot that must hold a number.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumericAnswer {
    Absent,
    Malformed,
    Value(f64),
}

impl NumericAnswer {
    pub fn value(self) -> Option<f64> {
        match self {
            NumericAnswer::Value(v) => Some(v),
            _ => None,
        }
    }
}

/// A mutation reported back to the dialogue manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotUpdate {
    pub name: String,
    pub value: SlotValue,
}

impl SlotUpdate {
    pub fn new(name: impl Into<String>, value: impl Into<SlotValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// All slots of one call session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<String, Option<SlotValue>>",
    into = "BTreeMap<String, SlotValue>"
)]
pub struct SlotSet {
    values: BTreeMap<String, SlotValue>,
}

impl SlotSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&SlotValue> {
        self.values.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<SlotValue>) {
        self.values.insert(name.into(), value.into());
    }

    /// Builder-style `set`, handy when constructing a session from known answers.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<SlotValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn apply(&mut self, updates: &[SlotUpdate]) {
        for update in updates {
            self.values.insert(update.name.clone(), update.value.clone());
        }
    }

    pub fn truthy(&self, name: &str) -> bool {
        self.get(name).is_some_and(SlotValue::is_truthy)
    }

    pub fn number(&self, name: &str) -> NumericAnswer {
        self.get(name)
            .map_or(NumericAnswer::Absent, SlotValue::as_number)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(SlotValue::as_text)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<BTreeMap<String, Option<SlotValue>>> for SlotSet {
    fn from(raw: BTreeMap<String, Option<SlotValue>>) -> Self {
        Self {
            values: raw
                .into_iter()
                .filter_map(|(name, value)| value.map(|v| (name, v)))
                .collect(),
        }
    }
}

impl From<SlotSet> for BTreeMap<String, SlotValue> {
    fn from(slots: SlotSet) -> Self {
        slots.values
    }
}
