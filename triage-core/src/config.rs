use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::error::TriageError;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct TriageConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub validators: ValidatorConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub emergency: EmergencyConfig,
    #[serde(default)]
    pub defaults: AbsenceDefaults,
    #[serde(default)]
    pub vocabulary: VocabularyConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServiceConfig {
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5055,
        }
    }
}

/// Acknowledgement thresholds used by the pain and mood questions.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Pain strictly above this gets the "high pain" acknowledgement.
    pub high_pain_above: f64,
    /// Mood strictly below this gets the "low mood" acknowledgement.
    pub low_mood_below: f64,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            high_pain_above: 7.0,
            low_mood_below: 7.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ScoringConfig {
    pub starting_score: u32,
    pub pain_above: f64,
    pub mood_below: f64,
    pub pain_penalty: u32,
    pub medication_penalty: u32,
    pub transit_penalty: u32,
    pub mood_penalty: u32,
    pub fever_penalty: u32,
    pub keyword_penalty: u32,
    pub bands: CategoryBands,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            starting_score: 100,
            pain_above: 5.0,
            mood_below: 5.0,
            pain_penalty: 20,
            medication_penalty: 15,
            transit_penalty: 10,
            mood_penalty: 15,
            fever_penalty: 20,
            keyword_penalty: 20,
            bands: CategoryBands::default(),
        }
    }
}

/// Lower bounds (inclusive) of the score categories. Anything below `moderate` is poor.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct CategoryBands {
    pub excellent: u32,
    pub good: u32,
    pub moderate: u32,
}

impl Default for CategoryBands {
    fn default() -> Self {
        Self {
            excellent: 80,
            good: 60,
            moderate: 40,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmergencyConfig {
    /// Pain strictly above this escalates immediately.
    pub pain_above: f64,
}

impl Default for EmergencyConfig {
    fn default() -> Self {
        Self { pain_above: 7.0 }
    }
}

/// Values substituted for answers the patient never gave.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct AbsenceDefaults {
    pub pain_level: f64,
    pub mood_level: f64,
    pub medication_compliance: bool,
    pub transit_normal: bool,
    pub fever_present: bool,
    pub other_complaints: String,
}

impl Default for AbsenceDefaults {
    fn default() -> Self {
        Self {
            pain_level: 0.0,
            mood_level: 10.0,
            medication_compliance: false,
            transit_normal: false,
            fever_present: false,
            other_complaints: String::new(),
        }
    }
}

/// Emergency vocabularies. `scoring` feeds the score penalty, `escalation` the
/// immediate emergency flag. They differ on purpose ("douleur forte" only penalizes).
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct VocabularyConfig {
    pub version: String,
    pub scoring: Vec<String>,
    pub escalation: Vec<String>,
}

impl Default for VocabularyConfig {
    fn default() -> Self {
        let escalation: Vec<String> = ["urgence", "ambulance", "hôpital", "sang", "crise"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let scoring = ["urgence", "ambulance", "hôpital", "douleur forte", "sang", "crise"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        Self {
            version: "2024.1".to_string(),
            scoring,
            escalation,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PersistenceConfig {
    /// When false, records are only logged (simulated save).
    pub enabled: bool,
    pub base_url: String,
    pub results_path: String,
    pub emergency_path: String,
    pub timeout_seconds: u64,
    pub max_retries: usize,
    pub retry_delay_ms: u64,
    /// Wait for the backend before acknowledging, instead of handing off in the background.
    pub await_confirmation: bool,
    /// Upper bound on that wait; the delivery continues in the background past it.
    pub confirmation_timeout_ms: u64,
    /// How long shutdown waits for background hand-offs.
    pub drain_timeout_ms: u64,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: "http://backend:3000".to_string(),
            results_path: "/api/calls/results".to_string(),
            emergency_path: "/api/calls/emergency".to_string(),
            timeout_seconds: 10,
            max_retries: 2,
            retry_delay_ms: 500,
            await_confirmation: false,
            confirmation_timeout_ms: 3000,
            drain_timeout_ms: 15_000,
        }
    }
}

impl TriageConfig {
    /// Load from a TOML file (optional) overlaid with `TRIAGE__SECTION__KEY` env vars.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix("TRIAGE").separator("__"))
            .build()?;
        s.try_deserialize()
    }

    /// Load and reject configurations the engine cannot honour.
    pub fn load_validated(path: &str) -> Result<Self, TriageError> {
        let config = Self::load(path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), TriageError> {
        let bands = &self.scoring.bands;
        if !(bands.excellent > bands.good && bands.good > bands.moderate) {
            return Err(TriageError::InvalidConfig(format!(
                "score bands must be strictly descending, got excellent={} good={} moderate={}",
                bands.excellent, bands.good, bands.moderate
            )));
        }
        if self.scoring.starting_score > 100 {
            return Err(TriageError::InvalidConfig(format!(
                "starting_score must be at most 100, got {}",
                self.scoring.starting_score
            )));
        }
        let scoring = &self.scoring;
        for (name, points) in [
            ("pain_penalty", scoring.pain_penalty),
            ("medication_penalty", scoring.medication_penalty),
            ("transit_penalty", scoring.transit_penalty),
            ("mood_penalty", scoring.mood_penalty),
            ("fever_penalty", scoring.fever_penalty),
            ("keyword_penalty", scoring.keyword_penalty),
        ] {
            if points > 100 {
                return Err(TriageError::InvalidConfig(format!(
                    "{} must be at most 100, got {}",
                    name, points
                )));
            }
        }
        if bands.excellent > self.scoring.starting_score {
            return Err(TriageError::InvalidConfig(format!(
                "excellent band ({}) is unreachable from starting_score {}",
                bands.excellent, self.scoring.starting_score
            )));
        }
        if self.vocabulary.scoring.iter().all(|t| t.trim().is_empty())
            || self.vocabulary.escalation.iter().all(|t| t.trim().is_empty())
        {
            return Err(TriageError::InvalidConfig(
                "both emergency vocabularies need at least one term".to_string(),
            ));
        }
        if self.persistence.enabled && self.persistence.base_url.trim().is_empty() {
            return Err(TriageError::InvalidConfig(
                "persistence.base_url is required when persistence is enabled".to_string(),
            ));
        }
        Ok(())
    }
}
