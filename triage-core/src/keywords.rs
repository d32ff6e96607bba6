//! Emergency vocabulary matching.
//!
//! Matching is case-insensitive substring containment: a term matches anywhere in
//! the text, including inside longer words ("sang" matches "sangle").

use crate::config::VocabularyConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct KeywordSet {
    name: String,
    terms: Vec<String>,
}

impl KeywordSet {
    pub fn new<I, S>(name: impl Into<String>, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let terms = terms
            .into_iter()
            .map(|t| t.as_ref().trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        Self {
            name: name.into(),
            terms,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// First term (in configured order) contained in `text`.
    pub fn first_match(&self, text: &str) -> Option<&str> {
        if text.trim().is_empty() {
            return None;
        }
        let haystack = text.to_lowercase();
        self.terms
            .iter()
            .find(|term| haystack.contains(term.as_str()))
            .map(String::as_str)
    }

    pub fn matches(&self, text: &str) -> bool {
        self.first_match(text).is_some()
    }
}

/// Both emergency vocabularies, built from one configuration artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct Vocabulary {
    pub version: String,
    pub scoring: KeywordSet,
    pub escalation: KeywordSet,
}

impl From<&VocabularyConfig> for Vocabulary {
    fn from(config: &VocabularyConfig) -> Self {
        Self {
            version: config.version.clone(),
            scoring: KeywordSet::new("scoring", &config.scoring),
            escalation: KeywordSet::new("escalation", &config.escalation),
        }
    }
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::from(&VocabularyConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_is_case_insensitive() {
        let vocab = Vocabulary::default();
        assert!(vocab.scoring.matches("j'ai du SANG dans les selles"));
        assert!(vocab.escalation.matches("Il faut aller à l'HÔPITAL"));
    }

    #[test]
    fn test_first_match_reports_term() {
        let vocab = Vocabulary::default();
        assert_eq!(
            vocab.scoring.first_match("j'ai besoin d'une ambulance"),
            Some("ambulance")
        );
    }

    #[test]
    fn test_empty_text_never_matches() {
        let vocab = Vocabulary::default();
        assert!(!vocab.scoring.matches(""));
        assert!(!vocab.scoring.matches("   "));
    }

    #[test]
    fn test_substring_inside_word_matches() {
        let vocab = Vocabulary::default();
        assert!(vocab.escalation.matches("ma sangle de genou me gêne"));
    }

    #[test]
    fn test_severe_pain_phrase_only_in_scoring_set() {
        let vocab = Vocabulary::default();
        let text = "une douleur forte au ventre";
        assert!(vocab.scoring.matches(text));
        assert!(!vocab.escalation.matches(text));
    }

    #[test]
    fn test_blank_terms_are_dropped() {
        let set = KeywordSet::new("custom", ["", "  Crise  "]);
        assert_eq!(set.terms(), &["crise".to_string()]);
        assert!(!set.matches("rien à signaler"));
    }
}
