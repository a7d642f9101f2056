//! English-requirement classification and search-intent scoring.
//!
//! Both are pure functions of the posting text. A [`Classifier`] is built once
//! from an immutable [`KeywordConfig`] and can be shared freely across tasks.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};
use utoipa::ToSchema;

const TITLE_WEIGHT: u32 = 2;
const DESCRIPTION_WEIGHT: u32 = 1;

/// Phrase lists the classifier matches against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordConfig {
    pub english_required: Vec<String>,
    pub negation: Vec<String>,
}

impl Default for KeywordConfig {
    fn default() -> Self {
        let english_required = [
            "english required",
            "fluent english",
            "b2 english",
            "english b2",
            "advanced english",
            "english proficiency",
            "english speaking",
            "native english",
            "business english",
            "bilingual",
            "inglés avanzado",
            "inglés fluido",
            "inglés intermedio",
            "nivel de inglés",
            "inglés b2",
            "b2",
            "c1",
            "international team",
            "global team",
        ];
        let negation = [
            "no english required",
            "english not required",
            "spanish only",
            "no se requiere inglés",
            "sin requisito de inglés",
            "inglés no excluyente",
            "inglés no requerido",
            "100% en español",
            "solo español",
        ];

        Self {
            english_required: english_required.iter().map(|s| s.to_string()).collect(),
            negation: negation.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ClassificationResult {
    pub requires_english: bool,
    /// Ranking heuristic in `0.0..=100.0`.
    pub match_score: f64,
    /// Matched phrases from both keyword sets, sorted and unique.
    pub language_signals: Vec<String>,
}

impl ClassificationResult {
    pub fn empty() -> Self {
        Self {
            requires_english: false,
            match_score: 0.0,
            language_signals: Vec::new(),
        }
    }
}

/// The search terms a scrape run was issued for, tokenized once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchIntent {
    tokens: Vec<String>,
}

impl SearchIntent {
    pub fn new(query: &str) -> Self {
        let mut seen = HashSet::new();
        let tokens = tokenize(&fold_text(query))
            .into_iter()
            .filter(|token| seen.insert(token.clone()))
            .collect();
        Self { tokens }
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[derive(Debug, Clone)]
struct Phrase {
    label: String,
    folded: String,
}

/// Keyword classifier for the English requirement, built once from a
/// [`KeywordConfig`] and shared read-only.
#[derive(Debug, Clone)]
pub struct Classifier {
    english_required: Vec<Phrase>,
    negation: Vec<Phrase>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(&KeywordConfig::default())
    }
}

impl Classifier {
    pub fn new(config: &KeywordConfig) -> Self {
        Self {
            english_required: compile_phrases(&config.english_required),
            negation: compile_phrases(&config.negation),
        }
    }

    /// Classifies one posting against the search intent. Never fails; empty
    /// text yields the no-evidence result.
    pub fn classify(
        &self,
        title: &str,
        description: &str,
        intent: &SearchIntent,
    ) -> ClassificationResult {
        let description = fold_text(description);
        if description.is_empty() {
            return ClassificationResult::empty();
        }
        let title = fold_text(title);
        let combined = format!("{} {}", title, description);

        let negations = matched_labels(&self.negation, &combined);
        let required = matched_labels(&self.english_required, &combined);
        let requires_english = negations.is_empty() && !required.is_empty();

        let mut language_signals: Vec<String> = negations.into_iter().chain(required).collect();
        language_signals.sort();
        language_signals.dedup();

        ClassificationResult {
            requires_english,
            match_score: match_score(&title, &description, intent),
            language_signals,
        }
    }
}

/// NFKC, lowercase, whitespace collapsed to single spaces.
pub fn normalize_text(input: &str) -> String {
    let lowered: String = input.nfkc().collect::<String>().to_lowercase();
    lowered.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// [`normalize_text`] with diacritics stripped, used for matching only.
pub fn fold_text(input: &str) -> String {
    normalize_text(input)
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .collect()
}

fn compile_phrases(raw: &[String]) -> Vec<Phrase> {
    let mut seen = HashSet::new();
    raw.iter()
        .filter_map(|label| {
            let label = label.trim();
            let folded = fold_text(label);
            if folded.is_empty() || !seen.insert(folded.clone()) {
                return None;
            }
            Some(Phrase {
                label: label.to_string(),
                folded,
            })
        })
        .collect()
}

fn matched_labels(phrases: &[Phrase], haystack: &str) -> Vec<String> {
    phrases
        .iter()
        .filter(|phrase| contains_phrase(haystack, &phrase.folded))
        .map(|phrase| phrase.label.clone())
        .collect()
}

/// Substring match that refuses to split a word on either side.
fn contains_phrase(haystack: &str, needle: &str) -> bool {
    let starts_alnum = needle.chars().next().is_some_and(char::is_alphanumeric);
    let ends_alnum = needle.chars().next_back().is_some_and(char::is_alphanumeric);

    haystack.match_indices(needle).any(|(start, matched)| {
        let end = start + matched.len();
        let before_ok = !starts_alnum
            || haystack[..start]
                .chars()
                .next_back()
                .map_or(true, |c| !c.is_alphanumeric());
        let after_ok = !ends_alnum
            || haystack[end..]
                .chars()
                .next()
                .map_or(true, |c| !c.is_alphanumeric());
        before_ok && after_ok
    })
}

fn tokenize(folded: &str) -> Vec<String> {
    folded
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

fn match_score(title: &str, description: &str, intent: &SearchIntent) -> f64 {
    if intent.is_empty() {
        return 0.0;
    }

    let title_tokens: HashSet<String> = tokenize(title).into_iter().collect();
    let description_tokens: HashSet<String> = tokenize(description).into_iter().collect();

    let earned: u32 = intent
        .tokens()
        .iter()
        .map(|token| {
            let mut points = 0;
            if title_tokens.contains(token) {
                points += TITLE_WEIGHT;
            }
            if description_tokens.contains(token) {
                points += DESCRIPTION_WEIGHT;
            }
            points
        })
        .sum();
    let max = (TITLE_WEIGHT + DESCRIPTION_WEIGHT) * intent.tokens().len() as u32;

    round2(f64::from(earned) / f64::from(max) * 100.0)
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn devops() -> SearchIntent {
        SearchIntent::new("DevOps")
    }

    #[test]
    fn classification_is_deterministic() {
        let classifier = Classifier::default();
        let a = classifier.classify(
            "Senior DevOps",
            "Fluent English and Kubernetes experience",
            &devops(),
        );
        let b = classifier.classify(
            "Senior DevOps",
            "Fluent English and Kubernetes experience",
            &devops(),
        );
        assert_eq!(a, b);
        assert!(a.requires_english);
    }

    #[test]
    fn negation_wins_over_positive_matches() {
        let result = Classifier::default().classify(
            "Platform Engineer",
            "No English required. Fluent English is a plus for the global team.",
            &devops(),
        );
        assert!(!result.requires_english);
        assert!(result
            .language_signals
            .contains(&"no english required".to_string()));
        assert!(result.language_signals.contains(&"fluent english".to_string()));
    }

    #[test]
    fn empty_text_yields_empty_result() {
        let result = Classifier::default().classify("", "", &devops());
        assert_eq!(result, ClassificationResult::empty());

        let result = Classifier::default().classify("English required", "   \n\t ", &devops());
        assert_eq!(result, ClassificationResult::empty());
    }

    #[test]
    fn spanish_advanced_english_with_level() {
        let result = Classifier::default().classify(
            "DevOps Engineer",
            "Se requiere inglés avanzado (B2)",
            &devops(),
        );
        assert!(result.requires_english);
        assert!(result.language_signals.contains(&"inglés avanzado".to_string()));
        assert!(result.language_signals.contains(&"b2".to_string()));
    }

    #[test]
    fn spanish_negation_without_positive_keywords() {
        let result = Classifier::default().classify(
            "SRE",
            "No se requiere inglés, trabajo 100% en español",
            &devops(),
        );
        assert!(!result.requires_english);
        assert!(result
            .language_signals
            .contains(&"no se requiere inglés".to_string()));
        assert!(result.language_signals.contains(&"100% en español".to_string()));
    }

    #[test]
    fn no_evidence_defaults_to_not_required() {
        let result = Classifier::default().classify(
            "DevOps Engineer",
            "Terraform, AWS y Kubernetes. Trabajo remoto.",
            &devops(),
        );
        assert!(!result.requires_english);
        assert!(result.language_signals.is_empty());
    }

    #[test]
    fn matching_ignores_case_accents_and_spacing() {
        let result = Classifier::default().classify(
            "DEVOPS",
            "Buscamos   INGLES\u{00a0}AVANZADO para el equipo",
            &devops(),
        );
        assert!(result.requires_english);
        assert_eq!(result.language_signals, vec!["inglés avanzado".to_string()]);
    }

    #[test]
    fn phrases_respect_word_boundaries() {
        let result = Classifier::default().classify(
            "Cloud Engineer",
            "Experiencia en plataformas B2B y C1000 switches",
            &devops(),
        );
        assert!(!result.requires_english);
        assert!(result.language_signals.is_empty());
    }

    #[test]
    fn fullwidth_text_is_normalized() {
        let result = Classifier::default().classify(
            "DevOps",
            "Ｆｌｕｅｎｔ Ｅｎｇｌｉｓｈ needed",
            &devops(),
        );
        assert!(result.requires_english);
    }

    #[test]
    fn keyword_sets_are_swappable_per_instance() {
        let classifier = Classifier::new(&KeywordConfig {
            english_required: vec!["anglais courant".into()],
            negation: vec![],
        });
        let result = classifier.classify("DevOps", "Anglais courant exigé", &devops());
        assert!(result.requires_english);

        let default_result =
            Classifier::default().classify("DevOps", "Anglais courant exigé", &devops());
        assert!(!default_result.requires_english);
    }

    #[test]
    fn match_score_weights_title_over_description() {
        let classifier = Classifier::default();
        let intent = SearchIntent::new("DevOps Engineer");

        let both = classifier.classify("DevOps Engineer", "devops engineer wanted", &intent);
        assert_eq!(both.match_score, 100.0);

        let title_only = classifier.classify("DevOps Engineer", "Kubernetes", &intent);
        assert_eq!(title_only.match_score, 66.67);

        let description_only = classifier.classify("SRE", "DevOps culture", &intent);
        assert_eq!(description_only.match_score, 16.67);

        let none = classifier.classify("SRE", "Kubernetes", &intent);
        assert_eq!(none.match_score, 0.0);
    }

    #[test]
    fn empty_intent_scores_zero() {
        let result =
            Classifier::default().classify("DevOps", "DevOps role", &SearchIntent::new("  "));
        assert_eq!(result.match_score, 0.0);
    }

    #[test]
    fn search_intent_dedupes_tokens() {
        let intent = SearchIntent::new("DevOps devops / Ingeniería");
        assert_eq!(intent.tokens(), &["devops".to_string(), "ingenieria".to_string()]);
    }

    #[test]
    fn normalize_collapses_whitespace() {
        assert_eq!(normalize_text("  Fluent\n\tENGLISH  "), "fluent english");
        assert_eq!(fold_text("Inglés  Avanzado"), "ingles avanzado");
    }
}
