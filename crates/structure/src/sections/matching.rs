//! Keyword matching stages.
//!
//! Each stage is a pure function from a normalized line and the normalized
//! patterns of one section type to an optional match. Stages are tried in
//! [`STAGES`] order; a weaker stage only runs when the stronger ones found no
//! acceptable candidate anywhere in the document.

use strsim::normalized_levenshtein;

use crate::config::BoundaryConfig;
use crate::types::MatchMethod;

/// A pattern hit produced by one stage.
#[derive(Debug, Clone, PartialEq)]
pub struct StageMatch {
    pub method: MatchMethod,
    /// Index into the pattern list.
    pub pattern: usize,
    /// Method sub-score in `[0, 1]`.
    pub strength: f32,
}

pub type Stage = fn(&str, &[String], &BoundaryConfig) -> Option<StageMatch>;

/// All stages, strongest first.
pub const STAGES: [Stage; 3] = [exact_stage, partial_stage, fuzzy_stage];

/// Whole-line equality after normalization.
pub fn exact_stage(line: &str, patterns: &[String], config: &BoundaryConfig) -> Option<StageMatch> {
    patterns
        .iter()
        .position(|p| !p.is_empty() && p == line)
        .map(|pattern| StageMatch {
            method: MatchMethod::Exact,
            pattern,
            strength: config.exact_strength,
        })
}

/// The line contains the pattern as a phrase, or contains enough of the
/// pattern's tokens.
pub fn partial_stage(line: &str, patterns: &[String], config: &BoundaryConfig) -> Option<StageMatch> {
    let line_tokens: Vec<&str> = line.split_whitespace().collect();
    best_of(patterns, |pattern| {
        let overlap = if contains_phrase(line, pattern) {
            1.0
        } else {
            token_overlap(&line_tokens, pattern)
        };
        (overlap >= config.partial_overlap).then_some(overlap)
    })
    .map(|(pattern, overlap)| StageMatch {
        method: MatchMethod::Partial,
        pattern,
        strength: config.partial_strength * overlap,
    })
}

/// Normalized Levenshtein similarity against the whole line and against every
/// window of the line with as many tokens as the pattern.
pub fn fuzzy_stage(line: &str, patterns: &[String], config: &BoundaryConfig) -> Option<StageMatch> {
    let line_tokens: Vec<&str> = line.split_whitespace().collect();
    best_of(patterns, |pattern| {
        let similarity = similarity(line, &line_tokens, pattern);
        (similarity >= config.fuzzy_similarity).then_some(similarity)
    })
    .map(|(pattern, similarity)| StageMatch {
        method: MatchMethod::Fuzzy,
        pattern,
        strength: config.fuzzy_strength * similarity,
    })
}

/// True when `phrase` occurs in `text` on token boundaries. Both sides must
/// already be normalized.
pub fn contains_phrase(text: &str, phrase: &str) -> bool {
    !phrase.is_empty() && format!(" {} ", text).contains(&format!(" {} ", phrase))
}

/// Share of the pattern's tokens present in the line. Single-token patterns
/// only match as phrases, so this is 0 for them.
fn token_overlap(line_tokens: &[&str], pattern: &str) -> f32 {
    let pattern_tokens: Vec<&str> = pattern.split_whitespace().collect();
    if pattern_tokens.len() < 2 {
        return 0.0;
    }
    let present = pattern_tokens
        .iter()
        .filter(|t| line_tokens.contains(t))
        .count();
    present as f32 / pattern_tokens.len() as f32
}

fn similarity(line: &str, line_tokens: &[&str], pattern: &str) -> f32 {
    let whole = normalized_levenshtein(line, pattern) as f32;
    let width = pattern.split_whitespace().count();
    if width == 0 || line_tokens.len() <= width {
        return whole;
    }
    line_tokens
        .windows(width)
        .map(|w| normalized_levenshtein(&w.join(" "), pattern) as f32)
        .fold(whole, f32::max)
}

/// Highest-scoring pattern; ties keep the earlier pattern.
fn best_of(patterns: &[String], score: impl Fn(&str) -> Option<f32>) -> Option<(usize, f32)> {
    patterns
        .iter()
        .enumerate()
        .filter(|(_, p)| !p.is_empty())
        .filter_map(|(i, p)| score(p).map(|s| (i, s)))
        .fold(None, |best, (i, s)| match best {
            Some((_, b)) if b >= s => best,
            _ => Some((i, s)),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patterns(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_exact_requires_equality() {
        let config = BoundaryConfig::default();
        let p = patterns(&["letter to stakeholders"]);
        let hit = exact_stage("letter to stakeholders", &p, &config).unwrap();
        assert_eq!(hit.method, MatchMethod::Exact);
        assert_eq!(hit.strength, 0.95);
        assert!(exact_stage("letter to stakeholders 2023", &p, &config).is_none());
    }

    #[test]
    fn test_partial_phrase_and_overlap() {
        let config = BoundaryConfig::default();
        let p = patterns(&["management discussion and analysis"]);

        let hit = partial_stage("annexure management discussion and analysis report", &p, &config).unwrap();
        assert_eq!(hit.strength, 0.8);

        // 3 of 4 tokens.
        let hit = partial_stage("management discussion analysis", &p, &config).unwrap();
        assert!((hit.strength - 0.6).abs() < 1e-6);

        // 2 of 4 tokens.
        assert!(partial_stage("management analysis", &p, &config).is_none());
    }

    #[test]
    fn test_partial_single_token_pattern_needs_phrase() {
        let config = BoundaryConfig::default();
        let p = patterns(&["mda"]);
        assert!(partial_stage("mda overview", &p, &config).is_some());
        assert!(partial_stage("mdas", &p, &config).is_none());
    }

    #[test]
    fn test_fuzzy_tolerates_ocr_noise() {
        let config = BoundaryConfig::default();
        let p = patterns(&["letter to stakeholders"]);
        let hit = fuzzy_stage("letter to stakeho1ders", &p, &config).unwrap();
        assert_eq!(hit.method, MatchMethod::Fuzzy);
        assert!(hit.strength > 0.6 && hit.strength < 0.65);
        assert!(fuzzy_stage("notes to accounts", &p, &config).is_none());
    }

    #[test]
    fn test_fuzzy_matches_inside_longer_line() {
        let config = BoundaryConfig::default();
        let p = patterns(&["chairmans message"]);
        assert!(fuzzy_stage("section 2 chairmens message", &p, &config).is_some());
    }

    #[test]
    fn test_best_pattern_wins() {
        let config = BoundaryConfig::default();
        let p = patterns(&["financial review", "management discussion and analysis"]);
        let hit = partial_stage("management discussion and analysis", &p, &config).unwrap();
        assert_eq!(hit.pattern, 1);
    }

    #[test]
    fn test_contains_phrase_respects_token_boundaries() {
        assert!(contains_phrase("the balance sheet as at", "balance sheet"));
        assert!(!contains_phrase("imbalance sheets", "balance sheet"));
        assert!(!contains_phrase("anything", ""));
    }
}
