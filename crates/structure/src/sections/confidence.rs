//! Confidence scoring for section heading candidates.

use crate::cleanup::normalize_for_match;
use crate::config::{BoundaryConfig, SectionRules};
use crate::types::{ConfidenceBreakdown, Line};

/// Score a candidate heading.
///
/// `following` are the lines after the candidate, used for the context bonus.
pub fn score(
    line: &Line,
    following: &[Line],
    method_strength: f32,
    rules: &SectionRules,
    config: &BoundaryConfig,
    median_font: f32,
) -> ConfidenceBreakdown {
    let font = font_factor(line, rules, median_font);
    let position = position_score(line, config);
    let context = context_score(following, rules, config);
    combine(method_strength, font, position, context)
}

pub fn combine(method: f32, font: f32, position: f32, context: f32) -> ConfidenceBreakdown {
    ConfidenceBreakdown {
        method,
        font,
        position,
        context,
        total: (method * font * position + context).clamp(0.0, 1.0),
    }
}

/// Boost for visually prominent headings, penalty otherwise.
pub fn font_factor(line: &Line, rules: &SectionRules, median_font: f32) -> f32 {
    let large = median_font > 0.0 && line.font_size >= rules.prominence_ratio * median_font;
    let short = rules
        .short_line_chars
        .is_some_and(|limit| line.char_count() < limit);
    if large || short {
        rules.prominence_boost
    } else {
        rules.prominence_penalty
    }
}

pub fn position_score(line: &Line, config: &BoundaryConfig) -> f32 {
    if line.y_position <= config.top_band {
        1.0
    } else {
        config.lower_position_score
    }
}

/// Bonus when section vocabulary shows up shortly after the heading.
pub fn context_score(following: &[Line], rules: &SectionRules, config: &BoundaryConfig) -> f32 {
    let vocabulary: Vec<String> = rules
        .context_vocabulary
        .iter()
        .map(|w| normalize_for_match(w))
        .filter(|w| !w.is_empty())
        .collect();
    let hit = following.iter().take(config.context_window).any(|line| {
        let text = normalize_for_match(&line.text);
        vocabulary
            .iter()
            .any(|word| super::matching::contains_phrase(&text, word))
    });
    if hit {
        config.context_bonus
    } else {
        0.0
    }
}
