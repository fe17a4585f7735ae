//! Heading-level classification.
//!
//! Decisions are local: a line is judged on its own text and font size
//! relative to the document median, never on its neighbours.

use std::sync::OnceLock;

use regex::Regex;

use crate::cleanup::normalize_for_match;
use crate::config::HierarchyConfig;
use crate::types::{HeadingLevel, Line};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineRole {
    Heading(HeadingLevel),
    Content,
}

impl LineRole {
    pub fn is_heading(&self) -> bool {
        matches!(self, LineRole::Heading(_))
    }
}

/// Short function words that may stay lowercase in a title-case heading.
const MINOR_WORDS: &[&str] = &[
    "a", "an", "and", "as", "at", "by", "for", "from", "in", "into", "of", "on", "or", "the", "to",
    "vs", "with",
];

pub fn classify_lines(lines: &[Line], median_font: f32, config: &HierarchyConfig) -> Vec<LineRole> {
    lines
        .iter()
        .map(|line| classify_line(line, median_font, config))
        .collect()
}

/// Classify one line.
///
/// A line clearly larger than the median is a heading on size alone. At
/// body size a line needs a structural cue (short, ends with a colon, or
/// starts with an outline marker) and must not end like a sentence. Level
/// follows case: all caps is 1, title case is 2, anything else is 3. Topic
/// keywords override the level.
pub fn classify_line(line: &Line, median_font: f32, config: &HierarchyConfig) -> LineRole {
    let text = line.text.trim();
    let chars = text.chars().count();
    if chars == 0 || chars > config.max_heading_chars {
        return LineRole::Content;
    }
    if text.chars().filter(|c| c.is_alphabetic()).count() < config.min_letters {
        return LineRole::Content;
    }
    if median_font > 0.0 && line.font_size < config.min_heading_font_ratio * median_font {
        return LineRole::Content;
    }

    let short = chars <= config.short_line_chars;
    if short {
        if let Some(level) = topic_level(text, config) {
            return LineRole::Heading(level);
        }
    }

    let prominent = median_font > 0.0 && line.font_size >= config.heading_font_ratio * median_font;
    let upper = is_all_uppercase(text);
    let title = is_title_case(text);
    let level = if upper {
        1
    } else if title {
        2
    } else {
        3
    };
    let level = HeadingLevel::try_from(level).unwrap_or(HeadingLevel::H1);

    if prominent {
        return LineRole::Heading(level);
    }
    if text.ends_with(['.', ',', ';']) || !short {
        return LineRole::Content;
    }
    if text.ends_with(':') || has_outline_prefix(text) || upper || title {
        return LineRole::Heading(level);
    }
    LineRole::Content
}

fn topic_level(text: &str, config: &HierarchyConfig) -> Option<HeadingLevel> {
    let normalized = normalize_for_match(text);
    config.topic_keywords.iter().find_map(|topic| {
        let pattern = normalize_for_match(&topic.pattern);
        let hit = !pattern.is_empty()
            && (normalized == pattern || normalized.starts_with(&format!("{} ", pattern)));
        hit.then(|| HeadingLevel::try_from(topic.level).ok()).flatten()
    })
}

/// Every cased letter is uppercase, and there are at least two of them.
pub fn is_all_uppercase(text: &str) -> bool {
    let cased: Vec<char> = text
        .chars()
        .filter(|c| c.is_uppercase() || c.is_lowercase())
        .collect();
    cased.len() >= 2 && cased.iter().all(|c| c.is_uppercase())
}

/// Every word that starts with a letter starts uppercase, except short
/// function words after the first word.
pub fn is_title_case(text: &str) -> bool {
    let mut words = text
        .split_whitespace()
        .filter(|w| w.chars().next().is_some_and(char::is_alphabetic))
        .peekable();
    if words.peek().is_none() {
        return false;
    }
    words.enumerate().all(|(i, word)| {
        let starts_upper = word.chars().next().is_some_and(char::is_uppercase);
        starts_upper || (i > 0 && MINOR_WORDS.contains(&word.to_lowercase().as_str()))
    })
}

/// Outline markers such as "1.", "2.3", "A)", "(ii)" or "IV." followed by text.
pub fn has_outline_prefix(text: &str) -> bool {
    static RE_OUTLINE: OnceLock<Regex> = OnceLock::new();
    let re = RE_OUTLINE.get_or_init(|| {
        Regex::new(
            r"^(?:\d{1,2}(?:\.\d{1,2})*[.)]|\d{1,2}(?:\.\d{1,2})+|[A-Za-z][.)]|\((?:[ivxlc]+|[a-z]|\d{1,2})\)|[IVXLC]+[.)])\s+\S",
        )
        .unwrap()
    });
    re.is_match(text.trim_start())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TopicKeyword;

    const MEDIAN: f32 = 10.0;

    fn role(text: &str, size: f32) -> LineRole {
        classify_line(&Line::new(text, 100.0, size, 0), MEDIAN, &HierarchyConfig::default())
    }

    fn level(n: u8) -> LineRole {
        LineRole::Heading(HeadingLevel::try_from(n).unwrap())
    }

    #[test]
    fn test_case_drives_level() {
        assert_eq!(role("CORPORATE OVERVIEW", 10.0), level(1));
        assert_eq!(role("Our Strategy for the Decade", 10.0), level(2));
        assert_eq!(role("Key takeaways:", 10.0), level(3));
    }

    #[test]
    fn test_prominent_line_is_heading_without_cue() {
        assert_eq!(role("a year of resilient growth across all markets we serve", 14.0), level(3));
        assert_eq!(role("A Year of Resilient Growth", 14.0), level(2));
    }

    #[test]
    fn test_body_text_is_content() {
        assert_eq!(role("the Company continued to invest in its people", 10.0), LineRole::Content);
        assert_eq!(role("Revenue grew by 12 percent.", 10.0), LineRole::Content);
        assert_eq!(role("We Thank Our Shareholders,", 10.0), LineRole::Content);
        let long = "This Is A Very Long Line In Title Case That Goes On Well Beyond Sixty Characters Total";
        assert_eq!(role(long, 10.0), LineRole::Content);
    }

    #[test]
    fn test_small_or_letterless_lines_are_content() {
        assert_eq!(role("FOOTNOTE", 8.0), LineRole::Content);
        assert_eq!(role("2023", 14.0), LineRole::Content);
        assert_eq!(role("", 14.0), LineRole::Content);
    }

    #[test]
    fn test_outline_prefix_cue() {
        assert_eq!(role("1. overview of operations", 10.0), level(3));
        assert_eq!(role("(ii) segment results", 10.0), level(3));
        assert!(has_outline_prefix("IV. Outlook"));
        assert!(has_outline_prefix("2.3 Capital allocation"));
        assert!(has_outline_prefix("A) Risks"));
        assert!(!has_outline_prefix("2023 was a good year"));
        assert!(!has_outline_prefix("Revenue"));
    }

    #[test]
    fn test_topic_keyword_sets_level() {
        assert_eq!(role("REVENUE ANALYSIS", 10.0), level(3));
        assert_eq!(role("Opportunities and Threats", 10.0), level(2));

        let config = HierarchyConfig {
            topic_keywords: vec![TopicKeyword {
                pattern: "Outlook".to_string(),
                level: 1,
            }],
            ..HierarchyConfig::default()
        };
        let line = Line::new("outlook for fy25", 100.0, 10.0, 0);
        assert_eq!(classify_line(&line, MEDIAN, &config), level(1));
    }

    #[test]
    fn test_title_case_rules() {
        assert!(is_title_case("Message from the Chairman"));
        assert!(is_title_case("Risks and Concerns"));
        assert!(!is_title_case("and Then Some"));
        assert!(!is_title_case("Revenue grew strongly"));
        assert!(!is_title_case("2023"));
    }

    #[test]
    fn test_uppercase_rules() {
        assert!(is_all_uppercase("MD&A"));
        assert!(is_all_uppercase("FY 2023 HIGHLIGHTS"));
        assert!(!is_all_uppercase("A"));
        assert!(!is_all_uppercase("CEO Message"));
    }
}
