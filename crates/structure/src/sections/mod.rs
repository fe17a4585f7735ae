//! Section boundary detection for the Letter to Stakeholders and MD&A.
//!
//! Detection runs the matching stages in order over every eligible line,
//! scores each hit, and accepts the best candidate of the first stage that
//! clears the acceptance floor. The section then extends forward until a
//! terminator line, the page cap, or the end of the document.

pub mod confidence;
pub mod matching;

use crate::cleanup::normalize_for_match;
use crate::config::{BoundaryConfig, SectionRules};
use crate::types::{Line, SectionCandidate, SectionDetection, SectionType};

use matching::{contains_phrase, StageMatch, STAGES};

/// Look for one section type in the line stream.
pub fn detect_section(
    lines: &[Line],
    section_type: SectionType,
    median_font: f32,
    config: &BoundaryConfig,
) -> SectionDetection {
    let rules = config.rules(section_type);
    let patterns: Vec<String> = rules.patterns.iter().map(|p| normalize_for_match(p)).collect();
    let eligible: Vec<(usize, String)> = lines
        .iter()
        .enumerate()
        .filter(|(_, line)| is_eligible(line, rules, config))
        .map(|(i, line)| (i, normalize_for_match(&line.text)))
        .filter(|(_, text)| !text.is_empty())
        .collect();

    for stage in STAGES {
        let mut best: Option<(usize, StageMatch, crate::types::ConfidenceBreakdown)> = None;
        for (i, text) in &eligible {
            let Some(hit) = stage(text, &patterns, config) else {
                continue;
            };
            let breakdown = confidence::score(
                &lines[*i],
                &lines[i + 1..],
                hit.strength,
                rules,
                config,
                median_font,
            );
            log::debug!(
                "{} candidate on page {}: {:?} ({} match, confidence {:.2})",
                section_type,
                lines[*i].page_number(),
                lines[*i].text,
                hit.method,
                breakdown.total
            );
            if breakdown.total < config.acceptance_floor {
                continue;
            }
            // Strictly greater keeps the earliest line on ties.
            if best.as_ref().map_or(true, |(_, _, b)| breakdown.total > b.total) {
                best = Some((*i, hit, breakdown));
            }
        }

        if let Some((start, hit, breakdown)) = best {
            let end = find_section_end(lines, start, section_type, median_font, config);
            let candidate = SectionCandidate {
                section_type,
                start_line: start,
                end_line: end,
                start_page: lines[start].page_number(),
                end_page: lines[end - 1].page_number(),
                heading: lines[start].text.clone(),
                matched_pattern: rules.patterns[hit.pattern].clone(),
                match_method: hit.method,
                confidence: breakdown.total,
                breakdown,
                relaxed: false,
            };
            log::info!(
                "Found {} on pages {}-{} ({} match, confidence {:.2})",
                section_type,
                candidate.start_page,
                candidate.end_page,
                candidate.match_method,
                candidate.confidence
            );
            return SectionDetection::Found(candidate);
        }
    }

    log::info!("No {} heading found", section_type);
    SectionDetection::NotFound { section_type }
}

/// Detect every section type. When `retry_relaxed` is set, types that were not
/// found are searched again with [`BoundaryConfig::relaxed`] thresholds.
pub fn detect_all(lines: &[Line], median_font: f32, config: &BoundaryConfig) -> Vec<SectionDetection> {
    SectionType::ALL
        .iter()
        .map(|&section_type| {
            let detection = detect_section(lines, section_type, median_font, config);
            if detection.is_found() || !config.retry_relaxed {
                return detection;
            }
            log::debug!("Retrying {} with relaxed thresholds", section_type);
            match detect_section(lines, section_type, median_font, &config.relaxed()) {
                SectionDetection::Found(mut candidate) => {
                    candidate.relaxed = true;
                    SectionDetection::Found(candidate)
                }
                not_found => not_found,
            }
        })
        .collect()
}

/// Index one past the last line of the section starting at `start`.
///
/// The returned index is always greater than `start`.
pub fn find_section_end(
    lines: &[Line],
    start: usize,
    section_type: SectionType,
    median_font: f32,
    config: &BoundaryConfig,
) -> usize {
    let rules = config.rules(section_type);
    let start_page = lines[start].page_number();

    let mut terminators: Vec<String> = config
        .end_keywords
        .financial_statements
        .iter()
        .chain(&config.end_keywords.transitions)
        .chain(&config.end_keywords.structural)
        .map(|k| normalize_for_match(k))
        .collect();
    for other in SectionType::ALL.iter().filter(|&&t| t != section_type) {
        terminators.extend(config.rules(*other).patterns.iter().map(|p| normalize_for_match(p)));
    }
    terminators.retain(|t| !t.is_empty());

    for (i, line) in lines.iter().enumerate().skip(start + 1) {
        let page = line.page_number();
        if rules.max_pages.is_some_and(|max| page > start_page + max) {
            log::debug!("{} reached its {} page cap at page {}", section_type, rules.max_pages.unwrap_or(0), page);
            return i;
        }
        if is_heading_shaped(&line.text, config.max_heading_chars) {
            let text = normalize_for_match(&line.text);
            if let Some(hit) = terminators.iter().find(|t| contains_phrase(&text, t)) {
                log::debug!("{} ends before {:?} (keyword {:?})", section_type, line.text, hit);
                return i;
            }
        }
        if page > start_page && median_font > 0.0 && line.font_size >= rules.end_heading_ratio * median_font {
            log::debug!("{} ends before major heading {:?}", section_type, line.text);
            return i;
        }
    }
    lines.len()
}

/// Short enough to be a heading and not ending like a sentence fragment.
pub fn is_heading_shaped(text: &str, max_chars: usize) -> bool {
    let trimmed = text.trim();
    let chars = trimmed.chars().count();
    chars > 0 && chars <= max_chars && !trimmed.ends_with(['.', ',', ';'])
}

/// Heading-shaped, inside the page window, and high enough on its page.
fn is_eligible(line: &Line, rules: &SectionRules, config: &BoundaryConfig) -> bool {
    is_heading_shaped(&line.text, config.max_heading_chars)
        && rules
            .max_start_page
            .map_or(true, |max| line.page_number() <= max)
        && max_start_y(line, rules).map_or(true, |max| line.y_position < max)
}

/// Lowest y a heading may start at: a share of the page height when both are
/// known, the fixed `max_y` otherwise.
fn max_start_y(line: &Line, rules: &SectionRules) -> Option<f32> {
    match (rules.max_y_ratio, line.page_height) {
        (Some(ratio), Some(height)) => Some(ratio * height),
        _ => rules.max_y,
    }
}
