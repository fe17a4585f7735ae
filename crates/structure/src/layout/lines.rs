//! Line assembly and document font statistics.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::cleanup::cleanup_text;
use crate::config::LineConfig;
use crate::types::{Fragment, Line, LogicalPage};

/// Quantisation bucket width for font sizes in the histogram (points).
const FONT_SIZE_BUCKET: f32 = 0.5;

/// Aggregate font-size statistics computed across an entire document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontStatistics {
    /// Character-weighted median font size. Every relative font threshold is
    /// a ratio of this value.
    pub median: f32,
    /// The most common font size bucket (weighted by character count).
    pub body_size: f32,
    /// `(font_size, total_char_count)` pairs sorted by descending size.
    pub size_histogram: Vec<(f32, usize)>,
}

/// Quantise a font size into a histogram bucket.
fn bucket(size: f32) -> f32 {
    (size / FONT_SIZE_BUCKET).round() * FONT_SIZE_BUCKET
}

/// Build font statistics over every placed fragment. Returns `None` when the
/// document has no text at all.
pub fn build_font_statistics(pages: &[LogicalPage]) -> Option<FontStatistics> {
    let mut weighted: Vec<(f32, usize)> = pages
        .iter()
        .flat_map(|p| p.fragments.iter())
        .map(|f| (f.font_size, f.text.chars().filter(|c| !c.is_whitespace()).count()))
        .filter(|(_, chars)| *chars > 0)
        .collect();
    if weighted.is_empty() {
        return None;
    }

    weighted.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
    let total: usize = weighted.iter().map(|(_, n)| n).sum();
    let half = total.div_ceil(2);
    let mut seen = 0;
    let mut median = weighted[weighted.len() - 1].0;
    for (size, n) in &weighted {
        seen += n;
        if seen >= half {
            median = *size;
            break;
        }
    }

    let mut histogram: HashMap<i32, usize> = HashMap::new();
    for (size, n) in &weighted {
        let key = (bucket(*size) * 100.0).round() as i32;
        *histogram.entry(key).or_insert(0) += n;
    }
    let mut size_histogram: Vec<(f32, usize)> = histogram
        .into_iter()
        .map(|(k, v)| (k as f32 / 100.0, v))
        .collect();
    size_histogram.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

    let body_size = size_histogram
        .iter()
        .max_by(|a, b| a.1.cmp(&b.1).then(b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal)))
        .map(|(size, _)| *size)
        .unwrap_or(median);

    Some(FontStatistics {
        median,
        body_size,
        size_histogram,
    })
}

/// Assemble the lines of every logical page, in reading order.
pub fn assemble_document_lines(pages: &[LogicalPage], config: &LineConfig) -> Vec<Line> {
    pages.iter().flat_map(|p| assemble_lines(p, config)).collect()
}

/// Group a logical page's ordered fragments into [`Line`]s.
///
/// Lines are built run by run, so a line never joins fragments from two
/// columns. Within a run, consecutive fragments whose tops are within
/// `y_tolerance` of the line's first fragment share a line.
pub fn assemble_lines(page: &LogicalPage, config: &LineConfig) -> Vec<Line> {
    let mut lines = Vec::new();
    for run in &page.runs {
        let mut current: Vec<&Fragment> = Vec::new();
        for fragment in &page.fragments[run.clone()] {
            let same_line = current
                .first()
                .is_some_and(|first| (fragment.bbox.y0 - first.bbox.y0).abs() <= config.y_tolerance);
            if !same_line && !current.is_empty() {
                lines.extend(assemble_line(std::mem::take(&mut current), page, config));
            }
            current.push(fragment);
        }
        if !current.is_empty() {
            lines.extend(assemble_line(current, page, config));
        }
    }
    lines
}

/// Build a [`Line`] from fragments known to share the same row.
///
/// Fragments are sorted left-to-right. A space is inserted when the gap
/// between neighbours reaches `min_word_gap` points, unless both boundary
/// characters belong to a spaceless script. Lines that are empty after
/// cleanup are dropped.
fn assemble_line(mut fragments: Vec<&Fragment>, page: &LogicalPage, config: &LineConfig) -> Option<Line> {
    fragments.sort_by(|a, b| a.bbox.x0.partial_cmp(&b.bbox.x0).unwrap_or(std::cmp::Ordering::Equal));

    let mut text = String::new();
    let mut prev: Option<&Fragment> = None;
    for fragment in &fragments {
        if let Some(prev) = prev {
            let gap = fragment.bbox.x0 - prev.bbox.x1;
            let already_spaced = text.ends_with(char::is_whitespace)
                || fragment.text.starts_with(char::is_whitespace);
            if gap >= config.min_word_gap && !already_spaced && !boundary_is_spaceless(prev, fragment) {
                text.push(' ');
            }
        }
        text.push_str(&fragment.text);
        prev = Some(fragment);
    }

    let text = cleanup_text(&text);
    if text.is_empty() {
        return None;
    }

    let y_position = fragments.iter().map(|f| f.bbox.y0).fold(f32::INFINITY, f32::min);
    let x_position = fragments.iter().map(|f| f.bbox.x0).fold(f32::INFINITY, f32::min);

    Some(Line {
        text,
        y_position,
        x_position,
        font_size: dominant_font_size(&fragments),
        page_index: page.page_index,
        source_page_index: page.source_page_index,
        page_height: page.page_height,
    })
}

/// Returns the font size that covers the most characters in the fragments.
fn dominant_font_size(fragments: &[&Fragment]) -> f32 {
    let mut counts: HashMap<i32, usize> = HashMap::new();
    for f in fragments {
        let key = (f.font_size * 100.0).round() as i32;
        *counts.entry(key).or_insert(0) += f.text.chars().count().max(1);
    }
    counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(&b.0)))
        .map(|(k, _)| k as f32 / 100.0)
        .unwrap_or(0.0)
}

/// Check whether the boundary between two adjacent fragments is between
/// spaceless-script characters (no space needed).
fn boundary_is_spaceless(prev: &Fragment, next: &Fragment) -> bool {
    let last_char = prev.text.chars().next_back();
    let first_char = next.text.chars().next();
    match (last_char, first_char) {
        (Some(l), Some(f)) => is_spaceless_script_char(l) && is_spaceless_script_char(f),
        _ => false,
    }
}

/// Returns `true` if `c` belongs to a script that does not use inter-word
/// spaces (CJK ideographs, kana, Hangul, Thai and similar).
pub fn is_spaceless_script_char(c: char) -> bool {
    matches!(
        c as u32,
        0x4E00..=0x9FFF
        | 0x3400..=0x4DBF
        | 0x20000..=0x2A6DF
        | 0xF900..=0xFAFF
        | 0x3040..=0x309F
        | 0x30A0..=0x30FF
        | 0x31F0..=0x31FF
        | 0xAC00..=0xD7AF
        | 0x1100..=0x11FF
        | 0x3130..=0x318F
        | 0x3000..=0x303F
        | 0xFF00..=0xFFEF
        | 0x0E00..=0x0EFF
        | 0x1000..=0x109F
        | 0x1780..=0x17FF
        | 0x0F00..=0x0FFF
    )
}
