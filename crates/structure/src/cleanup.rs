use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

use crate::config::CleanupConfig;
use crate::types::Line;

/// Clean up extracted text for display and extraction.
///
/// Applies unicode normalization, ligature replacement, zero-width and
/// replacement character removal, bullet standardization and whitespace
/// normalization.
pub fn cleanup_text(text: &str) -> String {
    let mut result: String = text.nfc().collect();

    let ligatures = [
        ("\u{FB00}", "ff"),
        ("\u{FB01}", "fi"),
        ("\u{FB02}", "fl"),
        ("\u{FB03}", "ffi"),
        ("\u{FB04}", "ffl"),
    ];
    for (lig, replacement) in &ligatures {
        result = result.replace(lig, replacement);
    }

    result.retain(|c| !is_invisible(c));

    for bullet in ['\u{25CF}', '\u{25CB}', '\u{25A0}', '\u{F0B7}'] {
        result = result.replace(bullet, "\u{2022}");
    }

    static RE_SPACES: OnceLock<Regex> = OnceLock::new();
    let re_spaces = RE_SPACES.get_or_init(|| Regex::new(r"[ \t\u{00A0}]{2,}").unwrap());
    result = re_spaces.replace_all(&result, " ").to_string();

    result.trim().to_string()
}

/// Join consecutive lines into one block of text, repairing words hyphenated
/// across line breaks.
pub fn join_lines<'a>(lines: impl IntoIterator<Item = &'a str>) -> String {
    let joined = lines.into_iter().collect::<Vec<_>>().join("\n");

    static RE_HYPHEN: OnceLock<Regex> = OnceLock::new();
    let re_hyphen = RE_HYPHEN.get_or_init(|| Regex::new(r"([a-zA-Z])-\s*\n\s*([a-z])").unwrap());
    re_hyphen.replace_all(&joined, "$1$2").to_string()
}

/// Canonical form used by every keyword comparison: lowercase, apostrophes
/// dropped, `&` spelled out, other punctuation turned into spaces, whitespace
/// collapsed.
///
/// `"Management’s Discussion & Analysis"` becomes
/// `"managements discussion and analysis"`.
pub fn normalize_for_match(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.nfkc().flat_map(char::to_lowercase) {
        match c {
            '\'' | '\u{2018}' | '\u{2019}' | '`' => {}
            '&' => out.push_str(" and "),
            c if c.is_alphanumeric() => out.push(c),
            _ => out.push(' '),
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_invisible(c: char) -> bool {
    matches!(
        c,
        '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{2060}' | '\u{FEFF}' | '\u{00AD}' | '\u{FFFD}'
    )
}

// ---------------------------------------------------------------------------
// Running page furniture
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FurnitureKind {
    /// Header or footer text repeated across most pages.
    Repeated,
    PageNumber,
}

/// A line removed from the reading stream because it is page decoration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FurnitureLine {
    pub page_index: usize,
    pub text: String,
    pub kind: FurnitureKind,
}

/// Split running headers, footers and bare page numbers out of the line
/// stream. Only the first and last `edge_lines` lines of each logical page are
/// considered; body text is never touched.
pub fn split_furniture(lines: Vec<Line>, config: &CleanupConfig) -> (Vec<Line>, Vec<FurnitureLine>) {
    let mut by_page: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (i, line) in lines.iter().enumerate() {
        by_page.entry(line.page_index).or_default().push(i);
    }

    let edge_indices: Vec<(usize, usize)> = by_page
        .iter()
        .flat_map(|(&page, indices)| {
            let n = indices.len();
            let k = config.edge_lines.min(n);
            let mut edges: Vec<usize> = indices[..k].to_vec();
            edges.extend(indices[n.saturating_sub(k).max(k)..].iter().copied());
            edges.into_iter().map(move |i| (page, i))
        })
        .collect();

    let mut marked: HashMap<usize, FurnitureKind> = HashMap::new();

    if config.drop_page_numbers {
        for &(_, i) in &edge_indices {
            if is_page_number(&lines[i].text) {
                marked.insert(i, FurnitureKind::PageNumber);
            }
        }
    }

    let page_count = by_page.len();
    if page_count >= config.min_pages {
        let mut pages_per_key: HashMap<String, HashSet<usize>> = HashMap::new();
        for &(page, i) in &edge_indices {
            if marked.contains_key(&i) {
                continue;
            }
            let key = furniture_key(&lines[i].text);
            if !key.is_empty() {
                pages_per_key.entry(key).or_default().insert(page);
            }
        }

        let needed = (config.repeat_threshold * page_count as f32).ceil().max(2.0) as usize;
        for &(_, i) in &edge_indices {
            if marked.contains_key(&i) {
                continue;
            }
            let key = furniture_key(&lines[i].text);
            if pages_per_key.get(&key).is_some_and(|pages| pages.len() >= needed) {
                marked.insert(i, FurnitureKind::Repeated);
            }
        }
    }

    if !marked.is_empty() {
        log::debug!("Removed {} running header/footer lines", marked.len());
    }

    let mut kept = Vec::with_capacity(lines.len());
    let mut furniture = Vec::new();
    for (i, line) in lines.into_iter().enumerate() {
        match marked.get(&i) {
            Some(&kind) => furniture.push(FurnitureLine {
                page_index: line.page_index,
                text: line.text,
                kind,
            }),
            None => kept.push(line),
        }
    }
    (kept, furniture)
}

/// Digits are dropped so "Annual Report 2023 | 14" and "Annual Report 2023 | 15"
/// compare equal.
fn furniture_key(text: &str) -> String {
    let normalized = normalize_for_match(text);
    normalized
        .split_whitespace()
        .filter(|tok| !tok.chars().all(|c| c.is_ascii_digit()))
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_page_number(text: &str) -> bool {
    static RE_PAGE: OnceLock<Regex> = OnceLock::new();
    let re_page = RE_PAGE.get_or_init(|| {
        Regex::new(r"(?i)^(page\s*)?\d{1,4}(\s*(of|/)\s*\d{1,4})?$|^[-–]\s*\d{1,4}\s*[-–]$").unwrap()
    });
    re_page.is_match(text.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(text: &str, page: usize) -> Line {
        Line::new(text, 100.0, 10.0, page)
    }

    #[test]
    fn test_passthrough() {
        assert_eq!(cleanup_text("Hello world."), "Hello world.");
    }

    #[test]
    fn test_ligature_fix() {
        assert_eq!(cleanup_text("\u{FB01}nancial"), "financial");
        assert_eq!(cleanup_text("a\u{FB04}e"), "affle");
    }

    #[test]
    fn test_zero_width_and_replacement_removed() {
        assert_eq!(cleanup_text("Re\u{200B}port\u{FFFD}"), "Report");
    }

    #[test]
    fn test_whitespace_collapsed() {
        assert_eq!(cleanup_text("  a     b\u{00A0}\u{00A0}c "), "a b c");
    }

    #[test]
    fn test_bullet_standardization() {
        assert!(cleanup_text("\u{25CF} Item").starts_with("\u{2022} Item"));
    }

    #[test]
    fn test_nfc_normalization() {
        let result = cleanup_text("caf\u{0065}\u{0301}");
        assert_eq!(result, "caf\u{00E9}");
    }

    #[test]
    fn test_join_lines_repairs_hyphenation() {
        assert_eq!(join_lines(["infor-", "mation flows"]), "information flows");
        assert_eq!(join_lines(["2022-", "23"]), "2022-\n23");
    }

    #[test]
    fn test_normalize_for_match() {
        assert_eq!(
            normalize_for_match("Management’s Discussion & Analysis"),
            "managements discussion and analysis"
        );
        assert_eq!(normalize_for_match("  LETTER   to\tStakeholders: "), "letter to stakeholders");
        assert_eq!(normalize_for_match("MD&A"), "md and a");
        assert_eq!(normalize_for_match("R&D"), normalize_for_match("r & d"));
        assert_eq!(normalize_for_match("..."), "");
    }

    #[test]
    fn test_page_number_detection() {
        assert!(is_page_number("12"));
        assert!(is_page_number("Page 7"));
        assert!(is_page_number("3 of 120"));
        assert!(is_page_number("- 4 -"));
        assert!(!is_page_number("12 months ended"));
        assert!(!is_page_number("FY2023"));
    }

    #[test]
    fn test_split_furniture_removes_running_header() {
        let words = ["alpha", "beta", "gamma", "delta", "epsilon", "zeta"];
        let mut lines = Vec::new();
        for page in 0..4 {
            lines.push(line(&format!("Acme Annual Report 2023 | {}", page + 10), page));
            for word in words {
                lines.push(line(&format!("Body {} {}", words[page], word), page));
            }
            lines.push(line(&format!("{}", page + 10), page));
        }

        let (kept, furniture) = split_furniture(lines, &CleanupConfig::default());
        assert_eq!(furniture.len(), 8);
        assert!(furniture
            .iter()
            .any(|f| f.kind == FurnitureKind::PageNumber && f.text == "10"));
        assert!(furniture
            .iter()
            .any(|f| f.kind == FurnitureKind::Repeated && f.text.starts_with("Acme")));
        assert_eq!(kept.len(), 24);
        assert!(kept.iter().all(|l| l.text.starts_with("Body")));
    }

    #[test]
    fn test_split_furniture_short_document_keeps_repeats() {
        let lines = vec![
            line("Acme Corp", 0),
            line("Intro", 0),
            line("Acme Corp", 1),
            line("More", 1),
        ];
        let (kept, furniture) = split_furniture(lines, &CleanupConfig::default());
        assert!(furniture.is_empty());
        assert_eq!(kept.len(), 4);
    }

    #[test]
    fn test_split_furniture_empty() {
        let (kept, furniture) = split_furniture(Vec::new(), &CleanupConfig::default());
        assert!(kept.is_empty());
        assert!(furniture.is_empty());
    }
}
