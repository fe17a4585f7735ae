use serde::{Deserialize, Serialize};

use crate::cleanup::join_lines;
use crate::types::{Line, MatchMethod, SectionCandidate, SectionType};

/// The text of an accepted section, ready for export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionExtract {
    pub section_type: SectionType,
    pub heading: String,
    pub start_page: usize,
    pub end_page: usize,
    pub page_count: usize,
    pub line_count: usize,
    pub character_count: usize,
    pub match_method: MatchMethod,
    pub confidence: f32,
    /// Section body with pages separated by blank lines.
    pub text: String,
}

/// The lines covered by a candidate, clamped to the stream.
pub fn section_lines<'a>(lines: &'a [Line], candidate: &SectionCandidate) -> &'a [Line] {
    let end = candidate.end_line.min(lines.len());
    let start = candidate.start_line.min(end);
    &lines[start..end]
}

pub fn extract_section(lines: &[Line], candidate: &SectionCandidate) -> SectionExtract {
    let span = section_lines(lines, candidate);

    let mut pages: Vec<Vec<&str>> = Vec::new();
    let mut current_page = None;
    for line in span {
        if current_page != Some(line.page_index) {
            pages.push(Vec::new());
            current_page = Some(line.page_index);
        }
        if let Some(page) = pages.last_mut() {
            page.push(line.text.as_str());
        }
    }
    let text = pages
        .into_iter()
        .map(|page| join_lines(page))
        .collect::<Vec<_>>()
        .join("\n\n");

    SectionExtract {
        section_type: candidate.section_type,
        heading: candidate.heading.clone(),
        start_page: candidate.start_page,
        end_page: candidate.end_page,
        page_count: candidate.page_count(),
        line_count: span.len(),
        character_count: text.chars().filter(|c| !c.is_whitespace()).count(),
        match_method: candidate.match_method,
        confidence: candidate.confidence,
        text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sections::confidence::combine;

    fn candidate(start: usize, end: usize, start_page: usize, end_page: usize) -> SectionCandidate {
        let breakdown = combine(0.95, 1.05, 1.0, 0.0);
        SectionCandidate {
            section_type: SectionType::Letter,
            start_line: start,
            end_line: end,
            start_page,
            end_page,
            heading: "Letter to Stakeholders".to_string(),
            matched_pattern: "letter to stakeholders".to_string(),
            match_method: MatchMethod::Exact,
            confidence: breakdown.total,
            breakdown,
            relaxed: false,
        }
    }

    #[test]
    fn test_extract_joins_pages_and_repairs_hyphens() {
        let lines = vec![
            Line::new("Cover", 50.0, 10.0, 0),
            Line::new("Letter to Stakeholders", 80.0, 12.0, 1),
            Line::new("Dear share-", 100.0, 10.0, 1),
            Line::new("holders, we grew.", 114.0, 10.0, 1),
            Line::new("Thank you.", 80.0, 10.0, 2),
            Line::new("Balance Sheet", 80.0, 14.0, 3),
        ];
        let extract = extract_section(&lines, &candidate(1, 5, 2, 3));
        assert_eq!(
            extract.text,
            "Letter to Stakeholders\nDear shareholders, we grew.\n\nThank you."
        );
        assert_eq!(extract.page_count, 2);
        assert_eq!(extract.line_count, 4);
        assert_eq!(extract.character_count, extract.text.chars().filter(|c| !c.is_whitespace()).count());
    }

    #[test]
    fn test_section_lines_clamped() {
        let lines = vec![Line::new("only", 50.0, 10.0, 0)];
        assert_eq!(section_lines(&lines, &candidate(0, 5, 1, 1)).len(), 1);
        assert!(section_lines(&lines, &candidate(3, 5, 1, 1)).is_empty());
    }
}
