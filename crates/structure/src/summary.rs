use serde::{Deserialize, Serialize};

use crate::types::{HeadingNode, MatchMethod, PageLayout, SectionDetection, SectionType};
use crate::StructuredDocument;

/// Metadata about one structuring pass, for reporting and quality tracking.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructureSummary {
    pub physical_pages: usize,
    pub logical_pages: usize,
    /// Logical pages that produced no lines.
    pub empty_pages: usize,
    pub degraded_pages: usize,
    pub line_count: usize,
    pub unplaced_fragments: usize,
    pub furniture_lines: usize,
    pub median_font_size: f32,
    pub heading_count: usize,
    pub levels_used: Vec<u8>,
    pub max_depth: usize,
    pub sections: Vec<SectionSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionSummary {
    pub section_type: SectionType,
    pub found: bool,
    pub confidence: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_method: Option<MatchMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<(usize, usize)>,
    #[serde(default)]
    pub relaxed: bool,
    /// Headings in the section's own tree.
    pub heading_count: usize,
    pub levels_used: Vec<u8>,
}

impl StructureSummary {
    pub fn from_document(doc: &StructuredDocument) -> Self {
        let pages_with_lines: std::collections::HashSet<usize> =
            doc.lines.iter().map(|l| l.page_index).collect();

        StructureSummary {
            physical_pages: doc.physical_page_count,
            logical_pages: doc.pages.len(),
            empty_pages: doc
                .pages
                .iter()
                .filter(|p| !pages_with_lines.contains(&p.page_index))
                .count(),
            degraded_pages: doc
                .pages
                .iter()
                .filter(|p| p.layout == PageLayout::Degraded)
                .count(),
            line_count: doc.lines.len(),
            unplaced_fragments: doc.unplaced.len(),
            furniture_lines: doc.furniture.len(),
            median_font_size: doc.median_font_size,
            heading_count: doc.tree.heading_count(),
            levels_used: doc.tree.levels_used(),
            max_depth: doc.tree.max_depth(),
            sections: doc
                .sections
                .iter()
                .map(|d| SectionSummary::new(d, doc.section_tree(d.section_type())))
                .collect(),
        }
    }

    pub fn found_count(&self) -> usize {
        self.sections.iter().filter(|s| s.found).count()
    }
}

impl SectionSummary {
    pub fn new(detection: &SectionDetection, tree: Option<&HeadingNode>) -> Self {
        let candidate = detection.candidate();
        SectionSummary {
            section_type: detection.section_type(),
            found: detection.is_found(),
            confidence: detection.confidence(),
            match_method: candidate.map(|c| c.match_method),
            pages: candidate.map(|c| (c.start_page, c.end_page)),
            relaxed: candidate.is_some_and(|c| c.relaxed),
            heading_count: tree.map_or(0, HeadingNode::heading_count),
            levels_used: tree.map(HeadingNode::levels_used).unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_section_summary() {
        let detection = SectionDetection::NotFound {
            section_type: SectionType::Letter,
        };
        let summary = SectionSummary::new(&detection, None);
        assert!(!summary.found);
        assert_eq!(summary.confidence, 0.0);
        assert!(summary.match_method.is_none());
        assert!(summary.pages.is_none());
        assert_eq!(summary.heading_count, 0);
    }
}
