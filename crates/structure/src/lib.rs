//! Layout-aware structuring of annual-report text.
//!
//! Input is positioned text fragments per physical page. The pipeline
//! reconstructs reading order across spreads and columns, assembles lines,
//! strips page furniture, detects the LETTER and MDNA sections, and builds a
//! heading hierarchy for the whole document and for each detected section.

use thiserror::Error;

pub mod cleanup;
pub mod config;
pub mod extract;
pub mod headings;
pub mod layout;
pub mod render;
pub mod sections;
pub mod summary;
pub mod tree;
pub mod types;

pub use config::StructureConfig;
pub use extract::SectionExtract;
pub use summary::{SectionSummary, StructureSummary};
pub use types::*;

use cleanup::FurnitureLine;

#[derive(Debug, Error)]
pub enum StructureError {
    #[error("Document has no text fragments")]
    EmptyDocument,
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),
    #[error("Configuration serialize error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),
}

/// Heading tree built from one detected section's lines.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SectionTree {
    pub section_type: SectionType,
    pub tree: HeadingNode,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Everything one structuring pass produced.
///
/// Constructed via [`structure_document`]. Section text, section trees and
/// individual nodes can be read back without running the pipeline again.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StructuredDocument {
    pub physical_page_count: usize,
    /// Logical pages in reading order.
    pub pages: Vec<LogicalPage>,
    /// Body lines in reading order, furniture removed.
    pub lines: Vec<Line>,
    pub furniture: Vec<FurnitureLine>,
    pub unplaced: Vec<UnplacedFragment>,
    pub median_font_size: f32,
    /// One entry per [`SectionType`], in [`SectionType::ALL`] order.
    pub sections: Vec<SectionDetection>,
    pub tree: HeadingNode,
    pub section_trees: Vec<SectionTree>,
    pub index: TreeIndex,
    pub summary: StructureSummary,
}

impl StructuredDocument {
    pub fn section(&self, section_type: SectionType) -> Option<&SectionCandidate> {
        self.sections
            .iter()
            .find(|d| d.section_type() == section_type)
            .and_then(SectionDetection::candidate)
    }

    /// The lines of a detected section, or `None` when it was not found.
    pub fn section_lines(&self, section_type: SectionType) -> Option<&[Line]> {
        self.section(section_type)
            .map(|candidate| extract::section_lines(&self.lines, candidate))
    }

    pub fn section_extract(&self, section_type: SectionType) -> Option<SectionExtract> {
        self.section(section_type)
            .map(|candidate| extract::extract_section(&self.lines, candidate))
    }

    pub fn section_tree(&self, section_type: SectionType) -> Option<&HeadingNode> {
        self.section_trees
            .iter()
            .find(|t| t.section_type == section_type)
            .map(|t| &t.tree)
    }

    /// Look up a titled node of the document tree by id.
    pub fn node(&self, id: &NodeId) -> Option<&HeadingNode> {
        tree::find_node(&self.tree, id)
    }
}

/// Run the full pipeline over a document's physical pages.
///
/// Fails only when there is nothing to structure. Malformed fragments,
/// unreadable layouts and missing sections are reported in the output.
pub fn structure_document(
    pages: &[PhysicalPage],
    config: &StructureConfig,
) -> Result<StructuredDocument, StructureError> {
    if pages.iter().all(|p| p.fragments.is_empty()) {
        return Err(StructureError::EmptyDocument);
    }

    let reconstruction = layout::reconstruct_document(pages, &config.reading_order);
    let median_font_size = match layout::build_font_statistics(&reconstruction.pages) {
        Some(stats) => stats.median,
        None => {
            log::warn!("No placeable text, font-relative decisions are disabled");
            0.0
        }
    };

    let lines = layout::assemble_document_lines(&reconstruction.pages, &config.lines);
    let (lines, furniture) = cleanup::split_furniture(lines, &config.cleanup);
    log::debug!(
        "{} lines after removing {} furniture lines (median font {:.1})",
        lines.len(),
        furniture.len(),
        median_font_size
    );

    let sections = sections::detect_all(&lines, median_font_size, &config.boundary);

    let tree = tree::build_tree(&lines, median_font_size, &config.hierarchy);
    let section_trees = sections
        .iter()
        .filter_map(SectionDetection::candidate)
        .map(|candidate| SectionTree {
            section_type: candidate.section_type,
            tree: tree::build_tree(
                extract::section_lines(&lines, candidate),
                median_font_size,
                &config.hierarchy,
            ),
        })
        .collect();
    let index = tree::build_tree_index(&tree);

    let mut document = StructuredDocument {
        physical_page_count: pages.len(),
        pages: reconstruction.pages,
        lines,
        furniture,
        unplaced: reconstruction.unplaced,
        median_font_size,
        sections,
        tree,
        section_trees,
        index,
        summary: StructureSummary::default(),
    };
    document.summary = StructureSummary::from_document(&document);
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One spread: two logical pages, each with two columns of body text. The
    /// right-hand page opens with a letter heading.
    fn spread() -> PhysicalPage {
        let mut fragments = Vec::new();
        for row in 0..8 {
            let y = 100.0 + row as f32 * 20.0;
            fragments.push(RawFragment::new(
                format!("Highlights row {} of the opening column", row),
                [50.0, y, 250.0, y + 10.0],
                10.0,
            ));
            fragments.push(RawFragment::new(
                format!("Figures row {} of the second column", row),
                [300.0, y, 500.0, y + 10.0],
                10.0,
            ));
            fragments.push(RawFragment::new(
                format!("Dear shareholders, paragraph {} continues", row),
                [660.0, y, 880.0, y + 10.0],
                10.0,
            ));
            fragments.push(RawFragment::new(
                format!("and our progress in year {} was", row),
                [930.0, y, 1150.0, y + 10.0],
                10.0,
            ));
        }
        fragments.push(RawFragment::new(
            "LETTER TO STAKEHOLDERS",
            [660.0, 80.0, 860.0, 92.0],
            12.0,
        ));
        fragments.push(RawFragment {
            text: "orphan".to_string(),
            bbox: None,
            font_size: Some(10.0),
        });

        PhysicalPage {
            page_index: 0,
            width: Some(1200.0),
            height: Some(800.0),
            fragments,
        }
    }

    #[test]
    fn test_structure_spread_finds_letter_on_right_page() {
        let doc = structure_document(&[spread()], &StructureConfig::default()).unwrap();

        assert_eq!(doc.pages.len(), 2);
        assert!(doc.pages.iter().all(|p| p.column_count == 2));
        assert_eq!(doc.median_font_size, 10.0);
        assert_eq!(doc.unplaced.len(), 1);

        let letter = doc.section(SectionType::Letter).expect("letter detected");
        assert_eq!(letter.start_page, 2);
        assert_eq!(letter.start_line, 16);
        assert_eq!(letter.match_method, MatchMethod::Exact);
        assert!(letter.confidence >= 0.9);
        assert_eq!(doc.lines[letter.start_line].text, "LETTER TO STAKEHOLDERS");
        assert!(doc.section(SectionType::Mdna).is_none());

        let extract = doc.section_extract(SectionType::Letter).unwrap();
        assert!(extract.text.starts_with("LETTER TO STAKEHOLDERS\n"));
        assert!(doc.section_tree(SectionType::Letter).is_some());

        assert_eq!(doc.summary.physical_pages, 1);
        assert_eq!(doc.summary.logical_pages, 2);
        assert_eq!(doc.summary.found_count(), 1);
        assert_eq!(doc.summary.unplaced_fragments, 1);
    }

    #[test]
    fn test_document_tree_index_resolves_nodes() {
        let doc = structure_document(&[spread()], &StructureConfig::default()).unwrap();
        for entry in &doc.index.entries {
            let node = doc.node(&entry.id).expect("indexed node resolves");
            assert_eq!(node.text, entry.title);
        }
    }

    #[test]
    fn test_empty_document_is_an_error() {
        let config = StructureConfig::default();
        assert!(matches!(
            structure_document(&[], &config),
            Err(StructureError::EmptyDocument)
        ));
        let blank = PhysicalPage {
            page_index: 0,
            ..PhysicalPage::default()
        };
        assert!(matches!(
            structure_document(&[blank], &config),
            Err(StructureError::EmptyDocument)
        ));
    }

    #[test]
    fn test_blank_page_keeps_page_numbering() {
        let blank = PhysicalPage {
            page_index: 0,
            ..PhysicalPage::default()
        };
        let mut page = spread();
        page.page_index = 1;
        let doc = structure_document(&[blank, page], &StructureConfig::default()).unwrap();
        assert_eq!(doc.pages.len(), 3);
        assert_eq!(doc.summary.empty_pages, 1);
        assert_eq!(doc.section(SectionType::Letter).unwrap().start_page, 3);
    }
}
