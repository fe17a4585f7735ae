use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// Axis-aligned bounding box in top-down page coordinates (`y` grows
/// downward from the top edge).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl BBox {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        BBox { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    pub fn center_x(&self) -> f32 {
        (self.x0 + self.x1) / 2.0
    }

    pub fn center_y(&self) -> f32 {
        (self.y0 + self.y1) / 2.0
    }

    fn is_valid(&self) -> bool {
        [self.x0, self.y0, self.x1, self.y1]
            .iter()
            .all(|v| v.is_finite())
            && self.x0 <= self.x1
            && self.y0 <= self.y1
    }
}

// ---------------------------------------------------------------------------
// Fragments
// ---------------------------------------------------------------------------

/// A validated, positioned run of text. Immutable once produced; ordering is
/// undefined until the reading-order pass runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    pub text: String,
    pub bbox: BBox,
    pub font_size: f32,
    pub page_index: usize,
}

impl Fragment {
    pub fn new(text: impl Into<String>, bbox: BBox, font_size: f32, page_index: usize) -> Self {
        Fragment {
            text: text.into(),
            bbox,
            font_size,
            page_index,
        }
    }
}

/// A fragment exactly as delivered by the extraction layer. Geometry and font
/// data may be missing or garbage; [`RawFragment::validate`] sorts that out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFragment {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<[f32; 4]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f32>,
}

impl RawFragment {
    pub fn new(text: impl Into<String>, bbox: [f32; 4], font_size: f32) -> Self {
        RawFragment {
            text: text.into(),
            bbox: Some(bbox),
            font_size: Some(font_size),
        }
    }

    /// Turn the raw record into a [`Fragment`], or explain why it cannot take
    /// part in ordering and heading decisions.
    pub fn validate(self, page_index: usize) -> Result<Fragment, UnplacedFragment> {
        let checked = match (self.bbox, self.font_size) {
            (None, _) => Err(MalformedReason::MissingBBox),
            (Some([x0, y0, x1, y1]), font_size) => {
                let bbox = BBox::new(x0, y0, x1, y1);
                match font_size {
                    _ if !bbox.is_valid() => Err(MalformedReason::InvalidBBox),
                    None => Err(MalformedReason::MissingFontSize),
                    Some(size) if !size.is_finite() || size <= 0.0 => {
                        Err(MalformedReason::InvalidFontSize)
                    }
                    Some(size) => Ok((bbox, size)),
                }
            }
        };

        match checked {
            Ok((bbox, font_size)) => Ok(Fragment {
                text: self.text,
                bbox,
                font_size,
                page_index,
            }),
            Err(reason) => Err(UnplacedFragment {
                page_index,
                text: self.text,
                reason,
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedReason {
    MissingBBox,
    InvalidBBox,
    MissingFontSize,
    InvalidFontSize,
}

impl fmt::Display for MalformedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MalformedReason::MissingBBox => write!(f, "missing bounding box"),
            MalformedReason::InvalidBBox => write!(f, "invalid bounding box"),
            MalformedReason::MissingFontSize => write!(f, "missing font size"),
            MalformedReason::InvalidFontSize => write!(f, "invalid font size"),
        }
    }
}

/// A fragment that was kept out of ordering and heading decisions. Its text is
/// still carried in the output so nothing is silently dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnplacedFragment {
    pub page_index: usize,
    pub text: String,
    pub reason: MalformedReason,
}

/// All fragments extracted from one physical PDF page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhysicalPage {
    pub page_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f32>,
    #[serde(default)]
    pub fragments: Vec<RawFragment>,
}

// ---------------------------------------------------------------------------
// Reading order
// ---------------------------------------------------------------------------

/// How a logical page's fragments were ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageLayout {
    SingleColumn,
    Columns,
    /// Column detection gave up; fragments are in plain top-to-bottom order.
    Degraded,
}

/// One semantic page, possibly a slice of a physical page that prints several
/// pages side by side.
///
/// `fragments` is totally ordered (position = rank). `runs` partitions it into
/// contiguous column or band runs; lines never span two runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicalPage {
    pub source_page_index: usize,
    /// 0-based logical page index across the whole document.
    pub page_index: usize,
    pub column_count: usize,
    pub layout: PageLayout,
    /// Height of the source physical page, when the extractor reported it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_height: Option<f32>,
    pub fragments: Vec<Fragment>,
    pub runs: Vec<Range<usize>>,
}

/// A visual row of text in reading order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub text: String,
    pub y_position: f32,
    pub x_position: f32,
    pub font_size: f32,
    /// 0-based logical page index.
    pub page_index: usize,
    pub source_page_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_height: Option<f32>,
}

impl Line {
    pub fn new(text: impl Into<String>, y_position: f32, font_size: f32, page_index: usize) -> Self {
        Line {
            text: text.into(),
            y_position,
            x_position: 0.0,
            font_size,
            page_index,
            source_page_index: page_index,
            page_height: None,
        }
    }

    /// 1-based logical page number.
    pub fn page_number(&self) -> usize {
        self.page_index + 1
    }

    pub fn char_count(&self) -> usize {
        self.text.trim().chars().count()
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionType {
    Letter,
    Mdna,
}

impl SectionType {
    pub const ALL: [SectionType; 2] = [SectionType::Letter, SectionType::Mdna];

    pub fn as_str(&self) -> &'static str {
        match self {
            SectionType::Letter => "letter_to_stakeholders",
            SectionType::Mdna => "mdna",
        }
    }

    pub fn parse(s: &str) -> Result<Self, InvalidSectionType> {
        match s.trim().to_lowercase().as_str() {
            "letter" | "letter_to_stakeholders" | "letter-to-stakeholders" => {
                Ok(SectionType::Letter)
            }
            "mdna" | "md&a" | "mda" => Ok(SectionType::Mdna),
            _ => Err(InvalidSectionType(s.to_string())),
        }
    }
}

impl fmt::Display for SectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Matching stage that produced a candidate, strongest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    Exact,
    Partial,
    Fuzzy,
}

impl fmt::Display for MatchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchMethod::Exact => write!(f, "exact"),
            MatchMethod::Partial => write!(f, "partial"),
            MatchMethod::Fuzzy => write!(f, "fuzzy"),
        }
    }
}

/// Named sub-scores behind a candidate's confidence.
///
/// `total = clamp(method * font * position + context, 0, 1)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceBreakdown {
    pub method: f32,
    pub font: f32,
    pub position: f32,
    pub context: f32,
    pub total: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionCandidate {
    pub section_type: SectionType,
    /// Index of the heading line in the document line stream.
    pub start_line: usize,
    /// One past the last line of the section. Always `> start_line`.
    pub end_line: usize,
    pub start_page: usize,
    pub end_page: usize,
    pub heading: String,
    pub matched_pattern: String,
    pub match_method: MatchMethod,
    pub confidence: f32,
    pub breakdown: ConfidenceBreakdown,
    /// Found by the relaxed re-detection pass.
    #[serde(default)]
    pub relaxed: bool,
}

impl SectionCandidate {
    pub fn line_range(&self) -> Range<usize> {
        self.start_line..self.end_line
    }

    pub fn page_count(&self) -> usize {
        self.end_page.saturating_sub(self.start_page) + 1
    }
}

/// Outcome of looking for one section type. Absence is a normal result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SectionDetection {
    Found(SectionCandidate),
    NotFound { section_type: SectionType },
}

impl SectionDetection {
    pub fn section_type(&self) -> SectionType {
        match self {
            SectionDetection::Found(c) => c.section_type,
            SectionDetection::NotFound { section_type } => *section_type,
        }
    }

    pub fn confidence(&self) -> f32 {
        match self {
            SectionDetection::Found(c) => c.confidence,
            SectionDetection::NotFound { .. } => 0.0,
        }
    }

    pub fn candidate(&self) -> Option<&SectionCandidate> {
        match self {
            SectionDetection::Found(c) => Some(c),
            SectionDetection::NotFound { .. } => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, SectionDetection::Found(_))
    }
}

// ---------------------------------------------------------------------------
// Heading tree
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadingNode {
    pub text: String,
    /// 0 for the synthetic root, 1..=6 otherwise.
    pub level: u8,
    pub content: Vec<String>,
    pub subsections: Vec<HeadingNode>,
    /// 1-based `(first, last)` logical page numbers covered by this node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_range: Option<(usize, usize)>,
}

impl HeadingNode {
    pub fn root() -> Self {
        HeadingNode {
            text: String::new(),
            level: 0,
            content: Vec::new(),
            subsections: Vec::new(),
            page_range: None,
        }
    }

    pub fn is_root_only(&self) -> bool {
        self.level == 0 && self.subsections.is_empty() && self.content.is_empty()
    }

    /// Number of titled headings below this node.
    pub fn heading_count(&self) -> usize {
        self.subsections
            .iter()
            .map(|s| usize::from(!s.text.is_empty()) + s.heading_count())
            .sum()
    }

    /// Distinct heading levels used below this node, ascending.
    pub fn levels_used(&self) -> Vec<u8> {
        let mut levels = Vec::new();
        self.collect_levels(&mut levels);
        levels.sort_unstable();
        levels.dedup();
        levels
    }

    fn collect_levels(&self, out: &mut Vec<u8>) {
        for child in &self.subsections {
            if !child.text.is_empty() {
                out.push(child.level);
            }
            child.collect_levels(out);
        }
    }

    /// Longest chain of nested nodes below this one.
    pub fn max_depth(&self) -> usize {
        self.subsections
            .iter()
            .map(|s| 1 + s.max_depth())
            .max()
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(level: u8, index: usize) -> Self {
        NodeId(format!("n-{}-{}", level, index))
    }

    pub fn parse(s: &str) -> Result<Self, InvalidNodeId> {
        let parts: Vec<&str> = s.split('-').collect();
        if parts.len() != 3 || parts[0] != "n" {
            return Err(InvalidNodeId);
        }
        parts[1].parse::<u8>().map_err(|_| InvalidNodeId)?;
        parts[2].parse::<usize>().map_err(|_| InvalidNodeId)?;
        Ok(NodeId(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadingLevel(u8);

impl HeadingLevel {
    /// Heading level 1 -- useful as a default fallback when clamping.
    pub const H1: Self = HeadingLevel(1);

    pub fn as_u8(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for HeadingLevel {
    type Error = InvalidHeadingLevel;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if (1..=6).contains(&value) {
            Ok(HeadingLevel(value))
        } else {
            Err(InvalidHeadingLevel)
        }
    }
}

/// Flat view of a heading tree with breadcrumb paths.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TreeIndex {
    pub entries: Vec<IndexEntry>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub id: NodeId,
    pub level: HeadingLevel,
    pub title: String,
    pub path: Vec<String>,
    pub page_range: Option<(usize, usize)>,
}

#[derive(Debug, Error)]
#[error("Heading level must be between 1 and 6")]
pub struct InvalidHeadingLevel;

#[derive(Debug, Error)]
#[error("Invalid node ID format (expected 'n-{{level}}-{{index}}')")]
pub struct InvalidNodeId;

#[derive(Debug, Error)]
#[error("Unknown section type '{0}' (expected 'letter' or 'mdna')")]
pub struct InvalidSectionType(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_level_valid() {
        assert!(HeadingLevel::try_from(1).is_ok());
        assert!(HeadingLevel::try_from(6).is_ok());
    }

    #[test]
    fn test_heading_level_invalid() {
        assert!(HeadingLevel::try_from(0).is_err());
        assert!(HeadingLevel::try_from(7).is_err());
    }

    #[test]
    fn test_node_id_round_trip() {
        let id = NodeId::new(2, 5);
        assert_eq!(id.as_str(), "n-2-5");
        assert!(NodeId::parse("n-2-5").is_ok());
    }

    #[test]
    fn test_node_id_parse_invalid() {
        assert!(NodeId::parse("invalid").is_err());
        assert!(NodeId::parse("n-0").is_err());
        assert!(NodeId::parse("s-1-0").is_err());
        assert!(NodeId::parse("n-x-0").is_err());
    }

    #[test]
    fn test_validate_accepts_well_formed_fragment() {
        let raw = RawFragment::new("Revenue", [10.0, 20.0, 60.0, 32.0], 11.0);
        let frag = raw.validate(4).unwrap();
        assert_eq!(frag.page_index, 4);
        assert_eq!(frag.bbox.width(), 50.0);
    }

    #[test]
    fn test_validate_rejects_missing_geometry() {
        let raw = RawFragment {
            text: "orphan".to_string(),
            bbox: None,
            font_size: Some(10.0),
        };
        let err = raw.validate(0).unwrap_err();
        assert_eq!(err.reason, MalformedReason::MissingBBox);
        assert_eq!(err.text, "orphan");
    }

    #[test]
    fn test_validate_rejects_inverted_bbox() {
        let raw = RawFragment::new("x", [50.0, 0.0, 10.0, 10.0], 10.0);
        assert_eq!(raw.validate(0).unwrap_err().reason, MalformedReason::InvalidBBox);
    }

    #[test]
    fn test_validate_rejects_nan_coordinates() {
        let raw = RawFragment::new("x", [f32::NAN, 0.0, 10.0, 10.0], 10.0);
        assert_eq!(raw.validate(0).unwrap_err().reason, MalformedReason::InvalidBBox);
    }

    #[test]
    fn test_validate_rejects_bad_font_size() {
        let missing = RawFragment {
            text: "x".to_string(),
            bbox: Some([0.0, 0.0, 10.0, 10.0]),
            font_size: None,
        };
        assert_eq!(
            missing.validate(0).unwrap_err().reason,
            MalformedReason::MissingFontSize
        );

        let zero = RawFragment::new("x", [0.0, 0.0, 10.0, 10.0], 0.0);
        assert_eq!(
            zero.validate(0).unwrap_err().reason,
            MalformedReason::InvalidFontSize
        );
    }

    #[test]
    fn test_raw_fragment_deserializes_without_optional_fields() {
        let raw: RawFragment = serde_json::from_str(r#"{"text": "hello"}"#).unwrap();
        assert!(raw.bbox.is_none());
        assert!(raw.font_size.is_none());
    }

    #[test]
    fn test_section_type_parse() {
        assert_eq!(SectionType::parse("LETTER").unwrap(), SectionType::Letter);
        assert_eq!(SectionType::parse("md&a").unwrap(), SectionType::Mdna);
        assert!(SectionType::parse("notes").is_err());
    }

    #[test]
    fn test_not_found_has_zero_confidence() {
        let d = SectionDetection::NotFound {
            section_type: SectionType::Mdna,
        };
        assert_eq!(d.confidence(), 0.0);
        assert!(d.candidate().is_none());
        assert_eq!(d.section_type(), SectionType::Mdna);
    }

    #[test]
    fn test_match_method_ordering() {
        assert!(MatchMethod::Exact < MatchMethod::Partial);
        assert!(MatchMethod::Partial < MatchMethod::Fuzzy);
    }

    #[test]
    fn test_heading_node_stats() {
        let mut root = HeadingNode::root();
        let mut h1 = HeadingNode {
            text: "A".to_string(),
            level: 1,
            content: vec![],
            subsections: vec![],
            page_range: None,
        };
        h1.subsections.push(HeadingNode {
            text: "B".to_string(),
            level: 3,
            content: vec!["text".to_string()],
            subsections: vec![],
            page_range: None,
        });
        root.subsections.push(h1);

        assert_eq!(root.heading_count(), 2);
        assert_eq!(root.levels_used(), vec![1, 3]);
        assert_eq!(root.max_depth(), 2);
        assert!(!root.is_root_only());
        assert!(HeadingNode::root().is_root_only());
    }
}
