//! Tunable thresholds for every stage of the structuring pipeline.
//!
//! Nothing in the engine hard-codes a ratio or a page cap: each component
//! receives the slice of [`StructureConfig`] it needs. The configuration is
//! plain data, loaded once and then shared read-only between document workers.
//!
//! TOML input is overlaid on top of the defaults, so a file only needs to name
//! the values it changes:
//!
//! ```toml
//! [boundary]
//! acceptance_floor = 0.6
//!
//! [boundary.letter]
//! max_pages = 30
//! ```

use serde::{Deserialize, Serialize};

use crate::types::{HeadingLevel, SectionType};
use crate::StructureError;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StructureConfig {
    pub reading_order: ReadingOrderConfig,
    pub lines: LineConfig,
    pub cleanup: CleanupConfig,
    pub boundary: BoundaryConfig,
    pub hierarchy: HierarchyConfig,
}

// ---------------------------------------------------------------------------
// Reading order
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingOrderConfig {
    /// Minimum width (points) of a full-height whitespace band that separates
    /// side-by-side logical pages.
    pub logical_page_gutter: f32,
    /// Minimum width (points) of a whitespace band between columns.
    pub column_gutter: f32,
    /// Both sides of a logical-page divider must cover at least this share of
    /// the page's vertical text extent.
    pub min_vertical_coverage: f32,
    /// Gaps closer than this share of the page width to either edge are
    /// margins, not dividers.
    pub edge_margin_ratio: f32,
    /// Fragments wider than this share of their region span the columns
    /// (titles, banners) and are ordered as horizontal bands.
    pub spanning_ratio: f32,
    /// A column needs at least this many fragments starting inside it.
    pub min_column_fragments: usize,
    /// More column clusters than this is treated as noisy geometry.
    pub max_columns: usize,
}

impl Default for ReadingOrderConfig {
    fn default() -> Self {
        ReadingOrderConfig {
            logical_page_gutter: 80.0,
            column_gutter: 18.0,
            min_vertical_coverage: 0.5,
            edge_margin_ratio: 0.05,
            spanning_ratio: 0.6,
            min_column_fragments: 2,
            max_columns: 4,
        }
    }
}

// ---------------------------------------------------------------------------
// Line assembly
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineConfig {
    /// Fragments whose tops differ by at most this many points share a line.
    pub y_tolerance: f32,
    /// Horizontal gap (points) below which adjacent fragments are glued
    /// together without a space.
    pub min_word_gap: f32,
}

impl Default for LineConfig {
    fn default() -> Self {
        LineConfig {
            y_tolerance: 3.0,
            min_word_gap: 1.5,
        }
    }
}

// ---------------------------------------------------------------------------
// Cleanup
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanupConfig {
    /// How many lines at the top and bottom of each page are inspected for
    /// running headers and footers.
    pub edge_lines: usize,
    /// Share of pages a line must repeat on to count as page furniture.
    pub repeat_threshold: f32,
    /// Documents shorter than this are never scanned for furniture.
    pub min_pages: usize,
    /// Drop bare page numbers ("12", "Page 12") found at page edges.
    pub drop_page_numbers: bool,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        CleanupConfig {
            edge_lines: 3,
            repeat_threshold: 0.7,
            min_pages: 3,
            drop_page_numbers: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Boundary detection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundaryConfig {
    /// Candidates below this confidence are never reported.
    pub acceptance_floor: f32,
    /// Longer lines cannot be section headings.
    pub max_heading_chars: usize,
    pub exact_strength: f32,
    pub partial_strength: f32,
    pub fuzzy_strength: f32,
    /// Minimum share of pattern tokens that must appear in a partial match.
    pub partial_overlap: f32,
    /// Minimum normalized Levenshtein similarity for a fuzzy match.
    pub fuzzy_similarity: f32,
    /// Lines starting above this `y` get the full position score.
    pub top_band: f32,
    pub lower_position_score: f32,
    /// Lines after the heading inspected for section vocabulary.
    pub context_window: usize,
    pub context_bonus: f32,
    /// Re-run detection with [`BoundaryConfig::relaxed`] for sections that
    /// were not found.
    pub retry_relaxed: bool,
    pub relax: RelaxConfig,
    pub end_keywords: EndKeywords,
    pub letter: SectionRules,
    pub mdna: SectionRules,
}

/// How far [`BoundaryConfig::relaxed`] widens each threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelaxConfig {
    pub floor_factor: f32,
    pub similarity_delta: f32,
    pub overlap_delta: f32,
    pub window_factor: f32,
    pub prominence_delta: f32,
}

/// Headings that close an open section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndKeywords {
    pub financial_statements: Vec<String>,
    pub transitions: Vec<String>,
    pub structural: Vec<String>,
}

/// Per-section-type patterns and position/font rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionRules {
    pub patterns: Vec<String>,
    /// Words whose presence right after the heading raises confidence.
    pub context_vocabulary: Vec<String>,
    /// Only headings on pages `<= max_start_page` are eligible.
    pub max_start_page: Option<usize>,
    /// Only headings with `y < max_y` are eligible.
    pub max_y: Option<f32>,
    /// Fraction of the page height a heading must start above. Takes the
    /// place of `max_y` on pages whose height is known.
    pub max_y_ratio: Option<f32>,
    /// Font size ratio (to the document median) that counts as prominent.
    pub prominence_ratio: f32,
    /// Lines shorter than this count as prominent regardless of font size.
    pub short_line_chars: Option<usize>,
    pub prominence_boost: f32,
    pub prominence_penalty: f32,
    /// A later-page line this much larger than the median ends the section.
    pub end_heading_ratio: f32,
    /// Hard cap on section length in pages.
    pub max_pages: Option<usize>,
}

impl SectionRules {
    pub fn letter() -> Self {
        SectionRules {
            patterns: strings(&[
                "letter to stakeholders",
                "letter to shareholders",
                "letter to the shareholders",
                "chairman's letter",
                "chairmans letter",
                "chairman's message",
                "chairmans message",
                "chairperson's message",
                "ceo message",
                "ceo's message",
                "message from the chairman",
                "message from the ceo",
                "message from the managing director",
                "president's message",
                "letter from the chairman",
                "letter from the ceo",
                "dear stakeholders",
                "dear shareholders",
            ]),
            context_vocabulary: strings(&[
                "dear",
                "shareholders",
                "stakeholders",
                "members",
                "friends",
                "sincerely",
                "regards",
                "warm",
                "privilege",
            ]),
            max_start_page: Some(20),
            max_y: None,
            max_y_ratio: None,
            prominence_ratio: 1.05,
            short_line_chars: Some(50),
            prominence_boost: 1.05,
            prominence_penalty: 0.8,
            end_heading_ratio: 1.5,
            max_pages: Some(25),
        }
    }

    pub fn mdna() -> Self {
        SectionRules {
            patterns: strings(&[
                "management discussion and analysis",
                "management's discussion and analysis",
                "managements discussion and analysis",
                "management discussion and analysis report",
                "md&a",
                "mda",
                "financial review",
            ]),
            context_vocabulary: strings(&[
                "economy",
                "economic",
                "industry",
                "outlook",
                "overview",
                "opportunities",
                "threats",
                "risks",
                "segment",
                "performance",
            ]),
            max_start_page: None,
            max_y: Some(350.0),
            max_y_ratio: Some(0.4),
            prominence_ratio: 1.1,
            short_line_chars: None,
            prominence_boost: 1.05,
            prominence_penalty: 0.75,
            end_heading_ratio: 1.8,
            max_pages: None,
        }
    }
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        BoundaryConfig {
            acceptance_floor: 0.5,
            max_heading_chars: 120,
            exact_strength: 0.95,
            partial_strength: 0.8,
            fuzzy_strength: 0.65,
            partial_overlap: 0.75,
            fuzzy_similarity: 0.8,
            top_band: 150.0,
            lower_position_score: 0.9,
            context_window: 8,
            context_bonus: 0.05,
            retry_relaxed: false,
            relax: RelaxConfig {
                floor_factor: 0.8,
                similarity_delta: 0.05,
                overlap_delta: 0.15,
                window_factor: 1.5,
                prominence_delta: 0.05,
            },
            end_keywords: EndKeywords {
                financial_statements: strings(&[
                    "financial statements",
                    "consolidated financial statements",
                    "standalone financial statements",
                    "notes to financial statements",
                    "notes to accounts",
                    "independent auditor's report",
                    "auditor's report",
                    "auditors report",
                    "balance sheet",
                    "statement of profit and loss",
                    "income statement",
                    "cash flow statement",
                    "statement of cash flows",
                    "statement of financial position",
                ]),
                transitions: strings(&[
                    "wealth creation",
                    "financial highlights",
                    "key performance indicators",
                    "ten year financial summary",
                    "corporate information",
                    "awards and recognitions",
                ]),
                structural: strings(&[
                    "board's report",
                    "boards report",
                    "board report",
                    "directors' report",
                    "directors report",
                    "report on corporate governance",
                    "corporate governance report",
                    "business responsibility and sustainability report",
                    "annexure",
                ]),
            },
            letter: SectionRules::letter(),
            mdna: SectionRules::mdna(),
        }
    }
}

impl BoundaryConfig {
    pub fn rules(&self, section_type: SectionType) -> &SectionRules {
        match section_type {
            SectionType::Letter => &self.letter,
            SectionType::Mdna => &self.mdna,
        }
    }

    /// A copy with every threshold widened by [`RelaxConfig`], used for the
    /// second detection pass over documents where a section was not found.
    pub fn relaxed(&self) -> BoundaryConfig {
        let relax = &self.relax;
        let widen_rules = |rules: &SectionRules| SectionRules {
            max_start_page: rules
                .max_start_page
                .map(|p| (p as f32 * relax.window_factor).ceil() as usize),
            max_y: rules.max_y.map(|y| y * relax.window_factor),
            max_y_ratio: rules.max_y_ratio.map(|r| (r * relax.window_factor).min(1.0)),
            prominence_ratio: (rules.prominence_ratio - relax.prominence_delta).max(1.0),
            short_line_chars: rules
                .short_line_chars
                .map(|c| (c as f32 * relax.window_factor).ceil() as usize),
            ..rules.clone()
        };

        BoundaryConfig {
            acceptance_floor: self.acceptance_floor * relax.floor_factor,
            partial_overlap: (self.partial_overlap - relax.overlap_delta).max(0.0),
            fuzzy_similarity: (self.fuzzy_similarity - relax.similarity_delta).max(0.0),
            retry_relaxed: false,
            letter: widen_rules(&self.letter),
            mdna: widen_rules(&self.mdna),
            ..self.clone()
        }
    }
}

// ---------------------------------------------------------------------------
// Hierarchy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HierarchyConfig {
    pub max_heading_chars: usize,
    /// Lines at most this long count as a structural heading cue.
    pub short_line_chars: usize,
    /// Font ratio at which a line is a heading on size alone.
    pub heading_font_ratio: f32,
    /// Lines smaller than this ratio are never headings.
    pub min_heading_font_ratio: f32,
    /// Minimum alphabetic characters for a heading.
    pub min_letters: usize,
    pub topic_keywords: Vec<TopicKeyword>,
}

/// Domain vocabulary that always marks a heading at a fixed level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicKeyword {
    pub pattern: String,
    pub level: u8,
}

impl Default for HierarchyConfig {
    fn default() -> Self {
        let topics = [
            ("industry structure and developments", 2),
            ("opportunities and threats", 2),
            ("segment wise performance", 2),
            ("risks and concerns", 2),
            ("internal control systems", 2),
            ("financial performance", 2),
            ("human resources", 2),
            ("outlook", 2),
            ("revenue analysis", 3),
            ("key financial ratios", 3),
        ];
        HierarchyConfig {
            max_heading_chars: 120,
            short_line_chars: 60,
            heading_font_ratio: 1.15,
            min_heading_font_ratio: 0.95,
            min_letters: 2,
            topic_keywords: topics
                .iter()
                .map(|(pattern, level)| TopicKeyword {
                    pattern: pattern.to_string(),
                    level: *level,
                })
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading and validation
// ---------------------------------------------------------------------------

impl StructureConfig {
    /// Parse a TOML document and overlay it on the defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, StructureError> {
        let overrides: toml::Table = toml::from_str(s)?;
        let mut base = toml::Value::try_from(StructureConfig::default())?;
        merge_toml(&mut base, toml::Value::Table(overrides));
        let config: StructureConfig = base.try_into()?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, StructureError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject settings that would make the heuristics meaningless.
    pub fn validate(&self) -> Result<(), StructureError> {
        let ro = &self.reading_order;
        ensure(ro.logical_page_gutter > 0.0, "reading_order.logical_page_gutter must be > 0")?;
        ensure(ro.column_gutter > 0.0, "reading_order.column_gutter must be > 0")?;
        ensure(
            ro.column_gutter <= ro.logical_page_gutter,
            "reading_order.column_gutter must not exceed logical_page_gutter",
        )?;
        ensure(
            unit(ro.min_vertical_coverage) && unit(ro.edge_margin_ratio) && unit(ro.spanning_ratio),
            "reading_order ratios must be within [0, 1]",
        )?;
        ensure(ro.max_columns >= 1, "reading_order.max_columns must be >= 1")?;
        ensure(self.lines.y_tolerance >= 0.0, "lines.y_tolerance must be >= 0")?;
        ensure(
            unit(self.cleanup.repeat_threshold),
            "cleanup.repeat_threshold must be within [0, 1]",
        )?;

        let b = &self.boundary;
        ensure(
            b.acceptance_floor > 0.0 && b.acceptance_floor <= 1.0,
            "boundary.acceptance_floor must be within (0, 1]",
        )?;
        ensure(
            b.exact_strength >= b.partial_strength && b.partial_strength >= b.fuzzy_strength,
            "boundary strengths must satisfy exact >= partial >= fuzzy",
        )?;
        ensure(
            unit(b.partial_overlap) && unit(b.fuzzy_similarity),
            "boundary.partial_overlap and fuzzy_similarity must be within [0, 1]",
        )?;
        for section_type in SectionType::ALL {
            let rules = b.rules(section_type);
            ensure(
                !rules.patterns.is_empty(),
                &format!("boundary.{} needs at least one pattern", section_type),
            )?;
            ensure(
                rules.prominence_ratio > 0.0 && rules.end_heading_ratio > 0.0,
                &format!("boundary.{} ratios must be > 0", section_type),
            )?;
            ensure(
                rules.max_y_ratio.map_or(true, |r| r > 0.0 && r <= 1.0),
                &format!("boundary.{}.max_y_ratio must be within (0, 1]", section_type),
            )?;
        }

        for topic in &self.hierarchy.topic_keywords {
            HeadingLevel::try_from(topic.level).map_err(|e| {
                StructureError::InvalidConfig(format!("topic '{}': {}", topic.pattern, e))
            })?;
        }
        Ok(())
    }
}

fn unit(v: f32) -> bool {
    (0.0..=1.0).contains(&v)
}

fn ensure(cond: bool, msg: &str) -> Result<(), StructureError> {
    if cond {
        Ok(())
    } else {
        Err(StructureError::InvalidConfig(msg.to_string()))
    }
}

/// Recursively merge `overlay` into `base`: tables merge key by key, any other
/// value replaces what was there.
fn merge_toml(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_toml(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
