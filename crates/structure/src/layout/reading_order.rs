//! Reading-order reconstruction for spread and multi-column pages.
//!
//! A physical page is split into side-by-side logical pages at wide,
//! full-height whitespace gutters. Each logical page is then split into
//! columns at narrower gutters, and its fragments are emitted band by band:
//! full-width fragments (titles, banners) cut the page into horizontal bands,
//! and inside a band columns are read left to right, each top to bottom.

use std::cmp::Ordering;
use std::ops::Range;

use crate::config::ReadingOrderConfig;
use crate::types::{Fragment, LogicalPage, PageLayout, PhysicalPage, UnplacedFragment};

/// Output of [`reconstruct_document`].
#[derive(Debug, Clone, Default)]
pub struct Reconstruction {
    /// Logical pages in reading order, renumbered from 0.
    pub pages: Vec<LogicalPage>,
    pub unplaced: Vec<UnplacedFragment>,
}

/// Validate and order the fragments of every physical page.
///
/// Physical pages are processed in `page_index` order. Every physical page
/// yields at least one logical page, so a blank page still occupies a page
/// number.
pub fn reconstruct_document(pages: &[PhysicalPage], config: &ReadingOrderConfig) -> Reconstruction {
    let mut physical: Vec<&PhysicalPage> = pages.iter().collect();
    physical.sort_by_key(|p| p.page_index);

    let mut out = Reconstruction::default();
    for page in physical {
        let mut fragments = Vec::with_capacity(page.fragments.len());
        for raw in &page.fragments {
            match raw.clone().validate(page.page_index) {
                Ok(fragment) => fragments.push(fragment),
                Err(unplaced) => {
                    log::warn!(
                        "Page {}: skipping fragment {:?} ({})",
                        page.page_index + 1,
                        unplaced.text,
                        unplaced.reason
                    );
                    out.unplaced.push(unplaced);
                }
            }
        }

        let height = page.height.filter(|h| h.is_finite() && *h > 0.0);
        for mut logical in reconstruct_page(page.page_index, &fragments, page.width, config) {
            logical.page_index = out.pages.len();
            logical.page_height = height;
            out.pages.push(logical);
        }
    }
    out
}

/// Order one physical page's fragments. Never fails: geometry that cannot be
/// interpreted falls back to a single top-to-bottom column marked
/// [`PageLayout::Degraded`].
///
/// `page_index` of the returned pages counts from 0 within this physical page;
/// [`reconstruct_document`] renumbers them across the document.
pub fn reconstruct_page(
    page_index: usize,
    fragments: &[Fragment],
    width: Option<f32>,
    config: &ReadingOrderConfig,
) -> Vec<LogicalPage> {
    if fragments.is_empty() {
        return vec![LogicalPage {
            source_page_index: page_index,
            page_index: 0,
            column_count: 1,
            layout: PageLayout::SingleColumn,
            page_height: None,
            fragments: Vec::new(),
            runs: Vec::new(),
        }];
    }

    let page_width = width
        .filter(|w| w.is_finite() && *w > 0.0)
        .unwrap_or_else(|| fragments.iter().map(|f| f.bbox.x1).fold(0.0, f32::max));

    let dividers = logical_dividers(fragments, page_width, config);
    if !dividers.is_empty() {
        log::debug!(
            "Page {}: {} logical pages side by side",
            page_index + 1,
            dividers.len() + 1
        );
    }

    let mut regions: Vec<Vec<Fragment>> = vec![Vec::new(); dividers.len() + 1];
    for fragment in fragments {
        let center = fragment.bbox.center_x();
        let region = dividers.iter().filter(|&&d| d < center).count();
        regions[region].push(fragment.clone());
    }

    regions
        .into_iter()
        .filter(|region| !region.is_empty())
        .enumerate()
        .map(|(i, region)| order_region(page_index, i, region, config))
        .collect()
}

/// x positions of whitespace gutters separating side-by-side logical pages.
fn logical_dividers(fragments: &[Fragment], page_width: f32, config: &ReadingOrderConfig) -> Vec<f32> {
    let max_width = config.spanning_ratio * page_width;
    let narrow: Vec<&Fragment> = fragments
        .iter()
        .filter(|f| f.bbox.width() <= max_width)
        .collect();

    let (top, bottom) = vertical_extent(fragments.iter());
    let extent = bottom - top;
    let margin = config.edge_margin_ratio * page_width;

    interior_gaps(narrow.iter().map(|f| (f.bbox.x0, f.bbox.x1)))
        .into_iter()
        .filter(|(start, end)| end - start >= config.logical_page_gutter)
        .filter_map(|(start, end)| {
            let mid = (start + end) / 2.0;
            if mid < margin || mid > page_width - margin {
                return None;
            }
            if extent > 0.0 {
                let (lt, lb) = vertical_extent(narrow.iter().copied().filter(|f| f.bbox.x1 <= start));
                let (rt, rb) = vertical_extent(narrow.iter().copied().filter(|f| f.bbox.x0 >= end));
                let needed = config.min_vertical_coverage * extent;
                if lb - lt < needed || rb - rt < needed {
                    return None;
                }
            }
            Some(mid)
        })
        .collect()
}

/// Order the fragments of one logical page.
fn order_region(
    source_page_index: usize,
    index_in_page: usize,
    fragments: Vec<Fragment>,
    config: &ReadingOrderConfig,
) -> LogicalPage {
    let left = fragments.iter().map(|f| f.bbox.x0).fold(f32::INFINITY, f32::min);
    let right = fragments.iter().map(|f| f.bbox.x1).fold(f32::NEG_INFINITY, f32::max);
    let region_width = (right - left).max(0.0);

    let (spanning, narrow): (Vec<Fragment>, Vec<Fragment>) = fragments
        .iter()
        .cloned()
        .partition(|f| region_width > 0.0 && f.bbox.width() > config.spanning_ratio * region_width);

    let boundaries = column_boundaries(&narrow, config);

    if boundaries.len() + 1 > config.max_columns {
        log::warn!(
            "Page {}: {} column clusters exceed the limit of {}, falling back to top-to-bottom order",
            source_page_index + 1,
            boundaries.len() + 1,
            config.max_columns
        );
        return degraded(source_page_index, index_in_page, fragments);
    }

    let column_count = boundaries.len() + 1;
    let (ordered, runs) = emit_bands(spanning, narrow, &boundaries);
    LogicalPage {
        source_page_index,
        page_index: index_in_page,
        column_count,
        layout: if column_count > 1 {
            PageLayout::Columns
        } else {
            PageLayout::SingleColumn
        },
        page_height: None,
        fragments: ordered,
        runs,
    }
}

/// Column boundaries (gutter midpoints, ascending) inside a logical page.
///
/// Candidate gutters come from gaps in the horizontal coverage of non-spanning
/// fragments. A column that receives fewer than `min_column_fragments` left
/// edges is merged into its neighbour.
fn column_boundaries(narrow: &[Fragment], config: &ReadingOrderConfig) -> Vec<f32> {
    let mut boundaries: Vec<f32> = interior_gaps(narrow.iter().map(|f| (f.bbox.x0, f.bbox.x1)))
        .into_iter()
        .filter(|(start, end)| end - start >= config.column_gutter)
        .map(|(start, end)| (start + end) / 2.0)
        .collect();

    loop {
        let mut starts = vec![0usize; boundaries.len() + 1];
        for f in narrow {
            starts[column_of(f.bbox.x0, &boundaries)] += 1;
        }
        let Some(sparse) = starts.iter().position(|&n| n < config.min_column_fragments) else {
            break;
        };
        if boundaries.is_empty() {
            break;
        }
        // Drop the gutter on the sparse column's left, or its right for the
        // first column.
        boundaries.remove(sparse.saturating_sub(1).min(boundaries.len() - 1));
    }
    boundaries
}

fn column_of(x: f32, boundaries: &[f32]) -> usize {
    boundaries.iter().filter(|&&b| b < x).count()
}

/// Emit fragments band by band. Returns the ordered fragments and the runs
/// partitioning them.
fn emit_bands(
    mut spanning: Vec<Fragment>,
    narrow: Vec<Fragment>,
    boundaries: &[f32],
) -> (Vec<Fragment>, Vec<Range<usize>>) {
    spanning.sort_by(|a, b| cmp_f32(a.bbox.y0, b.bbox.y0));
    let band_edges: Vec<f32> = spanning.iter().map(|f| f.bbox.y0).collect();

    // bands[band][column]
    let column_count = boundaries.len() + 1;
    let mut bands: Vec<Vec<Vec<Fragment>>> = vec![vec![Vec::new(); column_count]; spanning.len() + 1];
    for fragment in narrow {
        let band = band_edges
            .iter()
            .filter(|&&edge| edge <= fragment.bbox.center_y())
            .count();
        let column = column_of(fragment.bbox.x0, boundaries);
        bands[band][column].push(fragment);
    }

    let mut ordered = Vec::new();
    let mut runs: Vec<Range<usize>> = Vec::new();
    let mut after_banner = false;
    let mut spanning = spanning.into_iter();
    for band in bands {
        for mut column in band {
            if column.is_empty() {
                continue;
            }
            column.sort_by(|a, b| cmp_f32(a.bbox.y0, b.bbox.y0).then(cmp_f32(a.bbox.x0, b.bbox.x0)));
            let start = ordered.len();
            ordered.extend(column);
            runs.push(start..ordered.len());
            after_banner = false;
        }
        if let Some(banner) = spanning.next() {
            // Consecutive banners with no body text between them share a run.
            match runs.last_mut() {
                Some(run) if after_banner => run.end += 1,
                _ => runs.push(ordered.len()..ordered.len() + 1),
            }
            ordered.push(banner);
            after_banner = true;
        }
    }
    (ordered, runs)
}

/// Single column in top-to-bottom order. The sort is stable, so fragments with
/// the same `y0` keep their input order.
fn degraded(source_page_index: usize, index_in_page: usize, mut fragments: Vec<Fragment>) -> LogicalPage {
    fragments.sort_by(|a, b| cmp_f32(a.bbox.y0, b.bbox.y0));
    let len = fragments.len();
    LogicalPage {
        source_page_index,
        page_index: index_in_page,
        column_count: 1,
        layout: PageLayout::Degraded,
        page_height: None,
        fragments,
        runs: vec![0..len],
    }
}

/// Whitespace gaps between the merged horizontal coverage of `intervals`.
/// Only gaps with text on both sides are returned.
fn interior_gaps(intervals: impl Iterator<Item = (f32, f32)>) -> Vec<(f32, f32)> {
    let mut intervals: Vec<(f32, f32)> = intervals.collect();
    intervals.sort_by(|a, b| cmp_f32(a.0, b.0));

    let mut gaps = Vec::new();
    let mut covered_to: Option<f32> = None;
    for (x0, x1) in intervals {
        match covered_to {
            Some(end) if x0 > end => {
                gaps.push((end, x0));
                covered_to = Some(x1);
            }
            Some(end) => covered_to = Some(end.max(x1)),
            None => covered_to = Some(x1),
        }
    }
    gaps
}

fn vertical_extent<'a>(fragments: impl Iterator<Item = &'a Fragment>) -> (f32, f32) {
    fragments.fold((f32::INFINITY, f32::NEG_INFINITY), |(top, bottom), f| {
        (top.min(f.bbox.y0), bottom.max(f.bbox.y1))
    })
}

fn cmp_f32(a: f32, b: f32) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}
