//! Geometry: from positioned fragments to an ordered line stream.
//!
//! ```text
//! PhysicalPage[]  ->  LogicalPage[]  ->  Line[]
//!                reading_order       lines
//! ```

pub mod lines;
pub mod reading_order;

pub use lines::{assemble_document_lines, assemble_lines, build_font_statistics, FontStatistics};
pub use reading_order::{reconstruct_document, reconstruct_page, Reconstruction};
