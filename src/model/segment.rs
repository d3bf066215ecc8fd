//! Segment — the smallest addressable piece of a section.

use serde::{Deserialize, Serialize};

use super::SectionId;

/// Global index into the cell's flattened segment list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SegmentId(pub usize);

impl std::fmt::Display for SegmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lightweight handle: which section, and which segment within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Segment {
    pub section: SectionId,
    pub local: usize,
}

impl Segment {
    pub fn new(section: SectionId, local: usize) -> Self {
        Self { section, local }
    }

    /// Normalized position of the segment center along its section,
    /// given the section's segment count.
    pub fn x(&self, nseg: usize) -> f64 {
        (self.local as f64 + 0.5) / nseg as f64
    }
}
