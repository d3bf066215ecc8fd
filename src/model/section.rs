//! Section — a uniform cylindrical compartment in the morphology tree.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::Point3;

/// Index of a section in the cell's ordered section list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SectionId(pub usize);

impl SectionId {
    /// The soma is always the first section.
    pub const SOMA: SectionId = SectionId(0);
}

impl std::fmt::Display for SectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A section of the cell.
///
/// `pt0` is the proximal (0-end) point and `pt1` the distal (1-end) point.
/// A child's 0-end is attached to its parent's 1-end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub name: String,
    /// Diameter (µm), constant along the section.
    pub diam: f64,
    pub pt0: Point3,
    pub pt1: Point3,
    /// Number of segments, always >= 1.
    pub nseg: usize,
    /// Geometry table row this section was created from.
    pub row: usize,
    pub parent: Option<SectionId>,
    pub children: SmallVec<[SectionId; 4]>,
}

impl Section {
    pub fn new(name: impl Into<String>, diam: f64, row: usize) -> Self {
        Self {
            name: name.into(),
            diam,
            pt0: Point3::ORIGIN,
            pt1: Point3::ORIGIN,
            nseg: 1,
            row,
            parent: None,
            children: SmallVec::new(),
        }
    }

    pub fn radius(&self) -> f64 {
        self.diam / 2.0
    }

    /// Distance between the two endpoints.
    pub fn length(&self) -> f64 {
        (self.pt1 - self.pt0).norm()
    }

    /// Length of one segment.
    pub fn segment_length(&self) -> f64 {
        self.length() / self.nseg as f64
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_lengths() {
        let mut s = Section::new("dend", 2.0, 1);
        s.pt0 = Point3::new(0.0, 0.0, 0.0);
        s.pt1 = Point3::new(30.0, 40.0, 0.0);
        s.nseg = 5;
        assert_eq!(s.radius(), 1.0);
        assert_eq!(s.length(), 50.0);
        assert_eq!(s.segment_length(), 10.0);
        assert!(s.is_root());
        s.parent = Some(SectionId::SOMA);
        assert!(!s.is_root());
    }
}
