//! Segment geometry — per-segment direction, center and radius.
//!
//! Each section's endpoint line is split into `2·nseg + 1` evenly spaced
//! points; segment `k` runs from point `2k` to point `2k + 2` with its
//! center at `2k + 1`. The result is derived data and is never cached.

use serde::{Deserialize, Serialize};

use crate::model::*;

/// Per-segment geometry, one entry per global segment index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SegCoords {
    /// Segment axis: distal point minus proximal point.
    pub dl: Vec<Point3>,
    /// Segment center.
    pub pc: Vec<Point3>,
    /// Segment radius (the owning section's `diam / 2`).
    pub r: Vec<f64>,
}

impl SegCoords {
    pub fn len(&self) -> usize {
        self.r.len()
    }

    pub fn is_empty(&self) -> bool {
        self.r.is_empty()
    }

    /// Proximal point of a segment, recovered from center and axis.
    pub fn proximal(&self, seg: SegmentId) -> Option<Point3> {
        Some(*self.pc.get(seg.0)? - *self.dl.get(seg.0)? * 0.5)
    }

    /// Distal point of a segment, recovered from center and axis.
    pub fn distal(&self, seg: SegmentId) -> Option<Point3> {
        Some(*self.pc.get(seg.0)? + *self.dl.get(seg.0)? * 0.5)
    }
}

/// Compute [`SegCoords`] for every segment of `sections`.
///
/// `sec_id_in_seg` must be the offsets produced by
/// [`index`](super::index) for the same sections; callers outside the
/// crate go through `Cell::seg_coords`, which holds both together.
pub(crate) fn compute(sections: &[Section], sec_id_in_seg: &[usize]) -> SegCoords {
    debug_assert_eq!(sections.len(), sec_id_in_seg.len());
    let total: usize = sections.iter().map(|s| s.nseg).sum();
    let mut coords = SegCoords {
        dl: vec![Point3::ORIGIN; total],
        pc: vec![Point3::ORIGIN; total],
        r: vec![0.0; total],
    };

    for (section, &start) in sections.iter().zip(sec_id_in_seg) {
        let n = section.nseg;
        let count = 2 * n + 1;
        let point = |i: usize| Point3::linspace(section.pt0, section.pt1, i, count);
        for k in 0..n {
            let (p0, pmid, p1) = (point(2 * k), point(2 * k + 1), point(2 * k + 2));
            coords.dl[start + k] = p1 - p0;
            coords.pc[start + k] = pmid;
            coords.r[start + k] = section.radius();
        }
    }
    coords
}
