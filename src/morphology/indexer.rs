//! Segment indexer — flattens every section's segments into one list.
//!
//! Ordering is sections in build order, then segments from the 0-end to
//! the 1-end. `sec_id_in_seg[i]` is the global index of section `i`'s
//! first segment, i.e. the sum of `nseg` over sections `0..i`.

use serde::Serialize;

use crate::model::*;
use crate::{Error, Result};

/// Flattened segment list plus the per-section start offsets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SegmentIndex {
    segments: Vec<Segment>,
    sec_id_in_seg: Vec<usize>,
}

impl SegmentIndex {
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn sec_id_in_seg(&self) -> &[usize] {
        &self.sec_id_in_seg
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segment(&self, id: SegmentId) -> Result<Segment> {
        self.segments.get(id.0).copied().ok_or_else(|| {
            Error::AddressingError(format!(
                "segment {id} out of range (cell has {} segments)",
                self.segments.len()
            ))
        })
    }

    /// Global id of the first segment of `section`.
    pub fn first_segment(&self, section: SectionId) -> Result<SegmentId> {
        self.sec_id_in_seg
            .get(section.0)
            .map(|&start| SegmentId(start))
            .ok_or_else(|| {
                Error::AddressingError(format!(
                    "section {section} out of range (cell has {} sections)",
                    self.sec_id_in_seg.len()
                ))
            })
    }

    /// Global id of `segment`.
    pub fn global_id(&self, segment: Segment) -> Result<SegmentId> {
        let start = self.first_segment(segment.section)?;
        let id = SegmentId(start.0 + segment.local);
        match self.segments.get(id.0) {
            Some(found) if *found == segment => Ok(id),
            _ => Err(Error::AddressingError(format!(
                "section {} has no segment {}",
                segment.section, segment.local
            ))),
        }
    }
}

/// Flatten `sections` into a [`SegmentIndex`]. Empty input gives an empty
/// index.
pub fn index(sections: &[Section]) -> SegmentIndex {
    let total = sections.iter().map(|s| s.nseg).sum();
    let mut segments = Vec::with_capacity(total);
    let mut sec_id_in_seg = Vec::with_capacity(sections.len());

    for (i, section) in sections.iter().enumerate() {
        sec_id_in_seg.push(segments.len());
        segments.extend((0..section.nseg).map(|local| Segment::new(SectionId(i), local)));
    }

    SegmentIndex { segments, sec_id_in_seg }
}
