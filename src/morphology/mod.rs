//! # Morphology Discretization
//!
//! Turns a [`GeometryTable`] into a tree of 3D-located sections, each
//! split into `nseg` segments.
//!
//! ```text
//! GeometryTable ──build()──▶ Morphology ──index()──▶ SegmentIndex
//!                                │                        │
//!                                └──────compute()◀────────┘
//!                                          │
//!                                      SegCoords
//! ```
//!
//! Soma placement is two-phase: [`place_provisional`] puts the soma at
//! `(0,-2R,0)→(0,0,0)` so children attach at its provisional distal end,
//! then [`finalize_soma`] re-centers it to `(0,-R,0)→(0,R,0)` once every
//! row has been placed.

pub mod indexer;
pub mod coords;

pub use indexer::{index, SegmentIndex};
pub use coords::SegCoords;
pub(crate) use coords::compute;

use serde::Serialize;
use tracing::{debug, info};

use crate::model::*;
use crate::{Error, Result};

/// The built section tree.
///
/// Immutable once [`build`] returns: endpoints, diameters and segment
/// counts never change afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Morphology {
    sections: Vec<Section>,
    /// Geometry row → first section created for it.
    row_sections: Vec<SectionId>,
}

impl Morphology {
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section(&self, id: SectionId) -> Result<&Section> {
        self.sections.get(id.0).ok_or_else(|| {
            Error::AddressingError(format!(
                "section {id} out of range (cell has {} sections)",
                self.sections.len()
            ))
        })
    }

    pub fn soma(&self) -> &Section {
        &self.sections[SectionId::SOMA.0]
    }

    /// First section created for each geometry row. Non-axial rows create
    /// two sections; only the first one is listed here.
    pub fn row_sections(&self) -> &[SectionId] {
        &self.row_sections
    }

    /// All sections created for a geometry row (one, or two for a
    /// non-axial branch).
    pub fn sections_for_row(&self, row: usize) -> &[Section] {
        let Some(first) = self.row_sections.get(row) else {
            return &[];
        };
        let end = self
            .row_sections
            .get(row + 1)
            .map_or(self.sections.len(), |next| next.0);
        &self.sections[first.0..end]
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn children(&self, id: SectionId) -> Result<&[SectionId]> {
        Ok(self.section(id)?.children.as_slice())
    }
}

/// Upper bound on segments per section.
pub const MAX_NSEG: usize = 32767;

/// Segment count for a section of length `length`: `ceil(L / dL)`, at least 1.
/// Fails when the count would exceed [`MAX_NSEG`].
pub fn segment_count(length: f64, max_seg_length: f64) -> Result<usize> {
    let n = (length / max_seg_length).ceil();
    if n.is_nan() || n > MAX_NSEG as f64 {
        return Err(Error::ConfigurationError(format!(
            "length {length} at max segment length {max_seg_length} needs {n} segments (max {MAX_NSEG})"
        )));
    }
    Ok((n as usize).max(1))
}

/// Build the section tree from a geometry table.
///
/// Rows are placed in table order. Each branch starts at its parent's
/// distal end; a non-axial branch yields a second section whose offset is
/// mirrored in the first coordinate.
pub fn build(table: &GeometryTable, max_seg_length: f64) -> Result<Morphology> {
    if !(max_seg_length.is_finite() && max_seg_length > 0.0) {
        return Err(Error::ConfigurationError(format!(
            "max segment length must be positive, got {max_seg_length}"
        )));
    }

    let mut sections = Vec::with_capacity(table.section_count());
    let mut row_sections = Vec::with_capacity(table.len());

    for (row, rec) in table.rows().iter().enumerate() {
        row_sections.push(SectionId(sections.len()));
        if row == 0 {
            place_provisional(&mut sections, rec)?;
            continue;
        }

        let parent = rec
            .pid
            .filter(|&pid| pid < row)
            .map(|pid| row_sections[pid])
            .ok_or_else(|| {
                Error::ConfigurationError(format!(
                    "row {row} ('{}'): parent id {:?} does not reference an earlier row",
                    rec.name, rec.pid
                ))
            })?;
        place_branch(&mut sections, row, rec, parent, max_seg_length).map_err(|e| match e {
            Error::ConfigurationError(msg) => {
                Error::ConfigurationError(format!("row {row} ('{}'): {msg}", rec.name))
            }
            other => other,
        })?;
    }

    let total = sections
        .iter()
        .try_fold(0usize, |acc, s| acc.checked_add(s.nseg))
        .ok_or_else(|| Error::ConfigurationError("total segment count overflows".into()))?;

    finalize_soma(&mut sections, table.soma().radius)?;

    let morphology = Morphology { sections, row_sections };
    info!(
        rows = table.len(),
        sections = morphology.len(),
        segments = total,
        "morphology built"
    );
    Ok(morphology)
}

/// Phase one of soma placement: diameter `2R`, one segment, endpoints
/// `(0,-2R,0)→(0,0,0)`. Must be the first section created.
pub fn place_provisional(sections: &mut Vec<Section>, soma: &SectionRecord) -> Result<()> {
    if !sections.is_empty() {
        return Err(Error::ConfigurationError(
            "soma must be the first section placed".into(),
        ));
    }
    let r = soma.radius;
    let mut section = Section::new(soma.name.clone(), 2.0 * r, 0);
    section.pt0 = Point3::new(0.0, -2.0 * r, 0.0);
    section.pt1 = Point3::ORIGIN;
    section.nseg = 1;
    debug!(name = %section.name, diam = section.diam, "placed provisional soma");
    sections.push(section);
    Ok(())
}

/// Phase two of soma placement: re-center the soma to `(0,-R,0)→(0,R,0)`.
/// Children keep the attachment point they got in phase one.
pub fn finalize_soma(sections: &mut [Section], radius: f64) -> Result<()> {
    let soma = sections.first_mut().ok_or_else(|| {
        Error::ConfigurationError("cannot finalize soma: no sections placed".into())
    })?;
    soma.pt0 = Point3::new(0.0, -radius, 0.0);
    soma.pt1 = Point3::new(0.0, radius, 0.0);
    soma.nseg = 1;
    Ok(())
}

fn place_branch(
    sections: &mut Vec<Section>,
    row: usize,
    rec: &SectionRecord,
    parent: SectionId,
    max_seg_length: f64,
) -> Result<()> {
    let pt0 = sections[parent.0].pt1;
    let nseg = segment_count(rec.length, max_seg_length)?;
    let lateral = if rec.axial { 0.0 } else { rec.length * rec.ang.cos() };
    let offset = Point3::new(lateral, rec.length * rec.ang.sin(), 0.0);

    push_child(sections, row, rec, parent, pt0, pt0 + offset, nseg);
    if !rec.axial {
        push_child(sections, row, rec, parent, pt0, pt0 + offset.mirror_x(), nseg);
    }
    Ok(())
}

fn push_child(
    sections: &mut Vec<Section>,
    row: usize,
    rec: &SectionRecord,
    parent: SectionId,
    pt0: Point3,
    pt1: Point3,
    nseg: usize,
) {
    let id = SectionId(sections.len());
    let mut section = Section::new(rec.name.clone(), 2.0 * rec.radius, row);
    section.pt0 = pt0;
    section.pt1 = pt1;
    section.nseg = nseg;
    section.parent = Some(parent);
    debug!(section = %id, name = %section.name, %parent, nseg, pt1 = %pt1, "placed section");
    sections.push(section);
    sections[parent.0].children.push(id);
}
