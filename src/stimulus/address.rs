//! Current injection addressing: `(section, location)` → global segment.

use crate::model::*;
use crate::morphology::{Morphology, SegmentIndex};
use crate::{Error, Result};

/// Local segment index of normalized `location` on a section with `nseg`
/// segments: `floor(location · nseg)`, with `location = 1` folded onto the
/// last segment.
pub fn local_segment(location: f64, nseg: usize) -> Result<usize> {
    if !(0.0..=1.0).contains(&location) {
        return Err(Error::AddressingError(format!(
            "location must be within [0, 1], got {location}"
        )));
    }
    if nseg == 0 {
        return Err(Error::AddressingError("section has no segments".into()));
    }
    Ok(((location * nseg as f64).floor() as usize).min(nseg - 1))
}

/// Global segment index receiving a stimulus at `location` on `section`.
pub fn resolve(
    morphology: &Morphology,
    index: &SegmentIndex,
    section: SectionId,
    location: f64,
) -> Result<SegmentId> {
    let nseg = morphology.section(section)?.nseg;
    let local = local_segment(location, nseg)?;
    let start = index.first_segment(section)?;
    Ok(SegmentId(start.0 + local))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::morphology::{build, index};

    fn cell() -> (Morphology, SegmentIndex) {
        let table = GeometryTable::new(vec![
            SectionRecord::soma("soma", 10.0),
            SectionRecord::branch("dend", 0, 100.0, 5.0, 0.0, true),
        ])
        .unwrap();
        let m = build(&table, 30.0).unwrap();
        let idx = index(m.sections());
        (m, idx)
    }

    #[test]
    fn test_midpoint_of_four_segment_branch() {
        let (m, idx) = cell();
        assert_eq!(resolve(&m, &idx, SectionId(1), 0.5).unwrap(), SegmentId(3));
    }

    #[test]
    fn test_boundaries() {
        let (m, idx) = cell();
        assert_eq!(resolve(&m, &idx, SectionId(1), 0.0).unwrap(), SegmentId(1));
        assert_eq!(resolve(&m, &idx, SectionId(1), 1.0).unwrap(), SegmentId(4));
        assert_eq!(resolve(&m, &idx, SectionId(1), 0.25).unwrap(), SegmentId(2));
        assert_eq!(resolve(&m, &idx, SectionId::SOMA, 1.0).unwrap(), SegmentId(0));
    }

    #[test]
    fn test_out_of_range() {
        let (m, idx) = cell();
        assert!(matches!(resolve(&m, &idx, SectionId(1), 1.01), Err(Error::AddressingError(_))));
        assert!(matches!(resolve(&m, &idx, SectionId(1), -0.1), Err(Error::AddressingError(_))));
        assert!(matches!(resolve(&m, &idx, SectionId(1), f64::NAN), Err(Error::AddressingError(_))));
        assert!(matches!(resolve(&m, &idx, SectionId(2), 0.5), Err(Error::AddressingError(_))));
    }

    #[test]
    fn test_local_segment() {
        assert_eq!(local_segment(0.999, 4).unwrap(), 3);
        assert_eq!(local_segment(1.0, 4).unwrap(), 3);
        assert_eq!(local_segment(0.5, 1).unwrap(), 0);
    }
}
