//! Geometry table — the tabular morphology description a cell is built from.
//!
//! One row per branch, in build order. Row 0 is always the soma; every
//! other row names an earlier row as its parent, which makes the table a
//! tree by construction.

use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Row type. The table encodes it as an integer column where `1` is soma.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum SectionKind {
    Soma,
    Other(i64),
}

impl SectionKind {
    pub const SOMA_CODE: i64 = 1;

    pub fn is_soma(&self) -> bool {
        matches!(self, SectionKind::Soma)
    }
}

impl From<i64> for SectionKind {
    fn from(code: i64) -> Self {
        if code == Self::SOMA_CODE { SectionKind::Soma } else { SectionKind::Other(code) }
    }
}

impl From<SectionKind> for i64 {
    fn from(kind: SectionKind) -> i64 {
        match kind {
            SectionKind::Soma => SectionKind::SOMA_CODE,
            SectionKind::Other(code) => code,
        }
    }
}

/// One input row of the geometry table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: SectionKind,
    /// Axial rows extend along the main axis; non-axial rows split into a
    /// mirrored pair of sections.
    pub axial: bool,
    /// Length (µm).
    #[serde(rename = "L")]
    pub length: f64,
    /// Radius (µm).
    #[serde(rename = "R")]
    pub radius: f64,
    /// Branch angle (radians).
    pub ang: f64,
    /// Parent row. Ignored for the soma row.
    #[serde(default)]
    pub pid: Option<usize>,
}

impl SectionRecord {
    pub fn soma(name: impl Into<String>, radius: f64) -> Self {
        Self {
            name: name.into(),
            kind: SectionKind::Soma,
            axial: true,
            length: 2.0 * radius,
            radius,
            ang: 0.0,
            pid: None,
        }
    }

    pub fn branch(
        name: impl Into<String>,
        pid: usize,
        length: f64,
        radius: f64,
        ang: f64,
        axial: bool,
    ) -> Self {
        Self {
            name: name.into(),
            kind: SectionKind::Other(0),
            axial,
            length,
            radius,
            ang,
            pid: Some(pid),
        }
    }
}

/// Validated, ordered geometry table.
///
/// Invariants (checked on every construction path, deserialization included):
/// - at least one row, and row 0 is a soma;
/// - every row after the first has a `pid` strictly less than its own index;
/// - every `L` and `R` is finite and positive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<SectionRecord>", into = "Vec<SectionRecord>")]
pub struct GeometryTable {
    rows: Vec<SectionRecord>,
}

impl GeometryTable {
    pub fn new(rows: Vec<SectionRecord>) -> Result<Self> {
        validate(&rows)?;
        Ok(Self { rows })
    }

    /// Decode a JSON array of rows.
    pub fn from_json(json: &str) -> Result<Self> {
        let rows: Vec<SectionRecord> =
            serde_json::from_str(json).map_err(|e| Error::undecodable("geometry table", e))?;
        Self::new(rows)
    }

    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self> {
        let rows: Vec<SectionRecord> =
            serde_json::from_reader(reader).map_err(|e| Error::undecodable("geometry table", e))?;
        Self::new(rows)
    }

    pub fn rows(&self) -> &[SectionRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn soma(&self) -> &SectionRecord {
        &self.rows[0]
    }

    /// Number of sections the table expands to: one per row, plus one
    /// extra for every non-axial branch row.
    pub fn section_count(&self) -> usize {
        self.rows.len() + self.rows.iter().skip(1).filter(|r| !r.axial).count()
    }
}

impl TryFrom<Vec<SectionRecord>> for GeometryTable {
    type Error = Error;

    fn try_from(rows: Vec<SectionRecord>) -> Result<Self> {
        Self::new(rows)
    }
}

impl From<GeometryTable> for Vec<SectionRecord> {
    fn from(table: GeometryTable) -> Self {
        table.rows
    }
}

fn validate(rows: &[SectionRecord]) -> Result<()> {
    let first = rows
        .first()
        .ok_or_else(|| Error::ConfigurationError("geometry table is empty".into()))?;
    if !first.kind.is_soma() {
        return Err(Error::ConfigurationError(format!(
            "first row of geometry must be soma, got type {} ('{}')",
            i64::from(first.kind),
            first.name
        )));
    }

    for (row, rec) in rows.iter().enumerate() {
        if !(rec.radius.is_finite() && rec.radius > 0.0) {
            return Err(Error::ConfigurationError(format!(
                "row {row} ('{}'): radius must be positive, got {}",
                rec.name, rec.radius
            )));
        }
        if !(rec.length.is_finite() && rec.length > 0.0) {
            return Err(Error::ConfigurationError(format!(
                "row {row} ('{}'): length must be positive, got {}",
                rec.name, rec.length
            )));
        }
        if row == 0 {
            continue;
        }
        if !rec.ang.is_finite() {
            return Err(Error::ConfigurationError(format!(
                "row {row} ('{}'): angle must be finite",
                rec.name
            )));
        }
        match rec.pid {
            None => {
                return Err(Error::ConfigurationError(format!(
                    "row {row} ('{}'): missing parent id",
                    rec.name
                )));
            }
            // pid < row rules out self references, forward references and cycles.
            Some(pid) if pid >= row => {
                return Err(Error::ConfigurationError(format!(
                    "row {row} ('{}'): parent id {pid} does not reference an earlier row",
                    rec.name
                )));
            }
            Some(_) => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_rows() -> Vec<SectionRecord> {
        vec![
            SectionRecord::soma("soma", 10.0),
            SectionRecord::branch("dend", 0, 100.0, 5.0, 0.0, true),
        ]
    }

    #[test]
    fn test_valid_table() {
        let table = GeometryTable::new(two_rows()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.section_count(), 2);
        assert!(table.soma().kind.is_soma());
    }

    #[test]
    fn test_empty_table_rejected() {
        let err = GeometryTable::new(Vec::new()).unwrap_err();
        assert!(matches!(err, Error::ConfigurationError(_)));
    }

    #[test]
    fn test_first_row_must_be_soma() {
        let mut rows = two_rows();
        rows.swap(0, 1);
        rows[1].pid = Some(0);
        assert!(matches!(GeometryTable::new(rows), Err(Error::ConfigurationError(_))));
    }

    #[test]
    fn test_forward_and_self_reference_rejected() {
        let mut rows = two_rows();
        rows[1].pid = Some(1);
        assert!(GeometryTable::new(rows.clone()).is_err());
        rows[1].pid = Some(5);
        assert!(GeometryTable::new(rows).is_err());
    }

    #[test]
    fn test_missing_pid_rejected() {
        let mut rows = two_rows();
        rows[1].pid = None;
        assert!(matches!(GeometryTable::new(rows), Err(Error::ConfigurationError(_))));
    }

    #[test]
    fn test_non_positive_dimensions_rejected() {
        let mut rows = two_rows();
        rows[1].length = 0.0;
        assert!(GeometryTable::new(rows.clone()).is_err());
        rows[1].length = 10.0;
        rows[1].radius = f64::NAN;
        assert!(GeometryTable::new(rows).is_err());
    }

    #[test]
    fn test_from_json_columns() {
        let json = r#"[
            {"type": 1, "name": "soma", "pid": null, "L": 20.0, "R": 10.0, "ang": 0.0, "axial": true},
            {"type": 3, "name": "basal", "pid": 0, "L": 50.0, "R": 1.0, "ang": 0.785, "axial": false}
        ]"#;
        let table = GeometryTable::from_json(json).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[1].kind, SectionKind::Other(3));
        assert_eq!(table.section_count(), 3);
    }

    #[test]
    fn test_from_json_validates() {
        let json = r#"[{"type": 3, "name": "dend", "pid": 0, "L": 50.0, "R": 1.0, "ang": 0.0, "axial": true}]"#;
        assert!(matches!(GeometryTable::from_json(json), Err(Error::ConfigurationError(_))));
    }

    #[test]
    fn test_non_table_input_is_configuration_error() {
        match GeometryTable::from_json(r#"{"name": "soma"}"#) {
            Err(Error::ConfigurationError(msg)) => assert!(msg.contains("expected a sequence"), "{msg}"),
            other => panic!("expected configuration error, got {other:?}"),
        }
        assert!(matches!(GeometryTable::from_json("not json"), Err(Error::ConfigurationError(_))));
    }

    #[test]
    fn test_from_json_reader() {
        let json = br#"[{"type": 1, "name": "soma", "L": 20.0, "R": 10.0, "ang": 0.0, "axial": true}]"#;
        let table = GeometryTable::from_json_reader(&json[..]).unwrap();
        assert_eq!(table.soma().radius, 10.0);
        assert!(matches!(
            GeometryTable::from_json_reader(&b"{}"[..]),
            Err(Error::ConfigurationError(_))
        ));
    }
}
