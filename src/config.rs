//! Cell configuration and the explicit simulation context.

use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Default maximum segment length (µm).
pub const DEFAULT_MAX_SEG_LENGTH: f64 = 30.0;
/// Default resting potential (mV), used as leak reversal and initial voltage.
pub const DEFAULT_RESTING_POTENTIAL: f64 = -70.0;
/// Default passive leak conductance (S/cm²).
pub const DEFAULT_LEAK_CONDUCTANCE: f64 = 0.0003;
/// Default integration timestep (ms).
pub const DEFAULT_DT: f64 = 0.025;

/// Per-cell configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CellConfig {
    /// Maximum segment length (µm); `nseg = ceil(L / max_seg_length)`.
    pub max_seg_length: f64,
    pub resting_potential: f64,
    pub leak_conductance: f64,
}

impl Default for CellConfig {
    fn default() -> Self {
        Self {
            max_seg_length: DEFAULT_MAX_SEG_LENGTH,
            resting_potential: DEFAULT_RESTING_POTENTIAL,
            leak_conductance: DEFAULT_LEAK_CONDUCTANCE,
        }
    }
}

impl CellConfig {
    pub fn with_max_seg_length(mut self, max_seg_length: f64) -> Self {
        self.max_seg_length = max_seg_length;
        self
    }

    pub fn with_resting_potential(mut self, resting_potential: f64) -> Self {
        self.resting_potential = resting_potential;
        self
    }

    pub fn with_leak_conductance(mut self, leak_conductance: f64) -> Self {
        self.leak_conductance = leak_conductance;
        self
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| Error::undecodable("cell config", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self> {
        let config: Self =
            serde_json::from_reader(reader).map_err(|e| Error::undecodable("cell config", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.max_seg_length.is_finite() && self.max_seg_length > 0.0) {
            return Err(Error::ConfigurationError(format!(
                "max_seg_length must be positive, got {}",
                self.max_seg_length
            )));
        }
        if !self.resting_potential.is_finite() {
            return Err(Error::ConfigurationError("resting_potential must be finite".into()));
        }
        if !(self.leak_conductance.is_finite() && self.leak_conductance >= 0.0) {
            return Err(Error::ConfigurationError(format!(
                "leak_conductance must be non-negative, got {}",
                self.leak_conductance
            )));
        }
        Ok(())
    }
}

/// Timestep and run length of the simulation a cell is built for.
///
/// Passed explicitly to everything that sizes waveforms or recorders.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationContext {
    /// Integration timestep (ms).
    pub dt: f64,
    /// Run length (ms), when known.
    pub tstop: Option<f64>,
}

impl Default for SimulationContext {
    fn default() -> Self {
        Self { dt: DEFAULT_DT, tstop: None }
    }
}

impl SimulationContext {
    pub fn new(dt: f64) -> Result<Self> {
        let ctx = Self { dt, tstop: None };
        ctx.validate()?;
        Ok(ctx)
    }

    pub fn with_tstop(mut self, tstop: f64) -> Result<Self> {
        self.tstop = Some(tstop);
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(Error::ConfigurationError(format!(
                "timestep must be positive, got {}",
                self.dt
            )));
        }
        if let Some(tstop) = self.tstop {
            if !(tstop.is_finite() && tstop >= 0.0) {
                return Err(Error::ConfigurationError(format!(
                    "run length must be non-negative, got {tstop}"
                )));
            }
        }
        Ok(())
    }

    /// Number of recorded samples over the run, `round(tstop / dt) + 1`.
    pub fn sample_count(&self) -> Option<usize> {
        self.tstop.map(|tstop| (tstop / self.dt).round() as usize + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = CellConfig::default();
        assert_eq!(c.max_seg_length, 30.0);
        assert_eq!(c.resting_potential, -70.0);
        assert_eq!(c.leak_conductance, 0.0003);
    }

    #[test]
    fn test_from_json_partial() {
        let c = CellConfig::from_json(r#"{"max_seg_length": 10.0}"#).unwrap();
        assert_eq!(c.max_seg_length, 10.0);
        assert_eq!(c.resting_potential, -70.0);
    }

    #[test]
    fn test_from_json_rejects_bad_values() {
        assert!(matches!(
            CellConfig::from_json(r#"{"max_seg_length": -1.0}"#),
            Err(Error::ConfigurationError(_))
        ));
        assert!(matches!(CellConfig::from_json("true"), Err(Error::ConfigurationError(_))));
    }

    #[test]
    fn test_from_json_rejects_unknown_keys() {
        match CellConfig::from_json(r#"{"max_segment_length": 10.0}"#) {
            Err(Error::ConfigurationError(msg)) => assert!(msg.contains("max_segment_length"), "{msg}"),
            other => panic!("expected configuration error, got {other:?}"),
        }
    }

    #[test]
    fn test_from_json_reader() {
        let c = CellConfig::from_json_reader(&br#"{"leak_conductance": 0.001}"#[..]).unwrap();
        assert_eq!(c.leak_conductance, 0.001);
        assert_eq!(c.max_seg_length, DEFAULT_MAX_SEG_LENGTH);
        assert!(CellConfig::from_json_reader(&br#"{"leak_conductance": -1.0}"#[..]).is_err());
    }

    #[test]
    fn test_sample_count() {
        let ctx = SimulationContext::new(0.025).unwrap().with_tstop(100.0).unwrap();
        assert_eq!(ctx.sample_count(), Some(4001));
        assert_eq!(SimulationContext::default().sample_count(), None);
    }

    #[test]
    fn test_invalid_context() {
        assert!(SimulationContext::new(0.0).is_err());
        assert!(SimulationContext::new(0.1).unwrap().with_tstop(-1.0).is_err());
    }
}
