//! # Current Injection
//!
//! A [`CurrentInjection`] is a point-process current clamp attached to one
//! segment. It is configured either as a parameterized pulse or as an
//! arbitrary waveform, and can optionally record the current it delivers.
//!
//! Configuration is validated when the injection is created; by the time
//! the cell is handed to a simulation engine, every injection already has
//! a resolved segment address and a concrete [`ClampProgram`].

pub mod address;

pub use address::{local_segment, resolve};

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::SimulationContext;
use crate::model::*;
use crate::morphology::{Morphology, SegmentIndex};
use crate::{Error, Result};

/// Clamp duration used when a waveform is played without a known run length.
pub const UNBOUNDED_DURATION: f64 = 1e30;

/// Default injection site along a section.
pub const DEFAULT_LOCATION: f64 = 0.5;

// ============================================================================
// Pulse configuration
// ============================================================================

/// Pulse clamp attributes. Unset attributes keep the clamp's defaults
/// (all zero).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PulseConfig {
    /// Onset delay (ms).
    pub del: Option<f64>,
    /// Duration (ms).
    pub dur: Option<f64>,
    /// Amplitude (nA).
    pub amp: Option<f64>,
}

impl PulseConfig {
    pub const KNOWN: [&'static str; 3] = ["del", "dur", "amp"];

    pub fn new(del: f64, dur: f64, amp: f64) -> Self {
        Self { del: Some(del), dur: Some(dur), amp: Some(amp) }
    }

    /// Build from free-form keyword parameters, rejecting names the pulse
    /// clamp does not have.
    pub fn from_params(params: &ParamMap) -> Result<Self> {
        let mut out = Self::default();
        for (name, &value) in params {
            let slot = match name.as_str() {
                "del" => &mut out.del,
                "dur" => &mut out.dur,
                "amp" => &mut out.amp,
                _ => {
                    return Err(Error::ConfigurationError(format!(
                        "unknown pulse attribute '{name}' (known: {})",
                        Self::KNOWN.join(", ")
                    )));
                }
            };
            *slot = Some(value);
        }
        out.validate()?;
        Ok(out)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("del", self.del), ("dur", self.dur)] {
            if let Some(v) = value {
                if !(v.is_finite() && v >= 0.0) {
                    return Err(Error::ConfigurationError(format!(
                        "pulse attribute '{name}' must be non-negative, got {v}"
                    )));
                }
            }
        }
        if self.amp.is_some_and(|a| !a.is_finite()) {
            return Err(Error::ConfigurationError("pulse amplitude must be finite".into()));
        }
        Ok(())
    }
}

// ============================================================================
// Stimulus spec → clamp program
// ============================================================================

/// What to inject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case", deny_unknown_fields)]
pub enum StimulusSpec {
    Pulse(PulseConfig),
    /// Piecewise-constant current samples (nA) replayed every `dt` ms;
    /// `dt` defaults to the simulation timestep.
    Waveform { current: Vec<f64>, dt: Option<f64> },
}

impl Default for StimulusSpec {
    fn default() -> Self {
        StimulusSpec::Pulse(PulseConfig::default())
    }
}

/// Concrete clamp settings handed to the simulation engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClampProgram {
    Pulse { del: f64, dur: f64, amp: f64 },
    /// `samples` already carries the trailing zero.
    Waveform { samples: Vec<f64>, dt: f64, del: f64, dur: f64 },
}

impl ClampProgram {
    /// Turn a stimulus spec into a clamp program for the given context.
    pub fn compile(spec: &StimulusSpec, ctx: &SimulationContext) -> Result<Self> {
        match spec {
            StimulusSpec::Pulse(pulse) => {
                pulse.validate()?;
                Ok(ClampProgram::Pulse {
                    del: pulse.del.unwrap_or(0.0),
                    dur: pulse.dur.unwrap_or(0.0),
                    amp: pulse.amp.unwrap_or(0.0),
                })
            }
            StimulusSpec::Waveform { current, dt } => {
                let dt = dt.unwrap_or(ctx.dt);
                if !(dt.is_finite() && dt > 0.0) {
                    return Err(Error::ConfigurationError(format!(
                        "waveform timestep must be positive, got {dt}"
                    )));
                }
                if current.iter().any(|c| !c.is_finite()) {
                    return Err(Error::ConfigurationError(
                        "waveform samples must be finite".into(),
                    ));
                }
                if current.is_empty() {
                    warn!("empty waveform: clamp will only play the zero padding");
                }
                let mut samples = Vec::with_capacity(current.len() + 1);
                samples.extend_from_slice(current);
                samples.push(0.0);
                Ok(ClampProgram::Waveform {
                    samples,
                    dt,
                    del: 0.0,
                    dur: ctx.tstop.unwrap_or(UNBOUNDED_DURATION),
                })
            }
        }
    }

    /// Clamp current (nA) at time `t` (ms).
    ///
    /// The clamp is on for `del <= t < del + dur`. A waveform advances one
    /// sample every `dt` and holds its last sample past the end.
    pub fn current_at(&self, t: f64) -> f64 {
        match self {
            ClampProgram::Pulse { del, dur, amp } => {
                if t >= *del && t < del + dur { *amp } else { 0.0 }
            }
            ClampProgram::Waveform { samples, dt, del, dur } => {
                if t < *del || t >= del + dur {
                    return 0.0;
                }
                // Absorb rounding in t / dt when t is a multiple of dt.
                let i = (t / dt + 1e-9).floor() as usize;
                samples.get(i).or(samples.last()).copied().unwrap_or(0.0)
            }
        }
    }
}

// ============================================================================
// Recorder
// ============================================================================

/// Shared buffer the simulation engine writes a recorded current trace into.
///
/// Cloning shares the buffer.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    samples: Arc<RwLock<Vec<f64>>>,
    expected_len: Option<usize>,
}

impl Recorder {
    /// Recorder pre-sized for the context's run, or unsized when the run
    /// length is unknown.
    pub fn for_context(ctx: &SimulationContext) -> Self {
        match ctx.sample_count() {
            Some(n) => Self {
                samples: Arc::new(RwLock::new(Vec::with_capacity(n))),
                expected_len: Some(n),
            },
            None => Self::default(),
        }
    }

    pub fn expected_len(&self) -> Option<usize> {
        self.expected_len
    }

    pub fn push(&self, sample: f64) {
        self.samples.write().push(sample);
    }

    pub fn clear(&self) {
        self.samples.write().clear();
    }

    pub fn len(&self) -> usize {
        self.samples.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.read().is_empty()
    }

    /// Copy of the recorded trace.
    pub fn snapshot(&self) -> Vec<f64> {
        self.samples.read().clone()
    }
}

// ============================================================================
// CurrentInjection
// ============================================================================

/// Where and what to inject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InjectionConfig {
    pub section: SectionId,
    #[serde(default = "default_location")]
    pub location: f64,
    #[serde(default)]
    pub stimulus: StimulusSpec,
    #[serde(default)]
    pub record: bool,
}

fn default_location() -> f64 {
    DEFAULT_LOCATION
}

impl InjectionConfig {
    pub fn pulse(section: SectionId, location: f64, pulse: PulseConfig) -> Self {
        Self { section, location, stimulus: StimulusSpec::Pulse(pulse), record: false }
    }

    pub fn waveform(section: SectionId, location: f64, current: Vec<f64>, dt: Option<f64>) -> Self {
        Self {
            section,
            location,
            stimulus: StimulusSpec::Waveform { current, dt },
            record: false,
        }
    }

    pub fn recorded(mut self) -> Self {
        self.record = true;
        self
    }
}

/// A current clamp bound to a resolved segment.
#[derive(Debug, Clone)]
pub struct CurrentInjection {
    section: SectionId,
    location: f64,
    segment: SegmentId,
    program: ClampProgram,
    recorder: Option<Recorder>,
}

impl CurrentInjection {
    pub fn new(
        morphology: &Morphology,
        index: &SegmentIndex,
        ctx: &SimulationContext,
        config: &InjectionConfig,
    ) -> Result<Self> {
        ctx.validate()?;
        let segment = resolve(morphology, index, config.section, config.location)?;
        let program = ClampProgram::compile(&config.stimulus, ctx)?;
        let recorder = config.record.then(|| {
            if ctx.tstop.is_none() {
                warn!(%segment, "recording without a run length: recorder is unsized");
            }
            Recorder::for_context(ctx)
        });
        Ok(Self {
            section: config.section,
            location: config.location,
            segment,
            program,
            recorder,
        })
    }

    pub fn section(&self) -> SectionId {
        self.section
    }

    pub fn location(&self) -> f64 {
        self.location
    }

    /// Global index of the segment receiving the current.
    pub fn segment_id(&self) -> SegmentId {
        self.segment
    }

    pub fn program(&self) -> &ClampProgram {
        &self.program
    }

    pub fn recorder(&self) -> Option<&Recorder> {
        self.recorder.as_ref()
    }

    /// Recorded current trace, if recording was requested.
    pub fn recorded(&self) -> Option<Vec<f64>> {
        self.recorder.as_ref().map(Recorder::snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pulse_from_params() {
        let params: ParamMap = [("amp".to_string(), 0.5), ("dur".to_string(), 100.0)]
            .into_iter()
            .collect();
        let pulse = PulseConfig::from_params(&params).unwrap();
        assert_eq!(pulse.amp, Some(0.5));
        assert_eq!(pulse.dur, Some(100.0));
        assert_eq!(pulse.del, None);
    }

    #[test]
    fn test_pulse_unknown_attribute() {
        let params: ParamMap = [("amplitude".to_string(), 0.5)].into_iter().collect();
        assert!(matches!(PulseConfig::from_params(&params), Err(Error::ConfigurationError(_))));
    }

    #[test]
    fn test_pulse_program_window() {
        let ctx = SimulationContext::default();
        let program =
            ClampProgram::compile(&StimulusSpec::Pulse(PulseConfig::new(5.0, 10.0, 0.2)), &ctx).unwrap();
        assert_eq!(program.current_at(4.5), 0.0);
        assert_eq!(program.current_at(5.0), 0.2);
        assert_eq!(program.current_at(14.5), 0.2);
        assert_eq!(program.current_at(15.0), 0.0);
    }

    #[test]
    fn test_default_pulse_is_silent() {
        let program =
            ClampProgram::compile(&StimulusSpec::default(), &SimulationContext::default()).unwrap();
        assert_eq!(program, ClampProgram::Pulse { del: 0.0, dur: 0.0, amp: 0.0 });
        assert_eq!(program.current_at(0.0), 0.0);
    }

    #[test]
    fn test_waveform_padding_and_defaults() {
        let ctx = SimulationContext::new(0.5).unwrap().with_tstop(10.0).unwrap();
        let spec = StimulusSpec::Waveform { current: vec![1.0, 2.0, 3.0], dt: None };
        let program = ClampProgram::compile(&spec, &ctx).unwrap();
        assert_eq!(
            program,
            ClampProgram::Waveform { samples: vec![1.0, 2.0, 3.0, 0.0], dt: 0.5, del: 0.0, dur: 10.0 }
        );
        assert_eq!(program.current_at(0.0), 1.0);
        assert_eq!(program.current_at(0.75), 2.0);
        assert_eq!(program.current_at(1.0), 3.0);
        assert_eq!(program.current_at(1.5), 0.0);
        assert_eq!(program.current_at(9.5), 0.0);
    }

    #[test]
    fn test_waveform_unbounded_without_tstop() {
        let spec = StimulusSpec::Waveform { current: vec![1.0], dt: Some(1.0) };
        let program = ClampProgram::compile(&spec, &SimulationContext::default()).unwrap();
        match program {
            ClampProgram::Waveform { dur, dt, .. } => {
                assert_eq!(dur, UNBOUNDED_DURATION);
                assert_eq!(dt, 1.0);
            }
            other => panic!("expected waveform, got {other:?}"),
        }
    }

    #[test]
    fn test_waveform_rejects_bad_dt() {
        let spec = StimulusSpec::Waveform { current: vec![1.0], dt: Some(0.0) };
        assert!(ClampProgram::compile(&spec, &SimulationContext::default()).is_err());
    }

    #[test]
    fn test_recorder_sizing() {
        let ctx = SimulationContext::new(0.1).unwrap().with_tstop(10.0).unwrap();
        assert_eq!(Recorder::for_context(&ctx).expected_len(), Some(101));
        assert_eq!(Recorder::for_context(&SimulationContext::default()).expected_len(), None);
    }

    #[test]
    fn test_recorder_clone_shares_buffer() {
        let rec = Recorder::default();
        let other = rec.clone();
        other.push(1.5);
        assert_eq!(rec.snapshot(), vec![1.5]);
    }

    #[test]
    fn test_injection_config_from_json() {
        let cfg: InjectionConfig = serde_json::from_str(
            r#"{"section": 1, "stimulus": {"mode": "pulse", "amp": 0.3, "dur": 50.0}, "record": true}"#,
        )
        .unwrap();
        assert_eq!(cfg.location, DEFAULT_LOCATION);
        assert!(cfg.record);
        assert_eq!(
            cfg.stimulus,
            StimulusSpec::Pulse(PulseConfig { del: None, dur: Some(50.0), amp: Some(0.3) })
        );
    }

    #[test]
    fn test_injection_config_json_rejects_unknown_keys() {
        let misspelled = [
            r#"{"section": 0, "stimulus": {"mode": "pulse", "amplitude": 0.3, "dur": 50.0}}"#,
            r#"{"section": 0, "stimulus": {"mode": "waveform", "current": [0.1], "timestep": 0.5}}"#,
            r#"{"section": 0, "loc": 0.2}"#,
        ];
        for json in misspelled {
            assert!(serde_json::from_str::<InjectionConfig>(json).is_err(), "{json}");
        }

        let waveform: InjectionConfig = serde_json::from_str(
            r#"{"section": 0, "stimulus": {"mode": "waveform", "current": [0.1], "dt": 0.5}}"#,
        )
        .unwrap();
        assert_eq!(waveform.stimulus, StimulusSpec::Waveform { current: vec![0.1], dt: Some(0.5) });
    }
}
