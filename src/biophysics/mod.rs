//! Membrane parameterization strategies.
//!
//! A [`MembraneParameterizer`] maps a built morphology to one
//! [`MembraneProperties`] per section. Channel kinetics themselves belong
//! to the simulation engine; this module only picks mechanisms and sets
//! their scalar parameters.
//!
//! Built-in presets:
//!
//! | Preset | Soma | Other sections |
//! |--------|------|----------------|
//! | [`AllPassive`] | passive leak | passive leak |
//! | [`SomaHhRestPassive`] | Hodgkin–Huxley | passive leak |

use serde::{Deserialize, Serialize};

use crate::config::CellConfig;
use crate::model::*;
use crate::morphology::Morphology;
use crate::{Error, Result};

/// Specific membrane capacitance (µF/cm²) set by every preset.
pub const DEFAULT_CM: f64 = 1.0;

// ============================================================================
// Mechanisms
// ============================================================================

/// Resolved Hodgkin–Huxley channel parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HhChannel {
    /// Sodium conductance (S/cm²).
    pub gnabar: f64,
    /// Potassium conductance (S/cm²).
    pub gkbar: f64,
    /// Leak conductance (S/cm²).
    pub gl: f64,
    /// Leak reversal (mV).
    pub el: f64,
}

impl HhChannel {
    pub const DEFAULT_GNABAR: f64 = 0.12;
    pub const DEFAULT_GKBAR: f64 = 0.036;
    pub const DEFAULT_GL: f64 = 0.0003;
}

/// Mechanism inserted into a section.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Mechanism {
    Passive { g_pas: f64, e_pas: f64 },
    Hh(HhChannel),
}

/// Membrane settings for one section.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MembraneProperties {
    pub cm: f64,
    pub mechanism: Mechanism,
}

impl MembraneProperties {
    pub fn passive(g_pas: f64, e_pas: f64) -> Self {
        Self { cm: DEFAULT_CM, mechanism: Mechanism::Passive { g_pas, e_pas } }
    }

    pub fn hh(channel: HhChannel) -> Self {
        Self { cm: DEFAULT_CM, mechanism: Mechanism::Hh(channel) }
    }
}

// ============================================================================
// HH overrides
// ============================================================================

/// Explicit HH parameter overrides. Unset fields fall back to the channel
/// defaults, and `el` to the cell's resting potential.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HhParams {
    pub gnabar: Option<f64>,
    pub gkbar: Option<f64>,
    pub gl: Option<f64>,
    pub el: Option<f64>,
}

impl HhParams {
    pub const KNOWN: [&'static str; 4] = ["gnabar", "gkbar", "gl", "el"];

    /// Build overrides from free-form keyword parameters. Unknown names
    /// are rejected here rather than when the cell is instantiated.
    pub fn from_params(params: &ParamMap) -> Result<Self> {
        let mut out = Self::default();
        for (name, &value) in params {
            if !value.is_finite() {
                return Err(Error::ConfigurationError(format!(
                    "HH parameter '{name}' must be finite"
                )));
            }
            let slot = match name.as_str() {
                "gnabar" => &mut out.gnabar,
                "gkbar" => &mut out.gkbar,
                "gl" => &mut out.gl,
                "el" => &mut out.el,
                _ => {
                    return Err(Error::ConfigurationError(format!(
                        "unknown HH parameter '{name}' (known: {})",
                        Self::KNOWN.join(", ")
                    )));
                }
            };
            *slot = Some(value);
        }
        Ok(out)
    }

    pub fn resolve(&self, resting_potential: f64) -> HhChannel {
        HhChannel {
            gnabar: self.gnabar.unwrap_or(HhChannel::DEFAULT_GNABAR),
            gkbar: self.gkbar.unwrap_or(HhChannel::DEFAULT_GKBAR),
            gl: self.gl.unwrap_or(HhChannel::DEFAULT_GL),
            el: self.el.unwrap_or(resting_potential),
        }
    }
}

// ============================================================================
// Strategy trait + presets
// ============================================================================

/// Assigns membrane properties to every section of a cell.
pub trait MembraneParameterizer {
    fn name(&self) -> &'static str;

    /// One entry per section, in section order.
    fn parameterize(&self, morphology: &Morphology, config: &CellConfig) -> Vec<MembraneProperties>;
}

/// Passive leak everywhere.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AllPassive {
    /// Leak conductance; the cell's configured value when unset.
    pub gl: Option<f64>,
}

impl MembraneParameterizer for AllPassive {
    fn name(&self) -> &'static str {
        "all_passive"
    }

    fn parameterize(&self, morphology: &Morphology, config: &CellConfig) -> Vec<MembraneProperties> {
        let gl = self.gl.unwrap_or(config.leak_conductance);
        vec![MembraneProperties::passive(gl, config.resting_potential); morphology.len()]
    }
}

/// Hodgkin–Huxley soma, passive leak on every other section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SomaHhRestPassive {
    /// Dendritic leak conductance; the cell's configured value when unset.
    pub gl_dend: Option<f64>,
    pub soma: HhParams,
}

impl SomaHhRestPassive {
    pub fn with_soma_params(params: &ParamMap) -> Result<Self> {
        Ok(Self { gl_dend: None, soma: HhParams::from_params(params)? })
    }
}

impl MembraneParameterizer for SomaHhRestPassive {
    fn name(&self) -> &'static str {
        "soma_hh_rest_passive"
    }

    fn parameterize(&self, morphology: &Morphology, config: &CellConfig) -> Vec<MembraneProperties> {
        let gl = self.gl_dend.unwrap_or(config.leak_conductance);
        let mut out = Vec::with_capacity(morphology.len());
        out.push(MembraneProperties::hh(self.soma.resolve(config.resting_potential)));
        out.extend(
            (1..morphology.len()).map(|_| MembraneProperties::passive(gl, config.resting_potential)),
        );
        out
    }
}

/// Named presets, selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "preset", rename_all = "snake_case")]
pub enum ChannelPreset {
    AllPassive(AllPassive),
    SomaHhRestPassive(SomaHhRestPassive),
}

impl Default for ChannelPreset {
    fn default() -> Self {
        ChannelPreset::AllPassive(AllPassive::default())
    }
}

impl MembraneParameterizer for ChannelPreset {
    fn name(&self) -> &'static str {
        match self {
            ChannelPreset::AllPassive(p) => p.name(),
            ChannelPreset::SomaHhRestPassive(p) => p.name(),
        }
    }

    fn parameterize(&self, morphology: &Morphology, config: &CellConfig) -> Vec<MembraneProperties> {
        match self {
            ChannelPreset::AllPassive(p) => p.parameterize(morphology, config),
            ChannelPreset::SomaHhRestPassive(p) => p.parameterize(morphology, config),
        }
    }
}
