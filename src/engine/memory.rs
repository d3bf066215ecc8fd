//! In-memory simulation engine.
//!
//! This is the reference implementation of `SimulationEngine`. It keeps
//! everything it is given so callers can inspect what a cell pushed.
//!
//! ## Limitations
//!
//! - **No membrane dynamics**: `run()` only samples clamp currents into
//!   their recorders; voltages are never integrated.
//! - **Single cell**: section ids are taken as given, so instantiating two
//!   cells into one engine collides.
//!
//! Use this engine for:
//! - Testing morphology, addressing and stimulus setup end to end
//! - Checking stimulus waveforms before handing a cell to a real engine

use hashbrown::HashMap;
use tracing::debug;

use crate::biophysics::MembraneProperties;
use crate::config::SimulationContext;
use crate::model::*;
use crate::stimulus::{ClampProgram, Recorder};
use crate::{Error, Result};
use super::{ClampId, ClampSite, SimulationEngine};

/// A clamp as the engine holds it.
#[derive(Debug, Clone)]
pub struct EngineClamp {
    pub site: ClampSite,
    pub program: ClampProgram,
    pub recorder: Option<Recorder>,
}

/// In-memory engine state.
#[derive(Debug, Default)]
pub struct MemoryEngine {
    sections: HashMap<SectionId, Section>,
    connections: HashMap<SectionId, SectionId>,
    membranes: HashMap<SectionId, MembraneProperties>,
    initial_v: HashMap<SegmentId, f64>,
    clamps: Vec<EngineClamp>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn section(&self, id: SectionId) -> Option<&Section> {
        self.sections.get(&id)
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    /// Total segments over all created sections.
    pub fn segment_count(&self) -> usize {
        self.sections.values().map(|s| s.nseg).sum()
    }

    pub fn parent_of(&self, child: SectionId) -> Option<SectionId> {
        self.connections.get(&child).copied()
    }

    pub fn membrane(&self, id: SectionId) -> Option<&MembraneProperties> {
        self.membranes.get(&id)
    }

    pub fn initial_voltage(&self, segment: SegmentId) -> Option<f64> {
        self.initial_v.get(&segment).copied()
    }

    pub fn clamps(&self) -> &[EngineClamp] {
        &self.clamps
    }

    pub fn clamp(&self, id: ClampId) -> Option<&EngineClamp> {
        usize::try_from(id.0).ok().and_then(|i| self.clamps.get(i))
    }

    /// Sample every clamp at `t = k·dt` for `k = 0..=round(tstop/dt)` and
    /// write the currents into the attached recorders. Recorders are
    /// cleared first, so repeated runs do not accumulate.
    pub fn run(&self, ctx: &SimulationContext) -> Result<usize> {
        ctx.validate()?;
        let steps = ctx
            .sample_count()
            .ok_or_else(|| Error::EngineError("run length (tstop) is not set".into()))?;

        for clamp in &self.clamps {
            let Some(recorder) = &clamp.recorder else { continue };
            recorder.clear();
            for k in 0..steps {
                recorder.push(clamp.program.current_at(k as f64 * ctx.dt));
            }
        }
        debug!(steps, clamps = self.clamps.len(), "memory engine run complete");
        Ok(steps)
    }

    fn require_section(&self, id: SectionId) -> Result<&Section> {
        self.sections
            .get(&id)
            .ok_or_else(|| Error::EngineError(format!("unknown section {id}")))
    }
}

impl SimulationEngine for MemoryEngine {
    fn create_section(&mut self, id: SectionId, section: &Section) -> Result<()> {
        if section.nseg == 0 {
            return Err(Error::EngineError(format!("section {id} has no segments")));
        }
        if self.sections.insert(id, section.clone()).is_some() {
            return Err(Error::EngineError(format!("section {id} already exists")));
        }
        Ok(())
    }

    fn connect(&mut self, child: SectionId, parent: SectionId) -> Result<()> {
        self.require_section(child)?;
        self.require_section(parent)?;
        if child == parent {
            return Err(Error::EngineError(format!("section {child} cannot connect to itself")));
        }
        if let Some(existing) = self.connections.insert(child, parent) {
            return Err(Error::EngineError(format!(
                "section {child} already connected to {existing}"
            )));
        }
        Ok(())
    }

    fn set_membrane(&mut self, id: SectionId, props: &MembraneProperties) -> Result<()> {
        self.require_section(id)?;
        self.membranes.insert(id, *props);
        Ok(())
    }

    fn set_initial_voltage(&mut self, segment: SegmentId, v: f64) -> Result<()> {
        let total = self.segment_count();
        if segment.0 >= total {
            return Err(Error::EngineError(format!(
                "segment {segment} out of range ({total} segments)"
            )));
        }
        self.initial_v.insert(segment, v);
        Ok(())
    }

    fn attach_clamp(&mut self, site: ClampSite, program: &ClampProgram) -> Result<ClampId> {
        let nseg = self.require_section(site.section)?.nseg;
        if !(0.0..=1.0).contains(&site.location) {
            return Err(Error::EngineError(format!(
                "clamp location {} outside [0, 1]",
                site.location
            )));
        }
        if site.segment.0 >= self.segment_count() {
            return Err(Error::EngineError(format!("unknown segment {}", site.segment)));
        }
        let id = ClampId(self.clamps.len() as u64);
        debug!(clamp = %id, section = %site.section, segment = %site.segment, nseg, "attached clamp");
        self.clamps.push(EngineClamp { site, program: program.clone(), recorder: None });
        Ok(id)
    }

    fn record_clamp(&mut self, clamp: ClampId, recorder: Recorder) -> Result<()> {
        let slot = usize::try_from(clamp.0)
            .ok()
            .and_then(|i| self.clamps.get_mut(i))
            .ok_or_else(|| Error::EngineError(format!("unknown clamp {clamp}")))?;
        slot.recorder = Some(recorder);
        Ok(())
    }
}
