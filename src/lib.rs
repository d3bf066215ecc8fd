//! # stylized-cell — Stylized Compartmental Neuron Morphology
//!
//! Builds the structural scaffold a cable-equation engine runs on: a tree
//! of cylindrical sections placed in 3D from a tabular description, split
//! into segments with stable global indices, plus point-process current
//! clamps addressed to those segments.
//!
//! ## Design Principles
//!
//! 1. **Atomic build**: a `Cell` either exists fully built or not at all
//! 2. **Plain data model**: `Section`, `Segment`, `SegmentId` cross all boundaries
//! 3. **Geometry is derived**: `SegCoords` is recomputed from sections on demand
//! 4. **Trait-at-the-seam**: `SimulationEngine` is the contract with the integrator
//!
//! ## Quick Start
//!
//! ```rust
//! use stylized_cell::{Cell, CellConfig, GeometryTable, SectionId, SectionRecord, SegmentId};
//!
//! # fn example() -> stylized_cell::Result<()> {
//! let geometry = GeometryTable::new(vec![
//!     SectionRecord::soma("soma", 10.0),
//!     SectionRecord::branch("dend", 0, 100.0, 5.0, 0.0, true),
//! ])?;
//! let cell = Cell::new(geometry, CellConfig::default())?;
//!
//! assert_eq!(cell.sec_id_in_seg(), &[0, 1]);
//! assert_eq!(cell.resolve(SectionId(1), 0.5)?, SegmentId(3));
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod morphology;
pub mod biophysics;
pub mod stimulus;
pub mod engine;
pub mod config;

// ============================================================================
// Re-exports
// ============================================================================

pub use model::{
    GeometryTable, SectionRecord, SectionKind,
    Section, SectionId, Segment, SegmentId,
    Point3, ParamMap,
};

pub use morphology::{Morphology, SegmentIndex, SegCoords};

pub use biophysics::{
    MembraneParameterizer, MembraneProperties, Mechanism,
    AllPassive, SomaHhRestPassive, ChannelPreset, HhParams, HhChannel,
};

pub use stimulus::{
    CurrentInjection, InjectionConfig, StimulusSpec, PulseConfig,
    ClampProgram, Recorder,
};

pub use engine::{SimulationEngine, MemoryEngine, ClampId, ClampSite};

pub use config::{CellConfig, SimulationContext};

use tracing::info;

// ============================================================================
// Top-level Cell handle
// ============================================================================

/// A fully built stylized cell.
///
/// The morphology and segment index are fixed at construction. Membrane
/// properties and current injections are added afterwards and pushed to an
/// engine with [`Cell::instantiate`].
#[derive(Debug, Clone)]
pub struct Cell {
    config: CellConfig,
    geometry: GeometryTable,
    morphology: Morphology,
    index: SegmentIndex,
    membrane: Vec<MembraneProperties>,
    injections: Vec<CurrentInjection>,
}

impl Cell {
    /// Build the section tree and segment index from `geometry`.
    pub fn new(geometry: GeometryTable, config: CellConfig) -> Result<Self> {
        config.validate()?;
        let morphology = morphology::build(&geometry, config.max_seg_length)?;
        let index = morphology::index(morphology.sections());
        Ok(Self {
            config,
            geometry,
            morphology,
            index,
            membrane: Vec::new(),
            injections: Vec::new(),
        })
    }

    /// Build and apply a membrane strategy in one step.
    pub fn with_channels(
        geometry: GeometryTable,
        config: CellConfig,
        channels: &dyn MembraneParameterizer,
    ) -> Result<Self> {
        let mut cell = Self::new(geometry, config)?;
        cell.set_channels(channels)?;
        Ok(cell)
    }

    // ========================================================================
    // Morphology
    // ========================================================================

    pub fn config(&self) -> &CellConfig {
        &self.config
    }

    pub fn geometry(&self) -> &GeometryTable {
        &self.geometry
    }

    pub fn morphology(&self) -> &Morphology {
        &self.morphology
    }

    pub fn sections(&self) -> &[Section] {
        self.morphology.sections()
    }

    pub fn soma(&self) -> &Section {
        self.morphology.soma()
    }

    pub fn segment_index(&self) -> &SegmentIndex {
        &self.index
    }

    pub fn segments(&self) -> &[Segment] {
        self.index.segments()
    }

    /// Global index of each section's first segment.
    pub fn sec_id_in_seg(&self) -> &[usize] {
        self.index.sec_id_in_seg()
    }

    pub fn nsec(&self) -> usize {
        self.morphology.len()
    }

    pub fn nseg(&self) -> usize {
        self.index.len()
    }

    /// Sections for a list of section ids.
    pub fn sections_by_id(&self, ids: &[SectionId]) -> Result<Vec<&Section>> {
        ids.iter().map(|&id| self.morphology.section(id)).collect()
    }

    /// Segments for a list of global segment ids.
    pub fn segments_by_id(&self, ids: &[SegmentId]) -> Result<Vec<Segment>> {
        ids.iter().map(|&id| self.index.segment(id)).collect()
    }

    /// Per-segment geometry, recomputed on every call.
    pub fn seg_coords(&self) -> SegCoords {
        morphology::compute(self.morphology.sections(), self.index.sec_id_in_seg())
    }

    /// Global segment at `location` on `section`.
    pub fn resolve(&self, section: SectionId, location: f64) -> Result<SegmentId> {
        stimulus::resolve(&self.morphology, &self.index, section, location)
    }

    // ========================================================================
    // Membrane
    // ========================================================================

    /// Replace membrane properties using `channels`.
    pub fn set_channels(&mut self, channels: &dyn MembraneParameterizer) -> Result<()> {
        let membrane = channels.parameterize(&self.morphology, &self.config);
        if membrane.len() != self.nsec() {
            return Err(Error::ConfigurationError(format!(
                "channel strategy '{}' produced {} entries for {} sections",
                channels.name(),
                membrane.len(),
                self.nsec()
            )));
        }
        self.membrane = membrane;
        Ok(())
    }

    /// Membrane properties per section; empty until channels are set.
    pub fn membrane(&self) -> &[MembraneProperties] {
        &self.membrane
    }

    // ========================================================================
    // Current injection
    // ========================================================================

    /// Add a current clamp. Fails without side effects if the address or
    /// stimulus configuration is invalid.
    pub fn add_injection(
        &mut self,
        ctx: &SimulationContext,
        config: &InjectionConfig,
    ) -> Result<&CurrentInjection> {
        let injection = CurrentInjection::new(&self.morphology, &self.index, ctx, config)?;
        info!(
            section = %injection.section(),
            location = injection.location(),
            segment = %injection.segment_id(),
            record = injection.recorder().is_some(),
            "current injection added"
        );
        self.injections.push(injection);
        Ok(&self.injections[self.injections.len() - 1])
    }

    pub fn injections(&self) -> &[CurrentInjection] {
        &self.injections
    }

    // ========================================================================
    // Engine hand-off
    // ========================================================================

    /// Push the whole cell into `engine`: sections, connections, membrane
    /// properties, initial voltages (the resting potential) and clamps.
    /// Returns the clamp handles in injection order.
    pub fn instantiate<E: SimulationEngine>(&self, engine: &mut E) -> Result<Vec<ClampId>> {
        for (i, section) in self.sections().iter().enumerate() {
            engine.create_section(SectionId(i), section)?;
        }
        for (i, section) in self.sections().iter().enumerate() {
            if let Some(parent) = section.parent {
                engine.connect(SectionId(i), parent)?;
            }
        }
        for (i, props) in self.membrane.iter().enumerate() {
            engine.set_membrane(SectionId(i), props)?;
        }
        for seg in 0..self.nseg() {
            engine.set_initial_voltage(SegmentId(seg), self.config.resting_potential)?;
        }

        let mut clamps = Vec::with_capacity(self.injections.len());
        for injection in &self.injections {
            let site = ClampSite {
                section: injection.section(),
                location: injection.location(),
                segment: injection.segment_id(),
            };
            let id = engine.attach_clamp(site, injection.program())?;
            if let Some(recorder) = injection.recorder() {
                engine.record_clamp(id, recorder.clone())?;
            }
            clamps.push(id);
        }
        info!(
            sections = self.nsec(),
            segments = self.nseg(),
            clamps = clamps.len(),
            "cell instantiated"
        );
        Ok(clamps)
    }
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Addressing error: {0}")]
    AddressingError(String),

    #[error("Engine error: {0}")]
    EngineError(String),
}

impl Error {
    /// Input that could not be decoded at all.
    pub(crate) fn undecodable(what: &str, err: serde_json::Error) -> Self {
        Error::ConfigurationError(format!("cannot decode {what}: {err}"))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
