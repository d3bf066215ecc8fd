//! # Simulation Engine Trait
//!
//! The contract between a built cell and whatever integrates its cable
//! equations. The cell pushes structure in; the engine owns time stepping
//! and channel kinetics.
//!
//! ## Implementations
//!
//! | Engine | Module | Description |
//! |--------|--------|-------------|
//! | `MemoryEngine` | `memory` | In-memory reference for testing/embedding |

pub mod memory;

use serde::{Deserialize, Serialize};

use crate::biophysics::MembraneProperties;
use crate::model::*;
use crate::stimulus::{ClampProgram, Recorder};
use crate::Result;

pub use memory::MemoryEngine;

/// Opaque handle to a clamp created by an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClampId(pub u64);

impl std::fmt::Display for ClampId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a clamp is attached: the requested site and its resolved segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClampSite {
    pub section: SectionId,
    pub location: f64,
    pub segment: SegmentId,
}

/// The engine contract.
///
/// Calls arrive in dependency order: all sections, then connections,
/// membrane properties, initial voltages, and finally clamps and their
/// recorders. Engines should return `Error::EngineError` for handles they
/// do not know.
pub trait SimulationEngine {
    // ========================================================================
    // Structure
    // ========================================================================

    /// Create a section with its diameter, endpoint pair and segment count.
    fn create_section(&mut self, id: SectionId, section: &Section) -> Result<()>;

    /// Attach `child`'s 0-end to `parent`'s 1-end.
    fn connect(&mut self, child: SectionId, parent: SectionId) -> Result<()>;

    // ========================================================================
    // Membrane
    // ========================================================================

    fn set_membrane(&mut self, id: SectionId, props: &MembraneProperties) -> Result<()>;

    fn set_initial_voltage(&mut self, segment: SegmentId, v: f64) -> Result<()>;

    // ========================================================================
    // Stimuli
    // ========================================================================

    /// Attach a current clamp running `program` at `site`.
    fn attach_clamp(&mut self, site: ClampSite, program: &ClampProgram) -> Result<ClampId>;

    /// Record the clamp's delivered current into `recorder` on every step.
    fn record_clamp(&mut self, clamp: ClampId, recorder: Recorder) -> Result<()>;
}
