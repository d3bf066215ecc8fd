//! # Morphology Model
//!
//! Plain data that crosses every boundary: geometry table ↔ builder ↔
//! indexer ↔ stimulus addressing ↔ simulation engine.
//!
//! Design rule: this module is pure data — no I/O, no engine handles,
//! no logging.

pub mod point;
pub mod geometry;
pub mod section;
pub mod segment;
pub mod params;

pub use point::Point3;
pub use geometry::{GeometryTable, SectionKind, SectionRecord};
pub use section::{Section, SectionId};
pub use segment::{Segment, SegmentId};
pub use params::ParamMap;
