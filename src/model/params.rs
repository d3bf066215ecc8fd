//! ParamMap — free-form numeric attributes for stimuli and channels.

use hashbrown::HashMap;

/// A map of attribute names to numeric values.
///
/// Used as the escape hatch for keyword configuration; every consumer
/// validates the keys against the attributes it knows.
pub type ParamMap = HashMap<String, f64>;
