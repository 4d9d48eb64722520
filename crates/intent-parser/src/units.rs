//! Units of measurement and conversion to meters

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Default number of entries a [`ConversionCache`] keeps.
pub const DEFAULT_CACHE_CAPACITY: usize = 50;

/// Units a spoken magnitude can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Inches,
    Feet,
    Yards,
    Meters,
    Degrees,
}

impl Unit {
    /// Scale factor to meters. Degrees pass through unchanged so angular
    /// magnitudes can share the conversion path.
    pub fn factor(&self) -> f64 {
        match self {
            Unit::Inches => 0.0254,
            Unit::Feet => 0.3048,
            Unit::Yards => 0.9144,
            Unit::Meters => 1.0,
            Unit::Degrees => 1.0,
        }
    }

    pub fn to_meters(&self, value: f64) -> f64 {
        value * self.factor()
    }

    pub fn is_angular(&self) -> bool {
        matches!(self, Unit::Degrees)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Inches => "inches",
            Unit::Feet => "feet",
            Unit::Yards => "yards",
            Unit::Meters => "meters",
            Unit::Degrees => "degrees",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Memoizes `(value, unit) -> meters`.
///
/// Purely an optimization: a miss computes the same value a hit returns. The
/// cache stops admitting entries once it holds `capacity` of them.
pub struct ConversionCache {
    capacity: usize,
    entries: Mutex<HashMap<(u64, Unit), f64>>,
}

impl ConversionCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(HashMap::with_capacity(capacity)),
        }
    }

    pub fn convert(&self, value: f64, unit: Unit) -> f64 {
        let key = (value.to_bits(), unit);
        let mut entries = self.entries.lock();
        if let Some(cached) = entries.get(&key) {
            return *cached;
        }

        let meters = unit.to_meters(value);
        if entries.len() < self.capacity {
            entries.insert(key, meters);
        }
        meters
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for ConversionCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}
