//! Label × weight → price.

use std::collections::{BTreeMap, HashMap};

use crate::fixed_point::round2;

/// Immutable label → price-per-kilogram table.
///
/// Labels missing from the table price at zero; there is no error path.
#[derive(Debug, Clone, Default)]
pub struct PricingEngine {
    per_kg: HashMap<String, f64>,
}

impl PricingEngine {
    pub fn new(table: impl IntoIterator<Item = (String, f64)>) -> Self {
        Self {
            per_kg: table.into_iter().collect(),
        }
    }

    /// Rate per kilogram for `label`, if priced.
    pub fn rate(&self, label: &str) -> Option<f64> {
        self.per_kg.get(label).copied()
    }

    /// `round(weight_grams / 1000 * rate, 2)`, or 0 for unknown labels.
    pub fn price(&self, label: &str, weight_grams: f64) -> f64 {
        let rate = self.rate(label).unwrap_or(0.0);
        round2(weight_grams / 1000.0 * rate)
    }

    /// Sorted view for display and logs.
    pub fn table(&self) -> BTreeMap<&str, f64> {
        self.per_kg.iter().map(|(k, v)| (k.as_str(), *v)).collect()
    }
}
