//! The running bill: accepted detections keyed by serial.
//!
//! Serials come from a counter that only moves forward. Deleting or clearing
//! rows never hands a serial out twice, so gaps after a deletion are expected.

use std::collections::BTreeMap;

use crate::fixed_point::{from_hundredths, to_hundredths};

/// One accepted detection. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedItem {
    serial: u64,
    label: String,
    weight_cg: i64,
    price_cents: i64,
}

impl DetectedItem {
    pub fn serial(&self) -> u64 {
        self.serial
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Weight in grams, two decimals.
    pub fn weight_grams(&self) -> f64 {
        from_hundredths(self.weight_cg)
    }

    /// Price in currency units, two decimals.
    pub fn price(&self) -> f64 {
        from_hundredths(self.price_cents)
    }

    pub fn weight_cg(&self) -> i64 {
        self.weight_cg
    }

    pub fn price_cents(&self) -> i64 {
        self.price_cents
    }
}

/// Derived sums over the ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Totals {
    pub item_count: usize,
    pub weight_cg: i64,
    pub price_cents: i64,
}

impl Totals {
    pub fn total_weight_grams(&self) -> f64 {
        from_hundredths(self.weight_cg)
    }

    pub fn total_price(&self) -> f64 {
        from_hundredths(self.price_cents)
    }
}

#[derive(Debug, Clone)]
pub struct BillingLedger {
    items: BTreeMap<u64, DetectedItem>,
    next_serial: u64,
}

impl Default for BillingLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl BillingLedger {
    pub fn new() -> Self {
        Self {
            items: BTreeMap::new(),
            next_serial: 1,
        }
    }

    /// Append an item; weight and price are rounded to two decimals.
    /// Always succeeds and returns the assigned serial.
    pub fn add_item(&mut self, label: impl Into<String>, weight_grams: f64, price: f64) -> u64 {
        let serial = self.next_serial;
        self.next_serial += 1;
        let item = DetectedItem {
            serial,
            label: label.into(),
            weight_cg: to_hundredths(weight_grams),
            price_cents: to_hundredths(price),
        };
        tracing::info!(
            serial,
            label = %item.label,
            weight_g = item.weight_grams(),
            price = item.price(),
            "item added"
        );
        self.items.insert(serial, item);
        serial
    }

    /// Remove the row with the highest serial. `None` when empty.
    pub fn delete_last(&mut self) -> Option<DetectedItem> {
        let removed = self.items.pop_last().map(|(_, item)| item);
        match &removed {
            Some(item) => tracing::info!(serial = item.serial, "last item deleted"),
            None => tracing::debug!("delete_last on empty ledger"),
        }
        removed
    }

    /// Drop every row; the serial counter keeps counting. Returns rows removed.
    pub fn clear(&mut self) -> usize {
        let n = self.items.len();
        self.items.clear();
        tracing::info!(removed = n, next_serial = self.next_serial, "ledger cleared");
        n
    }

    pub fn totals(&self) -> Totals {
        self.items.values().fold(Totals::default(), |acc, item| Totals {
            item_count: acc.item_count + 1,
            weight_cg: acc.weight_cg + item.weight_cg,
            price_cents: acc.price_cents + item.price_cents,
        })
    }

    /// Items ascending by serial.
    pub fn list(&self) -> Vec<DetectedItem> {
        self.items.values().cloned().collect()
    }

    pub fn next_serial(&self) -> u64 {
        self.next_serial
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serials_start_at_one_and_increase() {
        let mut l = BillingLedger::new();
        assert_eq!(l.add_item("apple", 500.0, 36.0), 1);
        assert_eq!(l.add_item("banana", 120.0, 4.32), 2);
        assert_eq!(l.next_serial(), 3);
    }

    #[test]
    fn delete_last_does_not_reuse_serial() {
        let mut l = BillingLedger::new();
        for _ in 0..3 {
            l.add_item("apple", 100.0, 7.2);
        }
        let removed = l.delete_last().unwrap();
        assert_eq!(removed.serial(), 3);
        assert_eq!(l.add_item("tomato", 100.0, 2.6), 4);
        let serials: Vec<u64> = l.list().iter().map(DetectedItem::serial).collect();
        assert_eq!(serials, vec![1, 2, 4]);
    }

    #[test]
    fn delete_last_on_empty_is_noop() {
        let mut l = BillingLedger::new();
        assert!(l.delete_last().is_none());
        assert_eq!(l.next_serial(), 1);
    }

    #[test]
    fn clear_keeps_counter() {
        let mut l = BillingLedger::new();
        l.add_item("apple", 500.0, 36.0);
        l.add_item("apple", 250.0, 18.0);
        assert_eq!(l.clear(), 2);
        assert_eq!(l.totals(), Totals::default());
        assert_eq!(l.next_serial(), 3);
        assert_eq!(l.add_item("grapes", 100.0, 7.5), 3);
    }

    #[test]
    fn totals_are_exact_sums() {
        let mut l = BillingLedger::new();
        l.add_item("apple", 500.0, 36.0);
        l.add_item("rock", 300.0, 0.0);
        l.add_item("banana", 0.1, 0.01);
        let t = l.totals();
        assert_eq!(t.item_count, 3);
        assert_eq!(t.weight_cg, 80_010);
        assert_eq!(t.price_cents, 3601);
        assert_eq!(t.total_weight_grams(), 800.1);
        assert_eq!(t.total_price(), 36.01);
    }

    #[test]
    fn values_are_rounded_to_two_decimals() {
        let mut l = BillingLedger::new();
        let s = l.add_item("apple", 123.456, 8.8888);
        let item = l.list().pop().unwrap();
        assert_eq!(item.serial(), s);
        assert_eq!(item.weight_grams(), 123.46);
        assert_eq!(item.price(), 8.89);
    }
}
