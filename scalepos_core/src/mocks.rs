//! Test and helper mocks for scalepos_core

use std::sync::{Arc, Mutex, PoisonError};

use scalepos_traits::{BoxError, WeightSensor};

use crate::checkout::CheckoutArtifact;
use crate::display::DisplaySink;
use crate::ledger::{DetectedItem, Totals};

/// A sensor that always errors; useful in background mode tests or when a
/// station is built only to exercise commands.
pub struct NoopSensor;

impl WeightSensor for NoopSensor {
    fn sample(&mut self, _readings: u32) -> Result<f32, BoxError> {
        Err(Box::new(std::io::Error::other("noop sensor")))
    }
}

/// A display sink that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DisplaySink for NullSink {
    fn ledger_updated(&mut self, _items: &[DetectedItem], _totals: &Totals) {}
    fn checkout_finalized(&mut self, _totals: &Totals, _artifact: &CheckoutArtifact) {}
}

#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    Ledger { items: Vec<DetectedItem>, totals: Totals },
    Checkout { totals: Totals, artifact: CheckoutArtifact },
}

/// Records sink events; clones share the same log so a test can keep one
/// handle after boxing the other into a station.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<SinkEvent>>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<SinkEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Items from the most recent ledger update.
    pub fn last_items(&self) -> Option<Vec<DetectedItem>> {
        self.events().into_iter().rev().find_map(|e| match e {
            SinkEvent::Ledger { items, .. } => Some(items),
            SinkEvent::Checkout { .. } => None,
        })
    }

    fn push(&self, event: SinkEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

impl DisplaySink for RecordingSink {
    fn ledger_updated(&mut self, items: &[DetectedItem], totals: &Totals) {
        self.push(SinkEvent::Ledger {
            items: items.to_vec(),
            totals: *totals,
        });
    }

    fn checkout_finalized(&mut self, totals: &Totals, artifact: &CheckoutArtifact) {
        self.push(SinkEvent::Checkout {
            totals: *totals,
            artifact: artifact.clone(),
        });
    }
}
