//! Where the station reports ledger changes and checkouts.

use crate::checkout::CheckoutArtifact;
use crate::ledger::{DetectedItem, Totals};

/// Receives every visible state change. Called on the control-loop thread only.
pub trait DisplaySink {
    /// The ledger changed; `items` are ascending by serial.
    fn ledger_updated(&mut self, items: &[DetectedItem], totals: &Totals);

    /// Checkout was requested; render `artifact` alongside the totals.
    fn checkout_finalized(&mut self, totals: &Totals, artifact: &CheckoutArtifact);
}

impl<D: DisplaySink + ?Sized> DisplaySink for Box<D> {
    fn ledger_updated(&mut self, items: &[DetectedItem], totals: &Totals) {
        (**self).ledger_updated(items, totals);
    }

    fn checkout_finalized(&mut self, totals: &Totals, artifact: &CheckoutArtifact) {
        (**self).checkout_finalized(totals, artifact);
    }
}
