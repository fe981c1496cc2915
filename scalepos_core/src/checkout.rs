//! Checkout: read the totals and hand the sink a payment artifact.

use crate::config::CheckoutCfg;
use crate::display::DisplaySink;
use crate::ledger::{BillingLedger, Totals};

/// What the sink renders at checkout (a QR payload in the kiosk UI).
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutArtifact {
    pub payload_url: String,
    pub currency: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutReceipt {
    pub totals: Totals,
    pub artifact: CheckoutArtifact,
}

#[derive(Debug, Clone, Default)]
pub struct CheckoutCoordinator {
    cfg: CheckoutCfg,
}

impl CheckoutCoordinator {
    pub fn new(cfg: CheckoutCfg) -> Self {
        Self { cfg }
    }

    /// Finalize the current bill. The ledger is only read.
    pub fn checkout(&self, ledger: &BillingLedger, sink: &mut dyn DisplaySink) -> CheckoutReceipt {
        let totals = ledger.totals();
        let artifact = CheckoutArtifact {
            payload_url: self.cfg.payload_url.clone(),
            currency: self.cfg.currency.clone(),
            amount: totals.total_price(),
        };
        tracing::info!(
            items = totals.item_count,
            total_weight_g = totals.total_weight_grams(),
            total_price = totals.total_price(),
            currency = %artifact.currency,
            "checkout"
        );
        sink.checkout_finalized(&totals, &artifact);
        CheckoutReceipt { totals, artifact }
    }
}
