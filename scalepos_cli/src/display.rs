//! Terminal display sinks: a plain table and JSON lines.

use std::io::Write;

use scalepos_core::{CheckoutArtifact, DetectedItem, DisplaySink, Totals};
use serde_json::json;

/// Table in the layout the kiosk screen uses: Index, Name, Weight, Price, then a Total row.
/// Index is the row position (1..n), not the ledger serial.
pub struct ConsoleDisplay<W: Write> {
    out: W,
}

impl<W: Write> ConsoleDisplay<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

pub fn render_table(items: &[DetectedItem], totals: &Totals) -> String {
    let mut s = format!(
        "{:<8}{:<16}{:>16}{:>12}\n",
        "Index", "Name", "Weight (grams)", "Price"
    );
    for (row, item) in items.iter().enumerate() {
        s.push_str(&format!(
            "{:<8}{:<16}{:>16.2}{:>12.2}\n",
            row + 1,
            item.label(),
            item.weight_grams(),
            item.price()
        ));
    }
    s.push_str(&format!(
        "{:<8}{:<16}{:>16.2}{:>12.2}\n",
        "Total",
        "Total",
        totals.total_weight_grams(),
        totals.total_price()
    ));
    s
}

impl<W: Write> DisplaySink for ConsoleDisplay<W> {
    fn ledger_updated(&mut self, items: &[DetectedItem], totals: &Totals) {
        if let Err(e) = write!(self.out, "\n{}", render_table(items, totals)) {
            tracing::warn!(error = %e, "console display write failed");
        }
        let _ = self.out.flush();
    }

    fn checkout_finalized(&mut self, totals: &Totals, artifact: &CheckoutArtifact) {
        let res = writeln!(
            self.out,
            "\nTotal Weight: {:.2} grams\nTotal Price: {:.2} {}\nPay at: {}",
            totals.total_weight_grams(),
            totals.total_price(),
            artifact.currency,
            artifact.payload_url
        );
        if let Err(e) = res {
            tracing::warn!(error = %e, "console display write failed");
        }
        let _ = self.out.flush();
    }
}

/// One JSON object per event on its own line.
pub struct JsonDisplay<W: Write> {
    out: W,
}

impl<W: Write> JsonDisplay<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    fn emit(&mut self, v: &serde_json::Value) {
        if let Err(e) = writeln!(self.out, "{v}") {
            tracing::warn!(error = %e, "json display write failed");
        }
        let _ = self.out.flush();
    }
}

fn item_json(item: &DetectedItem) -> serde_json::Value {
    json!({
        "serial": item.serial(),
        "label": item.label(),
        "weight_g": item.weight_grams(),
        "price": item.price(),
    })
}

impl<W: Write> DisplaySink for JsonDisplay<W> {
    fn ledger_updated(&mut self, items: &[DetectedItem], totals: &Totals) {
        let v = json!({
            "event": "ledger",
            "items": items.iter().map(item_json).collect::<Vec<_>>(),
            "total_weight_g": totals.total_weight_grams(),
            "total_price": totals.total_price(),
        });
        self.emit(&v);
    }

    fn checkout_finalized(&mut self, totals: &Totals, artifact: &CheckoutArtifact) {
        let v = json!({
            "event": "checkout",
            "item_count": totals.item_count,
            "total_weight_g": totals.total_weight_grams(),
            "total_price": totals.total_price(),
            "currency": artifact.currency,
            "payload_url": artifact.payload_url,
        });
        self.emit(&v);
    }
}
