#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::must_use_candidate
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Weighing-station billing logic (hardware-agnostic).
//!
//! All peripherals are reached through `scalepos_traits::{WeightSensor, Imager,
//! Classifier}`; the screen is a [`DisplaySink`].
//!
//! ## Architecture
//!
//! - **Detection**: plateau state machine over weight samples (`stability`)
//! - **Capture**: imaging + classification + confidence gate, on a worker thread (`capture`)
//! - **Pricing**: label x weight -> price (`pricing`)
//! - **Ledger**: serial-keyed bill with exact totals (`ledger`)
//! - **Checkout**: totals + payment artifact to the sink (`checkout`)
//! - **Control loop**: [`Station`] ties the above together and is the only ledger writer
//!
//! ## Fixed-Point Arithmetic
//!
//! Detection runs on `i32` centigrams (1 cg = 0.01 g). The ledger keeps weights
//! in centigrams and prices in cents as `i64`, so totals never drift.

pub mod capture;
pub mod checkout;
pub mod config;
pub mod conversions;
pub mod display;
pub mod error;
pub mod fixed_point;
pub mod hw_error;
pub mod ledger;
pub mod mocks;
pub mod pricing;
pub mod sampler;
pub mod stability;
pub mod station;

pub use capture::{
    CaptureOutcome, CaptureWorker, ClassificationResult, ItemCapturePipeline, UNKNOWN_LABEL,
    apply_outcome,
};
pub use checkout::{CheckoutArtifact, CheckoutCoordinator, CheckoutReceipt};
pub use config::{CaptureCfg, CheckoutCfg, DetectionCfg, SamplingMode, TickCfg};
pub use display::DisplaySink;
pub use error::{BuildError, PosError, Result};
pub use ledger::{BillingLedger, DetectedItem, Totals};
pub use pricing::PricingEngine;
pub use sampler::Sampler;
pub use stability::{DetectionCandidate, DetectorState, StabilityDetector, WeightSample};
pub use station::{Command, RunSummary, Station, StationBuilder, TickStatus};
