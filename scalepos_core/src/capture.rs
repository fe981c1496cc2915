//! Capture, classify and gate a settled item.
//!
//! [`ItemCapturePipeline::process`] runs imaging and classification for one
//! candidate and decides whether the result clears the confidence gate. It
//! never touches the ledger: [`apply_outcome`] does that on the control loop,
//! so the ledger keeps a single writer even when the pipeline runs on
//! [`CaptureWorker`]'s thread.

use std::time::Duration;

use crossbeam_channel as xch;
use scalepos_traits::{CapturedImage, Classifier, Imager, Prediction};

use crate::config::CaptureCfg;
use crate::error::PosError;
use crate::hw_error::{Stage, map_hw_error};
use crate::ledger::BillingLedger;
use crate::pricing::PricingEngine;
use crate::stability::DetectionCandidate;

/// Label assigned when the service recognized nothing.
pub const UNKNOWN_LABEL: &str = "unknown";

/// Top entry of a classification result set.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    pub label: String,
    pub confidence: f64,
}

impl ClassificationResult {
    /// First entry wins; an empty set is an unknown label at zero confidence.
    pub fn from_result_set(results: &[Prediction]) -> Self {
        match results.first() {
            Some(p) => Self {
                label: p.label.clone(),
                confidence: if p.confidence.is_finite() {
                    p.confidence
                } else {
                    0.0
                },
            },
            None => Self::unrecognized(),
        }
    }

    pub fn unrecognized() -> Self {
        Self {
            label: UNKNOWN_LABEL.to_string(),
            confidence: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CaptureOutcome {
    /// Cleared the confidence gate; ready for the ledger.
    Accepted {
        candidate: DetectionCandidate,
        result: ClassificationResult,
        image: CapturedImage,
    },
    /// Classified below the gate, or the response was unusable.
    Rejected {
        candidate: DetectionCandidate,
        result: ClassificationResult,
        image: CapturedImage,
    },
    /// Imaging or classification failed; the cycle is lost.
    Failed {
        candidate: DetectionCandidate,
        error: PosError,
    },
}

impl CaptureOutcome {
    pub fn candidate(&self) -> &DetectionCandidate {
        match self {
            CaptureOutcome::Accepted { candidate, .. }
            | CaptureOutcome::Rejected { candidate, .. }
            | CaptureOutcome::Failed { candidate, .. } => candidate,
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, CaptureOutcome::Accepted { .. })
    }
}

pub struct ItemCapturePipeline<I, C> {
    imager: I,
    classifier: C,
    cfg: CaptureCfg,
}

impl<I: Imager, C: Classifier> ItemCapturePipeline<I, C> {
    pub fn new(imager: I, classifier: C, cfg: CaptureCfg) -> Self {
        Self {
            imager,
            classifier,
            cfg,
        }
    }

    /// Capture and classify one candidate. Failures are logged and reported in
    /// the outcome; nothing is retried.
    pub fn process(&mut self, candidate: &DetectionCandidate) -> CaptureOutcome {
        let candidate = *candidate;
        let image = match self.imager.capture() {
            Ok(img) => img,
            Err(e) => {
                let error = map_hw_error(Stage::Capture, &*e);
                tracing::warn!(weight_g = candidate.weight_grams(), %error, "capture aborted");
                return CaptureOutcome::Failed { candidate, error };
            }
        };
        tracing::debug!(image = %image.path().display(), "image captured");

        let result = match self.classifier.classify(&image) {
            Ok(results) => ClassificationResult::from_result_set(&results),
            Err(e) => match map_hw_error(Stage::Classify, &*e) {
                PosError::MalformedResponse(m) => {
                    tracing::warn!(detail = %m, "malformed classification response, treating as zero confidence");
                    ClassificationResult::unrecognized()
                }
                error => {
                    tracing::warn!(weight_g = candidate.weight_grams(), %error, "classification aborted");
                    return CaptureOutcome::Failed { candidate, error };
                }
            },
        };

        if result.confidence < self.cfg.min_confidence {
            tracing::info!(
                label = %result.label,
                confidence = result.confidence,
                min = self.cfg.min_confidence,
                "classification below threshold, discarded"
            );
            if !self.cfg.keep_rejected_images {
                discard_image(&image);
            }
            return CaptureOutcome::Rejected {
                candidate,
                result,
                image,
            };
        }

        tracing::info!(label = %result.label, confidence = result.confidence, "item recognized");
        CaptureOutcome::Accepted {
            candidate,
            result,
            image,
        }
    }
}

fn discard_image(image: &CapturedImage) {
    if let Err(e) = std::fs::remove_file(image.path()) {
        tracing::warn!(image = %image.path().display(), error = %e, "failed to delete rejected image");
    }
}

/// Price an accepted outcome and append it. Returns the new serial, or `None`
/// for rejected and failed outcomes (the ledger is left untouched).
pub fn apply_outcome(
    outcome: &CaptureOutcome,
    pricing: &PricingEngine,
    ledger: &mut BillingLedger,
) -> Option<u64> {
    match outcome {
        CaptureOutcome::Accepted {
            candidate, result, ..
        } => {
            let grams = candidate.weight_grams();
            let price = pricing.price(&result.label, grams);
            Some(ledger.add_item(result.label.clone(), grams, price))
        }
        CaptureOutcome::Rejected { .. } | CaptureOutcome::Failed { .. } => None,
    }
}

/// Runs the pipeline on its own thread.
///
/// One request slot: callers must wait for an outcome before submitting the
/// next candidate. The thread exits and is joined when the worker is dropped.
pub struct CaptureWorker {
    tx: Option<xch::Sender<DetectionCandidate>>,
    rx: xch::Receiver<CaptureOutcome>,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl CaptureWorker {
    pub fn spawn<I, C>(mut pipeline: ItemCapturePipeline<I, C>) -> Self
    where
        I: Imager + Send + 'static,
        C: Classifier + Send + 'static,
    {
        let (tx, req_rx) = xch::bounded::<DetectionCandidate>(1);
        let (out_tx, rx) = xch::unbounded();

        let join_handle = std::thread::spawn(move || {
            for candidate in req_rx.iter() {
                let outcome = pipeline.process(&candidate);
                if out_tx.send(outcome).is_err() {
                    tracing::debug!("capture consumer disconnected, exiting thread");
                    break;
                }
            }
            tracing::trace!("capture worker exiting cleanly");
        });

        Self {
            tx: Some(tx),
            rx,
            join_handle: Some(join_handle),
        }
    }

    /// Hand a candidate to the worker without blocking.
    pub fn submit(&self, candidate: DetectionCandidate) -> Result<(), PosError> {
        let tx = self
            .tx
            .as_ref()
            .ok_or_else(|| PosError::State("capture worker shut down".into()))?;
        tx.try_send(candidate).map_err(|e| match e {
            xch::TrySendError::Full(_) => PosError::State("capture already in flight".into()),
            xch::TrySendError::Disconnected(_) => {
                PosError::State("capture worker thread exited".into())
            }
        })
    }

    pub fn try_recv(&self) -> Option<CaptureOutcome> {
        self.rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<CaptureOutcome> {
        self.rx.recv_timeout(timeout).ok()
    }
}

impl Drop for CaptureWorker {
    fn drop(&mut self) {
        // Closing the request channel ends the worker loop after any in-flight capture.
        drop(self.tx.take());
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(()) => tracing::trace!("capture worker joined"),
                Err(e) => tracing::warn!(?e, "capture worker panicked during shutdown"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scalepos_hardware::{HttpClassifier, SimResponse, SimulatedClassifier, SimulatedImager};
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::sync::mpsc;
    use std::thread;
    use std::time::Instant;

    /// Answer a single HTTP request with `status` and `body`; the raw request
    /// text comes back on the returned channel.
    fn serve_once(status: &'static str, body: &'static str) -> (String, mpsc::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/predict/", listener.local_addr().unwrap());
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let request = read_request(&mut stream);
            let resp = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(resp.as_bytes()).unwrap();
            let _ = tx.send(request);
        });
        (url, rx)
    }

    fn read_request(stream: &mut TcpStream) -> String {
        stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            match stream.read(&mut chunk) {
                Ok(0) | Err(_) => break,
                Ok(n) => buf.extend_from_slice(&chunk[..n]),
            }
            let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
                continue;
            };
            let head = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
            let received = buf.len() - end - 4;
            let declared = head
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok());
            let done = match declared {
                Some(len) => received >= len,
                None if head.contains("transfer-encoding: chunked") => buf.ends_with(b"0\r\n\r\n"),
                None => true,
            };
            if done {
                break;
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    fn candidate(grams: f32) -> DetectionCandidate {
        DetectionCandidate {
            weight_cg: crate::fixed_point::quantize_to_cg_i32(grams),
            settled_at: Instant::now(),
        }
    }

    #[test]
    fn first_entry_of_result_set_wins() {
        let r = ClassificationResult::from_result_set(&[
            Prediction::new("apple", 0.6),
            Prediction::new("tomato", 0.9),
        ]);
        assert_eq!(r.label, "apple");
        assert_eq!(r.confidence, 0.6);
        assert_eq!(ClassificationResult::from_result_set(&[]).confidence, 0.0);
    }

    #[test]
    fn malformed_response_is_rejected_not_failed() {
        let dir = tempfile::tempdir().unwrap();
        let mut p = ItemCapturePipeline::new(
            SimulatedImager::new(dir.path()),
            SimulatedClassifier::scripted(
                [SimResponse::Body(r#"{"results":[{"apple":"high"}]}"#.into())],
                SimResponse::TransportError,
            ),
            CaptureCfg::default(),
        );
        let out = p.process(&candidate(500.0));
        assert!(matches!(out, CaptureOutcome::Rejected { .. }), "{out:?}");
    }

    fn process_body(body: &str) -> CaptureOutcome {
        let dir = tempfile::tempdir().unwrap();
        let mut p = ItemCapturePipeline::new(
            SimulatedImager::new(dir.path()),
            SimulatedClassifier::scripted([SimResponse::Body(body.into())], SimResponse::TransportError),
            CaptureCfg::default(),
        );
        p.process(&candidate(500.0))
    }

    #[test]
    fn confidence_just_below_gate_is_rejected() {
        let out = process_body(r#"{"results":[{"apple":0.2999999999}]}"#);
        match out {
            CaptureOutcome::Rejected { result, .. } => {
                assert_eq!(result.label, "apple");
                assert!(result.confidence < 0.3);
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn bad_trailing_entry_does_not_hide_head_detection() {
        match process_body(r#"{"results":[{"apple":0.8},{"x":"bad"}]}"#) {
            CaptureOutcome::Accepted { result, .. } => {
                assert_eq!(result.label, "apple");
                assert_eq!(result.confidence, 0.8);
            }
            other => panic!("expected acceptance, got {other:?}"),
        }
    }

    #[test]
    fn rejected_image_deleted_when_configured() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = CaptureCfg {
            keep_rejected_images: false,
            ..CaptureCfg::default()
        };
        let mut p = ItemCapturePipeline::new(
            SimulatedImager::new(dir.path()),
            SimulatedClassifier::fixed("apple", 0.1),
            cfg,
        );
        match p.process(&candidate(500.0)) {
            CaptureOutcome::Rejected { image, .. } => assert!(!image.path().exists()),
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn worker_returns_outcome_and_shuts_down() {
        let dir = tempfile::tempdir().unwrap();
        let worker = CaptureWorker::spawn(ItemCapturePipeline::new(
            SimulatedImager::new(dir.path()),
            SimulatedClassifier::fixed("banana", 0.9),
            CaptureCfg::default(),
        ));
        worker.submit(candidate(120.0)).unwrap();
        let out = worker.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(out.is_accepted());
        assert_eq!(out.candidate().weight_cg, 12_000);
        drop(worker);
    }

    #[test]
    fn server_error_from_classifier_fails_the_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let (url, _seen) = serve_once("500 Internal Server Error", "{}");
        let mut p = ItemCapturePipeline::new(
            SimulatedImager::new(dir.path()),
            HttpClassifier::new(url, Duration::from_secs(5)).unwrap(),
            CaptureCfg::default(),
        );
        match p.process(&candidate(500.0)) {
            CaptureOutcome::Failed { error, .. } => {
                assert!(matches!(error, PosError::Classification(_)), "{error:?}");
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }
}
