//! Classification service adapters.
//!
//! The HTTP service takes a multipart upload with a single `file` field and
//! answers `{"results":[{"apple":0.82}, ...]}`: an ordered list of single-key
//! objects mapping a label to its confidence.

use std::collections::VecDeque;
use std::time::Duration;

use reqwest::blocking::{Client, multipart};
use scalepos_traits::{BoxError, CapturedImage, Classifier, Prediction};
use serde_json::Value;

use crate::error::{HwError, Result};

/// Parse a classification response body into its ordered result set.
///
/// A missing or empty `results` field is an empty set, not an error. Only the
/// head entry decides the detection, so it must map a label to a number or the
/// whole body is [`HwError::MalformedResponse`]. Later entries that do not
/// decode are skipped. Within an entry the first key in document order wins.
pub fn parse_results(body: &[u8]) -> Result<Vec<Prediction>> {
    let root: Value = serde_json::from_slice(body)
        .map_err(|e| HwError::MalformedResponse(format!("invalid json: {e}")))?;
    let Some(results) = root.get("results") else {
        return Ok(Vec::new());
    };
    let entries = match results {
        Value::Array(a) => a,
        Value::Null => return Ok(Vec::new()),
        other => {
            return Err(HwError::MalformedResponse(format!(
                "results is not an array: {other}"
            )));
        }
    };
    let Some((head, tail)) = entries.split_first() else {
        return Ok(Vec::new());
    };

    let mut out = Vec::with_capacity(entries.len());
    out.push(decode_entry(0, head)?);
    for (idx, entry) in tail.iter().enumerate() {
        match decode_entry(idx + 1, entry) {
            Ok(p) => out.push(p),
            Err(e) => tracing::debug!(error = %e, "skipping undecodable classification entry"),
        }
    }
    Ok(out)
}

fn decode_entry(idx: usize, entry: &Value) -> Result<Prediction> {
    let obj = entry
        .as_object()
        .ok_or_else(|| HwError::MalformedResponse(format!("results[{idx}] is not an object")))?;
    let (label, conf) = obj
        .iter()
        .next()
        .ok_or_else(|| HwError::MalformedResponse(format!("results[{idx}] is empty")))?;
    let confidence = conf.as_f64().ok_or_else(|| {
        HwError::MalformedResponse(format!("results[{idx}].{label} is not a number"))
    })?;
    Ok(Prediction::new(label.clone(), confidence))
}

/// Blocking multipart client for the classification endpoint.
#[derive(Debug, Clone)]
pub struct HttpClassifier {
    client: Client,
    endpoint: String,
}

impl HttpClassifier {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn post(&self, image: &CapturedImage) -> Result<Vec<Prediction>> {
        let part = multipart::Part::file(image.path())?
            .file_name("image.jpg")
            .mime_str("image/jpeg")?;
        let form = multipart::Form::new().part("file", part);

        tracing::debug!(endpoint = %self.endpoint, image = %image.path().display(), "sending image to classifier");
        let resp = self.client.post(&self.endpoint).multipart(form).send()?;
        let status = resp.status();
        if !status.is_success() {
            return Err(HwError::HttpStatus(status.as_u16()));
        }
        let body = resp.bytes()?;
        parse_results(&body)
    }
}

impl Classifier for HttpClassifier {
    fn classify(&mut self, image: &CapturedImage) -> std::result::Result<Vec<Prediction>, BoxError> {
        Ok(self.post(image)?)
    }
}

/// Scripted classifier for simulation and tests.
///
/// Replays queued responses in order; once the queue is drained every call
/// returns the fallback response.
#[derive(Debug, Clone)]
pub struct SimulatedClassifier {
    script: VecDeque<SimResponse>,
    fallback: SimResponse,
}

#[derive(Debug, Clone)]
pub enum SimResponse {
    Results(Vec<Prediction>),
    /// Raw body run through [`parse_results`].
    Body(String),
    TransportError,
}

impl SimulatedClassifier {
    /// Always answers `label` with `confidence`.
    pub fn fixed(label: impl Into<String>, confidence: f64) -> Self {
        Self {
            script: VecDeque::new(),
            fallback: SimResponse::Results(vec![Prediction::new(label, confidence)]),
        }
    }

    pub fn scripted(script: impl IntoIterator<Item = SimResponse>, fallback: SimResponse) -> Self {
        Self {
            script: script.into_iter().collect(),
            fallback,
        }
    }
}

impl Classifier for SimulatedClassifier {
    fn classify(&mut self, image: &CapturedImage) -> std::result::Result<Vec<Prediction>, BoxError> {
        let resp = self.script.pop_front().unwrap_or_else(|| self.fallback.clone());
        tracing::debug!(image = %image.path().display(), ?resp, "simulated classification");
        match resp {
            SimResponse::Results(r) => Ok(r),
            SimResponse::Body(b) => Ok(parse_results(b.as_bytes())?),
            SimResponse::TransportError => Err(Box::new(HwError::Http(
                "simulated connection refused".into(),
            ))),
        }
    }
}
