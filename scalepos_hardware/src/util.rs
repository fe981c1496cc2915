use std::time::{Duration, Instant};

use crate::error::{HwError, Result};

/// Poll `is_busy` until it reports false (HX711: DT line pulled low = data ready)
/// or `timeout` expires. Sleeps `poll_interval` between polls.
pub fn wait_until_ready(
    mut is_busy: impl FnMut() -> bool,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<()> {
    let deadline = Instant::now() + timeout;
    while is_busy() {
        if Instant::now() >= deadline {
            return Err(HwError::DataReadyTimeout);
        }
        std::thread::sleep(poll_interval);
    }
    Ok(())
}

/// Mean of a non-empty slice of raw counts; `None` when empty.
pub fn mean_counts(values: &[i32]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let sum: i64 = values.iter().map(|&v| i64::from(v)).sum();
    Some(sum as f64 / values.len() as f64)
}
