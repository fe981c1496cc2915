//! Background weight sampling.
//!
//! Spawns a thread that owns the `WeightSensor`, publishes the newest reading
//! on a bounded(1) channel, and tracks the last-ok timestamp so the control
//! loop can tell a stalled sensor from a quiet one.
//!
//! Each `Sampler` spawns exactly one thread, shut down and joined on drop.
use crossbeam_channel as xch;
use scalepos_traits::WeightSensor;
use scalepos_traits::clock::Clock;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

pub struct Sampler {
    rx: xch::Receiver<f32>,
    last_ok: Arc<AtomicU64>,
    epoch: Instant,
    shutdown: Arc<AtomicBool>,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl Sampler {
    pub fn spawn<S, C>(mut sensor: S, readings: u32, period: Duration, clock: C) -> Self
    where
        S: WeightSensor + Send + 'static,
        C: Clock + Send + Sync + 'static,
    {
        let (tx, rx) = xch::bounded(1);
        // Producer-side handle used to evict an unread value so the slot holds the newest.
        let evict = rx.clone();
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();
        let last_ok = Arc::new(AtomicU64::new(0));
        let last_ok_clone = last_ok.clone();
        let epoch = clock.now();

        let join_handle = std::thread::spawn(move || {
            let mut next = clock.now();
            loop {
                if shutdown_clone.load(Ordering::Relaxed) {
                    tracing::debug!("Sampler thread received shutdown signal");
                    break;
                }

                match sensor.sample(readings) {
                    Ok(grams) => {
                        let _ = evict.try_recv();
                        if let Err(xch::TrySendError::Disconnected(_)) = tx.try_send(grams) {
                            tracing::debug!("Sampler consumer disconnected, exiting thread");
                            break;
                        }
                        last_ok_clone.store(clock.ms_since(epoch), Ordering::Relaxed);
                    }
                    Err(e) => {
                        tracing::debug!(error = %e, "background sample failed");
                    }
                }

                if shutdown_clone.load(Ordering::Relaxed) {
                    break;
                }
                // Skip missed deadlines instead of bursting to catch up.
                next = (next + period).max(clock.now());
                clock.sleep_until(next);
            }
            tracing::trace!("Sampler thread exiting cleanly");
        });

        Self {
            rx,
            last_ok,
            epoch,
            shutdown,
            join_handle: Some(join_handle),
        }
    }

    /// Newest reading since the last call, if any.
    pub fn latest(&self) -> Option<f32> {
        self.rx.try_iter().last()
    }

    /// Block up to `timeout` for a reading.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<f32> {
        self.rx.recv_timeout(timeout).ok()
    }

    /// Stall in milliseconds measured against a real monotonic clock.
    pub fn stalled_for_now(&self) -> u64 {
        let ms = Instant::now().saturating_duration_since(self.epoch).as_millis();
        let now_ms = ms.min(u128::from(u64::MAX)) as u64;
        now_ms.saturating_sub(self.last_ok.load(Ordering::Relaxed))
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        // The thread exits once the current sensor read returns.
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(()) => {
                    tracing::trace!("Sampler thread joined successfully");
                }
                Err(e) => {
                    tracing::warn!(?e, "Sampler thread panicked during shutdown");
                }
            }
        }
    }
}
