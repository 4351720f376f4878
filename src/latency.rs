use crate::error::{QualityError, Result};
use crate::traits::Transport;
use crate::types::TestConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Sequential round-trip sampler, used both idle and under download load.
///
/// Each probe is timed from dispatch until the response headers arrive. Failed,
/// timed out and cancelled probes are skipped without retry; the result is the
/// mean of whatever succeeded, truncated to whole milliseconds.
pub struct LatencySampler {
    transport: Arc<dyn Transport>,
    samples: usize,
    pacing: Duration,
    probe_timeout: Duration,
}

impl LatencySampler {
    pub fn new(transport: Arc<dyn Transport>, config: &TestConfig) -> Self {
        Self {
            transport,
            samples: config.latency_samples,
            pacing: config.sample_pacing,
            probe_timeout: config.probe_timeout,
        }
    }

    pub async fn measure(&self, url: &str, cancel: &CancellationToken) -> Result<f64> {
        let mut total = Duration::ZERO;
        let mut succeeded: u32 = 0;

        for i in 0..self.samples {
            if cancel.is_cancelled() {
                break;
            }

            let start = Instant::now();
            let outcome = tokio::select! {
                _ = cancel.cancelled() => break,
                res = timeout(self.probe_timeout, self.transport.probe(url)) => res,
            };

            match outcome {
                Ok(Ok(())) => {
                    total += start.elapsed();
                    succeeded += 1;
                }
                Ok(Err(e)) => debug!("latency probe {} to {} failed: {}", i + 1, url, e),
                Err(_) => debug!("latency probe {} to {} timed out", i + 1, url),
            }

            if i + 1 < self.samples {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = sleep(self.pacing) => {}
                }
            }
        }

        debug!("latency: {}/{} probes succeeded", succeeded, self.samples);
        mean_millis(total, succeeded).ok_or(QualityError::AllSamplesFailed)
    }

    /// Waits `delay` (so load can build up), then samples.
    pub async fn measure_after(
        &self,
        delay: Duration,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<f64> {
        tokio::select! {
            _ = cancel.cancelled() => return Err(QualityError::Cancelled),
            _ = sleep(delay) => {}
        }
        self.measure(url, cancel).await
    }
}

fn mean_millis(total: Duration, count: u32) -> Option<f64> {
    if count == 0 {
        return None;
    }
    Some((total / count).as_millis() as f64)
}
