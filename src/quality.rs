use crate::error::{QualityError, Result};
use crate::latency::LatencySampler;
use crate::throughput::ThroughputAggregator;
use crate::traits::Transport;
use crate::types::{QualityResult, Responsiveness, Stage, TestConfig};
use crate::workers::{upload_endpoint, DownloadWorker, UploadWorker};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Run a complete quality test with no progress reporting.
pub async fn run_quality_test(
    transport: Arc<dyn Transport>,
    config: &TestConfig,
    cancel: &CancellationToken,
) -> Result<QualityResult> {
    QualityTest::new(transport, config.clone(), cancel.clone())
        .run()
        .await
}

/// One quality test run: idle latency, then download with loaded latency, then upload.
pub struct QualityTest {
    transport: Arc<dyn Transport>,
    config: TestConfig,
    cancel: CancellationToken,
    progress: Option<UnboundedSender<Stage>>,
}

impl QualityTest {
    pub fn new(transport: Arc<dyn Transport>, config: TestConfig, cancel: CancellationToken) -> Self {
        Self {
            transport,
            config,
            cancel,
            progress: None,
        }
    }

    /// Announce each stage on `tx` as it starts.
    pub fn with_progress(mut self, tx: UnboundedSender<Stage>) -> Self {
        self.progress = Some(tx);
        self
    }

    /// Any failing stage aborts the run; its error comes back wrapped with the
    /// stage name and nothing measured so far is returned.
    pub async fn run(&self) -> Result<QualityResult> {
        self.config.validate()?;
        info!(
            "Starting quality test: {:?} budget, {} connections",
            self.config.test_duration, self.config.connections
        );

        let idle_latency_ms = self
            .idle_latency()
            .await
            .map_err(|e| self.stage_error(e, Stage::IdleLatency))?;
        self.checkpoint(Stage::IdleLatency)?;

        let (downlink_mbps, loaded_latency_ms) = self
            .download()
            .await
            .map_err(|e| self.stage_error(e, Stage::Download))?;
        self.checkpoint(Stage::Download)?;

        let uplink_mbps = self
            .upload()
            .await
            .map_err(|e| self.stage_error(e, Stage::Upload))?;
        self.checkpoint(Stage::Upload)?;

        let result = QualityResult {
            uplink_mbps,
            downlink_mbps,
            idle_latency_ms,
            loaded_latency_ms,
            responsiveness: Responsiveness::from_latency_ms(loaded_latency_ms),
        };

        info!(
            "Quality test complete: down={:.3} Mbps up={:.3} Mbps idle={}ms loaded={}ms ({})",
            result.downlink_mbps,
            result.uplink_mbps,
            result.idle_latency_ms,
            result.loaded_latency_ms,
            result.responsiveness
        );

        Ok(result)
    }

    async fn idle_latency(&self) -> Result<f64> {
        self.announce(Stage::IdleLatency);
        let url = self.config.latency_endpoint();
        debug!("Measuring idle latency against {}", url);

        LatencySampler::new(self.transport.clone(), &self.config)
            .measure(url, &self.cancel)
            .await
    }

    /// Download load and the loaded latency sample run side by side and are
    /// joined at the end; the sample waits out the warm-up first.
    async fn download(&self) -> Result<(f64, f64)> {
        self.announce(Stage::Download);
        let download_url = self.config.download_endpoint();
        let latency_url = self.config.latency_endpoint();
        debug!("Measuring download speed against {}", download_url);

        let aggregator = ThroughputAggregator::new(
            self.config.connections,
            self.config.test_duration,
            self.cancel.clone(),
        );
        let sampler = LatencySampler::new(self.transport.clone(), &self.config);

        let (outcome, loaded) = tokio::join!(
            aggregator.run(|_| DownloadWorker::new(self.transport.clone(), download_url)),
            sampler.measure_after(self.config.loaded_warmup, latency_url, &self.cancel),
        );

        let outcome = outcome?;
        let loaded = loaded?;
        debug!(
            "Download: {} bytes in {:?}, loaded latency {}ms",
            outcome.bytes, outcome.elapsed, loaded
        );

        Ok((outcome.mbps, loaded))
    }

    async fn upload(&self) -> Result<f64> {
        self.announce(Stage::Upload);
        if self.config.upload_endpoints.is_empty() {
            return Err(QualityError::NoUploadEndpoints);
        }

        let endpoints = &self.config.upload_endpoints;
        let payload = UploadWorker::zeroed_payload(self.config.chunk_size());
        debug!(
            "Measuring upload speed with {} byte chunks across {} endpoints",
            payload.len(),
            endpoints.len()
        );

        let aggregator = ThroughputAggregator::new(
            self.config.connections,
            self.config.upload_duration(),
            self.cancel.clone(),
        );
        let outcome = aggregator
            .run(|index| {
                // non-empty, checked above
                let url = upload_endpoint(endpoints, index).unwrap_or_default();
                UploadWorker::new(self.transport.clone(), url, payload.clone())
            })
            .await?;
        debug!("Upload: {} bytes in {:?}", outcome.bytes, outcome.elapsed);

        Ok(outcome.mbps)
    }

    /// Once the token fires, whatever a stage failed with is reported as a
    /// cancellation: a sampler cut short has no samples, which is not a network fault.
    fn stage_error(&self, error: QualityError, stage: Stage) -> QualityError {
        if self.cancel.is_cancelled() {
            debug!("{} interrupted: {}", stage, error);
            return QualityError::Cancelled.in_stage(stage);
        }
        error.in_stage(stage)
    }

    /// A cancelled run never yields a result, even if the stage itself got through.
    fn checkpoint(&self, stage: Stage) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(QualityError::Cancelled.in_stage(stage));
        }
        Ok(())
    }

    fn announce(&self, stage: Stage) {
        if let Some(tx) = &self.progress {
            let _ = tx.send(stage);
        }
    }
}
