//! Scripted transport for engine tests. Every call sleeps on the tokio clock,
//! so tests running with a paused clock see exact, deterministic timings.

use crate::error::{QualityError, Result};
use crate::traits::Transport;
use async_trait::async_trait;
use bytes::Bytes;
use std::io::{self, ErrorKind};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::sleep;

pub struct MockTransport {
    probe_delay: Duration,
    /// Zero-based probe calls that succeed; `None` means all of them.
    probe_successes: Option<Vec<usize>>,
    download_delay: Duration,
    download_bytes: Option<u64>,
    upload_delay: Duration,
    upload_status: u16,
    pub probe_calls: AtomicUsize,
    pub download_calls: AtomicUsize,
    pub upload_calls: AtomicUsize,
    pub upload_targets: Mutex<Vec<String>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            probe_delay: Duration::from_millis(10),
            probe_successes: None,
            download_delay: Duration::from_millis(10),
            download_bytes: Some(1_000),
            upload_delay: Duration::from_millis(10),
            upload_status: 200,
            probe_calls: AtomicUsize::new(0),
            download_calls: AtomicUsize::new(0),
            upload_calls: AtomicUsize::new(0),
            upload_targets: Mutex::new(Vec::new()),
        }
    }

    pub fn with_probe(mut self, delay: Duration) -> Self {
        self.probe_delay = delay;
        self
    }

    pub fn failing_probes(mut self) -> Self {
        self.probe_successes = Some(Vec::new());
        self
    }

    pub fn probes_succeeding_on(mut self, calls: &[usize]) -> Self {
        self.probe_successes = Some(calls.to_vec());
        self
    }

    pub fn with_download(mut self, bytes: u64, delay: Duration) -> Self {
        self.download_bytes = Some(bytes);
        self.download_delay = delay;
        self
    }

    pub fn failing_downloads(mut self, delay: Duration) -> Self {
        self.download_bytes = None;
        self.download_delay = delay;
        self
    }

    pub fn with_upload(mut self, status: u16, delay: Duration) -> Self {
        self.upload_status = status;
        self.upload_delay = delay;
        self
    }

    pub fn total_calls(&self) -> usize {
        self.probe_calls.load(Ordering::SeqCst)
            + self.download_calls.load(Ordering::SeqCst)
            + self.upload_calls.load(Ordering::SeqCst)
    }
}

fn io_error(kind: ErrorKind) -> QualityError {
    QualityError::Io(io::Error::from(kind))
}

#[async_trait]
impl Transport for MockTransport {
    async fn probe(&self, _url: &str) -> Result<()> {
        let call = self.probe_calls.fetch_add(1, Ordering::SeqCst);
        sleep(self.probe_delay).await;
        match &self.probe_successes {
            Some(ok) if !ok.contains(&call) => {
                Err(io_error(ErrorKind::ConnectionRefused))
            }
            _ => Ok(()),
        }
    }

    async fn download(&self, _url: &str) -> Result<u64> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        sleep(self.download_delay).await;
        self.download_bytes
            .ok_or_else(|| io_error(ErrorKind::ConnectionReset))
    }

    async fn upload(&self, url: &str, _payload: Bytes) -> Result<u16> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut targets) = self.upload_targets.lock() {
            targets.push(url.to_string());
        }
        sleep(self.upload_delay).await;
        Ok(self.upload_status)
    }
}
