use crate::traits::{TransferWorker, Transport};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use tracing::debug;

/// POST a fixed, zero-filled payload to one upload endpoint.
///
/// An attempt only counts when the server answers 2xx or 3xx. Anything else
/// counts as zero and the worker loop goes straight to the next attempt.
pub struct UploadWorker {
    transport: Arc<dyn Transport>,
    url: String,
    payload: Bytes,
}

impl UploadWorker {
    /// `payload` is shared between workers; cloning `Bytes` does not copy.
    pub fn new(transport: Arc<dyn Transport>, url: &str, payload: Bytes) -> Self {
        Self {
            transport,
            url: url.to_string(),
            payload,
        }
    }

    pub fn zeroed_payload(size: usize) -> Bytes {
        Bytes::from(vec![0u8; size])
    }
}

#[async_trait]
impl TransferWorker for UploadWorker {
    async fn attempt(&self) -> u64 {
        match self.transport.upload(&self.url, self.payload.clone()).await {
            Ok(status) if (200..400).contains(&status) => self.payload.len() as u64,
            Ok(status) => {
                debug!("upload to {} rejected with status {}", self.url, status);
                0
            }
            Err(e) => {
                debug!("upload to {} failed: {}", self.url, e);
                0
            }
        }
    }
}
