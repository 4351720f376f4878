use crate::traits::{TransferWorker, Transport};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// GET the download endpoint and throw the body away.
pub struct DownloadWorker {
    transport: Arc<dyn Transport>,
    url: String,
}

impl DownloadWorker {
    pub fn new(transport: Arc<dyn Transport>, url: &str) -> Self {
        Self {
            transport,
            url: url.to_string(),
        }
    }
}

#[async_trait]
impl TransferWorker for DownloadWorker {
    async fn attempt(&self) -> u64 {
        match self.transport.download(&self.url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                // 失败的尝试计为 0 字节，继续下一轮
                debug!("download from {} failed: {}", self.url, e);
                0
            }
        }
    }
}
