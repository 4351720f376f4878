use crate::error::{QualityError, Result};
use crate::traits::TransferWorker;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Byte accumulator for a single phase. Each aggregator run owns a fresh one.
#[derive(Debug, Default)]
pub struct TransferCounter {
    bytes: AtomicU64,
}

impl TransferCounter {
    pub fn add(&self, bytes: u64) {
        self.bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn total(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }
}

/// What one throughput phase measured.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseOutcome {
    pub bytes: u64,
    /// Actual time from phase start until the last worker returned. Usually a
    /// little over the budget, because each worker finishes its in-flight request.
    pub elapsed: Duration,
    pub mbps: f64,
}

/// Runs a fixed set of workers concurrently against a shared deadline.
pub struct ThroughputAggregator {
    connections: usize,
    budget: Duration,
    cancel: CancellationToken,
}

impl ThroughputAggregator {
    pub fn new(connections: usize, budget: Duration, cancel: CancellationToken) -> Self {
        Self {
            connections,
            budget,
            cancel,
        }
    }

    /// 并发执行所有 worker
    ///
    /// 逻辑:
    /// 1. 由 factory 为每个连接创建一个 worker (参数为 worker 序号)
    /// 2. 每个 worker 各自 spawn 为一个任务，循环执行直到截止时间或取消
    /// 3. 等待全部任务完成 (join_all)，不另设 join 超时
    /// 4. 按实际耗时计算速率
    pub async fn run<F, W>(&self, factory: F) -> Result<PhaseOutcome>
    where
        F: Fn(usize) -> W,
        W: TransferWorker + 'static,
    {
        let counter = Arc::new(TransferCounter::default());
        let start = Instant::now();
        let deadline = start
            .checked_add(self.budget)
            .ok_or_else(|| {
                QualityError::InvalidConfig(format!("phase budget {:?} is too large", self.budget))
            })?;

        let handles = (0..self.connections).map(|index| {
            let worker = factory(index);
            let counter = counter.clone();
            let cancel = self.cancel.clone();
            tokio::spawn(worker_loop(worker, deadline, cancel, counter))
        });

        let joined = futures::future::join_all(handles).await;
        let elapsed = start.elapsed();

        let mut attempts = 0;
        for result in joined {
            attempts += result?;
        }

        let bytes = counter.total();
        let mbps = megabits_per_second(bytes, elapsed);
        debug!(
            "phase done: {} workers, {} attempts, {} bytes in {:?} ({} Mbps)",
            self.connections, attempts, bytes, elapsed, mbps
        );

        Ok(PhaseOutcome {
            bytes,
            elapsed,
            mbps,
        })
    }
}

/// Cancellation is only checked between attempts. A request already in flight
/// runs to completion (or its own timeout) and its bytes still count.
async fn worker_loop<W: TransferWorker>(
    worker: W,
    deadline: Instant,
    cancel: CancellationToken,
    counter: Arc<TransferCounter>,
) -> u64 {
    let mut attempts = 0;
    while Instant::now() < deadline && !cancel.is_cancelled() {
        let bytes = worker.attempt().await;
        counter.add(bytes);
        attempts += 1;
    }
    attempts
}

/// bytes over elapsed time, in Mbps rounded to 3 decimals. Zero bytes is 0, not an error.
pub fn megabits_per_second(bytes: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if bytes == 0 || secs == 0.0 {
        return 0.0;
    }
    round3((bytes as f64 * 8.0) / (secs * 1_000_000.0))
}

pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
