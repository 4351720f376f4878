use crate::config;
use crate::error::{QualityError, Result};
use std::fmt;
use std::time::Duration;

pub const DEFAULT_TEST_DURATION: Duration = Duration::from_secs(10);
/// Longest accepted download budget.
pub const MAX_TEST_DURATION: Duration = Duration::from_secs(24 * 60 * 60);
pub const DEFAULT_CONNECTIONS: usize = 4;
pub const DEFAULT_UPLOAD_CHUNK_SIZE: usize = 512 * 1024;

/// 测试配置
#[derive(Debug, Clone)]
pub struct TestConfig {
    /// Download phase budget. Upload runs for half of it.
    pub test_duration: Duration,
    /// First entry is the bulk download target, second (if any) the latency probe.
    pub download_endpoints: Vec<String>,
    /// Assigned round-robin to upload workers.
    pub upload_endpoints: Vec<String>,
    pub upload_chunk_size: usize,
    pub connections: usize,
    pub probe_timeout: Duration,
    pub transfer_timeout: Duration,
    pub latency_samples: usize,
    pub sample_pacing: Duration,
    /// Delay before the loaded latency sample starts, so the download can ramp up.
    pub loaded_warmup: Duration,
}

impl Default for TestConfig {
    fn default() -> Self {
        let endpoints = config::default_endpoints();
        Self {
            test_duration: DEFAULT_TEST_DURATION,
            download_endpoints: endpoints.download,
            upload_endpoints: endpoints.upload,
            upload_chunk_size: DEFAULT_UPLOAD_CHUNK_SIZE,
            connections: DEFAULT_CONNECTIONS,
            probe_timeout: Duration::from_secs(5),
            transfer_timeout: Duration::from_secs(30),
            latency_samples: 10,
            sample_pacing: Duration::from_millis(100),
            loaded_warmup: Duration::from_secs(2),
        }
    }
}

impl TestConfig {
    /// Checks the preconditions that must hold before any request goes out.
    pub fn validate(&self) -> Result<()> {
        if self.test_duration.is_zero() {
            return Err(QualityError::InvalidConfig(
                "test duration must be positive".to_string(),
            ));
        }
        if self.test_duration > MAX_TEST_DURATION {
            return Err(QualityError::InvalidConfig(format!(
                "test duration must not exceed {} seconds",
                MAX_TEST_DURATION.as_secs()
            )));
        }
        if self.download_endpoints.is_empty() {
            return Err(QualityError::InvalidConfig(
                "no download test servers configured".to_string(),
            ));
        }
        if self.connections == 0 {
            return Err(QualityError::InvalidConfig(
                "at least one connection is required".to_string(),
            ));
        }
        Ok(())
    }

    pub fn download_endpoint(&self) -> &str {
        &self.download_endpoints[0]
    }

    /// The probe target: the second download endpoint, else the first.
    pub fn latency_endpoint(&self) -> &str {
        self.download_endpoints
            .get(1)
            .unwrap_or(&self.download_endpoints[0])
    }

    pub fn chunk_size(&self) -> usize {
        if self.upload_chunk_size == 0 {
            DEFAULT_UPLOAD_CHUNK_SIZE
        } else {
            self.upload_chunk_size
        }
    }

    pub fn upload_duration(&self) -> Duration {
        self.test_duration / 2
    }
}

/// 响应性分级
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Responsiveness {
    High,
    Medium,
    Low,
}

impl Responsiveness {
    pub fn from_latency_ms(latency_ms: f64) -> Self {
        if latency_ms < 200.0 {
            Responsiveness::High
        } else if latency_ms < 1000.0 {
            Responsiveness::Medium
        } else {
            Responsiveness::Low
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Responsiveness::High => "High",
            Responsiveness::Medium => "Medium",
            Responsiveness::Low => "Low",
        }
    }
}

impl fmt::Display for Responsiveness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 测试结果
#[derive(Debug, Clone, PartialEq)]
pub struct QualityResult {
    pub uplink_mbps: f64,
    pub downlink_mbps: f64,
    pub idle_latency_ms: f64,
    pub loaded_latency_ms: f64,
    pub responsiveness: Responsiveness,
}

/// The measurement phases, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    IdleLatency,
    Download,
    Upload,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::IdleLatency => "idle latency",
            Stage::Download => "download speed",
            Stage::Upload => "upload speed",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(download: &[&str]) -> TestConfig {
        TestConfig {
            download_endpoints: download.iter().map(|s| s.to_string()).collect(),
            ..TestConfig::default()
        }
    }

    #[test]
    fn test_responsiveness_thresholds() {
        assert_eq!(Responsiveness::from_latency_ms(199.0), Responsiveness::High);
        assert_eq!(Responsiveness::from_latency_ms(200.0), Responsiveness::Medium);
        assert_eq!(Responsiveness::from_latency_ms(999.0), Responsiveness::Medium);
        assert_eq!(Responsiveness::from_latency_ms(1000.0), Responsiveness::Low);
    }

    #[test]
    fn test_latency_endpoint_fallback() {
        let single = config_with(&["http://a/down"]);
        assert_eq!(single.latency_endpoint(), "http://a/down");

        let pair = config_with(&["http://a/down", "http://b/204"]);
        assert_eq!(pair.download_endpoint(), "http://a/down");
        assert_eq!(pair.latency_endpoint(), "http://b/204");
    }

    #[test]
    fn test_validate_rejects_bad_config() {
        let zero = TestConfig {
            test_duration: Duration::ZERO,
            ..TestConfig::default()
        };
        assert!(matches!(zero.validate(), Err(QualityError::InvalidConfig(_))));

        let empty = config_with(&[]);
        assert!(matches!(empty.validate(), Err(QualityError::InvalidConfig(_))));

        let no_workers = TestConfig {
            connections: 0,
            ..TestConfig::default()
        };
        assert!(matches!(
            no_workers.validate(),
            Err(QualityError::InvalidConfig(_))
        ));

        assert!(TestConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_caps_duration() {
        let huge = TestConfig {
            test_duration: Duration::from_secs(u64::MAX),
            ..TestConfig::default()
        };
        assert!(matches!(huge.validate(), Err(QualityError::InvalidConfig(_))));

        let day = TestConfig {
            test_duration: MAX_TEST_DURATION,
            ..TestConfig::default()
        };
        assert!(day.validate().is_ok());
    }

    #[test]
    fn test_chunk_size_falls_back() {
        let config = TestConfig {
            upload_chunk_size: 0,
            ..TestConfig::default()
        };
        assert_eq!(config.chunk_size(), DEFAULT_UPLOAD_CHUNK_SIZE);
        assert_eq!(config.upload_duration(), Duration::from_secs(5));
    }
}
