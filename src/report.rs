use crate::types::{QualityResult, Responsiveness};
use colored::{Color, ColoredString, Colorize};
use std::fmt::Write as _;

const BAR_LENGTH: usize = 20;
/// Latency bar is empty at this many milliseconds and beyond
const LATENCY_BAR_CEILING_MS: f64 = 200.0;
pub const DOWNLOAD_BAR_MAX_MBPS: f64 = 100.0;
pub const UPLOAD_BAR_MAX_MBPS: f64 = 50.0;

/// Overall rating combining throughput and idle latency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverallQuality {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl OverallQuality {
    /// Up to 3 points each for download, upload and idle latency.
    pub fn score(result: &QualityResult) -> u32 {
        let download = tiered(result.downlink_mbps, &[50.0, 25.0, 10.0]);
        let upload = tiered(result.uplink_mbps, &[20.0, 10.0, 5.0]);

        let latency = if result.idle_latency_ms < 20.0 {
            3
        } else if result.idle_latency_ms < 50.0 {
            2
        } else if result.idle_latency_ms < 100.0 {
            1
        } else {
            0
        };

        download + upload + latency
    }

    pub fn from_result(result: &QualityResult) -> Self {
        match Self::score(result) {
            8.. => OverallQuality::Excellent,
            6..=7 => OverallQuality::Good,
            4..=5 => OverallQuality::Fair,
            _ => OverallQuality::Poor,
        }
    }

    pub fn color(&self) -> Color {
        match self {
            OverallQuality::Excellent => Color::Green,
            OverallQuality::Good => Color::Cyan,
            OverallQuality::Fair => Color::Yellow,
            OverallQuality::Poor => Color::Red,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            OverallQuality::Excellent => "⭐ Excellent",
            OverallQuality::Good => "✅ Good",
            OverallQuality::Fair => "⚠️  Fair",
            OverallQuality::Poor => "❌ Poor",
        }
    }
}

/// 3 points above the first threshold, 2 above the second, 1 above the third.
fn tiered(value: f64, thresholds: &[f64; 3]) -> u32 {
    thresholds
        .iter()
        .position(|t| value > *t)
        .map(|i| 3 - i as u32)
        .unwrap_or(0)
}

fn bar(filled: usize) -> String {
    let filled = filled.min(BAR_LENGTH);
    format!("[{}{}]", "█".repeat(filled), "░".repeat(BAR_LENGTH - filled))
}

pub fn performance_bar(mbps: f64, max_mbps: f64) -> String {
    let filled = ((mbps / max_mbps) * BAR_LENGTH as f64).max(0.0) as usize;
    format!("{} {:.2} Mbps", bar(filled), mbps)
}

/// Inverse scale: the lower the latency, the fuller the bar.
pub fn latency_bar(latency_ms: f64) -> String {
    let ratio = 1.0 - latency_ms / LATENCY_BAR_CEILING_MS;
    let filled = (ratio * BAR_LENGTH as f64).max(0.0) as usize;
    format!("{} {:.2} ms", bar(filled), latency_ms)
}

fn responsiveness_color(responsiveness: Responsiveness) -> Color {
    match responsiveness {
        Responsiveness::High => Color::Green,
        Responsiveness::Medium => Color::Yellow,
        Responsiveness::Low => Color::Red,
    }
}

/// Green from two thirds of the scale up, yellow from one third, red below.
fn fill_color(ratio: f64) -> Color {
    if ratio >= 2.0 / 3.0 {
        Color::Green
    } else if ratio >= 1.0 / 3.0 {
        Color::Yellow
    } else {
        Color::Red
    }
}

fn header(title: &str) -> ColoredString {
    title.cyan().bold()
}

fn field(name: &str) -> ColoredString {
    name.green()
}

/// The summary printed after a successful run. Colours follow `colored`'s
/// global settings, so `NO_COLOR` and `CLICOLOR=0` yield plain text.
pub fn render(result: &QualityResult) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{}", header("=========== SUMMARY ==========="));
    let _ = writeln!(
        out,
        "{} {}",
        field("Uplink capacity:"),
        format!("{:.3} Mbps", result.uplink_mbps).white().bold()
    );
    let _ = writeln!(
        out,
        "{} {}",
        field("Downlink capacity:"),
        format!("{:.3} Mbps", result.downlink_mbps).white().bold()
    );
    let _ = writeln!(
        out,
        "{} {} {}",
        field("Responsiveness:"),
        result
            .responsiveness
            .label()
            .color(responsiveness_color(result.responsiveness))
            .bold(),
        format!("({:.3} milliseconds)", result.loaded_latency_ms).white()
    );
    let _ = writeln!(
        out,
        "{} {}",
        field("Idle Latency:"),
        format!("{:.3} milliseconds", result.idle_latency_ms).white().bold()
    );

    let overall = OverallQuality::from_result(result);
    let _ = writeln!(out, "\n{}", header("========== QUALITY ============"));
    let _ = writeln!(
        out,
        "{} {}",
        field("Overall:"),
        overall.label().color(overall.color()).bold()
    );

    let _ = writeln!(out, "\n{}", header("======== PERFORMANCE =========="));
    let _ = writeln!(
        out,
        "{} {}",
        field("Download:"),
        performance_bar(result.downlink_mbps, DOWNLOAD_BAR_MAX_MBPS)
            .color(fill_color(result.downlink_mbps / DOWNLOAD_BAR_MAX_MBPS))
    );
    let _ = writeln!(
        out,
        "{}   {}",
        field("Upload:"),
        performance_bar(result.uplink_mbps, UPLOAD_BAR_MAX_MBPS)
            .color(fill_color(result.uplink_mbps / UPLOAD_BAR_MAX_MBPS))
    );
    let _ = writeln!(
        out,
        "{}  {}",
        field("Latency:"),
        latency_bar(result.idle_latency_ms)
            .color(fill_color(1.0 - result.idle_latency_ms / LATENCY_BAR_CEILING_MS))
    );

    out
}
