//! Point-in-time process health.

use std::time::Instant;

use serde::{Deserialize, Serialize};

/// Resident and virtual memory of the process in bytes.
///
/// `None` where the platform does not expose the value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MemoryUsage {
    pub rss_bytes: Option<u64>,
    pub virtual_bytes: Option<u64>,
}

impl MemoryUsage {
    #[cfg(target_os = "linux")]
    pub fn current() -> Self {
        match std::fs::read_to_string("/proc/self/status") {
            Ok(status) => Self::from_proc_status(&status),
            Err(e) => {
                tracing::debug!(error = %e, "Failed to read /proc/self/status");
                Self::default()
            }
        }
    }

    #[cfg(not(target_os = "linux"))]
    pub fn current() -> Self {
        Self::default()
    }

    /// Parse the `VmRSS` / `VmSize` lines (reported in kB).
    pub fn from_proc_status(status: &str) -> Self {
        let mut usage = Self::default();
        for line in status.lines() {
            if let Some(rest) = line.strip_prefix("VmRSS:") {
                usage.rss_bytes = parse_kb(rest);
            } else if let Some(rest) = line.strip_prefix("VmSize:") {
                usage.virtual_bytes = parse_kb(rest);
            }
        }
        usage
    }
}

fn parse_kb(field: &str) -> Option<u64> {
    field
        .split_whitespace()
        .next()
        .and_then(|kb| kb.parse::<u64>().ok())
        .map(|kb| kb * 1024)
}

/// Body of `GET /health`. Computed fresh on every call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthSnapshot {
    pub status: String,
    pub service: String,
    pub version: String,
    pub timestamp: String,
    /// Seconds since the gateway was constructed.
    pub uptime: f64,
    pub memory: MemoryUsage,
}

impl HealthSnapshot {
    pub fn capture(service: &str, started_at: Instant) -> Self {
        Self {
            status: "healthy".to_string(),
            service: service.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: super::iso_timestamp(),
            uptime: started_at.elapsed().as_secs_f64(),
            memory: MemoryUsage::current(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_proc_status() {
        let status = "Name:\tmusic-gateway\nVmPeak:\t  20000 kB\nVmSize:\t   18000 kB\nVmRSS:\t    5120 kB\n";
        let usage = MemoryUsage::from_proc_status(status);
        assert_eq!(usage.rss_bytes, Some(5120 * 1024));
        assert_eq!(usage.virtual_bytes, Some(18000 * 1024));
    }

    #[test]
    fn test_parse_missing_fields() {
        assert_eq!(MemoryUsage::from_proc_status("Name:\tx\n"), MemoryUsage::default());
    }

    #[test]
    fn test_uptime_non_decreasing() {
        let started = Instant::now();
        let first = HealthSnapshot::capture("music-api", started);
        let second = HealthSnapshot::capture("music-api", started);
        assert!(first.uptime >= 0.0);
        assert!(second.uptime >= first.uptime);
        assert_eq!(first.status, "healthy");
        assert_eq!(first.version, env!("CARGO_PKG_VERSION"));
    }
}
