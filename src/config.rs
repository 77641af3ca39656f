//! Monitor configuration and validation of its fields.
//!
//! The parsers here back the CLI's value parsers, so a bad flag fails before
//! any sampling happens and the error names the offending field.

use crate::error::{Result, SysmonError};
use crate::metrics::data::Domain;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Smallest accepted interval between cycles, in seconds.
pub const MIN_LOG_INTERVAL: u64 = 5;
/// Largest accepted interval between cycles, in seconds.
pub const MAX_LOG_INTERVAL: u64 = 3600;
/// Threshold bounds, in percent (both inclusive).
pub const MIN_THRESHOLD: u8 = 1;
pub const MAX_THRESHOLD: u8 = 99;

/// Validated configuration of the monitoring loop. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Destination of snapshot records
    pub log_file: PathBuf,
    /// Time between cycle starts
    pub interval: Duration,
    /// Domains sampled every cycle
    pub capture: BTreeSet<Domain>,
    /// Percent above which memory and swap usage warn
    pub memory_threshold: u8,
    /// Percent above which overall CPU usage warns
    pub cpu_threshold: u8,
    /// Percent above which root disk usage warns
    pub disk_threshold: u8,
    /// CPU observation window
    pub cpu_window: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            log_file: PathBuf::from(crate::DEFAULT_LOG_FILE),
            interval: Duration::from_secs(crate::DEFAULT_INTERVAL_SECS),
            capture: Domain::ALL.into_iter().collect(),
            memory_threshold: crate::DEFAULT_THRESHOLD,
            cpu_threshold: crate::DEFAULT_THRESHOLD,
            disk_threshold: crate::DEFAULT_THRESHOLD,
            cpu_window: Duration::from_millis(crate::DEFAULT_CPU_WINDOW_MS),
        }
    }
}

impl MonitorConfig {
    /// Create a configuration writing records to `log_file`.
    pub fn new(log_file: impl Into<PathBuf>) -> Self {
        Self {
            log_file: log_file.into(),
            ..Default::default()
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_capture(mut self, capture: impl IntoIterator<Item = Domain>) -> Self {
        self.capture = capture.into_iter().collect();
        self
    }

    pub fn with_memory_threshold(mut self, threshold: u8) -> Self {
        self.memory_threshold = threshold;
        self
    }

    pub fn with_cpu_threshold(mut self, threshold: u8) -> Self {
        self.cpu_threshold = threshold;
        self
    }

    pub fn with_disk_threshold(mut self, threshold: u8) -> Self {
        self.disk_threshold = threshold;
        self
    }

    pub fn with_cpu_window(mut self, window: Duration) -> Self {
        self.cpu_window = window;
        self
    }

    /// Check every field against its allowed range.
    ///
    /// Sub-second intervals are rejected along with everything outside
    /// `MIN_LOG_INTERVAL..=MAX_LOG_INTERVAL`.
    pub fn validate(self) -> Result<Self> {
        let secs = self.interval.as_secs();
        let whole_secs = self.interval.subsec_nanos() == 0;
        if !whole_secs || !(MIN_LOG_INTERVAL..=MAX_LOG_INTERVAL).contains(&secs) {
            return Err(SysmonError::config_error(
                "log_interval",
                format!(
                    "must be a whole number of seconds within {} to {} (both inclusive), got {:?}",
                    MIN_LOG_INTERVAL, MAX_LOG_INTERVAL, self.interval
                ),
            ));
        }
        if self.capture.is_empty() {
            return Err(SysmonError::config_error(
                "capture",
                "at least one of memory, cpu, disk, network must be captured",
            ));
        }
        check_threshold("memory_threshold", self.memory_threshold)?;
        check_threshold("cpu_threshold", self.cpu_threshold)?;
        check_threshold("disk_threshold", self.disk_threshold)?;
        if self.cpu_window < sysinfo::MINIMUM_CPU_UPDATE_INTERVAL {
            return Err(SysmonError::config_error(
                "cpu_window_ms",
                format!(
                    "must be at least {}ms",
                    sysinfo::MINIMUM_CPU_UPDATE_INTERVAL.as_millis()
                ),
            ));
        }
        Ok(self)
    }
}

fn check_threshold(field: &'static str, threshold: u8) -> Result<u8> {
    if (MIN_THRESHOLD..=MAX_THRESHOLD).contains(&threshold) {
        Ok(threshold)
    } else {
        Err(SysmonError::config_error(
            field,
            format!(
                "should be within the range of {} to {} (both inclusive), got {}",
                MIN_THRESHOLD, MAX_THRESHOLD, threshold
            ),
        ))
    }
}

/// Parse the `log_interval` field: integer seconds within 5..=3600.
pub fn parse_log_interval(value: &str) -> Result<Duration> {
    let secs: u64 = value.trim().parse().map_err(|e| {
        SysmonError::config_error(
            "log_interval",
            format!("'{}' should be an integer: {}", value, e),
        )
    })?;
    if !(MIN_LOG_INTERVAL..=MAX_LOG_INTERVAL).contains(&secs) {
        return Err(SysmonError::config_error(
            "log_interval",
            format!(
                "should be within the range of {} to {} (both inclusive), got {}",
                MIN_LOG_INTERVAL, MAX_LOG_INTERVAL, secs
            ),
        ));
    }
    Ok(Duration::from_secs(secs))
}

/// Parse the `capture` field: comma-separated domain names or `all`.
pub fn parse_capture(value: &str) -> Result<BTreeSet<Domain>> {
    let names: Vec<&str> = value.split(',').map(str::trim).collect();

    let mut invalid: Vec<&str> = names
        .iter()
        .copied()
        .filter(|name| *name != "all" && Domain::from_name(name).is_none())
        .collect();
    if !invalid.is_empty() {
        invalid.sort_unstable();
        invalid.dedup();
        return Err(SysmonError::config_error(
            "capture",
            format!(
                "invalid system param {:?} passed for monitoring; \
                 allowed values are memory, cpu, disk, network, all",
                invalid
            ),
        ));
    }

    if names.contains(&"all") {
        return Ok(Domain::ALL.into_iter().collect());
    }
    Ok(names.into_iter().filter_map(Domain::from_name).collect())
}

/// Parse one of the `*_threshold` fields: integer percent within 1..=99.
pub fn parse_threshold(field: &'static str, value: &str) -> Result<u8> {
    let threshold: i64 = value.trim().parse().map_err(|e| {
        SysmonError::config_error(field, format!("'{}' should be an integer: {}", value, e))
    })?;
    let threshold = u8::try_from(threshold).map_err(|_| {
        SysmonError::config_error(
            field,
            format!(
                "should be within the range of {} to {} (both inclusive), got {}",
                MIN_THRESHOLD, MAX_THRESHOLD, threshold
            ),
        )
    })?;
    check_threshold(field, threshold)
}

/// Parse the `log_file` field: its parent directory must already exist.
pub fn parse_log_file(value: &str) -> Result<PathBuf> {
    let path = PathBuf::from(value);
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    if !parent.is_dir() {
        return Err(SysmonError::config_error(
            "log_file",
            format!("invalid log file path '{}': directory does not exist", value),
        ));
    }
    Ok(path)
}

/// Parse the `cpu_window_ms` field.
pub fn parse_cpu_window(value: &str) -> Result<Duration> {
    let millis: u64 = value.trim().parse().map_err(|e| {
        SysmonError::config_error(
            "cpu_window_ms",
            format!("'{}' should be an integer: {}", value, e),
        )
    })?;
    Ok(Duration::from_millis(millis))
}
