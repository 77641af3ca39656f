//! Threshold evaluation and the operator-facing warning stream.
//!
//! Only aggregate metrics are checked: virtual and swap memory against the
//! memory threshold, overall CPU against the CPU threshold, and root disk
//! usage against the disk threshold. Warnings are not deduplicated, so a
//! sustained breach warns every cycle.

use crate::config::MonitorConfig;
use crate::metrics::data::{AggregateMetric, Domain, DomainReading};
use crate::units::Reading;
use chrono::Local;
use std::io::{self, Write};

/// Timestamp format of warning lines.
pub const ALERT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S,%3f";

/// A threshold breach. Transient: written to the operator stream, never
/// recorded in a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Warning {
    pub domain: Domain,
    /// Record key of the breaching metric
    pub metric: &'static str,
    pub observed: f64,
    pub threshold: u8,
    pub message: String,
}

/// Compare one reading against its threshold.
///
/// A warning fires only when `observed` is strictly greater than
/// `threshold`; equality does not warn.
pub fn evaluate(metric: &AggregateMetric, threshold_field: &str, threshold: u8) -> Option<Warning> {
    if metric.observed <= f64::from(threshold) {
        return None;
    }
    Some(Warning {
        domain: metric.domain,
        metric: metric.name,
        observed: metric.observed,
        threshold,
        message: format!(
            "Alert: Current {} usage is {} which is greater than the {} threshold {}% ({}={})",
            metric.label,
            Reading::Percent(metric.observed),
            metric.domain,
            threshold,
            threshold_field,
            threshold
        ),
    })
}

/// Per-domain alert limits, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    pub memory: u8,
    pub cpu: u8,
    pub disk: u8,
}

impl Thresholds {
    /// The configuration field name and limit that apply to a domain.
    pub fn for_domain(&self, domain: Domain) -> Option<(&'static str, u8)> {
        match domain {
            Domain::Memory => Some(("memory_threshold", self.memory)),
            Domain::Cpu => Some(("cpu_threshold", self.cpu)),
            Domain::Disk => Some(("disk_threshold", self.disk)),
            Domain::Network => None,
        }
    }
}

impl From<&MonitorConfig> for Thresholds {
    fn from(config: &MonitorConfig) -> Self {
        Self {
            memory: config.memory_threshold,
            cpu: config.cpu_threshold,
            disk: config.disk_threshold,
        }
    }
}

/// Line-oriented operator stream for warnings.
///
/// Each warning is one line: `[<timestamp>] [WARNING] [<source>] <message>`.
pub struct AlertStream {
    sink: Box<dyn Write + Send>,
}

impl AlertStream {
    pub fn new(sink: impl Write + Send + 'static) -> Self {
        Self {
            sink: Box::new(sink),
        }
    }

    /// Operator stream on standard error.
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }

    /// Write one warning line and flush it.
    pub fn emit(&mut self, warning: &Warning) -> io::Result<()> {
        writeln!(
            self.sink,
            "[{}] [WARNING] [{}] {}",
            Local::now().format(ALERT_TIMESTAMP_FORMAT),
            warning.domain,
            warning.message
        )?;
        self.sink.flush()
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.sink.flush()
    }
}

/// Checks readings against the configured thresholds and reports breaches
/// on the operator stream.
pub struct ThresholdEvaluator {
    thresholds: Thresholds,
    stream: AlertStream,
}

impl ThresholdEvaluator {
    pub fn new(thresholds: Thresholds, stream: AlertStream) -> Self {
        Self { thresholds, stream }
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    /// Evaluate every aggregate metric of `reading`, emitting each breach.
    ///
    /// A failing operator stream is logged and does not stop evaluation.
    pub fn check(&mut self, reading: &DomainReading) -> Vec<Warning> {
        let Some((field, threshold)) = self.thresholds.for_domain(reading.domain()) else {
            return Vec::new();
        };

        let warnings: Vec<Warning> = reading
            .aggregate_metrics()
            .iter()
            .filter_map(|metric| evaluate(metric, field, threshold))
            .collect();

        for warning in &warnings {
            tracing::debug!(
                domain = %warning.domain,
                metric = warning.metric,
                observed = warning.observed,
                threshold = warning.threshold,
                "threshold breached"
            );
            if let Err(e) = self.stream.emit(warning) {
                tracing::error!("Failed to write warning to operator stream: {}", e);
            }
        }
        warnings
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}
