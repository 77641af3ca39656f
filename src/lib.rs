//! # sysmon - host resource sampling and alerting
//!
//! Periodically samples memory, CPU, disk and network utilization, records
//! each cycle's readings as an indented JSON block in an append-only log,
//! and writes a warning line to an operator stream whenever an aggregate
//! reading exceeds its configured threshold.
//!
//! ## Features
//!
//! - **Per-domain samplers**: memory, CPU, disk and network, selected per run
//! - **Degraded snapshots**: a failing domain or partition is logged and left
//!   out; the cycle is still recorded
//! - **Threshold warnings**: strict `observed > threshold` on aggregate metrics
//! - **Library + Binary**: use the loop as a crate or run the `sysmon` binary
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sysmon::{
//!     shutdown_channel, AlertStream, MonitorConfig, MonitorLoop, SamplerRegistry,
//!     SnapshotRecorder, ThresholdEvaluator, Thresholds,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = MonitorConfig::new("sysmon.log").validate()?;
//!     let registry = SamplerRegistry::for_host(&config.capture, config.cpu_window);
//!     let evaluator = ThresholdEvaluator::new(Thresholds::from(&config), AlertStream::stderr());
//!     let recorder = SnapshotRecorder::open(&config.log_file)?;
//!
//!     let (trigger, signal) = shutdown_channel();
//!     tokio::spawn(async move {
//!         let _ = tokio::signal::ctrl_c().await;
//!         trigger.trigger();
//!     });
//!
//!     MonitorLoop::new(config, registry, evaluator, recorder).run(signal).await?;
//!     Ok(())
//! }
//! ```

pub mod alerts;
pub mod config;
pub mod error;
pub mod metrics;
pub mod monitor;
pub mod recorder;
pub mod units;

// Re-export public API
pub use alerts::{AlertStream, ThresholdEvaluator, Thresholds, Warning};
pub use config::MonitorConfig;
pub use error::{Result, SysmonError};
pub use metrics::{
    data::{Domain, DomainReading, Snapshot},
    samplers::{SampleOutcome, SamplerRegistry},
    traits::Sampler,
};
pub use monitor::{
    shutdown_channel, CycleReport, LoopState, LoopSummary, MonitorLoop, ShutdownSignal,
    ShutdownTrigger,
};
pub use recorder::SnapshotRecorder;

/// The default snapshot log file
pub const DEFAULT_LOG_FILE: &str = "sysmon.log";

/// The default time between cycle starts, in seconds
pub const DEFAULT_INTERVAL_SECS: u64 = 300;

/// The default memory, CPU and disk threshold, in percent
pub const DEFAULT_THRESHOLD: u8 = 80;

/// The default CPU observation window, in milliseconds
pub const DEFAULT_CPU_WINDOW_MS: u64 = 1000;
