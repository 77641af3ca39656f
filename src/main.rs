//! sysmon - host resource monitor binary
//!
//! Samples the selected resource domains every `--log_interval` seconds,
//! appends each snapshot to `--log_file`, and prints threshold warnings on
//! standard error until interrupted with Ctrl-C.

use anyhow::Context;
use clap::Parser;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;
use sysmon::config::{
    parse_capture, parse_cpu_window, parse_log_file, parse_log_interval, parse_threshold,
};
use sysmon::{
    shutdown_channel, AlertStream, Domain, MonitorConfig, MonitorLoop, SamplerRegistry,
    SnapshotRecorder, SysmonError, ThresholdEvaluator, Thresholds,
};
use tracing::{error, info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "sysmon")]
#[command(about = "system monitor utility that accumulates resource utilization")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(
    long_about = "Samples memory, CPU, disk and network utilization on a fixed interval, \
                  appends each snapshot to a log file and prints threshold warnings on stderr"
)]
struct Cli {
    /// Log file path
    #[arg(
        long = "log_file",
        default_value = sysmon::DEFAULT_LOG_FILE,
        value_parser = parse_log_file
    )]
    log_file: PathBuf,

    /// Time interval in seconds between each log entry [allowed range: 5-3600]
    #[arg(long = "log_interval", default_value = "300", value_parser = parse_log_interval)]
    log_interval: Duration,

    /// Comma separated list of sys params to monitor [memory, cpu, disk, network, all]
    #[arg(long, default_value = "all", value_parser = parse_capture)]
    capture: BTreeSet<Domain>,

    /// Memory threshold percent above which a warning is generated [allowed range: 1-99]
    #[arg(long = "memory_threshold", default_value = "80", value_parser = memory_threshold)]
    memory_threshold: u8,

    /// CPU threshold percent above which a warning is generated [allowed range: 1-99]
    #[arg(long = "cpu_threshold", default_value = "80", value_parser = cpu_threshold)]
    cpu_threshold: u8,

    /// Disk threshold percent above which a warning is generated [allowed range: 1-99]
    #[arg(long = "disk_threshold", default_value = "80", value_parser = disk_threshold)]
    disk_threshold: u8,

    /// CPU utilization observation window in milliseconds
    #[arg(long = "cpu_window_ms", default_value = "1000", value_parser = parse_cpu_window)]
    cpu_window: Duration,

    /// Take a single snapshot, record it and exit
    #[arg(long)]
    once: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn memory_threshold(value: &str) -> Result<u8, SysmonError> {
    parse_threshold("memory_threshold", value)
}

fn cpu_threshold(value: &str) -> Result<u8, SysmonError> {
    parse_threshold("cpu_threshold", value)
}

fn disk_threshold(value: &str) -> Result<u8, SysmonError> {
    parse_threshold("disk_threshold", value)
}

impl Cli {
    fn config(&self) -> MonitorConfig {
        MonitorConfig::new(self.log_file.clone())
            .with_interval(self.log_interval)
            .with_capture(self.capture.iter().copied())
            .with_memory_threshold(self.memory_threshold)
            .with_cpu_threshold(self.cpu_threshold)
            .with_disk_threshold(self.disk_threshold)
            .with_cpu_window(self.cpu_window)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing/logging
    init_logging(&cli)?;

    let config = cli.config().validate().context("invalid configuration")?;

    let recorder = SnapshotRecorder::open(&config.log_file).with_context(|| {
        format!("failed to open log file '{}'", config.log_file.display())
    })?;
    println!(
        "file logger initialized. keep monitoring log file '{}' for resource utilization",
        config.log_file.display()
    );

    let evaluator = ThresholdEvaluator::new(Thresholds::from(&config), AlertStream::stderr());
    println!("stream logger initialized. all warnings will be displayed on stderr");

    let registry = SamplerRegistry::for_host(&config.capture, config.cpu_window);
    let monitor = MonitorLoop::new(config, registry, evaluator, recorder);

    if cli.once {
        let report = monitor.run_once().await.context("failed to record snapshot")?;
        info!(
            domains = ?report.domains,
            warnings = report.warnings.len(),
            "Single snapshot recorded"
        );
        return Ok(());
    }

    let (trigger, signal) = shutdown_channel();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                println!("User pressed Ctrl-C. Flushing remaining logs and exiting!");
                trigger.trigger();
            }
            Err(e) => error!("Unable to listen for Ctrl-C: {}", e),
        }
    });

    let summary = monitor.run(signal).await.context("monitoring stopped")?;
    info!(
        "Recorded {} snapshots, {} warnings",
        summary.cycles, summary.warnings
    );

    Ok(())
}

fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    let level = if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::INFO
    } else {
        Level::WARN
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string().to_lowercase()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from([
            "sysmon",
            "--capture",
            "memory,cpu",
            "--log_interval",
            "10",
            "--memory_threshold",
            "1",
        ])
        .unwrap();
        assert_eq!(cli.capture, BTreeSet::from([Domain::Memory, Domain::Cpu]));
        assert_eq!(cli.log_interval, Duration::from_secs(10));
        assert_eq!(cli.memory_threshold, 1);

        let config = cli.config().validate().unwrap();
        assert_eq!(config.memory_threshold, 1);
        assert_eq!(config.capture.len(), 2);
    }

    #[test]
    fn test_default_values() {
        let cli = Cli::try_parse_from(["sysmon"]).unwrap();
        assert_eq!(cli.log_file, PathBuf::from(sysmon::DEFAULT_LOG_FILE));
        assert_eq!(cli.log_interval, Duration::from_secs(300));
        assert_eq!(cli.capture.len(), 4);
        assert_eq!(cli.cpu_threshold, 80);
        assert_eq!(cli.cpu_window, Duration::from_millis(1000));
        assert!(!cli.once);
    }

    #[test]
    fn test_invalid_values_name_the_field() {
        let cases = [
            ("--log_interval", "4", "log_interval"),
            ("--capture", "memory,gpu", "capture"),
            ("--memory_threshold", "100", "memory_threshold"),
            ("--cpu_threshold", "abc", "cpu_threshold"),
            ("--disk_threshold", "0", "disk_threshold"),
        ];
        for (flag, value, field) in cases {
            let err = match Cli::try_parse_from(["sysmon", flag, value]) {
                Ok(_) => panic!("{} {} should be rejected", flag, value),
                Err(err) => err,
            };
            assert!(
                err.to_string().contains(field),
                "error for {} should name {}: {}",
                flag,
                field,
                err
            );
        }
    }
}
