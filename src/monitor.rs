//! The sampling-and-alerting loop.
//!
//! One cycle samples every captured domain in order, checks thresholds,
//! and records exactly one snapshot. Cycles start `interval` apart measured
//! from cycle start; a cycle that overruns the interval is followed
//! immediately by the next one. A shutdown request is only observed between
//! cycles, so the cycle in progress always completes and is recorded.

use crate::alerts::{ThresholdEvaluator, Warning};
use crate::config::MonitorConfig;
use crate::error::Result;
use crate::metrics::data::{Domain, Snapshot};
use crate::metrics::samplers::SamplerRegistry;
use crate::recorder::SnapshotRecorder;
use std::collections::BTreeSet;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Lifecycle of the monitoring loop: `Running`, then `ShuttingDown`, then
/// `Terminated`. No other transitions exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    ShuttingDown,
    Terminated,
}

/// Create a connected shutdown trigger and signal.
pub fn shutdown_channel() -> (ShutdownTrigger, ShutdownSignal) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx }, ShutdownSignal { rx })
}

/// Requests a controlled shutdown.
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

impl ShutdownTrigger {
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }
}

/// Observes shutdown requests. Once triggered it stays triggered.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once shutdown is requested.
    ///
    /// If the trigger is dropped without firing, this never resolves.
    pub async fn triggered(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// What one cycle produced.
#[derive(Debug, Clone)]
pub struct CycleReport {
    /// Domains present in the recorded snapshot
    pub domains: BTreeSet<Domain>,
    pub warnings: Vec<Warning>,
    /// Sampler and partition failures logged during the cycle
    pub errors: usize,
    pub elapsed: Duration,
}

/// Totals over a loop's lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopSummary {
    pub cycles: u64,
    pub warnings: u64,
    /// Every state the loop passed through, in order
    pub states: Vec<LoopState>,
}

/// The monitoring loop with its injected samplers, evaluator and recorder.
pub struct MonitorLoop {
    config: MonitorConfig,
    registry: SamplerRegistry,
    evaluator: ThresholdEvaluator,
    recorder: SnapshotRecorder,
    states: Vec<LoopState>,
}

impl MonitorLoop {
    pub fn new(
        config: MonitorConfig,
        registry: SamplerRegistry,
        evaluator: ThresholdEvaluator,
        recorder: SnapshotRecorder,
    ) -> Self {
        Self {
            config,
            registry,
            evaluator,
            recorder,
            states: vec![LoopState::Running],
        }
    }

    pub fn state(&self) -> LoopState {
        self.states.last().copied().unwrap_or(LoopState::Running)
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Sample every captured domain once and record the snapshot.
    ///
    /// Sampler failures are logged and leave the domain out of the snapshot;
    /// only a recorder failure is returned.
    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        let started = Instant::now();
        let mut snapshot = Snapshot::new();
        let mut warnings = Vec::new();
        let mut errors = 0;

        for domain in self.config.capture.iter().copied() {
            let Some(sampler) = self.registry.get_mut(domain) else {
                error!(%domain, "No sampler registered, domain omitted from snapshot");
                errors += 1;
                continue;
            };

            let (reading, failures) = sampler.sample().await.into_parts();
            for failure in &failures {
                error!(%domain, error = %failure, "Sampling failed");
            }
            errors += failures.len();

            if let Some(reading) = reading {
                warnings.extend(self.evaluator.check(&reading));
                snapshot.insert(reading);
            }
        }

        self.recorder.record(&snapshot)?;

        let report = CycleReport {
            domains: snapshot.domains(),
            warnings,
            errors,
            elapsed: started.elapsed(),
        };
        debug!(
            domains = report.domains.len(),
            warnings = report.warnings.len(),
            errors = report.errors,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Cycle complete"
        );
        Ok(report)
    }

    /// Run one cycle, flush, and terminate.
    pub async fn run_once(mut self) -> Result<CycleReport> {
        let report = self.run_cycle().await;
        self.shut_down()?;
        report
    }

    /// Run cycles until `shutdown` fires or the recorder fails.
    pub async fn run(mut self, mut shutdown: ShutdownSignal) -> Result<LoopSummary> {
        let mut summary = LoopSummary::default();
        info!(
            interval_secs = self.config.interval.as_secs(),
            domains = ?self.config.capture,
            state = ?self.state(),
            "Monitoring loop running"
        );

        loop {
            let cycle_start = Instant::now();

            match self.run_cycle().await {
                Ok(report) => {
                    summary.cycles += 1;
                    summary.warnings += report.warnings.len() as u64;
                }
                Err(err) if err.is_fatal() => {
                    error!("Fatal recorder failure, terminating: {}", err);
                    if let Err(flush_err) = self.shut_down() {
                        warn!("Flush after recorder failure also failed: {}", flush_err);
                    }
                    return Err(err);
                }
                Err(err) => error!("Cycle failed, continuing: {}", err),
            }

            if shutdown.is_triggered() {
                break;
            }

            let next_cycle = cycle_start + self.config.interval;
            if next_cycle <= Instant::now() {
                warn!(
                    elapsed_ms = cycle_start.elapsed().as_millis() as u64,
                    "Cycle overran the interval, starting next cycle immediately"
                );
            }

            tokio::select! {
                _ = tokio::time::sleep_until(next_cycle) => {}
                _ = shutdown.triggered() => break,
            }
        }

        self.shut_down()?;
        info!(cycles = summary.cycles, warnings = summary.warnings, "Monitoring loop terminated");
        summary.states = self.states;
        Ok(summary)
    }

    fn transition(&mut self, next: LoopState) {
        info!(from = ?self.state(), to = ?next, "Loop state changed");
        self.states.push(next);
    }

    fn shut_down(&mut self) -> Result<()> {
        self.transition(LoopState::ShuttingDown);
        info!("Flushing logs");

        if let Err(e) = self.evaluator.flush() {
            warn!("Failed to flush operator stream: {}", e);
        }
        let flushed = self.recorder.flush();

        self.transition(LoopState::Terminated);
        flushed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::{AlertStream, Thresholds};

    fn idle_loop() -> MonitorLoop {
        let config = MonitorConfig::default().with_capture([Domain::Memory]);
        let evaluator = ThresholdEvaluator::new(
            Thresholds::from(&config),
            AlertStream::new(std::io::sink()),
        );
        MonitorLoop::new(
            config,
            SamplerRegistry::new(),
            evaluator,
            SnapshotRecorder::new(std::io::sink()),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_controlled_shutdown_walks_states() {
        let monitor = idle_loop();
        assert_eq!(monitor.state(), LoopState::Running);

        let (trigger, signal) = shutdown_channel();
        trigger.trigger();
        let summary = monitor.run(signal).await.unwrap();

        assert_eq!(summary.cycles, 1);
        assert_eq!(
            summary.states,
            vec![
                LoopState::Running,
                LoopState::ShuttingDown,
                LoopState::Terminated
            ]
        );
    }

    #[tokio::test]
    async fn test_shutdown_signal_latches() {
        let (trigger, mut signal) = shutdown_channel();
        assert!(!signal.is_triggered());

        trigger.trigger();
        assert!(signal.is_triggered());
        signal.triggered().await;
        signal.triggered().await;
        assert!(signal.clone().is_triggered());
    }

    #[test]
    fn test_triggered_wakes_waiter() {
        let (trigger, mut signal) = shutdown_channel();
        let mut waiter = tokio_test::task::spawn(signal.triggered());
        tokio_test::assert_pending!(waiter.poll());

        trigger.trigger();
        assert!(waiter.is_woken());
        tokio_test::assert_ready!(waiter.poll());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_trigger_never_fires() {
        let (trigger, mut signal) = shutdown_channel();
        drop(trigger);

        let fired = tokio::time::timeout(Duration::from_secs(60), signal.triggered()).await;
        assert!(fired.is_err());
        assert!(!signal.is_triggered());
    }
}
