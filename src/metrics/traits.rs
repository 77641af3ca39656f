//! Traits for OS counter sources and domain samplers.

use crate::error::Result;
use crate::metrics::data::{
    CpuReading, DiskIoCounters, DiskUsage, Domain, NetIoCounters, SwapMemory, VirtualMemory,
};
use crate::metrics::samplers::SampleOutcome;
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Source of memory counters.
pub trait MemorySource: Send {
    /// Read virtual and swap memory together; either both succeed or the
    /// whole reading fails.
    fn memory(&mut self) -> Result<(VirtualMemory, SwapMemory)>;
}

/// Source of CPU utilization.
///
/// Utilization is measured between `begin_window` and `end_window`; the
/// sampler is responsible for waiting out the observation window.
pub trait CpuSource: Send {
    /// Mark the start of an observation window.
    fn begin_window(&mut self) -> Result<()>;

    /// Close the window and read overall and per-core utilization.
    fn end_window(&mut self) -> Result<CpuReading>;
}

/// A mounted partition as enumerated by the OS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    /// Device path, e.g. `/dev/sda1`
    pub device: String,
    pub mount_point: String,
    pub fstype: String,
}

/// Source of disk counters.
pub trait DiskSource: Send {
    /// Real (non-virtual) partitions currently mounted.
    ///
    /// Called first in every disk sample; sources may rescan here.
    fn partitions(&mut self) -> Result<Vec<Partition>>;

    /// Usage of the filesystem mounted at `mount_point`.
    fn usage(&mut self, mount_point: &str) -> Result<DiskUsage>;

    /// Aggregate IO counters over all block devices.
    fn io_counters(&mut self) -> Result<DiskIoCounters>;
}

/// Source of network interface counters.
pub trait NetworkSource: Send {
    /// IO counters keyed by interface name.
    fn interfaces(&mut self) -> Result<BTreeMap<String, NetIoCounters>>;
}

/// A sampler for one monitored domain.
#[async_trait]
pub trait Sampler: Send {
    /// The domain this sampler reads.
    fn domain(&self) -> Domain;

    /// Take one reading.
    async fn sample(&mut self) -> SampleOutcome;
}
