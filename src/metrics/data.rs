//! Data structures for snapshots and per-domain readings.

use crate::units::{human_bytes, human_percent, Reading};
use chrono::{DateTime, Local};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::ops::AddAssign;

/// Wall-clock format of the snapshot `timestamp` key.
pub const TIMESTAMP_FORMAT: &str = "%d/%m/%Y, %H:%M:%S";

/// One monitored resource category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Domain {
    Memory,
    Cpu,
    Disk,
    Network,
}

impl Domain {
    /// All domains, in record order.
    pub const ALL: [Domain; 4] = [Domain::Memory, Domain::Cpu, Domain::Disk, Domain::Network];

    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Memory => "memory",
            Domain::Cpu => "cpu",
            Domain::Disk => "disk",
            Domain::Network => "network",
        }
    }

    /// Look a domain up by its record key.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.as_str() == name)
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Percentage of `part` in `whole`, 0 when `whole` is 0.
pub fn percent_of(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// Virtual memory (RAM) counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VirtualMemory {
    #[serde(serialize_with = "human_bytes")]
    pub total: u64,
    #[serde(serialize_with = "human_bytes")]
    pub available: u64,
    #[serde(serialize_with = "human_percent")]
    pub percent: f64,
    #[serde(serialize_with = "human_bytes")]
    pub used: u64,
    #[serde(serialize_with = "human_bytes")]
    pub free: u64,
}

impl VirtualMemory {
    /// Build from raw counters; percent is the share of memory not available.
    pub fn new(total: u64, available: u64, used: u64, free: u64) -> Self {
        Self {
            total,
            available,
            percent: percent_of(total.saturating_sub(available), total),
            used,
            free,
        }
    }
}

/// Swap memory counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SwapMemory {
    #[serde(serialize_with = "human_bytes")]
    pub total: u64,
    #[serde(serialize_with = "human_bytes")]
    pub used: u64,
    #[serde(serialize_with = "human_bytes")]
    pub free: u64,
    #[serde(serialize_with = "human_percent")]
    pub percent: f64,
}

impl SwapMemory {
    pub fn new(total: u64, used: u64, free: u64) -> Self {
        Self {
            total,
            used,
            free,
            percent: percent_of(used, total),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemoryReading {
    pub virtual_memory: VirtualMemory,
    pub swap_memory: SwapMemory,
}

/// CPU utilization over one observation window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CpuReading {
    #[serde(serialize_with = "human_percent")]
    pub overall_cpu_usage: f64,
    /// Logical core count
    pub cpu_count: usize,
    #[serde(serialize_with = "per_cpu_map")]
    pub per_cpu_usage: Vec<f64>,
}

fn per_cpu_map<S: Serializer>(usage: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(usage.len()))?;
    for (core, percent) in usage.iter().enumerate() {
        let percent = Reading::Percent(*percent).to_string();
        map.serialize_entry(&format!("CPU {}", core), &percent)?;
    }
    map.end()
}

/// Filesystem usage counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiskUsage {
    #[serde(serialize_with = "human_bytes")]
    pub total: u64,
    #[serde(serialize_with = "human_bytes")]
    pub used: u64,
    #[serde(serialize_with = "human_bytes")]
    pub free: u64,
    #[serde(serialize_with = "human_percent")]
    pub percent: f64,
}

impl DiskUsage {
    /// Build from total and available space.
    pub fn from_space(total: u64, available: u64) -> Self {
        let used = total.saturating_sub(available);
        Self {
            total,
            used,
            free: available,
            percent: percent_of(used, total),
        }
    }
}

/// Usage of one mounted partition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartitionUsage {
    #[serde(flatten)]
    pub usage: DiskUsage,
    pub fstype: String,
    pub mountpoint: String,
}

/// Aggregate block device IO counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiskIoCounters {
    pub read_count: u64,
    pub write_count: u64,
    pub read_bytes: u64,
    pub write_bytes: u64,
    /// Milliseconds spent reading
    pub read_time: u64,
    /// Milliseconds spent writing
    pub write_time: u64,
}

impl AddAssign<&DiskIoCounters> for DiskIoCounters {
    fn add_assign(&mut self, rhs: &DiskIoCounters) {
        self.read_count += rhs.read_count;
        self.write_count += rhs.write_count;
        self.read_bytes += rhs.read_bytes;
        self.write_bytes += rhs.write_bytes;
        self.read_time += rhs.read_time;
        self.write_time += rhs.write_time;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiskReading {
    /// Usage of the root filesystem
    pub overall_disk_usage: DiskUsage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk_io_counters: Option<DiskIoCounters>,
    /// Keyed by device path
    pub per_partition_usage: BTreeMap<String, PartitionUsage>,
}

/// Network interface IO counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NetIoCounters {
    pub bytes_sent: u64,
    pub bytes_recv: u64,
    pub packets_sent: u64,
    pub packets_recv: u64,
    pub errin: u64,
    pub errout: u64,
}

impl AddAssign<&NetIoCounters> for NetIoCounters {
    fn add_assign(&mut self, rhs: &NetIoCounters) {
        self.bytes_sent += rhs.bytes_sent;
        self.bytes_recv += rhs.bytes_recv;
        self.packets_sent += rhs.packets_sent;
        self.packets_recv += rhs.packets_recv;
        self.errin += rhs.errin;
        self.errout += rhs.errout;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkReading {
    pub overall_io_counters: NetIoCounters,
    /// Keyed by interface name
    pub per_nic_io_counters: BTreeMap<String, NetIoCounters>,
}

impl NetworkReading {
    /// Build from per-interface counters; the overall counters are their sum.
    pub fn from_interfaces(per_nic_io_counters: BTreeMap<String, NetIoCounters>) -> Self {
        let mut overall_io_counters = NetIoCounters::default();
        for counters in per_nic_io_counters.values() {
            overall_io_counters += counters;
        }
        Self {
            overall_io_counters,
            per_nic_io_counters,
        }
    }
}

/// A whole-system percentage reading that is checked against a threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregateMetric {
    pub domain: Domain,
    /// Record key of the metric, e.g. `swap_memory`
    pub name: &'static str,
    /// Operator-facing label, e.g. `SWAP Memory`
    pub label: &'static str,
    pub observed: f64,
}

/// One domain's reading for a cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainReading {
    Memory(MemoryReading),
    Cpu(CpuReading),
    Disk(DiskReading),
    Network(NetworkReading),
}

impl DomainReading {
    pub fn domain(&self) -> Domain {
        match self {
            DomainReading::Memory(_) => Domain::Memory,
            DomainReading::Cpu(_) => Domain::Cpu,
            DomainReading::Disk(_) => Domain::Disk,
            DomainReading::Network(_) => Domain::Network,
        }
    }

    /// The aggregate metrics subject to threshold checks.
    ///
    /// Per-core, per-partition and per-interface values are never included.
    pub fn aggregate_metrics(&self) -> Vec<AggregateMetric> {
        match self {
            DomainReading::Memory(m) => vec![
                AggregateMetric {
                    domain: Domain::Memory,
                    name: "virtual_memory",
                    label: "Virtual Memory (RAM)",
                    observed: m.virtual_memory.percent,
                },
                AggregateMetric {
                    domain: Domain::Memory,
                    name: "swap_memory",
                    label: "SWAP Memory",
                    observed: m.swap_memory.percent,
                },
            ],
            DomainReading::Cpu(c) => vec![AggregateMetric {
                domain: Domain::Cpu,
                name: "overall_cpu_usage",
                label: "CPU",
                observed: c.overall_cpu_usage,
            }],
            DomainReading::Disk(d) => vec![AggregateMetric {
                domain: Domain::Disk,
                name: "overall_disk_usage",
                label: "Disk",
                observed: d.overall_disk_usage.percent,
            }],
            DomainReading::Network(_) => Vec::new(),
        }
    }
}

/// The structured record of all domain readings taken within one cycle.
///
/// Serializes with `timestamp` first and one key per captured domain;
/// domains that were not sampled are absent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<MemoryReading>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu: Option<CpuReading>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk: Option<DiskReading>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<NetworkReading>,
}

impl Snapshot {
    /// Create an empty snapshot stamped with the current local time.
    pub fn new() -> Self {
        Self::at(Local::now())
    }

    /// Create an empty snapshot stamped with the given time.
    pub fn at(time: DateTime<Local>) -> Self {
        Self {
            timestamp: time.format(TIMESTAMP_FORMAT).to_string(),
            memory: None,
            cpu: None,
            disk: None,
            network: None,
        }
    }

    /// Store a domain reading, replacing any earlier reading of that domain.
    pub fn insert(&mut self, reading: DomainReading) {
        match reading {
            DomainReading::Memory(r) => self.memory = Some(r),
            DomainReading::Cpu(r) => self.cpu = Some(r),
            DomainReading::Disk(r) => self.disk = Some(r),
            DomainReading::Network(r) => self.network = Some(r),
        }
    }

    /// Domains present in this snapshot.
    pub fn domains(&self) -> BTreeSet<Domain> {
        let present = [
            (Domain::Memory, self.memory.is_some()),
            (Domain::Cpu, self.cpu.is_some()),
            (Domain::Disk, self.disk.is_some()),
            (Domain::Network, self.network.is_some()),
        ];
        present
            .into_iter()
            .filter_map(|(domain, is_some)| is_some.then_some(domain))
            .collect()
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::new()
    }
}
