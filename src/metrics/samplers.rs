//! Per-domain samplers and the registry the monitoring loop dispatches through.

use crate::error::SysmonError;
use crate::metrics::collector::{CpuCollector, DiskCollector, MemoryCollector, NetworkCollector};
use crate::metrics::data::*;
use crate::metrics::traits::{CpuSource, DiskSource, MemorySource, NetworkSource, Sampler};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

/// Result of one sampler call.
#[derive(Debug)]
pub enum SampleOutcome {
    /// Every part of the domain was read
    Complete(DomainReading),
    /// The domain was read but some sub-readings were skipped
    Partial {
        reading: DomainReading,
        omissions: Vec<SysmonError>,
    },
    /// Nothing usable could be read for the domain
    Failed(SysmonError),
}

impl SampleOutcome {
    /// `Complete` when nothing was omitted, `Partial` otherwise.
    pub fn with_omissions(reading: DomainReading, omissions: Vec<SysmonError>) -> Self {
        if omissions.is_empty() {
            Self::Complete(reading)
        } else {
            Self::Partial { reading, omissions }
        }
    }

    pub fn reading(&self) -> Option<&DomainReading> {
        match self {
            Self::Complete(reading) | Self::Partial { reading, .. } => Some(reading),
            Self::Failed(_) => None,
        }
    }

    /// Split into the usable reading (if any) and every error encountered.
    pub fn into_parts(self) -> (Option<DomainReading>, Vec<SysmonError>) {
        match self {
            Self::Complete(reading) => (Some(reading), Vec::new()),
            Self::Partial { reading, omissions } => (Some(reading), omissions),
            Self::Failed(err) => (None, vec![err]),
        }
    }
}

/// Tag a source error with the domain it failed for.
fn unavailable(domain: Domain, err: SysmonError) -> SysmonError {
    match err {
        err @ SysmonError::SamplerUnavailable { .. } => err,
        other => SysmonError::sampler_unavailable(domain, other.to_string()),
    }
}

/// Virtual and swap memory sampler.
pub struct MemorySampler<S> {
    source: S,
}

impl<S: MemorySource> MemorySampler<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }
}

#[async_trait]
impl<S: MemorySource> Sampler for MemorySampler<S> {
    fn domain(&self) -> Domain {
        Domain::Memory
    }

    async fn sample(&mut self) -> SampleOutcome {
        match self.source.memory() {
            Ok((virtual_memory, swap_memory)) => SampleOutcome::Complete(DomainReading::Memory(
                MemoryReading {
                    virtual_memory,
                    swap_memory,
                },
            )),
            Err(err) => SampleOutcome::Failed(unavailable(Domain::Memory, err)),
        }
    }
}

/// CPU sampler measuring overall and per-core utilization over one shared
/// observation window.
pub struct CpuSampler<S> {
    source: S,
    window: Duration,
}

impl<S: CpuSource> CpuSampler<S> {
    pub fn new(source: S, window: Duration) -> Self {
        Self { source, window }
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

#[async_trait]
impl<S: CpuSource> Sampler for CpuSampler<S> {
    fn domain(&self) -> Domain {
        Domain::Cpu
    }

    async fn sample(&mut self) -> SampleOutcome {
        if let Err(err) = self.source.begin_window() {
            return SampleOutcome::Failed(unavailable(Domain::Cpu, err));
        }
        tokio::time::sleep(self.window).await;
        match self.source.end_window() {
            Ok(reading) => SampleOutcome::Complete(DomainReading::Cpu(reading)),
            Err(err) => SampleOutcome::Failed(unavailable(Domain::Cpu, err)),
        }
    }
}

/// Disk sampler: root filesystem usage, IO counters and per-partition usage.
///
/// Only a root usage failure fails the domain; IO counter and partition
/// failures are recorded as omissions.
pub struct DiskSampler<S> {
    source: S,
}

impl<S: DiskSource> DiskSampler<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }
}

#[async_trait]
impl<S: DiskSource> Sampler for DiskSampler<S> {
    fn domain(&self) -> Domain {
        Domain::Disk
    }

    async fn sample(&mut self) -> SampleOutcome {
        let mut omissions = Vec::new();

        let partitions = match self.source.partitions() {
            Ok(partitions) => partitions,
            Err(err) => {
                omissions.push(err);
                Vec::new()
            }
        };

        let overall_disk_usage = match self.source.usage("/") {
            Ok(usage) => usage,
            Err(err) => return SampleOutcome::Failed(unavailable(Domain::Disk, err)),
        };

        let disk_io_counters = match self.source.io_counters() {
            Ok(counters) => Some(counters),
            Err(err) => {
                omissions.push(err);
                None
            }
        };

        let mut per_partition_usage = BTreeMap::new();
        for partition in partitions {
            // The same device may be mounted more than once; keep the first.
            if per_partition_usage.contains_key(&partition.device) {
                continue;
            }
            match self.source.usage(&partition.mount_point) {
                Ok(usage) => {
                    per_partition_usage.insert(
                        partition.device,
                        PartitionUsage {
                            usage,
                            fstype: partition.fstype,
                            mountpoint: partition.mount_point,
                        },
                    );
                }
                Err(err @ SysmonError::PartitionUnavailable { .. }) => omissions.push(err),
                Err(err) => omissions.push(SysmonError::partition_unavailable(
                    partition.device,
                    partition.mount_point,
                    err.to_string(),
                )),
            }
        }

        SampleOutcome::with_omissions(
            DomainReading::Disk(DiskReading {
                overall_disk_usage,
                disk_io_counters,
                per_partition_usage,
            }),
            omissions,
        )
    }
}

/// Network sampler: per-interface counters and their sum.
pub struct NetworkSampler<S> {
    source: S,
}

impl<S: NetworkSource> NetworkSampler<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }
}

#[async_trait]
impl<S: NetworkSource> Sampler for NetworkSampler<S> {
    fn domain(&self) -> Domain {
        Domain::Network
    }

    async fn sample(&mut self) -> SampleOutcome {
        match self.source.interfaces() {
            Ok(nics) => SampleOutcome::Complete(DomainReading::Network(
                NetworkReading::from_interfaces(nics),
            )),
            Err(err) => SampleOutcome::Failed(unavailable(Domain::Network, err)),
        }
    }
}

/// Lookup table from domain to its sampler.
#[derive(Default)]
pub struct SamplerRegistry {
    samplers: BTreeMap<Domain, Box<dyn Sampler>>,
}

impl SamplerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build host-backed samplers for the given domains.
    pub fn for_host(domains: &BTreeSet<Domain>, cpu_window: Duration) -> Self {
        let mut registry = Self::new();
        for domain in domains {
            match domain {
                Domain::Memory => registry.register(MemorySampler::new(MemoryCollector::new())),
                Domain::Cpu => {
                    registry.register(CpuSampler::new(CpuCollector::new(), cpu_window))
                }
                Domain::Disk => registry.register(DiskSampler::new(DiskCollector::new())),
                Domain::Network => registry.register(NetworkSampler::new(NetworkCollector::new())),
            }
        }
        registry
    }

    /// Register a sampler under its domain, replacing any previous one.
    pub fn register(&mut self, sampler: impl Sampler + 'static) {
        self.samplers.insert(sampler.domain(), Box::new(sampler));
    }

    pub fn get_mut(&mut self, domain: Domain) -> Option<&mut (dyn Sampler + 'static)> {
        self.samplers.get_mut(&domain).map(|sampler| sampler.as_mut())
    }

    pub fn domains(&self) -> BTreeSet<Domain> {
        self.samplers.keys().copied().collect()
    }
}
