//! Host counter sources backed by sysinfo and direct /proc access.

use crate::error::{Result, SysmonError};
use crate::metrics::data::*;
use crate::metrics::traits::{CpuSource, DiskSource, MemorySource, NetworkSource, Partition};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use sysinfo::{CpuRefreshKind, Disks, MemoryRefreshKind, Networks, RefreshKind, System};

/// Filesystem types that never back a real partition.
const VIRTUAL_FILESYSTEMS: &[&str] = &[
    "autofs",
    "binfmt_misc",
    "bpf",
    "cgroup",
    "cgroup2",
    "configfs",
    "debugfs",
    "devpts",
    "devtmpfs",
    "efivarfs",
    "fusectl",
    "hugetlbfs",
    "mqueue",
    "nsfs",
    "overlay",
    "proc",
    "pstore",
    "ramfs",
    "securityfs",
    "squashfs",
    "sysfs",
    "tmpfs",
    "tracefs",
];

/// Linux reports diskstats sectors in 512-byte units regardless of device.
const DISKSTATS_SECTOR_SIZE: u64 = 512;

/// Memory counters from sysinfo.
pub struct MemoryCollector {
    system: System,
}

impl MemoryCollector {
    pub fn new() -> Self {
        let system = System::new_with_specifics(
            RefreshKind::new().with_memory(MemoryRefreshKind::everything()),
        );
        Self { system }
    }
}

impl Default for MemoryCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySource for MemoryCollector {
    fn memory(&mut self) -> Result<(VirtualMemory, SwapMemory)> {
        self.system.refresh_memory();

        let total = self.system.total_memory();
        if total == 0 {
            return Err(SysmonError::sampler_unavailable(
                Domain::Memory,
                "No memory information available",
            ));
        }

        let virtual_memory = VirtualMemory::new(
            total,
            self.system.available_memory(),
            self.system.used_memory(),
            self.system.free_memory(),
        );
        let swap_memory = SwapMemory::new(
            self.system.total_swap(),
            self.system.used_swap(),
            self.system.free_swap(),
        );
        Ok((virtual_memory, swap_memory))
    }
}

/// CPU utilization from sysinfo.
///
/// sysinfo computes usage from the difference between two refreshes, so the
/// window is the time between `begin_window` and `end_window`.
pub struct CpuCollector {
    system: System,
}

impl CpuCollector {
    pub fn new() -> Self {
        let system = System::new_with_specifics(
            RefreshKind::new().with_cpu(CpuRefreshKind::new().with_cpu_usage()),
        );
        Self { system }
    }
}

impl Default for CpuCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuSource for CpuCollector {
    fn begin_window(&mut self) -> Result<()> {
        self.system.refresh_cpu_usage();
        if self.system.cpus().is_empty() {
            return Err(SysmonError::sampler_unavailable(
                Domain::Cpu,
                "No CPU information available",
            ));
        }
        Ok(())
    }

    fn end_window(&mut self) -> Result<CpuReading> {
        self.system.refresh_cpu_usage();

        let cpus = self.system.cpus();
        if cpus.is_empty() {
            return Err(SysmonError::sampler_unavailable(
                Domain::Cpu,
                "No CPU information available",
            ));
        }

        Ok(CpuReading {
            overall_cpu_usage: f64::from(self.system.global_cpu_usage()),
            cpu_count: cpus.len(),
            per_cpu_usage: cpus.iter().map(|cpu| f64::from(cpu.cpu_usage())).collect(),
        })
    }
}

/// Partition usage from sysinfo, IO counters from /proc/diskstats.
pub struct DiskCollector {
    disks: Disks,
}

impl DiskCollector {
    pub fn new() -> Self {
        Self {
            disks: Disks::new_with_refreshed_list(),
        }
    }
}

impl Default for DiskCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Usage of one mounted filesystem from its raw space counters.
///
/// Empty removable and optical drives stay mounted but report no capacity;
/// those are unavailable rather than 0% used.
pub fn partition_usage(
    device: &str,
    mount_point: &str,
    total: u64,
    available: u64,
) -> Result<DiskUsage> {
    if total == 0 {
        return Err(SysmonError::partition_unavailable(
            device,
            mount_point,
            "device reports no capacity (no medium?)",
        ));
    }
    Ok(DiskUsage::from_space(total, available))
}

/// Whether a filesystem type backs a real partition.
pub fn is_real_filesystem(fstype: &str) -> bool {
    !fstype.is_empty() && !VIRTUAL_FILESYSTEMS.contains(&fstype)
}

impl DiskSource for DiskCollector {
    fn partitions(&mut self) -> Result<Vec<Partition>> {
        // Rescan mounts so media inserted or removed since the last cycle
        // is picked up.
        self.disks.refresh_list();

        Ok(self
            .disks
            .list()
            .iter()
            .map(|disk| Partition {
                device: disk.name().to_string_lossy().to_string(),
                mount_point: disk.mount_point().to_string_lossy().to_string(),
                fstype: disk.file_system().to_string_lossy().to_string(),
            })
            .filter(|partition| is_real_filesystem(&partition.fstype))
            .collect())
    }

    fn usage(&mut self, mount_point: &str) -> Result<DiskUsage> {
        let disk = self
            .disks
            .list()
            .iter()
            .find(|disk| disk.mount_point() == Path::new(mount_point));

        let Some(disk) = disk else {
            return Err(SysmonError::partition_unavailable(
                "unknown",
                mount_point,
                "no filesystem mounted here",
            ));
        };

        partition_usage(
            &disk.name().to_string_lossy(),
            mount_point,
            disk.total_space(),
            disk.available_space(),
        )
    }

    fn io_counters(&mut self) -> Result<DiskIoCounters> {
        let diskstats = fs::read_to_string("/proc/diskstats").map_err(|e| {
            SysmonError::sampler_unavailable(
                Domain::Disk,
                format!("cannot read /proc/diskstats: {}", e),
            )
        })?;
        Ok(parse_diskstats(&diskstats, is_whole_block_device))
    }
}

/// Whether `name` is a whole block device (not a partition) per sysfs.
fn is_whole_block_device(name: &str) -> bool {
    !is_memory_backed_device(name) && Path::new("/sys/block").join(name.replace('/', "!")).exists()
}

/// Loop and RAM disks. Loop IO is already counted on the device holding
/// the backing file.
pub fn is_memory_backed_device(name: &str) -> bool {
    name.starts_with("loop") || name.starts_with("ram")
}

/// Sum /proc/diskstats counters over the devices accepted by `include`.
///
/// Lines look like `   8       0 sda 12345 678 901234 5678 ...`; malformed
/// lines are skipped.
pub fn parse_diskstats(content: &str, include: impl Fn(&str) -> bool) -> DiskIoCounters {
    let mut total = DiskIoCounters::default();

    for line in content.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 11 || !include(fields[2]) {
            continue;
        }

        let parsed: Option<Vec<u64>> = fields[3..11].iter().map(|f| f.parse().ok()).collect();
        let Some(values) = parsed else {
            continue;
        };

        total += &DiskIoCounters {
            read_count: values[0],
            read_bytes: values[2] * DISKSTATS_SECTOR_SIZE,
            read_time: values[3],
            write_count: values[4],
            write_bytes: values[6] * DISKSTATS_SECTOR_SIZE,
            write_time: values[7],
        };
    }

    total
}

/// Interface counters from sysinfo.
pub struct NetworkCollector {
    networks: Networks,
}

impl NetworkCollector {
    pub fn new() -> Self {
        Self {
            networks: Networks::new_with_refreshed_list(),
        }
    }
}

impl Default for NetworkCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkSource for NetworkCollector {
    fn interfaces(&mut self) -> Result<BTreeMap<String, NetIoCounters>> {
        self.networks.refresh_list();

        Ok(self
            .networks
            .list()
            .iter()
            .map(|(name, data)| {
                (
                    name.clone(),
                    NetIoCounters {
                        bytes_sent: data.total_transmitted(),
                        bytes_recv: data.total_received(),
                        packets_sent: data.total_packets_transmitted(),
                        packets_recv: data.total_packets_received(),
                        errin: data.total_errors_on_received(),
                        errout: data.total_errors_on_transmitted(),
                    },
                )
            })
            .collect())
    }
}
