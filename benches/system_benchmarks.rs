use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::collections::BTreeMap;
use std::io::sink;
use sysmon::{
    metrics::collector::{parse_diskstats, MemoryCollector, NetworkCollector},
    metrics::data::*,
    metrics::samplers::{MemorySampler, NetworkSampler},
    units::format_bytes,
    AlertStream, MonitorConfig, Sampler, SnapshotRecorder, ThresholdEvaluator, Thresholds,
};

fn synthetic_snapshot(partitions: usize) -> Snapshot {
    let mut snapshot = Snapshot::new();
    snapshot.insert(DomainReading::Memory(MemoryReading {
        virtual_memory: VirtualMemory::new(8 << 30, 3 << 30, 5 << 30, 1 << 30),
        swap_memory: SwapMemory::new(2 << 30, 1 << 30, 1 << 30),
    }));
    snapshot.insert(DomainReading::Cpu(CpuReading {
        overall_cpu_usage: 37.5,
        cpu_count: 8,
        per_cpu_usage: vec![12.5, 50.0, 37.5, 25.0, 62.5, 12.5, 50.0, 50.0],
    }));
    let per_partition_usage = (0..partitions)
        .map(|i| {
            (
                format!("/dev/sd{}1", (b'a' + (i % 26) as u8) as char),
                PartitionUsage {
                    usage: DiskUsage::from_space(256 << 30, 100 << 30),
                    fstype: "ext4".to_string(),
                    mountpoint: format!("/mnt/data{}", i),
                },
            )
        })
        .collect();
    snapshot.insert(DomainReading::Disk(DiskReading {
        overall_disk_usage: DiskUsage::from_space(512 << 30, 128 << 30),
        disk_io_counters: Some(DiskIoCounters::default()),
        per_partition_usage,
    }));
    snapshot.insert(DomainReading::Network(NetworkReading::from_interfaces(
        BTreeMap::from([("eth0".to_string(), NetIoCounters::default())]),
    )));
    snapshot
}

/// Benchmark byte count rendering across unit boundaries
fn bench_format_bytes(c: &mut Criterion) {
    c.bench_function("format_bytes", |b| {
        b.iter(|| {
            for n in [512u64, 10_000, 1 << 30, 5 << 40, u64::MAX] {
                criterion::black_box(format_bytes(n));
            }
        })
    });
}

/// Benchmark record encoding with growing partition tables
fn bench_record_snapshot(c: &mut Criterion) {
    for partitions in [1usize, 8, 32].iter() {
        let snapshot = synthetic_snapshot(*partitions);
        c.bench_with_input(
            BenchmarkId::new("record_snapshot", partitions),
            &snapshot,
            |b, snapshot| {
                let mut recorder = SnapshotRecorder::new(sink());
                b.iter(|| recorder.record(snapshot).expect("Should record"))
            },
        );
    }
}

/// Benchmark threshold evaluation of one full snapshot's readings
fn bench_threshold_check(c: &mut Criterion) {
    let readings = [
        DomainReading::Memory(MemoryReading {
            virtual_memory: VirtualMemory::new(8 << 30, 1 << 30, 7 << 30, 0),
            swap_memory: SwapMemory::new(2 << 30, 2 << 30, 0),
        }),
        DomainReading::Cpu(CpuReading {
            overall_cpu_usage: 95.0,
            cpu_count: 1,
            per_cpu_usage: vec![95.0],
        }),
    ];
    let mut evaluator = ThresholdEvaluator::new(
        Thresholds::from(&MonitorConfig::default()),
        AlertStream::new(sink()),
    );

    c.bench_function("threshold_check", |b| {
        b.iter(|| {
            for reading in &readings {
                criterion::black_box(evaluator.check(reading));
            }
        })
    });
}

/// Benchmark /proc/diskstats parsing
fn bench_parse_diskstats(c: &mut Criterion) {
    let content = (0..16)
        .map(|i| {
            format!(
                "   8       {}  sd{} {}",
                i * 16,
                (b'a' + i as u8) as char,
                "23861 5621 1466546 9345 58391 44012 2637080 71120 0 41972 80465"
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    c.bench_function("parse_diskstats", |b| {
        b.iter(|| parse_diskstats(&content, |name| name.starts_with("sd")))
    });
}

/// Benchmark host sampling for the domains that need no observation window
fn bench_host_samplers(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("Should create tokio runtime");

    c.bench_function("memory_sample", |b| {
        b.to_async(&rt).iter(|| async {
            let mut sampler = MemorySampler::new(MemoryCollector::new());
            sampler.sample().await
        })
    });

    c.bench_function("network_sample", |b| {
        b.to_async(&rt).iter(|| async {
            let mut sampler = NetworkSampler::new(NetworkCollector::new());
            sampler.sample().await
        })
    });
}

criterion_group!(
    benches,
    bench_format_bytes,
    bench_record_snapshot,
    bench_threshold_check,
    bench_parse_diskstats,
    bench_host_samplers
);

criterion_main!(benches);
