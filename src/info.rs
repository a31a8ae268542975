use std::path::Path;

use anyhow::Result;
use sysinfo::{CpuRefreshKind, Disks, MemoryRefreshKind, RefreshKind, System};

use crate::command::Runner;
use crate::gpu::{GpuDescription, Resolver};
use crate::{HostInfo, Platform};

const MIB: u64 = 1024 * 1024;
const GIB: u64 = 1024 * 1024 * 1024;

/// A snapshot of this machine, taken once per page view or run.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SystemInfo {
    pub host: HostInfo,
    pub num_cpu: usize,
    pub version: &'static str,
    pub collected_at: String,
    pub memory: MemoryInfo,
    pub cpu: CpuInfo,
    pub disk: DiskInfo,
    pub gpu: GpuDescription,
}

/// Memory figures in MiB.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct MemoryInfo {
    pub total: u64,
    pub free: u64,
    pub used: u64,
    pub used_percent: f64,
}

impl MemoryInfo {
    pub fn from_bytes(total: u64, free: u64, used: u64) -> Self {
        Self {
            total: total / MIB,
            free: free / MIB,
            used: used / MIB,
            used_percent: percent(used, total),
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct CpuInfo {
    pub model_name: String,
    pub cores: usize,
    pub usage: f32,
}

/// Disk figures in GiB.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize)]
pub struct DiskInfo {
    pub total: u64,
    pub free: u64,
    pub used: u64,
    pub used_percent: f64,
}

impl DiskInfo {
    pub fn from_bytes(total: u64, available: u64) -> Self {
        let used = total.saturating_sub(available);
        Self {
            total: total / GIB,
            free: available / GIB,
            used: used / GIB,
            used_percent: percent(used, total),
        }
    }

    /// Usage of the disk mounted at `/`, or of the first disk if nothing is mounted there.
    fn root(disks: &Disks) -> Self {
        let list = disks.list();
        let Some(disk) =
            list.iter().find(|disk| disk.mount_point() == Path::new("/")).or(list.first())
        else {
            tracing::warn!("no disks listed");
            return Self::default();
        };
        Self::from_bytes(disk.total_space(), disk.available_space())
    }
}

fn percent(part: u64, whole: u64) -> f64 {
    match whole {
        0 => 0.0,
        whole => part as f64 / whole as f64 * 100.0,
    }
}

impl SystemInfo {
    /// Reads the current state of this machine.
    ///
    /// Blocks for at least [`sysinfo::MINIMUM_CPU_UPDATE_INTERVAL`] to get a meaningful CPU usage
    /// reading, and for as long as the GPU diagnostic command takes.
    pub fn collect<R: Runner>(resolver: &Resolver<R>) -> Result<Self> {
        let host = HostInfo::new()?;

        let mut system = System::new_with_specifics(
            RefreshKind::nothing()
                .with_cpu(CpuRefreshKind::everything())
                .with_memory(MemoryRefreshKind::everything()),
        );
        std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
        system.refresh_cpu_usage();

        let memory =
            MemoryInfo::from_bytes(system.total_memory(), system.free_memory(), system.used_memory());
        let cpus = system.cpus();
        let model_name = cpus.first().map(|cpu| cpu.brand().trim()).unwrap_or("?");
        let cpu = CpuInfo {
            model_name: model_name.to_string(),
            cores: System::physical_core_count().unwrap_or(cpus.len()),
            usage: system.global_cpu_usage(),
        };
        let disk = DiskInfo::root(&Disks::new_with_refreshed_list());
        let gpu = resolver.resolve(Platform::current());

        Ok(Self {
            host,
            num_cpu: cpus.len(),
            version: env!("CARGO_PKG_VERSION"),
            collected_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            memory,
            cpu,
            disk,
            gpu,
        })
    }
}
