use std::io::Write;

use vitals::HostInfo;
use vitals::info::{CpuInfo, DiskInfo, MemoryInfo, SystemInfo};

/// Writes `info` as a plain-text report, one section per subsystem.
pub fn write_report(out: &mut impl Write, info: &SystemInfo) -> std::io::Result<()> {
    let SystemInfo { host, num_cpu, version, collected_at, memory, cpu, disk, gpu } = info;
    let HostInfo { hostname, user, os, os_version, platform, architecture } = host;

    writeln!(out, "System Information")?;
    writeln!(out, "  Hostname:      {hostname}")?;
    writeln!(out, "  User:          {user}")?;
    writeln!(out, "  OS:            {platform} ({os} {os_version})")?;
    writeln!(out, "  Architecture:  {architecture}")?;
    writeln!(out, "  Logical CPUs:  {num_cpu}")?;
    writeln!(out, "  vitals:        {version}")?;
    writeln!(out, "  Collected at:  {collected_at}")?;

    let CpuInfo { model_name, cores, usage } = cpu;
    writeln!(out)?;
    writeln!(out, "CPU")?;
    writeln!(out, "  Model:         {model_name}")?;
    writeln!(out, "  Cores:         {cores}")?;
    writeln!(out, "  Usage:         {usage:.2}%")?;

    let MemoryInfo { total, free, used, used_percent } = memory;
    writeln!(out)?;
    writeln!(out, "Memory")?;
    writeln!(out, "  Total:         {total} MB")?;
    writeln!(out, "  Free:          {free} MB")?;
    writeln!(out, "  Used:          {used} MB ({used_percent:.2}%)")?;

    let DiskInfo { total, free, used, used_percent } = disk;
    writeln!(out)?;
    writeln!(out, "Disk")?;
    writeln!(out, "  Total:         {total} GB")?;
    writeln!(out, "  Free:          {free} GB")?;
    writeln!(out, "  Used:          {used} GB ({used_percent:.2}%)")?;

    writeln!(out)?;
    writeln!(out, "GPU")?;
    for line in gpu.iter() {
        writeln!(out, "  {line}")?;
    }

    Ok(())
}
