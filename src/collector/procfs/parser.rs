//! Parsers for `/proc` filesystem files.
//!
//! These are pure functions over file contents. They never touch the
//! filesystem, so each one is tested with plain string inputs.

use crate::model::CpuInfo;
use std::collections::HashMap;

/// Error type for parsing failures.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Parse error: {}", self.message)
    }
}

impl std::error::Error for ParseError {}

/// Fields of `/proc/[pid]/stat` used for CPU accounting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcStat {
    pub comm: String,
    pub utime: u64,
    pub stime: u64,
    pub starttime: u64,
}

/// Parses `/proc/[pid]/stat` content.
///
/// The comm field can contain spaces and parentheses, so it is taken as
/// everything between the first '(' and the last ')'.
/// Format: pid (comm) state ppid pgrp session tty_nr ...
pub fn parse_proc_stat(content: &str) -> Result<ProcStat, ParseError> {
    let content = content.trim();

    let open_paren = content
        .find('(')
        .ok_or_else(|| ParseError::new("missing '(' in stat"))?;
    let close_paren = content
        .rfind(')')
        .ok_or_else(|| ParseError::new("missing ')' in stat"))?;

    if close_paren <= open_paren {
        return Err(ParseError::new("invalid parentheses in stat"));
    }

    let comm = content[open_paren + 1..close_paren].to_string();

    // Indices below are relative to the first field after ')', i.e. field 3.
    let fields: Vec<&str> = content[close_paren + 1..].split_whitespace().collect();
    if fields.len() < 20 {
        return Err(ParseError::new(format!(
            "not enough fields in stat: expected 20+, got {}",
            fields.len()
        )));
    }

    let parse_field = |idx: usize, name: &str| -> Result<u64, ParseError> {
        fields[idx]
            .parse()
            .map_err(|_| ParseError::new(format!("invalid {}", name)))
    };

    Ok(ProcStat {
        comm,
        utime: parse_field(11, "utime")?,
        stime: parse_field(12, "stime")?,
        starttime: parse_field(19, "starttime")?,
    })
}

/// Fields of `/proc/[pid]/status` used by the process table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcStatus {
    pub name: String,
    /// Resident set size in Kb. `None` for kernel threads, which have no
    /// `VmRSS` line.
    pub vm_rss: Option<u64>,
}

/// Parses `/proc/[pid]/status` content.
///
/// Format is key:\tvalue pairs, one per line.
pub fn parse_proc_status(content: &str) -> Result<ProcStatus, ParseError> {
    let fields: HashMap<&str, &str> = content
        .lines()
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim(), value.trim()))
        .collect();

    if fields.is_empty() {
        return Err(ParseError::new("empty status"));
    }

    // Memory fields are in kB format: "12345 kB"
    let vm_rss = match fields.get("VmRSS") {
        Some(value) => Some(
            value
                .split_whitespace()
                .next()
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| ParseError::new(format!("invalid VmRSS: {}", value)))?,
        ),
        None => None,
    };

    Ok(ProcStatus {
        name: fields.get("Name").unwrap_or(&"").to_string(),
        vm_rss,
    })
}

/// Storage byte counters from `/proc/[pid]/io`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcIo {
    pub read_bytes: u64,
    pub write_bytes: u64,
}

/// Parses `/proc/[pid]/io` content.
///
/// Both `read_bytes` and `write_bytes` must be present.
pub fn parse_proc_io(content: &str) -> Result<ProcIo, ParseError> {
    let mut read_bytes = None;
    let mut write_bytes = None;

    for line in content.lines() {
        if let Some((key, value)) = line.split_once(':') {
            let slot = match key.trim() {
                "read_bytes" => &mut read_bytes,
                "write_bytes" => &mut write_bytes,
                _ => continue,
            };
            *slot = Some(
                value
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| ParseError::new(format!("invalid {}", key.trim())))?,
            );
        }
    }

    match (read_bytes, write_bytes) {
        (Some(read_bytes), Some(write_bytes)) => Ok(ProcIo {
            read_bytes,
            write_bytes,
        }),
        _ => Err(ParseError::new("missing read_bytes/write_bytes in io")),
    }
}

/// Parsed data from `/proc/meminfo` (values in Kb).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemInfo {
    pub mem_total: u64,
    pub mem_free: u64,
    pub mem_available: u64,
}

/// Parses `/proc/meminfo` content.
///
/// `MemTotal` is required. Kernels older than 3.14 lack `MemAvailable`; it
/// then falls back to `MemFree`.
pub fn parse_meminfo(content: &str) -> Result<MemInfo, ParseError> {
    let parse_kb = |line: &str| -> Option<u64> { line.split_whitespace().nth(1)?.parse().ok() };

    let mut mem_total = None;
    let mut mem_free = 0;
    let mut mem_available = None;

    for line in content.lines() {
        if line.starts_with("MemTotal:") {
            mem_total = parse_kb(line);
        } else if line.starts_with("MemFree:") {
            mem_free = parse_kb(line).unwrap_or(0);
        } else if line.starts_with("MemAvailable:") {
            mem_available = parse_kb(line);
        }
    }

    let mem_total = mem_total.ok_or_else(|| ParseError::new("missing MemTotal in meminfo"))?;
    Ok(MemInfo {
        mem_total,
        mem_free,
        mem_available: mem_available.unwrap_or(mem_free),
    })
}

/// Tick counters of one `cpu` line of `/proc/stat`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CpuStat {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
}

impl CpuStat {
    /// Idle ticks including time spent waiting for I/O.
    pub fn idle_ticks(&self) -> u64 {
        self.idle + self.iowait
    }

    /// All accounted ticks. Guest time is already part of user/nice.
    pub fn total_ticks(&self) -> u64 {
        self.user + self.nice + self.system + self.idle_ticks() + self.irq + self.softirq + self.steal
    }
}

/// Parses the aggregate `cpu` line of `/proc/stat`.
///
/// At least user, nice, system and idle must be present; later columns
/// default to zero for old kernels.
pub fn parse_stat_cpu_line(content: &str) -> Result<CpuStat, ParseError> {
    let line = content
        .lines()
        .find(|line| line.split_whitespace().next() == Some("cpu"))
        .ok_or_else(|| ParseError::new("missing aggregate cpu line in stat"))?;

    let values: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .map(|s| s.parse())
        .collect::<Result<_, _>>()
        .map_err(|_| ParseError::new(format!("invalid cpu line: {}", line)))?;

    if values.len() < 4 {
        return Err(ParseError::new(format!(
            "not enough fields in cpu line: expected 4+, got {}",
            values.len()
        )));
    }

    let get_val = |idx: usize| -> u64 { values.get(idx).copied().unwrap_or(0) };
    Ok(CpuStat {
        user: get_val(0),
        nice: get_val(1),
        system: get_val(2),
        idle: get_val(3),
        iowait: get_val(4),
        irq: get_val(5),
        softirq: get_val(6),
        steal: get_val(7),
    })
}

/// Sector counters of one block device from `/proc/diskstats`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiskStats {
    /// Device name (sda, nvme0n1, etc.)
    pub device: String,
    /// Number of sectors read
    pub read_sectors: u64,
    /// Number of sectors written
    pub write_sectors: u64,
}

/// Parses `/proc/diskstats` content.
///
/// Format: major minor name reads r_merged r_sectors r_time writes w_merged w_sectors w_time io_pending io_time w_io_time [discards ...]
/// Lines with fewer than 14 columns are skipped.
pub fn parse_diskstats(content: &str) -> Result<Vec<DiskStats>, ParseError> {
    let mut disks = Vec::new();

    for line in content.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 14 {
            continue;
        }

        let get_val = |idx: usize| -> Result<u64, ParseError> {
            parts[idx].parse().map_err(|_| {
                ParseError::new(format!("invalid diskstats column {} for {}", idx, parts[2]))
            })
        };

        disks.push(DiskStats {
            device: parts[2].to_string(),
            read_sectors: get_val(5)?,
            write_sectors: get_val(9)?,
        });
    }

    Ok(disks)
}

/// Parses `/proc/cpuinfo` content.
///
/// Missing keys leave the corresponding `CpuInfo` defaults in place.
pub fn parse_cpuinfo(content: &str) -> CpuInfo {
    let mut info = CpuInfo::default();
    let mut model = None;
    let mut cores = None;

    for line in content.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        match key.trim() {
            "processor" => info.threads += 1,
            "model name" if model.is_none() => model = Some(value.trim().to_string()),
            "cpu cores" if cores.is_none() => cores = value.trim().parse().ok(),
            _ => {}
        }
    }

    if let Some(model) = model {
        info.model = model;
    }
    info.cores = cores.unwrap_or(0);
    info
}
