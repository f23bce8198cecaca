//! Pre-built `/proc` trees and counter-advancing helpers for tests.

use super::filesystem::MockFs;

/// Builds a `/proc/[pid]/stat` line with the fields the counter source reads.
///
/// Everything else is filled with plausible constants; the line carries the
/// full 52 fields of a modern kernel.
pub fn stat_line(pid: u32, comm: &str, utime: u64, stime: u64, starttime: u64) -> String {
    format!(
        "{pid} ({comm}) S 1 {pid} {pid} 0 -1 4194560 100 0 0 0 {utime} {stime} 0 0 20 0 1 0 \
         {starttime} 10485760 512 18446744073709551615 1 1 0 0 0 0 0 0 0 0 0 0 17 0 0 0 0 0 0 \
         0 0 0 0 0 0 0 0 0 0\n"
    )
}

/// Builds a minimal `/proc/[pid]/status` with the given resident set size.
pub fn status_text(comm: &str, pid: u32, vm_rss_kb: u64) -> String {
    format!(
        "Name:\t{comm}\nState:\tS (sleeping)\nPid:\t{pid}\nPPid:\t1\n\
         VmSize:\t  {vsz} kB\nVmRSS:\t  {vm_rss_kb} kB\nThreads:\t1\n",
        vsz = vm_rss_kb * 4
    )
}

/// Builds `/proc/[pid]/io` content.
pub fn io_text(read_bytes: u64, write_bytes: u64) -> String {
    format!(
        "rchar: {}\nwchar: {}\nsyscr: 10\nsyscw: 10\nread_bytes: {read_bytes}\n\
         write_bytes: {write_bytes}\ncancelled_write_bytes: 0\n",
        read_bytes + 4096,
        write_bytes + 4096
    )
}

impl MockFs {
    /// System files only: `/proc/stat`, `/proc/meminfo`, `/proc/diskstats`
    /// and `/proc/cpuinfo`, with an empty process table.
    pub fn bare_system() -> Self {
        let mut fs = Self::new();
        fs.add_dir("/proc");
        fs.set_cpu_counters(10000, 500, 3000, 80000, 1000, 200, 100, 0);
        fs.set_memory(16384000, 12000000);
        fs.set_disk_sectors(1000, 1000, 500, 500);
        fs.add_file(
            "/proc/cpuinfo",
            "\
processor\t: 0
vendor_id\t: GenuineIntel
model name\t: Intel(R) Core(TM) i7-8650U CPU @ 1.90GHz
cpu MHz\t\t: 2112.000
cpu cores\t: 2

processor\t: 1
vendor_id\t: GenuineIntel
model name\t: Intel(R) Core(TM) i7-8650U CPU @ 1.90GHz
cpu MHz\t\t: 2112.000
cpu cores\t: 2

processor\t: 2
vendor_id\t: GenuineIntel
model name\t: Intel(R) Core(TM) i7-8650U CPU @ 1.90GHz
cpu MHz\t\t: 2112.000
cpu cores\t: 2

processor\t: 3
vendor_id\t: GenuineIntel
model name\t: Intel(R) Core(TM) i7-8650U CPU @ 1.90GHz
cpu MHz\t\t: 2112.000
cpu cores\t: 2
",
        );
        fs
    }

    /// A typical system with a few processes.
    ///
    /// Includes init (PID 1), sshd, an interactive bash and a postgres
    /// backend whose `io` file is unreadable.
    pub fn typical_system() -> Self {
        let mut fs = Self::bare_system();
        fs.spawn(1, "systemd", 120, 80, 1, 12288);
        fs.set_process_io(1, 1_048_576, 524_288);
        fs.spawn(512, "sshd", 30, 10, 900, 8192);
        fs.set_process_io(512, 4096, 0);
        fs.spawn(1024, "bash", 5, 3, 15000, 4096);
        fs.set_process_io(1024, 0, 0);
        fs.spawn(2048, "postgres", 400, 150, 20000, 65536);
        fs
    }

    /// Writes the aggregate `cpu` line of `/proc/stat` (plus one per-cpu line).
    #[allow(clippy::too_many_arguments)]
    pub fn set_cpu_counters(
        &mut self,
        user: u64,
        nice: u64,
        system: u64,
        idle: u64,
        iowait: u64,
        irq: u64,
        softirq: u64,
        steal: u64,
    ) {
        self.add_file(
            "/proc/stat",
            format!(
                "cpu  {user} {nice} {system} {idle} {iowait} {irq} {softirq} {steal} 0 0\n\
                 cpu0 {user} {nice} {system} {idle} {iowait} {irq} {softirq} {steal} 0 0\n\
                 intr 1000000 50 0 0\nctxt 500000\nbtime 1700000000\nprocesses 12345\n\
                 procs_running 2\nprocs_blocked 0\n"
            ),
        );
    }

    /// Writes `/proc/stat` so the aggregate line totals exactly
    /// `total` ticks of which `idle` are idle.
    pub fn set_cpu_totals(&mut self, total: u64, idle: u64) {
        self.set_cpu_counters(total.saturating_sub(idle), 0, 0, idle, 0, 0, 0, 0);
    }

    pub fn set_memory(&mut self, total_kb: u64, available_kb: u64) {
        self.add_file(
            "/proc/meminfo",
            format!(
                "MemTotal:       {total_kb} kB\nMemFree:        {free} kB\n\
                 MemAvailable:   {available_kb} kB\nBuffers:          512000 kB\n\
                 Cached:          2048000 kB\nSwapTotal:       4096000 kB\n\
                 SwapFree:        4096000 kB\n",
                free = available_kb / 2
            ),
        );
    }

    /// Writes `/proc/diskstats` with two whole disks, their partitions and
    /// a few virtual devices. Only `sda` and `nvme0n1` are disk-class.
    pub fn set_disk_sectors(&mut self, sda_read: u64, sda_write: u64, nvme_read: u64, nvme_write: u64) {
        self.add_file(
            "/proc/diskstats",
            format!(
                "   7       0 loop0 100 0 2000 10 0 0 0 0 0 10 10 0 0 0 0\n\
                    8       0 sda 5000 100 {sda_read} 2000 3000 200 {sda_write} 1500 0 3000 3500 0 0 0 0\n\
                    8       1 sda1 4900 100 {sda_read} 1900 2900 200 {sda_write} 1400 0 2900 3300 0 0 0 0\n\
                 259       0 nvme0n1 10000 0 {nvme_read} 1000 8000 0 {nvme_write} 800 0 1500 1800 0 0 0 0\n\
                 259       1 nvme0n1p1 9000 0 {nvme_read} 900 7000 0 {nvme_write} 700 0 1400 1600 0 0 0 0\n\
                 253       0 dm-0 9000 0 90000 900 7000 0 70000 700 0 1400 1600 0 0 0 0\n"
            ),
        );
    }

    /// Adds a process without an `io` file; see [`MockFs::set_process_io`].
    pub fn spawn(&mut self, pid: u32, comm: &str, utime: u64, stime: u64, starttime: u64, rss_kb: u64) {
        self.add_process(
            pid,
            &stat_line(pid, comm, utime, stime, starttime),
            &status_text(comm, pid, rss_kb),
            "",
            &format!("{comm}\n"),
        );
    }

    /// Rewrites a process's CPU tick counters, keeping its name and start time.
    pub fn set_process_cpu(&mut self, pid: u32, comm: &str, utime: u64, stime: u64, starttime: u64) {
        self.add_file(
            format!("/proc/{pid}/stat"),
            stat_line(pid, comm, utime, stime, starttime),
        );
    }

    pub fn set_process_rss(&mut self, pid: u32, comm: &str, rss_kb: u64) {
        self.add_file(format!("/proc/{pid}/status"), status_text(comm, pid, rss_kb));
    }

    pub fn set_process_io(&mut self, pid: u32, read_bytes: u64, write_bytes: u64) {
        self.add_file(format!("/proc/{pid}/io"), io_text(read_bytes, write_bytes));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::traits::FileSystem;
    use std::path::Path;

    #[test]
    fn test_stat_line_field_count() {
        let line = stat_line(42, "my proc", 10, 20, 300);
        let after = &line[line.rfind(')').unwrap() + 1..];
        assert_eq!(after.split_whitespace().count(), 52);
    }

    #[test]
    fn test_typical_system_layout() {
        let fs = MockFs::typical_system();
        assert!(fs.exists(Path::new("/proc/stat")));
        assert!(fs.exists(Path::new("/proc/meminfo")));
        assert!(fs.exists(Path::new("/proc/diskstats")));
        assert!(fs.exists(Path::new("/proc/cpuinfo")));
        assert!(fs.exists(Path::new("/proc/1/io")));
        assert!(!fs.exists(Path::new("/proc/2048/io")));

        let entries = fs.read_dir(Path::new("/proc")).unwrap();
        let pids = entries
            .iter()
            .filter_map(|p| p.file_name()?.to_str()?.parse::<u32>().ok())
            .count();
        assert_eq!(pids, 4);
    }

    #[test]
    fn test_set_cpu_totals() {
        let mut fs = MockFs::bare_system();
        fs.set_cpu_totals(1500, 1000);
        let content = fs.read_to_string(Path::new("/proc/stat")).unwrap();
        assert!(content.starts_with("cpu  500 0 0 1000 0 0 0 0 0 0\n"));
    }
}
