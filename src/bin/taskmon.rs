//! taskmon - process and system resource monitor.
//!
//! Samples `/proc` every interval and prints the system summary followed by
//! the busiest processes.
//!
//! Usage:
//!   taskmon                     # 1 second interval, sorted by CPU
//!   taskmon 5 --sort mem        # 5 second interval, sorted by memory
//!   taskmon --filter post       # only rows whose sort column contains "post"
//!   taskmon --count 1 --json    # one JSON snapshot, then exit
//!   taskmon --terminate 1234    # send SIGTERM to a listed process

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::RecvTimeoutError;
use std::time::Duration;

use clap::Parser;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use taskmon::collector::ProcfsSource;
use taskmon::collector::RealFs;
use taskmon::history::{DEFAULT_HISTORY_LEN, SystemHistory};
use taskmon::model::{CpuInfo, MetricKind, MetricRow, SystemMetrics};
use taskmon::{Monitor, MonitorConfig, ProcessSortKey, Snapshot};

/// Process and system resource monitor.
#[derive(Parser)]
#[command(name = "taskmon", about = "Process and system resource monitor", version)]
struct Args {
    /// Sampling interval in seconds.
    #[arg(value_name = "INTERVAL", default_value = "1")]
    interval: u64,

    /// Samples kept per history series.
    #[arg(long, default_value_t = DEFAULT_HISTORY_LEN)]
    history_len: usize,

    /// Path to /proc filesystem (for testing/mocking).
    #[arg(long, default_value = "/proc")]
    proc_path: String,

    /// Column to sort (and filter) by: pid, name, cpu, mem or io.
    #[arg(short, long, default_value = "cpu")]
    sort: ProcessSortKey,

    /// Only show rows whose sort column contains this text.
    #[arg(short, long, default_value = "")]
    filter: String,

    /// Number of process rows to print per cycle.
    #[arg(short = 'n', long, default_value = "10")]
    top: usize,

    /// Exit after this many cycles.
    #[arg(short, long)]
    count: Option<u64>,

    /// Print each snapshot as a JSON line.
    #[arg(long)]
    json: bool,

    /// Send SIGTERM to this pid after one cycle and exit.
    #[arg(long, value_name = "PID")]
    terminate: Option<u32>,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

impl Args {
    fn config(&self) -> MonitorConfig {
        MonitorConfig {
            interval: Duration::from_secs(self.interval),
            history_len: self.history_len,
            proc_path: self.proc_path.clone().into(),
            ..Default::default()
        }
    }
}

/// Initializes the tracing subscriber with the appropriate log level.
/// Logs go to stderr so they never mix with the table or JSON output.
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = format!("taskmon={}", level).parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Converts a per-interval amount to a per-second rate.
fn per_second(value: f64, interval: Duration) -> f64 {
    let secs = interval.as_secs_f64();
    if secs > 0.0 { value / secs } else { 0.0 }
}

fn format_cpu_info(info: &CpuInfo) -> String {
    format!(
        "CPU: {} ({} cores, {} threads)",
        info.model, info.cores, info.threads
    )
}

fn format_summary(system: &SystemMetrics, interval: Duration) -> String {
    format!(
        "System Total | CPU: {:.1}% | MEM: {:.1}% | Disk: {:.1} KB/s",
        system.cpu_percent,
        system.mem_percent,
        per_second(system.disk_kb, interval)
    )
}

/// Highest value of each series over the kept history.
fn format_peaks(history: &SystemHistory, interval: Duration) -> String {
    let mut line = format!("Peak (last {})", history.capacity());
    for kind in MetricKind::ALL {
        let mut peak = history.series(kind).peak();
        if kind == MetricKind::Disk {
            peak = per_second(peak, interval);
        }
        line.push_str(&format!(" | {}: {:.1}", kind.label(), peak));
    }
    line
}

fn format_header() -> String {
    format!(
        "{:>7}  {:<16} {:>7} {:>7} {:>10}",
        "PID", "NAME", "CPU%", "MEM%", "IO KB/s"
    )
}

fn format_row(row: &MetricRow, interval: Duration, selected: bool) -> String {
    let name: String = row.display_name.chars().take(16).collect();
    format!(
        "{:>7}{} {:<16} {:>7.2} {:>7.2} {:>10.2}",
        row.pid,
        if selected { '*' } else { ' ' },
        name,
        row.cpu_percent,
        row.mem_percent,
        per_second(row.io_rate_kb, interval)
    )
}

fn print_snapshot(snapshot: &Snapshot, args: &Args, interval: Duration) {
    if args.json {
        match serde_json::to_string(snapshot) {
            Ok(line) => println!("{}", line),
            Err(e) => error!("Failed to serialize snapshot: {}", e),
        }
        return;
    }

    println!();
    println!(
        "{} cycle {}",
        snapshot.taken_at.format("%Y-%m-%d %H:%M:%S UTC"),
        snapshot.cycle
    );
    println!("{}", format_summary(&snapshot.system, interval));
    println!("{}", format_peaks(&snapshot.history, interval));
    println!("{}", format_header());
    for row in snapshot.view.rows.iter().take(args.top) {
        let selected = snapshot.view.selection == Some(row.pid);
        println!("{}", format_row(row, interval, selected));
    }
    if snapshot.view.rows.len() > args.top {
        println!("  ... {} more", snapshot.view.rows.len() - args.top);
    }
}

fn run_terminate(monitor: &Monitor<ProcfsSource<RealFs>>, pid: u32) -> i32 {
    monitor.tick();
    match monitor.request_termination(pid) {
        Ok(pid) => {
            println!("Sent SIGTERM to {}", pid);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    let config = args.config();
    let mut monitor = match Monitor::procfs(&config) {
        Ok(monitor) => monitor,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    };

    if let Some(pid) = args.terminate {
        std::process::exit(run_terminate(&monitor, pid));
    }

    info!("taskmon {} starting", env!("CARGO_PKG_VERSION"));
    info!(
        "Config: interval={}s, history={}, proc={}, sort={}",
        args.interval, args.history_len, args.proc_path, args.sort
    );
    if !args.json {
        println!("{}", format_cpu_info(monitor.cpu_info()));
    }

    monitor.set_sort_key(args.sort);
    monitor.set_filter_text(args.filter.clone());

    // Setup graceful shutdown
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    }) {
        warn!("Failed to set Ctrl-C handler: {}", e);
    }

    let snapshots = monitor.subscribe();
    monitor.start();

    let mut printed: u64 = 0;
    while running.load(Ordering::SeqCst) {
        match snapshots.recv_timeout(Duration::from_millis(100)) {
            Ok(snapshot) => {
                print_snapshot(&snapshot, &args, config.interval);
                printed += 1;
                if args.count.is_some_and(|count| printed >= count) {
                    debug!("Reached cycle count {}", printed);
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    monitor.stop();
    info!("taskmon stopped after {} cycles", printed);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pid: u32, name: &str) -> MetricRow {
        MetricRow {
            pid,
            display_name: name.to_string(),
            cpu_percent: 12.5,
            mem_percent: 0.5,
            io_rate_kb: 20.0,
        }
    }

    #[test]
    fn test_per_second() {
        assert_eq!(per_second(10.0, Duration::from_secs(1)), 10.0);
        assert_eq!(per_second(10.0, Duration::from_secs(5)), 2.0);
        assert_eq!(per_second(10.0, Duration::ZERO), 0.0);
    }

    #[test]
    fn test_format_summary() {
        let system = SystemMetrics {
            cpu_percent: 60.0,
            mem_percent: 26.74,
            disk_kb: 2000.0,
            mem_total_kb: 16_384_000,
        };
        assert_eq!(
            format_summary(&system, Duration::from_secs(2)),
            "System Total | CPU: 60.0% | MEM: 26.7% | Disk: 1000.0 KB/s"
        );
    }

    #[test]
    fn test_format_peaks() {
        let mut history = SystemHistory::new(3);
        for (cpu, mem, disk) in [(10.0, 20.0, 2000.0), (40.0, 15.0, 1000.0)] {
            history.append(&SystemMetrics {
                cpu_percent: cpu,
                mem_percent: mem,
                disk_kb: disk,
                mem_total_kb: 1000,
            });
        }
        assert_eq!(
            format_peaks(&history, Duration::from_secs(2)),
            "Peak (last 3) | CPU %: 40.0 | MEM %: 20.0 | Disk KB/s: 1000.0"
        );
    }

    #[test]
    fn test_format_row_truncates_name_and_marks_selection() {
        let line = format_row(&row(42, "a-very-long-process-name"), Duration::from_secs(1), true);
        assert!(line.starts_with("     42* a-very-long-proc "));
        assert!(line.ends_with("  12.50    0.50      20.00"));

        let line = format_row(&row(7, "sh"), Duration::from_secs(1), false);
        assert!(line.starts_with("      7  sh "));
    }

    #[test]
    fn test_format_cpu_info() {
        let info = CpuInfo {
            model: "Intel(R) Core(TM) i7-8650U CPU @ 1.90GHz".to_string(),
            cores: 2,
            threads: 4,
        };
        assert_eq!(
            format_cpu_info(&info),
            "CPU: Intel(R) Core(TM) i7-8650U CPU @ 1.90GHz (2 cores, 4 threads)"
        );
    }

    #[test]
    fn test_args_to_config() {
        let args = Args::parse_from(["taskmon", "3", "--sort", "mem", "--history-len", "10"]);
        let config = args.config();
        assert_eq!(config.interval, Duration::from_secs(3));
        assert_eq!(config.history_len, 10);
        assert_eq!(args.sort, ProcessSortKey::Mem);
        assert!(Args::try_parse_from(["taskmon", "--sort", "rss"]).is_err());
    }
}
