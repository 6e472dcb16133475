//! CPU Statistics Parsing
//!
//! Parses the per-core lines of `/proc/stat` and turns two successive samples
//! of the same core into a busy percentage.
//!
//! ```text
//! cpu  10132153 290696 3084719 46828483 16683 0 25195 0 0 0   <- aggregate, skipped
//! cpu0 1393280  32966  572056  13343292 6130  0 17875 0 0 0   <- core 0
//!      user     nice   system  idle     iowait irq softirq steal guest guest_nice
//! ```
//!
//! Kernels older than 2.6 report only the first four counters; the rest
//! default to zero.

use thiserror::Error;

/// Counters every cpu line must carry (user, nice, system, idle)
pub const REQUIRED_COUNTERS: usize = 4;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StatsError {
    /// Line does not describe a cpu
    #[error("not a cpu line: {line:?}")]
    NotCpu { line: String },

    /// The `cpu ` line sums all cores and carries no per-core data
    #[error("aggregate cpu line")]
    Aggregate,

    #[error("too few counters in cpu line: found {found}, need {}", REQUIRED_COUNTERS)]
    TooLittle { found: usize },

    #[error("invalid {field} in cpu line: {value:?}")]
    InvalidField { field: &'static str, value: String },
}

impl StatsError {
    /// Lines that are simply not per-core samples
    pub fn is_skippable(&self) -> bool {
        matches!(self, StatsError::NotCpu { .. } | StatsError::Aggregate)
    }
}

/// One core's cumulative jiffy counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CpuSample {
    pub core: u16,
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
    /// Already counted in `user`
    pub guest: u64,
    /// Already counted in `nice`
    pub guest_nice: u64,
}

impl CpuSample {
    /// Parse one `cpuN ...` line
    pub fn parse_line(line: &str) -> Result<Self, StatsError> {
        let mut fields = line.split_whitespace();
        let label = fields.next().unwrap_or_default();

        let core = match label.strip_prefix("cpu") {
            Some("") => return Err(StatsError::Aggregate),
            Some(core) => core.parse::<u16>().map_err(|_| StatsError::InvalidField {
                field: "core",
                value: core.to_string(),
            })?,
            None => {
                return Err(StatsError::NotCpu {
                    line: line.to_string(),
                })
            }
        };

        let mut counters = [0u64; 10];
        let mut found = 0;
        for (slot, raw) in counters.iter_mut().zip(fields) {
            *slot = raw.parse().map_err(|_| StatsError::InvalidField {
                field: COUNTER_NAMES[found],
                value: raw.to_string(),
            })?;
            found += 1;
        }
        if found < REQUIRED_COUNTERS {
            return Err(StatsError::TooLittle { found });
        }

        let [user, nice, system, idle, iowait, irq, softirq, steal, guest, guest_nice] = counters;
        Ok(Self {
            core,
            user,
            nice,
            system,
            idle,
            iowait,
            irq,
            softirq,
            steal,
            guest,
            guest_nice,
        })
    }

    /// Jiffies spent doing nothing. Saturates instead of overflowing.
    pub fn idle_time(&self) -> u64 {
        self.idle.saturating_add(self.iowait)
    }

    /// All jiffies; guest time is part of user/nice and not added again.
    /// Saturates instead of overflowing.
    pub fn total_time(&self) -> u64 {
        [
            self.nice,
            self.system,
            self.idle,
            self.iowait,
            self.irq,
            self.softirq,
            self.steal,
        ]
        .iter()
        .fold(self.user, |total, &counter| total.saturating_add(counter))
    }
}

const COUNTER_NAMES: [&str; 10] = [
    "user",
    "nice",
    "system",
    "idle",
    "iowait",
    "irq",
    "softirq",
    "steal",
    "guest",
    "guest_nice",
];

/// Parse every per-core line of a stat dump, skipping everything else
pub fn parse_samples(text: &str) -> Result<Vec<CpuSample>, StatsError> {
    let mut samples = Vec::new();
    for line in text.lines().filter(|line| !line.trim().is_empty()) {
        match CpuSample::parse_line(line) {
            Ok(sample) => samples.push(sample),
            Err(err) if err.is_skippable() => {}
            Err(err) => return Err(err),
        }
    }
    Ok(samples)
}

/// Busy percentage of one core between two samples
pub fn average_load(previous: &CpuSample, current: &CpuSample) -> f32 {
    let total = current.total_time().saturating_sub(previous.total_time());
    if total == 0 {
        return 0.0;
    }
    let idle = current.idle_time().saturating_sub(previous.idle_time()).min(total);
    (total - idle) as f32 * 100.0 / total as f32
}
