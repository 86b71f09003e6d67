//! Host statistics from the operating system.
//!
//! [`SysinfoProvider`] is the production [`HostStatsProvider`]: it keeps one
//! `sysinfo::System` alive between samples so CPU usage is computed from the
//! delta between consecutive refreshes. The first reading after construction
//! therefore reports CPU usage relative to the baseline taken in `new`.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Mutex, MutexGuard};

use sysinfo::{
    CpuRefreshKind, MemoryRefreshKind, Pid, ProcessRefreshKind, ProcessesToUpdate, RefreshKind,
    System,
};

use crate::error::SamplingError;
use crate::metrics::{CpuStats, HostStats, MemoryStats, ProcessMemory, ProcessStats};
use crate::traits::HostStatsProvider;

/// [`HostStatsProvider`] backed by `sysinfo`.
pub struct SysinfoProvider {
    system: Mutex<System>,
    pid: Option<Pid>,
}

impl SysinfoProvider {
    /// Create a provider and take the baseline reading.
    #[must_use]
    pub fn new() -> Self {
        let refresh_kind = RefreshKind::nothing()
            .with_cpu(CpuRefreshKind::everything())
            .with_memory(MemoryRefreshKind::everything());
        let mut system = System::new_with_specifics(refresh_kind);

        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => Some(pid),
            Err(e) => {
                tracing::warn!(error = %e, "Current process id unavailable, process stats disabled");
                None
            }
        };
        if let Some(pid) = pid {
            system.refresh_processes_specifics(
                ProcessesToUpdate::Some(&[pid]),
                true,
                ProcessRefreshKind::nothing().with_cpu().with_memory(),
            );
        }

        Self {
            system: Mutex::new(system),
            pid,
        }
    }

    fn lock_system(&self) -> MutexGuard<'_, System> {
        match self.system.lock() {
            Ok(guard) => guard,
            Err(poison_error) => {
                tracing::warn!(
                    error = %poison_error,
                    "sysinfo lock poisoned, using recovered data"
                );
                poison_error.into_inner()
            }
        }
    }
}

impl Default for SysinfoProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SysinfoProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SysinfoProvider")
            .field("pid", &self.pid)
            .finish_non_exhaustive()
    }
}

impl HostStatsProvider for SysinfoProvider {
    fn sample(&self) -> Result<HostStats, SamplingError> {
        let mut sys = self.lock_system();
        let pid = self.pid;

        if let Err(e) = catch_unwind(AssertUnwindSafe(|| {
            sys.refresh_cpu_usage();
            sys.refresh_memory();
            if let Some(pid) = pid {
                sys.refresh_processes_specifics(
                    ProcessesToUpdate::Some(&[pid]),
                    true,
                    ProcessRefreshKind::nothing().with_cpu().with_memory(),
                );
            }
        })) {
            return Err(SamplingError::ReadFailed {
                message: format!("sysinfo refresh panicked: {e:?}"),
            });
        }

        let total = sys.total_memory();
        if total == 0 {
            return Err(SamplingError::Unavailable {
                message: "total memory reported as zero".to_string(),
            });
        }

        let load = System::load_average();
        let cpu = CpuStats {
            usage_percent: f64::from(sys.global_cpu_usage()).clamp(0.0, 100.0),
            load_average: [load.one, load.five, load.fifteen],
        };
        let memory = MemoryStats::from_totals(total, sys.available_memory());

        let process = pid
            .and_then(|pid| sys.process(pid))
            .map(|p| ProcessStats {
                uptime_seconds: p.run_time(),
                memory: ProcessMemory {
                    rss_bytes: p.memory(),
                    virtual_bytes: p.virtual_memory(),
                },
                cpu_percent: f64::from(p.cpu_usage()),
            })
            .unwrap_or_default();

        Ok(HostStats {
            cpu,
            memory,
            process,
        })
    }
}
