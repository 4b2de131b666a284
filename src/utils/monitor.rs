use crate::domain::model::StatsSnapshot;
#[cfg(feature = "monitor")]
use std::sync::Mutex;
use std::time::{Duration, Instant};
#[cfg(feature = "monitor")]
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

#[derive(Debug, Clone)]
pub struct SystemStats {
    pub cpu_usage: f32,
    pub memory_usage_mb: u64,
    pub peak_memory_mb: u64,
    pub elapsed_time: Duration,
}

/// Process resource usage, logged next to the stream counters.
pub struct SystemMonitor {
    #[cfg(feature = "monitor")]
    system: Mutex<System>,
    #[cfg(feature = "monitor")]
    pid: Option<Pid>,
    #[cfg(feature = "monitor")]
    peak_memory_mb: Mutex<u64>,
    start_time: Instant,
    enabled: bool,
}

impl SystemMonitor {
    pub fn new(enabled: bool) -> Self {
        Self {
            #[cfg(feature = "monitor")]
            system: Mutex::new(System::new()),
            #[cfg(feature = "monitor")]
            pid: sysinfo::get_current_pid().ok(),
            #[cfg(feature = "monitor")]
            peak_memory_mb: Mutex::new(0),
            start_time: Instant::now(),
            enabled: enabled && cfg!(feature = "monitor"),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[cfg(feature = "monitor")]
    pub fn get_stats(&self) -> Option<SystemStats> {
        if !self.enabled {
            return None;
        }
        let pid = self.pid?;

        let mut system = self.system.lock().ok()?;
        system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::nothing().with_cpu().with_memory(),
        );

        let process = system.process(pid)?;
        let memory_mb = process.memory() / 1024 / 1024;

        // 更新峰值記憶體
        let mut peak = self.peak_memory_mb.lock().ok()?;
        *peak = (*peak).max(memory_mb);

        Some(SystemStats {
            cpu_usage: process.cpu_usage(),
            memory_usage_mb: memory_mb,
            peak_memory_mb: *peak,
            elapsed_time: self.start_time.elapsed(),
        })
    }

    #[cfg(not(feature = "monitor"))]
    pub fn get_stats(&self) -> Option<SystemStats> {
        None
    }

    pub fn log_stats(&self, phase: &str, stream: &StatsSnapshot) {
        match self.get_stats() {
            Some(stats) => tracing::info!(
                "📊 {} - {} | CPU: {:.1}%, Memory: {}MB, Peak: {}MB, Uptime: {:?}",
                phase,
                stream,
                stats.cpu_usage,
                stats.memory_usage_mb,
                stats.peak_memory_mb,
                stats.elapsed_time
            ),
            None => tracing::info!("📊 {} - {}", phase, stream),
        }
    }

    pub fn log_final_stats(&self, stream: &StatsSnapshot) {
        match self.get_stats() {
            Some(stats) => tracing::info!(
                "📊 Final Stats - {} | Uptime: {:?}, Peak Memory: {}MB",
                stream,
                stats.elapsed_time,
                stats.peak_memory_mb
            ),
            None => tracing::info!(
                "📊 Final Stats - {} | Uptime: {:?}",
                stream,
                self.start_time.elapsed()
            ),
        }
    }
}

impl Default for SystemMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}
