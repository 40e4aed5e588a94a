//! Host CPU and memory load shown on the overlay.
//!
use sysinfo::{CpuRefreshKind, MemoryRefreshKind, RefreshKind, System};

/// Load of the host in percent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SystemLoad {
    pub cpu_percent: f32,
    pub ram_percent: f32,
}

impl SystemLoad {
    pub fn cpu_text(&self) -> String {
        format!("CPU: {:.1}%", self.cpu_percent)
    }

    pub fn ram_text(&self) -> String {
        format!("RAM: {:.1}%", self.ram_percent)
    }
}

/// Something reporting the current host load.
pub trait LoadMonitor: Send {
    fn sample(&mut self) -> SystemLoad;
}

/// Host load read through `sysinfo`.
///
/// CPU usage is measured between two samples, so the first one reads 0.
pub struct SysinfoMonitor {
    system: System,
}

impl SysinfoMonitor {
    pub fn new() -> Self {
        let refresh = RefreshKind::nothing()
            .with_cpu(CpuRefreshKind::nothing().with_cpu_usage())
            .with_memory(MemoryRefreshKind::nothing().with_ram());
        Self {
            system: System::new_with_specifics(refresh),
        }
    }
}

impl Default for SysinfoMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadMonitor for SysinfoMonitor {
    fn sample(&mut self) -> SystemLoad {
        self.system.refresh_cpu_usage();
        self.system.refresh_memory();

        let total = self.system.total_memory();
        let ram_percent = match total {
            0 => 0.0,
            total => self.system.used_memory() as f32 / total as f32 * 100.0,
        };
        SystemLoad {
            cpu_percent: self.system.global_cpu_usage(),
            ram_percent,
        }
    }
}
