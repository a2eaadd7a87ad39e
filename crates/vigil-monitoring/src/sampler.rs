//! System status sampling
//!
//! Reads CPU, memory and disk usage from the host. CPU usage needs two
//! refreshes some time apart, so a sample blocks for [`CPU_SAMPLE_WINDOW`];
//! the work runs on the blocking pool.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use sysinfo::{Disks, System};
use thiserror::Error;
use tracing::debug;
use vigil_core::StatusSample;

/// Time between the two CPU refreshes of one sample
pub const CPU_SAMPLE_WINDOW: Duration = Duration::from_secs(1);

const SKIPPED_FS_PREFIXES: [&str; 5] = ["tmpfs", "sysfs", "proc", "devtmpfs", "cgroup"];
const SKIPPED_MOUNT_POINTS: [&str; 3] = ["/dev", "/sys", "/proc"];

#[derive(Debug, Error)]
pub enum SampleError {
    #[error("Memory error: {0}")]
    Memory(String),
    #[error("Sampler task failed: {0}")]
    Task(String),
}

/// Produces one [`StatusSample`] on demand
#[async_trait]
pub trait Sampler: Send + Sync {
    async fn sample(&self) -> Result<StatusSample, SampleError>;
}

/// Samples the local machine through sysinfo
pub struct SystemSampler {
    system: Arc<Mutex<System>>,
    cpu_window: Duration,
}

impl SystemSampler {
    pub fn new() -> Self {
        Self {
            system: Arc::new(Mutex::new(System::new())),
            cpu_window: CPU_SAMPLE_WINDOW.max(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL),
        }
    }
}

impl Default for SystemSampler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Sampler for SystemSampler {
    async fn sample(&self) -> Result<StatusSample, SampleError> {
        let system = self.system.clone();
        let cpu_window = self.cpu_window;

        tokio::task::spawn_blocking(move || {
            let mut system = system
                .lock()
                .map_err(|_| SampleError::Task("system handle poisoned".to_string()))?;
            collect_sample(&mut system, cpu_window)
        })
        .await
        .map_err(|e| SampleError::Task(e.to_string()))?
    }
}

fn collect_sample(system: &mut System, cpu_window: Duration) -> Result<StatusSample, SampleError> {
    system.refresh_cpu_usage();
    std::thread::sleep(cpu_window);
    system.refresh_cpu_usage();
    let cpu_pct = f64::from(system.global_cpu_usage());

    system.refresh_memory();
    let total_memory = system.total_memory();
    if total_memory == 0 {
        return Err(SampleError::Memory(
            "total memory reported as zero".to_string(),
        ));
    }
    let mem_pct = (system.used_memory() as f64 / total_memory as f64) * 100.0;

    let disks = Disks::new_with_refreshed_list();
    let mut disk_pct_by_mount = BTreeMap::new();
    for disk in disks.list() {
        let mount_point = disk.mount_point().to_string_lossy().to_string();
        let file_system = disk.file_system().to_string_lossy().to_string();
        if !is_monitored_partition(&file_system, &mount_point) {
            debug!("Skipping {} ({})", mount_point, file_system);
            continue;
        }

        let total = disk.total_space();
        if total == 0 {
            continue;
        }
        let used = total.saturating_sub(disk.available_space());
        disk_pct_by_mount.insert(mount_point, (used as f64 / total as f64) * 100.0);
    }

    Ok(StatusSample {
        cpu_pct,
        mem_pct,
        disk_pct_avg: average_usage(&disk_pct_by_mount),
        disk_pct_by_mount,
        at: Utc::now(),
    })
}

/// Virtual and kernel filesystems never count towards disk usage
pub fn is_monitored_partition(file_system: &str, mount_point: &str) -> bool {
    !SKIPPED_FS_PREFIXES
        .iter()
        .any(|prefix| file_system.starts_with(prefix))
        && !SKIPPED_MOUNT_POINTS.contains(&mount_point)
}

/// Mean of the partition usages, zero when there are none
pub fn average_usage(usages: &BTreeMap<String, f64>) -> f64 {
    if usages.is_empty() {
        return 0.0;
    }
    usages.values().sum::<f64>() / usages.len() as f64
}
