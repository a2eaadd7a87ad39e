//! Sliding-window threshold evaluation
//!
//! The evaluator keeps the last `window_size` samples and only judges the
//! averages once the window is full, so a single spike never alerts on its
//! own. Every metric over its threshold contributes one line to a single
//! [`Alert`].

use chrono::{DateTime, Local, Utc};
use std::collections::VecDeque;
use std::fmt;
use vigil_core::{MonitorPolicy, StatusSample};

/// Bounded FIFO of the most recent samples
#[derive(Debug, Clone)]
pub struct SlidingWindow {
    capacity: usize,
    samples: VecDeque<StatusSample>,
}

/// Arithmetic means over a full window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowAverages {
    pub cpu_pct: f64,
    pub mem_pct: f64,
    pub disk_pct: f64,
}

impl SlidingWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            samples: VecDeque::with_capacity(capacity),
        }
    }

    /// Append a sample, evicting the oldest once the window is over capacity
    pub fn push(&mut self, sample: StatusSample) {
        self.samples.push_back(sample);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() >= self.capacity
    }

    pub fn latest(&self) -> Option<&StatusSample> {
        self.samples.back()
    }

    /// Means of each metric, `None` until the window is full
    pub fn averages(&self) -> Option<WindowAverages> {
        if !self.is_full() {
            return None;
        }

        let count = self.samples.len() as f64;
        let (cpu, mem, disk) = self.samples.iter().fold((0.0, 0.0, 0.0), |acc, s| {
            (acc.0 + s.cpu_pct, acc.1 + s.mem_pct, acc.2 + s.disk_pct_avg)
        });

        Some(WindowAverages {
            cpu_pct: cpu / count,
            mem_pct: mem / count,
            disk_pct: disk / count,
        })
    }
}

/// One metric over its threshold
#[derive(Debug, Clone, PartialEq)]
pub enum Breach {
    Cpu { average: f64, threshold: f64 },
    Memory { average: f64, threshold: f64 },
    /// Partitions of the latest sample individually over the threshold,
    /// sorted by mount point
    Disk {
        threshold: f64,
        partitions: Vec<(String, f64)>,
    },
    /// The average was over the threshold but no single partition was
    DiskAverage { average: f64, threshold: f64 },
}

impl fmt::Display for Breach {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Breach::Cpu { average, threshold } => write!(
                f,
                "CPU usage {:.2}% exceeds threshold {:.2}%",
                average, threshold
            ),
            Breach::Memory { average, threshold } => write!(
                f,
                "Memory usage {:.2}% exceeds threshold {:.2}%",
                average, threshold
            ),
            Breach::Disk {
                threshold,
                partitions,
            } => {
                write!(f, "Disk usage exceeds threshold {:.2}%: ", threshold)?;
                for (i, (mount_point, usage)) in partitions.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{} {:.2}%", mount_point, usage)?;
                }
                Ok(())
            }
            Breach::DiskAverage { average, threshold } => write!(
                f,
                "Average disk usage {:.2}% exceeds threshold {:.2}%",
                average, threshold
            ),
        }
    }
}

/// Every condition that tripped on one evaluation
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    /// Time of the latest sample in the window
    pub at: DateTime<Utc>,
    pub breaches: Vec<Breach>,
}

impl Alert {
    pub fn body(&self) -> String {
        let mut body = format!(
            "System monitor alert:\nTime: {}\n",
            self.at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
        );
        for breach in &self.breaches {
            body.push_str(&breach.to_string());
            body.push('\n');
        }
        body
    }
}

pub struct ThresholdEvaluator {
    window: SlidingWindow,
    cpu_threshold: f64,
    mem_threshold: f64,
    disk_threshold: f64,
}

impl ThresholdEvaluator {
    pub fn new(policy: &MonitorPolicy) -> Self {
        Self {
            window: SlidingWindow::new(policy.window_size),
            cpu_threshold: policy.cpu_threshold,
            mem_threshold: policy.mem_threshold,
            disk_threshold: policy.disk_threshold,
        }
    }

    pub fn add_sample(&mut self, sample: StatusSample) {
        self.window.push(sample);
    }

    /// Judge the current window, returning at most one alert
    pub fn evaluate(&self) -> Option<Alert> {
        let averages = self.window.averages()?;
        let latest = self.window.latest()?;

        let mut breaches = Vec::new();
        if averages.cpu_pct > self.cpu_threshold {
            breaches.push(Breach::Cpu {
                average: averages.cpu_pct,
                threshold: self.cpu_threshold,
            });
        }
        if averages.mem_pct > self.mem_threshold {
            breaches.push(Breach::Memory {
                average: averages.mem_pct,
                threshold: self.mem_threshold,
            });
        }
        if averages.disk_pct > self.disk_threshold {
            // BTreeMap iteration keeps the partitions sorted by mount point
            let partitions: Vec<(String, f64)> = latest
                .disk_pct_by_mount
                .iter()
                .filter(|(_, usage)| **usage > self.disk_threshold)
                .map(|(mount_point, usage)| (mount_point.clone(), *usage))
                .collect();

            if partitions.is_empty() {
                breaches.push(Breach::DiskAverage {
                    average: averages.disk_pct,
                    threshold: self.disk_threshold,
                });
            } else {
                breaches.push(Breach::Disk {
                    threshold: self.disk_threshold,
                    partitions,
                });
            }
        }

        if breaches.is_empty() {
            return None;
        }
        Some(Alert {
            at: latest.at,
            breaches,
        })
    }
}
