//! Common test utilities shared across scheduler integration tests
//!
//! This module provides:
//! - A scripted sampler and script runner that track overlapping ticks
//! - A harness wiring them into a `SchedulerCore` with in-memory collaborators

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use vigil_config::{ConfigService, Settings};
use vigil_core::{EmailSettings, InMemoryHistory, StatusSample, TlsMode};
use vigil_monitoring::{SampleError, Sampler};
use vigil_notifications::MockMailer;
use vigil_scheduler::SchedulerCore;
use vigil_scripts::{ScriptError, ScriptRun, ScriptRunner};

/// Counts work in flight and remembers the highest overlap seen
#[derive(Default)]
pub struct InFlight {
    current: AtomicUsize,
    max: AtomicUsize,
    total: AtomicUsize,
}

impl InFlight {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max.fetch_max(now, Ordering::SeqCst);
        self.total.fetch_add(1, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn max(&self) -> usize {
        self.max.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }
}

/// Sampler returning a fixed reading after an optional delay
pub struct ScriptedSampler {
    pub sample: Mutex<StatusSample>,
    pub delay: Duration,
    pub fail: bool,
    pub in_flight: InFlight,
}

impl ScriptedSampler {
    pub fn new(cpu_pct: f64, mem_pct: f64, disk_pct: f64) -> Self {
        Self {
            sample: Mutex::new(StatusSample::new(cpu_pct, mem_pct, disk_pct)),
            delay: Duration::ZERO,
            fail: false,
            in_flight: InFlight::default(),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_failure(mut self) -> Self {
        self.fail = true;
        self
    }
}

#[async_trait]
impl Sampler for ScriptedSampler {
    async fn sample(&self) -> Result<StatusSample, SampleError> {
        self.in_flight.enter();
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let result = if self.fail {
            Err(SampleError::Memory("sensor unavailable".to_string()))
        } else {
            Ok(self.sample.lock().await.clone())
        };
        self.in_flight.exit();
        result
    }
}

#[derive(Debug, Clone, Copy)]
pub enum RunOutcome {
    Code(i32),
    SpawnFailure,
}

/// Script runner returning a fixed outcome after an optional delay
pub struct ScriptedRunner {
    pub outcome: Mutex<RunOutcome>,
    pub delay: Duration,
    pub in_flight: InFlight,
}

impl ScriptedRunner {
    pub fn new(outcome: RunOutcome) -> Self {
        Self {
            outcome: Mutex::new(outcome),
            delay: Duration::ZERO,
            in_flight: InFlight::default(),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl ScriptRunner for ScriptedRunner {
    async fn run(&self, path: &str, _args: &str, _timeout: Duration) -> ScriptRun {
        self.in_flight.enter();
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let run = match *self.outcome.lock().await {
            RunOutcome::Code(code) => ScriptRun {
                result: Ok(code),
                output: format!("result {}\n", code),
            },
            RunOutcome::SpawnFailure => ScriptRun::failed(
                ScriptError::Spawn {
                    path: path.to_string(),
                    reason: "No such file or directory".to_string(),
                },
                "",
            ),
        };
        self.in_flight.exit();
        run
    }
}

pub fn email_settings() -> EmailSettings {
    EmailSettings {
        smtp_host: "smtp.example.com".to_string(),
        smtp_port: 465,
        username: "vigil".to_string(),
        password: "secret".to_string(),
        from: "vigil@example.com".to_string(),
        to: "ops@example.com".to_string(),
        tls_mode: TlsMode::Tls,
    }
}

/// Settings with email configured and nothing else
pub fn settings_with_email() -> Settings {
    Settings {
        system_name: "Edge Box".to_string(),
        email: Some(email_settings()),
        ..Settings::default()
    }
}

/// A scheduler core wired to in-memory collaborators
pub struct Harness {
    pub config: Arc<ConfigService>,
    pub history: Arc<InMemoryHistory>,
    pub mailer: MockMailer,
    pub sampler: Arc<ScriptedSampler>,
    pub runner: Arc<ScriptedRunner>,
    pub core: SchedulerCore,
}

impl Harness {
    pub fn new(settings: Settings, sampler: ScriptedSampler, runner: ScriptedRunner) -> Self {
        let config = Arc::new(ConfigService::in_memory(settings));
        let history = Arc::new(InMemoryHistory::default());
        let mailer = MockMailer::new();
        let sampler = Arc::new(sampler);
        let runner = Arc::new(runner);

        let core = SchedulerCore::new(
            config.clone(),
            history.clone(),
            Arc::new(mailer.clone()),
            sampler.clone(),
            runner.clone(),
        );

        Self {
            config,
            history,
            mailer,
            sampler,
            runner,
            core,
        }
    }

    /// Idle sampler and a runner reporting normal status
    pub fn idle(settings: Settings) -> Self {
        Self::new(
            settings,
            ScriptedSampler::new(10.0, 10.0, 10.0),
            ScriptedRunner::new(RunOutcome::Code(0)),
        )
    }
}

pub fn minutes(n: u64) -> Duration {
    Duration::from_secs(n * 60)
}
