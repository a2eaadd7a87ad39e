use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, warn};
use vigil_core::{History, MonitorPolicy, RetryPolicy};
use vigil_monitoring::{Sampler, ThresholdEvaluator};

use crate::alerts::AlertNotifier;
use crate::error::TickError;
use crate::loop_runner::{Cadence, LoopTask, Role};

/// One tick samples the machine, records the sample and evaluates the
/// window. The window belongs to this instance and starts empty on restart.
pub struct MonitorTask {
    policy: MonitorPolicy,
    evaluator: ThresholdEvaluator,
    sampler: Arc<dyn Sampler>,
    history: Arc<dyn History>,
    notifier: AlertNotifier,
    retry: RetryPolicy,
}

impl MonitorTask {
    pub fn new(
        policy: MonitorPolicy,
        sampler: Arc<dyn Sampler>,
        history: Arc<dyn History>,
        notifier: AlertNotifier,
    ) -> Self {
        Self {
            evaluator: ThresholdEvaluator::new(&policy),
            policy,
            sampler,
            history,
            notifier,
            retry: RetryPolicy::HISTORY,
        }
    }
}

#[async_trait]
impl LoopTask for MonitorTask {
    fn cadence(&self) -> Cadence {
        Cadence::from_period(self.policy.period)
    }

    async fn tick(&mut self) -> Result<(), TickError> {
        let sample = self.sampler.sample().await?;
        debug!(
            "Sampled cpu {:.2}%, memory {:.2}%, disk {:.2}%",
            sample.cpu_pct, sample.mem_pct, sample.disk_pct_avg
        );

        let history = &self.history;
        if let Err(e) = self
            .retry
            .run("Recording status sample", || history.record_status(&sample))
            .await
        {
            error!("Dropping status sample: {}", e);
        }

        self.evaluator.add_sample(sample);
        if let Some(alert) = self.evaluator.evaluate() {
            let body = alert.body();
            warn!("Monitor thresholds exceeded: {}", body.trim_end());
            self.notifier.notify(Role::Monitor, &body).await;
        }
        Ok(())
    }
}
