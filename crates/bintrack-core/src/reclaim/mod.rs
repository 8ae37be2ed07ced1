/// Reclamation — empty the recycle bin through an ordered list of strategies.
///
/// No single mechanism empties the bin on every host configuration, so the
/// executor tries each [`ReclaimStrategy`] in order and stops at the first
/// that reports success. A reported success is trusted: the optional
/// post-verification pass only logs the residual size, because system-owned
/// entries legitimately survive every strategy.
///
/// `reclaim()` deletes unconditionally once called. Asking the operator for
/// confirmation is the caller's job.
pub mod strategies;

pub use strategies::{
    CommandOutput, CommandRunner, NativeCommandStrategy, ShellAutomationStrategy, TrashAutomation,
    TrashItem,
};

use crate::aggregate::{SizeAggregator, UsageSource};
use crate::error::ReclaimError;
use crate::model::size::format_size;
use chrono::{DateTime, Local};
use crossbeam_channel::{bounded, Receiver};
use std::sync::Arc;
use std::thread;
use tracing::{error, info, warn};

/// One concrete technique for emptying the recycle bin.
pub trait ReclaimStrategy: Send + Sync {
    /// Short stable name used in logs and the attempt record.
    fn name(&self) -> &str;

    /// Perform the reclamation. `Err` carries a human-readable reason.
    fn run(&self) -> Result<(), String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    Failure(String),
}

/// Diagnostic record of one strategy run. Not persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReclaimAttempt {
    pub strategy: String,
    pub outcome: AttemptOutcome,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
}

impl ReclaimAttempt {
    pub fn succeeded(&self) -> bool {
        self.outcome == AttemptOutcome::Success
    }
}

/// Summary of a successful reclamation.
#[derive(Debug, Clone)]
pub struct ReclaimReport {
    /// Attempts in execution order; the last one succeeded.
    pub attempts: Vec<ReclaimAttempt>,
    /// Usage measured before any strategy ran.
    pub bytes_before: u64,
    /// Usage measured afterwards, when post-verification is enabled.
    pub residual_bytes: Option<u64>,
}

impl ReclaimReport {
    /// Name of the strategy that succeeded.
    pub fn strategy(&self) -> Option<&str> {
        self.attempts.last().map(|a| a.strategy.as_str())
    }
}

pub struct ReclaimExecutor {
    usage: Arc<dyn UsageSource>,
    strategies: Vec<Box<dyn ReclaimStrategy>>,
    verify: bool,
}

impl ReclaimExecutor {
    /// Build an executor. At least one strategy is required.
    pub fn new(
        usage: Arc<dyn UsageSource>,
        strategies: Vec<Box<dyn ReclaimStrategy>>,
    ) -> Result<Self, ReclaimError> {
        if strategies.is_empty() {
            return Err(ReclaimError::NoStrategies);
        }
        Ok(Self {
            usage,
            strategies,
            verify: true,
        })
    }

    /// The standard order: the native command first, then shell automation.
    pub fn with_default_strategies(aggregator: Arc<SizeAggregator>) -> Self {
        let strategies = default_strategies(Arc::clone(&aggregator));
        Self {
            usage: aggregator,
            strategies,
            verify: true,
        }
    }

    /// Enable or disable the re-aggregation after a success.
    pub fn with_post_verification(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    pub fn strategy_names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Run strategies in order until one succeeds.
    pub fn reclaim(&self) -> Result<ReclaimReport, ReclaimError> {
        let bytes_before = self.usage.aggregate().total_bytes;
        info!("Emptying recycle bin ({} before)", format_size(bytes_before));

        let mut attempts = Vec::with_capacity(self.strategies.len());
        for strategy in &self.strategies {
            let started_at = Local::now();
            let result = strategy.run();
            let finished_at = Local::now();

            let outcome = match result {
                Ok(()) => AttemptOutcome::Success,
                Err(reason) => {
                    warn!("Strategy '{}' failed: {}", strategy.name(), reason);
                    AttemptOutcome::Failure(reason)
                }
            };
            let succeeded = outcome == AttemptOutcome::Success;
            attempts.push(ReclaimAttempt {
                strategy: strategy.name().to_owned(),
                outcome,
                started_at,
                finished_at,
            });

            if succeeded {
                info!("Recycle bin emptied by strategy '{}'", strategy.name());
                let residual_bytes = self.verify.then(|| self.log_residual());
                return Ok(ReclaimReport {
                    attempts,
                    bytes_before,
                    residual_bytes,
                });
            }
        }

        let last_reason = match attempts.last().map(|a| &a.outcome) {
            Some(AttemptOutcome::Failure(reason)) => reason.clone(),
            _ => "no strategy reported a result".to_owned(),
        };
        error!(
            "All {} reclamation strategies failed; last reason: {}",
            attempts.len(),
            last_reason
        );
        Err(ReclaimError::Exhausted {
            last_reason,
            attempts,
        })
    }

    fn log_residual(&self) -> u64 {
        let residual = self.usage.aggregate().total_bytes;
        if residual > 0 {
            // Entries owned by SYSTEM or other users are expected to remain.
            info!(
                "Residual recycle bin usage after emptying: {}",
                format_size(residual)
            );
        }
        residual
    }

    /// Run [`reclaim`](Self::reclaim) on a worker thread.
    ///
    /// The returned handle can be polled or waited on. Once started, the
    /// destructive work is not cancellable.
    pub fn reclaim_in_background(self: &Arc<Self>) -> std::io::Result<ReclaimHandle> {
        let (tx, rx) = bounded(1);
        let executor = Arc::clone(self);
        let thread = thread::Builder::new()
            .name("bintrack-reclaim".into())
            .spawn(move || {
                let _ = tx.send(executor.reclaim());
            })?;
        Ok(ReclaimHandle {
            result_rx: rx,
            _thread: thread,
        })
    }
}

/// Handle to a reclamation running on a worker thread.
pub struct ReclaimHandle {
    result_rx: Receiver<Result<ReclaimReport, ReclaimError>>,
    _thread: thread::JoinHandle<()>,
}

impl ReclaimHandle {
    /// Block until the reclamation finishes.
    pub fn wait(self) -> Result<ReclaimReport, ReclaimError> {
        self.result_rx
            .recv()
            .unwrap_or(Err(ReclaimError::WorkerLost))
    }

    /// The result if the reclamation has finished, without blocking.
    pub fn try_result(&self) -> Option<Result<ReclaimReport, ReclaimError>> {
        match self.result_rx.try_recv() {
            Ok(result) => Some(result),
            Err(crossbeam_channel::TryRecvError::Empty) => None,
            Err(crossbeam_channel::TryRecvError::Disconnected) => {
                Some(Err(ReclaimError::WorkerLost))
            }
        }
    }
}

/// Strategy A (native command) then strategy B (shell automation over the
/// aggregator's containers).
pub fn default_strategies(aggregator: Arc<SizeAggregator>) -> Vec<Box<dyn ReclaimStrategy>> {
    let runner = Arc::new(crate::platform::SystemCommandRunner);
    let automation = Arc::new(crate::platform::ContainerAutomation::new(aggregator));
    vec![
        Box::new(NativeCommandStrategy::platform_default(runner)),
        Box::new(ShellAutomationStrategy::new(automation)),
    ]
}
