// SPDX-License-Identifier: GPL-3.0-or-later

//! Cancellable step-based task runner.
//!
//! A run moves from running to either completed or cancelled. The cancel
//! flag is checked only between steps, so a cancellation takes effect at
//! most one step late. Cancellation is an ordinary outcome, not an error.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;
use tracing::debug;

use crate::error::{Error, Result};
use crate::mcp::types::ProgressToken;

/// Shortest accepted run, in seconds.
pub const MIN_DURATION_SECS: f64 = 1.0;
/// Longest accepted run, in seconds.
pub const MAX_DURATION_SECS: f64 = 300.0;
/// Fewest accepted steps.
pub const MIN_STEPS: u32 = 1;
/// Most accepted steps.
pub const MAX_STEPS: u32 = 100;
/// Label used when the caller does not name the task.
pub const DEFAULT_TASK_NAME: &str = "Long-running task";

/// Cooperative cancellation signal shared between a run and its canceller.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// A fresh, unset flag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the flag.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether the flag has been raised.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One progress report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressUpdate {
    /// Steps completed.
    pub progress: u64,
    /// Total steps.
    pub total: u64,
    /// Status line.
    pub message: String,
}

/// Receives progress reports. Delivery is fire-and-forget.
pub trait ProgressSink: Send + Sync {
    /// Emits one report for `token`.
    fn emit(&self, token: &ProgressToken, update: ProgressUpdate);
}

/// Validated parameters of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressPlan {
    duration_secs: f64,
    steps: u32,
    name: String,
}

impl ProgressPlan {
    /// Validates the parameters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the duration is outside 1 to 300
    /// seconds or the step count outside 1 to 100.
    pub fn new(duration_secs: f64, steps: u32, name: Option<String>) -> Result<Self> {
        if !duration_secs.is_finite()
            || !(MIN_DURATION_SECS..=MAX_DURATION_SECS).contains(&duration_secs)
        {
            return Err(Error::Validation(format!(
                "duration must be between {MIN_DURATION_SECS} and {MAX_DURATION_SECS} seconds, \
                 got {duration_secs}"
            )));
        }
        if !(MIN_STEPS..=MAX_STEPS).contains(&steps) {
            return Err(Error::Validation(format!(
                "steps must be between {MIN_STEPS} and {MAX_STEPS}, got {steps}"
            )));
        }
        let name = name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| DEFAULT_TASK_NAME.to_string());
        Ok(Self {
            duration_secs,
            steps,
            name,
        })
    }

    /// Delay of a single step.
    #[must_use]
    pub fn step_delay(&self) -> Duration {
        Duration::from_secs_f64(self.duration_secs / f64::from(self.steps))
    }

    /// Number of steps.
    #[must_use]
    pub const fn steps(&self) -> u32 {
        self.steps
    }

    /// Task label.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressOutcome {
    /// Steps that finished.
    pub steps_completed: u32,
    /// Steps planned.
    pub total_steps: u32,
    /// Whether the run stopped on the cancel flag.
    pub cancelled: bool,
    /// Wall-clock time from start to return.
    pub elapsed: Duration,
    /// When the run returned.
    pub finished_at: DateTime<Utc>,
}

impl ProgressOutcome {
    /// Elapsed seconds rounded to two decimals.
    #[must_use]
    pub fn elapsed_secs(&self) -> f64 {
        (self.elapsed.as_secs_f64() * 100.0).round() / 100.0
    }
}

/// Runs `plan`, reporting to `sink` after each step when a token is given.
pub async fn run<S>(
    plan: &ProgressPlan,
    token: Option<&ProgressToken>,
    cancel: &CancelFlag,
    sink: &S,
) -> ProgressOutcome
where
    S: ProgressSink + ?Sized,
{
    let started = Instant::now();
    let delay = plan.step_delay();
    let finish = |steps_completed: u32, cancelled: bool| ProgressOutcome {
        steps_completed,
        total_steps: plan.steps,
        cancelled,
        elapsed: started.elapsed(),
        finished_at: Utc::now(),
    };

    for step in 1..=plan.steps {
        if cancel.is_cancelled() {
            debug!(task = plan.name(), completed = step - 1, "Run cancelled");
            return finish(step - 1, true);
        }

        tokio::time::sleep(delay).await;

        if cancel.is_cancelled() {
            continue;
        }
        if let Some(token) = token {
            sink.emit(
                token,
                ProgressUpdate {
                    progress: u64::from(step),
                    total: u64::from(plan.steps),
                    message: format!("{}: Step {step}/{} completed", plan.name, plan.steps),
                },
            );
        }
    }

    // A cancel that landed during the final step.
    if cancel.is_cancelled() {
        debug!(task = plan.name(), "Run cancelled after final step");
        return finish(plan.steps, true);
    }
    finish(plan.steps, false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, PoisonError};

    #[derive(Default)]
    struct RecordingSink {
        updates: Mutex<Vec<ProgressUpdate>>,
        cancel_at: Option<(u64, CancelFlag)>,
    }

    impl RecordingSink {
        fn cancelling_at(step: u64, flag: CancelFlag) -> Self {
            Self {
                updates: Mutex::default(),
                cancel_at: Some((step, flag)),
            }
        }

        fn progress(&self) -> Vec<u64> {
            self.updates
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .iter()
                .map(|u| u.progress)
                .collect()
        }
    }

    impl ProgressSink for RecordingSink {
        fn emit(&self, _token: &ProgressToken, update: ProgressUpdate) {
            if let Some((step, flag)) = &self.cancel_at {
                if update.progress == *step {
                    flag.cancel();
                }
            }
            self.updates
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(update);
        }
    }

    fn token() -> ProgressToken {
        ProgressToken::String("tok".to_string())
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_after_second_step() -> anyhow::Result<()> {
        let plan = ProgressPlan::new(5.0, 5, None)?;
        let flag = CancelFlag::new();
        let sink = RecordingSink::cancelling_at(2, flag.clone());

        let outcome = run(&plan, Some(&token()), &flag, &sink).await;

        assert!(outcome.cancelled);
        assert_eq!(outcome.steps_completed, 2);
        assert_eq!(outcome.total_steps, 5);
        assert_eq!(sink.progress(), vec![1, 2]);
        assert_eq!(outcome.elapsed, Duration::from_secs(2));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_completes_all_steps_in_order() -> anyhow::Result<()> {
        let plan = ProgressPlan::new(3.0, 3, Some("Index".to_string()))?;
        let sink = RecordingSink::default();

        let outcome = run(&plan, Some(&token()), &CancelFlag::new(), &sink).await;

        assert!(!outcome.cancelled);
        assert_eq!(outcome.steps_completed, 3);
        assert_eq!(sink.progress(), vec![1, 2, 3]);
        let messages = sink
            .updates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        assert_eq!(messages[0].message, "Index: Step 1/3 completed");
        assert_eq!(messages[2].total, 3);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_token_no_notifications() -> anyhow::Result<()> {
        let plan = ProgressPlan::new(2.0, 4, None)?;
        let sink = RecordingSink::default();
        let outcome = run(&plan, None, &CancelFlag::new(), &sink).await;
        assert!(!outcome.cancelled);
        assert_eq!(outcome.steps_completed, 4);
        assert!(sink.progress().is_empty());
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_before_start() -> anyhow::Result<()> {
        let plan = ProgressPlan::new(10.0, 10, None)?;
        let flag = CancelFlag::new();
        flag.cancel();
        let sink = RecordingSink::default();
        let outcome = run(&plan, Some(&token()), &flag, &sink).await;
        assert!(outcome.cancelled);
        assert_eq!(outcome.steps_completed, 0);
        assert_eq!(outcome.elapsed, Duration::ZERO);
        assert!(sink.progress().is_empty());
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_final_step() -> anyhow::Result<()> {
        let plan = ProgressPlan::new(2.0, 2, None)?;
        let flag = CancelFlag::new();
        let canceller = flag.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(1500)).await;
            canceller.cancel();
        });
        let sink = RecordingSink::default();

        let outcome = run(&plan, Some(&token()), &flag, &sink).await;
        assert!(outcome.cancelled);
        assert_eq!(outcome.steps_completed, 2);
        assert_eq!(sink.progress(), vec![1]);
        Ok(())
    }

    #[test]
    fn test_plan_rejects_out_of_range() {
        assert!(matches!(ProgressPlan::new(0.5, 10, None), Err(Error::Validation(_))));
        assert!(matches!(
            ProgressPlan::new(301.0, 10, None),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            ProgressPlan::new(f64::NAN, 10, None),
            Err(Error::Validation(_))
        ));
        assert!(matches!(ProgressPlan::new(30.0, 0, None), Err(Error::Validation(_))));
        assert!(matches!(
            ProgressPlan::new(30.0, 101, None),
            Err(Error::Validation(_))
        ));
        assert!(ProgressPlan::new(1.0, 1, None).is_ok());
        assert!(ProgressPlan::new(300.0, 100, None).is_ok());
    }

    #[test]
    fn test_step_delay_and_default_name() -> anyhow::Result<()> {
        let plan = ProgressPlan::new(30.0, 10, Some("   ".to_string()))?;
        assert_eq!(plan.step_delay(), Duration::from_secs(3));
        assert_eq!(plan.name(), DEFAULT_TASK_NAME);
        Ok(())
    }

    #[test]
    fn test_elapsed_rounding() {
        let outcome = ProgressOutcome {
            steps_completed: 1,
            total_steps: 1,
            cancelled: false,
            elapsed: Duration::from_millis(1234),
            finished_at: Utc::now(),
        };
        assert!((outcome.elapsed_secs() - 1.23).abs() < f64::EPSILON);
    }
}
