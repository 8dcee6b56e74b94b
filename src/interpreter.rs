//! Interaction step interpreter.
//!
//! Executes a site adapter's script against a live page: resolves each
//! step's target through its fallback candidates, applies the retry budget,
//! honors required/optional policy, and produces an execution log. Optional
//! failures are absorbed here and never surface past the interpreter; only a
//! required step that exhausts resolution or retries aborts the script.

use crate::adapter::{FillValue, InteractionStep, StepAction, Target};
use crate::browser::{ActionError, PageSession};
use crate::error::EngineError;
use crate::events::{EngineEvent, EventBus};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Outcome of one interpreted step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepOutcome {
    /// Target resolved and the action succeeded.
    Ok,
    /// An optional step failed and was skipped.
    Warned,
    /// A required step failed (the script was aborted here).
    Failed,
}

/// Per-step diagnostic record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub step: usize,
    pub action: String,
    pub outcome: StepOutcome,
    /// Index of the candidate target that resolved, when one did.
    pub chosen_candidate: Option<usize>,
    pub message: Option<String>,
}

/// Ordered step outcomes for one script run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionLog {
    pub records: Vec<StepRecord>,
}

impl ExecutionLog {
    pub fn warnings(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.outcome == StepOutcome::Warned)
            .count()
    }

    pub fn all_ok(&self) -> bool {
        self.records.iter().all(|r| r.outcome == StepOutcome::Ok)
    }
}

/// How a step attempt ended, before policy is applied.
enum AttemptError {
    Resolution(String),
    Execution { attempts: u32, message: String },
}

/// Interprets adapter scripts against page sessions.
pub struct Interpreter {
    events: Arc<EventBus>,
    /// Visibility poll cadence during target resolution.
    poll_interval: Duration,
}

impl Interpreter {
    pub fn new(events: Arc<EventBus>) -> Self {
        Self {
            events,
            poll_interval: Duration::from_millis(250),
        }
    }

    /// Override the resolution poll cadence (tests use a tight loop).
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Run a script against a live page for one email.
    ///
    /// Returns the full execution log, or the aborting error when a
    /// required step fails.
    pub async fn run(
        &self,
        page: &mut dyn PageSession,
        steps: &[InteractionStep],
        email: &str,
    ) -> Result<ExecutionLog, EngineError> {
        let mut log = ExecutionLog::default();

        for (index, step) in steps.iter().enumerate() {
            if let StepAction::Wait { ms } = step.action {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                self.record_ok(&mut log, index, step, None);
                continue;
            }

            match self.attempt_step(page, index, step, email).await {
                Ok(chosen) => {
                    self.record_ok(&mut log, index, step, Some(chosen));
                    if step.settle_ms > 0 {
                        // Signup pages are JS-driven; give them time to
                        // react before the next target becomes queryable.
                        tokio::time::sleep(Duration::from_millis(step.settle_ms)).await;
                    }
                }
                Err(attempt) if step.required => {
                    let (outcome_msg, err) = match attempt {
                        AttemptError::Resolution(message) => (
                            message.clone(),
                            EngineError::StepResolution {
                                step: index,
                                message,
                            },
                        ),
                        AttemptError::Execution { attempts, message } => (
                            message.clone(),
                            EngineError::StepExecution {
                                step: index,
                                attempts,
                                message,
                            },
                        ),
                    };
                    log.records.push(StepRecord {
                        step: index,
                        action: step.action.name().to_string(),
                        outcome: StepOutcome::Failed,
                        chosen_candidate: None,
                        message: Some(outcome_msg.clone()),
                    });
                    self.events.emit(EngineEvent::StepFailed {
                        step: index,
                        action: step.action.name().to_string(),
                        message: outcome_msg,
                    });
                    return Err(err);
                }
                Err(attempt) => {
                    let message = match attempt {
                        AttemptError::Resolution(m) => m,
                        AttemptError::Execution { message, .. } => message,
                    };
                    warn!(email, step = index, "optional step skipped: {message}");
                    log.records.push(StepRecord {
                        step: index,
                        action: step.action.name().to_string(),
                        outcome: StepOutcome::Warned,
                        chosen_candidate: None,
                        message: Some(message.clone()),
                    });
                    self.events.emit(EngineEvent::StepWarned {
                        step: index,
                        action: step.action.name().to_string(),
                        message,
                    });
                }
            }
        }

        Ok(log)
    }

    /// Resolve and act for one step, consuming its retry budget. Each retry
    /// re-resolves the target fresh — the element that failed may have been
    /// detached by a page update.
    async fn attempt_step(
        &self,
        page: &mut dyn PageSession,
        index: usize,
        step: &InteractionStep,
        email: &str,
    ) -> Result<usize, AttemptError> {
        let mut last_action_error: Option<ActionError> = None;

        for attempt in 0..=step.retries {
            let chosen = match self.resolve_target(page, step).await {
                Some(chosen) => chosen,
                None => {
                    // A resolution failure after an action failure keeps the
                    // action error: it is the more specific diagnosis.
                    return Err(match last_action_error {
                        Some(e) => AttemptError::Execution {
                            attempts: attempt,
                            message: e.to_string(),
                        },
                        None => AttemptError::Resolution(format!(
                            "no candidate of {} became visible within {}ms",
                            step.targets.len(),
                            step.timeout_ms
                        )),
                    });
                }
            };

            let target = &step.targets[chosen];
            match self.perform(page, step, target, email).await {
                Ok(()) => {
                    debug!(
                        email,
                        step = index,
                        candidate = chosen,
                        attempt,
                        "step action ok"
                    );
                    return Ok(chosen);
                }
                Err(e) => {
                    debug!(email, step = index, attempt, "step action failed: {e}");
                    last_action_error = Some(e);
                }
            }
        }

        Err(AttemptError::Execution {
            attempts: step.retries + 1,
            message: last_action_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "action failed".to_string()),
        })
    }

    /// Poll the candidates in declared order until one is visible or the
    /// step timeout elapses. Returns the winning candidate index.
    async fn resolve_target(
        &self,
        page: &mut dyn PageSession,
        step: &InteractionStep,
    ) -> Option<usize> {
        let deadline = Instant::now() + Duration::from_millis(step.timeout_ms);
        loop {
            for (i, target) in step.targets.iter().enumerate() {
                // A probe error (e.g. mid-navigation) counts as not visible;
                // the next poll pass will see the settled page.
                if page.is_visible(target).await.unwrap_or(false) {
                    return Some(i);
                }
            }
            if Instant::now() >= deadline {
                return None;
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn perform(
        &self,
        page: &mut dyn PageSession,
        step: &InteractionStep,
        target: &Target,
        email: &str,
    ) -> Result<(), ActionError> {
        match &step.action {
            StepAction::Click => page.click(target).await,
            StepAction::Check => page.check(target).await,
            StepAction::ScrollIntoView => page.scroll_into_view(target).await,
            StepAction::Fill(value) => {
                let text = match value {
                    FillValue::Email => email,
                    FillValue::Literal(s) => s.as_str(),
                };
                page.fill(target, text).await
            }
            StepAction::Wait { .. } => Ok(()),
        }
    }

    fn record_ok(
        &self,
        log: &mut ExecutionLog,
        index: usize,
        step: &InteractionStep,
        chosen: Option<usize>,
    ) {
        log.records.push(StepRecord {
            step: index,
            action: step.action.name().to_string(),
            outcome: StepOutcome::Ok,
            chosen_candidate: chosen,
            message: None,
        });
        self.events.emit(EngineEvent::StepOk {
            step: index,
            action: step.action.name().to_string(),
            chosen_candidate: chosen.unwrap_or(0),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::InteractionStep;
    use async_trait::async_trait;
    use std::collections::HashMap;

    /// Scripted page: per-target visibility (optionally delayed by N probes)
    /// and per-target action failure counts.
    #[derive(Default)]
    struct ScriptedPage {
        /// target description -> number of probes before it reports visible
        /// (0 = immediately). Absent targets are never visible.
        visible_after: HashMap<String, usize>,
        probes: HashMap<String, usize>,
        /// target description -> number of times the action fails before
        /// succeeding.
        action_failures: HashMap<String, usize>,
        clicks: Vec<String>,
        fills: Vec<(String, String)>,
        checks: Vec<String>,
    }

    impl ScriptedPage {
        fn visible(mut self, target: &Target) -> Self {
            self.visible_after.insert(target.describe(), 0);
            self
        }

        fn visible_after(mut self, target: &Target, probes: usize) -> Self {
            self.visible_after.insert(target.describe(), probes);
            self
        }

        fn failing_action(mut self, target: &Target, failures: usize) -> Self {
            self.action_failures.insert(target.describe(), failures);
            self
        }

        fn act(&mut self, target: &Target) -> Result<(), ActionError> {
            let key = target.describe();
            let remaining = self.action_failures.entry(key.clone()).or_insert(0);
            if *remaining > 0 {
                *remaining -= 1;
                return Err(ActionError("click intercepted".into()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl PageSession for ScriptedPage {
        async fn navigate(&mut self, _url: &str, _timeout_ms: u64) -> Result<(), EngineError> {
            Ok(())
        }

        async fn is_visible(&mut self, target: &Target) -> Result<bool, ActionError> {
            let key = target.describe();
            match self.visible_after.get(&key) {
                None => Ok(false),
                Some(&after) => {
                    let seen = self.probes.entry(key).or_insert(0);
                    *seen += 1;
                    Ok(*seen > after)
                }
            }
        }

        async fn click(&mut self, target: &Target) -> Result<(), ActionError> {
            self.act(target)?;
            self.clicks.push(target.describe());
            Ok(())
        }

        async fn fill(&mut self, target: &Target, value: &str) -> Result<(), ActionError> {
            self.act(target)?;
            self.fills.push((target.describe(), value.to_string()));
            Ok(())
        }

        async fn check(&mut self, target: &Target) -> Result<(), ActionError> {
            self.act(target)?;
            self.checks.push(target.describe());
            Ok(())
        }

        async fn scroll_into_view(&mut self, target: &Target) -> Result<(), ActionError> {
            self.act(target)
        }

        async fn close(self: Box<Self>) -> Result<(), ActionError> {
            Ok(())
        }
    }

    fn interpreter() -> Interpreter {
        Interpreter::new(Arc::new(EventBus::default()))
            .with_poll_interval(Duration::from_millis(1))
    }

    fn fast(step: InteractionStep) -> InteractionStep {
        step.timeout_ms(30).settle_ms(0)
    }

    #[tokio::test]
    async fn test_fallback_candidate_records_chosen_index() {
        let missing = Target::css("#gone");
        let present = Target::css("#signup");
        let mut page = ScriptedPage::default().visible(&present);

        let steps = vec![fast(InteractionStep::click(vec![missing, present]))];
        let log = interpreter().run(&mut page, &steps, "a@x.com").await.unwrap();

        assert_eq!(log.records.len(), 1);
        assert_eq!(log.records[0].outcome, StepOutcome::Ok);
        assert_eq!(log.records[0].chosen_candidate, Some(1));
    }

    #[tokio::test]
    async fn test_late_visibility_within_timeout() {
        let target = Target::button("Sign Up");
        let mut page = ScriptedPage::default().visible_after(&target, 3);

        let steps = vec![fast(InteractionStep::click(vec![target]))];
        let log = interpreter().run(&mut page, &steps, "a@x.com").await.unwrap();
        assert!(log.all_ok());
    }

    #[tokio::test]
    async fn test_required_step_resolution_failure_aborts() {
        let mut page = ScriptedPage::default();
        let steps = vec![
            fast(InteractionStep::click(vec![Target::css("#never")])),
            fast(InteractionStep::click(vec![Target::css("#after")])),
        ];

        let err = interpreter()
            .run(&mut page, &steps, "a@x.com")
            .await
            .unwrap_err();
        match err {
            EngineError::StepResolution { step, .. } => assert_eq!(step, 0),
            other => panic!("expected StepResolution, got {other:?}"),
        }
        // The aborting step never reached the second step's target.
        assert!(page.clicks.is_empty());
    }

    #[tokio::test]
    async fn test_optional_step_failure_continues() {
        let fill_target = Target::textbox("Email address");
        let mut page = ScriptedPage::default().visible(&fill_target);

        let steps = vec![
            fast(InteractionStep::click(vec![Target::css("#captcha")]).optional()),
            fast(InteractionStep::fill_email(vec![fill_target])),
        ];
        let log = interpreter().run(&mut page, &steps, "a@x.com").await.unwrap();

        assert_eq!(log.records[0].outcome, StepOutcome::Warned);
        assert_eq!(log.records[1].outcome, StepOutcome::Ok);
        assert_eq!(log.warnings(), 1);
        assert_eq!(page.fills, vec![("textbox:email address".to_string(), "a@x.com".to_string())]);
    }

    #[tokio::test]
    async fn test_transient_action_failure_retried_then_ok() {
        let target = Target::button("Subscribe");
        let mut page = ScriptedPage::default()
            .visible(&target)
            .failing_action(&target, 1);

        let steps = vec![fast(InteractionStep::click(vec![target])).retries(2)];
        let log = interpreter().run(&mut page, &steps, "a@x.com").await.unwrap();
        assert!(log.all_ok());
        assert_eq!(page.clicks.len(), 1);
    }

    #[tokio::test]
    async fn test_retries_exhausted_on_required_step() {
        let target = Target::button("Subscribe");
        let mut page = ScriptedPage::default()
            .visible(&target)
            .failing_action(&target, 10);

        let steps = vec![fast(InteractionStep::click(vec![target])).retries(2)];
        let err = interpreter()
            .run(&mut page, &steps, "a@x.com")
            .await
            .unwrap_err();
        match err {
            EngineError::StepExecution { step, attempts, .. } => {
                assert_eq!(step, 0);
                assert_eq!(attempts, 3);
            }
            other => panic!("expected StepExecution, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fill_literal_value() {
        let target = Target::css("input[name='promo']");
        let mut page = ScriptedPage::default().visible(&target);

        let steps = vec![fast(InteractionStep::fill_literal(
            vec![target],
            "NEWSLETTER10",
        ))];
        interpreter().run(&mut page, &steps, "a@x.com").await.unwrap();
        assert_eq!(page.fills[0].1, "NEWSLETTER10");
    }

    #[tokio::test]
    async fn test_wait_step_needs_no_target() {
        let mut page = ScriptedPage::default();
        let steps = vec![InteractionStep::wait_ms(1)];
        let log = interpreter().run(&mut page, &steps, "a@x.com").await.unwrap();
        assert_eq!(log.records[0].outcome, StepOutcome::Ok);
        assert_eq!(log.records[0].chosen_candidate, None);
    }
}
