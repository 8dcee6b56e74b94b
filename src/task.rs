// Copyright 2026 Inscriptor Contributors
// SPDX-License-Identifier: Apache-2.0

//! Subscription task orchestration.
//!
//! `submit` validates a request, creates a task record, and schedules its
//! background unit without blocking the caller; `query` reads the current
//! (possibly still-running) state. Each task's background unit owns its
//! record exclusively — the store is keyed by id with single-writer-per-key
//! discipline, so status reads never race a writer on another task.

use crate::adapter::{AdapterRegistry, SiteAdapter};
use crate::config::Config;
use crate::error::EngineError;
use crate::events::{EngineEvent, EventBus};
use crate::interpreter::Interpreter;
use crate::session::SessionManager;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{error, info};
use uuid::Uuid;

/// Lifecycle of a subscription task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

/// One batch-subscription job, tracked by id.
#[derive(Debug, Clone)]
pub struct SubscriptionTask {
    pub id: String,
    pub url: String,
    pub emails: Vec<String>,
    pub headless: bool,
    pub status: TaskStatus,
    pub success: usize,
    pub failed: usize,
    pub errors: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl SubscriptionTask {
    pub fn total(&self) -> usize {
        self.emails.len()
    }

    /// Bookkeeping invariants, checked after every email.
    fn check_invariants(&self) {
        debug_assert!(self.success + self.failed <= self.total());
        debug_assert_eq!(self.errors.len(), self.failed);
    }
}

/// Read-only view of a task, as returned by `query`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub task_id: String,
    pub status: TaskStatus,
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    pub errors: Vec<String>,
    pub url: String,
}

impl From<&SubscriptionTask> for TaskSnapshot {
    fn from(task: &SubscriptionTask) -> Self {
        Self {
            task_id: task.id.clone(),
            status: task.status,
            total: task.total(),
            success: task.success,
            failed: task.failed,
            errors: task.errors.clone(),
            url: task.url.clone(),
        }
    }
}

/// A subscription submission, as received from the CLI or REST shim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscribeRequest {
    pub url: String,
    pub emails: Vec<String>,
    /// Falls back to the configured default when unset.
    pub headless: Option<bool>,
}

/// Drives subscription tasks end to end.
pub struct Orchestrator {
    registry: Arc<AdapterRegistry>,
    sessions: Arc<SessionManager>,
    interpreter: Interpreter,
    events: Arc<EventBus>,
    config: Config,
    tasks: RwLock<HashMap<String, SubscriptionTask>>,
    /// Random source for inter-email delay jitter.
    rng: Mutex<StdRng>,
}

impl Orchestrator {
    pub fn new(
        registry: Arc<AdapterRegistry>,
        sessions: Arc<SessionManager>,
        interpreter: Interpreter,
        events: Arc<EventBus>,
        config: Config,
    ) -> Self {
        Self {
            registry,
            sessions,
            interpreter,
            events,
            config,
            tasks: RwLock::new(HashMap::new()),
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Pin the jitter RNG for reproducible delays.
    pub fn with_rng_seed(self, seed: u64) -> Self {
        *self.rng.lock().expect("rng lock poisoned") = StdRng::seed_from_u64(seed);
        self
    }

    /// Validate a submission, create its task, and schedule the background
    /// run. Returns the task id immediately; rejected submissions leave no
    /// task behind.
    pub async fn submit(self: &Arc<Self>, request: SubscribeRequest) -> Result<String, EngineError> {
        let adapter = self
            .registry
            .resolve(&request.url)
            .ok_or_else(|| EngineError::UnsupportedSite(request.url.clone()))?;

        if request.emails.is_empty() {
            return Err(EngineError::Validation(
                "at least one email address is required".to_string(),
            ));
        }
        for email in &request.emails {
            if !crate::email::is_valid_email(email) {
                return Err(EngineError::Validation(format!(
                    "invalid email address: {email}"
                )));
            }
        }

        let task = SubscriptionTask {
            id: Uuid::new_v4().to_string(),
            url: request.url.clone(),
            emails: request.emails.clone(),
            headless: request.headless.unwrap_or(self.config.headless),
            status: TaskStatus::Queued,
            success: 0,
            failed: 0,
            errors: Vec::new(),
            created_at: Utc::now(),
        };
        let task_id = task.id.clone();

        info!(
            task_id,
            site = adapter.name,
            emails = task.total(),
            "subscription task created"
        );
        self.events.emit(EngineEvent::TaskQueued {
            task_id: task_id.clone(),
            site: adapter.name.to_string(),
            total: task.total(),
        });

        self.tasks.write().await.insert(task_id.clone(), task);

        let this = Arc::clone(self);
        let id = task_id.clone();
        tokio::spawn(async move {
            this.run_task(&id).await;
        });

        Ok(task_id)
    }

    /// The registry this orchestrator routes submissions through.
    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    /// Current state of a task, running or terminal.
    pub async fn query(&self, task_id: &str) -> Result<TaskSnapshot, EngineError> {
        let tasks = self.tasks.read().await;
        tasks
            .get(task_id)
            .map(TaskSnapshot::from)
            .ok_or_else(|| EngineError::TaskNotFound(task_id.to_string()))
    }

    /// Poll a task until it reaches a terminal status.
    pub async fn wait_for(
        &self,
        task_id: &str,
        poll: Duration,
    ) -> Result<TaskSnapshot, EngineError> {
        loop {
            let snapshot = self.query(task_id).await?;
            if snapshot.status.is_terminal() {
                return Ok(snapshot);
            }
            tokio::time::sleep(poll).await;
        }
    }

    /// The background unit for one task. Processes every email sequentially,
    /// then marks the task terminal. A task always runs its full email list;
    /// `Failed` is reserved for pre-loop errors.
    async fn run_task(&self, task_id: &str) {
        let started = Instant::now();
        let Some((url, emails, headless)) = self
            .with_task(task_id, |task| {
                task.status = TaskStatus::Running;
                (task.url.clone(), task.emails.clone(), task.headless)
            })
            .await
        else {
            return;
        };
        self.events.emit(EngineEvent::TaskStarted {
            task_id: task_id.to_string(),
        });

        // The registry is static, so this re-resolution only fails if the
        // task record was tampered with; treat it as a pre-loop failure.
        let Some(adapter) = self.registry.resolve(&url).cloned() else {
            error!(task_id, url, "adapter vanished between submit and run");
            self.with_task(task_id, |task| {
                task.status = TaskStatus::Failed;
                task.errors.push(format!("Unsupported website URL: {url}"));
                task.failed = task.total();
            })
            .await;
            return;
        };

        let last = emails.len().saturating_sub(1);
        for (i, email) in emails.iter().enumerate() {
            match self.process_email(task_id, &adapter, email, headless).await {
                Ok(()) => {
                    info!(task_id, email, "email processed");
                    self.events.emit(EngineEvent::EmailProcessed {
                        task_id: task_id.to_string(),
                        email: email.clone(),
                    });
                    self.with_task(task_id, |task| {
                        task.success += 1;
                        task.check_invariants();
                    })
                    .await;
                }
                Err(e) => {
                    let message = format!("Failed to process {email}: {e}");
                    error!(task_id, "{message}");
                    self.events.emit(EngineEvent::EmailFailed {
                        task_id: task_id.to_string(),
                        email: email.clone(),
                        error: e.to_string(),
                    });
                    self.with_task(task_id, |task| {
                        task.failed += 1;
                        task.errors.push(message);
                        task.check_invariants();
                    })
                    .await;
                }
            }

            // Politeness back-off between emails, with a little jitter so
            // repeated batches don't land on the site in lockstep.
            if i < last {
                let jitter = {
                    let mut rng = self.rng.lock().expect("rng lock poisoned");
                    Duration::from_millis(rng.gen_range(0..=1_000))
                };
                tokio::time::sleep(self.config.email_delay + jitter).await;
            }
        }

        // Completed even when every email failed: per-email outcomes are
        // already itemized in the error list, and a terminal Completed tells
        // the poller the batch ran to its end.
        let (success, failed) = self
            .with_task(task_id, |task| {
                task.status = TaskStatus::Completed;
                (task.success, task.failed)
            })
            .await
            .unwrap_or((0, 0));

        info!(task_id, success, failed, "task completed");
        self.events.emit(EngineEvent::TaskFinished {
            task_id: task_id.to_string(),
            status: "completed".to_string(),
            success,
            failed,
            elapsed_ms: started.elapsed().as_millis() as u64,
        });
    }

    /// One email, one session: acquire, navigate, interpret, release. The
    /// release runs on every path once acquisition has succeeded.
    async fn process_email(
        &self,
        task_id: &str,
        adapter: &SiteAdapter,
        email: &str,
        headless: bool,
    ) -> Result<(), EngineError> {
        let mut session = self.sessions.acquire(task_id, headless).await?;

        let navigation_timeout = self.config.step_timeout.as_millis() as u64;
        let outcome = match session.navigate(adapter.homepage, navigation_timeout).await {
            Ok(()) => self
                .interpreter
                .run(session.as_mut(), &adapter.steps, email)
                .await
                .map(|log| {
                    if log.warnings() > 0 {
                        info!(task_id, email, warnings = log.warnings(), "script finished with skipped optional steps");
                    }
                }),
            Err(e) => Err(e),
        };

        self.sessions.release(task_id, session).await;
        outcome
    }

    /// Run a closure against one task record under the write lock.
    async fn with_task<R>(
        &self,
        task_id: &str,
        f: impl FnOnce(&mut SubscriptionTask) -> R,
    ) -> Option<R> {
        let mut tasks = self.tasks.write().await;
        tasks.get_mut(task_id).map(f)
    }
}
