// Copyright 2026 Inscriptor Contributors
// SPDX-License-Identifier: Apache-2.0

//! Engine event bus — typed events from every component.
//!
//! The bus is a `tokio::sync::broadcast` channel carrying [`EngineEvent`]
//! values. Any consumer — REST surface, log files, a future dashboard —
//! can subscribe independently. When no subscribers exist, events are
//! silently dropped (zero overhead).

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Every event the engine emits. Serialized to JSON for streaming consumers.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EngineEvent {
    // ── Task lifecycle ────────────────────
    /// A subscription task was accepted and queued.
    TaskQueued {
        task_id: String,
        site: String,
        total: usize,
    },
    /// A task's background unit started processing.
    TaskStarted { task_id: String },
    /// A task reached a terminal status.
    TaskFinished {
        task_id: String,
        status: String,
        success: usize,
        failed: usize,
        elapsed_ms: u64,
    },

    // ── Per-email processing ──────────────
    /// One email succeeded against the target site.
    EmailProcessed { task_id: String, email: String },
    /// One email failed; the task continues with the next address.
    EmailFailed {
        task_id: String,
        email: String,
        error: String,
    },

    // ── Session lifecycle ─────────────────
    /// A browser session launched (with or without a proxy).
    SessionLaunched {
        task_id: String,
        proxy: Option<String>,
        headless: bool,
    },
    /// A browser session was released.
    SessionClosed { task_id: String },
    /// The proxy pool is empty; sessions run proxy-less.
    ProxylessMode,

    // ── Step interpretation ───────────────
    /// A step resolved a candidate target and its action succeeded.
    StepOk {
        step: usize,
        action: String,
        chosen_candidate: usize,
    },
    /// An optional step failed and was skipped.
    StepWarned {
        step: usize,
        action: String,
        message: String,
    },
    /// A required step failed, aborting the script for this email.
    StepFailed {
        step: usize,
        action: String,
        message: String,
    },
}

/// The central event bus for the engine.
///
/// All components emit events through this bus; consumers subscribe to
/// receive a stream of all of them.
pub struct EventBus {
    sender: broadcast::Sender<EngineEvent>,
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Emit an event to all subscribers. Silently ignores if no subscribers.
    pub fn emit(&self, event: EngineEvent) {
        let _ = self.sender.send(event);
    }

    /// Subscribe to receive all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
