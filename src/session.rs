//! Browser session lifecycle management.
//!
//! One session = one browser process + one page, scoped to one email.
//! `acquire` picks a proxy at random (or none when the pool is empty — a
//! degraded, non-fatal mode) and launches an isolated browser; `release`
//! must be called exactly once per successful acquire. Launch failures
//! clean up after themselves inside the engine, so no half-open session
//! ever escapes.

use crate::browser::{BrowserEngine, LaunchOptions, PageSession};
use crate::error::EngineError;
use crate::events::{EngineEvent, EventBus};
use crate::proxy::ProxyPool;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::sync::Mutex;
use tracing::{info, warn};

/// Hands out scoped browser sessions backed by the proxy pool.
pub struct SessionManager {
    engine: Arc<dyn BrowserEngine>,
    pool: Arc<ProxyPool>,
    events: Arc<EventBus>,
    /// Random source for proxy selection; seeded in tests for determinism.
    rng: Mutex<StdRng>,
}

impl SessionManager {
    pub fn new(engine: Arc<dyn BrowserEngine>, pool: Arc<ProxyPool>, events: Arc<EventBus>) -> Self {
        if pool.is_empty() {
            warn!("proxy pool is empty; sessions will run proxy-less");
            events.emit(EngineEvent::ProxylessMode);
        }
        Self {
            engine,
            pool,
            events,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Like [`new`](Self::new) but with a fixed RNG seed, so proxy picks are
    /// reproducible.
    pub fn with_seed(
        engine: Arc<dyn BrowserEngine>,
        pool: Arc<ProxyPool>,
        events: Arc<EventBus>,
        seed: u64,
    ) -> Self {
        let manager = Self::new(engine, pool, events);
        *manager.rng.lock().expect("rng lock poisoned") = StdRng::seed_from_u64(seed);
        manager
    }

    /// Launch an isolated browser session for one email.
    pub async fn acquire(
        &self,
        task_id: &str,
        headless: bool,
    ) -> Result<Box<dyn PageSession>, EngineError> {
        let proxy = {
            let mut rng = self.rng.lock().expect("rng lock poisoned");
            self.pool.pick(&mut *rng).cloned()
        };

        match &proxy {
            Some(p) => info!(task_id, proxy = %p.server_url(), headless, "launching browser"),
            None => warn!(task_id, headless, "launching browser without proxy"),
        }

        let session = self
            .engine
            .launch(&LaunchOptions { headless, proxy: proxy.clone() })
            .await?;

        self.events.emit(EngineEvent::SessionLaunched {
            task_id: task_id.to_string(),
            proxy: proxy.map(|p| p.server_url()),
            headless,
        });
        Ok(session)
    }

    /// Close a session, releasing page and browser process. Close failures
    /// are logged, never propagated — the email's outcome is already decided
    /// by the time we get here.
    pub async fn release(&self, task_id: &str, session: Box<dyn PageSession>) {
        if let Err(e) = session.close().await {
            warn!(task_id, "error closing browser session: {e}");
        }
        self.events.emit(EngineEvent::SessionClosed {
            task_id: task_id.to_string(),
        });
    }
}
