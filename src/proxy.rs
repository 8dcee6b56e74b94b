//! Proxy credential pool.
//!
//! Loaded once at startup from a newline-delimited `ip:port:username:password`
//! file and immutable thereafter. Selection is uniform-random through a
//! caller-supplied RNG so tests can pin the pick.

use rand::Rng;
use std::path::Path;
use tracing::{info, warn};

/// One outbound proxy, as parsed from the pool file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyCredential {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

impl ProxyCredential {
    /// The `--proxy-server` value handed to Chromium.
    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

/// Immutable set of proxy credentials.
#[derive(Debug, Default)]
pub struct ProxyPool {
    proxies: Vec<ProxyCredential>,
}

impl ProxyPool {
    /// An empty pool: every session runs proxy-less.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load a pool from a proxy file, skipping blank and malformed lines.
    ///
    /// A missing or unreadable file yields an empty pool — degraded but
    /// non-fatal, matching the engine's proxy-less mode.
    pub fn load(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                warn!("could not read proxy file {}: {e}", path.display());
                return Self::empty();
            }
        };
        let pool = Self::parse(&content);
        info!("loaded {} proxies from {}", pool.len(), path.display());
        pool
    }

    /// Parse `ip:port:username:password` records from text.
    pub fn parse(content: &str) -> Self {
        let proxies = content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .filter_map(parse_line)
            .collect();
        Self { proxies }
    }

    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }

    /// Pick a proxy uniformly at random, or `None` if the pool is empty.
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&ProxyCredential> {
        if self.proxies.is_empty() {
            return None;
        }
        let idx = rng.gen_range(0..self.proxies.len());
        self.proxies.get(idx)
    }
}

/// Parse one record. Lines with the wrong field count or a non-numeric
/// port are skipped silently.
fn parse_line(line: &str) -> Option<ProxyCredential> {
    let parts: Vec<&str> = line.split(':').collect();
    if parts.len() != 4 {
        return None;
    }
    let port = parts[1].parse::<u16>().ok()?;
    Some(ProxyCredential {
        host: parts[0].to_string(),
        port,
        username: parts[2].to_string(),
        password: parts[3].to_string(),
    })
}
