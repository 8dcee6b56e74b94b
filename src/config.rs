//! Engine configuration sourced from the environment.
//!
//! Every knob has a documented default so the engine runs with no
//! environment at all (proxy-less, headless, short politeness delay).

use std::path::PathBuf;
use std::time::Duration;

/// Default per-step visibility/action timeout (matches the 30s budget the
/// production site scripts were tuned against).
pub const DEFAULT_STEP_TIMEOUT_MS: u64 = 30_000;

/// Default pause between two emails of the same task.
pub const DEFAULT_EMAIL_DELAY_SECS: u64 = 5;

/// Default REST listen port.
pub const DEFAULT_HTTP_PORT: u16 = 8000;

/// Runtime configuration for the subscription engine.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the newline-delimited `ip:port:username:password` proxy file.
    /// `None` means run proxy-less (degraded but functional).
    pub proxy_file: Option<PathBuf>,
    /// Default headless flag when a submission does not specify one.
    pub headless: bool,
    /// Politeness delay applied between consecutive emails of one task.
    pub email_delay: Duration,
    /// Default per-step timeout for adapters that do not override it.
    pub step_timeout: Duration,
    /// REST listen port for `inscriptor serve`.
    pub http_port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            proxy_file: None,
            headless: true,
            email_delay: Duration::from_secs(DEFAULT_EMAIL_DELAY_SECS),
            step_timeout: Duration::from_millis(DEFAULT_STEP_TIMEOUT_MS),
            http_port: DEFAULT_HTTP_PORT,
        }
    }
}

impl Config {
    /// Build a config from `INSCRIPTOR_*` environment variables, falling
    /// back to defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        Self {
            proxy_file: read_env_string("INSCRIPTOR_PROXY_FILE").map(PathBuf::from),
            headless: read_env_bool("INSCRIPTOR_HEADLESS", true),
            email_delay: Duration::from_secs(read_env_u64(
                "INSCRIPTOR_EMAIL_DELAY_SECS",
                DEFAULT_EMAIL_DELAY_SECS,
            )),
            step_timeout: Duration::from_millis(read_env_u64(
                "INSCRIPTOR_STEP_TIMEOUT_MS",
                DEFAULT_STEP_TIMEOUT_MS,
            )),
            http_port: read_env_u16("INSCRIPTOR_HTTP_PORT", DEFAULT_HTTP_PORT),
        }
    }
}

fn read_env_u64(name: &str, default_value: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default_value)
}

fn read_env_u16(name: &str, default_value: u16) -> u16 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<u16>().ok())
        .unwrap_or(default_value)
}

fn read_env_bool(name: &str, default_value: bool) -> bool {
    match std::env::var(name) {
        Ok(v) => matches!(
            v.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "y"
        ),
        Err(_) => default_value,
    }
}

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert!(cfg.proxy_file.is_none());
        assert!(cfg.headless);
        assert_eq!(cfg.email_delay, Duration::from_secs(5));
        assert_eq!(cfg.step_timeout, Duration::from_millis(30_000));
        assert_eq!(cfg.http_port, 8000);
    }

    #[test]
    fn test_out_of_range_port_falls_back() {
        // 70000 does not fit in u16; it must not wrap to 4464.
        std::env::set_var("INSCRIPTOR_TEST_PORT_RANGE", "70000");
        assert_eq!(read_env_u16("INSCRIPTOR_TEST_PORT_RANGE", 8000), 8000);
        std::env::set_var("INSCRIPTOR_TEST_PORT_RANGE", "9005");
        assert_eq!(read_env_u16("INSCRIPTOR_TEST_PORT_RANGE", 8000), 9005);
        std::env::remove_var("INSCRIPTOR_TEST_PORT_RANGE");
    }

    #[test]
    fn test_bool_parsing() {
        assert!(read_env_bool("INSCRIPTOR_TEST_UNSET_BOOL", true));
        assert!(!read_env_bool("INSCRIPTOR_TEST_UNSET_BOOL", false));
    }
}
