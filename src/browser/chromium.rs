//! Chromium backend using chromiumoxide.
//!
//! One browser process per session, located through CDP and driven with
//! injected JavaScript. All selector and text values are sanitized before
//! they enter a JS string literal.

use super::{ActionError, BrowserEngine, LaunchOptions, PageSession};
use crate::adapter::{Role, Target};
use crate::error::EngineError;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// Binaries a hand-unpacked Chromium build would leave under
/// `~/.inscriptor/chromium/`. There is no bundled installer, so only the
/// flat unpack layouts are probed.
fn local_install_candidates(home: &std::path::Path) -> Vec<PathBuf> {
    let root = home.join(".inscriptor").join("chromium");
    vec![root.join("chrome-linux64").join("chrome"), root.join("chrome")]
}

/// Find the Chromium binary path: env override, local unpack, system PATH,
/// then the stock macOS install location.
pub fn find_chromium() -> Option<PathBuf> {
    if let Ok(p) = std::env::var("INSCRIPTOR_CHROMIUM_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    if let Some(home) = dirs::home_dir() {
        for c in local_install_candidates(&home) {
            if c.exists() {
                return Some(c);
            }
        }
    }

    for name in [
        "google-chrome",
        "google-chrome-stable",
        "chromium",
        "chromium-browser",
    ] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    if cfg!(target_os = "macos") {
        let common =
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// Chromium-backed browser engine. Holds only the resolved executable path;
/// each [`launch`](BrowserEngine::launch) starts a fresh process.
pub struct ChromiumEngine {
    executable: PathBuf,
}

impl ChromiumEngine {
    /// Create an engine, resolving the Chromium binary once.
    pub fn new() -> Result<Self, EngineError> {
        let executable = find_chromium().ok_or_else(|| {
            EngineError::SessionLaunch(
                "Chromium not found; set INSCRIPTOR_CHROMIUM_PATH or install google-chrome"
                    .to_string(),
            )
        })?;
        Ok(Self { executable })
    }

    pub fn with_executable(executable: PathBuf) -> Self {
        Self { executable }
    }
}

#[async_trait]
impl BrowserEngine for ChromiumEngine {
    async fn launch(&self, opts: &LaunchOptions) -> Result<Box<dyn PageSession>, EngineError> {
        let mut builder = BrowserConfig::builder()
            .chrome_executable(&self.executable)
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-background-networking");

        if opts.headless {
            builder = builder.arg("--headless=new");
        } else {
            builder = builder.with_head();
        }

        if let Some(proxy) = &opts.proxy {
            // Chromium takes the credentials as URL userinfo for HTTP
            // proxies that accept them inline.
            builder = builder.arg(format!(
                "--proxy-server=http://{}:{}@{}:{}",
                proxy.username, proxy.password, proxy.host, proxy.port
            ));
        }

        let config = builder
            .build()
            .map_err(|e| EngineError::SessionLaunch(format!("browser config: {e}")))?;

        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| EngineError::SessionLaunch(format!("launch: {e}")))?;

        // Drive the CDP event stream; the loop ends when the browser closes.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(p) => p,
            Err(e) => {
                // Partial acquisition: the process is up but unusable.
                let _ = browser.close().await;
                handler_task.abort();
                return Err(EngineError::SessionLaunch(format!("new page: {e}")));
            }
        };

        debug!("chromium session launched (headless={})", opts.headless);

        Ok(Box::new(ChromiumSession {
            browser,
            page,
            handler_task,
        }))
    }
}

/// One Chromium process with its single page.
pub struct ChromiumSession {
    browser: Browser,
    page: Page,
    handler_task: tokio::task::JoinHandle<()>,
}

impl ChromiumSession {
    async fn eval_action(&self, script: String) -> Result<(), ActionError> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| ActionError(format!("evaluate: {e}")))?;

        let value: serde_json::Value = result
            .into_value()
            .map_err(|e| ActionError(format!("result decode: {e:?}")))?;

        let success = value
            .get("success")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        if success {
            Ok(())
        } else {
            let reason = value
                .get("reason")
                .and_then(|v| v.as_str())
                .unwrap_or("element not found");
            Err(ActionError(reason.to_string()))
        }
    }
}

#[async_trait]
impl PageSession for ChromiumSession {
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<(), EngineError> {
        let nav = tokio::time::timeout(Duration::from_millis(timeout_ms), self.page.goto(url))
            .await;
        match nav {
            Ok(Ok(_)) => {
                let _ = self.page.wait_for_navigation().await;
                Ok(())
            }
            Ok(Err(e)) => Err(EngineError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            }),
            Err(_) => Err(EngineError::Navigation {
                url: url.to_string(),
                message: format!("timed out after {timeout_ms}ms"),
            }),
        }
    }

    async fn is_visible(&mut self, target: &Target) -> Result<bool, ActionError> {
        let script = format!(
            r#"(() => {{
                {locate}
                if (!el) return false;
                const rect = el.getBoundingClientRect();
                if (rect.width === 0 || rect.height === 0) return false;
                const style = getComputedStyle(el);
                return style.visibility !== 'hidden' && style.display !== 'none';
            }})()"#,
            locate = locate_snippet(target)
        );
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| ActionError(format!("evaluate: {e}")))?;
        result
            .into_value::<bool>()
            .map_err(|e| ActionError(format!("result decode: {e:?}")))
    }

    async fn click(&mut self, target: &Target) -> Result<(), ActionError> {
        self.eval_action(format!(
            r#"(() => {{
                {locate}
                if (!el) return {{ success: false, reason: 'not found' }};
                el.scrollIntoView({{ block: 'center' }});
                el.click();
                return {{ success: true }};
            }})()"#,
            locate = locate_snippet(target)
        ))
        .await
    }

    async fn fill(&mut self, target: &Target, value: &str) -> Result<(), ActionError> {
        self.eval_action(format!(
            r#"(() => {{
                {locate}
                if (!el) return {{ success: false, reason: 'not found' }};
                el.focus();
                el.value = '{value}';
                el.dispatchEvent(new Event('input', {{ bubbles: true }}));
                el.dispatchEvent(new Event('change', {{ bubbles: true }}));
                return {{ success: true }};
            }})()"#,
            locate = locate_snippet(target),
            value = sanitize_js_string(value)
        ))
        .await
    }

    async fn check(&mut self, target: &Target) -> Result<(), ActionError> {
        self.eval_action(format!(
            r#"(() => {{
                {locate}
                if (!el) return {{ success: false, reason: 'not found' }};
                if (el.checked !== true) {{
                    el.click();
                    if (el.checked !== true && 'checked' in el) {{
                        el.checked = true;
                        el.dispatchEvent(new Event('change', {{ bubbles: true }}));
                    }}
                }}
                return {{ success: true }};
            }})()"#,
            locate = locate_snippet(target)
        ))
        .await
    }

    async fn scroll_into_view(&mut self, target: &Target) -> Result<(), ActionError> {
        self.eval_action(format!(
            r#"(() => {{
                {locate}
                if (!el) return {{ success: false, reason: 'not found' }};
                el.scrollIntoView({{ block: 'center', behavior: 'instant' }});
                return {{ success: true }};
            }})()"#,
            locate = locate_snippet(target)
        ))
        .await
    }

    async fn close(mut self: Box<Self>) -> Result<(), ActionError> {
        let _ = self.page.close().await;
        let _ = self.browser.close().await;
        self.handler_task.abort();
        Ok(())
    }
}

/// JS statements that bind `el` to the target's element (or null).
fn locate_snippet(target: &Target) -> String {
    match target {
        Target::Css { selector, nth } => format!(
            "const el = document.querySelectorAll('{}')[{nth}] || null;",
            sanitize_js_string(selector)
        ),
        Target::Role { role, name, exact } => format!(
            r#"const candidates = Array.from(document.querySelectorAll('{selectors}'));
            const wanted = '{name}';
            const accName = (e) => ((e.getAttribute('aria-label') || '') ||
                ((e.labels && e.labels.length) ? e.labels[0].textContent : '') ||
                (e.placeholder || '') || (e.value || '') || (e.textContent || '')).trim();
            const el = candidates.find(e => {exact}
                ? accName(e) === wanted
                : accName(e).toLowerCase().includes(wanted.toLowerCase())) || null;"#,
            selectors = role_selectors(*role),
            name = sanitize_js_string(name),
            exact = if *exact { "true" } else { "false" },
        ),
    }
}

/// CSS selectors that approximate an ARIA role query.
fn role_selectors(role: Role) -> &'static str {
    match role {
        Role::Button => {
            "button, [role=\"button\"], input[type=\"submit\"], input[type=\"button\"]"
        }
        Role::Textbox => {
            "input:not([type]), input[type=\"text\"], input[type=\"email\"], textarea, [role=\"textbox\"]"
        }
        Role::Checkbox => "input[type=\"checkbox\"], [role=\"checkbox\"], label",
        Role::Link => "a, [role=\"link\"]",
    }
}

/// Sanitize a string for safe injection into a JS string literal.
///
/// Escapes everything that could break out of the string context and strips
/// null bytes; angle brackets are hex-escaped so a reflected value can never
/// close a script tag.
fn sanitize_js_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 8);
    for ch in s.chars() {
        match ch {
            '\\' => result.push_str("\\\\"),
            '\'' => result.push_str("\\'"),
            '"' => result.push_str("\\\""),
            '`' => result.push_str("\\`"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            '\0' => {}
            '<' => result.push_str("\\x3c"),
            '>' => result.push_str("\\x3e"),
            _ => result.push(ch),
        }
    }
    result
}
