//! Site adapters — declarative per-site interaction scripts.
//!
//! An adapter describes one target site as data: its signup homepage, the
//! domain patterns that route URLs to it, and an ordered list of
//! [`InteractionStep`]s the interpreter executes uniformly. Adding a site
//! means adding one catalog entry, never a new code path.

pub mod catalog;

use serde::{Deserialize, Serialize};

/// How an element is located on the page. Candidates are tried in order;
/// the first that becomes visible within the step timeout wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Target {
    /// CSS selector, optionally picking the nth match.
    Css { selector: String, nth: usize },
    /// Accessibility-style lookup: an element role plus its accessible name.
    Role {
        role: Role,
        name: String,
        /// Exact name match instead of case-insensitive substring.
        exact: bool,
    },
}

impl Target {
    pub fn css(selector: impl Into<String>) -> Self {
        Target::Css {
            selector: selector.into(),
            nth: 0,
        }
    }

    pub fn css_nth(selector: impl Into<String>, nth: usize) -> Self {
        Target::Css {
            selector: selector.into(),
            nth,
        }
    }

    pub fn button(name: impl Into<String>) -> Self {
        Target::Role {
            role: Role::Button,
            name: name.into(),
            exact: false,
        }
    }

    pub fn button_exact(name: impl Into<String>) -> Self {
        Target::Role {
            role: Role::Button,
            name: name.into(),
            exact: true,
        }
    }

    pub fn textbox(name: impl Into<String>) -> Self {
        Target::Role {
            role: Role::Textbox,
            name: name.into(),
            exact: false,
        }
    }

    pub fn checkbox(name: impl Into<String>) -> Self {
        Target::Role {
            role: Role::Checkbox,
            name: name.into(),
            exact: false,
        }
    }

    /// Short human-readable form for logs and step records.
    pub fn describe(&self) -> String {
        match self {
            Target::Css { selector, nth: 0 } => format!("css:{selector}"),
            Target::Css { selector, nth } => format!("css:{selector}[{nth}]"),
            Target::Role { role, name, .. } => format!("{role:?}:{name}").to_lowercase(),
        }
    }
}

/// Element roles the role-based target lookup understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Button,
    Textbox,
    Checkbox,
    Link,
}

/// What a step fills into a textbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FillValue {
    /// The email address currently being processed.
    Email,
    /// A fixed string.
    Literal(String),
}

/// The action a step performs once its target resolves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepAction {
    Click,
    Fill(FillValue),
    Check,
    ScrollIntoView,
    /// Unconditional pause; has no target.
    Wait { ms: u64 },
}

impl StepAction {
    pub fn name(&self) -> &'static str {
        match self {
            StepAction::Click => "click",
            StepAction::Fill(_) => "fill",
            StepAction::Check => "check",
            StepAction::ScrollIntoView => "scroll",
            StepAction::Wait { .. } => "wait",
        }
    }
}

/// One declarative unit of UI interaction: resolve a target among fallback
/// candidates, act on it, then let the page settle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionStep {
    pub action: StepAction,
    /// Candidate targets, tried in order. Empty for `Wait`.
    pub targets: Vec<Target>,
    /// Required steps abort the script on failure; optional steps only warn.
    pub required: bool,
    /// Extra attempts after the first action failure, each with a fresh
    /// target resolution.
    pub retries: u32,
    /// Visibility-wait budget per candidate resolution pass.
    pub timeout_ms: u64,
    /// Pause after a successful action. Signup pages are JS-driven and need
    /// time to react before the next target becomes queryable.
    pub settle_ms: u64,
}

impl InteractionStep {
    fn new(action: StepAction, targets: Vec<Target>) -> Self {
        Self {
            action,
            targets,
            required: true,
            retries: 1,
            timeout_ms: crate::config::DEFAULT_STEP_TIMEOUT_MS,
            settle_ms: 1_000,
        }
    }

    pub fn click(targets: Vec<Target>) -> Self {
        Self::new(StepAction::Click, targets)
    }

    pub fn fill_email(targets: Vec<Target>) -> Self {
        Self::new(StepAction::Fill(FillValue::Email), targets)
    }

    pub fn fill_literal(targets: Vec<Target>, value: impl Into<String>) -> Self {
        Self::new(StepAction::Fill(FillValue::Literal(value.into())), targets)
    }

    pub fn check(targets: Vec<Target>) -> Self {
        Self::new(StepAction::Check, targets)
    }

    pub fn scroll(targets: Vec<Target>) -> Self {
        Self::new(StepAction::ScrollIntoView, targets)
    }

    pub fn wait_ms(ms: u64) -> Self {
        let mut step = Self::new(StepAction::Wait { ms }, Vec::new());
        step.settle_ms = 0;
        step
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn settle_ms(mut self, settle_ms: u64) -> Self {
        self.settle_ms = settle_ms;
        self
    }
}

/// Static description of one target site: homepage, routing patterns, and
/// the interaction script. Immutable and shared read-only across tasks.
#[derive(Debug, Clone)]
pub struct SiteAdapter {
    pub name: &'static str,
    pub homepage: &'static str,
    /// Substring patterns matched against the lowercased, trimmed URL, in
    /// declared order.
    pub domain_patterns: &'static [&'static str],
    pub steps: Vec<InteractionStep>,
}

/// Static table mapping target URLs to site adapters. Pure lookup, no state.
pub struct AdapterRegistry {
    adapters: Vec<SiteAdapter>,
}

impl AdapterRegistry {
    /// Registry over the built-in production site catalog.
    pub fn builtin() -> Self {
        Self {
            adapters: catalog::all(),
        }
    }

    /// Registry over an explicit adapter list (used by tests).
    pub fn with_adapters(adapters: Vec<SiteAdapter>) -> Self {
        Self { adapters }
    }

    /// Resolve a URL to the first adapter whose domain patterns match.
    pub fn resolve(&self, url: &str) -> Option<&SiteAdapter> {
        let needle = url.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        self.adapters.iter().find(|adapter| {
            adapter
                .domain_patterns
                .iter()
                .any(|pattern| needle.contains(pattern))
        })
    }

    pub fn is_supported(&self, url: &str) -> bool {
        self.resolve(url).is_some()
    }

    /// Site names in declared order.
    pub fn supported_sites(&self) -> Vec<&'static str> {
        self.adapters.iter().map(|a| a.name).collect()
    }

    /// (name, patterns) pairs for the `/sites` surface.
    pub fn site_details(&self) -> Vec<(&'static str, &'static [&'static str])> {
        self.adapters
            .iter()
            .map(|a| (a.name, a.domain_patterns))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> AdapterRegistry {
        AdapterRegistry::builtin()
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let reg = registry();
        let url = "https://techcrunch.com/newsletters/";
        let first = reg.resolve(url).map(|a| a.name);
        for _ in 0..5 {
            assert_eq!(reg.resolve(url).map(|a| a.name), first);
        }
        assert_eq!(first, Some("TechCrunch"));
    }

    #[test]
    fn test_resolve_normalizes_case_and_whitespace() {
        let reg = registry();
        let adapter = reg.resolve("  HTTPS://TechCrunch.com/Newsletters/  ").unwrap();
        assert_eq!(adapter.name, "TechCrunch");
    }

    #[test]
    fn test_resolve_unsupported() {
        let reg = registry();
        assert!(reg.resolve("https://example.com").is_none());
        assert!(!reg.is_supported("https://example.com"));
        assert!(reg.resolve("").is_none());
    }

    #[test]
    fn test_all_builtin_sites_route_via_homepage() {
        let reg = registry();
        for adapter in catalog::all() {
            let resolved = reg.resolve(adapter.homepage).unwrap();
            assert_eq!(resolved.name, adapter.name, "homepage {}", adapter.homepage);
        }
    }

    #[test]
    fn test_supported_sites_order_is_declared_order() {
        let sites = registry().supported_sites();
        assert_eq!(sites.first(), Some(&"CNN"));
        assert!(sites.contains(&"The Guardian"));
        assert_eq!(sites.len(), 12);
    }

    #[test]
    fn test_step_builder_defaults() {
        let step = InteractionStep::click(vec![Target::button("Sign Up")]);
        assert!(step.required);
        assert_eq!(step.retries, 1);
        assert_eq!(step.timeout_ms, crate::config::DEFAULT_STEP_TIMEOUT_MS);

        let optional = InteractionStep::check(vec![Target::css(".consent")])
            .optional()
            .timeout_ms(5_000)
            .settle_ms(0);
        assert!(!optional.required);
        assert_eq!(optional.timeout_ms, 5_000);
    }

    #[test]
    fn test_target_describe() {
        assert_eq!(Target::css("#signup").describe(), "css:#signup");
        assert_eq!(Target::css_nth("label", 2).describe(), "css:label[2]");
        assert_eq!(Target::button("Sign Up").describe(), "button:sign up");
    }
}
