//! Rule store: the blocking ruleset and its swappable snapshot.
//!
//! Rules travel as a plain JSON document ([`RuleDocument`]) and become an
//! immutable [`RuleSet`] only after normalization and validation. The
//! [`RuleStore`] hands out `Arc` snapshots, so replacing the ruleset never
//! disturbs a classification that already took one.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Arc, RwLock};

use scraper::Selector;
use serde::{Deserialize, Serialize};

use crate::types::{ShieldError, ShieldResult};

/// Ruleset compiled into the binary, used when no rules file is configured.
const BUILTIN_RULES_JSON: &str = include_str!("builtin_rules.json");

/// Default period of the in-page DOM sweep.
pub const DEFAULT_SWEEP_INTERVAL_MS: u64 = 500;

/// Block a request whose path contains `contains` and ends with `ends_with`.
///
/// Both checks are plain, case-sensitive substring tests. A short `contains`
/// such as `"ad"` also matches words like `broadcast`; that is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathPattern {
    #[serde(default)]
    pub contains: String,
    #[serde(default)]
    pub ends_with: String,
}

impl PathPattern {
    pub fn new(contains: impl Into<String>, ends_with: impl Into<String>) -> Self {
        Self {
            contains: contains.into(),
            ends_with: ends_with.into(),
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        path.contains(&self.contains) && path.ends_with(&self.ends_with)
    }
}

/// Serialized form of a ruleset, as read from or written to disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleDocument {
    pub hostnames: Vec<String>,
    pub path_patterns: Vec<PathPattern>,
    pub dom_selectors: Vec<String>,
    pub script_hook_hosts: Vec<String>,
    pub ad_globals: Vec<String>,
    pub sweep_interval_ms: u64,
}

impl Default for RuleDocument {
    fn default() -> Self {
        Self {
            hostnames: Vec::new(),
            path_patterns: Vec::new(),
            dom_selectors: Vec::new(),
            script_hook_hosts: Vec::new(),
            ad_globals: Vec::new(),
            sweep_interval_ms: DEFAULT_SWEEP_INTERVAL_MS,
        }
    }
}

impl RuleDocument {
    /// Normalize and validate into an immutable ruleset.
    pub fn into_rules(self) -> ShieldResult<RuleSet> {
        if self.sweep_interval_ms == 0 {
            return Err(ShieldError::InvalidRules(
                "sweep_interval_ms must be greater than zero".into(),
            ));
        }

        let hostnames = normalize_hosts(self.hostnames, "hostnames")?;
        let script_hook_hosts = normalize_hosts(self.script_hook_hosts, "script_hook_hosts")?;
        for host in &script_hook_hosts {
            if !hostnames.contains(host) {
                tracing::warn!(host = %host, "script hook host is not a blocked hostname");
            }
        }

        let mut path_patterns: Vec<PathPattern> = Vec::with_capacity(self.path_patterns.len());
        for pattern in self.path_patterns {
            if pattern.contains.is_empty() && pattern.ends_with.is_empty() {
                return Err(ShieldError::InvalidRules(
                    "path pattern with empty `contains` and `ends_with` would match every path"
                        .into(),
                ));
            }
            if !path_patterns.contains(&pattern) {
                path_patterns.push(pattern);
            }
        }

        let mut dom_selectors = BTreeSet::new();
        for raw in self.dom_selectors {
            let selector = raw.trim();
            if selector.is_empty() {
                continue;
            }
            if Selector::parse(selector).is_err() {
                return Err(ShieldError::InvalidSelector(selector.to_string()));
            }
            dom_selectors.insert(selector.to_string());
        }

        let mut ad_globals = Vec::new();
        for raw in self.ad_globals {
            let name = raw.trim();
            if !name.is_empty() && !ad_globals.iter().any(|g| g == name) {
                ad_globals.push(name.to_string());
            }
        }

        Ok(RuleSet {
            hostnames,
            path_patterns,
            dom_selectors,
            script_hook_hosts,
            ad_globals,
            sweep_interval_ms: self.sweep_interval_ms,
        })
    }
}

fn normalize_hosts(raw: Vec<String>, field: &str) -> ShieldResult<BTreeSet<String>> {
    let mut hosts = BTreeSet::new();
    for entry in raw {
        let host = entry.trim().trim_matches('.').to_ascii_lowercase();
        if host.is_empty() {
            continue;
        }
        if host
            .chars()
            .any(|c| c.is_whitespace() || c == '/' || c == ':')
        {
            return Err(ShieldError::InvalidRules(format!(
                "{field}: {entry:?} is not a bare hostname"
            )));
        }
        hosts.insert(host);
    }
    Ok(hosts)
}

/// Immutable, validated blocking rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSet {
    hostnames: BTreeSet<String>,
    path_patterns: Vec<PathPattern>,
    dom_selectors: BTreeSet<String>,
    script_hook_hosts: BTreeSet<String>,
    ad_globals: Vec<String>,
    sweep_interval_ms: u64,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            hostnames: BTreeSet::new(),
            path_patterns: Vec::new(),
            dom_selectors: BTreeSet::new(),
            script_hook_hosts: BTreeSet::new(),
            ad_globals: Vec::new(),
            sweep_interval_ms: DEFAULT_SWEEP_INTERVAL_MS,
        }
    }
}

impl RuleSet {
    /// The ruleset shipped with the shell.
    pub fn builtin() -> Self {
        // The embedded document is covered by tests; an empty ruleset is the
        // fail-open fallback.
        Self::from_json_str(BUILTIN_RULES_JSON).unwrap_or_else(|e| {
            tracing::warn!("built-in rules rejected: {e}");
            Self::default()
        })
    }

    pub fn from_json_str(json: &str) -> ShieldResult<Self> {
        let document: RuleDocument = serde_json::from_str(json)?;
        document.into_rules()
    }

    pub fn from_path(path: &Path) -> ShieldResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Plain-data form of this ruleset.
    pub fn to_document(&self) -> RuleDocument {
        RuleDocument {
            hostnames: self.hostnames.iter().cloned().collect(),
            path_patterns: self.path_patterns.clone(),
            dom_selectors: self.dom_selectors.iter().cloned().collect(),
            script_hook_hosts: self.script_hook_hosts.iter().cloned().collect(),
            ad_globals: self.ad_globals.clone(),
            sweep_interval_ms: self.sweep_interval_ms,
        }
    }

    pub fn hostnames(&self) -> &BTreeSet<String> {
        &self.hostnames
    }

    pub fn path_patterns(&self) -> &[PathPattern] {
        &self.path_patterns
    }

    pub fn dom_selectors(&self) -> &BTreeSet<String> {
        &self.dom_selectors
    }

    pub fn script_hook_hosts(&self) -> &BTreeSet<String> {
        &self.script_hook_hosts
    }

    pub fn ad_globals(&self) -> &[String] {
        &self.ad_globals
    }

    pub fn sweep_interval_ms(&self) -> u64 {
        self.sweep_interval_ms
    }

    pub fn is_empty(&self) -> bool {
        self.hostnames.is_empty()
            && self.path_patterns.is_empty()
            && self.dom_selectors.is_empty()
            && self.script_hook_hosts.is_empty()
            && self.ad_globals.is_empty()
    }
}

/// Shared holder of the current ruleset snapshot.
#[derive(Debug)]
pub struct RuleStore {
    current: RwLock<Arc<RuleSet>>,
}

impl RuleStore {
    pub fn new(rules: RuleSet) -> Self {
        Self {
            current: RwLock::new(Arc::new(rules)),
        }
    }

    /// The ruleset in force right now.
    pub fn snapshot(&self) -> Arc<RuleSet> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Swap in a new ruleset and return the one it replaced.
    pub fn replace(&self, rules: RuleSet) -> Arc<RuleSet> {
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        std::mem::replace(&mut *guard, Arc::new(rules))
    }

    /// Load `path` and swap it in. On error the current ruleset stays live.
    pub fn reload_from(&self, path: &Path) -> ShieldResult<Arc<RuleSet>> {
        let rules = RuleSet::from_path(path)?;
        tracing::info!(
            path = %path.display(),
            hostnames = rules.hostnames().len(),
            selectors = rules.dom_selectors().len(),
            "rules reloaded"
        );
        let rules = Arc::new(rules);
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        *guard = Arc::clone(&rules);
        Ok(rules)
    }
}

impl Default for RuleStore {
    fn default() -> Self {
        Self::new(RuleSet::default())
    }
}
