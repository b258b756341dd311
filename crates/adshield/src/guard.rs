//! Page-load guard script.
//!
//! The guard is a fixed script template (`guard.js`) that receives its rules
//! as a single JSON object literal. It freezes known ad-controller globals,
//! wraps `fetch` and `XMLHttpRequest.prototype.open` so calls to hooked hosts
//! go nowhere, and sweeps ad containers out of the DOM on an interval.
//!
//! Everything inside the guard is wrapped in `try` blocks so a failure stays
//! in the page's own script context. Running it twice in one page is safe.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::rules::{RuleSet, RuleStore};

const GUARD_TEMPLATE: &str = include_str!("guard.js");

/// Token in the template replaced by the serialized [`GuardConfig`].
const CONFIG_PLACEHOLDER: &str = "__ADSHIELD_CONFIG__";

/// The rule subset the in-page guard needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardConfig {
    pub ad_globals: Vec<String>,
    pub script_hook_hosts: Vec<String>,
    pub dom_selectors: Vec<String>,
    pub sweep_interval_ms: u64,
}

impl GuardConfig {
    pub fn from_rules(rules: &RuleSet) -> Self {
        Self {
            ad_globals: rules.ad_globals().to_vec(),
            script_hook_hosts: rules.script_hook_hosts().iter().cloned().collect(),
            dom_selectors: rules.dom_selectors().iter().cloned().collect(),
            sweep_interval_ms: rules.sweep_interval_ms(),
        }
    }

    /// Render the guard script for this configuration.
    pub fn render(&self) -> String {
        // Serializing plain strings and integers cannot fail; fall back to an
        // inert config rather than a broken script.
        let json = serde_json::to_string(self).unwrap_or_else(|e| {
            tracing::warn!("guard config serialization failed: {e}");
            r#"{"adGlobals":[],"scriptHookHosts":[],"domSelectors":[],"sweepIntervalMs":500}"#
                .to_string()
        });
        GUARD_TEMPLATE.replacen(CONFIG_PLACEHOLDER, &json, 1)
    }
}

/// Produces the guard script for each completed navigation.
#[derive(Debug, Clone)]
pub struct GuardInjector {
    store: Arc<RuleStore>,
}

impl GuardInjector {
    pub fn new(store: Arc<RuleStore>) -> Self {
        Self { store }
    }

    /// Script to execute in the page that just finished navigating.
    ///
    /// Built from the snapshot current at call time, so a replaced ruleset
    /// applies from the next navigation on.
    pub fn script_for_navigation(&self) -> String {
        GuardConfig::from_rules(&self.store.snapshot()).render()
    }
}
