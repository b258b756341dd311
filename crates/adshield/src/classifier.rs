//! Request classifier: decides whether a request URL is advertising.
//!
//! Classification is a pure function of the URL and a ruleset snapshot. It
//! never fails: anything that cannot be parsed or inspected is allowed.

use std::sync::Arc;

use url::Url;

use crate::rules::{RuleSet, RuleStore};
use crate::types::{BlockReason, Classification, ShieldResult};

/// Classifies request URLs against the store's current snapshot.
#[derive(Debug, Clone)]
pub struct Classifier {
    store: Arc<RuleStore>,
}

impl Classifier {
    pub fn new(store: Arc<RuleStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<RuleStore> {
        &self.store
    }

    /// Classify one request URL.
    pub fn classify(&self, request_url: &str) -> Classification {
        classify_with(&self.store.snapshot(), request_url)
    }
}

/// Classify `request_url` against `rules`, defaulting to `Allow` on any error.
pub fn classify_with(rules: &RuleSet, request_url: &str) -> Classification {
    match try_classify(rules, request_url) {
        Ok(classification) => classification,
        Err(e) => {
            tracing::debug!(error = %e, "unclassifiable request allowed");
            Classification::Allow
        }
    }
}

fn try_classify(rules: &RuleSet, request_url: &str) -> ShieldResult<Classification> {
    let url = Url::parse(request_url)?;

    if let Some(host) = url.host_str() {
        let host = host.trim_end_matches('.').to_ascii_lowercase();
        if let Some(rule) = matching_host_rule(rules, &host) {
            return Ok(Classification::Block {
                reason: BlockReason::Hostname {
                    rule: rule.to_string(),
                },
            });
        }
    }

    // Opaque URLs (data:, about:, javascript:) have no path to inspect.
    if !url.cannot_be_a_base() {
        let path = url.path();
        if let Some(pattern) = rules.path_patterns().iter().find(|p| p.matches(path)) {
            return Ok(Classification::Block {
                reason: BlockReason::PathPattern {
                    contains: pattern.contains.clone(),
                    ends_with: pattern.ends_with.clone(),
                },
            });
        }
    }

    Ok(Classification::Allow)
}

/// The blocked hostname that `host` equals or is a subdomain of.
///
/// Only whole dot-delimited labels are compared: `notads.example.com` does not
/// match `ads.example.com`.
pub fn matching_host_rule<'a>(rules: &'a RuleSet, host: &str) -> Option<&'a str> {
    let hostnames = rules.hostnames();
    if hostnames.is_empty() || host.is_empty() {
        return None;
    }

    let mut candidate = host;
    loop {
        if let Some(rule) = hostnames.get(candidate) {
            return Some(rule.as_str());
        }
        match candidate.find('.') {
            Some(idx) => candidate = &candidate[idx + 1..],
            None => return None,
        }
    }
}
