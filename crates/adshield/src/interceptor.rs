//! Response interceptor: the per-request hook the browser host calls before
//! any request reaches the network.
//!
//! The hook is fail-open. A panic anywhere below it is caught at this
//! boundary, counted as a fault and answered with `Continue`.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::classifier::Classifier;
use crate::types::{Classification, InterceptDecision, ResourceRequest, SyntheticResponse};

/// Running totals of interception outcomes.
#[derive(Debug, Default)]
pub struct InterceptStats {
    allowed: AtomicU64,
    blocked: AtomicU64,
    faults: AtomicU64,
}

/// Point-in-time copy of [`InterceptStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InterceptStatsSnapshot {
    pub allowed: u64,
    pub blocked: u64,
    pub faults: u64,
}

impl InterceptStats {
    pub fn snapshot(&self) -> InterceptStatsSnapshot {
        InterceptStatsSnapshot {
            allowed: self.allowed.load(Ordering::Relaxed),
            blocked: self.blocked.load(Ordering::Relaxed),
            faults: self.faults.load(Ordering::Relaxed),
        }
    }
}

/// Observes every outbound request and substitutes blocked ones.
#[derive(Debug)]
pub struct ResponseInterceptor {
    classifier: Classifier,
    stats: InterceptStats,
}

impl ResponseInterceptor {
    pub fn new(classifier: Classifier) -> Self {
        Self {
            classifier,
            stats: InterceptStats::default(),
        }
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn stats(&self) -> InterceptStatsSnapshot {
        self.stats.snapshot()
    }

    /// Decide the fate of one request. Never panics, never blocks on I/O.
    pub fn on_resource_requested(&self, request: &ResourceRequest) -> InterceptDecision {
        self.intercept_with(request, |url| self.classifier.classify(url))
    }

    fn intercept_with<F>(&self, request: &ResourceRequest, classify: F) -> InterceptDecision
    where
        F: FnOnce(&str) -> Classification,
    {
        let outcome = catch_unwind(AssertUnwindSafe(|| classify(&request.url)));

        match outcome {
            Ok(Classification::Allow) => {
                self.stats.allowed.fetch_add(1, Ordering::Relaxed);
                InterceptDecision::Continue
            }
            Ok(Classification::Block { reason }) => {
                self.stats.blocked.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(
                    url = %request.url,
                    resource_type = ?request.resource_type,
                    reason = %reason,
                    "request blocked"
                );
                InterceptDecision::Fulfill(SyntheticResponse::blocked())
            }
            Err(_) => {
                self.stats.faults.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(url = %request.url, "interception fault, request allowed");
                InterceptDecision::Continue
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{RuleSet, RuleStore};
    use crate::types::ResourceType;
    use std::sync::Arc;

    fn interceptor() -> ResponseInterceptor {
        let store = Arc::new(RuleStore::new(RuleSet::builtin()));
        ResponseInterceptor::new(Classifier::new(store))
    }

    #[test]
    fn test_blocked_request_fulfilled() {
        let i = interceptor();
        let req = ResourceRequest::new("https://ads.itv.com/banner.js", ResourceType::Script);
        assert_eq!(
            i.on_resource_requested(&req),
            InterceptDecision::Fulfill(SyntheticResponse::blocked())
        );
        assert_eq!(i.stats().blocked, 1);
    }

    #[test]
    fn test_allowed_request_continues() {
        let i = interceptor();
        let req = ResourceRequest::new("https://www.itv.com/", ResourceType::Document);
        assert_eq!(i.on_resource_requested(&req), InterceptDecision::Continue);
        assert_eq!(
            i.stats(),
            InterceptStatsSnapshot {
                allowed: 1,
                blocked: 0,
                faults: 0
            }
        );
    }

    #[test]
    fn test_panic_in_classification_fails_open() {
        let i = interceptor();
        let req = ResourceRequest::new("https://ads.itv.com/x", ResourceType::Xhr);
        let decision = i.intercept_with(&req, |_| panic!("classifier exploded"));
        assert_eq!(decision, InterceptDecision::Continue);
        assert_eq!(i.stats().faults, 1);
        assert_eq!(i.stats().blocked, 0);
    }

    #[test]
    fn test_every_resource_type_is_filtered() {
        let i = interceptor();
        for rt in [
            ResourceType::Document,
            ResourceType::Stylesheet,
            ResourceType::Image,
            ResourceType::Media,
            ResourceType::Font,
            ResourceType::Script,
            ResourceType::Xhr,
            ResourceType::Fetch,
            ResourceType::WebSocket,
            ResourceType::Manifest,
            ResourceType::Other,
        ] {
            let req = ResourceRequest::new("https://pubads.g.doubleclick.net/gampad", rt);
            assert!(matches!(
                i.on_resource_requested(&req),
                InterceptDecision::Fulfill(_)
            ));
        }
        assert_eq!(i.stats().blocked, 11);
    }
}
