//! One shared rule store wired to the interceptor and the guard injector.

use std::path::Path;
use std::sync::Arc;

use crate::classifier::Classifier;
use crate::guard::GuardInjector;
use crate::interceptor::ResponseInterceptor;
use crate::rules::{RuleSet, RuleStore};
use crate::types::ShieldResult;

/// Everything a browser host needs to filter one surface.
#[derive(Debug, Clone)]
pub struct ContentShield {
    store: Arc<RuleStore>,
    interceptor: Arc<ResponseInterceptor>,
    injector: Arc<GuardInjector>,
}

impl ContentShield {
    pub fn new(rules: RuleSet) -> Self {
        let store = Arc::new(RuleStore::new(rules));
        let interceptor = ResponseInterceptor::new(Classifier::new(Arc::clone(&store)));
        let injector = GuardInjector::new(Arc::clone(&store));
        Self {
            store,
            interceptor: Arc::new(interceptor),
            injector: Arc::new(injector),
        }
    }

    /// Shield over the rules in `path`, or the built-in rules when `None`.
    pub fn load(path: Option<&Path>) -> ShieldResult<Self> {
        let rules = match path {
            Some(path) => RuleSet::from_path(path)?,
            None => RuleSet::builtin(),
        };
        tracing::info!(
            source = %path.map(|p| p.display().to_string()).unwrap_or_else(|| "built-in".into()),
            hostnames = rules.hostnames().len(),
            path_patterns = rules.path_patterns().len(),
            selectors = rules.dom_selectors().len(),
            "rules loaded"
        );
        Ok(Self::new(rules))
    }

    pub fn store(&self) -> &Arc<RuleStore> {
        &self.store
    }

    pub fn interceptor(&self) -> Arc<ResponseInterceptor> {
        Arc::clone(&self.interceptor)
    }

    pub fn injector(&self) -> Arc<GuardInjector> {
        Arc::clone(&self.injector)
    }
}
