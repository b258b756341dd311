//! AdShield: request classification, response interception and page guard
//! scripts for an ad-suppressing browser shell.

pub mod classifier;
pub mod guard;
pub mod interceptor;
pub mod rules;
pub mod shield;
pub mod sweep;
pub mod types;

pub use classifier::{classify_with, matching_host_rule, Classifier};
pub use guard::{GuardConfig, GuardInjector};
pub use interceptor::{InterceptStats, InterceptStatsSnapshot, ResponseInterceptor};
pub use rules::{PathPattern, RuleDocument, RuleSet, RuleStore};
pub use shield::ContentShield;
pub use sweep::{sweep_html, SweepOutcome};
pub use types::*;
