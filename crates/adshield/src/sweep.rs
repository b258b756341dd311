//! Host-side DOM sweep over serialized HTML.
//!
//! Mirrors the guard's in-page sweep for offline checks: every element that
//! matches one of the selectors is detached, everything else is kept.

use std::collections::HashSet;

use scraper::{Html, Selector};

/// Result of sweeping one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepOutcome {
    /// The document after removal, re-serialized.
    pub html: String,
    /// Number of outermost matched elements that were detached.
    pub removed: usize,
}

/// Remove all elements matching any of `selectors` from `html`.
///
/// Selectors that do not parse are skipped. An element matched by several
/// selectors, or nested inside another matched element, counts once.
pub fn sweep_html<'a, I>(html: &str, selectors: I) -> SweepOutcome
where
    I: IntoIterator<Item = &'a str>,
{
    let mut document = Html::parse_document(html);

    let mut seen = HashSet::new();
    let mut doomed = Vec::new();
    for raw in selectors {
        let selector = match Selector::parse(raw) {
            Ok(selector) => selector,
            Err(e) => {
                tracing::debug!(selector = raw, "skipping unparsable selector: {e:?}");
                continue;
            }
        };
        for element in document.select(&selector) {
            if seen.insert(element.id()) {
                doomed.push(element.id());
            }
        }
    }

    // A match inside another match goes with its ancestor.
    let top_level: Vec<_> = doomed
        .into_iter()
        .filter(|id| {
            document
                .tree
                .get(*id)
                .is_some_and(|node| !node.ancestors().any(|a| seen.contains(&a.id())))
        })
        .collect();

    for id in &top_level {
        if let Some(mut node) = document.tree.get_mut(*id) {
            node.detach();
        }
    }

    SweepOutcome {
        html: document.html(),
        removed: top_level.len(),
    }
}
