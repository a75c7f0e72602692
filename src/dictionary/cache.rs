use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use super::{CompiledMatcher, ConnectorEntry, MatcherOptions};
use crate::error::AnalysisResult;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MatcherKey {
    entries: Vec<ConnectorEntry>,
    options: MatcherOptions,
}

impl MatcherKey {
    fn new(entries: &[ConnectorEntry], options: MatcherOptions) -> Self {
        let mut entries = entries.to_vec();
        entries.sort();
        entries.dedup();
        Self { entries, options }
    }
}

/// Memoizes compiled matchers per selected entry set.
///
/// The key is the sorted entry set plus options, so the same selection
/// always yields the same matcher. Owned by the caller, never shared.
#[derive(Debug, Default)]
pub struct MatcherCache {
    matchers: HashMap<MatcherKey, Arc<CompiledMatcher>>,
    hits: usize,
    misses: usize,
}

impl MatcherCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_compile(
        &mut self,
        entries: &[ConnectorEntry],
        options: MatcherOptions,
    ) -> AnalysisResult<Arc<CompiledMatcher>> {
        let key = MatcherKey::new(entries, options);
        if let Some(matcher) = self.matchers.get(&key) {
            self.hits += 1;
            return Ok(Arc::clone(matcher));
        }

        self.misses += 1;
        let matcher = Arc::new(CompiledMatcher::compile(&key.entries, options)?);
        debug!(entries = key.entries.len(), cached = self.matchers.len() + 1, "matcher cache miss");
        self.matchers.insert(key, Arc::clone(&matcher));
        Ok(matcher)
    }

    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }

    /// (hits, misses)
    pub fn stats(&self) -> (usize, usize) {
        (self.hits, self.misses)
    }

    pub fn clear(&mut self) {
        self.matchers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_selection_reuses_matcher() {
        let mut cache = MatcherCache::new();
        let a = vec![
            ConnectorEntry::simple("et", "AND"),
            ConnectorEntry::simple("ou", "ALT"),
        ];
        let b = vec![
            ConnectorEntry::simple("ou", "ALT"),
            ConnectorEntry::simple("et", "AND"),
        ];

        let first = cache.get_or_compile(&a, MatcherOptions::default()).unwrap();
        let second = cache.get_or_compile(&b, MatcherOptions::default()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.stats(), (1, 1));
    }

    #[test]
    fn different_selection_or_options_recompiles() {
        let mut cache = MatcherCache::new();
        let all = vec![
            ConnectorEntry::simple("et", "AND"),
            ConnectorEntry::simple("ou", "ALT"),
        ];
        cache.get_or_compile(&all, MatcherOptions::default()).unwrap();
        cache.get_or_compile(&all[..1], MatcherOptions::default()).unwrap();
        cache
            .get_or_compile(
                &all,
                MatcherOptions {
                    case_insensitive: false,
                },
            )
            .unwrap();
        assert_eq!(cache.len(), 3);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn invalid_entries_are_not_cached() {
        let mut cache = MatcherCache::new();
        let broken = vec![ConnectorEntry::simple("", "X")];
        assert!(cache.get_or_compile(&broken, MatcherOptions::default()).is_err());
        assert!(cache.is_empty());
    }
}
