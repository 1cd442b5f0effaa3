// Copyright (c) the tagvm authors.
// Licensed under the MIT License.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use crate::tag::Tag;

use super::policy::MatchPolicy;

#[derive(Debug, Clone)]
struct MatchBinEntry<T> {
    tag: T,
    regulator: f64,
}

/// Regulated approximate-match store.
///
/// Owns one `(tag, regulator)` pair per module id plus ranked-result caches
/// keyed by query tag. Caches hold the full ranked candidate list; queries
/// slice off the requested prefix. Any mutation of the entry set invalidates
/// both caches; regulator writes invalidate only the regulated cache (raw
/// rankings ignore regulators by definition).
pub struct MatchBin<T: Tag, M: MatchPolicy<T>> {
    policy: M,
    entries: BTreeMap<usize, MatchBinEntry<T>>,
    regulated_cache: BTreeMap<T, Vec<usize>>,
    raw_cache: BTreeMap<T, Vec<usize>>,
}

impl<T: Tag, M: MatchPolicy<T>> MatchBin<T, M> {
    pub fn new(policy: M) -> Self {
        Self {
            policy,
            entries: BTreeMap::new(),
            regulated_cache: BTreeMap::new(),
            raw_cache: BTreeMap::new(),
        }
    }

    /// Remove all entries and cached rankings.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.regulated_cache.clear();
        self.raw_cache.clear();
    }

    /// Register (or replace) the tag for a module id. The regulator resets to
    /// neutral.
    pub fn set(&mut self, id: usize, tag: T) {
        self.entries.insert(
            id,
            MatchBinEntry {
                tag,
                regulator: 0.0,
            },
        );
        self.regulated_cache.clear();
        self.raw_cache.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn policy(&self) -> &M {
        &self.policy
    }

    /// Tag registered for a module id.
    pub fn tag_of(&self, id: usize) -> Option<&T> {
        self.entries.get(&id).map(|e| &e.tag)
    }

    /// Up to `n` module ids ordered by regulated similarity to `query`.
    pub fn match_n(&mut self, query: &T, n: usize) -> Vec<usize> {
        if !self.regulated_cache.contains_key(query) {
            let ranked = self.rank(query, true);
            self.regulated_cache.insert(query.clone(), ranked);
        }
        self.regulated_cache[query].iter().take(n).copied().collect()
    }

    /// Up to `n` module ids ordered by raw similarity, ignoring regulators.
    pub fn match_raw(&mut self, query: &T, n: usize) -> Vec<usize> {
        if !self.raw_cache.contains_key(query) {
            let ranked = self.rank(query, false);
            self.raw_cache.insert(query.clone(), ranked);
        }
        self.raw_cache[query].iter().take(n).copied().collect()
    }

    /// Set a module's regulator. Unknown ids are ignored.
    pub fn set_regulator(&mut self, id: usize, value: f64) {
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.regulator = value;
            self.regulated_cache.clear();
        }
    }

    /// Add `delta` to a module's regulator. Unknown ids are ignored.
    pub fn adj_regulator(&mut self, id: usize, delta: f64) {
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.regulator += delta;
            self.regulated_cache.clear();
        }
    }

    /// A module's regulator, or neutral for unknown ids.
    pub fn view_regulator(&self, id: usize) -> f64 {
        self.entries.get(&id).map_or(0.0, |e| e.regulator)
    }

    fn rank(&self, query: &T, regulated: bool) -> Vec<usize> {
        let mut scored: Vec<(f64, usize)> = self
            .entries
            .iter()
            .filter_map(|(&id, entry)| {
                let raw = self.policy.distance(query, &entry.tag);
                let score = if regulated {
                    self.policy.regulate(raw, entry.regulator)
                } else {
                    raw
                };
                self.policy.accepts(score).then_some((score, id))
            })
            .collect();
        scored.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        scored.into_iter().map(|(_, id)| id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matchbin::HammingPolicy;
    use crate::tag::BitTag;
    use alloc::vec;

    type Tag16 = BitTag<16>;

    fn store_with_tags(tags: &[u128]) -> MatchBin<Tag16, HammingPolicy> {
        let mut bin = MatchBin::new(HammingPolicy::default());
        for (id, &bits) in tags.iter().enumerate() {
            bin.set(id, Tag16::new(bits));
        }
        bin
    }

    #[test]
    fn ranks_by_similarity_with_id_tie_break() {
        let mut bin = store_with_tags(&[0b1111, 0b0001, 0b0001]);
        let hits = bin.match_n(&Tag16::new(0b0000), 3);
        // ids 1 and 2 are equally distant; ascending id wins the tie.
        assert_eq!(hits, vec![1, 2, 0]);
    }

    #[test]
    fn match_n_truncates_to_request() {
        let mut bin = store_with_tags(&[0b1111, 0b0001, 0b0011]);
        assert_eq!(bin.match_n(&Tag16::new(0), 1).len(), 1);
        assert_eq!(bin.match_n(&Tag16::new(0), 10).len(), 3);
    }

    #[test]
    fn positive_regulator_down_weights_a_module() {
        let mut bin = store_with_tags(&[0b0000, 0b0001]);
        let query = Tag16::new(0b0000);
        assert_eq!(bin.match_n(&query, 1), vec![0]);
        bin.set_regulator(0, 1.0);
        assert_eq!(bin.match_n(&query, 1), vec![1]);
        bin.set_regulator(0, 0.0);
        assert_eq!(bin.match_n(&query, 1), vec![0]);
    }

    #[test]
    fn negative_regulator_up_weights_a_module() {
        let mut bin = store_with_tags(&[0b0000, 0b0001]);
        let query = Tag16::new(0b0000);
        bin.adj_regulator(1, -1.0);
        assert_eq!(bin.match_n(&query, 2), vec![1, 0]);
        assert_eq!(bin.view_regulator(1), -1.0);
    }

    #[test]
    fn raw_match_ignores_regulators() {
        let mut bin = store_with_tags(&[0b0000, 0b0001]);
        let query = Tag16::new(0b0000);
        bin.set_regulator(0, 100.0);
        assert_eq!(bin.match_raw(&query, 1), vec![0]);
        assert_eq!(bin.match_n(&query, 1), vec![1]);
    }

    #[test]
    fn cached_results_match_recomputation() {
        let mut bin = store_with_tags(&[0b1010, 0b0110, 0b1100, 0b0000]);
        let query = Tag16::new(0b1000);
        let first = bin.match_n(&query, 4);
        // Second query is served from the cache.
        assert_eq!(bin.match_n(&query, 4), first);
        // Direct recomputation agrees with the cached ranking.
        assert_eq!(bin.rank(&query, true), first);
    }

    #[test]
    fn regulator_writes_invalidate_the_regulated_cache() {
        let mut bin = store_with_tags(&[0b0000, 0b0001]);
        let query = Tag16::new(0b0000);
        assert_eq!(bin.match_n(&query, 2), vec![0, 1]);
        bin.adj_regulator(0, 10.0);
        assert_eq!(bin.match_n(&query, 2), vec![1, 0]);
    }

    #[test]
    fn threshold_excludes_far_candidates() {
        let mut bin = MatchBin::new(HammingPolicy::with_threshold(0.25));
        bin.set(0, Tag16::new(0x0000));
        bin.set(1, Tag16::new(0xffff));
        let hits = bin.match_n(&Tag16::new(0x0000), 2);
        assert_eq!(hits, vec![0]);
    }

    #[test]
    fn unknown_regulator_ids_are_ignored() {
        let mut bin = store_with_tags(&[0b0000]);
        bin.set_regulator(42, 3.0);
        bin.adj_regulator(42, 3.0);
        assert_eq!(bin.view_regulator(42), 0.0);
    }
}
