// Domain blocklist consulted by the inspector on every DNS query.
//
// Reads happen on the hot path; replacement comes from the control plane at
// arbitrary times. The whole set is swapped atomically so a reader always
// observes a consistent snapshot.

use std::collections::HashSet;
use std::sync::Arc;

use arc_swap::ArcSwap;

/// Normalise a domain for exact-match lookup: strip trailing dots and
/// lowercase the ASCII bytes. Applied symmetrically on insert and lookup.
pub fn normalize(domain: &str) -> String {
    domain.trim_end_matches('.').to_ascii_lowercase()
}

/// An exact-match set of blocked domains with lock-free reads and atomic
/// whole-set replacement.
pub struct PolicySet {
    domains: ArcSwap<HashSet<String>>,
}

impl PolicySet {
    pub fn new<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            domains: ArcSwap::from_pointee(Self::build(domains)),
        }
    }

    /// Whether `domain` (in any case, with or without trailing dot) is blocked.
    pub fn contains(&self, domain: &str) -> bool {
        self.domains.load().contains(&normalize(domain))
    }

    /// Replace the entire set. In-flight readers keep their old snapshot.
    pub fn replace<I, S>(&self, domains: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.domains.store(Arc::new(Self::build(domains)));
    }

    /// Current domains, unordered.
    pub fn list(&self) -> Vec<String> {
        self.domains.load().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.domains.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.load().is_empty()
    }

    fn build<I, S>(domains: I) -> HashSet<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        domains
            .into_iter()
            .map(|d| normalize(d.as_ref()))
            .filter(|d| !d.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_lowercases_and_strips_trailing_dot() {
        assert_eq!(normalize("EXAMPLE.COM."), "example.com");
        assert_eq!(normalize("example.com"), "example.com");
    }

    #[test]
    fn normalize_is_idempotent() {
        for d in ["Example.Com.", "a.b.c..", "", ".", "ADS.EXAMPLE"] {
            assert_eq!(normalize(&normalize(d)), normalize(d));
        }
    }

    #[test]
    fn contains_matches_modulo_case_and_dot() {
        let set = PolicySet::new(["Ads.Example."]);
        assert!(set.contains("ads.example"));
        assert!(set.contains("ADS.EXAMPLE."));
        assert!(!set.contains("news.example"));
        assert!(!set.contains("sub.ads.example"));
    }

    #[test]
    fn replace_swaps_whole_set() {
        let set = PolicySet::new(["old.example"]);
        assert!(set.contains("old.example"));
        set.replace(["new.example"]);
        assert!(!set.contains("old.example"));
        assert!(set.contains("new.example"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn empty_entries_are_dropped() {
        let set = PolicySet::new(["", ".", "real.example"]);
        assert_eq!(set.len(), 1);
        assert!(!set.contains(""));
    }
}
