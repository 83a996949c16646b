//! The frontier: URLs not yet fetched, bucketed by host. Grounded on
//! `original_source/crawler/bucketset.py`'s `BucketSet` — in particular
//! its `key_difference`, which `keys_except` here is a direct port of.

use std::collections::{HashMap, HashSet};

use dashmap::DashMap;

use crawler_core::{CanonicalUrl, HostKey};

pub struct Frontier {
    buckets: DashMap<HostKey, HashSet<CanonicalUrl>>,
}

impl Default for Frontier {
    fn default() -> Self {
        Frontier::new()
    }
}

impl Frontier {
    pub fn new() -> Frontier {
        Frontier { buckets: DashMap::new() }
    }

    /// Returns `true` if `url` was not already present.
    pub fn insert(&self, url: CanonicalUrl) -> bool {
        let host_key = url.host_key();
        self.buckets.entry(host_key).or_default().insert(url)
    }

    pub fn insert_many(&self, urls: impl IntoIterator<Item = CanonicalUrl>) {
        for url in urls {
            self.insert(url);
        }
    }

    pub fn remove(&self, url: &CanonicalUrl) -> bool {
        let host_key = url.host_key();
        let Some(mut bucket) = self.buckets.get_mut(&host_key) else { return false };
        let removed = bucket.remove(url);
        if bucket.is_empty() {
            drop(bucket);
            self.buckets.remove(&host_key);
        }
        removed
    }

    pub fn contains(&self, url: &CanonicalUrl) -> bool {
        self.buckets.get(&url.host_key()).map(|b| b.contains(url)).unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.buckets.iter().map(|b| b.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every frontier URL whose host key is not in `blocked`, materialized
    /// fresh on each call — the frontier keeps no secondary index for it.
    pub fn keys_except(&self, blocked: &HashSet<HostKey>) -> Vec<CanonicalUrl> {
        self.buckets
            .iter()
            .filter(|entry| !blocked.contains(entry.key()))
            .flat_map(|entry| entry.value().clone().into_iter())
            .collect()
    }

    pub fn to_snapshot(&self) -> HashMap<HostKey, HashSet<CanonicalUrl>> {
        self.buckets.iter().map(|entry| (entry.key().clone(), entry.value().clone())).collect()
    }

    pub fn from_snapshot(data: HashMap<HostKey, HashSet<CanonicalUrl>>) -> Frontier {
        let buckets = DashMap::new();
        for (host_key, urls) in data {
            buckets.insert(host_key, urls);
        }
        Frontier { buckets }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> CanonicalUrl {
        CanonicalUrl::parse(s).unwrap()
    }

    #[test]
    fn keys_except_skips_blocked_hosts() {
        let frontier = Frontier::new();
        frontier.insert(url("https://a.test/1"));
        frontier.insert(url("https://b.test/1"));

        let mut blocked = HashSet::new();
        blocked.insert(url("https://a.test/1").host_key());

        let remaining = frontier.keys_except(&blocked);
        assert_eq!(remaining, vec![url("https://b.test/1")]);
    }

    #[test]
    fn insert_remove_roundtrip() {
        let frontier = Frontier::new();
        assert!(frontier.insert(url("https://a.test/1")));
        assert!(!frontier.insert(url("https://a.test/1")));
        assert!(frontier.contains(&url("https://a.test/1")));
        assert!(frontier.remove(&url("https://a.test/1")));
        assert!(!frontier.contains(&url("https://a.test/1")));
        assert!(frontier.is_empty());
    }

    #[test]
    fn snapshot_round_trip() {
        let frontier = Frontier::new();
        frontier.insert(url("https://a.test/1"));
        frontier.insert(url("https://b.test/2"));
        let snapshot = frontier.to_snapshot();
        let restored = Frontier::from_snapshot(snapshot);
        assert_eq!(restored.len(), 2);
        assert!(restored.contains(&url("https://a.test/1")));
    }
}
