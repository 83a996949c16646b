//! Per-host robots.txt cache: fetch-and-classify rules from `spec.md`
//! §4.4, a 24h TTL, and the crawl-delay-derived politeness interval.

use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use texting_robots::Robot;
use tracing::debug;

use crawler_core::{CanonicalUrl, HostKey, RobotsPolicy};
use crawler_fetch::Fetcher;

const TTL_HOURS: i64 = 24;

struct Entry {
    robot: Option<Robot>,
    policy: RobotsPolicy,
    crawl_delay: Option<Duration>,
    fetched_at: DateTime<Utc>,
    raw: Vec<u8>,
}

/// Portable form of one cache entry, used by the snapshot. `Robot` itself
/// isn't serializable, so the raw `robots.txt` body is kept and reparsed
/// on load instead.
#[derive(Serialize, Deserialize)]
pub struct RobotsEntrySnapshot {
    pub raw: Vec<u8>,
    pub policy: RobotsPolicy,
    pub crawl_delay_secs: Option<u64>,
    pub fetched_at: DateTime<Utc>,
}

pub struct RobotsDecision {
    pub allowed: bool,
    pub crawl_delay: Option<Duration>,
}

pub struct RobotsCache {
    entries: DashMap<HostKey, Entry>,
    user_agent: String,
}

impl RobotsCache {
    pub fn new(user_agent: impl Into<String>) -> RobotsCache {
        RobotsCache { entries: DashMap::new(), user_agent: user_agent.into() }
    }

    pub fn from_snapshot(user_agent: impl Into<String>, snapshot: Vec<(HostKey, RobotsEntrySnapshot)>) -> RobotsCache {
        let cache = RobotsCache::new(user_agent);
        for (host_key, entry) in snapshot {
            let robot = if entry.policy == RobotsPolicy::Normal {
                Robot::new(&cache.user_agent, &entry.raw).ok()
            } else {
                None
            };
            cache.entries.insert(
                host_key,
                Entry {
                    robot,
                    policy: entry.policy,
                    crawl_delay: entry.crawl_delay_secs.map(Duration::from_secs),
                    fetched_at: entry.fetched_at,
                    raw: entry.raw,
                },
            );
        }
        cache
    }

    pub fn to_snapshot(&self) -> Vec<(HostKey, RobotsEntrySnapshot)> {
        self.entries
            .iter()
            .map(|kv| {
                let (host_key, entry) = kv.pair();
                (
                    host_key.clone(),
                    RobotsEntrySnapshot {
                        raw: entry.raw.clone(),
                        policy: entry.policy,
                        crawl_delay_secs: entry.crawl_delay.map(|d| d.as_secs()),
                        fetched_at: entry.fetched_at,
                    },
                )
            })
            .collect()
    }

    /// Ensures a fresh entry exists for `url`'s host, fetching and
    /// classifying `robots.txt` if the entry is missing or stale, then
    /// answers whether `url` may be fetched.
    pub async fn check(&self, fetcher: &Fetcher, url: &CanonicalUrl) -> RobotsDecision {
        let host_key = url.host_key();
        let needs_refresh = match self.entries.get(&host_key) {
            Some(entry) => Utc::now().signed_duration_since(entry.fetched_at) > chrono::Duration::hours(TTL_HOURS),
            None => true,
        };
        if needs_refresh {
            let entry = self.fetch_and_classify(fetcher, &host_key, url).await;
            self.entries.insert(host_key.clone(), entry);
        }

        let entry = self.entries.get(&host_key).expect("just inserted or already present");
        let allowed = match entry.policy {
            RobotsPolicy::AllowAll => true,
            RobotsPolicy::DisallowAll => false,
            RobotsPolicy::Normal => entry
                .robot
                .as_ref()
                .map(|r| r.allowed(&format!("{}{}", url.path(), url.query().map(|q| format!("?{q}")).unwrap_or_default())))
                .unwrap_or(true),
        };
        RobotsDecision { allowed, crawl_delay: entry.crawl_delay }
    }

    async fn fetch_and_classify(&self, fetcher: &Fetcher, host_key: &HostKey, sample_url: &CanonicalUrl) -> Entry {
        let robots_url = sample_url.robots_txt_url();
        let headers = [("accept", "text/plain,*/*")];
        let empty = |policy: RobotsPolicy| Entry { robot: None, policy, crawl_delay: None, fetched_at: Utc::now(), raw: Vec::new() };

        let response = match fetcher.fetch(&robots_url, &headers).await {
            Ok(response) => response,
            Err(_) => return empty(RobotsPolicy::DisallowAll),
        };

        match classify_status(response.status) {
            RobotsPolicy::Normal => {
                debug!(host = %host_key, "robots.txt fetched");
                match Robot::new(&self.user_agent, &response.body) {
                    Ok(robot) => {
                        let crawl_delay = robot.delay.map(|secs| Duration::from_secs(secs as u64));
                        Entry { robot: Some(robot), policy: RobotsPolicy::Normal, crawl_delay, fetched_at: Utc::now(), raw: response.body }
                    }
                    Err(_) => empty(RobotsPolicy::AllowAll),
                }
            }
            policy => empty(policy),
        }
    }
}

/// `spec.md` §4.4's terminal-state table, keyed by `robots.txt`'s HTTP
/// status: 2xx parses the body; 401/403/429/5xx disallow everything;
/// every other non-2xx allows everything.
fn classify_status(status: u16) -> RobotsPolicy {
    if (200..300).contains(&status) {
        RobotsPolicy::Normal
    } else if matches!(status, 401 | 403 | 429) || status >= 500 {
        RobotsPolicy::DisallowAll
    } else {
        RobotsPolicy::AllowAll
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_classification_matches_status_table() {
        assert_eq!(classify_status(200), RobotsPolicy::Normal);
        assert_eq!(classify_status(204), RobotsPolicy::Normal);
        assert_eq!(classify_status(404), RobotsPolicy::AllowAll);
        assert_eq!(classify_status(410), RobotsPolicy::AllowAll);
        assert_eq!(classify_status(301), RobotsPolicy::AllowAll);
        assert_eq!(classify_status(401), RobotsPolicy::DisallowAll);
        assert_eq!(classify_status(403), RobotsPolicy::DisallowAll);
        assert_eq!(classify_status(429), RobotsPolicy::DisallowAll);
        assert_eq!(classify_status(500), RobotsPolicy::DisallowAll);
        assert_eq!(classify_status(503), RobotsPolicy::DisallowAll);
    }
}
