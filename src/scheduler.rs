//! The scheduler: one cooperative tick loop per `spec.md` §4.7, using
//! `tokio::task::JoinSet` for "spawn up to `N_INFLIGHT`, wait for at
//! least one to finish" — the `run()` form the spec's Design Notes
//! recommend over a worker-pool/condvar model.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use tokio::task::JoinSet;
use tracing::{debug, info};

use crawler_core::{CanonicalUrl, HostKey, SkipReason};
use crawler_extract::Extractor;
use crawler_fetch::Fetcher;
use crawler_frontier::Frontier;
use crawler_robots::RobotsCache;
use crawler_store::{collapse_newline_runs, Storage};

use crate::snapshot::Snapshot;

const DEFAULT_HEADERS: [(&str, &str); 2] = [("accept", "text/html"), ("accept-language", "de,en")];

pub struct Scheduler {
    frontier: Frontier,
    robots: Arc<RobotsCache>,
    cooldowns: Arc<DashMap<HostKey, chrono::DateTime<Utc>>>,
    fetcher: Arc<Fetcher>,
    extractor: Arc<Extractor>,
    store: Storage,
    max_inflight: usize,
    stop: Arc<AtomicBool>,
}

struct TaskOutcome {
    host_key: HostKey,
    links: Vec<CanonicalUrl>,
}

impl Scheduler {
    pub fn new(
        frontier: Frontier,
        robots: RobotsCache,
        cooldowns: std::collections::HashMap<HostKey, chrono::DateTime<Utc>>,
        fetcher: Fetcher,
        extractor: Extractor,
        store: Storage,
        max_inflight: usize,
    ) -> Scheduler {
        let cooldown_map = DashMap::new();
        for (k, v) in cooldowns {
            cooldown_map.insert(k, v);
        }
        Scheduler {
            frontier,
            robots: Arc::new(robots),
            cooldowns: Arc::new(cooldown_map),
            fetcher: Arc::new(fetcher),
            extractor: Arc::new(extractor),
            store,
            max_inflight,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    /// Runs ticks until `stop()` is observed, then drains all in-flight
    /// tasks to completion (never cancels them) before returning.
    pub async fn run(&self) {
        let mut inflight_hosts: HashSet<HostKey> = HashSet::new();
        let mut tasks: JoinSet<TaskOutcome> = JoinSet::new();

        loop {
            if self.stop.load(Ordering::Relaxed) {
                break;
            }

            let blocked: HashSet<HostKey> = inflight_hosts
                .iter()
                .cloned()
                .chain(self.cooldowns.iter().filter(|e| *e.value() > Utc::now()).map(|e| e.key().clone()))
                .collect();

            let mut candidates = self.frontier.keys_except(&blocked);
            candidates.truncate(self.max_inflight.saturating_sub(inflight_hosts.len()));

            for url in candidates {
                let host_key = url.host_key();
                if inflight_hosts.contains(&host_key) {
                    continue;
                }
                self.frontier.remove(&url);
                inflight_hosts.insert(host_key.clone());

                let fetcher = self.fetcher.clone();
                let extractor = self.extractor.clone();
                let store = self.store.clone();
                let robots = self.robots.clone();
                let cooldowns = self.cooldowns.clone();
                tasks.spawn(process(host_key, url, fetcher, extractor, store, robots, cooldowns));
            }

            if tasks.is_empty() {
                // Nothing in flight and nothing eligible: wait briefly for
                // a cooldown to expire rather than busy-spinning.
                tokio::time::sleep(Duration::from_millis(100)).await;
                continue;
            }

            if let Some(Ok(outcome)) = tasks.join_next().await {
                inflight_hosts.remove(&outcome.host_key);
                self.merge_links(outcome.links).await;
            }
        }

        while let Some(result) = tasks.join_next().await {
            if let Ok(outcome) = result {
                self.merge_links(outcome.links).await;
            }
        }
    }

    async fn merge_links(&self, links: Vec<CanonicalUrl>) {
        for link in links {
            if self.store.exists(&link.to_string()).await.unwrap_or(false) {
                continue;
            }
            self.frontier.insert(link);
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            frontier: self.frontier.to_snapshot(),
            robots: self.robots.to_snapshot(),
            cooldowns: self.cooldowns.iter().map(|e| (e.key().clone(), *e.value())).collect(),
        }
    }

    pub fn frontier(&self) -> &Frontier {
        &self.frontier
    }
}

/// One host's worth of work for this tick: `spec.md` §4.7 steps a-i, plus
/// the before-fetch visited check the Design Notes add on top of the
/// lettered list.
async fn process(
    host_key: HostKey,
    url: CanonicalUrl,
    fetcher: Arc<Fetcher>,
    extractor: Arc<Extractor>,
    store: Storage,
    robots: Arc<RobotsCache>,
    cooldowns: Arc<DashMap<HostKey, chrono::DateTime<Utc>>>,
) -> TaskOutcome {
    match process_inner(&url, &fetcher, &extractor, &store, &robots, &cooldowns).await {
        Ok(links) => TaskOutcome { host_key, links },
        Err((reason, requeue)) => {
            info!(url = %url, reason = %reason, "skip");
            TaskOutcome { host_key, links: requeue }
        }
    }
}

/// `Err` carries the skip reason plus any link that must still be
/// re-enqueued despite the skip — used only for cross-host redirects.
async fn process_inner(
    url: &CanonicalUrl,
    fetcher: &Fetcher,
    extractor: &Extractor,
    store: &Storage,
    robots: &RobotsCache,
    cooldowns: &DashMap<HostKey, chrono::DateTime<Utc>>,
) -> Result<Vec<CanonicalUrl>, (SkipReason, Vec<CanonicalUrl>)> {
    // Visited short-circuit, checked before the fetch using the request URL.
    if store.exists(&url.to_string()).await.unwrap_or(false) {
        return Err((SkipReason::AlreadyStored, Vec::new()));
    }

    // (a) can_fetch
    let decision = robots.check(fetcher, url).await;

    // (b) record the host's cooldown before fetching, so a disallowed or
    // failed fetch still pays the crawl-delay it learned about.
    if let Some(delay) = decision.crawl_delay {
        cooldowns.insert(url.host_key(), Utc::now() + chrono::Duration::from_std(delay).unwrap_or_default());
    }

    if !decision.allowed {
        return Err((SkipReason::RobotsDisallow, Vec::new()));
    }

    // (c) fetch
    let response = fetcher
        .fetch(url, &DEFAULT_HEADERS)
        .await
        .map_err(|e| {
            let reason = match e {
                crawler_fetch::FetchError::Transient(msg) => SkipReason::TransientExhausted(msg),
                crawler_fetch::FetchError::Fatal(msg) => SkipReason::FatalTransport(msg),
            };
            (reason, Vec::new())
        })?;

    // (d) a cross-host redirect is re-enqueued under its final URL, never
    // indexed under it here.
    if response.final_url.host_key() != url.host_key() {
        return Err((SkipReason::CrossHostRedirect, vec![response.final_url]));
    }

    if !(200..300).contains(&response.status) {
        return Err((SkipReason::HttpStatus(response.status), Vec::new()));
    }

    // (e) header guards
    Extractor::check_headers(&response).map_err(|reason| (reason, Vec::new()))?;

    // (f) visited short-circuit, checked again using the final URL.
    if store.exists(&response.final_url.to_string()).await.unwrap_or(false) {
        return Err((SkipReason::AlreadyStored, Vec::new()));
    }

    // (g) parse, clean, language check
    let page = extractor.extract(&response.final_url, &response.body).map_err(|reason| (reason, Vec::new()))?;

    // (h) serialize, collapse newline runs, upsert
    let cleaned = collapse_newline_runs(&page.cleaned_html);
    store
        .upsert(&response.final_url.to_string(), &cleaned)
        .await
        .map_err(|_| (SkipReason::ParseFailure, Vec::new()))?;

    debug!(url = %response.final_url, language = %page.language, "accepted");

    // (i) return harvested links
    Ok(page.links.into_iter().map(|l| l.url).collect())
}
