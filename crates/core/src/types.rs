use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::url::CanonicalUrl;

/// A completed HTTP exchange, independent of how it was fetched.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub requested_url: CanonicalUrl,
    pub final_url: CanonicalUrl,
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
    pub fetched_at: DateTime<Utc>,
}

impl FetchResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers.get(&name).map(|s| s.as_str())
    }
}

/// The robots cache's terminal classification of a host, derived from the
/// HTTP status of its `robots.txt` fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RobotsPolicy {
    /// Body parsed successfully; consult the ruleset.
    Normal,
    /// `robots.txt` absent or a 4xx other than 401/403/429: crawl freely.
    AllowAll,
    /// `robots.txt` unreachable, 401/403/429/5xx, or a redirect loop: crawl nothing.
    DisallowAll,
}

/// A link discovered while extracting a page, already canonicalized.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExtractedLink {
    pub url: CanonicalUrl,
}

/// Output of the link/language extractor for one accepted page.
#[derive(Debug, Clone)]
pub struct ExtractedPage {
    pub language: String,
    pub cleaned_html: Vec<u8>,
    pub links: Vec<ExtractedLink>,
}
