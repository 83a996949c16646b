//! Link harvesting: every `<a href>` without `rel="nofollow"`, resolved
//! against the page's URL and normalized, http/https only.

use kuchiki::NodeRef;

use crawler_core::{CanonicalUrl, ExtractedLink};

pub fn harvest(base_url: &CanonicalUrl, document: &NodeRef) -> Vec<ExtractedLink> {
    let Ok(matches) = document.select("a[href]") else { return Vec::new() };

    let mut links = Vec::new();
    for m in matches {
        let attrs = m.attributes.borrow();
        if attrs.get("rel").map(|rel| rel.split_whitespace().any(|tok| tok.eq_ignore_ascii_case("nofollow"))).unwrap_or(false) {
            continue;
        }
        let Some(href) = attrs.get("href") else { continue };
        let Ok(joined) = base_url.join(href) else { continue };
        links.push(ExtractedLink { url: joined.normalize() });
    }
    links
}
