//! The crawler's URL value: host, optional non-default port, a
//! percent-normalized path with dot-segments resolved, and an optional
//! query string. Always rendered as `https://...` — `http` is promoted
//! to `https` at rest, fragments and userinfo never survive `parse`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::InvalidUrl;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CanonicalUrl {
    host: String,
    port: Option<u16>,
    path: String,
    query: Option<String>,
}

/// `(host, port)` — the unit of all per-host accounting: in-flight set,
/// cooldown map, robots cache, frontier bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HostKey {
    pub host: String,
    pub port: Option<u16>,
}

impl fmt::Display for HostKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.port {
            Some(p) => write!(f, "{}:{}", self.host, p),
            None => write!(f, "{}", self.host),
        }
    }
}

fn is_unreserved(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~')
}

/// Decode percent-triplets whose byte is unreserved, uppercase the hex of
/// the rest, and percent-encode any literal non-ASCII byte found as-is in
/// the input (e.g. a raw UTF-8 path segment).
fn renormalize_percent(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '%' && i + 2 < chars.len() && chars[i + 1].is_ascii_hexdigit() && chars[i + 2].is_ascii_hexdigit() {
            let hex: String = [chars[i + 1], chars[i + 2]].iter().collect();
            let byte = u8::from_str_radix(&hex, 16).expect("validated hex digits");
            if is_unreserved(byte) {
                out.push(byte as char);
            } else {
                out.push('%');
                out.push_str(&hex.to_ascii_uppercase());
            }
            i += 3;
        } else if c.is_ascii() {
            out.push(c);
            i += 1;
        } else {
            let mut buf = [0u8; 4];
            for b in c.encode_utf8(&mut buf).as_bytes() {
                out.push_str(&format!("%{:02X}", b));
            }
            i += 1;
        }
    }
    out
}

/// RFC 3986 §5.2.4 `remove_dot_segments`, specialized to paths that always
/// start with `/` (true of every path this crate ever constructs).
fn remove_dot_segments(path: &str) -> String {
    let trailing_slash = path.len() > 1 && path.ends_with('/');
    let mut stack: Vec<&str> = Vec::new();
    for seg in path.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                stack.pop();
            }
            s => stack.push(s),
        }
    }
    let mut result = String::from("/");
    result.push_str(&stack.join("/"));
    if trailing_slash && !result.ends_with('/') {
        result.push('/');
    }
    result
}

fn has_scheme(s: &str) -> bool {
    match s.find(':') {
        None => false,
        Some(idx) => {
            let scheme = &s[..idx];
            !scheme.is_empty()
                && scheme.chars().next().unwrap().is_ascii_alphabetic()
                && scheme.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
    }
}

impl CanonicalUrl {
    pub fn parse(s: &str) -> Result<CanonicalUrl, InvalidUrl> {
        let cleaned: String = s
            .chars()
            .filter(|c| !(c.is_ascii_control() || c.is_whitespace()))
            .collect();

        let idx = cleaned.find(':').ok_or_else(|| InvalidUrl::Scheme(cleaned.clone()))?;
        let scheme = cleaned[..idx].to_ascii_lowercase();
        if scheme != "http" && scheme != "https" {
            return Err(InvalidUrl::Scheme(scheme));
        }

        let rest = &cleaned[idx + 1..];
        let rest = rest
            .strip_prefix("//")
            .ok_or_else(|| InvalidUrl::Host("missing authority".to_string()))?;

        let authority_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
        let authority = &rest[..authority_end];
        let remainder = &rest[authority_end..];

        let authority = match authority.rfind('@') {
            Some(i) => &authority[i + 1..],
            None => authority,
        };
        if authority.is_empty() {
            return Err(InvalidUrl::Host(authority.to_string()));
        }

        let (host_part, port_part) = match authority.rfind(':') {
            Some(i) if !authority[i + 1..].is_empty() && authority[i + 1..].chars().all(|c| c.is_ascii_digit()) => {
                (&authority[..i], Some(&authority[i + 1..]))
            }
            _ => (authority, None),
        };
        if host_part.is_empty() {
            return Err(InvalidUrl::Host(host_part.to_string()));
        }
        let host = host_part.to_ascii_lowercase();

        let port: Option<u16> = match port_part {
            None => None,
            Some(p) => {
                let n: u16 = p.parse().map_err(|_| InvalidUrl::Port(p.to_string()))?;
                if n == 80 || n == 443 {
                    None
                } else {
                    Some(n)
                }
            }
        };

        let path_and_query = match remainder.find('#') {
            Some(i) => &remainder[..i],
            None => remainder,
        };
        let (raw_path, raw_query) = match path_and_query.find('?') {
            Some(i) => (&path_and_query[..i], Some(&path_and_query[i + 1..])),
            None => (path_and_query, None),
        };

        let path = if raw_path.is_empty() { "/".to_string() } else { raw_path.to_string() };
        let path = renormalize_percent(&path);
        let path = remove_dot_segments(&path);

        let query = raw_query.filter(|q| !q.is_empty()).map(|q| renormalize_percent(q));

        Ok(CanonicalUrl { host, port, path, query })
    }

    /// Stronger canonical form: trailing slash dropped (root excepted),
    /// query tokens sorted lexically.
    pub fn normalize(&self) -> CanonicalUrl {
        let mut path = self.path.clone();
        if path.len() > 1 && path.ends_with('/') {
            path.pop();
        }
        let query = self.query.as_ref().map(|q| {
            let mut tokens: Vec<&str> = q.split('&').collect();
            tokens.sort_unstable();
            tokens.join("&")
        });
        CanonicalUrl { host: self.host.clone(), port: self.port, path, query }
    }

    /// Resolve a possibly-relative reference against this URL per RFC 3986
    /// §5, then run it back through `parse`/normalization.
    pub fn join(&self, reference: &str) -> Result<CanonicalUrl, InvalidUrl> {
        let cleaned: String = reference
            .chars()
            .filter(|c| !(c.is_ascii_control() || c.is_whitespace()))
            .collect();
        let reference = cleaned.as_str();

        if has_scheme(reference) {
            return CanonicalUrl::parse(reference);
        }
        if let Some(rest) = reference.strip_prefix("//") {
            return CanonicalUrl::parse(&format!("https://{}", rest));
        }
        if reference.starts_with('/') {
            return CanonicalUrl::parse(&format!("https://{}{}", self.authority(), reference));
        }
        if let Some(query) = reference.strip_prefix('?') {
            return CanonicalUrl::parse(&format!("https://{}{}?{}", self.authority(), self.path, query));
        }
        if !reference.is_empty() {
            let cut = self.path.rfind('/').map(|i| i + 1).unwrap_or(0);
            let merged = format!("{}{}", &self.path[..cut], reference);
            return CanonicalUrl::parse(&format!("https://{}{}", self.authority(), merged));
        }
        Err(InvalidUrl::Host("empty reference".to_string()))
    }

    pub fn host_key(&self) -> HostKey {
        HostKey { host: self.host.clone(), port: self.port }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// `/robots.txt` for this URL's host, dropping path and query.
    pub fn robots_txt_url(&self) -> CanonicalUrl {
        CanonicalUrl { host: self.host.clone(), port: self.port, path: "/robots.txt".to_string(), query: None }
    }

    fn authority(&self) -> String {
        match self.port {
            Some(p) => format!("{}:{}", self.host, p),
            None => self.host.clone(),
        }
    }
}

impl fmt::Display for CanonicalUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "https://{}", self.authority())?;
        write!(f, "{}", self.path)?;
        if let Some(q) = &self.query {
            write!(f, "?{}", q)?;
        }
        Ok(())
    }
}

impl std::str::FromStr for CanonicalUrl {
    type Err = InvalidUrl;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CanonicalUrl::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_a_userinfo_port_fragment_query() {
        let u = CanonicalUrl::parse("http://user@Example.COM:443/%7Efoo?b=2&a=1#x").unwrap();
        assert_eq!(u.host(), "example.com");
        assert_eq!(u.port, None);
        assert_eq!(u.path(), "/~foo");
        assert_eq!(u.query(), Some("b=2&a=1"));
        assert_eq!(u.normalize().query(), Some("a=1&b=2"));
    }

    #[test]
    fn scenario_b_dot_segments() {
        let u = CanonicalUrl::parse("http://example.com/foo/./b/baz/../").unwrap();
        assert_eq!(u.path(), "/foo/b/");
    }

    #[test]
    fn scenario_c_bad_scheme() {
        assert_eq!(CanonicalUrl::parse("ftp://x"), Err(InvalidUrl::Scheme("ftp".to_string())));
    }

    #[test]
    fn scenario_d_absolute_path_join() {
        let base = CanonicalUrl::parse("https://foo.com/bar/baz").unwrap();
        let joined = base.join("/q").unwrap();
        assert_eq!(joined.to_string(), "https://foo.com/q");
    }

    #[test]
    fn non_default_port_is_preserved() {
        let u = CanonicalUrl::parse("http://foo.com:123").unwrap();
        assert_eq!(u.port, Some(123));
        assert_eq!(u.to_string(), "https://foo.com:123/");
    }

    #[test]
    fn join_table() {
        let cases = [
            ("https://foo.com/bar", "http://bar.com/foo", "https://bar.com/foo"),
            ("https://foo.com/bar", "//bar.com/foo", "https://bar.com/foo"),
            ("https://foo.com/bar/baz", "/foo", "https://foo.com/foo"),
            ("https://foo.com/foo/bar", "foo", "https://foo.com/foo/foo"),
            ("https://foo.com/foo/bar/", "foo", "https://foo.com/foo/bar/foo"),
            ("https://foo.com/", "foo", "https://foo.com/foo"),
            ("https://foo.com/bar", "?abc", "https://foo.com/bar?abc"),
        ];
        for (base, reference, expected) in cases {
            let base = CanonicalUrl::parse(base).unwrap();
            let joined = base.join(reference).unwrap();
            assert_eq!(joined.to_string(), expected, "joining {reference:?} against {base}");
        }
    }

    #[test]
    fn from_string_table() {
        let cases = [
            ("http://user@example.com/foo?a=b#c", "https://example.com/foo?a=b"),
            ("http://example.com/foo%2a", "https://example.com/foo%2A"),
            ("http://Example.COM/Foo", "https://example.com/Foo"),
            ("http://example.com/%7Efoo", "https://example.com/~foo"),
            ("http://example.com/%41foo", "https://example.com/Afoo"),
            ("http://example.com/foo/./b/baz/../", "https://example.com/foo/b/"),
            ("http://example.com", "https://example.com/"),
            ("http://example.com:443/", "https://example.com/"),
            ("http://example.com/display?", "https://example.com/display"),
            ("http://example.com/h\u{e4}ll\u{f6}", "https://example.com/h%C3%A4ll%C3%B6"),
        ];
        for (input, expected) in cases {
            assert_eq!(CanonicalUrl::parse(input).unwrap().to_string(), expected, "parsing {input:?}");
        }
    }

    #[test]
    fn invalid_url_table() {
        assert!(matches!(CanonicalUrl::parse("ftp://foo.com"), Err(InvalidUrl::Scheme(_))));
        assert!(matches!(CanonicalUrl::parse("javascript:alert(1)"), Err(InvalidUrl::Scheme(_))));
        assert!(matches!(CanonicalUrl::parse("/foo.html"), Err(InvalidUrl::Scheme(_))));
        assert!(matches!(CanonicalUrl::parse("https:///foo.html"), Err(InvalidUrl::Host(_))));
    }

    #[test]
    fn normalize_strips_trailing_slash_and_sorts_query() {
        let u = CanonicalUrl::parse("https://example.com/foo/").unwrap();
        assert_eq!(u.normalize().to_string(), "https://example.com/foo");
        let u = CanonicalUrl::parse("https://example.com/display?lang=en&article=fred").unwrap();
        assert_eq!(u.normalize().to_string(), "https://example.com/display?article=fred&lang=en");
    }

    #[test]
    fn normalize_keeps_root_slash() {
        let u = CanonicalUrl::parse("https://example.com/").unwrap();
        assert_eq!(u.normalize().to_string(), "https://example.com/");
    }

    proptest::proptest! {
        #[test]
        fn normalize_is_idempotent(host in "[a-z]{1,10}", segment in "[a-z]{0,10}") {
            let raw = format!("https://{host}.test/{segment}/");
            if let Ok(u) = CanonicalUrl::parse(&raw) {
                let once = u.normalize();
                let twice = once.normalize();
                proptest::prop_assert_eq!(once, twice);
            }
        }

        #[test]
        fn render_then_parse_round_trips(host in "[a-z]{1,10}", segment in "[a-z]{0,10}", query in "[a-z]{0,8}") {
            let raw = if query.is_empty() {
                format!("https://{host}.test/{segment}")
            } else {
                format!("https://{host}.test/{segment}?{query}")
            };
            if let Ok(u) = CanonicalUrl::parse(&raw) {
                let n = u.normalize();
                let rendered = n.to_string();
                let reparsed = CanonicalUrl::parse(&rendered).unwrap().normalize();
                proptest::prop_assert_eq!(n, reparsed);
            }
        }
    }
}
