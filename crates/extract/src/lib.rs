pub mod language;
pub mod links;
pub mod sanitize;

use kuchiki::traits::TendrilSink;

use crawler_core::{CanonicalUrl, ExtractedLink, ExtractedPage, FetchResponse, SkipReason};
use language::LanguageModel;

const ACCEPTED_LANGUAGES: &[&str] = &["en", "de"];

pub struct Extractor {
    language_model: LanguageModel,
}

impl Extractor {
    pub fn new(language_model_path: &str) -> anyhow::Result<Extractor> {
        Ok(Extractor { language_model: LanguageModel::load(language_model_path)? })
    }

    /// The header guards `spec.md` requires before the body is ever
    /// parsed: content-type, content-language, and `X-Robots-Tag`.
    pub fn check_headers(response: &FetchResponse) -> Result<(), SkipReason> {
        let content_type = response.header("content-type").unwrap_or("");
        if !content_type.trim_start().to_ascii_lowercase().starts_with("text/html") {
            return Err(SkipReason::WrongContentType);
        }

        match response.header("content-language") {
            None => {}
            Some(value) => {
                let lowered = value.to_ascii_lowercase();
                let has_accepted = lowered
                    .split(|c: char| !c.is_ascii_alphanumeric())
                    .any(|tok| tok == "en" || tok == "de");
                if !has_accepted {
                    return Err(SkipReason::WrongContentLanguage);
                }
            }
        }

        if let Some(tag) = response.header("x-robots-tag") {
            if tag.to_ascii_lowercase().contains("nofollow") {
                return Err(SkipReason::NofollowHeader);
            }
        }

        Ok(())
    }

    /// Parses, sanitizes, checks language, and harvests links from one
    /// accepted page's body.
    pub fn extract(&self, base_url: &CanonicalUrl, body: &[u8]) -> Result<ExtractedPage, SkipReason> {
        let html = String::from_utf8_lossy(body);
        if html.trim().is_empty() {
            return Err(SkipReason::ParseFailure);
        }

        let document = kuchiki::parse_html().one(html.as_ref());
        sanitize::sanitize(&document);

        let language = self.language_model.detect(&document).ok_or(SkipReason::ParseFailure)?;
        if !ACCEPTED_LANGUAGES.contains(&language.as_str()) {
            return Err(SkipReason::WrongLanguage(language));
        }

        let links = links::harvest(base_url, &document);
        let cleaned_html = document.to_string().into_bytes();

        Ok(ExtractedPage { language, cleaned_html, links })
    }
}

/// Harvests links from an already-accepted, already-cleaned stored
/// document, with no language re-check — used to reconstruct the
/// frontier from the document store on a restart with no snapshot
/// (`spec.md` §6).
pub fn harvest_links(base_url: &CanonicalUrl, body: &[u8]) -> Vec<ExtractedLink> {
    let html = String::from_utf8_lossy(body);
    if html.trim().is_empty() {
        return Vec::new();
    }
    let document = kuchiki::parse_html().one(html.as_ref());
    links::harvest(base_url, &document)
}
