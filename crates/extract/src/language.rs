//! Language guess: a `lang` attribute wins outright; otherwise a fastText
//! model scores a window of body text centered near the document's first
//! third, exactly as `original_source/crawler/utils.py`'s `get_lang` does.

use fasttext::FastText;
use kuchiki::NodeRef;

const WINDOW_START_OFFSET: usize = 512;
const WINDOW_LEN: usize = 1023;

pub struct LanguageModel {
    model: FastText,
}

impl LanguageModel {
    pub fn load(model_path: &str) -> anyhow::Result<LanguageModel> {
        let mut model = FastText::new();
        model.load_model(model_path).map_err(|e| anyhow::anyhow!("loading language model: {e}"))?;
        Ok(LanguageModel { model })
    }

    pub fn detect(&self, document: &NodeRef) -> Option<String> {
        if let Some(lang) = lang_attribute(document) {
            return Some(lang);
        }
        let text = body_text(document);
        self.predict_window(&text)
    }

    fn predict_window(&self, text: &str) -> Option<String> {
        let chars: Vec<char> = text.chars().collect();
        let start = (chars.len() / 3).saturating_sub(WINDOW_START_OFFSET);
        let end = (start + WINDOW_LEN).min(chars.len());
        let window: String = chars[start..end].iter().collect();
        if window.trim().is_empty() {
            return None;
        }
        let predictions = self.model.predict(&window, 1, 0.0).ok()?;
        predictions.into_iter().next().map(|p| p.label.trim_start_matches("__label__").to_string())
    }
}

fn lang_attribute(document: &NodeRef) -> Option<String> {
    let matches = document.select("[lang]").ok()?;
    for m in matches {
        let attrs = m.attributes.borrow();
        if let Some(lang) = attrs.get("lang") {
            let primary = lang.split('-').next().unwrap_or(lang).to_ascii_lowercase();
            if !primary.is_empty() {
                return Some(primary);
            }
        }
    }
    None
}

fn body_text(document: &NodeRef) -> String {
    let raw = match document.select_first("body") {
        Ok(body) => body.text_contents(),
        Err(()) => document.text_contents(),
    };
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}
