use std::collections::{HashMap, HashSet};

use triage_alert::Alert;

/// KeywordExtractor summarizes a cluster's members as a few terms.
///
/// Implementations must be deterministic for the same input.
pub trait KeywordExtractor: Send + Sync {
    fn extract(&self, members: &[&Alert]) -> Vec<String>;
}

const STOP_WORDS: &[&str] = &[
    "and", "are", "but", "for", "from", "has", "have", "into", "its", "not", "null", "of", "on",
    "the", "this", "that", "true", "false", "was", "were", "with", "you", "http", "https", "www",
];

/// Document-frequency keyword extraction over titles and payload strings.
///
/// Each member contributes a token at most once. Tokens are ranked by the
/// number of members containing them, ties broken alphabetically.
#[derive(Debug, Clone)]
pub struct FrequencyExtractor {
    /// Maximum number of keywords returned. Default: 5.
    pub max_keywords: usize,

    /// Tokens shorter than this are ignored. Default: 3.
    pub min_token_len: usize,
}

impl Default for FrequencyExtractor {
    fn default() -> Self {
        Self {
            max_keywords: 5,
            min_token_len: 3,
        }
    }
}

impl KeywordExtractor for FrequencyExtractor {
    fn extract(&self, members: &[&Alert]) -> Vec<String> {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for alert in members {
            let mut texts = Vec::new();
            if !alert.title.is_empty() {
                texts.push(alert.title.as_str());
            }
            collect_strings(&alert.data, &mut texts);

            let mut seen = HashSet::new();
            for text in texts {
                for token in tokenize(text, self.min_token_len) {
                    if seen.insert(token.clone()) {
                        *counts.entry(token).or_insert(0) += 1;
                    }
                }
            }
        }

        let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked
            .into_iter()
            .take(self.max_keywords)
            .map(|(token, _)| token)
            .collect()
    }
}

/// Collect string leaves of a JSON value. Object keys are skipped: they are
/// shared by every alert of the same source and carry no signal.
fn collect_strings<'a>(value: &'a serde_json::Value, out: &mut Vec<&'a str>) {
    match value {
        serde_json::Value::String(s) => out.push(s),
        serde_json::Value::Array(items) => {
            for item in items {
                collect_strings(item, out);
            }
        }
        serde_json::Value::Object(map) => {
            for v in map.values() {
                collect_strings(v, out);
            }
        }
        _ => {}
    }
}

/// Lowercase, split on anything but alphanumerics, '_' and '-', and drop
/// stop words, short tokens and tokens without a letter.
fn tokenize(text: &str, min_len: usize) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '_' || c == '-'))
        .map(|t| t.trim_matches(|c: char| c == '-' || c == '_'))
        .filter(|t| t.chars().count() >= min_len)
        .filter(|t| t.chars().any(char::is_alphabetic))
        .filter(|t| !STOP_WORDS.contains(t))
        .map(str::to_string)
        .collect()
}
