//! Essential-token extraction
//!
//! An essential token is a word of inscription text that is at least two
//! characters long and contains no lowercase Cyrillic letter. Ordinary
//! lowercase Russian prose is filtered out; names, acronyms written in
//! capitals and Latin text are kept as written.

use std::collections::BTreeSet;

const TRAILING_PUNCTUATION: &[char] = &['.', ',', ':', ';', '!', '?'];
const QUOTES: &[char] = &['"', '«', '»', '„', '“', '”', '\''];

// Cyrillic and Cyrillic Supplement blocks
fn is_lowercase_cyrillic(c: char) -> bool {
    c.is_lowercase() && matches!(c, '\u{0400}'..='\u{052F}')
}

/// Cleaned token, `None` when the word is not essential
fn essential(word: &str) -> Option<String> {
    let cleaned: String = word.chars().filter(|c| *c != '"').collect();
    let cleaned = cleaned
        .trim_start_matches(QUOTES)
        .trim_end_matches(|c| TRAILING_PUNCTUATION.contains(&c) || QUOTES.contains(&c));

    if cleaned.chars().count() < 2 || cleaned.chars().any(is_lowercase_cyrillic) {
        return None;
    }
    Some(cleaned.to_string())
}

/// Every word of `text` in order, `None` where the word is not essential
fn scan(text: &str) -> Vec<Option<String>> {
    text.split_whitespace().map(essential).collect()
}

/// Distinct essential tokens of `text`
pub fn extract_tokens(text: &str) -> BTreeSet<String> {
    scan(text).into_iter().flatten().collect()
}

/// Distinct phrases of `text`: maximal runs of two or more consecutive
/// essential tokens, joined by one space
pub fn extract_phrases(text: &str) -> BTreeSet<String> {
    let mut phrases = BTreeSet::new();
    let mut run: Vec<String> = Vec::new();

    for token in scan(text).into_iter().chain(std::iter::once(None)) {
        match token {
            Some(token) => run.push(token),
            None => {
                if run.len() >= 2 {
                    phrases.insert(run.join(" "));
                }
                run.clear();
            }
        }
    }

    phrases
}
