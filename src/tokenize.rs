//! Search tokenizer.
//!
//! Maps a plaintext field value to the set of tokens that get hashed into
//! the index: whole words, adjacent-word bigrams, and email-address parts.
//! Pure and stateless, and shared bit-identically by the ingest and query
//! paths: any divergence between the two would silently break recall.
//!
//! No stemming, no stopwords, no Unicode folding beyond lowercasing.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap()
});

static WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\w{3,}\b").unwrap());

static FULL_EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").unwrap()
});

/// Minimum length for an email local-part or domain to be indexed on its
/// own (shorter fragments are too noisy to be useful).
const MIN_ADDRESS_PART_LEN: usize = 3;

/// Extract the searchable token set from a field value.
pub fn tokenize(text: &str) -> HashSet<String> {
    let lowered = text.to_lowercase();
    let text = lowered.trim();
    let mut tokens = HashSet::new();
    if text.is_empty() {
        return tokens;
    }

    // Email addresses first: the full address is always a token, plus the
    // local part and domain separately for partial matching.
    for m in EMAIL_RE.find_iter(text) {
        let addr = m.as_str();
        tokens.insert(addr.to_string());
        if let Some((local, domain)) = addr.split_once('@') {
            if local.len() >= MIN_ADDRESS_PART_LEN {
                tokens.insert(local.to_string());
            }
            if domain.len() >= MIN_ADDRESS_PART_LEN {
                tokens.insert(domain.to_string());
            }
        }
    }

    // Words of 3+ chars, then bigrams over the in-order word list so short
    // phrases stay searchable.
    let words: Vec<&str> = WORD_RE.find_iter(text).map(|m| m.as_str()).collect();
    for w in &words {
        tokens.insert((*w).to_string());
    }
    for pair in words.windows(2) {
        tokens.insert(format!("{}_{}", pair[0], pair[1]));
    }

    tokens
}

/// Whether the whole (trimmed) input is a single email address. Used for
/// the exact-email fast path in query planning.
pub fn is_full_email(text: &str) -> bool {
    FULL_EMAIL_RE.is_match(text.trim())
}
