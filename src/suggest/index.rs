use std::collections::BTreeSet;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;

use super::prefix_map::PrefixMap;

/// Category used for candidates that don't name one.
pub const DEFAULT_CATEGORY: &str = "Miscellaneous";

lazy_static! {
    // Letters, digits and apostrophes (one's, St. Mark's) form words.
    static ref RE_WORD: Regex = Regex::new(r"[\p{L}\p{N}']+").unwrap();
}

/// A pre-supplied value for a field, optionally grouped under a category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Candidate {
    pub text: String,
    #[serde(default)]
    pub category: Option<String>,
}

impl Candidate {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            category: None,
        }
    }

    pub fn with_category(text: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            category: Some(category.into()),
        }
    }
}

/// Lowercase one char without context rules. Final sigma folds to σ so that
/// "ΟΔΟΣ" and "οδος" compare equal. Byte lengths are unchanged by the fold.
fn fold_case(c: char) -> impl Iterator<Item = char> {
    c.to_lowercase().map(|lc| if lc == 'ς' { 'σ' } else { lc })
}

/// Split text into lowercase words.
pub fn tokenize(s: &str) -> Vec<String> {
    RE_WORD
        .find_iter(s)
        .map(|m| m.as_str().chars().flat_map(fold_case).collect())
        .collect()
}

/// Normalize free text into the phrase form that index keys use.
pub fn clean_query(s: &str) -> String {
    tokenize(s).join(" ")
}

/// Lowercased copy of a candidate with a map back to the original's offsets.
#[derive(Debug, Clone)]
pub struct Lowered {
    text: String,
    // origin[i] is the byte offset in the original text of the char that
    // produced lowered byte i. One extra trailing slot maps the end.
    origin: Vec<usize>,
}

impl Lowered {
    pub fn new(s: &str) -> Self {
        let mut text = String::with_capacity(s.len());
        let mut origin = Vec::with_capacity(s.len() + 1);

        for (i, c) in s.char_indices() {
            for lc in fold_case(c) {
                text.push(lc);
                origin.extend(std::iter::repeat_n(i, lc.len_utf8()));
            }
        }
        origin.push(s.len());

        Self { text, origin }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Original byte offset for a byte offset into the lowered text.
    pub fn origin(&self, offset: usize) -> usize {
        self.origin[offset.min(self.origin.len() - 1)]
    }
}

/// The phrase map for one category.
#[derive(Debug)]
pub struct Category {
    pub name: String,
    phrases: PrefixMap<Vec<usize>>,
}

/// Phrase index over one field's candidate list.
///
/// Every contiguous run of words of every candidate is a key, so input can
/// match anywhere inside a multi-word candidate. Values are candidate IDs
/// (positions in the candidate list).
#[derive(Debug, Default)]
pub struct PhraseIndex {
    candidates: Vec<Candidate>,
    lowered: Vec<Lowered>,
    categories: Vec<Category>,
}

impl PhraseIndex {
    /// Build the index for a candidate list. Categories keep the order in
    /// which they first appear.
    pub fn build(candidates: Vec<Candidate>, default_category: &str) -> Self {
        let mut categories: Vec<Category> = Vec::new();
        let mut lowered = Vec::with_capacity(candidates.len());

        for (id, c) in candidates.iter().enumerate() {
            lowered.push(Lowered::new(&c.text));

            let cat_name = c
                .category
                .as_deref()
                .filter(|s| !s.is_empty())
                .unwrap_or(default_category);

            let pos = match categories.iter().position(|cat| cat.name == cat_name) {
                Some(p) => p,
                None => {
                    categories.push(Category {
                        name: cat_name.to_string(),
                        phrases: PrefixMap::new(),
                    });
                    categories.len() - 1
                }
            };

            let tokens = tokenize(&c.text);
            if tokens.is_empty() {
                log::debug!("candidate '{}' has no words, not indexed", c.text);
                continue;
            }

            let phrases = &mut categories[pos].phrases;
            for start in 0..tokens.len() {
                for end in start + 1..=tokens.len() {
                    let key = tokens[start..end].join(" ");
                    match phrases.get_mut(&key) {
                        // IDs are added in ascending order, so a repeated
                        // phrase within one candidate is always the last ID.
                        Some(bucket) => {
                            if bucket.last() != Some(&id) {
                                bucket.push(id);
                            }
                        }
                        None => {
                            phrases.insert(&key, vec![id]);
                        }
                    }
                }
            }
        }

        Self {
            candidates,
            lowered,
            categories,
        }
    }

    /// Candidate IDs per category whose phrases start with the (already
    /// cleaned) `phrase`. Categories with no hits are omitted. IDs within a
    /// category are in candidate-list order.
    pub fn lookup(&self, phrase: &str) -> Vec<(&str, Vec<usize>)> {
        if phrase.is_empty() {
            return Vec::new();
        }

        self.categories
            .iter()
            .filter_map(|cat| {
                let ids: BTreeSet<usize> = cat
                    .phrases
                    .find_prefix(phrase)
                    .flat_map(|(_, ids)| ids.iter().copied())
                    .collect();

                if ids.is_empty() {
                    None
                } else {
                    Some((cat.name.as_str(), ids.into_iter().collect()))
                }
            })
            .collect()
    }

    pub fn candidate(&self, id: usize) -> &Candidate {
        &self.candidates[id]
    }

    pub fn lowered(&self, id: usize) -> &Lowered {
        &self.lowered[id]
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Total number of phrase keys across all categories.
    pub fn num_phrases(&self) -> usize {
        self.categories.iter().map(|c| c.phrases.len()).sum()
    }
}
