use std::sync::Arc;

use async_trait::async_trait;

use super::{Batches, Query, Source, Suggestion};
use crate::{
    fields::Field,
    suggest::{clean_query, index::Lowered, MatchSpans},
};

/// Suggestions from a field's own candidate list, one batch per category.
pub struct LocalSource {
    field: Arc<Field>,
}

impl LocalSource {
    pub fn new(field: Arc<Field>) -> Self {
        Self { field }
    }
}

#[async_trait]
impl Source for LocalSource {
    fn name(&self) -> &str {
        &self.field.name
    }

    async fn suggest(&self, query: &Query, out: &Batches) {
        let phrase = clean_query(&query.text);
        if phrase.is_empty() {
            return;
        }

        let index = match self.field.index() {
            Ok(idx) => idx,
            Err(e) => {
                log::warn!("error indexing field '{}': {}", self.field.name, e);
                return;
            }
        };

        let max = self.field.max_results();
        for (category, mut ids) in index.lookup(&phrase) {
            if max > 0 {
                ids.truncate(max);
            }

            let suggestions = ids
                .into_iter()
                .map(|id| {
                    let text = &index.candidate(id).text;
                    Suggestion {
                        text: text.clone(),
                        spans: highlight(text, index.lowered(id), &phrase),
                        secondary_text: String::new(),
                    }
                })
                .collect();

            out.send(category, suggestions);
        }
    }
}

/// Mark every occurrence of `phrase` in the candidate, found case-insensitively
/// (leftmost first, non-overlapping), on the original-case text.
pub fn highlight(text: &str, lowered: &Lowered, phrase: &str) -> MatchSpans {
    let mut spans = MatchSpans::new();
    if phrase.is_empty() {
        spans.append(text, false);
        return spans;
    }

    let mut last = 0;
    for (start, m) in lowered.as_str().match_indices(phrase) {
        let from = lowered.origin(start).max(last);
        let to = lowered.origin(start + m.len()).max(from);

        spans.append(&text[last..from], false);
        spans.append(&text[from..to], true);
        last = to;
    }
    spans.append(&text[last..], false);

    spans
}
