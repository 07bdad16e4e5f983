//! Suggestion sources. A source takes the current input and, without
//! blocking the caller, emits zero or more (heading, suggestions) batches.

pub mod local;
pub mod remote;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;

use crate::{
    aggregator::{Delivery, Event},
    suggest::MatchSpans,
};

pub use local::LocalSource;
pub use remote::RemoteSource;

/// Input text at the time a query was dispatched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pub text: String,
    /// Cursor position (in chars) in the input field, if known.
    pub cursor: Option<usize>,
}

impl Query {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            cursor: None,
        }
    }
}

/// One suggestion shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub text: String,
    pub spans: MatchSpans,
    #[serde(default)]
    pub secondary_text: String,
}

/// Suggestions from one source under one heading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub heading: String,
    pub suggestions: Vec<Suggestion>,
}

/// Result emitter handed to a source for one query. Every batch carries the
/// snapshot it was produced for so that stale batches can be told apart.
#[derive(Debug, Clone)]
pub struct Batches {
    snapshot: Arc<str>,
    generation: u64,
    tx: UnboundedSender<Delivery>,
}

impl Batches {
    pub(crate) fn new(snapshot: Arc<str>, generation: u64, tx: UnboundedSender<Delivery>) -> Self {
        Self {
            snapshot,
            generation,
            tx,
        }
    }

    /// Emit a batch. A closed receiver (the consumer went away) is ignored.
    pub fn send(&self, heading: impl Into<String>, suggestions: Vec<Suggestion>) {
        let batch = Batch {
            heading: heading.into(),
            suggestions,
        };
        let _ = self.tx.send(Delivery {
            snapshot: self.snapshot.clone(),
            generation: self.generation,
            event: Event::Batch(batch),
        });
    }

    pub(crate) fn done(&self) {
        let _ = self.tx.send(Delivery {
            snapshot: self.snapshot.clone(),
            generation: self.generation,
            event: Event::Done,
        });
    }
}

/// A provider of suggestions.
///
/// A source must not surface errors: a failed lookup is "no batch". It may
/// emit any number of batches, including none.
#[async_trait]
pub trait Source: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    async fn suggest(&self, query: &Query, out: &Batches);
}

/// Run a source to completion and collect whatever it emitted.
#[cfg(test)]
pub(crate) async fn collect(source: &dyn Source, query: Query) -> Vec<Batch> {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let out = Batches::new(Arc::from(query.text.as_str()), 0, tx);
    source.suggest(&query, &out).await;
    drop(out);

    let mut batches = Vec::new();
    while let Some(d) = rx.recv().await {
        if let Event::Batch(b) = d.event {
            batches.push(b);
        }
    }
    batches
}
