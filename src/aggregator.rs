//! Fans each input change out to every source and forwards their batches to
//! a sink as they arrive.
//!
//! Every source runs in its own task and reports through one channel that
//! only the aggregator reads, so all state here is touched from a single
//! consumer. Nothing is cancelled when the input changes: a batch is simply
//! dropped if its snapshot no longer equals the live input.

use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::sources::{Batch, Batches, Query, Source};

/// A message from a source task.
#[derive(Debug)]
pub struct Delivery {
    pub(crate) snapshot: Arc<str>,
    pub(crate) generation: u64,
    pub(crate) event: Event,
}

#[derive(Debug)]
pub(crate) enum Event {
    Batch(Batch),
    /// The source has returned and will emit nothing more for this query.
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    Querying,
}

/// Reports a source as finished for its query when dropped, so a source
/// task that panics still counts as done.
struct Finished(Batches);

impl Drop for Finished {
    fn drop(&mut self) {
        self.0.done();
    }
}

/// Receives batches for display.
///
/// Batches for one snapshot may arrive in any order across headings, and a
/// heading may arrive more than once. The sink is responsible for dropping
/// what it shows when the snapshot changes.
pub trait Sink {
    fn present(&mut self, snapshot: &str, batch: Batch);
}

/// Sink that accumulates batches into sections for the latest snapshot.
/// Headings keep the order in which they first arrived and later batches
/// for a heading are appended to its section.
#[derive(Debug, Default)]
pub struct Sections {
    snapshot: Option<String>,
    sections: Vec<Batch>,
}

impl Sections {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Option<&str> {
        self.snapshot.as_deref()
    }

    pub fn sections(&self) -> &[Batch] {
        &self.sections
    }

    pub fn into_sections(self) -> Vec<Batch> {
        self.sections
    }
}

impl Sink for Sections {
    fn present(&mut self, snapshot: &str, batch: Batch) {
        if self.snapshot.as_deref() != Some(snapshot) {
            self.sections.clear();
            self.snapshot = Some(snapshot.to_string());
        }

        match self.sections.iter_mut().find(|s| s.heading == batch.heading) {
            Some(s) => s.suggestions.extend(batch.suggestions),
            None => self.sections.push(batch),
        }
    }
}

/// Query fan-out and result merging for one input field.
pub struct Aggregator {
    sources: Vec<Arc<dyn Source>>,

    // Current value of the input.
    live: String,
    // Last value queries were dispatched for.
    last_dispatched: String,

    // Bumped on every dispatch so that completions of superseded queries
    // aren't counted against the current one.
    generation: u64,
    pending: usize,

    tx: UnboundedSender<Delivery>,
    rx: UnboundedReceiver<Delivery>,
}

impl Aggregator {
    pub fn new(sources: Vec<Arc<dyn Source>>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            sources,
            live: String::new(),
            last_dispatched: String::new(),
            generation: 0,
            pending: 0,
            tx,
            rx,
        }
    }

    pub fn state(&self) -> State {
        if self.pending > 0 {
            State::Querying
        } else {
            State::Idle
        }
    }

    pub fn live(&self) -> &str {
        &self.live
    }

    /// Record a new input value. If it's non-empty and differs from the last
    /// dispatched value, query every source with it. Returns whether a query
    /// was dispatched. Must be called from within a Tokio runtime.
    pub fn input_changed(&mut self, value: &str, cursor: Option<usize>) -> bool {
        self.live = value.to_string();

        if value.is_empty() {
            // Nothing is current any more. Retyping the same text queries again.
            self.last_dispatched.clear();
            self.generation += 1;
            self.pending = 0;
            return false;
        }

        if value == self.last_dispatched {
            return false;
        }

        self.generation += 1;
        self.pending = self.sources.len();
        self.last_dispatched = value.to_string();

        let snapshot: Arc<str> = Arc::from(value);
        for source in &self.sources {
            let source = source.clone();
            let out = Finished(Batches::new(
                snapshot.clone(),
                self.generation,
                self.tx.clone(),
            ));
            let query = Query {
                text: value.to_string(),
                cursor,
            };

            tokio::spawn(async move {
                source.suggest(&query, &out.0).await;
                log::trace!("source '{}' finished '{}'", source.name(), query.text);
            });
        }

        log::debug!(
            "dispatched '{}' to {} sources (gen {})",
            value,
            self.sources.len(),
            self.generation
        );
        true
    }

    /// Wait for the next message from any source and handle it.
    pub async fn step<S: Sink>(&mut self, sink: &mut S) {
        // The aggregator holds a sender, so the channel never closes.
        if let Some(d) = self.rx.recv().await {
            self.handle(d, sink);
        }
    }

    /// Handle messages until every source has finished the current query.
    pub async fn settle<S: Sink>(&mut self, sink: &mut S) {
        while self.state() == State::Querying {
            self.step(sink).await;
        }
    }

    fn handle<S: Sink>(&mut self, d: Delivery, sink: &mut S) {
        match d.event {
            Event::Done => {
                if d.generation == self.generation {
                    self.pending = self.pending.saturating_sub(1);
                }
            }
            Event::Batch(batch) => {
                // A query for the same text dispatched earlier is stale too.
                if *d.snapshot != *self.live || d.generation != self.generation {
                    log::debug!(
                        "dropping stale '{}' batch for '{}' (input is '{}')",
                        batch.heading,
                        d.snapshot,
                        self.live
                    );
                    return;
                }
                sink.present(&d.snapshot, batch);
            }
        }
    }
}
