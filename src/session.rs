//! Interactive suggestion session on stdin/stdout. Every line read is a new
//! input value, and batches are printed as they arrive.

use std::{io::Write, sync::Arc};

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::{
    aggregator::{Aggregator, Sink},
    sources::{Batch, Source},
};

/// Sink that prints batches. A header line marks the start of each new
/// snapshot, which stands in for clearing the previous suggestions.
pub struct Printer<W: Write> {
    out: W,
    snapshot: Option<String>,
}

impl<W: Write> Printer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            snapshot: None,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write(&mut self, snapshot: &str, batch: &Batch) -> std::io::Result<()> {
        if self.snapshot.as_deref() != Some(snapshot) {
            writeln!(self.out, "-- {}", snapshot)?;
            self.snapshot = Some(snapshot.to_string());
        }

        writeln!(self.out, "{}", batch.heading)?;
        for s in &batch.suggestions {
            writeln!(self.out, " - {}", s.spans)?;
            if !s.secondary_text.is_empty() {
                writeln!(self.out, "   {}", s.secondary_text)?;
            }
        }
        self.out.flush()
    }
}

impl<W: Write> Sink for Printer<W> {
    fn present(&mut self, snapshot: &str, batch: Batch) {
        if let Err(e) = self.write(snapshot, &batch) {
            log::error!("error writing suggestions: {}", e);
        }
    }
}

/// Run the session until stdin closes.
pub async fn run(sources: Vec<Arc<dyn Source>>) -> std::io::Result<()> {
    let mut agg = Aggregator::new(sources);
    let mut printer = Printer::new(std::io::stdout());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => Some(line?),
            _ = agg.step(&mut printer) => None,
        };

        match line {
            Some(Some(value)) => {
                agg.input_changed(value.trim_end(), None);
            }
            // EOF.
            Some(None) => break,
            None => {}
        }
    }

    // Let the last query finish before exiting.
    agg.settle(&mut printer).await;
    Ok(())
}
