//! Progress reporting for annotation runs.
//!
//! Workers send [`ProgressEvent`]s over a channel; a single reporter on the
//! coordinating thread owns the progress bar and the log milestones.

use crossbeam::channel::{Receiver, Sender};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    KitStarted { kit: String, batch: String },
    KitFinished { kit: String, batch: String, rows: usize },
    BatchFinished { batch: String, rows: usize },
}

/// Per-kit milestone counts gathered while reporting
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KitProgress {
    pub batches_done: usize,
    pub rows: usize,
}

/// Sending half handed to workers; a closed channel is ignored
#[derive(Debug, Clone)]
pub struct ProgressSender {
    tx: Option<Sender<ProgressEvent>>,
}

impl ProgressSender {
    pub fn new(tx: Sender<ProgressEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// A sender that drops every event
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn send(&self, event: ProgressEvent) {
        if let Some(tx) = &self.tx {
            if tx.send(event).is_err() {
                tracing::debug!("Progress reporter has gone away");
            }
        }
    }
}

/// Drains events until every sender is dropped, then returns per-kit counts
pub struct ProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter {
    /// `steps` is the number of (kit, batch) searches expected
    pub fn new(steps: u64, silent: bool) -> Self {
        let bar = if silent {
            ProgressBar::hidden()
        } else {
            let pb = ProgressBar::new(steps);
            if let Ok(style) = ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            {
                pb.set_style(style);
            }
            pb
        };
        Self { bar }
    }

    pub fn run(self, rx: Receiver<ProgressEvent>) -> BTreeMap<String, KitProgress> {
        let mut kits: BTreeMap<String, KitProgress> = BTreeMap::new();
        for event in rx {
            match event {
                ProgressEvent::KitStarted { kit, batch } => {
                    self.bar.set_message(format!("{} on {}", kit, batch));
                }
                ProgressEvent::KitFinished { kit, batch, rows } => {
                    tracing::debug!("{} annotated {} genes of {}", kit, rows, batch);
                    let entry = kits.entry(kit).or_default();
                    entry.batches_done += 1;
                    entry.rows += rows;
                    self.bar.inc(1);
                }
                ProgressEvent::BatchFinished { batch, rows } => {
                    tracing::info!("Finished annotating {} ({} annotated genes)", batch, rows);
                }
            }
        }
        self.bar.finish_and_clear();
        for (kit, progress) in &kits {
            tracing::info!(
                "{}: {} batches, {} annotated genes",
                kit,
                progress.batches_done,
                progress.rows
            );
        }
        kits
    }
}
