//! Runs one or many groups and folds their tallies into a batch result.

use std::collections::HashSet;
use std::fmt::Write as _;

use batch_types::{GroupSelection, OutcomeTally, Row, group_key};
use futures_util::{StreamExt, stream};

use crate::group::GroupProcessor;
use crate::tally::SharedTally;

/// Group labels in first-appearance order, counting only rows with a link.
pub fn available_groups(rows: &[Row]) -> Vec<String> {
    let mut seen = HashSet::new();
    rows.iter()
        .filter(|row| row.link().is_some())
        .filter_map(|row| row.group.as_deref().map(str::trim))
        .filter(|label| !label.is_empty())
        .filter(|label| seen.insert(group_key(label)))
        .map(str::to_string)
        .collect()
}

pub struct BatchOrchestrator {
    processor: GroupProcessor,
    max_group_concurrency: usize,
}

impl BatchOrchestrator {
    pub fn new(processor: GroupProcessor, max_group_concurrency: usize) -> Self {
        Self {
            processor,
            max_group_concurrency: max_group_concurrency.max(1),
        }
    }

    /// Labels to run for `selection`. A single label is matched case- and
    /// padding-insensitively against the manifest and kept verbatim otherwise.
    pub fn targets(rows: &[Row], selection: &GroupSelection) -> Vec<String> {
        let groups = available_groups(rows);
        match selection {
            GroupSelection::All => groups,
            GroupSelection::One(label) => {
                let key = group_key(label);
                let label = groups
                    .into_iter()
                    .find(|group| group_key(group) == key)
                    .unwrap_or_else(|| label.trim().to_string());
                vec![label]
            }
        }
    }

    pub async fn run(&self, rows: &[Row], selection: &GroupSelection) -> OutcomeTally {
        let targets = Self::targets(rows, selection);
        match targets.as_slice() {
            [] => OutcomeTally::default(),
            [only] => self.processor.run(rows, only).await,
            many => self.run_many(rows, many).await,
        }
    }

    async fn run_many(&self, rows: &[Row], groups: &[String]) -> OutcomeTally {
        let limit = self.max_group_concurrency.min(groups.len());
        tracing::info!(groups = groups.len(), parallel = limit, "processing groups");

        let shared = SharedTally::default();
        stream::iter(groups)
            .map(|label| {
                let shared = shared.clone();
                async move {
                    // The lock is only taken once the group is done.
                    let local = self.processor.run(rows, label).await;
                    shared.absorb(local);
                }
            })
            .buffer_unordered(limit)
            .collect::<Vec<()>>()
            .await;
        shared.snapshot()
    }
}

/// Final report: the three buckets with counts, in a fixed order.
pub fn render_summary(tally: &OutcomeTally) -> String {
    let mut out = String::from("\n--- Download Summary ---\n");
    let sections = [
        ("Downloaded and tagged successfully", &tally.tagged),
        (
            "Downloaded but not tagged due to file format or error",
            &tally.fetched_untagged,
        ),
        ("Failed to download", &tally.failed),
    ];
    for (heading, entries) in sections {
        let _ = writeln!(out, "\n{heading} ({}):", entries.len());
        for entry in entries {
            let _ = writeln!(out, "  {entry}");
        }
    }
    out
}
