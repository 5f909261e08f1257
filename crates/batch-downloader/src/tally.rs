//! The one piece of state shared across concurrently running groups.

use std::sync::{Arc, Mutex, PoisonError};

use batch_types::OutcomeTally;

/// Batch-wide tally. Groups only ever append to it, one whole group at a time.
#[derive(Clone, Default)]
pub struct SharedTally {
    inner: Arc<Mutex<OutcomeTally>>,
}

impl SharedTally {
    /// Append a finished group's local tally.
    pub fn absorb(&self, local: OutcomeTally) {
        let mut global = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        global.extend(local);
    }

    pub fn snapshot(&self) -> OutcomeTally {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local(tag: &str, n: usize) -> OutcomeTally {
        OutcomeTally {
            tagged: (0..n).map(|i| format!("{tag}-{i}.mp3")).collect(),
            fetched_untagged: vec![format!("{tag}.wav")],
            failed: vec![format!("{tag} (url: x)")],
        }
    }

    #[test]
    fn concurrent_absorbs_lose_nothing() {
        let shared = SharedTally::default();
        let handles: Vec<_> = (0..8)
            .map(|g| {
                let shared = shared.clone();
                std::thread::spawn(move || shared.absorb(local(&format!("g{g}"), g + 1)))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let total = shared.snapshot();
        assert_eq!(total.tagged.len(), (1..=8).sum::<usize>());
        assert_eq!(total.fetched_untagged.len(), 8);
        assert_eq!(total.failed.len(), 8);
    }

    #[test]
    fn group_entries_stay_contiguous() {
        let shared = SharedTally::default();
        shared.absorb(local("a", 2));
        shared.absorb(local("b", 1));
        assert_eq!(
            shared.snapshot().tagged,
            vec!["a-0.mp3", "a-1.mp3", "b-0.mp3"]
        );
    }
}
