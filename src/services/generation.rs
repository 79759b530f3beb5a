use dashmap::DashMap;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

/// Tracks the newest request issued by each view so that a slower, older
/// response can be recognized and discarded.
#[derive(Clone, Default)]
pub struct RequestGenerations {
    latest: Arc<DashMap<String, u64>>,
    counter: Arc<AtomicU64>,
}

/// Held for the duration of one request. Dropping the newest ticket of a
/// view forgets that view.
pub struct GenerationTicket {
    latest: Arc<DashMap<String, u64>>,
    view: String,
    generation: u64,
}

impl RequestGenerations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a request for `view`, superseding any request still in flight.
    pub fn begin(&self, view: &str) -> GenerationTicket {
        // Generations are unique across views, so a missing entry can never
        // be mistaken for a live ticket.
        let generation = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        self.latest.insert(view.to_string(), generation);
        GenerationTicket {
            latest: Arc::clone(&self.latest),
            view: view.to_string(),
            generation,
        }
    }

    pub fn tracked_views(&self) -> usize {
        self.latest.len()
    }
}

impl GenerationTicket {
    pub fn is_current(&self) -> bool {
        self.latest
            .get(&self.view)
            .map(|latest| *latest == self.generation)
            .unwrap_or(false)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Drop for GenerationTicket {
    fn drop(&mut self) {
        self.latest
            .remove_if(&self.view, |_, latest| *latest == self.generation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newer_request_supersedes_older() {
        let generations = RequestGenerations::new();
        let first = generations.begin("view-1");
        assert!(first.is_current());

        let second = generations.begin("view-1");
        assert!(!first.is_current());
        assert!(second.is_current());
        assert!(second.generation() > first.generation());
    }

    #[test]
    fn views_are_independent() {
        let generations = RequestGenerations::new();
        let a = generations.begin("a");
        let b = generations.begin("b");
        assert!(a.is_current());
        assert!(b.is_current());
    }

    #[test]
    fn older_ticket_stays_stale_after_newest_finishes() {
        let generations = RequestGenerations::new();
        let first = generations.begin("view");
        let second = generations.begin("view");
        drop(second);
        assert!(!first.is_current());
    }

    #[test]
    fn finished_views_are_forgotten() {
        let generations = RequestGenerations::new();
        let first = generations.begin("view");
        let second = generations.begin("view");
        drop(first);
        assert_eq!(generations.tracked_views(), 1);
        drop(second);
        assert_eq!(generations.tracked_views(), 0);
    }
}
