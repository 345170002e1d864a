//! Thread-safe Set and Queue, the building blocks the frontier is made of.

use std::collections::HashSet;
use std::sync::RwLock;

use rand::Rng;

/// A mutex-guarded set of strings.
#[derive(Debug, Default)]
pub struct Set {
    data: RwLock<HashSet<String>>,
}

impl Set {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, s: impl Into<String>) {
        self.data.write().unwrap().insert(s.into());
    }

    pub fn remove(&self, s: &str) {
        self.data.write().unwrap().remove(s);
    }

    pub fn contains(&self, s: &str) -> bool {
        self.data.read().unwrap().contains(s)
    }

    pub fn size(&self) -> usize {
        self.data.read().unwrap().len()
    }

    pub fn as_slice(&self) -> Vec<String> {
        self.data.read().unwrap().iter().cloned().collect()
    }
}

/// A mutex-guarded ordered sequence of strings supporting FIFO and random pop.
///
/// Backed by `Vec` rather than `VecDeque`: `random_dequeue` needs O(1)
/// removal-by-index, which `VecDeque` doesn't give us for arbitrary
/// positions.
#[derive(Debug, Default)]
pub struct Queue {
    items: RwLock<Vec<String>>,
}

impl Queue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&self, s: impl Into<String>) {
        self.items.write().unwrap().push(s.into());
    }

    /// Removes and returns the oldest item, or `None` if empty.
    pub fn dequeue(&self) -> Option<String> {
        let mut items = self.items.write().unwrap();
        if items.is_empty() {
            None
        } else {
            Some(items.remove(0))
        }
    }

    /// Removes and returns a uniformly random item, or `None` if empty.
    ///
    /// Does not preserve the relative order of the remaining items.
    pub fn random_dequeue(&self) -> Option<String> {
        let mut items = self.items.write().unwrap();
        if items.is_empty() {
            return None;
        }
        let idx = rand::thread_rng().gen_range(0..items.len());
        Some(items.swap_remove(idx))
    }

    pub fn size(&self) -> usize {
        self.items.read().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_add_contains_remove() {
        let s = Set::new();
        assert!(!s.contains("a"));
        s.add("a");
        assert!(s.contains("a"));
        assert_eq!(s.size(), 1);
        s.remove("a");
        assert!(!s.contains("a"));
    }

    #[test]
    fn queue_fifo_order() {
        let q = Queue::new();
        q.enqueue("x");
        q.enqueue("y");
        assert_eq!(q.dequeue(), Some("x".to_string()));
        assert_eq!(q.dequeue(), Some("y".to_string()));
        assert_eq!(q.dequeue(), None);
    }

    #[test]
    fn queue_random_dequeue_drains_all() {
        let q = Queue::new();
        for i in 0..10 {
            q.enqueue(i.to_string());
        }
        let mut seen = HashSet::new();
        while let Some(item) = q.random_dequeue() {
            seen.insert(item);
        }
        assert_eq!(seen.len(), 10);
    }
}
