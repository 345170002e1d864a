//! The frontier: a dedup+queue façade enforcing "enqueue-once, dequeue-once"
//! across concurrent producers/consumers.
//!
//! Unlike the bare [`crate::containers::Queue`], the frontier holds a single
//! mutex across the whole add/pop sequence so that no two concurrent
//! `pop_url` calls can ever return the same URL, even when the backing
//! queue holds duplicates of it.

use std::collections::HashSet;
use std::sync::Mutex;

#[derive(Debug)]
pub struct Frontier {
    random: bool,
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    queue: Vec<String>,
    visited: HashSet<String>,
}

impl Frontier {
    pub fn new(random: bool) -> Self {
        Self {
            random,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Enqueues `u` if it has not already been dispatched. Returns whether
    /// it was added.
    pub fn add_url(&self, u: impl Into<String>) -> bool {
        let u = u.into();
        let mut inner = self.inner.lock().unwrap();
        if inner.visited.contains(&u) {
            return false;
        }
        inner.queue.push(u);
        true
    }

    /// Pops the next URL to dispatch, marking it visited atomically with
    /// the pop. Returns `None` once the queue is drained.
    pub fn pop_url(&self) -> Option<String> {
        let mut inner = self.inner.lock().unwrap();
        loop {
            let candidate = if inner.queue.is_empty() {
                return None;
            } else if self.random {
                let idx = rand::random::<usize>() % inner.queue.len();
                inner.queue.swap_remove(idx)
            } else {
                inner.queue.remove(0)
            };

            if inner.visited.contains(&candidate) {
                // Already dispatched via a duplicate enqueue; try again.
                continue;
            }

            inner.visited.insert(candidate.clone());
            return Some(candidate);
        }
    }

    /// Advisory: the number of entries currently queued, not the number
    /// of not-yet-visited URLs.
    pub fn size(&self) -> usize {
        self.inner.lock().unwrap().queue.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn s2_fifo_order() {
        let f = Frontier::new(false);
        assert!(f.add_url("x"));
        assert!(f.add_url("y"));
        assert!(!f.add_url("x"));
        assert_eq!(f.pop_url().as_deref(), Some("x"));
        assert_eq!(f.pop_url().as_deref(), Some("y"));
        assert_eq!(f.pop_url(), None);
    }

    #[test]
    fn s3_dedup_under_race() {
        let f = Arc::new(Frontier::new(false));
        let f1 = f.clone();
        let f2 = f.clone();
        let t1 = thread::spawn(move || f1.add_url("x"));
        let t2 = thread::spawn(move || f2.add_url("x"));
        let (r1, r2) = (t1.join().unwrap(), t2.join().unwrap());
        assert_eq!([r1, r2].iter().filter(|&&r| r).count(), 1);
        assert_eq!(f.pop_url().as_deref(), Some("x"));
        assert_eq!(f.pop_url(), None);
    }

    proptest::proptest! {
        #[test]
        fn no_double_dispatch(urls in proptest::collection::vec("[a-z]{1,4}", 1..20)) {
            let f = Arc::new(Frontier::new(false));
            let mut handles = Vec::new();
            for u in urls.iter().cloned() {
                let f = f.clone();
                handles.push(thread::spawn(move || {
                    f.add_url(u.clone());
                    f.add_url(u);
                }));
            }
            for h in handles {
                h.join().unwrap();
            }

            let mut dispatched = Vec::new();
            while let Some(u) = f.pop_url() {
                dispatched.push(u);
            }

            let mut unique: Vec<_> = dispatched.clone();
            unique.sort();
            unique.dedup();
            prop_assert_eq!(dispatched.len(), unique.len(), "a url was dispatched twice");
        }
    }
}
