//! Assigns a stable, monotonically increasing integer id to each unique
//! string on first sight. Not a hash: a dense index, so ids stay small
//! and cheap to compare on the wire.

use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct StringInterner {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    ids: HashMap<String, u32>,
    counter: u32,
}

impl StringInterner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id for `s`, assigning the next counter value if this is
    /// the first time `s` has been seen. Ids start at 1.
    pub fn hash(&self, s: &str) -> u32 {
        let mut inner = self.inner.lock().unwrap();
        if let Some(&id) = inner.ids.get(s) {
            return id;
        }
        inner.counter += 1;
        let id = inner.counter;
        inner.ids.insert(s.to_string(), id);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn s1_sequence() {
        let interner = StringInterner::new();
        assert_eq!(interner.hash("a"), 1);
        assert_eq!(interner.hash("b"), 2);
        assert_eq!(interner.hash("a"), 1);
        assert_eq!(interner.hash("c"), 3);
    }

    proptest::proptest! {
        #[test]
        fn injective_and_stable(a in "[a-z]{1,8}", b in "[a-z]{1,8}") {
            let interner = StringInterner::new();
            let ha1 = interner.hash(&a);
            let hb = interner.hash(&b);
            let ha2 = interner.hash(&a);
            prop_assert_eq!(ha1, ha2, "hash must be stable within a session");
            if a == b {
                prop_assert_eq!(ha1, hb);
            } else {
                prop_assert_ne!(ha1, hb);
            }
        }
    }
}
