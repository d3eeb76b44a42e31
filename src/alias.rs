//! Deterministic table aliases for one compiled query.
//!
//! An alias is built from `(entity, junction?, relation?)`, lower-cased and
//! joined with a separator: `book`, `book_publisher`,
//! `book_authorbook_authors`. Requesting the same key again appends the
//! occurrence count (`book_publisher_1`, `book_publisher_2`, ...).

use std::collections::{HashMap, HashSet};

/// Allocates collision-free table aliases.
///
/// A provider is cheap to [`spawn`](AliasProvider::spawn): the child starts
/// from a copy of the parent's counters and never affects the parent.
#[derive(Debug, Clone, PartialEq)]
pub struct AliasProvider {
    separator: String,
    counters: HashMap<String, usize>,
    issued: HashSet<String>,
}

impl Default for AliasProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl AliasProvider {
    pub fn new() -> Self {
        Self::with_separator("_")
    }

    pub fn with_separator(separator: &str) -> Self {
        Self {
            separator: separator.into(),
            counters: HashMap::new(),
            issued: HashSet::new(),
        }
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// Allocate the next alias for `entity`, optionally reached through
    /// `relation` via the junction entity `through`.
    pub fn alias(&mut self, entity: &str, relation: Option<&str>, through: Option<&str>) -> String {
        let key = self.join_segments([Some(entity), through, relation]);

        loop {
            let count = match self.counters.get_mut(&key) {
                Some(count) => {
                    *count += 1;
                    *count
                }
                None => {
                    self.counters.insert(key.clone(), 0);
                    0
                }
            };

            let candidate = if count == 0 {
                key.clone()
            } else {
                format!("{}{}{}", key, self.separator, count)
            };

            // A suffixed alias can coincide with another key verbatim
            // ("book" + 1 vs. an entity literally named "book_1").
            if self.issued.insert(candidate.clone()) {
                return candidate;
            }
        }
    }

    /// Whether `key` has been allocated at least once.
    pub fn has_alias(&self, key: &str) -> bool {
        self.counters.contains_key(key)
    }

    /// Child provider seeded with a copy of the current counters.
    pub fn spawn(&self) -> Self {
        self.clone()
    }

    fn join_segments<'s>(&self, segments: impl IntoIterator<Item = Option<&'s str>>) -> String {
        segments
            .into_iter()
            .flatten()
            .filter(|segment| !segment.is_empty())
            .map(str::to_lowercase)
            .collect::<Vec<_>>()
            .join(&self.separator)
    }
}
