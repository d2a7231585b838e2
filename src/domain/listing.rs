//! Listing snapshot: static per-instrument metadata taken once at run start.

use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct ListingEntry {
    pub code: String,
    pub name: String,
    pub market_cap: f64,
}

/// Code → name / market-cap lookup. Never refreshed during a run, so
/// capitalization ranking always reflects the same fixed snapshot.
#[derive(Debug, Clone, Default)]
pub struct Listing {
    entries: HashMap<String, ListingEntry>,
}

impl Listing {
    pub fn new(entries: Vec<ListingEntry>) -> Self {
        Self {
            entries: entries.into_iter().map(|e| (e.code.clone(), e)).collect(),
        }
    }

    pub fn name_of(&self, code: &str) -> Option<&str> {
        self.entries.get(code).map(|e| e.name.as_str())
    }

    /// Missing entries rank as zero, i.e. last under capitalization ranking.
    pub fn market_cap_of(&self, code: &str) -> f64 {
        self.entries.get(code).map_or(0.0, |e| e.market_cap)
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
