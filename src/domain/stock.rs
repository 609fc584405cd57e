use std::collections::{HashMap, HashSet};

use super::order::Order;

// ============================================================================
// Stock Query / Result
// ============================================================================
//
// A query is the distinct set of item codes in an order, kept in the order
// they first appear so "first unavailable" is stable for diagnostics.
// A result is a point-in-time snapshot; nothing is reserved.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockQuery {
    codes: Vec<String>,
}

impl StockQuery {
    pub fn from_order(order: &Order) -> Self {
        Self::from_codes(order.item_codes())
    }

    pub fn from_codes<'a>(codes: impl IntoIterator<Item = &'a str>) -> Self {
        let mut seen = HashSet::new();
        let codes = codes
            .into_iter()
            .filter(|code| seen.insert(*code))
            .map(str::to_string)
            .collect();
        Self { codes }
    }

    pub fn codes(&self) -> &[String] {
        &self.codes
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StockResult {
    availability: HashMap<String, bool>,
}

impl StockResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one report for a code. A code reported more than once is only
    /// available if every report says so.
    pub fn record(&mut self, code: impl Into<String>, available: bool) {
        self.availability
            .entry(code.into())
            .and_modify(|current| *current &= available)
            .or_insert(available);
    }

    /// Codes absent from the result count as unavailable.
    pub fn is_available(&self, code: &str) -> bool {
        self.availability.get(code).copied().unwrap_or(false)
    }

    pub fn first_unavailable<'q>(&self, query: &'q StockQuery) -> Option<&'q str> {
        query
            .codes()
            .iter()
            .map(String::as_str)
            .find(|code| !self.is_available(code))
    }

    pub fn len(&self) -> usize {
        self.availability.len()
    }
}

impl<S: Into<String>> FromIterator<(S, bool)> for StockResult {
    fn from_iter<I: IntoIterator<Item = (S, bool)>>(iter: I) -> Self {
        let mut result = Self::new();
        for (code, available) in iter {
            result.record(code, available);
        }
        result
    }
}
