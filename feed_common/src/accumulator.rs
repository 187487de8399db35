//! Running per-symbol quote state.
//!
//! The feed only sends the fields that changed. `AccumulatedState` folds those
//! deltas into the last known value of every field so consumers can see a full
//! quote on each update. Entries are never pruned.
use std::collections::HashMap;

use crate::quote::{Quote, QuoteBatch};

/// Symbol -> merged quote, for the lifetime of the owner.
#[derive(Debug, Clone, Default)]
pub struct AccumulatedState {
    quotes: HashMap<String, Quote>,
}

impl AccumulatedState {
    /// Creates an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds `delta` into the state and returns the merged quote of every
    /// symbol the delta touched, in delta order. The delta's warnings carry over.
    pub fn merge(&mut self, delta: &QuoteBatch) -> QuoteBatch {
        let mut merged: QuoteBatch = delta
            .iter()
            .map(|update| {
                let merged = self
                    .quotes
                    .entry(update.symbol.clone())
                    .and_modify(|stored| stored.merge(update))
                    .or_insert_with(|| update.clone());
                merged.clone()
            })
            .collect();
        for warning in delta.warnings() {
            merged.push_warning(warning.clone());
        }
        merged
    }

    /// Current merged quote for `symbol`.
    pub fn get(&self, symbol: &str) -> Option<&Quote> {
        self.quotes.get(symbol)
    }

    /// Number of symbols seen so far.
    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    /// `true` until the first delta arrives.
    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quote::DecodeWarning;

    fn batch(quotes: Vec<Quote>) -> QuoteBatch {
        quotes.into_iter().collect()
    }

    #[test]
    fn test_fields_merge_across_deltas() {
        let mut state = AccumulatedState::new();
        let first = state.merge(&batch(vec![Quote { bid: Some(1.0), ..Quote::new("A") }]));
        let second = state.merge(&batch(vec![Quote { ask: Some(2.0), ..Quote::new("A") }]));

        assert_eq!(first.get("A").unwrap().bid, Some(1.0));
        let a = second.get("A").unwrap();
        assert_eq!(a.bid, Some(1.0));
        assert_eq!(a.ask, Some(2.0));
    }

    #[test]
    fn test_unseen_symbol_is_taken_verbatim() {
        let mut state = AccumulatedState::new();
        let quote = Quote { last: Some(9.5), volume: Some(3), ..Quote::new("B") };
        let merged = state.merge(&batch(vec![quote.clone()]));
        assert_eq!(merged.get("B"), Some(&quote));
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn test_only_touched_symbols_are_emitted() {
        let mut state = AccumulatedState::new();
        state.merge(&batch(vec![Quote::new("A"), Quote::new("B")]));
        let merged = state.merge(&batch(vec![Quote { bid: Some(4.0), ..Quote::new("B") }]));

        assert_eq!(merged.symbols(), vec!["B"]);
        assert_eq!(state.len(), 2);
    }

    #[test]
    fn test_overwrite_replaces_value() {
        let mut state = AccumulatedState::new();
        state.merge(&batch(vec![Quote { bid: Some(1.0), ask: Some(1.1), ..Quote::new("A") }]));
        state.merge(&batch(vec![Quote { bid: Some(0.9), ..Quote::new("A") }]));

        let a = state.get("A").unwrap();
        assert_eq!(a.bid, Some(0.9));
        assert_eq!(a.ask, Some(1.1));
    }

    #[test]
    fn test_warnings_survive_merge() {
        let mut state = AccumulatedState::new();
        let mut delta = batch(vec![Quote { bid: Some(1.0), ..Quote::new("LONGSYM") }]);
        let warning = DecodeWarning::SymbolTooLong { symbol: "LONGSYM".into(), len: 7, max: 5 };
        delta.push_warning(warning.clone());

        let merged = state.merge(&delta);
        assert_eq!(merged.warnings(), &[warning][..]);
        assert_eq!(merged.len(), 1);
    }
}
