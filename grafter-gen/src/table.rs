//! Per-fragment LR tables as produced by the fragment generators.

use crate::index::Decomposed;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

static EMPTY: BTreeSet<usize> = BTreeSet::new();

/// An action in a fragment table, before merging.
///
/// Shift and goto targets are decomposed: extension tables may point at their
/// own states or at host states. Reduce carries a composed production number
/// and is never translated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LrAction {
    #[default]
    Error,
    Accept,
    Shift(Decomposed),
    Reduce(usize),
    Goto(Decomposed),
}

/// Sparse action/goto table: one row per state, one entry per valid column.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LrParseTable {
    rows: Vec<BTreeMap<usize, LrAction>>,
}

impl LrParseTable {
    pub fn new(states: usize) -> Self {
        Self {
            rows: vec![BTreeMap::new(); states],
        }
    }

    /// Number of states.
    pub fn size(&self) -> usize {
        self.rows.len()
    }

    /// Sets a cell, growing the table if `state` is past the end.
    pub fn set(&mut self, state: usize, column: usize, action: LrAction) {
        if state >= self.rows.len() {
            self.rows.resize_with(state + 1, BTreeMap::new);
        }
        self.rows[state].insert(column, action);
    }

    pub fn action(&self, state: usize, column: usize) -> LrAction {
        self.rows
            .get(state)
            .and_then(|row| row.get(&column))
            .copied()
            .unwrap_or_default()
    }

    /// Columns with an entry in `state`, ascending.
    pub fn valid_lookaheads(&self, state: usize) -> impl Iterator<Item = usize> + '_ {
        self.rows.get(state).into_iter().flat_map(|row| row.keys().copied())
    }
}

/// Lookahead and layout sets per state.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookaheadAndLayoutSets {
    pub lookaheads: Vec<BTreeSet<usize>>,
    pub layouts: Vec<BTreeSet<usize>>,
}

impl LookaheadAndLayoutSets {
    pub fn layout(&self, state: usize) -> &BTreeSet<usize> {
        self.layouts.get(state).unwrap_or(&EMPTY)
    }

    pub fn lookahead(&self, state: usize) -> &BTreeSet<usize> {
        self.lookaheads.get(state).unwrap_or(&EMPTY)
    }
}

/// Transparent-prefix terminals valid per state.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransparentPrefixes {
    pub prefixes: Vec<BTreeSet<usize>>,
}

impl TransparentPrefixes {
    pub fn prefixes(&self, state: usize) -> &BTreeSet<usize> {
        self.prefixes.get(state).unwrap_or(&EMPTY)
    }
}
