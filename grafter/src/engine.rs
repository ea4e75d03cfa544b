//! The interface an emitted driver exposes to the parse loop.
//!
//! A composed engine is one table addressed by global state, but the scanner
//! side stays split: every state belongs to a *fragment* (0 for the host and
//! marking-terminal scanner, `i + 1` for extension `i`), and lexing in that
//! state uses the fragment's DFA, layout sets and terminal-use masks.

use crate::action::{EngineAction, TERMINAL_EXCLUSIVELY_SHIFTABLE};
use crate::error::{Location, SyntaxError};
use std::collections::BTreeSet;

/// Internal and display names of a terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalName {
    pub real: &'static str,
    pub display: &'static str,
}

impl TerminalName {
    pub const fn new(real: &'static str, display: &'static str) -> Self {
        Self { real, display }
    }
}

/// Terminal-use mask of `terminal` as seen from `fragment_id`.
///
/// Fragment 0 only ever shifts. An extension's own terminals (at or past the
/// end of the host mask) use the extension mask alone; terminals shared with
/// the host use the conjunction of both masks.
pub fn conjoined_terminal_uses(
    host_uses: &[u8],
    ext_uses: &[Vec<u8>],
    fragment_id: usize,
    terminal: usize,
) -> u8 {
    let Some(ext) = fragment_id.checked_sub(1) else {
        return TERMINAL_EXCLUSIVELY_SHIFTABLE;
    };
    let ext_mask = ext_uses
        .get(ext)
        .and_then(|uses| uses.get(terminal))
        .copied()
        .unwrap_or(0);
    match host_uses.get(terminal) {
        Some(host_mask) => host_mask & ext_mask,
        None => ext_mask,
    }
}

/// Tables of a composed engine, implemented by every emitted driver.
pub trait FragmentTables {
    fn fragment_count(&self) -> usize;

    fn state_to_fragment_id(&self, state: usize) -> usize;

    /// Merged table of packed cells, one row per global state.
    fn parse_table(&self) -> &[Vec<u32>];

    fn production_lengths(&self, fragment_id: usize) -> &[usize];

    fn fragment_transition_table(&self, fragment_id: usize) -> &[Vec<usize>];

    fn fragment_accept_sets(&self, fragment_id: usize) -> &[BTreeSet<usize>];

    fn fragment_reject_sets(&self, fragment_id: usize) -> &[BTreeSet<usize>];

    fn fragment_possible_sets(&self, fragment_id: usize) -> &[BTreeSet<usize>];

    fn fragment_terminal_count(&self, fragment_id: usize) -> usize;

    fn fragment_start_state(&self, fragment_id: usize) -> Option<usize>;

    fn fragment_eof_terminal(&self, fragment_id: usize) -> usize;

    fn fragment_layout_sets(&self, fragment_id: usize) -> &[BTreeSet<usize>];

    fn fragment_terminal_uses(&self, fragment_id: usize, terminal: usize) -> u8;

    fn terminal_name(&self, fragment_id: usize, terminal: usize) -> Option<TerminalName>;

    /// Decoded cell at (`state`, `column`); out of range is an error cell.
    fn action(&self, state: usize, column: usize) -> EngineAction {
        self.parse_table()
            .get(state)
            .and_then(|row| row.get(column))
            .map(|&cell| EngineAction::decode(cell))
            .unwrap_or_default()
    }

    /// Columns on which `state` can shift, reduce or accept.
    fn shiftable_set(&self, state: usize) -> BTreeSet<usize> {
        let Some(row) = self.parse_table().get(state) else {
            return BTreeSet::new();
        };
        row.iter()
            .enumerate()
            .filter(|(_, cell)| EngineAction::decode(**cell).is_terminal_action())
            .map(|(column, _)| column)
            .collect()
    }

    /// Layout terminals accepted in `state`.
    fn layout_set(&self, state: usize) -> BTreeSet<usize> {
        self.fragment_layout_sets(self.state_to_fragment_id(state))
            .get(state)
            .cloned()
            .unwrap_or_default()
    }

    /// Builds the syntax error for `state` given the terminals the scanner
    /// matched. Terminals without a name are left out of both lists.
    fn syntax_error(
        &self,
        virtual_location: Location,
        real_location: Location,
        state: usize,
        matched: &BTreeSet<usize>,
    ) -> SyntaxError {
        let fragment_id = self.state_to_fragment_id(state);
        let names = |terminals: &mut dyn Iterator<Item = usize>| -> (Vec<String>, Vec<String>) {
            terminals
                .filter_map(|t| self.terminal_name(fragment_id, t))
                .map(|name| (name.real.to_owned(), name.display.to_owned()))
                .unzip()
        };
        let (expected_real, expected_display) = names(&mut self.shiftable_set(state).into_iter());
        let (matched_real, matched_display) = names(&mut matched.iter().copied());
        log::debug!(
            "syntax error in state {} (fragment {}): {} expected, {} matched",
            state,
            fragment_id,
            expected_real.len(),
            matched_real.len()
        );
        SyntaxError {
            virtual_location,
            real_location,
            state,
            expected_real,
            expected_display,
            matched_real,
            matched_display,
        }
    }
}
