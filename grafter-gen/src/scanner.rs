//! Byte-transition scanner tables.
//!
//! Fragment scanners arrive already built; the only scanner built here is the
//! one for marking terminals. It is compiled with `regex-automata` and then
//! flattened into the table form every fragment uses: a dense 256-column
//! transition row per state, with state 0 dead and per-state accept, reject
//! and possible terminal sets.

use crate::error::CompositionError;
use regex_automata::{
    Anchored, Input, MatchKind,
    dfa::{Automaton, StartKind, dense},
    nfa::thompson::{Config as ThomConfig, NFA},
    util::{primitives::StateID, syntax},
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

pub const DEAD_STATE: usize = 0;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannerDfa {
    pub start_state: usize,
    /// `transitions[state][byte]`; 0 is the dead state.
    pub transitions: Vec<Vec<usize>>,
}

impl Default for ScannerDfa {
    /// A scanner that accepts nothing.
    fn default() -> Self {
        Self {
            start_state: 1,
            transitions: vec![vec![DEAD_STATE; 256]; 2],
        }
    }
}

impl ScannerDfa {
    pub fn state_count(&self) -> usize {
        self.transitions.len()
    }

    /// State reached after feeding `input` from the start state.
    pub fn run(&self, input: &[u8]) -> usize {
        input.iter().fold(self.start_state, |state, &b| {
            self.transitions
                .get(state)
                .and_then(|row| row.get(b as usize))
                .copied()
                .unwrap_or(DEAD_STATE)
        })
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannerAnnotations {
    /// Terminals whose match ends in the state.
    pub accept_sets: Vec<BTreeSet<usize>>,
    /// Terminals ruled out by reaching the state.
    pub reject_sets: Vec<BTreeSet<usize>>,
    /// Terminals still reachable from the state.
    pub possible_sets: Vec<BTreeSet<usize>>,
}

impl ScannerAnnotations {
    fn empty(states: usize) -> Self {
        Self {
            accept_sets: vec![BTreeSet::new(); states],
            reject_sets: vec![BTreeSet::new(); states],
            possible_sets: vec![BTreeSet::new(); states],
        }
    }

    pub fn accepts(&self, state: usize) -> Option<&BTreeSet<usize>> {
        self.accept_sets.get(state)
    }
}

/// Builds a scanner recognizing `regexes`, keyed by the terminal each regex
/// belongs to. Patterns have no precedence between them: a state accepts
/// every terminal whose regex matches the input read so far.
pub fn build_scanner(
    regexes: &BTreeMap<usize, String>,
) -> Result<(ScannerDfa, ScannerAnnotations), CompositionError> {
    if regexes.is_empty() {
        return Ok((ScannerDfa::default(), ScannerAnnotations::empty(2)));
    }

    let terminals: Vec<usize> = regexes.keys().copied().collect();
    let conf = syntax::Config::new().utf8(false);
    let mut hirs = Vec::with_capacity(regexes.len());
    for (&terminal, regex) in regexes {
        hirs.push(
            syntax::parse_with(regex, &conf).map_err(|e| CompositionError::Regex {
                terminal,
                regex: regex.clone(),
                message: e.to_string(),
            })?,
        );
    }

    let nfa = NFA::compiler()
        .configure(ThomConfig::new().utf8(false))
        .build_many_from_hir(&hirs)
        .map_err(|e| CompositionError::Scanner(e.to_string()))?;
    let dfa = dense::Builder::new()
        .configure(
            dense::DFA::config()
                .match_kind(MatchKind::All)
                .start_kind(StartKind::Anchored),
        )
        .build_from_nfa(&nfa)
        .map_err(|e| CompositionError::Scanner(e.to_string()))?;
    let start = dfa
        .start_state_forward(&Input::new(b"").anchored(Anchored::Yes))
        .map_err(|e| CompositionError::Scanner(e.to_string()))?;

    // Renumber reachable states breadth-first: 0 dead, 1 start.
    let mut ids: HashMap<StateID, usize> = HashMap::from([(start, 1)]);
    let mut queue = VecDeque::from([start]);
    let mut transitions = vec![vec![DEAD_STATE; 256]];
    let mut accept_sets = vec![BTreeSet::new()];
    while let Some(id) = queue.pop_front() {
        let mut row = vec![DEAD_STATE; 256];
        for byte in 0..=u8::MAX {
            let next = dfa.next_state(id, byte);
            if dfa.is_dead_state(next) || dfa.is_quit_state(next) {
                continue;
            }
            let n = match ids.get(&next) {
                Some(&n) => n,
                None => {
                    let n = ids.len() + 1;
                    ids.insert(next, n);
                    queue.push_back(next);
                    n
                }
            };
            row[byte as usize] = n;
        }
        transitions.push(row);

        // matches are reported one step late, so the input read so far
        // matches exactly when the end-of-input transition is a match
        let eoi = dfa.next_eoi_state(id);
        let mut accepts = BTreeSet::new();
        if dfa.is_match_state(eoi) {
            for i in 0..dfa.match_len(eoi) {
                accepts.insert(terminals[dfa.match_pattern(eoi, i).as_usize()]);
            }
        }
        accept_sets.push(accepts);
    }

    let possible_sets = possible_sets(&transitions, &accept_sets);
    let states = transitions.len();
    log::debug!(
        "scanner for {} terminals: {} states",
        terminals.len(),
        states
    );
    Ok((
        ScannerDfa {
            start_state: 1,
            transitions,
        },
        ScannerAnnotations {
            accept_sets,
            reject_sets: vec![BTreeSet::new(); states],
            possible_sets,
        },
    ))
}

/// Terminals accepted in a state or in any state reachable from it.
fn possible_sets(transitions: &[Vec<usize>], accept_sets: &[BTreeSet<usize>]) -> Vec<BTreeSet<usize>> {
    let successors: Vec<BTreeSet<usize>> = transitions
        .iter()
        .map(|row| row.iter().copied().filter(|&s| s != DEAD_STATE).collect())
        .collect();
    let mut possible = accept_sets.to_vec();
    let mut changed = true;
    while changed {
        changed = false;
        for state in (1..possible.len()).rev() {
            let mut acc = possible[state].clone();
            for &next in &successors[state] {
                acc.extend(possible[next].iter().copied());
            }
            if acc.len() != possible[state].len() {
                possible[state] = acc;
                changed = true;
            }
        }
    }
    possible
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn accepted(dfa: &ScannerDfa, ann: &ScannerAnnotations, input: &[u8]) -> BTreeSet<usize> {
        ann.accepts(dfa.run(input)).cloned().unwrap_or_default()
    }

    #[test]
    fn empty_scanner_accepts_nothing() {
        let (dfa, ann) = build_scanner(&BTreeMap::new()).unwrap();
        assert_eq!(dfa.state_count(), 2);
        assert_eq!(dfa.start_state, 1);
        assert!(accepted(&dfa, &ann, b"").is_empty());
        assert_eq!(dfa.run(b"a"), DEAD_STATE);
    }

    #[test]
    fn routes_each_pattern_to_its_terminal() {
        init();
        let regexes = BTreeMap::from([(13, "@ext".to_owned()), (14, "@other".to_owned())]);
        let (dfa, ann) = build_scanner(&regexes).unwrap();
        assert_eq!(accepted(&dfa, &ann, b"@ext"), BTreeSet::from([13]));
        assert_eq!(accepted(&dfa, &ann, b"@other"), BTreeSet::from([14]));
        assert!(accepted(&dfa, &ann, b"@ex").is_empty());
        assert_eq!(dfa.run(b"@extra"), DEAD_STATE);
        assert_eq!(ann.possible_sets[dfa.start_state], BTreeSet::from([13, 14]));
        assert_eq!(ann.possible_sets[dfa.run(b"@o")], BTreeSet::from([14]));
        assert!(ann.reject_sets.iter().all(BTreeSet::is_empty));
        assert_eq!(ann.accept_sets.len(), dfa.state_count());
    }

    #[test]
    fn overlapping_patterns_accept_together() {
        let regexes = BTreeMap::from([(0, "[a-z]+".to_owned()), (1, "if".to_owned())]);
        let (dfa, ann) = build_scanner(&regexes).unwrap();
        assert_eq!(accepted(&dfa, &ann, b"if"), BTreeSet::from([0, 1]));
        assert_eq!(accepted(&dfa, &ann, b"iff"), BTreeSet::from([0]));
        assert!(ann.possible_sets[dfa.run(b"iff")].contains(&0));
    }

    #[test]
    fn bad_regex_names_its_terminal() {
        let regexes = BTreeMap::from([(7, "(".to_owned())]);
        let err = build_scanner(&regexes).unwrap_err();
        assert!(matches!(err, CompositionError::Regex { terminal: 7, .. }));
    }
}
