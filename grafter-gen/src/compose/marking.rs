use super::copy::{CopiedTables, pack};
use super::sizing::{MarkingTerminalData, Sizing};
use crate::counterexample::Conflict;
use crate::error::CompositionError;
use crate::fragment::{ExtensionFragmentData, FragmentView, HostFragmentData};
use crate::scanner::{ScannerAnnotations, ScannerDfa, build_scanner};
use grafter::EngineAction;
use std::collections::{BTreeMap, BTreeSet};

/// Writes the marking-terminal columns of every state.
///
/// A state shifts a marking terminal when the terminal's hook nonterminal can
/// start there, and reduces on it for every production the state's lookahead
/// sources list under the hook. A later write replaces an earlier one; each
/// replacement of a different non-error action is returned as a conflict.
pub fn fill_marking_terminals(
    tables: &mut CopiedTables,
    host: &HostFragmentData,
    extensions: &[ExtensionFragmentData],
    sizing: &Sizing,
) -> Result<Vec<Conflict>, CompositionError> {
    let mut conflicts = Vec::new();
    if sizing.marking_terminals.is_empty() {
        return Ok(conflicts);
    }
    fill_fragment(tables, &host.view(), 0, sizing, &mut conflicts)?;
    for (id, ext) in extensions.iter().enumerate() {
        fill_fragment(tables, &ext.view(id), sizing.ext_state_offsets[id], sizing, &mut conflicts)?;
    }
    Ok(conflicts)
}

fn fill_fragment(
    tables: &mut CopiedTables,
    view: &FragmentView<'_>,
    state_offset: usize,
    sizing: &Sizing,
    conflicts: &mut Vec<Conflict>,
) -> Result<(), CompositionError> {
    for state in 0..view.table.size() {
        let row = state + state_offset;
        let init_nts = view.init_nts(state);
        for mt in &sizing.marking_terminals {
            if init_nts.contains(&mt.host_lhs) {
                let target = u32::try_from(mt.offset_transition_state).map_err(|_| {
                    CompositionError::ActionParameterOverflow {
                        parameter: mt.offset_transition_state,
                    }
                })?;
                write(tables, row, mt.end_index, EngineAction::Shift(target), conflicts)?;
            }
        }
        let Some(la_sources) = view.la_sources(state) else {
            continue;
        };
        for mt in &sizing.marking_terminals {
            for &production in la_sources.get(&mt.host_lhs).into_iter().flatten() {
                let production = u32::try_from(production)
                    .map_err(|_| CompositionError::ActionParameterOverflow { parameter: production })?;
                write(tables, row, mt.end_index, EngineAction::Reduce(production), conflicts)?;
            }
        }
    }
    Ok(())
}

fn write(
    tables: &mut CopiedTables,
    row: usize,
    column: usize,
    action: EngineAction,
    conflicts: &mut Vec<Conflict>,
) -> Result<(), CompositionError> {
    let cell = &mut tables.parse_table[row][column];
    let existing = EngineAction::decode(*cell);
    if !existing.is_error() && existing != action {
        let conflict = Conflict::new(row, column, existing, action);
        log::warn!("{}", conflict);
        conflicts.push(conflict);
    }
    log::trace!("marking column {} of state {}: {:?}", column, row, action);
    *cell = pack(action)?;
    Ok(())
}

/// Scanner for the marking terminals of all extensions, the lexical side of
/// fragment 0.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MarkingScanner {
    /// Marking terminals ordered by merged column.
    pub terminals: Vec<MarkingTerminalData>,
    pub dfa: ScannerDfa,
    pub annotations: ScannerAnnotations,
    /// Layout sets used while scanning for marking terminals: empty in every
    /// state.
    pub layout_sets: Vec<BTreeSet<usize>>,
}

pub fn marking_scanner(
    extensions: &[ExtensionFragmentData],
    sizing: &Sizing,
) -> Result<MarkingScanner, CompositionError> {
    let mut terminals = sizing.marking_terminals.clone();
    terminals.sort_by_key(|mt| mt.end_index);
    let mut regexes = BTreeMap::new();
    for mt in &terminals {
        let def = extensions
            .get(mt.extension_id)
            .and_then(|ext| ext.marking_terminals.get(&mt.extension_terminal))
            .ok_or(CompositionError::UnknownReference {
                index: mt.extension_terminal,
                context: "marking terminal",
            })?;
        regexes.insert(mt.end_index, def.regex.clone());
    }
    let (dfa, annotations) = build_scanner(&regexes)?;
    Ok(MarkingScanner {
        terminals,
        dfa,
        annotations,
        layout_sets: vec![BTreeSet::new(); sizing.total_state_count],
    })
}
