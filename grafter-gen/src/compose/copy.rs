use super::sizing::Sizing;
use crate::error::CompositionError;
use crate::fragment::{ColumnClass, ExtensionFragmentData, FragmentView, HostFragmentData, Owner};
use crate::index::Decomposed;
use crate::spec::ParserSpec;
use crate::table::LrAction;
use grafter::{
    EngineAction, TERMINAL_EXCLUSIVELY_LAYOUT, TERMINAL_EXCLUSIVELY_PREFIX, TERMINAL_EXCLUSIVELY_SHIFTABLE,
    TERMINAL_USES_UNCONSTRAINED,
};
use std::collections::BTreeSet;

/// Merged tables after every fragment has been copied in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CopiedTables {
    /// Packed cells, `total_state_count` rows of `table_width` columns.
    pub parse_table: Vec<Vec<u32>>,
    pub layout_sets: Vec<BTreeSet<usize>>,
    pub host_terminal_uses: Vec<u8>,
    pub ext_terminal_uses: Vec<Vec<u8>>,
}

pub(super) fn pack(action: EngineAction) -> Result<u32, CompositionError> {
    action.encode().ok_or(CompositionError::ActionParameterOverflow {
        parameter: action.parameter() as usize,
    })
}

fn parameter(value: usize) -> Result<u32, CompositionError> {
    u32::try_from(value).map_err(|_| CompositionError::ActionParameterOverflow { parameter: value })
}

impl CopiedTables {
    pub fn copy(
        host: &HostFragmentData,
        extensions: &[ExtensionFragmentData],
        sizing: &Sizing,
    ) -> Result<Self, CompositionError> {
        let mut tables = Self {
            parse_table: vec![vec![0; sizing.table_width]; sizing.total_state_count],
            layout_sets: vec![BTreeSet::new(); sizing.total_state_count],
            host_terminal_uses: Vec::new(),
            ext_terminal_uses: Vec::with_capacity(extensions.len()),
        };

        let host_view = host.view();
        let mut uses = vec![TERMINAL_USES_UNCONSTRAINED; host_view.terminal_count(&host.spec)];
        tables.copy_fragment(&host_view, 0, sizing, &host.spec, &mut uses)?;
        tables.host_terminal_uses = uses;

        for (id, ext) in extensions.iter().enumerate() {
            let view = ext.view(id);
            let mut uses = vec![TERMINAL_USES_UNCONSTRAINED; view.terminal_count(&host.spec)];
            tables.copy_fragment(&view, sizing.ext_state_offsets[id], sizing, &host.spec, &mut uses)?;
            tables.ext_terminal_uses.push(uses);
        }
        Ok(tables)
    }

    fn copy_fragment(
        &mut self,
        view: &FragmentView<'_>,
        state_offset: usize,
        sizing: &Sizing,
        host_spec: &ParserSpec,
        uses: &mut [u8],
    ) -> Result<(), CompositionError> {
        let state_count = view.table.size();
        let resolve = |target: Decomposed| -> Result<u32, CompositionError> {
            let state = match (target, view.owner) {
                (Decomposed::Host(h), _) if (h as usize) < sizing.host_state_count => h as usize,
                (Decomposed::Extension(e), Owner::Extension { .. }) if (e as usize) < state_count => {
                    e as usize + state_offset
                }
                (Decomposed::Extension(e), Owner::Host) => {
                    return Err(CompositionError::UnexpectedExtensionState {
                        fragment: view.name.to_owned(),
                        state: e as usize,
                    });
                }
                (other, _) => {
                    return Err(CompositionError::StateOutOfRange {
                        fragment: view.name.to_owned(),
                        state: other.local(),
                        count: if other.is_extension() { state_count } else { sizing.host_state_count },
                    });
                }
            };
            parameter(state)
        };
        let terminal_count = uses.len();
        let restrict = |uses: &mut [u8], terminal: usize, mask: u8| -> Result<(), CompositionError> {
            let slot = uses.get_mut(terminal).ok_or_else(|| CompositionError::TerminalOutOfRange {
                fragment: view.name.to_owned(),
                terminal,
                count: terminal_count,
            })?;
            *slot &= mask;
            Ok(())
        };

        for state in 0..state_count {
            let row = state + state_offset;
            for column in view.table.valid_lookaheads(state) {
                if column >= sizing.max_table_symbols {
                    return Err(CompositionError::ColumnOutOfRange {
                        fragment: view.name.to_owned(),
                        column,
                        width: sizing.max_table_symbols,
                    });
                }
                let class = view.classify(column, host_spec).ok_or_else(|| CompositionError::UnclassifiedColumn {
                    fragment: view.name.to_owned(),
                    state,
                    column,
                })?;
                let action = view.table.action(state, column);
                let merged = match (class, action) {
                    (ColumnClass::Terminal, LrAction::Accept) if column == host_spec.eof_terminal => EngineAction::Accept,
                    (ColumnClass::Terminal, LrAction::Shift(target)) => EngineAction::Shift(resolve(target)?),
                    (ColumnClass::Terminal, LrAction::Reduce(production)) => {
                        EngineAction::Reduce(parameter(production)?)
                    }
                    (ColumnClass::Nonterminal, LrAction::Goto(target)) => EngineAction::Goto(resolve(target)?),
                    (_, LrAction::Error) => EngineAction::Error,
                    (class, action) => {
                        log::trace!(
                            "{}: dropping {:?} on {:?} column {} of state {}",
                            view.name,
                            action,
                            class,
                            column,
                            state
                        );
                        EngineAction::Error
                    }
                };
                self.parse_table[row][column] = pack(merged)?;
                if class == ColumnClass::Terminal {
                    restrict(uses, column, TERMINAL_EXCLUSIVELY_SHIFTABLE)?;
                }
            }

            let layout = view.lookahead_sets.layout(state);
            for &terminal in layout {
                restrict(uses, terminal, TERMINAL_EXCLUSIVELY_LAYOUT)?;
            }
            self.layout_sets[row].extend(layout.iter().copied());

            for &terminal in view.prefixes.prefixes(state) {
                restrict(uses, terminal, TERMINAL_EXCLUSIVELY_PREFIX)?;
            }
        }
        log::debug!("copied {} states of {} at offset {}", state_count, view.name, state_offset);
        Ok(())
    }
}
