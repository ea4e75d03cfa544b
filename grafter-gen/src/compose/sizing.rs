use crate::error::CompositionError;
use crate::fragment::{ExtensionFragmentData, HostFragmentData};
use crate::index::Decomposed;
use grafter::EngineAction;

/// A marking terminal placed in the merged table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MarkingTerminalData {
    pub extension_id: usize,
    /// Terminal number within the extension.
    pub extension_terminal: usize,
    /// Host nonterminal the extension hooks into.
    pub host_lhs: usize,
    /// Global state the marking terminal shifts to.
    pub offset_transition_state: usize,
    /// Merged column, past every ordinary column.
    pub end_index: usize,
}

/// Global layout of the merged table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sizing {
    pub host_state_count: usize,
    /// First global state of each extension.
    pub ext_state_offsets: Vec<usize>,
    pub ext_state_counts: Vec<usize>,
    pub total_state_count: usize,
    /// Widest ordinary column count across all fragments.
    pub max_table_symbols: usize,
    /// Final column count, marking-terminal columns included.
    pub table_width: usize,
    pub marking_terminals: Vec<MarkingTerminalData>,
}

impl Sizing {
    pub fn compute(host: &HostFragmentData, extensions: &[ExtensionFragmentData]) -> Result<Self, CompositionError> {
        let host_state_count = host.state_count();
        let mut total_state_count = host_state_count;
        let mut max_table_symbols = host.table_width();
        let mut ext_state_offsets = Vec::with_capacity(extensions.len());
        let mut ext_state_counts = Vec::with_capacity(extensions.len());
        for ext in extensions {
            ext_state_offsets.push(total_state_count);
            ext_state_counts.push(ext.state_count());
            total_state_count += ext.state_count();
            max_table_symbols = max_table_symbols.max(ext.mapping.table_width());
        }

        let mut table_width = max_table_symbols;
        let mut marking_terminals = Vec::new();
        for (extension_id, ext) in extensions.iter().enumerate() {
            for (&extension_terminal, def) in &ext.marking_terminals {
                if !host.spec.nonterminals.contains(&def.hook_nonterminal) {
                    return Err(CompositionError::UnknownHookNonterminal {
                        extension: ext.name.clone(),
                        terminal: extension_terminal,
                        nonterminal: def.hook_nonterminal,
                    });
                }
                let offset_transition_state = match def.entry_state {
                    Decomposed::Host(h) if (h as usize) < host_state_count => h as usize,
                    Decomposed::Extension(e) if (e as usize) < ext.state_count() => {
                        e as usize + ext_state_offsets[extension_id]
                    }
                    other => {
                        return Err(CompositionError::StateOutOfRange {
                            fragment: ext.name.clone(),
                            state: other.local(),
                            count: ext.state_count(),
                        });
                    }
                };
                marking_terminals.push(MarkingTerminalData {
                    extension_id,
                    extension_terminal,
                    host_lhs: def.hook_nonterminal,
                    offset_transition_state,
                    end_index: table_width,
                });
                table_width += 1;
            }
        }

        let largest = total_state_count.max(table_width);
        if largest > EngineAction::MAX_PARAMETER as usize {
            return Err(CompositionError::ActionParameterOverflow { parameter: largest });
        }

        log::debug!(
            "sizing: {} host states, {} total states, {} ordinary columns, {} marking terminals",
            host_state_count,
            total_state_count,
            max_table_symbols,
            marking_terminals.len()
        );
        Ok(Self {
            host_state_count,
            ext_state_offsets,
            ext_state_counts,
            total_state_count,
            max_table_symbols,
            table_width,
            marking_terminals,
        })
    }

    /// Fragment 0 is the host; extension `i` is fragment `i + 1`.
    pub fn fragment_count(&self) -> usize {
        self.ext_state_offsets.len() + 1
    }

    pub fn fragment_id_for_state(&self, state: usize) -> usize {
        if state < self.host_state_count {
            return 0;
        }
        for (i, offset) in self.ext_state_offsets.iter().enumerate().skip(1) {
            if state < *offset {
                return i;
            }
        }
        self.ext_state_offsets.len()
    }
}
