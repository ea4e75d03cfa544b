//! Host and extension fragments: everything the merge step needs from each
//! independently generated parser.

use crate::error::CompositionError;
use crate::index::{Decomposed, bit_length};
use crate::mapping::ExtensionMappingSpec;
use crate::scanner::{ScannerAnnotations, ScannerDfa};
use crate::spec::{ParserSpec, SymbolCategory};
use crate::symtab::SymbolTable;
use crate::table::{LookaheadAndLayoutSets, LrParseTable, TransparentPrefixes};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

static NO_NONTERMINALS: BTreeSet<usize> = BTreeSet::new();

/// A marking terminal declared by an extension: when the host scanner sees
/// `regex` in a state that can start `hook_nonterminal`, the parser shifts
/// into `entry_state`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkingTerminalDef {
    pub hook_nonterminal: usize,
    pub entry_state: Decomposed,
    pub regex: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostFragmentData {
    pub spec: ParserSpec,
    pub symbol_table: SymbolTable,
    pub parse_table: LrParseTable,
    pub lookahead_sets: LookaheadAndLayoutSets,
    pub prefixes: TransparentPrefixes,
    pub scanner_dfa: ScannerDfa,
    pub scanner_annotations: ScannerAnnotations,
    /// Nonterminals whose derivations can start in each state.
    pub init_nts: Vec<BTreeSet<usize>>,
    /// Per state, hook nonterminal to the productions reducible on it.
    pub la_sources: Vec<BTreeMap<usize, BTreeSet<usize>>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtensionFragmentData {
    pub name: String,
    pub mapping: ExtensionMappingSpec,
    pub appended_table: LrParseTable,
    pub lookahead_sets: LookaheadAndLayoutSets,
    pub prefixes: TransparentPrefixes,
    pub scanner_dfa: ScannerDfa,
    pub scanner_annotations: ScannerAnnotations,
    pub init_nts: Vec<BTreeSet<usize>>,
    pub la_sources: Vec<BTreeMap<usize, BTreeSet<usize>>>,
    /// Keyed by the marking terminal's extension-local terminal number.
    pub marking_terminals: BTreeMap<usize, MarkingTerminalDef>,
}

/// An extension as shipped by its generator, before partitioning.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtensionBundle {
    pub name: String,
    pub full_spec: ParserSpec,
    pub full_symbol_table: SymbolTable,
    pub composed_to_host_states: BTreeMap<usize, usize>,
    pub composed_extension_states: BTreeSet<usize>,
    pub appended_table: LrParseTable,
    pub lookahead_sets: LookaheadAndLayoutSets,
    pub prefixes: TransparentPrefixes,
    pub scanner_dfa: ScannerDfa,
    pub scanner_annotations: ScannerAnnotations,
    pub init_nts: Vec<BTreeSet<usize>>,
    pub la_sources: Vec<BTreeMap<usize, BTreeSet<usize>>>,
    pub marking_terminals: BTreeMap<usize, MarkingTerminalDef>,
}

impl ExtensionBundle {
    pub fn into_fragment(self, host_spec: &ParserSpec) -> Result<ExtensionFragmentData, CompositionError> {
        let mapping = ExtensionMappingSpec::new(
            &self.full_spec,
            &self.full_symbol_table,
            host_spec,
            &self.composed_to_host_states,
            &self.composed_extension_states,
        )?;
        Ok(ExtensionFragmentData {
            name: self.name,
            mapping,
            appended_table: self.appended_table,
            lookahead_sets: self.lookahead_sets,
            prefixes: self.prefixes,
            scanner_dfa: self.scanner_dfa,
            scanner_annotations: self.scanner_annotations,
            init_nts: self.init_nts,
            la_sources: self.la_sources,
            marking_terminals: self.marking_terminals,
        })
    }
}

/// The serialized input of a composition run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositionInput {
    pub host: HostFragmentData,
    #[serde(default)]
    pub extensions: Vec<ExtensionBundle>,
}

impl CompositionInput {
    /// Partitions every extension against the host, in registration order.
    pub fn into_fragments(self) -> Result<(HostFragmentData, Vec<ExtensionFragmentData>), CompositionError> {
        let extensions = self
            .extensions
            .into_iter()
            .map(|bundle| bundle.into_fragment(&self.host.spec))
            .collect::<Result<Vec<_>, _>>()?;
        Ok((self.host, extensions))
    }
}

/// Which fragment a [`FragmentView`] looks at.
#[derive(Clone, Copy, Debug)]
pub enum Owner<'a> {
    Host,
    Extension {
        id: usize,
        mapping: &'a ExtensionMappingSpec,
    },
}

/// Column classes of a fragment LR table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnClass {
    Terminal,
    Nonterminal,
}

/// The parts of a fragment shared by host and extensions.
#[derive(Clone, Copy, Debug)]
pub struct FragmentView<'a> {
    pub owner: Owner<'a>,
    pub name: &'a str,
    pub table: &'a LrParseTable,
    pub lookahead_sets: &'a LookaheadAndLayoutSets,
    pub prefixes: &'a TransparentPrefixes,
    pub init_nts: &'a [BTreeSet<usize>],
    pub la_sources: &'a [BTreeMap<usize, BTreeSet<usize>>],
}

impl HostFragmentData {
    pub fn view(&self) -> FragmentView<'_> {
        FragmentView {
            owner: Owner::Host,
            name: "host",
            table: &self.parse_table,
            lookahead_sets: &self.lookahead_sets,
            prefixes: &self.prefixes,
            init_nts: &self.init_nts,
            la_sources: &self.la_sources,
        }
    }

    pub fn state_count(&self) -> usize {
        self.parse_table.size()
    }

    pub fn terminal_count(&self) -> usize {
        bit_length(&self.spec.terminals)
    }

    /// Widest column the host table may use.
    pub fn table_width(&self) -> usize {
        bit_length(&self.spec.terminals).max(bit_length(&self.spec.nonterminals))
    }
}

impl ExtensionFragmentData {
    pub fn view(&self, id: usize) -> FragmentView<'_> {
        FragmentView {
            owner: Owner::Extension {
                id,
                mapping: &self.mapping,
            },
            name: &self.name,
            table: &self.appended_table,
            lookahead_sets: &self.lookahead_sets,
            prefixes: &self.prefixes,
            init_nts: &self.init_nts,
            la_sources: &self.la_sources,
        }
    }

    pub fn state_count(&self) -> usize {
        self.appended_table.size()
    }
}

impl FragmentView<'_> {
    pub fn init_nts(&self, state: usize) -> &BTreeSet<usize> {
        self.init_nts.get(state).unwrap_or(&NO_NONTERMINALS)
    }

    pub fn la_sources(&self, state: usize) -> Option<&BTreeMap<usize, BTreeSet<usize>>> {
        self.la_sources.get(state)
    }

    /// Number of terminal indices the fragment may refer to.
    pub fn terminal_count(&self, host_spec: &ParserSpec) -> usize {
        match self.owner {
            Owner::Host => bit_length(&host_spec.terminals),
            Owner::Extension { mapping, .. } => mapping.extension_terminal_count(),
        }
    }

    /// Classifies a column of this fragment's table. Extension columns at or
    /// past the symbol table offset are looked up among the extension's own
    /// symbols, all others among the host's.
    pub fn classify(&self, column: usize, host_spec: &ParserSpec) -> Option<ColumnClass> {
        if let Owner::Extension { mapping, .. } = self.owner {
            if column >= mapping.extension_symbol_table_offset {
                return match mapping.extension_column_category(column)? {
                    SymbolCategory::Terminal => Some(ColumnClass::Terminal),
                    _ => Some(ColumnClass::Nonterminal),
                };
            }
        }
        if host_spec.terminals.contains(&column) {
            Some(ColumnClass::Terminal)
        } else if host_spec.nonterminals.contains(&column) {
            Some(ColumnClass::Nonterminal)
        } else {
            None
        }
    }
}
