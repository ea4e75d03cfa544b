//! Index space partitioning for one extension.
//!
//! An extension is generated against the *composed* grammar (host plus that
//! extension), whose numbering knows nothing about fragment boundaries. An
//! [`ExtensionMappingSpec`] splits that numbering in two:
//!
//! * every symbol of every [`SymbolCategory`] is either host-owned or
//!   extension-owned, decided by membership in the host spec;
//! * host-owned symbols keep a running host-local number and extension-owned
//!   symbols get a running extension-local number, both counted across the
//!   seven categories in order;
//! * LR states are split the same way, host states keeping their host
//!   numbering and extension states numbered from 0 in composed order.
//!
//! All per-symbol grammar data of the extension's own symbols is translated
//! into [`Decomposed`] indices so the mapping can be used without the composed
//! spec it was built from.

use crate::error::CompositionError;
use crate::index::{Decomposed, bit_length};
use crate::spec::{
    DisambiguationFunctionAttrs, NonterminalAttrs, ParserSpec, ProductionAttrs, SymbolCategory,
    TerminalAttrs, TerminalClassAttrs,
};
use crate::symtab::SymbolTable;
use std::collections::{BTreeMap, BTreeSet};

/// One index set per symbol category.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CategorySets {
    sets: [BTreeSet<usize>; 7],
}

impl CategorySets {
    pub fn get(&self, category: SymbolCategory) -> &BTreeSet<usize> {
        &self.sets[category.index()]
    }

    fn insert(&mut self, category: SymbolCategory, index: usize) {
        self.sets[category.index()].insert(index);
    }

    pub fn total(&self) -> usize {
        self.sets.iter().map(BTreeSet::len).sum()
    }
}

/// Grammar data of the extension's own symbols, keyed by extension-local
/// index, with every reference decomposed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExtensionSymbolData {
    pub t: BTreeMap<usize, TerminalAttrs<Decomposed>>,
    pub nt: BTreeMap<usize, NonterminalAttrs<Decomposed>>,
    pub pr: BTreeMap<usize, ProductionAttrs<Decomposed>>,
    pub df: BTreeMap<usize, DisambiguationFunctionAttrs<Decomposed>>,
    pub tc: BTreeMap<usize, TerminalClassAttrs<Decomposed>>,
    /// Longest right-hand side, never below 2 (the synthetic start
    /// production `^ ::= S $`).
    pub max_rhs: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtensionMappingSpec {
    pub composed_to_decomposed_states: BTreeMap<usize, Decomposed>,
    pub extension_to_composed_states: Vec<usize>,
    pub composed_extension_states: BTreeSet<usize>,

    pub composed_to_decomposed_symbols: BTreeMap<usize, Decomposed>,
    pub extension_to_composed_symbols: Vec<usize>,
    pub extension_indices: CategorySets,
    pub host_indices: CategorySets,
    pub extension_symbol_count: usize,
    pub host_symbol_count: usize,
    /// First table column used by extension-local symbols.
    pub extension_symbol_table_offset: usize,

    pub data: ExtensionSymbolData,
    /// Extension-owned beans at their extension-local positions.
    pub symbol_table: SymbolTable,
    /// Right-hand-side lengths of the composed grammar, dense by composed
    /// production number.
    pub composed_production_lengths: Vec<usize>,
}

impl ExtensionMappingSpec {
    pub fn new(
        full_spec: &ParserSpec,
        full_symbol_table: &SymbolTable,
        host_spec: &ParserSpec,
        composed_to_host_states: &BTreeMap<usize, usize>,
        composed_extension_states: &BTreeSet<usize>,
    ) -> Result<Self, CompositionError> {
        let (composed_to_decomposed_states, extension_to_composed_states) =
            build_state_maps(composed_to_host_states, composed_extension_states)?;
        let maps = SymbolMaps::generate(full_spec, host_spec)?;
        let symbol_table = maps.generate_symbol_table(full_spec, full_symbol_table)?;
        let data = maps.generate_symbol_data(full_spec)?;

        let extension_symbol_count = maps.extension_to_composed.len();
        let host_symbol_count = maps.host_indices.total();
        log::debug!(
            "partitioned {} composed symbols: {} host, {} extension; {} extension states",
            maps.composed_to_decomposed.len(),
            host_symbol_count,
            extension_symbol_count,
            extension_to_composed_states.len()
        );

        Ok(Self {
            composed_to_decomposed_states,
            extension_to_composed_states,
            composed_extension_states: composed_extension_states.clone(),
            composed_to_decomposed_symbols: maps.composed_to_decomposed,
            extension_to_composed_symbols: maps.extension_to_composed,
            extension_indices: maps.extension_indices,
            host_indices: maps.host_indices,
            extension_symbol_count,
            host_symbol_count,
            extension_symbol_table_offset: host_symbol_count,
            data,
            symbol_table,
            composed_production_lengths: full_spec.production_lengths(),
        })
    }

    /// Number of extension-local indices in the categories preceding
    /// `category`.
    pub fn extension_category_offset(&self, category: SymbolCategory) -> usize {
        SymbolCategory::ALL[..category.index()]
            .iter()
            .map(|&c| self.extension_indices.get(c).len())
            .sum()
    }

    #[inline]
    pub fn table_offset_extension_index(&self, index: usize) -> usize {
        self.extension_symbol_table_offset + index
    }

    /// Terminal count of the extension fragment: host terminals plus the
    /// extension's own terminal columns.
    pub fn extension_terminal_count(&self) -> usize {
        self.table_offset_extension_index(bit_length(self.extension_indices.get(SymbolCategory::Terminal)))
    }

    /// Number of columns the extension's LR table may use.
    pub fn table_width(&self) -> usize {
        let terminals = bit_length(self.extension_indices.get(SymbolCategory::Terminal));
        let nonterminals = bit_length(self.extension_indices.get(SymbolCategory::Nonterminal));
        self.table_offset_extension_index(terminals.max(nonterminals))
    }

    pub fn extension_state_count(&self) -> usize {
        self.extension_to_composed_states.len()
    }

    pub fn decompose_symbol(&self, composed: usize) -> Option<Decomposed> {
        self.composed_to_decomposed_symbols.get(&composed).copied()
    }

    pub fn decompose_state(&self, composed: usize) -> Option<Decomposed> {
        self.composed_to_decomposed_states.get(&composed).copied()
    }

    /// Category of an extension-table column at or past the symbol table
    /// offset, if it names an extension terminal or nonterminal.
    pub fn extension_column_category(&self, column: usize) -> Option<SymbolCategory> {
        let local = column.checked_sub(self.extension_symbol_table_offset)?;
        [SymbolCategory::Terminal, SymbolCategory::Nonterminal]
            .into_iter()
            .find(|&c| self.extension_indices.get(c).contains(&local))
    }
}

fn build_state_maps(
    composed_to_host_states: &BTreeMap<usize, usize>,
    composed_extension_states: &BTreeSet<usize>,
) -> Result<(BTreeMap<usize, Decomposed>, Vec<usize>), CompositionError> {
    let mut composed_to_decomposed = BTreeMap::new();
    for (&composed, &host) in composed_to_host_states {
        composed_to_decomposed.insert(composed, Decomposed::host(host)?);
    }
    let mut extension_to_composed = Vec::with_capacity(composed_extension_states.len());
    for &composed in composed_extension_states {
        if composed_to_host_states.contains_key(&composed) {
            return Err(CompositionError::OverlappingState { state: composed });
        }
        composed_to_decomposed.insert(composed, Decomposed::extension(extension_to_composed.len())?);
        extension_to_composed.push(composed);
    }
    // together the two inputs must number the composed states 0..n
    for (expected, &composed) in composed_to_decomposed.keys().enumerate() {
        if composed != expected {
            return Err(CompositionError::StateCoverage { state: expected });
        }
    }
    Ok((composed_to_decomposed, extension_to_composed))
}

#[derive(Default)]
struct SymbolMaps {
    composed_to_decomposed: BTreeMap<usize, Decomposed>,
    extension_to_composed: Vec<usize>,
    extension_indices: CategorySets,
    host_indices: CategorySets,
}

impl SymbolMaps {
    fn generate(full_spec: &ParserSpec, host_spec: &ParserSpec) -> Result<Self, CompositionError> {
        let mut maps = SymbolMaps::default();
        let mut owner: BTreeMap<usize, SymbolCategory> = BTreeMap::new();
        let mut host_index = 0;
        for category in SymbolCategory::ALL {
            let composed = full_spec.symbols(category);
            let host = host_spec.symbols(category);
            if let Some(&index) = host.difference(composed).next() {
                return Err(CompositionError::HostSymbolNotComposed { category, index });
            }
            for &index in composed {
                if let Some(first) = owner.insert(index, category) {
                    return Err(CompositionError::DuplicateComposedIndex {
                        index,
                        first,
                        second: category,
                    });
                }
                let decomposed = if host.contains(&index) {
                    maps.host_indices.insert(category, host_index);
                    host_index += 1;
                    Decomposed::host(host_index - 1)?
                } else {
                    let local = maps.extension_to_composed.len();
                    maps.extension_indices.insert(category, local);
                    maps.extension_to_composed.push(index);
                    Decomposed::extension(local)?
                };
                log::trace!("{} {} -> {:?}", category, index, decomposed);
                maps.composed_to_decomposed.insert(index, decomposed);
            }
        }
        Ok(maps)
    }

    fn translate(&self, composed: usize, context: &'static str) -> Result<Decomposed, CompositionError> {
        self.composed_to_decomposed
            .get(&composed)
            .copied()
            .ok_or(CompositionError::UnknownReference { index: composed, context })
    }

    fn translate_set(
        &self,
        set: &BTreeSet<usize>,
        context: &'static str,
    ) -> Result<BTreeSet<Decomposed>, CompositionError> {
        set.iter().map(|&i| self.translate(i, context)).collect()
    }

    fn translate_opt(
        &self,
        index: Option<usize>,
        context: &'static str,
    ) -> Result<Option<Decomposed>, CompositionError> {
        index.map(|i| self.translate(i, context)).transpose()
    }

    /// Checks that every composed index has a bean of its own kind, then
    /// projects the extension-owned beans.
    fn generate_symbol_table(
        &self,
        full_spec: &ParserSpec,
        full_symbol_table: &SymbolTable,
    ) -> Result<SymbolTable, CompositionError> {
        for category in SymbolCategory::ALL {
            for &index in full_spec.symbols(category) {
                let bean = full_symbol_table
                    .get(index)
                    .ok_or(CompositionError::UncoveredSymbol { category, index })?;
                if bean.kind != category {
                    return Err(CompositionError::SymbolKindMismatch {
                        category,
                        index,
                        found: bean.kind,
                    });
                }
            }
        }
        self.extension_to_composed
            .iter()
            .map(|&index| {
                full_symbol_table.get(index).cloned().ok_or(CompositionError::UnknownReference {
                    index,
                    context: "symbol table",
                })
            })
            .collect()
    }

    fn generate_symbol_data(&self, full_spec: &ParserSpec) -> Result<ExtensionSymbolData, CompositionError> {
        let mut data = ExtensionSymbolData {
            max_rhs: 2,
            ..ExtensionSymbolData::default()
        };

        for &local in self.extension_indices.get(SymbolCategory::Terminal) {
            let index = self.extension_to_composed[local];
            let attrs = full_spec.t.get(&index).ok_or(CompositionError::MissingSymbolData {
                category: SymbolCategory::Terminal,
                index,
            })?;
            data.t.insert(
                local,
                TerminalAttrs {
                    regex: attrs.regex.clone(),
                    terminal_classes: self.translate_set(&attrs.terminal_classes, "terminal classes")?,
                    transparent_prefix: self.translate_opt(attrs.transparent_prefix, "transparent prefix")?,
                    operator_class: self.translate_opt(attrs.operator_class, "operator class")?,
                    operator_precedence: attrs.operator_precedence,
                    operator_associativity: attrs.operator_associativity,
                },
            );
        }

        let no_productions = NonterminalAttrs::default();
        for &local in self.extension_indices.get(SymbolCategory::Nonterminal) {
            let index = self.extension_to_composed[local];
            let attrs = full_spec.nt.get(&index).unwrap_or(&no_productions);
            data.nt.insert(
                local,
                NonterminalAttrs {
                    productions: self.translate_set(&attrs.productions, "nonterminal productions")?,
                },
            );
        }

        for &local in self.extension_indices.get(SymbolCategory::Production) {
            let index = self.extension_to_composed[local];
            let attrs = full_spec.pr.get(&index).ok_or(CompositionError::MissingSymbolData {
                category: SymbolCategory::Production,
                index,
            })?;
            let rhs = attrs
                .rhs
                .iter()
                .map(|&s| self.translate(s, "production right-hand side"))
                .collect::<Result<Vec<_>, _>>()?;
            data.max_rhs = data.max_rhs.max(rhs.len());
            data.pr.insert(
                local,
                ProductionAttrs {
                    lhs: self.translate(attrs.lhs, "production left-hand side")?,
                    rhs,
                    operator: self.translate_opt(attrs.operator, "production operator")?,
                    precedence: attrs.precedence,
                    has_layout: attrs.has_layout,
                    layouts: self.translate_set(&attrs.layouts, "production layout")?,
                },
            );
        }

        let no_members = DisambiguationFunctionAttrs::default();
        for &local in self.extension_indices.get(SymbolCategory::DisambiguationFunction) {
            let index = self.extension_to_composed[local];
            let attrs = full_spec.df.get(&index).unwrap_or(&no_members);
            data.df.insert(
                local,
                DisambiguationFunctionAttrs {
                    members: self.translate_set(&attrs.members, "disambiguation function members")?,
                    disambiguate_to: self.translate_opt(attrs.disambiguate_to, "disambiguation target")?,
                    applies_to_subsets: attrs.applies_to_subsets,
                },
            );
        }

        let no_class_members = TerminalClassAttrs::default();
        for &local in self.extension_indices.get(SymbolCategory::TerminalClass) {
            let index = self.extension_to_composed[local];
            let attrs = full_spec.tc.get(&index).unwrap_or(&no_class_members);
            data.tc.insert(
                local,
                TerminalClassAttrs {
                    members: self.translate_set(&attrs.members, "terminal class members")?,
                },
            );
        }

        Ok(data)
    }
}
