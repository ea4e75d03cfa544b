//! Resolved grammar specifications.
//!
//! A [`ParserSpec`] is the already-resolved form of a grammar: every symbol
//! has a number, every category lists its members, and per-symbol data is
//! keyed by those numbers. The attribute structs are generic over the index
//! type so the same shapes hold composed data (`usize`) and its decomposed
//! translation ([`Decomposed`](crate::index::Decomposed)).

use crate::index::bit_length;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// The seven symbol categories, in partitioning order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SymbolCategory {
    Terminal,
    Nonterminal,
    Production,
    DisambiguationFunction,
    TerminalClass,
    OperatorClass,
    ParserAttribute,
}

impl SymbolCategory {
    pub const ALL: [SymbolCategory; 7] = [
        SymbolCategory::Terminal,
        SymbolCategory::Nonterminal,
        SymbolCategory::Production,
        SymbolCategory::DisambiguationFunction,
        SymbolCategory::TerminalClass,
        SymbolCategory::OperatorClass,
        SymbolCategory::ParserAttribute,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            SymbolCategory::Terminal => "terminal",
            SymbolCategory::Nonterminal => "nonterminal",
            SymbolCategory::Production => "production",
            SymbolCategory::DisambiguationFunction => "disambiguation function",
            SymbolCategory::TerminalClass => "terminal class",
            SymbolCategory::OperatorClass => "operator class",
            SymbolCategory::ParserAttribute => "parser attribute",
        }
    }
}

impl fmt::Display for SymbolCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Associativity {
    #[default]
    None,
    Left,
    Right,
    NonAssoc,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(serialize = "S: Serialize", deserialize = "S: Deserialize<'de> + Ord"))]
pub struct TerminalAttrs<S = usize> {
    pub regex: String,
    #[serde(default)]
    pub terminal_classes: BTreeSet<S>,
    #[serde(default)]
    pub transparent_prefix: Option<S>,
    #[serde(default)]
    pub operator_class: Option<S>,
    #[serde(default)]
    pub operator_precedence: i32,
    #[serde(default)]
    pub operator_associativity: Associativity,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(serialize = "S: Serialize", deserialize = "S: Deserialize<'de> + Ord"))]
pub struct NonterminalAttrs<S = usize> {
    pub productions: BTreeSet<S>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(serialize = "S: Serialize", deserialize = "S: Deserialize<'de> + Ord"))]
pub struct ProductionAttrs<S = usize> {
    pub lhs: S,
    pub rhs: Vec<S>,
    #[serde(default)]
    pub operator: Option<S>,
    #[serde(default)]
    pub precedence: i32,
    #[serde(default)]
    pub has_layout: bool,
    #[serde(default)]
    pub layouts: BTreeSet<S>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(serialize = "S: Serialize", deserialize = "S: Deserialize<'de> + Ord"))]
pub struct DisambiguationFunctionAttrs<S = usize> {
    pub members: BTreeSet<S>,
    #[serde(default)]
    pub disambiguate_to: Option<S>,
    #[serde(default)]
    pub applies_to_subsets: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(serialize = "S: Serialize", deserialize = "S: Deserialize<'de> + Ord"))]
pub struct TerminalClassAttrs<S = usize> {
    pub members: BTreeSet<S>,
}

/// A resolved grammar in one index space.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserSpec {
    pub terminals: BTreeSet<usize>,
    pub nonterminals: BTreeSet<usize>,
    pub productions: BTreeSet<usize>,
    pub disambiguation_functions: BTreeSet<usize>,
    pub terminal_classes: BTreeSet<usize>,
    pub operator_classes: BTreeSet<usize>,
    pub parser_attributes: BTreeSet<usize>,

    pub t: BTreeMap<usize, TerminalAttrs>,
    pub nt: BTreeMap<usize, NonterminalAttrs>,
    pub pr: BTreeMap<usize, ProductionAttrs>,
    pub df: BTreeMap<usize, DisambiguationFunctionAttrs>,
    pub tc: BTreeMap<usize, TerminalClassAttrs>,

    pub start_production: usize,
    pub eof_terminal: usize,
}

impl ParserSpec {
    pub fn symbols(&self, category: SymbolCategory) -> &BTreeSet<usize> {
        match category {
            SymbolCategory::Terminal => &self.terminals,
            SymbolCategory::Nonterminal => &self.nonterminals,
            SymbolCategory::Production => &self.productions,
            SymbolCategory::DisambiguationFunction => &self.disambiguation_functions,
            SymbolCategory::TerminalClass => &self.terminal_classes,
            SymbolCategory::OperatorClass => &self.operator_classes,
            SymbolCategory::ParserAttribute => &self.parser_attributes,
        }
    }

    pub fn symbols_mut(&mut self, category: SymbolCategory) -> &mut BTreeSet<usize> {
        match category {
            SymbolCategory::Terminal => &mut self.terminals,
            SymbolCategory::Nonterminal => &mut self.nonterminals,
            SymbolCategory::Production => &mut self.productions,
            SymbolCategory::DisambiguationFunction => &mut self.disambiguation_functions,
            SymbolCategory::TerminalClass => &mut self.terminal_classes,
            SymbolCategory::OperatorClass => &mut self.operator_classes,
            SymbolCategory::ParserAttribute => &mut self.parser_attributes,
        }
    }

    /// Right-hand-side lengths, dense by production number. Numbers without
    /// production data get length 0.
    pub fn production_lengths(&self) -> Vec<usize> {
        let mut lengths = vec![0; bit_length(&self.productions)];
        for (&p, attrs) in &self.pr {
            if let Some(slot) = lengths.get_mut(p) {
                *slot = attrs.rhs.len();
            }
        }
        lengths
    }
}
