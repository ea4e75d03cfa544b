//! Small host and extension fragments shared by the tests.
//!
//! Host grammar (composed numbers 0..=9):
//!
//! ```text
//! ^    ::= Stmt $        (7)
//! Stmt ::= Expr ';'      (8)
//! Expr ::= 'x'           (9)
//! ```
//!
//! with `ws` as layout. The extension adds a literal expression behind a
//! marking terminal on the hook `Expr`:
//!
//! ```text
//! Expr    ::= MARK ExtExpr   (13)
//! ExtExpr ::= lit            (14)
//! ```
//!
//! plus one disambiguation function (15), terminal class (16), operator
//! class (17) and parser attribute (18), all extension-owned.

use crate::fragment::{ExtensionBundle, ExtensionFragmentData, HostFragmentData, MarkingTerminalDef};
use crate::index::Decomposed;
use crate::scanner::build_scanner;
use crate::spec::{
    Associativity, DisambiguationFunctionAttrs, NonterminalAttrs, ParserSpec, ProductionAttrs,
    SymbolCategory, TerminalAttrs, TerminalClassAttrs,
};
use crate::symtab::{SymbolBean, SymbolTable};
use crate::table::{LookaheadAndLayoutSets, LrAction, LrParseTable, TransparentPrefixes};
use std::collections::{BTreeMap, BTreeSet};

pub const EOF: usize = 0;
pub const X: usize = 1;
pub const SEMI: usize = 2;
pub const WS: usize = 3;
pub const START: usize = 4;
pub const STMT: usize = 5;
pub const EXPR: usize = 6;
pub const P_START: usize = 7;
pub const P_STMT: usize = 8;
pub const P_EXPR_X: usize = 9;
pub const LIT: usize = 10;
pub const MARK: usize = 11;
pub const EXT_EXPR: usize = 12;
pub const P_EXPR_EXT: usize = 13;
pub const P_EXT_LIT: usize = 14;
pub const DF_LIT: usize = 15;
pub const TC_LIT: usize = 16;
pub const OC_EXT: usize = 17;
pub const PA_EXT: usize = 18;

pub const HOST_SYMBOL_COUNT: usize = 10;
pub const HOST_STATE_COUNT: usize = 5;
pub const EXT_STATE_COUNT: usize = 3;

/// Extension table columns of `lit`, `MARK` and `ExtExpr`.
pub const LIT_COLUMN: usize = HOST_SYMBOL_COUNT;
pub const MARK_COLUMN: usize = HOST_SYMBOL_COUNT + 1;
pub const EXT_EXPR_COLUMN: usize = HOST_SYMBOL_COUNT + 2;

/// Extension-local terminal number of `MARK`.
pub const MARK_LOCAL: usize = 1;

fn terminal(regex: &str) -> TerminalAttrs {
    TerminalAttrs {
        regex: regex.to_owned(),
        ..TerminalAttrs::default()
    }
}

fn production(lhs: usize, rhs: &[usize]) -> ProductionAttrs {
    ProductionAttrs {
        lhs,
        rhs: rhs.to_vec(),
        operator: None,
        precedence: 0,
        has_layout: false,
        layouts: BTreeSet::new(),
    }
}

pub fn host_spec() -> ParserSpec {
    let mut spec = ParserSpec {
        terminals: BTreeSet::from([EOF, X, SEMI, WS]),
        nonterminals: BTreeSet::from([START, STMT, EXPR]),
        productions: BTreeSet::from([P_START, P_STMT, P_EXPR_X]),
        start_production: P_START,
        eof_terminal: EOF,
        ..ParserSpec::default()
    };
    spec.t.insert(EOF, terminal(""));
    spec.t.insert(X, terminal("x"));
    spec.t.insert(SEMI, terminal(";"));
    spec.t.insert(WS, terminal("[ ]+"));
    spec.nt.insert(START, NonterminalAttrs { productions: BTreeSet::from([P_START]) });
    spec.nt.insert(STMT, NonterminalAttrs { productions: BTreeSet::from([P_STMT]) });
    spec.nt.insert(EXPR, NonterminalAttrs { productions: BTreeSet::from([P_EXPR_X]) });
    spec.pr.insert(P_START, production(START, &[STMT, EOF]));
    spec.pr.insert(P_STMT, production(STMT, &[EXPR, SEMI]));
    spec.pr.insert(P_EXPR_X, production(EXPR, &[X]));
    spec
}

pub fn host_symbol_table() -> SymbolTable {
    [
        SymbolBean::new(SymbolCategory::Terminal, "EOF").with_display_name("<end of input>"),
        SymbolBean::new(SymbolCategory::Terminal, "x").with_display_name("'x'"),
        SymbolBean::new(SymbolCategory::Terminal, "semi").with_display_name("';'"),
        SymbolBean::new(SymbolCategory::Terminal, "ws"),
        SymbolBean::new(SymbolCategory::Nonterminal, "^"),
        SymbolBean::new(SymbolCategory::Nonterminal, "Stmt"),
        SymbolBean::new(SymbolCategory::Nonterminal, "Expr"),
        SymbolBean::new(SymbolCategory::Production, "start"),
        SymbolBean::new(SymbolCategory::Production, "stmt"),
        SymbolBean::new(SymbolCategory::Production, "expr_x"),
    ]
    .into_iter()
    .collect()
}

/// The composed grammar of the host and the one extension.
pub fn full_spec() -> ParserSpec {
    let mut spec = host_spec();
    spec.terminals.extend([LIT, MARK]);
    spec.nonterminals.insert(EXT_EXPR);
    spec.productions.extend([P_EXPR_EXT, P_EXT_LIT]);
    spec.disambiguation_functions.insert(DF_LIT);
    spec.terminal_classes.insert(TC_LIT);
    spec.operator_classes.insert(OC_EXT);
    spec.parser_attributes.insert(PA_EXT);

    spec.t.insert(
        LIT,
        TerminalAttrs {
            regex: "[0-9]+".to_owned(),
            terminal_classes: BTreeSet::from([TC_LIT]),
            transparent_prefix: None,
            operator_class: Some(OC_EXT),
            operator_precedence: 5,
            operator_associativity: Associativity::Left,
        },
    );
    spec.t.insert(MARK, terminal("@ext"));
    spec.nt.get_mut(&EXPR).unwrap().productions.insert(P_EXPR_EXT);
    spec.nt.insert(EXT_EXPR, NonterminalAttrs { productions: BTreeSet::from([P_EXT_LIT]) });
    spec.pr.insert(
        P_EXPR_EXT,
        ProductionAttrs {
            has_layout: true,
            layouts: BTreeSet::from([WS]),
            ..production(EXPR, &[MARK, EXT_EXPR])
        },
    );
    spec.pr.insert(
        P_EXT_LIT,
        ProductionAttrs {
            operator: Some(LIT),
            precedence: 5,
            ..production(EXT_EXPR, &[LIT])
        },
    );
    spec.df.insert(
        DF_LIT,
        DisambiguationFunctionAttrs {
            members: BTreeSet::from([X, LIT]),
            disambiguate_to: Some(LIT),
            applies_to_subsets: false,
        },
    );
    spec.tc.insert(TC_LIT, TerminalClassAttrs { members: BTreeSet::from([LIT]) });
    spec
}

pub fn full_symbol_table() -> SymbolTable {
    host_symbol_table()
        .iter()
        .cloned()
        .chain([
            SymbolBean::new(SymbolCategory::Terminal, "lit").with_display_name("literal"),
            SymbolBean::new(SymbolCategory::Terminal, "mark"),
            SymbolBean::new(SymbolCategory::Nonterminal, "ExtExpr"),
            SymbolBean::new(SymbolCategory::Production, "expr_ext"),
            SymbolBean::new(SymbolCategory::Production, "ext_lit"),
            SymbolBean::new(SymbolCategory::DisambiguationFunction, "lit_or_x"),
            SymbolBean::new(SymbolCategory::TerminalClass, "literals"),
            SymbolBean::new(SymbolCategory::OperatorClass, "ext_ops"),
            SymbolBean::new(SymbolCategory::ParserAttribute, "ext_depth"),
        ])
        .collect()
}

pub fn host_state_map() -> BTreeMap<usize, usize> {
    (0..HOST_STATE_COUNT).map(|s| (s, s)).collect()
}

pub fn extension_states() -> BTreeSet<usize> {
    (HOST_STATE_COUNT..HOST_STATE_COUNT + EXT_STATE_COUNT).collect()
}

pub fn host_fragment() -> HostFragmentData {
    let mut table = LrParseTable::new(HOST_STATE_COUNT);
    table.set(0, X, LrAction::Shift(Decomposed::Host(3)));
    table.set(0, STMT, LrAction::Goto(Decomposed::Host(1)));
    table.set(0, EXPR, LrAction::Goto(Decomposed::Host(2)));
    table.set(1, EOF, LrAction::Accept);
    table.set(2, SEMI, LrAction::Shift(Decomposed::Host(4)));
    table.set(3, SEMI, LrAction::Reduce(P_EXPR_X));
    table.set(4, EOF, LrAction::Reduce(P_STMT));

    let regexes = BTreeMap::from([
        (X, "x".to_owned()),
        (SEMI, ";".to_owned()),
        (WS, "[ ]+".to_owned()),
    ]);
    let (scanner_dfa, scanner_annotations) = build_scanner(&regexes).unwrap();

    let mut init_nts = vec![BTreeSet::new(); HOST_STATE_COUNT];
    init_nts[0] = BTreeSet::from([STMT, EXPR]);

    HostFragmentData {
        spec: host_spec(),
        symbol_table: host_symbol_table(),
        parse_table: table,
        lookahead_sets: LookaheadAndLayoutSets {
            lookaheads: vec![
                BTreeSet::from([X]),
                BTreeSet::from([EOF]),
                BTreeSet::from([SEMI]),
                BTreeSet::from([SEMI]),
                BTreeSet::from([EOF]),
            ],
            layouts: vec![BTreeSet::from([WS]); HOST_STATE_COUNT],
        },
        prefixes: TransparentPrefixes::default(),
        scanner_dfa,
        scanner_annotations,
        init_nts,
        la_sources: vec![BTreeMap::new(); HOST_STATE_COUNT],
    }
}

pub fn extension_bundle(name: &str, marking_regex: &str) -> ExtensionBundle {
    // extension-local states: 0 entry, 1 after lit, 2 after ExtExpr
    let mut table = LrParseTable::new(EXT_STATE_COUNT);
    table.set(0, LIT_COLUMN, LrAction::Shift(Decomposed::Extension(1)));
    table.set(0, EXT_EXPR_COLUMN, LrAction::Goto(Decomposed::Extension(2)));
    table.set(1, SEMI, LrAction::Reduce(P_EXT_LIT));
    table.set(2, SEMI, LrAction::Reduce(P_EXPR_EXT));

    let regexes = BTreeMap::from([(LIT_COLUMN, "[0-9]+".to_owned())]);
    let (scanner_dfa, scanner_annotations) = build_scanner(&regexes).unwrap();

    let mut prefixes = vec![BTreeSet::new(); EXT_STATE_COUNT];
    prefixes[1] = BTreeSet::from([WS]);

    ExtensionBundle {
        name: name.to_owned(),
        full_spec: full_spec(),
        full_symbol_table: full_symbol_table(),
        composed_to_host_states: host_state_map(),
        composed_extension_states: extension_states(),
        appended_table: table,
        lookahead_sets: LookaheadAndLayoutSets {
            lookaheads: vec![BTreeSet::from([LIT_COLUMN]), BTreeSet::from([SEMI]), BTreeSet::from([SEMI])],
            layouts: vec![BTreeSet::from([WS]); EXT_STATE_COUNT],
        },
        prefixes: TransparentPrefixes { prefixes },
        scanner_dfa,
        scanner_annotations,
        init_nts: vec![BTreeSet::new(); EXT_STATE_COUNT],
        la_sources: vec![BTreeMap::new(); EXT_STATE_COUNT],
        marking_terminals: BTreeMap::from([(
            MARK_LOCAL,
            MarkingTerminalDef {
                hook_nonterminal: EXPR,
                entry_state: Decomposed::Extension(0),
                regex: marking_regex.to_owned(),
            },
        )]),
    }
}

pub fn extension_fragment(name: &str, marking_regex: &str) -> ExtensionFragmentData {
    extension_bundle(name, marking_regex).into_fragment(&host_spec()).unwrap()
}
