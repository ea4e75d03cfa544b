//! Conflict diagnostics.
//!
//! A [`Conflict`] records one table cell claimed by two different actions. When
//! the derivations leading to the two actions are known, a [`Counterexample`]
//! shows them one above the other:
//!
//! ```text
//! Example:
//! shift derivation:
//! Expr
//! Expr • '+' Expr
//! reduce derivation:
//! Expr
//! Expr '+' Expr •
//! ```

use grafter::EngineAction;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConflictKind {
    ShiftReduce,
    ReduceReduce,
}

impl ConflictKind {
    /// Kind of the conflict between two actions on the same lookahead.
    pub fn between(first: EngineAction, second: EngineAction) -> Self {
        if matches!(first, EngineAction::Shift(_)) || matches!(second, EngineAction::Shift(_)) {
            ConflictKind::ShiftReduce
        } else {
            ConflictKind::ReduceReduce
        }
    }

    fn labels(self) -> (&'static str, &'static str) {
        match self {
            ConflictKind::ShiftReduce => ("shift derivation:", "reduce derivation:"),
            ConflictKind::ReduceReduce => ("first reduce derivation:", "second reduce derivation:"),
        }
    }
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConflictKind::ShiftReduce => "shift/reduce",
            ConflictKind::ReduceReduce => "reduce/reduce",
        })
    }
}

/// One cell of the merged table written twice with different actions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Conflict {
    pub state: usize,
    pub column: usize,
    pub kind: ConflictKind,
    /// Action that was in the cell first.
    pub first: EngineAction,
    /// Action that replaced it.
    pub second: EngineAction,
}

impl Conflict {
    pub fn new(state: usize, column: usize, first: EngineAction, second: EngineAction) -> Self {
        Self {
            state,
            column,
            kind: ConflictKind::between(first, second),
            first,
            second,
        }
    }
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} conflict in state {} on column {}: {:?} replaced by {:?}",
            self.kind, self.state, self.column, self.first, self.second
        )
    }
}

/// Something that can draw itself into a grid of text lines.
pub trait Derivation {
    /// Draws with the top-left corner at (`row`, `col`), adding lines as
    /// needed, and returns the width used.
    fn pretty_print(&self, lines: &mut Vec<String>, row: usize, col: usize) -> usize;
}

/// A derivation tree: symbols, with the conflict point marked by a dot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DerivationTree {
    Leaf(String),
    Dot,
    Node {
        symbol: String,
        children: Vec<DerivationTree>,
    },
}

impl DerivationTree {
    pub fn leaf(symbol: &str) -> Self {
        DerivationTree::Leaf(symbol.to_owned())
    }

    pub fn node(symbol: &str, children: Vec<DerivationTree>) -> Self {
        DerivationTree::Node {
            symbol: symbol.to_owned(),
            children,
        }
    }
}

/// Writes `text` at (`row`, `col`), padding with spaces.
fn put(lines: &mut Vec<String>, row: usize, col: usize, text: &str) {
    while lines.len() <= row {
        lines.push(String::new());
    }
    let line = &mut lines[row];
    let width = line.chars().count();
    if width < col {
        line.extend(std::iter::repeat_n(' ', col - width));
    }
    line.push_str(text);
}

impl Derivation for DerivationTree {
    fn pretty_print(&self, lines: &mut Vec<String>, row: usize, col: usize) -> usize {
        match self {
            DerivationTree::Leaf(symbol) => {
                put(lines, row, col, symbol);
                symbol.chars().count()
            }
            DerivationTree::Dot => {
                put(lines, row, col, "•");
                1
            }
            DerivationTree::Node { symbol, children } => {
                put(lines, row, col, symbol);
                let mut width = 0;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        width += 1;
                    }
                    width += child.pretty_print(lines, row + 1, col + width);
                }
                width.max(symbol.chars().count())
            }
        }
    }
}

/// Two competing derivations of the same input prefix.
#[derive(Clone, Debug)]
pub struct Counterexample<D: Derivation> {
    pub derivation1: D,
    pub derivation2: D,
    pub kind: ConflictKind,
}

impl<D: Derivation> Counterexample<D> {
    pub fn new(derivation1: D, derivation2: D, kind: ConflictKind) -> Self {
        Self {
            derivation1,
            derivation2,
            kind,
        }
    }
}

fn render(derivation: &dyn Derivation) -> Vec<String> {
    let mut lines = vec![String::new()];
    derivation.pretty_print(&mut lines, 0, 0);
    lines
}

impl<D: Derivation> fmt::Display for Counterexample<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (first, second) = self.kind.labels();
        writeln!(f, "Example:")?;
        writeln!(f, "{first}")?;
        for line in render(&self.derivation1) {
            writeln!(f, "{line}")?;
        }
        writeln!(f, "{second}")?;
        for line in render(&self.derivation2) {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}
