use crate::spec::SymbolCategory;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Inconsistencies found while partitioning or merging fragments.
#[derive(Debug, Error)]
pub enum CompositionError {
    #[error("state {state} is both a host state and an extension state")]
    OverlappingState { state: usize },

    #[error("state {state} is neither a host state nor an extension state")]
    StateCoverage { state: usize },

    #[error("composed index {index} is listed both as a {first} and as a {second}")]
    DuplicateComposedIndex {
        index: usize,
        first: SymbolCategory,
        second: SymbolCategory,
    },

    #[error("host {category} {index} is not part of the composed grammar")]
    HostSymbolNotComposed { category: SymbolCategory, index: usize },

    #[error("composed {category} {index} has no symbol table entry")]
    UncoveredSymbol { category: SymbolCategory, index: usize },

    #[error("composed {category} {index} is recorded as a {found} in the symbol table")]
    SymbolKindMismatch {
        category: SymbolCategory,
        index: usize,
        found: SymbolCategory,
    },

    #[error("composed {category} {index} has no grammar data")]
    MissingSymbolData { category: SymbolCategory, index: usize },

    #[error("reference to unknown composed symbol {index} from {context}")]
    UnknownReference { index: usize, context: &'static str },

    #[error("index {index} does not fit a 32-bit decomposed index")]
    IndexOverflow { index: usize },

    #[error("{fragment}: state {state} is out of range ({count} states)")]
    StateOutOfRange {
        fragment: String,
        state: usize,
        count: usize,
    },

    #[error("{fragment}: host table refers to extension state {state}")]
    UnexpectedExtensionState { fragment: String, state: usize },

    #[error("{fragment}: column {column} of state {state} is neither a terminal nor a nonterminal")]
    UnclassifiedColumn {
        fragment: String,
        state: usize,
        column: usize,
    },

    #[error("{fragment}: column {column} exceeds the table width {width}")]
    ColumnOutOfRange {
        fragment: String,
        column: usize,
        width: usize,
    },

    #[error("{fragment}: terminal {terminal} exceeds the terminal count {count}")]
    TerminalOutOfRange {
        fragment: String,
        terminal: usize,
        count: usize,
    },

    #[error("{extension}: marking terminal {terminal} hooks {nonterminal}, which is not a host nonterminal")]
    UnknownHookNonterminal {
        extension: String,
        terminal: usize,
        nonterminal: usize,
    },

    #[error("action parameter {parameter} does not fit a packed table cell")]
    ActionParameterOverflow { parameter: usize },

    #[error("terminal {terminal}: invalid regex {regex:?}: {message}")]
    Regex {
        terminal: usize,
        regex: String,
        message: String,
    },

    #[error("scanner construction failed: {0}")]
    Scanner(String),

    #[error("invalid parser name {0:?}")]
    InvalidParserName(String),

    #[error("artifact serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Failures of a full generation run, with the exit status the CLI reports.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("cannot read composition input {}: {source}", .path.display())]
    Input {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed composition input: {0}")]
    Decode(#[source] serde_json::Error),

    #[error(transparent)]
    Composition(#[from] CompositionError),

    #[error("cannot open output file {} for writing: {source}", .path.display())]
    OutputOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("I/O error in code generation: {0}")]
    Io(#[from] io::Error),
}

impl GenerateError {
    pub fn exit_code(&self) -> u8 {
        match self {
            GenerateError::OutputOpen { .. } => 2,
            _ => 1,
        }
    }
}
