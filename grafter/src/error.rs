//! Error locations and the syntax-error object raised by composed parsers.

use crate::artifact::ArtifactError;
use std::fmt;
use thiserror::Error;

/// Real file names longer than this push the file clause onto its own line.
const LONG_FILE_NAME: usize = 40;

/// A position in an input file.
///
/// A parse tracks two of these: the *virtual* location, which honours line
/// directives and is what users see, and the *real* location in the physical
/// input, which is only used for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    pub file_name: String,
    /// 1-based line number.
    pub line: usize,
    /// 1-based column number.
    pub column: usize,
    /// 0-based character offset from the start of the input.
    pub char_index: usize,
}

impl Location {
    pub fn new(file_name: impl Into<String>, line: usize, column: usize, char_index: usize) -> Self {
        Self {
            file_name: file_name.into(),
            line,
            column,
            char_index,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "line {}, column {} in file {}",
            self.line, self.column, self.file_name
        )
    }
}

/// Formats a parse error message with its location.
///
/// ```text
/// Error at line 3, column 7 in file input.txt
///          (parser state: 12; real character index: 41):
///   unexpected token
/// ```
pub fn format_error(virtual_location: &Location, real_location: &Location, state: usize, message: &str) -> String {
    let mut location = format!("line {}, column {}", virtual_location.line, virtual_location.column);
    if real_location.file_name.chars().count() > LONG_FILE_NAME {
        location.push_str("\n         ");
    }
    location.push_str(" in file ");
    location.push_str(&virtual_location.file_name);
    location.push_str(&format!(
        "\n         (parser state: {}; real character index: {})",
        state, real_location.char_index
    ));
    format!("Error at {}:\n  {}", location, message)
}

/// A syntax error: the lookahead matched terminals none of which the parser
/// state accepts.
///
/// Terminal names are carried twice, in the internal (real) form used in
/// grammar files and in the display form shown to users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub virtual_location: Location,
    pub real_location: Location,
    pub state: usize,
    pub expected_real: Vec<String>,
    pub expected_display: Vec<String>,
    pub matched_real: Vec<String>,
    pub matched_display: Vec<String>,
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "syntax error at {}: expected one of {}, found ",
            self.virtual_location,
            self.expected_display.join(" ")
        )?;
        if self.matched_display.is_empty() {
            write!(f, "<unknown>")
        } else {
            write!(f, "{}", self.matched_display.join(" "))
        }
    }
}

impl std::error::Error for SyntaxError {}

impl SyntaxError {
    /// The full multi-line report, in the same layout as [`format_error`].
    pub fn report(&self) -> String {
        let mut message = format!("Expected one of: {}", self.expected_display.join(" "));
        if !self.matched_display.is_empty() {
            message.push_str(&format!("\n  Input currently matches: {}", self.matched_display.join(" ")));
        }
        format_error(&self.virtual_location, &self.real_location, self.state, &message)
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{0}")]
    Report(String),

    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}
