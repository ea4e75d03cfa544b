//! Copyright (c) 2005–2025 IKH Software, Inc.
//!
//! Released under the terms of the GNU Lesser General Public License, version 3.0
//! or (at your option) any later version (LGPL-3.0-or-later).
//!
//! Runtime support for composed parsers.
//!
//! `grafter-gen` merges one host LR fragment and any number of extension
//! fragments into a single engine and emits a Rust driver for it. The emitted
//! driver links against this crate for:
//!  * **packed table cells** ([`EngineAction`]) and terminal-use masks,
//!  * **artifact loading** ([`load_artifact`]) with SHA-256 verification,
//!  * **the fragment dispatch interface** ([`FragmentTables`]) and the error
//!    reports built on top of it ([`SyntaxError`], [`format_error`]).

mod action;
mod artifact;
mod engine;
mod error;

pub use crate::action::{
    EngineAction, TERMINAL_EXCLUSIVELY_LAYOUT, TERMINAL_EXCLUSIVELY_PREFIX,
    TERMINAL_EXCLUSIVELY_SHIFTABLE, TERMINAL_USES_UNCONSTRAINED,
};
pub use crate::artifact::{ArtifactError, digest, load_artifact};
pub use crate::engine::{FragmentTables, TerminalName, conjoined_terminal_uses};
pub use crate::error::{EngineError, Location, SyntaxError, format_error};

/// Re-exported so generated drivers can build their lazily initialized
/// tables without declaring the dependency themselves.
pub use once_cell;
