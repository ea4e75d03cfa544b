//! Copyright (c) 2005–2025 IKH Software, Inc.
//!
//! Released under the terms of the GNU Lesser General Public License, version 3.0
//! or (at your option) any later version (LGPL-3.0-or-later).
//!
//! Parser fragment composition.
//!
//! `grafter-gen` takes one host parser fragment and any number of extension
//! fragments, each generated independently, and merges them into a single
//! engine:
//!  * **[`mapping`]** partitions a composed grammar into host-local and
//!    extension-local index spaces,
//!  * **[`compose`]** splices the fragment LR tables into one address space,
//!    synthesizes the marking-terminal scanner, hashes every table and emits
//!    the Rust driver that links against the `grafter` runtime,
//!  * **[`counterexample`]** renders competing derivations for conflicts.
//!
//! The `grafter` binary (feature `cli`) drives the whole pipeline from a JSON
//! composition input.

pub mod compose;
pub mod counterexample;
pub mod error;
pub mod fragment;
pub mod index;
pub mod mapping;
pub mod scanner;
pub mod spec;
pub mod symtab;
pub mod table;

#[cfg(test)]
mod test_fragment_data;

pub use crate::compose::{ComposedEngine, EmitOptions, build_engine, emit_driver, generate};
pub use crate::counterexample::{Conflict, ConflictKind, Counterexample, Derivation, DerivationTree};
pub use crate::error::{CompositionError, GenerateError};
pub use crate::fragment::{CompositionInput, ExtensionBundle, ExtensionFragmentData, HostFragmentData};
pub use crate::index::Decomposed;
pub use crate::mapping::ExtensionMappingSpec;
pub use crate::spec::{ParserSpec, SymbolCategory};
