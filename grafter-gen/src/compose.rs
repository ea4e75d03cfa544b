//! Merges one host fragment and its extensions into a single engine.
//!
//! The merge runs as a pipeline of stages:
//!  1. [`Sizing`] lays out the global state and column space,
//!  2. [`CopiedTables`] copies every fragment table into it,
//!  3. marking-terminal cells are filled in, recording any [`Conflict`],
//!  4. the marking-terminal scanner is built,
//!  5. every table is serialized and hashed into an [`ArtifactSet`],
//!  6. the Rust driver is emitted.

mod artifacts;
mod copy;
mod emit;
mod marking;
mod sizing;

pub use artifacts::{Artifact, ArtifactKind, ArtifactSet, ArtifactValue};
pub use copy::CopiedTables;
pub use emit::{EmitOptions, emit_driver};
pub use marking::{MarkingScanner, fill_marking_terminals, marking_scanner};
pub use sizing::{MarkingTerminalData, Sizing};

use crate::counterexample::Conflict;
use crate::error::{CompositionError, GenerateError};
use crate::fragment::{CompositionInput, ExtensionFragmentData, HostFragmentData};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Everything the merge produces before emission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComposedEngine {
    pub sizing: Sizing,
    pub tables: CopiedTables,
    pub conflicts: Vec<Conflict>,
    pub marking_scanner: MarkingScanner,
    pub artifacts: ArtifactSet,
}

pub fn build_engine(
    host: &HostFragmentData,
    extensions: &[ExtensionFragmentData],
) -> Result<ComposedEngine, CompositionError> {
    let sizing = Sizing::compute(host, extensions)?;
    let mut tables = CopiedTables::copy(host, extensions, &sizing)?;
    let conflicts = fill_marking_terminals(&mut tables, host, extensions, &sizing)?;
    let marking_scanner = marking_scanner(extensions, &sizing)?;
    let artifacts = ArtifactSet::assemble(&tables, &marking_scanner, host, extensions)?;
    if !conflicts.is_empty() {
        log::warn!("{} conflicts on marking terminals", conflicts.len());
    }
    Ok(ComposedEngine {
        sizing,
        tables,
        conflicts,
        marking_scanner,
        artifacts,
    })
}

/// `calc_ext` becomes `CalcExt`.
fn camel_case(name: &str) -> String {
    name.split(['_', '-'])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            }
        })
        .collect()
}

/// Reads a JSON [`CompositionInput`], merges it and writes the driver to
/// `output_dir/{name}.rs`. Returns the path written.
pub fn generate<P: AsRef<Path>, Q: AsRef<Path>>(
    input_path: P,
    output_dir: Q,
    name: &str,
) -> Result<PathBuf, GenerateError> {
    let started = Instant::now();
    let input_path = input_path.as_ref();
    let bytes = std::fs::read(input_path).map_err(|source| GenerateError::Input {
        path: input_path.to_path_buf(),
        source,
    })?;
    let input: CompositionInput = serde_json::from_slice(&bytes).map_err(GenerateError::Decode)?;
    let options = EmitOptions::new(&camel_case(name))?;
    log::debug!(
        "read {} ({} extensions)",
        input_path.display(),
        input.extensions.len()
    );

    let (host, extensions) = input.into_fragments()?;
    let engine = build_engine(&host, &extensions)?;

    let out_path = output_dir.as_ref().join(format!("{}.rs", name));
    let file = File::create(&out_path).map_err(|source| GenerateError::OutputOpen {
        path: out_path.clone(),
        source,
    })?;
    let mut out = BufWriter::new(file);
    emit_driver(&mut out, &engine, &host, &extensions, &options)?;
    out.flush()?;

    log::info!(
        "wrote {} ({} states, {} columns, {} conflicts) in {:?}",
        out_path.display(),
        engine.sizing.total_state_count,
        engine.sizing.table_width,
        engine.conflicts.len(),
        started.elapsed()
    );
    Ok(out_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fragment_data::*;
    use grafter::EngineAction;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn scratch_dir(test: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("grafter-gen-{}-{}", test, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_input(dir: &Path) -> PathBuf {
        let input = CompositionInput {
            host: host_fragment(),
            extensions: vec![extension_bundle("ext", "@ext")],
        };
        let path = dir.join("input.json");
        std::fs::write(&path, serde_json::to_vec(&input).unwrap()).unwrap();
        path
    }

    #[test]
    fn camel_case_names() {
        assert_eq!(camel_case("calc_ext"), "CalcExt");
        assert_eq!(camel_case("calc"), "Calc");
        assert_eq!(camel_case("my-lang__v2"), "MyLangV2");
    }

    #[test]
    fn host_only_engine() {
        init();
        let host = host_fragment();
        let engine = build_engine(&host, &[]).unwrap();
        assert_eq!(engine.sizing.total_state_count, HOST_STATE_COUNT);
        assert_eq!(engine.tables.parse_table.len(), HOST_STATE_COUNT);
        assert!(engine.conflicts.is_empty());
        assert!(engine.marking_scanner.terminals.is_empty());
        for state in 0..HOST_STATE_COUNT {
            assert_eq!(engine.sizing.fragment_id_for_state(state), 0);
        }
        assert_eq!(
            EngineAction::decode(engine.tables.parse_table[1][EOF]),
            EngineAction::Accept
        );
    }

    #[test]
    fn extension_engine() {
        init();
        let host = host_fragment();
        let extensions = [extension_fragment("ext", "@ext")];
        let engine = build_engine(&host, &extensions).unwrap();
        assert_eq!(engine.sizing.total_state_count, HOST_STATE_COUNT + EXT_STATE_COUNT);
        let mark = engine.sizing.marking_terminals[0].end_index;
        assert_eq!(
            EngineAction::decode(engine.tables.parse_table[0][mark]),
            EngineAction::Shift(HOST_STATE_COUNT as u32)
        );
        // extension state 0 shifts `lit` to extension state 1
        assert_eq!(
            EngineAction::decode(engine.tables.parse_table[HOST_STATE_COUNT][LIT_COLUMN]),
            EngineAction::Shift(HOST_STATE_COUNT as u32 + 1)
        );
        assert_eq!(engine.artifacts.iter().count(), ArtifactKind::ALL.len());
    }

    #[test]
    fn generate_writes_the_driver() {
        init();
        let dir = scratch_dir("generate");
        let input = write_input(&dir);
        let out = generate(&input, &dir, "calc_ext").unwrap();
        assert_eq!(out, dir.join("calc_ext.rs"));
        let text = std::fs::read_to_string(&out).unwrap();
        assert!(text.contains("impl FragmentTables for CalcExt {"));
        assert!(text.contains("pub const FRAGMENT_COUNT: usize = 2;"));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn unwritable_output_exits_with_2() {
        init();
        let dir = scratch_dir("unwritable");
        let input = write_input(&dir);
        let err = generate(&input, dir.join("missing").join("deeper"), "calc").unwrap_err();
        assert!(matches!(err, GenerateError::OutputOpen { .. }));
        assert_eq!(err.exit_code(), 2);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn bad_input_is_reported() {
        init();
        let dir = scratch_dir("bad-input");
        let err = generate(dir.join("absent.json"), &dir, "calc").unwrap_err();
        assert!(matches!(err, GenerateError::Input { .. }));

        let garbage = dir.join("garbage.json");
        std::fs::write(&garbage, b"{ not json").unwrap();
        let err = generate(&garbage, &dir, "calc").unwrap_err();
        assert!(matches!(err, GenerateError::Decode(_)));
        assert_eq!(err.exit_code(), 1);

        let input = write_input(&dir);
        let err = generate(&input, &dir, "9lives").unwrap_err();
        assert!(matches!(
            err,
            GenerateError::Composition(CompositionError::InvalidParserName(_))
        ));
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
