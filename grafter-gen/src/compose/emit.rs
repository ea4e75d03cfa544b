use super::ComposedEngine;
use super::artifacts::ArtifactKind;
use crate::error::CompositionError;
use crate::fragment::{ExtensionFragmentData, HostFragmentData};
use crate::index::bit_length;
use crate::spec::SymbolCategory;
use crate::symtab::SymbolTable;
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::{self, Write};

static IDENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"^[A-Za-z_][A-Za-z0-9_]*$"#).unwrap());

/// How the driver is named and what goes at its top.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmitOptions {
    pub parser_name: String,
    /// Copied verbatim after the header comment.
    pub preamble: Option<String>,
}

impl EmitOptions {
    pub fn new(parser_name: &str) -> Result<Self, CompositionError> {
        if !IDENT_RE.is_match(parser_name) {
            return Err(CompositionError::InvalidParserName(parser_name.to_owned()));
        }
        Ok(Self {
            parser_name: parser_name.to_owned(),
            preamble: None,
        })
    }

    pub fn with_preamble(mut self, preamble: &str) -> Self {
        self.preamble = Some(preamble.to_owned());
        self
    }
}

/// Writes the Rust driver for a composed engine.
///
/// The driver embeds every artifact as a byte array next to its SHA-256
/// digest and implements [`grafter::FragmentTables`] over the tables, which
/// are verified and decoded once on first use.
pub fn emit_driver<W: Write>(
    out: &mut W,
    engine: &ComposedEngine,
    host: &HostFragmentData,
    extensions: &[ExtensionFragmentData],
    options: &EmitOptions,
) -> io::Result<()> {
    let sizing = &engine.sizing;
    let name = &options.parser_name;

    writeln!(out, "/*")?;
    writeln!(out, "Produced by fragment composer GRAFTER")?;
    writeln!(
        out,
        "Copyright (c) 2005-2025 IKH Software, Inc. <support@ikhsoftware.com>"
    )?;
    writeln!(out)?;
    writeln!(out, "Fragments:")?;
    writeln!(
        out,
        "  0: host, {} states, marking scanner",
        sizing.host_state_count
    )?;
    for (id, ext) in extensions.iter().enumerate() {
        writeln!(
            out,
            "  {}: {}, {} states from {}",
            id + 1,
            ext.name,
            sizing.ext_state_counts[id],
            sizing.ext_state_offsets[id]
        )?;
    }
    if !sizing.marking_terminals.is_empty() {
        writeln!(out, "Marking terminals:")?;
        for mt in &sizing.marking_terminals {
            writeln!(
                out,
                "  column {}: {} terminal {} on {}, enters state {}",
                mt.end_index,
                extensions[mt.extension_id].name,
                mt.extension_terminal,
                host.symbol_table.name(mt.host_lhs).unwrap_or("?"),
                mt.offset_transition_state
            )?;
        }
    }
    if !engine.conflicts.is_empty() {
        writeln!(out, "Conflicts:")?;
        for conflict in &engine.conflicts {
            writeln!(out, "  {}", conflict)?;
        }
    }
    writeln!(out, "*/\n")?;

    if let Some(preamble) = &options.preamble {
        writeln!(out, "{}\n", preamble.trim_end())?;
    }

    writeln!(out, "use grafter::once_cell::sync::OnceCell;")?;
    writeln!(
        out,
        "use grafter::{{ArtifactError, FragmentTables, TerminalName, conjoined_terminal_uses, load_artifact}};"
    )?;
    writeln!(out, "use std::collections::BTreeSet;")?;
    writeln!(out)?;

    writeln!(out, "pub const FRAGMENT_COUNT: usize = {};", sizing.fragment_count())?;
    writeln!(out, "pub const HOST_STATE_COUNT: usize = {};", sizing.host_state_count)?;
    writeln!(out, "pub const TOTAL_STATE_COUNT: usize = {};", sizing.total_state_count)?;
    writeln!(out, "pub const EXT_STATE_OFFSETS: &[usize] = &{:?};", sizing.ext_state_offsets)?;
    let symbol_offsets: Vec<usize> = extensions
        .iter()
        .map(|ext| ext.mapping.extension_symbol_table_offset)
        .collect();
    writeln!(out, "pub const EXT_SYMBOL_TABLE_OFFSETS: &[usize] = &{:?};", symbol_offsets)?;
    writeln!(out, "pub const MARKING_TERMINAL_OFFSET: usize = {};", sizing.max_table_symbols)?;
    writeln!(out, "pub const EOF_TERMINAL: usize = {};", host.spec.eof_terminal)?;
    writeln!(out)?;

    emit_terminal_names(out, host, extensions, engine)?;

    for (kind, artifact) in engine.artifacts.iter() {
        let prefix = kind.const_prefix();
        writeln!(out, "pub static {}_BYTES: &[u8] = &[", prefix)?;
        for chunk in artifact.bytes.chunks(16) {
            let line: Vec<String> = chunk.iter().map(|b| format!("0x{:02x}", b)).collect();
            writeln!(out, "    {},", line.join(", "))?;
        }
        writeln!(out, "];")?;
        writeln!(out, "pub const {}_HASH: &str = {:?};\n", prefix, artifact.hash)?;
    }

    writeln!(out, "pub struct {}Arrays {{", name)?;
    for kind in ArtifactKind::ALL {
        writeln!(out, "    pub {}: {},", kind.field_name(), kind.type_name())?;
    }
    writeln!(out, "}}\n")?;

    writeln!(out, "fn init_arrays() -> Result<{}Arrays, ArtifactError> {{", name)?;
    writeln!(out, "    Ok({}Arrays {{", name)?;
    for kind in ArtifactKind::ALL {
        let prefix = kind.const_prefix();
        writeln!(
            out,
            "        {0}: load_artifact({0:?}, {1}_BYTES, {1}_HASH)?,",
            kind.field_name(),
            prefix
        )?;
    }
    writeln!(out, "    }})")?;
    writeln!(out, "}}\n")?;

    writeln!(out, "static ARRAYS: OnceCell<{}Arrays> = OnceCell::new();\n", name)?;

    writeln!(out, "pub struct {} {{", name)?;
    writeln!(out, "    arrays: &'static {}Arrays,", name)?;
    writeln!(out, "}}\n")?;
    writeln!(out, "impl {} {{", name)?;
    writeln!(out, "    /// Verifies and decodes the tables on first use.")?;
    writeln!(out, "    pub fn try_new() -> Result<Self, ArtifactError> {{")?;
    writeln!(out, "        let arrays = ARRAYS.get_or_try_init(init_arrays)?;")?;
    writeln!(out, "        Ok(Self {{ arrays }})")?;
    writeln!(out, "    }}\n")?;
    writeln!(out, "    pub fn arrays(&self) -> &'static {}Arrays {{", name)?;
    writeln!(out, "        self.arrays")?;
    writeln!(out, "    }}")?;
    writeln!(out, "}}\n")?;

    emit_fragment_tables(out, engine, extensions, name)
}

fn terminal_name(symbol_table: &SymbolTable, index: usize) -> String {
    match symbol_table.get(index) {
        Some(bean) if bean.kind == SymbolCategory::Terminal => format!(
            "Some(TerminalName::new({:?}, {:?}))",
            bean.name.as_str(),
            bean.display()
        ),
        _ => "None".to_owned(),
    }
}

fn emit_terminal_names<W: Write>(
    out: &mut W,
    host: &HostFragmentData,
    extensions: &[ExtensionFragmentData],
    engine: &ComposedEngine,
) -> io::Result<()> {
    writeln!(out, "pub static HOST_TERMINAL_NAMES: &[Option<TerminalName>] = &[")?;
    for t in 0..host.terminal_count() {
        let name = if host.spec.terminals.contains(&t) {
            terminal_name(&host.symbol_table, t)
        } else {
            "None".to_owned()
        };
        writeln!(out, "    /* {} */ {},", t, name)?;
    }
    writeln!(out, "];\n")?;

    writeln!(out, "pub static EXT_TERMINAL_NAMES: &[&[Option<TerminalName>]] = &[")?;
    for ext in extensions {
        writeln!(out, "    /* {} */ &[", ext.name)?;
        let terminals = ext.mapping.extension_indices.get(SymbolCategory::Terminal);
        for e in 0..bit_length(terminals) {
            let name = if terminals.contains(&e) {
                terminal_name(&ext.mapping.symbol_table, e)
            } else {
                "None".to_owned()
            };
            writeln!(out, "        {},", name)?;
        }
        writeln!(out, "    ],")?;
    }
    writeln!(out, "];\n")?;

    writeln!(out, "pub static MARKING_TERMINAL_NAMES: &[Option<TerminalName>] = &[")?;
    for mt in &engine.marking_scanner.terminals {
        let name = terminal_name(&extensions[mt.extension_id].mapping.symbol_table, mt.extension_terminal);
        writeln!(out, "    /* {} */ {},", mt.end_index, name)?;
    }
    writeln!(out, "];\n")
}

fn emit_fragment_tables<W: Write>(
    out: &mut W,
    engine: &ComposedEngine,
    extensions: &[ExtensionFragmentData],
    name: &str,
) -> io::Result<()> {
    let sizing = &engine.sizing;

    writeln!(out, "impl FragmentTables for {} {{", name)?;
    writeln!(out, "    fn fragment_count(&self) -> usize {{")?;
    writeln!(out, "        FRAGMENT_COUNT")?;
    writeln!(out, "    }}\n")?;

    writeln!(out, "    fn state_to_fragment_id(&self, state: usize) -> usize {{")?;
    writeln!(out, "        if state < HOST_STATE_COUNT {{")?;
    writeln!(out, "            return 0;")?;
    writeln!(out, "        }}")?;
    for (id, offset) in sizing.ext_state_offsets.iter().enumerate().skip(1) {
        writeln!(out, "        if state < {} {{", offset)?;
        writeln!(out, "            return {};", id)?;
        writeln!(out, "        }}")?;
    }
    writeln!(out, "        {}", extensions.len())?;
    writeln!(out, "    }}\n")?;

    writeln!(out, "    fn parse_table(&self) -> &[Vec<u32>] {{")?;
    writeln!(out, "        &self.arrays.parse_table")?;
    writeln!(out, "    }}\n")?;

    for (method, field, item) in [
        ("production_lengths", "production_lengths", "usize"),
        ("fragment_transition_table", "deltas", "Vec<usize>"),
        ("fragment_accept_sets", "accept_sets", "BTreeSet<usize>"),
        ("fragment_reject_sets", "reject_sets", "BTreeSet<usize>"),
        ("fragment_possible_sets", "possible_sets", "BTreeSet<usize>"),
    ] {
        writeln!(out, "    fn {}(&self, fragment_id: usize) -> &[{}] {{", method, item)?;
        writeln!(
            out,
            "        self.arrays.{}.get(fragment_id).map(Vec::as_slice).unwrap_or_default()",
            field
        )?;
        writeln!(out, "    }}\n")?;
    }

    writeln!(out, "    fn fragment_terminal_count(&self, fragment_id: usize) -> usize {{")?;
    writeln!(out, "        match fragment_id {{")?;
    writeln!(out, "            0 => {},", sizing.table_width)?;
    for (id, ext) in extensions.iter().enumerate() {
        writeln!(out, "            {} => {},", id + 1, ext.mapping.extension_terminal_count())?;
    }
    writeln!(out, "            _ => 0,")?;
    writeln!(out, "        }}")?;
    writeln!(out, "    }}\n")?;

    writeln!(out, "    fn fragment_start_state(&self, fragment_id: usize) -> Option<usize> {{")?;
    writeln!(out, "        match fragment_id {{")?;
    writeln!(out, "            0 => Some({}),", engine.marking_scanner.dfa.start_state)?;
    for (id, ext) in extensions.iter().enumerate() {
        writeln!(out, "            {} => Some({}),", id + 1, ext.scanner_dfa.start_state)?;
    }
    writeln!(out, "            _ => None,")?;
    writeln!(out, "        }}")?;
    writeln!(out, "    }}\n")?;

    writeln!(out, "    fn fragment_eof_terminal(&self, _fragment_id: usize) -> usize {{")?;
    writeln!(out, "        EOF_TERMINAL")?;
    writeln!(out, "    }}\n")?;

    writeln!(out, "    fn fragment_layout_sets(&self, fragment_id: usize) -> &[BTreeSet<usize>] {{")?;
    writeln!(out, "        if fragment_id == 0 {{")?;
    writeln!(out, "            &self.arrays.marking_terminal_layout_sets")?;
    writeln!(out, "        }} else {{")?;
    writeln!(out, "            &self.arrays.layout_sets")?;
    writeln!(out, "        }}")?;
    writeln!(out, "    }}\n")?;

    writeln!(out, "    fn fragment_terminal_uses(&self, fragment_id: usize, terminal: usize) -> u8 {{")?;
    writeln!(out, "        conjoined_terminal_uses(")?;
    writeln!(out, "            &self.arrays.host_terminal_uses,")?;
    writeln!(out, "            &self.arrays.ext_terminal_uses,")?;
    writeln!(out, "            fragment_id,")?;
    writeln!(out, "            terminal,")?;
    writeln!(out, "        )")?;
    writeln!(out, "    }}\n")?;

    writeln!(out, "    fn terminal_name(&self, fragment_id: usize, terminal: usize) -> Option<TerminalName> {{")?;
    writeln!(out, "        if let Some(marking) = terminal.checked_sub(MARKING_TERMINAL_OFFSET) {{")?;
    writeln!(out, "            return MARKING_TERMINAL_NAMES.get(marking).copied().flatten();")?;
    writeln!(out, "        }}")?;
    writeln!(out, "        if let Some(ext) = fragment_id.checked_sub(1) {{")?;
    writeln!(out, "            let offset = *EXT_SYMBOL_TABLE_OFFSETS.get(ext)?;")?;
    writeln!(out, "            if let Some(local) = terminal.checked_sub(offset) {{")?;
    writeln!(out, "                return EXT_TERMINAL_NAMES.get(ext)?.get(local).copied().flatten();")?;
    writeln!(out, "            }}")?;
    writeln!(out, "        }}")?;
    writeln!(out, "        HOST_TERMINAL_NAMES.get(terminal).copied().flatten()")?;
    writeln!(out, "    }}")?;
    writeln!(out, "}}")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::build_engine;
    use super::*;
    use crate::test_fragment_data::*;

    fn emitted(options: &EmitOptions) -> (ComposedEngine, String) {
        let _ = env_logger::builder().is_test(true).try_init();
        let host = host_fragment();
        let extensions = [extension_fragment("ext", "@ext")];
        let engine = build_engine(&host, &extensions).unwrap();
        let mut out = Vec::new();
        emit_driver(&mut out, &engine, &host, &extensions, options).unwrap();
        (engine, String::from_utf8(out).unwrap())
    }

    #[test]
    fn parser_names_must_be_identifiers() {
        assert!(EmitOptions::new("CalcParser").is_ok());
        assert!(EmitOptions::new("_p2").is_ok());
        for bad in ["", "2fast", "my-parser", "a b"] {
            assert!(matches!(
                EmitOptions::new(bad),
                Err(CompositionError::InvalidParserName(name)) if name == bad
            ));
        }
    }

    #[test]
    fn header_lists_fragments_and_marking_terminals() {
        let (_, text) = emitted(&EmitOptions::new("Calc").unwrap());
        assert!(text.starts_with("/*\nProduced by fragment composer GRAFTER\n"));
        assert!(text.contains("  0: host, 5 states, marking scanner\n"));
        assert!(text.contains("  1: ext, 3 states from 5\n"));
        assert!(text.contains("  column 13: ext terminal 1 on Expr, enters state 5\n"));
        assert!(!text.contains("Conflicts:"));
    }

    #[test]
    fn constants_describe_the_layout() {
        let (_, text) = emitted(&EmitOptions::new("Calc").unwrap());
        assert!(text.contains("pub const FRAGMENT_COUNT: usize = 2;\n"));
        assert!(text.contains("pub const TOTAL_STATE_COUNT: usize = 8;\n"));
        assert!(text.contains("pub const EXT_STATE_OFFSETS: &[usize] = &[5];\n"));
        assert!(text.contains("pub const EXT_SYMBOL_TABLE_OFFSETS: &[usize] = &[10];\n"));
        assert!(text.contains("pub const MARKING_TERMINAL_OFFSET: usize = 13;\n"));
        assert!(text.contains("pub const EOF_TERMINAL: usize = 0;\n"));
    }

    #[test]
    fn artifacts_are_embedded_with_their_hashes() {
        let (engine, text) = emitted(&EmitOptions::new("Calc").unwrap());
        for (kind, artifact) in engine.artifacts.iter() {
            let hash_line = format!("pub const {}_HASH: &str = \"{}\";", kind.const_prefix(), artifact.hash);
            assert!(text.contains(&hash_line), "missing {}", hash_line);
            let first: Vec<String> = artifact.bytes.iter().take(16).map(|b| format!("0x{:02x}", b)).collect();
            let bytes_start = format!("pub static {}_BYTES: &[u8] = &[\n    {},", kind.const_prefix(), first.join(", "));
            assert!(text.contains(&bytes_start), "missing bytes of {}", kind.field_name());
        }
        assert!(text.contains("        parse_table: load_artifact(\"parse_table\", PARSE_TABLE_BYTES, PARSE_TABLE_HASH)?,\n"));
    }

    #[test]
    fn fragment_tables_dispatch() {
        let (_, text) = emitted(&EmitOptions::new("Calc").unwrap());
        assert!(text.contains("pub struct CalcArrays {\n"));
        assert!(text.contains("static ARRAYS: OnceCell<CalcArrays> = OnceCell::new();"));
        assert!(text.contains("impl FragmentTables for Calc {\n"));
        assert!(text.contains("            0 => 14,\n            1 => 12,\n            _ => 0,\n"));
        assert!(text.contains("            0 => Some(1),\n"));
        assert!(text.contains("    /* 13 */ Some(TerminalName::new(\"mark\", \"mark\")),\n"));
    }

    #[test]
    fn preamble_follows_the_header() {
        let options = EmitOptions::new("Calc").unwrap().with_preamble("use crate::ast::Node;\n");
        let (_, text) = emitted(&options);
        assert!(text.contains("*/\n\nuse crate::ast::Node;\n\nuse grafter::once_cell::sync::OnceCell;"));
    }
}
