use super::copy::CopiedTables;
use super::marking::MarkingScanner;
use crate::error::CompositionError;
use crate::fragment::{ExtensionFragmentData, HostFragmentData};
use grafter::digest;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Every table the emitted driver loads at startup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ArtifactKind {
    ParseTable,
    HostTerminalUses,
    ExtTerminalUses,
    MarkingTerminalLayoutSets,
    LayoutSets,
    Deltas,
    AcceptSets,
    RejectSets,
    PossibleSets,
    ProductionLengths,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 10] = [
        ArtifactKind::ParseTable,
        ArtifactKind::HostTerminalUses,
        ArtifactKind::ExtTerminalUses,
        ArtifactKind::MarkingTerminalLayoutSets,
        ArtifactKind::LayoutSets,
        ArtifactKind::Deltas,
        ArtifactKind::AcceptSets,
        ArtifactKind::RejectSets,
        ArtifactKind::PossibleSets,
        ArtifactKind::ProductionLengths,
    ];

    /// Rust type the artifact deserializes into.
    pub fn type_name(self) -> &'static str {
        match self {
            ArtifactKind::ParseTable => "Vec<Vec<u32>>",
            ArtifactKind::HostTerminalUses => "Vec<u8>",
            ArtifactKind::ExtTerminalUses => "Vec<Vec<u8>>",
            ArtifactKind::MarkingTerminalLayoutSets | ArtifactKind::LayoutSets => {
                "Vec<std::collections::BTreeSet<usize>>"
            }
            ArtifactKind::Deltas => "Vec<Vec<Vec<usize>>>",
            ArtifactKind::AcceptSets | ArtifactKind::RejectSets | ArtifactKind::PossibleSets => {
                "Vec<Vec<std::collections::BTreeSet<usize>>>"
            }
            ArtifactKind::ProductionLengths => "Vec<Vec<usize>>",
        }
    }

    /// Field holding the artifact in the emitted driver.
    pub fn field_name(self) -> &'static str {
        match self {
            ArtifactKind::ParseTable => "parse_table",
            ArtifactKind::HostTerminalUses => "host_terminal_uses",
            ArtifactKind::ExtTerminalUses => "ext_terminal_uses",
            ArtifactKind::MarkingTerminalLayoutSets => "marking_terminal_layout_sets",
            ArtifactKind::LayoutSets => "layout_sets",
            ArtifactKind::Deltas => "deltas",
            ArtifactKind::AcceptSets => "accept_sets",
            ArtifactKind::RejectSets => "reject_sets",
            ArtifactKind::PossibleSets => "possible_sets",
            ArtifactKind::ProductionLengths => "production_lengths",
        }
    }

    /// Prefix of the `_BYTES` and `_HASH` constants in the emitted driver.
    pub fn const_prefix(self) -> String {
        self.field_name().to_ascii_uppercase()
    }
}

/// Value of one artifact before serialization.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ArtifactValue {
    Cells(Vec<Vec<u32>>),
    Uses(Vec<u8>),
    UsesPerFragment(Vec<Vec<u8>>),
    Sets(Vec<BTreeSet<usize>>),
    Deltas(Vec<Vec<Vec<usize>>>),
    SetsPerFragment(Vec<Vec<BTreeSet<usize>>>),
    Lengths(Vec<Vec<usize>>),
}

/// A serialized artifact and the digest of its bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Artifact {
    pub value: ArtifactValue,
    pub bytes: Vec<u8>,
    pub hash: String,
}

impl Artifact {
    fn new(value: ArtifactValue) -> Result<Self, CompositionError> {
        let bytes = serde_json::to_vec(&value)?;
        let hash = digest(&bytes);
        Ok(Self { value, bytes, hash })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtifactSet {
    artifacts: BTreeMap<ArtifactKind, Artifact>,
}

impl ArtifactSet {
    /// Serializes and hashes every [`ArtifactKind`]. Scanner tables are
    /// ordered by fragment: the marking scanner first, then each extension.
    pub fn assemble(
        tables: &CopiedTables,
        scanner: &MarkingScanner,
        host: &HostFragmentData,
        extensions: &[ExtensionFragmentData],
    ) -> Result<Self, CompositionError> {
        let mut artifacts = BTreeMap::new();
        for kind in ArtifactKind::ALL {
            let value = match kind {
                ArtifactKind::ParseTable => ArtifactValue::Cells(tables.parse_table.clone()),
                ArtifactKind::HostTerminalUses => ArtifactValue::Uses(tables.host_terminal_uses.clone()),
                ArtifactKind::ExtTerminalUses => ArtifactValue::UsesPerFragment(tables.ext_terminal_uses.clone()),
                ArtifactKind::MarkingTerminalLayoutSets => ArtifactValue::Sets(scanner.layout_sets.clone()),
                ArtifactKind::LayoutSets => ArtifactValue::Sets(tables.layout_sets.clone()),
                ArtifactKind::Deltas => ArtifactValue::Deltas(
                    std::iter::once(scanner.dfa.transitions.clone())
                        .chain(extensions.iter().map(|e| e.scanner_dfa.transitions.clone()))
                        .collect(),
                ),
                ArtifactKind::AcceptSets => ArtifactValue::SetsPerFragment(per_fragment(
                    &scanner.annotations.accept_sets,
                    extensions.iter().map(|e| &e.scanner_annotations.accept_sets),
                )),
                ArtifactKind::RejectSets => ArtifactValue::SetsPerFragment(per_fragment(
                    &scanner.annotations.reject_sets,
                    extensions.iter().map(|e| &e.scanner_annotations.reject_sets),
                )),
                ArtifactKind::PossibleSets => ArtifactValue::SetsPerFragment(per_fragment(
                    &scanner.annotations.possible_sets,
                    extensions.iter().map(|e| &e.scanner_annotations.possible_sets),
                )),
                ArtifactKind::ProductionLengths => ArtifactValue::Lengths(
                    std::iter::once(host.spec.production_lengths())
                        .chain(extensions.iter().map(|e| e.mapping.composed_production_lengths.clone()))
                        .collect(),
                ),
            };
            let artifact = Artifact::new(value)?;
            log::debug!(
                "artifact {}: {} bytes, sha256 {}",
                kind.field_name(),
                artifact.bytes.len(),
                artifact.hash
            );
            artifacts.insert(kind, artifact);
        }
        Ok(Self { artifacts })
    }

    pub fn get(&self, kind: ArtifactKind) -> Option<&Artifact> {
        self.artifacts.get(&kind)
    }

    /// Artifacts in [`ArtifactKind::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = (ArtifactKind, &Artifact)> {
        self.artifacts.iter().map(|(&kind, artifact)| (kind, artifact))
    }
}

fn per_fragment<'a>(
    marking: &[BTreeSet<usize>],
    extensions: impl Iterator<Item = &'a Vec<BTreeSet<usize>>>,
) -> Vec<Vec<BTreeSet<usize>>> {
    std::iter::once(marking.to_vec()).chain(extensions.cloned()).collect()
}

#[cfg(test)]
mod tests {
    use super::super::marking::{fill_marking_terminals, marking_scanner};
    use super::super::sizing::Sizing;
    use super::*;
    use crate::test_fragment_data::*;
    use grafter::load_artifact;

    fn assembled() -> (Sizing, ArtifactSet) {
        let _ = env_logger::builder().is_test(true).try_init();
        let host = host_fragment();
        let extensions = [extension_fragment("ext", "@ext")];
        let sizing = Sizing::compute(&host, &extensions).unwrap();
        let mut tables = CopiedTables::copy(&host, &extensions, &sizing).unwrap();
        fill_marking_terminals(&mut tables, &host, &extensions, &sizing).unwrap();
        let scanner = marking_scanner(&extensions, &sizing).unwrap();
        let set = ArtifactSet::assemble(&tables, &scanner, &host, &extensions).unwrap();
        (sizing, set)
    }

    #[test]
    fn every_kind_is_hashed() {
        let (_, set) = assembled();
        let kinds: Vec<ArtifactKind> = set.iter().map(|(kind, _)| kind).collect();
        assert_eq!(kinds, ArtifactKind::ALL.to_vec());
        for (_, artifact) in set.iter() {
            assert_eq!(artifact.hash, digest(&artifact.bytes));
            assert_eq!(artifact.hash.len(), 64);
        }
    }

    #[test]
    fn parse_table_loads_back() {
        let (sizing, set) = assembled();
        let artifact = set.get(ArtifactKind::ParseTable).unwrap();
        let table: Vec<Vec<u32>> = load_artifact("parse_table", &artifact.bytes, &artifact.hash).unwrap();
        assert_eq!(table.len(), sizing.total_state_count);
        assert!(table.iter().all(|row| row.len() == sizing.table_width));
        assert_eq!(ArtifactValue::Cells(table), artifact.value);
    }

    #[test]
    fn scanner_tables_start_with_the_marking_scanner() {
        let (sizing, set) = assembled();
        let ArtifactValue::Deltas(deltas) = &set.get(ArtifactKind::Deltas).unwrap().value else {
            panic!("deltas have the wrong shape");
        };
        assert_eq!(deltas.len(), sizing.fragment_count());
        let ArtifactValue::SetsPerFragment(accepts) = &set.get(ArtifactKind::AcceptSets).unwrap().value else {
            panic!("accept sets have the wrong shape");
        };
        let marking: BTreeSet<usize> = accepts[0].iter().flatten().copied().collect();
        assert_eq!(marking, BTreeSet::from([sizing.max_table_symbols]));
    }

    #[test]
    fn production_lengths_per_fragment() {
        let (_, set) = assembled();
        let ArtifactValue::Lengths(lengths) = &set.get(ArtifactKind::ProductionLengths).unwrap().value else {
            panic!("production lengths have the wrong shape");
        };
        assert_eq!(lengths.len(), 2);
        assert_eq!(lengths[0], host_spec().production_lengths());
        assert_eq!(lengths[1], full_spec().production_lengths());
    }

    #[test]
    fn marking_layout_sets_cover_every_state() {
        let (sizing, set) = assembled();
        let artifact = set.get(ArtifactKind::MarkingTerminalLayoutSets).unwrap();
        let sets: Vec<BTreeSet<usize>> = load_artifact("marking", &artifact.bytes, &artifact.hash).unwrap();
        assert_eq!(sets.len(), sizing.total_state_count);
        assert!(sets.iter().all(BTreeSet::is_empty));
    }

    #[test]
    fn names_derive_from_the_field() {
        assert_eq!(ArtifactKind::ExtTerminalUses.const_prefix(), "EXT_TERMINAL_USES");
        assert_eq!(ArtifactKind::PossibleSets.field_name(), "possible_sets");
    }
}
