//! Verified loading of serialized engine tables.
//!
//! The generator serializes each table with `serde_json` and records the
//! SHA-256 digest of the exact bytes next to them in the emitted driver. The
//! driver passes both back here at startup; a table is only decoded once its
//! digest matches.

use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("artifact `{name}` failed verification: expected hash {expected}, found {found}")]
    HashMismatch {
        name: String,
        expected: String,
        found: String,
    },

    #[error("artifact `{name}` could not be decoded: {source}")]
    Decode {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Lowercase hex SHA-256 digest of `bytes`.
pub fn digest(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Verifies `bytes` against `expected_hash` and deserializes them.
///
/// The comparison ignores ASCII case so hashes written in either case are
/// accepted.
pub fn load_artifact<T: DeserializeOwned>(
    name: &str,
    bytes: &[u8],
    expected_hash: &str,
) -> Result<T, ArtifactError> {
    let found = digest(bytes);
    if !found.eq_ignore_ascii_case(expected_hash) {
        return Err(ArtifactError::HashMismatch {
            name: name.to_owned(),
            expected: expected_hash.to_owned(),
            found,
        });
    }
    log::trace!("artifact {} verified ({} bytes)", name, bytes.len());
    serde_json::from_slice(bytes).map_err(|source| ArtifactError::Decode {
        name: name.to_owned(),
        source,
    })
}
