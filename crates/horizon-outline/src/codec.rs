//! Snapshot codec for record trees.
//!
//! A table's records are written as a gzip-compressed JSON envelope:
//!
//! ```json
//! { "type": "traits", "version": 5, "rows": [ { "id": "t...", ..., "children": [ ... ] } ] }
//! ```
//!
//! Record fields are flattened into each row, so a record type must not use
//! a field named `children`. UI-only state (open rows, selection) is not part
//! of the envelope.

use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{OutlineError, Result};
use crate::logging::targets;
use crate::model::{Record, RecordKey, RecordTree, Subtree};

/// Newest envelope version this codec reads and the version it writes.
pub const CURRENT_VERSION: u32 = 5;

#[derive(Serialize)]
struct EnvelopeOut<'a, R> {
    #[serde(rename = "type")]
    file_type: &'a str,
    version: u32,
    rows: Vec<RowOut<'a, R>>,
}

#[derive(Serialize)]
struct RowOut<'a, R> {
    #[serde(flatten)]
    record: &'a R,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    children: Vec<RowOut<'a, R>>,
}

#[derive(Deserialize)]
struct Header {
    #[serde(rename = "type")]
    file_type: String,
    version: u32,
}

#[derive(Deserialize)]
#[serde(bound = "R: DeserializeOwned")]
struct EnvelopeIn<R> {
    rows: Vec<RowIn<R>>,
}

#[derive(Deserialize)]
#[serde(bound = "R: DeserializeOwned")]
struct RowIn<R> {
    #[serde(flatten)]
    record: R,
    #[serde(default)]
    children: Vec<RowIn<R>>,
}

impl<R> From<RowIn<R>> for Subtree<R> {
    fn from(row: RowIn<R>) -> Self {
        Subtree {
            record: row.record,
            open: false,
            children: row.children.into_iter().map(Subtree::from).collect(),
        }
    }
}

fn rows_of<'a, R: Record>(tree: &'a RecordTree<R>, keys: &[RecordKey]) -> Vec<RowOut<'a, R>> {
    keys.iter()
        .filter_map(|&key| {
            tree.get(key).map(|record| RowOut {
                record,
                children: rows_of(tree, tree.children_of(Some(key))),
            })
        })
        .collect()
}

/// Encodes every record of `tree`.
pub fn encode<R: Record>(file_type: &str, tree: &RecordTree<R>) -> Result<Vec<u8>> {
    let envelope = EnvelopeOut {
        file_type,
        version: CURRENT_VERSION,
        rows: rows_of(tree, tree.roots()),
    };
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    serde_json::to_writer(&mut encoder, &envelope)?;
    encoder.flush()?;
    let data = encoder.finish()?;
    tracing::trace!(target: targets::CODEC, file_type, records = tree.len(), bytes = data.len(), "encoded");
    Ok(data)
}

/// Decodes a tree written by [`encode`] for the same `file_type`.
pub fn decode<R: Record>(file_type: &str, data: &[u8]) -> Result<RecordTree<R>> {
    let mut json = Vec::new();
    GzDecoder::new(data).read_to_end(&mut json)?;

    let header: Header = serde_json::from_slice(&json)?;
    if header.file_type != file_type {
        return Err(OutlineError::WrongFileType {
            expected: file_type.to_string(),
            found: header.file_type,
        });
    }
    if header.version > CURRENT_VERSION {
        return Err(OutlineError::UnsupportedVersion {
            found: header.version,
            supported: CURRENT_VERSION,
        });
    }

    let envelope: EnvelopeIn<R> = serde_json::from_slice(&json)?;
    let tree = RecordTree::from_subtrees(envelope.rows.into_iter().map(Subtree::from).collect())?;
    tracing::trace!(target: targets::CODEC, file_type, records = tree.len(), "decoded");
    Ok(tree)
}

/// CRC32 of an encoded payload, used to detect unsaved changes.
pub fn checksum(data: &[u8]) -> u32 {
    let mut crc = flate2::Crc::new();
    crc.update(data);
    crc.sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Trait, trait_tree};

    #[test]
    fn test_round_trip_preserves_hierarchy() {
        let (tree, _) = trait_tree();
        let data = encode("traits", &tree).unwrap();
        let decoded: RecordTree<Trait> = decode("traits", &data).unwrap();
        assert_eq!(decoded.len(), tree.len());
        assert_eq!(
            decoded.dump(crate::logging::TreeFormatOptions::default()),
            tree.dump(crate::logging::TreeFormatOptions::default())
        );
        decoded.check_integrity().unwrap();
    }

    #[test]
    fn test_wrong_file_type() {
        let (tree, _) = trait_tree();
        let data = encode("traits", &tree).unwrap();
        let err = decode::<Trait>("skills", &data).unwrap_err();
        assert!(matches!(err, OutlineError::WrongFileType { .. }));
    }

    #[test]
    fn test_newer_version_rejected() {
        let json = format!(r#"{{"type":"traits","version":{},"rows":[]}}"#, CURRENT_VERSION + 1);
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(json.as_bytes()).unwrap();
        let data = encoder.finish().unwrap();
        let err = decode::<Trait>("traits", &data).unwrap_err();
        assert!(matches!(err, OutlineError::UnsupportedVersion { .. }));
    }

    #[test]
    fn test_garbage_is_an_error() {
        assert!(decode::<Trait>("traits", b"not gzip").is_err());
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let (tree, _) = trait_tree();
        let a = encode("traits", &tree).unwrap();
        let b = encode("traits", &tree).unwrap();
        assert_eq!(a, b);
        assert_eq!(checksum(&a), checksum(&b));
    }
}
