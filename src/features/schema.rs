//! Feature Schema - ordered column names shared by training and serving
//!
//! The order of names in `features.txt` is the column order every scaler and
//! model artifact was fitted against. It is read once at bootstrap and never
//! changes while a model is loaded.

use std::fs;
use std::path::Path;

use crc32fast::Hasher;
use serde::{Deserialize, Serialize};

use crate::error::ArtifactError;

/// Ordered, immutable list of feature names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    names: Vec<String>,
}

impl FeatureSchema {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    /// Read one feature name per line. Duplicates are not checked.
    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        let content = fs::read_to_string(path).map_err(|source| ArtifactError::SchemaLoad {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Self::parse(&content))
    }

    pub fn parse(content: &str) -> Self {
        let names = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        Self { names }
    }

    /// Write the schema in the same one-name-per-line format `load` reads.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let mut out = String::new();
        for name in &self.names {
            out.push_str(name);
            out.push('\n');
        }
        fs::write(path, out)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// CRC32 over the ordered names, recorded in model artifacts
    pub fn layout_hash(&self) -> u32 {
        let mut hasher = Hasher::new();
        for name in &self.names {
            hasher.update(name.as_bytes());
            hasher.update(&[0]); // Separator
        }
        hasher.finalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn schema(names: &[&str]) -> FeatureSchema {
        FeatureSchema::new(names.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_parse_keeps_order_and_skips_blank_lines() {
        let parsed = FeatureSchema::parse("V1\nV2\n  Amount \n\n");
        assert_eq!(parsed.names(), &["V1", "V2", "Amount"]);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("features.txt");
        let original = schema(&["V1", "V2", "Amount"]);

        original.save(&path).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "V1\nV2\nAmount\n");
        assert_eq!(FeatureSchema::load(&path).unwrap(), original);
    }

    #[test]
    fn test_missing_file_is_schema_load_error() {
        let dir = tempdir().unwrap();
        let err = FeatureSchema::load(&dir.path().join("missing.txt")).unwrap_err();
        assert!(matches!(err, ArtifactError::SchemaLoad { .. }));
    }

    #[test]
    fn test_layout_hash_depends_on_order() {
        let a = schema(&["V1", "V2"]);
        let b = schema(&["V2", "V1"]);
        assert_eq!(a.layout_hash(), schema(&["V1", "V2"]).layout_hash());
        assert_ne!(a.layout_hash(), b.layout_hash());
        // Separator keeps ["V1V2"] distinct from ["V1", "V2"]
        assert_ne!(schema(&["V1V2"]).layout_hash(), a.layout_hash());
    }
}
