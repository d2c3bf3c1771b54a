//! Linking configuration.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::reader::{DescriptorSetReader, STANDARD_PACKAGE};
use crate::resources::ResourceRoots;

/// Where descriptor sets come from and how strictly they are linked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Descriptor set files read directly.
    pub descriptor_sets: Vec<PathBuf>,
    /// Roots searched for `known_type_providers` lists.
    pub resource_roots: Vec<PathBuf>,
    /// Drop files of the standard package before linking.
    pub skip_standard: bool,
    /// Package fragment identifying standard files.
    pub standard_package: String,
    /// Treat partially resolved or unresolved files as a failure.
    pub strict: bool,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            descriptor_sets: Vec::new(),
            resource_roots: Vec::new(),
            skip_standard: false,
            standard_package: STANDARD_PACKAGE.to_string(),
            strict: false,
        }
    }
}

impl LinkConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("failed to parse config {}", path.display()))
    }

    pub fn reader(&self) -> DescriptorSetReader {
        if !self.skip_standard {
            DescriptorSetReader::all()
        } else if self.standard_package == STANDARD_PACKAGE {
            DescriptorSetReader::skip_standard()
        } else {
            DescriptorSetReader::skip_package(self.standard_package.clone())
        }
    }

    pub fn resource_roots(&self) -> ResourceRoots {
        ResourceRoots::new(self.resource_roots.iter().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("protolink.json");
        fs::write(&path, r#"{ "descriptor_sets": ["build/main.desc"], "strict": true }"#).unwrap();

        let config = LinkConfig::from_json_file(&path).unwrap();
        assert_eq!(config.descriptor_sets, vec![PathBuf::from("build/main.desc")]);
        assert!(config.strict);
        assert!(!config.skip_standard);
        assert_eq!(config.standard_package, "google");
    }

    #[test]
    fn reports_unparsable_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("protolink.json");
        fs::write(&path, "{ not json").unwrap();
        let err = LinkConfig::from_json_file(&path).unwrap_err();
        assert!(err.to_string().contains("failed to parse config"));
    }
}
