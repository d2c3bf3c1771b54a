//! Discovery of descriptor sets through `known_type_providers` files.
//!
//! A build lays out resources under one or more roots. Any directory below a
//! root may carry a `known_type_providers` file listing descriptor set
//! resource names, one per line. A listed name is looked up next to the
//! provider file and under every root, so several roots may contribute files
//! to the same resource.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexSet;
use prost_types::FileDescriptorProto;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::ReadError;
use crate::reader::DescriptorSetReader;

/// Name of the files listing descriptor set resources.
pub const KNOWN_TYPE_PROVIDERS: &str = "known_type_providers";

/// Descriptor set generated from a project's `main` proto sources.
pub const MAIN_DESCRIPTOR_SET: &str = "main.desc";

/// Descriptor set generated from a project's `test` proto sources.
pub const TEST_DESCRIPTOR_SET: &str = "test.desc";

/// Resource roots searched for provider lists and descriptor sets.
#[derive(Debug, Clone, Default)]
pub struct ResourceRoots {
    roots: Vec<PathBuf>,
}

impl ResourceRoots {
    pub fn new(roots: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            roots: roots.into_iter().collect(),
        }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// All files named `name` anywhere under the roots.
    fn find_named(&self, name: &str) -> Vec<PathBuf> {
        let mut found = Vec::new();
        for root in &self.roots {
            for entry in WalkDir::new(root).sort_by_file_name() {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(err) => {
                        warn!(root = %root.display(), error = %err, "skipping unreadable resource entry");
                        continue;
                    }
                };
                if entry.file_type().is_file() && entry.file_name() == name {
                    found.push(entry.into_path());
                }
            }
        }
        found
    }

    /// Every existing `root/<resource>` path.
    pub fn resolve(&self, resource: &str) -> Vec<PathBuf> {
        self.roots
            .iter()
            .map(|root| root.join(resource))
            .filter(|path| path.is_file())
            .collect()
    }

    fn providers(&self) -> Result<Vec<Provider>, ReadError> {
        let paths = self.find_named(KNOWN_TYPE_PROVIDERS);
        if paths.is_empty() {
            return Err(ReadError::NoProviders {
                file: KNOWN_TYPE_PROVIDERS.to_string(),
                roots: self.roots.clone(),
            });
        }
        paths.iter().map(|path| Provider::read(path)).collect()
    }

    /// Resource names listed by all provider files, deduplicated.
    pub fn provider_resources(&self) -> Result<BTreeSet<String>, ReadError> {
        let resources: BTreeSet<String> = self
            .providers()?
            .into_iter()
            .flat_map(|provider| provider.resources)
            .collect();
        debug!(resources = resources.len(), "known type providers listed");
        Ok(resources)
    }

    /// Reads every descriptor set listed by the provider files.
    pub fn load(&self, reader: &DescriptorSetReader) -> Result<Vec<FileDescriptorProto>, ReadError> {
        let mut paths = IndexSet::new();
        for provider in self.providers()? {
            for resource in &provider.resources {
                let found = provider.resolve(resource, self);
                if found.is_empty() {
                    warn!(
                        resource = %resource,
                        provider = %provider.dir.display(),
                        "listed descriptor set not found"
                    );
                }
                paths.extend(found);
            }
        }
        reader.read_all(paths)
    }
}

/// One `known_type_providers` file.
struct Provider {
    dir: PathBuf,
    resources: Vec<String>,
}

impl Provider {
    fn read(path: &Path) -> Result<Self, ReadError> {
        let text = fs::read_to_string(path).map_err(|source| ReadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let resources = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_string)
            .collect();
        Ok(Self {
            dir: path.parent().map(Path::to_path_buf).unwrap_or_default(),
            resources,
        })
    }

    /// Existing paths for `resource`: next to this provider, then under
    /// each root.
    fn resolve(&self, resource: &str, roots: &ResourceRoots) -> Vec<PathBuf> {
        let local = self.dir.join(resource);
        let mut found = Vec::new();
        if local.is_file() {
            found.push(local);
        }
        found.extend(roots.resolve(resource));
        found
    }
}
