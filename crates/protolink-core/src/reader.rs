//! Reading serialized `google.protobuf.FileDescriptorSet` files.

use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;
use prost::Message as _;
use prost_types::{FileDescriptorProto, FileDescriptorSet};
use tracing::debug;

use crate::error::{LinkError, ReadError};
use crate::record::RawFileRecord;

/// Package fragment identifying files shipped with protobuf itself.
pub const STANDARD_PACKAGE: &str = "google";

type Filter = Arc<dyn Fn(&FileDescriptorProto) -> bool + Send + Sync>;

/// Reads descriptor set files, keeping the files accepted by a filter.
#[derive(Clone)]
pub struct DescriptorSetReader {
    filter: Filter,
    filter_name: &'static str,
}

impl DescriptorSetReader {
    /// Keeps every file.
    pub fn all() -> Self {
        Self {
            filter: Arc::new(|_: &FileDescriptorProto| true),
            filter_name: "all",
        }
    }

    /// Skips files provided by protobuf itself.
    pub fn skip_standard() -> Self {
        Self {
            filter: Arc::new(is_not_google_proto),
            filter_name: "skip_standard",
        }
    }

    /// Skips files whose package contains `fragment`.
    pub fn skip_package(fragment: impl Into<String>) -> Self {
        let fragment = fragment.into();
        Self {
            filter: Arc::new(move |file: &FileDescriptorProto| !file.package().contains(fragment.as_str())),
            filter_name: "skip_package",
        }
    }

    pub fn with_filter(filter: impl Fn(&FileDescriptorProto) -> bool + Send + Sync + 'static) -> Self {
        Self {
            filter: Arc::new(filter),
            filter_name: "custom",
        }
    }

    /// Decodes a descriptor set and applies the filter.
    pub fn decode(&self, bytes: &[u8]) -> Result<Vec<FileDescriptorProto>, prost::DecodeError> {
        let set = FileDescriptorSet::decode(bytes)?;
        Ok(set.file.into_iter().filter(|f| (self.filter)(f)).collect())
    }

    /// Reads one descriptor set file.
    pub fn read(&self, path: &Path) -> Result<Vec<FileDescriptorProto>, ReadError> {
        if !path.exists() {
            return Err(ReadError::Missing(path.to_path_buf()));
        }
        debug!(path = %path.display(), filter = self.filter_name, "reading descriptor set");
        let bytes = fs::read(path).map_err(|source| ReadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let files = self.decode(&bytes).map_err(|source| ReadError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), files = files.len(), "descriptor set read");
        Ok(files)
    }

    /// Reads several descriptor sets and merges their files.
    ///
    /// A file present with identical content in more than one set is kept
    /// once, at its first position.
    pub fn read_all<P: AsRef<Path>>(
        &self,
        paths: impl IntoIterator<Item = P>,
    ) -> Result<Vec<FileDescriptorProto>, ReadError> {
        let mut merged = MergedFiles::new();
        for path in paths {
            merged.extend(self.read(path.as_ref())?);
        }
        Ok(merged.into_files())
    }
}

/// Descriptor files gathered from several sources, keyed by file name.
///
/// A file equal to one already merged under its name is dropped. Distinct
/// files sharing a name are all kept, next to each other, so that linking
/// reports the conflict.
#[derive(Debug, Clone, Default)]
pub struct MergedFiles {
    by_name: IndexMap<String, Vec<FileDescriptorProto>>,
}

impl MergedFiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `file`, returning `false` if an equal file is already merged.
    pub fn push(&mut self, file: FileDescriptorProto) -> bool {
        let variants = self.by_name.entry(file.name().to_string()).or_default();
        if variants.contains(&file) {
            return false;
        }
        variants.push(file);
        true
    }

    pub fn len(&self) -> usize {
        self.by_name.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// The merged files, in order of first appearance of their names.
    pub fn into_files(self) -> Vec<FileDescriptorProto> {
        self.by_name.into_values().flatten().collect()
    }
}

impl Extend<FileDescriptorProto> for MergedFiles {
    fn extend<I: IntoIterator<Item = FileDescriptorProto>>(&mut self, iter: I) {
        for file in iter {
            self.push(file);
        }
    }
}

impl Default for DescriptorSetReader {
    fn default() -> Self {
        Self::all()
    }
}

impl fmt::Debug for DescriptorSetReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DescriptorSetReader")
            .field("filter", &self.filter_name)
            .finish()
    }
}

/// Returns `true` unless the file belongs to a protobuf-provided package.
pub fn is_not_google_proto(file: &FileDescriptorProto) -> bool {
    !file.package().contains(STANDARD_PACKAGE)
}

/// Converts decoded files into linker input.
pub fn to_records(files: impl IntoIterator<Item = FileDescriptorProto>) -> Result<Vec<RawFileRecord>, LinkError> {
    files.into_iter().map(RawFileRecord::from_proto).collect()
}
