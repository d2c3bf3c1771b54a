//! Error types shared across the linking pipeline.

use std::path::PathBuf;

use crate::file_name::FileName;

/// A string that cannot be used as a `.proto` file name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FileNameError {
    #[error("proto file name is empty")]
    Empty,
    #[error("`{0}` does not have the `.proto` extension")]
    MissingExtension(String),
}

/// A payload rejected by a [`crate::DescriptorBuilder`].
///
/// This is a malformed-schema condition: it has nothing to do with the
/// order in which files are linked.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid descriptor `{file}`: {reason}")]
pub struct BuildError {
    pub file: FileName,
    pub reason: String,
}

impl BuildError {
    pub fn new(file: &FileName, reason: impl Into<String>) -> Self {
        Self {
            file: file.clone(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("invalid file name in descriptor `{record}`: {source}")]
    InvalidFileName {
        record: String,
        #[source]
        source: FileNameError,
    },
    #[error("two different descriptors share the name `{0}`")]
    DuplicateFile(FileName),
    #[error("linker has already resolved its input")]
    AlreadyResolved,
    #[error("unable to link descriptor set files")]
    Malformed(#[source] BuildError),
}

#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("descriptor set file {} does not exist", .0.display())]
    Missing(PathBuf),
    #[error("cannot read descriptor set file {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot decode descriptor set {}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: prost::DecodeError,
    },
    #[error("known types cannot be loaded: no `{file}` found under {roots:?}")]
    NoProviders { file: String, roots: Vec<PathBuf> },
}
