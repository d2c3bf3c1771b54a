//! Unlinked file descriptors, as they come out of a descriptor set.

use std::sync::Arc;

use prost_types::FileDescriptorProto;

use crate::error::LinkError;
use crate::file_name::FileName;

/// One `.proto` file before linking.
///
/// The payload is kept whole and shared; the linker only reads the name and
/// the declared imports.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFileRecord {
    name: FileName,
    dependency_names: Vec<FileName>,
    payload: Arc<FileDescriptorProto>,
}

impl RawFileRecord {
    pub fn from_proto(proto: FileDescriptorProto) -> Result<Self, LinkError> {
        let record = proto.name().to_string();
        let invalid = |source| LinkError::InvalidFileName {
            record: record.clone(),
            source,
        };

        let name = FileName::parse(proto.name()).map_err(invalid)?;
        let dependency_names = proto
            .dependency
            .iter()
            .map(|dep| FileName::parse(dep.as_str()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(invalid)?;

        Ok(Self {
            name,
            dependency_names,
            payload: Arc::new(proto),
        })
    }

    pub fn name(&self) -> &FileName {
        &self.name
    }

    /// Imports in declaration order. They may name files that are not part
    /// of the linker input.
    pub fn dependency_names(&self) -> &[FileName] {
        &self.dependency_names
    }

    pub fn has_dependencies(&self) -> bool {
        !self.dependency_names.is_empty()
    }

    pub fn payload(&self) -> &Arc<FileDescriptorProto> {
        &self.payload
    }
}

impl TryFrom<FileDescriptorProto> for RawFileRecord {
    type Error = LinkError;

    fn try_from(proto: FileDescriptorProto) -> Result<Self, Self::Error> {
        Self::from_proto(proto)
    }
}
