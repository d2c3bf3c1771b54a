//! Protolink: linking of Protobuf descriptor sets.
//!
//! Descriptor sets produced by `protoc --descriptor_set_out` hold an
//! unordered list of `FileDescriptorProto`s. Before code generators can follow
//! cross-file type references, each file has to be bound to the files it
//! imports:
//!
//! ```text
//!   descriptor sets ──► DescriptorSetReader ──► RawFileRecord* ──► Linker
//!                                                                   │
//!                       resolved / partially resolved / unresolved ◄┘
//! ```
//!
//! Files whose imports are missing from the input are not an error: they are
//! linked against whatever is available and reported as partially resolved.
//! Only a malformed payload fails a linking run.

pub mod builder;
pub mod config;
pub mod error;
pub mod file_name;
pub mod file_set;
pub mod linker;
pub mod reader;
pub mod record;
pub mod report;
pub mod resources;
pub mod types;

pub use builder::{DescriptorBuilder, LinkedFile, ValidatingBuilder};
pub use config::LinkConfig;
pub use error::{BuildError, FileNameError, LinkError, ReadError};
pub use file_name::{FileKind, FileName};
pub use file_set::FileSet;
pub use linker::{LinkOutcome, Linker};
pub use reader::{is_not_google_proto, to_records, DescriptorSetReader, MergedFiles};
pub use record::RawFileRecord;
pub use report::LinkReportV1;
pub use resources::ResourceRoots;
pub use types::{DeclaredType, TypeKind, TypeSet};
