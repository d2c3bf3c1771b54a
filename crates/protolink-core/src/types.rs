//! Enumeration of the types declared by linked files.

use prost_types::DescriptorProto;

use crate::builder::LinkedFile;
use crate::file_name::FileName;
use crate::file_set::FileSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TypeKind {
    Message,
    Enum,
    Service,
}

/// A declared type with its fully-qualified name (`acme.Order.Line`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeclaredType {
    pub name: String,
    pub kind: TypeKind,
    pub file: FileName,
}

/// Types declared by one or more files, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct TypeSet {
    types: Vec<DeclaredType>,
}

impl TypeSet {
    /// Messages and enums of `file`, nested ones included.
    pub fn messages_and_enums(file: &LinkedFile) -> Self {
        let mut set = TypeSet::default();
        set.collect_file(file);
        set
    }

    /// Messages and enums of every file in `files`.
    pub fn from_files(files: &FileSet) -> Self {
        let mut set = TypeSet::default();
        for file in files {
            set.collect_file(file);
        }
        set
    }

    /// Services of every file in `files`.
    pub fn services(files: &FileSet) -> Self {
        let mut set = TypeSet::default();
        for file in files {
            for service in &file.proto().service {
                set.push(file, file.package(), service.name(), TypeKind::Service);
            }
        }
        set
    }

    fn collect_file(&mut self, file: &LinkedFile) {
        let package = file.package();
        for message in &file.proto().message_type {
            self.collect_message(file, package, message);
        }
        for enum_type in &file.proto().enum_type {
            self.push(file, package, enum_type.name(), TypeKind::Enum);
        }
    }

    fn collect_message(&mut self, file: &LinkedFile, scope: &str, message: &DescriptorProto) {
        let name = self.push(file, scope, message.name(), TypeKind::Message);
        for nested in &message.nested_type {
            self.collect_message(file, &name, nested);
        }
        for enum_type in &message.enum_type {
            self.push(file, &name, enum_type.name(), TypeKind::Enum);
        }
    }

    fn push(&mut self, file: &LinkedFile, scope: &str, name: &str, kind: TypeKind) -> String {
        let name = if scope.is_empty() {
            name.to_string()
        } else {
            format!("{scope}.{name}")
        };
        self.types.push(DeclaredType {
            name: name.clone(),
            kind,
            file: file.name().clone(),
        });
        name
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.iter().any(|t| t.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeclaredType> + '_ {
        self.types.iter()
    }
}

impl IntoIterator for TypeSet {
    type Item = DeclaredType;
    type IntoIter = std::vec::IntoIter<DeclaredType>;

    fn into_iter(self) -> Self::IntoIter {
        self.types.into_iter()
    }
}
