//! Turning a raw record plus its resolved dependencies into a linked file.
//!
//! The linker does not know how a descriptor is built; it only asks a
//! [`DescriptorBuilder`] for one once it has gathered the dependency handles
//! it could find. A builder rejection means the payload itself is broken.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use prost_types::{DescriptorProto, EnumDescriptorProto, FileDescriptorProto};

use crate::error::BuildError;
use crate::file_name::FileName;
use crate::file_set::FileSet;
use crate::record::RawFileRecord;

/// Field numbers above this are not encodable in a tag.
pub const MAX_FIELD_NUMBER: i32 = 536_870_911;

/// Field numbers reserved for the protobuf implementation itself.
pub const RESERVED_FIELD_NUMBERS: std::ops::RangeInclusive<i32> = 19_000..=19_999;

const KNOWN_SYNTAXES: &[&str] = &["", "proto2", "proto3", "editions"];

/// Constructs a [`LinkedFile`] from a record and whichever of its
/// dependencies have been linked already.
///
/// `dependencies` holds only handles the caller actually has; declared
/// imports missing from it are allowed.
pub trait DescriptorBuilder {
    fn build(&self, record: &RawFileRecord, dependencies: &FileSet) -> Result<LinkedFile, BuildError>;
}

impl<B: DescriptorBuilder + ?Sized> DescriptorBuilder for &B {
    fn build(&self, record: &RawFileRecord, dependencies: &FileSet) -> Result<LinkedFile, BuildError> {
        (**self).build(record, dependencies)
    }
}

/// A descriptor whose imports have been bound to other linked files.
///
/// Cloning is cheap: all clones share the same descriptor.
#[derive(Clone)]
pub struct LinkedFile {
    inner: Arc<LinkedFileInner>,
}

struct LinkedFileInner {
    name: FileName,
    proto: Arc<FileDescriptorProto>,
    declared: Vec<FileName>,
    dependencies: Vec<LinkedFile>,
    symbols: BTreeSet<String>,
}

impl LinkedFile {
    /// Binds `record` to `dependencies`, ordered as the record declares them.
    ///
    /// Handles the record does not import are ignored.
    pub fn new(record: &RawFileRecord, dependencies: &FileSet, symbols: BTreeSet<String>) -> Self {
        let dependencies = record
            .dependency_names()
            .iter()
            .filter_map(|name| dependencies.get(name).cloned())
            .collect();
        Self {
            inner: Arc::new(LinkedFileInner {
                name: record.name().clone(),
                proto: Arc::clone(record.payload()),
                declared: record.dependency_names().to_vec(),
                dependencies,
                symbols,
            }),
        }
    }

    pub fn name(&self) -> &FileName {
        &self.inner.name
    }

    pub fn proto(&self) -> &FileDescriptorProto {
        &self.inner.proto
    }

    pub fn package(&self) -> &str {
        self.inner.proto.package()
    }

    /// Resolved dependency handles.
    pub fn dependencies(&self) -> &[LinkedFile] {
        &self.inner.dependencies
    }

    pub fn declared_dependencies(&self) -> &[FileName] {
        &self.inner.declared
    }

    /// Declared imports that were not available when this file was built.
    pub fn missing_dependencies(&self) -> Vec<&FileName> {
        self.inner
            .declared
            .iter()
            .filter(|name| !self.inner.dependencies.iter().any(|d| d.name() == *name))
            .collect()
    }

    /// Fully-qualified names of everything this file declares.
    pub fn symbols(&self) -> &BTreeSet<String> {
        &self.inner.symbols
    }

    /// Returns `true` if both handles point at the same built descriptor.
    pub fn ptr_eq(&self, other: &LinkedFile) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for LinkedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkedFile")
            .field("name", &self.inner.name)
            .field(
                "dependencies",
                &self.inner.dependencies.iter().map(LinkedFile::name).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// The default builder: checks the structural soundness of a payload and
/// its symbols against those of its dependencies.
///
/// Unknown dependencies are tolerated, so type references into missing files
/// are never an error here.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatingBuilder;

impl DescriptorBuilder for ValidatingBuilder {
    fn build(&self, record: &RawFileRecord, dependencies: &FileSet) -> Result<LinkedFile, BuildError> {
        let proto = record.payload();
        let file = record.name();

        if !KNOWN_SYNTAXES.contains(&proto.syntax()) {
            return Err(BuildError::new(
                file,
                format!("unrecognized syntax `{}`", proto.syntax()),
            ));
        }

        let mut symbols = SymbolTable::new(file);
        let package = proto.package();
        for message in &proto.message_type {
            symbols.message(package, message)?;
        }
        for enum_type in &proto.enum_type {
            symbols.enumeration(package, enum_type)?;
        }
        for extension in &proto.extension {
            symbols.define(package, extension.name())?;
        }
        for service in &proto.service {
            let service_name = symbols.define(package, service.name())?;
            for method in &service.method {
                symbols.define(&service_name, method.name())?;
            }
        }

        let own = symbols.into_symbols();
        check_conflicts(file, &own, record, dependencies)?;
        Ok(LinkedFile::new(record, dependencies, own))
    }
}

struct SymbolTable<'a> {
    file: &'a FileName,
    symbols: BTreeSet<String>,
}

impl<'a> SymbolTable<'a> {
    fn new(file: &'a FileName) -> Self {
        Self {
            file,
            symbols: BTreeSet::new(),
        }
    }

    fn define(&mut self, scope: &str, name: &str) -> Result<String, BuildError> {
        if name.is_empty() {
            return Err(BuildError::new(
                self.file,
                format!("missing name in scope `{scope}`"),
            ));
        }
        let full = qualify(scope, name);
        if !self.symbols.insert(full.clone()) {
            return Err(BuildError::new(
                self.file,
                format!("`{full}` is already defined"),
            ));
        }
        Ok(full)
    }

    fn message(&mut self, scope: &str, message: &DescriptorProto) -> Result<(), BuildError> {
        let full = self.define(scope, message.name())?;

        let mut numbers: HashMap<i32, &str> = HashMap::new();
        for field in &message.field {
            self.define(&full, field.name())?;
            let number = field.number();
            if number < 1 || number > MAX_FIELD_NUMBER {
                return Err(BuildError::new(
                    self.file,
                    format!("field `{full}.{}` has invalid number {number}", field.name()),
                ));
            }
            if RESERVED_FIELD_NUMBERS.contains(&number) {
                return Err(BuildError::new(
                    self.file,
                    format!(
                        "field `{full}.{}` uses number {number} reserved for the protobuf implementation",
                        field.name()
                    ),
                ));
            }
            if let Some(previous) = numbers.insert(number, field.name()) {
                return Err(BuildError::new(
                    self.file,
                    format!(
                        "field number {number} is used by both `{previous}` and `{}` in `{full}`",
                        field.name()
                    ),
                ));
            }
        }
        for oneof in &message.oneof_decl {
            self.define(&full, oneof.name())?;
        }
        for extension in &message.extension {
            self.define(&full, extension.name())?;
        }
        for nested in &message.nested_type {
            self.message(&full, nested)?;
        }
        for enum_type in &message.enum_type {
            self.enumeration(&full, enum_type)?;
        }
        Ok(())
    }

    /// Enum values live in the scope enclosing the enum, not inside it.
    fn enumeration(&mut self, scope: &str, enum_type: &EnumDescriptorProto) -> Result<(), BuildError> {
        let full = self.define(scope, enum_type.name())?;
        if enum_type.value.is_empty() {
            return Err(BuildError::new(
                self.file,
                format!("enum `{full}` must define at least one value"),
            ));
        }
        for value in &enum_type.value {
            self.define(scope, value.name())?;
        }
        Ok(())
    }

    fn into_symbols(self) -> BTreeSet<String> {
        self.symbols
    }
}

fn qualify(scope: &str, name: &str) -> String {
    if scope.is_empty() {
        name.to_string()
    } else {
        format!("{scope}.{name}")
    }
}

/// Rejects symbols that a dependency, direct or transitive, already defines.
fn check_conflicts(
    file: &FileName,
    own: &BTreeSet<String>,
    record: &RawFileRecord,
    dependencies: &FileSet,
) -> Result<(), BuildError> {
    let mut visited: HashSet<&FileName> = HashSet::new();
    let mut stack: Vec<&LinkedFile> = record
        .dependency_names()
        .iter()
        .filter_map(|name| dependencies.get(name))
        .collect();

    while let Some(dep) = stack.pop() {
        if !visited.insert(dep.name()) {
            continue;
        }
        if let Some(symbol) = own.intersection(dep.symbols()).next() {
            return Err(BuildError::new(
                file,
                format!("`{symbol}` is already defined in file `{}`", dep.name()),
            ));
        }
        stack.extend(dep.dependencies());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost_types::{
        EnumValueDescriptorProto, FieldDescriptorProto, MethodDescriptorProto,
        ServiceDescriptorProto,
    };

    fn file(name: &str, package: &str, deps: &[&str]) -> FileDescriptorProto {
        FileDescriptorProto {
            name: Some(name.to_string()),
            package: Some(package.to_string()),
            dependency: deps.iter().map(|d| d.to_string()).collect(),
            syntax: Some("proto3".to_string()),
            ..Default::default()
        }
    }

    fn message(name: &str, fields: &[(&str, i32)]) -> DescriptorProto {
        DescriptorProto {
            name: Some(name.to_string()),
            field: fields
                .iter()
                .map(|(n, num)| FieldDescriptorProto {
                    name: Some(n.to_string()),
                    number: Some(*num),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }
    }

    fn enumeration(name: &str, values: &[&str]) -> EnumDescriptorProto {
        EnumDescriptorProto {
            name: Some(name.to_string()),
            value: values
                .iter()
                .enumerate()
                .map(|(i, v)| EnumValueDescriptorProto {
                    name: Some(v.to_string()),
                    number: Some(i as i32),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }
    }

    fn build(proto: FileDescriptorProto, deps: &FileSet) -> Result<LinkedFile, BuildError> {
        let record = RawFileRecord::from_proto(proto).unwrap();
        ValidatingBuilder.build(&record, deps)
    }

    #[test]
    fn collects_qualified_symbols() {
        let mut proto = file("acme/order.proto", "acme", &[]);
        let mut order = message("Order", &[("id", 1), ("state", 2)]);
        order.nested_type.push(message("Line", &[("sku", 1)]));
        order.enum_type.push(enumeration("State", &["STATE_UNKNOWN", "STATE_OPEN"]));
        proto.message_type.push(order);
        proto.service.push(ServiceDescriptorProto {
            name: Some("Orders".to_string()),
            method: vec![MethodDescriptorProto {
                name: Some("Place".to_string()),
                ..Default::default()
            }],
            ..Default::default()
        });

        let linked = build(proto, &FileSet::new()).unwrap();
        let symbols = linked.symbols();
        for expected in [
            "acme.Order",
            "acme.Order.id",
            "acme.Order.Line",
            "acme.Order.Line.sku",
            "acme.Order.State",
            "acme.Order.STATE_OPEN",
            "acme.Orders",
            "acme.Orders.Place",
        ] {
            assert!(symbols.contains(expected), "missing {expected}");
        }
    }

    #[test]
    fn rejects_duplicate_type_names() {
        let mut proto = file("a.proto", "acme", &[]);
        proto.message_type.push(message("Thing", &[]));
        proto.enum_type.push(enumeration("Thing", &["THING_UNKNOWN"]));
        let err = build(proto, &FileSet::new()).unwrap_err();
        assert!(err.reason.contains("acme.Thing"), "{err}");
    }

    #[test]
    fn enum_values_share_the_enclosing_scope() {
        let mut proto = file("a.proto", "acme", &[]);
        proto.enum_type.push(enumeration("Color", &["RED"]));
        proto.enum_type.push(enumeration("Alert", &["RED"]));
        assert!(build(proto, &FileSet::new()).is_err());
    }

    #[test]
    fn rejects_bad_field_numbers() {
        for number in [0, -3, MAX_FIELD_NUMBER + 1, 19_500] {
            let mut proto = file("a.proto", "acme", &[]);
            proto.message_type.push(message("M", &[("f", number)]));
            assert!(build(proto, &FileSet::new()).is_err(), "number {number}");
        }

        let mut proto = file("a.proto", "acme", &[]);
        proto.message_type.push(message("M", &[("f", MAX_FIELD_NUMBER)]));
        assert!(build(proto, &FileSet::new()).is_ok());
    }

    #[test]
    fn rejects_reused_field_number() {
        let mut proto = file("a.proto", "acme", &[]);
        proto.message_type.push(message("M", &[("a", 1), ("b", 1)]));
        let err = build(proto, &FileSet::new()).unwrap_err();
        assert!(err.reason.contains("field number 1"), "{err}");
    }

    #[test]
    fn rejects_empty_enum() {
        let mut proto = file("a.proto", "acme", &[]);
        proto.enum_type.push(enumeration("Empty", &[]));
        assert!(build(proto, &FileSet::new()).is_err());
    }

    #[test]
    fn rejects_unknown_syntax() {
        let mut proto = file("a.proto", "acme", &[]);
        proto.syntax = Some("proto4".to_string());
        let err = build(proto, &FileSet::new()).unwrap_err();
        assert!(err.reason.contains("proto4"));
    }

    #[test]
    fn rejects_symbol_defined_by_transitive_dependency() {
        let mut base = file("base.proto", "acme", &[]);
        base.message_type.push(message("Shared", &[]));
        let base = build(base, &FileSet::new()).unwrap();

        let mid = build(file("mid.proto", "acme", &["base.proto"]), &FileSet::from_iter([base.clone()]))
            .unwrap();

        let mut top = file("top.proto", "acme", &["mid.proto"]);
        top.message_type.push(message("Shared", &[]));
        let deps = FileSet::from_iter([base, mid]);
        let err = build(top, &deps).unwrap_err();
        assert!(err.reason.contains("base.proto"), "{err}");
    }

    #[test]
    fn binds_dependencies_in_declaration_order_and_reports_missing() {
        let a = build(file("a.proto", "p", &[]), &FileSet::new()).unwrap();
        let b = build(file("b.proto", "p", &[]), &FileSet::new()).unwrap();
        let deps = FileSet::from_iter([a, b]);

        let c = build(file("c.proto", "p", &["b.proto", "gone.proto", "a.proto"]), &deps).unwrap();
        let bound: Vec<&str> = c.dependencies().iter().map(|d| d.name().as_str()).collect();
        assert_eq!(bound, vec!["b.proto", "a.proto"]);
        let missing: Vec<&str> = c.missing_dependencies().iter().map(|n| n.as_str()).collect();
        assert_eq!(missing, vec!["gone.proto"]);
    }
}
