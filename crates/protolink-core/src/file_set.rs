//! An ordered, name-keyed set of linked files.

use indexmap::IndexMap;

use crate::builder::LinkedFile;
use crate::file_name::FileName;

/// Linked files keyed by name.
///
/// Iteration follows insertion order, which keeps output deterministic but
/// carries no meaning for linking. Names are unique: adding a file whose name
/// is already present leaves the set unchanged.
#[derive(Debug, Clone, Default)]
pub struct FileSet {
    files: IndexMap<FileName, LinkedFile>,
}

impl FileSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `file`, returning `false` if a file with the same name is
    /// already in the set.
    pub fn add(&mut self, file: LinkedFile) -> bool {
        if self.files.contains_key(file.name()) {
            return false;
        }
        self.files.insert(file.name().clone(), file);
        true
    }

    pub fn contains(&self, name: &FileName) -> bool {
        self.files.contains_key(name)
    }

    pub fn contains_all<'a>(&self, names: impl IntoIterator<Item = &'a FileName>) -> bool {
        names.into_iter().all(|name| self.contains(name))
    }

    pub fn get(&self, name: &FileName) -> Option<&LinkedFile> {
        self.files.get(name)
    }

    /// The files whose names are listed, in the order of `names`.
    /// Names that are not in this set are skipped.
    pub fn find<'a>(&self, names: impl IntoIterator<Item = &'a FileName>) -> FileSet {
        let mut found = FileSet::new();
        for name in names {
            if let Some(file) = self.files.get(name) {
                found.add(file.clone());
            }
        }
        found
    }

    /// A new set holding the files of both sets. On a name collision the
    /// entry from `self` is kept.
    pub fn union(&self, other: &FileSet) -> FileSet {
        let mut result = self.clone();
        result.extend(other.iter().cloned());
        result
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LinkedFile> + '_ {
        self.files.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &FileName> + '_ {
        self.files.keys()
    }
}

impl Extend<LinkedFile> for FileSet {
    fn extend<I: IntoIterator<Item = LinkedFile>>(&mut self, iter: I) {
        for file in iter {
            self.add(file);
        }
    }
}

impl FromIterator<LinkedFile> for FileSet {
    fn from_iter<I: IntoIterator<Item = LinkedFile>>(iter: I) -> Self {
        let mut set = FileSet::new();
        set.extend(iter);
        set
    }
}

impl IntoIterator for FileSet {
    type Item = LinkedFile;
    type IntoIter = indexmap::map::IntoValues<FileName, LinkedFile>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.into_values()
    }
}

impl<'a> IntoIterator for &'a FileSet {
    type Item = &'a LinkedFile;
    type IntoIter = indexmap::map::Values<'a, FileName, LinkedFile>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{DescriptorBuilder, ValidatingBuilder};
    use crate::record::RawFileRecord;
    use prost_types::FileDescriptorProto;

    fn linked(name: &str) -> LinkedFile {
        let record = RawFileRecord::from_proto(FileDescriptorProto {
            name: Some(name.to_string()),
            ..Default::default()
        })
        .unwrap();
        ValidatingBuilder.build(&record, &FileSet::new()).unwrap()
    }

    fn name(s: &str) -> FileName {
        FileName::parse(s).unwrap()
    }

    fn names(set: &FileSet) -> Vec<&str> {
        set.names().map(FileName::as_str).collect()
    }

    #[test]
    fn add_ignores_duplicate_names() {
        let mut set = FileSet::new();
        let first = linked("a.proto");
        assert!(set.add(first.clone()));
        assert!(!set.add(linked("a.proto")));
        assert_eq!(set.len(), 1);
        assert!(set.get(&name("a.proto")).unwrap().ptr_eq(&first));
    }

    #[test]
    fn contains_all_checks_every_name() {
        let set = FileSet::from_iter([linked("a.proto"), linked("b.proto")]);
        assert!(set.contains_all(&[name("a.proto"), name("b.proto")]));
        assert!(!set.contains_all(&[name("a.proto"), name("c.proto")]));
        assert!(set.contains_all(std::iter::empty()));
    }

    #[test]
    fn find_skips_absent_names() {
        let set = FileSet::from_iter([linked("a.proto"), linked("b.proto"), linked("c.proto")]);
        let found = set.find(&[name("c.proto"), name("x.proto"), name("a.proto")]);
        assert_eq!(names(&found), vec!["c.proto", "a.proto"]);
        assert!(set.find(&[name("x.proto")]).is_empty());
    }

    #[test]
    fn union_keeps_both_sides_in_order() {
        let left = FileSet::from_iter([linked("a.proto"), linked("b.proto")]);
        let right = FileSet::from_iter([linked("c.proto"), linked("b.proto")]);
        let union = left.union(&right);
        assert_eq!(names(&union), vec!["a.proto", "b.proto", "c.proto"]);
        assert!(union.get(&name("b.proto")).unwrap().ptr_eq(left.get(&name("b.proto")).unwrap()));
        assert_eq!(left.len(), 2, "operands are left untouched");
    }
}
