//! Linking of raw file descriptors into [`LinkedFile`]s.
//!
//! A file can only be built once every file it imports has been built. The
//! input, however, is an unordered bag that may import files it does not
//! contain, so linking runs in phases:
//!
//! 1. files without imports are built straight away;
//! 2. the rest is scanned repeatedly, building every file whose imports are
//!    all resolved, until a scan makes no progress;
//! 3. each file left over is built in a single pass against whatever of its
//!    imports exists among resolved and partially resolved files, and is
//!    classified as partially resolved;
//! 4. anything still remaining is built with no dependencies at all and
//!    classified as unresolved.
//!
//! Phase 3 drains the working list, so phase 4 is not expected to see any
//! file in practice.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::builder::{DescriptorBuilder, LinkedFile, ValidatingBuilder};
use crate::error::LinkError;
use crate::file_set::FileSet;
use crate::record::RawFileRecord;

/// Builds a set of linked files from raw descriptors.
///
/// A linker resolves its input once; it is not meant to be shared across
/// threads while doing so. Independent linkers are fully independent.
pub struct Linker<B = ValidatingBuilder> {
    builder: B,
    input_len: usize,
    remaining: Vec<RawFileRecord>,
    resolved: FileSet,
    partially_resolved: FileSet,
    unresolved: FileSet,
    done: bool,
    span: tracing::Span,
}

/// The three disjoint results of a linking run.
#[derive(Debug, Clone, Default)]
pub struct LinkOutcome {
    pub resolved: FileSet,
    pub partially_resolved: FileSet,
    pub unresolved: FileSet,
}

impl LinkOutcome {
    /// All files of the run: resolved first, then partial, then unresolved.
    pub fn all(&self) -> FileSet {
        self.resolved
            .union(&self.partially_resolved)
            .union(&self.unresolved)
    }

    pub fn len(&self) -> usize {
        self.resolved.len() + self.partially_resolved.len() + self.unresolved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` when every file has all of its imports linked.
    pub fn is_complete(&self) -> bool {
        self.partially_resolved.is_empty() && self.unresolved.is_empty()
    }
}

impl Linker<ValidatingBuilder> {
    pub fn new(input: impl IntoIterator<Item = RawFileRecord>) -> Result<Self, LinkError> {
        Self::with_builder(input, ValidatingBuilder)
    }

    /// Links `input` and returns every file, whatever its resolution quality.
    pub fn link(input: impl IntoIterator<Item = RawFileRecord>) -> Result<FileSet, LinkError> {
        let mut linker = Self::new(input)?;
        linker.resolve()?;
        Ok(linker.into_outcome().all())
    }
}

impl<B: DescriptorBuilder> Linker<B> {
    /// Creates a linker over `input` using `builder` to construct files.
    ///
    /// Records that are exact copies of an earlier record are dropped.
    /// Two different records with the same name are rejected.
    pub fn with_builder(
        input: impl IntoIterator<Item = RawFileRecord>,
        builder: B,
    ) -> Result<Self, LinkError> {
        let remaining = dedup(input)?;
        let span = tracing::debug_span!("link", files = remaining.len());
        Ok(Self {
            builder,
            input_len: remaining.len(),
            remaining,
            resolved: FileSet::new(),
            partially_resolved: FileSet::new(),
            unresolved: FileSet::new(),
            done: false,
            span,
        })
    }

    /// Replaces the span that linking diagnostics are recorded under.
    pub fn with_span(mut self, span: tracing::Span) -> Self {
        self.span = span;
        self
    }

    /// Runs all linking phases.
    ///
    /// A malformed payload aborts the run. Every output set and the
    /// remaining records are then emptied, so no partial result survives
    /// a failed run.
    pub fn resolve(&mut self) -> Result<(), LinkError> {
        if self.done {
            return Err(LinkError::AlreadyResolved);
        }
        self.done = true;

        let span = self.span.clone();
        let _entered = span.enter();

        if let Err(err) = self.run_phases() {
            warn!(error = %err, "linking aborted");
            self.discard();
            return Err(err);
        }
        Ok(())
    }

    fn run_phases(&mut self) -> Result<(), LinkError> {
        self.find_without_dependencies()?;
        self.find_resolved()?;
        self.find_partially_resolved()?;
        self.add_unresolved()?;

        debug!(
            input = self.input_len,
            resolved = self.resolved.len(),
            partially_resolved = self.partially_resolved.len(),
            unresolved = self.unresolved.len(),
            "linking finished"
        );
        if !self.partially_resolved.is_empty() || !self.unresolved.is_empty() {
            warn!(
                partially_resolved = self.partially_resolved.len(),
                unresolved = self.unresolved.len(),
                "some proto files could not be fully linked"
            );
        }
        Ok(())
    }

    fn discard(&mut self) {
        self.remaining.clear();
        self.resolved = FileSet::new();
        self.partially_resolved = FileSet::new();
        self.unresolved = FileSet::new();
    }

    fn build(&self, record: &RawFileRecord, dependencies: &FileSet) -> Result<LinkedFile, LinkError> {
        self.builder
            .build(record, dependencies)
            .map_err(LinkError::Malformed)
    }

    fn find_without_dependencies(&mut self) -> Result<(), LinkError> {
        let no_dependencies = FileSet::new();
        let mut still_remaining = Vec::with_capacity(self.remaining.len());
        for record in std::mem::take(&mut self.remaining) {
            if record.has_dependencies() {
                still_remaining.push(record);
                continue;
            }
            let file = self.build(&record, &no_dependencies)?;
            self.resolved.add(file);
        }
        self.remaining = still_remaining;
        debug!(resolved = self.resolved.len(), "built files without imports");
        Ok(())
    }

    /// Repeats resolution passes until nothing is left or a pass makes no
    /// progress. Each productive pass resolves at least one file, so there
    /// are at most as many passes as files.
    fn find_resolved(&mut self) -> Result<(), LinkError> {
        let mut passes = 0usize;
        while !self.remaining.is_empty() {
            passes += 1;
            if !self.resolve_pass()? {
                break;
            }
        }
        debug!(
            passes,
            resolved = self.resolved.len(),
            remaining = self.remaining.len(),
            "resolution reached a fixpoint"
        );
        Ok(())
    }

    fn resolve_pass(&mut self) -> Result<bool, LinkError> {
        let mut progress = false;
        let mut still_remaining = Vec::with_capacity(self.remaining.len());
        for record in std::mem::take(&mut self.remaining) {
            if !self.resolved.contains_all(record.dependency_names()) {
                still_remaining.push(record);
                continue;
            }
            let dependencies = self.resolved.find(record.dependency_names());
            let file = self.build(&record, &dependencies)?;
            self.resolved.add(file);
            progress = true;
        }
        self.remaining = still_remaining;
        Ok(progress)
    }

    /// Builds every remaining file against the imports that are available,
    /// in one pass. Files built earlier in the pass count as available.
    fn find_partially_resolved(&mut self) -> Result<(), LinkError> {
        if self.remaining.is_empty() {
            return Ok(());
        }
        let mut available = self.resolved.union(&self.partially_resolved);
        for record in std::mem::take(&mut self.remaining) {
            let dependencies = available.find(record.dependency_names());
            let file = self.build(&record, &dependencies)?;
            debug!(
                file = %record.name(),
                found = dependencies.len(),
                declared = record.dependency_names().len(),
                "partially resolved"
            );
            available.add(file.clone());
            self.partially_resolved.add(file);
        }
        Ok(())
    }

    fn add_unresolved(&mut self) -> Result<(), LinkError> {
        let no_dependencies = FileSet::new();
        for record in std::mem::take(&mut self.remaining) {
            let file = self.build(&record, &no_dependencies)?;
            warn!(file = %record.name(), "proto file left unresolved");
            self.unresolved.add(file);
        }
        Ok(())
    }

    pub fn resolved(&self) -> &FileSet {
        &self.resolved
    }

    pub fn partially_resolved(&self) -> &FileSet {
        &self.partially_resolved
    }

    pub fn unresolved(&self) -> &FileSet {
        &self.unresolved
    }

    /// Records not placed into any set yet. Empty once [`Linker::resolve`]
    /// has run, whether it succeeded or not.
    pub fn remaining(&self) -> &[RawFileRecord] {
        &self.remaining
    }

    /// Number of distinct records the linker was given.
    pub fn input_len(&self) -> usize {
        self.input_len
    }

    pub fn into_outcome(self) -> LinkOutcome {
        LinkOutcome {
            resolved: self.resolved,
            partially_resolved: self.partially_resolved,
            unresolved: self.unresolved,
        }
    }
}

fn dedup(input: impl IntoIterator<Item = RawFileRecord>) -> Result<Vec<RawFileRecord>, LinkError> {
    let mut records: Vec<RawFileRecord> = Vec::new();
    let mut positions = HashMap::new();
    for record in input {
        match positions.get(record.name()) {
            Some(&index) => {
                let existing: &RawFileRecord = &records[index];
                if existing != &record {
                    return Err(LinkError::DuplicateFile(record.name().clone()));
                }
            }
            None => {
                positions.insert(record.name().clone(), records.len());
                records.push(record);
            }
        }
    }
    Ok(records)
}
