//! Serializable summary of a linking run.

use serde::{Deserialize, Serialize};

use crate::file_set::FileSet;
use crate::linker::LinkOutcome;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialFileV1 {
    pub name: String,
    pub missing: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkStatsV1 {
    pub files: usize,
    pub resolved: usize,
    pub partially_resolved: usize,
    pub unresolved: usize,
}

/// Which files linked completely, which only partially, and what they miss.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkReportV1 {
    pub resolved: Vec<String>,
    pub partially_resolved: Vec<PartialFileV1>,
    pub unresolved: Vec<String>,
    pub stats: LinkStatsV1,
}

impl LinkReportV1 {
    pub fn from_outcome(outcome: &LinkOutcome) -> Self {
        let stats = LinkStatsV1 {
            files: outcome.len(),
            resolved: outcome.resolved.len(),
            partially_resolved: outcome.partially_resolved.len(),
            unresolved: outcome.unresolved.len(),
        };
        Self {
            resolved: names(&outcome.resolved),
            partially_resolved: outcome
                .partially_resolved
                .iter()
                .map(|file| PartialFileV1 {
                    name: file.name().to_string(),
                    missing: file
                        .missing_dependencies()
                        .into_iter()
                        .map(|n| n.to_string())
                        .collect(),
                })
                .collect(),
            unresolved: names(&outcome.unresolved),
            stats,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.partially_resolved.is_empty() && self.unresolved.is_empty()
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn names(files: &FileSet) -> Vec<String> {
    files.names().map(|n| n.to_string()).collect()
}
