//! Validated `.proto` file names.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::FileNameError;

const EXTENSION: &str = ".proto";
const COMMANDS_SUFFIX: &str = "commands";
const EVENTS_SUFFIX: &str = "events";
const REJECTIONS_SUFFIX: &str = "rejections";

/// Path of a `.proto` file relative to its source root,
/// e.g. `google/protobuf/any.proto`.
///
/// This is the primary key of a file everywhere in the linker.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FileName(String);

/// What a file declares, judged by the naming convention of its file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Commands,
    Events,
    Rejections,
    Other,
}

impl FileName {
    pub fn parse(value: impl Into<String>) -> Result<Self, FileNameError> {
        let value = value.into();
        if value.is_empty() {
            return Err(FileNameError::Empty);
        }
        if !value.ends_with(EXTENSION) || value.len() == EXTENSION.len() {
            return Err(FileNameError::MissingExtension(value));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The full path without the `.proto` extension.
    pub fn name_without_extension(&self) -> &str {
        &self.0[..self.0.len() - EXTENSION.len()]
    }

    /// The last path segment without the extension.
    fn name_only(&self) -> &str {
        let path = self.name_without_extension();
        path.rsplit('/').next().unwrap_or(path)
    }

    /// Words of the file name, split by underscores.
    ///
    /// `some_file_name.proto` yields `["some", "file", "name"]`.
    pub fn words(&self) -> Vec<&str> {
        self.name_only()
            .split('_')
            .filter(|w| !w.is_empty())
            .collect()
    }

    /// `many_rejections.proto` yields `ManyRejections`.
    pub fn name_only_camel_case(&self) -> String {
        let mut out = String::with_capacity(self.name_only().len());
        for word in self.words() {
            let mut chars = word.chars();
            if let Some(first) = chars.next() {
                out.extend(first.to_uppercase());
                out.push_str(chars.as_str());
            }
        }
        out
    }

    pub fn kind(&self) -> FileKind {
        let name = self.name_only();
        if name.ends_with(COMMANDS_SUFFIX) {
            FileKind::Commands
        } else if name.ends_with(EVENTS_SUFFIX) {
            FileKind::Events
        } else if name.ends_with(REJECTIONS_SUFFIX) {
            FileKind::Rejections
        } else {
            FileKind::Other
        }
    }

    pub fn is_commands(&self) -> bool {
        self.kind() == FileKind::Commands
    }

    pub fn is_events(&self) -> bool {
        self.kind() == FileKind::Events
    }

    pub fn is_rejections(&self) -> bool {
        self.kind() == FileKind::Rejections
    }
}

impl fmt::Display for FileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for FileName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for FileName {
    type Error = FileNameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl TryFrom<&str> for FileName {
    type Error = FileNameError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<FileName> for String {
    fn from(value: FileName) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn of(s: &str) -> FileName {
        FileName::parse(s).unwrap()
    }

    #[test]
    fn requires_standard_extension() {
        assert_eq!(
            FileName::parse("some_thing"),
            Err(FileNameError::MissingExtension("some_thing".to_string()))
        );
        assert_eq!(FileName::parse(""), Err(FileNameError::Empty));
        assert!(FileName::parse(".proto").is_err());
    }

    #[test]
    fn returns_words() {
        assert_eq!(of("some_file_name.proto").words(), vec!["some", "file", "name"]);
        assert_eq!(of("pkg/sub/two_words.proto").words(), vec!["two", "words"]);
    }

    #[test]
    fn calculates_outer_class_name() {
        assert_eq!(of("rejections.proto").name_only_camel_case(), "Rejections");
        assert_eq!(of("many_rejections.proto").name_only_camel_case(), "ManyRejections");
        assert_eq!(
            of("many_more_rejections.proto").name_only_camel_case(),
            "ManyMoreRejections"
        );
    }

    #[test]
    fn strips_extension() {
        assert_eq!(of("package/commands.proto").name_without_extension(), "package/commands");
    }

    #[test]
    fn tells_file_kind() {
        let commands = of("my_commands.proto");
        assert!(commands.is_commands());
        assert!(!commands.is_events());
        assert!(!commands.is_rejections());

        let events = of("project_events.proto");
        assert!(events.is_events());
        assert!(!events.is_commands());

        assert!(of("rejections.proto").is_rejections());
        assert_eq!(of("google/protobuf/any.proto").kind(), FileKind::Other);
    }

    #[test]
    fn round_trips_through_serde() {
        let json = serde_json::to_string(&of("a/b.proto")).unwrap();
        assert_eq!(json, "\"a/b.proto\"");
        assert!(serde_json::from_str::<FileName>("\"nope.txt\"").is_err());
    }
}
