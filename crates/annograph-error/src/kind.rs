//! Error kinds for annograph operations

use strum_macros::{Display, IntoStaticStr};

/// The kind of error that occurred.
///
/// This enum categorizes errors to help users write clear error handling
/// logic. Users can match on ErrorKind to decide how to handle specific
/// error cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr, Display)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Malformed line, field, attribute or version pragma
    Parse,

    /// Structurally valid input violating graph semantics: cycles, seqid
    /// mismatches, missing parents in strict mode, ID collisions across a
    /// terminator, multi-feature constraint violations, part-of violations
    Semantic,

    /// Style, type-checker or xref-checker query failure
    Config,

    /// File open/read/write failure bubbled up from collaborators
    Io,

    /// Violated internal invariant (sentinel checks, handle misuse)
    Programmer,
}

impl ErrorKind {
    /// Stable lowercase name used in log output.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Parse => "parse",
            ErrorKind::Semantic => "semantic",
            ErrorKind::Config => "config",
            ErrorKind::Io => "io",
            ErrorKind::Programmer => "programmer",
        }
    }
}
