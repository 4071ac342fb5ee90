//! The main Error type for annograph.

use std::fmt;
use std::sync::Arc;

use crate::ErrorKind;

/// Provenance of a node or error: originating filename and 1-based line.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    filename: Arc<str>,
    line: u64,
}

impl Location {
    pub fn new(filename: impl Into<Arc<str>>, line: u64) -> Self {
        Self {
            filename: filename.into(),
            line,
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn filename_arc(&self) -> Arc<str> {
        Arc::clone(&self.filename)
    }

    pub fn line(&self) -> u64 {
        self.line
    }

    /// Same file, different line. Used while a parser advances.
    pub fn with_line(&self, line: u64) -> Self {
        Self {
            filename: Arc::clone(&self.filename),
            line,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {} in file \"{}\"", self.line, self.filename)
    }
}

/// Unified error type for all annograph operations.
pub struct Error {
    kind: ErrorKind,
    message: String,
    location: Option<Location>,
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl Error {
    /// Create a new error with the given kind and message.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            location: None,
            source: None,
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Parse, message)
    }

    pub fn semantic(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Semantic, message)
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, message)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Io, message)
    }

    pub fn programmer(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Programmer, message)
    }

    /// Get the error kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the location this error refers to (if any)
    pub fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }

    /// Get the source error (if any).
    pub fn source_ref(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        self.source.as_ref().map(|e| e.as_ref())
    }

    /// Attach a `(file, line)` location.
    pub fn at(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// Set the source error.
    ///
    /// # Panics (debug only)
    /// Panics in debug mode if source was already set.
    pub fn set_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        debug_assert!(self.source.is_none(), "source error already set");
        self.source = Some(Box::new(source));
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;
        if let Some(location) = &self.location {
            write!(f, " ({})", location)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("Error");
        d.field("kind", &self.kind).field("message", &self.message);
        if let Some(location) = &self.location {
            d.field("location", location);
        }
        if let Some(source) = &self.source {
            d.field("source", source);
        }
        d.finish()
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|s| s.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::new(ErrorKind::Io, err.to_string()).set_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_carries_location() {
        let err = Error::parse("bad field count").at(Location::new("in.gff3", 12));
        assert_eq!(err.kind(), ErrorKind::Parse);
        assert_eq!(err.location().unwrap().line(), 12);
        assert_eq!(err.location().unwrap().filename(), "in.gff3");
    }

    #[test]
    fn display_includes_kind_message_and_location() {
        let err = Error::semantic("cycle detected").at(Location::new("x.gff3", 3));
        let shown = err.to_string();
        assert!(shown.contains("Semantic"));
        assert!(shown.contains("cycle detected"));
        assert!(shown.contains("line 3 in file \"x.gff3\""));
    }

    #[test]
    fn io_errors_convert_with_source() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io_err.into();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.source_ref().is_some());
    }

    #[test]
    fn location_with_line_keeps_filename() {
        let loc = Location::new("a.gff3", 1);
        let moved = loc.with_line(99);
        assert_eq!(moved.filename(), "a.gff3");
        assert_eq!(moved.line(), 99);
    }
}
