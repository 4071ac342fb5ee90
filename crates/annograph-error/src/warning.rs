//! Recoverable findings produced in tidy mode.

use std::fmt;

use crate::Location;

/// A recoverable finding. Tidy mode demotes a graded subset of parse and
/// semantic errors into warnings and continues.
#[derive(Debug, Clone)]
pub struct Warning {
    message: String,
    location: Option<Location>,
}

impl Warning {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: None,
        }
    }

    pub fn at(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{} ({})", self.message, location),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Host-provided warning receiver. When none is installed, warnings are
/// logged through `tracing::warn!` by the producer.
pub type WarningSink = Box<dyn FnMut(Warning) + Send>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warning_display_with_location() {
        let w = Warning::new("skipping blank line").at(Location::new("in.gff3", 4));
        assert_eq!(
            w.to_string(),
            "skipping blank line (line 4 in file \"in.gff3\")"
        );
    }
}
