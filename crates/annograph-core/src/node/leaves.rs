//! Leaf-only node carriers: FASTA sequences, comments, meta directives and
//! the synthetic end-of-stream marker.

use annograph_error::Location;

/// A FASTA record embedded after `##FASTA` (or a bare `>` line).
#[derive(Debug, Clone)]
pub struct SequenceNode {
    description: String,
    residues: String,
    origin: Location,
}

impl SequenceNode {
    pub fn new(
        description: impl Into<String>,
        residues: impl Into<String>,
        origin: Location,
    ) -> Self {
        Self {
            description: description.into(),
            residues: residues.into(),
            origin,
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn residues(&self) -> &str {
        &self.residues
    }

    pub fn origin(&self) -> &Location {
        &self.origin
    }
}

/// A single `#` comment line (not a `##` directive).
#[derive(Debug, Clone)]
pub struct CommentNode {
    text: String,
    origin: Location,
}

impl CommentNode {
    pub fn new(text: impl Into<String>, origin: Location) -> Self {
        Self {
            text: text.into(),
            origin,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn origin(&self) -> &Location {
        &self.origin
    }
}

/// Any `##` directive without dedicated structure.
#[derive(Debug, Clone)]
pub struct MetaNode {
    directive: String,
    data: String,
    origin: Location,
}

impl MetaNode {
    pub fn new(directive: impl Into<String>, data: impl Into<String>, origin: Location) -> Self {
        Self {
            directive: directive.into(),
            data: data.into(),
            origin,
        }
    }

    pub fn directive(&self) -> &str {
        &self.directive
    }

    pub fn data(&self) -> &str {
        &self.data
    }

    pub fn origin(&self) -> &Location {
        &self.origin
    }
}

/// Emitted exactly once per input stream, after the last real node.
#[derive(Debug, Clone)]
pub struct EofNode {
    origin: Location,
}

impl EofNode {
    pub fn new(origin: Location) -> Self {
        Self { origin }
    }

    pub fn origin(&self) -> &Location {
        &self.origin
    }
}
