//! The genome-node graph: a sum type over feature, region, sequence,
//! comment, meta and EOF nodes.
//!
//! Feature nodes form a DAG (most commonly a forest) via owned child
//! handles; everything else is a leaf carrier. Nodes are shared through
//! `Arc` handles: ownership moves down the pipeline, while indexes, pseudo
//! parents and multi-feature members hold additional counted handles.

mod attrs;
mod feature;
mod leaves;
mod region;

use std::str::FromStr;
use std::sync::Arc;

use annograph_error::{Error, Location, Result};
use strum_macros::{Display, EnumIter, EnumString};

pub use attrs::AttributeMap;
pub use feature::{FeatureNode, FeatureRef};
pub use leaves::{CommentNode, EofNode, MetaNode, SequenceNode};
pub use region::{RegionNode, RegionRef};

use crate::visit::NodeVisitor;
use crate::Range;

/// Reading direction of a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
pub enum Strand {
    #[strum(serialize = "+")]
    Forward,
    #[strum(serialize = "-")]
    Reverse,
    #[strum(serialize = ".")]
    Both,
    #[strum(serialize = "?")]
    Unknown,
}

impl Strand {
    /// Parse the single-character strand column.
    pub fn parse(token: &str) -> Result<Strand> {
        Strand::from_str(token)
            .map_err(|_| Error::parse(format!("strand \"{}\" is not one of +-.?", token)))
    }
}

/// Codon phase of a CDS feature; `.` in the file maps to `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
pub enum Phase {
    #[strum(serialize = "0")]
    Zero,
    #[strum(serialize = "1")]
    One,
    #[strum(serialize = "2")]
    Two,
}

impl Phase {
    pub fn parse(token: &str) -> Result<Option<Phase>> {
        if token == "." {
            return Ok(None);
        }
        Phase::from_str(token)
            .map(Some)
            .map_err(|_| Error::parse(format!("phase \"{}\" is not one of 012.", token)))
    }
}

/// Identity key of a feature node, derived from its counted handle.
///
/// Stable for the lifetime of the handle; used wherever the original design
/// keyed hash maps by node identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeKey(usize);

impl NodeKey {
    pub(crate) fn of(node: &FeatureRef) -> Self {
        NodeKey(Arc::as_ptr(node) as usize)
    }
}

/// Any node that can flow through a pipeline.
#[derive(Debug, Clone)]
pub enum GenomeNode {
    Feature(FeatureRef),
    Region(RegionRef),
    Sequence(Arc<SequenceNode>),
    Comment(Arc<CommentNode>),
    Meta(Arc<MetaNode>),
    Eof(EofNode),
}

impl GenomeNode {
    /// Sequence id this node refers to, if any.
    pub fn seqid(&self) -> Option<String> {
        match self {
            GenomeNode::Feature(f) => Some(f.seqid()),
            GenomeNode::Region(r) => Some(r.seqid()),
            _ => None,
        }
    }

    /// Coordinate range. Leaf carriers answer with their line number, which
    /// keeps mixed-node sorting total.
    pub fn range(&self) -> Range {
        match self {
            GenomeNode::Feature(f) => f.range(),
            GenomeNode::Region(r) => r.range(),
            GenomeNode::Sequence(s) => line_range(s.origin()),
            GenomeNode::Comment(c) => line_range(c.origin()),
            GenomeNode::Meta(m) => line_range(m.origin()),
            GenomeNode::Eof(e) => line_range(e.origin()),
        }
    }

    pub fn set_range(&self, range: Range) {
        match self {
            GenomeNode::Feature(f) => f.set_range(range),
            GenomeNode::Region(r) => r.set_range(range),
            _ => {}
        }
    }

    pub fn change_seqid(&self, seqid: &str) {
        match self {
            GenomeNode::Feature(f) => f.change_seqid(seqid),
            GenomeNode::Region(r) => r.change_seqid(seqid),
            _ => {}
        }
    }

    /// Sort key string: seqid where present, otherwise the most salient
    /// text the node carries. Ties are broken by line number by callers.
    pub fn idstr(&self) -> String {
        match self {
            GenomeNode::Feature(f) => f.seqid(),
            GenomeNode::Region(r) => r.seqid(),
            GenomeNode::Sequence(s) => s.description().to_owned(),
            GenomeNode::Comment(c) => c.text().to_owned(),
            GenomeNode::Meta(m) => m.directive().to_owned(),
            GenomeNode::Eof(_) => String::new(),
        }
    }

    pub fn origin(&self) -> &Location {
        match self {
            GenomeNode::Feature(f) => f.origin(),
            GenomeNode::Region(r) => r.origin(),
            GenomeNode::Sequence(s) => s.origin(),
            GenomeNode::Comment(c) => c.origin(),
            GenomeNode::Meta(m) => m.origin(),
            GenomeNode::Eof(e) => e.origin(),
        }
    }

    pub fn line_number(&self) -> u64 {
        self.origin().line()
    }

    pub fn filename(&self) -> &str {
        self.origin().filename()
    }

    /// Double dispatch on the node variant.
    pub fn accept(&self, visitor: &mut dyn NodeVisitor) -> Result<()> {
        match self {
            GenomeNode::Feature(f) => visitor.visit_feature(f),
            GenomeNode::Region(r) => visitor.visit_region(r),
            GenomeNode::Sequence(s) => visitor.visit_sequence(s),
            GenomeNode::Comment(c) => visitor.visit_comment(c),
            GenomeNode::Meta(m) => visitor.visit_meta(m),
            GenomeNode::Eof(e) => visitor.visit_eof(e),
        }
    }

    #[inline]
    pub fn as_feature(&self) -> Option<&FeatureRef> {
        match self {
            GenomeNode::Feature(f) => Some(f),
            _ => None,
        }
    }

    #[inline]
    pub fn is_feature(&self) -> bool {
        matches!(self, GenomeNode::Feature(_))
    }

    #[inline]
    pub fn as_region(&self) -> Option<&RegionRef> {
        match self {
            GenomeNode::Region(r) => Some(r),
            _ => None,
        }
    }

    #[inline]
    pub fn is_region(&self) -> bool {
        matches!(self, GenomeNode::Region(_))
    }

    #[inline]
    pub fn is_eof(&self) -> bool {
        matches!(self, GenomeNode::Eof(_))
    }

    #[inline]
    pub fn expect_feature(&self) -> &FeatureRef {
        match self {
            GenomeNode::Feature(f) => f,
            _ => panic!("expected Feature variant"),
        }
    }
}

fn line_range(origin: &Location) -> Range {
    let line = origin.line().max(1);
    Range::new(line, line)
}

impl From<FeatureRef> for GenomeNode {
    fn from(node: FeatureRef) -> Self {
        GenomeNode::Feature(node)
    }
}

impl From<RegionRef> for GenomeNode {
    fn from(node: RegionRef) -> Self {
        GenomeNode::Region(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strand_round_trips_through_chars() {
        for (token, strand) in [
            ("+", Strand::Forward),
            ("-", Strand::Reverse),
            (".", Strand::Both),
            ("?", Strand::Unknown),
        ] {
            assert_eq!(Strand::parse(token).unwrap(), strand);
            assert_eq!(strand.to_string(), token);
        }
        assert!(Strand::parse("x").is_err());
        assert!(Strand::parse("++").is_err());
    }

    #[test]
    fn phase_parses_dot_as_none() {
        assert_eq!(Phase::parse(".").unwrap(), None);
        assert_eq!(Phase::parse("2").unwrap(), Some(Phase::Two));
        assert!(Phase::parse("3").is_err());
    }
}
