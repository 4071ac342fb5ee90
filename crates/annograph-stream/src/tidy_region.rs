//! Recomputes region ranges to cover every feature citing them.
//!
//! Streaming: the first region node per seqid is remembered, and every
//! subsequent feature on that seqid widens the shared region node in place
//! by its subtree range. A feature whose seqid has no *preceding* region
//! declaration is an error.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use annograph_core::node::{CommentNode, EofNode, MetaNode, SequenceNode};
use annograph_core::{FeatureNode, FeatureRef, GenomeNode, NodeVisitor, RegionRef};
use annograph_error::{Error, Result};

use crate::stream::NodeStream;
use crate::visitor_stream::{StreamVisitor, VisitorStream};

#[derive(Default)]
pub struct TidyRegionVisitor {
    out: VecDeque<GenomeNode>,
    region_nodes: HashMap<String, RegionRef>,
}

impl NodeVisitor for TidyRegionVisitor {
    fn visit_feature(&mut self, node: &FeatureRef) -> Result<()> {
        let seqid = node.seqid();
        let Some(region) = self.region_nodes.get(&seqid) else {
            return Err(Error::semantic(format!(
                "seqid '{}' has not been defined yet",
                seqid
            ))
            .at(node.origin().clone()));
        };
        let mut range = node.range();
        FeatureNode::traverse(node, true, &mut |n| {
            range = range.join(&n.range());
            Ok(())
        })?;
        region.set_range(region.range().join(&range));
        self.out.push_back(GenomeNode::Feature(Arc::clone(node)));
        Ok(())
    }

    fn visit_region(&mut self, node: &RegionRef) -> Result<()> {
        let seqid = node.seqid();
        if !self.region_nodes.contains_key(&seqid) {
            self.region_nodes.insert(seqid, Arc::clone(node));
        }
        self.out.push_back(GenomeNode::Region(Arc::clone(node)));
        Ok(())
    }

    fn visit_sequence(&mut self, node: &Arc<SequenceNode>) -> Result<()> {
        self.out.push_back(GenomeNode::Sequence(Arc::clone(node)));
        Ok(())
    }

    fn visit_comment(&mut self, node: &Arc<CommentNode>) -> Result<()> {
        self.out.push_back(GenomeNode::Comment(Arc::clone(node)));
        Ok(())
    }

    fn visit_meta(&mut self, node: &Arc<MetaNode>) -> Result<()> {
        self.out.push_back(GenomeNode::Meta(Arc::clone(node)));
        Ok(())
    }

    fn visit_eof(&mut self, node: &EofNode) -> Result<()> {
        self.out.push_back(GenomeNode::Eof(node.clone()));
        Ok(())
    }
}

impl StreamVisitor for TidyRegionVisitor {
    fn poll_node(&mut self) -> Option<GenomeNode> {
        self.out.pop_front()
    }
}

/// The tidy-region stage; see [`TidyRegionVisitor`].
pub struct TidyRegionStream<S: NodeStream> {
    inner: VisitorStream<S, TidyRegionVisitor>,
}

impl<S: NodeStream> TidyRegionStream<S> {
    pub fn new(in_stream: S) -> Self {
        Self {
            inner: VisitorStream::new(in_stream, TidyRegionVisitor::default()),
        }
    }
}

impl<S: NodeStream> NodeStream for TidyRegionStream<S> {
    fn next_node(&mut self) -> Result<Option<GenomeNode>> {
        self.inner.next_node()
    }

    fn is_sorted(&self) -> bool {
        self.inner.is_sorted()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::{drain, QueueStream};
    use annograph_core::{InternPool, Range, RegionNode, Strand};
    use annograph_error::Location;

    fn feature(pool: &InternPool, seqid: &str, start: u64, end: u64) -> FeatureRef {
        FeatureNode::new(
            pool,
            seqid,
            "test",
            "gene",
            Range::new(start, end),
            Strand::Forward,
            Location::new("t.gff3", 2),
        )
    }

    #[test]
    fn region_widens_to_cover_features() {
        let pool = InternPool::new();
        let region = RegionNode::new(
            &pool,
            "chr1",
            Range::new(1, 100),
            Location::new("t.gff3", 1),
        );
        let mut stage = TidyRegionStream::new(QueueStream::new([
            GenomeNode::Region(region.clone()),
            GenomeNode::Feature(feature(&pool, "chr1", 50, 900)),
        ]));
        let nodes = drain(&mut stage).unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(region.range(), Range::new(1, 900));
    }

    #[test]
    fn subtree_ranges_count_too() {
        let pool = InternPool::new();
        let region = RegionNode::new(
            &pool,
            "chr1",
            Range::new(1, 100),
            Location::new("t.gff3", 1),
        );
        let gene = feature(&pool, "chr1", 50, 80);
        gene.add_child(feature(&pool, "chr1", 60, 500));
        let mut stage = TidyRegionStream::new(QueueStream::new([
            GenomeNode::Region(region.clone()),
            GenomeNode::Feature(gene),
        ]));
        drain(&mut stage).unwrap();
        assert_eq!(region.range(), Range::new(1, 500));
    }

    #[test]
    fn undeclared_region_is_an_error() {
        let pool = InternPool::new();
        let mut stage = TidyRegionStream::new(QueueStream::new([GenomeNode::Feature(feature(
            &pool, "chrX", 1, 10,
        ))]));
        let err = drain(&mut stage).unwrap_err();
        assert!(err.message().contains("has not been defined yet"));
    }

    #[test]
    fn feature_before_its_region_is_an_error() {
        // the declaring region must precede its features; a later pragma
        // does not repair the order
        let pool = InternPool::new();
        let region = RegionNode::new(
            &pool,
            "chr1",
            Range::new(1, 100),
            Location::new("t.gff3", 5),
        );
        let mut stage = TidyRegionStream::new(QueueStream::new([
            GenomeNode::Feature(feature(&pool, "chr1", 1, 10)),
            GenomeNode::Region(region),
        ]));
        let err = drain(&mut stage).unwrap_err();
        assert!(err.message().contains("has not been defined yet"));
        assert_eq!(err.location().unwrap().line(), 2);
    }

    #[test]
    fn idempotent_once_widened() {
        let pool = InternPool::new();
        let region = RegionNode::new(
            &pool,
            "chr1",
            Range::new(1, 100),
            Location::new("t.gff3", 1),
        );
        let nodes = vec![
            GenomeNode::Region(region.clone()),
            GenomeNode::Feature(feature(&pool, "chr1", 50, 900)),
        ];
        let mut first = TidyRegionStream::new(QueueStream::new(nodes));
        let once = drain(&mut first).unwrap();
        let after_first = region.range();
        let mut second = TidyRegionStream::new(QueueStream::new(once));
        drain(&mut second).unwrap();
        assert_eq!(region.range(), after_first);
    }
}
