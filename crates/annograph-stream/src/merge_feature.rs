//! Merges end-to-end abutting sibling leaves of the same type.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use annograph_core::node::{CommentNode, EofNode, MetaNode, SequenceNode};
use annograph_core::{FeatureNode, FeatureRef, GenomeNode, NodeVisitor, Sym};
use annograph_error::Result;

use crate::stream::NodeStream;
use crate::visitor_stream::{StreamVisitor, VisitorStream};

#[derive(Default)]
pub struct MergeFeatureVisitor {
    out: VecDeque<GenomeNode>,
}

impl MergeFeatureVisitor {
    /// Merge the direct children of one parent. Children are assumed sorted
    /// by range; only childless leaves merge, and the merged score is
    /// undefined (no averaging).
    fn merge_in_children(parent: &FeatureRef, to_remove: &mut Vec<FeatureRef>) {
        let mut previous: HashMap<Sym, FeatureRef> = HashMap::new();
        for child in parent.children() {
            let ftype = child.type_sym();
            if let Some(prev) = previous.get(&ftype) {
                debug_assert!(prev.range() <= child.range(), "children sorted");
                if prev.range().end + 1 == child.range().start
                    && !prev.has_children()
                    && !child.has_children()
                {
                    prev.set_range(prev.range().join(&child.range()));
                    prev.unset_score();
                    to_remove.push(Arc::clone(&child));
                    // the surviving leaf keeps accumulating further
                    // abutting siblings
                    continue;
                }
            }
            previous.insert(ftype, child);
        }
    }
}

impl NodeVisitor for MergeFeatureVisitor {
    fn visit_feature(&mut self, node: &FeatureRef) -> Result<()> {
        let mut to_remove = Vec::new();
        FeatureNode::traverse(node, true, &mut |n| {
            Self::merge_in_children(n, &mut to_remove);
            Ok(())
        })?;
        for leaf in to_remove {
            FeatureNode::remove_leaf(node, &leaf);
        }
        self.out.push_back(GenomeNode::Feature(Arc::clone(node)));
        Ok(())
    }

    fn visit_region(&mut self, node: &annograph_core::RegionRef) -> Result<()> {
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

impl StreamVisitor for MergeFeatureVisitor {
    fn poll_node(&mut self) -> Option<GenomeNode> {
        self.out.pop_front()
    }
}

pub struct MergeFeatureStream<S: NodeStream> {
    inner: VisitorStream<S, MergeFeatureVisitor>,
}

impl<S: NodeStream> MergeFeatureStream<S> {
    pub fn new(in_stream: S) -> Self {
        Self {
            inner: VisitorStream::new(in_stream, MergeFeatureVisitor::default()),
        }
    }
}

impl<S: NodeStream> NodeStream for MergeFeatureStream<S> {
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
    use annograph_core::{InternPool, Range, Strand};
    use annograph_error::Location;

    fn feature(pool: &InternPool, ftype: &str, start: u64, end: u64) -> FeatureRef {
        FeatureNode::new(
            pool,
            "chr1",
            "test",
            ftype,
            Range::new(start, end),
            Strand::Forward,
            Location::new("t.gff3", 1),
        )
    }

    fn run(root: FeatureRef) -> Vec<GenomeNode> {
        let mut stage = MergeFeatureStream::new(QueueStream::new([GenomeNode::Feature(root)]));
        drain(&mut stage).unwrap()
    }

    #[test]
    fn abutting_leaves_merge_and_lose_scores() {
        let pool = InternPool::new();
        let gene = feature(&pool, "gene", 1, 40);
        let e1 = feature(&pool, "exon", 1, 20);
        e1.set_score(0.9);
        let e2 = feature(&pool, "exon", 21, 40);
        e2.set_score(0.7);
        gene.add_child(Arc::clone(&e1));
        gene.add_child(Arc::clone(&e2));
        let nodes = run(Arc::clone(&gene));
        assert_eq!(nodes.len(), 1);
        let kids = gene.children();
        assert_eq!(kids.len(), 1);
        assert_eq!(kids[0].range(), Range::new(1, 40));
        assert_eq!(kids[0].score(), None);
    }

    #[test]
    fn chain_of_three_collapses_into_one() {
        let pool = InternPool::new();
        let gene = feature(&pool, "gene", 1, 30);
        for (s, e) in [(1, 10), (11, 20), (21, 30)] {
            gene.add_child(feature(&pool, "exon", s, e));
        }
        run(Arc::clone(&gene));
        let kids = gene.children();
        assert_eq!(kids.len(), 1);
        assert_eq!(kids[0].range(), Range::new(1, 30));
    }

    #[test]
    fn gap_prevents_merging() {
        let pool = InternPool::new();
        let gene = feature(&pool, "gene", 1, 40);
        gene.add_child(feature(&pool, "exon", 1, 10));
        gene.add_child(feature(&pool, "exon", 12, 40));
        run(Arc::clone(&gene));
        assert_eq!(gene.number_of_children(), 2);
    }

    #[test]
    fn different_types_never_merge() {
        let pool = InternPool::new();
        let gene = feature(&pool, "gene", 1, 40);
        gene.add_child(feature(&pool, "exon", 1, 20));
        gene.add_child(feature(&pool, "CDS", 21, 40));
        run(Arc::clone(&gene));
        assert_eq!(gene.number_of_children(), 2);
    }

    #[test]
    fn children_with_children_are_left_alone() {
        let pool = InternPool::new();
        let gene = feature(&pool, "gene", 1, 40);
        let m1 = feature(&pool, "mRNA", 1, 20);
        m1.add_child(feature(&pool, "exon", 1, 20));
        let m2 = feature(&pool, "mRNA", 21, 40);
        gene.add_child(Arc::clone(&m1));
        gene.add_child(Arc::clone(&m2));
        run(Arc::clone(&gene));
        assert_eq!(gene.number_of_children(), 2);
    }

    #[test]
    fn merge_is_idempotent() {
        let pool = InternPool::new();
        let gene = feature(&pool, "gene", 1, 30);
        for (s, e) in [(1, 10), (11, 20), (21, 30)] {
            gene.add_child(feature(&pool, "exon", s, e));
        }
        run(Arc::clone(&gene));
        let after_first: Vec<Range> = gene.children().iter().map(|c| c.range()).collect();
        run(Arc::clone(&gene));
        let after_second: Vec<Range> = gene.children().iter().map(|c| c.range()).collect();
        assert_eq!(after_first, after_second);
    }
}
