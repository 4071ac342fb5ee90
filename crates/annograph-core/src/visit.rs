//! Visitor seam over the genome-node variants.
//!
//! `GenomeNode::accept` performs the double dispatch; implementors override
//! the variants they care about and inherit no-ops for the rest. Visitors
//! serve both as stages' internal workers and as terminal consumers.

use std::sync::Arc;

use annograph_error::Result;

use crate::node::{CommentNode, EofNode, FeatureRef, MetaNode, RegionRef, SequenceNode};

pub trait NodeVisitor {
    fn visit_feature(&mut self, _node: &FeatureRef) -> Result<()> {
        Ok(())
    }

    fn visit_region(&mut self, _node: &RegionRef) -> Result<()> {
        Ok(())
    }

    fn visit_sequence(&mut self, _node: &Arc<SequenceNode>) -> Result<()> {
        Ok(())
    }

    fn visit_comment(&mut self, _node: &Arc<CommentNode>) -> Result<()> {
        Ok(())
    }

    fn visit_meta(&mut self, _node: &Arc<MetaNode>) -> Result<()> {
        Ok(())
    }

    fn visit_eof(&mut self, _node: &EofNode) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{FeatureNode, GenomeNode, Strand};
    use crate::{InternPool, Range};
    use annograph_error::Location;

    #[derive(Default)]
    struct Counter {
        features: usize,
        comments: usize,
    }

    impl NodeVisitor for Counter {
        fn visit_feature(&mut self, _node: &FeatureRef) -> Result<()> {
            self.features += 1;
            Ok(())
        }

        fn visit_comment(&mut self, _node: &Arc<CommentNode>) -> Result<()> {
            self.comments += 1;
            Ok(())
        }
    }

    #[test]
    fn accept_dispatches_on_variant() {
        let pool = InternPool::new();
        let feature = FeatureNode::new(
            &pool,
            "chr1",
            "test",
            "gene",
            Range::new(1, 10),
            Strand::Forward,
            Location::new("t.gff3", 3),
        );
        let comment = CommentNode::new("hello", Location::new("t.gff3", 1));

        let mut counter = Counter::default();
        GenomeNode::Feature(feature)
            .accept(&mut counter)
            .unwrap();
        GenomeNode::Comment(Arc::new(comment))
            .accept(&mut counter)
            .unwrap();
        assert_eq!(counter.features, 1);
        assert_eq!(counter.comments, 1);
    }
}
