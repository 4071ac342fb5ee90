//! Re-elects multi-feature representatives after tree rewrites.
//!
//! The first member encountered in traversal order becomes the
//! representative of its class, which repairs classes whose previous
//! representative was pruned by an earlier stage.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use annograph_core::node::{CommentNode, EofNode, MetaNode, SequenceNode};
use annograph_core::{FeatureNode, FeatureRef, GenomeNode, NodeKey, NodeVisitor};
use annograph_error::Result;

use crate::stream::NodeStream;
use crate::visitor_stream::{StreamVisitor, VisitorStream};

#[derive(Default)]
pub struct MultiSanitizerVisitor {
    out: VecDeque<GenomeNode>,
}

impl NodeVisitor for MultiSanitizerVisitor {
    fn visit_feature(&mut self, node: &FeatureRef) -> Result<()> {
        let mut first_elems: HashMap<NodeKey, FeatureRef> = HashMap::new();
        FeatureNode::traverse(node, true, &mut |n| {
            if n.is_multi() {
                let old_rep = FeatureNode::multi_representative(n).expect("member has rep");
                let class = FeatureNode::key(&old_rep);
                match first_elems.get(&class) {
                    None => {
                        first_elems.insert(class, Arc::clone(n));
                        n.unset_multi();
                        FeatureNode::make_multi_representative(n);
                    }
                    Some(rep) => {
                        n.unset_multi();
                        FeatureNode::set_multi_representative(n, rep);
                    }
                }
            }
            Ok(())
        })?;
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

impl StreamVisitor for MultiSanitizerVisitor {
    fn poll_node(&mut self) -> Option<GenomeNode> {
        self.out.pop_front()
    }
}

pub struct MultiSanitizerStream<S: NodeStream> {
    inner: VisitorStream<S, MultiSanitizerVisitor>,
}

impl<S: NodeStream> MultiSanitizerStream<S> {
    pub fn new(in_stream: S) -> Self {
        Self {
            inner: VisitorStream::new(in_stream, MultiSanitizerVisitor::default()),
        }
    }
}

impl<S: NodeStream> NodeStream for MultiSanitizerStream<S> {
    fn next_node(&mut self) -> Result<Option<GenomeNode>> {
        self.inner.next_node()
    }

    fn is_sorted(&self) -> bool {
        self.inner.is_sorted()
    }
}
