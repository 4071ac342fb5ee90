//! Synthesizes `##sequence-region` nodes for seqids that lack one.
//!
//! Features on an undeclared seqid are buffered until the seqid is known to
//! be complete (another seqid starts, or the stream ends); then the
//! synthesized region is emitted immediately before them. `Is_circular`
//! features pin the region to their own stated range instead of widening.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use annograph_core::node::{CommentNode, EofNode, MetaNode, SequenceNode};
use annograph_core::{
    FeatureNode, FeatureRef, GenomeNode, NodeVisitor, Range, RegionNode, RegionRef,
};
use annograph_error::{Error, Result, Warning};

use crate::stream::NodeStream;
use crate::visitor_stream::{StreamVisitor, VisitorStream};

const GFF_SEQUENCE_REGION: &str = "##sequence-region";
const GFF_IS_CIRCULAR: &str = "Is_circular";

struct AutoRegion {
    range: Range,
    is_circular: bool,
    features: Vec<GenomeNode>,
}

pub struct AddIdsVisitor {
    out: VecDeque<GenomeNode>,
    defined_seqids: HashSet<String>,
    auto_regions: HashMap<String, AutoRegion>,
    auto_order: Vec<String>,
    ensure_sorting: bool,
    pending_eof: Option<EofNode>,
}

impl AddIdsVisitor {
    fn new(ensure_sorting: bool) -> Self {
        Self {
            out: VecDeque::new(),
            defined_seqids: HashSet::new(),
            auto_regions: HashMap::new(),
            auto_order: Vec::new(),
            ensure_sorting,
            pending_eof: None,
        }
    }

    /// Union of the ranges in a feature's whole subtree.
    fn subtree_range(node: &FeatureRef) -> Range {
        let mut range = node.range();
        let _ = FeatureNode::traverse(node, true, &mut |n| {
            range = range.join(&n.range());
            Ok(())
        });
        range
    }

    fn flush_auto_regions(&mut self) {
        for seqid in std::mem::take(&mut self.auto_order) {
            let auto = self
                .auto_regions
                .remove(&seqid)
                .expect("order and map agree");
            let Some(first_feature) = auto.features.iter().find_map(|n| n.as_feature()) else {
                continue;
            };
            let region: RegionRef = RegionNode::new(
                first_feature.pool(),
                &seqid,
                auto.range,
                first_feature.origin().clone(),
            );
            self.out.push_back(GenomeNode::Region(region));
            for feature in auto.features {
                self.out.push_back(feature);
            }
            self.defined_seqids.insert(seqid);
        }
    }
}

impl NodeVisitor for AddIdsVisitor {
    fn visit_feature(&mut self, node: &FeatureRef) -> Result<()> {
        let seqid = node.seqid();
        if self.defined_seqids.contains(&seqid) {
            self.out.push_back(GenomeNode::Feature(Arc::clone(node)));
            return Ok(());
        }
        if self.ensure_sorting {
            return Err(Error::parse(format!(
                "the file is not sorted (seqid \"{}\" has not been previously introduced \
                 with a \"{}\" line)",
                seqid, GFF_SEQUENCE_REGION
            ))
            .at(node.origin().clone()));
        }
        // a new undeclared seqid closes the previous one
        if !self.auto_order.last().is_some_and(|s| *s == seqid) && !self.auto_order.is_empty() {
            self.flush_auto_regions();
            if self.defined_seqids.contains(&seqid) {
                self.out.push_back(GenomeNode::Feature(Arc::clone(node)));
                return Ok(());
            }
        }
        let is_circular = node.has_attribute(GFF_IS_CIRCULAR);
        let range = if is_circular {
            node.range()
        } else {
            Self::subtree_range(node)
        };
        match self.auto_regions.get_mut(&seqid) {
            None => {
                tracing::warn!(
                    "{}",
                    Warning::new(format!(
                        "seqid \"{}\" has not been previously introduced with a \"{}\" line, \
                         create such a line automatically",
                        seqid, GFF_SEQUENCE_REGION
                    ))
                    .at(node.origin().clone())
                );
                self.auto_order.push(seqid.clone());
                self.auto_regions.insert(
                    seqid,
                    AutoRegion {
                        range,
                        is_circular,
                        features: vec![GenomeNode::Feature(Arc::clone(node))],
                    },
                );
            }
            Some(auto) => {
                if is_circular && !auto.is_circular {
                    // circularity wins over earlier widening
                    auto.is_circular = true;
                    auto.range = range;
                } else if !auto.is_circular {
                    auto.range = auto.range.join(&range);
                }
                auto.features.push(GenomeNode::Feature(Arc::clone(node)));
            }
        }
        Ok(())
    }

    fn visit_region(&mut self, node: &RegionRef) -> Result<()> {
        let seqid = node.seqid();
        if self.auto_regions.contains_key(&seqid) {
            return Err(Error::parse(format!(
                "genome feature with seqid \"{}\" has been defined before the corresponding \
                 \"{}\" definition",
                seqid, GFF_SEQUENCE_REGION
            ))
            .at(node.origin().clone()));
        }
        self.defined_seqids.insert(seqid);
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
        // held back so flushed regions precede it
        self.pending_eof = Some(node.clone());
        Ok(())
    }
}

impl StreamVisitor for AddIdsVisitor {
    fn poll_node(&mut self) -> Option<GenomeNode> {
        self.out.pop_front()
    }

    fn finish(&mut self) -> Result<()> {
        self.flush_auto_regions();
        if let Some(eof) = self.pending_eof.take() {
            self.out.push_back(GenomeNode::Eof(eof));
        }
        Ok(())
    }
}

/// The add-ids stage; see [`AddIdsVisitor`].
pub struct AddIdsStream<S: NodeStream> {
    inner: VisitorStream<S, AddIdsVisitor>,
}

impl<S: NodeStream> AddIdsStream<S> {
    pub fn new(in_stream: S) -> Self {
        Self {
            inner: VisitorStream::new(in_stream, AddIdsVisitor::new(false)),
        }
    }

    /// Require declared regions before their features (sorted input mode).
    pub fn new_sorted(in_stream: S) -> Self {
        Self {
            inner: VisitorStream::new(in_stream, AddIdsVisitor::new(true)),
        }
    }
}

impl<S: NodeStream> NodeStream for AddIdsStream<S> {
    fn next_node(&mut self) -> Result<Option<GenomeNode>> {
        self.inner.next_node()
    }

    fn is_sorted(&self) -> bool {
        self.inner.is_sorted()
    }
}
