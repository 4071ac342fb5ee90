//! Drops nodes failing a conjunctive predicate.

use annograph_core::{FeatureNode, FeatureRef, GenomeNode, Range, Strand};
use annograph_error::Result;
use annograph_gff3::TargetAttribute;

use crate::stream::NodeStream;

/// How user-supplied filter functions combine with each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterLogic {
    #[default]
    And,
    Or,
}

type FilterFn = Box<dyn Fn(&GenomeNode) -> bool + Send>;

/// Conjunction of per-field conditions. Empty predicate keeps everything;
/// `contained_range` and `overlap_range` are mutually exclusive.
#[derive(Default)]
pub struct SelectPredicate {
    pub seqid: Option<String>,
    pub source: Option<String>,
    pub contained_range: Option<Range>,
    pub overlap_range: Option<Range>,
    pub strand: Option<Strand>,
    pub target_strand: Option<Strand>,
    pub has_cds: bool,
    pub max_gene_length: Option<u64>,
    pub min_gene_score: Option<f32>,
    pub max_gene_score: Option<f32>,
    pub min_average_splice_prob: Option<f32>,
    /// Keep at most this many feature nodes (counted over kept features).
    pub max_features: Option<u64>,
    filters: Vec<FilterFn>,
    filter_logic: FilterLogic,
}

impl SelectPredicate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_filter(&mut self, filter: FilterFn) {
        self.filters.push(filter);
    }

    pub fn set_filter_logic(&mut self, logic: FilterLogic) {
        self.filter_logic = logic;
    }

    fn feature_matches(&self, node: &FeatureRef) -> bool {
        debug_assert!(
            self.contained_range.is_none() || self.overlap_range.is_none(),
            "contain and overlap are mutually exclusive"
        );
        if let Some(seqid) = &self.seqid {
            if node.seqid() != *seqid {
                return false;
            }
        }
        if let Some(source) = &self.source {
            if node.source() != *source {
                return false;
            }
        }
        if let Some(range) = &self.contained_range {
            if !range.contains(&node.range()) {
                return false;
            }
        }
        if let Some(range) = &self.overlap_range {
            if !range.overlaps(&node.range()) {
                return false;
            }
        }
        if let Some(strand) = self.strand {
            if node.strand() != strand {
                return false;
            }
        }
        if let Some(wanted) = self.target_strand {
            match first_target_strand(node) {
                Some(strand) if strand == wanted => {}
                _ => return false,
            }
        }
        if self.has_cds && !subtree_has_type(node, "CDS") {
            return false;
        }
        if node.type_name() == "gene" {
            if let Some(max_length) = self.max_gene_length {
                if node.range().length() > max_length {
                    return false;
                }
            }
            if let Some(min_score) = self.min_gene_score {
                if node.score().is_none_or(|s| s < min_score) {
                    return false;
                }
            }
            if let Some(max_score) = self.max_gene_score {
                if node.score().is_none_or(|s| s > max_score) {
                    return false;
                }
            }
            if let Some(min_prob) = self.min_average_splice_prob {
                if let Some(prob) = average_splice_site_prob(node) {
                    if prob < min_prob {
                        return false;
                    }
                }
            }
        }
        true
    }

    /// Whether the node survives. Non-feature nodes always pass the field
    /// conditions but still face the user filters.
    pub fn matches(&self, node: &GenomeNode) -> bool {
        if let Some(feature) = node.as_feature() {
            if !self.feature_matches(feature) {
                return false;
            }
        }
        if self.filters.is_empty() {
            return true;
        }
        match self.filter_logic {
            FilterLogic::And => self.filters.iter().all(|f| f(node)),
            FilterLogic::Or => self.filters.iter().any(|f| f(node)),
        }
    }
}

fn first_target_strand(node: &FeatureRef) -> Option<Strand> {
    let value = node.attribute("Target")?;
    let (targets, _) = TargetAttribute::parse_list(&value, false).ok()?;
    targets.first()?.strand
}

fn subtree_has_type(node: &FeatureRef, ftype: &str) -> bool {
    let mut found = false;
    let _ = FeatureNode::traverse(node, true, &mut |n| {
        if n.type_name() == ftype {
            found = true;
        }
        Ok(())
    });
    found
}

/// Mean score over descendant splice-site features; `None` when the
/// subtree carries none.
fn average_splice_site_prob(node: &FeatureRef) -> Option<f32> {
    let mut sum = 0.0f32;
    let mut count = 0u32;
    let _ = FeatureNode::traverse(node, true, &mut |n| {
        if n.type_name().contains("splice_site") {
            if let Some(score) = n.score() {
                sum += score;
                count += 1;
            }
        }
        Ok(())
    });
    (count > 0).then(|| sum / count as f32)
}

type DroppedHandler = Box<dyn FnMut(GenomeNode) + Send>;

/// The select stage: forwards surviving nodes, hands rejected ones to an
/// optional dropped-node handler.
pub struct SelectStream<S: NodeStream> {
    in_stream: S,
    predicate: SelectPredicate,
    dropped_handler: Option<DroppedHandler>,
    kept_features: u64,
}

impl<S: NodeStream> SelectStream<S> {
    pub fn new(in_stream: S, predicate: SelectPredicate) -> Self {
        Self {
            in_stream,
            predicate,
            dropped_handler: None,
            kept_features: 0,
        }
    }

    /// Divert rejected nodes to a secondary sink.
    pub fn set_dropped_handler(&mut self, handler: DroppedHandler) {
        self.dropped_handler = Some(handler);
    }
}

impl<S: NodeStream> NodeStream for SelectStream<S> {
    fn next_node(&mut self) -> Result<Option<GenomeNode>> {
        while let Some(node) = self.in_stream.next_node()? {
            let over_budget = node.is_feature()
                && self
                    .predicate
                    .max_features
                    .is_some_and(|max| self.kept_features >= max);
            if !over_budget && self.predicate.matches(&node) {
                if node.is_feature() {
                    self.kept_features += 1;
                }
                return Ok(Some(node));
            }
            if let Some(handler) = &mut self.dropped_handler {
                handler(node);
            }
        }
        Ok(None)
    }

    fn is_sorted(&self) -> bool {
        self.in_stream.is_sorted()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::{drain, QueueStream};
    use annograph_core::InternPool;
    use annograph_error::Location;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn feature(pool: &InternPool, seqid: &str, ftype: &str, start: u64, end: u64) -> FeatureRef {
        FeatureNode::new(
            pool,
            seqid,
            "test",
            ftype,
            Range::new(start, end),
            Strand::Forward,
            Location::new("t.gff3", 1),
        )
    }

    #[test]
    fn seqid_and_overlap_conditions() {
        let pool = InternPool::new();
        let keep = feature(&pool, "chr1", "gene", 100, 200);
        let wrong_seqid = feature(&pool, "chr2", "gene", 100, 200);
        let outside = feature(&pool, "chr1", "gene", 900, 950);
        let mut predicate = SelectPredicate::new();
        predicate.seqid = Some("chr1".to_owned());
        predicate.overlap_range = Some(Range::new(150, 300));
        let mut stage = SelectStream::new(
            QueueStream::new([
                GenomeNode::Feature(keep),
                GenomeNode::Feature(wrong_seqid),
                GenomeNode::Feature(outside),
            ]),
            predicate,
        );
        let nodes = drain(&mut stage).unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].range(), Range::new(100, 200));
    }

    #[test]
    fn contained_is_stricter_than_overlap() {
        let pool = InternPool::new();
        let partially = feature(&pool, "chr1", "gene", 100, 400);
        let inside = feature(&pool, "chr1", "gene", 150, 200);
        let mut predicate = SelectPredicate::new();
        predicate.contained_range = Some(Range::new(120, 300));
        let mut stage = SelectStream::new(
            QueueStream::new([GenomeNode::Feature(partially), GenomeNode::Feature(inside)]),
            predicate,
        );
        let nodes = drain(&mut stage).unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].range(), Range::new(150, 200));
    }

    #[test]
    fn has_cds_looks_into_the_subtree() {
        let pool = InternPool::new();
        let with_cds = feature(&pool, "chr1", "gene", 1, 100);
        with_cds.add_child(feature(&pool, "chr1", "CDS", 1, 50));
        let without = feature(&pool, "chr1", "gene", 1, 100);
        let mut predicate = SelectPredicate::new();
        predicate.has_cds = true;
        let mut stage = SelectStream::new(
            QueueStream::new([
                GenomeNode::Feature(Arc::clone(&with_cds)),
                GenomeNode::Feature(without),
            ]),
            predicate,
        );
        let nodes = drain(&mut stage).unwrap();
        assert_eq!(nodes.len(), 1);
        assert!(Arc::ptr_eq(nodes[0].expect_feature(), &with_cds));
    }

    #[test]
    fn dropped_handler_sees_rejected_nodes() {
        static DROPPED: AtomicUsize = AtomicUsize::new(0);
        let pool = InternPool::new();
        let mut predicate = SelectPredicate::new();
        predicate.seqid = Some("chrX".to_owned());
        let mut stage = SelectStream::new(
            QueueStream::new([GenomeNode::Feature(feature(&pool, "chr1", "gene", 1, 10))]),
            predicate,
        );
        stage.set_dropped_handler(Box::new(|_| {
            DROPPED.fetch_add(1, Ordering::SeqCst);
        }));
        let nodes = drain(&mut stage).unwrap();
        assert!(nodes.is_empty());
        assert_eq!(DROPPED.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn gene_bounds_only_apply_to_genes() {
        let pool = InternPool::new();
        let long_gene = feature(&pool, "chr1", "gene", 1, 10_000);
        let long_match = feature(&pool, "chr1", "match", 1, 10_000);
        let mut predicate = SelectPredicate::new();
        predicate.max_gene_length = Some(1000);
        let mut stage = SelectStream::new(
            QueueStream::new([
                GenomeNode::Feature(long_gene),
                GenomeNode::Feature(Arc::clone(&long_match)),
            ]),
            predicate,
        );
        let nodes = drain(&mut stage).unwrap();
        assert_eq!(nodes.len(), 1);
        assert!(Arc::ptr_eq(nodes[0].expect_feature(), &long_match));
    }

    #[test]
    fn composing_selects_equals_conjunction() {
        let pool = InternPool::new();
        let make_nodes = || {
            vec![
                GenomeNode::Feature(feature(&pool, "chr1", "gene", 100, 200)),
                GenomeNode::Feature(feature(&pool, "chr1", "gene", 900, 950)),
                GenomeNode::Feature(feature(&pool, "chr2", "gene", 100, 200)),
            ]
        };
        // P then Q
        let mut p = SelectPredicate::new();
        p.seqid = Some("chr1".to_owned());
        let mut q = SelectPredicate::new();
        q.overlap_range = Some(Range::new(1, 500));
        let first = SelectStream::new(QueueStream::new(make_nodes()), p);
        let mut chained = SelectStream::new(first, q);
        let chained_out = drain(&mut chained).unwrap();
        // P ∧ Q at once
        let mut pq = SelectPredicate::new();
        pq.seqid = Some("chr1".to_owned());
        pq.overlap_range = Some(Range::new(1, 500));
        let mut combined = SelectStream::new(QueueStream::new(make_nodes()), pq);
        let combined_out = drain(&mut combined).unwrap();
        let ranges = |nodes: &[GenomeNode]| -> Vec<Range> {
            nodes.iter().map(|n| n.range()).collect()
        };
        assert_eq!(ranges(&chained_out), ranges(&combined_out));
    }

    #[test]
    fn max_features_caps_kept_nodes() {
        let pool = InternPool::new();
        let mut predicate = SelectPredicate::new();
        predicate.max_features = Some(1);
        let mut stage = SelectStream::new(
            QueueStream::new([
                GenomeNode::Feature(feature(&pool, "chr1", "gene", 1, 10)),
                GenomeNode::Feature(feature(&pool, "chr1", "gene", 20, 30)),
            ]),
            predicate,
        );
        let nodes = drain(&mut stage).unwrap();
        assert_eq!(nodes.len(), 1);
    }

    #[test]
    fn user_filters_combine_with_or() {
        let pool = InternPool::new();
        let mut predicate = SelectPredicate::new();
        predicate.set_filter_logic(FilterLogic::Or);
        predicate.add_filter(Box::new(|n| n.range().start == 1));
        predicate.add_filter(Box::new(|n| n.range().end == 30));
        let mut stage = SelectStream::new(
            QueueStream::new([
                GenomeNode::Feature(feature(&pool, "chr1", "gene", 1, 10)),
                GenomeNode::Feature(feature(&pool, "chr1", "gene", 20, 30)),
                GenomeNode::Feature(feature(&pool, "chr1", "gene", 50, 60)),
            ]),
            predicate,
        );
        let nodes = drain(&mut stage).unwrap();
        assert_eq!(nodes.len(), 2);
    }
}
