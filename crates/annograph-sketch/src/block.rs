//! Blocks: groups of feature nodes drawn together.

use std::sync::Arc;

use annograph_core::{FeatureRef, Range, Strand};

/// One drawable group. A block remembers the node it was created from (the
/// "top-level" feature, used by track selectors), the elements merged into
/// it, and an optional caption.
#[derive(Debug, Clone)]
pub struct Block {
    elements: Vec<FeatureRef>,
    range: Range,
    btype: String,
    strand: Strand,
    caption: Option<String>,
    top_level: FeatureRef,
}

impl Block {
    pub fn from_node(node: &FeatureRef) -> Self {
        Self {
            elements: Vec::new(),
            range: node.range(),
            btype: node.type_name(),
            strand: node.strand(),
            caption: None,
            top_level: Arc::clone(node),
        }
    }

    pub fn insert_element(&mut self, node: &FeatureRef) {
        self.range = self.range.join(&node.range());
        self.elements.push(Arc::clone(node));
    }

    /// Splice another block's elements into this one.
    pub fn merge(&mut self, other: &Block) {
        self.range = self.range.join(&other.range);
        self.elements.extend(other.elements.iter().cloned());
    }

    pub fn range(&self) -> Range {
        self.range
    }

    pub fn type_name(&self) -> &str {
        &self.btype
    }

    pub fn set_type(&mut self, btype: impl Into<String>) {
        self.btype = btype.into();
    }

    pub fn strand(&self) -> Strand {
        self.strand
    }

    pub fn caption(&self) -> Option<&str> {
        self.caption.as_deref()
    }

    pub fn set_caption(&mut self, caption: Option<String>) {
        self.caption = caption;
    }

    pub fn top_level_feature(&self) -> &FeatureRef {
        &self.top_level
    }

    pub fn elements(&self) -> &[FeatureRef] {
        &self.elements
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use annograph_core::{FeatureNode, InternPool};
    use annograph_error::Location;

    fn feature(pool: &InternPool, start: u64, end: u64) -> FeatureRef {
        FeatureNode::new(
            pool,
            "chr1",
            "test",
            "exon",
            Range::new(start, end),
            Strand::Forward,
            Location::new("t.gff3", 1),
        )
    }

    #[test]
    fn inserting_elements_widens_the_range() {
        let pool = InternPool::new();
        let base = feature(&pool, 100, 200);
        let mut block = Block::from_node(&base);
        block.insert_element(&base);
        block.insert_element(&feature(&pool, 500, 600));
        assert_eq!(block.range(), Range::new(100, 600));
        assert_eq!(block.elements().len(), 2);
    }

    #[test]
    fn merge_splices_elements() {
        let pool = InternPool::new();
        let a = feature(&pool, 1, 10);
        let b = feature(&pool, 50, 80);
        let mut block_a = Block::from_node(&a);
        block_a.insert_element(&a);
        let mut block_b = Block::from_node(&b);
        block_b.insert_element(&b);
        block_a.merge(&block_b);
        assert_eq!(block_a.range(), Range::new(1, 80));
        assert_eq!(block_a.elements().len(), 2);
    }
}
