//! Lines: horizontal slots blocks are placed into.

use crate::block::Block;

#[derive(Debug, Default)]
pub struct Line {
    blocks: Vec<Block>,
    has_captions: bool,
}

impl Line {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_block(&mut self, block: Block) {
        if !self.has_captions && block.caption().is_some() {
            self.has_captions = true;
        }
        self.blocks.push(block);
    }

    pub fn has_captions(&self) -> bool {
        self.has_captions
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use annograph_core::{FeatureNode, InternPool, Range, Strand};
    use annograph_error::Location;

    #[test]
    fn caption_flag_sticks() {
        let pool = InternPool::new();
        let node = FeatureNode::new(
            &pool,
            "chr1",
            "test",
            "gene",
            Range::new(1, 10),
            Strand::Forward,
            Location::new("t", 1),
        );
        let mut line = Line::new();
        line.insert_block(Block::from_node(&node));
        assert!(!line.has_captions());
        let mut with_caption = Block::from_node(&node);
        with_caption.set_caption(Some("gene1".to_owned()));
        line.insert_block(with_caption);
        assert!(line.has_captions());
        assert_eq!(line.len(), 2);
    }
}
