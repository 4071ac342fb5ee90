//! Line occupancy policies.

use std::collections::HashMap;
use std::sync::Arc;

use annograph_core::{IntervalTree, Range};
use annograph_error::Result;

use crate::block::Block;
use crate::text_width::TextWidthCalculator;

/// Decides whether a block fits on an existing line and records placed
/// blocks.
pub trait LineBreaker {
    fn is_occupied(&mut self, line: usize, block: &Block) -> Result<bool>;
    fn register_block(&mut self, line: usize, block: &Block);
}

/// Coordinate-overlap policy: a line is occupied when any registered block
/// overlaps the candidate's base range. One interval tree per line.
#[derive(Default)]
pub struct BasesLineBreaker {
    trees: HashMap<usize, IntervalTree<()>>,
}

impl BasesLineBreaker {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LineBreaker for BasesLineBreaker {
    fn is_occupied(&mut self, line: usize, block: &Block) -> Result<bool> {
        let range = block.range();
        Ok(match self.trees.get(&line) {
            None => false,
            Some(tree) => tree
                .find_first_overlapping(range.start, range.end)
                .is_some(),
        })
    }

    fn register_block(&mut self, line: usize, block: &Block) {
        let range = block.range();
        self.trees
            .entry(line)
            .or_default()
            .insert(range.start, range.end, ());
    }
}

/// Caption-aware policy: block extents (and their caption text widths) are
/// mapped into the drawing domain `[0, width - 2*margins]`; a line only
/// needs its rightmost occupied endpoint (a monotone high-water mark).
pub struct CaptionsLineBreaker {
    view: Range,
    width: f64,
    margins: f64,
    twc: Arc<dyn TextWidthCalculator>,
    positions: HashMap<usize, f64>,
}

impl CaptionsLineBreaker {
    pub fn new(view: Range, width: f64, margins: f64, twc: Arc<dyn TextWidthCalculator>) -> Self {
        Self {
            view,
            width,
            margins,
            twc,
            positions: HashMap::new(),
        }
    }

    /// Block extent in the drawing domain, stretched to cover the caption
    /// when the text is wider than the bases.
    fn drawing_range(&self, block: &Block) -> (f64, f64) {
        let view_length = self.view.length() as f64;
        let usable = self.width - 2.0 * self.margins;
        let range = block.range();
        let rel_start = (range.start.saturating_sub(self.view.start)) as f64 / view_length;
        let rel_end = (range.end.saturating_sub(self.view.start) + 1) as f64 / view_length;
        let mut start = rel_start * usable;
        let mut end = rel_end * usable;
        if let Some(caption) = block.caption() {
            let text_width = self.twc.width(caption);
            if text_width > end - start {
                end = start + text_width;
            }
        }
        if start > end {
            std::mem::swap(&mut start, &mut end);
        }
        (start, end)
    }
}

impl LineBreaker for CaptionsLineBreaker {
    fn is_occupied(&mut self, line: usize, block: &Block) -> Result<bool> {
        let (start, _) = self.drawing_range(block);
        Ok(match self.positions.get(&line) {
            None => false,
            Some(watermark) => start <= *watermark,
        })
    }

    fn register_block(&mut self, line: usize, block: &Block) {
        let (_, end) = self.drawing_range(block);
        self.positions.insert(line, end.floor());
    }
}
