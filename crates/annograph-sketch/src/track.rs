//! Tracks: named lanes collecting lines of blocks.

use annograph_error::Result;

use crate::block::Block;
use crate::formats;
use crate::line::Line;
use crate::line_breaker::LineBreaker;
use crate::style::Style;

pub struct Track {
    title: String,
    lines: Vec<Line>,
    max_num_lines: u64,
    split_lines: bool,
    breaker: Box<dyn LineBreaker>,
    discarded_blocks: u64,
}

impl Track {
    pub fn new(
        title: impl Into<String>,
        max_num_lines: u64,
        split_lines: bool,
        breaker: Box<dyn LineBreaker>,
    ) -> Self {
        Self {
            title: title.into(),
            lines: Vec::new(),
            max_num_lines,
            split_lines,
            breaker,
            discarded_blocks: 0,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Place a block on the first unoccupied line; open a new line while
    /// under the limit, count it as discarded otherwise.
    pub fn insert_block(&mut self, block: Block) -> Result<()> {
        if !self.split_lines {
            if self.lines.is_empty() {
                self.lines.push(Line::new());
            }
            self.breaker.register_block(0, &block);
            self.lines[0].insert_block(block);
            return Ok(());
        }
        for index in 0..self.lines.len() {
            if !self.breaker.is_occupied(index, &block)? {
                self.breaker.register_block(index, &block);
                self.lines[index].insert_block(block);
                return Ok(());
            }
        }
        if (self.lines.len() as u64) < self.max_num_lines {
            let index = self.lines.len();
            self.lines.push(Line::new());
            self.breaker.register_block(index, &block);
            self.lines[index].insert_block(block);
        } else {
            self.discarded_blocks += 1;
        }
        Ok(())
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn number_of_lines(&self) -> usize {
        self.lines.len()
    }

    pub fn number_of_blocks(&self) -> usize {
        self.lines.iter().map(Line::len).sum()
    }

    pub fn number_of_discarded_blocks(&self) -> u64 {
        self.discarded_blocks
    }

    /// Sum of line heights: the per-type bar height plus spacing, with
    /// extra room for lines that carry captions.
    pub fn height(&self, style: &dyn Style) -> Result<f64> {
        let mut height = 0.0;
        for line in &self.lines {
            let mut bar_height = style
                .get_num("format", "bar_height", None)
                .or_default(formats::BAR_HEIGHT_DEFAULT)?;
            for block in line.blocks() {
                let block_height = style
                    .get_num(block.type_name(), "bar_height", None)
                    .optional()?;
                if let Some(block_height) = block_height {
                    bar_height = bar_height.max(block_height);
                }
            }
            height += bar_height
                + style
                    .get_num("format", "bar_vspace", None)
                    .or_default(formats::BAR_VSPACE_DEFAULT)?;
            if line.has_captions() {
                height += formats::CAPTION_BAR_SPACE_DEFAULT;
            }
        }
        Ok(height)
    }
}
