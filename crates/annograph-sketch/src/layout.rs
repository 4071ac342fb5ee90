//! Layout: assigns each track's blocks to lines.

use std::collections::BTreeMap;
use std::sync::Arc;

use annograph_core::Range;
use annograph_error::{Error, Result};
use serde::Serialize;

use crate::block::Block;
use crate::diagram::Diagram;
use crate::formats;
use crate::line_breaker::{BasesLineBreaker, CaptionsLineBreaker, LineBreaker};
use crate::style::Style;
use crate::text_width::{MonospaceTextWidth, TextWidthCalculator};
use crate::track::Track;

/// Which occupancy policy tracks use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BreakerChoice {
    /// Caption-aware drawing-domain comparison (the default).
    #[default]
    Captions,
    /// Plain base-range overlap.
    Bases,
}

/// Ordering applied to each track's blocks before placement.
pub type BlockComparator = Box<dyn Fn(&Block, &Block) -> std::cmp::Ordering + Send + Sync>;

fn default_block_order(a: &Block, b: &Block) -> std::cmp::Ordering {
    let (ra, rb) = (a.range(), b.range());
    ra.start.cmp(&rb.start).then(ra.end.cmp(&rb.end))
}

pub struct Layout {
    tracks: BTreeMap<String, Track>,
    width: u32,
    range: Range,
}

impl Layout {
    pub fn new(diagram: &Diagram, width: u32, style: &dyn Style) -> Result<Layout> {
        Self::with_options(
            diagram,
            width,
            style,
            BreakerChoice::default(),
            None,
            Arc::new(MonospaceTextWidth::default()),
        )
    }

    pub fn with_options(
        diagram: &Diagram,
        width: u32,
        style: &dyn Style,
        breaker_choice: BreakerChoice,
        block_comparator: Option<BlockComparator>,
        twc: Arc<dyn TextWidthCalculator>,
    ) -> Result<Layout> {
        let margins = style
            .get_num("format", "margins", None)
            .or_default(formats::MARGINS_DEFAULT)?;
        if (width as f64) < 2.0 * margins {
            return Err(Error::config(format!(
                "layout width must at least be twice the x-margin size (2*{:.1}={:.1}) but \
                 was {}",
                margins,
                2.0 * margins,
                width
            )));
        }
        let view = diagram.range();

        let mut tracks = BTreeMap::new();
        for (track_id, mut blocks) in diagram.blocks()? {
            // deterministic layout: stable sort per track
            match &block_comparator {
                Some(cmp) => blocks.sort_by(|a, b| cmp(a, b)),
                None => blocks.sort_by(default_block_order),
            }
            let first_type = blocks
                .first()
                .map(|b| b.type_name().to_owned())
                .unwrap_or_default();

            let mut split = style
                .get_bool("format", "split_lines", None)
                .or_default(true)?;
            let mut max_num_lines = style
                .get_num("format", "max_num_lines", None)
                .or_default(formats::MAX_NUM_LINES_DEFAULT as f64)?;
            // track-specific overrides, keyed by the track's block type
            if let Some(track_split) = style
                .get_bool(&first_type, "split_lines", None)
                .optional()?
            {
                split = track_split;
            }
            if let Some(track_max) = style
                .get_num(&first_type, "max_num_lines", None)
                .optional()?
            {
                max_num_lines = track_max;
            }

            let breaker: Box<dyn LineBreaker> = match breaker_choice {
                BreakerChoice::Bases => Box::new(BasesLineBreaker::new()),
                BreakerChoice::Captions => Box::new(CaptionsLineBreaker::new(
                    view,
                    width as f64,
                    margins,
                    Arc::clone(&twc),
                )),
            };
            let mut track = Track::new(&track_id, max_num_lines as u64, split, breaker);
            for block in blocks {
                track.insert_block(block)?;
            }
            tracks.insert(track_id, track);
        }
        Ok(Layout {
            tracks,
            width,
            range: view,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn range(&self) -> Range {
        self.range
    }

    pub fn tracks(&self) -> &BTreeMap<String, Track> {
        &self.tracks
    }

    pub fn number_of_tracks(&self) -> usize {
        self.tracks.len()
    }

    /// Total pixel height: header, ruler, per-track lines with spacing,
    /// optional per-track caption lines, footer.
    pub fn height(&self, style: &dyn Style) -> Result<f64> {
        let mut height = formats::HEADER_SPACE + formats::RULER_SPACE;
        let show_track_captions = style
            .get_bool("format", "show_track_captions", None)
            .or_default(true)?;
        let track_vspace = style
            .get_num("format", "track_vspace", None)
            .or_default(formats::TRACK_VSPACE_DEFAULT)?;
        for track in self.tracks.values() {
            height += track.height(style)?;
            if show_track_captions {
                height += formats::CAPTION_BAR_SPACE_DEFAULT;
            }
            height += track_vspace;
        }
        Ok(height + formats::FOOTER_SPACE)
    }

    /// Per-track summary, including discarded blocks so callers can raise
    /// the line limit.
    pub fn report(&self, style: &dyn Style) -> Result<LayoutReport> {
        let mut tracks = Vec::new();
        for (id, track) in &self.tracks {
            tracks.push(TrackReport {
                track: id.clone(),
                lines: track.number_of_lines(),
                blocks: track.number_of_blocks(),
                discarded_blocks: track.number_of_discarded_blocks(),
            });
        }
        Ok(LayoutReport {
            width: self.width,
            height: self.height(style)?,
            tracks,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TrackReport {
    pub track: String,
    pub lines: usize,
    pub blocks: usize,
    pub discarded_blocks: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LayoutReport {
    pub width: u32,
    pub height: f64,
    pub tracks: Vec<TrackReport>,
}
