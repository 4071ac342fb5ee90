//! The `sketch` subcommand: compute a layout and report its tracks.

use std::io::Write;
use std::sync::Arc;

use annograph_core::{FeatureIndex, Range};
use annograph_error::{Error, Result};
use annograph_gff3::parser::Gff3Parser;
use annograph_sketch::{
    BreakerChoice, Diagram, Layout, LayoutReport, MonospaceTextWidth, Style, TomlStyle,
};
use annograph_stream::NodeStream;

use crate::gff3::{input_stream, parse_mode};
use crate::options::SketchOptions;

/// Fill a feature index from the input files.
fn build_index(opts: &SketchOptions) -> Result<FeatureIndex> {
    let mut parser = Gff3Parser::new();
    parser.set_mode(parse_mode(&opts.input));
    let mut stream = input_stream(&opts.input, parser)?;
    let index = FeatureIndex::new();
    while let Some(node) = stream.next_node()? {
        match &node {
            annograph_core::GenomeNode::Feature(feature) => {
                if !feature.is_pseudo() {
                    index.add_feature_node(feature);
                }
            }
            annograph_core::GenomeNode::Region(region) => index.add_region_node(region),
            _ => {}
        }
    }
    Ok(index)
}

fn load_style(opts: &SketchOptions) -> Result<Arc<dyn Style>> {
    match &opts.style {
        Some(path) => {
            let text = std::fs::read_to_string(path).map_err(|e| {
                Error::io(format!("cannot read style file \"{}\"", path.display()))
                    .set_source(e)
            })?;
            Ok(Arc::new(TomlStyle::from_str(&text)?))
        }
        None => Ok(Arc::new(TomlStyle::new())),
    }
}

pub fn compute_report(opts: &SketchOptions) -> Result<LayoutReport> {
    let index = build_index(opts)?;
    let seqid = match &opts.seqid {
        Some(seqid) => seqid.clone(),
        None => index
            .first_seqid()
            .ok_or_else(|| Error::semantic("input contains no sequence ids"))?,
    };
    let full = index
        .effective_range_for_seqid(&seqid)
        .ok_or_else(|| Error::semantic(format!("unknown sequence id \"{}\"", seqid)))?;
    let range = match (opts.start, opts.end) {
        (Some(start), Some(end)) if start <= end => Range::new(start, end),
        (Some(start), Some(end)) => {
            return Err(Error::parse(format!(
                "range start {} is larger than range end {}",
                start, end
            )));
        }
        (Some(start), None) => Range::new(start, full.end.max(start)),
        (None, Some(end)) => Range::new(full.start.min(end), end),
        (None, None) => full,
    };

    let style = load_style(opts)?;
    let diagram = Diagram::new(&index, &seqid, range, Arc::clone(&style));
    let breaker = if opts.bases {
        BreakerChoice::Bases
    } else {
        BreakerChoice::Captions
    };
    let layout = Layout::with_options(
        &diagram,
        opts.width,
        style.as_ref(),
        breaker,
        None,
        Arc::new(MonospaceTextWidth::default()),
    )?;
    layout.report(style.as_ref())
}

pub fn run(opts: &SketchOptions, mut out: Box<dyn Write>) -> Result<()> {
    let report = compute_report(opts)?;
    if opts.json {
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| Error::io("JSON serialization failed").set_source(e))?;
        writeln!(out, "{}", json).map_err(|e| Error::io("write failed").set_source(e))?;
    } else {
        writeln!(out, "layout: {}x{:.0}", report.width, report.height)
            .map_err(|e| Error::io("write failed").set_source(e))?;
        for track in &report.tracks {
            writeln!(
                out,
                "track \"{}\": {} lines, {} blocks, {} discarded",
                track.track, track.lines, track.blocks, track.discarded_blocks
            )
            .map_err(|e| Error::io("write failed").set_source(e))?;
        }
    }
    Ok(())
}
