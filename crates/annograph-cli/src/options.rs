//! Shared CLI options for the annograph subcommands.

use std::path::PathBuf;

use clap::Args;

/// Input files plus the parser's recovery discipline.
#[derive(Args, Debug, Clone, Default)]
pub struct InputOptions {
    /// GFF3 input files (stdin when none are given)
    #[arg(value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Be tolerant: fix recoverable problems and report them as warnings
    #[arg(long, conflicts_with = "strict")]
    pub tidy: bool,

    /// Reject every violation, never recover
    #[arg(long)]
    pub strict: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct Gff3Options {
    #[command(flatten)]
    pub input: InputOptions,

    /// Add missing "##sequence-region" lines automatically
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set, value_name = "BOOL")]
    pub addids: bool,

    /// Merge adjacent features of the same type without children
    #[arg(long)]
    pub mergefeat: bool,

    /// Sort the output lines by position (per sequence id)
    #[arg(long)]
    pub sort: bool,

    /// Keep ID attributes across "###" lines and unique them globally
    #[arg(long)]
    pub checkids: bool,

    /// Transform all coordinates by this offset
    #[arg(long, allow_hyphen_values = true)]
    pub offset: Option<i64>,

    /// Per-seqid offsets, one "seqid<TAB>offset" per line
    #[arg(long, value_name = "FILE", conflicts_with = "offset")]
    pub offsetfile: Option<PathBuf>,

    /// Keep original ID attribute values on output
    #[arg(long)]
    pub retainids: bool,

    /// Wrap FASTA output at this many columns (0 = no wrapping)
    #[arg(long, default_value_t = 0)]
    pub width: usize,

    /// Write output to this file instead of stdout
    #[arg(short = 'o', long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct SelectOptions {
    #[command(flatten)]
    pub input: InputOptions,

    /// Keep only features with this sequence id
    #[arg(long)]
    pub seqid: Option<String>,

    /// Keep only features with this source (column 2)
    #[arg(long)]
    pub source: Option<String>,

    /// Keep only features contained in this range
    #[arg(long, num_args = 2, value_names = ["START", "END"], conflicts_with = "overlap")]
    pub contain: Option<Vec<u64>>,

    /// Keep only features overlapping this range
    #[arg(long, num_args = 2, value_names = ["START", "END"])]
    pub overlap: Option<Vec<u64>>,

    /// Keep only features with this strand (one of +-.?)
    #[arg(long)]
    pub strand: Option<String>,

    /// Keep only features whose first Target has this strand
    #[arg(long)]
    pub targetstrand: Option<String>,

    /// Keep only features with a CDS in their subtree
    #[arg(long)]
    pub hascds: bool,

    /// Maximum gene length to keep
    #[arg(long)]
    pub maxgenelength: Option<u64>,

    /// Minimum gene score to keep
    #[arg(long)]
    pub mingenescore: Option<f32>,

    /// Maximum gene score to keep
    #[arg(long)]
    pub maxgenescore: Option<f32>,

    /// Keep at most this many features
    #[arg(long)]
    pub maxfeaturenum: Option<u64>,

    /// Write output to this file instead of stdout
    #[arg(short = 'o', long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct SketchOptions {
    #[command(flatten)]
    pub input: InputOptions,

    /// Sequence id to draw (default: the first one seen)
    #[arg(long)]
    pub seqid: Option<String>,

    /// Visible range start (default: whole seqid extent)
    #[arg(long)]
    pub start: Option<u64>,

    /// Visible range end
    #[arg(long)]
    pub end: Option<u64>,

    /// Style file (TOML)
    #[arg(long, value_name = "FILE")]
    pub style: Option<PathBuf>,

    /// Layout width in pixels
    #[arg(long, default_value_t = 800)]
    pub width: u32,

    /// Use the plain base-overlap line breaker instead of the
    /// caption-aware one
    #[arg(long)]
    pub bases: bool,

    /// Report as JSON instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ValidateOptions {
    #[command(flatten)]
    pub input: InputOptions,

    /// Validate files in parallel (one pipeline per file)
    #[arg(long)]
    pub parallel: bool,
}
