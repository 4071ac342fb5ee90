//! The `bed-to-gff3` subcommand.

use std::io::Write;
use std::path::PathBuf;

use annograph_error::{Error, Result};
use annograph_gff3::{BedParser, Gff3Emitter};
use clap::Args;

use crate::gff3::open_output;

#[derive(Args, Debug, Clone, Default)]
pub struct BedOptions {
    /// BED input file
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Feature type to assign to parsed lines
    #[arg(long = "type", value_name = "TYPE")]
    pub feature_type: Option<String>,

    /// Write output to this file instead of stdout
    #[arg(short = 'o', long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

pub fn run(opts: &BedOptions) -> Result<()> {
    let out = open_output(opts.output.as_deref())?;
    run_to_writer(opts, out)
}

pub fn run_to_writer(opts: &BedOptions, out: Box<dyn Write>) -> Result<()> {
    let text = std::fs::read_to_string(&opts.file).map_err(|e| {
        Error::io(format!("cannot read file \"{}\"", opts.file.display())).set_source(e)
    })?;
    let mut parser = BedParser::new();
    if let Some(ftype) = &opts.feature_type {
        parser.set_feature_type(ftype);
    }
    let nodes = parser.parse(&text, &opts.file.display().to_string())?;
    let mut emitter = Gff3Emitter::new(out);
    for node in &nodes {
        node.accept(&mut emitter)?;
    }
    Ok(())
}
