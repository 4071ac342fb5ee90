//! The `select` subcommand: filter features by a conjunctive predicate.

use std::io::Write;

use annograph_core::{Range, Strand};
use annograph_error::{Error, Result};
use annograph_gff3::parser::Gff3Parser;
use annograph_stream::{Gff3OutStream, NodeStream, SelectPredicate, SelectStream};

use crate::gff3::{input_stream, open_output, parse_mode};
use crate::options::SelectOptions;

fn range_from(pair: &[u64]) -> Result<Range> {
    debug_assert_eq!(pair.len(), 2);
    if pair[0] > pair[1] {
        return Err(Error::parse(format!(
            "range start {} is larger than range end {}",
            pair[0], pair[1]
        )));
    }
    Ok(Range::new(pair[0], pair[1]))
}

pub fn predicate_from(opts: &SelectOptions) -> Result<SelectPredicate> {
    let mut predicate = SelectPredicate::new();
    predicate.seqid = opts.seqid.clone();
    predicate.source = opts.source.clone();
    if let Some(pair) = &opts.contain {
        predicate.contained_range = Some(range_from(pair)?);
    }
    if let Some(pair) = &opts.overlap {
        predicate.overlap_range = Some(range_from(pair)?);
    }
    if let Some(strand) = &opts.strand {
        predicate.strand = Some(Strand::parse(strand)?);
    }
    if let Some(strand) = &opts.targetstrand {
        predicate.target_strand = Some(Strand::parse(strand)?);
    }
    predicate.has_cds = opts.hascds;
    predicate.max_gene_length = opts.maxgenelength;
    predicate.min_gene_score = opts.mingenescore;
    predicate.max_gene_score = opts.maxgenescore;
    predicate.max_features = opts.maxfeaturenum;
    Ok(predicate)
}

pub fn run(opts: &SelectOptions) -> Result<()> {
    let out = open_output(opts.output.as_deref())?;
    run_to_writer(opts, out)
}

pub fn run_to_writer(opts: &SelectOptions, out: Box<dyn Write>) -> Result<()> {
    let mut parser = Gff3Parser::new();
    parser.set_mode(parse_mode(&opts.input));
    let source = input_stream(&opts.input, parser)?;
    let selected = SelectStream::new(source, predicate_from(opts)?);
    let mut sink = Gff3OutStream::new(selected, out);
    while sink.next_node()?.is_some() {}
    Ok(())
}
