//! The `gff3` subcommand: parse, transform, re-emit.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

use annograph_error::{Error, Result};
use annograph_gff3::parser::{Gff3Parser, ParseMode};
use annograph_stream::{
    AddIdsStream, Gff3InStream, Gff3OutStream, LinesortedOutStream, MergeFeatureStream,
    NodeStream,
};

use crate::options::{Gff3Options, InputOptions};

pub fn parse_mode(input: &InputOptions) -> ParseMode {
    if input.strict {
        ParseMode::Strict
    } else if input.tidy {
        ParseMode::Tidy
    } else {
        ParseMode::Relaxed
    }
}

/// Build the source stage from the input options.
pub fn input_stream(input: &InputOptions, parser: Gff3Parser) -> Result<Gff3InStream> {
    let mut stream = Gff3InStream::new(parser);
    if input.files.is_empty() {
        stream.add_reader("<stdin>", Box::new(BufReader::new(io::stdin())));
    } else {
        for file in &input.files {
            stream.add_file(file)?;
        }
    }
    Ok(stream)
}

/// Parse a two-column "seqid<TAB>offset" file.
pub fn load_offset_map(path: &Path) -> Result<HashMap<String, i64>> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        Error::io(format!("cannot read offset file \"{}\"", path.display())).set_source(e)
    })?;
    let mut map = HashMap::new();
    for (index, line) in text.lines().enumerate() {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((seqid, offset)) = line.split_once('\t') else {
            return Err(Error::parse(format!(
                "offset file line {} is not \"seqid<TAB>offset\"",
                index + 1
            )));
        };
        let offset: i64 = offset.trim().parse().map_err(|_| {
            Error::parse(format!(
                "could not parse offset \"{}\" on line {}",
                offset,
                index + 1
            ))
        })?;
        map.insert(seqid.to_owned(), offset);
    }
    Ok(map)
}

pub fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    match path {
        Some(path) => {
            let file = File::create(path).map_err(|e| {
                Error::io(format!("cannot create file \"{}\"", path.display())).set_source(e)
            })?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(io::stdout().lock())),
    }
}

pub fn run(opts: &Gff3Options) -> Result<()> {
    let out = open_output(opts.output.as_deref())?;
    run_to_writer(opts, out)
}

pub fn run_to_writer(opts: &Gff3Options, out: Box<dyn Write>) -> Result<()> {
    tracing::debug!(
        "gff3 pipeline over {} input(s): addids={} mergefeat={} sort={}",
        opts.input.files.len().max(1),
        opts.addids,
        opts.mergefeat,
        opts.sort
    );
    let mut parser = Gff3Parser::new();
    parser.set_mode(parse_mode(&opts.input));
    if opts.checkids {
        parser.check_id_attributes();
    }
    if let Some(offset) = opts.offset {
        parser.set_offset(offset);
    }
    if let Some(offsetfile) = &opts.offsetfile {
        parser.set_offset_map(load_offset_map(offsetfile)?);
    }

    let mut stream: Box<dyn NodeStream> = Box::new(input_stream(&opts.input, parser)?);
    if opts.addids {
        stream = Box::new(AddIdsStream::new(stream));
    }
    if opts.mergefeat {
        stream = Box::new(MergeFeatureStream::new(stream));
    }

    if opts.sort {
        let mut sink = LinesortedOutStream::new(stream, out);
        while sink.next_node()?.is_some() {}
    } else {
        let mut sink = Gff3OutStream::new(stream, out);
        if opts.retainids {
            sink.emitter_mut().retain_id_attributes();
        }
        sink.emitter_mut().set_fasta_width(opts.width);
        while sink.next_node()?.is_some() {}
    }
    Ok(())
}
