//! The `validate` subcommand: run one parse pipeline per file.

use std::path::PathBuf;

use annograph_error::Result;
use annograph_gff3::parser::Gff3Parser;
use annograph_stream::{Gff3InStream, NodeStream};
use rayon::prelude::*;

use crate::gff3::parse_mode;
use crate::options::ValidateOptions;

#[derive(Debug)]
pub struct FileReport {
    pub file: String,
    pub ok: bool,
    pub nodes: usize,
    pub error: Option<String>,
}

impl FileReport {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "file": self.file,
            "ok": self.ok,
            "nodes": self.nodes,
            "error": self.error,
        })
    }
}

fn validate_one(file: &PathBuf, opts: &ValidateOptions) -> FileReport {
    let mut parser = Gff3Parser::new();
    parser.set_mode(parse_mode(&opts.input));
    let mut stream = Gff3InStream::new(parser);
    if let Err(err) = stream.add_file(file) {
        return FileReport {
            file: file.display().to_string(),
            ok: false,
            nodes: 0,
            error: Some(err.to_string()),
        };
    }
    let mut nodes = 0usize;
    loop {
        match stream.next_node() {
            Ok(Some(_)) => nodes += 1,
            Ok(None) => {
                tracing::info!("{}: {} nodes", file.display(), nodes);
                return FileReport {
                    file: file.display().to_string(),
                    ok: true,
                    nodes,
                    error: None,
                };
            }
            Err(err) => {
                return FileReport {
                    file: file.display().to_string(),
                    ok: false,
                    nodes,
                    error: Some(err.to_string()),
                };
            }
        }
    }
}

/// Validate every input file; independent pipelines never share graph
/// state, so they parallelize freely.
pub fn run(opts: &ValidateOptions) -> Result<Vec<FileReport>> {
    let reports: Vec<FileReport> = if opts.parallel {
        opts.input
            .files
            .par_iter()
            .map(|file| validate_one(file, opts))
            .collect()
    } else {
        opts.input
            .files
            .iter()
            .map(|file| validate_one(file, opts))
            .collect()
    };
    Ok(reports)
}
