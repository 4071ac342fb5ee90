//! Source stage: GFF3 text to genome nodes.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use annograph_core::GenomeNode;
use annograph_error::{Error, Result};
use annograph_gff3::parser::{Gff3Parser, NodeQueue};

use crate::stream::NodeStream;

type Source = (String, Box<dyn BufRead>);

/// Parses one or more GFF3 inputs in sequence. The parser is reset between
/// files; each file contributes its own EOF node.
pub struct Gff3InStream {
    parser: Gff3Parser,
    pending: VecDeque<Source>,
    current: Option<Source>,
    current_finished: bool,
    queue: NodeQueue,
    sorted: bool,
}

impl Gff3InStream {
    pub fn new(parser: Gff3Parser) -> Self {
        Self {
            parser,
            pending: VecDeque::new(),
            current: None,
            current_finished: false,
            queue: NodeQueue::new(),
            sorted: false,
        }
    }

    pub fn parser_mut(&mut self) -> &mut Gff3Parser {
        &mut self.parser
    }

    pub fn add_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            Error::io(format!("cannot open file \"{}\"", path.display())).set_source(e)
        })?;
        self.pending.push_back((
            path.display().to_string(),
            Box::new(BufReader::new(file)),
        ));
        Ok(())
    }

    pub fn add_reader(&mut self, name: impl Into<String>, reader: Box<dyn BufRead>) {
        self.pending.push_back((name.into(), reader));
    }

    /// Declare the input already sorted by `(seqid, start)`.
    pub fn assume_sorted(&mut self) {
        self.sorted = true;
    }

    fn advance_source(&mut self) -> bool {
        match self.pending.pop_front() {
            Some(source) => {
                self.parser.reset(&source.0);
                self.current = Some(source);
                self.current_finished = false;
                true
            }
            None => {
                self.current = None;
                false
            }
        }
    }

    fn read_line(&mut self) -> Result<Option<String>> {
        let Some((name, reader)) = self.current.as_mut() else {
            return Ok(None);
        };
        let mut line = String::new();
        let read = reader.read_line(&mut line).map_err(|e| {
            Error::io(format!("read error in \"{}\"", name)).set_source(e)
        })?;
        if read == 0 {
            return Ok(None);
        }
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }
        Ok(Some(line))
    }
}

impl NodeStream for Gff3InStream {
    fn next_node(&mut self) -> Result<Option<GenomeNode>> {
        loop {
            // nodes still in the buffer may gain children or multi members
            // until the parser says the batch is complete
            let drainable = self.current_finished || !self.parser.has_incomplete_node();
            if drainable {
                if let Some(node) = self.queue.pop_front() {
                    return Ok(Some(node));
                }
            }
            if self.current.is_none() && !self.advance_source() {
                return Ok(self.queue.pop_front());
            }
            match self.read_line()? {
                Some(line) => self.parser.parse_line(&line, &mut self.queue)?,
                None => {
                    self.parser.finish(&mut self.queue)?;
                    self.current_finished = true;
                    self.current = None;
                }
            }
        }
    }

    fn is_sorted(&self) -> bool {
        self.sorted
    }
}
