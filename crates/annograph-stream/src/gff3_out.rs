//! Sink stage: serialize every node as GFF3 while passing it downstream.

use std::io::Write;

use annograph_core::GenomeNode;
use annograph_error::Result;
use annograph_gff3::Gff3Emitter;

use crate::stream::NodeStream;

pub struct Gff3OutStream<S: NodeStream, W: Write> {
    in_stream: S,
    emitter: Gff3Emitter<W>,
}

impl<S: NodeStream, W: Write> Gff3OutStream<S, W> {
    pub fn new(in_stream: S, out: W) -> Self {
        Self {
            in_stream,
            emitter: Gff3Emitter::new(out),
        }
    }

    pub fn emitter_mut(&mut self) -> &mut Gff3Emitter<W> {
        &mut self.emitter
    }

    pub fn into_writer(self) -> W {
        self.emitter.into_inner()
    }
}

impl<S: NodeStream, W: Write> NodeStream for Gff3OutStream<S, W> {
    fn next_node(&mut self) -> Result<Option<GenomeNode>> {
        match self.in_stream.next_node()? {
            Some(node) => {
                node.accept(&mut self.emitter)?;
                Ok(Some(node))
            }
            None => Ok(None),
        }
    }

    fn is_sorted(&self) -> bool {
        self.in_stream.is_sorted()
    }
}
