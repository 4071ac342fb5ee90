//! Adapter driving a visitor as a stage's internal worker.

use annograph_core::{GenomeNode, NodeVisitor};
use annograph_error::Result;

use crate::stream::NodeStream;

/// A visitor that buffers nodes for re-emission. Stages built this way
/// accept each upstream node, then drain whatever the visitor queued.
pub trait StreamVisitor: NodeVisitor {
    /// Pop one node ready for emission.
    fn poll_node(&mut self) -> Option<GenomeNode>;

    /// Upstream is exhausted; flush any held-back state into the queue.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

pub struct VisitorStream<S: NodeStream, V: StreamVisitor> {
    in_stream: S,
    visitor: V,
    upstream_done: bool,
}

impl<S: NodeStream, V: StreamVisitor> VisitorStream<S, V> {
    pub fn new(in_stream: S, visitor: V) -> Self {
        Self {
            in_stream,
            visitor,
            upstream_done: false,
        }
    }

    pub fn visitor(&self) -> &V {
        &self.visitor
    }
}

impl<S: NodeStream, V: StreamVisitor> NodeStream for VisitorStream<S, V> {
    fn next_node(&mut self) -> Result<Option<GenomeNode>> {
        loop {
            if let Some(node) = self.visitor.poll_node() {
                return Ok(Some(node));
            }
            if self.upstream_done {
                return Ok(None);
            }
            match self.in_stream.next_node()? {
                Some(node) => node.accept(&mut self.visitor)?,
                None => {
                    self.visitor.finish()?;
                    self.upstream_done = true;
                }
            }
        }
    }

    fn is_sorted(&self) -> bool {
        self.in_stream.is_sorted()
    }
}
