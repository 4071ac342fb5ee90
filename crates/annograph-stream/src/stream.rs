//! The pull contract every pipeline stage implements.

use std::collections::VecDeque;

use annograph_core::GenomeNode;
use annograph_error::Result;

/// A pull iterator over genome nodes.
///
/// Contract: every produced node is returned exactly once and ownership
/// transfers to the caller; `Ok(None)` after an earlier `Ok(None)` is legal
/// (idempotent end). An error aborts the pipeline; buffered nodes are freed
/// on drop.
pub trait NodeStream {
    fn next_node(&mut self) -> Result<Option<GenomeNode>>;

    /// Whether this stage guarantees output sorted by `(seqid, start)`.
    /// Composition uses the flag to skip re-sorting on emit.
    fn is_sorted(&self) -> bool {
        false
    }
}

impl NodeStream for Box<dyn NodeStream> {
    fn next_node(&mut self) -> Result<Option<GenomeNode>> {
        (**self).next_node()
    }

    fn is_sorted(&self) -> bool {
        (**self).is_sorted()
    }
}

/// Pull a stream dry, collecting everything.
pub fn drain<S: NodeStream>(stream: &mut S) -> Result<Vec<GenomeNode>> {
    let mut out = Vec::new();
    while let Some(node) = stream.next_node()? {
        out.push(node);
    }
    Ok(out)
}

/// An in-memory source stage, mostly for composing tests and programmatic
/// pipelines.
pub struct QueueStream {
    nodes: VecDeque<GenomeNode>,
    sorted: bool,
}

impl QueueStream {
    pub fn new(nodes: impl IntoIterator<Item = GenomeNode>) -> Self {
        Self {
            nodes: nodes.into_iter().collect(),
            sorted: false,
        }
    }

    pub fn sorted(mut self) -> Self {
        self.sorted = true;
        self
    }
}

impl NodeStream for QueueStream {
    fn next_node(&mut self) -> Result<Option<GenomeNode>> {
        Ok(self.nodes.pop_front())
    }

    fn is_sorted(&self) -> bool {
        self.sorted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use annograph_core::node::CommentNode;
    use annograph_error::Location;
    use std::sync::Arc;

    #[test]
    fn queue_stream_returns_nodes_then_stays_empty() {
        let comment = GenomeNode::Comment(Arc::new(CommentNode::new(
            "x",
            Location::new("t", 1),
        )));
        let mut stream = QueueStream::new([comment]);
        assert!(stream.next_node().unwrap().is_some());
        assert!(stream.next_node().unwrap().is_none());
        // idempotent end
        assert!(stream.next_node().unwrap().is_none());
    }
}
