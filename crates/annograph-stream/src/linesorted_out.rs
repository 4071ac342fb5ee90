//! Line-sorted GFF3 output.
//!
//! Buffers the feature nodes of one connected-component cluster (bounded by
//! a change in seqid upstream), serializes the cluster through the emitter,
//! re-sorts the resulting text lines by `(seqid, start, end)` and writes
//! them out with duplicate terminators collapsed. Non-feature nodes flush
//! the pending cluster and are written directly.

use std::cmp::Ordering;
use std::io::Write;

use annograph_core::GenomeNode;
use annograph_error::{Error, Result};
use annograph_gff3::Gff3Emitter;

use crate::stream::NodeStream;

const TERMINATOR: &str = "###";

pub struct LinesortedOutStream<S: NodeStream, W: Write> {
    in_stream: S,
    out: W,
    emitter: Gff3Emitter<Vec<u8>>,
    cluster: Vec<GenomeNode>,
    last_seqid: Option<String>,
    done: bool,
}

impl<S: NodeStream, W: Write> LinesortedOutStream<S, W> {
    pub fn new(in_stream: S, out: W) -> Self {
        Self {
            in_stream,
            out,
            emitter: Gff3Emitter::new(Vec::new()),
            cluster: Vec::new(),
            last_seqid: None,
            done: false,
        }
    }

    pub fn into_writer(self) -> W {
        self.out
    }

    fn take_emitted(&mut self) -> String {
        let bytes = std::mem::take(self.emitter.get_mut());
        String::from_utf8(bytes).expect("emitter writes UTF-8")
    }

    fn process_cluster(&mut self) -> Result<()> {
        if self.cluster.is_empty() {
            return Ok(());
        }
        for node in std::mem::take(&mut self.cluster) {
            node.accept(&mut self.emitter)?;
        }
        let text = self.take_emitted();
        let mut lines: Vec<&str> = text.split('\n').collect();
        lines.sort_by(|a, b| line_order(a, b));
        let mut terminator_shown = false;
        for line in lines {
            if line.is_empty() {
                continue;
            }
            if line == TERMINATOR {
                if terminator_shown {
                    continue;
                }
                terminator_shown = true;
            }
            writeln!(self.out, "{}", line).map_err(io_error)?;
        }
        Ok(())
    }

    fn write_directly(&mut self, node: &GenomeNode) -> Result<()> {
        node.accept(&mut self.emitter)?;
        let text = self.take_emitted();
        self.out.write_all(text.as_bytes()).map_err(io_error)
    }
}

/// Feature lines order by `(seqid, start, end)`; comment and terminator
/// lines sort after them, the version pragma stays in front.
fn line_order(a: &str, b: &str) -> Ordering {
    fn rank(line: &str) -> u8 {
        if line.is_empty()
            || line.starts_with("##gff-version")
            || line.starts_with("##gvf-version")
        {
            0
        } else if line.starts_with('#') {
            2
        } else {
            1
        }
    }
    let (ra, rb) = (rank(a), rank(b));
    if ra != rb {
        return ra.cmp(&rb);
    }
    if ra != 1 {
        return Ordering::Equal;
    }
    let key = |line: &str| -> (String, u64, u64) {
        let mut fields = line.split('\t');
        let seqid = fields.next().unwrap_or("").to_owned();
        let mut fields = fields.skip(2);
        let start = fields.next().and_then(|f| f.parse().ok()).unwrap_or(0);
        let end = fields.next().and_then(|f| f.parse().ok()).unwrap_or(0);
        (seqid, start, end)
    };
    key(a).cmp(&key(b))
}

impl<S: NodeStream, W: Write> NodeStream for LinesortedOutStream<S, W> {
    /// A terminal stage: drains the upstream, writes everything, produces
    /// no nodes of its own.
    fn next_node(&mut self) -> Result<Option<GenomeNode>> {
        if self.done {
            return Ok(None);
        }
        while let Some(node) = self.in_stream.next_node()? {
            if node.is_feature() {
                let seqid = node.seqid().expect("features carry a seqid");
                if self.last_seqid.as_deref() != Some(seqid.as_str()) {
                    // new sequence reached; connected components never span
                    // seqids, so the old cluster is complete
                    self.process_cluster()?;
                    self.last_seqid = Some(seqid);
                }
                self.cluster.push(node);
            } else {
                self.process_cluster()?;
                self.last_seqid = None;
                self.write_directly(&node)?;
            }
        }
        self.process_cluster()?;
        self.done = true;
        Ok(None)
    }
}

fn io_error(err: std::io::Error) -> Error {
    Error::io("write failed").set_source(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gff3_in::Gff3InStream;
    use annograph_gff3::parser::Gff3Parser;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn linesort(input: &'static str) -> String {
        let mut source = Gff3InStream::new(Gff3Parser::new());
        source.add_reader("t.gff3", Box::new(Cursor::new(input)));
        let mut sink = LinesortedOutStream::new(source, Vec::new());
        while sink.next_node().unwrap().is_some() {}
        String::from_utf8(sink.into_writer()).unwrap()
    }

    #[test]
    fn lines_sort_by_start_within_a_seqid() {
        let out = linesort(
            "##gff-version 3\n\
             chr1\tex\tgene\t500\t600\t.\t+\t.\tID=g2\n\
             chr1\tex\texon\t500\t600\t.\t+\t.\tParent=g2\n\
             chr1\tex\tgene\t100\t200\t.\t+\t.\tID=g1\n\
             chr1\tex\texon\t100\t200\t.\t+\t.\tParent=g1\n",
        );
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(
            lines,
            [
                "##gff-version   3",
                "chr1\tex\tgene\t100\t200\t.\t+\t.\tID=gene2",
                "chr1\tex\texon\t100\t200\t.\t+\t.\tParent=gene2",
                "chr1\tex\tgene\t500\t600\t.\t+\t.\tID=gene1",
                "chr1\tex\texon\t500\t600\t.\t+\t.\tParent=gene1",
                "###",
            ]
        );
    }

    #[test]
    fn duplicate_terminators_collapse_per_cluster() {
        let out = linesort(
            "##gff-version 3\n\
             chr1\tex\tgene\t100\t200\t.\t+\t.\tID=g1\n\
             chr1\tex\texon\t100\t150\t.\t+\t.\tParent=g1\n\
             chr1\tex\tgene\t300\t400\t.\t+\t.\tID=g2\n\
             chr1\tex\texon\t300\t350\t.\t+\t.\tParent=g2\n",
        );
        let terminator_count = out.lines().filter(|l| *l == "###").count();
        assert_eq!(terminator_count, 1);
    }

    #[test]
    fn non_feature_nodes_flush_and_pass() {
        let out = linesort(
            "##gff-version 3\n\
             ##sequence-region chr1 1 1000\n\
             chr1\tex\tgene\t100\t200\t.\t+\t.\t.\n",
        );
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(
            lines,
            [
                "##gff-version   3",
                "##sequence-region   chr1 1 1000",
                "chr1\tex\tgene\t100\t200\t.\t+\t.\t.",
            ]
        );
    }
}
