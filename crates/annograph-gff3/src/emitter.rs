//! GFF3 emitter: serializes the graph back to canonical text.

use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::sync::Arc;

use annograph_core::node::{CommentNode, EofNode, MetaNode, SequenceNode};
use annograph_core::{FeatureNode, FeatureRef, NodeKey, NodeVisitor, RegionRef};
use annograph_error::{Error, Result, Warning};

use crate::defines::*;

/// Environment variable that keeps original `ID` attribute values on
/// output, uniquing collisions with `.N` suffixes.
pub const RETAIN_IDS_ENV: &str = "GT_RETAINIDS";

/// Node visitor writing GFF3. The version line appears exactly once, before
/// the first output; `###` closes each top-level subtree that exposed IDs.
pub struct Gff3Emitter<W: Write> {
    out: W,
    version_shown: bool,
    fasta_directive_shown: bool,
    retain_ids: bool,
    fasta_width: usize,
    id_counter: HashMap<String, u64>,
    used_ids: HashSet<String>,
    // per-top-level-subtree maps, reset after each feature node
    node_to_id: HashMap<NodeKey, String>,
    node_to_parents: HashMap<NodeKey, Vec<String>>,
}

impl<W: Write> Gff3Emitter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            version_shown: false,
            fasta_directive_shown: false,
            retain_ids: std::env::var_os(RETAIN_IDS_ENV).is_some(),
            fasta_width: 0,
            id_counter: HashMap::new(),
            used_ids: HashSet::new(),
            node_to_id: HashMap::new(),
            node_to_parents: HashMap::new(),
        }
    }

    /// Keep original `ID` values regardless of the environment.
    pub fn retain_id_attributes(&mut self) {
        self.retain_ids = true;
    }

    /// Wrap FASTA residue lines at `width` columns; 0 leaves them unwrapped.
    pub fn set_fasta_width(&mut self, width: usize) {
        self.fasta_width = width;
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.out
    }

    fn version_string(&mut self) -> Result<()> {
        if !self.version_shown {
            writeln!(self.out, "{}   {}", GFF_VERSION_PREFIX, GFF_VERSION)
                .map_err(io_error)?;
            self.version_shown = true;
        }
        Ok(())
    }

    fn create_unique_id(&mut self, node: &FeatureRef) -> String {
        let ftype = node.type_name();
        let counter = self.id_counter.entry(ftype.clone()).or_insert(0);
        *counter += 1;
        let id = format!("{}{}", ftype, counter);
        self.node_to_id.insert(FeatureNode::key(node), id.clone());
        id
    }

    fn make_id_unique(&mut self, node: &FeatureRef) -> String {
        let retained = node
            .attribute(GFF_ID)
            .expect("retained-ID path needs an ID attribute");
        let mut id = retained.clone();
        if self.used_ids.contains(&id) {
            let mut n = 1u64;
            loop {
                let candidate = format!("{}.{}", retained, n);
                if !self.used_ids.contains(&candidate) {
                    id = candidate;
                    break;
                }
                n += 1;
            }
            tracing::warn!(
                "{}",
                Warning::new(format!(
                    "feature ID \"{}\" not unique: changing to {}",
                    retained, id
                ))
            );
        }
        self.used_ids.insert(id.clone());
        self.node_to_id.insert(FeatureNode::key(node), id.clone());
        id
    }

    /// Pre-walk: decide which nodes expose an `ID` and hand that ID to
    /// their children as `Parent` entries.
    fn store_ids(&mut self, node: &FeatureRef) -> Result<()> {
        if node.is_pseudo() {
            return Ok(());
        }
        let needs_id = node.has_children()
            || node.is_multi()
            || (self.retain_ids && node.has_attribute(GFF_ID));
        if !needs_id {
            return Ok(());
        }
        let id = if node.is_multi() {
            let rep = FeatureNode::multi_representative(node).expect("multi member has rep");
            let rep_key = FeatureNode::key(&rep);
            let id = match self.node_to_id.get(&rep_key) {
                Some(id) => id.clone(),
                None => {
                    if self.retain_ids && rep.has_attribute(GFF_ID) {
                        self.make_id_unique(&rep)
                    } else {
                        self.create_unique_id(&rep)
                    }
                }
            };
            if !Arc::ptr_eq(&rep, node) {
                self.node_to_id.insert(FeatureNode::key(node), id.clone());
            }
            id
        } else if self.retain_ids && node.has_attribute(GFF_ID) {
            self.make_id_unique(node)
        } else {
            self.create_unique_id(node)
        };
        for child in node.children() {
            self.node_to_parents
                .entry(FeatureNode::key(&child))
                .or_default()
                .push(id.clone());
        }
        Ok(())
    }

    fn show_feature_line(&mut self, node: &FeatureRef) -> Result<()> {
        if node.is_pseudo() {
            return Ok(());
        }
        let range = node.range();
        write!(
            self.out,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t",
            node.seqid(),
            node.source(),
            node.type_name(),
            range.start,
            range.end,
            node.score().map_or_else(|| ".".to_owned(), format_score),
            node.strand(),
            node.phase().map_or_else(|| ".".to_owned(), |p| p.to_string()),
        )
        .map_err(io_error)?;

        let mut part_shown = false;
        let id = self.node_to_id.get(&FeatureNode::key(node)).cloned();
        if let Some(id) = id {
            write!(self.out, "{}={}", GFF_ID, id).map_err(io_error)?;
            part_shown = true;
        }
        let parents = self
            .node_to_parents
            .get(&FeatureNode::key(node))
            .map(|p| p.join(","));
        if let Some(parents) = parents.filter(|p| !p.is_empty()) {
            if part_shown {
                write!(self.out, ";").map_err(io_error)?;
            }
            write!(self.out, "{}={}", GFF_PARENT, parents).map_err(io_error)?;
            part_shown = true;
        }
        let mut write_err = None;
        node.for_each_attribute(|tag, value| {
            if write_err.is_some() || tag == GFF_ID || tag == GFF_PARENT {
                return;
            }
            let sep = if part_shown { ";" } else { "" };
            if let Err(e) = write!(self.out, "{}{}={}", sep, tag, value) {
                write_err = Some(e);
            }
            part_shown = true;
        });
        if let Some(e) = write_err {
            return Err(io_error(e));
        }
        if !part_shown {
            write!(self.out, ".").map_err(io_error)?;
        }
        writeln!(self.out).map_err(io_error)
    }
}

impl<W: Write> NodeVisitor for Gff3Emitter<W> {
    fn visit_feature(&mut self, node: &FeatureRef) -> Result<()> {
        self.version_string()?;

        // first pass assigns IDs over the whole subtree
        let mut order: Vec<FeatureRef> = Vec::new();
        FeatureNode::traverse(node, true, &mut |n| {
            order.push(Arc::clone(n));
            Ok(())
        })?;
        for n in &order {
            self.store_ids(n)?;
        }

        if FeatureNode::is_tree(node) {
            for n in &order {
                self.show_feature_line(n)?;
            }
        } else {
            // a DAG: topologically sorted depth-first order keeps every
            // Parent= reference behind its definition
            let mut sorted: Vec<FeatureRef> = Vec::new();
            FeatureNode::traverse_topsorted(node, &mut |n| {
                sorted.push(Arc::clone(n));
                Ok(())
            })?;
            for n in &sorted {
                self.show_feature_line(n)?;
            }
        }

        self.node_to_id.clear();
        self.node_to_parents.clear();

        if node.has_children() || (self.retain_ids && node.has_attribute(GFF_ID)) {
            writeln!(self.out, "{}", GFF_TERMINATOR).map_err(io_error)?;
        }
        Ok(())
    }

    fn visit_region(&mut self, node: &RegionRef) -> Result<()> {
        self.version_string()?;
        let range = node.range();
        writeln!(
            self.out,
            "{}   {} {} {}",
            GFF_SEQUENCE_REGION,
            node.seqid(),
            range.start,
            range.end
        )
        .map_err(io_error)
    }

    fn visit_comment(&mut self, node: &Arc<CommentNode>) -> Result<()> {
        self.version_string()?;
        writeln!(self.out, "#{}", node.text()).map_err(io_error)
    }

    fn visit_meta(&mut self, node: &Arc<MetaNode>) -> Result<()> {
        if !self.version_shown
            && (node.directive().starts_with("gff-version")
                || node.directive().starts_with("gvf-version"))
        {
            self.version_shown = true;
        } else {
            self.version_string()?;
        }
        writeln!(self.out, "##{} {}", node.directive(), node.data()).map_err(io_error)
    }

    fn visit_sequence(&mut self, node: &Arc<SequenceNode>) -> Result<()> {
        self.version_string()?;
        if !self.fasta_directive_shown {
            writeln!(self.out, "{}", GFF_FASTA_DIRECTIVE).map_err(io_error)?;
            self.fasta_directive_shown = true;
        }
        writeln!(self.out, ">{}", node.description()).map_err(io_error)?;
        let residues = node.residues();
        if self.fasta_width == 0 {
            writeln!(self.out, "{}", residues).map_err(io_error)?;
        } else {
            for chunk in residues.as_bytes().chunks(self.fasta_width) {
                self.out.write_all(chunk).map_err(io_error)?;
                writeln!(self.out).map_err(io_error)?;
            }
        }
        Ok(())
    }

    fn visit_eof(&mut self, _node: &EofNode) -> Result<()> {
        self.version_string()
    }
}

fn io_error(err: std::io::Error) -> Error {
    Error::io("write failed").set_source(err)
}

/// Shortest decimal form, C locale.
fn format_score(score: f32) -> String {
    format!("{}", score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{Gff3Parser, NodeQueue, ParseMode};
    use annograph_core::GenomeNode;
    use pretty_assertions::assert_eq;
    use serial_test::serial;

    fn reparse_and_emit(input: &str) -> String {
        let mut parser = Gff3Parser::new();
        parser.set_mode(ParseMode::Relaxed);
        parser.reset("test.gff3");
        let mut queue = NodeQueue::new();
        for line in input.lines() {
            parser.parse_line(line, &mut queue).unwrap();
        }
        parser.finish(&mut queue).unwrap();
        let mut emitter = Gff3Emitter::new(Vec::new());
        for node in &queue {
            node.accept(&mut emitter).unwrap();
        }
        String::from_utf8(emitter.into_inner()).unwrap()
    }

    #[test]
    #[serial]
    fn parent_child_round_trip() {
        std::env::remove_var(RETAIN_IDS_ENV);
        let out = reparse_and_emit(
            "##gff-version 3\n\
             ##sequence-region chr1 1 1000\n\
             chr1\tex\tgene\t100\t400\t.\t+\t.\tID=g1\n\
             chr1\tex\tmRNA\t100\t400\t.\t+\t.\tID=m1;Parent=g1\n\
             chr1\tex\texon\t100\t200\t.\t+\t.\tParent=m1\n\
             chr1\tex\texon\t300\t400\t.\t+\t.\tParent=m1\n\
             ###\n",
        );
        assert_eq!(
            out,
            "##gff-version   3\n\
             ##sequence-region   chr1 1 1000\n\
             chr1\tex\tgene\t100\t400\t.\t+\t.\tID=gene1\n\
             chr1\tex\tmRNA\t100\t400\t.\t+\t.\tID=mRNA1;Parent=gene1\n\
             chr1\tex\texon\t100\t200\t.\t+\t.\tParent=mRNA1\n\
             chr1\tex\texon\t300\t400\t.\t+\t.\tParent=mRNA1\n\
             ###\n"
        );
    }

    #[test]
    #[serial]
    fn multi_feature_members_share_one_id() {
        std::env::remove_var(RETAIN_IDS_ENV);
        let out = reparse_and_emit(
            "##gff-version 3\n\
             chr1\tex\tCDS\t100\t200\t.\t+\t0\tID=cds1\n\
             chr1\tex\tCDS\t300\t400\t.\t+\t0\tID=cds1\n",
        );
        assert_eq!(
            out,
            "##gff-version   3\n\
             chr1\tex\tCDS\t100\t200\t.\t+\t0\tID=CDS1\n\
             chr1\tex\tCDS\t300\t400\t.\t+\t0\tID=CDS1\n\
             ###\n"
        );
    }

    #[test]
    #[serial]
    fn retained_ids_are_uniqued() {
        std::env::remove_var(RETAIN_IDS_ENV);
        let mut parser = Gff3Parser::new();
        parser.reset("test.gff3");
        let mut queue = NodeQueue::new();
        for line in [
            "##gff-version 3",
            "chr1\tex\tgene\t1\t100\t.\t+\t.\tID=g",
            "chr1\tex\texon\t1\t50\t.\t+\t.\tParent=g",
            "###",
            "chr1\tex\tgene\t200\t300\t.\t+\t.\tID=g",
            "chr1\tex\texon\t200\t250\t.\t+\t.\tParent=g",
            "###",
        ] {
            parser.parse_line(line, &mut queue).unwrap();
        }
        parser.finish(&mut queue).unwrap();
        let mut emitter = Gff3Emitter::new(Vec::new());
        emitter.retain_id_attributes();
        for node in &queue {
            node.accept(&mut emitter).unwrap();
        }
        let out = String::from_utf8(emitter.into_inner()).unwrap();
        assert!(out.contains("ID=g\n") || out.contains("ID=g;"));
        assert!(out.contains("ID=g.1"), "second g must be uniqued: {}", out);
        assert!(out.contains("Parent=g.1"));
    }

    #[test]
    #[serial]
    fn attributes_keep_insertion_order_after_id() {
        std::env::remove_var(RETAIN_IDS_ENV);
        let out = reparse_and_emit(
            "##gff-version 3\n\
             chr1\tex\tgene\t1\t100\t0.5\t-\t.\tID=g1;note=first;extra=second\n\
             chr1\tex\texon\t1\t50\t.\t-\t.\tParent=g1\n",
        );
        assert!(
            out.contains("chr1\tex\tgene\t1\t100\t0.5\t-\t.\tID=gene1;note=first;extra=second\n"),
            "got: {}",
            out
        );
    }

    #[test]
    #[serial]
    fn leaf_feature_without_attributes_prints_dot() {
        std::env::remove_var(RETAIN_IDS_ENV);
        let out = reparse_and_emit(
            "##gff-version 3\n\
             chr1\tex\tregion\t1\t100\t.\t.\t.\t.\n",
        );
        assert_eq!(
            out,
            "##gff-version   3\n\
             chr1\tex\tregion\t1\t100\t.\t.\t.\t.\n"
        );
    }

    #[test]
    #[serial]
    fn fasta_tail_is_emitted_once() {
        std::env::remove_var(RETAIN_IDS_ENV);
        let out = reparse_and_emit(
            "##gff-version 3\n\
             chr1\tex\tgene\t1\t4\t.\t+\t.\t.\n\
             ##FASTA\n\
             >chr1\n\
             ACGT\n\
             >chr2\n\
             GGCC\n",
        );
        assert_eq!(
            out,
            "##gff-version   3\n\
             chr1\tex\tgene\t1\t4\t.\t+\t.\t.\n\
             ##FASTA\n\
             >chr1\n\
             ACGT\n\
             >chr2\n\
             GGCC\n"
        );
    }

    #[test]
    #[serial]
    fn comments_and_meta_render_with_prefixes() {
        std::env::remove_var(RETAIN_IDS_ENV);
        let out = reparse_and_emit(
            "##gff-version 3\n\
             #a comment\n\
             ##species http://example.org\n",
        );
        assert_eq!(
            out,
            "##gff-version   3\n\
             #a comment\n\
             ##species http://example.org\n"
        );
    }

    #[test]
    #[serial]
    fn emitted_text_is_a_fixed_point() {
        std::env::remove_var(RETAIN_IDS_ENV);
        let first = reparse_and_emit(
            "##gff-version 3\n\
             ##sequence-region chr1 1 1000\n\
             chr1\tex\tgene\t100\t400\t0.5\t+\t.\tID=g1;note=n1\n\
             chr1\tex\tmRNA\t100\t400\t.\t+\t.\tID=m1;Parent=g1\n\
             chr1\tex\texon\t100\t200\t.\t+\t.\tParent=m1\n\
             ###\n\
             #trailing comment\n",
        );
        // parsing the emitter's own output and emitting again must
        // reproduce it byte for byte
        let second = reparse_and_emit(&first);
        assert_eq!(first, second);
    }

    #[test]
    #[serial]
    fn dag_children_emit_after_both_parents() {
        std::env::remove_var(RETAIN_IDS_ENV);
        let out = reparse_and_emit(
            "##gff-version 3\n\
             chr1\tex\tgene\t1\t1000\t.\t+\t.\tID=g1\n\
             chr1\tex\tgene\t2000\t3000\t.\t+\t.\tID=g2\n\
             chr1\tex\tmRNA\t1\t3000\t.\t+\t.\tID=m1;Parent=g1,g2\n",
        );
        let gene1_at = out.find("\tgene\t1\t1000").unwrap();
        let gene2_at = out.find("\tgene\t2000\t3000").unwrap();
        let mrna_at = out.find("\tmRNA\t").unwrap();
        assert!(mrna_at > gene1_at && mrna_at > gene2_at, "got: {}", out);
        assert!(out.contains("Parent=gene1,gene2"), "got: {}", out);
    }
}
