//! Keeps only the best-scoring feature per `(seqid, target id)`.
//!
//! The whole upstream is collected into one arrival-order list before
//! anything is emitted. Features carrying exactly one `Target` compete per
//! `(seqid, target id)` key: a strictly better score removes the previous
//! winner from its slot and appends the new one at the current tail,
//! anything worse is dropped. All other nodes keep their arrival position.
//! The key map is O(unique keys).

use std::collections::HashMap;

use annograph_core::GenomeNode;
use annograph_error::Result;
use annograph_gff3::TargetAttribute;

use crate::stream::NodeStream;

pub struct TargetbestSelectStream<S: NodeStream> {
    in_stream: S,
    /// arrival-order node list; replaced winners leave a hole
    trees: Vec<Option<GenomeNode>>,
    /// `seqid\ttarget id` to slot in `trees`
    target_to_slot: HashMap<String, usize>,
    next: usize,
    in_stream_processed: bool,
}

impl<S: NodeStream> TargetbestSelectStream<S> {
    pub fn new(in_stream: S) -> Self {
        Self {
            in_stream,
            trees: Vec::new(),
            target_to_slot: HashMap::new(),
            next: 0,
            in_stream_processed: false,
        }
    }

    /// The competition key of a single-target feature; the tab separator
    /// cannot occur in a seqid or target id.
    fn single_target_key(node: &GenomeNode) -> Option<String> {
        let feature = node.as_feature()?;
        let value = feature.attribute("Target")?;
        let (targets, _) = TargetAttribute::parse_list(&value, false).ok()?;
        if targets.len() != 1 {
            return None;
        }
        Some(format!("{}\t{}", feature.seqid(), targets[0].id))
    }

    fn score_of(node: &GenomeNode) -> f32 {
        node.as_feature()
            .and_then(|f| f.score())
            .unwrap_or(f32::NEG_INFINITY)
    }

    fn select_targetbest(&mut self, node: GenomeNode) {
        let Some(key) = Self::single_target_key(&node) else {
            // no Target, several targets, or not a feature at all
            self.trees.push(Some(node));
            return;
        };
        match self.target_to_slot.get(&key) {
            None => {
                // target not included yet
                self.target_to_slot.insert(key, self.trees.len());
                self.trees.push(Some(node));
            }
            Some(&slot) => {
                let previous = self.trees[slot]
                    .as_ref()
                    .expect("occupied slots stay filled until emission");
                if Self::score_of(&node) > Self::score_of(previous) {
                    // better: the previous winner leaves its slot and the
                    // replacement joins at the tail
                    self.trees[slot] = None;
                    self.target_to_slot.insert(key, self.trees.len());
                    self.trees.push(Some(node));
                }
                // not better: the candidate is simply dropped
            }
        }
    }
}

impl<S: NodeStream> NodeStream for TargetbestSelectStream<S> {
    fn next_node(&mut self) -> Result<Option<GenomeNode>> {
        if !self.in_stream_processed {
            while let Some(node) = self.in_stream.next_node()? {
                self.select_targetbest(node);
            }
            self.in_stream_processed = true;
        }
        while self.next < self.trees.len() {
            let slot = self.next;
            self.next += 1;
            if let Some(node) = self.trees[slot].take() {
                return Ok(Some(node));
            }
        }
        Ok(None)
    }

    fn is_sorted(&self) -> bool {
        self.in_stream.is_sorted()
    }
}
