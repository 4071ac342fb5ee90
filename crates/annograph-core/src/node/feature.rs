//! Feature nodes: the interior nodes of the annotation graph.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Weak};

use annograph_error::{Location, Result};
use parking_lot::RwLock;

use super::{AttributeMap, NodeKey, Phase, Strand};
use crate::interner::{InternPool, Sym};
use crate::Range;

/// Counted handle to a feature node.
pub type FeatureRef = Arc<FeatureNode>;

/// Stack headroom for the depth-first walks; feature trees are
/// input-controlled, so recursion grows the stack on demand.
const RED_ZONE: usize = 64 * 1024;
const STACK_GROWTH: usize = 2 * 1024 * 1024;

#[derive(Debug)]
struct State {
    seqid: Sym,
    range: Range,
    score: Option<f32>,
    phase: Option<Phase>,
    attributes: AttributeMap,
    children: Vec<FeatureRef>,
    /// `Some` marks a multi-feature member; the representative points to
    /// itself. Weak so the ownership graph stays acyclic.
    multi_rep: Option<Weak<FeatureNode>>,
}

/// A single annotated feature (one GFF3 feature line), or a synthetic
/// pseudo node grouping otherwise rootless features.
#[derive(Debug)]
pub struct FeatureNode {
    pool: InternPool,
    source: Sym,
    ftype: Sym,
    strand: Strand,
    is_pseudo: bool,
    origin: Location,
    state: RwLock<State>,
}

impl FeatureNode {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pool: &InternPool,
        seqid: &str,
        source: &str,
        ftype: &str,
        range: Range,
        strand: Strand,
        origin: Location,
    ) -> FeatureRef {
        Arc::new(FeatureNode {
            pool: pool.clone(),
            source: pool.intern(source),
            ftype: pool.intern(ftype),
            strand,
            is_pseudo: false,
            origin,
            state: RwLock::new(State {
                seqid: pool.intern(seqid),
                range,
                score: None,
                phase: None,
                attributes: AttributeMap::new(),
                children: Vec::new(),
                multi_rep: None,
            }),
        })
    }

    /// Synthetic grouping node templated on an existing feature: same
    /// seqid, range, strand and provenance, but flagged pseudo. Pseudo
    /// nodes are never emitted themselves; their range tracks the union of
    /// their children.
    pub fn new_pseudo(template: &FeatureRef) -> FeatureRef {
        let state = template.state.read();
        Arc::new(FeatureNode {
            pool: template.pool.clone(),
            source: template.source,
            ftype: template.ftype,
            strand: template.strand,
            is_pseudo: true,
            origin: template.origin.clone(),
            state: RwLock::new(State {
                seqid: state.seqid,
                range: state.range,
                score: None,
                phase: None,
                attributes: AttributeMap::new(),
                children: Vec::new(),
                multi_rep: None,
            }),
        })
    }

    pub fn pool(&self) -> &InternPool {
        &self.pool
    }

    pub fn key(this: &FeatureRef) -> NodeKey {
        NodeKey::of(this)
    }

    pub fn seqid(&self) -> String {
        self.pool.resolve(self.state.read().seqid)
    }

    pub fn seqid_sym(&self) -> Sym {
        self.state.read().seqid
    }

    pub fn change_seqid(&self, seqid: &str) {
        self.state.write().seqid = self.pool.intern(seqid);
    }

    pub fn source(&self) -> String {
        self.pool.resolve(self.source)
    }

    pub fn source_sym(&self) -> Sym {
        self.source
    }

    pub fn type_name(&self) -> String {
        self.pool.resolve(self.ftype)
    }

    pub fn type_sym(&self) -> Sym {
        self.ftype
    }

    pub fn strand(&self) -> Strand {
        self.strand
    }

    pub fn is_pseudo(&self) -> bool {
        self.is_pseudo
    }

    pub fn origin(&self) -> &Location {
        &self.origin
    }

    pub fn line_number(&self) -> u64 {
        self.origin.line()
    }

    pub fn filename(&self) -> &str {
        self.origin.filename()
    }

    pub fn range(&self) -> Range {
        self.state.read().range
    }

    pub fn set_range(&self, range: Range) {
        self.state.write().range = range;
    }

    pub fn score(&self) -> Option<f32> {
        self.state.read().score
    }

    pub fn set_score(&self, score: f32) {
        self.state.write().score = Some(score);
    }

    pub fn unset_score(&self) {
        self.state.write().score = None;
    }

    pub fn phase(&self) -> Option<Phase> {
        self.state.read().phase
    }

    pub fn set_phase(&self, phase: Phase) {
        self.state.write().phase = Some(phase);
    }

    // ---- attributes ------------------------------------------------------

    pub fn attribute(&self, tag: &str) -> Option<String> {
        self.state.read().attributes.get(tag).map(str::to_owned)
    }

    pub fn has_attribute(&self, tag: &str) -> bool {
        self.state.read().attributes.contains(tag)
    }

    pub fn add_attribute(&self, tag: &str, value: &str) {
        self.state.write().attributes.add(tag, value);
    }

    pub fn set_attribute(&self, tag: &str, value: &str) {
        self.state.write().attributes.set(tag, value);
    }

    pub fn attribute_names(&self) -> Vec<String> {
        self.state.read().attributes.tags()
    }

    pub fn for_each_attribute(&self, mut f: impl FnMut(&str, &str)) {
        for (tag, value) in self.state.read().attributes.iter() {
            f(tag, value);
        }
    }

    // ---- children --------------------------------------------------------

    /// Append an owned child edge. A pseudo parent widens its range to keep
    /// covering the union of its children.
    pub fn add_child(&self, child: FeatureRef) {
        let mut state = self.state.write();
        if self.is_pseudo {
            state.range = state.range.join(&child.range());
        }
        state.children.push(child);
    }

    pub fn has_children(&self) -> bool {
        !self.state.read().children.is_empty()
    }

    pub fn number_of_children(&self) -> usize {
        self.state.read().children.len()
    }

    /// Snapshot of the direct children in insertion order.
    pub fn children(&self) -> Vec<FeatureRef> {
        self.state.read().children.clone()
    }

    /// Count direct children sharing `like`'s concrete type.
    pub fn number_of_children_of_type(&self, like: &FeatureRef) -> usize {
        let ftype = like.ftype;
        self.state
            .read()
            .children
            .iter()
            .filter(|c| c.ftype == ftype)
            .count()
    }

    /// Detach a childless node from every children list in the subtree
    /// rooted here. Returns true when at least one edge was removed.
    pub fn remove_leaf(this: &FeatureRef, leaf: &FeatureRef) -> bool {
        debug_assert!(!leaf.has_children());
        let target = NodeKey::of(leaf);
        let mut removed = false;
        let _ = FeatureNode::traverse(this, true, &mut |node| {
            let mut state = node.state.write();
            let before = state.children.len();
            state.children.retain(|c| NodeKey::of(c) != target);
            if state.children.len() != before {
                removed = true;
            }
            Ok(())
        });
        removed
    }

    /// True when the sibling set sharing `like`'s type under this node has
    /// no pairwise range overlaps.
    pub fn direct_children_do_not_overlap_of_type(&self, like: &FeatureRef) -> bool {
        let ftype = like.ftype;
        let mut ranges: Vec<Range> = self
            .state
            .read()
            .children
            .iter()
            .filter(|c| c.ftype == ftype)
            .map(|c| c.range())
            .collect();
        ranges.sort();
        ranges.windows(2).all(|w| !w[0].overlaps(&w[1]))
    }

    // ---- traversal -------------------------------------------------------

    /// Depth-first walk over the subtree, each node visited exactly once
    /// even when the subtree is a DAG.
    pub fn traverse(
        this: &FeatureRef,
        include_self: bool,
        f: &mut impl FnMut(&FeatureRef) -> Result<()>,
    ) -> Result<()> {
        let mut seen = HashSet::new();
        fn walk(
            node: &FeatureRef,
            visit_node: bool,
            seen: &mut HashSet<NodeKey>,
            f: &mut impl FnMut(&FeatureRef) -> Result<()>,
        ) -> Result<()> {
            if !seen.insert(NodeKey::of(node)) {
                return Ok(());
            }
            if visit_node {
                f(node)?;
            }
            for child in node.children() {
                stacker::maybe_grow(RED_ZONE, STACK_GROWTH, || walk(&child, true, seen, f))?;
            }
            Ok(())
        }
        walk(this, include_self, &mut seen, f)
    }

    /// Visit only the direct children, in order.
    pub fn traverse_direct_children(
        this: &FeatureRef,
        f: &mut impl FnMut(&FeatureRef) -> Result<()>,
    ) -> Result<()> {
        for child in this.children() {
            f(&child)?;
        }
        Ok(())
    }

    /// Topologically sorted depth-first walk: every node is visited exactly
    /// once, after all of its parents inside this subtree. Required for
    /// output so `Parent=` lists reference already-emitted nodes.
    pub fn traverse_topsorted(
        this: &FeatureRef,
        f: &mut impl FnMut(&FeatureRef) -> Result<()>,
    ) -> Result<()> {
        // collect in-degrees within the subtree
        let mut indegree: HashMap<NodeKey, usize> = HashMap::new();
        let mut nodes: HashMap<NodeKey, FeatureRef> = HashMap::new();
        let mut stack = vec![Arc::clone(this)];
        indegree.insert(NodeKey::of(this), 0);
        while let Some(node) = stack.pop() {
            let key = NodeKey::of(&node);
            if nodes.contains_key(&key) {
                continue;
            }
            nodes.insert(key, Arc::clone(&node));
            for child in node.children() {
                *indegree.entry(NodeKey::of(&child)).or_insert(0) += 1;
                stack.push(child);
            }
        }
        // emit in child-list order as parents complete
        let mut queue: VecDeque<FeatureRef> = VecDeque::new();
        queue.push_back(Arc::clone(this));
        while let Some(node) = queue.pop_front() {
            f(&node)?;
            for child in node.children() {
                let key = NodeKey::of(&child);
                let remaining = indegree
                    .get_mut(&key)
                    .expect("child discovered during collection");
                *remaining -= 1;
                if *remaining == 0 {
                    queue.push_back(child);
                }
            }
        }
        Ok(())
    }

    /// True when no node in the subtree is reachable through two different
    /// parents.
    pub fn is_tree(this: &FeatureRef) -> bool {
        let mut seen = HashSet::new();
        let mut stack = vec![Arc::clone(this)];
        while let Some(node) = stack.pop() {
            if !seen.insert(NodeKey::of(&node)) {
                return false;
            }
            for child in node.children() {
                stack.push(child);
            }
        }
        true
    }

    /// True when `other` occurs anywhere in the subtree rooted here.
    pub fn subtree_contains(this: &FeatureRef, other: &FeatureRef) -> bool {
        let target = NodeKey::of(other);
        let mut found = false;
        let _ = FeatureNode::traverse(this, true, &mut |node| {
            if NodeKey::of(node) == target {
                found = true;
            }
            Ok(())
        });
        found
    }

    // ---- multi-feature state ---------------------------------------------

    pub fn is_multi(&self) -> bool {
        self.state.read().multi_rep.is_some()
    }

    /// Elect this node the representative of its multi-feature class.
    pub fn make_multi_representative(this: &FeatureRef) {
        this.state.write().multi_rep = Some(Arc::downgrade(this));
    }

    pub fn set_multi_representative(this: &FeatureRef, rep: &FeatureRef) {
        debug_assert!(rep.is_multi());
        this.state.write().multi_rep = Some(Arc::downgrade(rep));
    }

    pub fn unset_multi(&self) {
        self.state.write().multi_rep = None;
    }

    /// The elected representative. A member whose representative is gone
    /// (e.g. pruned by a transformer) answers for itself until a sanitizer
    /// re-elects.
    pub fn multi_representative(this: &FeatureRef) -> Option<FeatureRef> {
        let weak = this.state.read().multi_rep.clone()?;
        Some(weak.upgrade().unwrap_or_else(|| Arc::clone(this)))
    }

    /// True when this node is the representative of its class.
    pub fn is_multi_representative(this: &FeatureRef) -> bool {
        match FeatureNode::multi_representative(this) {
            Some(rep) => Arc::ptr_eq(&rep, this),
            None => false,
        }
    }
}
