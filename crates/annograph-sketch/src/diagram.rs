//! Diagram construction: distributes the features of one visible range
//! into blocks, keyed by track.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use annograph_core::{FeatureIndex, FeatureNode, FeatureRef, NodeKey, Range};
use annograph_error::Result;
use parking_lot::RwLock;

use crate::block::Block;
use crate::style::Style;

/// Maps a block to the identifier of the track it belongs to.
pub type TrackSelector = Box<dyn Fn(&Block) -> String + Send + Sync>;

/// `basename(filename)|type`; the basename keeps captions short, at the
/// price of collapsing same-named files from different directories into
/// one track.
pub fn default_track_selector(block: &Block) -> String {
    let filename = block.top_level_feature().filename().to_owned();
    let basename = Path::new(&filename)
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or(filename);
    format!("{}|{}", basename, block.type_name())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Grouping {
    Group,
    DontGroup,
    Undefined,
}

type RepKey = Option<NodeKey>;

struct BlockTuple {
    rep: RepKey,
    block: Block,
}

#[derive(Default)]
struct PerTypeInfo {
    must_merge: bool,
    reps: HashMap<RepKey, usize>,
    tuples: Vec<BlockTuple>,
}

#[derive(Default)]
struct NodeInfo {
    parent: Option<FeatureRef>,
    types: Vec<String>,
    per_type: HashMap<String, PerTypeInfo>,
}

struct Builder<'a> {
    range: Range,
    style: &'a dyn Style,
    nodeinfo: HashMap<NodeKey, NodeInfo>,
    nodeinfo_order: Vec<NodeKey>,
    collapse_cache: HashMap<String, bool>,
    group_cache: HashMap<String, Grouping>,
    caption_cache: HashMap<String, bool>,
}

impl<'a> Builder<'a> {
    fn new(range: Range, style: &'a dyn Style) -> Self {
        Self {
            range,
            style,
            nodeinfo: HashMap::new(),
            nodeinfo_order: Vec::new(),
            collapse_cache: HashMap::new(),
            group_cache: HashMap::new(),
            caption_cache: HashMap::new(),
        }
    }

    fn nodeinfo_entry(&mut self, node: &FeatureRef) -> &mut NodeInfo {
        let key = FeatureNode::key(node);
        if !self.nodeinfo.contains_key(&key) {
            self.nodeinfo.insert(key, NodeInfo::default());
            self.nodeinfo_order.push(key);
        }
        self.nodeinfo.get_mut(&key).expect("just inserted")
    }

    fn add_block(&mut self, owner: &FeatureRef, gft: &str, rep: RepKey, block: Block) {
        let info = self.nodeinfo_entry(owner);
        if !info.per_type.contains_key(gft) {
            info.types.push(gft.to_owned());
            info.per_type.insert(gft.to_owned(), PerTypeInfo::default());
        }
        let per_type = info.per_type.get_mut(gft).expect("just inserted");
        if rep.is_some() {
            per_type.must_merge = true;
        }
        per_type.reps.insert(rep, per_type.tuples.len());
        per_type.tuples.push(BlockTuple { rep, block });
    }

    fn find_block(&mut self, owner: &FeatureRef, gft: &str, rep: RepKey) -> Option<&mut Block> {
        let key = FeatureNode::key(owner);
        let per_type = self.nodeinfo.get_mut(&key)?.per_type.get_mut(gft)?;
        let index = *per_type.reps.get(&rep)?;
        Some(&mut per_type.tuples[index].block)
    }

    // ---- style lookups ---------------------------------------------------

    fn collapse_to_parent(&mut self, ftype: &str) -> Result<bool> {
        if let Some(cached) = self.collapse_cache.get(ftype) {
            return Ok(*cached);
        }
        let value = self
            .style
            .get_bool(ftype, "collapse_to_parent", None)
            .or_default(false)?;
        self.collapse_cache.insert(ftype.to_owned(), value);
        Ok(value)
    }

    fn grouping(&mut self, ftype: &str) -> Result<Grouping> {
        if let Some(cached) = self.group_cache.get(ftype) {
            return Ok(*cached);
        }
        let value = match self
            .style
            .get_bool(ftype, "group_by_parent", None)
            .optional()?
        {
            Some(true) => Grouping::Group,
            Some(false) => Grouping::DontGroup,
            None => Grouping::Undefined,
        };
        self.group_cache.insert(ftype.to_owned(), value);
        Ok(value)
    }

    fn caption_display_status(&mut self, ftype: &str) -> Result<bool> {
        if let Some(cached) = self.caption_cache.get(ftype) {
            return Ok(*cached);
        }
        let mut status = self
            .style
            .get_bool("format", "show_block_captions", None)
            .or_default(true)?;
        if status {
            if let Some(threshold) = self
                .style
                .get_num(ftype, "max_capt_show_width", None)
                .optional()?
            {
                status = self.range.length() as f64 <= threshold;
            }
        }
        self.caption_cache.insert(ftype.to_owned(), status);
        Ok(status)
    }

    fn max_show_width(&self, ftype: &str) -> Result<Option<f64>> {
        self.style.get_num(ftype, "max_show_width", None).optional()
    }

    // ---- captions --------------------------------------------------------

    fn name_or_id(node: &FeatureRef) -> Option<String> {
        node.attribute("Name").or_else(|| node.attribute("ID"))
    }

    fn assign_caption(
        &mut self,
        node: &FeatureRef,
        parent: Option<&FeatureRef>,
        block: &mut Block,
    ) -> Result<()> {
        let ftype = node.type_name();
        if let Some(template) = self
            .style
            .get_str(&ftype, "block_caption", Some(node))
            .optional()?
        {
            block.set_caption(Some(template));
            return Ok(());
        }
        let status = self.caption_display_status(&ftype)?;
        let parent_name = parent.and_then(Self::name_or_id);
        let node_name = Self::name_or_id(node);
        if (parent_name.is_some() || node_name.is_some()) && status {
            let mut caption = String::new();
            if let Some(parent) = parent {
                match &parent_name {
                    Some(name) if parent.has_children() => caption.push_str(name),
                    _ => caption.push('-'),
                }
                caption.push('/');
            }
            if let Some(name) = &node_name {
                caption.push_str(name);
            }
            block.set_caption(Some(caption));
        } else {
            block.set_caption(None);
        }
        Ok(())
    }

    // ---- placement -------------------------------------------------------

    /// The node gets its own block.
    fn add_to_current(&mut self, node: &FeatureRef, parent: Option<&FeatureRef>) -> Result<()> {
        tracing::trace!("adding {} to self", node.type_name());
        self.nodeinfo_entry(node).parent = Some(Arc::clone(node));
        let mut block = Block::from_node(node);
        self.assign_caption(node, parent, &mut block)?;
        block.insert_element(node);
        self.add_block(node, &node.type_name(), None, block);
        Ok(())
    }

    /// Children share one block per parent.
    fn add_to_parent(&mut self, node: &FeatureRef, parent: &FeatureRef) -> Result<()> {
        tracing::trace!(
            "adding {} to parent {}",
            node.type_name(),
            parent.type_name()
        );
        self.nodeinfo_entry(node).parent = Some(Arc::clone(parent));
        let gft = node.type_name();
        let rep = Some(FeatureNode::key(parent));
        if self.find_block(parent, &gft, rep).is_none() {
            let mut block = Block::from_node(parent);
            block.set_type(&gft);
            self.assign_caption(node, Some(parent), &mut block)?;
            self.add_block(parent, &gft, rep, block);
        }
        let block = self
            .find_block(parent, &gft, rep)
            .expect("created on demand");
        block.insert_element(node);
        Ok(())
    }

    /// Multi-feature members collect into their representative's block.
    fn add_to_rep(&mut self, node: &FeatureRef, parent: &FeatureRef) -> Result<()> {
        debug_assert!(node.is_multi());
        tracing::trace!("adding {} to representative", node.type_name());
        let rep_node = FeatureNode::multi_representative(node).expect("member has rep");
        let gft = node.type_name();
        let rep = Some(FeatureNode::key(&rep_node));
        if self.find_block(&rep_node, &gft, rep).is_none() {
            let mut block = Block::from_node(parent);
            block.set_type(&gft);
            // a pseudo parent is a grouping artifact; captions must not
            // mention it
            let caption_parent = (!parent.is_pseudo()).then_some(parent);
            self.assign_caption(node, caption_parent, &mut block)?;
            self.add_block(&rep_node, &gft, rep, block);
        }
        let block = self
            .find_block(&rep_node, &gft, rep)
            .expect("created on demand");
        block.insert_element(node);
        Ok(())
    }

    /// Collapse: walk up recorded parents until a node that owns its own
    /// block, then insert there.
    fn add_recursive(
        &mut self,
        node: &FeatureRef,
        parent: Option<&FeatureRef>,
        original: &FeatureRef,
    ) -> Result<()> {
        let Some(parent) = parent else {
            return Ok(());
        };
        let rep: RepKey = if original.is_multi() {
            FeatureNode::multi_representative(original).map(|r| FeatureNode::key(&r))
        } else {
            None
        };
        let mut cur = Arc::clone(node);
        let mut cur_parent = Arc::clone(parent);
        loop {
            if Arc::ptr_eq(&cur_parent, &cur) {
                // reached the block owner
                let gft = cur.type_name();
                if self.find_block(&cur, &gft, rep).is_none() {
                    let block = Block::from_node(&cur);
                    self.add_block(&cur, &gft, rep, block);
                }
                let block = self.find_block(&cur, &gft, rep).expect("created on demand");
                block.insert_element(original);
                return Ok(());
            }
            self.nodeinfo_entry(&cur).parent = Some(Arc::clone(&cur_parent));
            let next = self
                .nodeinfo
                .get(&FeatureNode::key(&cur_parent))
                .and_then(|info| info.parent.clone());
            let Some(next) = next else {
                // ancestor was never placed; nothing to collapse into
                return Ok(());
            };
            cur = cur_parent;
            cur_parent = next;
        }
    }

    fn process_node(&mut self, node: &FeatureRef, parent: Option<&FeatureRef>) -> Result<()> {
        if node.is_pseudo() {
            return Ok(());
        }
        if !self.range.overlaps(&node.range()) {
            return Ok(());
        }
        let ftype = node.type_name();
        let view_length = self.range.length() as f64;

        if let Some(max_show_width) = self.max_show_width(&ftype)? {
            if view_length > max_show_width {
                return Ok(());
            }
        }
        let mut parent = parent;
        if let Some(p) = parent {
            if !p.is_pseudo() {
                if let Some(parent_max) = self.max_show_width(&p.type_name())? {
                    if view_length > parent_max {
                        // a hidden parent is treated as absent
                        parent = None;
                    }
                }
            }
        }

        if self.collapse_to_parent(&ftype)? {
            match parent {
                Some(p) if !p.is_pseudo() => self.add_recursive(node, Some(p), node)?,
                _ => self.add_to_current(node, parent)?,
            }
            return Ok(());
        }

        match parent {
            Some(p) => {
                let grouping = self.grouping(&ftype)?;
                let do_not_overlap = p.direct_children_do_not_overlap_of_type(node);
                let grouped = grouping == Grouping::Group
                    || (do_not_overlap && grouping == Grouping::Undefined);
                if p.is_pseudo() && node.is_multi() {
                    self.add_to_rep(node, p)?;
                } else if grouped && p.number_of_children() > 1 {
                    self.add_to_parent(node, p)?;
                } else {
                    self.add_to_current(node, Some(p))?;
                }
            }
            None => {
                // root nodes always get their own block
                self.add_to_current(node, None)?;
            }
        }
        Ok(())
    }

    fn traverse_root(&mut self, root: &FeatureRef) -> Result<()> {
        self.process_node(root, None)?;
        self.traverse_children_of(root)
    }

    fn traverse_children_of(&mut self, parent: &FeatureRef) -> Result<()> {
        for child in parent.children() {
            self.process_node(&child, Some(parent))?;
            if child.has_children() {
                self.traverse_children_of(&child)?;
            }
        }
        Ok(())
    }

    fn collect(mut self, selector: &TrackSelector) -> BTreeMap<String, Vec<Block>> {
        let mut tracks: BTreeMap<String, Vec<Block>> = BTreeMap::new();
        for key in std::mem::take(&mut self.nodeinfo_order) {
            let Some(info) = self.nodeinfo.remove(&key) else {
                continue;
            };
            for gft in info.types {
                let Some(per_type) = info.per_type.get(&gft) else {
                    continue;
                };
                let mut mainblock: Option<&Block> = None;
                for tuple in &per_type.tuples {
                    let block = if tuple.rep.is_none() && per_type.must_merge {
                        // the node's own block merges into every grouped one
                        mainblock = Some(&tuple.block);
                        continue;
                    } else if let Some(main) = mainblock {
                        let mut merged = main.clone();
                        merged.merge(&tuple.block);
                        merged
                    } else {
                        tuple.block.clone()
                    };
                    tracks.entry(selector(&block)).or_default().push(block);
                }
            }
        }
        tracks
    }
}

struct Inner {
    seqid: String,
    range: Range,
    features: Vec<FeatureRef>,
    style: Arc<dyn Style>,
    selector: TrackSelector,
    blocks: Option<BTreeMap<String, Vec<Block>>>,
}

/// Block view over one visible range of one seqid.
///
/// The cached block map lives behind a reader/writer lock; installing a
/// custom track selector drops the cache and rebuilds on the next query.
pub struct Diagram {
    inner: RwLock<Inner>,
}

impl Diagram {
    /// Build over the features overlapping `range` in the index.
    pub fn new(
        index: &FeatureIndex,
        seqid: &str,
        range: Range,
        style: Arc<dyn Style>,
    ) -> Self {
        let features = index.features_for_range(seqid, range);
        Self::from_features(seqid, range, features, style)
    }

    pub fn from_features(
        seqid: &str,
        range: Range,
        features: Vec<FeatureRef>,
        style: Arc<dyn Style>,
    ) -> Self {
        Self {
            inner: RwLock::new(Inner {
                seqid: seqid.to_owned(),
                range,
                features,
                style,
                selector: Box::new(default_track_selector),
                blocks: None,
            }),
        }
    }

    pub fn seqid(&self) -> String {
        self.inner.read().seqid.clone()
    }

    pub fn range(&self) -> Range {
        self.inner.read().range
    }

    /// Replace the track selector; forces a rebuild on next access.
    pub fn set_track_selector(&self, selector: TrackSelector) {
        let mut inner = self.inner.write();
        inner.selector = selector;
        inner.blocks = None;
    }

    /// Blocks grouped per track id. Built on first access under the write
    /// lock, then served from the cache.
    pub fn blocks(&self) -> Result<BTreeMap<String, Vec<Block>>> {
        {
            let inner = self.inner.read();
            if let Some(blocks) = &inner.blocks {
                return Ok(blocks.clone());
            }
        }
        let mut inner = self.inner.write();
        if inner.blocks.is_none() {
            let mut builder = Builder::new(inner.range, inner.style.as_ref());
            for root in &inner.features {
                builder.traverse_root(root)?;
            }
            let blocks = builder.collect(&inner.selector);
            inner.blocks = Some(blocks);
        }
        Ok(inner.blocks.as_ref().expect("just built").clone())
    }
}
