//! In-memory feature store: one interval tree per sequence id.

use std::collections::HashMap;
use std::ops::ControlFlow;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::interval_tree::IntervalTree;
use crate::node::{FeatureNode, FeatureRef, NodeKey, RegionRef};
use crate::Range;

#[derive(Debug, Default)]
struct RegionInfo {
    tree: IntervalTree<FeatureRef>,
    region: Option<RegionRef>,
    /// min start / max end over the features added for this seqid
    dyn_range: Option<Range>,
}

#[derive(Debug, Default)]
struct Inner {
    regions: HashMap<String, RegionInfo>,
    /// seqids in first-seen order
    order: Vec<String>,
}

impl Inner {
    fn entry(&mut self, seqid: &str) -> &mut RegionInfo {
        if !self.regions.contains_key(seqid) {
            self.order.push(seqid.to_owned());
            self.regions.insert(seqid.to_owned(), RegionInfo::default());
        }
        self.regions.get_mut(seqid).expect("just inserted")
    }
}

/// Reader/writer-locked map `seqid -> {declared region, interval tree,
/// dynamic range}`. Multiple readers or one writer; writers hold the lock
/// for the whole mutation.
#[derive(Debug, Default)]
pub struct FeatureIndex {
    inner: RwLock<Inner>,
}

impl FeatureIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember a declared region. The first region (or feature) seqid seen
    /// becomes the "first seqid".
    pub fn add_region_node(&self, region: &RegionRef) {
        let mut inner = self.inner.write();
        let info = inner.entry(&region.seqid());
        if info.region.is_none() {
            info.region = Some(Arc::clone(region));
        }
    }

    pub fn add_feature_node(&self, node: &FeatureRef) {
        let range = node.range();
        let mut inner = self.inner.write();
        let info = inner.entry(&node.seqid());
        info.tree.insert(range.start, range.end, Arc::clone(node));
        info.dyn_range = Some(match info.dyn_range {
            Some(dr) => dr.join(&range),
            None => range,
        });
    }

    /// Remove a previously added node, located by handle identity.
    /// Unknown nodes are ignored.
    pub fn remove_node(&self, node: &FeatureRef) {
        let range = node.range();
        let target = FeatureNode::key(node);
        let mut inner = self.inner.write();
        let Some(info) = inner.regions.get_mut(&node.seqid()) else {
            return;
        };
        let mut found = None;
        info.tree.iterate_overlapping(range.start, range.end, |id| {
            if FeatureNode::key(info.tree.data(id)) == target {
                found = Some(id);
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        if let Some(id) = found {
            info.tree.remove(id);
        }
    }

    pub fn has_seqid(&self, seqid: &str) -> bool {
        self.inner.read().regions.contains_key(seqid)
    }

    /// Seqids in first-seen order.
    pub fn seqids(&self) -> Vec<String> {
        self.inner.read().order.clone()
    }

    pub fn first_seqid(&self) -> Option<String> {
        self.inner.read().order.first().cloned()
    }

    pub fn region_node(&self, seqid: &str) -> Option<RegionRef> {
        self.inner
            .read()
            .regions
            .get(seqid)
            .and_then(|info| info.region.clone())
    }

    /// All features on a seqid, sorted by `(start, line number)`.
    pub fn features_for_seqid(&self, seqid: &str) -> Vec<FeatureRef> {
        let inner = self.inner.read();
        let Some(info) = inner.regions.get(seqid) else {
            return Vec::new();
        };
        let mut out = Vec::with_capacity(info.tree.len());
        info.tree.traverse(|id| {
            out.push(Arc::clone(info.tree.data(id)));
            ControlFlow::Continue(())
        });
        sort_features(&mut out);
        out
    }

    /// Features overlapping `query` on a seqid, sorted by
    /// `(start, line number)`.
    pub fn features_for_range(&self, seqid: &str, query: Range) -> Vec<FeatureRef> {
        let inner = self.inner.read();
        let Some(info) = inner.regions.get(seqid) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        info.tree.iterate_overlapping(query.start, query.end, |id| {
            out.push(Arc::clone(info.tree.data(id)));
            ControlFlow::Continue(())
        });
        sort_features(&mut out);
        out
    }

    /// The widest extent known for a seqid: the dynamic feature range when
    /// features were added, otherwise the declared region range.
    pub fn range_for_seqid(&self, seqid: &str) -> Option<Range> {
        let inner = self.inner.read();
        let info = inner.regions.get(seqid)?;
        match (info.dyn_range, info.region.as_ref()) {
            (Some(dyn_range), _) => Some(dyn_range),
            (None, Some(region)) => Some(region.range()),
            (None, None) => None,
        }
    }

    /// Max of declared and observed extents (invariant 7).
    pub fn effective_range_for_seqid(&self, seqid: &str) -> Option<Range> {
        let inner = self.inner.read();
        let info = inner.regions.get(seqid)?;
        match (info.dyn_range, info.region.as_ref()) {
            (Some(dyn_range), Some(region)) => Some(dyn_range.join(&region.range())),
            (Some(dyn_range), None) => Some(dyn_range),
            (None, Some(region)) => Some(region.range()),
            (None, None) => None,
        }
    }

    pub fn number_of_features(&self, seqid: &str) -> usize {
        self.inner
            .read()
            .regions
            .get(seqid)
            .map_or(0, |info| info.tree.len())
    }
}

fn sort_features(features: &mut [FeatureRef]) {
    features.sort_by_key(|f| (f.range().start, f.line_number()));
}
