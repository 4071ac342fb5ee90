//! Per-completion-window ID bookkeeping.

use std::collections::HashMap;
use std::sync::Arc;

use annograph_core::{FeatureNode, FeatureRef};

use crate::defines::{GFF_ID, GFF_PARENT};

/// Maps the `ID` values bound in the current completion window to their
/// features, and IDs to the pseudo roots grouping them.
#[derive(Debug, Default)]
pub struct FeatureInfo {
    id_to_feature: HashMap<String, FeatureRef>,
    id_to_pseudo_parent: HashMap<String, FeatureRef>,
}

impl FeatureInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.id_to_feature.clear();
        self.id_to_pseudo_parent.clear();
    }

    pub fn get(&self, id: &str) -> Option<&FeatureRef> {
        self.id_to_feature.get(id)
    }

    pub fn add(&mut self, id: &str, node: FeatureRef) {
        debug_assert!(!node.is_pseudo());
        self.id_to_feature.insert(id.to_owned(), node);
    }

    pub fn pseudo_parent(&self, id: &str) -> Option<&FeatureRef> {
        self.id_to_pseudo_parent.get(id)
    }

    pub fn add_pseudo_parent(&mut self, id: &str, pseudo: FeatureRef) {
        debug_assert!(pseudo.is_pseudo());
        self.id_to_pseudo_parent.insert(id.to_owned(), pseudo);
    }

    /// Re-point a child's pseudo-parent entry after roots were merged.
    pub fn replace_pseudo_parent(&mut self, child: &FeatureRef, new_pseudo: FeatureRef) {
        debug_assert!(new_pseudo.is_pseudo());
        let id = child
            .attribute(GFF_ID)
            .expect("pseudo-parent children carry an ID");
        self.id_to_pseudo_parent.remove(&id);
        self.add_pseudo_parent(&id, new_pseudo);
    }

    /// Walk `Parent` chains (and the pseudo-parent index) from `id` up to
    /// the root of its connected component.
    pub fn find_root(&self, id: &str) -> FeatureRef {
        // a comma-separated Parent list converges on one root after
        // unification; follow the first entry
        let first = id.split(',').next().unwrap_or(id);
        let this = self
            .id_to_feature
            .get(first)
            .expect("find_root called for a bound ID");
        if let Some(parents) = this.attribute(GFF_PARENT) {
            return self.find_root(&parents);
        }
        if let Some(pseudo) = self.id_to_pseudo_parent.get(first) {
            return Arc::clone(pseudo);
        }
        Arc::clone(this)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use annograph_core::{InternPool, Range, Strand};
    use annograph_error::Location;

    fn feature(pool: &InternPool, line: u64) -> FeatureRef {
        FeatureNode::new(
            pool,
            "chr1",
            "test",
            "gene",
            Range::new(1, 100),
            Strand::Forward,
            Location::new("t.gff3", line),
        )
    }

    #[test]
    fn find_root_follows_parent_chain() {
        let pool = InternPool::new();
        let mut info = FeatureInfo::new();
        let gene = feature(&pool, 1);
        gene.add_attribute("ID", "g1");
        let mrna = feature(&pool, 2);
        mrna.add_attribute("ID", "m1");
        mrna.add_attribute("Parent", "g1");
        info.add("g1", gene.clone());
        info.add("m1", mrna.clone());
        let root = info.find_root("m1");
        assert!(Arc::ptr_eq(&root, &gene));
    }

    #[test]
    fn find_root_lands_on_pseudo_parent() {
        let pool = InternPool::new();
        let mut info = FeatureInfo::new();
        let cds = feature(&pool, 3);
        cds.add_attribute("ID", "c1");
        let pseudo = FeatureNode::new_pseudo(&cds);
        info.add("c1", cds);
        info.add_pseudo_parent("c1", pseudo.clone());
        let root = info.find_root("c1");
        assert!(Arc::ptr_eq(&root, &pseudo));
    }

    #[test]
    fn reset_clears_both_tables() {
        let pool = InternPool::new();
        let mut info = FeatureInfo::new();
        let node = feature(&pool, 1);
        info.add("g1", node.clone());
        info.add_pseudo_parent("g1", FeatureNode::new_pseudo(&node));
        info.reset();
        assert!(info.get("g1").is_none());
        assert!(info.pseudo_parent("g1").is_none());
    }
}
