//! Holding pen for features whose `Parent` ids are not (yet) known.

use std::collections::{HashSet, VecDeque};

use annograph_core::FeatureRef;

/// Buffers unresolved features until the end of the completion window (or
/// end of stream), together with the set of parent ids still missing.
#[derive(Debug, Default)]
pub struct Orphanage {
    orphans: VecDeque<FeatureRef>,
    missing_parents: HashSet<String>,
    orphan_ids: HashSet<String>,
}

impl Orphanage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of an orphan. `own_id` registers the orphan's own ID
    /// so later features can recognize orphaned parents;
    /// `missing_parents` lists the parent ids not bound yet.
    pub fn add(
        &mut self,
        orphan: FeatureRef,
        own_id: Option<&str>,
        missing_parents: impl IntoIterator<Item = String>,
    ) {
        debug_assert!(orphan.has_attribute(crate::defines::GFF_PARENT));
        self.orphans.push_back(orphan);
        if let Some(id) = own_id {
            self.orphan_ids.insert(id.to_owned());
        }
        for parent in missing_parents {
            self.missing_parents.insert(parent);
        }
    }

    /// An ID is now bound; it is no longer missing.
    pub fn register_parent(&mut self, parent_id: &str) {
        self.missing_parents.remove(parent_id);
    }

    /// Pop one orphan, FIFO.
    pub fn get_orphan(&mut self) -> Option<FeatureRef> {
        self.orphans.pop_front()
    }

    pub fn parent_is_missing(&self, parent_id: &str) -> bool {
        self.missing_parents.contains(parent_id)
    }

    pub fn is_orphan(&self, id: &str) -> bool {
        self.orphan_ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.orphans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orphans.is_empty()
    }

    /// Drop remaining orphans and forget all bookkeeping.
    pub fn reset(&mut self) {
        self.orphans.clear();
        self.missing_parents.clear();
        self.orphan_ids.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use annograph_core::{FeatureNode, InternPool, Range, Strand};
    use annograph_error::Location;

    fn orphan(pool: &InternPool, parent: &str) -> FeatureRef {
        let node = FeatureNode::new(
            pool,
            "chr1",
            "test",
            "exon",
            Range::new(1, 10),
            Strand::Forward,
            Location::new("t.gff3", 4),
        );
        node.add_attribute("Parent", parent);
        node
    }

    #[test]
    fn orphans_come_back_fifo() {
        let pool = InternPool::new();
        let mut pen = Orphanage::new();
        let a = orphan(&pool, "g1");
        let b = orphan(&pool, "g2");
        pen.add(a.clone(), None, ["g1".to_owned()]);
        pen.add(b.clone(), Some("x1"), ["g2".to_owned()]);
        assert_eq!(pen.len(), 2);
        assert!(pen.is_orphan("x1"));
        assert!(pen.parent_is_missing("g1"));
        let first = pen.get_orphan().unwrap();
        assert!(std::sync::Arc::ptr_eq(&first, &a));
    }

    #[test]
    fn register_parent_clears_missing() {
        let pool = InternPool::new();
        let mut pen = Orphanage::new();
        pen.add(orphan(&pool, "g1"), None, ["g1".to_owned()]);
        assert!(pen.parent_is_missing("g1"));
        pen.register_parent("g1");
        assert!(!pen.parent_is_missing("g1"));
    }

    #[test]
    fn reset_drops_everything() {
        let pool = InternPool::new();
        let mut pen = Orphanage::new();
        pen.add(orphan(&pool, "g1"), Some("o1"), ["g1".to_owned()]);
        pen.reset();
        assert!(pen.is_empty());
        assert!(!pen.is_orphan("o1"));
        assert!(!pen.parent_is_missing("g1"));
    }
}
