//! Region nodes: `##sequence-region` declarations.

use std::sync::Arc;

use annograph_error::Location;
use parking_lot::RwLock;

use crate::interner::{InternPool, Sym};
use crate::Range;

pub type RegionRef = Arc<RegionNode>;

/// Declares the extent of a sequence id. Never has children.
#[derive(Debug)]
pub struct RegionNode {
    pool: InternPool,
    seqid: RwLock<Sym>,
    range: RwLock<Range>,
    origin: Location,
}

impl RegionNode {
    pub fn new(pool: &InternPool, seqid: &str, range: Range, origin: Location) -> RegionRef {
        Arc::new(RegionNode {
            pool: pool.clone(),
            seqid: RwLock::new(pool.intern(seqid)),
            range: RwLock::new(range),
            origin,
        })
    }

    pub fn seqid(&self) -> String {
        self.pool.resolve(*self.seqid.read())
    }

    pub fn seqid_sym(&self) -> Sym {
        *self.seqid.read()
    }

    pub fn change_seqid(&self, seqid: &str) {
        *self.seqid.write() = self.pool.intern(seqid);
    }

    pub fn range(&self) -> Range {
        *self.range.read()
    }

    pub fn set_range(&self, range: Range) {
        *self.range.write() = range;
    }

    pub fn origin(&self) -> &Location {
        &self.origin
    }

    pub fn line_number(&self) -> u64 {
        self.origin.line()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_updates_range_in_place() {
        let pool = InternPool::new();
        let region = RegionNode::new(
            &pool,
            "chr1",
            Range::new(1, 1000),
            Location::new("in.gff3", 2),
        );
        assert_eq!(region.seqid(), "chr1");
        region.set_range(Range::new(1, 2000));
        assert_eq!(region.range(), Range::new(1, 2000));
        assert_eq!(region.line_number(), 2);
    }
}
