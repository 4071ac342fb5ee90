//! Shared string interning for seqid, source and feature-type symbols.
//!
//! Every node in one pipeline shares the same pool, so symbol equality is
//! string equality and the hot comparisons in the parser (seqid checks,
//! type checks) never touch the underlying bytes.

use std::sync::Arc;

use parking_lot::RwLock;
use string_interner::backend::DefaultBackend;
use string_interner::symbol::DefaultSymbol;
use string_interner::StringInterner;

/// Interned string symbol backed by a `StringInterner`.
pub type Sym = DefaultSymbol;

/// Thread-safe, cheaply clonable string pool. Clones share the same
/// underlying interner.
#[derive(Clone, Debug)]
pub struct InternPool {
    interner: Arc<RwLock<StringInterner<DefaultBackend>>>,
}

impl Default for InternPool {
    fn default() -> Self {
        Self::new()
    }
}

impl InternPool {
    pub fn new() -> Self {
        Self {
            interner: Arc::new(RwLock::new(StringInterner::new())),
        }
    }

    /// Intern the provided string and return its symbol.
    #[inline]
    pub fn intern<S: AsRef<str>>(&self, value: S) -> Sym {
        self.interner.write().get_or_intern(value.as_ref())
    }

    /// Look up a symbol without interning. Returns `None` for strings this
    /// pool has never seen.
    pub fn get<S: AsRef<str>>(&self, value: S) -> Option<Sym> {
        self.interner.read().get(value.as_ref())
    }

    /// Resolve an interned symbol back into an owned string.
    pub fn resolve(&self, symbol: Sym) -> String {
        self.interner
            .read()
            .resolve(symbol)
            .expect("symbol from a foreign pool")
            .to_owned()
    }

    /// Resolve a symbol and apply a closure while the borrow is active.
    pub fn with_resolved<R>(&self, symbol: Sym, f: impl FnOnce(&str) -> R) -> R {
        f(self
            .interner
            .read()
            .resolve(symbol)
            .expect("symbol from a foreign pool"))
    }

    pub fn len(&self) -> usize {
        self.interner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_stable() {
        let pool = InternPool::new();
        assert_eq!(pool.intern("chr1"), pool.intern("chr1"));
        assert_ne!(pool.intern("chr1"), pool.intern("chr2"));
    }

    #[test]
    fn resolve_round_trips() {
        let pool = InternPool::new();
        let sym = pool.intern("exon");
        assert_eq!(pool.resolve(sym), "exon");
        assert_eq!(pool.with_resolved(sym, str::len), 4);
    }

    #[test]
    fn clones_share_the_pool() {
        let a = InternPool::new();
        let b = a.clone();
        let sym = a.intern("gene");
        assert_eq!(b.get("gene"), Some(sym));
        assert_eq!(a.len(), 1);
        assert_eq!(b.len(), 1);
    }

    #[test]
    fn get_does_not_intern() {
        let pool = InternPool::new();
        assert_eq!(pool.get("absent"), None);
        assert!(pool.is_empty());
    }
}
