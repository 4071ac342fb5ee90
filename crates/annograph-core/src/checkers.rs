//! Pluggable validation hooks consumed by the parser.
//!
//! Checkers are immutable after construction and shared freely; callers
//! pass them as explicit context objects.

use std::collections::{HashMap, HashSet};

/// Feature-type ontology queries.
pub trait TypeChecker: Send + Sync {
    fn is_valid(&self, ftype: &str) -> bool;

    /// Transitive `is_a` relation: is `ftype` (a descendant of) `ancestor`?
    fn is_a(&self, ftype: &str, ancestor: &str) -> bool;

    /// Transitive `part_of` relation between feature types.
    fn is_partof(&self, parent_type: &str, child_type: &str) -> bool;

    fn description(&self) -> &str;
}

/// `Dbxref` / `Ontology_term` value validation.
pub trait XrfChecker: Send + Sync {
    fn is_valid(&self, value: &str) -> bool;
}

/// Table-backed type checker. Ontology file loading lives with the host;
/// this type only answers queries over explicitly registered relations.
#[derive(Debug, Default)]
pub struct BasicTypeChecker {
    description: String,
    valid: HashSet<String>,
    isa: HashMap<String, HashSet<String>>,
    partof: HashMap<String, HashSet<String>>,
}

impl BasicTypeChecker {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Self::default()
        }
    }

    pub fn add_type(&mut self, ftype: &str) {
        self.valid.insert(ftype.to_owned());
    }

    pub fn add_isa(&mut self, child: &str, parent: &str) {
        self.add_type(child);
        self.add_type(parent);
        self.isa
            .entry(child.to_owned())
            .or_default()
            .insert(parent.to_owned());
    }

    pub fn add_partof(&mut self, part: &str, whole: &str) {
        self.add_type(part);
        self.add_type(whole);
        self.partof
            .entry(part.to_owned())
            .or_default()
            .insert(whole.to_owned());
    }

    /// Walk `edges` transitively from `from`, also following `is_a` edges,
    /// looking for `to`.
    fn reaches(
        &self,
        edges: &HashMap<String, HashSet<String>>,
        from: &str,
        to: &str,
    ) -> bool {
        if from == to {
            return true;
        }
        let mut seen = HashSet::new();
        let mut stack = vec![from.to_owned()];
        while let Some(current) = stack.pop() {
            if current == to {
                return true;
            }
            if !seen.insert(current.clone()) {
                continue;
            }
            for next in edges.get(&current).into_iter().flatten() {
                stack.push(next.clone());
            }
            for next in self.isa.get(&current).into_iter().flatten() {
                stack.push(next.clone());
            }
        }
        false
    }
}

impl TypeChecker for BasicTypeChecker {
    fn is_valid(&self, ftype: &str) -> bool {
        self.valid.contains(ftype)
    }

    fn is_a(&self, ftype: &str, ancestor: &str) -> bool {
        self.reaches(&self.isa, ftype, ancestor)
    }

    fn is_partof(&self, parent_type: &str, child_type: &str) -> bool {
        self.reaches(&self.partof, child_type, parent_type)
    }

    fn description(&self) -> &str {
        &self.description
    }
}

/// Prefix-list xref checker: values must look like `DB:accession` with a
/// registered database abbreviation.
#[derive(Debug, Default)]
pub struct PrefixXrfChecker {
    prefixes: HashSet<String>,
}

impl PrefixXrfChecker {
    pub fn new(prefixes: impl IntoIterator<Item = String>) -> Self {
        Self {
            prefixes: prefixes.into_iter().collect(),
        }
    }
}

impl XrfChecker for PrefixXrfChecker {
    fn is_valid(&self, value: &str) -> bool {
        match value.split_once(':') {
            Some((db, acc)) => !acc.is_empty() && self.prefixes.contains(db),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker() -> BasicTypeChecker {
        let mut tc = BasicTypeChecker::new("test ontology");
        tc.add_partof("exon", "mRNA");
        tc.add_partof("mRNA", "gene");
        tc.add_isa("snRNA", "mRNA");
        tc
    }

    #[test]
    fn partof_is_transitive() {
        let tc = checker();
        assert!(tc.is_partof("mRNA", "exon"));
        assert!(tc.is_partof("gene", "exon"));
        assert!(!tc.is_partof("exon", "gene"));
    }

    #[test]
    fn isa_feeds_partof() {
        let tc = checker();
        assert!(tc.is_a("snRNA", "mRNA"));
        // snRNA is_a mRNA, mRNA part_of gene
        assert!(tc.is_partof("gene", "snRNA"));
    }

    #[test]
    fn validity_follows_registration() {
        let tc = checker();
        assert!(tc.is_valid("exon"));
        assert!(!tc.is_valid("chromosome_arm"));
        assert_eq!(tc.description(), "test ontology");
    }

    #[test]
    fn xrf_prefixes() {
        let xrf = PrefixXrfChecker::new(["GO".to_owned(), "EC".to_owned()]);
        assert!(xrf.is_valid("GO:0046703"));
        assert!(!xrf.is_valid("GO:"));
        assert!(!xrf.is_valid("FB:FBgn00003"));
        assert!(!xrf.is_valid("nocolon"));
    }
}
