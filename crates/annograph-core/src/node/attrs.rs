//! Insertion-ordered attribute storage for feature nodes.

use smallvec::SmallVec;

/// The column-9 attribute map of a feature line.
///
/// Insertion order is retained so emitted output is stable; lookups are
/// linear, which beats hashing for the handful of attributes real
/// annotation lines carry.
#[derive(Debug, Clone, Default)]
pub struct AttributeMap {
    entries: SmallVec<[(String, String); 4]>,
}

impl AttributeMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, tag: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(t, _)| t == tag)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.get(tag).is_some()
    }

    /// Append a new attribute. The tag must not be present yet; duplicate
    /// handling is a parser policy, not a map concern.
    pub fn add(&mut self, tag: impl Into<String>, value: impl Into<String>) {
        let tag = tag.into();
        debug_assert!(!self.contains(&tag), "duplicate attribute tag {}", tag);
        self.entries.push((tag, value.into()));
    }

    /// Replace an attribute in place, keeping its position; appends when the
    /// tag is not present.
    pub fn set(&mut self, tag: impl Into<String>, value: impl Into<String>) {
        let tag = tag.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(t, _)| *t == tag) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((tag, value)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn tags(&self) -> Vec<String> {
        self.entries.iter().map(|(t, _)| t.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(t, v)| (t.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_insertion_order() {
        let mut attrs = AttributeMap::new();
        attrs.add("ID", "g1");
        attrs.add("Note", "first");
        attrs.add("Alias", "a");
        let tags: Vec<_> = attrs.iter().map(|(t, _)| t.to_owned()).collect();
        assert_eq!(tags, ["ID", "Note", "Alias"]);
    }

    #[test]
    fn set_replaces_in_place() {
        let mut attrs = AttributeMap::new();
        attrs.add("ID", "g1");
        attrs.add("Note", "first");
        attrs.set("ID", "g2");
        assert_eq!(attrs.get("ID"), Some("g2"));
        let tags: Vec<_> = attrs.iter().map(|(t, _)| t.to_owned()).collect();
        assert_eq!(tags, ["ID", "Note"]);
    }

    #[test]
    fn set_appends_missing_tag() {
        let mut attrs = AttributeMap::new();
        attrs.set("Target", "EST1 1 100");
        assert_eq!(attrs.get("Target"), Some("EST1 1 100"));
        assert_eq!(attrs.len(), 1);
    }
}
