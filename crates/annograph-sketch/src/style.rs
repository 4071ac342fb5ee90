//! Style configuration: typed `(section, key)` queries.

use std::collections::HashMap;

use annograph_core::FeatureRef;
use annograph_error::Error;

/// Outcome of a style query. `NotSet` lets callers fall back to defaults
/// without conflating "absent" with "failed".
#[derive(Debug)]
pub enum StyleResult<T> {
    Found(T),
    NotSet,
    Error(Error),
}

impl<T> StyleResult<T> {
    /// Found value, default on not-set, propagated error otherwise.
    pub fn or_default(self, default: T) -> Result<T, Error> {
        match self {
            StyleResult::Found(value) => Ok(value),
            StyleResult::NotSet => Ok(default),
            StyleResult::Error(err) => Err(err),
        }
    }

    /// Found value as `Some`, not-set as `None`.
    pub fn optional(self) -> Result<Option<T>, Error> {
        match self {
            StyleResult::Found(value) => Ok(Some(value)),
            StyleResult::NotSet => Ok(None),
            StyleResult::Error(err) => Err(err),
        }
    }
}

/// Typed queries against a style configuration. The optional feature
/// context exists for script-backed styles; table-backed styles ignore it.
pub trait Style: Send + Sync {
    fn get_bool(&self, section: &str, key: &str, node: Option<&FeatureRef>) -> StyleResult<bool>;
    fn get_num(&self, section: &str, key: &str, node: Option<&FeatureRef>) -> StyleResult<f64>;
    fn get_str(&self, section: &str, key: &str, node: Option<&FeatureRef>) -> StyleResult<String>;
}

/// TOML-backed style: top-level tables are sections, their entries the
/// keys.
#[derive(Debug, Default)]
pub struct TomlStyle {
    sections: HashMap<String, toml::Table>,
}

impl TomlStyle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_str(text: &str) -> Result<Self, Error> {
        let root: toml::Table = text
            .parse()
            .map_err(|e: toml::de::Error| Error::config(e.to_string()))?;
        let mut sections = HashMap::new();
        for (name, value) in root {
            match value {
                toml::Value::Table(table) => {
                    sections.insert(name, table);
                }
                _ => {
                    return Err(Error::config(format!(
                        "style entry \"{}\" is not a section table",
                        name
                    )));
                }
            }
        }
        Ok(Self { sections })
    }

    /// Set a single value programmatically (tests and defaults).
    pub fn set(&mut self, section: &str, key: &str, value: toml::Value) {
        self.sections
            .entry(section.to_owned())
            .or_default()
            .insert(key.to_owned(), value);
    }

    fn lookup(&self, section: &str, key: &str) -> Option<&toml::Value> {
        self.sections.get(section)?.get(key)
    }
}

impl Style for TomlStyle {
    fn get_bool(&self, section: &str, key: &str, _node: Option<&FeatureRef>) -> StyleResult<bool> {
        match self.lookup(section, key) {
            None => StyleResult::NotSet,
            Some(toml::Value::Boolean(b)) => StyleResult::Found(*b),
            Some(other) => StyleResult::Error(Error::config(format!(
                "style key {}.{} is not a boolean (got {})",
                section,
                key,
                other.type_str()
            ))),
        }
    }

    fn get_num(&self, section: &str, key: &str, _node: Option<&FeatureRef>) -> StyleResult<f64> {
        match self.lookup(section, key) {
            None => StyleResult::NotSet,
            Some(toml::Value::Integer(i)) => StyleResult::Found(*i as f64),
            Some(toml::Value::Float(f)) => StyleResult::Found(*f),
            Some(other) => StyleResult::Error(Error::config(format!(
                "style key {}.{} is not a number (got {})",
                section,
                key,
                other.type_str()
            ))),
        }
    }

    fn get_str(&self, section: &str, key: &str, _node: Option<&FeatureRef>) -> StyleResult<String> {
        match self.lookup(section, key) {
            None => StyleResult::NotSet,
            Some(toml::Value::String(s)) => StyleResult::Found(s.clone()),
            Some(other) => StyleResult::Error(Error::config(format!(
                "style key {}.{} is not a string (got {})",
                section,
                key,
                other.type_str()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STYLE: &str = r#"
[format]
margins = 12
split_lines = true

[exon]
max_show_width = 5000
block_caption = "exon block"
"#;

    #[test]
    fn typed_lookups() {
        let style = TomlStyle::from_str(STYLE).unwrap();
        assert!(matches!(
            style.get_num("format", "margins", None),
            StyleResult::Found(v) if v == 12.0
        ));
        assert!(matches!(
            style.get_bool("format", "split_lines", None),
            StyleResult::Found(true)
        ));
        assert!(matches!(
            style.get_str("exon", "block_caption", None),
            StyleResult::Found(s) if s == "exon block"
        ));
    }

    #[test]
    fn missing_keys_are_not_set() {
        let style = TomlStyle::from_str(STYLE).unwrap();
        assert!(matches!(
            style.get_num("exon", "max_capt_show_width", None),
            StyleResult::NotSet
        ));
        assert!(matches!(
            style.get_num("gene", "max_show_width", None),
            StyleResult::NotSet
        ));
    }

    #[test]
    fn type_mismatch_is_an_error() {
        let style = TomlStyle::from_str(STYLE).unwrap();
        assert!(matches!(
            style.get_bool("exon", "max_show_width", None),
            StyleResult::Error(_)
        ));
    }

    #[test]
    fn or_default_falls_back() {
        let style = TomlStyle::from_str(STYLE).unwrap();
        let v = style
            .get_num("format", "bar_height", None)
            .or_default(15.0)
            .unwrap();
        assert_eq!(v, 15.0);
    }

    #[test]
    fn non_table_top_level_is_rejected() {
        assert!(TomlStyle::from_str("margins = 3").is_err());
    }
}
