//! Template variables loaded from YAML vars files.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::{io_err, TemplateError};

/// Name → value bindings available to `${...}` placeholders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Variables {
    values: BTreeMap<String, Value>,
}

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Look up `name`, falling back to a dotted path into nested mappings
    /// (`${db.host}` → `db: {host: ...}`).
    pub fn lookup(&self, name: &str) -> Option<&Value> {
        if let Some(v) = self.values.get(name) {
            return Some(v);
        }
        let mut parts = name.split('.');
        let mut current = self.values.get(parts.next()?)?;
        for part in parts {
            current = current.as_object()?.get(part)?;
        }
        Some(current)
    }

    /// Overlay `other` on top of `self`; `other` wins on key collision.
    pub fn merge(mut self, other: Variables) -> Self {
        self.values.extend(other.values);
        self
    }

    /// Parse a YAML vars document. An empty document yields no variables.
    pub fn from_yaml(contents: &str, path: &Path) -> Result<Self, TemplateError> {
        let parsed: Value =
            serde_yaml::from_str(contents).map_err(|source| TemplateError::VarsParse {
                path: path.to_path_buf(),
                source,
            })?;
        match parsed {
            Value::Null => Ok(Self::new()),
            Value::Object(map) => Ok(Self {
                values: map.into_iter().collect(),
            }),
            _ => Err(TemplateError::VarsNotMapping {
                path: path.to_path_buf(),
            }),
        }
    }

    pub fn load_from_file(path: &Path) -> Result<Self, TemplateError> {
        let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
        Self::from_yaml(&contents, path)
    }

    /// Load and merge `paths` in order; later files override earlier ones.
    pub fn load_files(paths: &[PathBuf]) -> Result<Self, TemplateError> {
        paths.iter().try_fold(Self::new(), |acc, path| {
            Ok(acc.merge(Self::load_from_file(path)?))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_document_has_no_variables() {
        let vars = Variables::from_yaml("", Path::new("empty.yml")).unwrap();
        assert!(vars.is_empty());
    }

    #[test]
    fn list_document_is_rejected() {
        let err = Variables::from_yaml("- a\n- b\n", Path::new("list.yml")).unwrap_err();
        assert!(matches!(err, TemplateError::VarsNotMapping { .. }));
    }

    #[test]
    fn later_merge_wins() {
        let a = Variables::from_yaml("branch: main\nrepo: api\n", Path::new("a.yml")).unwrap();
        let b = Variables::from_yaml("branch: release\n", Path::new("b.yml")).unwrap();
        let merged = a.merge(b);
        assert_eq!(merged.lookup("branch"), Some(&json!("release")));
        assert_eq!(merged.lookup("repo"), Some(&json!("api")));
    }

    #[test]
    fn dotted_lookup_walks_nested_mappings() {
        let vars =
            Variables::from_yaml("db:\n  host: pg.internal\n  port: 5432\n", Path::new("v.yml"))
                .unwrap();
        assert_eq!(vars.lookup("db.host"), Some(&json!("pg.internal")));
        assert_eq!(vars.lookup("db.port"), Some(&json!(5432)));
        assert_eq!(vars.lookup("db.user"), None);
    }
}
