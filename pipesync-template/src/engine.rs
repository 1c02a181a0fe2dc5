//! `${...}` placeholder evaluation and config rendering.
//!
//! Placeholders are `${name}` or `${nested.name}`; `$${name}` is an escape
//! that renders as the literal text `${name}`. String values are inserted
//! verbatim; any other value is inserted as compact JSON, which is valid
//! YAML flow syntax.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde_json::Value;

use crate::error::{io_err, TemplateError};
use crate::vars::Variables;

fn placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(\$)?\$\{\s*([A-Za-z0-9_.\-]+)\s*\}").expect("placeholder regex is valid")
    })
}

/// Substitute every placeholder in `template` from `vars`.
///
/// Fails with [`TemplateError::Unresolved`] naming each missing variable
/// once, in order of first appearance.
pub fn evaluate(template: &str, vars: &Variables) -> Result<String, TemplateError> {
    let mut missing: Vec<String> = Vec::new();

    let rendered = placeholder().replace_all(template, |caps: &Captures<'_>| {
        let name = &caps[2];
        if caps.get(1).is_some() {
            return format!("${{{name}}}");
        }
        match vars.lookup(name) {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => {
                if !missing.iter().any(|m| m == name) {
                    missing.push(name.to_string());
                }
                caps[0].to_string()
            }
        }
    });

    if !missing.is_empty() {
        return Err(TemplateError::Unresolved { names: missing });
    }
    Ok(rendered.into_owned())
}

/// A pipeline config after variable substitution.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedConfig {
    /// Substituted YAML text.
    pub raw: String,
    /// Parsed structure of `raw`.
    pub config: Value,
}

/// Read `config_path`, apply vars from `vars_paths` (later files win) and
/// parse the result.
pub fn render_config_file(
    config_path: &Path,
    vars_paths: &[PathBuf],
) -> Result<RenderedConfig, TemplateError> {
    let template = std::fs::read_to_string(config_path).map_err(|e| io_err(config_path, e))?;
    let vars = Variables::load_files(vars_paths)?;
    let raw = evaluate(&template, &vars)?;

    let config: Value =
        serde_yaml::from_str(&raw).map_err(|source| TemplateError::ConfigParse {
            path: config_path.to_path_buf(),
            source,
        })?;
    let config = match config {
        Value::Null => Value::Object(Default::default()),
        Value::Object(_) => config,
        _ => {
            return Err(TemplateError::ConfigNotMapping {
                path: config_path.to_path_buf(),
            })
        }
    };

    Ok(RenderedConfig { raw, config })
}
