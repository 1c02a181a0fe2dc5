//! Name-keyed structural diff of pipeline configs.
//!
//! Elements of `groups`, `resources`, `resource_types` and `jobs` are matched
//! by their `name`, never by list position, so editing one job shows up as a
//! change to that job rather than a removal plus an addition.
//!
//! [`ConfigDiffer`] renders the result for humans. The rendering is for
//! observability only; nothing downstream branches on it.

use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::sync::Mutex;

use colored::Colorize;
use serde_json::Value;
use similar::{ChangeTag, TextDiff};

use crate::error::SyncError;

/// Top-level config collections that are diffed element by element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Groups,
    Resources,
    ResourceTypes,
    Jobs,
}

impl Section {
    pub const ALL: [Section; 4] = [
        Section::Groups,
        Section::Resources,
        Section::ResourceTypes,
        Section::Jobs,
    ];

    /// Config key holding this collection.
    pub fn key(self) -> &'static str {
        match self {
            Section::Groups => "groups",
            Section::Resources => "resources",
            Section::ResourceTypes => "resource_types",
            Section::Jobs => "jobs",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Section::Groups => "group",
            Section::Resources => "resource",
            Section::ResourceTypes => "resource type",
            Section::Jobs => "job",
        }
    }

    fn heading(self) -> &'static str {
        match self {
            Section::Groups => "groups:",
            Section::Resources => "resources:",
            Section::ResourceTypes => "resource types:",
            Section::Jobs => "jobs:",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Removed,
    Changed,
}

/// One element that differs between the old and new config.
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    pub section: Section,
    pub name: String,
    pub kind: ChangeKind,
    pub old: Option<Value>,
    pub new: Option<Value>,
}

/// Elements of `section`, keyed by name. Unnamed elements fall back to
/// their position; for repeated names the first occurrence wins.
fn elements(config: &Value, section: Section) -> Vec<(String, &Value)> {
    let Some(items) = config.get(section.key()).and_then(Value::as_array) else {
        return Vec::new();
    };
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for (index, item) in items.iter().enumerate() {
        let name = item
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("#{index}"));
        if seen.insert(name.clone()) {
            out.push((name, item));
        }
    }
    out
}

/// Equality that ignores number representation: `1`, `1.0` and `1u64` are
/// the same value.
pub fn semantically_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => match (x.as_u64(), y.as_u64()) {
                (Some(x), Some(y)) => x == y,
                _ => x.as_f64() == y.as_f64(),
            },
        },
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(x, y)| semantically_equal(x, y))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(k, v)| y.get(k).is_some_and(|w| semantically_equal(v, w)))
        }
        _ => a == b,
    }
}

/// Compare two configs section by section.
///
/// Within a section, changed and added elements come in the new config's
/// order, followed by removed elements in the old config's order.
pub fn diff_configs(old: &Value, new: &Value) -> Vec<Change> {
    let mut changes = Vec::new();
    for section in Section::ALL {
        let before = elements(old, section);
        let after = elements(new, section);
        let lookup_before: HashMap<&str, &Value> =
            before.iter().map(|(n, v)| (n.as_str(), *v)).collect();
        let lookup_after: HashMap<&str, &Value> =
            after.iter().map(|(n, v)| (n.as_str(), *v)).collect();

        for (name, value) in &after {
            match lookup_before.get(name.as_str()) {
                None => changes.push(Change {
                    section,
                    name: name.clone(),
                    kind: ChangeKind::Added,
                    old: None,
                    new: Some((*value).clone()),
                }),
                Some(previous) if !semantically_equal(previous, value) => changes.push(Change {
                    section,
                    name: name.clone(),
                    kind: ChangeKind::Changed,
                    old: Some((*previous).clone()),
                    new: Some((*value).clone()),
                }),
                Some(_) => {}
            }
        }
        for (name, value) in &before {
            if !lookup_after.contains_key(name.as_str()) {
                changes.push(Change {
                    section,
                    name: name.clone(),
                    kind: ChangeKind::Removed,
                    old: Some((*value).clone()),
                    new: None,
                });
            }
        }
    }
    changes
}

/// Renders diffs to a caller-supplied sink.
pub struct ConfigDiffer {
    out: Mutex<Box<dyn Write + Send>>,
}

impl ConfigDiffer {
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    /// A differ that discards its output.
    pub fn silent() -> Self {
        Self::new(Box::new(std::io::sink()))
    }

    /// Write a human-readable report of `changes` for `pipeline`.
    ///
    /// The report is handed to the sink in one write so that line-based
    /// sinks (such as a redacting writer) never see a partial line. A
    /// failed write is an error; nothing is published without its diff.
    pub fn render(&self, pipeline: &str, changes: &[Change]) -> Result<(), SyncError> {
        let report = render_report(pipeline, changes)?;
        let mut out = self.out.lock().unwrap_or_else(|e| e.into_inner());
        out.write_all(report.as_bytes())
            .and_then(|_| out.flush())
            .map_err(|source| SyncError::DiffOutput {
                pipeline: pipeline.to_string(),
                source,
            })
    }
}

fn to_yaml(value: Option<&Value>) -> Result<String, SyncError> {
    match value {
        Some(v) => Ok(serde_yaml::to_string(v)?),
        None => Ok(String::new()),
    }
}

fn render_report(pipeline: &str, changes: &[Change]) -> Result<String, SyncError> {
    if changes.is_empty() {
        return Ok(format!("pipeline {pipeline} has no changes\n"));
    }

    let mut report = format!("{}\n", format!("pipeline {pipeline}:").bold());
    let mut current: Option<Section> = None;
    for change in changes {
        if current != Some(change.section) {
            report.push_str(&format!("{}\n", change.section.heading().yellow()));
            current = Some(change.section);
        }
        let verb = match change.kind {
            ChangeKind::Added => "has been added",
            ChangeKind::Removed => "has been removed",
            ChangeKind::Changed => "has changed",
        };
        report.push_str(&format!(
            "  {}\n",
            format!("{} {} {verb}:", change.section.label(), change.name).yellow()
        ));

        let before = to_yaml(change.old.as_ref())?;
        let after = to_yaml(change.new.as_ref())?;
        for line in TextDiff::from_lines(&before, &after).iter_all_changes() {
            let text = line.value().trim_end_matches('\n');
            let rendered = match line.tag() {
                ChangeTag::Delete => format!("- {text}").red().to_string(),
                ChangeTag::Insert => format!("+ {text}").green().to_string(),
                ChangeTag::Equal => format!("  {text}"),
            };
            report.push_str("    ");
            report.push_str(&rendered);
            report.push('\n');
        }
    }
    Ok(report)
}
