//! Structural diff of two provenance trees
//!
//! Children are compared key by key in lexicographic order. Shared primitives are compared
//! by their textual form, shared containers of the same kind are diffed recursively, and
//! keys found on one side only are reported in full, tagged with their side. Sub-trees
//! without differences never appear in the report, so diffing a tree against itself yields
//! an empty report and the rendered JSON is byte-identical across runs.

use super::{ModelProvenance, ProvenanceNode};
use crate::core::{ReproError, Result};
use log::warn;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Which of the two compared trees a one-sided value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Original,
    Reproduced,
}

/// Labels used for the two sides when rendering a report
///
/// The two labels are always distinct, so a changed value keeps both sides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffLabels {
    original: String,
    reproduced: String,
}

impl DiffLabels {
    /// Labels for the two sides; equal labels fall back to `original` / `reproduced`
    pub fn new(original: impl Into<String>, reproduced: impl Into<String>) -> Self {
        let (original, reproduced) = (original.into(), reproduced.into());
        if original == reproduced {
            warn!("Both diff sides are labelled '{original}', using the default labels");
            return Self::default();
        }
        Self {
            original,
            reproduced,
        }
    }

    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn reproduced(&self) -> &str {
        &self.reproduced
    }

    fn label(&self, side: Side) -> &str {
        match side {
            Side::Original => &self.original,
            Side::Reproduced => &self.reproduced,
        }
    }
}

impl Default for DiffLabels {
    fn default() -> Self {
        Self {
            original: "original".to_string(),
            reproduced: "reproduced".to_string(),
        }
    }
}

/// One difference found under a key
#[derive(Debug, Clone, PartialEq)]
pub enum DiffEntry {
    /// A shared primitive with different values
    Changed { old: String, new: String },
    /// A primitive present on one side only
    Only { side: Side, value: String },
    /// Differences inside a shared object or map
    Nested(DiffReport),
    /// Non-empty differences of paired list elements, in list order
    Items(Vec<DiffEntry>),
    /// The two sides hold different kinds of node
    KindMismatch { old_kind: String, new_kind: String },
}

impl DiffEntry {
    fn to_json(&self, labels: &DiffLabels) -> Value {
        match self {
            DiffEntry::Changed { old, new } => pair(labels, old, new),
            DiffEntry::Only { side, value } => {
                let mut map = Map::new();
                map.insert(labels.label(*side).to_string(), Value::String(value.clone()));
                Value::Object(map)
            }
            DiffEntry::Nested(report) => report.to_json(labels),
            DiffEntry::Items(items) => {
                Value::Array(items.iter().map(|i| i.to_json(labels)).collect())
            }
            DiffEntry::KindMismatch { old_kind, new_kind } => {
                let mut map = Map::new();
                map.insert("kind-mismatch".to_string(), pair(labels, old_kind, new_kind));
                Value::Object(map)
            }
        }
    }
}

fn pair(labels: &DiffLabels, old: &str, new: &str) -> Value {
    let mut map = Map::new();
    map.insert(labels.original.clone(), Value::String(old.to_string()));
    map.insert(labels.reproduced.clone(), Value::String(new.to_string()));
    Value::Object(map)
}

/// Differences between two keyed nodes, keyed by child name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiffReport {
    entries: BTreeMap<String, DiffEntry>,
}

impl DiffReport {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, key: &str) -> Option<&DiffEntry> {
        self.entries.get(key)
    }

    /// Keys with differences, in lexicographic order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DiffEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// JSON rendering of the report
    pub fn to_json(&self, labels: &DiffLabels) -> Value {
        let map: Map<String, Value> = self
            .entries
            .iter()
            .map(|(key, entry)| (key.clone(), entry.to_json(labels)))
            .collect();
        Value::Object(map)
    }

    /// Pretty-printed JSON rendering of the report
    pub fn to_pretty_string(&self, labels: &DiffLabels) -> Result<String> {
        serde_json::to_string_pretty(&self.to_json(labels))
            .map_err(|e| ReproError::SerializationError(e.to_string()))
    }
}

/// Diff two keyed provenance nodes (objects or maps)
pub fn diff(original: &ProvenanceNode, reproduced: &ProvenanceNode) -> Result<DiffReport> {
    let left = keyed_children(original).ok_or_else(|| unsupported_root(original))?;
    let right = keyed_children(reproduced).ok_or_else(|| unsupported_root(reproduced))?;
    diff_children(&left, &right, "")
}

/// Diff two model provenances into a pretty JSON report labelled `original` / `reproduced`
pub fn diff_provenance(original: &ModelProvenance, reproduced: &ModelProvenance) -> Result<String> {
    diff_provenance_with_labels(original, reproduced, &DiffLabels::default())
}

/// Diff two model provenances into a pretty JSON report with caller-chosen labels
pub fn diff_provenance_with_labels(
    original: &ModelProvenance,
    reproduced: &ModelProvenance,
    labels: &DiffLabels,
) -> Result<String> {
    diff(&original.to_node(), &reproduced.to_node())?.to_pretty_string(labels)
}

fn unsupported_root(node: &ProvenanceNode) -> ReproError {
    ReproError::UnsupportedDiff {
        path: String::new(),
        message: format!(
            "cannot diff a {} at the root, expected an object or map",
            node.kind_name()
        ),
    }
}

/// Immediate children of an object or map; `None` for other kinds
fn keyed_children(node: &ProvenanceNode) -> Option<BTreeMap<String, ProvenanceNode>> {
    match node {
        ProvenanceNode::Object(object) => Some(object.children().into_iter().collect()),
        ProvenanceNode::Map(entries) => Some(entries.clone()),
        ProvenanceNode::Primitive(_) | ProvenanceNode::List(_) => None,
    }
}

fn child_path(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

fn diff_children(
    left: &BTreeMap<String, ProvenanceNode>,
    right: &BTreeMap<String, ProvenanceNode>,
    path: &str,
) -> Result<DiffReport> {
    let mut report = DiffReport::default();

    for (key, a) in left {
        let entry = match right.get(key) {
            Some(b) => diff_pair(a, b, &child_path(path, key))?,
            None => Some(one_sided(a, Side::Original)),
        };
        if let Some(entry) = entry {
            report.entries.insert(key.clone(), entry);
        }
    }
    for (key, b) in right {
        if !left.contains_key(key) {
            report.entries.insert(key.clone(), one_sided(b, Side::Reproduced));
        }
    }

    Ok(report)
}

fn diff_pair(a: &ProvenanceNode, b: &ProvenanceNode, path: &str) -> Result<Option<DiffEntry>> {
    match (a, b) {
        (ProvenanceNode::Primitive(x), ProvenanceNode::Primitive(y)) => {
            let (old, new) = (x.to_string(), y.to_string());
            Ok((old != new).then_some(DiffEntry::Changed { old, new }))
        }
        (ProvenanceNode::List(xs), ProvenanceNode::List(ys)) => {
            if xs.len() != ys.len() {
                return Err(ReproError::UnsupportedDiff {
                    path: path.to_string(),
                    message: format!("cannot align lists of length {} and {}", xs.len(), ys.len()),
                });
            }
            let mut items = Vec::new();
            for (i, (x, y)) in xs.iter().zip(ys).enumerate() {
                if let Some(entry) = diff_pair(x, y, &format!("{path}[{i}]"))? {
                    items.push(entry);
                }
            }
            Ok((!items.is_empty()).then_some(DiffEntry::Items(items)))
        }
        (ProvenanceNode::Map(_), ProvenanceNode::Map(_)) => nested(a, b, path),
        (ProvenanceNode::Object(x), ProvenanceNode::Object(y)) if x.kind() == y.kind() => {
            nested(a, b, path)
        }
        _ => Ok(Some(DiffEntry::KindMismatch {
            old_kind: a.kind_name().to_string(),
            new_kind: b.kind_name().to_string(),
        })),
    }
}

fn nested(a: &ProvenanceNode, b: &ProvenanceNode, path: &str) -> Result<Option<DiffEntry>> {
    let left = keyed_children(a).unwrap_or_default();
    let right = keyed_children(b).unwrap_or_default();
    let report = diff_children(&left, &right, path)?;
    Ok((!report.is_empty()).then_some(DiffEntry::Nested(report)))
}

/// Render a node found on one side only, in full
fn one_sided(node: &ProvenanceNode, side: Side) -> DiffEntry {
    match node {
        ProvenanceNode::Primitive(value) => DiffEntry::Only {
            side,
            value: value.to_string(),
        },
        ProvenanceNode::List(items) if items.is_empty() => DiffEntry::Only {
            side,
            value: "[]".to_string(),
        },
        ProvenanceNode::List(items) => {
            DiffEntry::Items(items.iter().map(|item| one_sided(item, side)).collect())
        }
        ProvenanceNode::Map(entries) if entries.is_empty() => DiffEntry::Only {
            side,
            value: "{}".to_string(),
        },
        ProvenanceNode::Map(_) | ProvenanceNode::Object(_) => {
            let entries = keyed_children(node)
                .unwrap_or_default()
                .iter()
                .map(|(key, child)| (key.clone(), one_sided(child, side)))
                .collect();
            DiffEntry::Nested(DiffReport { entries })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provenance::{ObjectKind, ObjectProvenance};

    fn map(entries: Vec<(&str, ProvenanceNode)>) -> ProvenanceNode {
        ProvenanceNode::Map(entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }

    fn trainer(c: f64, count: i64) -> ObjectProvenance {
        ObjectProvenance::new(ObjectKind::Trainer, "SVMTrainer")
            .with_configured("c", c)
            .with_configured(
                "kernel",
                ObjectProvenance::new(ObjectKind::Component, "RBFKernel")
                    .with_configured("gamma", 0.5),
            )
            .with_instance("train-invocation-count", count)
    }

    #[test]
    fn test_changed_added_and_unchanged_keys() {
        let a = map(vec![("a", 1i64.into()), ("b", map(vec![("x", "red".into())]))]);
        let b = map(vec![
            ("a", 2i64.into()),
            ("b", map(vec![("x", "red".into())])),
            ("c", 5i64.into()),
        ]);

        let report = diff(&a, &b).unwrap();
        assert_eq!(report.keys().collect::<Vec<_>>(), vec!["a", "c"]);
        assert_eq!(
            report.get("a"),
            Some(&DiffEntry::Changed {
                old: "1".to_string(),
                new: "2".to_string()
            })
        );
        assert_eq!(
            report.get("c"),
            Some(&DiffEntry::Only {
                side: Side::Reproduced,
                value: "5".to_string()
            })
        );

        let json = report.to_pretty_string(&DiffLabels::default()).unwrap();
        let expected = r#"{
  "a": {
    "original": "1",
    "reproduced": "2"
  },
  "c": {
    "reproduced": "5"
  }
}"#;
        assert_eq!(json, expected);
    }

    #[test]
    fn test_self_diff_is_empty() {
        let node = ProvenanceNode::Object(trainer(1.0, 3));
        assert!(diff(&node, &node).unwrap().is_empty());
    }

    #[test]
    fn test_diff_is_symmetric_in_detection() {
        let a = ProvenanceNode::Object(trainer(1.0, 3));
        let b = ProvenanceNode::Object(trainer(2.0, 4));

        let forward = diff(&a, &b).unwrap();
        let backward = diff(&b, &a).unwrap();
        assert_eq!(forward.keys().collect::<Vec<_>>(), backward.keys().collect::<Vec<_>>());
        for (key, entry) in forward.iter() {
            match (entry, backward.get(key)) {
                (
                    DiffEntry::Changed { old, new },
                    Some(DiffEntry::Changed { old: o2, new: n2 }),
                ) => {
                    assert_eq!(old, n2);
                    assert_eq!(new, o2);
                }
                other => panic!("unexpected pairing {other:?}"),
            }
        }
        assert_eq!(forward.keys().collect::<Vec<_>>(), vec!["c", "train-invocation-count"]);
    }

    #[test]
    fn test_nested_objects_are_recursed_and_pruned() {
        let a = ObjectProvenance::new(ObjectKind::Trainer, "SVMTrainer").with_configured(
            "kernel",
            ObjectProvenance::new(ObjectKind::Component, "RBFKernel")
                .with_configured("gamma", 0.5),
        );
        let b = ObjectProvenance::new(ObjectKind::Trainer, "SVMTrainer").with_configured(
            "kernel",
            ObjectProvenance::new(ObjectKind::Component, "RBFKernel")
                .with_configured("gamma", 0.25),
        );

        let report = diff(&a.into(), &b.into()).unwrap();
        let json = report.to_json(&DiffLabels::default());
        assert_eq!(json["kernel"]["gamma"]["original"], "0.5");
        assert_eq!(json["kernel"]["gamma"]["reproduced"], "0.25");
        assert!(json["kernel"].get("class-name").is_none());
    }

    #[test]
    fn test_paired_lists_keep_only_changed_elements() {
        let a = map(vec![(
            "members",
            vec![
                ProvenanceNode::Object(trainer(1.0, 0)),
                ProvenanceNode::Object(trainer(1.0, 0)),
            ]
            .into(),
        )]);
        let b = map(vec![(
            "members",
            vec![
                ProvenanceNode::Object(trainer(1.0, 0)),
                ProvenanceNode::Object(trainer(3.0, 0)),
            ]
            .into(),
        )]);

        let report = diff(&a, &b).unwrap();
        match report.get("members") {
            Some(DiffEntry::Items(items)) => {
                assert_eq!(items.len(), 1);
                assert!(matches!(
                    &items[0],
                    DiffEntry::Nested(r) if r.keys().collect::<Vec<_>>() == vec!["c"]
                ));
            }
            other => panic!("expected items, got {other:?}"),
        }
    }

    #[test]
    fn test_mismatched_list_lengths_are_unsupported() {
        let a = map(vec![("xs", vec![ProvenanceNode::from(1i64)].into())]);
        let b = map(vec![(
            "xs",
            vec![ProvenanceNode::from(1i64), ProvenanceNode::from(2i64)].into(),
        )]);

        match diff(&a, &b) {
            Err(ReproError::UnsupportedDiff { path, .. }) => assert_eq!(path, "xs"),
            other => panic!("expected an unsupported diff, got {other:?}"),
        }
    }

    #[test]
    fn test_kind_mismatch_is_reported_inline() {
        let a = map(vec![("source", ProvenanceNode::Object(trainer(1.0, 0))), ("n", 1i64.into())]);
        let b = map(vec![("source", "inline".into()), ("n", 2i64.into())]);

        let report = diff(&a, &b).unwrap();
        assert_eq!(
            report.get("source"),
            Some(&DiffEntry::KindMismatch {
                old_kind: "trainer".to_string(),
                new_kind: "primitive".to_string()
            })
        );
        assert!(report.get("n").is_some());
    }

    #[test]
    fn test_one_sided_subtrees_are_rendered_in_full() {
        let a = map(vec![]);
        let b = map(vec![
            ("trainer", ProvenanceNode::Object(trainer(1.0, 0))),
            ("tags", vec![ProvenanceNode::from("x")].into()),
            ("empty", ProvenanceNode::List(Vec::new())),
        ]);

        let json = diff(&a, &b).unwrap().to_json(&DiffLabels::new("left", "right"));
        assert_eq!(json["trainer"]["class-name"]["right"], "SVMTrainer");
        assert_eq!(json["trainer"]["kernel"]["gamma"]["right"], "0.5");
        assert_eq!(json["tags"][0]["right"], "x");
        assert_eq!(json["empty"]["right"], "[]");
    }

    #[test]
    fn test_equal_labels_keep_both_values() {
        let labels = DiffLabels::new("m.json", "m.json");
        assert_eq!(labels, DiffLabels::default());

        let a = map(vec![("k", 1i64.into())]);
        let b = map(vec![("k", 2i64.into())]);
        let json = diff(&a, &b).unwrap().to_json(&labels);
        assert_eq!(json["k"]["original"], "1");
        assert_eq!(json["k"]["reproduced"], "2");
    }

    #[test]
    fn test_root_must_be_keyed() {
        let a = ProvenanceNode::from(1i64);
        assert!(matches!(diff(&a, &a), Err(ReproError::UnsupportedDiff { .. })));
    }
}
