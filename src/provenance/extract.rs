//! Conversion of a provenance tree into flat component configurations
//!
//! Each configurable object of the tree becomes one [`ComponentConfig`] named after its
//! position in the [`order`](super::order)ing. Nested objects are linked by name, never
//! embedded, so a factory can build them independently and wire them together.

use super::{order, ObjectProvenance, PrimitiveValue, ProvenanceNode, ProvenanceOrdering};
use crate::core::{ReproError, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// One configuration value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Property {
    Value(String),
    List(Vec<String>),
    Map(BTreeMap<String, String>),
    /// Reference to another component by name
    Component(String),
    ComponentList(Vec<String>),
}

/// Named, flat configuration of one component
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentConfig {
    name: String,
    class_name: String,
    properties: BTreeMap<String, Property>,
}

impl ComponentConfig {
    pub fn new(name: impl Into<String>, class_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            class_name: class_name.into(),
            properties: BTreeMap::new(),
        }
    }

    /// Builder-style property setter
    pub fn with_property(mut self, key: impl Into<String>, value: Property) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: Property) {
        self.properties.insert(key.into(), value);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn properties(&self) -> &BTreeMap<String, Property> {
        &self.properties
    }

    pub fn property(&self, key: &str) -> Option<&Property> {
        self.properties.get(key)
    }

    fn malformed(&self, key: &str, message: impl std::fmt::Display) -> ReproError {
        ReproError::reconstruction(&self.name, format!("property '{key}': {message}"))
    }

    /// Scalar property as text
    pub fn get_str(&self, key: &str) -> Result<Option<&str>> {
        match self.properties.get(key) {
            None => Ok(None),
            Some(Property::Value(value)) => Ok(Some(value.as_str())),
            Some(other) => Err(self.malformed(key, format!("expected a value, found {other:?}"))),
        }
    }

    /// Required scalar property as text
    pub fn require_str(&self, key: &str) -> Result<&str> {
        self.get_str(key)?
            .ok_or_else(|| self.malformed(key, "missing required property"))
    }

    /// Scalar property parsed into `T`
    pub fn get_parsed<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get_str(key)? {
            None => Ok(None),
            Some(raw) => raw
                .parse::<T>()
                .map(Some)
                .map_err(|e| self.malformed(key, format!("cannot parse '{raw}': {e}"))),
        }
    }

    pub fn get_f64(&self, key: &str) -> Result<Option<f64>> {
        self.get_parsed(key)
    }

    pub fn get_u64(&self, key: &str) -> Result<Option<u64>> {
        self.get_parsed(key)
    }

    pub fn get_usize(&self, key: &str) -> Result<Option<usize>> {
        self.get_parsed(key)
    }

    pub fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        self.get_parsed(key)
    }

    /// Name of the component referenced by `key`
    pub fn get_component(&self, key: &str) -> Result<Option<&str>> {
        match self.properties.get(key) {
            None => Ok(None),
            Some(Property::Component(name)) => Ok(Some(name.as_str())),
            Some(other) => Err(self.malformed(
                key,
                format!("expected a component reference, found {other:?}"),
            )),
        }
    }
}

/// Extract one configuration per configurable object below `root`
pub fn extract(root: &ObjectProvenance) -> Result<Vec<ComponentConfig>> {
    let ordering = order(root);
    let mut configs = Vec::new();

    for (position, object) in ordering.iter() {
        let name = ordering.name(position);
        if object.class_name().trim().is_empty() {
            return Err(ReproError::Extraction {
                path: name,
                message: "object has an empty class name".to_string(),
            });
        }
        if !object.is_configurable() {
            debug!("Skipping non-configurable {} '{}'", object.kind().as_str(), name);
            continue;
        }

        let mut config = ComponentConfig::new(name.as_str(), object.class_name());
        for (key, node) in object.configured_fields() {
            let path = format!("{name}.{key}");
            let property = to_property(node, &ordering, &path)?;
            config.set_property(key.as_str(), property);
        }
        configs.push(config);
    }

    Ok(configs)
}

fn to_property(
    node: &ProvenanceNode,
    ordering: &ProvenanceOrdering<'_>,
    path: &str,
) -> Result<Property> {
    match node {
        ProvenanceNode::Primitive(value) => Ok(Property::Value(value.to_string())),
        ProvenanceNode::Object(object) => {
            component_name(object, ordering, path).map(Property::Component)
        }
        ProvenanceNode::List(items) => {
            if items.iter().all(|item| matches!(item, ProvenanceNode::Primitive(_))) {
                Ok(Property::List(
                    items
                        .iter()
                        .filter_map(ProvenanceNode::as_primitive)
                        .map(PrimitiveValue::to_string)
                        .collect(),
                ))
            } else if items.iter().all(|item| matches!(item, ProvenanceNode::Object(_))) {
                items
                    .iter()
                    .filter_map(ProvenanceNode::as_object)
                    .enumerate()
                    .map(|(i, object)| component_name(object, ordering, &format!("{path}[{i}]")))
                    .collect::<Result<Vec<_>>>()
                    .map(Property::ComponentList)
            } else {
                Err(ReproError::Extraction {
                    path: path.to_string(),
                    message: "lists must hold only primitives or only objects".to_string(),
                })
            }
        }
        ProvenanceNode::Map(entries) => entries
            .iter()
            .map(|(key, value)| match value {
                ProvenanceNode::Primitive(primitive) => Ok((key.clone(), primitive.to_string())),
                other => Err(ReproError::Extraction {
                    path: format!("{path}.{key}"),
                    message: format!(
                        "maps may only hold primitives, found a {}",
                        other.kind_name()
                    ),
                }),
            })
            .collect::<Result<BTreeMap<_, _>>>()
            .map(Property::Map),
    }
}

fn component_name(
    object: &ObjectProvenance,
    ordering: &ProvenanceOrdering<'_>,
    path: &str,
) -> Result<String> {
    if !object.is_configurable() {
        return Err(ReproError::Extraction {
            path: path.to_string(),
            message: format!(
                "configuration references {} '{}' which is not configurable",
                object.kind().as_str(),
                object.class_name()
            ),
        });
    }
    ordering
        .position_of(object)
        .map(|position| ordering.name(position))
        .ok_or_else(|| ReproError::Extraction {
            path: path.to_string(),
            message: format!("object '{}' is not part of the ordering", object.class_name()),
        })
}
