use crate::core::{NestedError, NestedResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Generated document model: the schema metadata a data-access client ships.
///
/// Only the parts needed to discover relations are modelled; unknown keys are
/// ignored when deserializing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dmmf {
    pub datamodel: Datamodel,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Datamodel {
    #[serde(default)]
    pub models: Vec<ModelMeta>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMeta {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldMeta>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Scalar,
    Object,
    Enum,
    Unsupported,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMeta {
    pub name: String,
    pub kind: FieldKind,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default)]
    pub relation_name: Option<String>,
    #[serde(default)]
    pub is_list: bool,
}

impl FieldMeta {
    pub fn scalar(name: &str, field_type: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: FieldKind::Scalar,
            field_type: field_type.to_string(),
            relation_name: None,
            is_list: false,
        }
    }

    pub fn relation(name: &str, target: &str, relation_name: &str, is_list: bool) -> Self {
        Self {
            name: name.to_string(),
            kind: FieldKind::Object,
            field_type: target.to_string(),
            relation_name: Some(relation_name.to_string()),
            is_list,
        }
    }

    /// Object fields backed by a named relation.
    pub fn is_relation(&self) -> bool {
        self.kind == FieldKind::Object && self.relation_name.is_some()
    }
}

impl Dmmf {
    pub fn new(models: Vec<ModelMeta>) -> Self {
        Self {
            datamodel: Datamodel { models },
        }
    }

    pub fn from_json(source: &str) -> NestedResult<Self> {
        Ok(serde_json::from_str(source)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> NestedResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| {
            NestedError::Configuration(format!(
                "failed to read schema metadata '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&source)
    }
}

/// Anything that can hand out schema metadata, typically a client handle.
pub trait SchemaProvider {
    fn dmmf(&self) -> Option<&Dmmf>;
}

impl SchemaProvider for Dmmf {
    fn dmmf(&self) -> Option<&Dmmf> {
        Some(self)
    }
}

impl SchemaProvider for Option<Dmmf> {
    fn dmmf(&self) -> Option<&Dmmf> {
        self.as_ref()
    }
}
