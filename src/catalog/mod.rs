mod schema;

pub use schema::{Datamodel, Dmmf, FieldKind, FieldMeta, ModelMeta, SchemaProvider};

use crate::config::MiddlewareConfig;
use crate::core::{NestedError, NestedResult};
use lazy_static::lazy_static;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// A relation field of an entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    /// Field name on the owning entity
    pub name: String,
    /// Entity type the field points at
    pub target: String,
}

/// Relation fields per entity type.
///
/// Built once from schema metadata and never mutated afterwards, so clones
/// share the map.
#[derive(Debug, Clone, Default)]
pub struct RelationCatalog {
    relations: Arc<HashMap<String, Vec<Relation>>>,
}

impl RelationCatalog {
    pub fn from_dmmf(dmmf: &Dmmf) -> Self {
        let relations = dmmf
            .datamodel
            .models
            .iter()
            .map(|model| {
                let fields = model
                    .fields
                    .iter()
                    .filter(|field| field.is_relation())
                    .map(|field| Relation {
                        name: field.name.clone(),
                        target: field.field_type.clone(),
                    })
                    .collect();
                (model.name.clone(), fields)
            })
            .collect();

        Self {
            relations: Arc::new(relations),
        }
    }

    /// Build from a client handle; a missing handle or one without metadata is
    /// a configuration error.
    pub fn from_provider(provider: Option<&dyn SchemaProvider>) -> NestedResult<Self> {
        let dmmf = provider.and_then(|p| p.dmmf()).ok_or_else(|| {
            NestedError::Configuration(
                "schema metadata not found on client handle, regenerate the client".to_string(),
            )
        })?;
        Ok(Self::from_dmmf(dmmf))
    }

    /// Relations of `model`, in schema order. Unknown models have none.
    pub fn relations(&self, model: &str) -> &[Relation] {
        self.relations.get(model).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn relation(&self, model: &str, field: &str) -> Option<&Relation> {
        self.relations(model).iter().find(|relation| relation.name == field)
    }
}

lazy_static! {
    static ref GLOBAL_CATALOG: RwLock<Option<RelationCatalog>> = RwLock::new(None);
}

/// Populate the process-wide catalog.
///
/// Without a handle the default metadata named by the environment is loaded.
/// Later calls replace earlier ones.
pub fn init(provider: Option<&dyn SchemaProvider>) -> NestedResult<()> {
    let catalog = match provider {
        Some(provider) => RelationCatalog::from_provider(Some(provider))?,
        None => RelationCatalog::from_dmmf(&MiddlewareConfig::from_env().load_dmmf()?),
    };

    let mut guard = GLOBAL_CATALOG.write().map_err(poisoned)?;
    if guard.is_some() {
        log::warn!("replacing previously initialized relation catalog");
    }
    *guard = Some(catalog);
    Ok(())
}

/// Process-wide catalog, initializing it from the default metadata on first use.
pub fn global() -> NestedResult<RelationCatalog> {
    if let Some(catalog) = GLOBAL_CATALOG.read().map_err(poisoned)?.as_ref() {
        return Ok(catalog.clone());
    }

    init(None)?;
    GLOBAL_CATALOG
        .read()
        .map_err(poisoned)?
        .clone()
        .ok_or_else(|| NestedError::Configuration("relation catalog not initialized".to_string()))
}

pub fn is_initialized() -> bool {
    GLOBAL_CATALOG.read().map(|guard| guard.is_some()).unwrap_or(false)
}

fn poisoned<T>(err: std::sync::PoisonError<T>) -> NestedError {
    NestedError::Configuration(format!("relation catalog lock poisoned: {}", err))
}
