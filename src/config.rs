use crate::catalog::Dmmf;
use crate::core::{NestedError, NestedResult};
use std::path::{Path, PathBuf};

/// Environment variable naming the schema metadata file used by implicit
/// initialization.
pub const SCHEMA_ENV_VAR: &str = "NESTED_MIDDLEWARE_SCHEMA";

/// Where the default schema metadata comes from.
///
/// Only consulted when the process-wide catalog is initialized without an
/// explicit client handle.
#[derive(Debug, Clone, Default)]
pub struct MiddlewareConfig {
    /// JSON document model file
    pub schema_path: Option<PathBuf>,
}

impl MiddlewareConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the schema location from `NESTED_MIDDLEWARE_SCHEMA`.
    pub fn from_env() -> Self {
        Self::from_env_var(SCHEMA_ENV_VAR)
    }

    pub fn from_env_var(name: &str) -> Self {
        Self {
            schema_path: std::env::var_os(name)
                .filter(|value| !value.is_empty())
                .map(PathBuf::from),
        }
    }

    /// Set the schema metadata file
    pub fn schema_path(mut self, path: impl AsRef<Path>) -> Self {
        self.schema_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Load and parse the configured schema metadata.
    pub fn load_dmmf(&self) -> NestedResult<Dmmf> {
        let path = self.schema_path.as_ref().ok_or_else(|| {
            NestedError::Configuration(format!(
                "schema metadata not found, point {} at a generated document model file",
                SCHEMA_ENV_VAR
            ))
        })?;
        Dmmf::from_path(path)
    }
}
