//! Factory and configuration
//!
//! ```yaml
//! schema_paths:
//!   - ./schemas
//! validation:
//!   level: input
//!   reformat: true
//! output:
//!   format: json
//!   pretty: true
//! ```

use crate::tree::UpdateObject;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use upc_encoding::{EncodeOptions, OutputFormat};
use upc_ir::Action;
use upc_schema::{SchemaLoader, SchemaRegistry};
use upc_validation::{ValidationConfig, ValidationEngine, ValidationLevel};

/// Configuration of an [`UpdateFactory`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactoryConfig {
    /// Directories holding custom schema files (JSON or YAML)
    pub schema_paths: Vec<PathBuf>,
    /// Validation settings shared by every object the factory creates
    pub validation: ValidationConfig,
    /// Format used by [`UpdateFactory::render`]
    pub output: OutputConfig,
}

/// Default output settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub pretty: bool,
}

impl OutputConfig {
    #[must_use]
    pub fn options(&self) -> EncodeOptions {
        EncodeOptions {
            pretty: self.pretty,
        }
    }
}

impl FactoryConfig {
    /// Parse a JSON configuration document
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the document does not parse.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::config("<json>", e.to_string()))
    }

    /// Parse a YAML configuration document
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the document does not parse.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| Error::config("<yaml>", e.to_string()))
    }

    /// Read a configuration file; the extension picks the parser
    ///
    /// Relative schema paths are resolved against the file's directory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for unreadable or malformed files and for
    /// extensions other than `json`, `yaml` and `yml`.
    pub fn from_file(path: &Path) -> Result<Self> {
        let display = path.display().to_string();
        let content =
            std::fs::read_to_string(path).map_err(|e| Error::config(&display, e.to_string()))?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let parsed = match extension.as_deref() {
            Some("json") => serde_json::from_str::<Self>(&content).map_err(|e| e.to_string()),
            Some("yaml" | "yml") => serde_yaml::from_str::<Self>(&content).map_err(|e| e.to_string()),
            _ => Err("expected a .json, .yaml or .yml file".to_string()),
        };
        let mut config = parsed.map_err(|message| Error::config(&display, message))?;

        if let Some(base) = path.parent() {
            for schema_path in &mut config.schema_paths {
                if schema_path.is_relative() {
                    *schema_path = base.join(&*schema_path);
                }
            }
        }
        Ok(config)
    }
}

/// Creates update objects that share one registry and engine
#[derive(Debug, Clone)]
pub struct UpdateFactory {
    engine: Arc<ValidationEngine>,
    output: OutputConfig,
}

impl UpdateFactory {
    /// Factory over an existing registry with default settings
    #[must_use]
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self {
            engine: Arc::new(ValidationEngine::new(registry)),
            output: OutputConfig::default(),
        }
    }

    /// Factory over the built-in object types
    #[must_use]
    pub fn with_builtins() -> Self {
        Self::new(Arc::new(SchemaRegistry::with_builtins()))
    }

    /// Build the registry and engine a configuration describes
    ///
    /// Schema files found on `schema_paths` are registered on top of the
    /// built-in types.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Schema`] when a schema file cannot be loaded.
    pub fn from_config(config: &FactoryConfig) -> Result<Self> {
        let registry = Arc::new(SchemaRegistry::with_builtins());
        if !config.schema_paths.is_empty() {
            let loader = SchemaLoader::new(Arc::clone(&registry), config.schema_paths.clone());
            let loaded = loader.load_all()?;
            info!("Registered custom object types: {}", loaded.join(", "));
        }

        Ok(Self {
            engine: Arc::new(ValidationEngine::with_config(
                registry,
                config.validation.clone(),
            )),
            output: config.output,
        })
    }

    #[must_use]
    pub fn engine(&self) -> &Arc<ValidationEngine> {
        &self.engine
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        self.engine.registry()
    }

    #[must_use]
    pub fn output_config(&self) -> OutputConfig {
        self.output
    }

    /// Create a root object; see [`UpdateObject::create`]
    ///
    /// # Errors
    ///
    /// Returns [`Error::Schema`] for unknown types and [`Error::Input`] for
    /// bad data.
    pub fn create(
        &self,
        object_type: &str,
        initial_data: Option<&Json>,
        action: Option<Action>,
        level: Option<ValidationLevel>,
    ) -> Result<UpdateObject> {
        UpdateObject::create(
            Arc::clone(&self.engine),
            object_type,
            initial_data,
            action,
            level,
        )
    }

    /// Validate and encode with the configured output settings
    ///
    /// # Errors
    ///
    /// Returns [`Error::Output`] when validation fails.
    pub fn render(&self, object: &UpdateObject) -> Result<String> {
        object.output(self.output.format, &self.output.options())
    }
}
