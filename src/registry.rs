//! Schema Registry
//!
//! Named store of schema transformers for applications that normalize
//! records from several origins.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use walkdir::WalkDir;

use crate::config::NormalizerConfig;
use crate::diagnostics::Diagnostics;
use crate::error::{Result, SchemaError};
use crate::schema::{DocumentFormat, Schema};
use crate::transformer::SchemaTransformer;

/// Where a registered schema comes from
#[derive(Debug, Clone)]
pub enum SchemaSource {
    /// An in-memory schema document
    Document(Value),
    /// An already-parsed schema
    Parsed(Schema),
    /// A JSON or YAML schema file
    File(PathBuf),
}

impl From<Value> for SchemaSource {
    fn from(document: Value) -> Self {
        SchemaSource::Document(document)
    }
}

impl From<Schema> for SchemaSource {
    fn from(schema: Schema) -> Self {
        SchemaSource::Parsed(schema)
    }
}

impl From<PathBuf> for SchemaSource {
    fn from(path: PathBuf) -> Self {
        SchemaSource::File(path)
    }
}

impl From<&Path> for SchemaSource {
    fn from(path: &Path) -> Self {
        SchemaSource::File(path.to_path_buf())
    }
}

/// A bare string names a schema file
impl From<&str> for SchemaSource {
    fn from(path: &str) -> Self {
        SchemaSource::File(PathBuf::from(path))
    }
}

impl SchemaSource {
    fn load(self) -> Result<Schema> {
        match self {
            SchemaSource::Document(document) => Schema::from_value(document),
            SchemaSource::Parsed(schema) => Ok(schema),
            SchemaSource::File(path) => Schema::from_file(path),
        }
    }
}

/// The main schema registry
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    /// Transformers by schema name
    schemas: BTreeMap<String, SchemaTransformer>,
    /// Mode used by [`SchemaRegistry::register`]
    strict: bool,
    diagnostics: Option<Arc<dyn Diagnostics>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        tracing::debug!("initialized schema registry");
        Self::default()
    }

    /// Set the strictness applied to schemas registered afterwards
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Set the diagnostics sink given to transformers registered afterwards
    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }

    /// Build a registry from configuration: every file under
    /// `registry.schemas_dir`, then every named entry in `registry.schemas`
    pub fn from_config(config: &NormalizerConfig) -> Result<Self> {
        let mut registry = Self::new().with_strict(config.transform.strict);

        if let Some(dir) = config.schemas_dir() {
            registry.register_dir(dir)?;
        }
        for (name, path) in &config.registry.schemas {
            registry.register(name.clone(), config.resolve_path(path))?;
        }

        Ok(registry)
    }

    /// Register a schema under `name`, replacing any earlier entry
    pub fn register(&mut self, name: impl Into<String>, source: impl Into<SchemaSource>) -> Result<()> {
        let strict = self.strict;
        self.register_with_mode(name, source, strict)
    }

    /// Register a schema with an explicit strict mode
    pub fn register_with_mode(
        &mut self,
        name: impl Into<String>,
        source: impl Into<SchemaSource>,
        strict: bool,
    ) -> Result<()> {
        let name = name.into();
        tracing::info!(schema = %name, strict, "registering schema");

        let transformer = self.build(source.into(), strict)?;
        self.insert(name, transformer);
        Ok(())
    }

    /// Register every `.json`, `.yaml` and `.yml` file under `dir`, keyed by
    /// file stem (a trailing `.schema` is dropped). Returns the names added.
    ///
    /// All files are loaded before any is registered; one bad file leaves the
    /// registry unchanged.
    pub fn register_dir(&mut self, dir: impl AsRef<Path>) -> Result<Vec<String>> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(SchemaError::FileNotFound {
                path: dir.to_path_buf(),
            });
        }

        let mut loaded = Vec::new();
        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.map_err(|e| SchemaError::Io(e.into()))?;
            let path = entry.path();
            if !entry.file_type().is_file() || DocumentFormat::from_path(path).is_err() {
                continue;
            }

            let name = match path.file_stem().and_then(|s| s.to_str()) {
                Some(stem) => stem.trim_end_matches(".schema").to_string(),
                None => continue,
            };
            tracing::debug!(schema = %name, path = %path.display(), "loading schema file");
            loaded.push((name, self.build(SchemaSource::from(path), self.strict)?));
        }

        tracing::info!(dir = %dir.display(), count = loaded.len(), "registering schema directory");
        let mut registered = Vec::with_capacity(loaded.len());
        for (name, transformer) in loaded {
            self.insert(name.clone(), transformer);
            registered.push(name);
        }

        Ok(registered)
    }

    fn build(&self, source: SchemaSource, strict: bool) -> Result<SchemaTransformer> {
        let transformer = SchemaTransformer::new(source.load()?, strict);
        Ok(match &self.diagnostics {
            Some(diagnostics) => transformer.with_diagnostics(Arc::clone(diagnostics)),
            None => transformer,
        })
    }

    fn insert(&mut self, name: String, transformer: SchemaTransformer) {
        if self.schemas.insert(name.clone(), transformer).is_some() {
            tracing::debug!(schema = %name, "replaced existing schema");
        }
    }

    /// Get a registered transformer
    pub fn get(&self, name: &str) -> Option<&SchemaTransformer> {
        self.schemas.get(name)
    }

    /// Transform `data` with the schema registered as `name`
    pub fn transform(&self, name: &str, data: &Value) -> Result<Value> {
        self.get(name)
            .ok_or_else(|| SchemaError::NotFound {
                name: name.to_string(),
            })?
            .transform(data)
    }

    /// Registered schema names, sorted
    pub fn list_schemas(&self) -> Vec<String> {
        self.schemas.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}
