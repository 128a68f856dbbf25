//! Workspace overlay: working-copy contexts that shadow canonical ones.
//!
//! A workspace maps some vocabularies to a *working context*. Reads and writes
//! of a mapped vocabulary go to its working context; every other vocabulary
//! resolves to its canonical context. The registry is process-wide; each
//! operation takes an immutable [`WorkspaceMetadata`] snapshot at its start so
//! resolution stays stable for the whole operation.
//!
//! Registrations are persisted as TOML in `$XDG_CONFIG_HOME/glossa/workspaces/`.

use std::collections::BTreeMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::path::PathBuf;
use std::sync::RwLock;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::context::{ContextId, Iri};
use crate::error::ConfigError;
use crate::paths::GlossaPaths;

/// Errors from workspace operations.
#[derive(Debug, Error, Diagnostic)]
pub enum WorkspaceError {
    #[error("workspace \"{name}\" already exists")]
    #[diagnostic(
        code(glossa::workspace::already_exists),
        help("Use a different name or delete the existing workspace first.")
    )]
    AlreadyExists { name: String },

    #[error("workspace \"{name}\" not found")]
    #[diagnostic(
        code(glossa::workspace::not_found),
        help("Create it with `glossa workspace create {name}` or list workspaces with `glossa workspace list`.")
    )]
    NotFound { name: String },

    #[error("failed to read workspace config: {path}")]
    #[diagnostic(
        code(glossa::workspace::config_read),
        help("Ensure the config file exists and is valid TOML.")
    )]
    ConfigRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse workspace config: {path}")]
    #[diagnostic(
        code(glossa::workspace::config_parse),
        help("Check the TOML syntax in the workspace config file. {message}")
    )]
    ConfigParse { path: String, message: String },

    #[error("failed to write workspace config: {path}")]
    #[diagnostic(
        code(glossa::workspace::config_write),
        help("Ensure you have write permissions to the config directory.")
    )]
    ConfigWrite {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to delete workspace \"{name}\": {message}")]
    #[diagnostic(
        code(glossa::workspace::delete_failed),
        help("Ensure you have write permissions to the config directory.")
    )]
    DeleteFailed { name: String, message: String },
}

pub type WorkspaceResult<T> = std::result::Result<T, WorkspaceError>;

/// Reject anything that is not shaped like a BCP 47 tag.
pub fn check_language(tag: &str) -> Result<(), ConfigError> {
    let valid = !tag.is_empty()
        && tag.split('-').all(|part| {
            (1..=8).contains(&part.len()) && part.chars().all(|c| c.is_ascii_alphanumeric())
        })
        && tag
            .split('-')
            .next()
            .is_some_and(|primary| primary.chars().all(|c| c.is_ascii_alphabetic()));
    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidLanguage {
            tag: tag.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Immutable snapshot of a workspace's vocabulary → working-context mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkspaceMetadata {
    name: String,
    working: BTreeMap<Iri, ContextId>,
}

impl WorkspaceMetadata {
    pub fn new(name: impl Into<String>, working: BTreeMap<Iri, ContextId>) -> Self {
        Self {
            name: name.into(),
            working,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The context to read and write `vocabulary` in: its working context if
    /// registered, otherwise its canonical context. Total and pure.
    pub fn resolve(&self, vocabulary: &Iri) -> ContextId {
        self.working
            .get(vocabulary)
            .cloned()
            .unwrap_or_else(|| ContextId::canonical(vocabulary))
    }

    /// The registered working context, if any.
    pub fn working_context(&self, vocabulary: &Iri) -> Option<&ContextId> {
        self.working.get(vocabulary)
    }

    pub fn is_editable(&self, vocabulary: &Iri) -> bool {
        self.working.contains_key(vocabulary)
    }

    /// All registrations, ordered by vocabulary.
    pub fn registrations(&self) -> impl Iterator<Item = (&Iri, &ContextId)> {
        self.working.iter()
    }

    /// Whether `context` is the working context of some registered vocabulary.
    pub fn is_working_context(&self, context: &ContextId) -> bool {
        self.working.values().any(|c| c == context)
    }

    /// Stable hash of the mapping; listings cached under different
    /// fingerprints never mix.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.working.hash(&mut hasher);
        hasher.finish()
    }
}

/// Process-wide registry of the active workspace's working contexts.
pub struct WorkspaceRegistry {
    name: String,
    working: RwLock<BTreeMap<Iri, ContextId>>,
}

impl WorkspaceRegistry {
    /// Empty registry: everything resolves canonically.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            working: RwLock::new(BTreeMap::new()),
        }
    }

    /// Build a registry from persisted registrations.
    pub fn from_config(config: &WorkspaceConfig) -> Result<Self, ConfigError> {
        let registry = Self::new(config.name.clone());
        for reg in &config.editable {
            registry.register_editable_vocabulary(&reg.vocabulary, &reg.context)?;
        }
        Ok(registry)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register `context` as the working context of `vocabulary`.
    ///
    /// Re-registering the same pair is a no-op. A vocabulary may have only one
    /// working context, and a working context serves only one vocabulary.
    pub fn register_editable_vocabulary(
        &self,
        vocabulary: &Iri,
        context: &ContextId,
    ) -> Result<(), ConfigError> {
        let mut working = self.working.write().expect("workspace registry lock poisoned");
        if let Some(existing) = working.get(vocabulary) {
            if existing == context {
                return Ok(());
            }
            return Err(ConfigError::ConflictingRegistration {
                vocabulary: vocabulary.to_string(),
                existing: existing.to_string(),
                requested: context.to_string(),
            });
        }
        if let Some((holder, _)) = working.iter().find(|(_, c)| *c == context) {
            return Err(ConfigError::ContextInUse {
                context: context.to_string(),
                holder: holder.to_string(),
                vocabulary: vocabulary.to_string(),
            });
        }
        working.insert(vocabulary.clone(), context.clone());
        tracing::info!(
            workspace = %self.name,
            vocabulary = %vocabulary,
            context = %context,
            "registered editable vocabulary"
        );
        Ok(())
    }

    /// Drop the registration of `vocabulary`, returning the old working context.
    pub fn clear(&self, vocabulary: &Iri) -> Option<ContextId> {
        let removed = self
            .working
            .write()
            .expect("workspace registry lock poisoned")
            .remove(vocabulary);
        if let Some(ctx) = &removed {
            tracing::info!(workspace = %self.name, vocabulary = %vocabulary, context = %ctx, "cleared editable vocabulary");
        }
        removed
    }

    pub fn clear_all(&self) {
        self.working
            .write()
            .expect("workspace registry lock poisoned")
            .clear();
    }

    /// Snapshot of the current mapping.
    pub fn current_workspace_metadata(&self) -> WorkspaceMetadata {
        let working = self
            .working
            .read()
            .expect("workspace registry lock poisoned")
            .clone();
        WorkspaceMetadata::new(self.name.clone(), working)
    }

    /// Persistable registrations.
    pub fn registrations(&self) -> Vec<Registration> {
        self.working
            .read()
            .expect("workspace registry lock poisoned")
            .iter()
            .map(|(vocabulary, context)| Registration {
                vocabulary: vocabulary.clone(),
                context: context.clone(),
            })
            .collect()
    }
}

impl std::fmt::Debug for WorkspaceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkspaceRegistry")
            .field("name", &self.name)
            .field("registrations", &self.registrations().len())
            .finish()
    }
}

/// The per-operation parameters every repository call takes: the workspace
/// snapshot, the display language and the acting author.
#[derive(Debug, Clone)]
pub struct OperationScope {
    metadata: WorkspaceMetadata,
    language: String,
    author: Option<String>,
}

impl OperationScope {
    pub fn new(metadata: WorkspaceMetadata, language: impl Into<String>) -> Self {
        Self {
            metadata,
            language: language.into(),
            author: None,
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn metadata(&self) -> &WorkspaceMetadata {
        &self.metadata
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn author(&self) -> Option<&str> {
        self.author.as_deref()
    }

    /// See [`WorkspaceMetadata::resolve`].
    pub fn resolve(&self, vocabulary: &Iri) -> ContextId {
        self.metadata.resolve(vocabulary)
    }
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

/// One editable vocabulary registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub vocabulary: Iri,
    pub context: ContextId,
}

/// Per-workspace configuration, persisted as TOML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Workspace name.
    pub name: String,
    /// Display language for labels and ordering.
    #[serde(default = "default_language")]
    pub language: String,
    /// Author recorded on change records.
    #[serde(default)]
    pub author: Option<String>,
    /// Editable vocabularies and their working contexts.
    #[serde(default)]
    pub editable: Vec<Registration>,
}

fn default_language() -> String {
    "en".into()
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            name: "default".into(),
            language: default_language(),
            author: None,
            editable: Vec::new(),
        }
    }
}

impl WorkspaceConfig {
    /// Create a config with a specific name (other fields default).
    pub fn with_name(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Convert to a thesaurus configuration over the shared store in `paths`.
    pub fn to_thesaurus_config(&self, paths: &GlossaPaths) -> crate::engine::ThesaurusConfig {
        crate::engine::ThesaurusConfig {
            data_dir: Some(paths.store_dir()),
            language: self.language.clone(),
            ..Default::default()
        }
    }

    /// Load from a TOML file.
    pub fn load(path: &std::path::Path) -> WorkspaceResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| WorkspaceError::ConfigRead {
            path: path.display().to_string(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| WorkspaceError::ConfigParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Save to a TOML file.
    pub fn save(&self, path: &std::path::Path) -> WorkspaceResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| WorkspaceError::ConfigParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| WorkspaceError::ConfigWrite {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| WorkspaceError::ConfigWrite {
            path: path.display().to_string(),
            source: e,
        })
    }
}

/// Workspace manager: create, list, load, save, delete workspace files.
pub struct WorkspaceManager {
    paths: GlossaPaths,
}

impl WorkspaceManager {
    pub fn new(paths: GlossaPaths) -> Self {
        Self { paths }
    }

    /// Create a new workspace file.
    pub fn create(&self, config: WorkspaceConfig) -> WorkspaceResult<PathBuf> {
        let path = self.paths.workspace_config_file(&config.name);
        if path.exists() {
            return Err(WorkspaceError::AlreadyExists {
                name: config.name.clone(),
            });
        }
        config.save(&path)?;
        Ok(path)
    }

    /// List all workspace names.
    pub fn list(&self) -> Vec<String> {
        self.paths.list_workspaces()
    }

    /// Load a workspace's config. The `default` workspace exists implicitly.
    pub fn load(&self, name: &str) -> WorkspaceResult<WorkspaceConfig> {
        let path = self.paths.workspace_config_file(name);
        if path.exists() {
            WorkspaceConfig::load(&path)
        } else if name == "default" {
            Ok(WorkspaceConfig::default())
        } else {
            Err(WorkspaceError::NotFound {
                name: name.to_string(),
            })
        }
    }

    /// Persist the registry's current registrations into the workspace file.
    pub fn save_registrations(
        &self,
        config: &WorkspaceConfig,
        registry: &WorkspaceRegistry,
    ) -> WorkspaceResult<()> {
        let updated = WorkspaceConfig {
            editable: registry.registrations(),
            ..config.clone()
        };
        updated.save(&self.paths.workspace_config_file(&config.name))
    }

    /// Delete a workspace file. Data in working contexts is left in the store.
    pub fn delete(&self, name: &str) -> WorkspaceResult<()> {
        let path = self.paths.workspace_config_file(name);
        if !path.exists() {
            return Err(WorkspaceError::NotFound {
                name: name.to_string(),
            });
        }
        std::fs::remove_file(&path).map_err(|e| WorkspaceError::DeleteFailed {
            name: name.to_string(),
            message: e.to_string(),
        })
    }

    /// Get the underlying paths.
    pub fn paths(&self) -> &GlossaPaths {
        &self.paths
    }
}
