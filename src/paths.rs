//! XDG-compliant path resolution for glossa.
//!
//! One quad store is shared by every workspace: workspaces are overlays
//! (working contexts inside the same store), so a workspace on disk is only
//! its TOML registration file.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Errors from path resolution.
#[derive(Debug, Error, Diagnostic)]
pub enum PathError {
    #[error("cannot determine home directory")]
    #[diagnostic(
        code(glossa::paths::no_home),
        help("Set the HOME environment variable or ensure a valid user profile exists.")
    )]
    NoHome,

    #[error("failed to create directory: {path}")]
    #[diagnostic(
        code(glossa::paths::create_dir),
        help("Check that the parent directory exists and you have write permissions.")
    )]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type PathResult<T> = std::result::Result<T, PathError>;

/// Global XDG-compliant directories for glossa.
#[derive(Debug, Clone)]
pub struct GlossaPaths {
    /// `$XDG_CONFIG_HOME/glossa/`
    pub config_dir: PathBuf,
    /// `$XDG_DATA_HOME/glossa/`
    pub data_dir: PathBuf,
    /// `$XDG_STATE_HOME/glossa/`
    pub state_dir: PathBuf,
}

impl GlossaPaths {
    /// Resolve XDG directories from environment variables with standard fallbacks.
    pub fn resolve() -> PathResult<Self> {
        let home = std::env::var("HOME")
            .map(PathBuf::from)
            .map_err(|_| PathError::NoHome)?;

        let config_dir = std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| home.join(".config"))
            .join("glossa");

        let data_dir = std::env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| home.join(".local/share"))
            .join("glossa");

        let state_dir = std::env::var("XDG_STATE_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| home.join(".local/state"))
            .join("glossa");

        Ok(Self {
            config_dir,
            data_dir,
            state_dir,
        })
    }

    /// Root everything under one directory (tests, `--root`).
    pub fn under(root: &std::path::Path) -> Self {
        Self {
            config_dir: root.join("config"),
            data_dir: root.join("data"),
            state_dir: root.join("state"),
        }
    }

    /// The oxigraph store directory.
    pub fn store_dir(&self) -> PathBuf {
        self.data_dir.join("store")
    }

    /// Path to the global config file.
    pub fn global_config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    /// Directory holding workspace registration files.
    pub fn workspaces_dir(&self) -> PathBuf {
        self.config_dir.join("workspaces")
    }

    /// Path to a workspace's config file.
    pub fn workspace_config_file(&self, name: &str) -> PathBuf {
        self.workspaces_dir().join(format!("{name}.toml"))
    }

    /// List all existing workspace names, sorted.
    pub fn list_workspaces(&self) -> Vec<String> {
        let mut names: Vec<String> = match std::fs::read_dir(self.workspaces_dir()) {
            Ok(entries) => entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.extension().is_some_and(|ext| ext == "toml"))
                .filter_map(|p| p.file_stem().and_then(|s| s.to_str()).map(str::to_string))
                .collect(),
            Err(_) => Vec::new(),
        };
        names.sort();
        names
    }

    /// Create all base directories. Idempotent.
    pub fn ensure_dirs(&self) -> PathResult<()> {
        for dir in [
            &self.config_dir,
            &self.data_dir,
            &self.state_dir,
            &self.store_dir(),
            &self.workspaces_dir(),
        ] {
            std::fs::create_dir_all(dir).map_err(|e| PathError::CreateDir {
                path: dir.display().to_string(),
                source: e,
            })?;
        }
        Ok(())
    }
}
