//! Workspace management
//!
//! A workspace is a directory with a `.linefix/` folder holding the
//! config and the session store:
//!
//! ```text
//! .linefix/
//! ├── config.toml           # Workspace configuration
//! ├── sessions/             # One JSON record per session + index
//! └── .gitignore            # Ignores transient fix state
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use thiserror::Error;

use super::config::Config;
use super::kv::FileStore;
use super::session::SessionStore;

const WORKSPACE_DIR: &str = ".linefix";

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("Not in a linefix workspace. Run 'linefix init' first.")]
    NotInWorkspace,
}

/// A linefix workspace
pub struct Workspace {
    root: PathBuf,
    config: Config,
}

impl Workspace {
    /// Opens an existing workspace at the given path
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let dir = root.join(WORKSPACE_DIR);

        if !dir.is_dir() {
            return Err(WorkspaceError::NotInWorkspace.into());
        }

        let config = Config::load(&dir.join("config.toml"))?;

        Ok(Self { root, config })
    }

    /// Opens the workspace at the current directory or a parent
    pub fn open_current() -> Result<Self> {
        let root = Self::find_root().ok_or(WorkspaceError::NotInWorkspace)?;
        Self::open(root)
    }

    /// Initializes a workspace at the given path; idempotent
    pub fn init(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let dir = root.join(WORKSPACE_DIR);

        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create workspace directory: {}", dir.display()))?;

        let sessions_dir = dir.join("sessions");
        fs::create_dir_all(&sessions_dir).with_context(|| {
            format!(
                "Failed to create sessions directory: {}",
                sessions_dir.display()
            )
        })?;

        let config_path = dir.join("config.toml");
        if !config_path.exists() {
            Config::default().save(&config_path)?;
        }

        let gitignore_path = dir.join(".gitignore");
        if !gitignore_path.exists() {
            let gitignore = "# Transient fix state\nsessions/\n";
            fs::write(&gitignore_path, gitignore).with_context(|| {
                format!("Failed to write .gitignore: {}", gitignore_path.display())
            })?;
        }

        Self::open(root)
    }

    /// Returns the workspace root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the `.linefix` directory path
    pub fn dir(&self) -> PathBuf {
        self.root.join(WORKSPACE_DIR)
    }

    /// Returns the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the session store for this workspace
    pub fn sessions(&self) -> SessionStore<FileStore> {
        SessionStore::new(FileStore::new(self.dir().join("sessions")))
    }

    fn find_root() -> Option<PathBuf> {
        let mut dir = std::env::current_dir().ok()?;
        loop {
            if dir.join(WORKSPACE_DIR).is_dir() {
                return Some(dir);
            }
            if !dir.pop() {
                return None;
            }
        }
    }
}
