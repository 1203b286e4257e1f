use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::infra::{
    config::{load, resolve_path, AppConfig},
    contracts::ConfigAdapter,
};

/// Loads `tutorsync.toml`, or the file given with `--config`.
#[derive(Debug, Clone)]
pub struct FileConfigAdapter {
    path: PathBuf,
}

impl FileConfigAdapter {
    pub fn new(path: Option<&Path>) -> Self {
        Self {
            path: resolve_path(path),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigAdapter for FileConfigAdapter {
    fn load(&self) -> Result<AppConfig> {
        Ok(load(Some(&self.path))?)
    }
}
