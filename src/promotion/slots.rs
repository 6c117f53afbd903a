//! Artifact directories: trained, staging and the single production slot

use crate::config::ArtifactsConfig;
use crate::error::{PipelineError, Result};
use crate::utils::{file_name, list_files};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

fn list_artifacts(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    Ok(list_files(dir)?
        .into_iter()
        .filter(|p| file_name(p).ends_with(extension))
        .collect())
}

/// Resolves artifact paths inside the three slot directories
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    trained: PathBuf,
    staging: PathBuf,
    production: PathBuf,
    extension: String,
}

impl ArtifactStore {
    pub fn new(config: &ArtifactsConfig) -> Self {
        Self {
            trained: config.root.join(&config.trained),
            staging: config.root.join(&config.staging),
            production: config.root.join(&config.production),
            extension: config.save_format.clone(),
        }
    }

    pub fn trained_dir(&self) -> &Path {
        &self.trained
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging
    }

    pub fn production(&self) -> ProductionSlot<'_> {
        ProductionSlot {
            dir: &self.production,
            extension: &self.extension,
        }
    }

    pub fn file_name_for(&self, model_name: &str) -> String {
        format!("{}{}", model_name, self.extension)
    }

    pub fn trained_path(&self, model_name: &str) -> PathBuf {
        self.trained.join(self.file_name_for(model_name))
    }

    pub fn staging_path(&self, model_name: &str) -> PathBuf {
        self.staging.join(self.file_name_for(model_name))
    }

    /// Artifact files in a slot directory, sorted by name
    pub fn artifacts_in(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        list_artifacts(dir, &self.extension)
    }

    /// Copy a trained artifact into staging
    pub fn stage(&self, model_name: &str) -> Result<PathBuf> {
        let src = self.trained_path(model_name);
        if !src.exists() {
            return Err(PipelineError::ArtifactNotFound(src));
        }
        std::fs::create_dir_all(&self.staging)?;
        let dst = self.staging_path(model_name);
        std::fs::copy(&src, &dst)?;
        info!(model = model_name, path = %dst.display(), "Staged model");
        Ok(dst)
    }

    /// Remove a model's staging copy. Returns whether one was present.
    pub fn unstage(&self, model_name: &str) -> Result<bool> {
        let path = self.staging_path(model_name);
        if !path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(&path)?;
        warn!(model = model_name, path = %path.display(), "Removed staged copy of promoted model");
        Ok(true)
    }
}

/// The production directory, which must hold exactly one artifact
#[derive(Debug, Clone, Copy)]
pub struct ProductionSlot<'a> {
    dir: &'a Path,
    extension: &'a str,
}

impl<'a> ProductionSlot<'a> {
    pub fn dir(&self) -> &'a Path {
        self.dir
    }

    fn artifacts(&self) -> Result<Vec<PathBuf>> {
        list_artifacts(self.dir, self.extension)
    }

    /// Path of the production artifact. Zero or several artifacts fail with
    /// `AmbiguousProductionModel`.
    pub fn current(&self) -> Result<PathBuf> {
        let mut found = self.artifacts()?;
        if found.len() != 1 {
            return Err(PipelineError::AmbiguousProductionModel {
                dir: self.dir.to_path_buf(),
                found: found.len(),
            });
        }
        Ok(found.remove(0))
    }

    /// Model name of the production artifact
    pub fn current_name(&self) -> Result<String> {
        let path = self.current()?;
        let name = file_name(&path);
        Ok(name.strip_suffix(self.extension).unwrap_or(&name).to_string())
    }

    /// Replace the slot contents with a copy of `src`
    pub fn install(&self, src: &Path) -> Result<PathBuf> {
        if !src.exists() {
            return Err(PipelineError::ArtifactNotFound(src.to_path_buf()));
        }
        std::fs::create_dir_all(self.dir)?;

        for old in self.artifacts()? {
            warn!(path = %old.display(), "Removing previous production model");
            std::fs::remove_file(&old)?;
        }

        let dst = self.dir.join(file_name(src));
        std::fs::copy(src, &dst)?;
        info!(path = %dst.display(), "Installed production model");
        Ok(dst)
    }
}
