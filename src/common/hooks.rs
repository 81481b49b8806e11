use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Name of the backend file written into the working directory.
pub const GENERATED_FILE_NAME: &str = "00_generated.tf";

/// The generated backend file and its before/after hooks.
#[derive(Debug, Clone)]
pub struct GeneratedFile {
    path: PathBuf,
    content: String,
}

impl GeneratedFile {
    pub fn new(workdir: &Path, content: String) -> Self {
        Self {
            path: workdir.join(GENERATED_FILE_NAME),
            content,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the file, replacing any previous copy.
    pub fn write(&self) -> Result<()> {
        debug!("Writing {} bytes to {}", self.content.len(), self.path.display());
        fs::write(&self.path, &self.content)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        info!("Generated {}", self.path.display());
        Ok(())
    }

    /// Remove the file. Failures are logged, never returned.
    pub fn remove(&self) {
        match fs::remove_file(&self.path) {
            Ok(()) => info!("Removed {}", self.path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("{} already gone", self.path.display())
            }
            Err(e) => warn!("Failed to remove {}: {}", self.path.display(), e),
        }
    }
}

/// Optional before/after hooks around the wrapped command.
#[derive(Debug, Default)]
pub struct Hooks {
    generated: Option<GeneratedFile>,
    cleanup: bool,
}

impl Hooks {
    pub fn new(generated: Option<GeneratedFile>, cleanup: bool) -> Self {
        Self { generated, cleanup }
    }

    pub fn run_before(&self) -> Result<()> {
        match &self.generated {
            Some(file) => file.write(),
            None => {
                debug!("No before hook configured");
                Ok(())
            }
        }
    }

    pub fn run_after(&self) {
        match &self.generated {
            Some(file) if self.cleanup => file.remove(),
            Some(file) => info!("Cleanup disabled, keeping {}", file.path().display()),
            None => debug!("No after hook configured"),
        }
    }
}
