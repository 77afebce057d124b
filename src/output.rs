//! Writing a compiled unit to disk.
//!
//! Generated files are always overwritten. The writer never touches files
//! it did not produce.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::dts::render_dts;
use crate::emit::SourceUnit;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("failed to create output directory `{}`", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write `{}`", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize manifest")]
    Manifest(#[from] serde_json::Error),
}

/// Writer for the files of one compiled module.
#[derive(Debug, Clone)]
pub struct OutputWriter {
    dir: PathBuf,
    emit_dts: bool,
    emit_manifest: bool,
}

/// Paths written by [`OutputWriter::write`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteResult {
    /// Path to the generated C++ source.
    pub source_path: PathBuf,
    /// Path to the manifest JSON, if written.
    pub manifest_path: Option<PathBuf>,
    /// Path to the TypeScript declarations, if written.
    pub dts_path: Option<PathBuf>,
}

impl WriteResult {
    /// Every written path, source first.
    pub fn paths(&self) -> Vec<&Path> {
        std::iter::once(self.source_path.as_path())
            .chain(self.manifest_path.as_deref())
            .chain(self.dts_path.as_deref())
            .collect()
    }
}

impl OutputWriter {
    /// Create a writer targeting `dir`. Only the source file is written
    /// unless enabled otherwise.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            emit_dts: false,
            emit_manifest: false,
        }
    }

    pub fn with_dts(mut self, enabled: bool) -> Self {
        self.emit_dts = enabled;
        self
    }

    pub fn with_manifest(mut self, enabled: bool) -> Self {
        self.emit_manifest = enabled;
        self
    }

    /// Write `unit` as `<module>.cc`, plus `<module>.manifest.json` and
    /// `<module>.d.ts` when enabled.
    pub fn write(&self, unit: &SourceUnit) -> Result<WriteResult, OutputError> {
        if !self.dir.as_os_str().is_empty() {
            fs::create_dir_all(&self.dir).map_err(|source| OutputError::CreateDir {
                path: self.dir.clone(),
                source,
            })?;
        }

        let stem = unit.manifest.module.as_str();
        let source_path = self.dir.join(format!("{}.cc", stem));
        write_file(&source_path, &unit.code)?;

        let manifest_path = if self.emit_manifest {
            let path = self.dir.join(format!("{}.manifest.json", stem));
            let mut json = unit.manifest.to_json()?;
            json.push('\n');
            write_file(&path, &json)?;
            Some(path)
        } else {
            None
        };

        let dts_path = if self.emit_dts {
            let path = self.dir.join(format!("{}.d.ts", stem));
            write_file(&path, &render_dts(&unit.manifest))?;
            Some(path)
        } else {
            None
        };

        Ok(WriteResult {
            source_path,
            manifest_path,
            dts_path,
        })
    }
}

fn write_file(path: &Path, content: &str) -> Result<(), OutputError> {
    debug!(path = %path.display(), bytes = content.len(), "writing");
    fs::write(path, content).map_err(|source| OutputError::Write {
        path: path.to_path_buf(),
        source,
    })
}
