//! File system writer and `rustfmt` linter for generated artifacts.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bottle_orm_gen::{Artifact, ArtifactWriter, Error, Linter, Result};
use tokio::{fs, process::Command};

/// Writes artifacts as `<dir>/<module>.rs`.
pub struct FsWriter {
    dir: PathBuf,
}

impl FsWriter {
    /// Creates the output directory. With `clean`, previously generated
    /// `.rs` files in it are removed first.
    pub async fn prepare(dir: impl AsRef<Path>, clean: bool) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).await?;

        if clean {
            let mut entries = fs::read_dir(&dir).await?;
            let mut removed = 0;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == "rs") {
                    fs::remove_file(&path).await?;
                    removed += 1;
                }
            }
            log::info!("Removed {} files from {}", removed, dir.display());
        }

        Ok(Self { dir })
    }

    pub fn path_of(&self, artifact: &Artifact) -> PathBuf {
        self.dir.join(&artifact.file_name)
    }
}

#[async_trait]
impl ArtifactWriter for FsWriter {
    async fn write(&self, artifact: &Artifact) -> Result<()> {
        let path = self.path_of(artifact);
        fs::write(&path, &artifact.contents).await?;
        log::debug!("Wrote {}", path.display());
        Ok(())
    }
}

/// Runs `rustfmt` over the written files.
pub struct RustfmtLinter {
    dir: PathBuf,
}

impl RustfmtLinter {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self { dir: dir.as_ref().to_path_buf() }
    }
}

#[async_trait]
impl Linter for RustfmtLinter {
    async fn lint(&self, artifacts: &[&Artifact]) -> Result<()> {
        let paths: Vec<PathBuf> = artifacts.iter().map(|a| self.dir.join(&a.file_name)).collect();
        let output = Command::new("rustfmt")
            .args(["--edition", "2024"])
            .args(&paths)
            .output()
            .await
            .map_err(|e| Error::Lint(format!("cannot run rustfmt: {}", e)))?;

        if !output.status.success() {
            return Err(Error::Lint(String::from_utf8_lossy(&output.stderr).trim().to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(module: &str) -> Artifact {
        Artifact {
            module: module.to_string(),
            file_name: format!("{}.rs", module),
            contents: format!("pub struct {};\n", module),
        }
    }

    #[tokio::test]
    async fn test_writes_into_created_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("models");

        let writer = FsWriter::prepare(&dir, false).await.unwrap();
        writer.write(&artifact("units")).await.unwrap();

        let written = std::fs::read_to_string(dir.join("units.rs")).unwrap();
        assert_eq!(written, "pub struct units;\n");
    }

    #[tokio::test]
    async fn test_clean_removes_only_rust_files() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("stale.rs"), "").unwrap();
        std::fs::write(tmp.path().join("README.md"), "").unwrap();

        FsWriter::prepare(tmp.path(), true).await.unwrap();

        assert!(!tmp.path().join("stale.rs").exists());
        assert!(tmp.path().join("README.md").exists());
    }
}
