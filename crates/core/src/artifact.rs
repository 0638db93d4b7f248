//! Artifact storage
//!
//! Submitted plan sources are written here for the compiler driver to pick up.

use std::path::{Path, PathBuf};

use tracing::{debug, error};

use crate::{Error, Result};

/// Extension of the generated plan sources
pub const SOURCE_EXTENSION: &str = "cpp";

/// Directory of `<name>.cpp` plan sources
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the artifact directory if it does not exist yet
    pub async fn ensure_dir(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    /// Path of the artifact called `name`.
    ///
    /// Names are limited to ASCII alphanumerics, `_` and `-`.
    pub fn path_for(&self, name: &str) -> Result<PathBuf> {
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(Error::InvalidArtifactName(name.to_string()));
        }

        Ok(self.dir.join(format!("{}.{}", name, SOURCE_EXTENSION)))
    }

    /// Write `source` to the artifact called `name`, replacing any previous contents
    pub async fn write(&self, name: &str, source: &str) -> Result<PathBuf> {
        let path = self.path_for(name)?;
        debug!("Writing {} bytes to {:?}", source.len(), path);

        if let Err(source_err) = tokio::fs::write(&path, source.as_bytes()).await {
            error!("Writing query source to {:?} failed: {}", path, source_err);
            return Err(Error::ArtifactWrite {
                path,
                source: source_err,
            });
        }

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_is_byte_for_byte() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());
        let source = "int main(){}\n// ünïcode\r\n\ttabs ";

        let path = store.write("rel", source).await.unwrap();

        assert_eq!(path, dir.path().join("rel.cpp"));
        assert_eq!(tokio::fs::read(&path).await.unwrap(), source.as_bytes());
    }

    #[tokio::test]
    async fn test_write_replaces_previous_contents() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());

        store.write("q1", "a much longer first version").await.unwrap();
        let path = store.write("q1", "short").await.unwrap();

        assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), "short");
    }

    #[test]
    fn test_rejects_names_that_escape_the_directory() {
        let store = ArtifactStore::new("/tmp/artifacts");
        for name in ["", "../etc/passwd", "a/b", "a.b", "with space", ".."] {
            assert!(
                matches!(store.path_for(name), Err(Error::InvalidArtifactName(_))),
                "{:?} should be rejected",
                name
            );
        }
        assert!(store.path_for("grappa_q-12").is_ok());
    }

    #[tokio::test]
    async fn test_missing_directory_is_a_write_failure() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path().join("missing"));

        let err = store.write("rel", "x").await.unwrap_err();
        assert!(matches!(err, Error::ArtifactWrite { .. }));
        assert_eq!(err.status_code(), 500);
    }

    #[tokio::test]
    async fn test_ensure_dir_creates_directory() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path().join("nested").join("env"));

        store.ensure_dir().await.unwrap();
        store.write("rel", "x").await.unwrap();
        assert!(store.dir().join("rel.cpp").exists());
    }
}
