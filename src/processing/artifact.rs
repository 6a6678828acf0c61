//! Scoped ephemeral files under the pipeline's working directory.
//!
//! A [`TempArtifact`] owns one path named `<prefix><uuid>.txt`. The file is removed when the
//! guard is released or dropped, which covers normal returns, early returns, panics, and a
//! caller-side timeout dropping the future that holds it. Removal failures are logged and never
//! surface as errors.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

/// Errors raised while acquiring a temp artifact.
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// The working directory could not be created or resolved.
    #[error("failed to prepare work directory {path}: {source}")]
    WorkDir {
        /// Directory we attempted to create.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The artifact file could not be written.
    #[error("failed to write temp artifact {path}: {source}")]
    Write {
        /// File we attempted to write.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
}

/// Guard over one ephemeral file.
#[derive(Debug)]
pub struct TempArtifact {
    path: PathBuf,
}

impl TempArtifact {
    /// Create a new file under `work_dir` holding `contents`.
    pub fn create(work_dir: &Path, prefix: &str, contents: &str) -> Result<Self, ArtifactError> {
        let artifact = Self::reserve(work_dir, prefix)?;
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&artifact.path)
            .map_err(|source| ArtifactError::Write {
                path: artifact.path.clone(),
                source,
            })?;
        file.write_all(contents.as_bytes())
            .map_err(|source| ArtifactError::Write {
                path: artifact.path.clone(),
                source,
            })?;
        tracing::debug!(path = %artifact.path.display(), bytes = contents.len(), "Created temp artifact");
        Ok(artifact)
    }

    /// Reserve a unique path under `work_dir` without creating the file.
    ///
    /// Used for output artifacts that an external process is told to write. Whatever ends up at
    /// the path is removed with the guard.
    pub fn reserve(work_dir: &Path, prefix: &str) -> Result<Self, ArtifactError> {
        std::fs::create_dir_all(work_dir).map_err(|source| ArtifactError::WorkDir {
            path: work_dir.to_path_buf(),
            source,
        })?;
        // Absolute so an agent running elsewhere can still find it.
        let dir = work_dir
            .canonicalize()
            .map_err(|source| ArtifactError::WorkDir {
                path: work_dir.to_path_buf(),
                source,
            })?;
        let name = format!("{prefix}{}.txt", Uuid::new_v4().simple());
        Ok(Self {
            path: dir.join(name),
        })
    }

    /// Absolute path of the artifact.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the file now. Equivalent to dropping the guard.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for TempArtifact {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::trace!(path = %self.path.display(), "Removed temp artifact"),
            Err(error) if error.kind() == ErrorKind::NotFound => {}
            Err(error) => tracing::warn!(
                path = %self.path.display(),
                error = %error,
                "Failed to remove temp artifact"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).map(|iter| iter.count()).unwrap_or(0)
    }

    #[test]
    fn create_writes_contents_and_drop_removes() {
        let root = tempfile::tempdir().expect("tempdir");
        let work = root.path().join("work");

        let artifact = TempArtifact::create(&work, "document_", "本文").expect("artifact");
        let name = artifact
            .path()
            .file_name()
            .and_then(|name| name.to_str())
            .expect("file name")
            .to_string();
        assert!(name.starts_with("document_"));
        assert!(name.ends_with(".txt"));
        assert_eq!(std::fs::read_to_string(artifact.path()).unwrap(), "本文");

        drop(artifact);
        assert_eq!(entries(&work), 0);
    }

    #[test]
    fn names_are_unique_per_call() {
        let root = tempfile::tempdir().expect("tempdir");
        let first = TempArtifact::create(root.path(), "doc_", "a").expect("first");
        let second = TempArtifact::create(root.path(), "doc_", "b").expect("second");
        assert_ne!(first.path(), second.path());
        assert_eq!(entries(root.path()), 2);
    }

    #[test]
    fn reserved_path_is_cleaned_when_written_externally() {
        let root = tempfile::tempdir().expect("tempdir");
        let reserved = TempArtifact::reserve(root.path(), "result_").expect("reserve");
        assert!(reserved.path().is_absolute());
        assert!(!reserved.path().exists());

        std::fs::write(reserved.path(), "# output").expect("external write");
        reserved.release();
        assert_eq!(entries(root.path()), 0);
    }

    #[test]
    fn release_tolerates_already_deleted_file() {
        let root = tempfile::tempdir().expect("tempdir");
        let artifact = TempArtifact::create(root.path(), "doc_", "x").expect("artifact");
        std::fs::remove_file(artifact.path()).expect("manual delete");
        artifact.release();
    }

    #[test]
    fn work_dir_failure_is_reported() {
        let root = tempfile::tempdir().expect("tempdir");
        let blocker = root.path().join("file");
        std::fs::write(&blocker, "not a dir").expect("write");

        let error = TempArtifact::create(&blocker.join("work"), "doc_", "x").unwrap_err();
        assert!(matches!(error, ArtifactError::WorkDir { .. }));
    }

    #[test]
    fn panic_while_held_still_removes_file() {
        let root = tempfile::tempdir().expect("tempdir");
        let dir = root.path().to_path_buf();
        let outcome = std::panic::catch_unwind(|| {
            let _artifact = TempArtifact::create(&dir, "doc_", "x").expect("artifact");
            panic!("forced");
        });
        assert!(outcome.is_err());
        assert_eq!(entries(root.path()), 0);
    }
}
