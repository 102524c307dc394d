//! Filesystem-backed artifact source.

use std::io;
use std::path::PathBuf;

use predefine_types::{SourceError, SourceLocator};
use tracing::trace;

use crate::traits::ArtifactSource;

/// File extension of artifacts written by the type-extraction agent.
pub const ARTIFACT_EXTENSION: &str = "classdata";

/// Reads `<locator>/<hash>.classdata`, treating the locator as a directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectoryArtifactSource;

impl DirectoryArtifactSource {
    pub fn new() -> Self {
        Self
    }

    /// Path of the artifact for `hash`, or `None` if `hash` would escape
    /// the directory.
    pub fn artifact_path(locator: &SourceLocator, hash: &str) -> Option<PathBuf> {
        if hash.is_empty() || hash.contains(['/', '\\']) || hash.contains("..") {
            return None;
        }
        Some(
            locator
                .as_path()
                .join(format!("{}.{}", hash, ARTIFACT_EXTENSION)),
        )
    }
}

impl ArtifactSource for DirectoryArtifactSource {
    fn fetch(&self, locator: &SourceLocator, hash: &str) -> Result<Vec<u8>, SourceError> {
        let not_found = || SourceError::NotFound {
            locator: locator.clone(),
            hash: hash.to_string(),
        };
        let path = Self::artifact_path(locator, hash).ok_or_else(not_found)?;
        trace!(path = %path.display(), "Reading artifact");

        std::fs::read(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => not_found(),
            _ => SourceError::Io {
                locator: locator.clone(),
                hash: hash.to_string(),
                source: e,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn reads_artifact_by_hash() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("abc123.classdata"), b"bytes").unwrap();

        let locator = SourceLocator::from(dir.path());
        let bytes = DirectoryArtifactSource::new().fetch(&locator, "abc123").unwrap();
        assert_eq!(bytes, b"bytes");
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let locator = SourceLocator::from(dir.path());
        let err = DirectoryArtifactSource::new()
            .fetch(&locator, "nope")
            .unwrap_err();
        assert!(matches!(err, SourceError::NotFound { .. }));
    }

    #[test]
    fn traversal_is_rejected() {
        let dir = TempDir::new().unwrap();
        let locator = SourceLocator::from(dir.path());
        for hash in ["../secret", "a/b", "a\\b", ".."] {
            let err = DirectoryArtifactSource::new()
                .fetch(&locator, hash)
                .unwrap_err();
            assert!(matches!(err, SourceError::NotFound { .. }), "{}", hash);
        }
    }

    #[test]
    fn directory_in_place_of_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("abc.classdata")).unwrap();
        let locator = SourceLocator::from(dir.path());
        let err = DirectoryArtifactSource::new()
            .fetch(&locator, "abc")
            .unwrap_err();
        assert!(matches!(err, SourceError::Io { .. }));
    }
}
