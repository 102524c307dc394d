//! The predefined-types manifest: which artifacts to submit, and from where.
//!
//! ```json
//! [
//!   {
//!     "type": "agent-extracted",
//!     "classes": [
//!       { "hash": "9f2c...", "nameInfo": "com.example.Foo" }
//!     ]
//!   }
//! ]
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use predefine_engine::PredefinitionRegistry;
use predefine_types::SourceLocator;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ManifestError, Result};

/// Directory, next to the manifest, holding agent-extracted artifacts.
pub const AGENT_EXTRACTED_DIR: &str = "agent-extracted-predefined-classes";

/// Where an origin's artifacts came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OriginKind {
    /// Recorded by the tracing agent into [`AGENT_EXTRACTED_DIR`].
    AgentExtracted,
    /// Any other origin; kept, but it has no known location.
    Other(String),
}

impl From<String> for OriginKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "agent-extracted" => OriginKind::AgentExtracted,
            _ => OriginKind::Other(s),
        }
    }
}

impl From<OriginKind> for String {
    fn from(kind: OriginKind) -> Self {
        kind.to_string()
    }
}

impl fmt::Display for OriginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OriginKind::AgentExtracted => write!(f, "agent-extracted"),
            OriginKind::Other(s) => write!(f, "{}", s),
        }
    }
}

/// One artifact to submit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub hash: String,
    /// Name the artifact was requested under, when recorded.
    #[serde(rename = "nameInfo", default, skip_serializing_if = "Option::is_none")]
    pub name_info: Option<String>,
}

/// A group of artifacts sharing one origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestOrigin {
    #[serde(rename = "type")]
    pub kind: OriginKind,
    #[serde(default)]
    pub classes: Vec<ManifestEntry>,
}

/// A parsed manifest and the directory its origins are relative to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PredefinedManifest {
    origins: Vec<ManifestOrigin>,
    base: Option<PathBuf>,
}

impl PredefinedManifest {
    /// Parse manifest JSON. Origins have no location until [`Self::with_base`].
    pub fn from_json(json: &str) -> Result<Self> {
        let origins: Vec<ManifestOrigin> = serde_json::from_str(json)?;
        Ok(Self {
            origins,
            base: None,
        })
    }

    /// Read and parse a manifest file; origins resolve next to it.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let manifest = Self::from_json(&json)?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        debug!(path = %path.display(), origins = manifest.origins.len(), "Loaded manifest");
        Ok(manifest.with_base(base))
    }

    pub fn with_base(mut self, base: impl Into<PathBuf>) -> Self {
        self.base = Some(base.into());
        self
    }

    pub fn origins(&self) -> &[ManifestOrigin] {
        &self.origins
    }

    pub fn base(&self) -> Option<&Path> {
        self.base.as_deref()
    }

    /// Total number of entries across origins.
    pub fn entry_count(&self) -> usize {
        self.origins.iter().map(|o| o.classes.len()).sum()
    }

    /// Artifact location for `origin`, if it has one.
    pub fn locator_for(&self, origin: &ManifestOrigin) -> Option<SourceLocator> {
        match (&origin.kind, &self.base) {
            (OriginKind::AgentExtracted, Some(base)) => {
                Some(SourceLocator::from(base.join(AGENT_EXTRACTED_DIR).as_path()))
            }
            _ => None,
        }
    }
}

/// Submit every manifest entry, in file order. Stops at the first error.
pub fn register_all(
    registry: &PredefinitionRegistry,
    manifest: &PredefinedManifest,
) -> Result<usize> {
    let mut submitted = 0;
    for origin in manifest.origins() {
        let locator = manifest.locator_for(origin);
        for entry in &origin.classes {
            let hint = entry.name_info.as_deref().unwrap_or_default();
            registry.add(hint, &entry.hash, locator.as_ref())?;
            submitted += 1;
        }
    }
    info!(submitted, "Submitted predefined types from manifest");
    Ok(submitted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"[
        {
            "type": "agent-extracted",
            "classes": [
                { "hash": "aa11", "nameInfo": "com.example.Foo" },
                { "hash": "bb22" }
            ]
        },
        { "type": "custom-origin", "classes": [ { "hash": "cc33" } ] }
    ]"#;

    #[test]
    fn test_parse_sample() {
        let manifest = PredefinedManifest::from_json(SAMPLE).unwrap();
        assert_eq!(manifest.origins().len(), 2);
        assert_eq!(manifest.entry_count(), 3);

        let first = &manifest.origins()[0];
        assert_eq!(first.kind, OriginKind::AgentExtracted);
        assert_eq!(first.classes[0].name_info.as_deref(), Some("com.example.Foo"));
        assert!(first.classes[1].name_info.is_none());
        assert_eq!(
            manifest.origins()[1].kind,
            OriginKind::Other("custom-origin".into())
        );
    }

    #[test]
    fn test_entry_without_hash_is_parse_error() {
        let err = PredefinedManifest::from_json(
            r#"[{"type": "agent-extracted", "classes": [{"nameInfo": "a.Foo"}]}]"#,
        )
        .unwrap_err();
        assert!(matches!(err, ManifestError::Parse(_)));
    }

    #[test]
    fn test_origin_without_classes_is_empty() {
        let manifest = PredefinedManifest::from_json(r#"[{"type": "agent-extracted"}]"#).unwrap();
        assert_eq!(manifest.entry_count(), 0);
    }

    #[test]
    fn test_locator_needs_base_and_known_origin() {
        let manifest = PredefinedManifest::from_json(SAMPLE).unwrap();
        assert!(manifest.locator_for(&manifest.origins()[0]).is_none());

        let manifest = manifest.with_base("/cfg");
        let locator = manifest.locator_for(&manifest.origins()[0]).unwrap();
        assert_eq!(
            locator.as_path(),
            Path::new("/cfg").join(AGENT_EXTRACTED_DIR)
        );
        assert!(manifest.locator_for(&manifest.origins()[1]).is_none());
    }

    #[test]
    fn test_load_uses_manifest_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("predefined-classes-config.json");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let manifest = PredefinedManifest::load(&path).unwrap();
        assert_eq!(manifest.base(), Some(dir.path()));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = PredefinedManifest::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ManifestError::Io { .. }));
    }

    #[test]
    fn test_origin_kind_round_trips_through_json() {
        let json = serde_json::to_string(&OriginKind::AgentExtracted).unwrap();
        assert_eq!(json, "\"agent-extracted\"");
        let other: OriginKind = serde_json::from_str("\"x\"").unwrap();
        assert_eq!(other, OriginKind::Other("x".into()));
    }
}
