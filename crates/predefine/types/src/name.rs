use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Fully qualified, dot-separated type name (`java.lang.Object`).
///
/// Artifacts store names in internal form (`java/lang/Object`); use
/// [`TypeName::from_internal`] when reading them.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeName(String);

impl TypeName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Convert an internal slash-separated name to dotted form.
    pub fn from_internal(internal: &str) -> Self {
        Self(internal.replace('/', "."))
    }

    /// Internal slash-separated form.
    pub fn to_internal(&self) -> String {
        self.0.replace('.', "/")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TypeName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for TypeName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Opaque identity of a type defined in the host environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TypeHandle(u64);

impl TypeHandle {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "type#{}", self.0)
    }
}

/// Where an artifact can be fetched from.
///
/// Interpretation belongs to the artifact source; the directory source
/// treats it as a directory path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceLocator(String);

impl SourceLocator {
    pub fn new(location: impl Into<String>) -> Self {
        Self(location.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_path(&self) -> &Path {
        Path::new(&self.0)
    }
}

impl From<&Path> for SourceLocator {
    fn from(path: &Path) -> Self {
        Self(path.to_string_lossy().into_owned())
    }
}

impl fmt::Display for SourceLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
