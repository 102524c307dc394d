//! Capabilities the registry needs from its host.
//!
//! Each trait is one collaborator contract. Production hosts plug in their
//! class loader, byte-code library and artifact store; tests use the doubles
//! in [`crate::mocks`].

use std::sync::Arc;

use predefine_types::{
    ArtifactHash, ArtifactHeader, CodecError, DefineError, SourceError, SourceLocator,
    TypeHandle, TypeKind, TypeName,
};
use serde::{Deserialize, Serialize};

/// Resolves a caller-supplied content hash to raw artifact bytes.
pub trait ArtifactSource: Send + Sync {
    fn fetch(&self, locator: &SourceLocator, hash: &str) -> Result<Vec<u8>, SourceError>;
}

/// Answers whether a name is satisfiable without predefinition
/// (for example, present on the base class path).
pub trait ResolvabilityOracle: Send + Sync {
    fn is_resolvable(&self, name: &TypeName) -> bool;
}

/// The host's "define a type" primitive. Takes ownership of the bytes.
pub trait DefinitionSink: Send + Sync {
    /// Fails with [`DefineError::DuplicateName`] when the host already has
    /// `name` through another path.
    fn define(&self, name: &TypeName, bytes: Vec<u8>) -> Result<TypeHandle, DefineError>;
}

/// Lets later consumers resolve any alias hash to the defined type.
pub trait AliasRegistry: Send + Sync {
    fn register_alias(&self, hash: ArtifactHash, handle: TypeHandle);

    fn resolve(&self, hash: &ArtifactHash) -> Option<TypeHandle>;
}

/// A type the registry defined, as passed to the post-definition hook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefinedType {
    pub name: TypeName,
    pub handle: TypeHandle,
    pub kind: TypeKind,
}

/// When a defined type may run its static initializer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InitializationPolicy {
    BuildTime,
    RunTime,
}

/// Post-definition hook, invoked once per defined (non-collision) type at seal.
pub trait DefinitionPolicy: Send + Sync {
    fn on_defined(&self, defined: &DefinedType) -> InitializationPolicy;
}

/// The byte-code container format: header parsing and the rewrites the
/// registry needs.
pub trait ArtifactCodec: Send + Sync {
    fn read_header(&self, bytes: &[u8]) -> Result<ArtifactHeader, CodecError>;

    /// Re-serialize without debug-only attributes (source file, line
    /// numbers, local variable tables).
    fn strip_debug_info(&self, bytes: &[u8]) -> Result<Vec<u8>, CodecError>;

    /// Rewrite the artifact's self-referential name from `from` to `to`.
    fn rename_type(
        &self,
        bytes: &[u8],
        from: &TypeName,
        to: &TypeName,
    ) -> Result<Vec<u8>, CodecError>;

    /// Make the named field public, static and final, and every member named
    /// `constructor` public. Absent members are left alone.
    fn widen_member_access(
        &self,
        bytes: &[u8],
        field: &str,
        constructor: &str,
    ) -> Result<Vec<u8>, CodecError>;
}

/// The full set of host capabilities a registry is built with.
#[derive(Clone)]
pub struct Collaborators {
    pub source: Arc<dyn ArtifactSource>,
    pub oracle: Arc<dyn ResolvabilityOracle>,
    pub sink: Arc<dyn DefinitionSink>,
    pub aliases: Arc<dyn AliasRegistry>,
    pub policy: Arc<dyn DefinitionPolicy>,
    pub codec: Arc<dyn ArtifactCodec>,
}
