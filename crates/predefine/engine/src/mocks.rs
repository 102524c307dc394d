//! In-memory collaborators for development and testing.
//!
//! [`StructuredArtifactCodec`] stands in for a real byte-code library: its
//! artifacts are JSON documents carrying the same structural information a
//! class file header does, plus debug attributes that canonicalization drops.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use predefine_types::{
    ArtifactHash, ArtifactHeader, CodecError, DefineError, SourceError, SourceLocator,
    TypeHandle, TypeKind, TypeName,
};
use serde::{Deserialize, Serialize};

use crate::config::RegistryConfig;
use crate::registry::PredefinitionRegistry;
use crate::traits::{
    AliasRegistry, ArtifactCodec, ArtifactSource, Collaborators, DefinedType, DefinitionPolicy,
    DefinitionSink, InitializationPolicy, ResolvabilityOracle,
};

/// Member access flags, as in the class file format.
pub mod access {
    pub const PUBLIC: u16 = 0x0001;
    pub const PRIVATE: u16 = 0x0002;
    pub const PROTECTED: u16 = 0x0004;
    pub const STATIC: u16 = 0x0008;
    pub const FINAL: u16 = 0x0010;
}

/// Debug-only attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugInfo {
    #[serde(default)]
    pub source_file: Option<String>,
    #[serde(default)]
    pub line_numbers: Vec<u32>,
    #[serde(default)]
    pub local_variables: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredMember {
    pub name: String,
    pub descriptor: String,
    pub access: u16,
}

impl StructuredMember {
    pub fn new(name: impl Into<String>, descriptor: impl Into<String>, access: u16) -> Self {
        Self {
            name: name.into(),
            descriptor: descriptor.into(),
            access,
        }
    }
}

/// A type artifact in structured form. Names are in internal slash form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredArtifact {
    pub name: String,
    #[serde(default)]
    pub superclass: Option<String>,
    #[serde(default)]
    pub interfaces: Vec<String>,
    #[serde(default)]
    pub kind: TypeKind,
    #[serde(default)]
    pub fields: Vec<StructuredMember>,
    #[serde(default)]
    pub methods: Vec<StructuredMember>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug: Option<DebugInfo>,
}

impl StructuredArtifact {
    pub fn new(internal_name: impl Into<String>) -> Self {
        Self {
            name: internal_name.into(),
            superclass: None,
            interfaces: Vec::new(),
            kind: TypeKind::Class,
            fields: Vec::new(),
            methods: Vec::new(),
            debug: None,
        }
    }

    pub fn extends(mut self, superclass: impl Into<String>) -> Self {
        self.superclass = Some(superclass.into());
        self
    }

    pub fn implements(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    pub fn kind(mut self, kind: TypeKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn field(mut self, field: StructuredMember) -> Self {
        self.fields.push(field);
        self
    }

    pub fn method(mut self, method: StructuredMember) -> Self {
        self.methods.push(method);
        self
    }

    pub fn with_debug(mut self, debug: DebugInfo) -> Self {
        self.debug = Some(debug);
        self
    }

    pub fn with_source_file(self, file: impl Into<String>) -> Self {
        self.with_debug(DebugInfo {
            source_file: Some(file.into()),
            ..Default::default()
        })
    }

    pub fn find_field(&self, name: &str) -> Option<&StructuredMember> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn find_method(&self, name: &str) -> Option<&StructuredMember> {
        self.methods.iter().find(|m| m.name == name)
    }

    pub fn encode(&self) -> Vec<u8> {
        // Plain data; serializing cannot fail.
        serde_json::to_vec(self).unwrap_or_default()
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        serde_json::from_slice(bytes).map_err(|e| CodecError::Malformed(e.to_string()))
    }
}

/// Codec for [`StructuredArtifact`] bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuredArtifactCodec;

impl ArtifactCodec for StructuredArtifactCodec {
    fn read_header(&self, bytes: &[u8]) -> Result<ArtifactHeader, CodecError> {
        let artifact = StructuredArtifact::decode(bytes)?;
        if artifact.name.is_empty() {
            return Err(CodecError::Malformed("artifact declares no name".into()));
        }
        Ok(ArtifactHeader {
            name: TypeName::from_internal(&artifact.name),
            superclass: artifact.superclass.as_deref().map(TypeName::from_internal),
            interfaces: artifact
                .interfaces
                .iter()
                .map(|i| TypeName::from_internal(i))
                .collect(),
            kind: artifact.kind,
        })
    }

    fn strip_debug_info(&self, bytes: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut artifact = StructuredArtifact::decode(bytes)?;
        artifact.debug = None;
        Ok(artifact.encode())
    }

    fn rename_type(
        &self,
        bytes: &[u8],
        from: &TypeName,
        to: &TypeName,
    ) -> Result<Vec<u8>, CodecError> {
        let mut artifact = StructuredArtifact::decode(bytes)?;
        let (from, to) = (from.to_internal(), to.to_internal());
        if artifact.name != from {
            return Err(CodecError::Malformed(format!(
                "artifact declares {}, expected {}",
                artifact.name, from
            )));
        }
        artifact.name = to.clone();

        let (old_ref, new_ref) = (format!("L{};", from), format!("L{};", to));
        for member in artifact.fields.iter_mut().chain(artifact.methods.iter_mut()) {
            member.descriptor = member.descriptor.replace(&old_ref, &new_ref);
        }
        Ok(artifact.encode())
    }

    fn widen_member_access(
        &self,
        bytes: &[u8],
        field: &str,
        constructor: &str,
    ) -> Result<Vec<u8>, CodecError> {
        let mut artifact = StructuredArtifact::decode(bytes)?;
        for f in artifact.fields.iter_mut().filter(|f| f.name == field) {
            f.access = access::PUBLIC | access::STATIC | access::FINAL;
        }
        for m in artifact.methods.iter_mut().filter(|m| m.name == constructor) {
            m.access = access::PUBLIC;
        }
        Ok(artifact.encode())
    }
}

/// Artifact source backed by a map of `(locator, hash)` to bytes.
#[derive(Default)]
pub struct InMemoryArtifactSource {
    artifacts: RwLock<HashMap<(SourceLocator, String), Vec<u8>>>,
    fetches: AtomicUsize,
}

impl InMemoryArtifactSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, locator: SourceLocator, hash: impl Into<String>, bytes: Vec<u8>) {
        self.artifacts.write().insert((locator, hash.into()), bytes);
    }

    /// Number of fetch calls, successful or not.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl ArtifactSource for InMemoryArtifactSource {
    fn fetch(&self, locator: &SourceLocator, hash: &str) -> Result<Vec<u8>, SourceError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.artifacts
            .read()
            .get(&(locator.clone(), hash.to_string()))
            .cloned()
            .ok_or_else(|| SourceError::NotFound {
                locator: locator.clone(),
                hash: hash.to_string(),
            })
    }
}

/// Oracle with a fixed, extendable set of resolvable names.
#[derive(Default)]
pub struct StaticOracle {
    names: RwLock<BTreeSet<TypeName>>,
}

impl StaticOracle {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TypeName>,
    {
        Self {
            names: RwLock::new(names.into_iter().map(Into::into).collect()),
        }
    }

    pub fn add(&self, name: impl Into<TypeName>) {
        self.names.write().insert(name.into());
    }
}

impl ResolvabilityOracle for StaticOracle {
    fn is_resolvable(&self, name: &TypeName) -> bool {
        self.names.read().contains(name)
    }
}

/// Definition sink that records every call and mints sequential handles.
#[derive(Default)]
pub struct RecordingDefinitionSink {
    calls: Mutex<Vec<(TypeName, Vec<u8>)>>,
    host_names: RwLock<BTreeSet<TypeName>>,
    rejections: RwLock<HashMap<TypeName, String>>,
    next_handle: AtomicU64,
}

impl RecordingDefinitionSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `define(name)` fail with `DuplicateName`.
    pub fn already_defines(&self, name: impl Into<TypeName>) {
        self.host_names.write().insert(name.into());
    }

    /// Make `define(name)` fail with a host error.
    pub fn reject(&self, name: impl Into<TypeName>, reason: impl Into<String>) {
        self.rejections.write().insert(name.into(), reason.into());
    }

    /// Successful definitions, in call order.
    pub fn defined_names(&self) -> Vec<TypeName> {
        self.calls.lock().iter().map(|(n, _)| n.clone()).collect()
    }

    pub fn define_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn bytes_for(&self, name: &TypeName) -> Option<Vec<u8>> {
        self.calls
            .lock()
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, b)| b.clone())
    }
}

impl DefinitionSink for RecordingDefinitionSink {
    fn define(&self, name: &TypeName, bytes: Vec<u8>) -> Result<TypeHandle, DefineError> {
        if self.host_names.read().contains(name) {
            return Err(DefineError::DuplicateName(name.clone()));
        }
        if let Some(reason) = self.rejections.read().get(name) {
            return Err(DefineError::Host(reason.clone()));
        }
        let handle = TypeHandle::new(self.next_handle.fetch_add(1, Ordering::SeqCst) + 1);
        self.calls.lock().push((name.clone(), bytes));
        Ok(handle)
    }
}

/// Hash-to-handle map.
#[derive(Default)]
pub struct InMemoryAliasRegistry {
    aliases: RwLock<HashMap<ArtifactHash, TypeHandle>>,
}

impl InMemoryAliasRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.aliases.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.read().is_empty()
    }
}

impl AliasRegistry for InMemoryAliasRegistry {
    fn register_alias(&self, hash: ArtifactHash, handle: TypeHandle) {
        self.aliases.write().insert(hash, handle);
    }

    fn resolve(&self, hash: &ArtifactHash) -> Option<TypeHandle> {
        self.aliases.read().get(hash).copied()
    }
}

/// Policy that returns a fixed decision and records who asked.
pub struct RecordingPolicy {
    decision: InitializationPolicy,
    seen: Mutex<Vec<TypeName>>,
}

impl RecordingPolicy {
    pub fn new(decision: InitializationPolicy) -> Self {
        Self {
            decision,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn seen(&self) -> Vec<TypeName> {
        self.seen.lock().clone()
    }
}

impl Default for RecordingPolicy {
    fn default() -> Self {
        Self::new(InitializationPolicy::RunTime)
    }
}

impl DefinitionPolicy for RecordingPolicy {
    fn on_defined(&self, defined: &DefinedType) -> InitializationPolicy {
        self.seen.lock().push(defined.name.clone());
        self.decision
    }
}

/// A full set of in-memory collaborators sharing one artifact location.
#[derive(Clone)]
pub struct MockHost {
    pub source: Arc<InMemoryArtifactSource>,
    pub oracle: Arc<StaticOracle>,
    pub sink: Arc<RecordingDefinitionSink>,
    pub aliases: Arc<InMemoryAliasRegistry>,
    pub policy: Arc<RecordingPolicy>,
    locator: SourceLocator,
}

impl MockHost {
    pub fn new() -> Self {
        Self {
            source: Arc::new(InMemoryArtifactSource::new()),
            oracle: Arc::new(StaticOracle::default()),
            sink: Arc::new(RecordingDefinitionSink::new()),
            aliases: Arc::new(InMemoryAliasRegistry::new()),
            policy: Arc::new(RecordingPolicy::default()),
            locator: SourceLocator::new("memory://predefined"),
        }
    }

    /// Add names the host resolves on its own.
    pub fn resolvable<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TypeName>,
    {
        for name in names {
            self.oracle.add(name);
        }
        self
    }

    pub fn locator(&self) -> SourceLocator {
        self.locator.clone()
    }

    /// Store an artifact under its raw hash and return the hash as hex.
    pub fn put(&self, artifact: StructuredArtifact) -> String {
        self.put_raw(artifact.encode())
    }

    pub fn put_raw(&self, bytes: Vec<u8>) -> String {
        let hash = ArtifactHash::hash(&bytes).to_hex();
        self.source.insert(self.locator(), hash.clone(), bytes);
        hash
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            source: self.source.clone(),
            oracle: self.oracle.clone(),
            sink: self.sink.clone(),
            aliases: self.aliases.clone(),
            policy: self.policy.clone(),
            codec: Arc::new(StructuredArtifactCodec),
        }
    }

    pub fn registry(&self, config: RegistryConfig) -> PredefinitionRegistry {
        PredefinitionRegistry::new(config, self.collaborators())
    }
}

impl Default for MockHost {
    fn default() -> Self {
        Self::new()
    }
}
