//! The predefinition registry: submission, cascading definition and sealing.

use std::collections::VecDeque;

use parking_lot::Mutex;
use predefine_types::{
    ArtifactHash, ArtifactHeader, DefineError, SourceLocator, TypeHandle, TypeName,
};
use tracing::{debug, info, instrument, warn};

use crate::config::RegistryConfig;
use crate::error::{RegistrationError, Result};
use crate::hasher::ArtifactHasher;
use crate::record::RecordState;
use crate::report::{BlockingError, DefinedEntry, SealReport, SkippedSummary};
use crate::store::RecordStore;
use crate::traits::{Collaborators, DefinedType};
use crate::transform::SynthesizedSiteTransformer;

/// Open for registrations, or sealed with its final report.
#[derive(Debug)]
enum Phase {
    Open,
    Sealed(SealReport),
}

#[derive(Debug)]
struct RegistryState {
    phase: Phase,
    store: RecordStore,
}

/// An artifact after fetching, hashing and header parsing.
struct PreparedArtifact {
    raw_hash: ArtifactHash,
    canonical_hash: ArtifactHash,
    header: ArtifactHeader,
    bytes: Vec<u8>,
}

/// Registers externally supplied type artifacts and defines them in
/// dependency order, each exactly once.
///
/// All mutation happens under one lock spanning a record and its neighbours'
/// edge sets, so concurrent initialization sources are serialized.
pub struct PredefinitionRegistry {
    config: RegistryConfig,
    collaborators: Collaborators,
    hasher: ArtifactHasher,
    transformer: SynthesizedSiteTransformer,
    state: Mutex<RegistryState>,
}

impl PredefinitionRegistry {
    pub fn new(config: RegistryConfig, collaborators: Collaborators) -> Self {
        let hasher = ArtifactHasher::new(collaborators.codec.clone());
        let transformer = SynthesizedSiteTransformer::new(collaborators.codec.clone(), &config);
        Self {
            config,
            collaborators,
            hasher,
            transformer,
            state: Mutex::new(RegistryState {
                phase: Phase::Open,
                store: RecordStore::new(),
            }),
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Submit one artifact.
    ///
    /// `name_hint` is the name the artifact was requested under; the name the
    /// artifact declares wins. `content_hash` only selects the artifact from
    /// its source; identity comes from hashing the fetched bytes.
    #[instrument(skip(self, locator), fields(locator = ?locator.map(SourceLocator::as_str)))]
    pub fn add(
        &self,
        name_hint: &str,
        content_hash: &str,
        locator: Option<&SourceLocator>,
    ) -> Result<()> {
        if !self.config.enabled {
            return Err(RegistrationError::FeatureDisabled {
                hash: content_hash.to_string(),
                locator: describe_locator(locator),
            });
        }
        if self.is_sealed() {
            return Err(RegistrationError::SealedRegistry);
        }

        let prepared = self.prepare(name_hint, content_hash, locator)?;

        let mut state = self.state.lock();
        if matches!(state.phase, Phase::Sealed(_)) {
            return Err(RegistrationError::SealedRegistry);
        }
        self.register(&mut state.store, prepared)
    }

    /// Fetch, hash, transform, parse and canonicalize. Touches no shared state.
    fn prepare(
        &self,
        name_hint: &str,
        content_hash: &str,
        locator: Option<&SourceLocator>,
    ) -> Result<PreparedArtifact> {
        let Some(locator) = locator else {
            return Err(RegistrationError::MissingSource {
                hash: content_hash.to_string(),
                locator: describe_locator(None),
                reason: "its location is unknown".to_string(),
            });
        };

        let bytes = self
            .collaborators
            .source
            .fetch(locator, content_hash)
            .map_err(|e| RegistrationError::MissingSource {
                hash: content_hash.to_string(),
                locator: locator.to_string(),
                reason: e.to_string(),
            })?;

        // Our own hash; the supplied one may not match the bytes.
        let raw_hash = self.hasher.digest(&bytes);
        if self.config.verify_supplied_hash {
            if let Ok(supplied) = ArtifactHash::from_hex(content_hash) {
                if supplied != raw_hash {
                    warn!(
                        supplied = %supplied,
                        computed = %raw_hash,
                        "Supplied hash does not match artifact contents"
                    );
                }
            }
        }

        let malformed = |source| RegistrationError::MalformedArtifact {
            hash: content_hash.to_string(),
            source,
        };

        let bytes = self
            .transformer
            .transform(bytes, name_hint)
            .map_err(malformed)?;
        let header = self
            .collaborators
            .codec
            .read_header(&bytes)
            .map_err(malformed)?;
        let canonical_hash = self.hasher.canonical_digest(&bytes).map_err(malformed)?;

        Ok(PreparedArtifact {
            raw_hash,
            canonical_hash,
            header,
            bytes,
        })
    }

    fn register(&self, store: &mut RecordStore, prepared: PreparedArtifact) -> Result<()> {
        let PreparedArtifact {
            raw_hash,
            canonical_hash,
            header,
            bytes,
        } = prepared;
        let name = header.name.clone();

        let record = store.get_or_insert(&name);
        if let Some(existing) = record.canonical_hash {
            if existing != canonical_hash {
                return Err(RegistrationError::ConflictingDefinition(name));
            }
            if let Some(handle) = record.defined_handle {
                debug!(name = %name, alias = %raw_hash, "Aliasing already defined type");
                self.collaborators.aliases.register_alias(raw_hash, handle);
            } else if record.skipped_collision {
                debug!(name = %name, alias = %raw_hash, "Ignoring alias of skipped type");
            } else {
                debug!(name = %name, alias = %raw_hash, "Recording alias of pending type");
                record.alias_hashes.insert(raw_hash);
            }
            return Ok(());
        }

        record.canonical_hash = Some(canonical_hash);
        record.kind = header.kind;
        record.pending_bytes = Some(bytes);
        record.alias_hashes.insert(raw_hash);

        // A type cannot be defined before its superclass and interfaces.
        let mut pending = false;
        for supertype in header.supertypes() {
            if store.is_resolved(supertype) || self.collaborators.oracle.is_resolvable(supertype) {
                continue;
            }
            debug!(name = %name, supertype = %supertype, "Waiting on supertype");
            store.add_pending_edge(&name, supertype);
            pending = true;
        }

        if pending {
            Ok(())
        } else {
            self.define_cascade(store, name)
        }
    }

    /// Define `root`, then every subtype that becomes unblocked, breadth first.
    fn define_cascade(&self, store: &mut RecordStore, root: TypeName) -> Result<()> {
        let mut worklist = VecDeque::from([root]);
        while let Some(name) = worklist.pop_front() {
            self.define_one(store, &name)?;
            let unlocked = store.release_subtypes(&name);
            if !unlocked.is_empty() {
                debug!(supertype = %name, count = unlocked.len(), "Cascading to subtypes");
            }
            worklist.extend(unlocked);
        }
        Ok(())
    }

    fn define_one(&self, store: &mut RecordStore, name: &TypeName) -> Result<()> {
        let Some(record) = store.get_mut(name) else {
            return Ok(());
        };
        debug_assert!(record.pending_supertypes.is_empty());
        if record.pending_bytes.is_none() {
            return Ok(());
        }

        if self.collaborators.oracle.is_resolvable(name) {
            info!(name = %name, "Host already resolves type; skipping predefinition");
            record.pending_bytes = None;
            record.alias_hashes.clear();
            record.skipped_collision = true;
            return Ok(());
        }

        let Some(bytes) = record.pending_bytes.take() else {
            return Ok(());
        };
        match self.collaborators.sink.define(name, bytes) {
            Ok(handle) => {
                record.defined_handle = Some(handle);
                for alias in std::mem::take(&mut record.alias_hashes) {
                    self.collaborators.aliases.register_alias(alias, handle);
                }
                info!(name = %name, handle = %handle, "Defined predefined type");
                Ok(())
            }
            Err(DefineError::DuplicateName(_)) => {
                info!(name = %name, "Host already defines type; skipping predefinition");
                record.alias_hashes.clear();
                record.skipped_collision = true;
                Ok(())
            }
            Err(source) => {
                // Subtype edges stay in place so dependents report this type
                // as their blocker.
                warn!(name = %name, error = %source, "Host failed to define predefined type");
                record.definition_failed = true;
                Err(RegistrationError::Definition {
                    name: name.clone(),
                    source,
                })
            }
        }
    }

    /// Close registration and classify every record.
    ///
    /// The first call computes the report and runs the post-definition hook
    /// for each defined type; later calls return the same report.
    #[instrument(skip(self))]
    pub fn seal(&self) -> SealReport {
        let mut state = self.state.lock();
        if let Phase::Sealed(report) = &state.phase {
            return report.clone();
        }

        let report = self.classify(&state.store);
        if !report.skipped.is_empty() {
            warn!("{}", report.skipped);
        }
        for error in &report.blocking_errors {
            warn!("{}", error);
        }
        if !report.failed.is_empty() || !report.abandoned.is_empty() {
            warn!(
                failed = report.failed.len(),
                abandoned = report.abandoned.len(),
                "Predefined types left undefined after a host failure"
            );
        }
        info!(
            defined = report.defined_count(),
            skipped = report.skipped.total,
            blocked = report.blocking_errors.len(),
            failed = report.failed.len(),
            "Predefinition registry sealed"
        );

        state.phase = Phase::Sealed(report.clone());
        report
    }

    fn classify(&self, store: &RecordStore) -> SealReport {
        let mut defined = Vec::new();
        let mut skipped = Vec::new();
        let mut blocking_errors = Vec::new();
        let mut missing = Vec::new();
        let mut failed = Vec::new();
        let mut abandoned = Vec::new();

        for record in store.iter() {
            if let Some(handle) = record.defined_handle() {
                let entry = DefinedType {
                    name: record.name().clone(),
                    handle,
                    kind: record.kind(),
                };
                let initialization = self.collaborators.policy.on_defined(&entry);
                defined.push(DefinedEntry {
                    name: entry.name,
                    handle,
                    kind: entry.kind,
                    initialization,
                });
            } else if record.skipped_collision {
                skipped.push(record.name().clone());
            } else if record.is_failed() {
                failed.push(record.name().clone());
            } else if !record.pending_supertypes().is_empty() {
                blocking_errors.push(BlockingError::new(
                    record.name().clone(),
                    record.pending_supertypes().iter().cloned().collect(),
                ));
            } else if record.has_pending_bytes() {
                abandoned.push(record.name().clone());
            } else if !record.pending_subtypes().is_empty() {
                missing.push(record.name().clone());
            }
        }

        SealReport {
            defined,
            skipped: SkippedSummary::from_names(skipped, self.config.skipped_sample_limit),
            blocking_errors,
            missing,
            failed,
            abandoned,
        }
    }

    pub fn is_sealed(&self) -> bool {
        matches!(self.state.lock().phase, Phase::Sealed(_))
    }

    /// Handle of a type this registry defined.
    pub fn defined_handle(&self, name: &TypeName) -> Option<TypeHandle> {
        self.state
            .lock()
            .store
            .get(name)
            .and_then(|record| record.defined_handle())
    }

    pub fn record_state(&self, name: &TypeName) -> Option<RecordState> {
        self.state.lock().store.get(name).map(|record| record.state())
    }

    /// Names `name` is still waiting on, in name order.
    pub fn pending_supertypes(&self, name: &TypeName) -> Vec<TypeName> {
        self.state
            .lock()
            .store
            .get(name)
            .map(|record| record.pending_supertypes().iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn record_count(&self) -> usize {
        self.state.lock().store.len()
    }

    /// Whether every pending edge has its mirror.
    pub fn edges_consistent(&self) -> bool {
        self.state.lock().store.edges_consistent()
    }
}

fn describe_locator(locator: Option<&SourceLocator>) -> String {
    locator
        .map(|l| l.to_string())
        .unwrap_or_else(|| "an unknown location".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{MockHost, StructuredArtifact};
    use crate::traits::AliasRegistry as _;

    fn host() -> MockHost {
        MockHost::new().resolvable(["java.lang.Object"])
    }

    #[test]
    fn disabled_registry_rejects_submissions() {
        let host = host();
        let registry = host.registry(RegistryConfig::default());
        let hash = host.put(StructuredArtifact::new("a/Foo").extends("java/lang/Object"));
        let err = registry.add("a.Foo", &hash, Some(&host.locator())).unwrap_err();
        assert!(matches!(err, RegistrationError::FeatureDisabled { .. }));
        assert_eq!(host.sink.define_count(), 0);
    }

    #[test]
    fn missing_locator_is_missing_source() {
        let host = host();
        let registry = host.registry(RegistryConfig::enabled());
        let err = registry.add("a.Foo", "abc", None).unwrap_err();
        assert!(matches!(err, RegistrationError::MissingSource { .. }));
    }

    #[test]
    fn unknown_hash_is_missing_source() {
        let host = host();
        let registry = host.registry(RegistryConfig::enabled());
        let err = registry
            .add("a.Foo", "deadbeef", Some(&host.locator()))
            .unwrap_err();
        match err {
            RegistrationError::MissingSource { hash, .. } => assert_eq!(hash, "deadbeef"),
            other => panic!("expected missing source, got {:?}", other),
        }
    }

    #[test]
    fn unparseable_artifact_is_malformed() {
        let host = host();
        let registry = host.registry(RegistryConfig::enabled());
        let hash = host.put_raw(b"\x00garbage".to_vec());
        let err = registry.add("a.Foo", &hash, Some(&host.locator())).unwrap_err();
        assert!(matches!(err, RegistrationError::MalformedArtifact { .. }));
        assert_eq!(registry.record_count(), 0);
    }

    #[test]
    fn root_type_defines_immediately() {
        let host = host();
        let registry = host.registry(RegistryConfig::enabled());
        let hash = host.put(StructuredArtifact::new("a/Foo").extends("java/lang/Object"));
        registry.add("a.Foo", &hash, Some(&host.locator())).unwrap();

        assert_eq!(host.sink.defined_names(), vec![TypeName::new("a.Foo")]);
        assert_eq!(
            registry.record_state(&"a.Foo".into()),
            Some(RecordState::Defined)
        );
    }

    #[test]
    fn declared_name_wins_over_hint() {
        let host = host();
        let registry = host.registry(RegistryConfig::enabled());
        let hash = host.put(StructuredArtifact::new("a/Real").extends("java/lang/Object"));
        registry.add("a.Hinted", &hash, Some(&host.locator())).unwrap();
        assert!(registry.defined_handle(&"a.Real".into()).is_some());
        assert!(registry.record_state(&"a.Hinted".into()).is_none());
    }

    #[test]
    fn aliases_registered_on_definition() {
        let host = host();
        let registry = host.registry(RegistryConfig::enabled());
        let hash = host.put(StructuredArtifact::new("a/Foo").extends("java/lang/Object"));
        registry.add("a.Foo", &hash, Some(&host.locator())).unwrap();

        let handle = registry.defined_handle(&"a.Foo".into()).unwrap();
        let raw = ArtifactHash::from_hex(&hash).unwrap();
        assert_eq!(host.aliases.resolve(&raw), Some(handle));
    }

    #[test]
    fn resolvable_supertype_imposes_no_dependency() {
        let host = host().resolvable(["a.Base"]);
        let registry = host.registry(RegistryConfig::enabled());

        let sub = host.put(StructuredArtifact::new("a/Sub").extends("a/Base"));
        registry.add("a.Sub", &sub, Some(&host.locator())).unwrap();
        assert!(registry.defined_handle(&"a.Sub".into()).is_some());

        let base = host.put(StructuredArtifact::new("a/Base").extends("java/lang/Object"));
        registry.add("a.Base", &base, Some(&host.locator())).unwrap();
        assert_eq!(
            registry.record_state(&"a.Base".into()),
            Some(RecordState::SkippedCollision)
        );
        assert_eq!(host.sink.define_count(), 1);

        let report = registry.seal();
        assert_eq!(report.skipped.total, 1);
        assert_eq!(report.skipped.sample, vec![TypeName::new("a.Base")]);
    }

    #[test]
    fn oracle_collision_still_cascades() {
        let host = host();
        let registry = host.registry(RegistryConfig::enabled());

        let sub = host.put(StructuredArtifact::new("a/Sub").extends("a/Base"));
        registry.add("a.Sub", &sub, Some(&host.locator())).unwrap();
        assert_eq!(
            registry.record_state(&"a.Sub".into()),
            Some(RecordState::Pending)
        );

        // The host picks up a.Base on its own before it is submitted here.
        host.oracle.add("a.Base");
        let base = host.put(StructuredArtifact::new("a/Base").extends("java/lang/Object"));
        registry.add("a.Base", &base, Some(&host.locator())).unwrap();

        assert_eq!(
            registry.record_state(&"a.Base".into()),
            Some(RecordState::SkippedCollision)
        );
        assert!(registry.defined_handle(&"a.Sub".into()).is_some());
        assert_eq!(host.sink.defined_names(), vec![TypeName::new("a.Sub")]);
    }

    #[test]
    fn sink_duplicate_name_is_a_collision() {
        let host = host();
        host.sink.already_defines("a.Base");
        let registry = host.registry(RegistryConfig::enabled());

        let sub = host.put(StructuredArtifact::new("a/Sub").extends("a/Base"));
        registry.add("a.Sub", &sub, Some(&host.locator())).unwrap();
        assert_eq!(
            registry.record_state(&"a.Sub".into()),
            Some(RecordState::Pending)
        );

        let base = host.put(StructuredArtifact::new("a/Base").extends("java/lang/Object"));
        registry.add("a.Base", &base, Some(&host.locator())).unwrap();

        assert_eq!(
            registry.record_state(&"a.Base".into()),
            Some(RecordState::SkippedCollision)
        );
        assert!(registry.defined_handle(&"a.Sub".into()).is_some());
        assert!(registry.edges_consistent());
    }

    #[test]
    fn host_failure_aborts_submission() {
        let host = host();
        host.sink.reject("a.Foo", "verification failed");
        let registry = host.registry(RegistryConfig::enabled());
        let hash = host.put(StructuredArtifact::new("a/Foo").extends("java/lang/Object"));
        let err = registry.add("a.Foo", &hash, Some(&host.locator())).unwrap_err();
        assert!(matches!(err, RegistrationError::Definition { .. }));
    }

    #[test]
    fn host_failure_is_reported_at_seal() {
        let host = host();
        host.sink.reject("a.Sub1", "verification failed");
        let registry = host.registry(RegistryConfig::enabled());
        for sub in ["a/Sub1", "a/Sub2"] {
            let hash = host.put(StructuredArtifact::new(sub).extends("a/Base"));
            registry
                .add(&sub.replace('/', "."), &hash, Some(&host.locator()))
                .unwrap();
        }

        let base = host.put(StructuredArtifact::new("a/Base").extends("java/lang/Object"));
        let err = registry.add("a.Base", &base, Some(&host.locator())).unwrap_err();
        match err {
            RegistrationError::Definition { name, .. } => assert_eq!(name.as_str(), "a.Sub1"),
            other => panic!("expected host failure, got {:?}", other),
        }

        assert_eq!(
            registry.record_state(&"a.Sub1".into()),
            Some(RecordState::Failed)
        );
        assert_eq!(
            registry.record_state(&"a.Sub2".into()),
            Some(RecordState::Definable)
        );

        let report = registry.seal();
        assert_eq!(report.defined_count(), 1);
        assert!(report.skipped.is_empty());
        assert_eq!(report.failed, vec![TypeName::new("a.Sub1")]);
        assert_eq!(report.abandoned, vec![TypeName::new("a.Sub2")]);
        assert!(!report.is_clean());
        assert!(matches!(
            report.into_result(),
            Err(RegistrationError::IncompleteDefinition { .. })
        ));
    }

    #[test]
    fn failed_type_blocks_its_subtypes() {
        let host = host();
        host.sink.reject("a.Base", "verification failed");
        let registry = host.registry(RegistryConfig::enabled());
        let sub = host.put(StructuredArtifact::new("a/Sub").extends("a/Base"));
        registry.add("a.Sub", &sub, Some(&host.locator())).unwrap();

        let base = host.put(StructuredArtifact::new("a/Base").extends("java/lang/Object"));
        assert!(registry.add("a.Base", &base, Some(&host.locator())).is_err());
        assert!(registry.edges_consistent());

        let report = registry.seal();
        assert_eq!(report.failed, vec![TypeName::new("a.Base")]);
        assert_eq!(report.blocking_errors.len(), 1);
        assert_eq!(report.blocking_errors[0].name.as_str(), "a.Sub");
        assert_eq!(report.blocking_errors[0].blocked_by, vec![TypeName::new("a.Base")]);
        assert!(report.missing.is_empty());
    }

    #[test]
    fn alias_of_collided_type_is_ignored() {
        let host = host().resolvable(["a.Foo"]);
        let registry = host.registry(RegistryConfig::enabled());
        let plain = StructuredArtifact::new("a/Foo").extends("java/lang/Object");
        let first = host.put(plain.clone());
        let second = host.put(plain.with_source_file("Foo.java"));

        registry.add("a.Foo", &first, Some(&host.locator())).unwrap();
        registry.add("a.Foo", &second, Some(&host.locator())).unwrap();

        assert_eq!(host.sink.define_count(), 0);
        assert_eq!(host.aliases.len(), 0);
    }

    #[test]
    fn seal_runs_policy_once_per_defined_type() {
        let host = host();
        let registry = host.registry(RegistryConfig::enabled());
        let hash = host.put(StructuredArtifact::new("a/Foo").extends("java/lang/Object"));
        registry.add("a.Foo", &hash, Some(&host.locator())).unwrap();

        registry.seal();
        registry.seal();
        assert_eq!(host.policy.seen(), vec![TypeName::new("a.Foo")]);
    }

    #[test]
    fn sealed_registry_rejects_before_fetching() {
        let host = host();
        let registry = host.registry(RegistryConfig::enabled());
        registry.seal();
        let err = registry.add("a.Foo", "abc", None).unwrap_err();
        assert!(matches!(err, RegistrationError::SealedRegistry));
        assert_eq!(host.source.fetch_count(), 0);
    }
}
