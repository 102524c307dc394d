//! Per-name predefinition record.

use std::collections::BTreeSet;
use std::fmt;

use predefine_types::{ArtifactHash, TypeHandle, TypeKind, TypeName};
use serde::{Deserialize, Serialize};

/// Where a record is in its lifecycle.
///
/// `Unseen -> Pending -> Definable -> Defined | SkippedCollision | Failed`.
/// A record still `Pending` when the registry is sealed can never be defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordState {
    /// Known only as somebody's supertype; no artifact submitted.
    Unseen,
    /// Artifact held, waiting on at least one supertype.
    Pending,
    /// Artifact held, nothing blocking.
    Definable,
    Defined,
    /// The host already had this name; the artifact was dropped.
    SkippedCollision,
    /// The host rejected the definition.
    Failed,
}

impl fmt::Display for RecordState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordState::Unseen => write!(f, "unseen"),
            RecordState::Pending => write!(f, "pending"),
            RecordState::Definable => write!(f, "definable"),
            RecordState::Defined => write!(f, "defined"),
            RecordState::SkippedCollision => write!(f, "skipped-collision"),
            RecordState::Failed => write!(f, "failed"),
        }
    }
}

/// One record per distinct type name, never per content hash.
#[derive(Debug, Clone)]
pub struct PredefinedType {
    pub(crate) name: TypeName,
    /// Set by the first artifact for this name, then immutable.
    pub(crate) canonical_hash: Option<ArtifactHash>,
    pub(crate) kind: TypeKind,
    /// Owned until handed to the definition sink.
    pub(crate) pending_bytes: Option<Vec<u8>>,
    pub(crate) alias_hashes: BTreeSet<ArtifactHash>,
    pub(crate) defined_handle: Option<TypeHandle>,
    pub(crate) skipped_collision: bool,
    /// The host define primitive returned an error; the bytes are gone.
    pub(crate) definition_failed: bool,
    pub(crate) pending_supertypes: BTreeSet<TypeName>,
    pub(crate) pending_subtypes: BTreeSet<TypeName>,
}

impl PredefinedType {
    pub(crate) fn new(name: TypeName) -> Self {
        Self {
            name,
            canonical_hash: None,
            kind: TypeKind::Class,
            pending_bytes: None,
            alias_hashes: BTreeSet::new(),
            defined_handle: None,
            skipped_collision: false,
            definition_failed: false,
            pending_supertypes: BTreeSet::new(),
            pending_subtypes: BTreeSet::new(),
        }
    }

    pub fn name(&self) -> &TypeName {
        &self.name
    }

    pub fn canonical_hash(&self) -> Option<&ArtifactHash> {
        self.canonical_hash.as_ref()
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    pub fn defined_handle(&self) -> Option<TypeHandle> {
        self.defined_handle
    }

    pub fn alias_hashes(&self) -> &BTreeSet<ArtifactHash> {
        &self.alias_hashes
    }

    pub fn pending_supertypes(&self) -> &BTreeSet<TypeName> {
        &self.pending_supertypes
    }

    pub fn pending_subtypes(&self) -> &BTreeSet<TypeName> {
        &self.pending_subtypes
    }

    pub fn is_failed(&self) -> bool {
        self.definition_failed
    }

    pub fn has_pending_bytes(&self) -> bool {
        self.pending_bytes.is_some()
    }

    /// Defined by this registry or already present in the host. Either way
    /// dependents may proceed.
    pub fn is_resolved(&self) -> bool {
        self.defined_handle.is_some() || self.skipped_collision
    }

    pub fn state(&self) -> RecordState {
        if self.defined_handle.is_some() {
            RecordState::Defined
        } else if self.skipped_collision {
            RecordState::SkippedCollision
        } else if self.definition_failed {
            RecordState::Failed
        } else if self.pending_bytes.is_none() {
            RecordState::Unseen
        } else if self.pending_supertypes.is_empty() {
            RecordState::Definable
        } else {
            RecordState::Pending
        }
    }
}
