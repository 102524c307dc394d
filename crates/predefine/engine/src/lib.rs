//! Predefinition engine - registration and dependency-ordered definition of
//! externally supplied type artifacts
//!
//! Artifacts recorded ahead of time are submitted one by one, in any order:
//!
//! - **PredefinitionRegistry**: deduplicates by declared name and content,
//!   defers each type until its superclass and interfaces resolve, then
//!   defines it and cascades to waiting subtypes
//! - **SealReport**: what was defined, skipped because the host already had
//!   it, or left blocked when registration closed
//! - **Collaborators**: the host capabilities the registry is built on
//!   (artifact source, resolvability oracle, definition sink, alias
//!   registry, post-definition policy, artifact codec)
//!
//! ## Reference collaborators
//!
//! [`DirectoryArtifactSource`] and [`RuntimeInitializationPolicy`] are usable
//! as-is. The [`mocks`] module holds in-memory implementations of every
//! contract for development and testing.

#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod hasher;
pub mod mocks;
pub mod policy;
pub mod record;
pub mod registry;
pub mod report;
pub mod source;
pub mod store;
pub mod traits;
pub mod transform;

// Re-exports
pub use config::RegistryConfig;
pub use error::{RegistrationError, Result};
pub use hasher::ArtifactHasher;
pub use policy::RuntimeInitializationPolicy;
pub use record::{PredefinedType, RecordState};
pub use registry::PredefinitionRegistry;
pub use report::{BlockingError, DefinedEntry, SealReport, SkippedSummary};
pub use source::DirectoryArtifactSource;
pub use store::RecordStore;
pub use traits::{
    AliasRegistry, ArtifactCodec, ArtifactSource, Collaborators, DefinedType, DefinitionPolicy,
    DefinitionSink, InitializationPolicy, ResolvabilityOracle,
};
pub use transform::SynthesizedSiteTransformer;

pub use predefine_types::{
    ArtifactHash, ArtifactHeader, SourceLocator, TypeHandle, TypeKind, TypeName,
};
