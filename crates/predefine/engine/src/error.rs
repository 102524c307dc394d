//! Registration error types

use predefine_types::{CodecError, DefineError, TypeName};
use thiserror::Error;

use crate::report::BlockingError;

/// Errors raised while registering or sealing predefined types.
///
/// Every variant aborts the build; skipped collisions are reported, not raised.
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("cannot predefine type with hash {hash} from {locator} because predefinition is disabled; enable it with `enabled = true`")]
    FeatureDisabled { hash: String, locator: String },

    #[error("too late to add predefined types: registration must happen before the registry is sealed")]
    SealedRegistry,

    #[error("cannot prepare type with hash {hash} from {locator} for predefinition: {reason}")]
    MissingSource {
        hash: String,
        locator: String,
        reason: String,
    },

    #[error("failed to prepare type with hash {hash} for predefinition: {source}")]
    MalformedArtifact {
        hash: String,
        #[source]
        source: CodecError,
    },

    #[error("more than one predefined type with the same name provided: {0}")]
    ConflictingDefinition(TypeName),

    #[error("{} predefined type(s) can never be defined: {}", .0.len(), describe_chains(.0))]
    UnresolvedSupertypeChain(Vec<BlockingError>),

    #[error(
        "predefined types left undefined after a host failure: failed [{}], abandoned [{}]",
        join_names(.failed),
        join_names(.abandoned)
    )]
    IncompleteDefinition {
        failed: Vec<TypeName>,
        abandoned: Vec<TypeName>,
    },

    #[error("host failed to define {name}: {source}")]
    Definition {
        name: TypeName,
        #[source]
        source: DefineError,
    },
}

fn describe_chains(chains: &[BlockingError]) -> String {
    chains
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

fn join_names(names: &[TypeName]) -> String {
    names
        .iter()
        .map(TypeName::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type for registration operations
pub type Result<T> = std::result::Result<T, RegistrationError>;
