#![deny(unsafe_code)]
//! # predefine-types
//!
//! Value types shared by the predefinition engine and its upstream sources.
//!
//! - [`ArtifactHash`]: BLAKE3 content digest of a type artifact
//! - [`TypeName`]: dotted fully-qualified type name
//! - [`TypeHandle`]: opaque identity of a type defined by the host
//! - [`SourceLocator`]: where an artifact can be fetched from
//! - [`ArtifactHeader`]: name, superclass and interfaces read from an artifact

pub mod artifact;
pub mod error;
pub mod hash;
pub mod name;

pub use artifact::{ArtifactHeader, TypeKind};
pub use error::{CodecError, DefineError, SourceError};
pub use hash::{ArtifactHash, HashParseError};
pub use name::{SourceLocator, TypeHandle, TypeName};
