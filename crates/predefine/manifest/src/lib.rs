//! Predefined-types manifest - the upstream source of predefinition requests
//!
//! - **PredefinedManifest**: origins and their artifact entries, parsed from
//!   the JSON manifest written alongside recorded artifacts
//! - **register_all**: submits every entry to a [`PredefinitionRegistry`]
//!   in file order
//!
//! [`PredefinitionRegistry`]: predefine_engine::PredefinitionRegistry

#![deny(unsafe_code)]

pub mod error;
pub mod manifest;

// Re-exports
pub use error::{ManifestError, Result};
pub use manifest::{
    register_all, ManifestEntry, ManifestOrigin, OriginKind, PredefinedManifest,
    AGENT_EXTRACTED_DIR,
};
