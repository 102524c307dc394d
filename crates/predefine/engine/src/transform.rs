//! Rewrite applied to synthesized callable-site artifacts.
//!
//! Synthesized sites are captured under a name that carries a uniqueness
//! suffix (`com.example.Foo$$Lambda$3f2a...`), while the artifact itself
//! still declares the bare prefix (`com.example.Foo$$Lambda`). The type must
//! be defined under the requested name, and the factory that instantiates it
//! later needs public access to its instance field and constructor.

use std::sync::Arc;

use predefine_types::{CodecError, TypeName};
use tracing::debug;

use crate::config::RegistryConfig;
use crate::traits::ArtifactCodec;

/// Renames synthesized-site artifacts and widens their factory members.
#[derive(Clone)]
pub struct SynthesizedSiteTransformer {
    codec: Arc<dyn ArtifactCodec>,
    marker: String,
    instance_field: String,
    constructor: String,
}

impl SynthesizedSiteTransformer {
    pub fn new(codec: Arc<dyn ArtifactCodec>, config: &RegistryConfig) -> Self {
        Self {
            codec,
            marker: config.synthesized_site_marker.clone(),
            instance_field: config.instance_field.clone(),
            constructor: config.constructor_name.clone(),
        }
    }

    /// Whether `requested` follows the synthesized-site naming pattern.
    pub fn applies_to(&self, requested: &str) -> bool {
        !self.marker.is_empty() && requested.contains(&self.marker)
    }

    /// The name the artifact declares internally: `requested` cut right
    /// after the first marker.
    pub fn internal_name<'a>(&self, requested: &'a str) -> Option<&'a str> {
        if !self.applies_to(requested) {
            return None;
        }
        requested
            .find(&self.marker)
            .map(|at| &requested[..at + self.marker.len()])
    }

    /// Rename the artifact to `requested` and widen the instance field and
    /// constructor. Names that do not match the pattern pass through.
    pub fn transform(&self, bytes: Vec<u8>, requested: &str) -> Result<Vec<u8>, CodecError> {
        let Some(internal) = self.internal_name(requested) else {
            return Ok(bytes);
        };

        let renamed = if internal == requested {
            bytes
        } else {
            debug!(from = internal, to = requested, "Renaming synthesized site");
            self.codec.rename_type(
                &bytes,
                &TypeName::new(internal),
                &TypeName::new(requested),
            )?
        };

        self.codec
            .widen_member_access(&renamed, &self.instance_field, &self.constructor)
    }
}
