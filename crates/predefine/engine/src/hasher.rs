//! Raw and canonical artifact digests.

use std::sync::Arc;

use predefine_types::{ArtifactHash, CodecError};

use crate::traits::ArtifactCodec;

/// Computes the two digests the registry tracks per artifact.
///
/// The raw hash identifies the exact bytes a caller asked for. The canonical
/// hash ignores debug information, so two builds of the same type that differ
/// only in line tables or source file names are recognized as one.
#[derive(Clone)]
pub struct ArtifactHasher {
    codec: Arc<dyn ArtifactCodec>,
}

impl ArtifactHasher {
    pub fn new(codec: Arc<dyn ArtifactCodec>) -> Self {
        Self { codec }
    }

    /// Digest over the bytes exactly as given.
    pub fn digest(&self, bytes: &[u8]) -> ArtifactHash {
        ArtifactHash::hash(bytes)
    }

    /// Debug-stripped form of the artifact.
    pub fn canonicalize(&self, bytes: &[u8]) -> Result<Vec<u8>, CodecError> {
        self.codec.strip_debug_info(bytes)
    }

    /// `digest(canonicalize(bytes))`
    pub fn canonical_digest(&self, bytes: &[u8]) -> Result<ArtifactHash, CodecError> {
        let canonical = self.canonicalize(bytes)?;
        Ok(self.digest(&canonical))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{DebugInfo, StructuredArtifact, StructuredArtifactCodec};

    fn hasher() -> ArtifactHasher {
        ArtifactHasher::new(Arc::new(StructuredArtifactCodec))
    }

    #[test]
    fn debug_info_does_not_change_canonical_digest() {
        let plain = StructuredArtifact::new("a/Foo").extends("java/lang/Object");
        let debug = plain.clone().with_debug(DebugInfo {
            source_file: Some("Foo.java".into()),
            line_numbers: vec![1, 2, 3],
            local_variables: vec!["this".into()],
        });

        let h = hasher();
        let (plain, debug) = (plain.encode(), debug.encode());
        assert_ne!(h.digest(&plain), h.digest(&debug));
        assert_eq!(
            h.canonical_digest(&plain).unwrap(),
            h.canonical_digest(&debug).unwrap()
        );
    }

    #[test]
    fn structural_change_changes_canonical_digest() {
        let a = StructuredArtifact::new("a/Foo").extends("java/lang/Object");
        let b = StructuredArtifact::new("a/Foo").extends("a/Base");
        let h = hasher();
        assert_ne!(
            h.canonical_digest(&a.encode()).unwrap(),
            h.canonical_digest(&b.encode()).unwrap()
        );
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(hasher().canonical_digest(b"\xca\xfe\xba\xbe").is_err());
    }
}
