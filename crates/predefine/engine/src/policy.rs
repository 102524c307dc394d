//! Default post-definition policy.

use predefine_types::TypeKind;
use tracing::debug;

use crate::traits::{DefinedType, DefinitionPolicy, InitializationPolicy};

/// Defers initialization of predefined types to run time. Annotations and
/// enums carry no user-visible initialization side effects and may be
/// initialized at build time.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeInitializationPolicy;

impl DefinitionPolicy for RuntimeInitializationPolicy {
    fn on_defined(&self, defined: &DefinedType) -> InitializationPolicy {
        let policy = match defined.kind {
            TypeKind::Annotation | TypeKind::Enum => InitializationPolicy::BuildTime,
            TypeKind::Class | TypeKind::Interface => InitializationPolicy::RunTime,
        };
        debug!(name = %defined.name, kind = %defined.kind, ?policy, "Initialization policy");
        policy
    }
}
