//! Header information read from a binary type artifact.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::name::TypeName;

/// Category of a defined type, as declared by its artifact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    #[default]
    Class,
    Interface,
    Annotation,
    Enum,
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeKind::Class => write!(f, "class"),
            TypeKind::Interface => write!(f, "interface"),
            TypeKind::Annotation => write!(f, "annotation"),
            TypeKind::Enum => write!(f, "enum"),
        }
    }
}

/// The parts of an artifact the registration engine needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactHeader {
    /// Self-declared name; takes precedence over any caller hint.
    pub name: TypeName,
    /// Absent only for a root type.
    pub superclass: Option<TypeName>,
    pub interfaces: Vec<TypeName>,
    pub kind: TypeKind,
}

impl ArtifactHeader {
    pub fn new(name: impl Into<TypeName>) -> Self {
        Self {
            name: name.into(),
            superclass: None,
            interfaces: Vec::new(),
            kind: TypeKind::Class,
        }
    }

    /// Every supertype the artifact needs before it can be defined:
    /// the superclass first, then interfaces in declared order.
    pub fn supertypes(&self) -> impl Iterator<Item = &TypeName> {
        self.superclass.iter().chain(self.interfaces.iter())
    }
}
