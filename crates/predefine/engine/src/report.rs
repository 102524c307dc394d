//! Seal-time outcome classification.

use std::fmt;

use predefine_types::{TypeHandle, TypeKind, TypeName};
use serde::{Deserialize, Serialize};

use crate::error::{RegistrationError, Result};
use crate::traits::InitializationPolicy;

/// A record that can never be defined and what it waits on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockingError {
    pub name: TypeName,
    /// Sorted by name.
    pub blocked_by: Vec<TypeName>,
}

impl BlockingError {
    pub fn new(name: TypeName, mut blocked_by: Vec<TypeName>) -> Self {
        blocked_by.sort();
        Self { name, blocked_by }
    }
}

impl fmt::Display for BlockingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.blocked_by.iter().map(|n| n.as_str()).collect();
        write!(
            f,
            "type {} is blocked by supertypes that are neither resolvable nor predefined: {}",
            self.name,
            names.join(", ")
        )
    }
}

/// A successfully defined type and the policy decided for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefinedEntry {
    pub name: TypeName,
    pub handle: TypeHandle,
    pub kind: TypeKind,
    pub initialization: InitializationPolicy,
}

/// Skipped names, summarized with a bounded sample.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedSummary {
    pub total: usize,
    pub sample: Vec<TypeName>,
}

impl SkippedSummary {
    pub fn from_names(names: Vec<TypeName>, limit: usize) -> Self {
        let total = names.len();
        let sample = names.into_iter().take(limit).collect();
        Self { total, sample }
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

impl fmt::Display for SkippedSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.sample.iter().map(|n| n.as_str()).collect();
        write!(
            f,
            "skipped {} predefined type(s) because the host already contains a type with the same name: {}",
            self.total,
            names.join(", ")
        )?;
        if self.total > self.sample.len() {
            write!(f, ", ...")?;
        }
        Ok(())
    }
}

/// Final outcome of a registration phase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealReport {
    /// In name order.
    pub defined: Vec<DefinedEntry>,
    pub skipped: SkippedSummary,
    /// Every stuck record, in name order.
    pub blocking_errors: Vec<BlockingError>,
    /// Names that others wait on but nobody submitted.
    pub missing: Vec<TypeName>,
    /// Types the host refused to define.
    pub failed: Vec<TypeName>,
    /// Definable types left behind when a host failure stopped the cascade.
    pub abandoned: Vec<TypeName>,
}

impl SealReport {
    pub fn defined_count(&self) -> usize {
        self.defined.len()
    }

    /// Every submitted type was defined or skipped.
    pub fn is_clean(&self) -> bool {
        self.blocking_errors.is_empty() && self.failed.is_empty() && self.abandoned.is_empty()
    }

    /// Turn undefined records into a single build-aborting error. Host
    /// failures are reported ahead of the chains they block.
    pub fn into_result(self) -> Result<SealReport> {
        if !self.failed.is_empty() || !self.abandoned.is_empty() {
            Err(RegistrationError::IncompleteDefinition {
                failed: self.failed,
                abandoned: self.abandoned,
            })
        } else if !self.blocking_errors.is_empty() {
            Err(RegistrationError::UnresolvedSupertypeChain(
                self.blocking_errors,
            ))
        } else {
            Ok(self)
        }
    }
}
