//! Name-indexed record store and pending-edge bookkeeping.
//!
//! Records never point at each other; edges are name sets kept mirrored:
//! `B ∈ A.pending_supertypes` iff `A ∈ B.pending_subtypes`.

use std::collections::BTreeMap;

use predefine_types::TypeName;

use crate::record::PredefinedType;

/// All records known to a registry, keyed by type name.
#[derive(Debug, Default)]
pub struct RecordStore {
    records: BTreeMap<TypeName, PredefinedType>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &TypeName) -> Option<&PredefinedType> {
        self.records.get(name)
    }

    pub(crate) fn get_mut(&mut self, name: &TypeName) -> Option<&mut PredefinedType> {
        self.records.get_mut(name)
    }

    /// Look up a record, creating an empty placeholder if absent.
    pub(crate) fn get_or_insert(&mut self, name: &TypeName) -> &mut PredefinedType {
        self.records
            .entry(name.clone())
            .or_insert_with(|| PredefinedType::new(name.clone()))
    }

    /// Whether `name` was defined here or skipped because the host has it.
    pub fn is_resolved(&self, name: &TypeName) -> bool {
        self.records.get(name).is_some_and(PredefinedType::is_resolved)
    }

    /// Record that `subtype` waits on `supertype`, on both sides.
    pub(crate) fn add_pending_edge(&mut self, subtype: &TypeName, supertype: &TypeName) {
        let sup = self.get_or_insert(supertype);
        debug_assert!(!sup.is_resolved(), "resolved types impose no dependency");
        sup.pending_subtypes.insert(subtype.clone());

        let sub = self.get_or_insert(subtype);
        sub.pending_supertypes.insert(supertype.clone());
    }

    /// Drop every edge into `supertype` once it is resolved. Returns the
    /// subtypes that have nothing left to wait on, in name order.
    pub(crate) fn release_subtypes(&mut self, supertype: &TypeName) -> Vec<TypeName> {
        let subtypes = match self.records.get_mut(supertype) {
            Some(record) => std::mem::take(&mut record.pending_subtypes),
            None => return Vec::new(),
        };

        let mut unlocked = Vec::new();
        for name in subtypes {
            let Some(sub) = self.records.get_mut(&name) else {
                continue;
            };
            let removed = sub.pending_supertypes.remove(supertype);
            debug_assert!(removed, "edge sets must be mirrored");
            if sub.pending_supertypes.is_empty() && sub.pending_bytes.is_some() {
                unlocked.push(name);
            }
        }
        unlocked
    }

    pub fn iter(&self) -> impl Iterator<Item = &PredefinedType> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Check the mirrored-edge invariant across the whole store.
    pub fn edges_consistent(&self) -> bool {
        self.records.values().all(|record| {
            record.pending_supertypes.iter().all(|sup| {
                self.records
                    .get(sup)
                    .is_some_and(|s| s.pending_subtypes.contains(&record.name))
            }) && record.pending_subtypes.iter().all(|sub| {
                self.records
                    .get(sub)
                    .is_some_and(|s| s.pending_supertypes.contains(&record.name))
            })
        })
    }
}
