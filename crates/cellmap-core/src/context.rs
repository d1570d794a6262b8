#![forbid(unsafe_code)]

//! Mapping context: the registry of attached mappers.
//!
//! Every attached mapper is registered under its source node with the
//! targets it claims (its own target, role containers, parts). Lookups by
//! source are filtered to the subtree of a given root mapper, so a provider
//! only sees mappers it encloses.
//!
//! # Invariants
//!
//! 1. A mapper is registered exactly while it is attached (or attaching).
//! 2. Once created, the target index mirrors every registration's claims.
//! 3. Unregistering an unknown mapper is reported, never silently ignored.

use ahash::AHashMap;
use cellmap_model::NodeId;

use crate::error::MappingError;
use crate::mapper::MapperId;
use crate::target::TargetId;
use crate::target_index::TargetIndex;

#[derive(Debug, Clone)]
struct Registration {
    source: NodeId,
    parent: Option<MapperId>,
    targets: Vec<TargetId>,
}

/// Registry of mappers for one binder.
#[derive(Debug, Default)]
pub struct MappingContext {
    root: Option<MapperId>,
    by_source: AHashMap<NodeId, Vec<MapperId>>,
    registrations: AHashMap<MapperId, Registration>,
    target_index: Option<TargetIndex>,
}

impl MappingContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Root mapper, while attached.
    #[must_use]
    pub fn root(&self) -> Option<MapperId> {
        self.root
    }

    pub(crate) fn set_root(&mut self, root: Option<MapperId>) {
        self.root = root;
    }

    /// Number of registered mappers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    #[must_use]
    pub fn contains(&self, mapper: MapperId) -> bool {
        self.registrations.contains_key(&mapper)
    }

    pub(crate) fn register(
        &mut self,
        mapper: MapperId,
        source: NodeId,
        parent: Option<MapperId>,
        target: TargetId,
    ) -> Result<(), MappingError> {
        if self.registrations.contains_key(&mapper) {
            return Err(MappingError::Inconsistent(format!(
                "mapper {mapper} registered twice"
            )));
        }
        self.registrations.insert(
            mapper,
            Registration {
                source,
                parent,
                targets: vec![target],
            },
        );
        self.by_source.entry(source).or_default().push(mapper);
        if let Some(index) = self.target_index.as_mut() {
            index.insert(target, mapper);
        }
        Ok(())
    }

    /// Record an additional target claimed by `mapper`.
    pub(crate) fn claim(&mut self, mapper: MapperId, target: TargetId) -> Result<(), MappingError> {
        let reg = self
            .registrations
            .get_mut(&mapper)
            .ok_or(MappingError::UnknownMapper(mapper))?;
        if !reg.targets.contains(&target) {
            reg.targets.push(target);
        }
        if let Some(index) = self.target_index.as_mut() {
            index.insert(target, mapper);
        }
        Ok(())
    }

    pub(crate) fn release(&mut self, mapper: MapperId, target: TargetId) {
        if let Some(reg) = self.registrations.get_mut(&mapper) {
            reg.targets.retain(|t| *t != target);
        }
        if let Some(index) = self.target_index.as_mut() {
            index.remove(target, mapper);
        }
    }

    pub(crate) fn unregister(&mut self, mapper: MapperId) -> Result<(), MappingError> {
        let reg = self.registrations.remove(&mapper).ok_or_else(|| {
            MappingError::Inconsistent(format!("mapper {mapper} was never registered"))
        })?;
        if let Some(list) = self.by_source.get_mut(&reg.source) {
            list.retain(|m| *m != mapper);
            if list.is_empty() {
                self.by_source.remove(&reg.source);
            }
        }
        if let Some(index) = self.target_index.as_mut() {
            for target in &reg.targets {
                index.remove(*target, mapper);
            }
        }
        Ok(())
    }

    /// Forget everything except whether the target index was requested.
    pub(crate) fn reset(&mut self) {
        self.root = None;
        self.by_source.clear();
        self.registrations.clear();
        if let Some(index) = self.target_index.as_mut() {
            index.clear();
        }
    }

    /// Mappers of `source` inside the subtree of `root`, in attach order.
    #[must_use]
    pub fn mappers(&self, root: MapperId, source: NodeId) -> Vec<MapperId> {
        self.by_source
            .get(&source)
            .map(|list| {
                list.iter()
                    .copied()
                    .filter(|m| self.is_under(*m, root))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether `mapper` is `root` or one of its descendants.
    #[must_use]
    pub fn is_under(&self, mapper: MapperId, root: MapperId) -> bool {
        let mut cur = Some(mapper);
        while let Some(id) = cur {
            if id == root {
                return true;
            }
            cur = self.registrations.get(&id).and_then(|r| r.parent);
        }
        false
    }

    /// Targets claimed by `mapper`.
    #[must_use]
    pub fn claimed(&self, mapper: MapperId) -> &[TargetId] {
        self.registrations
            .get(&mapper)
            .map(|r| r.targets.as_slice())
            .unwrap_or(&[])
    }

    #[must_use]
    pub fn target_index(&self) -> Option<&TargetIndex> {
        self.target_index.as_ref()
    }

    /// Create the target index on first use, back-filling current claims.
    pub(crate) fn ensure_target_index(&mut self) -> &TargetIndex {
        let registrations = &self.registrations;
        self.target_index.get_or_insert_with(|| {
            let mut index = TargetIndex::default();
            let mut ids: Vec<&MapperId> = registrations.keys().collect();
            ids.sort_unstable();
            for id in ids {
                for target in &registrations[id].targets {
                    index.insert(*target, *id);
                }
            }
            index
        })
    }
}
