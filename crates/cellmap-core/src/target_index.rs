#![forbid(unsafe_code)]

//! Reverse index from target nodes to the mappers that claim them.
//!
//! Built lazily the first time a provider needs reverse lookups, then kept
//! current by the context on every register, claim, release, and
//! unregister.

use ahash::AHashMap;

use crate::mapper::MapperId;
use crate::target::TargetId;

/// Target → claiming mappers, in claim order.
#[derive(Debug, Clone, Default)]
pub struct TargetIndex {
    by_target: AHashMap<TargetId, Vec<MapperId>>,
}

impl TargetIndex {
    pub(crate) fn insert(&mut self, target: TargetId, mapper: MapperId) {
        let claims = self.by_target.entry(target).or_default();
        if !claims.contains(&mapper) {
            claims.push(mapper);
        }
    }

    pub(crate) fn remove(&mut self, target: TargetId, mapper: MapperId) -> bool {
        let Some(claims) = self.by_target.get_mut(&target) else {
            return false;
        };
        let before = claims.len();
        claims.retain(|m| *m != mapper);
        let removed = claims.len() != before;
        if claims.is_empty() {
            self.by_target.remove(&target);
        }
        removed
    }

    pub(crate) fn clear(&mut self) {
        self.by_target.clear();
    }

    /// Mappers claiming `target`.
    #[must_use]
    pub fn mappers(&self, target: TargetId) -> &[MapperId] {
        self.by_target
            .get(&target)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of indexed targets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_target.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_target.is_empty()
    }
}
