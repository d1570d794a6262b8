#![forbid(unsafe_code)]

//! Mapper records.
//!
//! A mapper binds one source node to the target node it created. The engine
//! owns every mapper in an id-keyed table; parent links are ids, and the
//! source is held weakly so the binding never extends the domain's lifetime.

use std::fmt;

use cellmap_model::{Color, Node, NodeId, WeakNode};

use crate::counters::Counters;
use crate::synchronizer::{SyncKind, Synchronizer};
use crate::target::TargetId;

/// Identity of a mapper within one binder. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MapperId(u64);

impl MapperId {
    pub(crate) const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for MapperId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m{}", self.0)
    }
}

/// Lifecycle of a mapper.
///
/// ```text
/// Attaching ──▶ Attached ──▶ Detaching ──▶ (removed)
///     └───────────────────────────▲  (rollback)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttachState {
    Attaching,
    Attached,
    Detaching,
}

pub(crate) struct Mapper {
    pub(crate) id: MapperId,
    pub(crate) source: WeakNode,
    pub(crate) target: TargetId,
    pub(crate) parent: Option<MapperId>,
    pub(crate) kind: String,
    pub(crate) leaf: bool,
    pub(crate) state: AttachState,
    pub(crate) synchronizers: Vec<Synchronizer>,
    pub(crate) counters: Counters,
    pub(crate) ancestor_background: Option<Color>,
}

impl Mapper {
    pub(crate) fn new(
        id: MapperId,
        source: &Node,
        target: TargetId,
        parent: Option<MapperId>,
        kind: &str,
        leaf: bool,
    ) -> Self {
        Self {
            id,
            source: source.downgrade(),
            target,
            parent,
            kind: kind.to_owned(),
            leaf,
            state: AttachState::Attaching,
            synchronizers: Vec::new(),
            counters: Counters::new(),
            ancestor_background: None,
        }
    }

    /// Child mappers that inherit this mapper's background: structural
    /// children and role children, but not popups.
    pub(crate) fn inheriting_children(&self) -> Vec<MapperId> {
        self.synchronizers
            .iter()
            .flat_map(|sync| match sync {
                Synchronizer::Children(c) => c.mappers.as_slice(),
                Synchronizer::Role(r) => r.mappers.as_slice(),
                _ => &[][..],
            })
            .copied()
            .collect()
    }

    /// Every child mapper regardless of how it was created.
    pub(crate) fn all_children(&self) -> Vec<MapperId> {
        let mut out = self.inheriting_children();
        for sync in &self.synchronizers {
            if let Synchronizer::Overlay(o) = sync {
                out.extend(o.occupied().into_iter().map(|(_, id)| id));
            }
        }
        out
    }

    pub(crate) fn sync_index(&self, kind: SyncKind) -> Option<usize> {
        self.synchronizers.iter().position(|s| s.kind() == kind)
    }

    pub(crate) fn subscription_count(&self) -> usize {
        self.synchronizers
            .iter()
            .map(Synchronizer::subscription_count)
            .sum()
    }

    pub(crate) fn info(&self) -> MapperInfo {
        MapperInfo {
            id: self.id,
            source_id: self.source.id(),
            source: self.source.upgrade(),
            kind: self.kind.clone(),
            target: self.target,
            parent: self.parent,
            children: self.all_children(),
            synchronizers: self.synchronizers.iter().map(Synchronizer::kind).collect(),
            state: self.state,
            leaf: self.leaf,
        }
    }
}

/// Read-only snapshot of a mapper.
#[derive(Debug, Clone, PartialEq)]
pub struct MapperInfo {
    pub id: MapperId,
    pub source_id: NodeId,
    /// The source node, if the domain still holds it.
    pub source: Option<Node>,
    pub kind: String,
    pub target: TargetId,
    pub parent: Option<MapperId>,
    pub children: Vec<MapperId>,
    pub synchronizers: Vec<SyncKind>,
    pub state: AttachState,
    pub leaf: bool,
}
