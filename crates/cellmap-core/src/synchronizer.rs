#![forbid(unsafe_code)]

//! Synchronizers: the units of live binding inside a mapper.
//!
//! The variant set is closed. Each variant owns a [`BindingScope`] for its
//! subscriptions, so dropping a synchronizer stops all of its callbacks.
//! Variants that create child mappers (role and overlay) expose them through
//! [`Synchronizer::nested_mappers`] for provider lookups; structural children
//! are registered with the context directly and are not nested.

use cellmap_model::{BindingScope, NodeId, PopupSlot, Value, WeakNode, WeakObservable};

use crate::mapper::MapperId;
use crate::target::TargetId;

/// Discriminant of a [`Synchronizer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncKind {
    Style,
    Children,
    Property,
    Role,
    Overlay,
    Part,
}

/// Direction of a property mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    /// Source changes flow to the target attribute.
    #[default]
    OneWay,
    /// Target attribute writes also flow back to the source property.
    TwoWay,
}

#[derive(Debug)]
pub(crate) struct StyleSync {
    pub(crate) scope: BindingScope,
}

#[derive(Debug)]
pub(crate) struct ChildrenSync {
    pub(crate) scope: BindingScope,
    /// One mapper per source child, in source order.
    pub(crate) mappers: Vec<MapperId>,
}

#[derive(Debug)]
pub(crate) struct PropertySync {
    pub(crate) scope: BindingScope,
    pub(crate) property: WeakObservable<Value>,
    pub(crate) attribute: String,
    pub(crate) direction: Direction,
}

#[derive(Debug)]
pub(crate) struct RoleSync {
    pub(crate) scope: BindingScope,
    pub(crate) name: String,
    pub(crate) container: TargetId,
    pub(crate) mappers: Vec<MapperId>,
}

#[derive(Debug)]
pub(crate) struct OverlaySync {
    pub(crate) scope: BindingScope,
    pub(crate) popups: [Option<MapperId>; 4],
}

impl OverlaySync {
    pub(crate) fn new(scope: BindingScope) -> Self {
        Self {
            scope,
            popups: [None; 4],
        }
    }

    pub(crate) fn occupied(&self) -> Vec<(PopupSlot, MapperId)> {
        PopupSlot::ALL
            .iter()
            .filter_map(|slot| self.popups[slot.index()].map(|id| (*slot, id)))
            .collect()
    }
}

/// A fixed target node standing for a source node (or decorating the owner
/// when `source` is `None`).
#[derive(Debug)]
pub(crate) struct PartSync {
    pub(crate) source: Option<WeakNode>,
    pub(crate) target: TargetId,
}

#[derive(Debug)]
pub(crate) enum Synchronizer {
    Style(StyleSync),
    Children(ChildrenSync),
    Property(PropertySync),
    Role(RoleSync),
    Overlay(OverlaySync),
    Part(PartSync),
}

impl Synchronizer {
    pub(crate) fn kind(&self) -> SyncKind {
        match self {
            Self::Style(_) => SyncKind::Style,
            Self::Children(_) => SyncKind::Children,
            Self::Property(_) => SyncKind::Property,
            Self::Role(_) => SyncKind::Role,
            Self::Overlay(_) => SyncKind::Overlay,
            Self::Part(_) => SyncKind::Part,
        }
    }

    /// Child mappers reachable only through this synchronizer.
    pub(crate) fn nested_mappers(&self) -> Option<Vec<MapperId>> {
        match self {
            Self::Role(r) => Some(r.mappers.clone()),
            Self::Overlay(o) => Some(o.occupied().into_iter().map(|(_, id)| id).collect()),
            _ => None,
        }
    }

    pub(crate) fn subscription_count(&self) -> usize {
        match self {
            Self::Style(s) => s.scope.len(),
            Self::Children(c) => c.scope.len(),
            Self::Property(p) => p.scope.len(),
            Self::Role(r) => r.scope.len(),
            Self::Overlay(o) => o.scope.len(),
            Self::Part(_) => 0,
        }
    }

    /// Targets this synchronizer creates for `source`.
    pub(crate) fn targets_for(&self, source: NodeId) -> Option<TargetId> {
        match self {
            Self::Part(PartSync {
                source: Some(weak),
                target,
            }) if weak.id() == source => Some(*target),
            _ => None,
        }
    }

    /// Source this synchronizer renders at `target`.
    pub(crate) fn source_for(&self, target: TargetId) -> Option<&WeakNode> {
        match self {
            Self::Part(PartSync {
                source: Some(weak),
                target: own,
            }) if *own == target => Some(weak),
            _ => None,
        }
    }
}
