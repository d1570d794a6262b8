#![forbid(unsafe_code)]

//! The binding engine.
//!
//! [`Engine`] owns the mapper table, the target tree, and the mapping
//! context. Subscriptions never touch it directly: every callback posts a
//! [`Change`] to the shared queue, and whoever holds the engine drains the
//! queue before releasing it.
//!
//! # Re-entrancy
//!
//! ```text
//! source mutation ──▶ callback ──▶ Shared::post ──▶ queue
//!                                        │
//!                      engine free? ─────┴──▶ drain now
//!                      engine busy? ───────▶ outer frame drains
//! ```
//!
//! Changes are applied strictly in arrival order, one at a time. A change
//! addressed to a mapper that has since been detached is dropped.
//!
//! # Invariants
//!
//! 1. For every attached mapper with child mapping, the child mapper list
//!    and the target child list are index-aligned with the source list.
//! 2. A mapper is registered in the context exactly while it exists in the
//!    mapper table.
//! 3. A failed attach leaves no registration, target, or subscription behind.
//! 4. Detach releases synchronizers in reverse registration order.
//!
//! # Failure Modes
//!
//! - Factory failures during reactive child insertion cannot be returned
//!   to the mutating caller; the partial attach is rolled back and the
//!   engine panics.
//! - Consistency violations on the reactive path are logged and recorded as
//!   faults (see `Binder::take_faults`).

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use ahash::AHashMap;
use cellmap_model::{
    BindingScope, Color, ListEvent, Node, NodeId, Observable, PopupSlot, Value, WeakNode, props,
};
use tracing::{debug, debug_span, error, trace, warn};

use crate::config::BinderConfig;
use crate::context::MappingContext;
use crate::counters::CounterSpec;
use crate::error::MappingError;
use crate::factory::{MapperConfig, MapperFactory, SyncSpec};
use crate::geometry::{Point, Rect};
use crate::mapper::{AttachState, Mapper, MapperId, MapperInfo};
use crate::overlay;
use crate::style::StyleInputs;
use crate::synchronizer::{
    ChildrenSync, Direction, OverlaySync, PartSync, PropertySync, RoleSync, StyleSync, SyncKind,
    Synchronizer,
};
use crate::target::{Layer, TargetId, TargetNode, TargetTree};

/// A source-side change waiting to be applied.
#[derive(Debug)]
pub(crate) enum Change {
    Children {
        mapper: MapperId,
        event: ListEvent<Node>,
    },
    Role {
        mapper: MapperId,
        sync: usize,
        event: ListEvent<Node>,
    },
    Style {
        mapper: MapperId,
        background: bool,
    },
    Property {
        mapper: MapperId,
        sync: usize,
        value: Value,
    },
    Popup {
        mapper: MapperId,
        slot: PopupSlot,
        popup: Option<Node>,
    },
}

impl Change {
    fn mapper(&self) -> MapperId {
        match self {
            Self::Children { mapper, .. }
            | Self::Role { mapper, .. }
            | Self::Style { mapper, .. }
            | Self::Property { mapper, .. }
            | Self::Popup { mapper, .. } => *mapper,
        }
    }
}

/// Engine plus its pending-change queue.
pub(crate) struct Shared {
    pub(crate) engine: RefCell<Engine>,
    queue: RefCell<VecDeque<Change>>,
}

impl Shared {
    pub(crate) fn new(factory: Box<dyn MapperFactory>, config: BinderConfig) -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            engine: RefCell::new(Engine::new(this.clone(), factory, config)),
            queue: RefCell::new(VecDeque::new()),
        })
    }

    /// Enqueue `change` and apply it now unless the engine is busy.
    pub(crate) fn post(this: &Weak<Self>, change: Change) {
        let Some(shared) = this.upgrade() else {
            return;
        };
        shared.queue.borrow_mut().push_back(change);
        if let Ok(mut engine) = shared.engine.try_borrow_mut() {
            shared.drain(&mut engine);
        }
    }

    /// Run `f` with exclusive engine access, then apply queued changes.
    ///
    /// # Panics
    ///
    /// Panics if called from inside a binding callback.
    pub(crate) fn run<R>(&self, f: impl FnOnce(&mut Engine) -> R) -> R {
        let mut engine = self.engine.borrow_mut();
        let out = f(&mut engine);
        self.drain(&mut engine);
        out
    }

    fn drain(&self, engine: &mut Engine) {
        loop {
            let next = self.queue.borrow_mut().pop_front();
            let Some(change) = next else {
                break;
            };
            engine.apply(change);
        }
    }

    /// Apply queued changes if the engine is free.
    pub(crate) fn settle(&self) {
        if self.pending() == 0 {
            return;
        }
        if let Ok(mut engine) = self.engine.try_borrow_mut() {
            self.drain(&mut engine);
        }
    }

    pub(crate) fn pending(&self) -> usize {
        self.queue.borrow().len()
    }
}

pub(crate) struct Engine {
    this: Weak<Shared>,
    factory: Box<dyn MapperFactory>,
    pub(crate) config: BinderConfig,
    pub(crate) targets: TargetTree,
    mappers: AHashMap<MapperId, Mapper>,
    pub(crate) context: MappingContext,
    pub(crate) overlay_root: TargetId,
    next_mapper: u64,
    faults: Vec<MappingError>,
}

impl Engine {
    fn new(this: Weak<Shared>, factory: Box<dyn MapperFactory>, config: BinderConfig) -> Self {
        let mut targets = TargetTree::new();
        let overlay_root = targets.create_in(&config.overlay_kind, Layer::Overlay, None);
        Self {
            this,
            factory,
            config,
            targets,
            mappers: AHashMap::new(),
            context: MappingContext::new(),
            overlay_root,
            next_mapper: 0,
            faults: Vec::new(),
        }
    }

    // ---- lifecycle ----

    pub(crate) fn attach_root(&mut self, node: &Node) -> Result<MapperId, MappingError> {
        if self.context.root().is_some() {
            return Err(MappingError::AlreadyAttached);
        }
        let _span = debug_span!("attach_root", source = %node.id(), kind = node.kind()).entered();
        let id = self.spawn(node, None, false)?;
        self.context.set_root(Some(id));
        debug!(mapper = %id, mappers = self.context.len(), "root attached");
        Ok(id)
    }

    pub(crate) fn detach_root(&mut self) -> bool {
        let Some(root) = self.context.root() else {
            warn!("detach requested with no attached root");
            return false;
        };
        let _span = debug_span!("detach_root", mapper = %root).entered();
        self.detach(root);
        if !self.context.is_empty() {
            let leaked = self.context.len();
            self.fault(MappingError::Inconsistent(format!(
                "{leaked} mappers still registered after root detach"
            )));
        }
        self.context.reset();
        debug!(targets = self.targets.len(), "root detached");
        true
    }

    /// Create, register, and attach a mapper for `node`.
    ///
    /// On failure everything created so far is rolled back.
    fn spawn(
        &mut self,
        node: &Node,
        parent: Option<MapperId>,
        inherit: bool,
    ) -> Result<MapperId, MappingError> {
        let config = self
            .factory
            .create(node)
            .ok_or_else(|| MappingError::NoMapper {
                node: node.id(),
                kind: node.kind().to_owned(),
            })?;
        config.validate()?;

        self.next_mapper += 1;
        let id = MapperId::new(self.next_mapper);
        let target = self.targets.create(&config.kind, Some(id));
        let mut mapper = Mapper::new(id, node, target, parent, &config.kind, config.leaf);
        if inherit {
            mapper.ancestor_background = parent.and_then(|p| self.effective_background(p));
        }
        self.mappers.insert(id, mapper);

        let _span = debug_span!("mapper_attach", mapper = %id, kind = %config.kind).entered();
        if let Err(err) = self.attach(id, node, config) {
            trace!(mapper = %id, error = %err, "attach failed, rolling back");
            self.detach(id);
            return Err(err);
        }
        trace!(mapper = %id, "attached");
        Ok(id)
    }

    fn attach(
        &mut self,
        id: MapperId,
        node: &Node,
        config: MapperConfig,
    ) -> Result<(), MappingError> {
        let MapperConfig {
            auto_children,
            overlays,
            syncs,
            ..
        } = config;
        let (target, parent) = {
            let mapper = self.mapper(id)?;
            (mapper.target, mapper.parent)
        };
        self.context.register(id, node.id(), parent, target)?;

        let style = self.watch_style(id, node);
        self.push_sync(id, Synchronizer::Style(style))?;

        if auto_children {
            let sync = ChildrenSync {
                scope: self.watch_children(id, node),
                mappers: Vec::new(),
            };
            let index = self.push_sync(id, Synchronizer::Children(sync))?;
            for (position, child) in node.children().to_vec().iter().enumerate() {
                let child_id = self.spawn(child, Some(id), true)?;
                self.place_child(id, index, position, child_id)?;
            }
        }

        for spec in syncs {
            self.attach_spec(id, target, spec)?;
        }

        if overlays && self.config.overlays {
            let scope = self.watch_popups(id, node);
            let index = self.push_sync(id, Synchronizer::Overlay(OverlaySync::new(scope)))?;
            for slot in PopupSlot::ALL {
                if let Some(popup) = node.popup(slot).get() {
                    self.show_popup(id, index, slot, &popup)?;
                }
            }
        }

        self.mapper_mut(id)?.state = AttachState::Attached;
        self.refresh_properties(id)
    }

    fn attach_spec(
        &mut self,
        id: MapperId,
        target: TargetId,
        spec: SyncSpec,
    ) -> Result<(), MappingError> {
        let index = self.mapper(id)?.synchronizers.len();
        match spec {
            SyncSpec::Property {
                property,
                attribute,
                direction,
            } => {
                let mut scope = BindingScope::new();
                let this = self.this.clone();
                scope.watch(&property, move |value: &Value| {
                    Shared::post(
                        &this,
                        Change::Property {
                            mapper: id,
                            sync: index,
                            value: value.clone(),
                        },
                    );
                });
                self.targets.set_attribute(target, &attribute, property.get());
                self.push_sync(
                    id,
                    Synchronizer::Property(PropertySync {
                        scope,
                        property: property.downgrade(),
                        attribute,
                        direction,
                    }),
                )?;
            }
            SyncSpec::Role { name, list } => {
                let mut scope = BindingScope::new();
                let this = self.this.clone();
                scope.watch_list(&list, move |event: &ListEvent<Node>| {
                    Shared::post(
                        &this,
                        Change::Role {
                            mapper: id,
                            sync: index,
                            event: event.clone(),
                        },
                    );
                });
                let container = self.targets.create(&format!("role:{name}"), Some(id));
                // Recorded before linking so a rollback frees the container.
                self.push_sync(
                    id,
                    Synchronizer::Role(RoleSync {
                        scope,
                        name,
                        container,
                        mappers: Vec::new(),
                    }),
                )?;
                self.context.claim(id, container)?;
                self.targets.push_child(target, container)?;
                for (position, child) in list.to_vec().iter().enumerate() {
                    let child_id = self.spawn(child, Some(id), true)?;
                    self.place_child(id, index, position, child_id)?;
                }
            }
            SyncSpec::Part { kind, source } => {
                let part = self.targets.create(&kind, Some(id));
                self.push_sync(
                    id,
                    Synchronizer::Part(PartSync {
                        source: source.as_ref().map(Node::downgrade),
                        target: part,
                    }),
                )?;
                self.context.claim(id, part)?;
                self.targets.push_child(target, part)?;
            }
        }
        Ok(())
    }

    /// Tear down `id` and everything it created. Unknown ids are ignored.
    pub(crate) fn detach(&mut self, id: MapperId) {
        let Some(mapper) = self.mappers.get_mut(&id) else {
            warn!(mapper = %id, "detach of unknown mapper ignored");
            return;
        };
        if mapper.state == AttachState::Detaching {
            return;
        }
        mapper.state = AttachState::Detaching;
        let target = mapper.target;
        let synchronizers = std::mem::take(&mut mapper.synchronizers);

        for sync in synchronizers.into_iter().rev() {
            self.release(id, sync);
        }
        let leftovers = self.targets.children(target).to_vec();
        for child in leftovers {
            self.targets.free_subtree(child);
        }
        if let Err(err) = self.context.unregister(id) {
            self.fault(err);
        }
        self.targets.free_subtree(target);
        self.mappers.remove(&id);
        trace!(mapper = %id, "detached");
    }

    fn release(&mut self, owner: MapperId, sync: Synchronizer) {
        match sync {
            Synchronizer::Children(ChildrenSync { scope, mappers }) => {
                drop(scope);
                for child in mappers.into_iter().rev() {
                    self.detach(child);
                }
            }
            Synchronizer::Role(RoleSync {
                scope,
                container,
                mappers,
                ..
            }) => {
                drop(scope);
                for child in mappers.into_iter().rev() {
                    self.detach(child);
                }
                self.context.release(owner, container);
                self.targets.free_subtree(container);
            }
            Synchronizer::Overlay(OverlaySync { scope, popups }) => {
                drop(scope);
                for popup in popups.into_iter().rev().flatten() {
                    self.detach(popup);
                }
            }
            Synchronizer::Part(PartSync { target, .. }) => {
                self.context.release(owner, target);
                self.targets.free_subtree(target);
            }
            Synchronizer::Style(_) | Synchronizer::Property(_) => {}
        }
    }

    // ---- subscriptions ----

    fn watch_style(&self, id: MapperId, node: &Node) -> StyleSync {
        let mut scope = BindingScope::new();
        let style_props = props::STYLE;
        for spec in &style_props {
            let this = self.this.clone();
            let background = spec.name == props::BACKGROUND.name;
            scope.watch(&node.property(spec), move |_: &Value| {
                Shared::post(
                    &this,
                    Change::Style {
                        mapper: id,
                        background,
                    },
                );
            });
        }
        StyleSync { scope }
    }

    fn watch_children(&self, id: MapperId, node: &Node) -> BindingScope {
        let mut scope = BindingScope::new();
        let this = self.this.clone();
        scope.watch_list(&node.children(), move |event: &ListEvent<Node>| {
            Shared::post(
                &this,
                Change::Children {
                    mapper: id,
                    event: event.clone(),
                },
            );
        });
        scope
    }

    fn watch_popups(&self, id: MapperId, node: &Node) -> BindingScope {
        let mut scope = BindingScope::new();
        for slot in PopupSlot::ALL {
            let this = self.this.clone();
            scope.watch(&node.popup(slot), move |popup: &Option<Node>| {
                Shared::post(
                    &this,
                    Change::Popup {
                        mapper: id,
                        slot,
                        popup: popup.clone(),
                    },
                );
            });
        }
        scope
    }

    // ---- change application ----

    pub(crate) fn apply(&mut self, change: Change) {
        let mapper = change.mapper();
        if self.mappers.get(&mapper).map(|m| m.state) != Some(AttachState::Attached) {
            trace!(mapper = %mapper, "dropping change for detached mapper");
            return;
        }
        let result = match change {
            Change::Children { mapper, event } => self
                .sync_index(mapper, SyncKind::Children)
                .and_then(|sync| self.reconcile(mapper, sync, event)),
            Change::Role {
                mapper,
                sync,
                event,
            } => self.reconcile(mapper, sync, event),
            Change::Style {
                mapper,
                background: true,
            } => self.propagate_background(mapper),
            Change::Style { mapper, .. } => self.refresh_properties(mapper),
            Change::Property {
                mapper,
                sync,
                value,
            } => self.mirror_property(mapper, sync, value),
            Change::Popup {
                mapper,
                slot,
                popup,
            } => self.swap_popup(mapper, slot, popup),
        };
        if let Err(err) = result {
            if err.is_configuration() {
                error!(mapper = %mapper, error = %err, "mapping failed during reactive update");
                panic!("cellmap: {err}");
            }
            self.fault(err);
        }
    }

    /// Apply one list event to the child mapper list of synchronizer `sync`.
    fn reconcile(
        &mut self,
        id: MapperId,
        sync: usize,
        event: ListEvent<Node>,
    ) -> Result<(), MappingError> {
        match event {
            ListEvent::Added { index, item } => {
                let _span = debug_span!("reconcile_add", mapper = %id, index).entered();
                let child = self.spawn(&item, Some(id), true)?;
                self.place_child(id, sync, index, child)
            }
            ListEvent::Removed { index, item } => {
                let _span = debug_span!("reconcile_remove", mapper = %id, index).entered();
                self.unplace_child(id, sync, index, item.id())
            }
        }
    }

    /// Record `child` at `position` in synchronizer `sync` and link its
    /// target at the same index. Detaches `child` on failure.
    fn place_child(
        &mut self,
        id: MapperId,
        sync: usize,
        position: usize,
        child: MapperId,
    ) -> Result<(), MappingError> {
        let result = self.try_place_child(id, sync, position, child);
        if result.is_err() {
            self.remove_from_sync(id, sync, child);
            self.detach(child);
        }
        result
    }

    fn try_place_child(
        &mut self,
        id: MapperId,
        sync: usize,
        position: usize,
        child: MapperId,
    ) -> Result<(), MappingError> {
        let child_target = self.mapper(child)?.target;
        let own_target = self.mapper(id)?.target;
        let (mappers, container) = match self.sync_mut(id, sync) {
            Some(Synchronizer::Children(c)) => (&mut c.mappers, own_target),
            Some(Synchronizer::Role(r)) => (&mut r.mappers, r.container),
            _ => {
                return Err(MappingError::Inconsistent(format!(
                    "synchronizer {sync} of {id} holds no child mappers"
                )));
            }
        };
        if position > mappers.len() {
            return Err(MappingError::Inconsistent(format!(
                "child insert at {position} but {id} maps {} children",
                mappers.len()
            )));
        }
        mappers.insert(position, child);
        self.targets.insert_child(container, position, child_target)
    }

    fn remove_from_sync(&mut self, id: MapperId, sync: usize, child: MapperId) {
        if let Some(Synchronizer::Children(ChildrenSync { mappers, .. }))
        | Some(Synchronizer::Role(RoleSync { mappers, .. })) = self.sync_mut(id, sync)
        {
            mappers.retain(|m| *m != child);
        }
    }

    /// Detach the child mapper at `position` of synchronizer `sync`.
    fn unplace_child(
        &mut self,
        id: MapperId,
        sync: usize,
        position: usize,
        item: NodeId,
    ) -> Result<(), MappingError> {
        let removed = match self.sync_mut(id, sync) {
            Some(Synchronizer::Children(ChildrenSync { mappers, .. }))
            | Some(Synchronizer::Role(RoleSync { mappers, .. })) => {
                (position < mappers.len()).then(|| mappers.remove(position))
            }
            _ => None,
        }
        .ok_or_else(|| {
            MappingError::Inconsistent(format!("no child mapper at {position} of {id}"))
        })?;

        let (source, target) = {
            let child = self.mapper(removed)?;
            (child.source.id(), child.target)
        };
        let slot = self.targets.index_in_parent(target);
        self.detach(removed);

        if source != item {
            return Err(MappingError::Inconsistent(format!(
                "removed mapper {removed} rendered {source}, list removed {item}"
            )));
        }
        if slot != Some(position) {
            return Err(MappingError::Inconsistent(format!(
                "target of {removed} sat at {slot:?}, expected {position}"
            )));
        }
        Ok(())
    }

    fn mirror_property(
        &mut self,
        id: MapperId,
        sync: usize,
        value: Value,
    ) -> Result<(), MappingError> {
        let attribute = match self.sync(id, sync) {
            Some(Synchronizer::Property(p)) => p.attribute.clone(),
            _ => {
                return Err(MappingError::Inconsistent(format!(
                    "synchronizer {sync} of {id} is not a property mirror"
                )));
            }
        };
        let target = self.mapper(id)?.target;
        self.targets.set_attribute(target, &attribute, value);
        Ok(())
    }

    // ---- style ----

    /// Re-derive the style of `id`'s target from its current inputs.
    pub(crate) fn refresh_properties(&mut self, id: MapperId) -> Result<(), MappingError> {
        let mapper = self.mapper(id)?;
        let Some(node) = mapper.source.upgrade() else {
            return Ok(());
        };
        let inputs = StyleInputs::read(
            &node,
            &mapper.counters,
            mapper.ancestor_background,
            mapper.leaf,
        );
        let style = self.config.palette.derive(&inputs);
        let target = mapper.target;
        self.targets.set_style(target, style);
        Ok(())
    }

    fn effective_background(&self, id: MapperId) -> Option<Color> {
        let mapper = self.mappers.get(&id)?;
        mapper
            .source
            .upgrade()
            .and_then(|n| n.color(&props::BACKGROUND))
            .or(mapper.ancestor_background)
    }

    /// Refresh `id` and every descendant that inherits its background.
    fn propagate_background(&mut self, id: MapperId) -> Result<(), MappingError> {
        self.refresh_properties(id)?;
        let mut work = self.mapper(id)?.inheriting_children();
        let mut visited = 0usize;
        while let Some(child) = work.pop() {
            let inherited = self
                .mappers
                .get(&child)
                .and_then(|m| m.parent)
                .and_then(|p| self.effective_background(p));
            let Some(mapper) = self.mappers.get_mut(&child) else {
                continue;
            };
            mapper.ancestor_background = inherited;
            let own = mapper
                .source
                .upgrade()
                .and_then(|n| n.color(&props::BACKGROUND));
            self.refresh_properties(child)?;
            visited += 1;
            if own.is_none() {
                work.extend(self.mapper(child)?.inheriting_children());
            }
        }
        trace!(mapper = %id, visited, "background propagated");
        Ok(())
    }

    // ---- counters ----

    pub(crate) fn change_counter(
        &mut self,
        id: MapperId,
        spec: CounterSpec,
        delta: i32,
    ) -> Result<i32, MappingError> {
        let mapper = self.mapper_mut(id)?;
        let value = mapper.counters.get(spec);
        let next = mapper
            .counters
            .change(spec, delta)
            .ok_or(MappingError::CounterUnderflow {
                mapper: id,
                counter: spec.name(),
                value,
                delta,
            })?;
        self.refresh_properties(id)?;
        Ok(next)
    }

    pub(crate) fn counter(&self, id: MapperId, spec: CounterSpec) -> i32 {
        self.mappers.get(&id).map_or(0, |m| m.counters.get(spec))
    }

    // ---- overlays ----

    fn show_popup(
        &mut self,
        id: MapperId,
        sync: usize,
        slot: PopupSlot,
        popup: &Node,
    ) -> Result<(), MappingError> {
        let popup_id = self.spawn(popup, Some(id), false)?;
        let popup_target = self.mapper(popup_id)?.target;
        match self.sync_mut(id, sync) {
            Some(Synchronizer::Overlay(o)) => o.popups[slot.index()] = Some(popup_id),
            _ => {
                self.detach(popup_id);
                return Err(MappingError::Inconsistent(format!(
                    "synchronizer {sync} of {id} is not an overlay"
                )));
            }
        }
        self.targets.push_child(self.overlay_root, popup_target)?;
        self.reposition_popups(id);
        Ok(())
    }

    fn swap_popup(
        &mut self,
        id: MapperId,
        slot: PopupSlot,
        popup: Option<Node>,
    ) -> Result<(), MappingError> {
        let sync = self.sync_index(id, SyncKind::Overlay)?;
        let old = match self.sync_mut(id, sync) {
            Some(Synchronizer::Overlay(o)) => o.popups[slot.index()].take(),
            _ => None,
        };
        if let Some(old) = old {
            self.detach(old);
        }
        if let Some(popup) = popup {
            self.show_popup(id, sync, slot, &popup)?;
        }
        Ok(())
    }

    fn reposition_popups(&mut self, anchor: MapperId) {
        let Some(mapper) = self.mappers.get(&anchor) else {
            return;
        };
        let anchor_bounds = self
            .targets
            .get(mapper.target)
            .map(TargetNode::bounds)
            .unwrap_or_default();
        let placements: Vec<(TargetId, Point)> = mapper
            .synchronizers
            .iter()
            .filter_map(|s| match s {
                Synchronizer::Overlay(o) => Some(o.occupied()),
                _ => None,
            })
            .flatten()
            .filter_map(|(slot, popup)| {
                let target = self.mappers.get(&popup)?.target;
                let bounds = self.targets.get(target)?.bounds();
                Some((target, overlay::place(slot, anchor_bounds, bounds)))
            })
            .collect();
        for (target, origin) in placements {
            self.targets.set_position(target, origin);
        }
    }

    /// Update the bounds of `target` and re-place affected popups.
    pub(crate) fn set_bounds(
        &mut self,
        target: TargetId,
        bounds: Rect,
    ) -> Result<(), MappingError> {
        if !self.targets.set_bounds(target, bounds) {
            return Err(MappingError::UnknownTarget(target));
        }
        let Some(owner) = self.targets.get(target).and_then(TargetNode::owner) else {
            return Ok(());
        };
        let Some(mapper) = self.mappers.get(&owner) else {
            return Ok(());
        };
        if mapper.target == target {
            let parent = mapper.parent;
            self.reposition_popups(owner);
            if let Some(parent) = parent {
                self.reposition_popups(parent);
            }
        }
        Ok(())
    }

    // ---- attributes ----

    /// Write a target attribute and push it through two-way mirrors.
    pub(crate) fn write_attribute(
        &mut self,
        target: TargetId,
        name: &str,
        value: Value,
    ) -> Result<bool, MappingError> {
        if !self.targets.contains(target) {
            return Err(MappingError::UnknownTarget(target));
        }
        let changed = self.targets.set_attribute(target, name, value.clone());
        let writers: Vec<Observable<Value>> = self
            .targets
            .get(target)
            .and_then(TargetNode::owner)
            .and_then(|owner| self.mappers.get(&owner))
            .filter(|m| m.target == target)
            .map(|m| {
                m.synchronizers
                    .iter()
                    .filter_map(|s| match s {
                        Synchronizer::Property(p)
                            if p.direction == Direction::TwoWay && p.attribute == name =>
                        {
                            p.property.upgrade()
                        }
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default();
        for property in writers {
            property.set(value.clone());
        }
        Ok(changed)
    }

    // ---- lookups ----

    /// Targets for the deepest mapped node of `path`, seen from `root`.
    pub(crate) fn lookup_targets(
        &self,
        root: MapperId,
        path: &mut dyn Iterator<Item = Node>,
    ) -> Vec<TargetId> {
        let Some(actual) = path.next() else {
            return Vec::new();
        };
        let actual = actual.id();
        let mut out = Vec::new();
        for source in std::iter::once(actual).chain(path.map(|n| n.id())) {
            for mapper in self.context.mappers(root, source) {
                let before = out.len();
                self.collect_targets(mapper, actual, &mut out);
                if out.len() == before {
                    // The node is rendered inside this composite without a
                    // target of its own.
                    if let Some(m) = self.mappers.get(&mapper) {
                        out.push(m.target);
                    }
                }
            }
            if !out.is_empty() {
                break;
            }
        }
        self.targets.sort_by_position(&mut out);
        out
    }

    fn collect_targets(&self, id: MapperId, actual: NodeId, out: &mut Vec<TargetId>) {
        let Some(mapper) = self.mappers.get(&id) else {
            return;
        };
        if mapper.source.id() == actual {
            out.push(mapper.target);
            return;
        }
        for sync in &mapper.synchronizers {
            out.extend(sync.targets_for(actual));
            if let Some(nested) = sync.nested_mappers() {
                for child in nested {
                    self.collect_targets(child, actual, out);
                }
            }
        }
    }

    /// Source rendered at `target` (or its nearest claimed ancestor).
    pub(crate) fn lookup_source(&self, root: MapperId, target: TargetId) -> Option<Node> {
        let index = self.context.target_index()?;
        for current in self.targets.ancestors(target) {
            let claimant = index
                .mappers(current)
                .iter()
                .copied()
                .find(|m| self.context.is_under(*m, root));
            if let Some(mapper) = claimant {
                return self
                    .find_source(mapper, current)
                    .or_else(|| self.mappers.get(&mapper).map(|m| m.source.clone()))
                    .and_then(|weak| weak.upgrade());
            }
        }
        None
    }

    fn find_source(&self, id: MapperId, target: TargetId) -> Option<WeakNode> {
        let mapper = self.mappers.get(&id)?;
        if mapper.target == target {
            return Some(mapper.source.clone());
        }
        for sync in &mapper.synchronizers {
            if let Some(source) = sync.source_for(target) {
                return Some(source.clone());
            }
            if let Some(nested) = sync.nested_mappers()
                && let Some(found) = nested.into_iter().find_map(|m| self.find_source(m, target))
            {
                return Some(found);
            }
        }
        None
    }

    // ---- introspection ----

    pub(crate) fn info(&self, id: MapperId) -> Option<MapperInfo> {
        self.mappers.get(&id).map(Mapper::info)
    }

    pub(crate) fn mapper_count(&self) -> usize {
        self.mappers.len()
    }

    pub(crate) fn live_subscriptions(&self) -> usize {
        self.mappers.values().map(Mapper::subscription_count).sum()
    }

    pub(crate) fn take_faults(&mut self) -> Vec<MappingError> {
        std::mem::take(&mut self.faults)
    }

    fn fault(&mut self, err: MappingError) {
        error!(error = %err, "mapping consistency violation");
        self.faults.push(err);
    }

    // ---- helpers ----

    pub(crate) fn mapper(&self, id: MapperId) -> Result<&Mapper, MappingError> {
        self.mappers.get(&id).ok_or(MappingError::UnknownMapper(id))
    }

    fn mapper_mut(&mut self, id: MapperId) -> Result<&mut Mapper, MappingError> {
        self.mappers
            .get_mut(&id)
            .ok_or(MappingError::UnknownMapper(id))
    }

    fn push_sync(&mut self, id: MapperId, sync: Synchronizer) -> Result<usize, MappingError> {
        let mapper = self.mapper_mut(id)?;
        mapper.synchronizers.push(sync);
        Ok(mapper.synchronizers.len() - 1)
    }

    fn sync(&self, id: MapperId, index: usize) -> Option<&Synchronizer> {
        self.mappers.get(&id)?.synchronizers.get(index)
    }

    fn sync_mut(&mut self, id: MapperId, index: usize) -> Option<&mut Synchronizer> {
        self.mappers.get_mut(&id)?.synchronizers.get_mut(index)
    }

    fn sync_index(&self, id: MapperId, kind: SyncKind) -> Result<usize, MappingError> {
        self.mapper(id)?.sync_index(kind).ok_or_else(|| {
            MappingError::Inconsistent(format!("mapper {id} has no {kind:?} synchronizer"))
        })
    }
}
