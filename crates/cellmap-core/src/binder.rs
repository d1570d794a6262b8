#![forbid(unsafe_code)]

//! Public entry point: attach a source tree and keep it rendered.
//!
//! # Example
//!
//! ```
//! use cellmap_core::{Binder, MapperConfig};
//! use cellmap_model::Node;
//!
//! let binder = Binder::new(|node: &Node| match node.kind() {
//!     "list" => Some(MapperConfig::new("column")),
//!     "item" => Some(MapperConfig::new("row").leaf()),
//!     _ => None,
//! });
//! let list = Node::new("list");
//! list.push_child(Node::new("item"));
//!
//! let root = binder.attach(&list).expect("attach");
//! assert_eq!(binder.mapper_count(), 2);
//!
//! list.push_child(Node::new("item"));
//! assert_eq!(binder.mapper(root).expect("root").children.len(), 2);
//! ```

use std::fmt;
use std::rc::Rc;

use cellmap_model::{Node, Value};

use crate::config::BinderConfig;
use crate::context::MappingContext;
use crate::counters::CounterSpec;
use crate::engine::{Engine, Shared};
use crate::error::MappingError;
use crate::factory::MapperFactory;
use crate::geometry::Rect;
use crate::mapper::{MapperId, MapperInfo};
use crate::provider::TargetProvider;
use crate::target::{TargetId, TargetTree};

/// Owns a mapping from one source root to a target tree.
///
/// Source mutations are applied synchronously while the binder is idle.
/// Mutations made from inside a [`Binder::with_targets`] closure are applied
/// on the next binder call (or [`Binder::flush`]).
pub struct Binder {
    shared: Rc<Shared>,
}

impl Binder {
    /// Binder with the default configuration.
    #[must_use]
    pub fn new(factory: impl MapperFactory + 'static) -> Self {
        Self::with_config(factory, BinderConfig::default())
    }

    #[must_use]
    pub fn with_config(factory: impl MapperFactory + 'static, config: BinderConfig) -> Self {
        Self {
            shared: Shared::new(Box::new(factory), config),
        }
    }

    /// Map `root` and its subtree.
    ///
    /// # Errors
    ///
    /// `AlreadyAttached` if a root is attached; `NoMapper` / `InvalidConfig`
    /// if the factory rejects any node. On error nothing stays attached.
    pub fn attach(&self, root: &Node) -> Result<MapperId, MappingError> {
        self.shared.run(|e| e.attach_root(root))
    }

    /// Detach the root and release every mapper. Returns `false` if nothing
    /// was attached.
    pub fn detach(&self) -> bool {
        self.shared.run(Engine::detach_root)
    }

    /// Apply source changes deferred while the engine was borrowed.
    pub fn flush(&self) {
        self.shared.settle();
    }

    #[must_use]
    pub fn root(&self) -> Option<MapperId> {
        self.shared.engine.borrow().context.root()
    }

    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.root().is_some()
    }

    /// Target created for the root source node.
    #[must_use]
    pub fn root_target(&self) -> Option<TargetId> {
        self.shared.settle();
        let engine = self.shared.engine.borrow();
        let root = engine.context.root()?;
        engine.mapper(root).ok().map(|m| m.target)
    }

    /// Parent of all popup targets.
    #[must_use]
    pub fn overlay_root(&self) -> TargetId {
        self.shared.engine.borrow().overlay_root
    }

    /// Provider for the whole attached tree. Builds the target index on
    /// first call.
    pub fn provider(&self) -> Result<TargetProvider, MappingError> {
        let root = self.root().ok_or(MappingError::NotAttached)?;
        self.provider_for(root)
    }

    /// Provider restricted to the subtree of `mapper`.
    pub fn provider_for(&self, mapper: MapperId) -> Result<TargetProvider, MappingError> {
        self.shared.run(|e| {
            e.mapper(mapper)?;
            e.context.ensure_target_index();
            Ok(())
        })?;
        Ok(TargetProvider::new(Rc::clone(&self.shared), mapper))
    }

    /// Raise (`delta > 0`) or release (`delta < 0`) a counter on `mapper`.
    ///
    /// # Errors
    ///
    /// `CounterUnderflow` if the counter would go negative; the counter is
    /// left unchanged.
    pub fn change_counter(
        &self,
        mapper: MapperId,
        spec: CounterSpec,
        delta: i32,
    ) -> Result<i32, MappingError> {
        self.shared.run(|e| e.change_counter(mapper, spec, delta))
    }

    #[must_use]
    pub fn counter(&self, mapper: MapperId, spec: CounterSpec) -> i32 {
        self.shared.engine.borrow().counter(mapper, spec)
    }

    /// Re-derive the style of `mapper`'s target. Idempotent.
    pub fn refresh_properties(&self, mapper: MapperId) -> Result<(), MappingError> {
        self.shared.run(|e| e.refresh_properties(mapper))
    }

    /// Report layout bounds for `target`; popups anchored to or shown by it
    /// are re-placed.
    pub fn set_bounds(&self, target: TargetId, bounds: Rect) -> Result<(), MappingError> {
        self.shared.run(|e| e.set_bounds(target, bounds))
    }

    /// Edit a target attribute from the rendered side. Two-way mirrors write
    /// the value back to their source property. Returns whether the
    /// attribute changed.
    pub fn set_target_attribute(
        &self,
        target: TargetId,
        name: &str,
        value: impl Into<Value>,
    ) -> Result<bool, MappingError> {
        let value = value.into();
        self.shared.run(|e| e.write_attribute(target, name, value))
    }

    /// Snapshot of `mapper`.
    #[must_use]
    pub fn mapper(&self, mapper: MapperId) -> Option<MapperInfo> {
        self.shared.settle();
        self.shared.engine.borrow().info(mapper)
    }

    /// Mappers of `source` under the root, in attach order.
    #[must_use]
    pub fn mappers_for(&self, source: &Node) -> Vec<MapperId> {
        self.shared.settle();
        let engine = self.shared.engine.borrow();
        engine
            .context
            .root()
            .map(|root| engine.context.mappers(root, source.id()))
            .unwrap_or_default()
    }

    #[must_use]
    pub fn mapper_count(&self) -> usize {
        self.shared.settle();
        self.shared.engine.borrow().mapper_count()
    }

    /// Subscriptions currently held by all synchronizers.
    #[must_use]
    pub fn live_subscriptions(&self) -> usize {
        self.shared.settle();
        self.shared.engine.borrow().live_subscriptions()
    }

    /// Read the target tree.
    pub fn with_targets<R>(&self, f: impl FnOnce(&TargetTree) -> R) -> R {
        self.shared.settle();
        f(&self.shared.engine.borrow().targets)
    }

    /// Read the mapping context.
    pub fn with_context<R>(&self, f: impl FnOnce(&MappingContext) -> R) -> R {
        self.shared.settle();
        f(&self.shared.engine.borrow().context)
    }

    /// Consistency violations recorded on the reactive path since the last
    /// call.
    pub fn take_faults(&self) -> Vec<MappingError> {
        self.shared.run(Engine::take_faults)
    }
}

impl fmt::Debug for Binder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.shared.engine.try_borrow() {
            Ok(engine) => f
                .debug_struct("Binder")
                .field("root", &engine.context.root())
                .field("mappers", &engine.mapper_count())
                .field("targets", &engine.targets.len())
                .finish(),
            Err(_) => f.debug_struct("Binder").finish_non_exhaustive(),
        }
    }
}

impl Drop for Binder {
    fn drop(&mut self) {
        if let Ok(mut engine) = self.shared.engine.try_borrow_mut()
            && engine.context.root().is_some()
        {
            engine.detach_root();
        }
    }
}
