#![forbid(unsafe_code)]

//! cellmap keeps a rendered target tree in sync with an observable source
//! tree.
//!
//! This crate re-exports the model ([`model`]) and the binding engine
//! ([`core`]). Most users only need the [`prelude`].
//!
//! ```
//! use cellmap::prelude::*;
//!
//! let binder = Binder::new(|node: &Node| match node.kind() {
//!     "list" => Some(MapperConfig::new("column")),
//!     "item" => Some(
//!         MapperConfig::new("row")
//!             .leaf()
//!             .mirror(node.property(&props::TEXT), "text"),
//!     ),
//!     _ => None,
//! });
//!
//! let list = Node::new("list");
//! let item = Node::with_text("item", "first");
//! list.push_child(item.clone());
//! binder.attach(&list).expect("attach");
//!
//! let provider = binder.provider().expect("attached");
//! let target = provider.targets(&item)[0];
//! assert_eq!(provider.source(target), Some(item.clone()));
//!
//! item.set(&props::TEXT, "renamed");
//! let text = binder.with_targets(|t| t.get(target).and_then(|n| n.attribute("text")).cloned());
//! assert_eq!(text, Some(Value::from("renamed")));
//! ```

pub use cellmap_core as core;
pub use cellmap_model as model;

pub use cellmap_core::{
    Binder, BinderConfig, CounterSpec, MapperConfig, MapperFactory, MapperId, MappingError,
    TargetId, TargetProvider,
};
pub use cellmap_model::{Node, Observable, ObservableList, Value};

/// Common imports.
pub mod prelude {
    pub use cellmap_core::{
        Binder, BinderConfig, CounterSpec, Direction, Layer, MapperConfig, MapperFactory,
        MapperId, MapperInfo, MappingError, Point, Rect, StylePalette, SyncSpec, TargetId,
        TargetNode, TargetProvider, TargetStyle, TargetTree,
    };
    pub use cellmap_model::{
        BindingScope, Color, ListEvent, Node, Observable, ObservableList, PopupSlot, Value,
        props,
    };
}
