#![forbid(unsafe_code)]

//! Observable source-side model for cellmap.
//!
//! This crate provides the primitives the binding engine listens to:
//!
//! - [`Observable`]: a version-tracked value with change callbacks.
//! - [`ObservableList`]: an ordered list emitting [`ListEvent`]s.
//! - [`Subscription`] / [`BindingScope`]: RAII lifetimes for callbacks.
//! - [`Node`]: the domain tree node with children, a property bag, and popup
//!   slots.
//!
//! # Architecture
//!
//! Everything is single-threaded and uses `Rc<RefCell<..>>` for shared
//! ownership. Subscribers are stored as `Weak` callbacks and cleaned up lazily
//! during notification, so dropping a `Subscription` is all it takes to stop
//! listening.

pub mod color;
pub mod list;
pub mod node;
pub mod observable;
pub mod scope;
pub mod value;

pub use color::Color;
pub use list::{ListEvent, ObservableList, WeakList};
pub use node::{Node, NodeId, PopupSlot, WeakNode};
pub use observable::{Observable, Subscription, WeakObservable};
pub use scope::BindingScope;
pub use value::{PropertySpec, Value, props};
