#![forbid(unsafe_code)]

//! Binding engine that keeps a target tree in sync with an observable
//! source tree.
//!
//! A [`Binder`] attaches to a source root and asks a [`MapperFactory`] for a
//! [`MapperConfig`] per node. Each node gets a mapper that owns one target
//! node and a set of synchronizers (style, child list, property mirrors,
//! roles, parts, popups). From then on every source mutation is reflected in
//! the target tree before the mutating call returns.
//!
//! # Architecture
//!
//! ```text
//! Node (source) ──observe──▶ Synchronizer ──Change──▶ Engine ──▶ TargetTree
//!                                                        │
//!                                  MappingContext ◀──────┘
//!                                        │
//!                                 TargetIndex (lazy) ──▶ TargetProvider
//! ```
//!
//! All state is single-threaded; subscriptions hold weak handles so dropping
//! the binder releases everything.

pub mod binder;
pub mod config;
pub mod context;
pub mod counters;
mod engine;
pub mod error;
pub mod factory;
pub mod geometry;
pub mod mapper;
pub mod overlay;
pub mod provider;
pub mod style;
pub mod synchronizer;
pub mod target;
pub mod target_index;

pub use binder::Binder;
pub use config::BinderConfig;
pub use context::MappingContext;
pub use counters::{CounterSpec, Counters};
pub use error::MappingError;
pub use factory::{MapperConfig, MapperFactory, SyncSpec};
pub use geometry::{Point, Rect};
pub use mapper::{AttachState, MapperId, MapperInfo};
pub use provider::TargetProvider;
pub use style::{StyleInputs, StylePalette, TargetStyle};
pub use synchronizer::{Direction, SyncKind};
pub use target::{Layer, TargetId, TargetNode, TargetTree, TreePosition};
pub use target_index::TargetIndex;
