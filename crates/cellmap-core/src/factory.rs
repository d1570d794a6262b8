#![forbid(unsafe_code)]

//! Binding factory and mapper configuration.
//!
//! The factory decides, per source node, what target kind to create and
//! which synchronizers to register. It is the only extension point: the
//! engine itself never inspects node kinds.
//!
//! # Example
//!
//! ```
//! use cellmap_core::{MapperConfig, MapperFactory};
//! use cellmap_model::{Node, props};
//!
//! let factory = |node: &Node| match node.kind() {
//!     "text" => Some(MapperConfig::new("label").leaf().mirror(node.property(&props::TEXT), "text")),
//!     "group" => Some(MapperConfig::new("column")),
//!     _ => None,
//! };
//! assert!(factory.create(&Node::new("group")).is_some());
//! assert!(factory.create(&Node::new("unknown")).is_none());
//! ```

use cellmap_model::{Node, Observable, ObservableList, Value};

use crate::error::MappingError;
use crate::synchronizer::Direction;

/// A synchronizer requested by a [`MapperConfig`], beyond the built-in ones.
#[derive(Debug, Clone)]
pub enum SyncSpec {
    /// Mirror `property` into the target attribute `attribute`.
    Property {
        property: Observable<Value>,
        attribute: String,
        direction: Direction,
    },
    /// Map every node of `list` into a named container under the target.
    Role {
        name: String,
        list: ObservableList<Node>,
    },
    /// A fixed target child of kind `kind`, standing for `source` if given.
    Part { kind: String, source: Option<Node> },
}

/// What a mapper for one source node looks like.
#[derive(Debug, Clone)]
pub struct MapperConfig {
    pub(crate) kind: String,
    pub(crate) leaf: bool,
    pub(crate) auto_children: bool,
    pub(crate) overlays: bool,
    pub(crate) syncs: Vec<SyncSpec>,
}

impl MapperConfig {
    /// A composite mapper creating a target of `kind`, mapping the source
    /// node's children and popups automatically.
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            leaf: false,
            auto_children: true,
            overlays: true,
            syncs: Vec::new(),
        }
    }

    /// Mark as a leaf: no structural children.
    #[must_use]
    pub fn leaf(mut self) -> Self {
        self.leaf = true;
        self.auto_children = false;
        self
    }

    /// Keep composite styling but do not map the source children.
    #[must_use]
    pub fn without_children(mut self) -> Self {
        self.auto_children = false;
        self
    }

    /// Do not watch popup slots.
    #[must_use]
    pub fn without_overlays(mut self) -> Self {
        self.overlays = false;
        self
    }

    /// One-way mirror of `property` into `attribute`.
    #[must_use]
    pub fn mirror(self, property: Observable<Value>, attribute: impl Into<String>) -> Self {
        self.with_sync(SyncSpec::Property {
            property,
            attribute: attribute.into(),
            direction: Direction::OneWay,
        })
    }

    /// Two-way mirror of `property` and `attribute`.
    #[must_use]
    pub fn mirror_two_way(self, property: Observable<Value>, attribute: impl Into<String>) -> Self {
        self.with_sync(SyncSpec::Property {
            property,
            attribute: attribute.into(),
            direction: Direction::TwoWay,
        })
    }

    /// Map `list` into a role container called `name`.
    #[must_use]
    pub fn role(self, name: impl Into<String>, list: ObservableList<Node>) -> Self {
        self.with_sync(SyncSpec::Role {
            name: name.into(),
            list,
        })
    }

    /// Add a fixed target child of `kind`.
    #[must_use]
    pub fn part(self, kind: impl Into<String>, source: Option<&Node>) -> Self {
        self.with_sync(SyncSpec::Part {
            kind: kind.into(),
            source: source.cloned(),
        })
    }

    #[must_use]
    pub fn with_sync(mut self, spec: SyncSpec) -> Self {
        self.syncs.push(spec);
        self
    }

    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.leaf
    }

    #[must_use]
    pub fn maps_children(&self) -> bool {
        self.auto_children
    }

    #[must_use]
    pub fn syncs(&self) -> &[SyncSpec] {
        &self.syncs
    }

    /// Reject combinations that would place two owners in the same target
    /// child list.
    pub fn validate(&self) -> Result<(), MappingError> {
        let structured = self
            .syncs
            .iter()
            .any(|s| matches!(s, SyncSpec::Role { .. } | SyncSpec::Part { .. }));
        if self.auto_children && structured {
            return Err(MappingError::InvalidConfig {
                kind: self.kind.clone(),
                reason: "roles and parts require without_children()",
            });
        }
        if self.leaf && self.syncs.iter().any(|s| matches!(s, SyncSpec::Role { .. })) {
            return Err(MappingError::InvalidConfig {
                kind: self.kind.clone(),
                reason: "leaf mappers cannot own roles",
            });
        }
        Ok(())
    }
}

/// Chooses a mapper configuration for a source node.
pub trait MapperFactory {
    /// `None` when no mapper exists for `source`.
    fn create(&self, source: &Node) -> Option<MapperConfig>;
}

impl<F> MapperFactory for F
where
    F: Fn(&Node) -> Option<MapperConfig>,
{
    fn create(&self, source: &Node) -> Option<MapperConfig> {
        self(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaf_disables_children() {
        let cfg = MapperConfig::new("label").leaf();
        assert!(cfg.is_leaf());
        assert!(!cfg.maps_children());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn roles_need_children_disabled() {
        let list = ObservableList::new();
        let bad = MapperConfig::new("row").role("items", list.clone());
        assert!(matches!(
            bad.validate(),
            Err(MappingError::InvalidConfig { .. })
        ));
        let good = MapperConfig::new("row").without_children().role("items", list);
        assert!(good.validate().is_ok());
    }

    #[test]
    fn leaf_roles_rejected() {
        let cfg = MapperConfig::new("x").leaf().role("r", ObservableList::new());
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn parts_allowed_on_leaves() {
        let node = Node::new("n");
        let cfg = MapperConfig::new("x").leaf().part("caret", Some(&node));
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.syncs().len(), 1);
    }
}
