#![forbid(unsafe_code)]

//! Target tree: the rendered side of the binding.
//!
//! Target nodes live in an arena keyed by [`TargetId`]. The tree has two
//! roots: the content root (the root mapper's target) and an overlay root
//! that hosts popups.
//!
//! # Invariants
//!
//! 1. A node's `parent` and its parent's `children` agree at all times.
//! 2. `TargetId`s are never reused within a tree.
//! 3. [`TreePosition`] orders nodes by layer, then root, then the child
//!    indices on the path from the root (pre-order).
//!
//! # Failure Modes
//!
//! - Inserting at an out-of-range index or under a missing parent returns
//!   `Inconsistent` / `UnknownTarget` and leaves the tree unchanged.

use std::fmt;

use ahash::AHashMap;
use cellmap_model::Value;

use crate::error::MappingError;
use crate::geometry::{Point, Rect};
use crate::mapper::MapperId;
use crate::style::TargetStyle;

/// Identity of a target node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(u64);

impl TargetId {
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// Rendering layer; content sorts before overlays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Layer {
    Content,
    Overlay,
}

/// A rendered node.
#[derive(Debug, Clone)]
pub struct TargetNode {
    id: TargetId,
    kind: String,
    layer: Layer,
    parent: Option<TargetId>,
    children: Vec<TargetId>,
    style: TargetStyle,
    attributes: AHashMap<String, Value>,
    bounds: Rect,
    position: Option<Point>,
    owner: Option<MapperId>,
}

impl TargetNode {
    #[must_use]
    pub fn id(&self) -> TargetId {
        self.id
    }

    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    #[must_use]
    pub fn layer(&self) -> Layer {
        self.layer
    }

    #[must_use]
    pub fn parent(&self) -> Option<TargetId> {
        self.parent
    }

    #[must_use]
    pub fn children(&self) -> &[TargetId] {
        &self.children
    }

    #[must_use]
    pub fn style(&self) -> TargetStyle {
        self.style
    }

    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Attribute names in sorted order.
    #[must_use]
    pub fn attribute_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.attributes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    #[must_use]
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Position assigned by overlay placement, if any.
    #[must_use]
    pub fn position(&self) -> Option<Point> {
        self.position
    }

    /// Mapper that created this node.
    #[must_use]
    pub fn owner(&self) -> Option<MapperId> {
        self.owner
    }
}

/// Ordering key for deterministic lookup results.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct TreePosition {
    layer: Layer,
    root: TargetId,
    path: Vec<usize>,
}

impl TreePosition {
    #[must_use]
    pub fn layer(&self) -> Layer {
        self.layer
    }

    #[must_use]
    pub fn root(&self) -> TargetId {
        self.root
    }

    /// Child indices from the root down to the node.
    #[must_use]
    pub fn path(&self) -> &[usize] {
        &self.path
    }
}

/// Arena of target nodes.
#[derive(Debug, Default)]
pub struct TargetTree {
    nodes: AHashMap<TargetId, TargetNode>,
    next_id: u64,
}

impl TargetTree {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an unparented node.
    pub(crate) fn create(&mut self, kind: &str, owner: Option<MapperId>) -> TargetId {
        self.create_in(kind, Layer::Content, owner)
    }

    /// Create an unparented node on `layer`.
    pub(crate) fn create_in(
        &mut self,
        kind: &str,
        layer: Layer,
        owner: Option<MapperId>,
    ) -> TargetId {
        self.next_id += 1;
        let id = TargetId(self.next_id);
        self.nodes.insert(
            id,
            TargetNode {
                id,
                kind: kind.to_owned(),
                layer,
                parent: None,
                children: Vec::new(),
                style: TargetStyle::default(),
                attributes: AHashMap::new(),
                bounds: Rect::default(),
                position: None,
                owner,
            },
        );
        id
    }

    #[must_use]
    pub fn get(&self, id: TargetId) -> Option<&TargetNode> {
        self.nodes.get(&id)
    }

    #[must_use]
    pub fn contains(&self, id: TargetId) -> bool {
        self.nodes.contains_key(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Children of `id`; empty for unknown ids.
    #[must_use]
    pub fn children(&self, id: TargetId) -> &[TargetId] {
        self.nodes
            .get(&id)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    #[must_use]
    pub fn parent(&self, id: TargetId) -> Option<TargetId> {
        self.nodes.get(&id).and_then(|n| n.parent)
    }

    /// `id` followed by its ancestors, nearest first.
    pub fn ancestors(&self, id: TargetId) -> impl Iterator<Item = TargetId> + '_ {
        std::iter::successors(self.contains(id).then_some(id), move |cur| self.parent(*cur))
    }

    /// Index of `id` in its parent's children.
    #[must_use]
    pub fn index_in_parent(&self, id: TargetId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|c| *c == id)
    }

    /// Number of nodes in the subtree rooted at `id` (including `id`).
    #[must_use]
    pub fn subtree_len(&self, id: TargetId) -> usize {
        if !self.contains(id) {
            return 0;
        }
        let mut count = 0;
        let mut stack = vec![id];
        while let Some(cur) = stack.pop() {
            count += 1;
            stack.extend_from_slice(self.children(cur));
        }
        count
    }

    /// Insert unparented `child` under `parent` at `index`.
    pub(crate) fn insert_child(
        &mut self,
        parent: TargetId,
        index: usize,
        child: TargetId,
    ) -> Result<(), MappingError> {
        match self.nodes.get(&child) {
            None => return Err(MappingError::UnknownTarget(child)),
            Some(node) if node.parent.is_some() => {
                return Err(MappingError::Inconsistent(format!(
                    "target {child} already has a parent"
                )));
            }
            Some(_) => {}
        }
        let parent_node = self
            .nodes
            .get_mut(&parent)
            .ok_or(MappingError::UnknownTarget(parent))?;
        if index > parent_node.children.len() {
            return Err(MappingError::Inconsistent(format!(
                "insert at {index} into target {parent} with {} children",
                parent_node.children.len()
            )));
        }
        parent_node.children.insert(index, child);
        if let Some(node) = self.nodes.get_mut(&child) {
            node.parent = Some(parent);
        }
        Ok(())
    }

    /// Append unparented `child` under `parent`.
    pub(crate) fn push_child(
        &mut self,
        parent: TargetId,
        child: TargetId,
    ) -> Result<(), MappingError> {
        let index = self.children(parent).len();
        self.insert_child(parent, index, child)
    }

    /// Unlink `id` from its parent, returning the index it occupied.
    pub(crate) fn remove_from_parent(&mut self, id: TargetId) -> Option<usize> {
        let parent = self.nodes.get_mut(&id)?.parent.take()?;
        let siblings = &mut self.nodes.get_mut(&parent)?.children;
        let index = siblings.iter().position(|c| *c == id)?;
        siblings.remove(index);
        Some(index)
    }

    /// Unlink `id` and drop it with all descendants. Returns the number of
    /// nodes freed.
    pub(crate) fn free_subtree(&mut self, id: TargetId) -> usize {
        self.remove_from_parent(id);
        let mut freed = 0;
        let mut stack = vec![id];
        while let Some(cur) = stack.pop() {
            if let Some(node) = self.nodes.remove(&cur) {
                freed += 1;
                stack.extend(node.children);
            }
        }
        freed
    }

    pub(crate) fn set_style(&mut self, id: TargetId, style: TargetStyle) -> bool {
        match self.nodes.get_mut(&id) {
            Some(node) if node.style != style => {
                node.style = style;
                true
            }
            _ => false,
        }
    }

    /// Set an attribute; returns whether the stored value changed.
    pub(crate) fn set_attribute(&mut self, id: TargetId, name: &str, value: Value) -> bool {
        let Some(node) = self.nodes.get_mut(&id) else {
            return false;
        };
        if node.attributes.get(name) == Some(&value) {
            return false;
        }
        node.attributes.insert(name.to_owned(), value);
        true
    }

    pub(crate) fn set_bounds(&mut self, id: TargetId, bounds: Rect) -> bool {
        match self.nodes.get_mut(&id) {
            Some(node) => {
                node.bounds = bounds;
                true
            }
            None => false,
        }
    }

    pub(crate) fn set_position(&mut self, id: TargetId, position: Point) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.position = Some(position);
        }
    }

    /// Ordering key of `id`, `None` if unknown.
    #[must_use]
    pub fn position(&self, id: TargetId) -> Option<TreePosition> {
        let mut path = Vec::new();
        let mut cur = id;
        while let Some(parent) = self.parent(cur) {
            path.push(self.index_in_parent(cur)?);
            cur = parent;
        }
        path.reverse();
        Some(TreePosition {
            layer: self.get(cur)?.layer,
            root: cur,
            path,
        })
    }

    /// Sort `ids` in tree order and drop duplicates.
    pub fn sort_by_position(&self, ids: &mut Vec<TargetId>) {
        ids.sort_by_cached_key(|id| (self.position(*id), *id));
        ids.dedup();
    }
}
