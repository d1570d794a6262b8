#![forbid(unsafe_code)]

//! Source nodes: the domain-side tree observed by mappers.
//!
//! A [`Node`] is a cheap shared handle. The domain owns nodes; anything that
//! merely observes them should hold a [`WeakNode`].
//!
//! # Invariants
//!
//! 1. `NodeId`s are unique for the lifetime of the process and never reused.
//! 2. Equality and hashing are by identity, not by content.
//! 3. `insert_child` / `remove_child` keep the child's parent back-reference
//!    in step with the child list. Mutating `children()` directly leaves the
//!    parent pointer to the caller.
//! 4. A property observable is created on first access and then reused, so
//!    every subscriber of a property sees the same value stream.

use std::cell::RefCell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use ahash::AHashMap;

use crate::color::Color;
use crate::list::ObservableList;
use crate::observable::Observable;
use crate::value::{PropertySpec, Value, props};

/// Global counter for node identities.
static NODE_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Stable identity of a source node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    fn next() -> Self {
        Self(NODE_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw id value.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Overlay slot a popup can occupy relative to its anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PopupSlot {
    Bottom,
    Front,
    Left,
    Right,
}

impl PopupSlot {
    pub const ALL: [Self; 4] = [Self::Bottom, Self::Front, Self::Left, Self::Right];

    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Bottom => 0,
            Self::Front => 1,
            Self::Left => 2,
            Self::Right => 3,
        }
    }
}

struct NodeInner {
    id: NodeId,
    kind: String,
    parent: RefCell<Weak<NodeInner>>,
    children: ObservableList<Node>,
    props: RefCell<AHashMap<&'static str, Observable<Value>>>,
    popups: [Observable<Option<Node>>; 4],
}

/// Shared handle to a source node.
#[derive(Clone)]
pub struct Node {
    inner: Rc<NodeInner>,
}

impl Node {
    /// Create a detached node of the given kind.
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            inner: Rc::new(NodeInner {
                id: NodeId::next(),
                kind: kind.into(),
                parent: RefCell::new(Weak::new()),
                children: ObservableList::new(),
                props: RefCell::new(AHashMap::new()),
                popups: [
                    Observable::new(None),
                    Observable::new(None),
                    Observable::new(None),
                    Observable::new(None),
                ],
            }),
        }
    }

    /// Create a node with `text` already set.
    #[must_use]
    pub fn with_text(kind: impl Into<String>, text: &str) -> Self {
        let node = Self::new(kind);
        node.set(&props::TEXT, text);
        node
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.inner.id
    }

    #[must_use]
    pub fn kind(&self) -> &str {
        &self.inner.kind
    }

    /// Parent node, if attached to one and still alive.
    #[must_use]
    pub fn parent(&self) -> Option<Node> {
        self.inner.parent.borrow().upgrade().map(|inner| Node { inner })
    }

    /// Observable child list (shared handle).
    #[must_use]
    pub fn children(&self) -> ObservableList<Node> {
        self.inner.children.clone()
    }

    /// Insert `child` at `index`, setting its parent.
    pub fn insert_child(&self, index: usize, child: Node) {
        *child.inner.parent.borrow_mut() = Rc::downgrade(&self.inner);
        self.inner.children.insert(index, child);
    }

    /// Append `child`, setting its parent.
    pub fn push_child(&self, child: Node) {
        let index = self.inner.children.len();
        self.insert_child(index, child);
    }

    /// Remove the child at `index`, clearing its parent.
    pub fn remove_child(&self, index: usize) -> Option<Node> {
        let child = self.inner.children.remove(index)?;
        *child.inner.parent.borrow_mut() = Weak::new();
        Some(child)
    }

    /// Observable backing `spec`, created with the spec default on first use.
    #[must_use]
    pub fn property(&self, spec: &PropertySpec) -> Observable<Value> {
        self.inner
            .props
            .borrow_mut()
            .entry(spec.name)
            .or_insert_with(|| Observable::new(spec.default.clone()))
            .clone()
    }

    /// Current value of `spec`.
    #[must_use]
    pub fn get(&self, spec: &PropertySpec) -> Value {
        if let Some(obs) = self.inner.props.borrow().get(spec.name) {
            return obs.get();
        }
        spec.default.clone()
    }

    /// Set `spec` to `value`, notifying subscribers on change.
    pub fn set(&self, spec: &PropertySpec, value: impl Into<Value>) {
        self.property(spec).set(value.into());
    }

    /// Boolean view of `spec`; non-boolean values read as `false`.
    #[must_use]
    pub fn flag(&self, spec: &PropertySpec) -> bool {
        self.get(spec).as_bool().unwrap_or(false)
    }

    /// Color view of `spec`; non-color values read as `None`.
    #[must_use]
    pub fn color(&self, spec: &PropertySpec) -> Option<Color> {
        self.get(spec).as_color()
    }

    /// Observable popup slot.
    #[must_use]
    pub fn popup(&self, slot: PopupSlot) -> Observable<Option<Node>> {
        self.inner.popups[slot.index()].clone()
    }

    /// Place `popup` in `slot` (or clear it with `None`).
    pub fn set_popup(&self, slot: PopupSlot, popup: Option<Node>) {
        self.inner.popups[slot.index()].set(popup);
    }

    /// Non-owning handle.
    #[must_use]
    pub fn downgrade(&self) -> WeakNode {
        WeakNode {
            id: self.inner.id,
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Iterator over this node and its ancestors, nearest first.
    pub fn ancestry(&self) -> impl Iterator<Item = Node> + use<> {
        std::iter::successors(Some(self.clone()), Node::parent)
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({}:{})", self.inner.kind, self.inner.id)
    }
}

/// Non-owning node handle that still knows the node's identity.
#[derive(Clone)]
pub struct WeakNode {
    id: NodeId,
    inner: Weak<NodeInner>,
}

impl WeakNode {
    #[inline]
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    #[must_use]
    pub fn upgrade(&self) -> Option<Node> {
        self.inner.upgrade().map(|inner| Node { inner })
    }
}

impl fmt::Debug for WeakNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WeakNode({})", self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        let a = Node::new("a");
        let b = Node::new("a");
        assert_ne!(a.id(), b.id());
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn child_helpers_maintain_parent() {
        let root = Node::new("root");
        let child = Node::new("child");
        root.push_child(child.clone());
        assert_eq!(child.parent(), Some(root.clone()));

        let removed = root.remove_child(0).expect("child present");
        assert_eq!(removed, child);
        assert_eq!(child.parent(), None);
    }

    #[test]
    fn properties_default_and_share_observable() {
        let node = Node::new("n");
        assert!(node.flag(&props::VISIBLE));
        assert!(!node.flag(&props::SELECTED));

        let obs = node.property(&props::SELECTED);
        node.set(&props::SELECTED, true);
        assert_eq!(obs.get(), Value::Bool(true));
        assert!(obs.ptr_eq(&node.property(&props::SELECTED)));
    }

    #[test]
    fn weak_node_does_not_keep_alive() {
        let node = Node::new("n");
        let weak = node.downgrade();
        let id = node.id();
        drop(node);
        assert!(weak.upgrade().is_none());
        assert_eq!(weak.id(), id);
    }

    #[test]
    fn ancestry_walks_to_root() {
        let root = Node::new("root");
        let mid = Node::new("mid");
        let leaf = Node::new("leaf");
        root.push_child(mid.clone());
        mid.push_child(leaf.clone());
        let kinds: Vec<String> = leaf.ancestry().map(|n| n.kind().to_owned()).collect();
        assert_eq!(kinds, vec!["leaf", "mid", "root"]);
    }

    #[test]
    fn popup_slots_are_independent() {
        let anchor = Node::new("anchor");
        let popup = Node::new("popup");
        anchor.set_popup(PopupSlot::Bottom, Some(popup.clone()));
        assert_eq!(anchor.popup(PopupSlot::Bottom).get(), Some(popup));
        assert_eq!(anchor.popup(PopupSlot::Right).get(), None);
    }
}
