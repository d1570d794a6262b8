#![forbid(unsafe_code)]

//! Bidirectional lookup between source nodes and target nodes.
//!
//! # Forward
//!
//! Given a path of source nodes (the node of interest first, then its
//! ancestors), the provider finds the first node on the path that has a
//! mapper under its root. For each such mapper it collects the targets
//! rendering the node of interest, recursing through parts and nested
//! mappers. A mapper that renders the node without a target of its own
//! contributes its own target.
//!
//! # Reverse
//!
//! Given a target, the provider walks up the target tree to the nearest
//! claimed node and resolves it to the rendering source node.
//!
//! # Invariants
//!
//! 1. Forward results are sorted in tree order and free of duplicates, so
//!    repeated queries return identical sequences.
//! 2. For an attached mapper `m`, `source(m.target) == m.source`.
//! 3. Misses return empty results, never errors.

use std::fmt;
use std::rc::Rc;

use cellmap_model::Node;

use crate::engine::Shared;
use crate::mapper::MapperId;
use crate::target::TargetId;

/// Lookup handle scoped to a mapper subtree.
#[derive(Clone)]
pub struct TargetProvider {
    shared: Rc<Shared>,
    root: MapperId,
}

impl TargetProvider {
    pub(crate) fn new(shared: Rc<Shared>, root: MapperId) -> Self {
        Self { shared, root }
    }

    /// Mapper whose subtree this provider searches.
    #[must_use]
    pub fn root(&self) -> MapperId {
        self.root
    }

    /// Targets rendering `source`.
    #[must_use]
    pub fn targets(&self, source: &Node) -> Vec<TargetId> {
        self.targets_along([source.clone()])
    }

    /// Targets for the first element of `path`, resolved through the first
    /// element that has a mapper.
    #[must_use]
    pub fn targets_along<I>(&self, path: I) -> Vec<TargetId>
    where
        I: IntoIterator<Item = Node>,
    {
        self.shared.settle();
        let mut path = path.into_iter();
        self.shared
            .engine
            .borrow()
            .lookup_targets(self.root, &mut path)
    }

    /// Targets for `source`, falling back through its source ancestors.
    #[must_use]
    pub fn targets_in_ancestry(&self, source: &Node) -> Vec<TargetId> {
        self.targets_along(source.ancestry())
    }

    /// Source rendered at `target`.
    #[must_use]
    pub fn source(&self, target: TargetId) -> Option<Node> {
        self.shared.settle();
        self.shared.engine.borrow().lookup_source(self.root, target)
    }
}

impl fmt::Debug for TargetProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetProvider")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::Binder;
    use crate::factory::MapperConfig;

    fn factory(node: &Node) -> Option<MapperConfig> {
        match node.kind() {
            "word" => Some(MapperConfig::new("text").leaf()),
            "sentence" => Some(MapperConfig::new("flow")),
            // rendered as one opaque target; children are not mapped
            "formula" => Some(MapperConfig::new("image").without_children()),
            _ => None,
        }
    }

    #[test]
    fn round_trip_for_every_mapper() {
        let binder = Binder::new(factory);
        let root = Node::new("sentence");
        let words: Vec<Node> = (0..3).map(|_| Node::new("word")).collect();
        for w in &words {
            root.push_child(w.clone());
        }
        binder.attach(&root).expect("attach");
        let provider = binder.provider().expect("provider");

        for node in std::iter::once(&root).chain(&words) {
            let targets = provider.targets(node);
            assert_eq!(targets.len(), 1);
            assert_eq!(provider.source(targets[0]).as_ref(), Some(node));
        }
    }

    #[test]
    fn unmapped_descendant_falls_back_to_composite() {
        let binder = Binder::new(factory);
        let root = Node::new("sentence");
        let formula = Node::new("formula");
        let inner = Node::new("symbol");
        formula.push_child(inner.clone());
        root.push_child(formula.clone());
        binder.attach(&root).expect("attach");
        let provider = binder.provider().expect("provider");

        let formula_target = provider.targets(&formula);
        assert!(provider.targets(&inner).is_empty());
        assert_eq!(provider.targets_in_ancestry(&inner), formula_target);
    }

    #[test]
    fn detached_nodes_miss() {
        let binder = Binder::new(factory);
        let root = Node::new("sentence");
        let word = Node::new("word");
        root.push_child(word.clone());
        binder.attach(&root).expect("attach");
        let provider = binder.provider().expect("provider");
        let target = provider.targets(&word)[0];

        root.remove_child(0);
        assert!(provider.targets(&word).is_empty());
        assert_eq!(provider.source(target), None);
    }
}
