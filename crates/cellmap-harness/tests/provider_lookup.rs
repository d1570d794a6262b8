#![forbid(unsafe_code)]

//! Integration tests: source ⇄ target lookups through `TargetProvider`.

use cellmap_core::{Binder, Layer, TargetId};
use cellmap_harness::domain::{
    ExprFactory, binop, call, formula, ident, label, module, number, tooltip,
};
use cellmap_model::{Node, PopupSlot};

fn all_nodes(root: &Node) -> Vec<Node> {
    let mut out = Vec::new();
    let mut stack = vec![root.clone()];
    while let Some(node) = stack.pop() {
        stack.extend(node.children().to_vec());
        out.push(node);
    }
    out
}

fn own_target(binder: &Binder, node: &Node) -> TargetId {
    let mapper = binder.mappers_for(node)[0];
    binder.mapper(mapper).expect("attached").target
}

fn sample_tree() -> Node {
    module([
        binop("+", number(1), ident("a")),
        call("max", [number(2), binop("*", ident("b"), number(3))]),
        label("note", "t9"),
        formula([ident("hidden")]),
    ])
}

#[test]
fn every_directly_mapped_node_round_trips() {
    let root = sample_tree();
    let binder = Binder::new(ExprFactory);
    binder.attach(&root).expect("attach");
    let provider = binder.provider().expect("provider");

    let mut checked = 0;
    for node in all_nodes(&root) {
        if binder.mappers_for(&node).is_empty() {
            continue;
        }
        let target = own_target(&binder, &node);
        assert_eq!(provider.targets(&node), vec![target], "{node:?}");
        assert_eq!(provider.source(target), Some(node.clone()), "{node:?}");
        checked += 1;
    }
    assert_eq!(checked, binder.mapper_count());
}

#[test]
fn lookups_are_repeatable() {
    let root = sample_tree();
    let binder = Binder::new(ExprFactory);
    binder.attach(&root).expect("attach");
    let provider = binder.provider().expect("provider");

    let nodes = all_nodes(&root);
    let first: Vec<Vec<TargetId>> = nodes.iter().map(|n| provider.targets_in_ancestry(n)).collect();
    let second: Vec<Vec<TargetId>> = nodes.iter().map(|n| provider.targets_in_ancestry(n)).collect();
    assert_eq!(first, second);
}

#[test]
fn multiple_mappers_sort_by_tree_position() {
    let shared = number(5);
    let a = module(Vec::new());
    let b = module(Vec::new());
    // Shared by two lists without reparenting.
    b.children().push(shared.clone());
    let root = module([a.clone(), b.clone()]);

    let binder = Binder::new(ExprFactory);
    binder.attach(&root).expect("attach");
    let provider = binder.provider().expect("provider");
    assert_eq!(provider.targets(&shared).len(), 1);

    // Registered later, but earlier in the tree.
    a.children().push(shared.clone());
    let a_target = own_target(&binder, &a);
    let b_target = own_target(&binder, &b);
    let (ta, tb) = binder.with_targets(|t| (t.children(a_target)[0], t.children(b_target)[0]));

    let targets = provider.targets(&shared);
    assert_eq!(targets, vec![ta, tb]);
    assert_eq!(provider.targets(&shared), targets);
    assert_eq!(binder.mappers_for(&shared).len(), 2);
    assert_eq!(provider.source(ta), Some(shared.clone()));
    assert_eq!(provider.source(tb), Some(shared.clone()));

    b.children().remove(0);
    assert_eq!(provider.targets(&shared), vec![ta]);
}

#[test]
fn overlay_renderings_sort_after_content() {
    let tip = tooltip("both");
    let anchor = ident("a");
    let root = module([anchor.clone(), tip.clone()]);
    let binder = Binder::new(ExprFactory);
    binder.attach(&root).expect("attach");
    anchor.set_popup(PopupSlot::Right, Some(tip.clone()));

    let provider = binder.provider().expect("provider");
    let targets = provider.targets(&tip);
    assert_eq!(targets.len(), 2);
    let layers: Vec<Layer> = binder.with_targets(|t| {
        targets
            .iter()
            .map(|id| t.position(*id).expect("live target").layer())
            .collect()
    });
    assert_eq!(layers, vec![Layer::Content, Layer::Overlay]);
    for target in targets {
        assert_eq!(provider.source(target), Some(tip.clone()));
    }
}

#[test]
fn unmapped_node_resolves_through_ancestor() {
    let hidden = ident("hidden");
    let opaque = formula([hidden.clone()]);
    let binder = Binder::new(ExprFactory);
    binder.attach(&module([opaque.clone()])).expect("attach");
    let provider = binder.provider().expect("provider");

    assert!(provider.targets(&hidden).is_empty());
    let via_parent = provider.targets_along([hidden.clone(), opaque.clone()]);
    assert_eq!(via_parent, vec![own_target(&binder, &opaque)]);
    assert_eq!(provider.targets_in_ancestry(&hidden), via_parent);
}

#[test]
fn parts_stand_for_their_source() {
    let tagged = label("note", "t9");
    let tag = tagged.children().get(0).expect("tag child");
    let binder = Binder::new(ExprFactory);
    binder.attach(&module([tagged.clone()])).expect("attach");
    let provider = binder.provider().expect("provider");

    let label_target = own_target(&binder, &tagged);
    let part = binder.with_targets(|t| t.children(label_target)[0]);
    assert_eq!(provider.targets_in_ancestry(&tag), vec![part]);
    assert_eq!(provider.source(part), Some(tag));
}

#[test]
fn decorations_resolve_to_their_owner() {
    let f = call("max", [number(1)]);
    let binder = Binder::new(ExprFactory);
    binder.attach(&module([f.clone()])).expect("attach");
    let provider = binder.provider().expect("provider");

    let call_target = own_target(&binder, &f);
    let (callee, args) = binder.with_targets(|t| {
        let children = t.children(call_target);
        (children[0], children[1])
    });
    assert_eq!(provider.source(callee), Some(f.clone()));
    assert_eq!(provider.source(args), Some(f.clone()));
    assert_eq!(provider.source(binder.overlay_root()), None);
}

#[test]
fn role_children_are_found_by_source() {
    let arg = number(1);
    let f = call("max", [arg.clone()]);
    let binder = Binder::new(ExprFactory);
    binder.attach(&module([f.clone()])).expect("attach");
    let provider = binder.provider().expect("provider");

    let target = own_target(&binder, &arg);
    assert_eq!(provider.targets(&arg), vec![target]);
    let container = binder.with_targets(|t| t.parent(target)).expect("in container");
    assert_eq!(provider.source(container), Some(f));
}

#[test]
fn scoped_provider_only_sees_its_subtree() {
    let inner_leaf = number(1);
    let outer_leaf = number(2);
    let inner = module([inner_leaf.clone()]);
    let binder = Binder::new(ExprFactory);
    binder
        .attach(&module([inner.clone(), outer_leaf.clone()]))
        .expect("attach");

    let scoped = binder
        .provider_for(binder.mappers_for(&inner)[0])
        .expect("provider");
    assert_eq!(scoped.targets(&inner_leaf).len(), 1);
    assert!(scoped.targets(&outer_leaf).is_empty());
    assert_eq!(scoped.source(own_target(&binder, &outer_leaf)), None);
    assert_eq!(
        scoped.source(own_target(&binder, &inner_leaf)),
        Some(inner_leaf)
    );
}

#[test]
fn lookups_after_detach_miss() {
    let leaf = number(1);
    let binder = Binder::new(ExprFactory);
    binder.attach(&module([leaf.clone()])).expect("attach");
    let provider = binder.provider().expect("provider");
    let target = own_target(&binder, &leaf);

    binder.detach();
    assert!(provider.targets(&leaf).is_empty());
    assert_eq!(provider.source(target), None);
}

#[test]
fn index_is_built_lazily_and_survives_reattach() {
    let leaf = number(1);
    let root = module([leaf.clone()]);
    let binder = Binder::new(ExprFactory);
    binder.attach(&root).expect("attach");
    assert!(!binder.with_context(|c| c.target_index().is_some()));

    binder.provider().expect("provider");
    assert!(binder.with_context(|c| c.target_index().is_some()));

    binder.detach();
    binder.attach(&root).expect("reattach");
    let provider = binder.provider().expect("provider");
    let target = own_target(&binder, &leaf);
    assert_eq!(provider.source(target), Some(leaf));
}
