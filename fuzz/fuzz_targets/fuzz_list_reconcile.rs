#![no_main]

//! Random structural edits must leave every child mapper list aligned with
//! its source list, without consistency faults.

use arbitrary::Arbitrary;
use cellmap_core::{Binder, MapperConfig};
use cellmap_model::{Node, PopupSlot, props};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum Op {
    Insert { at: u8, nested: bool },
    Remove { at: u8 },
    Replace { at: u8 },
    Retext { at: u8, text: u8 },
    Popup { at: u8, slot: u8, show: bool },
    Background { at: u8, on: bool },
    Reattach,
}

fn factory(node: &Node) -> Option<MapperConfig> {
    match node.kind() {
        "group" => Some(MapperConfig::new("box")),
        "leaf" => Some(
            MapperConfig::new("cell")
                .leaf()
                .mirror(node.property(&props::TEXT), "text"),
        ),
        _ => None,
    }
}

fn pick(root: &Node, at: u8) -> Option<(Node, usize)> {
    let len = root.children().len();
    (len > 0).then(|| (root.clone(), at as usize % len))
}

fn count(node: &Node) -> usize {
    1 + node.children().to_vec().iter().map(count).sum::<usize>()
}

fuzz_target!(|ops: Vec<Op>| {
    let root = Node::new("group");
    let binder = Binder::new(factory);
    if binder.attach(&root).is_err() {
        return;
    }

    for op in ops.into_iter().take(256) {
        match op {
            Op::Insert { at, nested } => {
                let len = root.children().len();
                let child = if nested {
                    let group = Node::new("group");
                    group.push_child(Node::new("leaf"));
                    group
                } else {
                    Node::new("leaf")
                };
                root.insert_child(at as usize % (len + 1), child);
            }
            Op::Remove { at } => {
                if let Some((parent, i)) = pick(&root, at) {
                    parent.remove_child(i);
                }
            }
            Op::Replace { at } => {
                if let Some((parent, i)) = pick(&root, at) {
                    parent.children().set(i, Node::new("leaf"));
                }
            }
            Op::Retext { at, text } => {
                if let Some(child) = pick(&root, at).and_then(|(p, i)| p.children().get(i)) {
                    child.set(&props::TEXT, text.to_string());
                }
            }
            Op::Popup { at, slot, show } => {
                if let Some(child) = pick(&root, at).and_then(|(p, i)| p.children().get(i)) {
                    let slot = PopupSlot::ALL[slot as usize % PopupSlot::ALL.len()];
                    child.set_popup(slot, show.then(|| Node::new("leaf")));
                }
            }
            Op::Background { at, on } => {
                if let Some(child) = pick(&root, at).and_then(|(p, i)| p.children().get(i)) {
                    let color = on.then_some(cellmap_model::Color::YELLOW);
                    child.set(&props::BACKGROUND, color);
                }
            }
            Op::Reattach => {
                binder.detach();
                assert_eq!(binder.live_subscriptions(), 0);
                binder.attach(&root).expect("reattach");
            }
        }

        let popups: usize = root
            .children()
            .to_vec()
            .iter()
            .map(|c| PopupSlot::ALL.iter().filter(|s| c.popup(**s).get().is_some()).count())
            .sum();
        assert_eq!(binder.mapper_count(), count(&root) + popups);
        assert!(binder.take_faults().is_empty());
    }
});
