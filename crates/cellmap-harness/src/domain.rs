#![forbid(unsafe_code)]

//! A small expression language used as the source domain in tests.
//!
//! | Kind | Mapper | Notes |
//! |------|--------|-------|
//! | `module` | `block` | one child per statement |
//! | `number`, `ident` | `token` (leaf) | one-way `text` mirror |
//! | `binop` | `infix` | `op` mirror, operands as children |
//! | `call` | `call` | `callee` part, arguments in the `args` role |
//! | `label` | `label` (leaf) | two-way `text` mirror, first child shown as `tag` part |
//! | `formula` | `image` | opaque: children are not mapped |
//! | `tooltip` | `popup` (leaf) | shown in popup slots |
//!
//! Every other kind (for example `hole`) has no mapper.

use cellmap_core::{MapperConfig, MapperFactory};
use cellmap_model::{Node, PropertySpec, Value, props};
use tracing::trace;

/// Operator of a `binop` node.
pub const OP: PropertySpec = PropertySpec::new("op", Value::None);

#[must_use]
pub fn module(statements: impl IntoIterator<Item = Node>) -> Node {
    with_children(Node::new("module"), statements)
}

#[must_use]
pub fn number(value: i64) -> Node {
    let node = Node::new("number");
    node.set(&props::TEXT, value.to_string());
    node
}

#[must_use]
pub fn ident(name: &str) -> Node {
    Node::with_text("ident", name)
}

#[must_use]
pub fn binop(op: &str, lhs: Node, rhs: Node) -> Node {
    let node = with_children(Node::new("binop"), [lhs, rhs]);
    node.set(&OP, op);
    node
}

#[must_use]
pub fn call(callee: &str, args: impl IntoIterator<Item = Node>) -> Node {
    let node = with_children(Node::new("call"), args);
    node.set(&props::TEXT, callee);
    node
}

/// Editable label whose `tag` child is rendered as a part.
#[must_use]
pub fn label(text: &str, tag: &str) -> Node {
    with_children(Node::with_text("label", text), [Node::with_text("tag", tag)])
}

#[must_use]
pub fn formula(parts: impl IntoIterator<Item = Node>) -> Node {
    with_children(Node::new("formula"), parts)
}

#[must_use]
pub fn tooltip(text: &str) -> Node {
    Node::with_text("tooltip", text)
}

/// A node kind the factory rejects.
#[must_use]
pub fn hole() -> Node {
    Node::new("hole")
}

fn with_children(node: Node, children: impl IntoIterator<Item = Node>) -> Node {
    for child in children {
        node.push_child(child);
    }
    node
}

/// Factory for the expression language.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExprFactory;

impl MapperFactory for ExprFactory {
    fn create(&self, source: &Node) -> Option<MapperConfig> {
        let config = match source.kind() {
            "module" => MapperConfig::new("block"),
            "number" | "ident" => MapperConfig::new("token")
                .leaf()
                .mirror(source.property(&props::TEXT), "text"),
            "binop" => MapperConfig::new("infix").mirror(source.property(&OP), "op"),
            "call" => MapperConfig::new("call")
                .without_children()
                .part("callee", None)
                .role("args", source.children()),
            "label" => MapperConfig::new("label")
                .leaf()
                .mirror_two_way(source.property(&props::TEXT), "text")
                .part("tag", source.children().get(0).as_ref()),
            "formula" => MapperConfig::new("image").without_children(),
            "tooltip" => MapperConfig::new("popup")
                .leaf()
                .mirror(source.property(&props::TEXT), "text"),
            other => {
                trace!(kind = other, "no mapper for kind");
                return None;
            }
        };
        Some(config)
    }
}
