#![forbid(unsafe_code)]

//! Text outlines of target trees for compact assertions.
//!
//! Each line is `kind`, then sorted `name=value` attributes, then the
//! non-default style fields in braces:
//!
//! ```text
//! block
//!   token text=1 {bg=#add8e6}
//!   infix op=+
//!     token text=a
//! ```

use std::fmt::Write as _;

use cellmap_core::{Binder, TargetId, TargetStyle, TargetTree};

/// Outline of the subtree rooted at `root`.
#[must_use]
pub fn outline(tree: &TargetTree, root: TargetId) -> String {
    let mut out = String::new();
    let mut stack = vec![(root, 0usize)];
    while let Some((id, depth)) = stack.pop() {
        let Some(node) = tree.get(id) else {
            continue;
        };
        let _ = write!(out, "{:indent$}{}", "", node.kind(), indent = depth * 2);
        for name in node.attribute_names() {
            if let Some(value) = node.attribute(name) {
                let _ = write!(out, " {name}={value}");
            }
        }
        let style = style_suffix(node.style());
        if !style.is_empty() {
            let _ = write!(out, " {{{style}}}");
        }
        out.push('\n');
        for child in node.children().iter().rev() {
            stack.push((*child, depth + 1));
        }
    }
    out
}

fn style_suffix(style: TargetStyle) -> String {
    let mut parts = Vec::new();
    if let Some(bg) = style.background {
        parts.push(format!("bg={bg}"));
    }
    if let Some(border) = style.border {
        parts.push(format!("border={border}"));
    }
    if !style.visible {
        parts.push("hidden".to_owned());
    }
    if style.has_shadow {
        parts.push("shadow".to_owned());
    }
    parts.join(" ")
}

/// Outline of the binder's content tree (empty if detached).
#[must_use]
pub fn content_outline(binder: &Binder) -> String {
    match binder.root_target() {
        Some(root) => binder.with_targets(|tree| outline(tree, root)),
        None => String::new(),
    }
}

/// Outline of the binder's overlay tree.
#[must_use]
pub fn overlay_outline(binder: &Binder) -> String {
    let root = binder.overlay_root();
    binder.with_targets(|tree| outline(tree, root))
}

/// Compare an outline against an expected literal, ignoring surrounding
/// whitespace and common indentation of the literal.
#[macro_export]
macro_rules! assert_outline {
    ($actual:expr, $expected:expr $(,)?) => {{
        let actual: String = $actual;
        let expected = $crate::outline::dedent($expected);
        assert!(
            actual.trim_end() == expected.trim_end(),
            "outline mismatch\n--- expected ---\n{}\n--- actual ---\n{}",
            expected.trim_end(),
            actual.trim_end()
        );
    }};
}

/// Strip leading blank lines and the common indentation of `text`.
#[must_use]
pub fn dedent(text: &str) -> String {
    let lines: Vec<&str> = text
        .lines()
        .skip_while(|l| l.trim().is_empty())
        .collect();
    let indent = lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);
    let mut out = String::new();
    for line in lines {
        out.push_str(line.get(indent..).unwrap_or("").trim_end());
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedent_strips_common_indent() {
        let text = "
            a
              b
        ";
        assert_eq!(dedent(text), "a\n  b\n\n");
    }

    #[test]
    fn style_suffix_lists_non_defaults() {
        let style = TargetStyle {
            visible: false,
            has_shadow: true,
            ..TargetStyle::default()
        };
        assert_eq!(style_suffix(style), "hidden shadow");
        assert_eq!(style_suffix(TargetStyle::default()), "");
    }
}
