#![forbid(unsafe_code)]

//! Style derivation for target nodes.
//!
//! A target's look is a pure function of its source node's style properties,
//! the owning mapper's counters, and the nearest ancestor background. The
//! engine reads the inputs and writes the derived [`TargetStyle`]; nothing
//! here touches the trees.
//!
//! # Rules
//!
//! Background, first match wins:
//!
//! 1. selected, or the select counter is active: `selection`
//! 2. focus-highlighted, or the highlight counter is active: `focus_highlight`
//!    on leaves, `selection` on composites
//! 3. pair-highlighted: `pair_highlight`
//! 4. the node's own background, else the inherited ancestor background
//!
//! Border: red underline beats yellow underline beats the node's border
//! color. Visibility and shadow are copied through.

use cellmap_model::{Color, Node, props};

use crate::counters::{CounterSpec, Counters};

/// Colors applied by the derivation rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StylePalette {
    pub selection: Color,
    pub focus_highlight: Color,
    pub pair_highlight: Color,
    pub error_underline: Color,
    pub warning_underline: Color,
}

impl Default for StylePalette {
    fn default() -> Self {
        Self {
            selection: Color::LIGHT_BLUE,
            focus_highlight: Color::LIGHT_GRAY,
            pair_highlight: Color::VERY_LIGHT_GRAY,
            error_underline: Color::RED,
            warning_underline: Color::YELLOW,
        }
    }
}

/// Derived presentation of a target node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetStyle {
    pub background: Option<Color>,
    pub border: Option<Color>,
    pub visible: bool,
    pub has_shadow: bool,
}

impl Default for TargetStyle {
    fn default() -> Self {
        Self {
            background: None,
            border: None,
            visible: true,
            has_shadow: false,
        }
    }
}

/// Snapshot of everything the derivation reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StyleInputs {
    pub selected: bool,
    pub focus_highlighted: bool,
    pub pair_highlighted: bool,
    pub red_underline: bool,
    pub yellow_underline: bool,
    pub visible: bool,
    pub has_shadow: bool,
    pub background: Option<Color>,
    pub border_color: Option<Color>,
    pub ancestor_background: Option<Color>,
    pub leaf: bool,
}

impl StyleInputs {
    /// Read the inputs for `node` as seen by a mapper.
    #[must_use]
    pub fn read(
        node: &Node,
        counters: &Counters,
        ancestor_background: Option<Color>,
        leaf: bool,
    ) -> Self {
        Self {
            selected: node.flag(&props::SELECTED)
                || counters.is_active(CounterSpec::SELECT_COUNT),
            focus_highlighted: node.flag(&props::FOCUS_HIGHLIGHTED)
                || counters.is_active(CounterSpec::HIGHLIGHT_COUNT),
            pair_highlighted: node.flag(&props::PAIR_HIGHLIGHTED),
            red_underline: node.flag(&props::RED_UNDERLINE),
            yellow_underline: node.flag(&props::YELLOW_UNDERLINE),
            visible: node.flag(&props::VISIBLE),
            has_shadow: node.flag(&props::HAS_SHADOW),
            background: node.color(&props::BACKGROUND),
            border_color: node.color(&props::BORDER_COLOR),
            ancestor_background,
            leaf,
        }
    }

    /// Background a child of this node inherits.
    #[must_use]
    pub fn effective_background(&self) -> Option<Color> {
        self.background.or(self.ancestor_background)
    }
}

impl StylePalette {
    /// Apply the derivation rules.
    #[must_use]
    pub fn derive(&self, inputs: &StyleInputs) -> TargetStyle {
        let background = if inputs.selected {
            Some(self.selection)
        } else if inputs.focus_highlighted {
            Some(if inputs.leaf {
                self.focus_highlight
            } else {
                self.selection
            })
        } else if inputs.pair_highlighted {
            Some(self.pair_highlight)
        } else {
            inputs.effective_background()
        };

        let border = if inputs.red_underline {
            Some(self.error_underline)
        } else if inputs.yellow_underline {
            Some(self.warning_underline)
        } else {
            inputs.border_color
        };

        TargetStyle {
            background,
            border,
            visible: inputs.visible,
            has_shadow: inputs.has_shadow,
        }
    }
}
