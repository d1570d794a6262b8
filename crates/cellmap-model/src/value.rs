#![forbid(unsafe_code)]

//! Dynamically typed property values and property specifications.

use std::fmt;

use crate::color::Color;

/// A property value stored in a source node's property bag or a target
/// node's attribute bag.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Color(Color),
}

impl Value {
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_color(&self) -> Option<Color> {
        match self {
            Self::Color(c) => Some(*c),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("none"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
            Self::Color(c) => write!(f, "{c}"),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Color> for Value {
    fn from(value: Color) -> Self {
        Self::Color(value)
    }
}

impl From<Option<Color>> for Value {
    fn from(value: Option<Color>) -> Self {
        value.map_or(Self::None, Self::Color)
    }
}

/// Name and default of a node property.
///
/// Properties are created lazily on first access with the spec's default.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertySpec {
    pub name: &'static str,
    pub default: Value,
}

impl PropertySpec {
    #[must_use]
    pub const fn new(name: &'static str, default: Value) -> Self {
        Self { name, default }
    }
}

/// Well-known properties read by style derivation.
pub mod props {
    use super::{PropertySpec, Value};

    pub const SELECTED: PropertySpec = PropertySpec::new("selected", Value::Bool(false));
    pub const FOCUS_HIGHLIGHTED: PropertySpec =
        PropertySpec::new("focusHighlighted", Value::Bool(false));
    pub const PAIR_HIGHLIGHTED: PropertySpec =
        PropertySpec::new("pairHighlighted", Value::Bool(false));
    pub const RED_UNDERLINE: PropertySpec = PropertySpec::new("redUnderline", Value::Bool(false));
    pub const YELLOW_UNDERLINE: PropertySpec =
        PropertySpec::new("yellowUnderline", Value::Bool(false));
    pub const VISIBLE: PropertySpec = PropertySpec::new("visible", Value::Bool(true));
    pub const HAS_SHADOW: PropertySpec = PropertySpec::new("hasShadow", Value::Bool(false));
    pub const BACKGROUND: PropertySpec = PropertySpec::new("background", Value::None);
    pub const BORDER_COLOR: PropertySpec = PropertySpec::new("borderColor", Value::None);
    pub const TEXT: PropertySpec = PropertySpec::new("text", Value::None);

    /// Properties whose changes require a style refresh.
    pub const STYLE: [PropertySpec; 9] = [
        SELECTED,
        FOCUS_HIGHLIGHTED,
        PAIR_HIGHLIGHTED,
        RED_UNDERLINE,
        YELLOW_UNDERLINE,
        VISIBLE,
        HAS_SHADOW,
        BACKGROUND,
        BORDER_COLOR,
    ];
}
