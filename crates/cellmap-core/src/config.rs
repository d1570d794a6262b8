#![forbid(unsafe_code)]

//! Binder-wide configuration.

use crate::style::StylePalette;

/// Configuration shared by every mapper of a binder.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BinderConfig {
    /// Colors used by style derivation.
    pub palette: StylePalette,
    /// Whether popup slots are mapped at all.
    pub overlays: bool,
    /// Kind of the overlay root target.
    pub overlay_kind: String,
}

impl Default for BinderConfig {
    fn default() -> Self {
        Self {
            palette: StylePalette::default(),
            overlays: true,
            overlay_kind: "overlay".to_owned(),
        }
    }
}

impl BinderConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn palette(mut self, palette: StylePalette) -> Self {
        self.palette = palette;
        self
    }

    #[must_use]
    pub fn overlays(mut self, enabled: bool) -> Self {
        self.overlays = enabled;
        self
    }

    #[must_use]
    pub fn overlay_kind(mut self, kind: impl Into<String>) -> Self {
        self.overlay_kind = kind.into();
        self
    }
}
