#![forbid(unsafe_code)]

//! Popup placement relative to an anchor.
//!
//! | Slot | Position |
//! |------|----------|
//! | `Bottom` | anchor's left edge, directly below it |
//! | `Front` | anchor's origin (covers the anchor) |
//! | `Left` | popup's right edge on the anchor's left edge |
//! | `Right` | anchor's right edge, top-aligned |
//!
//! Placement is recomputed from current bounds whenever the anchor or the
//! popup is resized or moved, so it never drifts.

use cellmap_model::PopupSlot;

use crate::geometry::{Point, Rect};

/// Origin for a popup of size `popup` shown in `slot` next to `anchor`.
#[must_use]
pub fn place(slot: PopupSlot, anchor: Rect, popup: Rect) -> Point {
    match slot {
        PopupSlot::Bottom => Point::new(anchor.x, anchor.bottom()),
        PopupSlot::Front => anchor.origin(),
        PopupSlot::Left => Point::new(anchor.x.saturating_sub(popup.width), anchor.y),
        PopupSlot::Right => Point::new(anchor.right(), anchor.y),
    }
}
