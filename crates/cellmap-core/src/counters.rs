#![forbid(unsafe_code)]

//! Reference-counted activation of visual concerns.
//!
//! Independent features (selection, search highlighting, ...) raise and
//! release the same counter without coordinating. A concern is active while
//! its counter is positive.
//!
//! # Invariants
//!
//! 1. A counter never goes negative: a release that would underflow is
//!    rejected and leaves the counter unchanged.
//! 2. Counters that return to zero are forgotten; when all are zero the
//!    storage is dropped.

use ahash::AHashMap;

/// Name of a counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CounterSpec(&'static str);

impl CounterSpec {
    /// Demand for the selection look.
    pub const SELECT_COUNT: Self = Self("select");
    /// Demand for the focus-highlight look.
    pub const HIGHLIGHT_COUNT: Self = Self("highlight");

    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        self.0
    }
}

/// Per-mapper counter storage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Counters {
    values: Option<AHashMap<CounterSpec, i32>>,
}

impl Counters {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value; unknown counters read as zero.
    #[must_use]
    pub fn get(&self, spec: CounterSpec) -> i32 {
        self.values
            .as_ref()
            .and_then(|v| v.get(&spec).copied())
            .unwrap_or(0)
    }

    /// Whether the counter is positive.
    #[must_use]
    pub fn is_active(&self, spec: CounterSpec) -> bool {
        self.get(spec) > 0
    }

    /// Whether every counter is zero.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_none()
    }

    /// Add `delta` and return the new value.
    ///
    /// Returns `None` (and changes nothing) if the result would be negative
    /// or overflow.
    pub fn change(&mut self, spec: CounterSpec, delta: i32) -> Option<i32> {
        let next = self.get(spec).checked_add(delta).filter(|v| *v >= 0)?;
        if next == 0 {
            if let Some(values) = self.values.as_mut() {
                values.remove(&spec);
                if values.is_empty() {
                    self.values = None;
                }
            }
        } else {
            self.values
                .get_or_insert_with(AHashMap::new)
                .insert(spec, next);
        }
        Some(next)
    }
}
