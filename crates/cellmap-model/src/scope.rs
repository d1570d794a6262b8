#![forbid(unsafe_code)]

//! Lifetime grouping for subscriptions.
//!
//! A [`BindingScope`] collects the subscriptions created on behalf of one
//! owner (a synchronizer, a mapper) so they can be released together.
//!
//! # Invariants
//!
//! 1. Subscriptions are released in reverse registration order on `clear()`
//!    and on drop.
//! 2. After release, no callback registered through this scope fires.
//! 3. `len()` is always the number of held subscriptions.

use std::fmt;

use crate::list::{ListEvent, ObservableList};
use crate::observable::{Observable, Subscription};

/// Collects subscriptions for a logical owner.
#[derive(Default)]
pub struct BindingScope {
    subscriptions: Vec<Subscription>,
}

impl BindingScope {
    /// Create an empty scope.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep an existing subscription alive until the scope is cleared.
    pub fn hold(&mut self, sub: Subscription) {
        self.subscriptions.push(sub);
    }

    /// Subscribe to a value within this scope.
    pub fn watch<T: Clone + PartialEq + 'static>(
        &mut self,
        source: &Observable<T>,
        callback: impl Fn(&T) + 'static,
    ) -> &mut Self {
        self.subscriptions.push(source.subscribe(callback));
        self
    }

    /// Subscribe to a list within this scope.
    pub fn watch_list<T: Clone + 'static>(
        &mut self,
        source: &ObservableList<T>,
        callback: impl Fn(&ListEvent<T>) + 'static,
    ) -> &mut Self {
        self.subscriptions.push(source.subscribe(callback));
        self
    }

    /// Number of held subscriptions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    /// Whether the scope holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Release every subscription now; the scope stays usable.
    pub fn clear(&mut self) {
        while self.subscriptions.pop().is_some() {}
    }
}

impl Drop for BindingScope {
    fn drop(&mut self) {
        self.clear();
    }
}

impl fmt::Debug for BindingScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingScope")
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn clear_releases_everything() {
        let value = Observable::new(0);
        let list: ObservableList<u8> = ObservableList::new();
        let hits = Rc::new(Cell::new(0));

        let mut scope = BindingScope::new();
        let h1 = Rc::clone(&hits);
        let h2 = Rc::clone(&hits);
        scope
            .watch(&value, move |_| h1.set(h1.get() + 1))
            .watch_list(&list, move |_| h2.set(h2.get() + 1));
        assert_eq!(scope.len(), 2);

        value.set(1);
        list.push(1);
        assert_eq!(hits.get(), 2);

        scope.clear();
        assert!(scope.is_empty());
        assert_eq!(value.subscriber_count(), 0);
        assert_eq!(list.subscriber_count(), 0);

        value.set(2);
        list.push(2);
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn drop_releases_held_subscriptions() {
        let value = Observable::new(0);
        {
            let mut scope = BindingScope::new();
            scope.hold(value.subscribe(|_| {}));
            assert_eq!(value.subscriber_count(), 1);
        }
        assert_eq!(value.subscriber_count(), 0);
    }

    #[test]
    fn debug_reports_count() {
        let value = Observable::new(0);
        let mut scope = BindingScope::new();
        scope.watch(&value, |_| {});
        assert!(format!("{scope:?}").contains("subscriptions: 1"));
    }
}
