#![forbid(unsafe_code)]

//! Ordered sequences with structural change notification.
//!
//! An [`ObservableList`] emits one [`ListEvent`] per element added or
//! removed. Replacing an element is reported as a removal followed by an
//! addition at the same index, so listeners only ever handle two shapes.
//!
//! # Invariants
//!
//! 1. Events are delivered after the list has been updated, in mutation
//!    order, with no internal borrow held. A mutation made from inside a
//!    callback is queued and delivered to every subscriber only after the
//!    current event has reached all of them.
//! 2. Replaying the events of a list onto a copy of its previous contents
//!    reproduces its current contents.
//! 3. `clear()` removes from the end so every reported index is valid at the
//!    time it is delivered.
//!
//! # Failure Modes
//!
//! - Out-of-range `insert` panics like [`Vec::insert`].
//! - Out-of-range `remove` / `set` return `None` and emit nothing.
//! - A panicking callback propagates to the mutating caller; queued events
//!   are discarded so the next mutation starts a fresh dispatch.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::observable::Subscription;

/// A single structural change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListEvent<T> {
    /// `item` now sits at `index`.
    Added { index: usize, item: T },
    /// `item` was removed from `index`.
    Removed { index: usize, item: T },
}

impl<T> ListEvent<T> {
    /// Index the event refers to.
    #[must_use]
    pub fn index(&self) -> usize {
        match self {
            Self::Added { index, .. } | Self::Removed { index, .. } => *index,
        }
    }

    /// Item added or removed.
    #[must_use]
    pub fn item(&self) -> &T {
        match self {
            Self::Added { item, .. } | Self::Removed { item, .. } => item,
        }
    }
}

type ListCallback<T> = dyn Fn(&ListEvent<T>);

struct ListInner<T> {
    items: Vec<T>,
    subscribers: Vec<Weak<ListCallback<T>>>,
    pending: VecDeque<ListEvent<T>>,
    dispatching: bool,
}

/// Clears the dispatch flag when the outermost `notify` returns or unwinds.
struct DispatchGuard<'a, T> {
    inner: &'a RefCell<ListInner<T>>,
}

impl<T> Drop for DispatchGuard<'_, T> {
    fn drop(&mut self) {
        let mut inner = self.inner.borrow_mut();
        inner.dispatching = false;
        inner.pending.clear();
    }
}

/// A shared, observable ordered list.
///
/// Cloning produces another handle to the same list.
pub struct ObservableList<T> {
    inner: Rc<RefCell<ListInner<T>>>,
}

impl<T> Clone for ObservableList<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ObservableList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.inner.borrow().items.iter()).finish()
    }
}

impl<T: Clone + 'static> Default for ObservableList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + 'static> ObservableList<T> {
    /// Create an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(ListInner {
                items: Vec::new(),
                subscribers: Vec::new(),
                pending: VecDeque::new(),
                dispatching: false,
            })),
        }
    }

    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.borrow().items.len()
    }

    /// Whether the list has no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().items.is_empty()
    }

    /// Element at `index`, if any.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<T> {
        self.inner.borrow().items.get(index).cloned()
    }

    /// Snapshot of the current contents.
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        self.inner.borrow().items.clone()
    }

    /// Insert `item` at `index`, shifting later elements.
    ///
    /// # Panics
    ///
    /// Panics if `index > len`.
    pub fn insert(&self, index: usize, item: T) {
        self.inner.borrow_mut().items.insert(index, item.clone());
        self.notify(ListEvent::Added { index, item });
    }

    /// Append `item`.
    pub fn push(&self, item: T) {
        let index = self.len();
        self.insert(index, item);
    }

    /// Remove and return the element at `index`.
    pub fn remove(&self, index: usize) -> Option<T> {
        let item = {
            let mut inner = self.inner.borrow_mut();
            if index >= inner.items.len() {
                return None;
            }
            inner.items.remove(index)
        };
        self.notify(ListEvent::Removed {
            index,
            item: item.clone(),
        });
        Some(item)
    }

    /// Replace the element at `index`, returning the previous one.
    pub fn set(&self, index: usize, item: T) -> Option<T> {
        let old = self.remove(index)?;
        self.insert(index, item);
        Some(old)
    }

    /// Remove every element, last first.
    pub fn clear(&self) {
        while !self.is_empty() {
            let last = self.len() - 1;
            self.remove(last);
        }
    }

    /// Register `callback` for every structural change.
    pub fn subscribe(&self, callback: impl Fn(&ListEvent<T>) + 'static) -> Subscription {
        let callback: Rc<ListCallback<T>> = Rc::new(callback);
        self.inner
            .borrow_mut()
            .subscribers
            .push(Rc::downgrade(&callback));
        Subscription::new(callback)
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .borrow()
            .subscribers
            .iter()
            .filter(|s| s.strong_count() > 0)
            .count()
    }

    /// Whether both handles refer to the same list.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Non-owning handle to this list.
    #[must_use]
    pub fn downgrade(&self) -> WeakList<T> {
        WeakList {
            inner: Rc::downgrade(&self.inner),
        }
    }

    fn notify(&self, event: ListEvent<T>) {
        {
            let mut inner = self.inner.borrow_mut();
            inner.pending.push_back(event);
            if inner.dispatching {
                return;
            }
            inner.dispatching = true;
        }
        let _guard = DispatchGuard { inner: &self.inner };
        loop {
            let (event, callbacks) = {
                let mut inner = self.inner.borrow_mut();
                let Some(event) = inner.pending.pop_front() else {
                    break;
                };
                inner.subscribers.retain(|s| s.strong_count() > 0);
                let callbacks: Vec<Rc<ListCallback<T>>> =
                    inner.subscribers.iter().filter_map(Weak::upgrade).collect();
                (event, callbacks)
            };
            for callback in callbacks {
                callback(&event);
            }
        }
    }
}

impl<T: Clone + PartialEq + 'static> ObservableList<T> {
    /// Position of the first element equal to `item`.
    #[must_use]
    pub fn index_of(&self, item: &T) -> Option<usize> {
        self.inner.borrow().items.iter().position(|i| i == item)
    }
}

/// Non-owning handle to an [`ObservableList`].
pub struct WeakList<T> {
    inner: Weak<RefCell<ListInner<T>>>,
}

impl<T> Clone for WeakList<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for WeakList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakList")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

impl<T> WeakList<T> {
    /// Upgrade back to a shared handle if the list is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<ObservableList<T>> {
        self.inner.upgrade().map(|inner| ObservableList { inner })
    }
}
