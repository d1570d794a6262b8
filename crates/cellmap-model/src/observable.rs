#![forbid(unsafe_code)]

//! Version-tracked single values with synchronous change notification.
//!
//! # Invariants
//!
//! 1. Version increments exactly once per `set` that changes the value.
//! 2. Subscribers are notified in registration order, after the new value is
//!    stored and with no internal borrow held (callbacks may read or write the
//!    same observable). A value set from inside a callback is delivered only
//!    after the current value has reached every subscriber.
//! 3. Setting a value equal to the current value is a no-op (no version bump,
//!    no notifications).
//! 4. Dropping a [`Subscription`] removes the callback before the next
//!    notification cycle.
//!
//! # Failure Modes
//!
//! - A callback that sets the observable it listens to re-enters `set`; the
//!   new value is queued behind the one being delivered, and the equality
//!   check in invariant 3 ends mirror loops between two observables.
//! - Callbacks that panic propagate to the caller of `set`; queued values
//!   are discarded so the next `set` starts a fresh dispatch.

use std::any::Any;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

type Callback<T> = dyn Fn(&T);

struct ObservableInner<T> {
    value: T,
    version: u64,
    subscribers: Vec<Weak<Callback<T>>>,
    pending: VecDeque<T>,
    dispatching: bool,
}

/// Clears the dispatch flag when the outermost `notify` returns or unwinds.
struct DispatchGuard<'a, T> {
    inner: &'a RefCell<ObservableInner<T>>,
}

impl<T> Drop for DispatchGuard<'_, T> {
    fn drop(&mut self) {
        let mut inner = self.inner.borrow_mut();
        inner.dispatching = false;
        inner.pending.clear();
    }
}

/// A shared, version-tracked value.
///
/// Cloning an `Observable` produces another handle to the same value.
pub struct Observable<T> {
    inner: Rc<RefCell<ObservableInner<T>>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Observable")
            .field("value", &inner.value)
            .field("version", &inner.version)
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> Observable<T> {
    /// Create an observable holding `value` at version 0.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ObservableInner {
                value,
                version: 0,
                subscribers: Vec::new(),
                pending: VecDeque::new(),
                dispatching: false,
            })),
        }
    }

    /// Current value (cloned).
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.borrow().value.clone()
    }

    /// Borrow the current value without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.borrow().value)
    }

    /// Replace the value and notify subscribers if it changed.
    pub fn set(&self, value: T) {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.value == value {
                return;
            }
            inner.value = value.clone();
            inner.version += 1;
            inner.pending.push_back(value);
            if inner.dispatching {
                return;
            }
            inner.dispatching = true;
        }
        self.notify();
    }

    /// Number of changes applied so far.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    /// Register `callback` to run after every change.
    ///
    /// The callback stays registered while the returned [`Subscription`] is
    /// alive.
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        let callback: Rc<Callback<T>> = Rc::new(callback);
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

    /// Whether both handles point at the same value.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Non-owning handle to this observable.
    #[must_use]
    pub fn downgrade(&self) -> WeakObservable<T> {
        WeakObservable {
            inner: Rc::downgrade(&self.inner),
        }
    }

    fn notify(&self) {
        let _guard = DispatchGuard { inner: &self.inner };
        loop {
            let (value, callbacks) = {
                let mut inner = self.inner.borrow_mut();
                let Some(value) = inner.pending.pop_front() else {
                    break;
                };
                inner.subscribers.retain(|s| s.strong_count() > 0);
                let callbacks: Vec<Rc<Callback<T>>> =
                    inner.subscribers.iter().filter_map(Weak::upgrade).collect();
                (value, callbacks)
            };
            for callback in callbacks {
                callback(&value);
            }
        }
    }
}

/// Non-owning handle to an [`Observable`].
pub struct WeakObservable<T> {
    inner: Weak<RefCell<ObservableInner<T>>>,
}

impl<T> Clone for WeakObservable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for WeakObservable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakObservable")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

impl<T> WeakObservable<T> {
    /// Upgrade back to a shared handle if the observable is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<Observable<T>> {
        self.inner.upgrade().map(|inner| Observable { inner })
    }
}

/// RAII guard keeping a callback registered.
///
/// Dropping the subscription unregisters the callback.
pub struct Subscription {
    _callback: Box<dyn Any>,
}

impl Subscription {
    pub(crate) fn new<C: ?Sized + 'static>(callback: Rc<C>) -> Self {
        Self {
            _callback: Box::new(callback),
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish()
    }
}
