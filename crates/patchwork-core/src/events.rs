//! Change events and the observer plumbing between providers.
//!
//! Providers publish structural changes as [`ListEvent`]s through their
//! [`ChangeHub`]. The hub also carries the single-owner attach flag that a
//! composition checks before adopting a provider, which turns an accidental
//! double-composition into an immediate failure instead of silently
//! duplicated notifications.
//!
//! Positions in events follow the usual adapter convention: they describe
//! the list as it is *after* the mutation, except that `Removed::start` and
//! `Moved::from` refer to where the items used to sit.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Opaque change payload forwarded to binders untouched.
pub type Payload = Rc<dyn Any>;

/// One structural change to a provider's flat sequence.
#[derive(Clone)]
pub enum ListEvent {
    Changed {
        start: usize,
        count: usize,
        payload: Option<Payload>,
    },
    Inserted {
        start: usize,
        count: usize,
    },
    Removed {
        start: usize,
        count: usize,
    },
    Moved {
        from: usize,
        to: usize,
        count: usize,
    },
    /// Everything may have changed, including the item count.
    Refreshed,
}

impl fmt::Debug for ListEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListEvent::Changed {
                start,
                count,
                payload,
            } => write!(
                f,
                "Changed {{ start: {}, count: {}, payload: {} }}",
                start,
                count,
                if payload.is_some() { "some" } else { "none" }
            ),
            ListEvent::Inserted { start, count } => {
                write!(f, "Inserted {{ start: {}, count: {} }}", start, count)
            }
            ListEvent::Removed { start, count } => {
                write!(f, "Removed {{ start: {}, count: {} }}", start, count)
            }
            ListEvent::Moved { from, to, count } => {
                write!(f, "Moved {{ from: {}, to: {}, count: {} }}", from, to, count)
            }
            ListEvent::Refreshed => write!(f, "Refreshed"),
        }
    }
}

impl PartialEq for ListEvent {
    fn eq(&self, other: &ListEvent) -> bool {
        match (self, other) {
            (
                ListEvent::Changed {
                    start: a,
                    count: b,
                    payload: p,
                },
                ListEvent::Changed {
                    start: c,
                    count: d,
                    payload: q,
                },
            ) => a == c && b == d && payload_eq(p, q),
            (
                ListEvent::Inserted { start: a, count: b },
                ListEvent::Inserted { start: c, count: d },
            ) => a == c && b == d,
            (
                ListEvent::Removed { start: a, count: b },
                ListEvent::Removed { start: c, count: d },
            ) => a == c && b == d,
            (
                ListEvent::Moved {
                    from: a,
                    to: b,
                    count: c,
                },
                ListEvent::Moved {
                    from: d,
                    to: e,
                    count: g,
                },
            ) => a == d && b == e && c == g,
            (ListEvent::Refreshed, ListEvent::Refreshed) => true,
            _ => false,
        }
    }
}

impl Eq for ListEvent {}

fn payload_eq(a: &Option<Payload>, b: &Option<Payload>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => Rc::ptr_eq(a, b),
        _ => false,
    }
}

/// Receives every event a provider publishes, in publish order.
pub trait ChangeObserver {
    fn on_event(&self, event: &ListEvent);
}

/// Per-provider event fan-out plus the single-owner attach flag.
///
/// Every provider owns exactly one hub and returns it from
/// [`crate::provider::ListProvider::hub`]. Compositions claim a provider by
/// flipping the attach flag; a second claim fails loudly at the call site
/// that tried to share the provider.
pub struct ChangeHub {
    observers: RefCell<Vec<Rc<dyn ChangeObserver>>>,
    attached: Cell<bool>,
}

impl ChangeHub {
    pub fn new() -> ChangeHub {
        ChangeHub {
            observers: RefCell::new(Vec::new()),
            attached: Cell::new(false),
        }
    }

    pub fn register(&self, observer: Rc<dyn ChangeObserver>) {
        let mut observers = self.observers.borrow_mut();
        if observers.iter().any(|existing| Rc::ptr_eq(existing, &observer)) {
            panic!("observer is already registered.\n observer={:p}", Rc::as_ptr(&observer));
        }
        observers.push(observer);
    }

    pub fn unregister(&self, observer: &Rc<dyn ChangeObserver>) {
        let mut observers = self.observers.borrow_mut();
        match observers.iter().position(|existing| Rc::ptr_eq(existing, observer)) {
            Some(index) => {
                observers.remove(index);
            }
            None => panic!(
                "observer was never registered.\n observer={:p}",
                Rc::as_ptr(observer)
            ),
        }
    }

    pub fn observer_count(&self) -> usize {
        self.observers.borrow().len()
    }

    /// Dispatches `event` to every observer registered at the time of the
    /// call. Observers registered or removed mid-dispatch take effect from
    /// the next event on.
    pub fn notify(&self, event: &ListEvent) {
        let snapshot: Vec<Rc<dyn ChangeObserver>> = self.observers.borrow().clone();
        for observer in snapshot {
            observer.on_event(event);
        }
    }

    pub fn notify_changed(&self, start: usize, count: usize, payload: Option<Payload>) {
        self.notify(&ListEvent::Changed {
            start,
            count,
            payload,
        });
    }

    pub fn notify_inserted(&self, start: usize, count: usize) {
        self.notify(&ListEvent::Inserted { start, count });
    }

    pub fn notify_removed(&self, start: usize, count: usize) {
        self.notify(&ListEvent::Removed { start, count });
    }

    pub fn notify_moved(&self, from: usize, to: usize, count: usize) {
        self.notify(&ListEvent::Moved { from, to, count });
    }

    pub fn notify_refreshed(&self) {
        self.notify(&ListEvent::Refreshed);
    }

    /// Claims the provider for a composition. Returns `false` when some
    /// other composition already holds it.
    pub fn try_attach(&self) -> bool {
        if self.attached.get() {
            return false;
        }
        self.attached.set(true);
        true
    }

    pub fn detach(&self) {
        self.attached.set(false);
    }

    pub fn is_attached(&self) -> bool {
        self.attached.get()
    }
}

impl Default for ChangeHub {
    fn default() -> ChangeHub {
        ChangeHub::new()
    }
}
