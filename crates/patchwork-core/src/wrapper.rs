//! Single-child wrappers assembled from pluggable strategies.
//!
//! One generic [`Wrapper`] owns the child handle, the observer wiring, the
//! attach flag, and the forwarding pass; a [`WrapStrategy`] decides how
//! positions and events translate across the boundary. The all-defaults
//! [`PassthroughStrategy`] yields a wrapper that changes nothing, which is
//! the base other strategies start from.

use std::cell::Cell;
use std::rc::{Rc, Weak};

use crate::events::{ChangeHub, ChangeObserver, ListEvent, Payload};
use crate::item_id::ItemId;
use crate::path::{PathSegment, ResolvePath};
use crate::provider::{check_position, ListProvider, Rendered, WrapperProvider};
use crate::view_type::ViewType;

/// What a strategy turned one child event into.
pub enum Remap {
    /// Publish this event.
    Forward(ListEvent),
    /// The change cannot be expressed positionally; publish a full refresh.
    Refresh,
    /// The change is invisible through this wrapper; publish nothing.
    Skip,
}

/// Translation hooks between a wrapper's coordinates and its child's.
///
/// Every hook defaults to the identity translation. Strategies carry their
/// own interior-mutable state; all hooks take `&self`.
pub trait WrapStrategy: 'static {
    /// Runs once while the wrapper is being wired up, before any events
    /// can arrive.
    fn on_attach(&self, child: &dyn ListProvider) {
        let _ = child;
    }

    fn item_count(&self, child: &dyn ListProvider) -> usize {
        child.item_count()
    }

    /// Maps a wrapper position to the child position behind it. Only called
    /// with positions below [`WrapStrategy::item_count`].
    fn to_child(&self, child: &dyn ListProvider, position: usize) -> usize {
        let _ = child;
        position
    }

    /// Maps a child position outward, or `None` when the wrapper hides it.
    fn from_child(&self, child: &dyn ListProvider, child_position: usize) -> Option<usize> {
        let _ = child;
        Some(child_position)
    }

    /// Translates one child event. Runs after the child has already
    /// mutated, so `child` reflects the post-event state.
    fn remap(&self, child: &dyn ListProvider, event: &ListEvent) -> Remap {
        let _ = child;
        Remap::Forward(event.clone())
    }
}

/// The identity strategy: every hook keeps its default.
pub struct PassthroughStrategy;

impl WrapStrategy for PassthroughStrategy {}

struct WrapperObserver<S: WrapStrategy> {
    owner: Weak<Wrapper<S>>,
}

impl<S: WrapStrategy> ChangeObserver for WrapperObserver<S> {
    fn on_event(&self, event: &ListEvent) {
        if let Some(owner) = self.owner.upgrade() {
            owner.on_child_event(event);
        }
    }
}

/// A provider that presents one child through a [`WrapStrategy`].
pub struct Wrapper<S: WrapStrategy> {
    child: Rc<dyn ListProvider>,
    strategy: S,
    observer: Rc<WrapperObserver<S>>,
    hub: ChangeHub,
    forwarding: Cell<bool>,
    released: Cell<bool>,
}

impl<S: WrapStrategy> Wrapper<S> {
    /// Claims `child` and starts observing it.
    pub fn new(child: Rc<dyn ListProvider>, strategy: S) -> Rc<Wrapper<S>> {
        if !child.hub().try_attach() {
            panic!(
                "provider is already attached to a composition and cannot be wrapped.\n provider={:p}",
                Rc::as_ptr(&child)
            );
        }
        let wrapper = Rc::new_cyclic(|weak| Wrapper {
            observer: Rc::new(WrapperObserver {
                owner: weak.clone(),
            }),
            child: child.clone(),
            strategy,
            hub: ChangeHub::new(),
            forwarding: Cell::new(false),
            released: Cell::new(false),
        });
        wrapper.strategy.on_attach(child.as_ref());
        child.hub().register(wrapper.observer.clone());
        wrapper
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    /// Publishes an event on the strategy's behalf, outside the child event
    /// flow. Used by strategies whose own state changed, for example a new
    /// filter predicate.
    pub fn notify(&self, event: ListEvent) {
        self.ensure_live("notify");
        if self.forwarding.get() {
            panic!(
                "re-entrant notification while a forwarding pass is running.\n event={:?}",
                event
            );
        }
        self.forwarding.set(true);
        self.hub.notify(&event);
        self.forwarding.set(false);
    }

    fn on_child_event(&self, event: &ListEvent) {
        debug_assert!(!self.released.get());
        if self.forwarding.get() {
            panic!(
                "re-entrant structural change: the child published an event while a forwarding pass was still running.\n event={:?}",
                event
            );
        }
        self.forwarding.set(true);
        match self.strategy.remap(self.child.as_ref(), event) {
            Remap::Forward(outgoing) => self.hub.notify(&outgoing),
            Remap::Refresh => {
                log::warn!("downgrading {:?} to a full refresh", event);
                self.hub.notify(&ListEvent::Refreshed);
            }
            Remap::Skip => {}
        }
        self.forwarding.set(false);
    }

    fn ensure_live(&self, operation: &str) {
        if self.released.get() {
            panic!("{} called on a released wrapper", operation);
        }
    }
}

impl Wrapper<PassthroughStrategy> {
    /// Wraps `child` without changing positions, identities, or events.
    pub fn passthrough(child: Rc<dyn ListProvider>) -> Rc<Wrapper<PassthroughStrategy>> {
        Wrapper::new(child, PassthroughStrategy)
    }
}

impl<S: WrapStrategy> ListProvider for Wrapper<S> {
    fn item_count(&self) -> usize {
        self.ensure_live("item_count");
        self.strategy.item_count(self.child.as_ref())
    }

    fn item_id(&self, position: usize) -> Option<ItemId> {
        self.ensure_live("item_id");
        check_position(self.item_count(), position, "item_id");
        self.child
            .item_id(self.strategy.to_child(self.child.as_ref(), position))
    }

    fn view_type(&self, position: usize) -> ViewType {
        self.ensure_live("view_type");
        check_position(self.item_count(), position, "view_type");
        self.child
            .view_type(self.strategy.to_child(self.child.as_ref(), position))
    }

    fn bind(&self, position: usize, payloads: &[Payload]) -> Rendered {
        self.ensure_live("bind");
        check_position(self.item_count(), position, "bind");
        self.child
            .bind(self.strategy.to_child(self.child.as_ref(), position), payloads)
    }

    fn hub(&self) -> &ChangeHub {
        &self.hub
    }

    fn release(&self) {
        if self.released.get() {
            return;
        }
        let observer: Rc<dyn ChangeObserver> = self.observer.clone();
        self.child.hub().unregister(&observer);
        self.child.hub().detach();
        self.child.release();
        self.released.set(true);
    }

    fn unwrap_position(&self, path: &mut ResolvePath, position: usize) -> usize {
        self.ensure_live("unwrap_position");
        check_position(self.item_count(), position, "unwrap_position");
        let child_position = self.strategy.to_child(self.child.as_ref(), position);
        path.append(PathSegment::new(self.child.clone(), 0));
        self.child.unwrap_position(path, child_position)
    }

    fn wrap_position(&self, segment: &PathSegment, local_position: usize) -> Option<usize> {
        if self.released.get() {
            return None;
        }
        if !Rc::ptr_eq(segment.provider(), &self.child) {
            return None;
        }
        if local_position >= self.child.item_count() {
            return None;
        }
        self.strategy.from_child(self.child.as_ref(), local_position)
    }

    fn as_wrapper(&self) -> Option<&dyn WrapperProvider> {
        Some(self)
    }
}

impl<S: WrapStrategy> WrapperProvider for Wrapper<S> {
    fn wrapped(&self) -> Rc<dyn ListProvider> {
        self.child.clone()
    }
}
