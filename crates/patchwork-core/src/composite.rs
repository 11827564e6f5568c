//! Composition of child providers into one flat sequence.
//!
//! `CompositeProvider` keeps a registry of children in presentation order.
//! Each entry caches the child's item count and its offset into the flat
//! sequence; lookups binary-search the offsets, so a position resolves in
//! `O(log children)` without touching the children at all. Child events
//! arrive through per-segment observers, get their bookkeeping applied
//! first, and leave with their positions shifted into composite
//! coordinates, so an outer observer never sees a count that disagrees
//! with the event it is handling.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use rustc_hash::FxHashMap;

use crate::events::{ChangeHub, ChangeObserver, ListEvent, Payload};
use crate::item_id::ItemId;
use crate::path::{PathSegment, ResolvePath};
use crate::provider::{check_position, ListProvider, Rendered};
use crate::view_type::ViewType;

struct SegmentEntry {
    provider: Rc<dyn ListProvider>,
    observer: Rc<SegmentObserver>,
    offset: Cell<usize>,
    count: Cell<usize>,
}

/// Forwards one child's events into the owning composite, remembering which
/// segment the child currently occupies.
struct SegmentObserver {
    owner: Weak<CompositeProvider>,
    segment: Cell<usize>,
}

impl ChangeObserver for SegmentObserver {
    fn on_event(&self, event: &ListEvent) {
        if let Some(owner) = self.owner.upgrade() {
            owner.on_child_event(self.segment.get(), event);
        }
    }
}

/// Presents any number of child providers as one flat provider.
///
/// Children are adopted with [`CompositeProvider::add_provider`], which
/// claims their attach flag; a provider can only ever sit in one
/// composition at a time. Segment indices are dense and follow insertion
/// order; removing a child shifts the indices of everything behind it.
pub struct CompositeProvider {
    entries: RefCell<Vec<SegmentEntry>>,
    by_key: RefCell<FxHashMap<usize, usize>>,
    total: Cell<usize>,
    dispatching: Cell<bool>,
    released: Cell<bool>,
    hub: ChangeHub,
    weak_self: Weak<CompositeProvider>,
}

impl CompositeProvider {
    pub fn new() -> Rc<CompositeProvider> {
        Rc::new_cyclic(|weak| CompositeProvider {
            entries: RefCell::new(Vec::new()),
            by_key: RefCell::new(FxHashMap::default()),
            total: Cell::new(0),
            dispatching: Cell::new(false),
            released: Cell::new(false),
            hub: ChangeHub::new(),
            weak_self: weak.clone(),
        })
    }

    /// Appends `provider` as the last segment and announces its items.
    /// Returns the segment index assigned to it.
    pub fn add_provider(&self, provider: Rc<dyn ListProvider>) -> usize {
        self.ensure_live("add_provider");
        if !provider.hub().try_attach() {
            panic!(
                "provider is already attached to a composition and cannot be added again.\n provider={:p},\n segments={}",
                Rc::as_ptr(&provider),
                self.entries.borrow().len()
            );
        }
        let segment = self.entries.borrow().len();
        if segment > ItemId::MAX_SEGMENT as usize {
            panic!(
                "composition is full.\n segments={},\n max={}",
                segment,
                ItemId::MAX_SEGMENT as usize + 1
            );
        }
        let observer = Rc::new(SegmentObserver {
            owner: self.weak_self.clone(),
            segment: Cell::new(segment),
        });
        provider.hub().register(observer.clone());
        let count = provider.item_count();
        let offset = self.total.get();
        self.by_key.borrow_mut().insert(provider_key(&provider), segment);
        self.entries.borrow_mut().push(SegmentEntry {
            provider,
            observer,
            offset: Cell::new(offset),
            count: Cell::new(count),
        });
        self.total.set(offset + count);
        if count > 0 {
            self.dispatch(&ListEvent::Inserted {
                start: offset,
                count,
            });
        }
        segment
    }

    /// Detaches `provider`, re-indexes the segments behind it, and
    /// announces the disappearance of its items. Returns `false` when the
    /// provider is not a child of this composition. The child itself is
    /// left intact.
    pub fn remove_provider(&self, provider: &Rc<dyn ListProvider>) -> bool {
        self.ensure_live("remove_provider");
        let index = match self.by_key.borrow_mut().remove(&provider_key(provider)) {
            Some(index) => index,
            None => return false,
        };
        let (offset, count) = {
            let mut entries = self.entries.borrow_mut();
            let entry = entries.remove(index);
            let observer: Rc<dyn ChangeObserver> = entry.observer.clone();
            entry.provider.hub().unregister(&observer);
            entry.provider.hub().detach();
            let offset = entry.offset.get();
            let count = entry.count.get();
            let mut map = self.by_key.borrow_mut();
            for (segment, shifted) in entries.iter().enumerate().skip(index) {
                shifted.observer.segment.set(segment);
                shifted.offset.set(shifted.offset.get() - count);
                map.insert(provider_key(&shifted.provider), segment);
            }
            (offset, count)
        };
        self.total.set(self.total.get() - count);
        if count > 0 {
            self.dispatch(&ListEvent::Removed {
                start: offset,
                count,
            });
        }
        true
    }

    pub fn segment_count(&self) -> usize {
        self.ensure_live("segment_count");
        self.entries.borrow().len()
    }

    /// Handle of the child occupying `segment`.
    pub fn provider_at(&self, segment: usize) -> Rc<dyn ListProvider> {
        self.ensure_live("provider_at");
        let entries = self.entries.borrow();
        if segment >= entries.len() {
            panic!(
                "no such segment.\n segment={},\n segments={}",
                segment,
                entries.len()
            );
        }
        entries[segment].provider.clone()
    }

    /// Current segment index of `provider`, or `None` when it is not a
    /// child of this composition.
    pub fn segment_of(&self, provider: &Rc<dyn ListProvider>) -> Option<usize> {
        self.ensure_live("segment_of");
        self.by_key.borrow().get(&provider_key(provider)).copied()
    }

    /// Resolves a composite position to `(segment, child-local position)`.
    /// Empty children never own positions.
    pub fn locate_child(&self, position: usize) -> (usize, usize) {
        self.ensure_live("locate_child");
        check_position(self.total.get(), position, "locate_child");
        let entries = self.entries.borrow();
        let segment =
            entries.partition_point(|entry| entry.offset.get() + entry.count.get() <= position);
        debug_assert!(segment < entries.len());
        (segment, position - entries[segment].offset.get())
    }

    fn on_child_event(&self, segment: usize, event: &ListEvent) {
        debug_assert!(!self.released.get());
        if self.dispatching.get() {
            panic!(
                "re-entrant structural change: a child published an event while a notification pass was still running.\n segment={},\n event={:?}",
                segment, event
            );
        }
        self.dispatching.set(true);
        let outgoing = {
            let entries = self.entries.borrow();
            let entry = &entries[segment];
            let base = entry.offset.get();
            let cached = entry.count.get();
            match *event {
                ListEvent::Changed {
                    start,
                    count,
                    ref payload,
                } => {
                    if start + count > cached {
                        panic!(
                            "child reported a change outside its own range.\n segment={},\n start={},\n count={},\n cached_count={}",
                            segment, start, count, cached
                        );
                    }
                    ListEvent::Changed {
                        start: base + start,
                        count,
                        payload: payload.clone(),
                    }
                }
                ListEvent::Inserted { start, count } => {
                    if start > cached {
                        panic!(
                            "child reported an insertion outside its own range.\n segment={},\n start={},\n cached_count={}",
                            segment, start, cached
                        );
                    }
                    entry.count.set(cached + count);
                    for behind in &entries[segment + 1..] {
                        behind.offset.set(behind.offset.get() + count);
                    }
                    self.total.set(self.total.get() + count);
                    ListEvent::Inserted {
                        start: base + start,
                        count,
                    }
                }
                ListEvent::Removed { start, count } => {
                    if start + count > cached {
                        panic!(
                            "child reported a removal outside its own range.\n segment={},\n start={},\n count={},\n cached_count={}",
                            segment, start, count, cached
                        );
                    }
                    entry.count.set(cached - count);
                    for behind in &entries[segment + 1..] {
                        behind.offset.set(behind.offset.get() - count);
                    }
                    self.total.set(self.total.get() - count);
                    ListEvent::Removed {
                        start: base + start,
                        count,
                    }
                }
                ListEvent::Moved { from, to, count } => {
                    if from + count > cached || to + count > cached {
                        panic!(
                            "child reported a move outside its own range.\n segment={},\n from={},\n to={},\n count={},\n cached_count={}",
                            segment, from, to, count, cached
                        );
                    }
                    // A move stays inside one segment, so contiguity and
                    // the offsets of every other segment are untouched.
                    ListEvent::Moved {
                        from: base + from,
                        to: base + to,
                        count,
                    }
                }
                ListEvent::Refreshed => {
                    let fresh = entry.provider.item_count();
                    entry.count.set(fresh);
                    if fresh >= cached {
                        let grown = fresh - cached;
                        for behind in &entries[segment + 1..] {
                            behind.offset.set(behind.offset.get() + grown);
                        }
                        self.total.set(self.total.get() + grown);
                    } else {
                        let shrunk = cached - fresh;
                        for behind in &entries[segment + 1..] {
                            behind.offset.set(behind.offset.get() - shrunk);
                        }
                        self.total.set(self.total.get() - shrunk);
                    }
                    ListEvent::Refreshed
                }
            }
        };
        self.hub.notify(&outgoing);
        self.dispatching.set(false);
    }

    fn dispatch(&self, event: &ListEvent) {
        if self.dispatching.get() {
            panic!(
                "re-entrant structural change: the composition was modified while a notification pass was still running.\n event={:?}",
                event
            );
        }
        self.dispatching.set(true);
        self.hub.notify(event);
        self.dispatching.set(false);
    }

    fn child_at(&self, segment: usize) -> Rc<dyn ListProvider> {
        self.entries.borrow()[segment].provider.clone()
    }

    fn ensure_live(&self, operation: &str) {
        if self.released.get() {
            panic!("{} called on a released composition", operation);
        }
    }
}

impl ListProvider for CompositeProvider {
    fn item_count(&self) -> usize {
        self.ensure_live("item_count");
        self.total.get()
    }

    fn item_id(&self, position: usize) -> Option<ItemId> {
        let (segment, local) = self.locate_child(position);
        let child = self.child_at(segment);
        child.item_id(local).map(|id| id.with_segment(segment as u32))
    }

    fn view_type(&self, position: usize) -> ViewType {
        let (segment, local) = self.locate_child(position);
        let child = self.child_at(segment);
        child.view_type(local).with_segment(segment as u32)
    }

    fn bind(&self, position: usize, payloads: &[Payload]) -> Rendered {
        let (segment, local) = self.locate_child(position);
        let child = self.child_at(segment);
        child.bind(local, payloads)
    }

    fn hub(&self) -> &ChangeHub {
        &self.hub
    }

    fn release(&self) {
        if self.released.get() {
            return;
        }
        let entries = self.entries.replace(Vec::new());
        self.by_key.borrow_mut().clear();
        for entry in &entries {
            let observer: Rc<dyn ChangeObserver> = entry.observer.clone();
            entry.provider.hub().unregister(&observer);
            entry.provider.hub().detach();
        }
        for entry in &entries {
            entry.provider.release();
        }
        self.total.set(0);
        self.released.set(true);
    }

    fn unwrap_position(&self, path: &mut ResolvePath, position: usize) -> usize {
        self.ensure_live("unwrap_position");
        let (segment, local) = self.locate_child(position);
        let child = self.child_at(segment);
        path.append(PathSegment::new(child.clone(), segment));
        child.unwrap_position(path, local)
    }

    fn wrap_position(&self, segment: &PathSegment, local_position: usize) -> Option<usize> {
        if self.released.get() {
            return None;
        }
        // Resolved by child identity, so a path survives the re-indexing
        // that follows an unrelated removal.
        let index = *self.by_key.borrow().get(&provider_key(segment.provider()))?;
        let entries = self.entries.borrow();
        let entry = &entries[index];
        if local_position >= entry.count.get() {
            return None;
        }
        Some(entry.offset.get() + local_position)
    }
}

fn provider_key(provider: &Rc<dyn ListProvider>) -> usize {
    Rc::as_ptr(provider) as *const () as usize
}
