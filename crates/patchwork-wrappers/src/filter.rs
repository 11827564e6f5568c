//! Predicate filtering over one child provider.
//!
//! The strategy keeps a sorted table of the child positions that currently
//! pass the predicate; wrapper position `i` is simply `table[i]`. Child
//! events patch the table and shrink to the visible span, except where the
//! outcome stops being expressible as one contiguous event, in which case
//! the wrapper downgrades to a full refresh:
//!
//! - a change that flips visibility (membership differs before and after),
//! - any move, since the displaced span may be interleaved with hidden
//!   rows on either side of the move.

use std::cell::RefCell;
use std::rc::Rc;

use patchwork_core::{ListEvent, ListProvider, Payload, Remap, WrapStrategy, Wrapper, WrapperProvider};

/// Decides row visibility from the child and a child-local position.
///
/// Predicates usually capture the concrete provider they filter, so the
/// `&dyn ListProvider` argument is only a convenience for generic ones.
pub type Predicate = dyn Fn(&dyn ListProvider, usize) -> bool;

/// A wrapper that hides the child rows failing a predicate.
pub type FilterWrapper = Wrapper<FilterStrategy>;

/// Wraps `child`, showing only the rows `predicate` accepts.
pub fn filtered(
    child: Rc<dyn ListProvider>,
    predicate: impl Fn(&dyn ListProvider, usize) -> bool + 'static,
) -> Rc<FilterWrapper> {
    Wrapper::new(child, FilterStrategy::new(predicate))
}

pub struct FilterStrategy {
    predicate: RefCell<Rc<Predicate>>,
    /// Child positions currently visible, ascending.
    visible: RefCell<Vec<usize>>,
}

impl FilterStrategy {
    pub fn new(predicate: impl Fn(&dyn ListProvider, usize) -> bool + 'static) -> FilterStrategy {
        FilterStrategy {
            predicate: RefCell::new(Rc::new(predicate)),
            visible: RefCell::new(Vec::new()),
        }
    }

    fn rebuild(&self, child: &dyn ListProvider) {
        let predicate = self.predicate.borrow().clone();
        let passing: Vec<usize> =
            (0..child.item_count()).filter(|&position| predicate(child, position)).collect();
        *self.visible.borrow_mut() = passing;
    }

    fn remap_changed(
        &self,
        child: &dyn ListProvider,
        start: usize,
        count: usize,
        payload: &Option<Payload>,
    ) -> Remap {
        let predicate = self.predicate.borrow().clone();
        let now_visible: Vec<bool> =
            (start..start + count).map(|position| predicate(child, position)).collect();

        let visible = self.visible.borrow();
        let first = visible.partition_point(|&position| position < start);
        let after = visible.partition_point(|&position| position < start + count);

        let mut membership_changed = false;
        let mut cursor = first;
        for (offset, &is_visible) in now_visible.iter().enumerate() {
            let was_visible = visible.get(cursor) == Some(&(start + offset));
            if was_visible {
                cursor += 1;
            }
            if is_visible != was_visible {
                membership_changed = true;
                break;
            }
        }
        drop(visible);

        if membership_changed {
            self.rebuild(child);
            return Remap::Refresh;
        }
        let visible_count = after - first;
        if visible_count == 0 {
            Remap::Skip
        } else {
            Remap::Forward(ListEvent::Changed {
                start: first,
                count: visible_count,
                payload: payload.clone(),
            })
        }
    }

    fn remap_inserted(&self, child: &dyn ListProvider, start: usize, count: usize) -> Remap {
        let predicate = self.predicate.borrow().clone();
        let added: Vec<usize> =
            (start..start + count).filter(|&position| predicate(child, position)).collect();

        let mut visible = self.visible.borrow_mut();
        let first = visible.partition_point(|&position| position < start);
        for position in visible[first..].iter_mut() {
            *position += count;
        }
        let added_count = added.len();
        visible.splice(first..first, added);
        drop(visible);

        if added_count == 0 {
            Remap::Skip
        } else {
            Remap::Forward(ListEvent::Inserted {
                start: first,
                count: added_count,
            })
        }
    }

    fn remap_removed(&self, start: usize, count: usize) -> Remap {
        let mut visible = self.visible.borrow_mut();
        let first = visible.partition_point(|&position| position < start);
        let after = visible.partition_point(|&position| position < start + count);
        let removed_count = after - first;
        visible.drain(first..after);
        for position in visible[first..].iter_mut() {
            *position -= count;
        }
        drop(visible);

        if removed_count == 0 {
            Remap::Skip
        } else {
            Remap::Forward(ListEvent::Removed {
                start: first,
                count: removed_count,
            })
        }
    }
}

impl WrapStrategy for FilterStrategy {
    fn on_attach(&self, child: &dyn ListProvider) {
        self.rebuild(child);
    }

    fn item_count(&self, _child: &dyn ListProvider) -> usize {
        self.visible.borrow().len()
    }

    fn to_child(&self, _child: &dyn ListProvider, position: usize) -> usize {
        self.visible.borrow()[position]
    }

    fn from_child(&self, _child: &dyn ListProvider, child_position: usize) -> Option<usize> {
        let visible = self.visible.borrow();
        let index = visible.partition_point(|&position| position < child_position);
        if visible.get(index) == Some(&child_position) {
            Some(index)
        } else {
            None
        }
    }

    fn remap(&self, child: &dyn ListProvider, event: &ListEvent) -> Remap {
        match *event {
            ListEvent::Changed {
                start,
                count,
                ref payload,
            } => self.remap_changed(child, start, count, payload),
            ListEvent::Inserted { start, count } => self.remap_inserted(child, start, count),
            ListEvent::Removed { start, count } => self.remap_removed(start, count),
            // The hole and the landing spot interact with hidden rows in
            // ways a single contiguous event cannot express.
            ListEvent::Moved { .. } => {
                self.rebuild(child);
                Remap::Refresh
            }
            ListEvent::Refreshed => {
                self.rebuild(child);
                Remap::Forward(ListEvent::Refreshed)
            }
        }
    }
}

/// Predicate management on an assembled [`FilterWrapper`].
pub trait FilterControl {
    /// Swaps the predicate and publishes the new visible set as a full
    /// refresh.
    fn set_predicate(&self, predicate: impl Fn(&dyn ListProvider, usize) -> bool + 'static);

    /// Re-runs the current predicate, for child data that changed without
    /// events. Publishes a full refresh.
    fn refilter(&self);
}

impl FilterControl for FilterWrapper {
    fn set_predicate(&self, predicate: impl Fn(&dyn ListProvider, usize) -> bool + 'static) {
        *self.strategy().predicate.borrow_mut() = Rc::new(predicate);
        self.refilter();
    }

    fn refilter(&self) {
        let child = self.wrapped();
        self.strategy().rebuild(child.as_ref());
        self.notify(ListEvent::Refreshed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use patchwork_testing::prelude::*;

    fn hide_x_rows(items: &Rc<TestItems>) -> Rc<FilterWrapper> {
        let captured = items.clone();
        filtered(items.clone() as Rc<dyn ListProvider>, move |_, position| {
            !captured.label(position).starts_with('x')
        })
    }

    fn items_with_hidden() -> (Rc<TestItems>, Rc<FilterWrapper>) {
        let items = TestItems::new(&["a", "xb", "c", "xd", "e"]);
        let filter = hide_x_rows(&items);
        (items, filter)
    }

    #[test]
    fn hidden_rows_vanish_from_the_window() {
        let (_items, filter) = items_with_hidden();
        assert_eq!(filter.item_count(), 3);
        assert_labels(filter.as_ref(), &["a", "c", "e"]);
    }

    #[test]
    fn ids_pass_through_unchanged() {
        let (items, filter) = items_with_hidden();
        assert_eq!(filter.item_id(1), items.item_id(2));
    }

    #[test]
    fn unwrap_lands_on_the_child_position() {
        let (items, filter) = items_with_hidden();
        let (path, local) = patchwork_core::ResolvePath::resolve(filter.as_ref(), 2);
        assert_eq!(local, 4);
        assert!(Rc::ptr_eq(
            path.leaf().unwrap().provider(),
            &(items as Rc<dyn ListProvider>)
        ));
        assert_eq!(path.wrap_back(filter.as_ref(), local), Some(2));
    }

    #[test]
    fn wrapping_back_a_hidden_position_reports_it_gone() {
        let (items, filter) = items_with_hidden();
        let (path, _local) = patchwork_core::ResolvePath::resolve(filter.as_ref(), 0);
        let _ = items;
        assert_eq!(path.wrap_back(filter.as_ref(), 1), None);
        assert_eq!(path.wrap_back(filter.as_ref(), 2), Some(1));
    }

    #[test]
    fn visible_insertions_shrink_to_the_visible_span() {
        let (items, filter) = items_with_hidden();
        let observer = RecordingObserver::new();
        filter.hub().register(observer.clone());

        items.insert(2, "b");

        assert_eq!(
            observer.take(),
            vec![ListEvent::Inserted { start: 1, count: 1 }]
        );
        assert_labels(filter.as_ref(), &["a", "b", "c", "e"]);
    }

    #[test]
    fn hidden_insertions_are_silent() {
        let (items, filter) = items_with_hidden();
        let observer = RecordingObserver::new();
        filter.hub().register(observer.clone());

        items.insert(0, "xz");

        assert!(observer.take().is_empty());
        assert_labels(filter.as_ref(), &["a", "c", "e"]);
    }

    #[test]
    fn removals_report_only_the_visible_casualties() {
        let (items, filter) = items_with_hidden();
        let observer = RecordingObserver::new();
        filter.hub().register(observer.clone());

        items.remove(2);
        assert_eq!(
            observer.take(),
            vec![ListEvent::Removed { start: 1, count: 1 }]
        );

        items.remove(1);
        assert!(observer.take().is_empty());
        assert_labels(filter.as_ref(), &["a", "e"]);
    }

    #[test]
    fn changes_keep_their_payload_within_the_visible_span() {
        let (items, filter) = items_with_hidden();
        let observer = RecordingObserver::new();
        filter.hub().register(observer.clone());

        let payload: Payload = Rc::new("badge");
        items.update_with_payload(4, "e!", Some(payload.clone()));

        assert_eq!(
            observer.take(),
            vec![ListEvent::Changed {
                start: 2,
                count: 1,
                payload: Some(payload)
            }]
        );
    }

    #[test]
    fn changes_to_hidden_rows_are_silent() {
        let (items, filter) = items_with_hidden();
        let observer = RecordingObserver::new();
        filter.hub().register(observer.clone());

        items.update(1, "xb!");

        assert!(observer.take().is_empty());
    }

    #[test]
    fn a_change_that_flips_visibility_downgrades_to_refresh() {
        let (items, filter) = items_with_hidden();
        let observer = RecordingObserver::new();
        filter.hub().register(observer.clone());

        items.update(1, "b");

        assert_eq!(observer.take(), vec![ListEvent::Refreshed]);
        assert_labels(filter.as_ref(), &["a", "b", "c", "e"]);
    }

    #[test]
    fn any_move_downgrades_to_refresh() {
        let (items, filter) = items_with_hidden();
        let observer = RecordingObserver::new();
        filter.hub().register(observer.clone());

        items.move_item(0, 4);

        assert_eq!(observer.take(), vec![ListEvent::Refreshed]);
        assert_labels(filter.as_ref(), &["c", "e", "a"]);
    }

    #[test]
    fn set_predicate_republishes_the_window() {
        let (items, filter) = items_with_hidden();
        let observer = RecordingObserver::new();
        filter.hub().register(observer.clone());

        let captured = items.clone();
        filter.set_predicate(move |_, position| captured.label(position).starts_with('x'));

        assert_eq!(observer.take(), vec![ListEvent::Refreshed]);
        assert_labels(filter.as_ref(), &["xb", "xd"]);
    }

    #[test]
    fn child_refresh_rebuilds_the_table() {
        let (items, filter) = items_with_hidden();
        let observer = RecordingObserver::new();
        filter.hub().register(observer.clone());

        items.reset(&["p", "xq", "r"]);

        assert_eq!(observer.take(), vec![ListEvent::Refreshed]);
        assert_labels(filter.as_ref(), &["p", "r"]);
    }

    #[test]
    fn release_frees_the_child() {
        let (items, filter) = items_with_hidden();
        filter.release();
        assert!(!items.hub().is_attached());
    }
}
