//! Observers and assertion helpers for event-flow tests.

use std::cell::RefCell;
use std::rc::Rc;

use patchwork_core::{ChangeObserver, ItemId, ListEvent, ListProvider};

/// Records every event it sees, in order.
pub struct RecordingObserver {
    events: RefCell<Vec<ListEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Rc<RecordingObserver> {
        Rc::new(RecordingObserver {
            events: RefCell::new(Vec::new()),
        })
    }

    /// Drains and returns everything recorded so far.
    pub fn take(&self) -> Vec<ListEvent> {
        self.events.borrow_mut().drain(..).collect()
    }

    pub fn events(&self) -> Vec<ListEvent> {
        self.events.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

impl ChangeObserver for RecordingObserver {
    fn on_event(&self, event: &ListEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}

/// Binds every position and collects the `String` labels.
pub fn labels_of(provider: &dyn ListProvider) -> Vec<String> {
    (0..provider.item_count())
        .map(|position| {
            provider
                .bind(position, &[])
                .downcast::<String>()
                .map(|label| *label)
                .unwrap_or_else(|_| {
                    panic!("bind at position {} did not produce a String label", position)
                })
        })
        .collect()
}

/// Collects every position's identity.
pub fn ids_of(provider: &dyn ListProvider) -> Vec<Option<ItemId>> {
    (0..provider.item_count())
        .map(|position| provider.item_id(position))
        .collect()
}

/// Asserts the provider's flat sequence of labels.
pub fn assert_labels(provider: &dyn ListProvider, expected: &[&str]) {
    let actual = labels_of(provider);
    assert_eq!(
        actual, expected,
        "flat sequence mismatch: expected {:?}, got {:?}",
        expected, actual
    );
}
