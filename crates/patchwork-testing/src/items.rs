//! An observable in-memory provider for exercising compositions.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use patchwork_core::{
    check_position, impl_dismissable, impl_reorderable, ChangeHub, Dismissable, ItemId,
    ListProvider, Payload, Rendered, Reorderable, ViewType,
};

struct Row {
    id: i64,
    label: String,
}

/// A mutable list of labelled rows that publishes the matching event for
/// every mutation. Ids come from a monotonic counter, so they stay stable
/// across moves and are never reused after a removal.
///
/// `bind` produces the row's label as a `String`, which is what the
/// assertion helpers in [`crate::recording`] downcast to.
pub struct TestItems {
    rows: RefCell<Vec<Row>>,
    next_id: Cell<i64>,
    view_type: i32,
    hub: ChangeHub,
}

impl TestItems {
    pub fn new<S: AsRef<str>>(labels: &[S]) -> Rc<TestItems> {
        Self::with_view_type(labels, 0)
    }

    /// Like [`TestItems::new`] with an explicit provider-local view type
    /// for every row.
    pub fn with_view_type<S: AsRef<str>>(labels: &[S], view_type: i32) -> Rc<TestItems> {
        let rows: Vec<Row> = labels
            .iter()
            .enumerate()
            .map(|(index, label)| Row {
                id: index as i64,
                label: label.as_ref().to_owned(),
            })
            .collect();
        Rc::new(TestItems {
            next_id: Cell::new(rows.len() as i64),
            rows: RefCell::new(rows),
            view_type,
            hub: ChangeHub::new(),
        })
    }

    pub fn push(&self, label: &str) {
        let position = self.rows.borrow().len();
        self.insert(position, label);
    }

    pub fn insert(&self, position: usize, label: &str) {
        let mut rows = self.rows.borrow_mut();
        if position > rows.len() {
            panic!(
                "insert called past the end.\n position={},\n len={}",
                position,
                rows.len()
            );
        }
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        rows.insert(
            position,
            Row {
                id,
                label: label.to_owned(),
            },
        );
        drop(rows);
        self.hub.notify_inserted(position, 1);
    }

    pub fn remove(&self, position: usize) {
        let mut rows = self.rows.borrow_mut();
        check_position(rows.len(), position, "remove");
        rows.remove(position);
        drop(rows);
        self.hub.notify_removed(position, 1);
    }

    pub fn update(&self, position: usize, label: &str) {
        self.update_with_payload(position, label, None);
    }

    pub fn update_with_payload(&self, position: usize, label: &str, payload: Option<Payload>) {
        let mut rows = self.rows.borrow_mut();
        check_position(rows.len(), position, "update");
        rows[position].label = label.to_owned();
        drop(rows);
        self.hub.notify_changed(position, 1, payload);
    }

    /// Moves the row at `from` so it ends up at index `to`.
    pub fn move_item(&self, from: usize, to: usize) {
        let mut rows = self.rows.borrow_mut();
        check_position(rows.len(), from, "move_item");
        check_position(rows.len(), to, "move_item");
        let row = rows.remove(from);
        rows.insert(to, row);
        drop(rows);
        self.hub.notify_moved(from, to, 1);
    }

    /// Replaces the whole content and publishes a full refresh. The new
    /// rows get fresh ids.
    pub fn reset<S: AsRef<str>>(&self, labels: &[S]) {
        let mut rows = self.rows.borrow_mut();
        rows.clear();
        for label in labels {
            let id = self.next_id.get();
            self.next_id.set(id + 1);
            rows.push(Row {
                id,
                label: label.as_ref().to_owned(),
            });
        }
        drop(rows);
        self.hub.notify_refreshed();
    }

    pub fn label(&self, position: usize) -> String {
        let rows = self.rows.borrow();
        check_position(rows.len(), position, "label");
        rows[position].label.clone()
    }

    pub fn id_at(&self, position: usize) -> i64 {
        let rows = self.rows.borrow();
        check_position(rows.len(), position, "id_at");
        rows[position].id
    }
}

impl ListProvider for TestItems {
    fn item_count(&self) -> usize {
        self.rows.borrow().len()
    }

    fn item_id(&self, position: usize) -> Option<ItemId> {
        Some(ItemId::direct(self.id_at(position)))
    }

    fn view_type(&self, position: usize) -> ViewType {
        check_position(self.rows.borrow().len(), position, "view_type");
        ViewType::new(self.view_type)
    }

    fn bind(&self, position: usize, _payloads: &[Payload]) -> Rendered {
        Box::new(self.label(position))
    }

    fn hub(&self) -> &ChangeHub {
        &self.hub
    }

    impl_reorderable!();
    impl_dismissable!();
}

impl Reorderable for TestItems {
    fn can_move_item(&self, _position: usize) -> bool {
        true
    }

    fn move_item(&self, from: usize, to: usize) {
        TestItems::move_item(self, from, to);
    }
}

impl Dismissable for TestItems {
    fn can_dismiss_item(&self, _position: usize) -> bool {
        true
    }

    fn dismiss_item(&self, position: usize) {
        self.remove(position);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::{labels_of, RecordingObserver};
    use patchwork_core::ListEvent;

    #[test]
    fn mutations_publish_matching_events() {
        let items = TestItems::new(&["a", "b"]);
        let observer = RecordingObserver::new();
        items.hub().register(observer.clone());

        items.push("c");
        items.update(0, "a!");
        items.move_item(0, 2);
        items.remove(1);
        items.reset(&["z"]);

        assert_eq!(
            observer.take(),
            vec![
                ListEvent::Inserted { start: 2, count: 1 },
                ListEvent::Changed {
                    start: 0,
                    count: 1,
                    payload: None
                },
                ListEvent::Moved {
                    from: 0,
                    to: 2,
                    count: 1
                },
                ListEvent::Removed { start: 1, count: 1 },
                ListEvent::Refreshed,
            ]
        );
        assert_eq!(labels_of(items.as_ref()), vec!["z"]);
    }

    #[test]
    fn capability_probes_reach_the_row_operations() {
        let items = TestItems::new(&["a", "b"]);

        let reorder = items.as_reorderable().expect("reorderable");
        assert!(reorder.can_move_item(0));
        assert_eq!(reorder.movable_range(0), None);
        reorder.move_item(0, 1);
        assert_eq!(labels_of(items.as_ref()), vec!["b", "a"]);

        let dismiss = items.as_dismissable().expect("dismissable");
        assert!(dismiss.can_dismiss_item(0));
        dismiss.dismiss_item(0);
        assert_eq!(labels_of(items.as_ref()), vec!["a"]);
    }

    #[test]
    fn ids_survive_moves_and_are_never_reused() {
        let items = TestItems::new(&["a", "b", "c"]);
        let id_of_c = items.id_at(2);
        items.move_item(2, 0);
        assert_eq!(items.id_at(0), id_of_c);

        items.remove(0);
        items.push("d");
        let fresh = items.id_at(items.item_count() - 1);
        assert_ne!(fresh, id_of_c);
    }
}
