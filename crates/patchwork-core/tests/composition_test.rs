//! End-to-end tests for compositions of live providers.
//!
//! These tests drive real sources through one or two composition levels
//! and check the surfaces a consumer sees: flat windows, tagged
//! identities and view types, remapped change events, and paths that
//! stay usable across unrelated mutations.

use std::rc::Rc;

use patchwork_core::*;
use patchwork_testing::prelude::*;

fn three_sections() -> (Rc<CompositeProvider>, Rc<TestItems>, Rc<TestItems>, Rc<TestItems>) {
    let top = TestItems::new(&["t0", "t1", "t2"]);
    let middle = TestItems::new(&[] as &[&str]);
    let bottom = TestItems::new(&["b0", "b1", "b2", "b3", "b4"]);
    let composite = CompositeProvider::new();
    composite.add_provider(top.clone());
    composite.add_provider(middle.clone());
    composite.add_provider(bottom.clone());
    (composite, top, middle, bottom)
}

#[test]
fn test_sections_concatenate_in_registration_order() {
    let (composite, _top, _middle, _bottom) = three_sections();
    assert_eq!(composite.item_count(), 8);
    assert_labels(
        composite.as_ref(),
        &["t0", "t1", "t2", "b0", "b1", "b2", "b3", "b4"],
    );
}

#[test]
fn test_an_empty_section_owns_no_positions() {
    let (composite, _top, _middle, _bottom) = three_sections();
    for position in 0..3 {
        assert_eq!(composite.locate_child(position), (0, position));
    }
    for position in 3..8 {
        assert_eq!(composite.locate_child(position), (2, position - 3));
    }
}

#[test]
fn test_identities_carry_the_segment_of_their_section() {
    let (composite, top, _middle, bottom) = three_sections();

    let first = composite.item_id(0).expect("identity");
    assert_eq!(first.segment(), 0);
    assert_eq!(first.direct_id(), top.id_at(0));

    let last = composite.item_id(7).expect("identity");
    assert_eq!(last.segment(), 2);
    assert_eq!(last.direct_id(), bottom.id_at(4));
}

#[test]
fn test_view_types_carry_the_same_segment_as_identities() {
    let top = TestItems::with_view_type(&["t0"], 4);
    let bottom = TestItems::with_view_type(&["b0"], -4);
    let composite = CompositeProvider::new();
    composite.add_provider(top);
    composite.add_provider(bottom);

    let first = composite.view_type(0);
    assert_eq!(first.segment(), 0);
    assert_eq!(first.wrapped(), 4);
    let second = composite.view_type(1);
    assert_eq!(second.segment(), 1);
    assert_eq!(second.wrapped(), -4);
    assert_eq!(
        composite.item_id(1).expect("identity").segment(),
        second.segment()
    );
}

#[test]
fn test_the_outermost_composition_wins_the_segment_tag() {
    let inner = CompositeProvider::new();
    inner.add_provider(TestItems::new(&["a"]));
    inner.add_provider(TestItems::new(&["b"]));

    let outer = CompositeProvider::new();
    outer.add_provider(TestItems::new(&["x"]));
    outer.add_provider(inner);

    // "b" sits in the inner composition's segment 1, but surfaces
    // through the outer composition's segment 1 as well; the outer tag
    // is the one consumers see.
    let id = outer.item_id(2).expect("identity");
    assert_eq!(id.segment(), 1);
}

#[test]
fn test_mutations_in_a_later_section_remap_past_earlier_ones() {
    let (composite, _top, _middle, bottom) = three_sections();
    let observer = RecordingObserver::new();
    composite.hub().register(observer.clone());

    bottom.update(1, "b1!");
    bottom.insert(0, "new");
    bottom.remove(2);
    bottom.move_item(0, 3);

    assert_eq!(
        observer.take(),
        vec![
            ListEvent::Changed {
                start: 4,
                count: 1,
                payload: None
            },
            ListEvent::Inserted { start: 3, count: 1 },
            ListEvent::Removed { start: 5, count: 1 },
            ListEvent::Moved {
                from: 3,
                to: 6,
                count: 1
            },
        ]
    );
}

#[test]
fn test_a_section_refresh_recounts_only_that_section() {
    let (composite, top, _middle, _bottom) = three_sections();
    let observer = RecordingObserver::new();
    composite.hub().register(observer.clone());

    top.reset(&["t0", "t1"]);

    assert_eq!(observer.take(), vec![ListEvent::Refreshed]);
    assert_eq!(composite.item_count(), 7);
    assert_labels(
        composite.as_ref(),
        &["t0", "t1", "b0", "b1", "b2", "b3", "b4"],
    );
}

#[test]
fn test_removing_a_section_closes_its_window() {
    let (composite, _top, middle, bottom) = three_sections();
    let observer = RecordingObserver::new();
    composite.hub().register(observer.clone());

    let removed = composite.remove_provider(&(bottom.clone() as Rc<dyn ListProvider>));
    assert!(removed);
    assert_eq!(observer.take(), vec![ListEvent::Removed { start: 3, count: 5 }]);
    assert_eq!(composite.item_count(), 3);

    // The freed source can join another composition.
    let other = CompositeProvider::new();
    other.add_provider(bottom);
    assert_eq!(other.item_count(), 5);

    // Segments shifted down; the remaining empty section is segment 1.
    assert_eq!(composite.segment_of(&(middle as Rc<dyn ListProvider>)), Some(1));
}

#[test]
fn test_paths_resolve_through_nested_compositions() {
    let inner = CompositeProvider::new();
    let leaf = TestItems::new(&["a", "b", "c"]);
    inner.add_provider(TestItems::new(&["x"]));
    inner.add_provider(leaf.clone());

    let outer = CompositeProvider::new();
    outer.add_provider(TestItems::new(&["h0", "h1"]));
    outer.add_provider(inner);

    let (path, local) = ResolvePath::resolve(outer.as_ref(), 4);
    assert_eq!(local, 1);
    assert_eq!(path.depth(), 2);
    assert!(Rc::ptr_eq(
        path.leaf().expect("leaf").provider(),
        &(leaf as Rc<dyn ListProvider>)
    ));
    assert_eq!(path.wrap_back(outer.as_ref(), local), Some(4));
}

#[test]
fn test_paths_survive_mutations_in_other_sections() {
    let (composite, top, _middle, bottom) = three_sections();
    let (path, local) = ResolvePath::resolve(composite.as_ref(), 4);
    assert!(Rc::ptr_eq(
        path.leaf().expect("leaf").provider(),
        &(bottom as Rc<dyn ListProvider>)
    ));

    top.remove(0);
    assert_eq!(path.wrap_back(composite.as_ref(), local), Some(3));
}

#[test]
fn test_paths_go_stale_when_their_section_leaves() {
    let (composite, top, _middle, _bottom) = three_sections();
    let (path, local) = ResolvePath::resolve(composite.as_ref(), 1);

    composite.remove_provider(&(top as Rc<dyn ListProvider>));
    assert_eq!(path.wrap_back(composite.as_ref(), local), None);
}

#[test]
fn test_release_walks_the_whole_tree() {
    let inner = CompositeProvider::new();
    let leaf = TestItems::new(&["a"]);
    inner.add_provider(leaf.clone());

    let outer = CompositeProvider::new();
    outer.add_provider(inner.clone());
    outer.release();

    assert!(!leaf.hub().is_attached());
    assert_eq!(leaf.hub().observer_count(), 0);

    // Released sections are inert and their sources reusable.
    let fresh = CompositeProvider::new();
    fresh.add_provider(leaf);
    assert_eq!(fresh.item_count(), 1);
}

#[test]
#[should_panic(expected = "released")]
fn test_a_released_composition_rejects_lookups() {
    let (composite, _top, _middle, _bottom) = three_sections();
    composite.release();
    composite.item_count();
}
