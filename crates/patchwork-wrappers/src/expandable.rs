//! Flattening of two-level grouped data with per-group expansion.
//!
//! A [`GroupedSource`] exposes groups and children; the provider lays them
//! out flat as `header, child*, header, child*, ...` with collapsed groups
//! contributing just their header. An offset table (flat position of every
//! header) makes lookups a binary search, the same shape the composition
//! registry uses for its children.
//!
//! Identities use the two-level packing: headers get the group marker,
//! children carry their group's id next to their own, so expanding and
//! collapsing never changes what an item *is*, only whether it is shown.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use patchwork_core::{
    check_position, impl_expandable, ChangeHub, Expandable, ItemId, ListProvider, Payload,
    Rendered, ViewType,
};

/// Two-level data behind an [`ExpandableProvider`].
///
/// Group and child ids feed the two-level identity packing, so they must
/// fit its domains: group ids in `ItemId::MIN_GROUP_ID..=MAX_GROUP_ID`,
/// child ids in `ItemId::MIN_CHILD_ID..=MAX_CHILD_ID`.
pub trait GroupedSource: 'static {
    fn group_count(&self) -> usize;

    fn child_count(&self, group: usize) -> usize;

    /// Stable id of the group, unique among groups.
    fn group_id(&self, group: usize) -> i64;

    /// Stable id of the child, unique within its group.
    fn child_id(&self, group: usize, child: usize) -> i64;

    fn group_view_type(&self, group: usize) -> i32 {
        let _ = group;
        0
    }

    fn child_view_type(&self, group: usize, child: usize) -> i32 {
        let _ = (group, child);
        0
    }

    fn bind_group(&self, group: usize, payloads: &[Payload]) -> Rendered;

    fn bind_child(&self, group: usize, child: usize, payloads: &[Payload]) -> Rendered;

    /// Expansion state applied when the provider first sees the group.
    fn initially_expanded(&self, group: usize) -> bool {
        let _ = group;
        false
    }
}

/// Presents a [`GroupedSource`] as one flat provider.
///
/// The provider owns the expansion state. The data owner mutates the
/// source first and then calls the matching `notify_*` method here, mirror
/// to how a plain provider publishes through its hub.
pub struct ExpandableProvider<G: GroupedSource> {
    source: G,
    /// Expansion flag per group.
    expanded: RefCell<Vec<bool>>,
    /// Flat position of every group header, ascending.
    offsets: RefCell<Vec<usize>>,
    total: Cell<usize>,
    hub: ChangeHub,
    released: Cell<bool>,
}

impl<G: GroupedSource> ExpandableProvider<G> {
    pub fn new(source: G) -> Rc<ExpandableProvider<G>> {
        let provider = Rc::new(ExpandableProvider {
            source,
            expanded: RefCell::new(Vec::new()),
            offsets: RefCell::new(Vec::new()),
            total: Cell::new(0),
            hub: ChangeHub::new(),
            released: Cell::new(false),
        });
        provider.reset_expansion();
        provider
    }

    pub fn source(&self) -> &G {
        &self.source
    }

    /// Resolves a flat position to `(group, None)` for a header or
    /// `(group, Some(child))` for a child row.
    pub fn locate(&self, position: usize) -> (usize, Option<usize>) {
        self.ensure_live("locate");
        check_position(self.total.get(), position, "locate");
        let offsets = self.offsets.borrow();
        let group = offsets.partition_point(|&offset| offset <= position) - 1;
        let local = position - offsets[group];
        if local == 0 {
            (group, None)
        } else {
            (group, Some(local - 1))
        }
    }

    /// Flat position of the group's header row.
    pub fn flat_position_of_group(&self, group: usize) -> usize {
        self.ensure_live("flat_position_of_group");
        self.check_group(group);
        self.offsets.borrow()[group]
    }

    /// Flat position of a child row, or `None` while its group is
    /// collapsed.
    pub fn flat_position_of_child(&self, group: usize, child: usize) -> Option<usize> {
        self.ensure_live("flat_position_of_child");
        self.check_group(group);
        let children = self.source.child_count(group);
        if child >= children {
            panic!(
                "no such child.\n group={},\n child={},\n child_count={}",
                group, child, children
            );
        }
        if !self.expanded.borrow()[group] {
            return None;
        }
        Some(self.offsets.borrow()[group] + 1 + child)
    }

    /// Opens `group`. Returns `false` when it was already open.
    pub fn expand(&self, group: usize) -> bool {
        self.ensure_live("expand");
        self.check_group(group);
        if self.expanded.borrow()[group] {
            return false;
        }
        self.expanded.borrow_mut()[group] = true;
        self.rebuild_offsets();
        let header = self.offsets.borrow()[group];
        let children = self.source.child_count(group);
        self.hub.notify_changed(header, 1, None);
        if children > 0 {
            self.hub.notify_inserted(header + 1, children);
        }
        true
    }

    /// Closes `group`. Returns `false` when it was already closed.
    pub fn collapse(&self, group: usize) -> bool {
        self.ensure_live("collapse");
        self.check_group(group);
        if !self.expanded.borrow()[group] {
            return false;
        }
        let children = self.source.child_count(group);
        self.expanded.borrow_mut()[group] = false;
        self.rebuild_offsets();
        let header = self.offsets.borrow()[group];
        self.hub.notify_changed(header, 1, None);
        if children > 0 {
            self.hub.notify_removed(header + 1, children);
        }
        true
    }

    /// Flips `group` and returns whether it is now expanded.
    pub fn toggle(&self, group: usize) -> bool {
        self.ensure_live("toggle");
        self.check_group(group);
        if self.expanded.borrow()[group] {
            self.collapse(group);
            false
        } else {
            self.expand(group);
            true
        }
    }

    pub fn expand_all(&self) {
        for group in 0..self.source.group_count() {
            self.expand(group);
        }
    }

    pub fn collapse_all(&self) {
        for group in 0..self.source.group_count() {
            self.collapse(group);
        }
    }

    /// Groups were inserted into the source at `start`.
    pub fn notify_groups_inserted(&self, start: usize, count: usize) {
        self.ensure_live("notify_groups_inserted");
        let mut expanded = self.expanded.borrow_mut();
        if start > expanded.len() {
            panic!(
                "group insertion past the end.\n start={},\n group_count={}",
                start,
                expanded.len()
            );
        }
        for group in start..start + count {
            expanded.insert(group, self.source.initially_expanded(group));
        }
        drop(expanded);
        self.rebuild_offsets();
        let (flat_start, flat_count) = self.flat_span(start, count);
        self.hub.notify_inserted(flat_start, flat_count);
    }

    /// Groups `start..start + count` were removed from the source.
    pub fn notify_groups_removed(&self, start: usize, count: usize) {
        self.ensure_live("notify_groups_removed");
        {
            let expanded = self.expanded.borrow();
            if start + count > expanded.len() {
                panic!(
                    "group removal outside the range.\n start={},\n count={},\n group_count={}",
                    start,
                    count,
                    expanded.len()
                );
            }
        }
        // The outgoing span comes from the old table, which still
        // describes the layout the positions refer to.
        let (flat_start, flat_count) = self.flat_span(start, count);
        self.expanded.borrow_mut().drain(start..start + count);
        self.rebuild_offsets();
        self.hub.notify_removed(flat_start, flat_count);
    }

    /// The group at `from` now sits at `to`, children and all.
    pub fn notify_group_moved(&self, from: usize, to: usize) {
        self.ensure_live("notify_group_moved");
        self.check_group(from);
        self.check_group(to);
        if from == to {
            return;
        }
        let flat_from = self.offsets.borrow()[from];
        let flag = self.expanded.borrow_mut().remove(from);
        self.expanded.borrow_mut().insert(to, flag);
        self.rebuild_offsets();
        let flat_to = self.offsets.borrow()[to];
        let span = 1 + if flag { self.source.child_count(to) } else { 0 };
        self.hub.notify_moved(flat_from, flat_to, span);
    }

    /// The group header's content changed.
    pub fn notify_group_changed(&self, group: usize, payload: Option<Payload>) {
        self.ensure_live("notify_group_changed");
        self.check_group(group);
        let header = self.offsets.borrow()[group];
        self.hub.notify_changed(header, 1, payload);
    }

    /// Children were inserted into `group` at `child_start`. Silent while
    /// the group is collapsed.
    pub fn notify_children_inserted(&self, group: usize, child_start: usize, count: usize) {
        self.ensure_live("notify_children_inserted");
        self.check_group(group);
        if !self.expanded.borrow()[group] {
            return;
        }
        self.rebuild_offsets();
        let flat = self.offsets.borrow()[group] + 1 + child_start;
        self.hub.notify_inserted(flat, count);
    }

    /// Children `child_start..child_start + count` were removed from
    /// `group`. Silent while the group is collapsed.
    pub fn notify_children_removed(&self, group: usize, child_start: usize, count: usize) {
        self.ensure_live("notify_children_removed");
        self.check_group(group);
        if !self.expanded.borrow()[group] {
            return;
        }
        self.rebuild_offsets();
        let flat = self.offsets.borrow()[group] + 1 + child_start;
        self.hub.notify_removed(flat, count);
    }

    /// One child's content changed. Silent while the group is collapsed.
    pub fn notify_child_changed(&self, group: usize, child: usize, payload: Option<Payload>) {
        self.ensure_live("notify_child_changed");
        self.check_group(group);
        if !self.expanded.borrow()[group] {
            return;
        }
        let flat = self.offsets.borrow()[group] + 1 + child;
        self.hub.notify_changed(flat, 1, payload);
    }

    /// The source changed wholesale. Expansion state is re-seeded from
    /// [`GroupedSource::initially_expanded`], since the old groups can no
    /// longer be matched up.
    pub fn notify_refreshed(&self) {
        self.ensure_live("notify_refreshed");
        self.reset_expansion();
        self.hub.notify_refreshed();
    }

    fn reset_expansion(&self) {
        let groups = self.source.group_count();
        let mut expanded = self.expanded.borrow_mut();
        expanded.clear();
        for group in 0..groups {
            expanded.push(self.source.initially_expanded(group));
        }
        drop(expanded);
        self.rebuild_offsets();
    }

    fn rebuild_offsets(&self) {
        let expanded = self.expanded.borrow();
        let mut offsets = self.offsets.borrow_mut();
        offsets.clear();
        let mut offset = 0;
        for (group, &is_expanded) in expanded.iter().enumerate() {
            offsets.push(offset);
            offset += 1;
            if is_expanded {
                offset += self.source.child_count(group);
            }
        }
        self.total.set(offset);
    }

    /// Flat span currently occupied by groups `start..start + count`.
    fn flat_span(&self, start: usize, count: usize) -> (usize, usize) {
        let offsets = self.offsets.borrow();
        let flat_start = offsets[start];
        let flat_end = if start + count < offsets.len() {
            offsets[start + count]
        } else {
            self.total.get()
        };
        (flat_start, flat_end - flat_start)
    }

    fn check_group(&self, group: usize) {
        let groups = self.expanded.borrow().len();
        if group >= groups {
            panic!(
                "no such group.\n group={},\n group_count={}",
                group, groups
            );
        }
    }

    fn ensure_live(&self, operation: &str) {
        if self.released.get() {
            panic!("{} called on a released provider", operation);
        }
    }
}

impl<G: GroupedSource> ListProvider for ExpandableProvider<G> {
    fn item_count(&self) -> usize {
        self.ensure_live("item_count");
        self.total.get()
    }

    fn item_id(&self, position: usize) -> Option<ItemId> {
        match self.locate(position) {
            (group, None) => Some(ItemId::group(self.source.group_id(group))),
            (group, Some(child)) => Some(ItemId::child(
                self.source.group_id(group),
                self.source.child_id(group, child),
            )),
        }
    }

    fn view_type(&self, position: usize) -> ViewType {
        match self.locate(position) {
            (group, None) => ViewType::expandable_group(self.source.group_view_type(group)),
            (group, Some(child)) => ViewType::new(self.source.child_view_type(group, child)),
        }
    }

    fn bind(&self, position: usize, payloads: &[Payload]) -> Rendered {
        match self.locate(position) {
            (group, None) => self.source.bind_group(group, payloads),
            (group, Some(child)) => self.source.bind_child(group, child, payloads),
        }
    }

    fn hub(&self) -> &ChangeHub {
        &self.hub
    }

    fn release(&self) {
        if self.released.get() {
            return;
        }
        self.expanded.borrow_mut().clear();
        self.offsets.borrow_mut().clear();
        self.total.set(0);
        self.released.set(true);
    }

    impl_expandable!();
}

impl<G: GroupedSource> Expandable for ExpandableProvider<G> {
    fn group_count(&self) -> usize {
        self.source.group_count()
    }

    fn is_expanded(&self, group: usize) -> bool {
        self.check_group(group);
        self.expanded.borrow()[group]
    }

    fn set_expanded(&self, group: usize, expanded: bool) -> bool {
        if expanded {
            self.expand(group)
        } else {
            self.collapse(group)
        }
    }

    fn expanded_count(&self) -> usize {
        self.expanded.borrow().iter().filter(|&&open| open).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use patchwork_core::ListEvent;
    use patchwork_testing::prelude::*;

    /// Groups of labelled children, mutable for the notify_* tests.
    struct Teams {
        groups: RefCell<Vec<(String, Vec<String>)>>,
    }

    impl Teams {
        fn new(groups: &[(&str, &[&str])]) -> Teams {
            Teams {
                groups: RefCell::new(
                    groups
                        .iter()
                        .map(|(name, members)| {
                            (
                                name.to_string(),
                                members.iter().map(|member| member.to_string()).collect(),
                            )
                        })
                        .collect(),
                ),
            }
        }
    }

    impl GroupedSource for Teams {
        fn group_count(&self) -> usize {
            self.groups.borrow().len()
        }

        fn child_count(&self, group: usize) -> usize {
            self.groups.borrow()[group].1.len()
        }

        fn group_id(&self, group: usize) -> i64 {
            // Labels stand in for real keys, so hash-free: first byte.
            self.groups.borrow()[group].0.as_bytes()[0] as i64
        }

        fn child_id(&self, group: usize, child: usize) -> i64 {
            child as i64
        }

        fn group_view_type(&self, _group: usize) -> i32 {
            1
        }

        fn bind_group(&self, group: usize, _payloads: &[Payload]) -> Rendered {
            Box::new(self.groups.borrow()[group].0.clone())
        }

        fn bind_child(&self, group: usize, child: usize, _payloads: &[Payload]) -> Rendered {
            Box::new(self.groups.borrow()[group].1[child].clone())
        }
    }

    fn teams() -> Rc<ExpandableProvider<Teams>> {
        ExpandableProvider::new(Teams::new(&[
            ("red", &["r0", "r1"]),
            ("green", &[]),
            ("blue", &["b0", "b1", "b2"]),
        ]))
    }

    #[test]
    fn collapsed_groups_show_only_headers() {
        let provider = teams();
        assert_eq!(provider.item_count(), 3);
        assert_labels(provider.as_ref(), &["red", "green", "blue"]);
    }

    #[test]
    fn expansion_inlines_the_children() {
        let provider = teams();
        provider.expand(0);
        provider.expand(2);
        assert_labels(
            provider.as_ref(),
            &["red", "r0", "r1", "green", "blue", "b0", "b1", "b2"],
        );
        assert_eq!(provider.locate(1), (0, Some(0)));
        assert_eq!(provider.locate(4), (2, None));
        assert_eq!(provider.locate(7), (2, Some(2)));
    }

    #[test]
    fn expand_publishes_the_header_change_and_the_children() {
        let provider = teams();
        let observer = RecordingObserver::new();
        provider.hub().register(observer.clone());

        provider.expand(2);
        assert_eq!(
            observer.take(),
            vec![
                ListEvent::Changed {
                    start: 2,
                    count: 1,
                    payload: None
                },
                ListEvent::Inserted { start: 3, count: 3 },
            ]
        );

        provider.collapse(2);
        assert_eq!(
            observer.take(),
            vec![
                ListEvent::Changed {
                    start: 2,
                    count: 1,
                    payload: None
                },
                ListEvent::Removed { start: 3, count: 3 },
            ]
        );
    }

    #[test]
    fn expanding_an_empty_group_changes_only_the_header() {
        let provider = teams();
        let observer = RecordingObserver::new();
        provider.hub().register(observer.clone());

        provider.expand(1);
        assert_eq!(
            observer.take(),
            vec![ListEvent::Changed {
                start: 1,
                count: 1,
                payload: None
            }]
        );
        assert_eq!(provider.item_count(), 3);
    }

    #[test]
    fn expand_and_collapse_report_whether_they_acted() {
        let provider = teams();
        assert!(provider.expand(0));
        assert!(!provider.expand(0));
        assert!(provider.collapse(0));
        assert!(!provider.collapse(0));
        assert!(provider.toggle(0));
        assert!(!provider.toggle(0));
    }

    #[test]
    fn headers_and_children_get_two_level_identities() {
        let provider = teams();
        provider.expand(0);

        let header = provider.item_id(0).unwrap();
        assert!(header.is_group());
        assert_eq!(header.group_id(), b'r' as i64);
        assert_eq!(header.child_id(), None);

        let child = provider.item_id(2).unwrap();
        assert!(!child.is_group());
        assert_eq!(child.group_id(), b'r' as i64);
        assert_eq!(child.child_id(), Some(1));
    }

    #[test]
    fn identities_survive_expansion_state_changes() {
        let provider = teams();
        let before = provider.item_id(2).unwrap();
        provider.expand(0);
        let after = provider.item_id(4).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn header_view_types_carry_the_expandable_flag() {
        let provider = teams();
        provider.expand(0);
        let header = provider.view_type(0);
        assert!(header.is_expandable_group());
        assert_eq!(header.wrapped(), 1);
        let child = provider.view_type(1);
        assert!(!child.is_expandable_group());
        assert_eq!(child.wrapped(), 0);
    }

    #[test]
    fn flat_positions_follow_the_expansion_state() {
        let provider = teams();
        assert_eq!(provider.flat_position_of_group(2), 2);
        assert_eq!(provider.flat_position_of_child(2, 1), None);
        provider.expand(2);
        assert_eq!(provider.flat_position_of_child(2, 1), Some(4));
        provider.expand(0);
        assert_eq!(provider.flat_position_of_group(2), 4);
        assert_eq!(provider.flat_position_of_child(2, 1), Some(6));
    }

    #[test]
    fn the_capability_probe_reports_expansion() {
        let provider = teams();
        let probe = provider.as_expandable().unwrap();
        assert_eq!(probe.group_count(), 3);
        assert_eq!(probe.expanded_count(), 0);
        assert!(probe.set_expanded(0, true));
        assert!(!probe.set_expanded(0, true));
        assert_eq!(probe.expanded_count(), 1);
        assert!(probe.is_expanded(0));
    }

    #[test]
    fn group_structure_notifications_update_the_flat_window() {
        let provider = teams();
        provider.expand(2);
        let observer = RecordingObserver::new();
        provider.hub().register(observer.clone());

        provider.source().groups.borrow_mut().insert(
            1,
            ("yellow".to_string(), vec!["y0".to_string()]),
        );
        provider.notify_groups_inserted(1, 1);
        assert_eq!(
            observer.take(),
            vec![ListEvent::Inserted { start: 1, count: 1 }]
        );
        assert_labels(
            provider.as_ref(),
            &["red", "yellow", "green", "blue", "b0", "b1", "b2"],
        );

        provider.source().groups.borrow_mut().remove(3);
        provider.notify_groups_removed(3, 1);
        assert_eq!(
            observer.take(),
            vec![ListEvent::Removed { start: 3, count: 4 }]
        );
        assert_labels(provider.as_ref(), &["red", "yellow", "green"]);
    }

    #[test]
    fn an_expanded_group_moves_as_one_block() {
        let provider = teams();
        provider.expand(0);
        let observer = RecordingObserver::new();
        provider.hub().register(observer.clone());

        let moved = provider.source().groups.borrow_mut().remove(0);
        provider.source().groups.borrow_mut().push(moved);
        provider.notify_group_moved(0, 2);

        assert_eq!(
            observer.take(),
            vec![ListEvent::Moved {
                from: 0,
                to: 2,
                count: 3
            }]
        );
        assert_labels(
            provider.as_ref(),
            &["green", "blue", "red", "r0", "r1"],
        );
    }

    #[test]
    fn child_notifications_are_silent_while_collapsed() {
        let provider = teams();
        let observer = RecordingObserver::new();
        provider.hub().register(observer.clone());

        provider
            .source()
            .groups
            .borrow_mut()[0]
            .1
            .push("r2".to_string());
        provider.notify_children_inserted(0, 2, 1);
        assert!(observer.take().is_empty());

        provider.expand(0);
        observer.clear();
        provider.notify_child_changed(0, 2, None);
        assert_eq!(
            observer.take(),
            vec![ListEvent::Changed {
                start: 3,
                count: 1,
                payload: None
            }]
        );
    }

    #[test]
    fn child_removal_in_an_expanded_group_shifts_the_rest() {
        let provider = teams();
        provider.expand(2);
        let observer = RecordingObserver::new();
        provider.hub().register(observer.clone());

        provider.source().groups.borrow_mut()[2].1.remove(0);
        provider.notify_children_removed(2, 0, 1);

        assert_eq!(
            observer.take(),
            vec![ListEvent::Removed { start: 3, count: 1 }]
        );
        assert_labels(provider.as_ref(), &["red", "green", "blue", "b1", "b2"]);
    }

    #[test]
    fn refresh_reseeds_expansion() {
        let provider = teams();
        provider.expand(0);
        let observer = RecordingObserver::new();
        provider.hub().register(observer.clone());

        provider.notify_refreshed();
        assert_eq!(observer.take(), vec![ListEvent::Refreshed]);
        assert_eq!(provider.item_count(), 3);
    }

    #[test]
    #[should_panic(expected = "no such group")]
    fn expanding_a_missing_group_panics() {
        teams().expand(3);
    }

    #[test]
    #[should_panic(expected = "outside the provider's range")]
    fn locate_checks_bounds() {
        teams().locate(3);
    }

    #[test]
    #[should_panic(expected = "released provider")]
    fn expand_after_release_panics() {
        let provider = teams();
        provider.release();
        provider.expand(0);
    }
}
