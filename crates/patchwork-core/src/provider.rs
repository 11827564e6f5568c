//! The contract every composable list source implements.
//!
//! `ListProvider` is deliberately small: a flat window (`item_count`,
//! `item_id`, `view_type`, `bind`), a hub for change events, and the two
//! position-translation hooks that compositions override. Capability traits
//! ride along through `as_*` probes so interaction layers can feature-test a
//! provider without knowing its concrete type; the `impl_*` macros paste the
//! one-line overrides.

use std::any::Any;
use std::ops::Range;
use std::rc::Rc;

use crate::events::{ChangeHub, Payload};
use crate::item_id::ItemId;
use crate::path::{PathSegment, ResolvePath};
use crate::view_type::ViewType;

/// Whatever a provider produces for one bound position. Binders downcast.
pub type Rendered = Box<dyn Any>;

/// A positional source of items that can sit anywhere in a composition.
pub trait ListProvider {
    fn item_count(&self) -> usize;

    /// Stable identity of the item at `position`, or `None` when the
    /// provider has no stable identities.
    fn item_id(&self, position: usize) -> Option<ItemId>;

    fn view_type(&self, position: usize) -> ViewType;

    fn bind(&self, position: usize, payloads: &[Payload]) -> Rendered;

    /// The hub this provider publishes its change events through.
    fn hub(&self) -> &ChangeHub;

    /// Tears the provider down. Compositions release their children
    /// depth-first; releasing twice is a no-op.
    fn release(&self) {}

    /// Walks down to the provider that actually owns `position`, appending
    /// one [`PathSegment`] per level, and returns the position local to
    /// that provider. Leaves terminate the walk.
    fn unwrap_position(&self, path: &mut ResolvePath, position: usize) -> usize {
        let _ = path;
        check_position(self.item_count(), position, "unwrap_position");
        position
    }

    /// Maps `local_position` inside the child named by `segment` back into
    /// this provider's coordinates. Returns `None` when the segment no
    /// longer belongs here or the position is gone; leaves have no segments
    /// and always return `None`.
    fn wrap_position(&self, segment: &PathSegment, local_position: usize) -> Option<usize> {
        let _ = (segment, local_position);
        None
    }

    fn as_wrapper(&self) -> Option<&dyn WrapperProvider> {
        None
    }

    fn as_reorderable(&self) -> Option<&dyn Reorderable> {
        None
    }

    fn as_dismissable(&self) -> Option<&dyn Dismissable> {
        None
    }

    fn as_expandable(&self) -> Option<&dyn Expandable> {
        None
    }
}

/// A provider that defers to exactly one child.
pub trait WrapperProvider: ListProvider {
    /// Handle of the wrapped child.
    fn wrapped(&self) -> Rc<dyn ListProvider>;
}

/// Items can be picked up and dropped somewhere else.
pub trait Reorderable {
    fn can_move_item(&self, position: usize) -> bool;

    /// The span an item may be dragged within. `None` means the whole list.
    fn movable_range(&self, position: usize) -> Option<Range<usize>> {
        let _ = position;
        None
    }

    fn can_drop_over(&self, from: usize, to: usize) -> bool {
        let _ = (from, to);
        true
    }

    fn move_item(&self, from: usize, to: usize);
}

/// Items can be swiped away.
pub trait Dismissable {
    fn can_dismiss_item(&self, position: usize) -> bool;

    fn dismiss_item(&self, position: usize);
}

/// Two-level providers whose groups open and close.
pub trait Expandable {
    fn group_count(&self) -> usize;

    fn is_expanded(&self, group: usize) -> bool;

    /// Returns `true` when the state actually changed.
    fn set_expanded(&self, group: usize, expanded: bool) -> bool;

    fn expanded_count(&self) -> usize;
}

/// Panics when `position` is outside `0..count`, naming the operation.
pub fn check_position(count: usize, position: usize, operation: &str) {
    if position >= count {
        panic!(
            "{} called with a position outside the provider's range.\n position={},\n item_count={}",
            operation, position, count
        );
    }
}

/// Pastes the `as_wrapper` override into a `ListProvider` impl.
#[macro_export]
macro_rules! impl_wrapper_provider {
    () => {
        fn as_wrapper(&self) -> Option<&dyn $crate::provider::WrapperProvider> {
            Some(self)
        }
    };
}

/// Pastes the `as_reorderable` override into a `ListProvider` impl.
#[macro_export]
macro_rules! impl_reorderable {
    () => {
        fn as_reorderable(&self) -> Option<&dyn $crate::provider::Reorderable> {
            Some(self)
        }
    };
}

/// Pastes the `as_dismissable` override into a `ListProvider` impl.
#[macro_export]
macro_rules! impl_dismissable {
    () => {
        fn as_dismissable(&self) -> Option<&dyn $crate::provider::Dismissable> {
            Some(self)
        }
    };
}

/// Pastes the `as_expandable` override into a `ListProvider` impl.
#[macro_export]
macro_rules! impl_expandable {
    () => {
        fn as_expandable(&self) -> Option<&dyn $crate::provider::Expandable> {
            Some(self)
        }
    };
}
