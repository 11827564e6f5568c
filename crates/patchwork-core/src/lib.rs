//! Stable identity and position virtualization for composable list
//! providers.
//!
//! A virtualized list shows one flat sequence, but the data behind it is
//! usually stitched together: sections concatenated, groups expanded and
//! collapsed, rows filtered, headers bolted on. This crate is the seam
//! between the two views:
//!
//! - [`item_id::ItemId`] and [`view_type::ViewType`] pack "which branch,
//!   which group, which child" into the single 64-bit identity and 32-bit
//!   view type a list consumer expects.
//! - [`provider::ListProvider`] is the contract a composable source
//!   implements; [`composite::CompositeProvider`] concatenates any number
//!   of them and [`wrapper::Wrapper`] adapts exactly one.
//! - [`path::ResolvePath`] records how a flat position was resolved through
//!   the levels so it can be mapped back later.
//! - [`events::ChangeHub`] fans structural changes out to observers, with
//!   positions re-based at every level on the way up.
//!
//! Everything is single-threaded by design: providers form an ownership
//! tree of `Rc` handles, interior state lives in `Cell`/`RefCell`, and
//! protocol violations fail fast with a panic at the offending call site.

pub mod composite;
pub mod events;
pub mod item_id;
pub mod path;
pub mod provider;
pub mod view_type;
pub mod wrapper;

pub use composite::CompositeProvider;
pub use events::{ChangeHub, ChangeObserver, ListEvent, Payload};
pub use item_id::ItemId;
pub use path::{PathSegment, PathVec, ResolvePath};
pub use provider::{
    check_position, Dismissable, Expandable, ListProvider, Rendered, Reorderable, WrapperProvider,
};
pub use view_type::ViewType;
pub use wrapper::{PassthroughStrategy, Remap, WrapStrategy, Wrapper};
