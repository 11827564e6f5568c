//! Ready-made wrappers over the provider core.
//!
//! Each module contributes one layer that can be stacked over any
//! [`patchwork_core::ListProvider`]: row filtering, header and footer
//! framing, two-level expansion, and a verification layer for debugging
//! a whole stack. Layers nest freely; each one claims its child through
//! the single-owner attach flag and releases it on teardown.

pub mod debug;
pub mod expandable;
pub mod filter;
pub mod header_footer;

pub use debug::{debug, DebugControl, DebugFlags, DebugStrategy, DebugWrapper};
pub use expandable::{ExpandableProvider, GroupedSource};
pub use filter::{filtered, FilterControl, FilterStrategy, FilterWrapper, Predicate};
pub use header_footer::{
    HeaderFooterWrapper, CONTENT_SEGMENT, FOOTER_SEGMENT, HEADER_SEGMENT,
};
