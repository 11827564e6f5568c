//! Header and footer rows around a content provider.
//!
//! Structurally this is a three-segment composition: headers, content,
//! footers. The wrapper is a thin facade over an internal
//! [`CompositeProvider`], so offsets, segment-tagged identities, event
//! re-basing, and path resolution all come from the composition machinery
//! rather than a second implementation of the same arithmetic.

use std::rc::Rc;

use patchwork_core::{
    impl_wrapper_provider, ChangeHub, CompositeProvider, ItemId, ListProvider, PathSegment,
    Payload, Rendered, ResolvePath, ViewType, WrapperProvider,
};

pub const HEADER_SEGMENT: usize = 0;
pub const CONTENT_SEGMENT: usize = 1;
pub const FOOTER_SEGMENT: usize = 2;

/// Sandwiches `content` between `headers` and `footers`.
///
/// All three are ordinary providers; headers and footers that mutate
/// (collapsing banners, loading rows) publish events like anything else
/// and the flat window follows.
pub struct HeaderFooterWrapper {
    composite: Rc<CompositeProvider>,
    headers: Rc<dyn ListProvider>,
    content: Rc<dyn ListProvider>,
    footers: Rc<dyn ListProvider>,
}

impl HeaderFooterWrapper {
    pub fn new(
        headers: Rc<dyn ListProvider>,
        content: Rc<dyn ListProvider>,
        footers: Rc<dyn ListProvider>,
    ) -> Rc<HeaderFooterWrapper> {
        let composite = CompositeProvider::new();
        composite.add_provider(headers.clone());
        composite.add_provider(content.clone());
        composite.add_provider(footers.clone());
        Rc::new(HeaderFooterWrapper {
            composite,
            headers,
            content,
            footers,
        })
    }

    pub fn header_count(&self) -> usize {
        self.headers.item_count()
    }

    pub fn footer_count(&self) -> usize {
        self.footers.item_count()
    }

    pub fn content(&self) -> &Rc<dyn ListProvider> {
        &self.content
    }

    /// Maps a content-local position to the flat window.
    pub fn content_position(&self, position: usize) -> usize {
        self.header_count() + position
    }
}

impl ListProvider for HeaderFooterWrapper {
    fn item_count(&self) -> usize {
        self.composite.item_count()
    }

    fn item_id(&self, position: usize) -> Option<ItemId> {
        self.composite.item_id(position)
    }

    fn view_type(&self, position: usize) -> ViewType {
        self.composite.view_type(position)
    }

    fn bind(&self, position: usize, payloads: &[Payload]) -> Rendered {
        self.composite.bind(position, payloads)
    }

    fn hub(&self) -> &ChangeHub {
        self.composite.hub()
    }

    fn release(&self) {
        self.composite.release();
    }

    fn unwrap_position(&self, path: &mut ResolvePath, position: usize) -> usize {
        self.composite.unwrap_position(path, position)
    }

    fn wrap_position(&self, segment: &PathSegment, local_position: usize) -> Option<usize> {
        self.composite.wrap_position(segment, local_position)
    }

    impl_wrapper_provider!();
}

impl WrapperProvider for HeaderFooterWrapper {
    fn wrapped(&self) -> Rc<dyn ListProvider> {
        self.content.clone()
    }
}
