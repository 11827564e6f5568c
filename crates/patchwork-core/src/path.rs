//! Root-to-leaf resolution paths.
//!
//! [`super::provider::ListProvider::unwrap_position`] walks a composition
//! down to the provider that owns a flat position, recording one
//! [`PathSegment`] per level. [`ResolvePath::wrap_back`] folds the same
//! path in reverse to recover the outer position later, reporting `None`
//! instead of a position once the path has gone stale.

use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::provider::ListProvider;

/// One level of a resolution: which child was entered, and under which
/// segment index it sat at that moment.
#[derive(Clone)]
pub struct PathSegment {
    provider: Rc<dyn ListProvider>,
    segment: usize,
}

impl PathSegment {
    pub fn new(provider: Rc<dyn ListProvider>, segment: usize) -> PathSegment {
        PathSegment { provider, segment }
    }

    pub fn provider(&self) -> &Rc<dyn ListProvider> {
        &self.provider
    }

    pub fn segment(&self) -> usize {
        self.segment
    }
}

impl fmt::Debug for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PathSegment {{ provider: {:p}, segment: {} }}",
            Rc::as_ptr(&self.provider),
            self.segment
        )
    }
}

/// Inline path storage. Compositions run a handful of levels deep in
/// practice; deeper paths spill to the heap.
pub type PathVec = SmallVec<[PathSegment; 4]>;

/// Ordered segments from the root's first hop down to the owning leaf.
///
/// An empty path means the root itself owned the position.
#[derive(Clone, Debug, Default)]
pub struct ResolvePath {
    segments: PathVec,
}

impl ResolvePath {
    pub fn new() -> ResolvePath {
        ResolvePath {
            segments: SmallVec::new(),
        }
    }

    /// Resolves `position` against `root` in one call, returning the path
    /// and the position local to the owning provider.
    pub fn resolve(root: &dyn ListProvider, position: usize) -> (ResolvePath, usize) {
        let mut path = ResolvePath::new();
        let local = root.unwrap_position(&mut path, position);
        (path, local)
    }

    pub fn append(&mut self, segment: PathSegment) {
        self.segments.push(segment);
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// The last hop of the walk; its provider owns the resolved position.
    pub fn leaf(&self) -> Option<&PathSegment> {
        self.segments.last()
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn clear(&mut self) {
        self.segments.clear();
    }

    /// Folds the path leaf-to-root: at every level the parent maps the
    /// child-local position outward. Any level may report the position gone
    /// (the child was removed, the item filtered out, the composition
    /// released), which makes the whole fold `None`.
    pub fn wrap_back(&self, root: &dyn ListProvider, leaf_position: usize) -> Option<usize> {
        let mut position = leaf_position;
        for index in (0..self.segments.len()).rev() {
            let parent: &dyn ListProvider = if index == 0 {
                root
            } else {
                self.segments[index - 1].provider().as_ref()
            };
            position = parent.wrap_position(&self.segments[index], position)?;
        }
        Some(position)
    }
}
