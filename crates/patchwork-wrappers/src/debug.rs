//! Verification layer for provider stacks.
//!
//! Wraps any provider and cross-checks the traffic through it: every
//! child event against the window it describes, plus on-demand sweeps
//! over identities and position round trips. Violations panic with the
//! label of the offending wrapper, so a broken stack names itself.

use std::cell::Cell;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use patchwork_core::{ListEvent, ListProvider, Remap, ResolvePath, WrapStrategy, Wrapper};

pub type DebugWrapper = Wrapper<DebugStrategy>;

/// Which per-event checks the wrapper performs. All on by default.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DebugFlags {
    /// Check every child event against the child's item count.
    pub check_events: bool,
    /// Log every child event at debug level.
    pub log_events: bool,
}

impl Default for DebugFlags {
    fn default() -> DebugFlags {
        DebugFlags {
            check_events: true,
            log_events: true,
        }
    }
}

/// Wraps `child` with all checks enabled.
pub fn debug(label: &str, child: Rc<dyn ListProvider>) -> Rc<DebugWrapper> {
    Wrapper::new(
        child,
        DebugStrategy {
            label: label.to_string(),
            flags: Cell::new(DebugFlags::default()),
        },
    )
}

pub struct DebugStrategy {
    label: String,
    flags: Cell<DebugFlags>,
}

impl DebugStrategy {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn flags(&self) -> DebugFlags {
        self.flags.get()
    }

    pub fn set_flags(&self, flags: DebugFlags) {
        self.flags.set(flags);
    }

    fn check_span(&self, child: &dyn ListProvider, event: &ListEvent) {
        let count = child.item_count();
        let ok = match *event {
            ListEvent::Changed {
                start,
                count: span,
                ..
            } => start + span <= count,
            ListEvent::Inserted { start, count: span } => start + span <= count,
            // Removal positions refer to the layout before it shrank.
            ListEvent::Removed { start, .. } => start <= count,
            ListEvent::Moved {
                from,
                to,
                count: span,
            } => from + span <= count && to + span <= count,
            ListEvent::Refreshed => true,
        };
        if !ok {
            panic!(
                "[{}] child event describes positions outside the child.\n event={:?},\n item_count={}",
                self.label, event, count
            );
        }
    }
}

impl WrapStrategy for DebugStrategy {
    fn remap(&self, child: &dyn ListProvider, event: &ListEvent) -> Remap {
        let flags = self.flags.get();
        if flags.log_events {
            log::debug!("[{}] {:?}", self.label, event);
        }
        if flags.check_events {
            self.check_span(child, event);
        }
        Remap::Forward(event.clone())
    }
}

/// Sweeps that run on demand rather than per event.
pub trait DebugControl {
    /// Walks every position and panics on a duplicated stable identity.
    /// Items without one are skipped.
    fn verify_identities(&self);

    /// Resolves every position down the stack and folds it back up,
    /// panicking on any position the stack fails to round-trip.
    fn verify_positions(&self);
}

impl DebugControl for DebugWrapper {
    fn verify_identities(&self) {
        let label = self.strategy().label();
        let mut seen: FxHashMap<u64, usize> = FxHashMap::default();
        for position in 0..self.item_count() {
            let id = match self.item_id(position) {
                Some(id) => id,
                None => continue,
            };
            if let Some(&previous) = seen.get(&id.raw()) {
                panic!(
                    "[{}] two positions share one stable identity.\n id={:?},\n first={},\n second={}",
                    label, id, previous, position
                );
            }
            seen.insert(id.raw(), position);
        }
    }

    fn verify_positions(&self) {
        let label = self.strategy().label();
        for position in 0..self.item_count() {
            let (path, local) = ResolvePath::resolve(self, position);
            let back = path.wrap_back(self, local);
            if back != Some(position) {
                panic!(
                    "[{}] the stack does not round-trip its own position.\n position={},\n local={},\n wrapped={:?},\n depth={}",
                    label,
                    position,
                    local,
                    back,
                    path.depth()
                );
            }
        }
    }
}
