//! Testing utilities for provider compositions.

pub mod items;
pub mod recording;

pub use items::TestItems;
pub use recording::{assert_labels, ids_of, labels_of, RecordingObserver};

pub mod prelude {
    pub use crate::items::TestItems;
    pub use crate::recording::{assert_labels, ids_of, labels_of, RecordingObserver};
}
