//! Bit packing for 32-bit view type tags.
//!
//! View types drive recycling pools, so two children that both report view
//! type `0` must still end up with distinct tags once composed. The segment
//! stamp here keeps the pools apart; the expandable flag lets a binder tell
//! group headers from ordinary rows without consulting the identity at all.

use std::fmt;

use crate::item_id::ItemId;

/// Opaque 32-bit view type of one visible item.
///
/// Bit layout, most significant first:
///
/// ```text
/// | expandable flag (1) | segment (16) | wrapped view type (15, signed) |
/// ```
///
/// The segment width matches [`ItemId`]'s segment width so the two packings
/// describe the same composition tree.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewType(u32);

impl ViewType {
    pub const BIT_WIDTH_EXPANDABLE_FLAG: u32 = 1;
    pub const BIT_WIDTH_SEGMENT: u32 = 16;
    pub const BIT_WIDTH_WRAPPED: u32 = 15;

    pub const BIT_OFFSET_WRAPPED: u32 = 0;
    pub const BIT_OFFSET_SEGMENT: u32 = Self::BIT_WIDTH_WRAPPED;
    pub const BIT_OFFSET_EXPANDABLE_FLAG: u32 = Self::BIT_OFFSET_SEGMENT + Self::BIT_WIDTH_SEGMENT;

    pub const MASK_WRAPPED: u32 = (1 << Self::BIT_WIDTH_WRAPPED) - 1;
    pub const MASK_SEGMENT: u32 = ((1 << Self::BIT_WIDTH_SEGMENT) - 1) << Self::BIT_OFFSET_SEGMENT;
    pub const MASK_EXPANDABLE_FLAG: u32 = 1 << Self::BIT_OFFSET_EXPANDABLE_FLAG;

    pub const MAX_SEGMENT: u32 = (1 << Self::BIT_WIDTH_SEGMENT) - 1;
    pub const MIN_WRAPPED: i32 = -(1 << (Self::BIT_WIDTH_WRAPPED - 1));
    pub const MAX_WRAPPED: i32 = (1 << (Self::BIT_WIDTH_WRAPPED - 1)) - 1;

    /// Packs a provider-local view type.
    pub fn new(wrapped: i32) -> ViewType {
        Self::check_wrapped(wrapped);
        ViewType((wrapped as u32) & Self::MASK_WRAPPED)
    }

    /// Packs a provider-local view type for an expandable group header.
    pub fn expandable_group(wrapped: i32) -> ViewType {
        Self::check_wrapped(wrapped);
        ViewType(((wrapped as u32) & Self::MASK_WRAPPED) | Self::MASK_EXPANDABLE_FLAG)
    }

    /// Reinterprets a raw value previously obtained from [`ViewType::raw`].
    pub fn from_raw(raw: u32) -> ViewType {
        ViewType(raw)
    }

    pub fn raw(self) -> u32 {
        self.0
    }

    pub fn is_expandable_group(self) -> bool {
        self.0 & Self::MASK_EXPANDABLE_FLAG != 0
    }

    /// Sign-extended provider-local view type.
    pub fn wrapped(self) -> i32 {
        let shift = 32 - Self::BIT_WIDTH_WRAPPED;
        (((self.0 & Self::MASK_WRAPPED) << shift) as i32) >> shift
    }

    pub fn segment(self) -> u32 {
        (self.0 & Self::MASK_SEGMENT) >> Self::BIT_OFFSET_SEGMENT
    }

    /// Returns the tag re-tagged with `segment`. A previous tag is replaced;
    /// in a nested composition the outermost level wins.
    pub fn with_segment(self, segment: u32) -> ViewType {
        if segment > Self::MAX_SEGMENT {
            panic!(
                "segment out of range.\n segment={},\n allowed=0..={}",
                segment,
                Self::MAX_SEGMENT
            );
        }
        ViewType((self.0 & !Self::MASK_SEGMENT) | (segment << Self::BIT_OFFSET_SEGMENT))
    }

    fn check_wrapped(wrapped: i32) {
        if !(Self::MIN_WRAPPED..=Self::MAX_WRAPPED).contains(&wrapped) {
            panic!(
                "wrapped view type out of range.\n wrapped={},\n allowed={}..={}",
                wrapped,
                Self::MIN_WRAPPED,
                Self::MAX_WRAPPED
            );
        }
    }
}

impl fmt::Debug for ViewType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ViewType({:#010x})", self.0)
    }
}

impl Default for ViewType {
    fn default() -> ViewType {
        ViewType::new(0)
    }
}
