//! Bit packing for 64-bit stable item identities.
//!
//! A composed list presents one flat sequence assembled from many child
//! providers, so a child's locally-unique id is not globally unique on its
//! own. The packing here stamps every id with the segment it came through,
//! and, for two-level data, with the group/child split, so identity survives
//! composition without any per-item allocation or side table.

use std::fmt;

/// Opaque 64-bit stable identity of one visible item.
///
/// Bit layout, most significant first:
///
/// ```text
/// | reserved (1) | segment (16) | group id (32, signed) | child id (15) |
/// ```
///
/// The reserved top bit is always zero so a raw id stays non-negative when a
/// caller stores it as `i64`. A child field of all ones marks a group
/// header; real child ids stop one short of the marker, which is why the
/// child domain is unsigned. Flat providers that are not two-level pack one
/// "direct" id into the combined group+child area instead; the two-level
/// accessors are only meaningful for ids built through [`ItemId::group`] and
/// [`ItemId::child`].
///
/// "No id" is always `Option::<ItemId>::None` at the API surface. No
/// sentinel value exists inside the type.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ItemId(u64);

impl ItemId {
    pub const BIT_WIDTH_RESERVED: u32 = 1;
    pub const BIT_WIDTH_SEGMENT: u32 = 16;
    pub const BIT_WIDTH_GROUP_ID: u32 = 32;
    pub const BIT_WIDTH_CHILD_ID: u32 = 15;

    pub const BIT_OFFSET_CHILD_ID: u32 = 0;
    pub const BIT_OFFSET_GROUP_ID: u32 = Self::BIT_WIDTH_CHILD_ID;
    pub const BIT_OFFSET_SEGMENT: u32 = Self::BIT_OFFSET_GROUP_ID + Self::BIT_WIDTH_GROUP_ID;

    pub const MASK_CHILD_ID: u64 = (1 << Self::BIT_WIDTH_CHILD_ID) - 1;
    pub const MASK_GROUP_ID: u64 =
        ((1 << Self::BIT_WIDTH_GROUP_ID) - 1) << Self::BIT_OFFSET_GROUP_ID;
    pub const MASK_SEGMENT: u64 = ((1 << Self::BIT_WIDTH_SEGMENT) - 1) << Self::BIT_OFFSET_SEGMENT;

    pub const MAX_SEGMENT: u32 = (1 << Self::BIT_WIDTH_SEGMENT) - 1;
    pub const MIN_GROUP_ID: i64 = -(1 << (Self::BIT_WIDTH_GROUP_ID - 1));
    pub const MAX_GROUP_ID: i64 = (1 << (Self::BIT_WIDTH_GROUP_ID - 1)) - 1;
    pub const MIN_CHILD_ID: i64 = 0;
    pub const MAX_CHILD_ID: i64 = (1 << Self::BIT_WIDTH_CHILD_ID) - 2;
    pub const MIN_DIRECT_ID: i64 =
        -(1 << (Self::BIT_WIDTH_GROUP_ID + Self::BIT_WIDTH_CHILD_ID - 1));
    pub const MAX_DIRECT_ID: i64 =
        (1 << (Self::BIT_WIDTH_GROUP_ID + Self::BIT_WIDTH_CHILD_ID - 1)) - 1;

    /// All ones in the child field: this identity is a group header.
    const GROUP_MARKER: u64 = Self::MASK_CHILD_ID;

    /// Packs a group-header identity. The child field carries the marker.
    pub fn group(group_id: i64) -> ItemId {
        Self::check_group_id(group_id);
        ItemId(Self::pack_group(group_id) | Self::GROUP_MARKER)
    }

    /// Packs a child identity under `group_id`.
    pub fn child(group_id: i64, child_id: i64) -> ItemId {
        Self::check_group_id(group_id);
        if !(Self::MIN_CHILD_ID..=Self::MAX_CHILD_ID).contains(&child_id) {
            panic!(
                "child id out of range.\n child_id={},\n allowed={}..={}",
                child_id,
                Self::MIN_CHILD_ID,
                Self::MAX_CHILD_ID
            );
        }
        ItemId(Self::pack_group(group_id) | (child_id as u64))
    }

    /// Packs a flat provider's raw stable id. The id spans the combined
    /// group+child area, so flat and two-level providers share one id space
    /// per segment.
    pub fn direct(raw_id: i64) -> ItemId {
        if !(Self::MIN_DIRECT_ID..=Self::MAX_DIRECT_ID).contains(&raw_id) {
            panic!(
                "direct id out of range.\n raw_id={},\n allowed={}..={}",
                raw_id,
                Self::MIN_DIRECT_ID,
                Self::MAX_DIRECT_ID
            );
        }
        ItemId((raw_id as u64) & (Self::MASK_GROUP_ID | Self::MASK_CHILD_ID))
    }

    /// Reinterprets a raw value previously obtained from [`ItemId::raw`].
    pub fn from_raw(raw: u64) -> ItemId {
        if raw & !(Self::MASK_SEGMENT | Self::MASK_GROUP_ID | Self::MASK_CHILD_ID) != 0 {
            panic!(
                "raw id has the reserved bit set.\n raw={:#018x}",
                raw
            );
        }
        ItemId(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }

    pub fn is_group(self) -> bool {
        self.0 & Self::MASK_CHILD_ID == Self::GROUP_MARKER
    }

    /// Sign-extended group field. Meaningful for ids built through the
    /// two-level constructors.
    pub fn group_id(self) -> i64 {
        sign_extend(
            (self.0 & Self::MASK_GROUP_ID) >> Self::BIT_OFFSET_GROUP_ID,
            Self::BIT_WIDTH_GROUP_ID,
        )
    }

    /// Child field, or `None` when the identity is a group header and does
    /// not carry one.
    pub fn child_id(self) -> Option<i64> {
        if self.is_group() {
            return None;
        }
        Some((self.0 & Self::MASK_CHILD_ID) as i64)
    }

    /// Sign-extended combined group+child area. Meaningful for ids built
    /// through [`ItemId::direct`].
    pub fn direct_id(self) -> i64 {
        sign_extend(
            self.0 & (Self::MASK_GROUP_ID | Self::MASK_CHILD_ID),
            Self::BIT_WIDTH_GROUP_ID + Self::BIT_WIDTH_CHILD_ID,
        )
    }

    pub fn segment(self) -> u32 {
        ((self.0 & Self::MASK_SEGMENT) >> Self::BIT_OFFSET_SEGMENT) as u32
    }

    /// Returns the identity re-tagged with `segment`. A previous tag is
    /// replaced; in a nested composition the outermost level wins.
    pub fn with_segment(self, segment: u32) -> ItemId {
        if segment > Self::MAX_SEGMENT {
            panic!(
                "segment out of range.\n segment={},\n allowed=0..={}",
                segment,
                Self::MAX_SEGMENT
            );
        }
        ItemId((self.0 & !Self::MASK_SEGMENT) | ((segment as u64) << Self::BIT_OFFSET_SEGMENT))
    }

    fn pack_group(group_id: i64) -> u64 {
        ((group_id as u64) << Self::BIT_OFFSET_GROUP_ID) & Self::MASK_GROUP_ID
    }

    fn check_group_id(group_id: i64) {
        if !(Self::MIN_GROUP_ID..=Self::MAX_GROUP_ID).contains(&group_id) {
            panic!(
                "group id out of range.\n group_id={},\n allowed={}..={}",
                group_id,
                Self::MIN_GROUP_ID,
                Self::MAX_GROUP_ID
            );
        }
    }
}

impl fmt::Debug for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ItemId({:#018x})", self.0)
    }
}

fn sign_extend(bits: u64, width: u32) -> i64 {
    let shift = 64 - width;
    ((bits << shift) as i64) >> shift
}
