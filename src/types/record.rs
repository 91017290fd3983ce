//! Metadata records stored in the registry.

use bitflags::bitflags;
use smallvec::SmallVec;

use super::id::{Tag, TypeId, stable_hash};

pub type TagList = SmallVec<[Tag; 2]>;

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct EntryFlags: u8 {
        /// Layout derived from the real type; the entry cannot be renamed or erased.
        const AGGREGATE = 0b0001;
        /// `Vec<T>` / `Vec<Vec<T>>` companion registered alongside `T`.
        const SEQUENCE = 0b0010;
        /// Opaque pointer/size/id payload that is never constructed in place.
        const FALLBACK = 0b0100;
    }
}

/// One member of a structured type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub id: TypeId,
    /// Byte offset from the start of the owning value.
    pub offset: usize,
    pub tags: TagList,
}

impl Field {
    pub fn new(name: impl Into<String>, id: TypeId, offset: usize) -> Self {
        Self {
            name: name.into(),
            id,
            offset,
            tags: TagList::new(),
        }
    }

    pub fn with_tags(mut self, tags: impl IntoIterator<Item = Tag>) -> Self {
        self.tags.extend(tags);
        self
    }

    pub fn has_tag(&self, tag: Tag) -> bool {
        self.tags.contains(&tag)
    }

    pub(crate) fn name_hash(&self) -> u64 {
        stable_hash(&self.name)
    }
}

/// Registered layout of a single type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeEntry {
    pub name: String,
    pub size: usize,
    pub align: usize,
    pub flags: EntryFlags,
    /// Equals the entry's own id for types that do not derive from another.
    pub base_type: TypeId,
    pub fields: Vec<Field>,
    pub tags: TagList,
}

impl TypeEntry {
    pub fn leaf(id: TypeId, name: impl Into<String>, size: usize, align: usize) -> Self {
        Self {
            name: name.into(),
            size,
            align: align.max(1),
            flags: EntryFlags::empty(),
            base_type: id,
            fields: Vec::new(),
            tags: TagList::new(),
        }
    }

    pub fn with_flags(mut self, flags: EntryFlags) -> Self {
        self.flags |= flags;
        self
    }

    pub fn is_aggregate(&self) -> bool {
        self.flags.contains(EntryFlags::AGGREGATE)
    }

    /// Leaf entries have no field list and resolve through the known-type table or raw delivery.
    pub fn is_leaf(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field(&self, index: usize) -> Option<&Field> {
        self.fields.get(index)
    }

    pub fn field_by_name(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn has_tag(&self, tag: Tag) -> bool {
        self.tags.contains(&tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::id::obtain_id;

    #[test]
    fn leaf_entries_point_at_themselves() {
        let id = obtain_id("u32");
        let entry = TypeEntry::leaf(id, "u32", 4, 4);
        assert_eq!(entry.base_type, id, "non-derived entries use their own id as base");
        assert!(entry.is_leaf(), "entries without fields are leaves");
        assert!(!entry.is_aggregate());
    }

    #[test]
    fn zero_alignment_is_clamped() {
        let entry = TypeEntry::leaf(obtain_id("blob"), "blob", 3, 0);
        assert_eq!(entry.align, 1, "alignment must never be zero");
    }

    #[test]
    fn field_lookup_by_name_and_tag() {
        let hidden = Tag::named("hidden");
        let mut entry = TypeEntry::leaf(obtain_id("Pair"), "Pair", 8, 4);
        entry.fields.push(Field::new("left", obtain_id("u32"), 0));
        entry
            .fields
            .push(Field::new("right", obtain_id("u32"), 4).with_tags([hidden]));
        let right = entry.field_by_name("right").expect("right field");
        assert_eq!(right.offset, 4);
        assert!(right.has_tag(hidden), "tags should be attached to the field");
        assert!(entry.field_by_name("middle").is_none());
    }
}
