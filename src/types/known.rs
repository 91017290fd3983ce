//! Known-type dispatch table: leaf types delivered to visitors as typed values.
//!
//! The table is an ordered list of descriptors indexed by [`TypeId`]. Each descriptor
//! carries the type-erased accessors needed to turn a field address into a typed
//! reference, and to construct or drop a value in place.

use std::any::Any;
use std::mem;

use ahash::AHashMap;

use super::id::TypeId;
use super::name::{id_of, type_name};
use super::raw::{self, ConstructFn, DestructFn, EraseFn, EraseMutFn};
use super::record::EntryFlags;

/// Opaque mutable payload: address, byte size and registered id of the pointee.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(C)]
pub struct PtrPair {
    pub size: u64,
    pub ptr: *mut u8,
    pub id: TypeId,
}

impl Default for PtrPair {
    fn default() -> Self {
        Self {
            size: 0,
            ptr: std::ptr::null_mut(),
            id: TypeId::INVALID,
        }
    }
}

/// Read-only counterpart of [`PtrPair`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(C)]
pub struct ConstPtrPair {
    pub size: u64,
    pub ptr: *const u8,
    pub id: TypeId,
}

impl Default for ConstPtrPair {
    fn default() -> Self {
        Self {
            size: 0,
            ptr: std::ptr::null(),
            id: TypeId::INVALID,
        }
    }
}

/// How many levels of `Vec` companions [`KnownTypes::insert`] adds for each type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SequenceDepth {
    None,
    Single,
    #[default]
    Nested,
}

#[derive(Clone, Copy, Debug)]
pub struct KnownType {
    id: TypeId,
    name: &'static str,
    size: usize,
    align: usize,
    rust_type: std::any::TypeId,
    flags: EntryFlags,
    erase: EraseFn,
    erase_mut: EraseMutFn,
    construct: ConstructFn,
    destruct: DestructFn,
}

impl KnownType {
    pub fn of<T: Any + Default>() -> Self {
        Self {
            id: id_of::<T>(),
            name: type_name::<T>(),
            size: mem::size_of::<T>(),
            align: mem::align_of::<T>(),
            rust_type: std::any::TypeId::of::<T>(),
            flags: EntryFlags::empty(),
            erase: raw::erase::<T>,
            erase_mut: raw::erase_mut::<T>,
            construct: raw::write_default::<T>,
            destruct: raw::drop_value::<T>,
        }
    }

    /// Descriptor for `*mut T`; construction writes a null pointer.
    pub fn pointer<T: Any>() -> Self {
        Self {
            id: id_of::<*mut T>(),
            name: type_name::<*mut T>(),
            size: mem::size_of::<*mut T>(),
            align: mem::align_of::<*mut T>(),
            rust_type: std::any::TypeId::of::<*mut T>(),
            flags: EntryFlags::empty(),
            erase: raw::erase::<*mut T>,
            erase_mut: raw::erase_mut::<*mut T>,
            construct: raw::write_null_mut::<T>,
            destruct: raw::drop_value::<*mut T>,
        }
    }

    /// Descriptor for `*const T`.
    pub fn const_pointer<T: Any>() -> Self {
        Self {
            id: id_of::<*const T>(),
            name: type_name::<*const T>(),
            size: mem::size_of::<*const T>(),
            align: mem::align_of::<*const T>(),
            rust_type: std::any::TypeId::of::<*const T>(),
            flags: EntryFlags::empty(),
            erase: raw::erase::<*const T>,
            erase_mut: raw::erase_mut::<*const T>,
            construct: raw::write_null::<T>,
            destruct: raw::drop_value::<*const T>,
        }
    }

    pub fn with_flags(mut self, flags: EntryFlags) -> Self {
        self.flags |= flags;
        self
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn align(&self) -> usize {
        self.align
    }

    pub fn flags(&self) -> EntryFlags {
        self.flags
    }

    /// Fallback payloads carry no constructible value and are skipped by construct/destruct.
    pub fn is_fallback(&self) -> bool {
        self.flags.contains(EntryFlags::FALLBACK)
    }

    pub fn is<T: Any>(&self) -> bool {
        self.rust_type == std::any::TypeId::of::<T>()
    }

    pub(crate) fn erase(&self, ptr: *const u8) -> *const dyn Any {
        (self.erase)(ptr)
    }

    pub(crate) fn erase_mut(&self, ptr: *mut u8) -> *mut dyn Any {
        (self.erase_mut)(ptr)
    }

    /// # Safety
    /// `ptr` must be valid for writes of this type, aligned and currently uninitialized.
    pub(crate) unsafe fn construct_at(&self, ptr: *mut u8) {
        unsafe { (self.construct)(ptr) }
    }

    /// # Safety
    /// `ptr` must hold an initialized value of this type that is not used afterwards.
    pub(crate) unsafe fn destruct_at(&self, ptr: *mut u8) {
        unsafe { (self.destruct)(ptr) }
    }
}

#[derive(Clone, Debug, Default)]
pub struct KnownTypes {
    entries: Vec<KnownType>,
    index: AHashMap<TypeId, usize>,
    sequences: SequenceDepth,
}

impl KnownTypes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sequences(sequences: SequenceDepth) -> Self {
        Self {
            sequences,
            ..Self::default()
        }
    }

    /// Integers, floats, `bool`, `char`, strings, raw pointers to the primitives and the
    /// fallback pairs, each with `Vec` companions.
    pub fn standard() -> Self {
        Self::standard_with(SequenceDepth::default())
    }

    pub fn standard_with(sequences: SequenceDepth) -> Self {
        let mut known = Self::with_sequences(sequences);
        known
            .insert::<i8>()
            .insert::<i16>()
            .insert::<i32>()
            .insert::<i64>()
            .insert::<i128>()
            .insert::<isize>()
            .insert::<u8>()
            .insert::<u16>()
            .insert::<u32>()
            .insert::<u64>()
            .insert::<u128>()
            .insert::<usize>()
            .insert::<f32>()
            .insert::<f64>()
            .insert::<bool>()
            .insert::<char>()
            .insert::<String>()
            .insert::<&'static str>();
        known
            .insert_pointer::<()>()
            .insert_pointer::<i8>()
            .insert_pointer::<i16>()
            .insert_pointer::<i32>()
            .insert_pointer::<i64>()
            .insert_pointer::<u8>()
            .insert_pointer::<u16>()
            .insert_pointer::<u32>()
            .insert_pointer::<u64>()
            .insert_pointer::<usize>()
            .insert_pointer::<f32>()
            .insert_pointer::<f64>()
            .insert_pointer::<String>();
        known.push(KnownType::of::<PtrPair>().with_flags(EntryFlags::FALLBACK));
        known.push(KnownType::of::<ConstPtrPair>().with_flags(EntryFlags::FALLBACK));
        known
    }

    /// Adds `T` plus its `Vec` companions according to the configured depth.
    pub fn insert<T: Any + Default>(&mut self) -> &mut Self {
        self.push(KnownType::of::<T>());
        self.push_sequences::<T>();
        self
    }

    /// Adds `*mut T` and `*const T`, plus `Vec` companions of `*mut T`.
    pub fn insert_pointer<T: Any>(&mut self) -> &mut Self {
        self.push(KnownType::pointer::<T>());
        self.push(KnownType::const_pointer::<T>());
        self.push_sequences::<*mut T>();
        self
    }

    /// Appends a descriptor; the first descriptor registered for an id wins.
    pub fn push(&mut self, known: KnownType) -> bool {
        if self.index.contains_key(&known.id) {
            return false;
        }
        self.index.insert(known.id, self.entries.len());
        self.entries.push(known);
        true
    }

    fn push_sequences<T: Any>(&mut self) {
        match self.sequences {
            SequenceDepth::None => {}
            SequenceDepth::Single => {
                self.push(KnownType::of::<Vec<T>>().with_flags(EntryFlags::SEQUENCE));
            }
            SequenceDepth::Nested => {
                self.push(KnownType::of::<Vec<T>>().with_flags(EntryFlags::SEQUENCE));
                self.push(KnownType::of::<Vec<Vec<T>>>().with_flags(EntryFlags::SEQUENCE));
            }
        }
    }

    pub fn get(&self, id: TypeId) -> Option<&KnownType> {
        self.index.get(&id).map(|&slot| &self.entries[slot])
    }

    pub fn contains(&self, id: TypeId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn sequences(&self) -> SequenceDepth {
        self.sequences
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Descriptors in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &KnownType> {
        self.entries.iter()
    }
}
