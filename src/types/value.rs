//! Field values handed to visitors.
//!
//! Known leaf types arrive as typed handles that downcast to the concrete Rust type;
//! anything else arrives as a raw address/size/id pair. Handles do not materialize a
//! reference until asked to, so construction can run over uninitialized memory.

use std::any::Any;

use super::id::TypeId;
use super::known::{ConstPtrPair, KnownType, PtrPair};
use super::raw;

/// Shared handle to a value of a known type.
#[derive(Clone, Copy, Debug)]
pub struct KnownRef<'m> {
    ptr: *const u8,
    known: &'m KnownType,
}

impl<'m> KnownRef<'m> {
    /// # Safety
    /// `ptr` must address an initialized value of `known`'s type, valid and unmutated for `'m`.
    pub(crate) unsafe fn new(ptr: *const u8, known: &'m KnownType) -> Self {
        debug_assert!(raw::is_aligned(ptr, known.align()), "misaligned {} at {ptr:p}", known.name());
        Self { ptr, known }
    }

    pub fn known(&self) -> &'m KnownType {
        self.known
    }

    pub fn id(&self) -> TypeId {
        self.known.id()
    }

    pub fn address(&self) -> *const u8 {
        self.ptr
    }

    pub fn as_any(&self) -> &'m dyn Any {
        unsafe { raw::deref(self.known.erase(self.ptr)) }
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&'m T> {
        self.as_any().downcast_ref::<T>()
    }
}

/// Exclusive handle to a value of a known type.
#[derive(Debug)]
pub struct KnownMut<'m> {
    ptr: *mut u8,
    known: &'m KnownType,
}

impl<'m> KnownMut<'m> {
    /// # Safety
    /// `ptr` must address storage for `known`'s type, exclusively accessible for `'m`.
    /// The storage may be uninitialized as long as only [`KnownMut::construct`] touches it.
    pub(crate) unsafe fn new(ptr: *mut u8, known: &'m KnownType) -> Self {
        debug_assert!(raw::is_aligned(ptr, known.align()), "misaligned {} at {ptr:p}", known.name());
        Self { ptr, known }
    }

    pub fn known(&self) -> &'m KnownType {
        self.known
    }

    pub fn id(&self) -> TypeId {
        self.known.id()
    }

    pub fn address(&self) -> *mut u8 {
        self.ptr
    }

    pub fn as_any(&self) -> &dyn Any {
        unsafe { raw::deref(self.known.erase(self.ptr)) }
    }

    pub fn as_any_mut(&mut self) -> &mut dyn Any {
        unsafe { raw::deref_mut(self.known.erase_mut(self.ptr)) }
    }

    pub fn into_any_mut(self) -> &'m mut dyn Any {
        unsafe { raw::deref_mut(self.known.erase_mut(self.ptr)) }
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }

    pub fn into_mut<T: Any>(self) -> Option<&'m mut T> {
        self.into_any_mut().downcast_mut::<T>()
    }

    /// Writes a fresh default value, overwriting whatever bytes are present.
    ///
    /// # Safety
    /// The slot must be uninitialized or hold a value that is allowed to leak.
    pub unsafe fn construct(self) {
        unsafe { self.known.construct_at(self.ptr) }
    }

    /// Drops the value in place; the slot is uninitialized afterwards.
    ///
    /// # Safety
    /// The slot must hold an initialized value that nobody reads again.
    pub unsafe fn destruct(self) {
        unsafe { self.known.destruct_at(self.ptr) }
    }
}

/// Read-only field delivered by [`crate::types::walker::visit`].
#[derive(Clone, Copy, Debug)]
pub enum FieldRef<'m> {
    Known(KnownRef<'m>),
    Raw(ConstPtrPair),
}

impl<'m> FieldRef<'m> {
    pub fn id(&self) -> TypeId {
        match self {
            FieldRef::Known(known) => known.id(),
            FieldRef::Raw(pair) => pair.id,
        }
    }

    pub fn address(&self) -> *const u8 {
        match self {
            FieldRef::Known(known) => known.address(),
            FieldRef::Raw(pair) => pair.ptr,
        }
    }

    pub fn size(&self) -> usize {
        match self {
            FieldRef::Known(known) => known.known().size(),
            FieldRef::Raw(pair) => pair.size as usize,
        }
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, FieldRef::Raw(_))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&'m T> {
        match self {
            FieldRef::Known(known) => known.downcast_ref::<T>(),
            FieldRef::Raw(_) => None,
        }
    }
}

/// Mutable field delivered by [`crate::types::walker::visit_mut`].
#[derive(Debug)]
pub enum FieldMut<'m> {
    Known(KnownMut<'m>),
    Raw(PtrPair),
}

impl<'m> FieldMut<'m> {
    pub fn id(&self) -> TypeId {
        match self {
            FieldMut::Known(known) => known.id(),
            FieldMut::Raw(pair) => pair.id,
        }
    }

    pub fn address(&self) -> *mut u8 {
        match self {
            FieldMut::Known(known) => known.address(),
            FieldMut::Raw(pair) => pair.ptr,
        }
    }

    pub fn size(&self) -> usize {
        match self {
            FieldMut::Known(known) => known.known().size(),
            FieldMut::Raw(pair) => pair.size as usize,
        }
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, FieldMut::Raw(_))
    }

    pub fn downcast_mut<T: Any>(&mut self) -> Option<&mut T> {
        match self {
            FieldMut::Known(known) => known.downcast_mut::<T>(),
            FieldMut::Raw(_) => None,
        }
    }

    pub fn into_mut<T: Any>(self) -> Option<&'m mut T> {
        match self {
            FieldMut::Known(known) => known.into_mut::<T>(),
            FieldMut::Raw(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::known::KnownType;

    #[test]
    fn known_ref_downcasts_only_to_its_type() {
        let known = KnownType::of::<i64>();
        let value = -42i64;
        let field = FieldRef::Known(unsafe { KnownRef::new((&value as *const i64).cast(), &known) });
        assert_eq!(field.downcast_ref::<i64>(), Some(&-42), "typed delivery should expose the value");
        assert!(field.downcast_ref::<u64>().is_none(), "wrong type must not downcast");
        assert_eq!(field.size(), 8);
        assert!(!field.is_raw());
    }

    #[test]
    fn known_mut_writes_through() {
        let known = KnownType::of::<String>();
        let mut value = String::from("abc");
        let field = FieldMut::Known(unsafe { KnownMut::new((&mut value as *mut String).cast(), &known) });
        field.into_mut::<String>().expect("string").push('d');
        assert_eq!(value, "abcd");
    }

    #[test]
    fn raw_fields_never_downcast() {
        let bytes = [0u8; 4];
        let field = FieldRef::Raw(ConstPtrPair {
            size: 4,
            ptr: bytes.as_ptr(),
            id: TypeId::from_raw(9),
        });
        assert!(field.is_raw());
        assert!(field.downcast_ref::<u32>().is_none(), "raw payloads carry no type information");
        assert_eq!(field.id(), TypeId::from_raw(9));
        assert_eq!(field.address(), bytes.as_ptr());
    }
}
