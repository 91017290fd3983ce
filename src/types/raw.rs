//! The only place where raw addresses become typed pointers or references.
//!
//! Everything else in the crate moves `*const u8` / `*mut u8` around and calls into
//! these helpers once it knows which concrete type an address holds.

use std::any::Any;
use std::ptr;

/// Address-to-trait-object conversion for a known `T`, stored in the dispatch table.
pub(crate) type EraseFn = fn(*const u8) -> *const dyn Any;
pub(crate) type EraseMutFn = fn(*mut u8) -> *mut dyn Any;
/// Writes a fresh value at an uninitialized address.
pub(crate) type ConstructFn = unsafe fn(*mut u8);
/// Drops the value at an initialized address in place.
pub(crate) type DestructFn = unsafe fn(*mut u8);

pub(crate) fn erase<T: Any>(ptr: *const u8) -> *const dyn Any {
    ptr.cast::<T>() as *const dyn Any
}

pub(crate) fn erase_mut<T: Any>(ptr: *mut u8) -> *mut dyn Any {
    ptr.cast::<T>() as *mut dyn Any
}

pub(crate) fn is_aligned(ptr: *const u8, align: usize) -> bool {
    align <= 1 || (ptr as usize) % align == 0
}

/// # Safety
/// `erased` must point at a live, aligned value that outlives `'m` and is not mutated meanwhile.
pub(crate) unsafe fn deref<'m>(erased: *const dyn Any) -> &'m dyn Any {
    unsafe { &*erased }
}

/// # Safety
/// `erased` must point at a live, aligned value that outlives `'m` with no other live reference.
pub(crate) unsafe fn deref_mut<'m>(erased: *mut dyn Any) -> &'m mut dyn Any {
    unsafe { &mut *erased }
}

/// # Safety
/// `ptr` must be valid for writes of `T` and aligned; any previous value is overwritten without drop.
pub(crate) unsafe fn write_default<T: Default>(ptr: *mut u8) {
    unsafe { ptr.cast::<T>().write(T::default()) }
}

/// # Safety
/// Same contract as [`write_default`], for raw pointer slots that have no `Default`.
pub(crate) unsafe fn write_null_mut<T>(ptr: *mut u8) {
    unsafe { ptr.cast::<*mut T>().write(ptr::null_mut()) }
}

/// # Safety
/// Same contract as [`write_default`].
pub(crate) unsafe fn write_null<T>(ptr: *mut u8) {
    unsafe { ptr.cast::<*const T>().write(ptr::null()) }
}

/// # Safety
/// `ptr` must hold an initialized, aligned `T` that is not used again after this call.
pub(crate) unsafe fn drop_value<T>(ptr: *mut u8) {
    unsafe { ptr::drop_in_place(ptr.cast::<T>()) }
}
