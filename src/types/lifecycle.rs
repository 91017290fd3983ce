//! Placement construction and destruction of registered values, field by field.
//!
//! Both run a resolving pass first so an unregistered field type fails the call before
//! any slot is written. Raw fields and fallback pair types are skipped: they carry no
//! constructible payload.

use super::context::Context;
use super::error::RegistryResult;
use super::id::TypeId;
use super::value::FieldMut;
use super::visitor::Each;
use super::walker::{VisitOptions, visit_mut_with};

/// Nesting budget used by [`construct`] and [`destruct`].
pub const LIFECYCLE_DEPTH: usize = 32;

/// Default-constructs every known field of the value of type `id` at `data`.
///
/// # Safety
/// `data` must be writable storage laid out as registered for `id`. Known fields are
/// overwritten without dropping previous contents.
pub unsafe fn construct(ctx: &Context, data: *mut u8, id: TypeId) -> RegistryResult<()> {
    unsafe { construct_with(ctx, data, id, VisitOptions::nested(LIFECYCLE_DEPTH)) }
}

/// # Safety
/// Same contract as [`construct`].
pub unsafe fn construct_with(ctx: &Context, data: *mut u8, id: TypeId, options: VisitOptions) -> RegistryResult<()> {
    unsafe { resolve(ctx, data, id, options)? };
    log::trace!("constructing {id} at {data:p}");
    unsafe {
        visit_mut_with(
            ctx,
            data,
            id,
            options,
            Each(|field: FieldMut<'_>| {
                if let FieldMut::Known(known) = field {
                    if !known.known().is_fallback() {
                        known.construct();
                    }
                }
            }),
        )
    }
}

/// Drops every known field of the value of type `id` at `data` in place.
///
/// # Safety
/// Every known field reached must hold an initialized value; the storage is
/// uninitialized afterwards.
pub unsafe fn destruct(ctx: &Context, data: *mut u8, id: TypeId) -> RegistryResult<()> {
    unsafe { destruct_with(ctx, data, id, VisitOptions::nested(LIFECYCLE_DEPTH)) }
}

/// # Safety
/// Same contract as [`destruct`].
pub unsafe fn destruct_with(ctx: &Context, data: *mut u8, id: TypeId, options: VisitOptions) -> RegistryResult<()> {
    unsafe { resolve(ctx, data, id, options)? };
    log::trace!("destructing {id} at {data:p}");
    unsafe {
        visit_mut_with(
            ctx,
            data,
            id,
            options,
            Each(|field: FieldMut<'_>| {
                if let FieldMut::Known(known) = field {
                    if !known.known().is_fallback() {
                        known.destruct();
                    }
                }
            }),
        )
    }
}

/// Walks without touching memory so failures surface before the first write.
unsafe fn resolve(ctx: &Context, data: *mut u8, id: TypeId, options: VisitOptions) -> RegistryResult<()> {
    unsafe { visit_mut_with(ctx, data, id, options, Each(|_: FieldMut<'_>| {})) }
}
