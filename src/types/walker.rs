//! Visitation engine: walks a value's fields by offset and hands each one to a visitor.
//!
//! Leaf types are resolved through the known-type table first and delivered as typed
//! handles; anything else registered is delivered as an address/size/id pair.
//! Structured types walk their registered fields in declaration order, or the bridge
//! layout when the type was registered through `Reflect`.

#[cfg(feature = "layout-bridge")]
use std::mem;

#[cfg(feature = "layout-bridge")]
use super::bridge::{FieldLayout, Reflect};
use super::context::{Context, INVALID_SIZE};
use super::error::{RegistryError, RegistryResult};
use super::id::TypeId;
use super::known::{ConstPtrPair, KnownType, PtrPair};
#[cfg(feature = "layout-bridge")]
use super::name::id_of;
#[cfg(feature = "layout-bridge")]
use super::record::TypeEntry;
use super::value::{FieldMut, FieldRef, KnownMut, KnownRef};
use super::visitor::FieldVisitor;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VisitOptions {
    /// Levels of structured fields to descend into instead of delivering them whole.
    pub depth: usize,
}

impl VisitOptions {
    pub const fn flat() -> Self {
        Self { depth: 0 }
    }

    pub const fn nested(depth: usize) -> Self {
        Self { depth }
    }
}

/// Shared or exclusive view of a base address.
trait Access<'m>: Copy {
    type Value;

    fn offset(self, bytes: usize) -> Self;

    /// # Safety
    /// The address must hold a value of `known`'s type under the walk's contract.
    unsafe fn known(self, known: &'m KnownType) -> Self::Value;

    fn raw(self, size: usize, id: TypeId) -> Self::Value;
}

impl<'m> Access<'m> for *const u8 {
    type Value = FieldRef<'m>;

    fn offset(self, bytes: usize) -> Self {
        self.wrapping_add(bytes)
    }

    unsafe fn known(self, known: &'m KnownType) -> FieldRef<'m> {
        FieldRef::Known(unsafe { KnownRef::new(self, known) })
    }

    fn raw(self, size: usize, id: TypeId) -> FieldRef<'m> {
        FieldRef::Raw(ConstPtrPair {
            size: size as u64,
            ptr: self,
            id,
        })
    }
}

impl<'m> Access<'m> for *mut u8 {
    type Value = FieldMut<'m>;

    fn offset(self, bytes: usize) -> Self {
        self.wrapping_add(bytes)
    }

    unsafe fn known(self, known: &'m KnownType) -> FieldMut<'m> {
        FieldMut::Known(unsafe { KnownMut::new(self, known) })
    }

    fn raw(self, size: usize, id: TypeId) -> FieldMut<'m> {
        FieldMut::Raw(PtrPair {
            size: size as u64,
            ptr: self,
            id,
        })
    }
}

/// Walks the value of type `id` at `data`, delivering each field as a [`FieldRef`].
///
/// # Safety
/// `data` must point at a live value whose layout matches the registered entry for `id`
/// (and, recursively, for every field type reached), readable and unmutated for `'m`.
pub unsafe fn visit<'m, V>(ctx: &'m Context, data: *const u8, id: TypeId, visitor: V) -> RegistryResult<()>
where
    V: FieldVisitor<FieldRef<'m>>,
{
    unsafe { run(ctx, data, id, VisitOptions::flat(), visitor) }
}

/// # Safety
/// Same contract as [`visit`].
pub unsafe fn visit_with<'m, V>(
    ctx: &'m Context,
    data: *const u8,
    id: TypeId,
    options: VisitOptions,
    visitor: V,
) -> RegistryResult<()>
where
    V: FieldVisitor<FieldRef<'m>>,
{
    unsafe { run(ctx, data, id, options, visitor) }
}

/// Exclusive counterpart of [`visit`], delivering [`FieldMut`] handles.
///
/// # Safety
/// `data` must point at storage laid out as registered for `id`, exclusively accessible
/// for `'m`. Fields may be uninitialized as long as the visitor only constructs them.
pub unsafe fn visit_mut<'m, V>(ctx: &'m Context, data: *mut u8, id: TypeId, visitor: V) -> RegistryResult<()>
where
    V: FieldVisitor<FieldMut<'m>>,
{
    unsafe { run(ctx, data, id, VisitOptions::flat(), visitor) }
}

/// # Safety
/// Same contract as [`visit_mut`].
pub unsafe fn visit_mut_with<'m, V>(
    ctx: &'m Context,
    data: *mut u8,
    id: TypeId,
    options: VisitOptions,
    visitor: V,
) -> RegistryResult<()>
where
    V: FieldVisitor<FieldMut<'m>>,
{
    unsafe { run(ctx, data, id, options, visitor) }
}

/// Visits a value whose type was registered through the layout bridge.
///
/// Fields are walked from `T`'s own layout after it has been checked against the
/// registered entry, so the walk never follows a manually declared layout.
#[cfg(feature = "layout-bridge")]
pub fn visit_value<'m, T: Reflect, V>(ctx: &'m Context, value: &'m T, mut visitor: V) -> RegistryResult<()>
where
    V: FieldVisitor<FieldRef<'m>>,
{
    let live = live_layout::<T>(ctx)?;
    unsafe { walk_layout(ctx, (value as *const T).cast::<u8>(), &live, 0, &mut visitor) }
}

#[cfg(feature = "layout-bridge")]
pub fn visit_value_mut<'m, T: Reflect, V>(ctx: &'m Context, value: &'m mut T, mut visitor: V) -> RegistryResult<()>
where
    V: FieldVisitor<FieldMut<'m>>,
{
    let live = live_layout::<T>(ctx)?;
    unsafe { walk_layout(ctx, (value as *mut T).cast::<u8>(), &live, 0, &mut visitor) }
}

/// `T::fields()`, once the registry entry under `T`'s id is known to describe `T` itself.
#[cfg(feature = "layout-bridge")]
fn live_layout<T: Reflect>(ctx: &Context) -> RegistryResult<Vec<FieldLayout>> {
    let id = id_of::<T>();
    let entry = ctx.at(id)?;
    let Some(bridge) = ctx.bridge(id).filter(|_| entry.is_aggregate()) else {
        return Err(RegistryError::invalid_type(
            entry.name.clone(),
            "type was not registered through the layout bridge",
        ));
    };
    if !bridge.is::<T>() {
        return Err(RegistryError::invalid_type(
            entry.name.clone(),
            "bridge layout was registered by a different type with the same name",
        ));
    }
    if entry.size != mem::size_of::<T>() {
        return Err(RegistryError::invalid_type(
            entry.name.clone(),
            "registered size differs from the live type",
        ));
    }
    let live = T::fields();
    check_layout(entry, &live)?;
    Ok(live)
}

/// Compares a live layout with the registered field list, field by field.
#[cfg(feature = "layout-bridge")]
fn check_layout(entry: &TypeEntry, live: &[FieldLayout]) -> RegistryResult<()> {
    for index in 0..live.len().max(entry.fields.len()) {
        let (Some(member), Some(registered)) = (live.get(index), entry.fields.get(index)) else {
            return Err(RegistryError::InvalidOrdering {
                subject: entry.name.clone(),
                index,
            });
        };
        if member.id != registered.id {
            return Err(RegistryError::invalid_type(
                format!("{}.{}", entry.name, registered.name),
                "live field type differs from the registered field",
            ));
        }
        if member.offset != registered.offset {
            return Err(RegistryError::InvalidOrdering {
                subject: entry.name.clone(),
                index,
            });
        }
    }
    Ok(())
}

unsafe fn run<'m, A, V>(ctx: &'m Context, data: A, id: TypeId, options: VisitOptions, mut visitor: V) -> RegistryResult<()>
where
    A: Access<'m>,
    V: FieldVisitor<A::Value>,
{
    let entry = ctx.at(id)?;
    unsafe { walk(ctx, data, id, &entry.name, options.depth, &mut visitor) }
}

unsafe fn walk<'m, A, V>(
    ctx: &'m Context,
    data: A,
    id: TypeId,
    name: &str,
    depth: usize,
    visitor: &mut V,
) -> RegistryResult<()>
where
    A: Access<'m>,
    V: FieldVisitor<A::Value>,
{
    let Some(entry) = ctx.get(id) else {
        return Err(RegistryError::unregistered(id, name));
    };
    if entry.is_leaf() {
        return unsafe { deliver(ctx, data, id, name, visitor) };
    }

    // the stored layout is the one the frozen entry was built from
    #[cfg(feature = "layout-bridge")]
    if let Some(bridge) = ctx.bridge(id) {
        return unsafe { walk_layout(ctx, data, bridge.fields(), depth, visitor) };
    }

    for field in &entry.fields {
        let field_data = data.offset(field.offset);
        unsafe { step(ctx, field_data, field.id, &field.name, depth, visitor)? };
    }
    Ok(())
}

#[cfg(feature = "layout-bridge")]
unsafe fn walk_layout<'m, A, V>(
    ctx: &'m Context,
    data: A,
    layout: &[FieldLayout],
    depth: usize,
    visitor: &mut V,
) -> RegistryResult<()>
where
    A: Access<'m>,
    V: FieldVisitor<A::Value>,
{
    for member in layout {
        let field_data = data.offset(member.offset);
        unsafe { step(ctx, field_data, member.id, &member.name, depth, visitor)? };
    }
    Ok(())
}

unsafe fn step<'m, A, V>(
    ctx: &'m Context,
    data: A,
    id: TypeId,
    name: &str,
    depth: usize,
    visitor: &mut V,
) -> RegistryResult<()>
where
    A: Access<'m>,
    V: FieldVisitor<A::Value>,
{
    if depth > 0 && ctx.is_structured(id) {
        unsafe { walk(ctx, data, id, name, depth - 1, visitor) }
    } else {
        unsafe { deliver(ctx, data, id, name, visitor) }
    }
}

/// Hands one value to the visitor: typed when known, raw when merely registered.
unsafe fn deliver<'m, A, V>(ctx: &'m Context, data: A, id: TypeId, name: &str, visitor: &mut V) -> RegistryResult<()>
where
    A: Access<'m>,
    V: FieldVisitor<A::Value>,
{
    let accepted = if let Some(known) = ctx.known().get(id) {
        log::trace!("field '{name}' delivered as {}", known.name());
        visitor.visit_field(unsafe { data.known(known) }, name)
    } else {
        let size = ctx.size(id);
        if size == INVALID_SIZE {
            return Err(RegistryError::unregistered(id, name));
        }
        log::trace!("field '{name}' delivered raw ({size} bytes, {id})");
        visitor.visit_field(data.raw(size, id), name)
    };

    if accepted {
        Ok(())
    } else {
        Err(RegistryError::invalid_argument(name, "visitor rejected the field"))
    }
}
