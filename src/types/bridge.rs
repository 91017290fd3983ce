//! Field-extraction bridge: layouts taken from real Rust types instead of manual declarations.
//!
//! [`reflect_struct!`](crate::reflect_struct) implements [`Reflect`] using `offset_of!`,
//! and checks at compile time that every listed field has the stated type. Registering
//! a `Reflect` type through [`Context::register`](super::context::Context::register)
//! produces an aggregate entry and enables the bridge fast path during visitation.

use std::any::Any;
use std::borrow::Cow;
use std::marker::PhantomData;
use std::mem;

use super::id::TypeId;
use super::name::id_of;

/// One member as reported by the bridge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldLayout {
    pub name: Cow<'static, str>,
    pub id: TypeId,
    pub offset: usize,
    pub size: usize,
}

impl FieldLayout {
    pub fn of<F: Any>(name: &'static str, offset: usize) -> Self {
        Self {
            name: Cow::Borrowed(name),
            id: id_of::<F>(),
            offset,
            size: mem::size_of::<F>(),
        }
    }

    /// Member without name metadata; named `var<offset>`.
    pub fn unnamed<F: Any>(offset: usize) -> Self {
        Self {
            name: Cow::Owned(format!("var{offset}")),
            id: id_of::<F>(),
            offset,
            size: mem::size_of::<F>(),
        }
    }
}

/// Captures the exact type of a place without allowing coercions.
#[doc(hidden)]
pub fn field_type<T: ?Sized>(_: &T) -> PhantomData<T> {
    PhantomData
}

/// Types whose direct members can be enumerated with their byte offsets.
///
/// # Safety
/// Every returned [`FieldLayout`] must name the real type of a member of `Self` and
/// its real offset. Visitation hands out typed references based on this data.
pub unsafe trait Reflect: Any {
    fn fields() -> Vec<FieldLayout>;
}

/// Implements [`Reflect`] for a struct.
///
/// Tuple structs take a plain identifier; their members are named `var<offset>`.
///
/// ```
/// use memreflect::reflect_struct;
///
/// struct Stats { hp: i32, name: String }
/// reflect_struct!(Stats { hp: i32, name: String });
///
/// struct Pair(u16, u16);
/// reflect_struct!(Pair(0: u16, 1: u16));
/// ```
///
/// Listed types must match the declared field types exactly; a type the field merely
/// dereferences to is rejected:
///
/// ```compile_fail
/// use memreflect::reflect_struct;
///
/// struct Boxed { inner: Box<u64> }
/// reflect_struct!(Boxed { inner: u64 });
/// ```
#[macro_export]
macro_rules! reflect_struct {
    ($ty:ident ( $($index:tt : $fty:ty),* $(,)? )) => {
        const _: () = {
            #[allow(dead_code)]
            fn assert_field_types(value: &$ty) {
                $(
                    let field = $crate::types::bridge::field_type(&value.$index);
                    let _: ::core::marker::PhantomData<$fty> = field;
                )*
            }

            unsafe impl $crate::types::bridge::Reflect for $ty {
                fn fields() -> ::std::vec::Vec<$crate::types::bridge::FieldLayout> {
                    ::std::vec![$(
                        $crate::types::bridge::FieldLayout::unnamed::<$fty>(
                            ::core::mem::offset_of!($ty, $index),
                        )
                    ),*]
                }
            }
        };
    };
    ($ty:ty { $($field:ident : $fty:ty),* $(,)? }) => {
        const _: () = {
            #[allow(dead_code)]
            fn assert_field_types(value: &$ty) {
                $(
                    let field = $crate::types::bridge::field_type(&value.$field);
                    let _: ::core::marker::PhantomData<$fty> = field;
                )*
            }

            unsafe impl $crate::types::bridge::Reflect for $ty {
                fn fields() -> ::std::vec::Vec<$crate::types::bridge::FieldLayout> {
                    ::std::vec![$(
                        $crate::types::bridge::FieldLayout::of::<$fty>(
                            ::core::stringify!($field),
                            ::core::mem::offset_of!($ty, $field),
                        )
                    ),*]
                }
            }
        };
    };
}
