//! Boundary to the compiler-provided type name used as identity input.

use super::id::{TypeId, obtain_id};

/// Raw compiler name of `T`. Deterministic for a given toolchain; treated as an opaque string.
pub fn type_name<T: ?Sized>() -> &'static str {
    std::any::type_name::<T>()
}

/// Registry identifier of `T`.
pub fn id_of<T: ?Sized>() -> TypeId {
    obtain_id(type_name::<T>())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinct_types_get_distinct_ids() {
        assert_ne!(id_of::<u32>(), id_of::<i32>(), "signedness must be part of the identity");
        assert_ne!(id_of::<Vec<u8>>(), id_of::<Vec<Vec<u8>>>());
    }

    #[test]
    fn id_matches_name_hash() {
        assert_eq!(id_of::<String>(), obtain_id(type_name::<String>()));
    }
}
