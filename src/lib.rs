//! Runtime type registry and field visitation over raw memory.
//!
//! Types are identified by a stable hash of their canonical name. A [`Context`] stores
//! each type's size, alignment and field list; the visitation engine walks a value's
//! fields by offset and delivers known primitives as typed handles and everything else
//! as address/size/id pairs.

pub mod types;

pub use types::*;
