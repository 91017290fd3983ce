//! Entry point for the `types` subsystem: identity, registry, declaration and visitation.

pub mod id;
pub mod name;
pub mod error;
pub mod record;
mod raw;
pub mod known;
pub mod value;
pub mod visitor;
pub mod context;
pub mod declaration;
#[cfg(feature = "layout-bridge")]
pub mod bridge;
pub mod walker;
pub mod lifecycle;
pub mod fmt;

#[cfg(feature = "layout-bridge")]
pub use bridge::{FieldLayout, Reflect};
pub use context::{Context, INVALID_SIZE, make_context, make_context_with};
#[cfg(feature = "layout-bridge")]
pub use context::BridgeLayout;
pub use declaration::{DeclaredType, TypeDeclaration};
pub use error::{ErrorKind, RegistryError, RegistryResult};
pub use fmt::{TypeFormatter, describe_type};
pub use id::{Tag, TypeId, canonical_name, obtain_id, stable_hash};
pub use known::{ConstPtrPair, KnownType, KnownTypes, PtrPair, SequenceDepth};
pub use lifecycle::{LIFECYCLE_DEPTH, construct, construct_with, destruct, destruct_with};
pub use name::{id_of, type_name};
pub use record::{EntryFlags, Field, TagList, TypeEntry};
pub use value::{FieldMut, FieldRef, KnownMut, KnownRef};
pub use visitor::{Checked, CheckedNamed, Each, EachNamed, FieldVisitor};
#[cfg(feature = "layout-bridge")]
pub use walker::{visit_value, visit_value_mut};
pub use walker::{VisitOptions, visit, visit_mut, visit_mut_with, visit_with};
