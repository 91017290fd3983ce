//! The registry: per-scope storage of type layouts keyed by [`TypeId`].
//!
//! Population happens in a single-threaded setup phase; afterwards the context is
//! shared by reference across any number of visitation calls. There is no internal
//! locking, so mutation must not overlap with reads.

use std::any::Any;
use std::mem;

use ahash::AHashMap;

#[cfg(feature = "layout-bridge")]
use super::bridge::{FieldLayout, Reflect};
use super::declaration::DeclaredType;
#[cfg(feature = "layout-bridge")]
use super::declaration::TypeDeclaration;
use super::error::{RegistryError, RegistryResult};
use super::id::{TypeId, obtain_id};
use super::known::KnownTypes;
use super::name::{id_of, type_name};
use super::record::{EntryFlags, TypeEntry};

/// Returned by [`Context::size`] for ids that are not registered.
pub const INVALID_SIZE: usize = usize::MAX;

#[derive(Debug, Default)]
pub struct Context {
    storage: AHashMap<TypeId, TypeEntry>,
    known: KnownTypes,
    #[cfg(feature = "layout-bridge")]
    bridges: AHashMap<TypeId, BridgeLayout>,
}

/// Field layout recorded by [`Context::register`], tied to the Rust type it came from.
#[cfg(feature = "layout-bridge")]
#[derive(Clone, Debug)]
pub struct BridgeLayout {
    rust_type: std::any::TypeId,
    fields: Vec<FieldLayout>,
}

#[cfg(feature = "layout-bridge")]
impl BridgeLayout {
    pub fn fields(&self) -> &[FieldLayout] {
        &self.fields
    }

    /// Whether the layout was taken from `T` rather than another type with the same name.
    pub fn is<T: Any>(&self) -> bool {
        self.rust_type == std::any::TypeId::of::<T>()
    }
}

/// Context with the standard known-type table installed and registered.
pub fn make_context() -> RegistryResult<Context> {
    make_context_with(KnownTypes::standard())
}

/// Context using a caller-supplied known-type table; every descriptor is registered as a leaf.
pub fn make_context_with(known: KnownTypes) -> RegistryResult<Context> {
    let mut ctx = Context::with_known(known);
    ctx.install_known()?;
    Ok(ctx)
}

impl Context {
    /// Empty registry without a known-type table; every leaf is delivered raw.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry using `known` for typed delivery. Entries are not registered until
    /// [`Context::install_known`] runs.
    pub fn with_known(known: KnownTypes) -> Self {
        Self {
            known,
            ..Self::default()
        }
    }

    pub fn known(&self) -> &KnownTypes {
        &self.known
    }

    /// Registers a leaf entry for every known-type descriptor not yet present.
    pub fn install_known(&mut self) -> RegistryResult<()> {
        let mut added = 0usize;
        for known in self.known.iter() {
            if let Some(existing) = self.storage.get(&known.id()) {
                if existing.name != known.name() {
                    return Err(RegistryError::AlreadyRegistered {
                        id: known.id(),
                        existing: existing.name.clone(),
                        attempted: known.name().to_owned(),
                    });
                }
                continue;
            }
            let entry = TypeEntry::leaf(known.id(), known.name(), known.size(), known.align())
                .with_flags(known.flags());
            self.storage.insert(known.id(), entry);
            added += 1;
        }
        log::debug!("installed {added} known types ({} in table)", self.known.len());
        Ok(())
    }

    pub fn contains(&self, id: TypeId) -> bool {
        self.storage.contains_key(&id)
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.contains(obtain_id(name))
    }

    pub fn contains_type<T: ?Sized>(&self) -> bool {
        self.contains(id_of::<T>())
    }

    pub fn get(&self, id: TypeId) -> Option<&TypeEntry> {
        self.storage.get(&id)
    }

    pub fn at(&self, id: TypeId) -> RegistryResult<&TypeEntry> {
        self.storage
            .get(&id)
            .ok_or_else(|| RegistryError::unregistered(id, ""))
    }

    pub fn obtain(&self, id: TypeId) -> RegistryResult<&TypeEntry> {
        self.at(id)
    }

    /// Byte size of `id`, or [`INVALID_SIZE`] when unregistered.
    pub fn size(&self, id: TypeId) -> usize {
        self.storage.get(&id).map_or(INVALID_SIZE, |entry| entry.size)
    }

    pub fn size_of_type<T: ?Sized>(&self) -> usize {
        self.size(id_of::<T>())
    }

    pub fn type_name(&self, id: TypeId) -> Option<&str> {
        self.storage.get(&id).map(|entry| entry.name.as_str())
    }

    /// Registered with a non-empty field list.
    pub fn is_structured(&self, id: TypeId) -> bool {
        self.storage.get(&id).is_some_and(|entry| !entry.is_leaf())
    }

    pub fn offset(&self, id: TypeId, field_index: usize) -> RegistryResult<usize> {
        let entry = self.at(id)?;
        entry
            .field(field_index)
            .map(|field| field.offset)
            .ok_or_else(|| RegistryError::OutOfRange {
                subject: entry.name.clone(),
                index: field_index,
                len: entry.fields.len(),
            })
    }

    pub fn base_type(&self, id: TypeId) -> RegistryResult<TypeId> {
        self.at(id).map(|entry| entry.base_type)
    }

    /// Inserts `entry` unless `id` is taken; returns whether it was inserted.
    /// Duplicate handling is left to [`Context::add_type`].
    pub fn emplace(&mut self, id: TypeId, entry: TypeEntry) -> bool {
        if self.storage.contains_key(&id) {
            return false;
        }
        self.storage.insert(id, entry);
        true
    }

    pub fn erase(&mut self, id: TypeId) -> RegistryResult<()> {
        let entry = self.at(id)?;
        if entry.is_aggregate() {
            return Err(RegistryError::invalid_type(
                entry.name.clone(),
                "aggregate entries cannot be erased",
            ));
        }
        if let Some(entry) = self.storage.remove(&id) {
            log::debug!("erased type '{}' ({id})", entry.name);
        }
        Ok(())
    }

    pub fn rename(&mut self, id: TypeId, new_name: impl Into<String>) -> RegistryResult<()> {
        let new_name = new_name.into();
        let Some(entry) = self.storage.get_mut(&id) else {
            return Err(RegistryError::unregistered(id, new_name));
        };
        if entry.is_aggregate() {
            return Err(RegistryError::invalid_type(
                entry.name.clone(),
                "aggregate entries cannot be renamed",
            ));
        }
        log::debug!("renamed type '{}' ({id}) to '{new_name}'", entry.name);
        entry.name = new_name;
        Ok(())
    }

    pub fn rename_type<T: ?Sized>(&mut self, new_name: impl Into<String>) -> RegistryResult<()> {
        self.rename(id_of::<T>(), new_name)
    }

    pub fn remove_type(&mut self, id: TypeId) -> RegistryResult<()> {
        self.erase(id)
    }

    pub fn remove_type_of<T: ?Sized>(&mut self) -> RegistryResult<()> {
        self.erase(id_of::<T>())
    }

    /// Entries in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (TypeId, &TypeEntry)> {
        self.storage.iter().map(|(id, entry)| (*id, entry))
    }

    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Commits a finished declaration. Fails if the id is already taken or if any field
    /// type is missing from this context; nothing is inserted on failure.
    pub fn add_type(&mut self, declared: DeclaredType) -> RegistryResult<TypeId> {
        let DeclaredType { id, entry } = declared;
        if let Some(existing) = self.storage.get(&id) {
            return Err(RegistryError::AlreadyRegistered {
                id,
                existing: existing.name.clone(),
                attempted: entry.name,
            });
        }
        if let Some(field) = entry.fields.iter().find(|field| !self.contains(field.id)) {
            return Err(RegistryError::unregistered(
                field.id,
                format!("{}.{}", entry.name, field.name),
            ));
        }
        log::debug!(
            "registered type '{}' ({id}, {} bytes, {} fields)",
            entry.name,
            entry.size,
            entry.fields.len()
        );
        self.storage.insert(id, entry);
        Ok(id)
    }

    pub fn add_type_with_base(&mut self, mut declared: DeclaredType, base_type: TypeId) -> RegistryResult<TypeId> {
        declared.entry.base_type = base_type;
        self.add_type(declared)
    }

    pub fn add_type_derived<B: ?Sized>(&mut self, declared: DeclaredType) -> RegistryResult<TypeId> {
        self.add_type_with_base(declared, id_of::<B>())
    }

    /// Registers `T` as an opaque leaf, plus `Vec<T>` and `Vec<Vec<T>>` companions
    /// when those are not registered yet.
    pub fn register_leaf<T: Any>(&mut self) -> RegistryResult<TypeId> {
        let id = id_of::<T>();
        let entry = TypeEntry::leaf(id, type_name::<T>(), mem::size_of::<T>(), mem::align_of::<T>());
        self.add_type(DeclaredType { id, entry })?;
        self.register_companions::<T>();
        Ok(id)
    }

    /// Registers aggregate `T` from its bridge layout, plus sequence companions.
    ///
    /// All field types must already be registered; otherwise nothing is committed.
    #[cfg(feature = "layout-bridge")]
    pub fn register<T: Reflect>(&mut self) -> RegistryResult<TypeId> {
        let id = id_of::<T>();
        if let Some(existing) = self.storage.get(&id) {
            return Err(RegistryError::AlreadyRegistered {
                id,
                existing: existing.name.clone(),
                attempted: type_name::<T>().to_owned(),
            });
        }

        let layout = T::fields();
        let mut decl = TypeDeclaration::with_id(self, id, type_name::<T>(), mem::size_of::<T>())
            .align(mem::align_of::<T>())
            .aggregate(true);
        for field in &layout {
            decl.emplace_id_at(field.name.clone(), field.id, field.offset)?;
        }
        let declared = decl.finish()?;

        self.add_type(declared)?;
        self.bridges.insert(
            id,
            BridgeLayout {
                rust_type: std::any::TypeId::of::<T>(),
                fields: layout,
            },
        );
        self.register_companions::<T>();
        Ok(id)
    }

    #[cfg(feature = "layout-bridge")]
    pub fn bridge(&self, id: TypeId) -> Option<&BridgeLayout> {
        self.bridges.get(&id)
    }

    fn register_companions<T: Any>(&mut self) {
        let flags = EntryFlags::SEQUENCE;
        let single = id_of::<Vec<T>>();
        self.emplace(
            single,
            TypeEntry::leaf(single, type_name::<Vec<T>>(), mem::size_of::<Vec<T>>(), mem::align_of::<Vec<T>>())
                .with_flags(flags),
        );
        let nested = id_of::<Vec<Vec<T>>>();
        self.emplace(
            nested,
            TypeEntry::leaf(
                nested,
                type_name::<Vec<Vec<T>>>(),
                mem::size_of::<Vec<Vec<T>>>(),
                mem::align_of::<Vec<Vec<T>>>(),
            )
            .with_flags(flags),
        );
    }
}

#[cfg(test)]
mod tests {
    //! Registry contracts: lookups, aggregate protection and duplicate rejection.
    use super::*;
    use crate::types::declaration::TypeDeclaration;
    use crate::types::error::ErrorKind;

    fn declare_point(ctx: &mut Context, aggregate: bool) -> TypeId {
        let mut decl = TypeDeclaration::new(ctx, "Point").aggregate(aggregate);
        decl.emplace::<f32>("x").expect("x");
        decl.emplace::<f32>("y").expect("y");
        let declared = decl.finish().expect("finish");
        ctx.add_type(declared).expect("register point")
    }

    #[test]
    fn standard_context_registers_known_types() {
        let ctx = make_context().expect("context");
        assert!(ctx.contains_type::<u32>());
        assert!(ctx.contains_type::<Vec<Vec<String>>>());
        assert_eq!(ctx.size_of_type::<u64>(), 8);
        assert_eq!(ctx.len(), ctx.known().len(), "every descriptor becomes one entry");
    }

    #[test]
    fn missing_ids_report_sentinels_and_errors() {
        let ctx = Context::new();
        let id = obtain_id("Ghost");
        assert!(!ctx.contains(id));
        assert_eq!(ctx.size(id), INVALID_SIZE, "size never fails, it returns the sentinel");
        assert_eq!(ctx.at(id).unwrap_err().kind(), ErrorKind::UnregisteredId);
        assert!(ctx.type_name(id).is_none());
    }

    #[test]
    fn duplicate_registration_keeps_first_entry() {
        let mut ctx = make_context().expect("context");
        let id = declare_point(&mut ctx, false);

        let mut again = TypeDeclaration::new(&ctx, "Point");
        again.emplace::<f64>("only").expect("only");
        let declared = again.finish().expect("finish");
        let err = ctx.add_type(declared).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyRegistered);
        assert!(!err.is_collision(), "same name is a duplicate, not a collision");
        assert_eq!(ctx.at(id).expect("entry").fields.len(), 2, "first registration must survive");
    }

    #[test]
    fn aggregates_cannot_be_renamed_or_erased() {
        let mut ctx = make_context().expect("context");
        let id = declare_point(&mut ctx, true);
        let before = ctx.at(id).expect("entry").clone();

        assert_eq!(ctx.rename(id, "Vec2").unwrap_err().kind(), ErrorKind::InvalidType);
        assert_eq!(ctx.erase(id).unwrap_err().kind(), ErrorKind::InvalidType);
        assert_eq!(ctx.at(id).expect("entry"), &before, "protected entries stay untouched");
    }

    #[test]
    fn manual_entries_can_be_renamed_and_erased() {
        let mut ctx = make_context().expect("context");
        let id = declare_point(&mut ctx, false);
        ctx.rename(id, "Vec2").expect("rename");
        assert_eq!(ctx.type_name(id), Some("Vec2"), "rename keeps the id and swaps the name");
        ctx.remove_type(id).expect("erase");
        assert!(!ctx.contains(id));
        assert_eq!(ctx.erase(id).unwrap_err().kind(), ErrorKind::UnregisteredId);
        assert_eq!(ctx.rename(id, "X").unwrap_err().kind(), ErrorKind::UnregisteredId);
    }

    #[test]
    fn offsets_and_base_types_are_queryable() {
        let mut ctx = make_context().expect("context");
        let id = declare_point(&mut ctx, false);
        assert_eq!(ctx.offset(id, 1).expect("offset"), 4);
        assert_eq!(ctx.offset(id, 2).unwrap_err().kind(), ErrorKind::OutOfRange);
        assert_eq!(ctx.base_type(id).expect("base"), id, "plain declarations are their own base");
        assert!(ctx.is_structured(id));
        assert!(!ctx.is_structured(id_of::<u8>()), "known leaves have no fields");
    }

    #[test]
    fn derived_types_record_their_base() {
        let mut ctx = make_context().expect("context");
        let base = declare_point(&mut ctx, false);
        let mut decl = TypeDeclaration::new(&ctx, "Point3");
        decl.emplace::<f32>("z").expect("z");
        let declared = decl.finish().expect("finish");
        let id = ctx.add_type_with_base(declared, base).expect("derived");
        assert_eq!(ctx.base_type(id).expect("base"), base);
    }

    #[test]
    fn leaf_registration_adds_sequence_companions() {
        struct Handle(#[allow(dead_code)] u32);
        let mut ctx = Context::new();
        let id = ctx.register_leaf::<Handle>().expect("leaf");
        assert_eq!(ctx.size(id), 4);
        let single = ctx.get(id_of::<Vec<Handle>>()).expect("vec companion");
        assert!(single.flags.contains(EntryFlags::SEQUENCE));
        assert!(ctx.contains_type::<Vec<Vec<Handle>>>());
        assert_eq!(
            ctx.register_leaf::<Handle>().unwrap_err().kind(),
            ErrorKind::AlreadyRegistered,
            "second registration of the same leaf must fail"
        );
    }

    #[test]
    fn declarations_only_commit_where_their_field_types_exist() {
        let mut donor = make_context().expect("donor");
        let ghost = obtain_id("Ghost");
        let declared = TypeDeclaration::with_id(&donor, ghost, "Ghost", 4).finish().expect("finish");
        donor.add_type(declared).expect("ghost");
        let mut decl = TypeDeclaration::new(&donor, "Haunted");
        decl.emplace_id("spirit", ghost).expect("spirit");
        let declared = decl.finish().expect("finish");

        let mut target = make_context().expect("target");
        let before = target.len();
        let err = target.add_type(declared.clone()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnregisteredId, "field types are checked at commit time");
        assert!(!target.contains_name("Haunted"));
        assert_eq!(target.len(), before, "a rejected commit inserts nothing");

        donor.add_type(declared).expect("the declaring context still accepts it");
    }

    #[test]
    fn name_lookup_goes_through_the_hash() {
        let mut ctx = make_context().expect("context");
        declare_point(&mut ctx, false);
        assert!(ctx.contains_name("Point"));
        assert!(ctx.contains_name("struct Point"), "decorated spellings resolve to the same entry");
    }

    #[test]
    fn iteration_yields_every_entry() {
        let ctx = make_context().expect("context");
        let ids: std::collections::HashSet<_> = ctx.iter().map(|(id, _)| id).collect();
        assert_eq!(ids.len(), ctx.len());
        assert!(ids.contains(&id_of::<f64>()));
    }
}
