//! Staging area for a type's field list before it is committed into a [`Context`].

use super::context::Context;
use super::error::{RegistryError, RegistryResult};
use super::id::{Tag, TypeId, obtain_id, stable_hash};
use super::name::id_of;
use super::record::{EntryFlags, Field, TagList, TypeEntry};

/// Builder for a manually described type.
///
/// Every appended field must reference a type already present in the owning
/// context. Offsets may be given explicitly or derived from the previous field,
/// in which case they are rounded up to the alignment recorded for the field type.
pub struct TypeDeclaration<'ctx> {
    ctx: &'ctx Context,
    id: TypeId,
    name: String,
    size: usize,
    align: Option<usize>,
    flags: EntryFlags,
    base_type: Option<TypeId>,
    fields: Vec<Field>,
    tags: TagList,
}

/// A finished declaration, detached from the context so it can be committed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeclaredType {
    pub id: TypeId,
    pub entry: TypeEntry,
}

impl<'ctx> TypeDeclaration<'ctx> {
    pub fn new(ctx: &'ctx Context, name: impl Into<String>) -> Self {
        let name = name.into();
        Self::with_id(ctx, obtain_id(&name), name, 0)
    }

    pub fn with_size(ctx: &'ctx Context, name: impl Into<String>, size: usize) -> Self {
        let name = name.into();
        Self::with_id(ctx, obtain_id(&name), name, size)
    }

    pub fn with_id(ctx: &'ctx Context, id: TypeId, name: impl Into<String>, size: usize) -> Self {
        Self {
            ctx,
            id,
            name: name.into(),
            size,
            align: None,
            flags: EntryFlags::empty(),
            base_type: None,
            fields: Vec::new(),
            tags: TagList::new(),
        }
    }

    pub fn size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    pub fn align(mut self, align: usize) -> Self {
        self.align = Some(align.max(1));
        self
    }

    pub fn aggregate(mut self, aggregate: bool) -> Self {
        self.flags.set(EntryFlags::AGGREGATE, aggregate);
        self
    }

    pub fn base(mut self, base_type: TypeId) -> Self {
        self.base_type = Some(base_type);
        self
    }

    pub fn tag(mut self, tag: Tag) -> Self {
        self.tags.push(tag);
        self
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn emplace<T: ?Sized>(&mut self, name: impl Into<String>) -> RegistryResult<&mut Self> {
        self.emplace_id(name, id_of::<T>())
    }

    pub fn emplace_tagged<T: ?Sized>(
        &mut self,
        name: impl Into<String>,
        tags: impl IntoIterator<Item = Tag>,
    ) -> RegistryResult<&mut Self> {
        let id = id_of::<T>();
        let offset = self.next_offset(id)?;
        self.push_field(Field::new(name, id, offset).with_tags(tags))
    }

    pub fn emplace_at<T: ?Sized>(&mut self, name: impl Into<String>, offset: usize) -> RegistryResult<&mut Self> {
        self.push_field(Field::new(name, id_of::<T>(), offset))
    }

    pub fn emplace_at_tagged<T: ?Sized>(
        &mut self,
        name: impl Into<String>,
        offset: usize,
        tags: impl IntoIterator<Item = Tag>,
    ) -> RegistryResult<&mut Self> {
        self.push_field(Field::new(name, id_of::<T>(), offset).with_tags(tags))
    }

    /// Appends a field by registry id, placing it after the previous field.
    pub fn emplace_id(&mut self, name: impl Into<String>, id: TypeId) -> RegistryResult<&mut Self> {
        let offset = self.next_offset(id)?;
        self.push_field(Field::new(name, id, offset))
    }

    pub fn emplace_id_at(&mut self, name: impl Into<String>, id: TypeId, offset: usize) -> RegistryResult<&mut Self> {
        self.push_field(Field::new(name, id, offset))
    }

    pub fn push_field(&mut self, field: Field) -> RegistryResult<&mut Self> {
        if !self.ctx.contains(field.id) {
            return Err(RegistryError::unregistered(
                field.id,
                format!("{}.{}", self.name, field.name),
            ));
        }
        self.fields.push(field);
        Ok(self)
    }

    /// Offset a field of type `id` would get if appended now.
    pub fn next_offset(&self, id: TypeId) -> RegistryResult<usize> {
        let field_type = self
            .ctx
            .get(id)
            .ok_or_else(|| RegistryError::unregistered(id, self.name.clone()))?;
        let Some(last) = self.fields.last() else {
            return Ok(0);
        };
        let end = self.field_end(last)?;
        round_up(end, field_type.align).ok_or_else(|| self.overflow(last))
    }

    pub fn erase_index(&mut self, index: usize) -> RegistryResult<()> {
        if index >= self.fields.len() {
            return Err(RegistryError::invalid_argument(self.name.clone(), "field index out of range"));
        }
        self.fields.remove(index);
        Ok(())
    }

    pub fn erase_named(&mut self, name: &str) -> RegistryResult<()> {
        let hash = stable_hash(name);
        let Some(index) = self.fields.iter().position(|field| field.name_hash() == hash) else {
            return Err(RegistryError::invalid_argument(self.name.clone(), "no field with that name"));
        };
        self.fields.remove(index);
        Ok(())
    }

    /// Detaches the declaration. A zero size is derived from the field extents.
    pub fn finish(self) -> RegistryResult<DeclaredType> {
        let field_align = self
            .fields
            .iter()
            .filter_map(|field| self.ctx.get(field.id))
            .map(|entry| entry.align)
            .max()
            .unwrap_or(1);
        let align = self.align.unwrap_or(field_align);
        let size = if self.size == 0 {
            let mut extent = 0;
            for field in &self.fields {
                extent = extent.max(self.field_end(field)?);
            }
            round_up(extent, align).ok_or_else(|| RegistryError::OutOfRange {
                subject: self.name.clone(),
                index: extent,
                len: usize::MAX,
            })?
        } else {
            self.size
        };

        let mut entry = TypeEntry::leaf(self.id, self.name, size, align).with_flags(self.flags);
        if let Some(base) = self.base_type {
            entry.base_type = base;
        }
        entry.fields = self.fields;
        entry.tags = self.tags;
        Ok(DeclaredType { id: self.id, entry })
    }

    /// First byte past `field`, failing instead of wrapping around the address space.
    fn field_end(&self, field: &Field) -> RegistryResult<usize> {
        field
            .offset
            .checked_add(self.ctx.size(field.id))
            .ok_or_else(|| self.overflow(field))
    }

    fn overflow(&self, field: &Field) -> RegistryError {
        RegistryError::OutOfRange {
            subject: format!("{}.{}", self.name, field.name),
            index: field.offset,
            len: usize::MAX,
        }
    }
}

fn round_up(value: usize, align: usize) -> Option<usize> {
    let align = align.max(1);
    value.div_ceil(align).checked_mul(align)
}
