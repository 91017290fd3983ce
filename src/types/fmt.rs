//! Formatting helpers for diagnostics and debug logs.

use std::fmt;

use super::context::Context;
use super::id::TypeId;

pub struct TypeFormatter<'a> {
    ctx: &'a Context,
    id: TypeId,
}

impl<'a> TypeFormatter<'a> {
    pub fn new(ctx: &'a Context, id: TypeId) -> Self {
        Self { ctx, id }
    }
}

impl<'a> fmt::Display for TypeFormatter<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(entry) = self.ctx.get(self.id) else {
            return write!(f, "<unregistered {}>", self.id);
        };
        write!(f, "{}", entry.name)?;
        if entry.base_type != self.id {
            match self.ctx.type_name(entry.base_type) {
                Some(base) => write!(f, " : {base}")?,
                None => write!(f, " : {}", entry.base_type)?,
            }
        }
        write!(f, " [{} bytes", entry.size)?;
        if entry.is_aggregate() {
            write!(f, ", aggregate")?;
        }
        write!(f, "]")?;
        if entry.is_leaf() {
            return Ok(());
        }
        write!(f, " {{ ")?;
        for (index, field) in entry.fields.iter().enumerate() {
            if index > 0 {
                write!(f, ", ")?;
            }
            let ty = self.ctx.type_name(field.id).unwrap_or("?");
            write!(f, "{}: {ty} @{}", field.name, field.offset)?;
        }
        write!(f, " }}")
    }
}

pub fn describe_type(ctx: &Context, id: TypeId) -> TypeFormatter<'_> {
    TypeFormatter::new(ctx, id)
}
