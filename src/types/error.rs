//! Error taxonomy shared by the registry, the declaration builder and visitation.

use std::{error::Error, fmt};

use super::id::TypeId;

pub type RegistryResult<T> = Result<T, RegistryError>;

/// Coarse classification callers branch on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    InvalidType,
    InvalidOrdering,
    UnregisteredId,
    AlreadyRegistered,
    ParsingFailed,
    OutOfRange,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidArgument => "invalid argument",
            ErrorKind::InvalidType => "invalid type",
            ErrorKind::InvalidOrdering => "invalid ordering",
            ErrorKind::UnregisteredId => "unregistered id",
            ErrorKind::AlreadyRegistered => "already registered",
            ErrorKind::ParsingFailed => "parsing failed",
            ErrorKind::OutOfRange => "out of range",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegistryError {
    /// A field was rejected by the visitor or a builder argument did not resolve.
    InvalidArgument {
        subject: String,
        reason: &'static str,
    },
    /// The operation is forbidden for this entry (aggregate protection, layout mismatch).
    InvalidType {
        subject: String,
        reason: &'static str,
    },
    /// Live layout and registered field list disagree on field order or count.
    InvalidOrdering {
        subject: String,
        index: usize,
    },
    UnregisteredId {
        id: TypeId,
        subject: String,
    },
    /// `existing` differs from `attempted` when two names hash to the same id.
    AlreadyRegistered {
        id: TypeId,
        existing: String,
        attempted: String,
    },
    /// Reserved for textual (de)serialization layers built on the registry.
    ParsingFailed {
        input: String,
    },
    OutOfRange {
        subject: String,
        index: usize,
        len: usize,
    },
}

impl RegistryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RegistryError::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            RegistryError::InvalidType { .. } => ErrorKind::InvalidType,
            RegistryError::InvalidOrdering { .. } => ErrorKind::InvalidOrdering,
            RegistryError::UnregisteredId { .. } => ErrorKind::UnregisteredId,
            RegistryError::AlreadyRegistered { .. } => ErrorKind::AlreadyRegistered,
            RegistryError::ParsingFailed { .. } => ErrorKind::ParsingFailed,
            RegistryError::OutOfRange { .. } => ErrorKind::OutOfRange,
        }
    }

    pub fn is_collision(&self) -> bool {
        matches!(self, RegistryError::AlreadyRegistered { existing, attempted, .. } if existing != attempted)
    }

    pub(crate) fn unregistered(id: TypeId, subject: impl Into<String>) -> Self {
        RegistryError::UnregisteredId {
            id,
            subject: subject.into(),
        }
    }

    pub(crate) fn invalid_argument(subject: impl Into<String>, reason: &'static str) -> Self {
        RegistryError::InvalidArgument {
            subject: subject.into(),
            reason,
        }
    }

    pub(crate) fn invalid_type(subject: impl Into<String>, reason: &'static str) -> Self {
        RegistryError::InvalidType {
            subject: subject.into(),
            reason,
        }
    }
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::InvalidArgument { subject, reason } => {
                write!(f, "invalid argument for '{subject}': {reason}")
            }
            RegistryError::InvalidType { subject, reason } => {
                write!(f, "invalid type '{subject}': {reason}")
            }
            RegistryError::InvalidOrdering { subject, index } => {
                write!(f, "field {index} of '{subject}' does not match the registered ordering")
            }
            RegistryError::UnregisteredId { id, subject } if subject.is_empty() => {
                write!(f, "type id {id} is not registered")
            }
            RegistryError::UnregisteredId { id, subject } => {
                write!(f, "type id {id} is not registered (while handling '{subject}')")
            }
            RegistryError::AlreadyRegistered {
                id,
                existing,
                attempted,
            } if existing == attempted => write!(f, "type '{existing}' ({id}) is already registered"),
            RegistryError::AlreadyRegistered {
                id,
                existing,
                attempted,
            } => write!(
                f,
                "type '{attempted}' collides with registered type '{existing}' on id {id}"
            ),
            RegistryError::ParsingFailed { input } => write!(f, "failed to parse '{input}'"),
            RegistryError::OutOfRange { subject, index, len } => {
                write!(f, "index {index} is out of range for '{subject}' ({len} entries)")
            }
        }
    }
}

impl Error for RegistryError {}
