//! Stable identifiers derived from canonical type names.
//!
//! A [`TypeId`] is a djb2-style hash (seed 5381, multiplier 0x21) over the type
//! name with compiler decorations skipped, so `struct Foo`, `class Foo` and `Foo`
//! all map to the same identifier. The hash is not collision free; the registry
//! refuses a second entry under an existing id instead of detecting collisions here.

use std::fmt;

const SEED: u64 = 5381;
const MULTIPLIER: u64 = 0x21;

/// Decorations removed from a raw type name before hashing.
pub const DECORATIONS: &[&str] = &[
    "struct ",
    "class ",
    "enum ",
    "union ",
    "`anonymous namespace'::",
    "(anonymous namespace)::",
    "{anonymous}::",
    "__cxx11::",
    "__1::",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeId(u64);

impl TypeId {
    /// Reserved value never produced for a registered type.
    pub const INVALID: Self = Self(u64::MAX);

    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }

    pub const fn is_valid(self) -> bool {
        self.0 != u64::MAX
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:016x}", self.0)
    }
}

/// Opaque annotation attached to fields and types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Tag(u64);

impl Tag {
    pub const fn named(name: &str) -> Self {
        Self(stable_hash(name))
    }

    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Hashes a type name into its [`TypeId`]. Usable in `const` items.
pub const fn obtain_id(name: &str) -> TypeId {
    TypeId(stable_hash(name))
}

/// Hash over the filtered byte sequence of `name`.
pub const fn stable_hash(name: &str) -> u64 {
    let bytes = name.as_bytes();
    let mut hash = SEED;
    let mut index = 0;
    while index < bytes.len() {
        let skip = decoration_at(bytes, index);
        if skip > 0 {
            index += skip;
            continue;
        }
        hash = hash.wrapping_mul(MULTIPLIER).wrapping_add(bytes[index] as u64);
        index += 1;
    }
    hash
}

/// Removes decorations from `name`, yielding the text that [`obtain_id`] hashes.
pub fn canonical_name(name: &str) -> String {
    let bytes = name.as_bytes();
    let mut kept = Vec::with_capacity(bytes.len());
    let mut index = 0;
    while index < bytes.len() {
        let skip = decoration_at(bytes, index);
        if skip > 0 {
            index += skip;
            continue;
        }
        kept.push(bytes[index]);
        index += 1;
    }
    // decorations are ASCII, so removing them keeps UTF-8 boundaries intact
    String::from_utf8(kept).unwrap_or_else(|err| String::from_utf8_lossy(err.as_bytes()).into_owned())
}

/// Length of the decoration starting at `index`, or zero. Scanning left to right and
/// skipping whole matches yields the sorted, non-overlapping span set.
const fn decoration_at(bytes: &[u8], index: usize) -> usize {
    let mut candidate = 0;
    while candidate < DECORATIONS.len() {
        let pattern = DECORATIONS[candidate].as_bytes();
        if starts_with_at(bytes, index, pattern) {
            return pattern.len();
        }
        candidate += 1;
    }
    0
}

const fn starts_with_at(bytes: &[u8], index: usize, pattern: &[u8]) -> bool {
    if index + pattern.len() > bytes.len() {
        return false;
    }
    let mut offset = 0;
    while offset < pattern.len() {
        if bytes[index + offset] != pattern[offset] {
            return false;
        }
        offset += 1;
    }
    true
}
