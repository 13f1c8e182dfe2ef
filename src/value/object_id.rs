//! Object identities and allocations.
//!
//! An [`ObjectId`] is a 128-bit identity: a 64-bit allocation number, a 32-bit
//! offset inside the allocation, and 32 bits of kind metadata. Objects are
//! always allocated in contiguous ranges, one range per call, and every object
//! in a range shares the kind of the range (entity, list, dict or schema).
//!
//! The allocation number is a per-process random prefix (top 16 bits) combined
//! with a monotonically increasing counter, so ids from different processes do
//! not collide in practice while staying cheap to mint.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

const LIST_FLAG: u32 = 1;
const DICT_FLAG: u32 = 1 << 1;
const SCHEMA_FLAG: u32 = 1 << 2;
const NOFOLLOW_FLAG: u32 = 1 << 3;
const KIND_MASK: u32 = LIST_FLAG | DICT_FLAG | SCHEMA_FLAG;

/// Allocation number reserved for built-in ids
const RESERVED_ALLOCATION: u64 = 0;
const COUNTER_MASK: u64 = 0x0000_FFFF_FFFF_FFFF;

static NEXT_ALLOCATION: AtomicU64 = AtomicU64::new(1);

fn process_prefix() -> u64 {
    static PREFIX: OnceLock<u64> = OnceLock::new();
    *PREFIX.get_or_init(|| uuid::Uuid::new_v4().as_u64_pair().0 & !COUNTER_MASK)
}

fn next_allocation_number() -> u64 {
    let counter = NEXT_ALLOCATION.fetch_add(1, Ordering::Relaxed) & COUNTER_MASK;
    process_prefix() | counter
}

/// Kind of objects living in an allocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Entity,
    List,
    Dict,
    Schema,
}

impl ObjectKind {
    fn flags(self) -> u32 {
        match self {
            ObjectKind::Entity => 0,
            ObjectKind::List => LIST_FLAG,
            ObjectKind::Dict => DICT_FLAG,
            ObjectKind::Schema => SCHEMA_FLAG,
        }
    }
}

/// Identity of a contiguous range of objects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AllocationId {
    allocation: u64,
    flags: u32,
}

impl AllocationId {
    /// Allocate a fresh range of the given kind
    pub fn new(kind: ObjectKind) -> Self {
        AllocationId {
            allocation: next_allocation_number(),
            flags: kind.flags(),
        }
    }

    /// Object at `offset` inside this allocation
    pub fn object_id(&self, offset: u32) -> ObjectId {
        ObjectId {
            allocation: self.allocation,
            offset,
            flags: self.flags,
        }
    }

    pub fn kind(&self) -> ObjectKind {
        kind_from_flags(self.flags)
    }

    pub fn is_schemas_alloc(&self) -> bool {
        self.flags & SCHEMA_FLAG != 0
    }
}

fn kind_from_flags(flags: u32) -> ObjectKind {
    match flags & KIND_MASK {
        LIST_FLAG => ObjectKind::List,
        DICT_FLAG => ObjectKind::Dict,
        SCHEMA_FLAG => ObjectKind::Schema,
        _ => ObjectKind::Entity,
    }
}

/// Opaque 128-bit object identity
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId {
    allocation: u64,
    offset: u32,
    flags: u32,
}

impl ObjectId {
    pub fn allocation_id(&self) -> AllocationId {
        AllocationId {
            allocation: self.allocation,
            flags: self.flags & KIND_MASK,
        }
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn kind(&self) -> ObjectKind {
        kind_from_flags(self.flags)
    }

    pub fn is_list(&self) -> bool {
        self.kind() == ObjectKind::List
    }

    pub fn is_dict(&self) -> bool {
        self.kind() == ObjectKind::Dict
    }

    pub fn is_schema(&self) -> bool {
        self.kind() == ObjectKind::Schema
    }

    pub fn is_entity(&self) -> bool {
        self.kind() == ObjectKind::Entity
    }

    pub fn is_nofollow_schema(&self) -> bool {
        self.is_schema() && self.flags & NOFOLLOW_FLAG != 0
    }

    /// The reserved id standing for `nofollow(OBJECT)`
    pub fn nofollow_object_schema_id() -> Self {
        ObjectId {
            allocation: RESERVED_ALLOCATION,
            offset: 0,
            flags: SCHEMA_FLAG | NOFOLLOW_FLAG,
        }
    }

    /// NoFollow wrapper of a schema id. Reversible with [`Self::without_nofollow`].
    pub(crate) fn with_nofollow(self) -> Self {
        ObjectId {
            flags: self.flags | NOFOLLOW_FLAG,
            ..self
        }
    }

    pub(crate) fn without_nofollow(self) -> Self {
        ObjectId {
            flags: self.flags & !NOFOLLOW_FLAG,
            ..self
        }
    }

    /// Raw parts used by the stable fingerprint
    pub(crate) fn to_le_bytes(self) -> [u8; 16] {
        let mut out = [0u8; 16];
        out[..8].copy_from_slice(&self.allocation.to_le_bytes());
        out[8..12].copy_from_slice(&self.offset.to_le_bytes());
        out[12..].copy_from_slice(&self.flags.to_le_bytes());
        out
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.kind() {
            ObjectKind::Entity => "$",
            ObjectKind::List => "$l",
            ObjectKind::Dict => "$d",
            ObjectKind::Schema if self.flags & NOFOLLOW_FLAG != 0 => "$nf",
            ObjectKind::Schema => "$s",
        };
        write!(f, "{}{:x}:{}", prefix, self.allocation, self.offset)
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Allocate one explicit schema object
pub fn allocate_explicit_schema() -> ObjectId {
    AllocationId::new(ObjectKind::Schema).object_id(0)
}

/// Allocate `size` entity objects in one allocation
pub fn allocate_objects(size: usize) -> AllocationId {
    allocate(ObjectKind::Entity, size)
}

/// Allocate `size` lists in one allocation
pub fn allocate_lists(size: usize) -> AllocationId {
    allocate(ObjectKind::List, size)
}

/// Allocate `size` dicts in one allocation
pub fn allocate_dicts(size: usize) -> AllocationId {
    allocate(ObjectKind::Dict, size)
}

fn allocate(kind: ObjectKind, size: usize) -> AllocationId {
    debug_assert!(size <= u32::MAX as usize);
    AllocationId::new(kind)
}
