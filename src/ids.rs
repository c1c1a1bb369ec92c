use std::fmt::{Debug, Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Identifies an atom for its whole lifetime. Displayed as `a<n>`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AtomId(u64);

/// Identifies a bond for its whole lifetime. Displayed as `b<n>`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BondId(u64);

macro_rules! prefixed_id {
    ($name:ident, $prefix:literal) => {
        impl $name {
            pub fn new(raw: u64) -> Self {
                $name(raw)
            }

            pub fn raw(&self) -> u64 {
                self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter) -> FmtResult {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }

        impl Debug for $name {
            fn fmt(&self, f: &mut Formatter) -> FmtResult {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.strip_prefix($prefix)
                    .and_then(|n| n.parse().ok())
                    .map($name)
                    .ok_or_else(|| format!(concat!("Expected an id like ", $prefix, "1, got {}"), s))
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

prefixed_id!(AtomId, "a");
prefixed_id!(BondId, "b");

/// Hands out fresh ids to the editor.
///
/// Implementations must never return the same id twice for the same kind.
pub trait IdAllocator {
    fn next_atom_id(&mut self) -> AtomId;
    fn next_bond_id(&mut self) -> BondId;
}

/// A monotonic counter per id kind, starting at 1.
#[derive(Debug, Clone)]
pub struct SequentialIds {
    next_atom: u64,
    next_bond: u64,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// Start both counters at `first`. Useful when ids must not collide with a previous session.
    pub fn starting_at(first: u64) -> Self {
        Self {
            next_atom: first,
            next_bond: first,
        }
    }
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self::new()
    }
}

impl IdAllocator for SequentialIds {
    fn next_atom_id(&mut self) -> AtomId {
        let id = AtomId(self.next_atom);
        self.next_atom += 1;
        id
    }

    fn next_bond_id(&mut self) -> BondId {
        let id = BondId(self.next_bond);
        self.next_bond += 1;
        id
    }
}
