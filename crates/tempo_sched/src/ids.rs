//! Opaque ID newtypes for registered design entities.
//!
//! Each ID is a thin `u32` wrapper whose value is the entity's registration
//! index. `Ord` on [`BlockId`] is therefore registration order, which the
//! scheduler relies on for deterministic tie-breaking.

use crate::arena::ArenaId;
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
        pub struct $name(u32);

        impl $name {
            /// Creates an ID from a raw `u32` index.
            pub fn from_raw(index: u32) -> Self {
                Self(index)
            }

            /// Returns the raw `u32` index.
            pub fn as_raw(self) -> u32 {
                self.0
            }

            /// Returns the raw index as a `usize`, for indexing side tables.
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl ArenaId for $name {
            fn from_raw(index: u32) -> Self {
                Self(index)
            }

            fn as_raw(self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}", $prefix, self.0)
            }
        }
    };
}

define_id!(
    /// ID of a registered update block.
    BlockId,
    "#"
);

define_id!(
    /// ID of a declared variable (root signal, struct field, or bit slice).
    VarId,
    "v"
);

define_id!(
    /// ID of a registered method.
    MethodId,
    "m"
);

define_id!(
    /// ID of a physical storage slot in the simulation state.
    SlotId,
    "s"
);
