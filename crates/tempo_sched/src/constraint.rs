//! Explicit ordering constraints between blocks and methods.

use crate::ids::{BlockId, MethodId};

/// One side of a constraint.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Target {
    /// A specific update block.
    Block(BlockId),
    /// A method, standing for every block bound to it.
    Method(MethodId),
}

impl From<BlockId> for Target {
    fn from(id: BlockId) -> Self {
        Target::Block(id)
    }
}

impl From<MethodId> for Target {
    fn from(id: MethodId) -> Self {
        Target::Method(id)
    }
}

/// How the two sides of a constraint relate.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ConstraintKind {
    /// `lhs` runs strictly before `rhs`.
    Before,
    /// `lhs` and `rhs` share a priority: constraints on either apply to both,
    /// and the order between them is free.
    Equal,
}

/// An explicit ordering edge supplied by the design.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Constraint {
    /// The relation.
    pub kind: ConstraintKind,
    /// Left-hand side.
    pub lhs: Target,
    /// Right-hand side.
    pub rhs: Target,
}

impl Constraint {
    /// `first` must run before `second`.
    pub fn before(first: impl Into<Target>, second: impl Into<Target>) -> Self {
        Self {
            kind: ConstraintKind::Before,
            lhs: first.into(),
            rhs: second.into(),
        }
    }

    /// `second` must run after `first`; the same as `before(first, second)`.
    pub fn after(second: impl Into<Target>, first: impl Into<Target>) -> Self {
        Self::before(first, second)
    }

    /// `a` and `b` are co-scheduled at the same priority.
    pub fn equal(a: impl Into<Target>, b: impl Into<Target>) -> Self {
        Self {
            kind: ConstraintKind::Equal,
            lhs: a.into(),
            rhs: b.into(),
        }
    }

    /// Both sides, left first.
    pub fn targets(&self) -> [Target; 2] {
        [self.lhs, self.rhs]
    }
}
