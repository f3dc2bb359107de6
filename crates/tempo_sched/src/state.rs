//! Live simulation state and staged sequential writes.

use crate::alias::{Location, StorageLayout};
use crate::ids::VarId;
use crate::var::VarTable;

/// Bit mask covering the low `width` bits.
pub(crate) fn mask(width: u32) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

/// The values of every storage slot of a design.
///
/// Reads and writes go through a variable's [`Location`], so a write to a
/// slice only touches its window of the parent's slot and every value is
/// masked to its declared width.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimState {
    slots: Vec<u64>,
    locations: Vec<Location>,
}

impl SimState {
    /// Creates the initial state, applying declared initial values in
    /// declaration order.
    pub fn new(layout: &StorageLayout, vars: &VarTable) -> Self {
        let mut state = Self {
            slots: vec![0; layout.slot_count()],
            locations: layout.locations().to_vec(),
        };
        for var in vars.iter().filter(|v| v.init != 0) {
            state.write(var.id, var.init);
        }
        state
    }

    /// Returns the current value of a variable.
    pub fn read(&self, var: VarId) -> u64 {
        let loc = self.locations[var.index()];
        (self.slots[loc.slot.index()] >> loc.lo) & mask(loc.width)
    }

    /// Overwrites a variable, truncating `value` to its width.
    pub fn write(&mut self, var: VarId, value: u64) {
        let loc = self.locations[var.index()];
        let window = mask(loc.width) << loc.lo;
        let slot = &mut self.slots[loc.slot.index()];
        *slot = (*slot & !window) | ((value << loc.lo) & window);
    }

    /// Applies staged writes in the order they were staged.
    pub fn commit(&mut self, staged: &[StagedWrite]) {
        for update in staged {
            self.write(update.var, update.value);
        }
    }

    /// Number of variables this state can address.
    pub fn var_count(&self) -> usize {
        self.locations.len()
    }
}

/// A sequential write held back until the commit point.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StagedWrite {
    /// The variable being updated.
    pub var: VarId,
    /// The new value.
    pub value: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::var::{TypeTag, VarKind, Variable};
    use tempo_common::Interner;

    fn layout_with(
        decls: &[(&str, VarKind, u32, u64)],
    ) -> (VarTable, StorageLayout) {
        let interner = Interner::new();
        let mut vars = VarTable::new();
        for &(path, kind, width, init) in decls {
            vars.add(Variable {
                id: VarId::from_raw(0),
                path: interner.get_or_intern(path),
                name: interner.get_or_intern(path),
                kind,
                ty: TypeTag::bits(&interner, width),
                width,
                init,
            });
        }
        let layout = StorageLayout::build(&vars, &interner).unwrap();
        (vars, layout)
    }

    #[test]
    fn mask_edges() {
        assert_eq!(mask(1), 1);
        assert_eq!(mask(8), 0xff);
        assert_eq!(mask(64), u64::MAX);
    }

    #[test]
    fn writes_truncate_to_width() {
        let (vars, layout) = layout_with(&[("a", VarKind::Root, 4, 0)]);
        let mut state = SimState::new(&layout, &vars);
        let a = VarId::from_raw(0);
        state.write(a, 0x1f);
        assert_eq!(state.read(a), 0xf);
    }

    #[test]
    fn slice_writes_stay_in_window() {
        let x = VarId::from_raw(0);
        let (vars, layout) = layout_with(&[
            ("x", VarKind::Root, 16, 0xabcd),
            ("x[4:8]", VarKind::Slice { parent: x, lo: 4, hi: 8 }, 4, 0),
        ]);
        let mut state = SimState::new(&layout, &vars);
        let nibble = VarId::from_raw(1);
        assert_eq!(state.read(nibble), 0xc);
        state.write(nibble, 0x3);
        assert_eq!(state.read(x), 0xab3d);
    }

    #[test]
    fn initial_values_applied() {
        let (vars, layout) = layout_with(&[("r", VarKind::Root, 8, 42)]);
        let state = SimState::new(&layout, &vars);
        assert_eq!(state.read(VarId::from_raw(0)), 42);
        assert_eq!(state.var_count(), 1);
    }

    #[test]
    fn commit_applies_in_order() {
        let (vars, layout) = layout_with(&[("r", VarKind::Root, 8, 0)]);
        let mut state = SimState::new(&layout, &vars);
        let r = VarId::from_raw(0);
        state.commit(&[
            StagedWrite { var: r, value: 1 },
            StagedWrite { var: r, value: 2 },
        ]);
        assert_eq!(state.read(r), 2);
    }
}
