//! Storage layout and the variable containment closure.
//!
//! [`StorageLayout::build`] is the first half of graph building. It
//! validates the variable namespace, merges variables that share storage
//! (duplicate declarations and structural connections), assigns every
//! variable a [`Location`], and caches for each variable the full set of
//! variables it is dependency-equivalent to.
//!
//! Every root variable tree is one run of bits. Fields are packed into
//! their parent in declaration order and slices are windows at their own
//! offsets, so both alias the parent's bits. Connecting two variables
//! pins their trees at fixed offsets from each other within one slot.
//!
//! Two variables conflict when their bits overlap, so a write to `a.b`
//! conflicts with reads of `a`, `a.b`, and `a.b.c`, and overlapping slices
//! of one signal conflict while disjoint ones don't.

use std::collections::{BTreeMap, HashMap};

use tempo_common::{Ident, Interner};
use tracing::debug;

use crate::error::ScheduleError;
use crate::ids::{SlotId, VarId};
use crate::var::{VarKind, VarTable, MAX_WIDTH};

/// Where a variable's bits live.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Location {
    /// Backing storage slot.
    pub slot: SlotId,
    /// Lowest bit within the slot.
    pub lo: u32,
    /// Number of bits.
    pub width: u32,
}

impl Location {
    fn overlaps(&self, other: &Location) -> bool {
        self.slot == other.slot
            && self.lo < other.lo + other.width
            && other.lo < self.lo + self.width
    }
}

/// Resolved storage for every variable plus the cached containment closure.
#[derive(Clone, Debug)]
pub struct StorageLayout {
    locations: Vec<Location>,
    conflicts: Vec<Vec<VarId>>,
    slot_count: usize,
}

impl StorageLayout {
    /// Validates the namespace and computes storage and containment.
    ///
    /// Fails with [`ScheduleError::AliasAmbiguity`] when two declarations
    /// cannot be reconciled, and with `InvalidVariable`/`InvalidConnection`
    /// for malformed declarations.
    pub fn build(vars: &VarTable, interner: &Interner) -> Result<Self, ScheduleError> {
        validate_declarations(vars, interner)?;
        check_struct_names(vars, interner)?;

        let anchors = anchor_all(vars, interner)?;
        let mut placement = Placement::new(vars.len());
        merge_duplicate_paths(vars, interner, &anchors, &mut placement)?;
        for &(a, b) in vars.connections() {
            connect(vars, interner, &anchors, &mut placement, a, b)?;
        }

        let (locations, slot_count) = assign_slots(vars, interner, &anchors, &mut placement)?;
        let conflicts = containment_closure(&locations, slot_count);

        debug!(
            variables = vars.len(),
            slots = slot_count,
            connections = vars.connections().len(),
            "storage layout built"
        );

        Ok(Self {
            locations,
            conflicts,
            slot_count,
        })
    }

    /// Returns the storage location of a variable.
    pub fn location(&self, var: VarId) -> Location {
        self.locations[var.index()]
    }

    /// All locations, indexed by variable.
    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    /// Number of distinct storage slots.
    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    /// Variables dependency-equivalent to `var`, including `var` itself,
    /// sorted by ID.
    pub fn conflicts(&self, var: VarId) -> &[VarId] {
        &self.conflicts[var.index()]
    }

    /// Returns `true` if a write to `a` is visible through `b` or vice versa.
    pub fn conflict(&self, a: VarId, b: VarId) -> bool {
        self.conflicts(a).binary_search(&b).is_ok()
    }
}

fn path(vars: &VarTable, interner: &Interner, id: VarId) -> String {
    interner.resolve(vars.get(id).path).to_string()
}

fn validate_declarations(vars: &VarTable, interner: &Interner) -> Result<(), ScheduleError> {
    for var in vars.iter() {
        let invalid = |reason: String| ScheduleError::InvalidVariable {
            path: interner.resolve(var.path).to_string(),
            reason,
        };
        if var.width == 0 || var.width > MAX_WIDTH {
            return Err(invalid(format!(
                "width {} is outside 1..={MAX_WIDTH}",
                var.width
            )));
        }
        if let Some(parent) = var.parent() {
            // Parents are declared before their children.
            if parent >= var.id {
                return Err(ScheduleError::UnknownVariable(parent));
            }
        }
        if let VarKind::Slice { parent, lo, hi } = var.kind {
            let parent_width = vars.get(parent).width;
            if lo >= hi || hi > parent_width {
                return Err(invalid(format!(
                    "slice [{lo}:{hi}] does not fit a {parent_width}-bit parent"
                )));
            }
        }
    }
    Ok(())
}

/// Two members of one variable tree whose struct types share a display
/// name but differ in layout cannot be told apart by name.
fn check_struct_names(vars: &VarTable, interner: &Interner) -> Result<(), ScheduleError> {
    let mut seen: HashMap<(VarId, Ident), VarId> = HashMap::new();
    for var in vars.iter() {
        let root = vars.root_of(var.id);
        match seen.get(&(root, var.ty.name)) {
            Some(&first) if vars.get(first).ty.layout != var.ty.layout => {
                let ty = interner.resolve(var.ty.name);
                return Err(ScheduleError::AliasAmbiguity {
                    path: path(vars, interner, root),
                    first: format!("`{}` of type `{ty}`", path(vars, interner, first)),
                    second: format!(
                        "`{}` of a different type also named `{ty}`",
                        path(vars, interner, var.id)
                    ),
                });
            }
            Some(_) => {}
            None => {
                seen.insert((root, var.ty.name), var.id);
            }
        }
    }
    Ok(())
}

/// A variable's position relative to the root of its tree.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Anchor {
    root: VarId,
    offset: u32,
}

/// Places every variable inside its root.
///
/// Fields take consecutive offsets in declaration order; a field name
/// declared twice under one parent reuses its first offset. The fields of
/// a parent must fit in its width.
fn anchor_all(vars: &VarTable, interner: &Interner) -> Result<Vec<Anchor>, ScheduleError> {
    let mut anchors: Vec<Anchor> = Vec::with_capacity(vars.len());
    // Per parent: bits used so far and the offset of each field name.
    let mut packing: HashMap<VarId, (u32, HashMap<Ident, u32>)> = HashMap::new();
    for var in vars.iter() {
        let anchor = match var.kind {
            VarKind::Root => Anchor {
                root: var.id,
                offset: 0,
            },
            VarKind::Slice { parent, lo, .. } => {
                let base = anchors[parent.index()];
                Anchor {
                    root: base.root,
                    offset: base.offset + lo,
                }
            }
            VarKind::Field { parent } => {
                let (used, names) = packing.entry(parent).or_default();
                let lo = match names.get(&var.name) {
                    Some(&lo) => lo,
                    None => {
                        let lo = *used;
                        *used += var.width;
                        names.insert(var.name, lo);
                        lo
                    }
                };
                let parent_width = vars.get(parent).width;
                if *used > parent_width {
                    return Err(ScheduleError::InvalidVariable {
                        path: path(vars, interner, parent),
                        reason: format!(
                            "fields need {} bits but the parent is {parent_width} bits wide",
                            *used
                        ),
                    });
                }
                let base = anchors[parent.index()];
                Anchor {
                    root: base.root,
                    offset: base.offset + lo,
                }
            }
        };
        anchors.push(anchor);
    }
    Ok(anchors)
}

/// Declarations of the same path are the same storage if their types agree.
fn merge_duplicate_paths(
    vars: &VarTable,
    interner: &Interner,
    anchors: &[Anchor],
    placement: &mut Placement,
) -> Result<(), ScheduleError> {
    let mut by_path: BTreeMap<Ident, VarId> = BTreeMap::new();
    for var in vars.iter() {
        match by_path.get(&var.path) {
            Some(&first) => {
                let other = vars.get(first);
                let ambiguous = |second: String| ScheduleError::AliasAmbiguity {
                    path: interner.resolve(var.path).to_string(),
                    first: format!("declared as `{}`", interner.resolve(other.ty.name)),
                    second,
                };
                if other.ty != var.ty || other.width != var.width {
                    return Err(ambiguous(format!(
                        "redeclared as a different `{}`",
                        interner.resolve(var.ty.name)
                    )));
                }
                if !placement.pin(anchors[first.index()], anchors[var.id.index()]) {
                    return Err(ambiguous("redeclared at a different position".to_string()));
                }
            }
            None => {
                by_path.insert(var.path, var.id);
            }
        }
    }
    Ok(())
}

/// Pins two variables onto the same bits, then checks their same-named
/// fields line up.
fn connect(
    vars: &VarTable,
    interner: &Interner,
    anchors: &[Anchor],
    placement: &mut Placement,
    a: VarId,
    b: VarId,
) -> Result<(), ScheduleError> {
    for id in [a, b] {
        if !vars.contains(id) {
            return Err(ScheduleError::UnknownVariable(id));
        }
    }
    let mut pending = vec![(a, b)];
    while let Some((a, b)) = pending.pop() {
        let reject = |reason: &str| ScheduleError::InvalidConnection {
            a: path(vars, interner, a),
            b: path(vars, interner, b),
            reason: reason.to_string(),
        };
        let (va, vb) = (vars.get(a), vars.get(b));
        if va.width != vb.width {
            return Err(reject(&format!("widths differ ({} vs {})", va.width, vb.width)));
        }
        if vars.is_ancestor_or_equal(a, b) || vars.is_ancestor_or_equal(b, a) {
            return Err(reject("one endpoint contains the other"));
        }
        if va.ty.name != vb.ty.name {
            let a_fields = field_names(vars, a);
            let b_fields = field_names(vars, b);
            if !a_fields.is_empty() || !b_fields.is_empty() {
                return Err(reject("struct types differ"));
            }
        }
        if !placement.pin(anchors[a.index()], anchors[b.index()]) {
            return Err(reject("earlier connections already place these bits apart"));
        }

        let b_fields = field_names(vars, b);
        for (name, fa) in field_names(vars, a) {
            match b_fields.get(&name) {
                Some(&fb) => pending.push((fa, fb)),
                None => {
                    return Err(reject(&format!(
                        "field `{}` has no counterpart",
                        interner.resolve(name)
                    )))
                }
            }
        }
    }
    Ok(())
}

fn field_names(vars: &VarTable, id: VarId) -> BTreeMap<Ident, VarId> {
    vars.children(id)
        .iter()
        .filter(|&&c| matches!(vars.get(c).kind, VarKind::Field { .. }))
        .map(|&c| (vars.get(c).name, c))
        .collect()
}

/// Disjoint sets of root variables, each root carrying its bit offset from
/// the set's representative.
///
/// Invariant: `bit(x) = bit(parent[x]) + delta[x]`, with the representative
/// at a relative bit of 0.
struct Placement {
    parent: Vec<usize>,
    delta: Vec<i64>,
}

impl Placement {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
            delta: vec![0; len],
        }
    }

    /// Returns the representative of `x` and the offset of `x` from it.
    fn find(&mut self, x: usize) -> (usize, i64) {
        let mut path = Vec::new();
        let mut cur = x;
        while self.parent[cur] != cur {
            path.push(cur);
            cur = self.parent[cur];
        }
        // Compress from the node nearest the representative outwards.
        for &node in path.iter().rev() {
            let up = self.parent[node];
            if up != cur {
                self.delta[node] += self.delta[up];
            }
            self.parent[node] = cur;
        }
        let offset = if x == cur { 0 } else { self.delta[x] };
        (cur, offset)
    }

    /// Requires `a` and `b` to occupy the same bits. Returns `false` when
    /// earlier pins already place them apart. The smaller representative
    /// wins so results don't depend on pin order.
    fn pin(&mut self, a: Anchor, b: Anchor) -> bool {
        let (ra, da) = self.find(a.root.index());
        let (rb, db) = self.find(b.root.index());
        // bit(ra) + da + a.offset == bit(rb) + db + b.offset
        let skew = da + i64::from(a.offset) - db - i64::from(b.offset);
        if ra == rb {
            return skew == 0;
        }
        if ra < rb {
            self.parent[rb] = ra;
            self.delta[rb] = skew;
        } else {
            self.parent[ra] = rb;
            self.delta[ra] = -skew;
        }
        true
    }
}

/// Gives each placement set one slot, numbered by first root, and turns
/// every anchor into a [`Location`].
fn assign_slots(
    vars: &VarTable,
    interner: &Interner,
    anchors: &[Anchor],
    placement: &mut Placement,
) -> Result<(Vec<Location>, usize), ScheduleError> {
    // Per set: lowest and highest relative bit, and the roots at each end.
    let mut extent: HashMap<usize, (i64, VarId, i64, VarId)> = HashMap::new();
    let mut slots: HashMap<usize, SlotId> = HashMap::new();
    for var in vars.iter().filter(|v| matches!(v.kind, VarKind::Root)) {
        let (rep, offset) = placement.find(var.id.index());
        let end = offset + i64::from(var.width);
        let next = slots.len() as u32;
        slots.entry(rep).or_insert_with(|| SlotId::from_raw(next));
        let span = extent.entry(rep).or_insert((offset, var.id, end, var.id));
        if offset < span.0 {
            span.0 = offset;
            span.1 = var.id;
        }
        if end > span.2 {
            span.2 = end;
            span.3 = var.id;
        }
    }
    for &(lo, low_root, hi, high_root) in extent.values() {
        if hi - lo > i64::from(MAX_WIDTH) {
            return Err(ScheduleError::InvalidConnection {
                a: path(vars, interner, low_root),
                b: path(vars, interner, high_root),
                reason: format!(
                    "connected bits span {} bits; a slot holds at most {MAX_WIDTH}",
                    hi - lo
                ),
            });
        }
    }

    let mut locations = Vec::with_capacity(vars.len());
    for var in vars.iter() {
        let anchor = anchors[var.id.index()];
        let (rep, root_offset) = placement.find(anchor.root.index());
        let base = extent.get(&rep).map_or(0, |span| span.0);
        let slot = slots
            .get(&rep)
            .copied()
            .ok_or(ScheduleError::UnknownVariable(anchor.root))?;
        locations.push(Location {
            slot,
            lo: (root_offset - base) as u32 + anchor.offset,
            width: var.width,
        });
    }
    Ok((locations, slots.len()))
}

/// Computes, for every variable, the sorted list of variables whose bits
/// overlap its own.
///
/// A field or slice always lies inside its parent's bits, so ancestors are
/// covered without walking the tree.
fn containment_closure(locations: &[Location], slot_count: usize) -> Vec<Vec<VarId>> {
    let mut by_slot: Vec<Vec<VarId>> = vec![Vec::new(); slot_count];
    for (i, loc) in locations.iter().enumerate() {
        by_slot[loc.slot.index()].push(VarId::from_raw(i as u32));
    }

    locations
        .iter()
        .map(|loc| {
            // IDs were pushed in ascending order, so the filter stays sorted.
            by_slot[loc.slot.index()]
                .iter()
                .copied()
                .filter(|other| loc.overlaps(&locations[other.index()]))
                .collect()
        })
        .collect()
}
