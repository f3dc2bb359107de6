//! The build context: everything the scheduler needs to know about a design.
//!
//! A [`Design`] is filled in by the elaboration front-end and then handed to
//! [`build_schedule`](crate::build_schedule). Registration never fails;
//! every declaration is validated once, when the schedule is built.

use tempo_common::{Ident, Interner};
use tempo_config::SchedConfig;
use tempo_diagnostics::DiagnosticSink;

use crate::arena::Arena;
use crate::block::{BlockSpec, UpdateBlock};
use crate::constraint::{Constraint, Target};
use crate::error::ScheduleError;
use crate::ids::{BlockId, MethodId, VarId};
use crate::pipeline::{self, CompiledOrder};
use crate::var::{TypeTag, VarKind, VarTable, Variable};

/// A method other blocks can be ordered against.
///
/// Methods are never executed by the driver. For ordering purposes a method
/// stands for the blocks bound to it: the blocks that call it and any block
/// tied to it by an `equal` constraint.
#[derive(Clone, Debug)]
pub struct Method {
    /// Registration ID.
    pub id: MethodId,
    /// Declared name.
    pub name: Ident,
}

/// An elaborated design awaiting scheduling.
#[derive(Default)]
pub struct Design {
    pub(crate) interner: Interner,
    pub(crate) vars: VarTable,
    pub(crate) blocks: Arena<BlockId, UpdateBlock>,
    pub(crate) methods: Arena<MethodId, Method>,
    pub(crate) constraints: Vec<Constraint>,
}

impl Design {
    /// Creates an empty design.
    pub fn new() -> Self {
        Self::default()
    }

    /// The plain bit-vector type of `width` bits.
    pub fn bits_type(&self, width: u32) -> TypeTag {
        TypeTag::bits(&self.interner, width)
    }

    /// A struct type with the given name and ordered field types.
    pub fn struct_type(&self, name: &str, fields: &[(&str, TypeTag)]) -> TypeTag {
        TypeTag::structure(&self.interner, name, fields)
    }

    /// Declares a top-level bit-vector variable initialized to zero.
    pub fn declare(&mut self, path: &str, width: u32) -> VarId {
        self.declare_with_init(path, width, 0)
    }

    /// Declares a top-level bit-vector variable with an initial value.
    pub fn declare_with_init(&mut self, path: &str, width: u32, init: u64) -> VarId {
        let ty = self.bits_type(width);
        self.push_var(path, path, VarKind::Root, ty, width, init)
    }

    /// Declares a top-level variable of a struct type.
    pub fn declare_struct(&mut self, path: &str, ty: TypeTag, width: u32) -> VarId {
        self.push_var(path, path, VarKind::Root, ty, width, 0)
    }

    /// Declares a bit-vector field `name` of `parent`.
    pub fn field(&mut self, parent: VarId, name: &str, width: u32) -> VarId {
        let ty = self.bits_type(width);
        self.struct_field(parent, name, ty, width)
    }

    /// Declares a field `name` of `parent` with an explicit type.
    pub fn struct_field(&mut self, parent: VarId, name: &str, ty: TypeTag, width: u32) -> VarId {
        let path = format!("{}.{name}", self.parent_path(parent));
        self.push_var(&path, name, VarKind::Field { parent }, ty, width, 0)
    }

    /// Declares the bit window `parent[lo:hi]`, `hi` exclusive.
    pub fn slice(&mut self, parent: VarId, lo: u32, hi: u32) -> VarId {
        let suffix = format!("[{lo}:{hi}]");
        let path = format!("{}{suffix}", self.parent_path(parent));
        let width = hi.saturating_sub(lo);
        let ty = self.bits_type(width);
        self.push_var(&path, &suffix, VarKind::Slice { parent, lo, hi }, ty, width, 0)
    }

    /// Structurally connects two variables so that they share storage.
    pub fn connect(&mut self, a: VarId, b: VarId) {
        self.vars.connect(a, b);
    }

    /// Registers a method.
    pub fn add_method(&mut self, name: &str) -> MethodId {
        let name = self.interner.get_or_intern(name);
        self.methods.alloc_with(|id| Method { id, name })
    }

    /// Registers an update block. Registration order is the scheduler's
    /// tie-break order.
    pub fn add_block(&mut self, spec: BlockSpec) -> BlockId {
        let name = self.interner.get_or_intern(&spec.name);
        self.blocks.alloc_with(|id| spec.into_block(id, name))
    }

    /// Adds an explicit ordering constraint.
    pub fn add_constraint(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    /// Looks up the first variable declared at `path`.
    pub fn var(&self, path: &str) -> Option<VarId> {
        let ident = self.interner.get(path)?;
        self.vars.iter().find(|v| v.path == ident).map(|v| v.id)
    }

    /// Returns the full path of a variable.
    pub fn path(&self, var: VarId) -> &str {
        self.interner.resolve(self.vars.get(var).path)
    }

    /// Returns `true` if the variable at `a` is the one at `b` or one of its
    /// structural ancestors. Unknown paths are never related.
    pub fn is_ancestor_or_equal(&self, a: &str, b: &str) -> bool {
        match (self.var(a), self.var(b)) {
            (Some(a), Some(b)) => self.vars.is_ancestor_or_equal(a, b),
            _ => false,
        }
    }

    /// Returns the declared name of a block.
    pub fn block_name(&self, id: BlockId) -> &str {
        self.interner.resolve(self.blocks[id].name)
    }

    /// Returns the declared name of a method.
    pub fn method_name(&self, id: MethodId) -> &str {
        self.interner.resolve(self.methods[id].name)
    }

    /// Number of registered update blocks.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// The variable namespace.
    pub fn vars(&self) -> &VarTable {
        &self.vars
    }

    /// The interner holding every name in this design.
    pub fn interner(&self) -> &Interner {
        &self.interner
    }

    /// Runs the scheduling pipeline without consuming the design.
    ///
    /// Block bodies are executed against a snapshot of the initial state
    /// when candidate cycles need disambiguation, which is why this takes
    /// `&mut self`. The design's own state is not affected, so compiling
    /// twice yields the same order.
    pub fn compile_order(
        &mut self,
        config: &SchedConfig,
        sink: &DiagnosticSink,
    ) -> Result<CompiledOrder, ScheduleError> {
        pipeline::compile(self, config, sink)
    }

    /// Checks that every reference in the design resolves.
    pub(crate) fn validate_references(&self) -> Result<(), ScheduleError> {
        for block in self.blocks.values() {
            for &var in block.reads.iter().chain(&block.writes) {
                if !self.vars.contains(var) {
                    return Err(ScheduleError::UnknownVariable(var));
                }
            }
            for &method in &block.calls {
                if !self.methods.contains(method) {
                    return Err(ScheduleError::UnknownMethod(method));
                }
            }
        }
        for constraint in &self.constraints {
            for target in constraint.targets() {
                match target {
                    Target::Block(id) if !self.blocks.contains(id) => {
                        return Err(ScheduleError::UnknownBlock(id));
                    }
                    Target::Method(id) if !self.methods.contains(id) => {
                        return Err(ScheduleError::UnknownMethod(id));
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }

    fn parent_path(&self, parent: VarId) -> String {
        match self.vars.try_get(parent) {
            Some(var) => self.interner.resolve(var.path).to_string(),
            None => parent.to_string(),
        }
    }

    fn push_var(
        &mut self,
        path: &str,
        name: &str,
        kind: VarKind,
        ty: TypeTag,
        width: u32,
        init: u64,
    ) -> VarId {
        self.vars.add(Variable {
            id: VarId::from_raw(0),
            path: self.interner.get_or_intern(path),
            name: self.interner.get_or_intern(name),
            kind,
            ty,
            width,
            init,
        })
    }
}
