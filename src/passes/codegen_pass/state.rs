//! Per-function lowering state (§4.7)
//!
//! Mirrors the teacher's `codegen/state.rs`: a single mutable context
//! threaded through expression and statement lowering rather than
//! module-global state, holding the counters (reset per function) and the
//! instruction buffer being built.

use crate::ast::Expr;
use crate::decorations::DecorationStore;
use crate::instr::{Counters, Instruction, Opcode};
use crate::symbols::{SymbolKind, SymbolTable};
use crate::types::{TypeId, TypeRegistry};

pub(crate) struct Lowering<'a> {
    pub types: &'a mut TypeRegistry,
    pub symbols: &'a mut SymbolTable,
    pub decorations: &'a mut DecorationStore,
    pub counters: Counters,
    pub return_type: TypeId,
    body: Vec<Instruction>,
}

impl<'a> Lowering<'a> {
    pub fn new(
        types: &'a mut TypeRegistry,
        symbols: &'a mut SymbolTable,
        decorations: &'a mut DecorationStore,
        return_type: TypeId,
    ) -> Self {
        Lowering {
            types,
            symbols,
            decorations,
            counters: Counters::new(),
            return_type,
            body: Vec::new(),
        }
    }

    pub fn emit(&mut self, instr: Instruction) {
        self.body.push(instr);
    }

    pub fn take_body(self) -> Vec<Instruction> {
        self.body
    }

    pub fn fresh_temp(&mut self) -> String {
        self.counters.fresh_temp()
    }

    /// A symbol's slot already holds a base address when it is a parameter:
    /// arrays are passed by base address (§4.1), so reading "the array" out
    /// of a parameter slot means loading that address rather than treating
    /// the parameter name itself as the base (§4.7).
    pub fn is_parameter(&self, name: &str) -> bool {
        self.symbols
            .lookup(name)
            .map(|s| s.kind == SymbolKind::Parameter)
            .unwrap_or(false)
    }

    /// Resolves `name` (an array-typed identifier) to an operand naming its
    /// base address, materializing a `LOAD` through the parameter slot when
    /// needed.
    pub fn array_base(&mut self, name: &str) -> String {
        if self.is_parameter(name) {
            let temp = self.fresh_temp();
            self.emit(Instruction::new(
                Opcode::Load,
                vec![temp.clone(), name.to_string()],
            ));
            temp
        } else {
            name.to_string()
        }
    }

    /// Takes the address of a local array to pass it as a call argument
    /// (§4.7's "push its base address via ALOAD"). A parameter's slot
    /// already holds that address, so only a plain `LOAD` is needed there.
    pub fn array_base_for_call(&mut self, name: &str) -> String {
        if self.is_parameter(name) {
            let temp = self.fresh_temp();
            self.emit(Instruction::new(
                Opcode::Load,
                vec![temp.clone(), name.to_string()],
            ));
            temp
        } else {
            let temp = self.fresh_temp();
            self.emit(Instruction::new(
                Opcode::ALoad,
                vec![temp.clone(), name.to_string()],
            ));
            temp
        }
    }

    /// Coerces `addr` (the already-lowered value of `expr`) to float when
    /// `expr`'s static type is integer, reusing a fresh temp (§4.7).
    pub fn coerce_to_float(&mut self, expr: &Expr, addr: &str) -> String {
        let ty = self
            .decorations
            .ty(expr.id())
            .expect("type_check_pass sets a type on every expression");
        if self.types.is_integer(ty) {
            let temp = self.fresh_temp();
            self.emit(Instruction::new(
                Opcode::Float,
                vec![temp.clone(), addr.to_string()],
            ));
            temp
        } else {
            addr.to_string()
        }
    }

    pub fn write_opcode_for(&self, ty: TypeId) -> Opcode {
        if self.types.is_float(ty) {
            Opcode::WriteF
        } else if self.types.is_character(ty) {
            Opcode::WriteC
        } else {
            Opcode::WriteI
        }
    }

    pub fn read_opcode_for(&self, ty: TypeId) -> Opcode {
        if self.types.is_float(ty) {
            Opcode::ReadF
        } else if self.types.is_character(ty) {
            Opcode::ReadC
        } else {
            Opcode::ReadI
        }
    }
}

/// Quotes an immediate's literal text the way the listing format does,
/// e.g. `ILOAD %0,"2"`.
pub(crate) fn quoted(text: impl std::fmt::Display) -> String {
    format!("\"{text}\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decorations::DecorationStore;
    use crate::node::NodeId;
    use crate::symbols::SymbolTable;
    use crate::types::TypeRegistry;

    #[test]
    fn array_base_loads_through_parameter_but_not_local() {
        let mut types = TypeRegistry::new();
        let mut symbols = SymbolTable::new();
        let mut decorations = DecorationStore::new();
        symbols
            .declare(
                "p",
                SymbolKind::Parameter,
                types.create_array(3, types.integer()),
                NodeId(0),
            )
            .unwrap();
        symbols
            .declare(
                "l",
                SymbolKind::Variable,
                types.create_array(3, types.integer()),
                NodeId(1),
            )
            .unwrap();

        let ret = types.void();
        let mut ctx = Lowering::new(&mut types, &mut symbols, &mut decorations, ret);
        let base = ctx.array_base("p");
        assert_eq!(base, "%0");
        let base2 = ctx.array_base("l");
        assert_eq!(base2, "l");
        assert_eq!(ctx.take_body().len(), 1);
    }

    #[test]
    fn quoted_wraps_literal_text() {
        assert_eq!(quoted(2), "\"2\"");
        assert_eq!(quoted("a"), "\"a\"");
    }
}
