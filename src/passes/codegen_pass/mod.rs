//! CodeGenPass (§4.7)
//!
//! Re-enters each scope SymbolPass built and lowers the checked tree into a
//! [`Listing`]. Split into `state` (per-function lowering context),
//! `expr` (expression lowering), and `stmt` (statement lowering), the same
//! submodule split the teacher's `codegen/` directory uses
//! (`state.rs`/`program.rs`/`words.rs` there, `state.rs`/`expr.rs`/`stmt.rs`
//! here since ASL's statement and expression grammars are far smaller than
//! Seq's word-at-a-time model).

mod expr;
mod state;
mod stmt;

use tracing::{debug, info_span};

use crate::ast::Program;
use crate::decorations::DecorationStore;
use crate::instr::{Instruction, Listing, Subroutine};
use crate::symbols::SymbolTable;
use crate::types::TypeRegistry;

use state::Lowering;

pub struct CodeGenPass;

impl CodeGenPass {
    pub fn run(
        program: &Program,
        types: &mut TypeRegistry,
        symbols: &mut SymbolTable,
        decorations: &mut DecorationStore,
    ) -> Listing {
        let span = info_span!("code_gen_pass");
        let _enter = span.enter();
        debug!(functions = program.functions.len(), "code_gen_pass: enter");

        let mut listing = Listing::new();
        for function in &program.functions {
            listing.push(Self::visit_function(function, types, symbols, decorations));
        }

        debug!("code_gen_pass: exit");
        listing
    }

    fn visit_function(
        function: &crate::ast::FunctionDef,
        types: &mut TypeRegistry,
        symbols: &mut SymbolTable,
        decorations: &mut DecorationStore,
    ) -> Subroutine {
        let scope = decorations
            .scope(function.id)
            .expect("symbol_pass records a scope for every function");
        symbols.push_this_scope(scope);

        let func_ty = decorations
            .ty(function.id)
            .expect("symbol_pass records a function type for every function");
        let return_type = types
            .return_type(func_ty)
            .expect("function type carries a return type");

        let mut sub = Subroutine::new(function.name.clone());
        if !types.is_void(return_type) {
            sub.push_param("_result");
        }
        for decl in &function.params {
            for name in decl.names() {
                sub.push_param(name.clone());
            }
        }
        for decl in &function.decls {
            for name in decl.names() {
                let symbol = symbols
                    .lookup(name)
                    .expect("symbol_pass registers every declared local");
                sub.push_local(name.clone(), types.size_of(symbol.ty));
            }
        }

        let mut lowering = Lowering::new(types, symbols, decorations, return_type);
        for stmt in &function.stmts {
            lowering.lower_stmt(stmt);
        }
        lowering.emit(Instruction::ret());
        sub.extend(lowering.take_body());

        symbols.pop_scope();
        sub
    }
}
