//! Semantic analysis and code generation core for the ASL compiler.
//!
//! This crate owns the three passes that turn a checked AST into an
//! instruction listing — [`passes::symbol_pass`], [`passes::typecheck_pass`],
//! [`passes::codegen_pass`] — and the substrates they share: [`types`],
//! [`symbols`], [`decorations`], [`instr`]. Lexing and parsing are an
//! external collaborator's concern; this crate's public input is
//! [`ast::Program`].

pub mod ast;
pub mod config;
pub mod decorations;
pub mod diagnostics;
pub mod instr;
pub mod node;
pub mod passes;
pub mod symbols;
pub mod types;

use passes::codegen_pass::CodeGenPass;
use passes::symbol_pass::SymbolPass;
use passes::typecheck_pass::TypeCheckPass;

pub use config::CompilerConfig;
pub use diagnostics::{Diagnostic, DiagnosticKind};
pub use instr::Listing;

/// Runs the three passes in order and returns the emitted listing, or the
/// sorted diagnostics if `TypeCheckPass` found any error. Per §4.8,
/// `CodeGenPass` is skipped entirely whenever the shared sink is non-empty —
/// the whole listing is withheld rather than emitted per-function.
pub fn compile(program: &ast::Program, config: &CompilerConfig) -> Result<Listing, Vec<Diagnostic>> {
    let mut types = types::TypeRegistry::new();
    let mut symbols = symbols::SymbolTable::new();
    let mut decorations = decorations::DecorationStore::new();
    let mut sink = diagnostics::ErrorSink::new();

    SymbolPass::run(
        program,
        &mut types,
        &mut symbols,
        &mut decorations,
        &mut sink,
        config,
    );
    TypeCheckPass::run(
        program,
        &mut types,
        &mut symbols,
        &mut decorations,
        &mut sink,
        config,
    );

    if !sink.is_empty() {
        return Err(sink.into_sorted());
    }

    Ok(CodeGenPass::run(program, &mut types, &mut symbols, &mut decorations))
}
