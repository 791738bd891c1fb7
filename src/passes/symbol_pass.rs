//! SymbolPass (§4.5)
//!
//! Walks the program once, opening a scope per function and registering its
//! parameters, locals, and the function symbol itself in the enclosing
//! (global) scope. Grounded on the teacher's `resolver.rs` in traversal
//! shape (walk, accumulate into shared maps, report duplicates through a
//! shared sink) rather than its include-resolution content.

use tracing::{debug, info_span, warn};

use crate::ast::{Declaration, FunctionDef, Program};
use crate::config::CompilerConfig;
use crate::decorations::DecorationStore;
use crate::diagnostics::{DiagnosticKind, ErrorSink};
use crate::symbols::{SymbolKind, SymbolTable};
use crate::types::{TypeId, TypeRegistry};

pub struct SymbolPass;

impl SymbolPass {
    pub fn run(
        program: &Program,
        types: &mut TypeRegistry,
        symbols: &mut SymbolTable,
        decorations: &mut DecorationStore,
        sink: &mut ErrorSink,
        config: &CompilerConfig,
    ) {
        let span = info_span!("symbol_pass");
        let _enter = span.enter();
        debug!(functions = program.functions.len(), "symbol_pass: enter");

        for function in &program.functions {
            Self::visit_function(function, types, symbols, decorations, sink, config);
        }

        debug!("symbol_pass: exit");
    }

    fn visit_function(
        function: &FunctionDef,
        types: &mut TypeRegistry,
        symbols: &mut SymbolTable,
        decorations: &mut DecorationStore,
        sink: &mut ErrorSink,
        config: &CompilerConfig,
    ) {
        if let Some(existing) = symbols.lookup_global(&function.name) {
            let message = format!("`{}` is already declared", function.name);
            warn!(name = %function.name, "duplicate function declaration");
            sink.report(
                DiagnosticKind::DeclaredIdent,
                message,
                function.id,
                function.span,
            );
            let _ = existing;
        }

        let scope = symbols.push_new_scope();
        decorations.set_scope(function.id, scope);

        let mut param_types = Vec::with_capacity(function.params.len());
        for decl in &function.params {
            param_types.extend(Self::visit_declaration(
                decl,
                SymbolKind::Parameter,
                types,
                symbols,
                decorations,
                sink,
                config,
            ));
        }

        let return_type = match &function.return_type {
            Some(node) => {
                let ty = types.primitive_for(node.kind);
                decorations.set_type(node.id, ty);
                ty
            }
            None => types.void(),
        };

        for decl in &function.decls {
            Self::visit_declaration(
                decl,
                SymbolKind::Variable,
                types,
                symbols,
                decorations,
                sink,
                config,
            );
        }

        symbols.pop_scope();

        let func_type = types.create_function(param_types, return_type);
        decorations.set_type(function.id, func_type);

        if symbols
            .declare_global(
                &function.name,
                SymbolKind::Function,
                func_type,
                function.id,
            )
            .is_err()
        {
            // Already reported above; §4.5 calls for one diagnostic per
            // root cause, so the registration failure itself stays silent.
        }
    }

    /// Registers every name in `decl` and returns the per-name type (so the
    /// caller can also use it to build the enclosing function's type).
    fn visit_declaration(
        decl: &Declaration,
        kind: SymbolKind,
        types: &mut TypeRegistry,
        symbols: &mut SymbolTable,
        decorations: &mut DecorationStore,
        sink: &mut ErrorSink,
        config: &CompilerConfig,
    ) -> Vec<TypeId> {
        let ty = match decl {
            Declaration::Basic { ty: ty_node, .. } => {
                let ty = types.primitive_for(ty_node.kind);
                decorations.set_type(ty_node.id, ty);
                ty
            }
            Declaration::Array {
                size,
                ty: ty_node,
                id,
                span,
                ..
            } => {
                let elem = types.primitive_for(ty_node.kind);
                decorations.set_type(ty_node.id, elem);

                let parsed = size.text.parse::<u32>();
                let count = match parsed {
                    Ok(n) if n > 0 && n <= config.max_array_size => n,
                    Ok(_) | Err(_) => {
                        warn!(size = %size.text, "invalid or oversized array size literal");
                        sink.report(
                            DiagnosticKind::IncompatibleAssignment,
                            format!("array size `{}` must be a positive integer no greater than {}", size.text, config.max_array_size),
                            *id,
                            *span,
                        );
                        1
                    }
                };
                types.create_array(count, elem)
            }
        };

        let mut result = Vec::with_capacity(decl.names().len());
        for name in decl.names() {
            if let Err(existing) = symbols.declare(name, kind, ty, decl.id()) {
                warn!(name = %name, "duplicate declaration in scope");
                sink.report(
                    DiagnosticKind::DeclaredIdent,
                    format!("`{name}` is already declared in this scope"),
                    decl.id(),
                    None,
                );
                let _ = existing;
            }
            result.push(ty);
        }
        result
    }
}
