//! TypeCheckPass (§4.6)
//!
//! Re-enters each scope SymbolPass built (by the id SymbolPass recorded in
//! the decoration store) and decorates every expression with a type and an
//! l-value bit. Once a subexpression carries type `error`, checks that
//! depend on it are skipped and `error` is propagated rather than
//! double-reported — the same "one diagnostic per root cause" discipline
//! the teacher's `typechecker.rs` follows with its own `env`/side-table
//! shape, simplified here since ASL needs no unification or row
//! polymorphism.

use tracing::{debug, info_span, warn};

use crate::ast::{BinaryOp, Declaration, Expr, FunctionDef, Program, Statement, UnaryOp};
use crate::config::CompilerConfig;
use crate::decorations::DecorationStore;
use crate::diagnostics::{DiagnosticKind, ErrorSink};
use crate::node::NodeId;
use crate::symbols::{SymbolKind, SymbolTable};
use crate::types::{TypeId, TypeRegistry};

pub struct TypeCheckPass;

impl TypeCheckPass {
    pub fn run(
        program: &Program,
        types: &mut TypeRegistry,
        symbols: &mut SymbolTable,
        decorations: &mut DecorationStore,
        sink: &mut ErrorSink,
        config: &CompilerConfig,
    ) {
        let span = info_span!("type_check_pass");
        let _enter = span.enter();
        debug!(functions = program.functions.len(), "type_check_pass: enter");

        for function in &program.functions {
            Self::visit_function(function, types, symbols, decorations, sink);
        }

        Self::check_main(program, types, decorations, sink, config);

        debug!("type_check_pass: exit");
    }

    fn visit_function(
        function: &FunctionDef,
        types: &mut TypeRegistry,
        symbols: &mut SymbolTable,
        decorations: &mut DecorationStore,
        sink: &mut ErrorSink,
    ) {
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
        symbols.push_function_type(return_type);

        for stmt in &function.stmts {
            Self::check_stmt(stmt, types, symbols, decorations, sink, return_type);
        }

        symbols.pop_function_type();
        symbols.pop_scope();
    }

    fn check_expr(
        expr: &Expr,
        types: &mut TypeRegistry,
        symbols: &SymbolTable,
        decorations: &mut DecorationStore,
        sink: &mut ErrorSink,
    ) -> TypeId {
        let (ty, is_lvalue) = match expr {
            Expr::Ident { id, span, name } => match symbols.lookup(name) {
                None => {
                    warn!(name = %name, "undeclared identifier");
                    sink.report(
                        DiagnosticKind::UndeclaredIdent,
                        format!("`{name}` is not declared"),
                        *id,
                        *span,
                    );
                    (types.error(), true)
                }
                Some(symbol) => (symbol.ty, symbol.kind != SymbolKind::Function),
            },
            Expr::IntLit { .. } => (types.integer(), false),
            Expr::FloatLit { .. } => (types.float(), false),
            Expr::CharLit { .. } => (types.character(), false),
            Expr::BoolLit { .. } => (types.boolean(), false),
            Expr::Paren { inner, .. } => {
                let ty = Self::check_expr(inner, types, symbols, decorations, sink);
                (ty, decorations.is_lvalue(inner.id()))
            }
            Expr::Unary {
                id, span, op, operand,
            } => {
                let ot = Self::check_expr(operand, types, symbols, decorations, sink);
                let ty = if types.is_error(ot) {
                    types.error()
                } else {
                    match op {
                        UnaryOp::Not => {
                            if types.is_boolean(ot) {
                                types.boolean()
                            } else {
                                Self::incompatible_operator(sink, *id, *span);
                                types.error()
                            }
                        }
                        UnaryOp::Neg | UnaryOp::Plus => {
                            if types.is_numeric(ot) {
                                ot
                            } else {
                                Self::incompatible_operator(sink, *id, *span);
                                types.error()
                            }
                        }
                    }
                };
                (ty, false)
            }
            Expr::Binary {
                id, span, op, lhs, rhs,
            } => {
                let lt = Self::check_expr(lhs, types, symbols, decorations, sink);
                let rt = Self::check_expr(rhs, types, symbols, decorations, sink);
                let ty = Self::check_binary(*op, lt, rt, types, sink, *id, *span);
                (ty, false)
            }
            Expr::ArrayAccess {
                id, span, array, index,
            } => {
                let at = Self::check_expr(array, types, symbols, decorations, sink);
                let it = Self::check_expr(index, types, symbols, decorations, sink);
                let ty = if types.is_error(at) || types.is_error(it) {
                    types.error()
                } else {
                    let mut ok = true;
                    if !types.is_array(at) {
                        sink.report(
                            DiagnosticKind::NonArrayInIndex,
                            "indexed expression is not an array",
                            *id,
                            *span,
                        );
                        ok = false;
                    }
                    if !types.is_integer(it) {
                        sink.report(
                            DiagnosticKind::NonIntegerIndex,
                            "array index must be an integer",
                            *id,
                            *span,
                        );
                        ok = false;
                    }
                    if ok {
                        types.array_elem(at).unwrap()
                    } else {
                        types.error()
                    }
                };
                (ty, true)
            }
            Expr::Call { id, span, name, args } => {
                let ty = Self::check_call(*id, *span, name, args, types, symbols, decorations, sink);
                (ty, false)
            }
        };
        decorations.set_type(expr.id(), ty);
        decorations.set_is_lvalue(expr.id(), is_lvalue);
        ty
    }

    fn check_binary(
        op: BinaryOp,
        lt: TypeId,
        rt: TypeId,
        types: &mut TypeRegistry,
        sink: &mut ErrorSink,
        id: NodeId,
        span: Option<crate::node::Span>,
    ) -> TypeId {
        if types.is_error(lt) || types.is_error(rt) {
            return types.error();
        }
        if op.is_arithmetic() {
            let both_numeric = types.is_numeric(lt) && types.is_numeric(rt);
            let ok = if op == BinaryOp::Mod {
                types.is_integer(lt) && types.is_integer(rt)
            } else {
                both_numeric
            };
            if !ok {
                Self::incompatible_operator(sink, id, span);
                return types.error();
            }
            if types.is_float(lt) || types.is_float(rt) {
                types.float()
            } else {
                types.integer()
            }
        } else if op.is_relational() {
            if !types.comparable(lt, rt, op) {
                Self::incompatible_operator(sink, id, span);
                return types.error();
            }
            types.boolean()
        } else {
            debug_assert!(op.is_boolean());
            if !types.is_boolean(lt) || !types.is_boolean(rt) {
                Self::incompatible_operator(sink, id, span);
                return types.error();
            }
            types.boolean()
        }
    }

    fn incompatible_operator(sink: &mut ErrorSink, id: NodeId, span: Option<crate::node::Span>) {
        sink.report(
            DiagnosticKind::IncompatibleOperator,
            "operand types are not compatible with this operator",
            id,
            span,
        );
    }

    #[allow(clippy::too_many_arguments)]
    fn check_call(
        id: NodeId,
        span: Option<crate::node::Span>,
        name: &str,
        args: &[Expr],
        types: &mut TypeRegistry,
        symbols: &SymbolTable,
        decorations: &mut DecorationStore,
        sink: &mut ErrorSink,
    ) -> TypeId {
        let arg_types: Vec<TypeId> = args
            .iter()
            .map(|a| Self::check_expr(a, types, symbols, decorations, sink))
            .collect();

        let symbol = match symbols.lookup(name) {
            Some(symbol) => symbol,
            None => {
                sink.report(
                    DiagnosticKind::UndeclaredIdent,
                    format!("`{name}` is not declared"),
                    id,
                    span,
                );
                return types.error();
            }
        };

        if symbol.kind != SymbolKind::Function {
            sink.report(
                DiagnosticKind::IsNotCallable,
                format!("`{name}` is not a function"),
                id,
                span,
            );
            return types.error();
        }

        let func_ty = symbol.ty;
        let param_count = types
            .param_count(func_ty)
            .expect("function symbol carries a function type");

        let mut all_compatible = true;
        for (i, arg) in args.iter().enumerate().take(param_count) {
            let param_ty = types.param_type(func_ty, i).unwrap();
            if !types.copyable(param_ty, arg_types[i]) {
                sink.report(
                    DiagnosticKind::IncompatibleParameter,
                    format!("argument {} is not compatible with its parameter type", i + 1),
                    arg.id(),
                    arg.span(),
                );
                all_compatible = false;
            }
        }

        if args.len() != param_count {
            sink.report(
                DiagnosticKind::NumberOfParameters,
                format!(
                    "`{name}` expects {param_count} argument(s), found {}",
                    args.len()
                ),
                id,
                span,
            );
            return types.error();
        }

        let ret_ty = types.return_type(func_ty).unwrap();
        if types.is_void(ret_ty) {
            sink.report(
                DiagnosticKind::IsNotFunction,
                format!("`{name}` returns no value and cannot be used as an expression"),
                id,
                span,
            );
            return types.error();
        }

        if !all_compatible {
            types.error()
        } else {
            ret_ty
        }
    }

    fn check_proc_call(
        id: NodeId,
        span: Option<crate::node::Span>,
        name: &str,
        args: &[Expr],
        types: &mut TypeRegistry,
        symbols: &SymbolTable,
        decorations: &mut DecorationStore,
        sink: &mut ErrorSink,
    ) {
        let arg_types: Vec<TypeId> = args
            .iter()
            .map(|a| Self::check_expr(a, types, symbols, decorations, sink))
            .collect();

        let symbol = match symbols.lookup(name) {
            Some(symbol) => symbol,
            None => {
                sink.report(
                    DiagnosticKind::UndeclaredIdent,
                    format!("`{name}` is not declared"),
                    id,
                    span,
                );
                return;
            }
        };

        if symbol.kind != SymbolKind::Function {
            sink.report(
                DiagnosticKind::IsNotCallable,
                format!("`{name}` is not a function"),
                id,
                span,
            );
            return;
        }

        let func_ty = symbol.ty;
        let param_count = types.param_count(func_ty).unwrap();

        for (i, arg) in args.iter().enumerate().take(param_count) {
            let param_ty = types.param_type(func_ty, i).unwrap();
            if !types.copyable(param_ty, arg_types[i]) {
                sink.report(
                    DiagnosticKind::IncompatibleParameter,
                    format!("argument {} is not compatible with its parameter type", i + 1),
                    arg.id(),
                    arg.span(),
                );
            }
        }

        if args.len() != param_count {
            sink.report(
                DiagnosticKind::NumberOfParameters,
                format!(
                    "`{name}` expects {param_count} argument(s), found {}",
                    args.len()
                ),
                id,
                span,
            );
        }
    }

    fn check_stmt(
        stmt: &Statement,
        types: &mut TypeRegistry,
        symbols: &SymbolTable,
        decorations: &mut DecorationStore,
        sink: &mut ErrorSink,
        return_type: TypeId,
    ) {
        match stmt {
            Statement::Assign { id, span, left, right } => {
                let lt = Self::check_expr(left, types, symbols, decorations, sink);
                let rt = Self::check_expr(right, types, symbols, decorations, sink);
                if !decorations.is_lvalue(left.id()) {
                    sink.report(
                        DiagnosticKind::NonReferenceableLeft,
                        "left side of an assignment must be a storage location",
                        left.id(),
                        left.span(),
                    );
                } else if !types.is_error(lt) && !types.is_error(rt) && !types.copyable(lt, rt) {
                    sink.report(
                        DiagnosticKind::IncompatibleAssignment,
                        "right side is not compatible with the left side's type",
                        *id,
                        *span,
                    );
                }
            }
            Statement::If {
                cond,
                then_branch,
                else_branch,
                ..
            } => {
                let ct = Self::check_expr(cond, types, symbols, decorations, sink);
                if !types.is_error(ct) && !types.is_boolean(ct) {
                    sink.report(
                        DiagnosticKind::BooleanRequired,
                        "condition must be boolean",
                        cond.id(),
                        cond.span(),
                    );
                }
                for s in then_branch {
                    Self::check_stmt(s, types, symbols, decorations, sink, return_type);
                }
                if let Some(else_branch) = else_branch {
                    for s in else_branch {
                        Self::check_stmt(s, types, symbols, decorations, sink, return_type);
                    }
                }
            }
            Statement::While { cond, body, .. } => {
                let ct = Self::check_expr(cond, types, symbols, decorations, sink);
                if !types.is_error(ct) && !types.is_boolean(ct) {
                    sink.report(
                        DiagnosticKind::BooleanRequired,
                        "condition must be boolean",
                        cond.id(),
                        cond.span(),
                    );
                }
                for s in body {
                    Self::check_stmt(s, types, symbols, decorations, sink, return_type);
                }
            }
            Statement::ProcCall { id, span, name, args } => {
                Self::check_proc_call(*id, *span, name, args, types, symbols, decorations, sink);
            }
            Statement::Read { target, .. } => {
                let tt = Self::check_expr(target, types, symbols, decorations, sink);
                if !decorations.is_lvalue(target.id()) {
                    sink.report(
                        DiagnosticKind::NonReferenceableExpression,
                        "read target must be a storage location",
                        target.id(),
                        target.span(),
                    );
                } else if !types.is_error(tt) && !types.is_primitive(tt) {
                    sink.report(
                        DiagnosticKind::ReadWriteRequireBasic,
                        "read target must have a primitive type",
                        target.id(),
                        target.span(),
                    );
                }
            }
            Statement::WriteExpr { value, .. } => {
                let vt = Self::check_expr(value, types, symbols, decorations, sink);
                if !types.is_error(vt) && !types.is_primitive(vt) {
                    sink.report(
                        DiagnosticKind::ReadWriteRequireBasic,
                        "write expression must have a primitive type",
                        value.id(),
                        value.span(),
                    );
                }
            }
            Statement::WriteString { .. } => {}
            Statement::Return { id, span, value } => match value {
                Some(expr) => {
                    if types.is_void(return_type) {
                        sink.report(
                            DiagnosticKind::IncompatibleReturn,
                            "void function cannot return a value",
                            *id,
                            *span,
                        );
                        Self::check_expr(expr, types, symbols, decorations, sink);
                    } else {
                        let vt = Self::check_expr(expr, types, symbols, decorations, sink);
                        if !types.is_error(vt) && !types.copyable(return_type, vt) {
                            sink.report(
                                DiagnosticKind::IncompatibleReturn,
                                "return value is not compatible with the declared return type",
                                *id,
                                *span,
                            );
                        }
                    }
                }
                None => {
                    if !types.is_void(return_type) {
                        sink.report(
                            DiagnosticKind::IncompatibleReturn,
                            "function must return a value",
                            *id,
                            *span,
                        );
                    }
                }
            },
        }
    }

    fn check_main(
        program: &Program,
        types: &TypeRegistry,
        decorations: &DecorationStore,
        sink: &mut ErrorSink,
        config: &CompilerConfig,
    ) {
        if !config.require_main {
            return;
        }
        match program.find_function("main") {
            None => {
                sink.report(
                    DiagnosticKind::NoMainProperlyDeclared,
                    "no `main` function is declared",
                    program.id,
                    program.span,
                );
            }
            Some(main) => {
                let func_ty = decorations
                    .ty(main.id)
                    .expect("symbol_pass records a type for every function");
                let ret = types.return_type(func_ty).unwrap();
                if !main.params.is_empty() || !types.is_void(ret) {
                    sink.report(
                        DiagnosticKind::NoMainProperlyDeclared,
                        "`main` must take no parameters and return no value",
                        main.id,
                        main.span,
                    );
                }
            }
        }
    }
}
