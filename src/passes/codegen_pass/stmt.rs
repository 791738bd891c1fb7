//! Statement lowering (§4.7)

use crate::ast::{Expr, Statement};
use crate::instr::{self, Instruction, Opcode};

use super::state::Lowering;

impl Lowering<'_> {
    pub fn lower_stmt(&mut self, stmt: &Statement) {
        match stmt {
            Statement::Assign { left, right, .. } => self.lower_assign(left, right),
            Statement::If {
                cond,
                then_branch,
                else_branch,
                ..
            } => self.lower_if(cond, then_branch, else_branch.as_deref()),
            Statement::While { cond, body, .. } => self.lower_while(cond, body),
            Statement::ProcCall { name, args, .. } => {
                self.lower_call(name, args);
            }
            Statement::Read { target, .. } => self.lower_read(target),
            Statement::WriteExpr { value, .. } => self.lower_write_expr(value),
            Statement::WriteString { value, .. } => self.lower_write_string(value),
            Statement::Return { value, .. } => self.lower_return(value.as_ref()),
        }
    }

    fn lower_assign(&mut self, left: &Expr, right: &Expr) {
        if let Expr::ArrayAccess { array, index, .. } = left {
            self.lower_element_assign(array, index, right);
            return;
        }

        let left_ty = self.decorations.ty(left.id());
        let right_ty = self.decorations.ty(right.id());
        let both_arrays = matches!((left_ty, right_ty), (Some(l), Some(r)) if self.types.is_array(l) && self.types.is_array(r));

        if both_arrays {
            self.lower_array_copy(left, right, left_ty.unwrap());
            return;
        }

        self.lower_expr(left);
        self.lower_expr(right);
        let dst = self.decorations.addr(left.id()).unwrap().to_string();
        let src_addr = self.decorations.addr(right.id()).unwrap().to_string();
        let src = if left_ty.is_some_and(|t| self.types.is_float(t)) {
            self.coerce_to_float(right, &src_addr)
        } else {
            src_addr
        };
        self.emit(Instruction::new(Opcode::Load, vec![dst, src]));
    }

    fn lower_element_assign(&mut self, array: &Expr, index: &Expr, right: &Expr) {
        self.lower_expr(array);
        self.lower_expr(index);
        let array_name = self.decorations.addr(array.id()).unwrap().to_string();
        let idx_addr = self.decorations.addr(index.id()).unwrap().to_string();
        let base = self.array_base(&array_name);
        let elem_ty = self
            .decorations
            .ty(array.id())
            .and_then(|array_ty| self.types.array_elem(array_ty));

        self.lower_expr(right);
        let right_addr = self.decorations.addr(right.id()).unwrap().to_string();
        let value = if elem_ty.is_some_and(|t| self.types.is_float(t)) {
            self.coerce_to_float(right, &right_addr)
        } else {
            right_addr
        };

        self.emit(Instruction::new(Opcode::XLoad, vec![base, idx_addr, value]));
    }

    /// Size-bounded element-by-element copy (§4.7): both sides' base
    /// addresses are materialized once, then each index is copied through a
    /// fresh pair of temps.
    fn lower_array_copy(&mut self, left: &Expr, right: &Expr, array_ty: crate::types::TypeId) {
        self.lower_expr(left);
        self.lower_expr(right);
        let dst_name = self.decorations.addr(left.id()).unwrap().to_string();
        let src_name = self.decorations.addr(right.id()).unwrap().to_string();
        let dst_base = self.array_base(&dst_name);
        let src_base = self.array_base(&src_name);
        let size = self
            .types
            .array_size(array_ty)
            .expect("lower_array_copy is only called for array-typed operands");

        for i in 0..size {
            let idx = self.fresh_temp();
            self.emit(Instruction::new(
                Opcode::ILoad,
                vec![idx.clone(), super::state::quoted(i)],
            ));
            let value = self.fresh_temp();
            self.emit(Instruction::new(
                Opcode::LoadX,
                vec![value.clone(), src_base.clone(), idx.clone()],
            ));
            self.emit(Instruction::new(
                Opcode::XLoad,
                vec![dst_base.clone(), idx, value],
            ));
        }
    }

    fn lower_if(&mut self, cond: &Expr, then_branch: &[Statement], else_branch: Option<&[Statement]>) {
        self.lower_expr(cond);
        let cond_addr = self.decorations.addr(cond.id()).unwrap().to_string();
        let n = self.counters.fresh_if();

        match else_branch {
            None => {
                self.emit(Instruction::fjump(cond_addr, instr::endif_label(n)));
                for s in then_branch {
                    self.lower_stmt(s);
                }
                self.emit(Instruction::label(instr::endif_label(n)));
            }
            Some(else_stmts) => {
                self.emit(Instruction::fjump(cond_addr, instr::else_label(n)));
                for s in then_branch {
                    self.lower_stmt(s);
                }
                self.emit(Instruction::ujump(instr::endif_label(n)));
                self.emit(Instruction::label(instr::else_label(n)));
                for s in else_stmts {
                    self.lower_stmt(s);
                }
                self.emit(Instruction::label(instr::endif_label(n)));
            }
        }
    }

    fn lower_while(&mut self, cond: &Expr, body: &[Statement]) {
        let n = self.counters.fresh_while();
        self.emit(Instruction::label(instr::startwhile_label(n)));
        self.lower_expr(cond);
        let cond_addr = self.decorations.addr(cond.id()).unwrap().to_string();
        self.emit(Instruction::fjump(cond_addr, instr::endwhile_label(n)));
        for s in body {
            self.lower_stmt(s);
        }
        self.emit(Instruction::ujump(instr::startwhile_label(n)));
        self.emit(Instruction::label(instr::endwhile_label(n)));
    }

    fn lower_read(&mut self, target: &Expr) {
        if let Expr::ArrayAccess { array, index, .. } = target {
            self.lower_expr(array);
            self.lower_expr(index);
            let array_name = self.decorations.addr(array.id()).unwrap().to_string();
            let idx_addr = self.decorations.addr(index.id()).unwrap().to_string();
            let base = self.array_base(&array_name);

            let elem_ty = self
                .decorations
                .ty(target.id())
                .expect("type_check_pass sets a type on every expression");
            let temp = self.fresh_temp();
            self.emit(Instruction::new(self.read_opcode_for(elem_ty), vec![temp.clone()]));
            self.emit(Instruction::new(Opcode::XLoad, vec![base, idx_addr, temp]));
            return;
        }

        self.lower_expr(target);
        let name = self.decorations.addr(target.id()).unwrap().to_string();
        let ty = self
            .decorations
            .ty(target.id())
            .expect("type_check_pass sets a type on every expression");
        self.emit(Instruction::new(self.read_opcode_for(ty), vec![name]));
    }

    fn lower_write_expr(&mut self, value: &Expr) {
        self.lower_expr(value);
        let addr = self.decorations.addr(value.id()).unwrap().to_string();
        let ty = self
            .decorations
            .ty(value.id())
            .expect("type_check_pass sets a type on every expression");
        self.emit(Instruction::new(self.write_opcode_for(ty), vec![addr]));
    }

    /// `\n` emits a bare `WRITELN`; `\t`, `\"`, `\\` load their literal
    /// two-character source lexeme and `WRITEC` it; any other character
    /// loads one byte and `WRITEC`s it (§4.7, settled per the resolution in
    /// SPEC_FULL §9).
    fn lower_write_string(&mut self, value: &str) {
        let chars: Vec<char> = value.chars().collect();
        let mut i = 0;
        while i < chars.len() {
            if chars[i] == '\\' && i + 1 < chars.len() {
                match chars[i + 1] {
                    'n' => {
                        self.emit(Instruction::new(Opcode::WriteLn, vec![]));
                        i += 2;
                    }
                    't' | '"' | '\\' => {
                        let lexeme: String = chars[i..i + 2].iter().collect();
                        let temp = self.fresh_temp();
                        self.emit(Instruction::new(
                            Opcode::ChLoad,
                            vec![temp.clone(), super::state::quoted(lexeme)],
                        ));
                        self.emit(Instruction::new(Opcode::WriteC, vec![temp]));
                        i += 2;
                    }
                    _ => {
                        let temp = self.fresh_temp();
                        self.emit(Instruction::new(
                            Opcode::ChLoad,
                            vec![temp.clone(), super::state::quoted(chars[i])],
                        ));
                        self.emit(Instruction::new(Opcode::WriteC, vec![temp]));
                        i += 1;
                    }
                }
            } else {
                let temp = self.fresh_temp();
                self.emit(Instruction::new(
                    Opcode::ChLoad,
                    vec![temp.clone(), super::state::quoted(chars[i])],
                ));
                self.emit(Instruction::new(Opcode::WriteC, vec![temp]));
                i += 1;
            }
        }
    }

    fn lower_return(&mut self, value: Option<&Expr>) {
        if let Some(expr) = value {
            self.lower_expr(expr);
            let addr = self.decorations.addr(expr.id()).unwrap().to_string();
            let result = if self.types.is_float(self.return_type) {
                self.coerce_to_float(expr, &addr)
            } else {
                addr
            };
            self.emit(Instruction::new(
                Opcode::Load,
                vec!["_result".to_string(), result],
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decorations::DecorationStore;
    use crate::node::NodeId;
    use crate::symbols::{SymbolKind, SymbolTable};
    use crate::types::TypeRegistry;

    fn setup() -> (TypeRegistry, SymbolTable, DecorationStore) {
        (TypeRegistry::new(), SymbolTable::new(), DecorationStore::new())
    }

    #[test]
    fn plain_assignment_emits_load() {
        let (mut types, mut symbols, mut decorations) = setup();
        symbols
            .declare("x", SymbolKind::Variable, types.integer(), NodeId(0))
            .unwrap();
        let left_id = NodeId(1);
        let right_id = NodeId(2);
        decorations.set_type(left_id, types.integer());
        decorations.set_type(right_id, types.integer());
        decorations.set_is_lvalue(left_id, true);
        let ret = types.void();
        let mut ctx = Lowering::new(&mut types, &mut symbols, &mut decorations, ret);
        let stmt = Statement::Assign {
            id: NodeId(3),
            span: None,
            left: Expr::Ident {
                id: left_id,
                span: None,
                name: "x".to_string(),
            },
            right: Expr::IntLit {
                id: right_id,
                span: None,
                value: 5,
            },
        };
        ctx.lower_stmt(&stmt);
        let body = ctx.take_body();
        assert!(body.iter().any(|i| i.op == Opcode::Load && i.operands[0] == "x"));
    }

    #[test]
    fn assignment_to_float_variable_coerces_integer_source() {
        let (mut types, mut symbols, mut decorations) = setup();
        symbols
            .declare("y", SymbolKind::Variable, types.float(), NodeId(0))
            .unwrap();
        symbols
            .declare("x", SymbolKind::Variable, types.integer(), NodeId(1))
            .unwrap();
        let left_id = NodeId(2);
        let right_id = NodeId(3);
        decorations.set_type(left_id, types.float());
        decorations.set_type(right_id, types.integer());
        decorations.set_is_lvalue(left_id, true);
        let ret = types.void();
        let mut ctx = Lowering::new(&mut types, &mut symbols, &mut decorations, ret);
        let stmt = Statement::Assign {
            id: NodeId(4),
            span: None,
            left: Expr::Ident {
                id: left_id,
                span: None,
                name: "y".to_string(),
            },
            right: Expr::Ident {
                id: right_id,
                span: None,
                name: "x".to_string(),
            },
        };
        ctx.lower_stmt(&stmt);
        let body = ctx.take_body();
        assert_eq!(body[0].op, Opcode::Float);
        assert_eq!(body[0].operands[1], "x");
        assert_eq!(body[1].op, Opcode::Load);
        assert_eq!(body[1].operands, vec!["y".to_string(), body[0].operands[0].clone()]);
    }

    #[test]
    fn array_element_assignment_emits_xload() {
        let (mut types, mut symbols, mut decorations) = setup();
        let array_ty = types.create_array(3, types.integer());
        symbols
            .declare("a", SymbolKind::Variable, array_ty, NodeId(0))
            .unwrap();
        let array_id = NodeId(1);
        let idx_id = NodeId(2);
        let right_id = NodeId(3);
        decorations.set_type(right_id, types.integer());
        let ret = types.void();
        let mut ctx = Lowering::new(&mut types, &mut symbols, &mut decorations, ret);
        let stmt = Statement::Assign {
            id: NodeId(4),
            span: None,
            left: Expr::ArrayAccess {
                id: NodeId(5),
                span: None,
                array: Box::new(Expr::Ident {
                    id: array_id,
                    span: None,
                    name: "a".to_string(),
                }),
                index: Box::new(Expr::IntLit {
                    id: idx_id,
                    span: None,
                    value: 0,
                }),
            },
            right: Expr::IntLit {
                id: right_id,
                span: None,
                value: 1,
            },
        };
        ctx.lower_stmt(&stmt);
        let body = ctx.take_body();
        assert!(body.iter().any(|i| i.op == Opcode::XLoad));
    }

    #[test]
    fn if_without_else_emits_single_endif_label() {
        let (mut types, mut symbols, mut decorations) = setup();
        let cond_id = NodeId(0);
        decorations.set_type(cond_id, types.boolean());
        let ret = types.void();
        let mut ctx = Lowering::new(&mut types, &mut symbols, &mut decorations, ret);
        let stmt = Statement::If {
            id: NodeId(1),
            span: None,
            cond: Expr::BoolLit {
                id: cond_id,
                span: None,
                value: true,
            },
            then_branch: vec![],
            else_branch: None,
        };
        ctx.lower_stmt(&stmt);
        let body = ctx.take_body();
        assert_eq!(body.iter().filter(|i| i.op == Opcode::Label).count(), 1);
        assert!(body.iter().any(|i| i.op == Opcode::FJump));
    }

    #[test]
    fn while_loop_emits_start_and_end_labels() {
        let (mut types, mut symbols, mut decorations) = setup();
        let cond_id = NodeId(0);
        decorations.set_type(cond_id, types.boolean());
        let ret = types.void();
        let mut ctx = Lowering::new(&mut types, &mut symbols, &mut decorations, ret);
        let stmt = Statement::While {
            id: NodeId(1),
            span: None,
            cond: Expr::BoolLit {
                id: cond_id,
                span: None,
                value: false,
            },
            body: vec![],
        };
        ctx.lower_stmt(&stmt);
        let body = ctx.take_body();
        let labels: Vec<_> = body.iter().filter(|i| i.op == Opcode::Label).collect();
        assert_eq!(labels.len(), 2);
        assert!(labels[0].operands[0].starts_with("startwhile_"));
        assert!(labels[1].operands[0].starts_with("endwhile_"));
    }

    #[test]
    fn write_string_emits_writeln_for_newline_escape() {
        let (mut types, mut symbols, mut decorations) = setup();
        let ret = types.void();
        let mut ctx = Lowering::new(&mut types, &mut symbols, &mut decorations, ret);
        ctx.lower_write_string("hi\\n");
        let body = ctx.take_body();
        assert!(body.iter().any(|i| i.op == Opcode::WriteLn));
    }

    #[test]
    fn write_string_loads_two_char_lexeme_for_tab_escape() {
        let (mut types, mut symbols, mut decorations) = setup();
        let ret = types.void();
        let mut ctx = Lowering::new(&mut types, &mut symbols, &mut decorations, ret);
        ctx.lower_write_string("\\t");
        let body = ctx.take_body();
        assert_eq!(body[0].op, Opcode::ChLoad);
        assert_eq!(body[0].operands[1], "\"\\t\"");
        assert_eq!(body[1].op, Opcode::WriteC);
    }

    #[test]
    fn return_with_float_declared_type_coerces_int_value() {
        let (mut types, mut symbols, mut decorations) = setup();
        let ret = types.float();
        let value_id = NodeId(0);
        decorations.set_type(value_id, types.integer());
        let mut ctx = Lowering::new(&mut types, &mut symbols, &mut decorations, ret);
        ctx.lower_return(Some(&Expr::IntLit {
            id: value_id,
            span: None,
            value: 1,
        }));
        let body = ctx.take_body();
        assert!(body.iter().any(|i| i.op == Opcode::Float));
        assert!(body
            .iter()
            .any(|i| i.op == Opcode::Load && i.operands[0] == "_result"));
    }

    #[test]
    fn return_with_no_value_emits_nothing() {
        let (mut types, mut symbols, mut decorations) = setup();
        let ret = types.void();
        let mut ctx = Lowering::new(&mut types, &mut symbols, &mut decorations, ret);
        ctx.lower_return(None);
        assert!(ctx.take_body().is_empty());
    }

    #[test]
    fn proc_call_never_pops_a_result() {
        let (mut types, mut symbols, mut decorations) = setup();
        let void_fn = types.create_function(vec![], types.void());
        symbols
            .declare("p", SymbolKind::Function, void_fn, NodeId(0))
            .unwrap();
        let ret = types.void();
        let mut ctx = Lowering::new(&mut types, &mut symbols, &mut decorations, ret);
        let stmt = Statement::ProcCall {
            id: NodeId(1),
            span: None,
            name: "p".to_string(),
            args: vec![],
        };
        ctx.lower_stmt(&stmt);
        let body = ctx.take_body();
        assert!(body.iter().all(|i| i.op != Opcode::Pop));
    }
}
