//! Expression lowering (§4.7)

use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::instr::{Instruction, Opcode};

use super::state::{quoted, Lowering};

impl Lowering<'_> {
    /// Lowers `expr`, leaving its result operand and (when applicable) its
    /// index temp in the decoration store under `addr`/`offset`.
    pub fn lower_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Ident { id, name, .. } => {
                self.decorations.set_addr(*id, name.clone());
                self.decorations.set_offset(*id, "");
            }
            Expr::IntLit { id, value, .. } => {
                let temp = self.fresh_temp();
                self.emit(Instruction::new(
                    Opcode::ILoad,
                    vec![temp.clone(), quoted(value)],
                ));
                self.decorations.set_addr(*id, temp);
                self.decorations.set_offset(*id, "");
            }
            Expr::FloatLit { id, value, .. } => {
                let temp = self.fresh_temp();
                self.emit(Instruction::new(
                    Opcode::FLoad,
                    vec![temp.clone(), quoted(value)],
                ));
                self.decorations.set_addr(*id, temp);
                self.decorations.set_offset(*id, "");
            }
            Expr::CharLit { id, value, .. } => {
                let temp = self.fresh_temp();
                self.emit(Instruction::new(
                    Opcode::ChLoad,
                    vec![temp.clone(), quoted(value)],
                ));
                self.decorations.set_addr(*id, temp);
                self.decorations.set_offset(*id, "");
            }
            Expr::BoolLit { id, value, .. } => {
                let temp = self.fresh_temp();
                let imm = if *value { "1" } else { "0" };
                self.emit(Instruction::new(
                    Opcode::ILoad,
                    vec![temp.clone(), quoted(imm)],
                ));
                self.decorations.set_addr(*id, temp);
                self.decorations.set_offset(*id, "");
            }
            Expr::Paren { id, inner, .. } => {
                self.lower_expr(inner);
                let addr = self.decorations.addr(inner.id()).unwrap().to_string();
                let offset = self.decorations.offset(inner.id()).unwrap_or("").to_string();
                self.decorations.set_addr(*id, addr);
                self.decorations.set_offset(*id, offset);
            }
            Expr::Unary { id, op, operand, .. } => {
                self.lower_expr(operand);
                let operand_addr = self.decorations.addr(operand.id()).unwrap().to_string();
                let result_ty = self
                    .decorations
                    .ty(*id)
                    .expect("type_check_pass sets a type on every expression");
                let temp = match op {
                    UnaryOp::Not => {
                        let temp = self.fresh_temp();
                        self.emit(Instruction::new(
                            Opcode::Not,
                            vec![temp.clone(), operand_addr],
                        ));
                        temp
                    }
                    UnaryOp::Neg => {
                        let temp = self.fresh_temp();
                        let opcode = if self.types.is_float(result_ty) {
                            Opcode::FSub
                        } else {
                            Opcode::Sub
                        };
                        self.emit(Instruction::new(
                            opcode,
                            vec![temp.clone(), String::new(), operand_addr],
                        ));
                        temp
                    }
                    UnaryOp::Plus => operand_addr,
                };
                self.decorations.set_addr(*id, temp);
                self.decorations.set_offset(*id, "");
            }
            Expr::Binary {
                id, op, lhs, rhs, ..
            } => {
                self.lower_binary(*id, *op, lhs, rhs);
            }
            Expr::ArrayAccess {
                id, array, index, ..
            } => {
                self.lower_expr(array);
                self.lower_expr(index);
                let array_name = self.decorations.addr(array.id()).unwrap().to_string();
                let idx_addr = self.decorations.addr(index.id()).unwrap().to_string();
                let base = self.array_base(&array_name);
                let temp = self.fresh_temp();
                self.emit(Instruction::new(
                    Opcode::LoadX,
                    vec![temp.clone(), base, idx_addr.clone()],
                ));
                self.decorations.set_addr(*id, temp);
                self.decorations.set_offset(*id, idx_addr);
            }
            Expr::Call {
                id, name, args, ..
            } => {
                let addr = self.lower_call(name, args);
                self.decorations.set_addr(*id, addr);
                self.decorations.set_offset(*id, "");
            }
        }
    }

    fn lower_binary(&mut self, id: crate::node::NodeId, op: BinaryOp, lhs: &Expr, rhs: &Expr) {
        self.lower_expr(lhs);
        self.lower_expr(rhs);
        let lhs_addr = self.decorations.addr(lhs.id()).unwrap().to_string();
        let rhs_addr = self.decorations.addr(rhs.id()).unwrap().to_string();
        let result_ty = self
            .decorations
            .ty(id)
            .expect("type_check_pass sets a type on every expression");

        let temp = if op.is_arithmetic() {
            if op == BinaryOp::Mod {
                self.lower_mod(&lhs_addr, &rhs_addr)
            } else {
                self.lower_arith(op, lhs, &lhs_addr, rhs, &rhs_addr, result_ty)
            }
        } else if op.is_relational() {
            self.lower_relational(op, lhs, &lhs_addr, rhs, &rhs_addr)
        } else {
            let opcode = if op == BinaryOp::And {
                Opcode::And
            } else {
                Opcode::Or
            };
            let temp = self.fresh_temp();
            self.emit(Instruction::new(
                opcode,
                vec![temp.clone(), lhs_addr, rhs_addr],
            ));
            temp
        };
        self.decorations.set_addr(id, temp);
        self.decorations.set_offset(id, "");
    }

    /// `q = a/b; q = q*b; r = a - q` (§4.4). `%` requires both operands
    /// integer (enforced by type_check_pass), so no float variant applies.
    fn lower_mod(&mut self, lhs_addr: &str, rhs_addr: &str) -> String {
        let q = self.fresh_temp();
        self.emit(Instruction::new(
            Opcode::Div,
            vec![q.clone(), lhs_addr.to_string(), rhs_addr.to_string()],
        ));
        let qb = self.fresh_temp();
        self.emit(Instruction::new(
            Opcode::Mul,
            vec![qb.clone(), q, rhs_addr.to_string()],
        ));
        let r = self.fresh_temp();
        self.emit(Instruction::new(
            Opcode::Sub,
            vec![r.clone(), lhs_addr.to_string(), qb],
        ));
        r
    }

    fn lower_arith(
        &mut self,
        op: BinaryOp,
        lhs: &Expr,
        lhs_addr: &str,
        rhs: &Expr,
        rhs_addr: &str,
        result_ty: crate::types::TypeId,
    ) -> String {
        let is_float = self.types.is_float(result_ty);
        let (la, ra) = if is_float {
            (
                self.coerce_to_float(lhs, lhs_addr),
                self.coerce_to_float(rhs, rhs_addr),
            )
        } else {
            (lhs_addr.to_string(), rhs_addr.to_string())
        };
        let opcode = match (op, is_float) {
            (BinaryOp::Add, false) => Opcode::Add,
            (BinaryOp::Add, true) => Opcode::FAdd,
            (BinaryOp::Sub, false) => Opcode::Sub,
            (BinaryOp::Sub, true) => Opcode::FSub,
            (BinaryOp::Mul, false) => Opcode::Mul,
            (BinaryOp::Mul, true) => Opcode::FMul,
            (BinaryOp::Div, false) => Opcode::Div,
            (BinaryOp::Div, true) => Opcode::FDiv,
            _ => unreachable!("lower_mod handles BinaryOp::Mod"),
        };
        let temp = self.fresh_temp();
        self.emit(Instruction::new(opcode, vec![temp.clone(), la, ra]));
        temp
    }

    /// `<`, `<=`, `==` lower directly; `!=`, `>=`, `>` lower as the negation
    /// of the opposite primitive comparison (§4.7). Operands are coerced to
    /// float first when either side's static type is float, matching the
    /// arithmetic coercion rule so mixed int/float comparisons compare like
    /// values.
    fn lower_relational(
        &mut self,
        op: BinaryOp,
        lhs: &Expr,
        lhs_addr: &str,
        rhs: &Expr,
        rhs_addr: &str,
    ) -> String {
        let lhs_ty = self.decorations.ty(lhs.id()).unwrap();
        let rhs_ty = self.decorations.ty(rhs.id()).unwrap();
        let needs_float = self.types.is_float(lhs_ty) || self.types.is_float(rhs_ty);
        let (la, ra) = if needs_float {
            (
                self.coerce_to_float(lhs, lhs_addr),
                self.coerce_to_float(rhs, rhs_addr),
            )
        } else {
            (lhs_addr.to_string(), rhs_addr.to_string())
        };

        let direct = |this: &mut Self, opcode: Opcode| -> String {
            let temp = this.fresh_temp();
            this.emit(Instruction::new(
                opcode,
                vec![temp.clone(), la.clone(), ra.clone()],
            ));
            temp
        };
        let negated = |this: &mut Self, opcode: Opcode| -> String {
            let base = direct(this, opcode);
            let temp = this.fresh_temp();
            this.emit(Instruction::new(Opcode::Not, vec![temp.clone(), base]));
            temp
        };

        match op {
            BinaryOp::Lt => direct(self, Opcode::Lt),
            BinaryOp::Le => direct(self, Opcode::Le),
            BinaryOp::Eq => direct(self, Opcode::Eq),
            BinaryOp::Ne => negated(self, Opcode::Eq),
            BinaryOp::Ge => negated(self, Opcode::Lt),
            BinaryOp::Gt => negated(self, Opcode::Le),
            _ => unreachable!("only relational operators reach lower_relational"),
        }
    }

    /// Shared by call-as-expression and proc-call statement lowering.
    /// Returns the temp holding the result, or an empty string when `name`
    /// is void (proc-call position).
    pub(crate) fn lower_call(&mut self, name: &str, args: &[Expr]) -> String {
        let symbol = self
            .symbols
            .lookup(name)
            .expect("type_check_pass rejects calls to undeclared names before codegen runs")
            .clone();
        let ret_ty = self.types.return_type(symbol.ty).unwrap();
        let is_void = self.types.is_void(ret_ty);

        if !is_void {
            self.emit(Instruction::push_reserve());
        }

        for (i, arg) in args.iter().enumerate() {
            self.lower_expr(arg);
            let arg_addr = self.decorations.addr(arg.id()).unwrap().to_string();
            let formal_ty = self.types.param_type(symbol.ty, i).unwrap();
            let operand = if self.types.is_array(formal_ty) {
                self.array_base_for_call(&arg_addr)
            } else if self.types.is_float(formal_ty) {
                self.coerce_to_float(arg, &arg_addr)
            } else {
                arg_addr
            };
            self.emit(Instruction::push(operand));
        }

        self.emit(Instruction::call(name));

        for _ in args {
            self.emit(Instruction::pop_discard());
        }

        if is_void {
            String::new()
        } else {
            let temp = self.fresh_temp();
            self.emit(Instruction::pop(temp.clone()));
            temp
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
    fn int_literal_lowers_to_quoted_iload() {
        let (mut types, mut symbols, mut decorations) = setup();
        let ret = types.void();
        let mut ctx = Lowering::new(&mut types, &mut symbols, &mut decorations, ret);
        let expr = Expr::IntLit {
            id: NodeId(0),
            span: None,
            value: 2,
        };
        ctx.decorations.set_type(NodeId(0), ctx.types.integer());
        ctx.lower_expr(&expr);
        let body = ctx.take_body();
        assert_eq!(body.len(), 1);
        assert_eq!(body[0].to_string(), "ILOAD %0,\"2\"");
    }

    #[test]
    fn identifier_lowers_with_no_instructions() {
        let (mut types, mut symbols, mut decorations) = setup();
        symbols
            .declare("x", SymbolKind::Variable, types.integer(), NodeId(0))
            .unwrap();
        let ret = types.void();
        let mut ctx = Lowering::new(&mut types, &mut symbols, &mut decorations, ret);
        let expr = Expr::Ident {
            id: NodeId(1),
            span: None,
            name: "x".to_string(),
        };
        ctx.lower_expr(&expr);
        assert!(ctx.take_body().is_empty());
        assert_eq!(ctx.decorations.addr(NodeId(1)), Some("x"));
    }

    #[test]
    fn addition_with_float_operand_inserts_float_coercion() {
        let (mut types, mut symbols, mut decorations) = setup();
        let ret = types.void();
        let int_id = NodeId(0);
        let float_id = NodeId(1);
        let add_id = NodeId(2);
        decorations.set_type(int_id, types.integer());
        decorations.set_type(float_id, types.float());
        decorations.set_type(add_id, types.float());

        let mut ctx = Lowering::new(&mut types, &mut symbols, &mut decorations, ret);
        let lhs = Expr::IntLit {
            id: int_id,
            span: None,
            value: 1,
        };
        let rhs = Expr::FloatLit {
            id: float_id,
            span: None,
            value: 2.0,
        };
        let add = Expr::Binary {
            id: add_id,
            span: None,
            op: BinaryOp::Add,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        };
        ctx.lower_expr(&add);
        let body = ctx.take_body();
        assert!(body.iter().any(|i| i.op == Opcode::Float));
        assert!(body.iter().any(|i| i.op == Opcode::FAdd));
    }

    #[test]
    fn not_equal_is_lowered_as_negated_equality() {
        let (mut types, mut symbols, mut decorations) = setup();
        let ret = types.void();
        let l = NodeId(0);
        let r = NodeId(1);
        let cmp = NodeId(2);
        decorations.set_type(l, types.integer());
        decorations.set_type(r, types.integer());
        decorations.set_type(cmp, types.boolean());
        let mut ctx = Lowering::new(&mut types, &mut symbols, &mut decorations, ret);
        let expr = Expr::Binary {
            id: cmp,
            span: None,
            op: BinaryOp::Ne,
            lhs: Box::new(Expr::IntLit {
                id: l,
                span: None,
                value: 1,
            }),
            rhs: Box::new(Expr::IntLit {
                id: r,
                span: None,
                value: 2,
            }),
        };
        ctx.lower_expr(&expr);
        let body = ctx.take_body();
        assert!(body.iter().any(|i| i.op == Opcode::Eq));
        assert_eq!(body.last().unwrap().op, Opcode::Not);
    }

    #[test]
    fn array_access_on_parameter_loads_base_before_loadx() {
        let (mut types, mut symbols, mut decorations) = setup();
        let array_ty = types.create_array(3, types.integer());
        symbols
            .declare("p", SymbolKind::Parameter, array_ty, NodeId(0))
            .unwrap();
        let ret = types.void();
        let array_id = NodeId(1);
        let idx_id = NodeId(2);
        let access_id = NodeId(3);
        decorations.set_type(access_id, types.integer());
        let mut ctx = Lowering::new(&mut types, &mut symbols, &mut decorations, ret);
        let expr = Expr::ArrayAccess {
            id: access_id,
            span: None,
            array: Box::new(Expr::Ident {
                id: array_id,
                span: None,
                name: "p".to_string(),
            }),
            index: Box::new(Expr::IntLit {
                id: idx_id,
                span: None,
                value: 0,
            }),
        };
        ctx.lower_expr(&expr);
        let body = ctx.take_body();
        assert_eq!(body.iter().filter(|i| i.op == Opcode::Load).count(), 1);
        assert!(body.iter().any(|i| i.op == Opcode::LoadX));
        assert!(!ctx.decorations.offset(access_id).unwrap().is_empty());
    }

    #[test]
    fn call_to_void_function_has_no_reserve_or_result_pop() {
        let (mut types, mut symbols, mut decorations) = setup();
        let void_fn = types.create_function(vec![], types.void());
        symbols
            .declare("proc", SymbolKind::Function, void_fn, NodeId(0))
            .unwrap();
        let ret = types.void();
        let mut ctx = Lowering::new(&mut types, &mut symbols, &mut decorations, ret);
        let result = ctx.lower_call("proc", &[]);
        assert!(result.is_empty());
        let body = ctx.take_body();
        assert!(body.iter().all(|i| i.op != Opcode::Pop || i.operands.is_empty()));
        assert_eq!(body[0].op, Opcode::Call);
    }

    #[test]
    fn call_to_non_void_function_pushes_reserve_and_pops_result() {
        let (mut types, mut symbols, mut decorations) = setup();
        let func = types.create_function(vec![types.integer()], types.integer());
        symbols
            .declare("f", SymbolKind::Function, func, NodeId(0))
            .unwrap();
        let ret = types.void();
        let arg_id = NodeId(1);
        decorations.set_type(arg_id, types.integer());
        let mut ctx = Lowering::new(&mut types, &mut symbols, &mut decorations, ret);
        let args = vec![Expr::IntLit {
            id: arg_id,
            span: None,
            value: 2,
        }];
        let result = ctx.lower_call("f", &args);
        assert!(!result.is_empty());
        let body = ctx.take_body();
        assert_eq!(body.first().unwrap().op, Opcode::Push);
        assert!(body.first().unwrap().operands.is_empty());
        assert_eq!(body.last().unwrap().op, Opcode::Pop);
    }
}
