//! Expression lowering.
//!
//! `lower_expr` is a total dispatcher over the supported syntax-node
//! kinds: every case either produces a `Value` or fails with a typed
//! diagnostic. The only degenerate case is the object literal, which is
//! accepted syntactically and lowers to the null sentinel without
//! emitting IR.
//!
//! Calls resolve in three ways: builtin API methods on the runtime
//! carrier types (routed through the mangled ABI with the receiver as
//! first argument), user/prelude functions by name, and function-valued
//! variables as a fallback.

use deno_ast::swc::ast;
use deno_ast::swc::common::Spanned;
use inkwell::types::BasicType;
use inkwell::values::{BasicMetadataValueEnum, BasicValueEnum, FunctionValue, PointerValue};
use inkwell::{FloatPredicate, IntPredicate};

use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::types::{FunctionSig, ScriptType, prelude_signature};

use super::builtins::{self, ApiKind};
use super::mangle;
use super::value::{ElemKind, ScalarKind, SemanticKind, Storage, Value};
use super::{CodeGen, Scope, SignatureKey};

fn span_of<T: Spanned>(node: &T) -> usize {
    node.span().lo.0 as usize
}

/// Fully-qualified dotted access path (`a.b.c` -> `a_b_c`), used to match
/// ingredient accessors. Returns `None` when any link is not a plain
/// identifier.
fn dotted_path(expr: &ast::Expr) -> Option<String> {
    match expr {
        ast::Expr::Ident(id) => Some(id.sym.to_string()),
        ast::Expr::Member(member) => {
            let prop = match &member.prop {
                ast::MemberProp::Ident(id) => id.sym.to_string(),
                _ => return None,
            };
            Some(format!("{}_{}", dotted_path(&member.obj)?, prop))
        }
        _ => None,
    }
}

/// The carrier-type name a method receiver dispatches on.
fn receiver_class(value: &Value) -> Option<String> {
    match value {
        Value::Object { class, .. } => Some(class.clone()),
        Value::Str { .. } => Some("String".to_string()),
        Value::Array { .. } => Some("Array".to_string()),
        Value::Primitive {
            kind: ScalarKind::Double,
            ..
        } => Some("Number".to_string()),
        _ => None,
    }
}

/// Declared type to thread into the right-hand side of an assignment.
fn expected_of(value: &Value) -> Option<ScriptType> {
    match value {
        Value::Str { .. } => Some(ScriptType::String),
        Value::Object { class, .. } => Some(ScriptType::Named(class.clone())),
        Value::Primitive { kind, .. } => match kind {
            ScalarKind::Double => Some(ScriptType::Number),
            ScalarKind::Boolean => Some(ScriptType::Boolean),
            ScalarKind::Int { bits, signed } => Some(ScriptType::Integer {
                bits: *bits,
                signed: *signed,
            }),
            ScalarKind::Unknown => None,
        },
        _ => None,
    }
}

impl<'a> CodeGen<'a> {
    pub fn lower_expr(
        &self,
        expr: &ast::Expr,
        function: FunctionValue<'a>,
        scope: &mut Scope<'a>,
        expected: Option<&ScriptType>,
    ) -> Result<Value<'a>, Diagnostic> {
        match expr {
            ast::Expr::Lit(lit) => self.lower_literal(lit, expected),
            ast::Expr::Ident(ident) => self.lower_ident(ident, scope),
            ast::Expr::Paren(paren) => self.lower_expr(&paren.expr, function, scope, expected),
            ast::Expr::Bin(bin) => self.lower_binary(bin, function, scope),
            ast::Expr::Assign(assign) => self.lower_assign(assign, function, scope),
            ast::Expr::Unary(unary) => self.lower_unary(unary, function, scope),
            ast::Expr::Update(update) => self.lower_update(update, function, scope),
            ast::Expr::Cond(cond) => self.lower_cond(cond, function, scope, expected),
            ast::Expr::Call(call) => self.lower_call(call, function, scope),
            ast::Expr::New(new) => self.lower_new(new, function, scope),
            ast::Expr::Member(member) => match &member.prop {
                ast::MemberProp::Computed(_) => {
                    self.lower_element_access(member, function, scope)
                }
                _ => self.lower_member(member, function, scope),
            },
            ast::Expr::Array(array) => self.lower_array_literal(array, function, scope, expected),
            ast::Expr::Tpl(tpl) => self.lower_template(tpl, function, scope),
            // Object literals are accepted but produce no IR value.
            ast::Expr::Object(_) => Ok(Value::Null {
                raw: self.ptr_t.const_null(),
            }),
            other => Err(Diagnostic::with_span(
                DiagnosticKind::UnsupportedConstruct,
                "expression kind has no lowering rule",
                span_of(other),
            )),
        }
    }

    fn lower_literal(
        &self,
        lit: &ast::Lit,
        expected: Option<&ScriptType>,
    ) -> Result<Value<'a>, Diagnostic> {
        match lit {
            ast::Lit::Num(num) => {
                if let Some(ScriptType::Integer { bits, signed }) = expected {
                    let int_ty = self.context.custom_width_int_type(*bits as u32);
                    let raw = int_ty.const_int(num.value as i64 as u64, *signed);
                    Ok(Value::direct_primitive(
                        raw.into(),
                        ScalarKind::Int {
                            bits: *bits,
                            signed: *signed,
                        },
                    ))
                } else {
                    Ok(Value::direct_primitive(
                        self.f64_t.const_float(num.value).into(),
                        ScalarKind::Double,
                    ))
                }
            }
            ast::Lit::Str(s) => {
                let ptr = self.intern_string(s.value.as_ref())?;
                Ok(Value::direct_str(ptr.into()))
            }
            ast::Lit::Bool(b) => Ok(Value::direct_primitive(
                self.bool_t.const_int(b.value as u64, false).into(),
                ScalarKind::Boolean,
            )),
            ast::Lit::Null(_) => Ok(Value::Null {
                raw: self.ptr_t.const_null(),
            }),
            ast::Lit::Regex(regex) => {
                let ptr = self.intern_string(regex.exp.as_ref())?;
                Ok(Value::direct_str(ptr.into()))
            }
            other => Err(Diagnostic::with_span(
                DiagnosticKind::UnsupportedConstruct,
                "literal kind has no lowering rule",
                span_of(other),
            )),
        }
    }

    /// Resolution order: variables, then classes, then module functions,
    /// then the language prelude. First match wins.
    fn lower_ident(
        &self,
        ident: &ast::Ident,
        scope: &mut Scope<'a>,
    ) -> Result<Value<'a>, Diagnostic> {
        let name = ident.sym.as_ref();
        if let Some(v) = scope.lookup(name) {
            return Ok(v);
        }
        if self.lookup_class(name).is_some() {
            return Ok(Value::Class {
                name: name.to_string(),
            });
        }
        if let Some(info) = self.lookup_function(name) {
            return Ok(Value::Function {
                value: info.value,
                sig: info.sig,
            });
        }
        if let Some(sig) = prelude_signature(name) {
            let param_types: Vec<ScriptType> =
                sig.params.iter().map(|(_, t)| t.clone()).collect();
            let fn_ty = self.build_fn_type(&param_types, &sig.ret);
            let f = self.declare_or_get_external(&mangle::free_symbol(name), fn_ty);
            return Ok(Value::Function { value: f, sig });
        }
        Err(Diagnostic::with_span(
            DiagnosticKind::UnknownIdentifier,
            format!("unknown identifier `{}`", name),
            span_of(ident),
        ))
    }

    // ---- binary operators ---------------------------------------------------

    fn lower_binary(
        &self,
        bin: &ast::BinExpr,
        function: FunctionValue<'a>,
        scope: &mut Scope<'a>,
    ) -> Result<Value<'a>, Diagnostic> {
        match bin.op {
            ast::BinaryOp::LogicalAnd | ast::BinaryOp::LogicalOr => {
                self.lower_logical(bin, function, scope)
            }
            op => {
                let lhs = self.lower_expr(&bin.left, function, scope, None)?;
                let rhs = self.lower_expr(&bin.right, function, scope, None)?;
                self.binary_value(op, &lhs, &rhs, span_of(bin))
            }
        }
    }

    /// Shared operator implementation: plain binary expressions and the
    /// compute half of compound assignment both come through here.
    pub(crate) fn binary_value(
        &self,
        op: ast::BinaryOp,
        lhs: &Value<'a>,
        rhs: &Value<'a>,
        span: usize,
    ) -> Result<Value<'a>, Diagnostic> {
        use ast::BinaryOp::*;
        match op {
            Add => self.lower_add(lhs, rhs, span),
            Sub | Mul | Div | Mod => self.lower_float_arith(op, lhs, rhs, span),
            Exp => {
                let l = self.expect_double(lhs, span)?;
                let r = self.expect_double(rhs, span)?;
                let pow = self.get_pow_f64();
                let call = self
                    .builder
                    .build_call(pow, &[l.into(), r.into()], "pow")
                    .map_err(|_| Diagnostic::simple("failed to build pow call"))?;
                let out = call
                    .try_as_basic_value()
                    .left()
                    .ok_or_else(|| Diagnostic::simple("pow call returned no value"))?;
                Ok(Value::direct_primitive(out, ScalarKind::Double))
            }
            EqEq | EqEqEq => self.lower_equality(lhs, rhs, true, span),
            NotEq | NotEqEq => self.lower_equality(lhs, rhs, false, span),
            Lt | Gt | LtEq | GtEq => self.lower_relational(op, lhs, rhs, span),
            BitXor | BitAnd | BitOr | LShift | RShift | ZeroFillRShift => {
                self.lower_int_bitop(op, lhs, rhs, span)
            }
            _ => Err(Diagnostic::with_span(
                DiagnosticKind::UnsupportedConstruct,
                "binary operator has no lowering rule",
                span,
            )),
        }
    }

    fn lower_add(
        &self,
        lhs: &Value<'a>,
        rhs: &Value<'a>,
        span: usize,
    ) -> Result<Value<'a>, Diagnostic> {
        if lhs.is_string() && rhs.is_string() {
            let l = lhs.load_if_indirect(self)?;
            let r = rhs.load_if_indirect(self)?;
            let out = self.call_str_concat(l.into_pointer_value(), r.into_pointer_value())?;
            return Ok(Value::direct_str(out.into()));
        }
        if lhs.is_string() != rhs.is_string() {
            return Err(Diagnostic::with_span(
                DiagnosticKind::TypeConversionUnsupported,
                "`+` operands must both be strings or both be numbers",
                span,
            ));
        }
        self.lower_float_arith(ast::BinaryOp::Add, lhs, rhs, span)
    }

    fn lower_float_arith(
        &self,
        op: ast::BinaryOp,
        lhs: &Value<'a>,
        rhs: &Value<'a>,
        span: usize,
    ) -> Result<Value<'a>, Diagnostic> {
        // Same-width integers take the integer instruction; everything
        // else is floating point with no implicit cross-kind coercion.
        if let (
            Value::Primitive {
                kind: ScalarKind::Int { signed, .. },
                ..
            },
            Value::Primitive {
                kind: ScalarKind::Int { .. },
                ..
            },
        ) = (lhs, rhs)
        {
            let l = lhs.load_if_indirect(self)?.into_int_value();
            let r = rhs.load_if_indirect(self)?.into_int_value();
            if l.get_type() != r.get_type() {
                return Err(Diagnostic::with_span(
                    DiagnosticKind::TypeConversionUnsupported,
                    "integer operands have different widths",
                    span,
                ));
            }
            let err = |_| Diagnostic::simple("failed to build integer arithmetic");
            let out = match op {
                ast::BinaryOp::Add => self.builder.build_int_add(l, r, "iadd").map_err(err)?,
                ast::BinaryOp::Sub => self.builder.build_int_sub(l, r, "isub").map_err(err)?,
                ast::BinaryOp::Mul => self.builder.build_int_mul(l, r, "imul").map_err(err)?,
                ast::BinaryOp::Div if *signed => {
                    self.builder.build_int_signed_div(l, r, "idiv").map_err(err)?
                }
                ast::BinaryOp::Div => self
                    .builder
                    .build_int_unsigned_div(l, r, "udiv")
                    .map_err(err)?,
                ast::BinaryOp::Mod if *signed => {
                    self.builder.build_int_signed_rem(l, r, "irem").map_err(err)?
                }
                _ => self
                    .builder
                    .build_int_unsigned_rem(l, r, "urem")
                    .map_err(err)?,
            };
            let kind = match lhs {
                Value::Primitive { kind, .. } => *kind,
                _ => ScalarKind::Unknown,
            };
            return Ok(Value::direct_primitive(out.into(), kind));
        }

        let l = self.expect_double(lhs, span)?;
        let r = self.expect_double(rhs, span)?;
        let err = |_| Diagnostic::simple("failed to build float arithmetic");
        let out = match op {
            ast::BinaryOp::Add => self.builder.build_float_add(l, r, "fadd").map_err(err)?,
            ast::BinaryOp::Sub => self.builder.build_float_sub(l, r, "fsub").map_err(err)?,
            ast::BinaryOp::Mul => self.builder.build_float_mul(l, r, "fmul").map_err(err)?,
            ast::BinaryOp::Div => self.builder.build_float_div(l, r, "fdiv").map_err(err)?,
            _ => self.builder.build_float_rem(l, r, "frem").map_err(err)?,
        };
        Ok(Value::direct_primitive(out.into(), ScalarKind::Double))
    }

    fn lower_equality(
        &self,
        lhs: &Value<'a>,
        rhs: &Value<'a>,
        eq: bool,
        span: usize,
    ) -> Result<Value<'a>, Diagnostic> {
        // Strings compare through the runtime (zero means equal).
        if lhs.is_string() && rhs.is_string() {
            let l = lhs.load_if_indirect(self)?.into_pointer_value();
            let r = rhs.load_if_indirect(self)?.into_pointer_value();
            let cmp = self.get_str_cmp();
            let call = self
                .builder
                .build_call(cmp, &[l.into(), r.into()], "strcmp")
                .map_err(|_| Diagnostic::simple("failed to build string compare"))?;
            let out = call
                .try_as_basic_value()
                .left()
                .ok_or_else(|| Diagnostic::simple("string compare returned no value"))?
                .into_int_value();
            let pred = if eq { IntPredicate::EQ } else { IntPredicate::NE };
            let res = self
                .builder
                .build_int_compare(pred, out, self.i32_t.const_zero(), "streq")
                .map_err(|_| Diagnostic::simple("failed to build compare"))?;
            return Ok(Value::direct_primitive(res.into(), ScalarKind::Boolean));
        }

        // Reference identity: arrays, objects, and null comparisons go
        // through pointer bits. Shallow by design.
        let lhs_ref = matches!(
            lhs,
            Value::Array { .. } | Value::Object { .. } | Value::Null { .. }
        );
        let rhs_ref = matches!(
            rhs,
            Value::Array { .. } | Value::Object { .. } | Value::Null { .. }
        );
        if lhs_ref || rhs_ref {
            if !(lhs_ref || lhs.is_string()) || !(rhs_ref || rhs.is_string()) {
                return Err(Diagnostic::with_span(
                    DiagnosticKind::TypeConversionUnsupported,
                    "cannot compare a reference value against a scalar",
                    span,
                ));
            }
            let l = lhs.load_if_indirect(self)?.into_pointer_value();
            let r = rhs.load_if_indirect(self)?.into_pointer_value();
            let li = self
                .builder
                .build_ptr_to_int(l, self.i64_t, "lhs_bits")
                .map_err(|_| Diagnostic::simple("failed to build ptrtoint"))?;
            let ri = self
                .builder
                .build_ptr_to_int(r, self.i64_t, "rhs_bits")
                .map_err(|_| Diagnostic::simple("failed to build ptrtoint"))?;
            let pred = if eq { IntPredicate::EQ } else { IntPredicate::NE };
            let res = self
                .builder
                .build_int_compare(pred, li, ri, "refeq")
                .map_err(|_| Diagnostic::simple("failed to build compare"))?;
            return Ok(Value::direct_primitive(res.into(), ScalarKind::Boolean));
        }

        match (lhs, rhs) {
            (
                Value::Primitive {
                    kind: ScalarKind::Boolean,
                    ..
                },
                Value::Primitive {
                    kind: ScalarKind::Boolean,
                    ..
                },
            ) => {
                let l = lhs.load_if_indirect(self)?.into_int_value();
                let r = rhs.load_if_indirect(self)?.into_int_value();
                let pred = if eq { IntPredicate::EQ } else { IntPredicate::NE };
                let res = self
                    .builder
                    .build_int_compare(pred, l, r, "booleq")
                    .map_err(|_| Diagnostic::simple("failed to build compare"))?;
                Ok(Value::direct_primitive(res.into(), ScalarKind::Boolean))
            }
            _ => {
                let l = self.expect_double(lhs, span)?;
                let r = self.expect_double(rhs, span)?;
                let pred = if eq {
                    FloatPredicate::OEQ
                } else {
                    FloatPredicate::ONE
                };
                let res = self
                    .builder
                    .build_float_compare(pred, l, r, "feq")
                    .map_err(|_| Diagnostic::simple("failed to build compare"))?;
                Ok(Value::direct_primitive(res.into(), ScalarKind::Boolean))
            }
        }
    }

    /// Relational comparison is floating-point only. `<=`/`>=` are
    /// synthesized as `(lt OR eq)` / `(gt OR eq)` pairs.
    fn lower_relational(
        &self,
        op: ast::BinaryOp,
        lhs: &Value<'a>,
        rhs: &Value<'a>,
        span: usize,
    ) -> Result<Value<'a>, Diagnostic> {
        let l = self.expect_double(lhs, span)?;
        let r = self.expect_double(rhs, span)?;
        let fcmp = |pred: FloatPredicate, name: &str| {
            self.builder
                .build_float_compare(pred, l, r, name)
                .map_err(|_| Diagnostic::simple("failed to build float compare"))
        };
        let out = match op {
            ast::BinaryOp::Lt => fcmp(FloatPredicate::OLT, "flt")?,
            ast::BinaryOp::Gt => fcmp(FloatPredicate::OGT, "fgt")?,
            ast::BinaryOp::LtEq => {
                let lt = fcmp(FloatPredicate::OLT, "flt")?;
                let eq = fcmp(FloatPredicate::OEQ, "feq")?;
                self.builder
                    .build_or(lt, eq, "fle")
                    .map_err(|_| Diagnostic::simple("failed to build or"))?
            }
            _ => {
                let gt = fcmp(FloatPredicate::OGT, "fgt")?;
                let eq = fcmp(FloatPredicate::OEQ, "feq")?;
                self.builder
                    .build_or(gt, eq, "fge")
                    .map_err(|_| Diagnostic::simple("failed to build or"))?
            }
        };
        Ok(Value::direct_primitive(out.into(), ScalarKind::Boolean))
    }

    fn lower_int_bitop(
        &self,
        op: ast::BinaryOp,
        lhs: &Value<'a>,
        rhs: &Value<'a>,
        span: usize,
    ) -> Result<Value<'a>, Diagnostic> {
        let (kind, signed) = match lhs {
            Value::Primitive {
                kind: kind @ ScalarKind::Int { signed, .. },
                ..
            } => (*kind, *signed),
            Value::Primitive {
                kind: kind @ ScalarKind::Boolean,
                ..
            } => (*kind, false),
            _ => {
                return Err(Diagnostic::with_span(
                    DiagnosticKind::TypeConversionUnsupported,
                    "bitwise operators require an integer representation",
                    span,
                ));
            }
        };
        if !matches!(
            rhs,
            Value::Primitive {
                kind: ScalarKind::Int { .. } | ScalarKind::Boolean,
                ..
            }
        ) {
            return Err(Diagnostic::with_span(
                DiagnosticKind::TypeConversionUnsupported,
                "bitwise operators require an integer representation",
                span,
            ));
        }
        let l = lhs.load_if_indirect(self)?.into_int_value();
        let r = rhs.load_if_indirect(self)?.into_int_value();
        let err = |_| Diagnostic::simple("failed to build bitwise op");
        let out = match op {
            ast::BinaryOp::BitXor => self.builder.build_xor(l, r, "xor").map_err(err)?,
            ast::BinaryOp::BitAnd => self.builder.build_and(l, r, "and").map_err(err)?,
            ast::BinaryOp::BitOr => self.builder.build_or(l, r, "or").map_err(err)?,
            ast::BinaryOp::LShift => self.builder.build_left_shift(l, r, "shl").map_err(err)?,
            ast::BinaryOp::RShift => self
                .builder
                .build_right_shift(l, r, signed, "shr")
                .map_err(err)?,
            _ => self
                .builder
                .build_right_shift(l, r, false, "lshr")
                .map_err(err)?,
        };
        Ok(Value::direct_primitive(out.into(), kind))
    }

    /// Logical `&&`/`||`. Reference-shaped left operands short-circuit
    /// through a null-check phi so the right side's side effects can be
    /// skipped; boolean operands are evaluated eagerly and combined with
    /// the bitwise instruction. The asymmetry is deliberate and matches
    /// the programs the runtime was linked against.
    fn lower_logical(
        &self,
        bin: &ast::BinExpr,
        function: FunctionValue<'a>,
        scope: &mut Scope<'a>,
    ) -> Result<Value<'a>, Diagnostic> {
        let is_and = bin.op == ast::BinaryOp::LogicalAnd;
        let lhs = self.lower_expr(&bin.left, function, scope, None)?;

        let lhs_ref = matches!(
            lhs,
            Value::Str { .. } | Value::Array { .. } | Value::Object { .. } | Value::Null { .. }
        );
        if lhs_ref {
            let l_loaded = lhs.load_if_indirect(self)?;
            let cond = lhs.to_boolean(self)?;
            let lhs_block = self
                .builder
                .get_insert_block()
                .ok_or_else(|| Diagnostic::simple("builder has no insert block"))?;
            let rhs_block = self.context.append_basic_block(function, "logic.rhs");
            let merge_block = self.context.append_basic_block(function, "logic.merge");

            let (on_true, on_false) = if is_and {
                (rhs_block, merge_block)
            } else {
                (merge_block, rhs_block)
            };
            self.builder
                .build_conditional_branch(cond, on_true, on_false)
                .map_err(|_| Diagnostic::simple("failed to build branch"))?;

            self.builder.position_at_end(rhs_block);
            let rhs = self.lower_expr(&bin.right, function, scope, None)?;
            let r_loaded = rhs.load_if_indirect(self)?;
            let rhs_end = self
                .builder
                .get_insert_block()
                .ok_or_else(|| Diagnostic::simple("builder has no insert block"))?;
            self.builder
                .build_unconditional_branch(merge_block)
                .map_err(|_| Diagnostic::simple("failed to build branch"))?;

            self.builder.position_at_end(merge_block);
            let phi = self
                .builder
                .build_phi(self.ptr_t, "logic.result")
                .map_err(|_| Diagnostic::simple("failed to build phi"))?;
            phi.add_incoming(&[(&l_loaded, lhs_block), (&r_loaded, rhs_end)]);
            let out = phi.as_basic_value();
            // The join keeps the operand shape when both sides agree, so
            // the result stays usable for indexing, length, and calls.
            return Ok(match (&lhs, &rhs) {
                (Value::Str { .. }, Value::Str { .. }) => Value::direct_str(out),
                (
                    Value::Array {
                        elem_ty, elem, len, ..
                    },
                    Value::Array {
                        elem: r_elem,
                        len: r_len,
                        ..
                    },
                ) if elem == r_elem && len == r_len => Value::Array {
                    ptr: out.into_pointer_value(),
                    elem_ty: *elem_ty,
                    elem: *elem,
                    len: *len,
                },
                (
                    Value::Object { class, .. },
                    Value::Object { class: r_class, .. },
                ) if class == r_class => Value::Object {
                    class: class.clone(),
                    storage: Storage::Direct(out),
                },
                // A null side keeps the reference shape of the other side.
                (Value::Object { class, .. }, Value::Null { .. })
                | (Value::Null { .. }, Value::Object { class, .. }) => Value::Object {
                    class: class.clone(),
                    storage: Storage::Direct(out),
                },
                (Value::Null { .. }, Value::Null { .. }) => Value::Null {
                    raw: out.into_pointer_value(),
                },
                _ => Value::direct_primitive(out, ScalarKind::Unknown),
            });
        }

        let rhs = self.lower_expr(&bin.right, function, scope, None)?;
        match (&lhs, &rhs) {
            (
                Value::Primitive {
                    kind: ScalarKind::Boolean,
                    ..
                },
                Value::Primitive {
                    kind: ScalarKind::Boolean,
                    ..
                },
            ) => {
                let l = lhs.load_if_indirect(self)?.into_int_value();
                let r = rhs.load_if_indirect(self)?.into_int_value();
                let out = if is_and {
                    self.builder.build_and(l, r, "and")
                } else {
                    self.builder.build_or(l, r, "or")
                }
                .map_err(|_| Diagnostic::simple("failed to build logical op"))?;
                Ok(Value::direct_primitive(out.into(), ScalarKind::Boolean))
            }
            _ => Err(Diagnostic::with_span(
                DiagnosticKind::TypeConversionUnsupported,
                "logical operands must be booleans or reference values",
                span_of(bin),
            )),
        }
    }

    // ---- assignment -----------------------------------------------------------

    fn lower_assign(
        &self,
        assign: &ast::AssignExpr,
        function: FunctionValue<'a>,
        scope: &mut Scope<'a>,
    ) -> Result<Value<'a>, Diagnostic> {
        let name = match &assign.left {
            ast::AssignTarget::Simple(ast::SimpleAssignTarget::Ident(bind)) => {
                bind.id.sym.to_string()
            }
            _ => {
                return Err(Diagnostic::with_span(
                    DiagnosticKind::UnsupportedConstruct,
                    "assignment target must be a plain identifier",
                    span_of(assign),
                ));
            }
        };
        let target = scope.lookup(&name).ok_or_else(|| {
            Diagnostic::with_span(
                DiagnosticKind::UnknownIdentifier,
                format!("unknown identifier `{}`", name),
                span_of(assign),
            )
        })?;

        let expected = expected_of(&target);
        let rhs = self.lower_expr(&assign.right, function, scope, expected.as_ref())?;
        let stored = match assign.op {
            ast::AssignOp::Assign => rhs,
            compound => {
                let base = match compound {
                    ast::AssignOp::AddAssign => ast::BinaryOp::Add,
                    ast::AssignOp::SubAssign => ast::BinaryOp::Sub,
                    ast::AssignOp::MulAssign => ast::BinaryOp::Mul,
                    ast::AssignOp::DivAssign => ast::BinaryOp::Div,
                    ast::AssignOp::ModAssign => ast::BinaryOp::Mod,
                    ast::AssignOp::ExpAssign => ast::BinaryOp::Exp,
                    _ => {
                        return Err(Diagnostic::with_span(
                            DiagnosticKind::UnsupportedConstruct,
                            "compound assignment operator has no lowering rule",
                            span_of(assign),
                        ));
                    }
                };
                self.binary_value(base, &target, &rhs, span_of(assign))?
            }
        };
        self.generate_assignment(&target, &stored, span_of(assign))
    }

    /// Store a value into an addressable slot. All shapes share the same
    /// store semantics; only the stored raw representation differs. The
    /// left operand is yielded.
    pub(crate) fn generate_assignment(
        &self,
        target: &Value<'a>,
        rhs: &Value<'a>,
        span: usize,
    ) -> Result<Value<'a>, Diagnostic> {
        let (ptr, _) = target.slot().ok_or_else(|| {
            Diagnostic::with_span(
                DiagnosticKind::UnsupportedConstruct,
                "assignment target is not an addressable slot",
                span,
            )
        })?;
        let target_kind = target.semantic_kind()?;
        let rhs_kind = rhs.semantic_kind()?;
        let compatible = match (&target_kind, &rhs_kind) {
            (SemanticKind::String, SemanticKind::String) => true,
            (SemanticKind::Object, SemanticKind::Object | SemanticKind::Null) => true,
            (SemanticKind::Scalar(a), SemanticKind::Scalar(b)) => a == b,
            _ => false,
        };
        if !compatible {
            return Err(Diagnostic::with_span(
                DiagnosticKind::TypeMismatch,
                "assigned value does not match the declared binding kind",
                span,
            ));
        }
        let loaded = rhs.load_if_indirect(self)?;
        self.builder
            .build_store(ptr, loaded)
            .map_err(|_| Diagnostic::simple("failed to build store"))?;
        Ok(target.clone())
    }

    // ---- unary / update ---------------------------------------------------------

    fn lower_unary(
        &self,
        unary: &ast::UnaryExpr,
        function: FunctionValue<'a>,
        scope: &mut Scope<'a>,
    ) -> Result<Value<'a>, Diagnostic> {
        let arg = self.lower_expr(&unary.arg, function, scope, None)?;
        match unary.op {
            ast::UnaryOp::Bang => {
                // `!x` on a reference value means "is null", not "is empty".
                let cond = arg.to_boolean(self)?;
                let negated = self
                    .builder
                    .build_not(cond, "not")
                    .map_err(|_| Diagnostic::simple("failed to build not"))?;
                Ok(Value::direct_primitive(
                    negated.into(),
                    ScalarKind::Boolean,
                ))
            }
            ast::UnaryOp::Minus => match &arg {
                Value::Primitive {
                    kind: ScalarKind::Double,
                    ..
                } => {
                    let v = arg.load_if_indirect(self)?.into_float_value();
                    let out = self
                        .builder
                        .build_float_neg(v, "fneg")
                        .map_err(|_| Diagnostic::simple("failed to build fneg"))?;
                    Ok(Value::direct_primitive(out.into(), ScalarKind::Double))
                }
                Value::Primitive {
                    kind: kind @ ScalarKind::Int { .. },
                    ..
                } => {
                    let v = arg.load_if_indirect(self)?.into_int_value();
                    let out = self
                        .builder
                        .build_int_neg(v, "ineg")
                        .map_err(|_| Diagnostic::simple("failed to build ineg"))?;
                    Ok(Value::direct_primitive(out.into(), *kind))
                }
                _ => Err(Diagnostic::with_span(
                    DiagnosticKind::TypeConversionUnsupported,
                    "unary minus requires a numeric operand",
                    span_of(unary),
                )),
            },
            ast::UnaryOp::Plus => match &arg {
                Value::Primitive { kind, .. } => {
                    let v = arg.load_if_indirect(self)?;
                    Ok(Value::direct_primitive(v, *kind))
                }
                _ => Err(Diagnostic::with_span(
                    DiagnosticKind::TypeConversionUnsupported,
                    "unary plus requires a numeric operand",
                    span_of(unary),
                )),
            },
            _ => Err(Diagnostic::with_span(
                DiagnosticKind::UnsupportedConstruct,
                "unary operator has no lowering rule",
                span_of(unary),
            )),
        }
    }

    /// `++`/`--` synthesize load, add-or-sub 1.0, store. Prefix yields
    /// the lvalue; postfix yields the pre-mutation value.
    fn lower_update(
        &self,
        update: &ast::UpdateExpr,
        _function: FunctionValue<'a>,
        scope: &mut Scope<'a>,
    ) -> Result<Value<'a>, Diagnostic> {
        let name = match update.arg.as_ref() {
            ast::Expr::Ident(id) => id.sym.to_string(),
            _ => {
                return Err(Diagnostic::with_span(
                    DiagnosticKind::UnsupportedConstruct,
                    "increment/decrement target must be a plain identifier",
                    span_of(update),
                ));
            }
        };
        let var = scope.lookup(&name).ok_or_else(|| {
            Diagnostic::with_span(
                DiagnosticKind::UnknownIdentifier,
                format!("unknown identifier `{}`", name),
                span_of(update),
            )
        })?;
        if !matches!(
            var,
            Value::Primitive {
                kind: ScalarKind::Double,
                ..
            }
        ) {
            return Err(Diagnostic::with_span(
                DiagnosticKind::TypeConversionUnsupported,
                "increment/decrement requires a number variable",
                span_of(update),
            ));
        }
        let (ptr, _) = var.slot().ok_or_else(|| {
            Diagnostic::with_span(
                DiagnosticKind::UnsupportedConstruct,
                "increment/decrement target is not an addressable slot",
                span_of(update),
            )
        })?;
        let old = var.load_if_indirect(self)?.into_float_value();
        let one = self.f64_t.const_float(1.0);
        let new = match update.op {
            ast::UpdateOp::PlusPlus => self.builder.build_float_add(old, one, "inc"),
            ast::UpdateOp::MinusMinus => self.builder.build_float_sub(old, one, "dec"),
        }
        .map_err(|_| Diagnostic::simple("failed to build update arithmetic"))?;
        self.builder
            .build_store(ptr, new)
            .map_err(|_| Diagnostic::simple("failed to build store"))?;
        if update.prefix {
            Ok(var)
        } else {
            Ok(Value::direct_primitive(old.into(), ScalarKind::Double))
        }
    }

    // ---- conditional ----------------------------------------------------------

    /// Ternary: evaluate the condition, branch, materialize each arm in
    /// its own block, and join with a phi. Arm kinds must match exactly.
    fn lower_cond(
        &self,
        cond: &ast::CondExpr,
        function: FunctionValue<'a>,
        scope: &mut Scope<'a>,
        expected: Option<&ScriptType>,
    ) -> Result<Value<'a>, Diagnostic> {
        let test = self.lower_expr(&cond.test, function, scope, None)?;
        let c = test.to_boolean(self)?;

        let then_block = self.context.append_basic_block(function, "ternary.then");
        let else_block = self.context.append_basic_block(function, "ternary.else");
        let merge_block = self.context.append_basic_block(function, "ternary.merge");
        self.builder
            .build_conditional_branch(c, then_block, else_block)
            .map_err(|_| Diagnostic::simple("failed to build branch"))?;

        self.builder.position_at_end(then_block);
        let then_val = self.lower_expr(&cond.cons, function, scope, expected)?;
        let then_loaded = then_val.load_if_indirect(self)?;
        let then_end = self
            .builder
            .get_insert_block()
            .ok_or_else(|| Diagnostic::simple("builder has no insert block"))?;
        self.builder
            .build_unconditional_branch(merge_block)
            .map_err(|_| Diagnostic::simple("failed to build branch"))?;

        self.builder.position_at_end(else_block);
        let else_val = self.lower_expr(&cond.alt, function, scope, expected)?;
        let else_loaded = else_val.load_if_indirect(self)?;
        let else_end = self
            .builder
            .get_insert_block()
            .ok_or_else(|| Diagnostic::simple("builder has no insert block"))?;
        self.builder
            .build_unconditional_branch(merge_block)
            .map_err(|_| Diagnostic::simple("failed to build branch"))?;

        if then_val.semantic_kind()? != else_val.semantic_kind()? {
            return Err(Diagnostic::with_span(
                DiagnosticKind::TypeMismatch,
                "ternary arms have different kinds",
                span_of(cond),
            ));
        }

        self.builder.position_at_end(merge_block);
        let phi = self
            .builder
            .build_phi(then_loaded.get_type(), "ternary.result")
            .map_err(|_| Diagnostic::simple("failed to build phi"))?;
        phi.add_incoming(&[(&then_loaded, then_end), (&else_loaded, else_end)]);
        let out = phi.as_basic_value();

        Ok(match &then_val {
            Value::Str { .. } => Value::direct_str(out),
            Value::Array {
                elem_ty, elem, len, ..
            } => Value::Array {
                ptr: out.into_pointer_value(),
                elem_ty: *elem_ty,
                elem: *elem,
                len: *len,
            },
            Value::Object { class, .. } => Value::Object {
                class: class.clone(),
                storage: Storage::Direct(out),
            },
            Value::Null { .. } => Value::Null {
                raw: out.into_pointer_value(),
            },
            Value::Primitive { kind, .. } => Value::direct_primitive(out, *kind),
            _ => {
                return Err(Diagnostic::with_span(
                    DiagnosticKind::TypeMismatch,
                    "ternary arms must produce first-class values",
                    span_of(cond),
                ));
            }
        })
    }

    // ---- calls ------------------------------------------------------------------

    fn lower_call(
        &self,
        call: &ast::CallExpr,
        function: FunctionValue<'a>,
        scope: &mut Scope<'a>,
    ) -> Result<Value<'a>, Diagnostic> {
        let callee = match &call.callee {
            ast::Callee::Expr(e) => e.as_ref(),
            _ => {
                return Err(Diagnostic::with_span(
                    DiagnosticKind::UnsupportedConstruct,
                    "call target has no lowering rule",
                    span_of(call),
                ));
            }
        };

        // Method call: dispatch on the receiver's carrier type first.
        if let ast::Expr::Member(member) = callee {
            if let ast::MemberProp::Ident(prop) = &member.prop {
                let method_name = prop.sym.to_string();
                let receiver = self.lower_expr(&member.obj, function, scope, None)?;
                let class_name = receiver_class(&receiver).ok_or_else(|| {
                    Diagnostic::with_span(
                        DiagnosticKind::UnresolvableCallTarget,
                        format!("no method receiver for `{}`", method_name),
                        span_of(call),
                    )
                })?;
                if builtins::is_api_function(&class_name, &method_name) {
                    return self.generate_api_call(
                        &class_name,
                        &method_name,
                        &receiver,
                        &call.args,
                        function,
                        scope,
                        span_of(call),
                    );
                }
                if let Some(info) = self.lookup_class(&class_name) {
                    if let Some(sig) = info.methods.get(&method_name) {
                        return self.generate_method_call(
                            &class_name,
                            &method_name,
                            sig,
                            &receiver,
                            &call.args,
                            function,
                            scope,
                            span_of(call),
                        );
                    }
                }
                return Err(Diagnostic::with_span(
                    DiagnosticKind::UnresolvableCallTarget,
                    format!("no method `{}` on type `{}`", method_name, class_name),
                    span_of(call),
                ));
            }
        }

        // Plain call: resolve the callee as a function value.
        let target = self.lower_expr(callee, function, scope, None)?;
        match target {
            Value::Function { value, sig } => {
                self.build_direct_call(value, &sig, &call.args, function, scope, span_of(call))
            }
            _ => Err(Diagnostic::with_span(
                DiagnosticKind::UnresolvableCallTarget,
                "callee is not a function",
                span_of(call),
            )),
        }
    }

    fn lower_args(
        &self,
        args: &[ast::ExprOrSpread],
        params: &[ScriptType],
        function: FunctionValue<'a>,
        scope: &mut Scope<'a>,
        span: usize,
    ) -> Result<Vec<BasicMetadataValueEnum<'a>>, Diagnostic> {
        if args.len() != params.len() {
            return Err(Diagnostic::with_span(
                DiagnosticKind::TypeMismatch,
                format!("expected {} arguments, found {}", params.len(), args.len()),
                span,
            ));
        }
        let mut lowered = Vec::with_capacity(args.len());
        for (arg, param_ty) in args.iter().zip(params) {
            if arg.spread.is_some() {
                return Err(Diagnostic::with_span(
                    DiagnosticKind::UnsupportedConstruct,
                    "spread arguments have no lowering rule",
                    span,
                ));
            }
            let v = self.lower_expr(&arg.expr, function, scope, Some(param_ty))?;
            lowered.push(v.load_if_indirect(self)?.into());
        }
        Ok(lowered)
    }

    fn build_direct_call(
        &self,
        f: FunctionValue<'a>,
        sig: &FunctionSig,
        args: &[ast::ExprOrSpread],
        function: FunctionValue<'a>,
        scope: &mut Scope<'a>,
        span: usize,
    ) -> Result<Value<'a>, Diagnostic> {
        let params: Vec<ScriptType> = sig.params.iter().map(|(_, t)| t.clone()).collect();
        let lowered = self.lower_args(args, &params, function, scope, span)?;
        let call = self
            .builder
            .build_call(f, &lowered, "call")
            .map_err(|_| Diagnostic::simple("failed to build call"))?;
        Ok(self.value_from_return(&sig.ret, call.try_as_basic_value().left()))
    }

    /// Builtin API call: mangled symbol, receiver first, memoized by
    /// signature identity.
    #[allow(clippy::too_many_arguments)]
    fn generate_api_call(
        &self,
        class_name: &str,
        method_name: &str,
        receiver: &Value<'a>,
        args: &[ast::ExprOrSpread],
        function: FunctionValue<'a>,
        scope: &mut Scope<'a>,
        span: usize,
    ) -> Result<Value<'a>, Diagnostic> {
        let method = builtins::api_method(class_name, method_name).ok_or_else(|| {
            Diagnostic::with_span(
                DiagnosticKind::UnresolvableCallTarget,
                format!("no builtin `{}` on `{}`", method_name, class_name),
                span,
            )
        })?;
        let param_types: Vec<ScriptType> =
            method.params.iter().map(|k| k.script_type()).collect();
        let symbol = mangle::method_symbol(class_name, method_name, &param_types);

        let receiver_ty = self.receiver_abi_type(class_name)?;
        let mut ir_params: Vec<inkwell::types::BasicMetadataTypeEnum> = vec![receiver_ty.into()];
        for p in &param_types {
            ir_params.push(self.map_type_to_llvm(p).into());
        }
        let ret_ty = match method.ret {
            ApiKind::Double => self.f64_t.into(),
            ApiKind::Boolean => self.bool_t.into(),
            ApiKind::Str | ApiKind::StrArray => {
                let t: inkwell::types::BasicTypeEnum = self.ptr_t.into();
                t
            }
        };
        let fn_ty = match ret_ty {
            inkwell::types::BasicTypeEnum::FloatType(t) => t.fn_type(&ir_params, false),
            inkwell::types::BasicTypeEnum::IntType(t) => t.fn_type(&ir_params, false),
            inkwell::types::BasicTypeEnum::PointerType(t) => t.fn_type(&ir_params, false),
            _ => self.ptr_t.fn_type(&ir_params, false),
        };

        let key = SignatureKey {
            class: Some(class_name.to_string()),
            member: method_name.to_string(),
            params: param_types.clone(),
        };
        let f = self.declare_or_get_signature(key, &symbol, fn_ty);

        let mut lowered: Vec<BasicMetadataValueEnum> =
            vec![receiver.load_if_indirect(self)?.into()];
        lowered.extend(self.lower_args(args, &param_types, function, scope, span)?);

        let call = self
            .builder
            .build_call(f, &lowered, "api_call")
            .map_err(|_| Diagnostic::simple("failed to build api call"))?;
        let out = call
            .try_as_basic_value()
            .left()
            .ok_or_else(|| Diagnostic::simple("api call returned no value"))?;
        Ok(match method.ret {
            ApiKind::Double => Value::direct_primitive(out, ScalarKind::Double),
            ApiKind::Boolean => Value::direct_primitive(out, ScalarKind::Boolean),
            ApiKind::Str => Value::direct_str(out),
            ApiKind::StrArray => Value::Array {
                ptr: out.into_pointer_value(),
                elem_ty: self.ptr_t.into(),
                elem: ElemKind::Str,
                len: 0,
            },
        })
    }

    /// Method call on a user class: the mangled symbol is declared on
    /// first use; the runtime archive (or a sibling unit) defines it.
    #[allow(clippy::too_many_arguments)]
    fn generate_method_call(
        &self,
        class_name: &str,
        method_name: &str,
        sig: &FunctionSig,
        receiver: &Value<'a>,
        args: &[ast::ExprOrSpread],
        function: FunctionValue<'a>,
        scope: &mut Scope<'a>,
        span: usize,
    ) -> Result<Value<'a>, Diagnostic> {
        let param_types: Vec<ScriptType> = sig.params.iter().map(|(_, t)| t.clone()).collect();
        let symbol = mangle::method_symbol(class_name, method_name, &param_types);

        let mut ir_params: Vec<inkwell::types::BasicMetadataTypeEnum> =
            vec![self.ptr_t.into()];
        for p in &param_types {
            ir_params.push(self.map_type_to_llvm(p).into());
        }
        let fn_ty = match &sig.ret {
            ScriptType::Void => self.context.void_type().fn_type(&ir_params, false),
            other => self.map_type_to_llvm(other).fn_type(&ir_params, false),
        };
        let key = SignatureKey {
            class: Some(class_name.to_string()),
            member: method_name.to_string(),
            params: param_types.clone(),
        };
        let f = self.declare_or_get_signature(key, &symbol, fn_ty);

        let mut lowered: Vec<BasicMetadataValueEnum> =
            vec![receiver.load_if_indirect(self)?.into()];
        lowered.extend(self.lower_args(args, &param_types, function, scope, span)?);
        let call = self
            .builder
            .build_call(f, &lowered, "method_call")
            .map_err(|_| Diagnostic::simple("failed to build method call"))?;
        Ok(self.value_from_return(&sig.ret, call.try_as_basic_value().left()))
    }

    /// `new C(...)`: the callee must resolve to a class; the constructor
    /// symbol is mangled with the canonical constructor member name.
    fn lower_new(
        &self,
        new: &ast::NewExpr,
        function: FunctionValue<'a>,
        scope: &mut Scope<'a>,
    ) -> Result<Value<'a>, Diagnostic> {
        let target = self.lower_expr(&new.callee, function, scope, None)?;
        let class_name = match target {
            Value::Class { name } => name,
            _ => {
                return Err(Diagnostic::with_span(
                    DiagnosticKind::UnresolvableCallTarget,
                    "`new` target is not a class",
                    span_of(new),
                ));
            }
        };
        let info = self.lookup_class(&class_name).ok_or_else(|| {
            Diagnostic::with_span(
                DiagnosticKind::UnknownIdentifier,
                format!("unknown class `{}`", class_name),
                span_of(new),
            )
        })?;

        let symbol = mangle::constructor_symbol(&class_name, &info.ctor_params);
        let ir_params: Vec<inkwell::types::BasicMetadataTypeEnum> = info
            .ctor_params
            .iter()
            .map(|t| self.map_type_to_llvm(t).into())
            .collect();
        let fn_ty = self.ptr_t.fn_type(&ir_params, false);
        let key = SignatureKey {
            class: Some(class_name.clone()),
            member: mangle::CONSTRUCTOR_MEMBER.to_string(),
            params: info.ctor_params.clone(),
        };
        let f = self.declare_or_get_signature(key, &symbol, fn_ty);

        let empty: Vec<ast::ExprOrSpread> = Vec::new();
        let args = new.args.as_deref().unwrap_or(&empty);
        let lowered = self.lower_args(args, &info.ctor_params, function, scope, span_of(new))?;
        let call = self
            .builder
            .build_call(f, &lowered, "construct")
            .map_err(|_| Diagnostic::simple("failed to build constructor call"))?;
        let out = call
            .try_as_basic_value()
            .left()
            .ok_or_else(|| Diagnostic::simple("constructor returned no value"))?;
        Ok(Value::Object {
            class: class_name,
            storage: Storage::Direct(out),
        })
    }

    // ---- member / element access ---------------------------------------------

    /// Property access resolves through three disjoint paths: the
    /// ingredient accessor table, the fixed `length` property, then the
    /// container itself for namespaced accessors. Anything else is
    /// unsupported rather than guessed at.
    fn lower_member(
        &self,
        member: &ast::MemberExpr,
        function: FunctionValue<'a>,
        scope: &mut Scope<'a>,
    ) -> Result<Value<'a>, Diagnostic> {
        if let Some(full_name) = dotted_path(&ast::Expr::Member(member.clone())) {
            if builtins::ingredient_type(&full_name).is_some() {
                let fn_ty = self.ptr_t.fn_type(&[], false);
                let f = self.declare_or_get_external(&full_name, fn_ty);
                let call = self
                    .builder
                    .build_call(f, &[], "ingredient")
                    .map_err(|_| Diagnostic::simple("failed to build ingredient call"))?;
                let out = call
                    .try_as_basic_value()
                    .left()
                    .ok_or_else(|| Diagnostic::simple("ingredient call returned no value"))?;
                return Ok(Value::direct_str(out));
            }
        }

        let prop_name = match &member.prop {
            ast::MemberProp::Ident(id) => id.sym.to_string(),
            _ => {
                return Err(Diagnostic::with_span(
                    DiagnosticKind::UnsupportedPropertyAccess,
                    "property access requires a plain identifier",
                    span_of(member),
                ));
            }
        };

        let object = self.lower_expr(&member.obj, function, scope, None)?;

        if prop_name == "length" {
            match &object {
                Value::Str { .. } => {
                    let ptr = object.load_if_indirect(self)?;
                    let f = self.get_str_len();
                    let call = self
                        .builder
                        .build_call(f, &[ptr.into()], "str_len")
                        .map_err(|_| Diagnostic::simple("failed to build length call"))?;
                    let out = call
                        .try_as_basic_value()
                        .left()
                        .ok_or_else(|| Diagnostic::simple("length call returned no value"))?;
                    return Ok(Value::direct_primitive(out, ScalarKind::Double));
                }
                Value::Array {
                    ptr, elem, len, ..
                } => {
                    // String arrays come back from the runtime with an
                    // unknown compile-time length; ask the runtime.
                    if *elem == ElemKind::Str {
                        let f = self.get_arr_len();
                        let call = self
                            .builder
                            .build_call(f, &[(*ptr).into()], "arr_len")
                            .map_err(|_| Diagnostic::simple("failed to build length call"))?;
                        let out = call.try_as_basic_value().left().ok_or_else(|| {
                            Diagnostic::simple("length call returned no value")
                        })?;
                        return Ok(Value::direct_primitive(out, ScalarKind::Double));
                    }
                    return Ok(Value::direct_primitive(
                        self.f64_t.const_float(*len as f64).into(),
                        ScalarKind::Double,
                    ));
                }
                _ => {}
            }
        }

        // Namespaced accessors resolve to their container.
        match object {
            Value::Object { .. } | Value::Class { .. } | Value::Str { .. }
            | Value::Array { .. } => Ok(object),
            _ => Err(Diagnostic::with_span(
                DiagnosticKind::UnsupportedPropertyAccess,
                format!("unsupported property access `{}`", prop_name),
                span_of(member),
            )),
        }
    }

    /// `a[i]`: float index converted to a signed integer, in-bounds
    /// address computation, element load. No bounds checking at this
    /// layer; the fixed capacity is the generator's contract.
    fn lower_element_access(
        &self,
        member: &ast::MemberExpr,
        function: FunctionValue<'a>,
        scope: &mut Scope<'a>,
    ) -> Result<Value<'a>, Diagnostic> {
        let object = self.lower_expr(&member.obj, function, scope, None)?;
        let (ptr, elem_ty, elem) = match &object {
            Value::Array {
                ptr, elem_ty, elem, ..
            } => (*ptr, *elem_ty, *elem),
            _ => {
                return Err(Diagnostic::with_span(
                    DiagnosticKind::UnsupportedConstruct,
                    "element access requires an array",
                    span_of(member),
                ));
            }
        };
        let index_expr = match &member.prop {
            ast::MemberProp::Computed(c) => &c.expr,
            _ => {
                return Err(Diagnostic::simple("element access without index"));
            }
        };
        let index = self.lower_expr(index_expr, function, scope, None)?;
        let loaded = index.load_if_indirect(self)?;
        let index_int = match loaded {
            BasicValueEnum::FloatValue(f) => self
                .builder
                .build_float_to_signed_int(f, self.i32_t, "idx")
                .map_err(|_| Diagnostic::simple("failed to build fptosi"))?,
            BasicValueEnum::IntValue(i) => i,
            _ => {
                return Err(Diagnostic::with_span(
                    DiagnosticKind::TypeConversionUnsupported,
                    "array index must be numeric",
                    span_of(member),
                ));
            }
        };
        let elem_ptr = unsafe {
            self.builder
                .build_in_bounds_gep(elem_ty, ptr, &[index_int], "elem_ptr")
                .map_err(|_| Diagnostic::simple("failed to build element address"))?
        };
        let loaded = self
            .builder
            .build_load(elem_ty, elem_ptr, "elem")
            .map_err(|_| Diagnostic::simple("failed to load element"))?;
        Ok(match elem {
            ElemKind::Str => Value::direct_str(loaded),
            ElemKind::Scalar(kind) => Value::direct_primitive(loaded, kind),
        })
    }

    /// Array literal: stack-allocate exactly the literal's element count
    /// and store each element in source order. The element type must be
    /// resolvable from the declaration annotation.
    fn lower_array_literal(
        &self,
        array: &ast::ArrayLit,
        function: FunctionValue<'a>,
        scope: &mut Scope<'a>,
        expected: Option<&ScriptType>,
    ) -> Result<Value<'a>, Diagnostic> {
        let elem_script_ty = match expected {
            Some(ScriptType::Array(inner)) => inner.as_ref().clone(),
            _ => {
                return Err(Diagnostic::with_span(
                    DiagnosticKind::MissingNativeType,
                    "array literal requires a resolved element type",
                    span_of(array),
                ));
            }
        };
        let elem_ty = self.map_type_to_llvm(&elem_script_ty);
        let len = array.elems.len() as u32;
        let array_ty = elem_ty.array_type(len);
        let slot = self
            .builder
            .build_alloca(array_ty, "array_literal")
            .map_err(|_| Diagnostic::simple("failed to allocate array literal"))?;

        for (i, elem) in array.elems.iter().enumerate() {
            let elem = elem.as_ref().ok_or_else(|| {
                Diagnostic::with_span(
                    DiagnosticKind::UnsupportedConstruct,
                    "array holes have no lowering rule",
                    span_of(array),
                )
            })?;
            if elem.spread.is_some() {
                return Err(Diagnostic::with_span(
                    DiagnosticKind::UnsupportedConstruct,
                    "spread elements have no lowering rule",
                    span_of(array),
                ));
            }
            let v = self.lower_expr(&elem.expr, function, scope, Some(&elem_script_ty))?;
            let loaded = v.load_if_indirect(self)?;
            let idx = self.i32_t.const_int(i as u64, false);
            let elem_ptr = unsafe {
                self.builder
                    .build_in_bounds_gep(elem_ty, slot, &[idx], "slot_ptr")
                    .map_err(|_| Diagnostic::simple("failed to build element address"))?
            };
            self.builder
                .build_store(elem_ptr, loaded)
                .map_err(|_| Diagnostic::simple("failed to store element"))?;
        }

        Ok(Value::Array {
            ptr: slot,
            elem_ty,
            elem: Self::elem_kind_of(&elem_script_ty),
            len,
        })
    }

    /// Template literal: fold left-to-right through the runtime concat
    /// helper, stringifying interpolated doubles on the way.
    fn lower_template(
        &self,
        tpl: &ast::Tpl,
        function: FunctionValue<'a>,
        scope: &mut Scope<'a>,
    ) -> Result<Value<'a>, Diagnostic> {
        let quasi_text = |q: &ast::TplElement| -> String {
            q.cooked
                .as_ref()
                .map(|c| c.to_string())
                .unwrap_or_else(|| q.raw.to_string())
        };

        let head = tpl
            .quasis
            .first()
            .map(&quasi_text)
            .unwrap_or_default();
        let mut acc = self.intern_string(&head)?;
        for (i, expr) in tpl.exprs.iter().enumerate() {
            let v = self.lower_expr(expr, function, scope, None)?;
            let s = self.stringify_for_template(&v, span_of(tpl))?;
            acc = self.call_str_concat(acc, s)?;
            if let Some(tail) = tpl.quasis.get(i + 1) {
                let text = quasi_text(tail);
                if !text.is_empty() {
                    let tail_ptr = self.intern_string(&text)?;
                    acc = self.call_str_concat(acc, tail_ptr)?;
                }
            }
        }
        Ok(Value::direct_str(acc.into()))
    }

    fn stringify_for_template(
        &self,
        v: &Value<'a>,
        span: usize,
    ) -> Result<PointerValue<'a>, Diagnostic> {
        if v.is_string() {
            return Ok(v.load_if_indirect(self)?.into_pointer_value());
        }
        if let Value::Primitive {
            kind: ScalarKind::Double,
            ..
        } = v
        {
            let loaded = v.load_if_indirect(self)?;
            let f = self.get_num_to_str();
            let call = self
                .builder
                .build_call(f, &[loaded.into()], "num_to_str")
                .map_err(|_| Diagnostic::simple("failed to build stringify call"))?;
            let out = call
                .try_as_basic_value()
                .left()
                .ok_or_else(|| Diagnostic::simple("stringify call returned no value"))?;
            return Ok(out.into_pointer_value());
        }
        Err(Diagnostic::with_span(
            DiagnosticKind::UnsupportedStringification,
            "only strings and numbers can be interpolated",
            span,
        ))
    }

    pub(crate) fn call_str_concat(
        &self,
        lhs: PointerValue<'a>,
        rhs: PointerValue<'a>,
    ) -> Result<PointerValue<'a>, Diagnostic> {
        let f = self.get_str_concat();
        let call = self
            .builder
            .build_call(f, &[lhs.into(), rhs.into()], "concat")
            .map_err(|_| Diagnostic::simple("failed to build concat call"))?;
        let out = call
            .try_as_basic_value()
            .left()
            .ok_or_else(|| Diagnostic::simple("concat call returned no value"))?;
        Ok(out.into_pointer_value())
    }

    fn expect_double(
        &self,
        v: &Value<'a>,
        span: usize,
    ) -> Result<inkwell::values::FloatValue<'a>, Diagnostic> {
        match v {
            Value::Primitive {
                kind: ScalarKind::Double,
                ..
            } => Ok(v.load_if_indirect(self)?.into_float_value()),
            _ => Err(Diagnostic::with_span(
                DiagnosticKind::TypeConversionUnsupported,
                "operand is not a number",
                span,
            )),
        }
    }
}
