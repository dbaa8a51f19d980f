//! Typed value model.
//!
//! Every expression lowers to a `Value`: the raw IR handle plus the
//! semantic kind the rest of the engine needs to pick instructions and
//! call targets. Scalars and strings can live either as first-class IR
//! values or behind a stack slot; arrays and objects are always handled
//! by reference. The slot-vs-direct distinction is dereferenced in
//! exactly one place, `Value::load_if_indirect` — nothing else in the
//! engine is allowed to build that load.

use inkwell::types::BasicTypeEnum;
use inkwell::values::{BasicValueEnum, FunctionValue, IntValue, PointerValue};

use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::types::FunctionSig;

use super::CodeGen;

/// Width/signedness of a primitive scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Double,
    Boolean,
    Int { bits: u8, signed: bool },
    Unknown,
}

/// Element classification for array values; strings need tagging so that
/// loads out of a string array come back as string values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElemKind {
    Scalar(ScalarKind),
    Str,
}

/// Where a scalar/string value currently lives.
#[derive(Debug, Clone, Copy)]
pub enum Storage<'a> {
    /// A first-class IR value.
    Direct(BasicValueEnum<'a>),
    /// An addressable stack slot holding the value.
    Slot {
        ptr: PointerValue<'a>,
        pointee: BasicTypeEnum<'a>,
    },
}

/// Semantic kind reported by `Value::semantic_kind`. Class references
/// have no kind; asking is a compile error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SemanticKind {
    Scalar(ScalarKind),
    String,
    Array,
    Object,
    Function,
    Null,
}

#[derive(Debug, Clone)]
pub enum Value<'a> {
    Primitive {
        storage: Storage<'a>,
        kind: ScalarKind,
    },
    Str {
        storage: Storage<'a>,
    },
    Array {
        ptr: PointerValue<'a>,
        elem_ty: BasicTypeEnum<'a>,
        elem: ElemKind,
        len: u32,
    },
    Object {
        class: String,
        storage: Storage<'a>,
    },
    /// A class used as a value. Only constructible from / usable for
    /// member lookup; it has no runtime representation.
    Class {
        name: String,
    },
    Function {
        value: FunctionValue<'a>,
        sig: FunctionSig,
    },
    Null {
        raw: PointerValue<'a>,
    },
}

impl<'a> Value<'a> {
    pub fn direct_primitive(raw: BasicValueEnum<'a>, kind: ScalarKind) -> Self {
        Value::Primitive {
            storage: Storage::Direct(raw),
            kind,
        }
    }

    pub fn direct_str(raw: BasicValueEnum<'a>) -> Self {
        Value::Str {
            storage: Storage::Direct(raw),
        }
    }

    /// The raw IR handle without any dereferencing: a slot reports its
    /// address, a direct value reports itself. Class references fail.
    pub fn raw(&self) -> Result<BasicValueEnum<'a>, Diagnostic> {
        match self {
            Value::Primitive { storage, .. }
            | Value::Str { storage }
            | Value::Object { storage, .. } => Ok(match storage {
                Storage::Direct(v) => *v,
                Storage::Slot { ptr, .. } => (*ptr).into(),
            }),
            Value::Array { ptr, .. } => Ok((*ptr).into()),
            Value::Function { value, .. } => {
                Ok(value.as_global_value().as_pointer_value().into())
            }
            Value::Null { raw } => Ok((*raw).into()),
            Value::Class { name } => Err(Diagnostic::new(
                DiagnosticKind::InvalidValueAccess,
                format!("class `{}` has no runtime value", name),
            )),
        }
    }

    pub fn semantic_kind(&self) -> Result<SemanticKind, Diagnostic> {
        match self {
            Value::Primitive { kind, .. } => Ok(SemanticKind::Scalar(*kind)),
            Value::Str { .. } => Ok(SemanticKind::String),
            Value::Array { .. } => Ok(SemanticKind::Array),
            Value::Object { .. } => Ok(SemanticKind::Object),
            Value::Function { .. } => Ok(SemanticKind::Function),
            Value::Null { .. } => Ok(SemanticKind::Null),
            Value::Class { name } => Err(Diagnostic::new(
                DiagnosticKind::InvalidValueAccess,
                format!("class `{}` has no semantic kind", name),
            )),
        }
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Value::Str { .. })
    }

    /// The slot backing this value, if it is addressable. Assignment and
    /// increment/decrement require one.
    pub fn slot(&self) -> Option<(PointerValue<'a>, BasicTypeEnum<'a>)> {
        match self {
            Value::Primitive {
                storage: Storage::Slot { ptr, pointee },
                ..
            }
            | Value::Str {
                storage: Storage::Slot { ptr, pointee },
            }
            | Value::Object {
                storage: Storage::Slot { ptr, pointee },
                ..
            } => Some((*ptr, *pointee)),
            _ => None,
        }
    }

    /// Dereference a scalar/string/object slot to its value; pass direct
    /// values, arrays, and everything else through untouched. Arrays stay
    /// by-reference: their raw handle already is the reference.
    pub fn load_if_indirect(&self, cg: &CodeGen<'a>) -> Result<BasicValueEnum<'a>, Diagnostic> {
        match self {
            Value::Primitive { storage, .. }
            | Value::Str { storage }
            | Value::Object { storage, .. } => match storage {
                Storage::Direct(v) => Ok(*v),
                Storage::Slot { ptr, pointee } => cg
                    .builder
                    .build_load(*pointee, *ptr, "load")
                    .map_err(|_| Diagnostic::simple("failed to load stack slot")),
            },
            _ => self.raw(),
        }
    }

    /// Coerce to an i1 condition. Booleans pass through, numeric values
    /// compare against zero, pointer-shaped values compare the pointer
    /// (reinterpreted as an integer) against the null pattern.
    pub fn to_boolean(&self, cg: &CodeGen<'a>) -> Result<IntValue<'a>, Diagnostic> {
        match self {
            Value::Primitive { kind, .. } => {
                let loaded = self.load_if_indirect(cg)?;
                match kind {
                    ScalarKind::Boolean => Ok(loaded.into_int_value()),
                    ScalarKind::Double => cg
                        .builder
                        .build_float_compare(
                            inkwell::FloatPredicate::ONE,
                            loaded.into_float_value(),
                            cg.f64_t.const_float(0.0),
                            "tobool",
                        )
                        .map_err(|_| Diagnostic::simple("failed to build float compare")),
                    ScalarKind::Int { .. } => {
                        let iv = loaded.into_int_value();
                        let zero = iv.get_type().const_zero();
                        cg.builder
                            .build_int_compare(inkwell::IntPredicate::NE, iv, zero, "tobool")
                            .map_err(|_| Diagnostic::simple("failed to build int compare"))
                    }
                    ScalarKind::Unknown => Err(Diagnostic::new(
                        DiagnosticKind::UnsupportedCoercion,
                        "cannot coerce a value of unknown kind to boolean",
                    )),
                }
            }
            Value::Str { .. } | Value::Array { .. } | Value::Object { .. } | Value::Null { .. } => {
                let loaded = self.load_if_indirect(cg)?;
                let as_int = cg
                    .builder
                    .build_ptr_to_int(loaded.into_pointer_value(), cg.i64_t, "ptr_bits")
                    .map_err(|_| Diagnostic::simple("failed to build ptrtoint"))?;
                cg.builder
                    .build_int_compare(
                        inkwell::IntPredicate::NE,
                        as_int,
                        cg.i64_t.const_zero(),
                        "tobool",
                    )
                    .map_err(|_| Diagnostic::simple("failed to build int compare"))
            }
            Value::Function { .. } => Err(Diagnostic::new(
                DiagnosticKind::UnsupportedCoercion,
                "cannot coerce a function reference to boolean",
            )),
            Value::Class { name } => Err(Diagnostic::new(
                DiagnosticKind::InvalidValueAccess,
                format!("class `{}` cannot be coerced to boolean", name),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkwell::context::Context;

    fn with_codegen<F: FnOnce(&CodeGen)>(f: F) {
        let context = Context::create();
        let cg = CodeGen::new(&context, "value_tests", "");
        let fn_ty = context.void_type().fn_type(&[], false);
        let func = cg.module.add_function("t", fn_ty, None);
        let entry = context.append_basic_block(func, "entry");
        cg.builder.position_at_end(entry);
        f(&cg);
    }

    #[test]
    fn boolean_coercion_is_idempotent_on_booleans() {
        with_codegen(|cg| {
            let v = Value::direct_primitive(
                cg.bool_t.const_int(1, false).into(),
                ScalarKind::Boolean,
            );
            let b = v.to_boolean(cg).unwrap();
            assert_eq!(b, cg.bool_t.const_int(1, false));
        });
    }

    #[test]
    fn double_coercion_compares_against_zero() {
        with_codegen(|cg| {
            let v = Value::direct_primitive(cg.f64_t.const_float(3.5).into(), ScalarKind::Double);
            let b = v.to_boolean(cg).unwrap();
            assert_eq!(b.get_type(), cg.bool_t);
        });
    }

    #[test]
    fn class_reference_refuses_value_access() {
        let class = Value::Class {
            name: "Foo".to_string(),
        };
        let err = class.raw().unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::InvalidValueAccess);
        assert_eq!(
            class.semantic_kind().unwrap_err().kind,
            DiagnosticKind::InvalidValueAccess
        );
    }

    #[test]
    fn strings_report_stringiness() {
        with_codegen(|cg| {
            let p = cg.ptr_t.const_null();
            let s = Value::direct_str(p.into());
            assert!(s.is_string());
            let n = Value::direct_primitive(cg.f64_t.const_float(1.0).into(), ScalarKind::Double);
            assert!(!n.is_string());
        });
    }
}
