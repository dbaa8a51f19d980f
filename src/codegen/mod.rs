//! Code generation.
//!
//! `CodeGen` owns the LLVM context/module/builder plus the per-compilation
//! memo tables: declared signatures, declared external symbols, interned
//! string literals, registered classes, and module functions. One
//! `CodeGen` lives exactly as long as one translation unit's compile; the
//! memo tables only grow (insert-if-absent), which is what makes helper
//! declaration idempotent.
//!
//! Lowering is a single top-to-bottom walk: `generate_program` registers
//! classes and function signatures, defines function bodies, then lowers
//! the remaining top-level statements into the entry function. Scopes are
//! function-level and threaded explicitly through every lowering call.

pub mod builtins;
pub mod emit;
pub mod expr;
pub mod mangle;
pub mod stmt;
pub mod value;

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use deno_ast::ParsedSource;
use deno_ast::swc::ast;
use inkwell::basic_block::BasicBlock;
use inkwell::builder::Builder;
use inkwell::context::Context;
use inkwell::module::Module;
use inkwell::types::{
    BasicMetadataTypeEnum, BasicType, BasicTypeEnum, FloatType, FunctionType, IntType,
    PointerType, StructType,
};
use inkwell::values::{BasicValueEnum, FunctionValue, PointerValue};

use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::types::{FunctionSig, ScriptType, function_signature, map_ts_type};
use value::{ElemKind, ScalarKind, Storage, Value};

/// Structural identity of a resolved call target, used to memoize
/// declarations so the same signature is never declared twice.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SignatureKey {
    pub class: Option<String>,
    pub member: String,
    pub params: Vec<ScriptType>,
}

/// A registered class: its opaque layout handle plus the signatures the
/// annotations supplied. Object layout itself belongs to the runtime.
#[derive(Debug, Clone)]
pub struct ClassInfo<'a> {
    pub struct_ty: StructType<'a>,
    pub ctor_params: Vec<ScriptType>,
    pub methods: HashMap<String, FunctionSig>,
}

#[derive(Debug, Clone)]
pub struct FnInfo<'a> {
    pub value: FunctionValue<'a>,
    pub sig: FunctionSig,
}

/// Innermost-loop targets for `break`/`continue`.
#[derive(Debug, Clone, Copy)]
pub struct LoopFrame<'a> {
    pub continue_block: BasicBlock<'a>,
    pub break_block: BasicBlock<'a>,
}

/// Function-level variable scope. Nested blocks share the function's
/// table; the source language has no block scoping.
#[derive(Debug, Default)]
pub struct Scope<'a> {
    vars: HashMap<String, Value<'a>>,
}

impl<'a> Scope<'a> {
    pub fn new() -> Self {
        Scope {
            vars: HashMap::new(),
        }
    }

    pub fn lookup(&self, name: &str) -> Option<Value<'a>> {
        self.vars.get(name).cloned()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value<'a>) {
        self.vars.insert(name.into(), value);
    }
}

pub struct CodeGen<'a> {
    pub context: &'a Context,
    pub module: Module<'a>,
    pub builder: Builder<'a>,
    pub source: &'a str,
    pub f64_t: FloatType<'a>,
    pub i64_t: IntType<'a>,
    pub i32_t: IntType<'a>,
    pub bool_t: IntType<'a>,
    pub ptr_t: PointerType<'a>,
    next_str_id: Cell<u32>,
    string_literals: RefCell<HashMap<String, PointerValue<'a>>>,
    signatures: RefCell<HashMap<SignatureKey, FunctionValue<'a>>>,
    externals: RefCell<HashMap<String, FunctionValue<'a>>>,
    classes: RefCell<HashMap<String, ClassInfo<'a>>>,
    functions: RefCell<HashMap<String, FnInfo<'a>>>,
    loop_stack: RefCell<Vec<LoopFrame<'a>>>,
}

impl<'a> CodeGen<'a> {
    pub fn new(context: &'a Context, module_name: &str, source: &'a str) -> Self {
        let module = context.create_module(module_name);
        let builder = context.create_builder();
        CodeGen {
            context,
            module,
            builder,
            source,
            f64_t: context.f64_type(),
            i64_t: context.i64_type(),
            i32_t: context.i32_type(),
            bool_t: context.bool_type(),
            ptr_t: context.ptr_type(inkwell::AddressSpace::default()),
            next_str_id: Cell::new(0),
            string_literals: RefCell::new(HashMap::new()),
            signatures: RefCell::new(HashMap::new()),
            externals: RefCell::new(HashMap::new()),
            classes: RefCell::new(HashMap::new()),
            functions: RefCell::new(HashMap::new()),
            loop_stack: RefCell::new(Vec::new()),
        }
    }

    // ---- type mapping ----------------------------------------------------

    pub fn map_type_to_llvm(&self, ty: &ScriptType) -> BasicTypeEnum<'a> {
        match ty {
            ScriptType::Number => self.f64_t.into(),
            ScriptType::Boolean => self.bool_t.into(),
            ScriptType::Integer { bits, .. } => {
                self.context.custom_width_int_type(*bits as u32).into()
            }
            ScriptType::String
            | ScriptType::Array(_)
            | ScriptType::Named(_)
            | ScriptType::Null => self.ptr_t.into(),
            // Void has no basic type; callers handle it in fn-type building.
            ScriptType::Void => self.ptr_t.into(),
        }
    }

    pub fn scalar_kind_of(ty: &ScriptType) -> ScalarKind {
        match ty {
            ScriptType::Number => ScalarKind::Double,
            ScriptType::Boolean => ScalarKind::Boolean,
            ScriptType::Integer { bits, signed } => ScalarKind::Int {
                bits: *bits,
                signed: *signed,
            },
            _ => ScalarKind::Unknown,
        }
    }

    pub fn elem_kind_of(ty: &ScriptType) -> ElemKind {
        match ty {
            ScriptType::String => ElemKind::Str,
            other => ElemKind::Scalar(Self::scalar_kind_of(other)),
        }
    }

    pub fn build_fn_type(&self, params: &[ScriptType], ret: &ScriptType) -> FunctionType<'a> {
        let param_types: Vec<BasicMetadataTypeEnum> = params
            .iter()
            .map(|t| self.map_type_to_llvm(t).into())
            .collect();
        match ret {
            ScriptType::Void => self.context.void_type().fn_type(&param_types, false),
            other => self.map_type_to_llvm(other).fn_type(&param_types, false),
        }
    }

    /// Wrap a call result in a `Value` according to the declared return
    /// type. Void-returning calls yield the null sentinel.
    pub fn value_from_return(
        &self,
        ret: &ScriptType,
        raw: Option<BasicValueEnum<'a>>,
    ) -> Value<'a> {
        match (ret, raw) {
            (ScriptType::String, Some(v)) => Value::direct_str(v),
            (ScriptType::Array(inner), Some(v)) => Value::Array {
                ptr: v.into_pointer_value(),
                elem_ty: self.map_type_to_llvm(inner),
                elem: Self::elem_kind_of(inner),
                len: 0,
            },
            (ScriptType::Named(class), Some(v)) => Value::Object {
                class: class.clone(),
                storage: Storage::Direct(v),
            },
            (ScriptType::Null, _) | (ScriptType::Void, _) => Value::Null {
                raw: self.ptr_t.const_null(),
            },
            (other, Some(v)) => Value::direct_primitive(v, Self::scalar_kind_of(other)),
            (_, None) => Value::Null {
                raw: self.ptr_t.const_null(),
            },
        }
    }

    // ---- memoized declaration ---------------------------------------------

    /// Declare-or-get by symbol name. Used for the helpers the generator
    /// synthesizes itself (string concat/compare/length, array length,
    /// the pow intrinsic, ingredient accessors).
    pub fn declare_or_get_external(
        &self,
        name: &str,
        fn_type: FunctionType<'a>,
    ) -> FunctionValue<'a> {
        if let Some(f) = self.externals.borrow().get(name) {
            return *f;
        }
        let f = self
            .module
            .get_function(name)
            .unwrap_or_else(|| self.module.add_function(name, fn_type, None));
        self.externals.borrow_mut().insert(name.to_string(), f);
        f
    }

    /// Declare-or-get by structural signature identity. The symbol is
    /// recorded in both memo tables so later by-name requests find it too.
    pub fn declare_or_get_signature(
        &self,
        key: SignatureKey,
        symbol: &str,
        fn_type: FunctionType<'a>,
    ) -> FunctionValue<'a> {
        if let Some(f) = self.signatures.borrow().get(&key) {
            return *f;
        }
        let f = self
            .module
            .get_function(symbol)
            .unwrap_or_else(|| self.module.add_function(symbol, fn_type, None));
        self.signatures.borrow_mut().insert(key, f);
        self.externals.borrow_mut().insert(symbol.to_string(), f);
        f
    }

    // ---- runtime ABI helpers ----------------------------------------------

    pub fn get_str_concat(&self) -> FunctionValue<'a> {
        let ty = self
            .ptr_t
            .fn_type(&[self.ptr_t.into(), self.ptr_t.into()], false);
        self.declare_or_get_external("__str_concat", ty)
    }

    pub fn get_str_cmp(&self) -> FunctionValue<'a> {
        let ty = self
            .i32_t
            .fn_type(&[self.ptr_t.into(), self.ptr_t.into()], false);
        self.declare_or_get_external("__str_cmp", ty)
    }

    pub fn get_str_len(&self) -> FunctionValue<'a> {
        let ty = self.f64_t.fn_type(&[self.ptr_t.into()], false);
        self.declare_or_get_external("__str_len", ty)
    }

    pub fn get_arr_len(&self) -> FunctionValue<'a> {
        let ty = self.f64_t.fn_type(&[self.ptr_t.into()], false);
        self.declare_or_get_external("__arr_len", ty)
    }

    pub fn get_pow_f64(&self) -> FunctionValue<'a> {
        let ty = self
            .f64_t
            .fn_type(&[self.f64_t.into(), self.f64_t.into()], false);
        self.declare_or_get_external("llvm.pow.f64", ty)
    }

    /// Numeric-to-string runtime entry; shares the `Number.toString`
    /// symbol so template interpolation and explicit calls agree.
    pub fn get_num_to_str(&self) -> FunctionValue<'a> {
        let symbol = mangle::method_symbol("Number", "toString", &[]);
        let ty = self.ptr_t.fn_type(&[self.f64_t.into()], false);
        self.declare_or_get_external(&symbol, ty)
    }

    /// IR representation of a carrier/class receiver at the ABI boundary.
    /// Every reference-shaped receiver travels as a pointer, matching the
    /// representation receiver values actually carry; `Number` is the one
    /// by-value receiver.
    pub fn receiver_abi_type(&self, class_name: &str) -> Result<BasicTypeEnum<'a>, Diagnostic> {
        match class_name {
            "Number" => Ok(self.f64_t.into()),
            "String" | "Array" | "RegExp" | "MomentJS" | "Date" => Ok(self.ptr_t.into()),
            other => {
                if self.classes.borrow().contains_key(other) {
                    Ok(self.ptr_t.into())
                } else {
                    Err(Diagnostic::new(
                        DiagnosticKind::MissingNativeType,
                        format!("no runtime layout for type `{}`", other),
                    ))
                }
            }
        }
    }

    // ---- string literals ---------------------------------------------------

    /// Intern a string literal as a deduplicated global constant.
    pub fn intern_string(&self, text: &str) -> Result<PointerValue<'a>, Diagnostic> {
        if let Some(p) = self.string_literals.borrow().get(text) {
            return Ok(*p);
        }
        let id = self.next_str_id.get();
        self.next_str_id.set(id + 1);
        let global = self
            .builder
            .build_global_string_ptr(text, &format!(".str.{}", id))
            .map_err(|_| Diagnostic::simple("failed to intern string literal"))?;
        let ptr = global.as_pointer_value();
        self.string_literals
            .borrow_mut()
            .insert(text.to_string(), ptr);
        Ok(ptr)
    }

    // ---- scope helpers -----------------------------------------------------

    pub fn lookup_class(&self, name: &str) -> Option<ClassInfo<'a>> {
        self.classes.borrow().get(name).cloned()
    }

    pub fn lookup_function(&self, name: &str) -> Option<FnInfo<'a>> {
        self.functions.borrow().get(name).cloned()
    }

    pub fn push_loop(&self, frame: LoopFrame<'a>) {
        self.loop_stack.borrow_mut().push(frame);
    }

    pub fn pop_loop(&self) {
        self.loop_stack.borrow_mut().pop();
    }

    pub fn current_loop(&self) -> Option<LoopFrame<'a>> {
        self.loop_stack.borrow().last().copied()
    }

    // ---- program driver ----------------------------------------------------

    /// Lower a whole parsed module. Classes and function signatures are
    /// registered first so bodies and top-level statements can call
    /// forward; top-level statements land in the entry function, which
    /// returns an `i64` status code (always zero on the fallthrough path).
    pub fn generate_program(
        &self,
        parsed: &ParsedSource,
        entry_name: &str,
    ) -> Result<(), Diagnostic> {
        let program = parsed.program_ref();

        // Top-level executable items, in source order.
        enum TopItem<'x> {
            Stmt(&'x ast::Stmt),
            Var(&'x ast::VarDecl),
        }

        enum RawItem<'x> {
            Decl(&'x ast::Decl),
            Stmt(&'x ast::Stmt),
        }

        let mut raw_items: Vec<RawItem> = Vec::new();
        for item in program.body() {
            match item {
                deno_ast::ModuleItemRef::Stmt(ast::Stmt::Decl(decl)) => {
                    raw_items.push(RawItem::Decl(decl));
                }
                deno_ast::ModuleItemRef::Stmt(stmt) => raw_items.push(RawItem::Stmt(stmt)),
                deno_ast::ModuleItemRef::ModuleDecl(ast::ModuleDecl::ExportDecl(export)) => {
                    raw_items.push(RawItem::Decl(&export.decl));
                }
                deno_ast::ModuleItemRef::ModuleDecl(ast::ModuleDecl::Import(_)) => {}
                deno_ast::ModuleItemRef::ModuleDecl(_) => {
                    return Err(Diagnostic::new(
                        DiagnosticKind::UnsupportedConstruct,
                        "unsupported module-level declaration",
                    ));
                }
            }
        }

        let mut fn_decls: Vec<(&ast::FnDecl, FunctionSig)> = Vec::new();
        let mut top_items: Vec<TopItem> = Vec::new();

        // Pass 1: register classes, collect and pre-declare functions.
        for raw in &raw_items {
            match raw {
                RawItem::Stmt(stmt) => top_items.push(TopItem::Stmt(stmt)),
                RawItem::Decl(decl) => match decl {
                    ast::Decl::Class(class_decl) => {
                        self.register_class(&class_decl.ident.sym, &class_decl.class)?;
                    }
                    ast::Decl::Fn(fn_decl) => {
                        let name = fn_decl.ident.sym.to_string();
                        let sig = function_signature(&fn_decl.function)?;
                        let fn_ty = self.build_fn_type(
                            &sig.params.iter().map(|(_, t)| t.clone()).collect::<Vec<_>>(),
                            &sig.ret,
                        );
                        let value = self.module.add_function(&name, fn_ty, None);
                        self.functions
                            .borrow_mut()
                            .insert(name, FnInfo { value, sig: sig.clone() });
                        fn_decls.push((fn_decl, sig));
                    }
                    ast::Decl::Var(var) => top_items.push(TopItem::Var(var)),
                    // Type-only declarations carry no code.
                    ast::Decl::TsInterface(_) | ast::Decl::TsTypeAlias(_) => {}
                    _ => {
                        return Err(Diagnostic::new(
                            DiagnosticKind::UnsupportedConstruct,
                            "unsupported top-level declaration",
                        ));
                    }
                },
            }
        }

        // Pass 2: function bodies.
        for (fn_decl, sig) in &fn_decls {
            let name = fn_decl.ident.sym.to_string();
            let info = self
                .lookup_function(&name)
                .ok_or_else(|| Diagnostic::simple("function vanished between passes"))?;
            self.gen_function_ir(info.value, &fn_decl.function, sig)?;
        }

        // Pass 3: entry function around the top-level statements.
        let entry_ty = self.i64_t.fn_type(&[], false);
        let entry_fn = self.module.add_function(entry_name, entry_ty, None);
        let entry_block = self.context.append_basic_block(entry_fn, "entry");
        self.builder.position_at_end(entry_block);

        let mut scope = Scope::new();
        let mut terminated = false;
        for item in top_items {
            if terminated {
                break;
            }
            terminated = match item {
                TopItem::Stmt(stmt) => self.lower_stmt(stmt, entry_fn, &mut scope)?,
                TopItem::Var(var) => {
                    self.lower_var_decl(var, entry_fn, &mut scope)?;
                    false
                }
            };
        }
        if !terminated
            && self
                .builder
                .get_insert_block()
                .is_some_and(|b| b.get_terminator().is_none())
        {
            let zero = self.i64_t.const_zero();
            self.builder
                .build_return(Some(&zero))
                .map_err(|_| Diagnostic::simple("failed to build entry return"))?;
        }
        Ok(())
    }

    /// Lower one function declaration into a definition: entry block,
    /// parameter slots, body, implicit return on the fallthrough path.
    pub fn gen_function_ir(
        &self,
        function: FunctionValue<'a>,
        func: &ast::Function,
        sig: &FunctionSig,
    ) -> Result<(), Diagnostic> {
        let entry = self.context.append_basic_block(function, "entry");
        self.builder.position_at_end(entry);

        let mut scope = Scope::new();
        for (i, (name, ty)) in sig.params.iter().enumerate() {
            let param = function.get_nth_param(i as u32).ok_or_else(|| {
                Diagnostic::simple(format!("missing parameter `{}` in function body", name))
            })?;
            match ty {
                ScriptType::Array(inner) => {
                    // Arrays travel by reference; the parameter already is
                    // the reference, no slot needed.
                    scope.insert(
                        name.clone(),
                        Value::Array {
                            ptr: param.into_pointer_value(),
                            elem_ty: self.map_type_to_llvm(inner),
                            elem: Self::elem_kind_of(inner),
                            len: 0,
                        },
                    );
                }
                other => {
                    let llvm_ty = self.map_type_to_llvm(other);
                    let slot = self
                        .builder
                        .build_alloca(llvm_ty, &format!("param_{}", name))
                        .map_err(|_| Diagnostic::simple("alloca failed for parameter"))?;
                    self.builder
                        .build_store(slot, param)
                        .map_err(|_| Diagnostic::simple("store failed for parameter"))?;
                    let storage = Storage::Slot {
                        ptr: slot,
                        pointee: llvm_ty,
                    };
                    let bound = match other {
                        ScriptType::String => Value::Str { storage },
                        ScriptType::Named(class) => Value::Object {
                            class: class.clone(),
                            storage,
                        },
                        scalar => Value::Primitive {
                            storage,
                            kind: Self::scalar_kind_of(scalar),
                        },
                    };
                    scope.insert(name.clone(), bound);
                }
            }
        }

        let mut terminated = false;
        if let Some(body) = &func.body {
            terminated = self.lower_stmts(&body.stmts, function, &mut scope)?;
        }

        if !terminated
            && self
                .builder
                .get_insert_block()
                .is_some_and(|b| b.get_terminator().is_none())
        {
            self.build_default_return(&sig.ret)?;
        }
        Ok(())
    }

    fn build_default_return(&self, ret: &ScriptType) -> Result<(), Diagnostic> {
        let err = |_| Diagnostic::simple("failed to build implicit return");
        match ret {
            ScriptType::Void => self.builder.build_return(None).map(|_| ()).map_err(err),
            ScriptType::Number => {
                let zero = self.f64_t.const_float(0.0);
                self.builder.build_return(Some(&zero)).map(|_| ()).map_err(err)
            }
            ScriptType::Boolean => {
                let f = self.bool_t.const_zero();
                self.builder.build_return(Some(&f)).map(|_| ()).map_err(err)
            }
            ScriptType::Integer { bits, .. } => {
                let zero = self.context.custom_width_int_type(*bits as u32).const_zero();
                self.builder.build_return(Some(&zero)).map(|_| ()).map_err(err)
            }
            _ => {
                let null = self.ptr_t.const_null();
                self.builder.build_return(Some(&null)).map(|_| ()).map_err(err)
            }
        }
    }

    /// Record a class declaration: opaque layout handle plus the
    /// constructor/method signatures the annotations supply. Bodies are
    /// not lowered here; the runtime archive defines the mangled symbols.
    pub fn register_class(&self, name: &str, class: &ast::Class) -> Result<(), Diagnostic> {
        let struct_ty = self.context.opaque_struct_type(name);
        let mut ctor_params: Vec<ScriptType> = Vec::new();
        let mut methods: HashMap<String, FunctionSig> = HashMap::new();

        for member in &class.body {
            match member {
                ast::ClassMember::Constructor(ctor) => {
                    for param in &ctor.params {
                        let (bind, span) = match param {
                            ast::ParamOrTsParamProp::TsParamProp(p) => match &p.param {
                                ast::TsParamPropParam::Ident(bind) => {
                                    (bind, p.span.lo.0 as usize)
                                }
                                _ => {
                                    return Err(Diagnostic::with_span(
                                        DiagnosticKind::UnsupportedConstruct,
                                        "only plain identifier constructor parameters are supported",
                                        p.span.lo.0 as usize,
                                    ));
                                }
                            },
                            ast::ParamOrTsParamProp::Param(p) => match &p.pat {
                                ast::Pat::Ident(bind) => (bind, p.span.lo.0 as usize),
                                _ => {
                                    return Err(Diagnostic::with_span(
                                        DiagnosticKind::UnsupportedConstruct,
                                        "only plain identifier constructor parameters are supported",
                                        p.span.lo.0 as usize,
                                    ));
                                }
                            },
                        };
                        // The annotation is the only type oracle; a missing
                        // one would change the mangled constructor symbol.
                        let pname = bind.id.sym.to_string();
                        let ann = bind.type_ann.as_ref().ok_or_else(|| {
                            Diagnostic::with_span(
                                DiagnosticKind::MissingNativeType,
                                format!(
                                    "constructor parameter `{}` has no type annotation",
                                    pname
                                ),
                                span,
                            )
                        })?;
                        let ty = map_ts_type(&ann.type_ann).ok_or_else(|| {
                            Diagnostic::with_span(
                                DiagnosticKind::MissingNativeType,
                                format!(
                                    "unsupported type annotation on constructor parameter `{}`",
                                    pname
                                ),
                                span,
                            )
                        })?;
                        ctor_params.push(ty);
                    }
                }
                ast::ClassMember::Method(m) => {
                    if let ast::PropName::Ident(id) = &m.key {
                        let sig = function_signature(&m.function)?;
                        methods.insert(id.sym.to_string(), sig);
                    }
                }
                _ => {}
            }
        }

        self.classes.borrow_mut().insert(
            name.to_string(),
            ClassInfo {
                struct_ty,
                ctor_params,
                methods,
            },
        );
        Ok(())
    }
}
