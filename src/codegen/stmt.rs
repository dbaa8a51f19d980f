//! Statement lowering.
//!
//! `lower_stmts` walks a statement list in order and reports whether a
//! terminator was emitted, so callers know if the fallthrough path needs
//! an implicit return. Control flow follows the usual block shapes:
//! if/else chains share one continuation block, loops publish their
//! header/exit pair for `break`/`continue`.

use deno_ast::swc::ast;
use deno_ast::swc::common::Spanned;
use inkwell::basic_block::BasicBlock;
use inkwell::values::FunctionValue;

use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::types::{ScriptType, map_ts_type};

use super::value::{Storage, Value};
use super::{CodeGen, LoopFrame, Scope};

fn span_of<T: Spanned>(node: &T) -> usize {
    node.span().lo.0 as usize
}

impl<'a> CodeGen<'a> {
    /// Lower a statement list. Returns `true` when the list ended with a
    /// terminator (return/break/continue), in which case the builder's
    /// current block must not receive further instructions.
    pub fn lower_stmts(
        &self,
        stmts: &[ast::Stmt],
        function: FunctionValue<'a>,
        scope: &mut Scope<'a>,
    ) -> Result<bool, Diagnostic> {
        let mut terminated = false;
        for stmt in stmts {
            if terminated {
                // Unreachable trailing statements are dropped, matching
                // the single-walk lowering model.
                break;
            }
            terminated = self.lower_stmt(stmt, function, scope)?;
        }
        Ok(terminated)
    }

    pub fn lower_stmt(
        &self,
        stmt: &ast::Stmt,
        function: FunctionValue<'a>,
        scope: &mut Scope<'a>,
    ) -> Result<bool, Diagnostic> {
        match stmt {
            ast::Stmt::Decl(ast::Decl::Var(var)) => {
                self.lower_var_decl(var, function, scope)?;
                Ok(false)
            }
            ast::Stmt::Decl(ast::Decl::TsInterface(_))
            | ast::Stmt::Decl(ast::Decl::TsTypeAlias(_)) => Ok(false),
            ast::Stmt::Expr(expr_stmt) => {
                self.lower_expr(&expr_stmt.expr, function, scope, None)?;
                Ok(false)
            }
            ast::Stmt::Return(ret) => {
                match &ret.arg {
                    Some(arg) => {
                        let v = self.lower_expr(arg, function, scope, None)?;
                        let loaded = v.load_if_indirect(self)?;
                        self.builder
                            .build_return(Some(&loaded))
                            .map_err(|_| Diagnostic::simple("failed to build return"))?;
                    }
                    None => {
                        self.builder
                            .build_return(None)
                            .map_err(|_| Diagnostic::simple("failed to build return"))?;
                    }
                }
                Ok(true)
            }
            ast::Stmt::If(if_stmt) => {
                self.lower_if(if_stmt, function, scope, None)?;
                Ok(false)
            }
            ast::Stmt::While(while_stmt) => self.lower_while(while_stmt, function, scope),
            ast::Stmt::DoWhile(do_while) => self.lower_do_while(do_while, function, scope),
            ast::Stmt::For(for_stmt) => self.lower_for(for_stmt, function, scope),
            ast::Stmt::Break(brk) => {
                let frame = self.current_loop().ok_or_else(|| {
                    Diagnostic::with_span(
                        DiagnosticKind::UnsupportedConstruct,
                        "`break` outside of a loop",
                        span_of(brk),
                    )
                })?;
                self.builder
                    .build_unconditional_branch(frame.break_block)
                    .map_err(|_| Diagnostic::simple("failed to build break branch"))?;
                Ok(true)
            }
            ast::Stmt::Continue(cont) => {
                let frame = self.current_loop().ok_or_else(|| {
                    Diagnostic::with_span(
                        DiagnosticKind::UnsupportedConstruct,
                        "`continue` outside of a loop",
                        span_of(cont),
                    )
                })?;
                self.builder
                    .build_unconditional_branch(frame.continue_block)
                    .map_err(|_| Diagnostic::simple("failed to build continue branch"))?;
                Ok(true)
            }
            // Blocks share the enclosing function scope.
            ast::Stmt::Block(block) => self.lower_stmts(&block.stmts, function, scope),
            ast::Stmt::Try(try_stmt) => self.lower_try(try_stmt, function, scope),
            ast::Stmt::Empty(_) => Ok(false),
            other => Err(Diagnostic::with_span(
                DiagnosticKind::UnsupportedConstruct,
                "statement kind has no lowering rule",
                span_of(other),
            )),
        }
    }

    /// Variable declaration. The annotation is the type oracle: every
    /// declarator must carry one, and must be initialized. Scalars,
    /// strings, and objects get a named stack slot; arrays bind the
    /// reference produced by their initializer directly.
    pub fn lower_var_decl(
        &self,
        var: &ast::VarDecl,
        function: FunctionValue<'a>,
        scope: &mut Scope<'a>,
    ) -> Result<(), Diagnostic> {
        for decl in &var.decls {
            let bind = match &decl.name {
                ast::Pat::Ident(bind) => bind,
                other => {
                    return Err(Diagnostic::with_span(
                        DiagnosticKind::UnsupportedConstruct,
                        "destructuring declarations have no lowering rule",
                        span_of(other),
                    ));
                }
            };
            let name = bind.id.sym.to_string();
            let declared = bind
                .type_ann
                .as_ref()
                .and_then(|ann| map_ts_type(&ann.type_ann))
                .ok_or_else(|| {
                    Diagnostic::with_span(
                        DiagnosticKind::MissingNativeType,
                        format!("declaration of `{}` has no resolvable type annotation", name),
                        span_of(decl),
                    )
                    .noted("annotations are the only type oracle; untyped declarations cannot be lowered")
                })?;
            let init = decl.init.as_ref().ok_or_else(|| {
                Diagnostic::with_span(
                    DiagnosticKind::UnsupportedConstruct,
                    format!("declaration of `{}` has no initializer", name),
                    span_of(decl),
                )
            })?;

            let value = self.lower_expr(init, function, scope, Some(&declared))?;

            match &declared {
                ScriptType::Array(_) => {
                    // The initializer already produced the reference.
                    match value {
                        Value::Array { .. } => scope.insert(name, value),
                        _ => {
                            return Err(Diagnostic::with_span(
                                DiagnosticKind::TypeMismatch,
                                format!("`{}` is declared as an array", name),
                                span_of(decl),
                            ));
                        }
                    }
                }
                other => {
                    let llvm_ty = self.map_type_to_llvm(other);
                    let slot = self
                        .builder
                        .build_alloca(llvm_ty, &name)
                        .map_err(|_| Diagnostic::simple("alloca failed for declaration"))?;
                    let loaded = value.load_if_indirect(self)?;
                    self.builder
                        .build_store(slot, loaded)
                        .map_err(|_| Diagnostic::simple("store failed for declaration"))?;
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
                    scope.insert(name, bound);
                }
            }
        }
        Ok(())
    }

    /// If/else chain. All arms of a chain branch to one shared
    /// continuation block, which is created unconditionally; when both
    /// arms terminate it is left empty for any caller-emitted fallthrough.
    fn lower_if(
        &self,
        if_stmt: &ast::IfStmt,
        function: FunctionValue<'a>,
        scope: &mut Scope<'a>,
        continuation: Option<BasicBlock<'a>>,
    ) -> Result<(), Diagnostic> {
        let cond_val = self.lower_expr(&if_stmt.test, function, scope, None)?;
        let cond = cond_val.to_boolean(self)?;

        let then_block = self.context.append_basic_block(function, "if.then");
        let cont_block = continuation
            .unwrap_or_else(|| self.context.append_basic_block(function, "if.end"));

        match &if_stmt.alt {
            None => {
                self.builder
                    .build_conditional_branch(cond, then_block, cont_block)
                    .map_err(|_| Diagnostic::simple("failed to build branch"))?;
                self.builder.position_at_end(then_block);
                let terminated = self.lower_branch_body(&if_stmt.cons, function, scope)?;
                if !terminated {
                    self.builder
                        .build_unconditional_branch(cont_block)
                        .map_err(|_| Diagnostic::simple("failed to build branch"))?;
                }
            }
            Some(alt) => {
                let else_block = self.context.append_basic_block(function, "if.else");
                self.builder
                    .build_conditional_branch(cond, then_block, else_block)
                    .map_err(|_| Diagnostic::simple("failed to build branch"))?;

                self.builder.position_at_end(then_block);
                let then_terminated = self.lower_branch_body(&if_stmt.cons, function, scope)?;
                if !then_terminated {
                    self.builder
                        .build_unconditional_branch(cont_block)
                        .map_err(|_| Diagnostic::simple("failed to build branch"))?;
                }

                self.builder.position_at_end(else_block);
                match alt.as_ref() {
                    // `else if` chains reuse the same continuation.
                    ast::Stmt::If(nested) => {
                        self.lower_if(nested, function, scope, Some(cont_block))?;
                        return Ok(());
                    }
                    other => {
                        let else_terminated = self.lower_branch_body(other, function, scope)?;
                        if !else_terminated {
                            self.builder
                                .build_unconditional_branch(cont_block)
                                .map_err(|_| Diagnostic::simple("failed to build branch"))?;
                        }
                    }
                }
            }
        }

        self.builder.position_at_end(cont_block);
        Ok(())
    }

    fn lower_branch_body(
        &self,
        stmt: &ast::Stmt,
        function: FunctionValue<'a>,
        scope: &mut Scope<'a>,
    ) -> Result<bool, Diagnostic> {
        match stmt {
            ast::Stmt::Block(block) => self.lower_stmts(&block.stmts, function, scope),
            other => self.lower_stmt(other, function, scope),
        }
    }

    fn lower_while(
        &self,
        while_stmt: &ast::WhileStmt,
        function: FunctionValue<'a>,
        scope: &mut Scope<'a>,
    ) -> Result<bool, Diagnostic> {
        let header = self.context.append_basic_block(function, "while.cond");
        let body = self.context.append_basic_block(function, "while.body");
        let exit = self.context.append_basic_block(function, "while.end");

        self.builder
            .build_unconditional_branch(header)
            .map_err(|_| Diagnostic::simple("failed to build branch"))?;
        self.builder.position_at_end(header);
        let cond_val = self.lower_expr(&while_stmt.test, function, scope, None)?;
        let cond = cond_val.to_boolean(self)?;
        self.builder
            .build_conditional_branch(cond, body, exit)
            .map_err(|_| Diagnostic::simple("failed to build branch"))?;

        self.push_loop(LoopFrame {
            continue_block: header,
            break_block: exit,
        });
        self.builder.position_at_end(body);
        let terminated = self.lower_branch_body(&while_stmt.body, function, scope);
        self.pop_loop();
        if !terminated? {
            self.builder
                .build_unconditional_branch(header)
                .map_err(|_| Diagnostic::simple("failed to build branch"))?;
        }

        self.builder.position_at_end(exit);
        Ok(false)
    }

    fn lower_do_while(
        &self,
        do_while: &ast::DoWhileStmt,
        function: FunctionValue<'a>,
        scope: &mut Scope<'a>,
    ) -> Result<bool, Diagnostic> {
        let body = self.context.append_basic_block(function, "do.body");
        let cond_block = self.context.append_basic_block(function, "do.cond");
        let exit = self.context.append_basic_block(function, "do.end");

        self.builder
            .build_unconditional_branch(body)
            .map_err(|_| Diagnostic::simple("failed to build branch"))?;

        self.push_loop(LoopFrame {
            continue_block: cond_block,
            break_block: exit,
        });
        self.builder.position_at_end(body);
        let terminated = self.lower_branch_body(&do_while.body, function, scope);
        self.pop_loop();
        if !terminated? {
            self.builder
                .build_unconditional_branch(cond_block)
                .map_err(|_| Diagnostic::simple("failed to build branch"))?;
        }

        self.builder.position_at_end(cond_block);
        let cond_val = self.lower_expr(&do_while.test, function, scope, None)?;
        let cond = cond_val.to_boolean(self)?;
        self.builder
            .build_conditional_branch(cond, body, exit)
            .map_err(|_| Diagnostic::simple("failed to build branch"))?;

        self.builder.position_at_end(exit);
        Ok(false)
    }

    /// Classic four-block for loop. `continue` targets the update block
    /// so the step expression always runs.
    fn lower_for(
        &self,
        for_stmt: &ast::ForStmt,
        function: FunctionValue<'a>,
        scope: &mut Scope<'a>,
    ) -> Result<bool, Diagnostic> {
        match &for_stmt.init {
            Some(ast::VarDeclOrExpr::VarDecl(var)) => {
                self.lower_var_decl(var, function, scope)?;
            }
            Some(ast::VarDeclOrExpr::Expr(expr)) => {
                self.lower_expr(expr, function, scope, None)?;
            }
            None => {}
        }

        let header = self.context.append_basic_block(function, "for.cond");
        let body = self.context.append_basic_block(function, "for.body");
        let update = self.context.append_basic_block(function, "for.inc");
        let exit = self.context.append_basic_block(function, "for.end");

        self.builder
            .build_unconditional_branch(header)
            .map_err(|_| Diagnostic::simple("failed to build branch"))?;
        self.builder.position_at_end(header);
        let cond = match &for_stmt.test {
            Some(test) => {
                let cond_val = self.lower_expr(test, function, scope, None)?;
                cond_val.to_boolean(self)?
            }
            None => self.bool_t.const_int(1, false),
        };
        self.builder
            .build_conditional_branch(cond, body, exit)
            .map_err(|_| Diagnostic::simple("failed to build branch"))?;

        self.push_loop(LoopFrame {
            continue_block: update,
            break_block: exit,
        });
        self.builder.position_at_end(body);
        let terminated = self.lower_branch_body(&for_stmt.body, function, scope);
        self.pop_loop();
        if !terminated? {
            self.builder
                .build_unconditional_branch(update)
                .map_err(|_| Diagnostic::simple("failed to build branch"))?;
        }

        self.builder.position_at_end(update);
        if let Some(step) = &for_stmt.update {
            self.lower_expr(step, function, scope, None)?;
        }
        self.builder
            .build_unconditional_branch(header)
            .map_err(|_| Diagnostic::simple("failed to build branch"))?;

        self.builder.position_at_end(exit);
        Ok(false)
    }

    /// There is no unwinding machinery: the try block and the finalizer
    /// lower inline in order, and the catch clause is skipped entirely.
    fn lower_try(
        &self,
        try_stmt: &ast::TryStmt,
        function: FunctionValue<'a>,
        scope: &mut Scope<'a>,
    ) -> Result<bool, Diagnostic> {
        let mut terminated = self.lower_stmts(&try_stmt.block.stmts, function, scope)?;
        if let Some(finalizer) = &try_stmt.finalizer {
            if !terminated {
                terminated = self.lower_stmts(&finalizer.stmts, function, scope)?;
            }
        }
        Ok(terminated)
    }
}
