//! Module output: textual IR and native object files.

use std::path::Path;

use inkwell::OptimizationLevel;
use inkwell::targets::{
    CodeModel, FileType, InitializationConfig, RelocMode, Target, TargetMachine,
};

use crate::diagnostics::Diagnostic;

use super::CodeGen;

impl<'a> CodeGen<'a> {
    /// The module as textual LLVM IR.
    pub fn ir_text(&self) -> String {
        self.module.print_to_string().to_string()
    }

    pub fn write_ir(&self, path: &Path) -> Result<(), Diagnostic> {
        self.module
            .print_to_file(path)
            .map_err(|e| Diagnostic::simple(format!("failed to write IR: {}", e)))
    }

    /// Emit a relocatable object for the host target. Linking against the
    /// runtime archive is the caller's problem.
    pub fn write_object(&self, path: &Path) -> Result<(), Diagnostic> {
        Target::initialize_all(&InitializationConfig::default());
        let triple = TargetMachine::get_default_triple();
        let target = Target::from_triple(&triple)
            .map_err(|e| Diagnostic::simple(format!("no target for host triple: {}", e)))?;
        let machine = target
            .create_target_machine(
                &triple,
                &TargetMachine::get_host_cpu_name().to_string(),
                &TargetMachine::get_host_cpu_features().to_string(),
                OptimizationLevel::Default,
                RelocMode::PIC,
                CodeModel::Default,
            )
            .ok_or_else(|| Diagnostic::simple("failed to create target machine"))?;
        self.module.set_triple(&triple);
        machine
            .write_to_file(&self.module, FileType::Object, path)
            .map_err(|e| Diagnostic::simple(format!("failed to write object: {}", e)))
    }
}
