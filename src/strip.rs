//! Type stripping.
//!
//! Turns typed source into plain JavaScript with the oxc TypeScript
//! transform. Besides erasing annotations this elides imports that are only
//! used as types, so the evaluator never has to resolve them.

use oxc_allocator::Allocator;
use oxc_codegen::Codegen;
use oxc_parser::Parser;
use oxc_semantic::SemanticBuilder;
use oxc_span::SourceType;
use oxc_transformer::{TransformOptions, Transformer};
use std::fmt::Display;
use std::path::Path;

use crate::error::MaterializeError;
use crate::scan::{scan_declarations, DeclarationScan};

/// Plain JavaScript plus what the typed source said about declarations
/// that stripping removes or rewrites.
#[derive(Debug, Clone)]
pub struct StrippedModule {
    pub code: String,
    pub declarations: DeclarationScan,
}

pub fn source_type_for(path: &Path) -> SourceType {
    let jsx = path.extension().is_some_and(|ext| ext == "tsx");
    SourceType::default()
        .with_typescript(true)
        .with_module(true)
        .with_jsx(jsx)
}

fn join_diagnostics<E: Display>(errors: &[E]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

pub fn strip_types(source: &str, path: &Path) -> Result<StrippedModule, MaterializeError> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, source_type_for(path)).parse();

    if !ret.errors.is_empty() || ret.panicked {
        return Err(MaterializeError::Parse {
            path: path.to_path_buf(),
            message: join_diagnostics(&ret.errors),
        });
    }

    let mut program = ret.program;
    let declarations = scan_declarations(&program, source);

    let semantic = SemanticBuilder::new().build(&program);
    if !semantic.errors.is_empty() {
        return Err(MaterializeError::Transform {
            path: path.to_path_buf(),
            message: join_diagnostics(&semantic.errors),
        });
    }
    let scoping = semantic.semantic.into_scoping();

    let options = TransformOptions::default();
    let transformed =
        Transformer::new(&allocator, path, &options).build_with_scoping(scoping, &mut program);
    if !transformed.errors.is_empty() {
        return Err(MaterializeError::Transform {
            path: path.to_path_buf(),
            message: join_diagnostics(&transformed.errors),
        });
    }

    let code = Codegen::new().build(&program).code;
    Ok(StrippedModule { code, declarations })
}
