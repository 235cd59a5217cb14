//! Export extraction.
//!
//! Walks the top level of a stripped module and collects the value of every
//! export, in place of running the module and reading back its `exports`
//! object. Declarations are evaluated in source order into a module scope;
//! a binding that fails to evaluate only matters if an export reaches it.
//! Statements other than declarations are never run.

use oxc_allocator::Allocator;
use oxc_ast::ast::*;
use oxc_parser::Parser;
use oxc_span::{GetSpan, SourceType};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

use crate::error::ExtractError;
use crate::resolve::ImportResolver;
use crate::static_eval::{snippet, Evaluator, Slot, StaticValue};
use crate::strip::StrippedModule;

const DEFAULT_EXPORT: &str = "default";

/// The named values a module exports, functions included.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModuleExports {
    values: BTreeMap<String, StaticValue>,
}

impl ModuleExports {
    pub fn get(&self, name: &str) -> Option<&StaticValue> {
        self.values.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The module namespace object, as `import * as ns` sees it.
    pub fn to_namespace(&self) -> StaticValue {
        StaticValue::Object(self.values.clone())
    }

    /// The exports as a JSON object. Entries JSON cannot hold (functions,
    /// `undefined`) are left out.
    pub fn to_json(&self) -> Value {
        self.to_namespace()
            .to_json()
            .unwrap_or_else(|| Value::Object(Default::default()))
    }
}

impl FromIterator<(String, StaticValue)> for ModuleExports {
    fn from_iter<I: IntoIterator<Item = (String, StaticValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

pub fn extract_exports(
    module: &StrippedModule,
    resolver: &mut dyn ImportResolver,
) -> Result<ModuleExports, ExtractError> {
    let allocator = Allocator::default();
    let source_type = SourceType::default().with_module(true);
    let ret = Parser::new(&allocator, &module.code, source_type).parse();

    if !ret.errors.is_empty() {
        return Err(ExtractError::Reparse {
            message: ret
                .errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; "),
        });
    }

    if !module.declarations.type_only.is_empty() {
        debug!(
            names = ?module.declarations.type_only,
            "type-only declarations carry no runtime value"
        );
    }

    let mut walker = ModuleWalker::new(module);
    for stmt in &ret.program.body {
        walker.statement(stmt, resolver)?;
    }
    walker.finish()
}

struct ModuleWalker<'m> {
    module: &'m StrippedModule,
    scope: HashMap<String, Slot>,
    exports: BTreeMap<String, StaticValue>,
    /// `export { local as exported }` without a source; resolved once the
    /// whole module has been seen, since such exports may precede the binding.
    pending: Vec<(String, String)>,
    /// `export * from` re-exports; explicit exports take precedence.
    star_exports: Vec<ModuleExports>,
}

impl<'m> ModuleWalker<'m> {
    fn new(module: &'m StrippedModule) -> Self {
        Self {
            module,
            scope: HashMap::new(),
            exports: BTreeMap::new(),
            pending: Vec::new(),
            star_exports: Vec::new(),
        }
    }

    fn source(&self) -> &'m str {
        &self.module.code
    }

    fn eval(&self, expr: &Expression<'_>) -> Slot {
        Evaluator::new(self.source(), &self.scope).eval(expr)
    }

    fn statement(
        &mut self,
        stmt: &Statement<'_>,
        resolver: &mut dyn ImportResolver,
    ) -> Result<(), ExtractError> {
        match stmt {
            Statement::ImportDeclaration(import) => {
                self.import(import, resolver);
                Ok(())
            }
            Statement::VariableDeclaration(var) => self.variables(var, false),
            Statement::FunctionDeclaration(func) => {
                if let Some(id) = &func.id {
                    self.scope.insert(id.name.to_string(), Ok(StaticValue::Function));
                }
                Ok(())
            }
            Statement::ClassDeclaration(class) => {
                if let Some(id) = &class.id {
                    self.scope.insert(id.name.to_string(), Ok(StaticValue::Function));
                }
                Ok(())
            }
            Statement::ExportNamedDeclaration(export) => self.export_named(export, resolver),
            Statement::ExportDefaultDeclaration(export) => self.export_default(export),
            Statement::ExportAllDeclaration(export) => self.export_all(export, resolver),
            Statement::EmptyStatement(_) => Ok(()),
            other => {
                warn!(
                    statement = %snippet(self.source(), other.span()),
                    "skipping top-level statement; only declarations are evaluated"
                );
                Ok(())
            }
        }
    }

    /// Imports bind lazily: a failed import is reported only if a value uses it.
    fn import(&mut self, import: &ImportDeclaration<'_>, resolver: &mut dyn ImportResolver) {
        if import.import_kind.is_type() {
            return;
        }
        let specifier = import.source.value.as_str();
        let Some(specifiers) = &import.specifiers else {
            debug!(specifier, "side-effect import ignored");
            return;
        };

        let module = resolver.resolve(specifier);
        for spec in specifiers {
            let (local, slot) = match spec {
                ImportDeclarationSpecifier::ImportSpecifier(s) => {
                    if s.import_kind.is_type() {
                        continue;
                    }
                    (&s.local, imported(&module, specifier, s.imported.name().as_str()))
                }
                ImportDeclarationSpecifier::ImportDefaultSpecifier(s) => {
                    (&s.local, imported(&module, specifier, DEFAULT_EXPORT))
                }
                ImportDeclarationSpecifier::ImportNamespaceSpecifier(s) => (
                    &s.local,
                    module.as_ref().map(ModuleExports::to_namespace).map_err(Clone::clone),
                ),
            };
            self.scope.insert(local.name.to_string(), slot);
        }
    }

    fn variables(
        &mut self,
        var: &VariableDeclaration<'_>,
        exported: bool,
    ) -> Result<(), ExtractError> {
        for declarator in &var.declarations {
            match &declarator.id {
                BindingPattern::BindingIdentifier(id) => {
                    let name = id.name.to_string();
                    let slot = self.initial_value(&name, declarator.init.as_ref());
                    if exported {
                        self.exports.insert(name.clone(), slot.clone()?);
                    }
                    self.scope.insert(name, slot);
                }
                pattern => {
                    let text = snippet(self.source(), pattern.span());
                    if exported {
                        return Err(ExtractError::UnsupportedDeclaration {
                            name: text,
                            reason: "destructured exports cannot be evaluated statically"
                                .to_string(),
                        });
                    }
                    warn!(pattern = %text, "skipping destructured declaration");
                }
            }
        }
        Ok(())
    }

    fn initial_value(&self, name: &str, init: Option<&Expression<'_>>) -> Slot {
        let declarations = &self.module.declarations;
        if let Some(slot) = declarations.enums.get(name) {
            return slot.clone();
        }
        if declarations.namespaces.contains(name) {
            return Err(ExtractError::UnsupportedDeclaration {
                name: name.to_string(),
                reason: "namespaces with runtime members cannot be evaluated statically"
                    .to_string(),
            });
        }
        match init {
            Some(expr) => self.eval(expr),
            None => Ok(StaticValue::Undefined),
        }
    }

    fn export_function(&mut self, id: Option<&BindingIdentifier<'_>>) {
        if let Some(id) = id {
            debug!(export = %id.name, "function export has no JSON value");
            self.scope.insert(id.name.to_string(), Ok(StaticValue::Function));
            self.exports.insert(id.name.to_string(), StaticValue::Function);
        }
    }

    fn export_named(
        &mut self,
        export: &ExportNamedDeclaration<'_>,
        resolver: &mut dyn ImportResolver,
    ) -> Result<(), ExtractError> {
        if export.export_kind.is_type() {
            return Ok(());
        }

        match &export.declaration {
            Some(Declaration::VariableDeclaration(var)) => self.variables(var, true)?,
            Some(Declaration::FunctionDeclaration(func)) => self.export_function(func.id.as_ref()),
            Some(Declaration::ClassDeclaration(class)) => self.export_function(class.id.as_ref()),
            _ => {}
        }

        let specifiers = export.specifiers.iter().filter(|s| !s.export_kind.is_type());
        match &export.source {
            Some(source) => {
                let specifier = source.value.as_str();
                let module = resolver.resolve(specifier)?;
                for spec in specifiers {
                    let local = spec.local.name();
                    let value = module.get(local.as_str()).cloned().ok_or_else(|| {
                        ExtractError::MissingExport {
                            specifier: specifier.to_string(),
                            name: local.to_string(),
                        }
                    })?;
                    self.exports.insert(spec.exported.name().to_string(), value);
                }
            }
            None => {
                for spec in specifiers {
                    self.pending
                        .push((spec.local.name().to_string(), spec.exported.name().to_string()));
                }
            }
        }
        Ok(())
    }

    fn export_default(&mut self, export: &ExportDefaultDeclaration<'_>) -> Result<(), ExtractError> {
        let value = match &export.declaration {
            ExportDefaultDeclarationKind::FunctionDeclaration(func) => {
                if let Some(id) = &func.id {
                    self.scope.insert(id.name.to_string(), Ok(StaticValue::Function));
                }
                StaticValue::Function
            }
            ExportDefaultDeclarationKind::ClassDeclaration(class) => {
                if let Some(id) = &class.id {
                    self.scope.insert(id.name.to_string(), Ok(StaticValue::Function));
                }
                StaticValue::Function
            }
            kind => match kind.as_expression() {
                Some(expr) => self.eval(expr)?,
                None => return Ok(()),
            },
        };
        self.exports.insert(DEFAULT_EXPORT.to_string(), value);
        Ok(())
    }

    fn export_all(
        &mut self,
        export: &ExportAllDeclaration<'_>,
        resolver: &mut dyn ImportResolver,
    ) -> Result<(), ExtractError> {
        if export.export_kind.is_type() {
            return Ok(());
        }
        let module = resolver.resolve(export.source.value.as_str())?;
        match &export.exported {
            Some(name) => {
                self.exports.insert(name.name().to_string(), module.to_namespace());
            }
            None => self.star_exports.push(module),
        }
        Ok(())
    }

    fn finish(mut self) -> Result<ModuleExports, ExtractError> {
        for (local, exported) in std::mem::take(&mut self.pending) {
            let value = match self.scope.get(&local) {
                Some(slot) => slot.clone()?,
                None => return Err(ExtractError::UnresolvedIdentifier { name: local }),
            };
            self.exports.insert(exported, value);
        }

        // `export *` never forwards a default export, and a name two star
        // sources disagree on is ambiguous and not exported at all.
        let mut starred: BTreeMap<String, Option<StaticValue>> = BTreeMap::new();
        for module in std::mem::take(&mut self.star_exports) {
            for (name, value) in module.values {
                if name == DEFAULT_EXPORT {
                    continue;
                }
                match starred.get_mut(&name) {
                    Some(seen) => {
                        if seen.as_ref() != Some(&value) {
                            *seen = None;
                        }
                    }
                    None => {
                        starred.insert(name, Some(value));
                    }
                }
            }
        }
        for (name, value) in starred {
            if let Some(value) = value {
                self.exports.entry(name).or_insert(value);
            }
        }

        Ok(ModuleExports {
            values: self.exports,
        })
    }
}

fn imported(module: &Result<ModuleExports, ExtractError>, specifier: &str, name: &str) -> Slot {
    match module {
        Ok(exports) => exports
            .get(name)
            .cloned()
            .ok_or_else(|| ExtractError::MissingExport {
                specifier: specifier.to_string(),
                name: name.to_string(),
            }),
        Err(err) => Err(err.clone()),
    }
}
