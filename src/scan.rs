//! Declaration scan over the typed program, run before its types are stripped.
//!
//! Stripping rewrites `enum` and `namespace` declarations into IIFEs that
//! static evaluation cannot follow, so their runtime values (or their
//! unsupported status) are recorded here while the declarations are still
//! visible. Type-only declarations are collected for diagnostics.

use oxc_ast::ast::*;
use oxc_ast_visit::Visit;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::error::ExtractError;
use crate::static_eval::{number_to_js_string, Evaluator, Slot, StaticValue};

#[derive(Debug, Clone, Default)]
pub struct DeclarationScan {
    /// Names of interfaces and type aliases, in source order.
    pub type_only: Vec<String>,
    /// Runtime objects of top-level enums, keyed by enum name. An enum
    /// that cannot be evaluated keeps its error until something uses it.
    pub enums: HashMap<String, Slot>,
    /// Top-level namespaces that may carry runtime members.
    pub namespaces: HashSet<String>,
}

/// Collects the names of declarations that vanish during stripping.
#[derive(Default)]
struct TypeOnlyCollector {
    names: Vec<String>,
}

impl<'a> Visit<'a> for TypeOnlyCollector {
    fn visit_ts_interface_declaration(&mut self, decl: &TSInterfaceDeclaration<'a>) {
        self.names.push(decl.id.name.to_string());
    }

    fn visit_ts_type_alias_declaration(&mut self, decl: &TSTypeAliasDeclaration<'a>) {
        self.names.push(decl.id.name.to_string());
    }
}

pub fn scan_declarations(program: &Program<'_>, source: &str) -> DeclarationScan {
    let mut collector = TypeOnlyCollector::default();
    collector.visit_program(program);

    let mut scan = DeclarationScan {
        type_only: collector.names,
        ..DeclarationScan::default()
    };

    // Top-level bindings seen so far, in source order. Enum initializers
    // may refer to them.
    let mut scope: HashMap<String, Slot> = HashMap::new();

    for stmt in &program.body {
        let declaration = match stmt {
            Statement::ExportNamedDeclaration(export) => export.declaration.as_ref(),
            other => other.as_declaration(),
        };
        match declaration {
            Some(Declaration::VariableDeclaration(var)) => {
                for declarator in &var.declarations {
                    if let BindingPattern::BindingIdentifier(id) = &declarator.id {
                        let slot = match &declarator.init {
                            Some(init) => Evaluator::new(source, &scope).eval(init),
                            None => Ok(StaticValue::Undefined),
                        };
                        scope.insert(id.name.to_string(), slot);
                    }
                }
            }
            Some(Declaration::TSEnumDeclaration(decl)) if !decl.declare => {
                let name = decl.id.name.to_string();
                let slot = match scan.enums.remove(&name) {
                    Some(Err(err)) => Err(err),
                    Some(Ok(StaticValue::Object(entries))) => build_enum(decl, source, &scope, entries),
                    _ => build_enum(decl, source, &scope, BTreeMap::new()),
                };
                scope.insert(name.clone(), slot.clone());
                scan.enums.insert(name, slot);
            }
            Some(Declaration::TSModuleDeclaration(decl)) if !decl.declare => {
                if let TSModuleDeclarationName::Identifier(id) = &decl.id {
                    scan.namespaces.insert(id.name.to_string());
                }
            }
            _ => {}
        }
    }

    scan
}

/// Build the object `enum` produces at runtime: every member maps to its
/// value and numeric members also map their value back to their name.
/// `object` holds the members of earlier declarations of the same enum.
fn build_enum(
    decl: &TSEnumDeclaration<'_>,
    source: &str,
    outer: &HashMap<String, Slot>,
    mut object: BTreeMap<String, StaticValue>,
) -> Slot {
    let enum_name = decl.id.name.to_string();
    let mut scope = outer.clone();
    let mut next = Some(0.0);

    for member in &decl.body.members {
        let member_name = member.id.static_name().to_string();
        scope.insert(enum_name.clone(), Ok(StaticValue::Object(object.clone())));

        let value = match &member.initializer {
            Some(init) => Evaluator::new(source, &scope).eval(init)?,
            None => match next {
                Some(n) => StaticValue::Number(n),
                None => {
                    return Err(ExtractError::UnsupportedDeclaration {
                        name: format!("{}.{}", enum_name, member_name),
                        reason: "enum member after a string member needs an initializer"
                            .to_string(),
                    })
                }
            },
        };

        match &value {
            StaticValue::Number(n) => {
                next = Some(n + 1.0);
                object.insert(number_to_js_string(*n), StaticValue::String(member_name.clone()));
            }
            StaticValue::String(_) => next = None,
            other => {
                return Err(ExtractError::UnsupportedDeclaration {
                    name: format!("{}.{}", enum_name, member_name),
                    reason: format!("enum members must be numbers or strings, not {}", other.type_of()),
                })
            }
        }

        scope.insert(member_name.clone(), Ok(value.clone()));
        object.insert(member_name, value);
    }

    Ok(StaticValue::Object(object))
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxc_allocator::Allocator;
    use oxc_parser::Parser;
    use oxc_span::SourceType;
    use serde_json::json;

    fn scan(src: &str) -> DeclarationScan {
        let allocator = Allocator::default();
        let source_type = SourceType::default().with_typescript(true).with_module(true);
        let ret = Parser::new(&allocator, src, source_type).parse();
        assert!(ret.errors.is_empty(), "{:?}", ret.errors);
        scan_declarations(&ret.program, src)
    }

    fn enum_json(scan: &DeclarationScan, name: &str) -> Option<serde_json::Value> {
        scan.enums[name].as_ref().ok().and_then(StaticValue::to_json)
    }

    #[test]
    fn test_type_only_names() {
        let result = scan(
            r#"
            export type UUID = string
            export interface Lesson { id: UUID }
            interface Local {}
            export const value = 1
            "#,
        );
        assert_eq!(result.type_only, vec!["UUID", "Lesson", "Local"]);
        assert!(result.enums.is_empty());
    }

    #[test]
    fn test_numeric_enum_reverse_mapping() {
        let result = scan("export enum WeekDay { Monday = 1, Tuesday, Wednesday }");
        assert_eq!(
            enum_json(&result, "WeekDay"),
            Some(json!({
                "Monday": 1, "Tuesday": 2, "Wednesday": 3,
                "1": "Monday", "2": "Tuesday", "3": "Wednesday"
            }))
        );
    }

    #[test]
    fn test_string_and_referencing_members() {
        let result = scan(
            r#"
            enum Frequency { Weekly = 1, BiWeekly = Weekly * 2 }
            export enum Kind { Lesson = "lesson", Task = `task` }
            "#,
        );
        assert_eq!(
            enum_json(&result, "Frequency"),
            Some(json!({ "Weekly": 1, "BiWeekly": 2, "1": "Weekly", "2": "BiWeekly" }))
        );
        assert_eq!(
            enum_json(&result, "Kind"),
            Some(json!({ "Lesson": "lesson", "Task": "task" }))
        );
    }

    #[test]
    fn test_bit_flag_members() {
        let result = scan(
            r#"
            enum Access { None = 0, Read = 1 << 0, Write = 1 << 1, ReadWrite = Read | Write, All = ~None }
            "#,
        );
        assert_eq!(
            enum_json(&result, "Access"),
            Some(json!({
                "None": 0, "Read": 1, "Write": 2, "ReadWrite": 3, "All": -1,
                "0": "None", "1": "Read", "2": "Write", "3": "ReadWrite", "-1": "All"
            }))
        );
    }

    #[test]
    fn test_members_may_name_earlier_constants() {
        let result = scan(
            r#"
            const BASE = 10
            export const STEP: number = 5
            enum Level { Low = BASE, High = BASE + STEP }
            "#,
        );
        assert_eq!(
            enum_json(&result, "Level"),
            Some(json!({ "Low": 10, "High": 15, "10": "Low", "15": "High" }))
        );
    }

    #[test]
    fn test_failed_enum_keeps_its_error() {
        let result = scan(
            r#"
            enum Broken { A = 'a', B }
            enum Remote { Id = fetchId() }
            enum Fine { A }
            "#,
        );
        assert!(matches!(
            result.enums["Broken"],
            Err(ExtractError::UnsupportedDeclaration { .. })
        ));
        assert!(matches!(
            result.enums["Remote"],
            Err(ExtractError::UnsupportedExpression { .. })
        ));
        assert_eq!(enum_json(&result, "Fine"), Some(json!({ "A": 0, "0": "A" })));
    }

    #[test]
    fn test_repeated_declarations_merge() {
        let result = scan("enum Day { Mon = 1 }\nenum Day { Tue = 2 }");
        assert_eq!(
            enum_json(&result, "Day"),
            Some(json!({ "Mon": 1, "Tue": 2, "1": "Mon", "2": "Tue" }))
        );
    }

    #[test]
    fn test_declare_forms_are_ignored() {
        let result = scan(
            r#"
            declare enum Ambient { A }
            declare namespace Types { const x: number }
            export namespace Runtime { export const y = 1 }
            "#,
        );
        assert!(result.enums.is_empty());
        assert_eq!(result.namespaces.len(), 1);
        assert!(result.namespaces.contains("Runtime"));
    }
}
