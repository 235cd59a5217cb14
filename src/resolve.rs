//! Import resolution for relative data modules.
//!
//! An example file may import values from its siblings. Those are
//! materialized the same way as the entry file and cached per canonical
//! path for the rest of the entry's conversion.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::ExtractError;
use crate::exports::ModuleExports;
use crate::materialize::evaluate_source;
use crate::source::{module_candidates, OUTPUT_EXTENSION};
use crate::static_eval::StaticValue;

/// Supplies the exports of a module named by an import specifier.
pub trait ImportResolver {
    fn resolve(&mut self, specifier: &str) -> Result<ModuleExports, ExtractError>;
}

/// Resolves relative specifiers against the importing file's directory.
///
/// Bare specifiers (packages, `node:` builtins) are never resolved.
pub struct ModuleResolver {
    /// Modules being evaluated, innermost last.
    stack: Vec<PathBuf>,
    cache: HashMap<PathBuf, ModuleExports>,
}

impl ModuleResolver {
    pub fn new(entry: &Path) -> Self {
        let entry = fs::canonicalize(entry).unwrap_or_else(|_| entry.to_path_buf());
        Self {
            stack: vec![entry],
            cache: HashMap::new(),
        }
    }

    fn importer_dir(&self) -> PathBuf {
        self.stack
            .last()
            .and_then(|path| path.parent())
            .map(Path::to_path_buf)
            .unwrap_or_default()
    }

    fn locate(&self, specifier: &str) -> Result<PathBuf, ExtractError> {
        if !is_relative(specifier) {
            return Err(ExtractError::UnresolvedImport {
                specifier: specifier.to_string(),
                reason: "only relative imports are followed".to_string(),
            });
        }

        let target = self.importer_dir().join(specifier);
        module_candidates(&target)
            .into_iter()
            .find(|candidate| candidate.is_file())
            .map(|found| fs::canonicalize(&found).unwrap_or(found))
            .ok_or_else(|| ExtractError::UnresolvedImport {
                specifier: specifier.to_string(),
                reason: format!("no module found at {}", target.display()),
            })
    }

    fn load(&mut self, path: &Path) -> Result<ModuleExports, String> {
        let source = fs::read_to_string(path).map_err(|e| e.to_string())?;

        if path.extension().is_some_and(|ext| ext == OUTPUT_EXTENSION) {
            let value: serde_json::Value =
                serde_json::from_str(&source).map_err(|e| e.to_string())?;
            return Ok(ModuleExports::from_iter([(
                "default".to_string(),
                StaticValue::from_json(&value),
            )]));
        }

        self.stack.push(path.to_path_buf());
        let result = evaluate_source(path, &source, self).map_err(|e| e.to_string());
        self.stack.pop();
        result
    }
}

impl ImportResolver for ModuleResolver {
    fn resolve(&mut self, specifier: &str) -> Result<ModuleExports, ExtractError> {
        let path = self.locate(specifier)?;

        if let Some(cached) = self.cache.get(&path) {
            return Ok(cached.clone());
        }
        if self.stack.contains(&path) {
            return Err(ExtractError::ImportCycle { path });
        }

        debug!(specifier, path = %path.display(), "loading imported module");
        let exports = self
            .load(&path)
            .map_err(|message| ExtractError::ImportedModule {
                specifier: specifier.to_string(),
                message,
            })?;
        self.cache.insert(path, exports.clone());
        Ok(exports)
    }
}

fn is_relative(specifier: &str) -> bool {
    specifier.starts_with("./") || specifier.starts_with("../")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_specifiers_are_not_followed() {
        let mut resolver = ModuleResolver::new(Path::new("examples.ts"));
        let err = resolver.resolve("uuid").unwrap_err();
        assert!(matches!(err, ExtractError::UnresolvedImport { .. }));
        let err = resolver.resolve("node:fs").unwrap_err();
        assert!(matches!(err, ExtractError::UnresolvedImport { .. }));
    }

    #[test]
    fn test_json_modules_export_default() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("data.json"), r#"{"ids": [1, 2]}"#).unwrap();
        let entry = dir.path().join("examples.ts");
        fs::write(&entry, "").unwrap();

        let mut resolver = ModuleResolver::new(&entry);
        let exports = resolver.resolve("./data.json").unwrap();
        assert_eq!(
            exports.to_json(),
            serde_json::json!({ "default": { "ids": [1, 2] } })
        );
    }

    #[test]
    fn test_missing_module() {
        let dir = tempfile::tempdir().unwrap();
        let entry = dir.path().join("examples.ts");
        fs::write(&entry, "").unwrap();

        let mut resolver = ModuleResolver::new(&entry);
        let err = resolver.resolve("./nowhere").unwrap_err();
        assert!(matches!(err, ExtractError::UnresolvedImport { .. }));
    }
}
