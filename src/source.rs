//! Input path handling.
//!
//! Decides which files are typed sources, where their JSON snapshot goes,
//! and expands directory arguments into the source files below them.

use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::MaterializeError;

/// Suffixes accepted as typed source.
pub const SOURCE_EXTENSIONS: &[&str] = &["ts", "tsx", "mts", "cts"];

/// Suffix given to every snapshot.
pub const OUTPUT_EXTENSION: &str = "json";

/// Plain-JS suffixes that TypeScript lets an import name in place of the source file.
const JS_ALIASES: &[(&str, &str)] = &[("js", "ts"), ("jsx", "tsx"), ("mjs", "mts"), ("cjs", "cts")];

fn extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|ext| ext.to_str())
}

pub fn has_source_extension(path: &Path) -> bool {
    extension(path).is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext))
}

/// `foo.d.ts` and friends declare types only and never carry values.
pub fn is_declaration_file(path: &Path) -> bool {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .is_some_and(|stem| stem.ends_with(".d"))
        && has_source_extension(path)
}

/// Replace the source suffix of `input` with `.json`, keeping directory and base name.
pub fn output_path(input: &Path) -> Result<PathBuf, MaterializeError> {
    if !has_source_extension(input) {
        return Err(MaterializeError::UnsupportedSuffix {
            path: input.to_path_buf(),
        });
    }
    Ok(input.with_extension(OUTPUT_EXTENSION))
}

/// Expand directory arguments into the source files they contain.
///
/// Files named directly pass through untouched, even with an unsupported
/// suffix, so the caller reports them. Directory contents are sorted by
/// file name; `node_modules` and declaration files are skipped.
pub fn expand_inputs(inputs: &[PathBuf]) -> Vec<Result<PathBuf, MaterializeError>> {
    let mut expanded = Vec::new();

    for input in inputs {
        if !input.is_dir() {
            expanded.push(Ok(input.clone()));
            continue;
        }

        let walker = WalkDir::new(input)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.file_name() != "node_modules");

        for entry in walker {
            match entry {
                Ok(entry) => {
                    let path = entry.path();
                    if entry.file_type().is_file()
                        && has_source_extension(path)
                        && !is_declaration_file(path)
                    {
                        expanded.push(Ok(path.to_path_buf()));
                    }
                }
                Err(err) => {
                    let path = err.path().unwrap_or(input).to_path_buf();
                    expanded.push(Err(MaterializeError::Read {
                        path,
                        source: io::Error::from(err),
                    }));
                }
            }
        }
    }

    expanded
}

/// Files an import of `target` may refer to, most specific first.
pub(crate) fn module_candidates(target: &Path) -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if let Some(ext) = extension(target) {
        if let Some((_, ts_ext)) = JS_ALIASES.iter().find(|(js_ext, _)| *js_ext == ext) {
            candidates.push(target.with_extension(ts_ext));
        }
        if SOURCE_EXTENSIONS.contains(&ext) || ext == OUTPUT_EXTENSION {
            candidates.push(target.to_path_buf());
        }
    }

    for ext in SOURCE_EXTENSIONS {
        let mut with_suffix = target.as_os_str().to_owned();
        with_suffix.push(".");
        with_suffix.push(ext);
        candidates.push(PathBuf::from(with_suffix));
    }

    for ext in SOURCE_EXTENSIONS {
        candidates.push(target.join("index").with_extension(ext));
    }

    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_output_path_replaces_suffix_only() {
        assert_eq!(
            output_path(Path::new("contract/examples.ts")).unwrap(),
            PathBuf::from("contract/examples.json")
        );
        assert_eq!(
            output_path(Path::new("/abs/dir.v2/lesson.fixtures.mts")).unwrap(),
            PathBuf::from("/abs/dir.v2/lesson.fixtures.json")
        );
        assert_eq!(
            output_path(Path::new("page.tsx")).unwrap(),
            PathBuf::from("page.json")
        );
    }

    #[test]
    fn test_output_path_never_equals_input() {
        for input in ["examples.js", "examples.json", "examples", "notes_ts"] {
            let err = output_path(Path::new(input)).unwrap_err();
            assert!(matches!(err, MaterializeError::UnsupportedSuffix { .. }));
        }
    }

    #[test]
    fn test_declaration_files() {
        assert!(is_declaration_file(Path::new("types/global.d.ts")));
        assert!(is_declaration_file(Path::new("env.d.mts")));
        assert!(!is_declaration_file(Path::new("examples.ts")));
        assert!(!is_declaration_file(Path::new("d.ts")));
    }

    #[test]
    fn test_expand_inputs_walks_directories() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("nested")).unwrap();
        fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
        fs::write(root.join("b.ts"), "").unwrap();
        fs::write(root.join("a.ts"), "").unwrap();
        fs::write(root.join("types.d.ts"), "").unwrap();
        fs::write(root.join("readme.md"), "").unwrap();
        fs::write(root.join("nested/c.mts"), "").unwrap();
        fs::write(root.join("node_modules/pkg/index.ts"), "").unwrap();

        let loose = PathBuf::from("loose.js");
        let expanded: Vec<PathBuf> = expand_inputs(&[root.to_path_buf(), loose.clone()])
            .into_iter()
            .map(|p| p.unwrap())
            .collect();

        assert_eq!(
            expanded,
            vec![
                root.join("a.ts"),
                root.join("b.ts"),
                root.join("nested/c.mts"),
                loose
            ]
        );
    }

    #[test]
    fn test_module_candidates() {
        let candidates = module_candidates(Path::new("contract/requests"));
        assert_eq!(candidates[0], PathBuf::from("contract/requests.ts"));
        assert!(candidates.contains(&PathBuf::from("contract/requests/index.ts")));

        let aliased = module_candidates(Path::new("contract/requests.js"));
        assert_eq!(aliased[0], PathBuf::from("contract/requests.ts"));

        let json = module_candidates(Path::new("data/lessons.json"));
        assert_eq!(json[0], PathBuf::from("data/lessons.json"));
    }
}
