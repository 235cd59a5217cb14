//! Node bindings, built with the `napi` feature.

use napi_derive::napi;
use std::path::{Path, PathBuf};

use crate::canonical::{to_canonical_string, DEFAULT_INDENT};
use crate::materialize::{evaluate_source, MaterializeOptions, Materializer, RunSummary};
use crate::resolve::ModuleResolver;

/// Materialize every path with default options and report the tally.
#[napi]
pub fn materialize_native(paths: Vec<String>) -> RunSummary {
    let inputs: Vec<PathBuf> = paths.into_iter().map(PathBuf::from).collect();
    Materializer::new(MaterializeOptions::default())
        .run(&inputs)
        .summary()
}

/// Canonical JSON for in-memory source. `file_path` anchors relative
/// imports and selects the dialect; nothing is written.
#[napi]
pub fn render_exports_native(file_path: String, source: String) -> napi::Result<String> {
    let path = Path::new(&file_path);
    let mut resolver = ModuleResolver::new(path);
    let exports = evaluate_source(path, &source, &mut resolver)
        .map_err(|e| napi::Error::from_reason(e.to_string()))?;
    to_canonical_string(&exports.to_json(), DEFAULT_INDENT)
        .map_err(|e| napi::Error::from_reason(e.to_string()))
}
