//! # Example Materializer
//!
//! Converts typed example files into JSON snapshots of their exported
//! values. Each input goes through the same pipeline:
//!
//! 1. **Read** the source text.
//! 2. **Strip** type-only syntax with the oxc TypeScript transform
//!    ([`strip_types`]). Enum and namespace declarations are scanned first,
//!    while their types are still visible.
//! 3. **Extract** the exports by evaluating literal declarations statically
//!    ([`extract_exports`]). No source code is executed; anything outside
//!    the literal subset is an [`ExtractError`].
//! 4. **Render** canonical JSON: keys sorted by UTF-16 code units at every
//!    depth, 4-space indentation ([`to_canonical_string`]).
//! 5. **Write** the result next to the input with a `.json` suffix
//!    ([`output_path`]).
//!
//! Failures are confined to the path that produced them; [`RunReport`]
//! collects the outcome of every path.

mod canonical;
mod error;
mod exports;
mod materialize;
#[cfg(feature = "napi")]
mod node;
mod resolve;
mod scan;
mod source;
mod static_eval;
mod strip;

#[cfg(test)]
mod materialize_tests;

pub use canonical::{to_canonical_string, DEFAULT_INDENT};
pub use error::{ExtractError, MaterializeError};
pub use exports::{extract_exports, ModuleExports};
pub use materialize::{
    evaluate_source, Conversion, MaterializeOptions, Materializer, Mode, PathOutcome, RunReport,
    RunSummary,
};
#[cfg(feature = "napi")]
pub use node::{materialize_native, render_exports_native};
pub use resolve::{ImportResolver, ModuleResolver};
pub use scan::{scan_declarations, DeclarationScan};
pub use source::{expand_inputs, output_path, OUTPUT_EXTENSION, SOURCE_EXTENSIONS};
pub use static_eval::{Evaluator, StaticValue};
pub use strip::{strip_types, StrippedModule};
