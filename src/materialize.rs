//! Per-path materialization pipeline.
//!
//! read -> strip types -> extract exports -> canonical JSON -> write.
//! Every path is converted on its own with a fresh resolver; a failure is
//! returned for that path and never touches the others.

#[cfg(feature = "napi")]
use napi_derive::napi;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

use crate::canonical::{to_canonical_string, DEFAULT_INDENT};
use crate::error::MaterializeError;
use crate::exports::{extract_exports, ModuleExports};
use crate::resolve::{ImportResolver, ModuleResolver};
use crate::source::{expand_inputs, output_path};
use crate::strip::strip_types;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Create or overwrite the sibling `.json` file.
    #[default]
    Write,
    /// Compare against the existing `.json` file without writing.
    Check,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaterializeOptions {
    pub indent: usize,
    pub mode: Mode,
}

impl Default for MaterializeOptions {
    fn default() -> Self {
        Self {
            indent: DEFAULT_INDENT,
            mode: Mode::Write,
        }
    }
}

/// A successfully materialized path.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Top-level keys in the written JSON.
    pub keys: usize,
    /// False when the output already held exactly this content.
    pub changed: bool,
}

/// Strip and extract one module. Shared by entry files and the modules
/// they import.
pub fn evaluate_source(
    path: &Path,
    source: &str,
    resolver: &mut dyn ImportResolver,
) -> Result<ModuleExports, MaterializeError> {
    let stripped = strip_types(source, path)?;
    extract_exports(&stripped, resolver).map_err(|err| MaterializeError::extract(path, err))
}

#[derive(Debug, Clone, Default)]
pub struct Materializer {
    options: MaterializeOptions,
}

impl Materializer {
    pub fn new(options: MaterializeOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &MaterializeOptions {
        &self.options
    }

    /// Everything up to the write: returns the output path and its content.
    pub fn render(&self, input: &Path) -> Result<(PathBuf, String, usize), MaterializeError> {
        let output = output_path(input)?;

        let source = fs::read_to_string(input).map_err(|source| MaterializeError::Read {
            path: input.to_path_buf(),
            source,
        })?;

        let mut resolver = ModuleResolver::new(input);
        let exports = evaluate_source(input, &source, &mut resolver)?;
        let json = exports.to_json();
        let keys = json.as_object().map_or(0, |map| map.len());

        let text = to_canonical_string(&json, self.options.indent).map_err(|source| {
            MaterializeError::Render {
                path: input.to_path_buf(),
                source,
            }
        })?;

        Ok((output, text, keys))
    }

    pub fn convert(&self, input: &Path) -> Result<Conversion, MaterializeError> {
        let (output, text, keys) = self.render(input)?;
        // Any problem reading the old output is left for the write to report.
        let changed = fs::read_to_string(&output).map_or(true, |old| old != text);

        fs::write(&output, &text).map_err(|source| MaterializeError::Write {
            path: output.clone(),
            source,
        })?;

        Ok(Conversion {
            input: input.to_path_buf(),
            output,
            keys,
            changed,
        })
    }

    /// Fails with [`MaterializeError::Stale`] unless the output on disk
    /// matches what [`convert`](Self::convert) would write.
    pub fn check(&self, input: &Path) -> Result<Conversion, MaterializeError> {
        let (output, text, keys) = self.render(input)?;
        if read_existing(&output)?.as_deref() != Some(text.as_str()) {
            return Err(MaterializeError::Stale { path: output });
        }
        Ok(Conversion {
            input: input.to_path_buf(),
            output,
            keys,
            changed: false,
        })
    }

    pub fn process(&self, input: &Path) -> Result<Conversion, MaterializeError> {
        match self.options.mode {
            Mode::Write => self.convert(input),
            Mode::Check => self.check(input),
        }
    }

    /// Expand `inputs` and process every resulting path on the rayon pool.
    /// Outcomes keep the expanded input order.
    pub fn run(&self, inputs: &[PathBuf]) -> RunReport {
        let outcomes = expand_inputs(inputs)
            .into_par_iter()
            .map(|input| {
                let (path, result) = match input {
                    Ok(path) => {
                        let result = self.process(&path);
                        (path, result)
                    }
                    Err(err) => (err.path().to_path_buf(), Err(err)),
                };
                log_outcome(&result);
                PathOutcome { path, result }
            })
            .collect();

        RunReport { outcomes }
    }
}

fn read_existing(output: &Path) -> Result<Option<String>, MaterializeError> {
    match fs::read_to_string(output) {
        Ok(text) => Ok(Some(text)),
        // Missing or non-UTF-8 output is simply stale.
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) if err.kind() == io::ErrorKind::InvalidData => Ok(None),
        Err(source) => Err(MaterializeError::Read {
            path: output.to_path_buf(),
            source,
        }),
    }
}

fn log_outcome(result: &Result<Conversion, MaterializeError>) {
    match result {
        Ok(conversion) if conversion.changed => info!(
            input = %conversion.input.display(),
            output = %conversion.output.display(),
            keys = conversion.keys,
            "materialized"
        ),
        Ok(conversion) => debug!(
            input = %conversion.input.display(),
            output = %conversion.output.display(),
            "up to date"
        ),
        Err(err) => error!(path = %err.path().display(), "{}", err),
    }
}

#[derive(Debug)]
pub struct PathOutcome {
    /// The input path, as expanded from the arguments.
    pub path: PathBuf,
    pub result: Result<Conversion, MaterializeError>,
}

/// Per-path outcomes of one [`Materializer::run`].
#[derive(Debug, Default)]
pub struct RunReport {
    pub outcomes: Vec<PathOutcome>,
}

impl RunReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &MaterializeError> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().err())
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            succeeded: self.succeeded() as u32,
            failed: self.failed() as u32,
            outputs: self
                .outcomes
                .iter()
                .filter_map(|o| o.result.as_ref().ok())
                .map(|c| c.output.display().to_string())
                .collect(),
            errors: self.failures().map(|e| e.to_string()).collect(),
        }
    }
}

/// Serializable tally of a run, as handed to Node callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "napi", napi(object))]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub succeeded: u32,
    pub failed: u32,
    pub outputs: Vec<String>,
    pub errors: Vec<String>,
}
