use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Faults raised while statically evaluating a module's exports.
///
/// These carry no file path; [`MaterializeError::Extract`] attaches it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractError {
    #[error("unsupported expression `{snippet}`: {reason}")]
    UnsupportedExpression { snippet: String, reason: String },

    #[error("`{name}` is not defined")]
    UnresolvedIdentifier { name: String },

    #[error("cannot export `{name}`: {reason}")]
    UnsupportedDeclaration { name: String, reason: String },

    #[error("cannot resolve import \"{specifier}\": {reason}")]
    UnresolvedImport { specifier: String, reason: String },

    #[error("\"{specifier}\" has no export named `{name}`")]
    MissingExport { specifier: String, name: String },

    #[error("import cycle through {}", .path.display())]
    ImportCycle { path: PathBuf },

    #[error("in module \"{specifier}\": {message}")]
    ImportedModule { specifier: String, message: String },

    #[error("stripped output failed to parse: {message}")]
    Reparse { message: String },
}

/// A failure confined to one input path.
#[derive(Error, Debug)]
pub enum MaterializeError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{}: unsupported suffix (expected .ts, .tsx, .mts or .cts)", .path.display())]
    UnsupportedSuffix { path: PathBuf },

    #[error("{}: syntax error: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("{}: type stripping failed: {message}", .path.display())]
    Transform { path: PathBuf, message: String },

    #[error("{}: {source}", .path.display())]
    Extract {
        path: PathBuf,
        #[source]
        source: ExtractError,
    },

    #[error("failed to render {}: {source}", .path.display())]
    Render {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{} is missing or out of date", .path.display())]
    Stale { path: PathBuf },
}

impl MaterializeError {
    /// The path the failure belongs to.
    pub fn path(&self) -> &Path {
        match self {
            MaterializeError::Read { path, .. }
            | MaterializeError::UnsupportedSuffix { path }
            | MaterializeError::Parse { path, .. }
            | MaterializeError::Transform { path, .. }
            | MaterializeError::Extract { path, .. }
            | MaterializeError::Render { path, .. }
            | MaterializeError::Write { path, .. }
            | MaterializeError::Stale { path } => path,
        }
    }

    pub(crate) fn extract(path: &Path, source: ExtractError) -> Self {
        MaterializeError::Extract {
            path: path.to_path_buf(),
            source,
        }
    }
}
