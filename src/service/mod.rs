use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::BuildOptions;
use crate::resolver::ResolveHook;

pub mod esbuild;
pub mod tsc;

/// Errors reported by the bundling and declaration-emit collaborators.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("failed to run {tool}: {source}")]
    Spawn {
        tool: String,
        source: std::io::Error,
    },

    #[error("bundling failed:\n{}", .diagnostics.join("\n"))]
    Bundle { diagnostics: Vec<String> },

    #[error("declaration emit failed:\n{}", .diagnostics.join("\n"))]
    Declarations { diagnostics: Vec<String> },

    #[error("failed to read build manifest {}: {reason}", .path.display())]
    Manifest { path: PathBuf, reason: String },
}

/// Everything handed to the bundler for one build.
pub struct BundleRequest<'a> {
    /// Absolute entry points.
    pub entry_points: &'a [PathBuf],
    pub options: &'a BuildOptions,
    /// Directory the bundler runs in (the configuration directory).
    pub working_dir: &'a Path,
    /// Hook consulted for every import specifier the bundler meets.
    pub resolver: &'a dyn ResolveHook,
}

/// What a successful bundle produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BundleOutcome {
    /// Absolute output files; filled only when `options.metafile` was set.
    pub outputs: Vec<PathBuf>,
    /// Non-fatal messages from the bundler.
    pub warnings: Vec<String>,
}

/// The bundling/transpilation engine.
pub trait Bundler {
    fn bundle(&self, request: &BundleRequest<'_>) -> Result<BundleOutcome, ServiceError>;
}

/// The type-checker, used only to emit `.d.ts` files.
pub trait DeclarationEmitter {
    /// Emit declarations for the project at `config_path` into `out_dir`.
    fn emit(&self, config_path: &Path, out_dir: &Path) -> Result<(), ServiceError>;
}

/// Non-empty, trimmed lines of tool output.
fn diagnostic_lines(output: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(output)
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect()
}
