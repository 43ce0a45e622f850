use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::discovery::{discover_entry_points, EntryPointSet};
use crate::resolver::normalize_path;
use crate::resolver::tsconfig::AliasTable;

pub mod jsonc;

/// Output directory used when `compilerOptions.outDir` is absent.
const DEFAULT_OUT_DIR: &str = "dist";

/// Errors raised while turning a project configuration into a build.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error(
        "no entry points found for {}; check the `include` and `files` fields",
        .path.display()
    )]
    NoEntryPoints { path: PathBuf },

    #[error("invalid glob pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        source: globset::Error,
    },

    #[error("path alias {pattern:?} may contain at most one `*`")]
    InvalidAlias { pattern: String },

    #[error("failed to compile path aliases: {0}")]
    AliasMatcher(#[from] regex::Error),
}

/// The parts of tsconfig.json this tool reads.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    #[serde(default)]
    pub compiler_options: CompilerOptions,
    pub include: Option<Vec<String>>,
    pub exclude: Option<Vec<String>>,
    pub files: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilerOptions {
    pub base_url: Option<String>,
    /// Kept as raw JSON so declaration order survives and odd entries can be skipped.
    pub paths: Option<serde_json::Map<String, serde_json::Value>>,
    pub out_dir: Option<String>,
    pub target: Option<String>,
    pub module: Option<String>,
    pub source_map: Option<bool>,
    pub jsx: Option<String>,
    pub jsx_factory: Option<String>,
    pub jsx_fragment_factory: Option<String>,
}

impl ProjectConfig {
    /// Read a tsconfig.json, tolerating comments and trailing commas.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse_from_str(&content, path)
    }

    /// Parse tsconfig.json content; `path` only labels errors.
    pub fn parse_from_str(content: &str, path: &Path) -> Result<Self, ConfigError> {
        serde_json::from_str(&jsonc::strip_comments(content)).map_err(|source| {
            ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            }
        })
    }
}

/// Module format of the emitted JavaScript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleFormat {
    /// CommonJS (`require` / `module.exports`).
    Cjs,
    /// Standard ES modules.
    Esm,
    /// Immediately-invoked function expression, for script tags.
    Iife,
}

impl ModuleFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            ModuleFormat::Cjs => "cjs",
            ModuleFormat::Esm => "esm",
            ModuleFormat::Iife => "iife",
        }
    }
}

/// How the bundler should treat JSX.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsxMode {
    /// Classic `React.createElement` transform (or the configured factory).
    #[default]
    Transform,
    /// The `react/jsx-runtime` automatic runtime.
    Automatic,
    /// Leave JSX in the output untouched.
    Preserve,
}

impl JsxMode {
    fn from_tsconfig(jsx: Option<&str>) -> Self {
        match jsx.map(str::to_ascii_lowercase).as_deref() {
            Some("react-jsx") | Some("react-jsxdev") => JsxMode::Automatic,
            Some("preserve") | Some("react-native") => JsxMode::Preserve,
            _ => JsxMode::Transform,
        }
    }
}

/// Caller-supplied knobs that are not part of tsconfig.json.
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Produce one bundle instead of one output per input file.
    pub bundle: bool,
    /// Force a module format instead of inferring it from `module`.
    pub format: Option<ModuleFormat>,
    /// Ask the bundler for an output manifest.
    pub collect_metadata: bool,
}

/// Everything the bundler needs besides entry points and the resolve hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    pub format: ModuleFormat,
    /// Lowercased ECMAScript target, e.g. `es2020`.
    pub target: Option<String>,
    pub sourcemap: bool,
    pub jsx: JsxMode,
    pub jsx_factory: Option<String>,
    pub jsx_fragment: Option<String>,
    /// Absolute output directory.
    pub out_dir: PathBuf,
    pub bundle: bool,
    pub metafile: bool,
}

impl BuildOptions {
    fn from_config(config: &ProjectConfig, config_dir: &Path, options: &ResolveOptions) -> Self {
        let co = &config.compiler_options;
        let out_dir = normalize_path(
            &config_dir.join(co.out_dir.as_deref().unwrap_or(DEFAULT_OUT_DIR)),
        );

        BuildOptions {
            format: infer_format(co.module.as_deref(), options.format),
            target: co.target.as_ref().map(|t| t.to_ascii_lowercase()),
            sourcemap: co.source_map.unwrap_or(false),
            jsx: JsxMode::from_tsconfig(co.jsx.as_deref()),
            jsx_factory: co.jsx_factory.clone(),
            jsx_fragment: co.jsx_fragment_factory.clone(),
            out_dir,
            bundle: options.bundle,
            metafile: options.collect_metadata,
        }
    }
}

/// Pick the output module format.
///
/// An explicit override always wins. Otherwise any `module` mentioning
/// CommonJS maps to [`ModuleFormat::Cjs`], every other value (ES2015,
/// ESNext, Node16, NodeNext, ...) to [`ModuleFormat::Esm`], and a missing
/// `module` to [`ModuleFormat::Cjs`], the type-checker's own default.
pub fn infer_format(module: Option<&str>, override_format: Option<ModuleFormat>) -> ModuleFormat {
    if let Some(format) = override_format {
        return format;
    }
    match module {
        None => ModuleFormat::Cjs,
        Some(module) if module.to_ascii_lowercase().contains("commonjs") => ModuleFormat::Cjs,
        Some(_) => ModuleFormat::Esm,
    }
}

/// A fully resolved build: where the config lives, what to build, how, and
/// the alias table for the resolve hook. All paths are absolute.
#[derive(Debug, Clone)]
pub struct ResolvedProject {
    pub config_path: PathBuf,
    pub config_dir: PathBuf,
    pub entry_points: EntryPointSet,
    pub options: BuildOptions,
    pub aliases: AliasTable,
}

/// Resolve the project configuration at `config_path` (relative to `cwd`).
pub fn resolve(
    config_path: &Path,
    cwd: &Path,
    options: &ResolveOptions,
) -> Result<ResolvedProject, ConfigError> {
    let config_path = normalize_path(&cwd.join(config_path));
    let config_dir = config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| cwd.to_path_buf());

    let config = ProjectConfig::load(&config_path)?;
    let build_options = BuildOptions::from_config(&config, &config_dir, options);

    let entry_points =
        discover_entry_points(&config, &config_path, &build_options.out_dir, options.bundle)?;

    let base_url = config
        .compiler_options
        .base_url
        .as_ref()
        .map(|url| normalize_path(&config_dir.join(url)));
    let aliases = AliasTable::from_config(
        config.compiler_options.paths.as_ref(),
        base_url.as_deref(),
        &config_dir,
    )?;

    log::debug!(
        "{}: {} entry point(s), format {}, {} alias table",
        config_path.display(),
        entry_points.len(),
        build_options.format.as_str(),
        if aliases.is_empty() { "empty" } else { "non-empty" },
    );

    Ok(ResolvedProject {
        config_path,
        config_dir,
        entry_points,
        options: build_options,
        aliases,
    })
}
