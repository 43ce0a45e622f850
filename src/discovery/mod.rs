use std::collections::HashSet;
use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobMatcher, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;

use crate::config::{ConfigError, ProjectConfig};
use crate::resolver::normalize_path;

/// Include pattern used when tsconfig.json has neither `files` nor `include`.
const DEFAULT_INCLUDE: &str = "**/*";

/// Exclude patterns used when tsconfig.json has no `exclude`.
const DEFAULT_EXCLUDE_PATTERNS: &[&str] = &["node_modules", "bower_components", "jspm_packages"];

/// Extensions picked up by the default include. Declaration files are skipped.
const SOURCE_EXTENSIONS: &[&str] = &["ts", "tsx", "mts", "cts", "js", "jsx", "mjs", "cjs"];

/// Base names preferred when several entry points collapse into one bundle.
const PREFERRED_ENTRY_NAMES: &[&str] = &["main", "index"];

/// Ordered, absolute build roots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryPointSet(Vec<PathBuf>);

impl EntryPointSet {
    pub fn paths(&self) -> &[PathBuf] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<PathBuf> {
        self.0
    }
}

/// Compute the entry points for a configuration.
///
/// A non-empty `files` list is taken verbatim. Otherwise every `include`
/// pattern is expanded (directories become `dir/**/*`) minus the `exclude`
/// patterns, keeping only regular files. With `bundle` set the result is
/// collapsed to a single root. An empty result is an error.
pub fn discover_entry_points(
    config: &ProjectConfig,
    config_path: &Path,
    out_dir: &Path,
    bundle: bool,
) -> Result<EntryPointSet, ConfigError> {
    let config_dir = config_path.parent().unwrap_or(Path::new("/"));

    let discovered = match config.files.as_deref() {
        Some(files) if !files.is_empty() => files
            .iter()
            .map(|file| normalize_path(&config_dir.join(file)))
            .collect(),
        _ => expand_includes(config, config_dir, out_dir)?,
    };

    let entry_points = if bundle {
        collapse_for_bundle(discovered)
    } else {
        discovered
    };

    if entry_points.is_empty() {
        return Err(ConfigError::NoEntryPoints {
            path: config_path.to_path_buf(),
        });
    }

    Ok(EntryPointSet(entry_points))
}

/// Reduce several entry points to one for a single-bundle build.
///
/// The first path whose base name is `main` or `index` wins; failing that,
/// the first path overall.
pub fn collapse_for_bundle(mut entry_points: Vec<PathBuf>) -> Vec<PathBuf> {
    if entry_points.len() <= 1 {
        return entry_points;
    }
    let chosen = entry_points
        .iter()
        .position(|path| is_preferred_entry(path))
        .unwrap_or(0);
    vec![entry_points.swap_remove(chosen)]
}

fn is_preferred_entry(path: &Path) -> bool {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .is_some_and(|stem| PREFERRED_ENTRY_NAMES.contains(&stem))
}

fn expand_includes(
    config: &ProjectConfig,
    config_dir: &Path,
    out_dir: &Path,
) -> Result<Vec<PathBuf>, ConfigError> {
    let (includes, sources_only) = match &config.include {
        Some(include) => (include.clone(), false),
        None => (vec![DEFAULT_INCLUDE.to_string()], true),
    };

    let exclude = match &config.exclude {
        Some(exclude) => build_exclude_set(exclude.iter().map(String::as_str), config_dir, None)?,
        None => build_exclude_set(
            DEFAULT_EXCLUDE_PATTERNS.iter().copied(),
            config_dir,
            Some(out_dir),
        )?,
    };

    let mut seen = HashSet::new();
    let mut entry_points = Vec::new();

    for pattern in &includes {
        let pattern = expand_directory_pattern(pattern, config_dir);
        let (walk_root, matcher) = compile_include(&pattern)?;
        let literal_names = literal_components(&pattern, &walk_root);

        for path in walk_files(&walk_root, &exclude, &literal_names) {
            if !matcher.is_match(&path) {
                continue;
            }
            if sources_only && !is_source_file(&path) {
                continue;
            }
            if seen.insert(path.clone()) {
                entry_points.push(path);
            }
        }
    }

    Ok(entry_points)
}

/// Make a pattern absolute and, if it names an existing directory, widen it
/// to everything below that directory.
fn expand_directory_pattern(pattern: &str, config_dir: &Path) -> String {
    let absolute = normalize_path(&config_dir.join(pattern));
    let absolute = absolute.to_string_lossy().into_owned();
    if !has_wildcard(&absolute) && Path::new(&absolute).is_dir() {
        format!("{}/**/*", absolute.trim_end_matches('/'))
    } else {
        absolute
    }
}

/// Split an absolute pattern into the literal directory to walk and a matcher
/// for the full pattern.
fn compile_include(pattern: &str) -> Result<(PathBuf, GlobMatcher), ConfigError> {
    let mut root = PathBuf::new();
    for component in Path::new(pattern).components() {
        let part = component.as_os_str().to_string_lossy();
        if has_wildcard(&part) {
            break;
        }
        root.push(component);
    }
    // A fully literal pattern names a file; walk its parent
    if root.as_os_str() == pattern {
        root.pop();
    }

    Ok((root, compile_glob(pattern)?.compile_matcher()))
}

/// Components of `pattern` below `walk_root` that contain no wildcard.
/// Hidden entries are only walked when named by one of these.
fn literal_components(pattern: &str, walk_root: &Path) -> HashSet<String> {
    let below = Path::new(pattern)
        .strip_prefix(walk_root)
        .unwrap_or(Path::new(pattern));
    below
        .components()
        .map(|component| component.as_os_str().to_string_lossy().into_owned())
        .filter(|part| !has_wildcard(part))
        .collect()
}

fn build_exclude_set<'a>(
    patterns: impl Iterator<Item = &'a str>,
    config_dir: &Path,
    out_dir: Option<&Path>,
) -> Result<GlobSet, ConfigError> {
    let mut absolute: Vec<String> = patterns
        .map(|pattern| {
            normalize_path(&config_dir.join(pattern))
                .to_string_lossy()
                .into_owned()
        })
        .collect();
    if let Some(out_dir) = out_dir {
        absolute.push(out_dir.to_string_lossy().into_owned());
    }

    // Each glob is compiled on its own first so a bad one is reported by name
    let mut builder = GlobSetBuilder::new();
    for pattern in &absolute {
        builder.add(compile_glob(pattern)?);
    }
    builder.build().map_err(|source| ConfigError::InvalidPattern {
        pattern: absolute.join(", "),
        source,
    })
}

/// Compile a tsconfig-style pattern: only `*`, `?` and `**` are special and
/// `*` never crosses a path separator.
fn compile_glob(pattern: &str) -> Result<globset::Glob, ConfigError> {
    GlobBuilder::new(&escape_glob_literals(pattern))
        .literal_separator(true)
        .build()
        .map_err(|source| ConfigError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })
}

fn escape_glob_literals(pattern: &str) -> String {
    let mut escaped = String::with_capacity(pattern.len());
    for ch in pattern.chars() {
        match ch {
            '[' | ']' | '{' | '}' | '\\' => {
                escaped.push('[');
                escaped.push(ch);
                escaped.push(']');
            }
            other => escaped.push(other),
        }
    }
    escaped
}

fn has_wildcard(part: &str) -> bool {
    part.contains(['*', '?'])
}

/// All regular files under `root` in sorted walk order, skipping excluded
/// paths. Dot-prefixed entries are skipped unless listed in `literal_names`,
/// as wildcards never match them. Unreadable entries are dropped.
fn walk_files(root: &Path, exclude: &GlobSet, literal_names: &HashSet<String>) -> Vec<PathBuf> {
    let exclude = exclude.clone();
    let literal_names = literal_names.clone();
    let mut builder = WalkBuilder::new(root);
    builder
        .standard_filters(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .filter_entry(move |entry| {
            if exclude.is_match(entry.path()) {
                return false;
            }
            if entry.depth() == 0 {
                return true;
            }
            let name = entry.file_name().to_string_lossy();
            !name.starts_with('.') || literal_names.contains(&*name)
        });

    let mut files = Vec::new();
    for entry in builder.build() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                log::debug!("skipping unreadable entry: {}", err);
                continue;
            }
        };
        // metadata() follows symlinks, so broken links fall out here
        let is_file = std::fs::metadata(entry.path()).is_ok_and(|m| m.is_file());
        if is_file {
            files.push(entry.path().to_path_buf());
        }
    }
    files
}

fn is_source_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    if name.ends_with(".d.ts") || name.ends_with(".d.mts") || name.ends_with(".d.cts") {
        return false;
    }
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext))
}
