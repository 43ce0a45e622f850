//! `esbuild` invocation.
//!
//! esbuild's command line cannot host an in-process resolve plugin, so the
//! adapter does the traversal itself: it follows the import graph from the
//! entry points, asks the installed [`ResolveHook`] about every distinct
//! bare specifier, and forwards each answer as an `--alias` flag.

use std::collections::{HashSet, VecDeque};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use super::{diagnostic_lines, BundleOutcome, BundleRequest, Bundler, ServiceError};
use crate::config::{BuildOptions, JsxMode};
use crate::resolver::alias::{has_recognized_extension, probe, PROBE_EXTENSIONS};
use crate::resolver::{normalize_path, FileSystem, OsFileSystem, Resolution, ResolveHook};

/// `from "x"`, `import "x"`, `import("x")`, `require("x")`.
static IMPORT_SPECIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:\bfrom|\bimport|\brequire)\s*\(?\s*["']([^"'\r\n]+)["']"#)
        .expect("import specifier pattern is valid")
});

/// Files whose imports are followed.
const SCRIPT_EXTENSIONS: &[&str] = &["ts", "tsx", "mts", "cts", "js", "jsx", "mjs", "cjs"];

/// Runs the `esbuild` executable.
#[derive(Debug, Clone)]
pub struct EsbuildCommand {
    program: PathBuf,
}

#[derive(Debug, Deserialize)]
struct Metafile {
    #[serde(default)]
    outputs: serde_json::Map<String, serde_json::Value>,
}

impl EsbuildCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        EsbuildCommand {
            program: program.into(),
        }
    }

    fn tool_name(&self) -> String {
        self.program.display().to_string()
    }
}

impl Bundler for EsbuildCommand {
    fn bundle(&self, request: &BundleRequest<'_>) -> Result<BundleOutcome, ServiceError> {
        // Without --bundle esbuild never resolves imports, so there is nothing to alias
        let aliases = if request.options.bundle {
            collect_aliases(request.entry_points, request.resolver)
        } else {
            Vec::new()
        };

        let metafile = if request.options.metafile {
            let file = tempfile::Builder::new()
                .prefix("tsbuild-meta-")
                .suffix(".json")
                .tempfile()
                .map_err(|source| ServiceError::Spawn {
                    tool: self.tool_name(),
                    source,
                })?;
            Some(file)
        } else {
            None
        };

        let args = build_arguments(
            request.entry_points,
            request.options,
            &aliases,
            metafile.as_ref().map(|f| f.path()),
        );
        log::debug!("running {} with {} argument(s)", self.tool_name(), args.len());

        let output = Command::new(&self.program)
            .args(&args)
            .current_dir(request.working_dir)
            .output()
            .map_err(|source| ServiceError::Spawn {
                tool: self.tool_name(),
                source,
            })?;

        let messages = diagnostic_lines(&output.stderr);
        if !output.status.success() {
            let mut diagnostics = messages;
            if diagnostics.is_empty() {
                diagnostics.push(format!("{} exited with {}", self.tool_name(), output.status));
            }
            return Err(ServiceError::Bundle { diagnostics });
        }

        let outputs = match &metafile {
            Some(file) => read_manifest(file.path(), request.working_dir)?,
            None => Vec::new(),
        };

        Ok(BundleOutcome {
            outputs,
            warnings: messages,
        })
    }
}

/// Command-line arguments for one esbuild run.
fn build_arguments(
    entry_points: &[PathBuf],
    options: &BuildOptions,
    aliases: &[(String, PathBuf)],
    metafile: Option<&Path>,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = entry_points.iter().map(|p| p.clone().into()).collect();

    args.push(flag("--outdir=", &options.out_dir));
    args.push(format!("--format={}", options.format.as_str()).into());
    if let Some(target) = &options.target {
        args.push(format!("--target={target}").into());
    }
    if options.sourcemap {
        args.push("--sourcemap".into());
    }
    if options.bundle {
        args.push("--bundle".into());
    }
    match options.jsx {
        JsxMode::Automatic => args.push("--jsx=automatic".into()),
        JsxMode::Preserve => args.push("--jsx=preserve".into()),
        JsxMode::Transform => {}
    }
    if let Some(factory) = &options.jsx_factory {
        args.push(format!("--jsx-factory={factory}").into());
    }
    if let Some(fragment) = &options.jsx_fragment {
        args.push(format!("--jsx-fragment={fragment}").into());
    }
    if let Some(metafile) = metafile {
        args.push(flag("--metafile=", metafile));
    }
    for (specifier, path) in aliases {
        args.push(flag(&format!("--alias:{specifier}="), path));
    }
    args.push("--log-level=warning".into());

    args
}

fn flag(name: &str, path: &Path) -> OsString {
    let mut arg = OsString::from(name);
    arg.push(path.as_os_str());
    arg
}

/// Walk the import graph from the entry points and collect every specifier
/// the hook resolves. Each distinct bare specifier is offered to the hook once.
///
/// esbuild applies `--alias:<key>` to `<key>/...` subpaths too, so a resolved
/// key that prefixes a specifier the hook declined is not forwarded.
fn collect_aliases(entry_points: &[PathBuf], hook: &dyn ResolveHook) -> Vec<(String, PathBuf)> {
    let fs = OsFileSystem;
    let mut aliases = Vec::new();
    let mut declined: Vec<String> = Vec::new();
    let mut asked: HashSet<String> = HashSet::new();
    let mut visited: HashSet<PathBuf> = HashSet::new();
    let mut queue: VecDeque<PathBuf> = entry_points.iter().cloned().collect();

    while let Some(file) = queue.pop_front() {
        if !visited.insert(file.clone()) || !is_script(&file) {
            continue;
        }
        let source = match std::fs::read_to_string(&file) {
            Ok(source) => source,
            Err(err) => {
                log::debug!("not scanning {}: {}", file.display(), err);
                continue;
            }
        };

        for captures in IMPORT_SPECIFIER.captures_iter(&source) {
            let specifier = &captures[1];

            if specifier.starts_with('.') {
                let base = file.parent().unwrap_or(Path::new("/")).join(specifier);
                if let Some(next) = resolve_relative(&normalize_path(&base), &fs) {
                    queue.push_back(next);
                }
                continue;
            }

            if !asked.insert(specifier.to_string()) {
                continue;
            }
            match hook.resolve(specifier, &file) {
                Resolution::Resolved(path) => {
                    queue.push_back(path.clone());
                    aliases.push((specifier.to_string(), path));
                }
                Resolution::NoOpinion => declined.push(specifier.to_string()),
            }
        }
    }

    aliases.retain(|(key, _)| {
        let shadows = declined.iter().any(|other| is_subpath_of(other, key));
        if shadows {
            log::debug!("not forwarding alias {key}: it would also capture unresolved subpaths");
        }
        !shadows
    });
    aliases
}

/// Whether esbuild's alias for `key` would also apply to `specifier`.
fn is_subpath_of(specifier: &str, key: &str) -> bool {
    specifier
        .strip_prefix(key)
        .is_some_and(|rest| rest.starts_with('/'))
}

/// Resolve a relative import to a file, accepting the `.js`-for-`.ts`
/// spelling used under Node16/NodeNext module resolution.
fn resolve_relative(base: &Path, fs: &dyn FileSystem) -> Option<PathBuf> {
    if has_recognized_extension(base) && fs.is_file(base) {
        return Some(base.to_path_buf());
    }
    if let Some(sibling) = typescript_siblings(base).into_iter().find(|p| fs.is_file(p)) {
        return Some(sibling);
    }
    probe(base, PROBE_EXTENSIONS, fs)
}

/// TypeScript sources a JavaScript-extension import may stand for.
fn typescript_siblings(path: &Path) -> Vec<PathBuf> {
    let replacements: &[&str] = match path.extension().and_then(|ext| ext.to_str()) {
        Some("js") => &["ts", "tsx"],
        Some("jsx") => &["tsx"],
        Some("mjs") => &["mts"],
        Some("cjs") => &["cts"],
        _ => &[],
    };
    replacements
        .iter()
        .map(|ext| path.with_extension(ext))
        .collect()
}

fn is_script(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SCRIPT_EXTENSIONS.contains(&ext))
}

/// Output files listed in an esbuild metafile, made absolute.
fn read_manifest(path: &Path, working_dir: &Path) -> Result<Vec<PathBuf>, ServiceError> {
    let manifest_error = |reason: String| ServiceError::Manifest {
        path: path.to_path_buf(),
        reason,
    };
    let content = std::fs::read_to_string(path).map_err(|e| manifest_error(e.to_string()))?;
    let metafile: Metafile =
        serde_json::from_str(&content).map_err(|e| manifest_error(e.to_string()))?;

    Ok(metafile
        .outputs
        .keys()
        .map(|output| normalize_path(&working_dir.join(output)))
        .collect())
}
