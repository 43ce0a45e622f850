use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};

use crate::config::{self, ResolveOptions};
use crate::resolver::alias::AliasResolutionPlugin;
use crate::service::{BundleRequest, Bundler, DeclarationEmitter};

use super::Cli;

/// Summary of a finished build.
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub entry_points: Vec<PathBuf>,
    pub out_dir: PathBuf,
    /// Files the bundler wrote; empty unless `--outputs` was given.
    pub outputs: Vec<PathBuf>,
    pub warnings: Vec<String>,
    pub declarations: bool,
    pub duration_ms: u128,
}

/// Run one build: resolve the configuration, bundle, then emit declarations.
///
/// `cwd` anchors a relative `--project` path; nothing else reads ambient
/// process state.
pub fn run_build(
    cli: &Cli,
    cwd: &Path,
    bundler: &dyn Bundler,
    emitter: &dyn DeclarationEmitter,
) -> Result<BuildReport> {
    let start = Instant::now();

    let resolve_options = ResolveOptions {
        bundle: cli.bundle,
        format: cli.format.map(Into::into),
        collect_metadata: cli.outputs,
    };
    let project = config::resolve(&cli.project, cwd, &resolve_options)
        .context("failed to load project configuration")?;

    log::info!(
        "bundling {} entry point(s) into {}",
        project.entry_points.len(),
        project.options.out_dir.display()
    );

    let plugin = AliasResolutionPlugin::new(project.aliases);
    let outcome = bundler
        .bundle(&BundleRequest {
            entry_points: project.entry_points.paths(),
            options: &project.options,
            working_dir: &project.config_dir,
            resolver: &plugin,
        })
        .context("build failed")?;

    let declarations = !cli.no_declaration;
    if declarations {
        emitter
            .emit(&project.config_path, &project.options.out_dir)
            .context("failed to emit declaration files")?;
    }

    Ok(BuildReport {
        entry_points: project.entry_points.into_vec(),
        out_dir: project.options.out_dir,
        outputs: outcome.outputs,
        warnings: outcome.warnings,
        declarations,
        duration_ms: start.elapsed().as_millis(),
    })
}
