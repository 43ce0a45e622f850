use std::path::{Path, PathBuf};
use std::process::Command;

use super::{diagnostic_lines, DeclarationEmitter, ServiceError};

/// Runs the TypeScript compiler in declaration-only mode.
#[derive(Debug, Clone)]
pub struct TscCommand {
    program: PathBuf,
}

impl TscCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        TscCommand {
            program: program.into(),
        }
    }
}

impl DeclarationEmitter for TscCommand {
    fn emit(&self, config_path: &Path, out_dir: &Path) -> Result<(), ServiceError> {
        let tool = self.program.display().to_string();
        log::debug!("emitting declarations for {} into {}", config_path.display(), out_dir.display());

        let output = Command::new(&self.program)
            .arg("--project")
            .arg(config_path)
            .args(["--declaration", "--emitDeclarationOnly", "--noEmit", "false"])
            .arg("--outDir")
            .arg(out_dir)
            .output()
            .map_err(|source| ServiceError::Spawn {
                tool: tool.clone(),
                source,
            })?;

        // tsc prints diagnostics on stdout; any of them fails the build
        let mut diagnostics = diagnostic_lines(&output.stdout);
        diagnostics.extend(diagnostic_lines(&output.stderr));

        if !output.status.success() && diagnostics.is_empty() {
            diagnostics.push(format!("{tool} exited with {}", output.status));
        }
        if !diagnostics.is_empty() {
            return Err(ServiceError::Declarations { diagnostics });
        }
        Ok(())
    }
}
