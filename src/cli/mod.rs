use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::ModuleFormat;

pub mod build;
pub mod output;

#[derive(Parser, Debug)]
#[command(
    name = "tsbuild",
    version,
    about = "Bundle a TypeScript project using the settings in its tsconfig.json"
)]
pub struct Cli {
    /// Path to the project configuration
    #[arg(short, long, default_value = "tsconfig.json")]
    pub project: PathBuf,

    /// Print how long the build took
    #[arg(long)]
    pub duration: bool,

    /// List the files written by the bundler
    #[arg(long)]
    pub outputs: bool,

    /// Bundle everything reachable from one entry point into a single output
    #[arg(long)]
    pub bundle: bool,

    /// Skip emitting .d.ts declaration files
    #[arg(long)]
    pub no_declaration: bool,

    /// Output module format (default: inferred from compilerOptions.module)
    #[arg(long)]
    pub format: Option<FormatArg>,

    /// esbuild executable
    #[arg(long, env = "TSBUILD_ESBUILD", default_value = "esbuild", hide = true)]
    pub esbuild: PathBuf,

    /// tsc executable
    #[arg(long, env = "TSBUILD_TSC", default_value = "tsc", hide = true)]
    pub tsc: PathBuf,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Cjs,
    Esm,
    Iife,
}

impl From<FormatArg> for ModuleFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Cjs => ModuleFormat::Cjs,
            FormatArg::Esm => ModuleFormat::Esm,
            FormatArg::Iife => ModuleFormat::Iife,
        }
    }
}
