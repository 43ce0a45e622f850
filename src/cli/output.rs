use std::path::Path;

use super::build::BuildReport;
use super::Cli;

/// Format a build report for stdout.
pub fn format_report(report: &BuildReport, cli: &Cli) -> String {
    let mut output = format!(
        "Built {} entry point(s) into {}",
        report.entry_points.len(),
        report.out_dir.display()
    );
    if report.declarations {
        output.push_str(" (with declarations)");
    }
    if cli.duration {
        output.push_str(&format!("\nDone in {}ms", report.duration_ms));
    }
    if cli.outputs {
        output.push_str("\nOutputs:");
        for path in &report.outputs {
            output.push_str(&format!("\n  {}", display_relative(path, &report.out_dir)));
        }
    }
    output
}

/// Show a path relative to the output directory when it lives beneath it.
fn display_relative(path: &Path, out_dir: &Path) -> String {
    let parent = out_dir.parent().unwrap_or(out_dir);
    path.strip_prefix(parent)
        .unwrap_or(path)
        .display()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::path::PathBuf;

    fn report() -> BuildReport {
        BuildReport {
            entry_points: vec![PathBuf::from("/p/src/index.ts")],
            out_dir: PathBuf::from("/p/dist"),
            outputs: vec![
                PathBuf::from("/p/dist/index.js"),
                PathBuf::from("/elsewhere/chunk.js"),
            ],
            warnings: Vec::new(),
            declarations: false,
            duration_ms: 42,
        }
    }

    #[test]
    fn test_plain_report() {
        let cli = Cli::parse_from(["tsbuild"]);
        assert_eq!(
            format_report(&report(), &cli),
            "Built 1 entry point(s) into /p/dist"
        );
    }

    #[test]
    fn test_report_with_duration_and_outputs() {
        let cli = Cli::parse_from(["tsbuild", "--duration", "--outputs"]);
        let mut report = report();
        report.declarations = true;
        assert_eq!(
            format_report(&report, &cli),
            "Built 1 entry point(s) into /p/dist (with declarations)\n\
             Done in 42ms\n\
             Outputs:\n  dist/index.js\n  /elsewhere/chunk.js"
        );
    }
}
