//! Terminal output formatting.
//!
//! Progress and results go to stdout, problems to stderr.

pub mod colors;
pub mod errors;

use plinth_installer::InstallReport;

use colors::{ColorSupport, Style};

/// Output handler for consistent terminal formatting
pub struct OutputHandler {
    colors: ColorSupport,
}

impl OutputHandler {
    pub fn new() -> Self {
        Self {
            colors: ColorSupport::detect(),
        }
    }

    pub fn plain() -> Self {
        Self {
            colors: ColorSupport::disabled(),
        }
    }

    pub fn info(&self, message: &str) {
        println!("{}", message);
    }

    pub fn success(&self, message: &str) {
        println!("{} {}", self.colors.paint(Style::Green, "✓"), message);
    }

    pub fn warn(&self, message: &str) {
        eprintln!("{} {}", self.colors.paint(Style::Yellow, "warning:"), message);
    }

    /// Print a right-aligned action word followed by a message
    pub fn step(&self, action: &str, message: &str) {
        println!("{} {}", self.colors.paint(Style::Cyan, &format!("{:>12}", action)), message);
    }

    /// Print what a run did, warnings first
    pub fn report(&self, report: &InstallReport) {
        for line in self.report_lines(report) {
            println!("{}", line);
        }
        for warning in &report.warnings {
            self.warn(warning);
        }
    }

    pub fn report_lines(&self, report: &InstallReport) -> Vec<String> {
        let mut lines = Vec::new();
        let mut section = |action: &str, items: Vec<String>| {
            for item in items {
                lines.push(format!("{} {}", self.colors.paint(Style::Bold, &format!("{:>12}", action)), item));
            }
        };
        section("Cached", report.cached.iter().map(ToString::to_string).collect());
        section("Downloaded", report.downloaded.iter().map(ToString::to_string).collect());
        section("Removed", report.uninstalled.iter().map(ToString::to_string).collect());
        section("Installed", report.installed.iter().map(ToString::to_string).collect());
        section(
            "Unresolved",
            report
                .resolution
                .unknown_dependencies
                .iter()
                .map(ToString::to_string)
                .collect(),
        );
        lines
    }
}

impl Default for OutputHandler {
    fn default() -> Self {
        Self::new()
    }
}
