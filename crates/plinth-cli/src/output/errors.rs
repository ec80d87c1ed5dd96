//! Error message formatting with actionable suggestions.

use std::error::Error;

use plinth_core::error::PlinthError;

use super::colors::{ColorSupport, Style};

/// Error formatter with suggestions
pub struct ErrorFormatter {
    colors: ColorSupport,
}

impl ErrorFormatter {
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

    /// Format an error with its cause chain and a suggestion
    pub fn format_error(&self, error: &PlinthError) -> String {
        let mut output = format!("{}: {}\n", self.colors.paint(Style::Red, "error"), error);

        let mut source = error.source();
        while let Some(cause) = source {
            output.push_str(&format!("  {}: {}\n", self.colors.paint(Style::Dim, "caused by"), cause));
            source = cause.source();
        }

        if let Some(suggestion) = error.suggestion() {
            output.push_str(&format!("{}: {}\n", self.colors.paint(Style::Dim, "help"), suggestion));
        }

        if error.is_recoverable() {
            output.push_str(&format!(
                "{}: the operation may succeed if retried\n",
                self.colors.paint(Style::Dim, "note")
            ));
        }

        output
    }
}

impl Default for ErrorFormatter {
    fn default() -> Self {
        Self::new()
    }
}
