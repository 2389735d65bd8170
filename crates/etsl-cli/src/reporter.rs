use colored::Colorize;
use etsl_common::diagnostics::DiagnosticRelatedInformation;
use etsl_common::limits::MAX_REPORTED_DIAGNOSTICS;
use etsl_common::{Diagnostic, DiagnosticCategory};

/// Renders diagnostics for a terminal.
///
/// Units arrive as trees, not source text, so locations are byte offsets:
/// `main.ets:42 - error ETSL2001: Division by zero.`
pub struct Reporter {
    color: bool,
}

impl Reporter {
    #[must_use]
    pub fn new(color: bool) -> Self {
        Reporter { color }
    }

    /// One block per diagnostic, cut off after `MAX_REPORTED_DIAGNOSTICS`.
    #[must_use]
    pub fn render(&self, diagnostics: &[Diagnostic]) -> String {
        let mut out = String::new();
        for diagnostic in diagnostics.iter().take(MAX_REPORTED_DIAGNOSTICS) {
            out.push_str(&self.format_diagnostic(diagnostic));
            out.push('\n');
        }
        let hidden = diagnostics.len().saturating_sub(MAX_REPORTED_DIAGNOSTICS);
        if hidden > 0 {
            out.push_str(&format!("... and {hidden} more\n"));
        }
        out
    }

    #[must_use]
    pub fn format_diagnostic(&self, diagnostic: &Diagnostic) -> String {
        let mut output = self.format_location(&diagnostic.file, diagnostic.start);
        output.push_str(" - ");
        output.push_str(&self.format_category(diagnostic.category));
        let code = self.format_code(diagnostic.code);
        if !code.is_empty() {
            output.push(' ');
            output.push_str(&code);
        }
        output.push_str(": ");
        output.push_str(&diagnostic.message_text);

        for related in &diagnostic.related_information {
            output.push('\n');
            output.push_str(&self.format_related(related));
        }
        output
    }

    /// `Found 2 errors and 1 warning.`; empty when there is nothing to report.
    #[must_use]
    pub fn format_summary(&self, diagnostics: &[Diagnostic]) -> String {
        let count = |category| diagnostics.iter().filter(|d| d.category == category).count();
        let errors = count(DiagnosticCategory::Error);
        let warnings = count(DiagnosticCategory::Warning);
        let plural = |n: usize, word: &str| {
            if n == 1 {
                format!("{n} {word}")
            } else {
                format!("{n} {word}s")
            }
        };
        let text = match (errors, warnings) {
            (0, 0) => return String::new(),
            (e, 0) => format!("Found {}.", plural(e, "error")),
            (0, w) => format!("Found {}.", plural(w, "warning")),
            (e, w) => format!("Found {} and {}.", plural(e, "error"), plural(w, "warning")),
        };
        if self.color {
            text.bold().to_string()
        } else {
            text
        }
    }

    fn format_related(&self, related: &DiagnosticRelatedInformation) -> String {
        let prefix = if self.color {
            "  Related".dimmed().to_string()
        } else {
            "  Related".to_string()
        };
        format!(
            "{}: {} - {}",
            prefix,
            self.format_location(&related.file, related.start),
            related.message_text
        )
    }

    fn format_location(&self, file: &str, offset: u32) -> String {
        let location = if file.is_empty() {
            "<unknown>".to_string()
        } else {
            format!("{file}:{offset}")
        };
        if self.color {
            location.cyan().to_string()
        } else {
            location
        }
    }

    fn format_category(&self, category: DiagnosticCategory) -> String {
        let label = category.label();
        if !self.color {
            return label.to_string();
        }
        match category {
            DiagnosticCategory::Error => label.red().bold().to_string(),
            DiagnosticCategory::Warning => label.yellow().bold().to_string(),
            DiagnosticCategory::Suggestion => label.blue().bold().to_string(),
            DiagnosticCategory::Message => label.cyan().bold().to_string(),
        }
    }

    fn format_code(&self, code: u32) -> String {
        if code == 0 {
            return String::new();
        }
        let label = format!("ETSL{code}");
        if self.color {
            label.bright_blue().to_string()
        } else {
            label
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Reporter;
    use etsl_common::{Diagnostic, Span, diagnostic_codes};

    #[test]
    fn test_plain_diagnostic_line() {
        let diagnostic =
            Diagnostic::from_code("main.ets", Span::new(42, 47), diagnostic_codes::DIVISION_BY_ZERO, &[]);
        let line = Reporter::new(false).format_diagnostic(&diagnostic);
        assert!(line.starts_with("main.ets:42 - error ETSL2001: "), "{line}");
    }

    #[test]
    fn test_render_truncates_long_output() {
        let diagnostic =
            Diagnostic::from_code("main.ets", Span::new(0, 1), diagnostic_codes::DIVISION_BY_ZERO, &[]);
        let many = vec![diagnostic; super::MAX_REPORTED_DIAGNOSTICS + 3];
        let text = Reporter::new(false).render(&many);
        assert_eq!(text.lines().count(), super::MAX_REPORTED_DIAGNOSTICS + 1);
        assert!(text.ends_with("... and 3 more\n"), "{text}");
    }

    #[test]
    fn test_summary_counts_errors_and_warnings() {
        let reporter = Reporter::new(false);
        assert_eq!(reporter.format_summary(&[]), "");
        let error =
            Diagnostic::from_code("a.ets", Span::new(0, 1), diagnostic_codes::CONSTANT_CYCLE, &["X"]);
        let warning = Diagnostic::from_code(
            "a.ets",
            Span::new(0, 1),
            diagnostic_codes::CAPTURED_VARIABLE_REASSIGNED,
            &["n"],
        );
        assert_eq!(
            reporter.format_summary(&[error.clone(), warning.clone(), warning]),
            "Found 1 error and 2 warnings."
        );
        assert_eq!(reporter.format_summary(&[error]), "Found 1 error.");
    }
}
