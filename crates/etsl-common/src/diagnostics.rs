//! Diagnostic types, message templates and the diagnostic bag.
//!
//! Source-level problems found by the pipeline are data, not control flow:
//! passes push a `Diagnostic` into the unit's `DiagnosticBag` and keep going,
//! so one compilation can report many independent errors. The driver reports
//! everything at the end and derives the exit status from the worst category.

use crate::span::Span;
use serde::Serialize;

// =============================================================================
// Diagnostic Types
// =============================================================================

/// Diagnostic category.
///
/// Ordered by severity: `Message < Suggestion < Warning < Error`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum DiagnosticCategory {
    Message = 0,
    Suggestion = 1,
    Warning = 2,
    Error = 3,
}

impl DiagnosticCategory {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::Suggestion => "suggestion",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// Related information for a diagnostic (e.g., "declared here" locations).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DiagnosticRelatedInformation {
    pub file: String,
    pub start: u32,
    pub length: u32,
    pub message_text: String,
    pub category: DiagnosticCategory,
    pub code: u32,
}

/// A diagnostic message with optional related information.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub file: String,
    pub start: u32,
    pub length: u32,
    pub message_text: String,
    pub category: DiagnosticCategory,
    pub code: u32,
    /// Related information spans (e.g., where a constant was declared)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub related_information: Vec<DiagnosticRelatedInformation>,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    #[must_use]
    pub const fn error(file: String, start: u32, length: u32, message: String, code: u32) -> Self {
        Self {
            file,
            start,
            length,
            message_text: message,
            category: DiagnosticCategory::Error,
            code,
            related_information: Vec::new(),
        }
    }

    /// Create a diagnostic from a code, looking up its template and category.
    ///
    /// Unknown codes fall back to an error with the raw arguments joined.
    #[must_use]
    pub fn from_code(file: &str, span: Span, code: u32, args: &[&str]) -> Self {
        let (category, message_text) = match get_diagnostic_message(code) {
            Some(msg) => (msg.category, format_message(msg.message, args)),
            None => (DiagnosticCategory::Error, args.join(" ")),
        };
        Self {
            file: file.to_string(),
            start: span.start,
            length: span.len(),
            message_text,
            category,
            code,
            related_information: Vec::new(),
        }
    }

    /// Add related information to this diagnostic.
    #[must_use]
    pub fn with_related(mut self, file: String, span: Span, message: String) -> Self {
        self.related_information.push(DiagnosticRelatedInformation {
            file,
            start: span.start,
            length: span.len(),
            message_text: message,
            category: DiagnosticCategory::Message,
            code: 0,
        });
        self
    }

    #[must_use]
    pub const fn span(&self) -> Span {
        Span::new(self.start, self.start + self.length)
    }
}

/// Format a diagnostic message by replacing {0}, {1}, etc. with arguments.
#[must_use]
pub fn format_message(template: &str, args: &[&str]) -> String {
    let mut result = template.to_string();
    for (i, arg) in args.iter().enumerate() {
        result = result.replace(&format!("{{{i}}}"), arg);
    }
    result
}

/// A diagnostic message definition with code, category, and message template.
#[derive(Clone, Copy, Debug)]
pub struct DiagnosticMessage {
    pub code: u32,
    pub category: DiagnosticCategory,
    pub message: &'static str,
}

pub mod diagnostic_codes {
    // Binding
    pub const UNRESOLVED_IDENTIFIER: u32 = 1001;
    pub const DUPLICATE_IDENTIFIER: u32 = 1002;
    pub const MISSING_IMPORT_UNIT: u32 = 1003;
    pub const IMPORTED_NAME_NOT_EXPORTED: u32 = 1004;
    pub const IMPORT_CYCLE: u32 = 1005;

    // Constant folding
    pub const DIVISION_BY_ZERO: u32 = 2001;
    pub const CONSTANT_CYCLE: u32 = 2002;
    pub const UNSUPPORTED_CONSTANT_OPERATOR: u32 = 2003;
    pub const NOT_A_CONSTANT: u32 = 2004;

    // Enum lowering
    pub const ENUM_MIXED_INITIALIZERS: u32 = 3001;
    pub const ENUM_INVALID_INITIALIZER: u32 = 3002;
    pub const ENUM_STRING_MEMBER_WITHOUT_INITIALIZER: u32 = 3003;

    // Type checking
    pub const TYPE_NOT_ASSIGNABLE: u32 = 4001;
    pub const OPERATOR_NOT_APPLICABLE: u32 = 4002;
    pub const PROPERTY_NOT_FOUND: u32 = 4003;
    pub const NOT_CALLABLE: u32 = 4004;
    pub const ARGUMENT_COUNT_MISMATCH: u32 = 4005;
    pub const CANNOT_FIND_TYPE: u32 = 4006;
    pub const THIS_OUTSIDE_CLASS: u32 = 4007;
    pub const NOT_CONSTRUCTIBLE: u32 = 4008;
    pub const UNARY_OPERATOR_NOT_APPLICABLE: u32 = 4009;
    pub const CONDITION_NOT_BOOLEAN: u32 = 4010;
    pub const ASSIGNMENT_TO_READONLY: u32 = 4011;

    // Pipeline
    pub const PRECONDITION_FAILED: u32 = 5001;
    pub const POSTCONDITION_FAILED: u32 = 5002;
    pub const PLUGIN_ERROR: u32 = 5003;
    pub const CAPTURED_VARIABLE_REASSIGNED: u32 = 5004;
}

use diagnostic_codes as codes;

pub static DIAGNOSTIC_MESSAGES: &[DiagnosticMessage] = &[
    DiagnosticMessage {
        code: codes::UNRESOLVED_IDENTIFIER,
        category: DiagnosticCategory::Error,
        message: "Cannot find name '{0}'.",
    },
    DiagnosticMessage {
        code: codes::DUPLICATE_IDENTIFIER,
        category: DiagnosticCategory::Error,
        message: "Duplicate identifier '{0}'.",
    },
    DiagnosticMessage {
        code: codes::MISSING_IMPORT_UNIT,
        category: DiagnosticCategory::Error,
        message: "Cannot find module '{0}'.",
    },
    DiagnosticMessage {
        code: codes::IMPORTED_NAME_NOT_EXPORTED,
        category: DiagnosticCategory::Error,
        message: "Module '{0}' has no exported member '{1}'.",
    },
    DiagnosticMessage {
        code: codes::IMPORT_CYCLE,
        category: DiagnosticCategory::Error,
        message: "Module '{0}' is part of an import cycle.",
    },
    DiagnosticMessage {
        code: codes::DIVISION_BY_ZERO,
        category: DiagnosticCategory::Error,
        message: "Division by zero.",
    },
    DiagnosticMessage {
        code: codes::CONSTANT_CYCLE,
        category: DiagnosticCategory::Error,
        message: "Constant '{0}' is circularly defined.",
    },
    DiagnosticMessage {
        code: codes::UNSUPPORTED_CONSTANT_OPERATOR,
        category: DiagnosticCategory::Error,
        message: "Operator '{0}' cannot be applied to constant operands '{1}' and '{2}'.",
    },
    DiagnosticMessage {
        code: codes::NOT_A_CONSTANT,
        category: DiagnosticCategory::Error,
        message: "Value of '{0}' must be a constant expression.",
    },
    DiagnosticMessage {
        code: codes::ENUM_MIXED_INITIALIZERS,
        category: DiagnosticCategory::Error,
        message: "Enum '{0}' mixes numeric and string member initializers.",
    },
    DiagnosticMessage {
        code: codes::ENUM_INVALID_INITIALIZER,
        category: DiagnosticCategory::Error,
        message: "Enum member '{0}' must be initialized with an integer or string literal.",
    },
    DiagnosticMessage {
        code: codes::ENUM_STRING_MEMBER_WITHOUT_INITIALIZER,
        category: DiagnosticCategory::Error,
        message: "Member '{0}' of string enum '{1}' must have an initializer.",
    },
    DiagnosticMessage {
        code: codes::TYPE_NOT_ASSIGNABLE,
        category: DiagnosticCategory::Error,
        message: "Type '{0}' is not assignable to type '{1}'.",
    },
    DiagnosticMessage {
        code: codes::OPERATOR_NOT_APPLICABLE,
        category: DiagnosticCategory::Error,
        message: "Operator '{0}' cannot be applied to types '{1}' and '{2}'.",
    },
    DiagnosticMessage {
        code: codes::PROPERTY_NOT_FOUND,
        category: DiagnosticCategory::Error,
        message: "Property '{0}' does not exist on type '{1}'.",
    },
    DiagnosticMessage {
        code: codes::NOT_CALLABLE,
        category: DiagnosticCategory::Error,
        message: "Type '{0}' has no call signatures.",
    },
    DiagnosticMessage {
        code: codes::ARGUMENT_COUNT_MISMATCH,
        category: DiagnosticCategory::Error,
        message: "Expected {0} arguments, but got {1}.",
    },
    DiagnosticMessage {
        code: codes::CANNOT_FIND_TYPE,
        category: DiagnosticCategory::Error,
        message: "Cannot find type '{0}'.",
    },
    DiagnosticMessage {
        code: codes::THIS_OUTSIDE_CLASS,
        category: DiagnosticCategory::Error,
        message: "'{0}' can only be used inside a class.",
    },
    DiagnosticMessage {
        code: codes::NOT_CONSTRUCTIBLE,
        category: DiagnosticCategory::Error,
        message: "Type '{0}' cannot be instantiated.",
    },
    DiagnosticMessage {
        code: codes::UNARY_OPERATOR_NOT_APPLICABLE,
        category: DiagnosticCategory::Error,
        message: "Operator '{0}' cannot be applied to type '{1}'.",
    },
    DiagnosticMessage {
        code: codes::CONDITION_NOT_BOOLEAN,
        category: DiagnosticCategory::Warning,
        message: "Condition of type '{0}' is tested for truthiness.",
    },
    DiagnosticMessage {
        code: codes::ASSIGNMENT_TO_READONLY,
        category: DiagnosticCategory::Error,
        message: "Cannot assign to '{0}' because it is a constant or a read-only property.",
    },
    DiagnosticMessage {
        code: codes::PRECONDITION_FAILED,
        category: DiagnosticCategory::Error,
        message: "Precondition of phase '{0}' does not hold for unit '{1}'.",
    },
    DiagnosticMessage {
        code: codes::POSTCONDITION_FAILED,
        category: DiagnosticCategory::Error,
        message: "Postcondition of phase '{0}' does not hold for unit '{1}'.",
    },
    DiagnosticMessage {
        code: codes::PLUGIN_ERROR,
        category: DiagnosticCategory::Error,
        message: "Plugin '{0}' failed: {1}",
    },
    DiagnosticMessage {
        code: codes::CAPTURED_VARIABLE_REASSIGNED,
        category: DiagnosticCategory::Warning,
        message: "Variable '{0}' is captured by value but reassigned inside the closure.",
    },
];

/// Look up a diagnostic message definition by code.
#[must_use]
pub fn get_diagnostic_message(code: u32) -> Option<&'static DiagnosticMessage> {
    DIAGNOSTIC_MESSAGES.iter().find(|m| m.code == code)
}

/// Get the message template for a diagnostic code.
#[must_use]
pub fn get_message_template(code: u32) -> Option<&'static str> {
    get_diagnostic_message(code).map(|m| m.message)
}

// =============================================================================
// Diagnostic Bag
// =============================================================================

/// Collector for all diagnostics of one compilation run.
#[derive(Clone, Debug, Default)]
pub struct DiagnosticBag {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticBag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Report a diagnostic by code at `span` in `file`.
    pub fn report(&mut self, file: &str, span: Span, code: u32, args: &[&str]) {
        self.push(Diagnostic::from_code(file, span, code, args));
    }

    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.diagnostics.extend(diagnostics);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    #[must_use]
    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.category == DiagnosticCategory::Error)
            .count()
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    /// Number of diagnostics carrying `code`.
    #[must_use]
    pub fn count_code(&self, code: u32) -> usize {
        self.diagnostics.iter().filter(|d| d.code == code).count()
    }

    /// The most severe category seen, if any diagnostic was reported.
    #[must_use]
    pub fn worst_category(&self) -> Option<DiagnosticCategory> {
        self.diagnostics.iter().map(|d| d.category).max()
    }

    /// Diagnostics sorted by file and position, for stable reporting.
    #[must_use]
    pub fn sorted(&self) -> Vec<Diagnostic> {
        let mut out = self.diagnostics.clone();
        out.sort_by(|a, b| {
            a.file
                .cmp(&b.file)
                .then(a.start.cmp(&b.start))
                .then(a.code.cmp(&b.code))
        });
        out
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_message_placeholders() {
        let msg = format_message("Operator '{0}' cannot be applied to types '{1}' and '{2}'.", &[
            "+", "boolean", "int",
        ]);
        assert_eq!(
            msg,
            "Operator '+' cannot be applied to types 'boolean' and 'int'."
        );
    }

    #[test]
    fn test_from_code_uses_template_and_span() {
        let diag = Diagnostic::from_code(
            "a.ets",
            Span::new(10, 15),
            diagnostic_codes::UNRESOLVED_IDENTIFIER,
            &["foo"],
        );
        assert_eq!(diag.message_text, "Cannot find name 'foo'.");
        assert_eq!(diag.start, 10);
        assert_eq!(diag.length, 5);
        assert_eq!(diag.category, DiagnosticCategory::Error);
    }

    #[test]
    fn test_worst_category() {
        let mut bag = DiagnosticBag::new();
        assert_eq!(bag.worst_category(), None);
        bag.report(
            "a.ets",
            Span::at(0),
            diagnostic_codes::CONDITION_NOT_BOOLEAN,
            &["int"],
        );
        assert_eq!(bag.worst_category(), Some(DiagnosticCategory::Warning));
        bag.report("a.ets", Span::at(0), diagnostic_codes::DIVISION_BY_ZERO, &[]);
        assert_eq!(bag.worst_category(), Some(DiagnosticCategory::Error));
        assert_eq!(bag.error_count(), 1);
        assert_eq!(bag.count_code(diagnostic_codes::DIVISION_BY_ZERO), 1);
    }
}
