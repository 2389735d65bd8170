//! Common types and utilities for the etsl lowering pipeline.
//!
//! This crate provides foundational types used across all etsl crates:
//! - Source spans (`Span`)
//! - Compilation unit identity (`UnitId`, `DeclRef`)
//! - Diagnostics (`Diagnostic`, `DiagnosticBag`, codes and message templates)
//! - Centralized recursion limits

// Span - Source location tracking (byte offsets)
pub mod span;
pub use span::Span;

// Unit identity shared by binder, checker and lowering
pub mod ids;
pub use ids::{DeclRef, UnitId};

// Diagnostics - data-only error reporting
pub mod diagnostics;
pub use diagnostics::{
    Diagnostic, DiagnosticBag, DiagnosticCategory, diagnostic_codes, format_message,
    get_message_template,
};

// Centralized limits and thresholds
pub mod limits;
