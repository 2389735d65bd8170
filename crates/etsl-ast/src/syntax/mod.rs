//! Syntax-level helpers shared by binder, checker and lowering passes.

pub mod transform_utils;
