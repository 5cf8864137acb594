//! Source precedence rules.

pub mod merge_policy;
