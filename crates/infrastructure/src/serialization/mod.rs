//! Deterministic JSON serialization for the stored user registry.
//!
//! The registry file is rewritten on every transition; stable output keeps
//! it diffable and makes unchanged state produce identical bytes.

mod json;

pub use json::*;
