//! Directive matching
//!
//! Two independent modes: method-table resolution along the class hierarchy
//! (per-callee directives) and the coarse include filter over bodies.

pub mod filter;
pub mod method_table;

pub use filter::Filter;
pub use method_table::MethodDirectives;
