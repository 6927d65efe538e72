//! Shared JSON value utilities for the jsonworks crates.
//!
//! Everything here operates directly on [`serde_json::Value`]; no wrapper
//! value type is introduced. The schema evaluator builds on four services:
//! value-kind classification (with the derived `integer` kind), structural
//! equivalence, an equivalence-compatible structural hash, and exact numeric
//! comparison through a decimal view.

pub mod equal;
pub mod hash;
pub mod kind;
pub mod num;
pub mod pointer;

pub use equal::equivalent;
pub use hash::hash_equivalence;
pub use kind::{kind, ValueKind};
pub use num::{as_decimal, compare_numbers, decimal_of, is_integer, is_multiple_of, numbers_equal};
