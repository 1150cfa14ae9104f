//! Shared types and helpers used across Coffer.

mod constants;
mod lock;
mod value;

pub use constants::*;
pub use lock::*;
pub use value::*;
