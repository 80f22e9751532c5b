//! Core types for the tally test harness
//!
//! The term model every toolchain speaks, the assertion library test code
//! calls, and the collaborator traits the harness drives.

pub mod assertions;
pub mod toolchain;
pub mod value;

pub use assertions::{AssertionFailure, AssertionKind, AssertionResult};
pub use toolchain::{CompileError, Export, Raised, Toolchain};
pub use value::Value;
