//! Collaborator interfaces
//!
//! The harness never compiles or runs code itself. It reaches the compiler and
//! the runtime through [`Toolchain`], so any language runtime can be plugged in.

use std::path::Path;

use thiserror::Error;

use crate::value::Value;

/// A module failed to compile or load
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct CompileError {
    pub message: String,
}

impl CompileError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Payload of an exception raised while invoking a function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raised(pub Value);

impl From<crate::assertions::AssertionFailure> for Raised {
    fn from(failure: crate::assertions::AssertionFailure) -> Self {
        Raised(failure.into_payload())
    }
}

/// An exported function of a compiled unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Export {
    pub name: String,
    pub arity: usize,
}

impl Export {
    pub fn new(name: impl Into<String>, arity: usize) -> Self {
        Self {
            name: name.into(),
            arity,
        }
    }
}

/// Compiler and runtime of the language under test
///
/// Units are shared with worker threads, hence the `Send + Sync` bounds.
pub trait Toolchain: Send + Sync + 'static {
    /// A compiled, loadable module
    type Unit: Send + Sync + 'static;

    /// Source file extension, without the dot
    fn source_extension(&self) -> &str;

    fn compile(&self, path: &Path) -> Result<Self::Unit, CompileError>;

    /// Exported functions, in declaration order
    fn exports(&self, unit: &Self::Unit) -> Vec<Export>;

    /// Call `function` with `args`. `Err` carries a raised exception.
    fn invoke(&self, unit: &Self::Unit, function: &str, args: &[Value]) -> Result<Value, Raised>;
}
