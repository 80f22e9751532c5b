//! Reference toolchain for tally
//!
//! Test modules are s-expression files (`*.tl`):
//!
//! ```text
//! ; unit/math_test.tl
//! (defp double (x) (* x 2))
//! (defn test_double () (assert-equal (double 2) 4))
//! (defn test_strict () (assert-equal! (double 2) 5))
//! ```
//!
//! `defn` exports a function, `defp` keeps it private. Compilation reads and
//! resolves the whole file; invocation runs the interpreter.

pub mod compile;
pub mod error;
pub mod eval;
pub mod reader;
pub mod sexp;

use std::fs;
use std::path::Path;

use tally_core::{CompileError, Export, Raised, Toolchain, Value};
use tracing::debug;

pub use compile::{compile_module, ScriptModule};
pub use error::{Result, ScriptError};
pub use eval::Interpreter;

/// File extension of test modules
pub const EXTENSION: &str = "tl";

/// Parse and resolve `source` as a module named `name`
pub fn compile_source(name: &str, source: &str) -> Result<ScriptModule> {
    let forms = reader::read(source)?;
    compile_module(name, &forms)
}

/// [`Toolchain`] backed by the s-expression interpreter
#[derive(Debug, Default, Clone, Copy)]
pub struct ScriptToolchain;

impl ScriptToolchain {
    pub fn new() -> Self {
        Self
    }
}

impl Toolchain for ScriptToolchain {
    type Unit = ScriptModule;

    fn source_extension(&self) -> &str {
        EXTENSION
    }

    fn compile(&self, path: &Path) -> std::result::Result<ScriptModule, CompileError> {
        let source = fs::read_to_string(path)
            .map_err(|e| ScriptError::io(format!("{}: {}", path.display(), e)))?;
        let name = path.file_stem().and_then(|s| s.to_str()).unwrap_or("unknown");
        let module = compile_source(name, &source)?;
        debug!("Compiled {} ({} functions)", path.display(), module.functions().len());
        Ok(module)
    }

    fn exports(&self, unit: &ScriptModule) -> Vec<Export> {
        unit.functions()
            .iter()
            .filter(|f| f.exported)
            .map(|f| Export::new(f.name.as_str(), f.params.len()))
            .collect()
    }

    fn invoke(&self, unit: &ScriptModule, function: &str, args: &[Value]) -> std::result::Result<Value, Raised> {
        let exported = unit.function(function, args.len()).is_some_and(|f| f.exported);
        if !exported {
            return Err(Raised(Value::tuple([
                Value::atom("undef"),
                Value::atom(function),
                Value::Integer(args.len() as i64),
            ])));
        }
        Interpreter::new(unit).call(function, args.to_vec())
    }
}
