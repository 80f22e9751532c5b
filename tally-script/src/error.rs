//! Script error types

use crate::sexp::Pos;
use tally_core::CompileError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ScriptError>;

#[derive(Error, Debug, Clone)]
pub enum ScriptError {
    #[error("Syntax error at {pos}: {message}")]
    Syntax { message: String, pos: Pos },

    #[error("Unexpected end of file: expected {expected}")]
    UnexpectedEof { expected: String },

    #[error("Error at {pos}: {message}")]
    Resolve { message: String, pos: Pos },

    #[error("I/O error: {message}")]
    Io { message: String },
}

impl ScriptError {
    pub fn syntax(message: impl Into<String>, pos: Pos) -> Self {
        Self::Syntax {
            message: message.into(),
            pos,
        }
    }

    pub fn unexpected_eof(expected: impl Into<String>) -> Self {
        Self::UnexpectedEof {
            expected: expected.into(),
        }
    }

    pub fn resolve(message: impl Into<String>, pos: Pos) -> Self {
        Self::Resolve {
            message: message.into(),
            pos,
        }
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Get the position associated with this error, if any
    pub fn pos(&self) -> Option<Pos> {
        match self {
            Self::Syntax { pos, .. } | Self::Resolve { pos, .. } => Some(*pos),
            _ => None,
        }
    }
}

impl From<ScriptError> for CompileError {
    fn from(err: ScriptError) -> Self {
        CompileError::new(err.to_string())
    }
}
