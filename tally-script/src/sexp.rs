//! S-expression syntax tree

use std::fmt;

/// Position in the source text, 1-based
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pos {
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// S-expression abstract syntax tree
#[derive(Debug, Clone, PartialEq)]
pub enum SExp {
    /// Atomic literal
    Atom(Atom, Pos),
    /// Identifier (variable, function or special form name)
    Symbol(String, Pos),
    /// Parenthesized list
    List(Vec<SExp>, Pos),
}

/// Literal values
#[derive(Debug, Clone, PartialEq)]
pub enum Atom {
    String(String),
    Integer(i64),
    Float(f64),
    /// `:name`, evaluates to the atom `name`
    Keyword(String),
}

impl SExp {
    pub fn pos(&self) -> Pos {
        match self {
            SExp::Atom(_, pos) | SExp::Symbol(_, pos) | SExp::List(_, pos) => *pos,
        }
    }

    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            SExp::Symbol(name, _) => Some(name),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[SExp]> {
        match self {
            SExp::List(items, _) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Display for SExp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SExp::Atom(atom, _) => write!(f, "{}", atom),
            SExp::Symbol(symbol, _) => write!(f, "{}", symbol),
            SExp::List(elements, _) => {
                write!(f, "(")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", element)?;
                }
                write!(f, ")")
            }
        }
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Atom::String(s) => write!(f, "\"{}\"", s.replace('"', "\\\"")),
            Atom::Integer(i) => write!(f, "{}", i),
            Atom::Float(fl) => write!(f, "{:?}", fl),
            Atom::Keyword(k) => write!(f, ":{}", k),
        }
    }
}
