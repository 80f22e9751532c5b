//! Reader for test module source
//!
//! Turns source text into a sequence of top-level s-expressions.
//! `;` starts a comment that runs to the end of the line.

use crate::error::{Result, ScriptError};
use crate::sexp::{Atom, Pos, SExp};

/// Deepest list nesting accepted in a source file
///
/// Compilation and evaluation both recurse over the tree, so bounding the
/// reader bounds them too.
pub const MAX_NESTING: usize = 256;

pub struct Reader {
    chars: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
    depth: usize,
}

impl Reader {
    pub fn new(input: &str) -> Self {
        Reader {
            chars: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
            depth: 0,
        }
    }

    /// Read every top-level form
    pub fn read_all(&mut self) -> Result<Vec<SExp>> {
        let mut forms = Vec::new();
        loop {
            self.skip_whitespace_and_comments();
            if self.current_char().is_none() {
                return Ok(forms);
            }
            forms.push(self.read_form()?);
        }
    }

    fn current_char(&self) -> Option<char> {
        self.chars.get(self.position).copied()
    }

    fn pos(&self) -> Pos {
        Pos {
            line: self.line,
            column: self.column,
        }
    }

    fn advance(&mut self) {
        if let Some(c) = self.current_char() {
            self.position += 1;
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        while let Some(c) = self.current_char() {
            if c.is_whitespace() {
                self.advance();
            } else if c == ';' {
                while let Some(c) = self.current_char() {
                    if c == '\n' {
                        break;
                    }
                    self.advance();
                }
            } else {
                break;
            }
        }
    }

    fn read_form(&mut self) -> Result<SExp> {
        self.skip_whitespace_and_comments();
        let start = self.pos();

        match self.current_char() {
            None => Err(ScriptError::unexpected_eof("expression")),
            Some('(') => {
                if self.depth >= MAX_NESTING {
                    return Err(ScriptError::syntax(
                        format!("nesting too deep (more than {} levels)", MAX_NESTING),
                        start,
                    ));
                }
                self.advance();
                self.depth += 1;
                let mut items = Vec::new();
                loop {
                    self.skip_whitespace_and_comments();
                    match self.current_char() {
                        None => return Err(ScriptError::unexpected_eof(format!("')' to close list at {}", start))),
                        Some(')') => {
                            self.advance();
                            self.depth -= 1;
                            return Ok(SExp::List(items, start));
                        }
                        Some(_) => items.push(self.read_form()?),
                    }
                }
            }
            Some(')') => Err(ScriptError::syntax("unexpected ')'", start)),
            Some('"') => self.read_string(start),
            Some(':') => {
                self.advance();
                let name = self.read_token();
                if name.is_empty() {
                    return Err(ScriptError::syntax("empty keyword", start));
                }
                Ok(SExp::Atom(Atom::Keyword(name), start))
            }
            Some(_) => {
                let token = self.read_token();
                Ok(Self::classify_token(token, start))
            }
        }
    }

    fn read_token(&mut self) -> String {
        let mut token = String::new();
        while let Some(c) = self.current_char() {
            if c.is_whitespace() || c == '(' || c == ')' || c == '"' || c == ';' {
                break;
            }
            token.push(c);
            self.advance();
        }
        token
    }

    fn classify_token(token: String, pos: Pos) -> SExp {
        if let Ok(n) = token.parse::<i64>() {
            return SExp::Atom(Atom::Integer(n), pos);
        }
        let looks_numeric = token
            .trim_start_matches(['-', '+'])
            .starts_with(|c: char| c.is_ascii_digit());
        if looks_numeric {
            if let Ok(x) = token.parse::<f64>() {
                return SExp::Atom(Atom::Float(x), pos);
            }
        }
        SExp::Symbol(token, pos)
    }

    fn read_string(&mut self, start: Pos) -> Result<SExp> {
        self.advance();
        let mut text = String::new();
        loop {
            match self.current_char() {
                None => return Err(ScriptError::unexpected_eof(format!("'\"' to close string at {}", start))),
                Some('"') => {
                    self.advance();
                    return Ok(SExp::Atom(Atom::String(text), start));
                }
                Some('\\') => {
                    self.advance();
                    let escaped = match self.current_char() {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('"') => '"',
                        Some('\\') => '\\',
                        Some(other) => {
                            return Err(ScriptError::syntax(format!("unknown escape '\\{}'", other), self.pos()))
                        }
                        None => return Err(ScriptError::unexpected_eof("escape character")),
                    };
                    text.push(escaped);
                    self.advance();
                }
                Some(c) => {
                    text.push(c);
                    self.advance();
                }
            }
        }
    }
}

/// Read all top-level forms of `source`
pub fn read(source: &str) -> Result<Vec<SExp>> {
    Reader::new(source).read_all()
}
