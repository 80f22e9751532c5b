//! Resolution of s-expressions into an executable module
//!
//! Every name is checked here: variables must be bound, calls must target a
//! builtin with the right arity or a function defined in the same module.

use std::collections::HashMap;

use tally_core::{AssertionKind, Value};

use crate::error::{Result, ScriptError};
use crate::sexp::{Atom, Pos, SExp};

/// Builtin operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    /// Assertion; `raising` selects the `!` form
    Assert { kind: AssertionKind, raising: bool },
    Raise,
    Panic,
    Sleep,
    Eq,
    Not,
    Add,
    Sub,
    Mul,
    Div,
}

impl Builtin {
    pub fn lookup(name: &str) -> Option<Builtin> {
        let (base, raising) = match name.strip_suffix('!') {
            Some(base) => (base, true),
            None => (name, false),
        };
        let kind = match base {
            "assert-equal" => Some(AssertionKind::Equal),
            "assert-not-equal" => Some(AssertionKind::NotEqual),
            "assert-true" => Some(AssertionKind::True),
            "assert-false" => Some(AssertionKind::False),
            "assert-match" => Some(AssertionKind::Match),
            _ => None,
        };
        if let Some(kind) = kind {
            return Some(Builtin::Assert { kind, raising });
        }
        match name {
            "raise" => Some(Builtin::Raise),
            "panic" => Some(Builtin::Panic),
            "sleep" => Some(Builtin::Sleep),
            "=" => Some(Builtin::Eq),
            "not" => Some(Builtin::Not),
            "+" => Some(Builtin::Add),
            "-" => Some(Builtin::Sub),
            "*" => Some(Builtin::Mul),
            "div" => Some(Builtin::Div),
            _ => None,
        }
    }

    pub fn arity(self) -> usize {
        match self {
            Builtin::Assert { kind, .. } => match kind {
                AssertionKind::True | AssertionKind::False => 1,
                AssertionKind::Equal | AssertionKind::NotEqual | AssertionKind::Match => 2,
            },
            Builtin::Raise | Builtin::Panic | Builtin::Sleep | Builtin::Not => 1,
            Builtin::Eq | Builtin::Add | Builtin::Sub | Builtin::Mul | Builtin::Div => 2,
        }
    }
}

/// Resolved expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Var(String),
    Tuple(Vec<Expr>),
    List(Vec<Expr>),
    Map(Vec<(Expr, Expr)>),
    If(Box<Expr>, Box<Expr>, Box<Expr>),
    Let(Vec<(String, Expr)>, Vec<Expr>),
    Do(Vec<Expr>),
    Builtin(Builtin, Vec<Expr>),
    Call(String, Vec<Expr>),
}

#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<Expr>,
    pub exported: bool,
}

/// A compiled test module
#[derive(Debug, Clone)]
pub struct ScriptModule {
    pub name: String,
    functions: Vec<Function>,
    index: HashMap<(String, usize), usize>,
}

impl ScriptModule {
    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    pub fn function(&self, name: &str, arity: usize) -> Option<&Function> {
        self.index.get(&(name.to_string(), arity)).map(|&i| &self.functions[i])
    }
}

const SPECIAL_FORMS: &[&str] = &["tuple", "list", "map", "if", "let", "do"];

/// Compile top-level forms into a module named `name`
pub fn compile_module(name: &str, forms: &[SExp]) -> Result<ScriptModule> {
    let headers = forms.iter().map(read_header).collect::<Result<Vec<_>>>()?;

    let mut index = HashMap::new();
    for (i, header) in headers.iter().enumerate() {
        let key = (header.name.to_string(), header.params.len());
        if index.insert(key, i).is_some() {
            return Err(ScriptError::resolve(
                format!("function {}/{} defined more than once", header.name, header.params.len()),
                header.pos,
            ));
        }
    }

    let mut functions = Vec::with_capacity(headers.len());
    for header in &headers {
        let mut resolver = Resolver {
            index: &index,
            scope: header.params.clone(),
        };
        let body = header
            .body
            .iter()
            .map(|form| resolver.expr(form))
            .collect::<Result<Vec<_>>>()?;
        functions.push(Function {
            name: header.name.to_string(),
            params: header.params.clone(),
            body,
            exported: header.exported,
        });
    }

    Ok(ScriptModule {
        name: name.to_string(),
        functions,
        index,
    })
}

struct Header<'a> {
    name: &'a str,
    params: Vec<String>,
    body: &'a [SExp],
    exported: bool,
    pos: Pos,
}

fn read_header(form: &SExp) -> Result<Header<'_>> {
    let pos = form.pos();
    let items = form
        .as_list()
        .ok_or_else(|| ScriptError::resolve(format!("expected a definition, found {}", form), pos))?;

    let exported = match items.first().and_then(SExp::as_symbol) {
        Some("defn") => true,
        Some("defp") => false,
        _ => {
            return Err(ScriptError::resolve(
                "top-level forms must be (defn ...) or (defp ...)",
                pos,
            ))
        }
    };

    let name = items
        .get(1)
        .and_then(SExp::as_symbol)
        .ok_or_else(|| ScriptError::resolve("expected a function name", pos))?;

    let param_forms = items
        .get(2)
        .and_then(SExp::as_list)
        .ok_or_else(|| ScriptError::resolve(format!("expected a parameter list for {}", name), pos))?;

    let mut params: Vec<String> = Vec::with_capacity(param_forms.len());
    for param in param_forms {
        let param_name = param
            .as_symbol()
            .filter(|p| is_bindable(p))
            .ok_or_else(|| ScriptError::resolve(format!("invalid parameter {}", param), param.pos()))?;
        if params.iter().any(|p| p == param_name) {
            return Err(ScriptError::resolve(
                format!("duplicate parameter {}", param_name),
                param.pos(),
            ));
        }
        params.push(param_name.to_string());
    }

    Ok(Header {
        name,
        params,
        body: &items[3..],
        exported,
        pos,
    })
}

fn is_bindable(name: &str) -> bool {
    name != "true" && name != "false"
}

struct Resolver<'a> {
    index: &'a HashMap<(String, usize), usize>,
    scope: Vec<String>,
}

impl Resolver<'_> {
    fn exprs(&mut self, forms: &[SExp]) -> Result<Vec<Expr>> {
        forms.iter().map(|form| self.expr(form)).collect()
    }

    fn expr(&mut self, form: &SExp) -> Result<Expr> {
        match form {
            SExp::Atom(atom, _) => Ok(Expr::Literal(match atom {
                Atom::Integer(n) => Value::Integer(*n),
                Atom::Float(x) => Value::Float(*x),
                Atom::String(s) => Value::string(s.as_str()),
                Atom::Keyword(k) => Value::atom(k.as_str()),
            })),
            SExp::Symbol(name, pos) => match name.as_str() {
                "true" => Ok(Expr::Literal(Value::bool(true))),
                "false" => Ok(Expr::Literal(Value::bool(false))),
                _ if self.scope.iter().any(|bound| bound == name) => Ok(Expr::Var(name.clone())),
                _ => Err(ScriptError::resolve(format!("unbound variable {}", name), *pos)),
            },
            SExp::List(items, pos) => self.list(items, *pos),
        }
    }

    fn list(&mut self, items: &[SExp], pos: Pos) -> Result<Expr> {
        let Some((head, args)) = items.split_first() else {
            return Err(ScriptError::resolve("empty call", pos));
        };
        let name = head
            .as_symbol()
            .ok_or_else(|| ScriptError::resolve(format!("expected a function name, found {}", head), head.pos()))?;

        if SPECIAL_FORMS.contains(&name) {
            return self.special_form(name, args, pos);
        }

        if let Some(builtin) = Builtin::lookup(name) {
            if builtin.arity() != args.len() {
                return Err(ScriptError::resolve(
                    format!("{} expects {} argument(s), got {}", name, builtin.arity(), args.len()),
                    pos,
                ));
            }
            return Ok(Expr::Builtin(builtin, self.exprs(args)?));
        }

        if !self.index.contains_key(&(name.to_string(), args.len())) {
            return Err(ScriptError::resolve(
                format!("undefined function {}/{}", name, args.len()),
                pos,
            ));
        }
        Ok(Expr::Call(name.to_string(), self.exprs(args)?))
    }

    fn special_form(&mut self, name: &str, args: &[SExp], pos: Pos) -> Result<Expr> {
        match name {
            "tuple" => Ok(Expr::Tuple(self.exprs(args)?)),
            "list" => Ok(Expr::List(self.exprs(args)?)),
            "map" => {
                if args.len() % 2 != 0 {
                    return Err(ScriptError::resolve("map expects key/value pairs", pos));
                }
                let mut entries = Vec::with_capacity(args.len() / 2);
                for pair in args.chunks(2) {
                    entries.push((self.expr(&pair[0])?, self.expr(&pair[1])?));
                }
                Ok(Expr::Map(entries))
            }
            "if" => {
                let [cond, then, other] = args else {
                    return Err(ScriptError::resolve("if expects (if cond then else)", pos));
                };
                Ok(Expr::If(
                    Box::new(self.expr(cond)?),
                    Box::new(self.expr(then)?),
                    Box::new(self.expr(other)?),
                ))
            }
            "let" => self.let_form(args, pos),
            _ => Ok(Expr::Do(self.exprs(args)?)),
        }
    }

    fn let_form(&mut self, args: &[SExp], pos: Pos) -> Result<Expr> {
        let Some((bindings, body)) = args.split_first() else {
            return Err(ScriptError::resolve("let expects a binding list", pos));
        };
        let bindings = bindings
            .as_list()
            .ok_or_else(|| ScriptError::resolve("let expects a binding list", bindings.pos()))?;

        let depth = self.scope.len();
        let mut resolved = Vec::with_capacity(bindings.len());
        for binding in bindings {
            let (name, value) = match binding.as_list() {
                Some([SExp::Symbol(name, _), value]) if is_bindable(name) => (name, value),
                _ => return Err(ScriptError::resolve(format!("invalid binding {}", binding), binding.pos())),
            };
            let value = self.expr(value)?;
            self.scope.push(name.clone());
            resolved.push((name.clone(), value));
        }
        let body = self.exprs(body);
        self.scope.truncate(depth);
        Ok(Expr::Let(resolved, body?))
    }
}
