//! Tree-walking interpreter for compiled modules

use std::time::Duration;

use tally_core::assertions;
use tally_core::{AssertionKind, AssertionResult, Raised, Value};

use crate::compile::{Builtin, Expr, Function, ScriptModule};

/// Nested calls allowed before `{system_limit, call_depth}` is raised
pub const MAX_CALL_DEPTH: usize = 256;

/// Nested expression evaluations allowed, across calls, before
/// `{system_limit, eval_depth}` is raised
pub const MAX_EVAL_DEPTH: usize = 8192;

type EvalResult = Result<Value, Raised>;

fn raise(elements: impl IntoIterator<Item = Value>) -> Raised {
    Raised(Value::tuple(elements))
}

fn badarith() -> Raised {
    raise([Value::atom("badarith")])
}

pub struct Interpreter<'m> {
    module: &'m ScriptModule,
    env: Vec<(String, Value)>,
    depth: usize,
    nesting: usize,
}

impl<'m> Interpreter<'m> {
    pub fn new(module: &'m ScriptModule) -> Self {
        Self {
            module,
            env: Vec::new(),
            depth: 0,
            nesting: 0,
        }
    }

    /// Call `name/args.len()`, exported or not
    pub fn call(&mut self, name: &str, args: Vec<Value>) -> EvalResult {
        let module = self.module;
        let function = module.function(name, args.len()).ok_or_else(|| {
            raise([
                Value::atom("undef"),
                Value::atom(name),
                Value::Integer(args.len() as i64),
            ])
        })?;
        self.apply(function, args)
    }

    fn apply(&mut self, function: &Function, args: Vec<Value>) -> EvalResult {
        if self.depth >= MAX_CALL_DEPTH {
            return Err(raise([Value::atom("system_limit"), Value::atom("call_depth")]));
        }
        self.depth += 1;
        let saved = std::mem::replace(
            &mut self.env,
            function.params.iter().cloned().zip(args).collect(),
        );
        let result = self.block(&function.body);
        self.env = saved;
        self.depth -= 1;
        result
    }

    fn lookup(&self, name: &str) -> EvalResult {
        self.env
            .iter()
            .rev()
            .find(|(bound, _)| bound == name)
            .map(|(_, value)| value.clone())
            .ok_or_else(|| raise([Value::atom("unbound"), Value::atom(name)]))
    }

    fn block(&mut self, body: &[Expr]) -> EvalResult {
        let mut last = Value::atom("ok");
        for expr in body {
            last = self.eval(expr)?;
        }
        Ok(last)
    }

    fn eval_all(&mut self, exprs: &[Expr]) -> Result<Vec<Value>, Raised> {
        exprs.iter().map(|expr| self.eval(expr)).collect()
    }

    pub fn eval(&mut self, expr: &Expr) -> EvalResult {
        if self.nesting >= MAX_EVAL_DEPTH {
            return Err(raise([Value::atom("system_limit"), Value::atom("eval_depth")]));
        }
        self.nesting += 1;
        let result = self.eval_expr(expr);
        self.nesting -= 1;
        result
    }

    fn eval_expr(&mut self, expr: &Expr) -> EvalResult {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Var(name) => self.lookup(name),
            Expr::Tuple(items) => Ok(Value::Tuple(self.eval_all(items)?)),
            Expr::List(items) => Ok(Value::List(self.eval_all(items)?)),
            Expr::Map(entries) => {
                let mut map = std::collections::BTreeMap::new();
                for (key, value) in entries {
                    let key = self.eval(key)?;
                    let value = self.eval(value)?;
                    map.insert(key, value);
                }
                Ok(Value::Map(map))
            }
            Expr::If(cond, then, other) => {
                let cond = self.eval(cond)?;
                if cond.is_true() {
                    self.eval(then)
                } else if cond.is_false() {
                    self.eval(other)
                } else {
                    Err(raise([Value::atom("badarg"), cond]))
                }
            }
            Expr::Let(bindings, body) => {
                let depth = self.env.len();
                for (name, value) in bindings {
                    match self.eval(value) {
                        Ok(value) => self.env.push((name.clone(), value)),
                        Err(raised) => {
                            self.env.truncate(depth);
                            return Err(raised);
                        }
                    }
                }
                let result = self.block(body);
                self.env.truncate(depth);
                result
            }
            Expr::Do(body) => self.block(body),
            Expr::Builtin(builtin, args) => {
                let args = self.eval_all(args)?;
                apply_builtin(*builtin, &args)
            }
            Expr::Call(name, args) => {
                let args = self.eval_all(args)?;
                self.call(name, args)
            }
        }
    }
}

fn assertion(kind: AssertionKind, args: &[Value]) -> AssertionResult {
    match (kind, args) {
        (AssertionKind::Equal, [actual, expected]) => assertions::assert_equal_or_raise(actual, expected),
        (AssertionKind::NotEqual, [actual, expected]) => assertions::assert_not_equal_or_raise(actual, expected),
        (AssertionKind::Match, [value, pattern]) => assertions::assert_match_or_raise(value, pattern),
        (AssertionKind::True, [value]) => assertions::assert_true_or_raise(value),
        (AssertionKind::False, [value]) => assertions::assert_false_or_raise(value),
        _ => unreachable!("arity is checked at compile time"),
    }
}

fn arith(op: Builtin, a: &Value, b: &Value) -> EvalResult {
    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => {
            let result = match op {
                Builtin::Add => x.checked_add(*y),
                Builtin::Sub => x.checked_sub(*y),
                Builtin::Mul => x.checked_mul(*y),
                _ => x.checked_div(*y),
            };
            result.map(Value::Integer).ok_or_else(badarith)
        }
        (Value::Float(x), Value::Float(y)) => {
            let result = match op {
                Builtin::Add => x + y,
                Builtin::Sub => x - y,
                Builtin::Mul => x * y,
                _ if *y == 0.0 => return Err(badarith()),
                _ => x / y,
            };
            Ok(Value::Float(result))
        }
        _ => Err(badarith()),
    }
}

fn apply_builtin(builtin: Builtin, args: &[Value]) -> EvalResult {
    match builtin {
        Builtin::Assert { kind, raising } => {
            let result = assertion(kind, args);
            if raising {
                result.map_err(Raised::from)
            } else {
                Ok(result.unwrap_or_else(|failure| failure.into_marker()))
            }
        }
        Builtin::Raise => Err(Raised(args[0].clone())),
        Builtin::Panic => match &args[0] {
            Value::String(message) => panic!("{}", message),
            other => panic!("{}", other),
        },
        Builtin::Sleep => match &args[0] {
            Value::Integer(ms) if *ms >= 0 => {
                std::thread::sleep(Duration::from_millis(*ms as u64));
                Ok(Value::atom("ok"))
            }
            other => Err(raise([Value::atom("badarg"), other.clone()])),
        },
        Builtin::Eq => Ok(Value::bool(args[0] == args[1])),
        Builtin::Not => {
            if args[0].is_true() {
                Ok(Value::bool(false))
            } else if args[0].is_false() {
                Ok(Value::bool(true))
            } else {
                Err(raise([Value::atom("badarg"), args[0].clone()]))
            }
        }
        Builtin::Add | Builtin::Sub | Builtin::Mul | Builtin::Div => arith(builtin, &args[0], &args[1]),
    }
}
