//! Term model shared by the harness and every toolchain
//!
//! Values are compared structurally. There is no coercion between variants,
//! so `1`, `1.0` and `"1"` are three distinct values. Floats use a total
//! order, which keeps equality reflexive for every value (NaN included).

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt::{self, Write as _};

/// A structural term
#[derive(Debug, Clone)]
pub enum Value {
    /// Symbolic constant (`ok`, `true`, `assertion_failed`)
    Atom(String),
    /// Signed integer
    Integer(i64),
    /// Floating point number
    Float(f64),
    /// Text
    String(String),
    /// Ordered sequence of any length
    List(Vec<Value>),
    /// Fixed-arity record
    Tuple(Vec<Value>),
    /// Key-value mapping, ordered by key
    Map(BTreeMap<Value, Value>),
}

impl Value {
    pub fn atom(name: impl Into<String>) -> Self {
        Value::Atom(name.into())
    }

    pub fn string(text: impl Into<String>) -> Self {
        Value::String(text.into())
    }

    pub fn tuple(elements: impl IntoIterator<Item = Value>) -> Self {
        Value::Tuple(elements.into_iter().collect())
    }

    pub fn list(elements: impl IntoIterator<Item = Value>) -> Self {
        Value::List(elements.into_iter().collect())
    }

    pub fn map(entries: impl IntoIterator<Item = (Value, Value)>) -> Self {
        Value::Map(entries.into_iter().collect())
    }

    /// Booleans are the atoms `true` and `false`
    pub fn bool(b: bool) -> Self {
        Value::atom(if b { "true" } else { "false" })
    }

    pub fn is_atom(&self, name: &str) -> bool {
        matches!(self, Value::Atom(a) if a == name)
    }

    pub fn is_true(&self) -> bool {
        self.is_atom("true")
    }

    pub fn is_false(&self) -> bool {
        self.is_atom("false")
    }

    /// Elements of a tuple whose first element is the atom `tag`
    pub fn tagged(&self, tag: &str) -> Option<&[Value]> {
        match self {
            Value::Tuple(elements) if elements.first().is_some_and(|head| head.is_atom(tag)) => {
                Some(&elements[1..])
            }
            _ => None,
        }
    }

    /// Ranking used to order values of different variants
    fn rank(&self) -> u8 {
        match self {
            Value::Integer(_) => 0,
            Value::Float(_) => 1,
            Value::Atom(_) => 2,
            Value::Tuple(_) => 3,
            Value::Map(_) => 4,
            Value::List(_) => 5,
            Value::String(_) => 6,
        }
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Atom(a), Value::Atom(b)) => a.cmp(b),
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::List(a), Value::List(b)) => a.cmp(b),
            (Value::Tuple(a), Value::Tuple(b)) => a.len().cmp(&b.len()).then_with(|| a.cmp(b)),
            (Value::Map(a), Value::Map(b)) => a.len().cmp(&b.len()).then_with(|| a.iter().cmp(b.iter())),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

/// Quoted, with escapes, so a rendered string never spans lines
fn write_quoted(f: &mut fmt::Formatter<'_>, text: &str) -> fmt::Result {
    f.write_char('"')?;
    for c in text.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            '\r' => f.write_str("\\r")?,
            c if c.is_control() => write!(f, "{}", c.escape_default())?,
            c => f.write_char(c)?,
        }
    }
    f.write_char('"')
}

fn write_seq(f: &mut fmt::Formatter<'_>, open: &str, items: &[Value], close: &str) -> fmt::Result {
    write!(f, "{}", open)?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ",")?;
        }
        write!(f, "{}", item)?;
    }
    write!(f, "{}", close)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Atom(name) => write!(f, "{}", name),
            Value::Integer(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{:?}", x),
            Value::String(s) => write_quoted(f, s),
            Value::List(items) => write_seq(f, "[", items, "]"),
            Value::Tuple(items) => write_seq(f, "{", items, "}"),
            Value::Map(entries) => {
                write!(f, "#{{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{} => {}", key, value)?;
                }
                write!(f, "}}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_cross_variant_coercion() {
        assert_ne!(Value::Integer(1), Value::Float(1.0));
        assert_ne!(Value::Integer(1), Value::string("1"));
        assert_ne!(Value::atom("ok"), Value::string("ok"));
        assert_ne!(Value::list([Value::Integer(1)]), Value::tuple([Value::Integer(1)]));
    }

    #[test]
    fn test_nan_is_equal_to_itself() {
        let nan = Value::Float(f64::NAN);
        assert_eq!(nan, nan.clone());
    }

    #[test]
    fn test_map_equality_ignores_insertion_order() {
        let a = Value::map([(Value::atom("a"), Value::Integer(1)), (Value::atom("b"), Value::Integer(2))]);
        let b = Value::map([(Value::atom("b"), Value::Integer(2)), (Value::atom("a"), Value::Integer(1))]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_tagged() {
        let fail = Value::tuple([Value::atom("fail"), Value::Integer(1), Value::Integer(2)]);
        assert_eq!(fail.tagged("fail"), Some(&[Value::Integer(1), Value::Integer(2)][..]));
        assert_eq!(fail.tagged("pass"), None);
        assert_eq!(Value::atom("fail").tagged("fail"), None);
    }

    #[test]
    fn test_display() {
        let value = Value::tuple([
            Value::atom("fail"),
            Value::list([Value::Integer(1), Value::Float(2.5)]),
            Value::string("say \"hi\""),
        ]);
        assert_eq!(value.to_string(), r#"{fail,[1,2.5],"say \"hi\""}"#);

        let map = Value::map([(Value::atom("k"), Value::bool(true))]);
        assert_eq!(map.to_string(), "#{k => true}");
        assert_eq!(Value::Float(1.0).to_string(), "1.0");
    }

    #[test]
    fn test_display_escapes_control_characters() {
        let text = Value::string("a\nb\tc\rd\u{7}e\\");
        assert_eq!(text.to_string(), r#""a\nb\tc\rd\u{7}e\\""#);
        assert!(!Value::tuple([Value::atom("panic"), Value::string("x\ny")]).to_string().contains('\n'));
        assert_eq!(Value::string("héllo").to_string(), "\"héllo\"");
    }
}
